use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::io::{self, Read, Write};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use super::{Allocation, ClusterSizer, SizingRequest};
use crate::config::ExternalToolConfig;
use crate::layout::diagnostics::SizingStrategy;
use crate::layout::error::ExternalToolError;
use crate::layout::geometry::{Bounds, Point, UnitScale};

// ── DOT exchange ────────────────────────────────────────────────────

/// Points per inch in DOT geometry.
const POINTS_PER_INCH: f32 = 72.0;

/// How often a running tool is polled for exit.
const POLL_INTERVAL: Duration = Duration::from_millis(5);

static CLUSTER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"subgraph\s+cluster_(\d+)\s*\{").expect("valid cluster regex"));
static BB_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"bb\s*=\s*"\s*([-+\d.eE]+)\s*,\s*([-+\d.eE]+)\s*,\s*([-+\d.eE]+)\s*,\s*([-+\d.eE]+)\s*""#)
        .expect("valid bb regex")
});
static NODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^\s*n(\d+)\s*\[([^\]]*)\]").expect("valid node regex"));
static POS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"pos\s*=\s*"\s*([-+\d.eE]+)\s*,\s*([-+\d.eE]+)"#).expect("valid pos regex")
});

/// DOT request plus the id tables needed to read the answer back.
#[derive(Debug, Clone)]
pub struct DotRequest {
    pub source: String,
    /// `cluster_<i>` → container id.
    pub clusters: Vec<String>,
    /// `n<i>` → element id.
    pub nodes: Vec<String>,
}

/// Cluster boxes and node centers as reported by the tool, in points with
/// y growing upwards.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DotLayout {
    pub clusters: BTreeMap<usize, Bounds>,
    pub nodes: BTreeMap<usize, Point>,
}

/// Writes one cluster per non-root container, nested like the tree, with a
/// fixed-size box per element and an invisible placeholder in empty
/// clusters so they keep their minimum size.
pub fn build_dot_request(request: &SizingRequest<'_>) -> DotRequest {
    let hierarchy = request.hierarchy;
    let config = request.config;
    let nodes: Vec<String> = hierarchy.element_owner.keys().cloned().collect();
    let node_index: BTreeMap<&str, usize> = nodes
        .iter()
        .enumerate()
        .map(|(idx, id)| (id.as_str(), idx))
        .collect();
    let mut clusters: Vec<String> = Vec::new();

    let mut out = String::new();
    let _ = writeln!(out, "digraph layout {{");
    let _ = writeln!(out, "  graph [compound=true, margin=0, nodesep=0.2, ranksep=0.3];");
    let _ = writeln!(out, "  node [shape=box, fixedsize=true, label=\"\"];");

    fn inches(px: f32) -> f32 {
        (px / POINTS_PER_INCH).max(0.01)
    }

    // Iterative walk with explicit close markers keeps nesting without
    // recursion.
    enum Step {
        Open(String),
        Close,
    }
    let mut stack = vec![Step::Open(hierarchy.root.clone())];
    while let Some(step) = stack.pop() {
        let id = match step {
            Step::Close => {
                let _ = writeln!(out, "  }}");
                continue;
            }
            Step::Open(id) => id,
        };
        let Some(info) = hierarchy.container(&id) else {
            continue;
        };
        if !info.is_root() {
            let idx = clusters.len();
            clusters.push(id.clone());
            let _ = writeln!(out, "  subgraph cluster_{idx} {{");
            let _ = writeln!(out, "    graph [margin={:.2}];", config.padding);
            if info.element_ids.is_empty() && info.children.is_empty() {
                let (w, h) = request
                    .spatial
                    .requirement(&id)
                    .map(|req| (req.min_width, req.min_height))
                    .unwrap_or((config.min_container_width, config.min_container_height));
                let _ = writeln!(
                    out,
                    "    e{idx} [style=invis, width={:.4}, height={:.4}];",
                    inches(w - config.padding * 2.0),
                    inches(h - config.padding * 2.0)
                );
            }
            stack.push(Step::Close);
        }
        for element in &info.element_ids {
            let Some(idx) = node_index.get(element.as_str()) else {
                continue;
            };
            let (w, h) = request
                .dimensions
                .get(element)
                .map(|dims| (dims.total_width(), dims.total_height()))
                .unwrap_or((config.measure.vertex_diameter, config.measure.vertex_diameter));
            let _ = writeln!(
                out,
                "    n{idx} [width={:.4}, height={:.4}];",
                inches(w),
                inches(h)
            );
        }
        for child in info.children.iter().rev() {
            stack.push(Step::Open(child.clone()));
        }
    }

    for connector in request.connectors {
        let Some(hub) = node_index.get(connector.hub.as_str()) else {
            continue;
        };
        for other in connector.others() {
            if let Some(target) = node_index.get(other.as_str()) {
                let _ = writeln!(out, "  n{hub} -> n{target};");
            }
        }
    }
    let _ = writeln!(out, "}}");

    DotRequest {
        source: out,
        clusters,
        nodes,
    }
}

/// Extracts cluster bounding boxes and node positions from attributed DOT.
pub fn parse_dot_layout(output: &str) -> Result<DotLayout, ExternalToolError> {
    let mut layout = DotLayout::default();

    let starts: Vec<(usize, usize)> = CLUSTER_RE
        .captures_iter(output)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let idx = caps.get(1)?.as_str().parse().ok()?;
            Some((idx, whole.end()))
        })
        .collect();
    for (idx, start) in &starts {
        let rest = &output[*start..];
        let end = rest.find("subgraph").unwrap_or(rest.len());
        let Some(caps) = BB_RE.captures(&rest[..end]) else {
            return Err(ExternalToolError::Unparseable(format!(
                "cluster_{idx} has no bounding box"
            )));
        };
        let values = [1, 2, 3, 4].map(|i| {
            caps.get(i)
                .and_then(|m| m.as_str().parse::<f32>().ok())
                .unwrap_or(f32::NAN)
        });
        if values.iter().any(|v| !v.is_finite()) {
            return Err(ExternalToolError::Unparseable(format!(
                "cluster_{idx} has a malformed bounding box"
            )));
        }
        layout
            .clusters
            .insert(*idx, Bounds::new(values[0], values[1], values[2], values[3]));
    }

    for caps in NODE_RE.captures_iter(output) {
        let (Some(idx), Some(attrs)) = (caps.get(1), caps.get(2)) else {
            continue;
        };
        let Ok(idx) = idx.as_str().parse::<usize>() else {
            continue;
        };
        if let Some(pos) = POS_RE.captures(attrs.as_str()) {
            let x = pos.get(1).and_then(|m| m.as_str().parse::<f32>().ok());
            let y = pos.get(2).and_then(|m| m.as_str().parse::<f32>().ok());
            if let (Some(x), Some(y)) = (x, y) {
                layout.nodes.insert(idx, Point::new(x, y));
            }
        }
    }
    Ok(layout)
}

// ── Process invocation ─────────────────────────────────────────────

/// Feeds `input` to the tool and collects stdout, killing the process when
/// it outlives `timeout_ms`.
pub fn run_tool(config: &ExternalToolConfig, input: &str) -> Result<String, ExternalToolError> {
    let program = config.command.clone();
    let mut child = Command::new(&program)
        .args(&config.args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => ExternalToolError::NotFound {
                program: program.clone(),
            },
            _ => ExternalToolError::Spawn {
                program: program.clone(),
                source,
            },
        })?;

    let mut stdin = child
        .stdin
        .take()
        .ok_or_else(|| io::Error::other("tool stdin unavailable"))?;
    let mut stdout = child
        .stdout
        .take()
        .ok_or_else(|| io::Error::other("tool stdout unavailable"))?;
    let mut stderr = child
        .stderr
        .take()
        .ok_or_else(|| io::Error::other("tool stderr unavailable"))?;

    let payload = input.as_bytes().to_vec();
    let writer = thread::spawn(move || stdin.write_all(&payload));
    let reader = thread::spawn(move || {
        let mut buf = String::new();
        stdout.read_to_string(&mut buf).map(|_| buf)
    });
    let err_reader = thread::spawn(move || {
        let mut buf = String::new();
        let _ = stderr.read_to_string(&mut buf);
        buf
    });

    let timeout = Duration::from_millis(config.timeout_ms);
    let deadline = Instant::now() + timeout;
    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            let _ = child.wait();
            return Err(ExternalToolError::Timeout(timeout));
        }
        thread::sleep(POLL_INTERVAL);
    };

    let written = writer
        .join()
        .unwrap_or_else(|_| Err(io::Error::other("tool stdin writer panicked")));
    let stdout = reader
        .join()
        .unwrap_or_else(|_| Err(io::Error::other("tool stdout reader panicked")));
    let stderr = err_reader.join().unwrap_or_default();

    if !status.success() {
        return Err(ExternalToolError::Failed {
            status: status.to_string(),
            stderr: stderr.trim().to_string(),
        });
    }
    written?;
    Ok(stdout?)
}

// ── Sizer ───────────────────────────────────────────────────────────

/// Sizes containers with a Graphviz-compatible `dot` process.
#[derive(Debug, Clone)]
pub struct ExternalToolSizer {
    config: ExternalToolConfig,
}

impl ExternalToolSizer {
    pub fn new(config: ExternalToolConfig) -> Self {
        Self { config }
    }
}

impl ClusterSizer for ExternalToolSizer {
    fn name(&self) -> &'static str {
        "external-tool"
    }

    fn allocate(&self, request: &SizingRequest<'_>) -> Result<Allocation, ExternalToolError> {
        let dot = build_dot_request(request);
        debug!(
            clusters = dot.clusters.len(),
            nodes = dot.nodes.len(),
            program = %self.config.command,
            "invoking layout tool"
        );
        let output = run_tool(&self.config, &dot.source)?;
        let layout = parse_dot_layout(&output)?;
        normalize(request, &dot, &layout)
    }
}

/// Maps the tool's boxes into unit space. The global box of all clusters
/// lands centered in the root's padded interior at its true size.
fn normalize(
    request: &SizingRequest<'_>,
    dot: &DotRequest,
    layout: &DotLayout,
) -> Result<Allocation, ExternalToolError> {
    let mut flipped: BTreeMap<String, Bounds> = BTreeMap::new();
    for (idx, id) in dot.clusters.iter().enumerate() {
        let Some(bb) = layout.clusters.get(&idx) else {
            return Err(ExternalToolError::Unparseable(format!(
                "no bounding box for container `{id}`"
            )));
        };
        flipped.insert(id.clone(), Bounds::new(bb.left, -bb.bottom, bb.right, -bb.top));
    }
    let Some(global) = flipped
        .values()
        .copied()
        .reduce(|acc, bounds| acc.union(&bounds))
    else {
        return Err(ExternalToolError::Unparseable("no clusters in output".to_string()));
    };

    let padding = request.config.padding;
    let base = request.working_scale();
    let scale = UnitScale::new(
        base.width.max(global.width() + padding * 2.0),
        base.height.max(global.height() + padding * 2.0),
    );
    let offset_x = (scale.width - global.width()) / 2.0 - global.left;
    let offset_y = (scale.height - global.height()) / 2.0 - global.top;
    let to_unit = |x: f32, y: f32| {
        Point::new(
            scale.to_unit_x(x + offset_x),
            scale.to_unit_y(y + offset_y),
        )
    };

    let mut bounds = BTreeMap::new();
    bounds.insert(request.hierarchy.root.clone(), Bounds::unit());
    for (id, b) in flipped {
        let a = to_unit(b.left, b.top);
        let z = to_unit(b.right, b.bottom);
        bounds.insert(id, Bounds::new(a.x, a.y, z.x, z.y));
    }

    let mut node_hints = BTreeMap::new();
    for (idx, id) in dot.nodes.iter().enumerate() {
        if let Some(pos) = layout.nodes.get(&idx) {
            node_hints.insert(id.clone(), to_unit(pos.x, -pos.y));
        }
    }

    Ok(Allocation {
        bounds,
        scale,
        node_hints,
        strategy: SizingStrategy::ExternalTool,
        containers_shrunk: 0,
    })
}
