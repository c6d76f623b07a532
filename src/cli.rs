use crate::config::{CoordinateSpace, load_config};
use crate::ir::LogicalGraph;
use crate::layout::LayoutEngine;
use crate::layout_dump::write_layout_dump;
use anyhow::{Context, Result};
use clap::Parser;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "cutlay", version, about = "Nested-container diagram layout engine")]
pub struct Args {
    /// Input graph (.json or .json5) or '-' for stdin
    #[arg(short = 'i', long = "input")]
    pub input: Option<PathBuf>,

    /// Output file for the layout JSON. Defaults to stdout.
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Config JSON file with layout overrides
    #[arg(short = 'c', long = "configFile")]
    pub config: Option<PathBuf>,

    /// Canvas width
    #[arg(short = 'w', long = "width")]
    pub width: Option<f32>,

    /// Canvas height
    #[arg(short = 'H', long = "height")]
    pub height: Option<f32>,

    /// Emit unit-space coordinates instead of canvas pixels
    #[arg(long = "unit")]
    pub unit: bool,

    /// Size containers with this Graphviz-compatible command
    #[arg(long = "dot", value_name = "CMD", conflicts_with = "no_dot")]
    pub dot: Option<String>,

    /// Never call the external layout tool
    #[arg(long = "no-dot")]
    pub no_dot: bool,

    /// Log phase details to stderr
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let mut config = load_config(args.config.as_deref())?;
    if let Some(width) = args.width {
        config.render.width = width.max(1.0);
    }
    if let Some(height) = args.height {
        config.render.height = height.max(1.0);
    }
    if args.unit {
        config.render.space = CoordinateSpace::Unit;
    }
    if let Some(command) = args.dot {
        config.layout.external_tool.enabled = true;
        config.layout.external_tool.command = command;
    }
    if args.no_dot {
        config.layout.external_tool.enabled = false;
    }

    let (input, is_json5) = read_input(args.input.as_deref())?;
    let graph = if is_json5 {
        LogicalGraph::from_json5(&input).context("invalid JSON5 graph")?
    } else {
        LogicalGraph::from_json(&input).context("invalid JSON graph")?
    };

    let engine = LayoutEngine::new(config);
    let outcome = engine.run(&graph)?;
    write_layout_dump(args.output.as_deref(), &outcome)?;

    if !outcome.is_completed() {
        let reason = outcome
            .diagnostics()
            .filter(|diag| diag.severity == crate::layout::Severity::Error)
            .map(|diag| diag.message.clone())
            .next()
            .unwrap_or_else(|| "layout failed".to_string());
        return Err(anyhow::anyhow!(reason));
    }
    Ok(())
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

fn read_input(path: Option<&Path>) -> Result<(String, bool)> {
    if let Some(path) = path {
        if path == Path::new("-") {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            return Ok((buf, false));
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let is_json5 = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("json5"))
            .unwrap_or(false);
        return Ok((content, is_json5));
    }

    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf)?;
    Ok((buf, false))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_layout_flags() {
        let args = Args::try_parse_from([
            "cutlay", "-i", "graph.json5", "--width", "640", "--unit", "--no-dot",
        ])
        .unwrap();
        assert_eq!(args.input.as_deref(), Some(Path::new("graph.json5")));
        assert_eq!(args.width, Some(640.0));
        assert!(args.unit);
        assert!(args.no_dot);
        assert!(args.dot.is_none());
    }

    #[test]
    fn dot_and_no_dot_conflict() {
        let result = Args::try_parse_from(["cutlay", "--dot", "dot", "--no-dot"]);
        assert!(result.is_err());
    }
}
