use crate::config::CoordinateSpace;
use crate::layout::{
    Diagnostic, LayoutKind, LayoutOutcome, PhaseStatus, QualityMetrics, RunStatus,
};
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

#[derive(Debug, Serialize)]
pub struct LayoutDump {
    pub status: RunStatus,
    pub space: CoordinateSpace,
    pub width: f32,
    pub height: f32,
    pub containers: Vec<ContainerDump>,
    pub elements: Vec<ElementDump>,
    pub connectors: Vec<ConnectorDump>,
    pub phases: Vec<PhaseDump>,
    pub metrics: QualityMetrics,
}

#[derive(Debug, Serialize)]
pub struct ContainerDump {
    pub id: String,
    pub parent: Option<String>,
    pub z: usize,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

#[derive(Debug, Serialize)]
pub struct ElementDump {
    pub id: String,
    pub kind: LayoutKind,
    pub area: Option<String>,
    pub z: usize,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub hooks: Vec<HookDump>,
}

#[derive(Debug, Serialize)]
pub struct HookDump {
    pub connector: String,
    pub side: String,
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Serialize)]
pub struct ConnectorDump {
    pub id: String,
    pub area: Option<String>,
    pub endpoints: Vec<String>,
    pub z: usize,
    pub points: Vec<[f32; 2]>,
}

#[derive(Debug, Serialize)]
pub struct PhaseDump {
    pub name: String,
    pub status: PhaseStatus,
    pub diagnostics: Vec<Diagnostic>,
}

impl LayoutDump {
    pub fn from_outcome(outcome: &LayoutOutcome) -> Self {
        let output = &outcome.output;

        let containers = output
            .container_order
            .iter()
            .filter_map(|id| output.element(id))
            .map(|element| ContainerDump {
                id: element.id.clone(),
                parent: element.parent_area.clone(),
                z: element.z,
                x: element.bounds.left,
                y: element.bounds.top,
                width: element.bounds.width(),
                height: element.bounds.height(),
            })
            .collect();

        let elements = output
            .elements
            .values()
            .filter(|element| matches!(element.kind, LayoutKind::Vertex | LayoutKind::Predicate))
            .map(|element| ElementDump {
                id: element.id.clone(),
                kind: element.kind,
                area: element.parent_area.clone(),
                z: element.z,
                x: element.bounds.left,
                y: element.bounds.top,
                width: element.bounds.width(),
                height: element.bounds.height(),
                hooks: output
                    .hooks
                    .iter()
                    .filter(|hook| hook.element == element.id)
                    .map(|hook| HookDump {
                        connector: hook.connector.clone(),
                        side: format!("{:?}", hook.cardinal).to_lowercase(),
                        x: hook.point.x,
                        y: hook.point.y,
                    })
                    .collect(),
            })
            .collect();

        let connectors = output
            .of_kind(LayoutKind::Connector)
            .map(|connector| ConnectorDump {
                id: connector.id.clone(),
                area: connector.parent_area.clone(),
                endpoints: connector.endpoints.clone(),
                z: connector.z,
                points: connector.path.iter().map(|p| [p.x, p.y]).collect(),
            })
            .collect();

        let phases = outcome
            .phases
            .iter()
            .map(|phase| PhaseDump {
                name: phase.name.clone(),
                status: phase.status,
                diagnostics: phase.diagnostics.clone(),
            })
            .collect();

        LayoutDump {
            status: outcome.status,
            space: output.space,
            width: output.width,
            height: output.height,
            containers,
            elements,
            connectors,
            phases,
            metrics: outcome.metrics.clone(),
        }
    }
}

/// Writes the outcome as pretty JSON to `path`, or stdout when no path is
/// given.
pub fn write_layout_dump(path: Option<&Path>, outcome: &LayoutOutcome) -> anyhow::Result<()> {
    let dump = LayoutDump::from_outcome(outcome);
    match path {
        Some(path) => {
            let file = File::create(path)?;
            let writer = BufWriter::new(file);
            serde_json::to_writer_pretty(writer, &dump)?;
        }
        None => {
            let stdout = io::stdout();
            let mut writer = BufWriter::new(stdout.lock());
            serde_json::to_writer_pretty(&mut writer, &dump)?;
            writeln!(writer)?;
        }
    }
    Ok(())
}
