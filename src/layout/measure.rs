use std::collections::BTreeMap;

use tracing::debug;

use super::context::LayoutContext;
use super::diagnostics::PhaseReport;
use super::error::LayoutError;
use super::pipeline::LayoutPhase;
use super::text::{average_char_width, measure_text};
use super::types::ElementDimensions;
use crate::config::MeasureConfig;
use crate::ir::{ElementKind, ElementSpec};

/// Intrinsic size and clearance of a leaf element. Never fails: empty or
/// unknown text falls back to default metrics.
pub fn measure_element(spec: &ElementSpec, config: &MeasureConfig) -> ElementDimensions {
    match spec.kind {
        ElementKind::Vertex => measure_vertex(&spec.text, config),
        ElementKind::Predicate => measure_predicate(&spec.text, config),
    }
}

fn measure_vertex(name: &str, config: &MeasureConfig) -> ElementDimensions {
    let diameter = config.vertex_diameter;
    let label = measure_text(name, config);
    if label.lines.is_empty() {
        return ElementDimensions {
            width: diameter,
            height: diameter,
            clearance_width: 0.0,
            clearance_height: 0.0,
        };
    }
    ElementDimensions {
        width: diameter,
        height: diameter,
        clearance_width: (label.width - diameter).max(0.0),
        clearance_height: config.vertex_label_gap + label.height,
    }
}

fn measure_predicate(text: &str, config: &MeasureConfig) -> ElementDimensions {
    let label = measure_text(text, config);
    let (text_w, text_h) = if label.lines.is_empty() {
        (
            average_char_width(config.font_size) * config.empty_text_chars.max(1) as f32,
            config.font_size * config.line_height,
        )
    } else {
        (label.width, label.height)
    };
    ElementDimensions {
        width: text_w + config.predicate_padding_x * 2.0,
        height: text_h + config.predicate_padding_y * 2.0,
        clearance_width: config.hook_clearance * 2.0,
        clearance_height: 0.0,
    }
}

pub(super) struct MeasurePhase;

impl LayoutPhase for MeasurePhase {
    fn name(&self) -> &'static str {
        "measure"
    }

    fn depends_on(&self) -> &'static [&'static str] {
        &[]
    }

    fn run(&self, ctx: &mut LayoutContext<'_>, _report: &mut PhaseReport) -> Result<(), LayoutError> {
        let mut dimensions = BTreeMap::new();
        for (id, spec) in &ctx.graph.elements {
            let dims = measure_element(spec, &ctx.config.measure);
            debug!(element = %id, width = dims.total_width(), height = dims.total_height(), "measured element");
            dimensions.insert(id.clone(), dims);
        }
        ctx.dimensions = dimensions;
        Ok(())
    }
}
