//! Container sizing: assigns every container its bounds in unit space.

mod containment;
mod external;
mod proportional;

pub use containment::{enforce_containment, validate_containment};
pub use external::{ExternalToolSizer, build_dot_request, parse_dot_layout};
pub use proportional::ProportionalSizer;

use std::collections::BTreeMap;

use tracing::{info, warn};

use super::context::LayoutContext;
use super::diagnostics::{DiagnosticKind, PhaseReport, SizingStrategy};
use super::error::{ExternalToolError, LayoutError};
use super::geometry::{Bounds, Point, UnitScale};
use super::hierarchy::Hierarchy;
use super::pipeline::LayoutPhase;
use super::spatial::SpatialAwareness;
use super::types::{Connector, ElementDimensions};
use crate::config::LayoutConfig;

/// Everything a sizing strategy may look at.
pub struct SizingRequest<'a> {
    pub hierarchy: &'a Hierarchy,
    pub spatial: &'a SpatialAwareness,
    pub dimensions: &'a BTreeMap<String, ElementDimensions>,
    pub connectors: &'a [Connector],
    pub config: &'a LayoutConfig,
    pub canvas: (f32, f32),
}

impl SizingRequest<'_> {
    /// World size of the unit square: the canvas, grown when the root's
    /// preferred size does not fit.
    pub fn working_scale(&self) -> UnitScale {
        let (mut width, mut height) = self.canvas;
        if let Some(req) = self.spatial.requirement(&self.hierarchy.root) {
            width = width.max(req.preferred_width);
            height = height.max(req.preferred_height);
        }
        UnitScale::new(width, height)
    }
}

#[derive(Debug, Clone)]
pub struct Allocation {
    pub bounds: BTreeMap<String, Bounds>,
    pub scale: UnitScale,
    /// Element centers proposed by the strategy, unit space.
    pub node_hints: BTreeMap<String, Point>,
    pub strategy: SizingStrategy,
    pub containers_shrunk: usize,
}

/// Strategy that turns requirements into container bounds.
pub trait ClusterSizer {
    fn name(&self) -> &'static str;

    fn allocate(&self, request: &SizingRequest<'_>) -> Result<Allocation, ExternalToolError>;
}

/// The sheet alone takes the unit square.
pub fn direct_allocation(request: &SizingRequest<'_>) -> Allocation {
    let mut bounds = BTreeMap::new();
    bounds.insert(request.hierarchy.root.clone(), Bounds::unit());
    Allocation {
        bounds,
        scale: request.working_scale(),
        node_hints: BTreeMap::new(),
        strategy: SizingStrategy::Direct,
        containers_shrunk: 0,
    }
}

pub(super) struct SizingPhase<'s> {
    pub(super) sizer: &'s dyn ClusterSizer,
}

impl LayoutPhase for SizingPhase<'_> {
    fn name(&self) -> &'static str {
        "sizing"
    }

    fn depends_on(&self) -> &'static [&'static str] {
        &["requirements"]
    }

    fn run(&self, ctx: &mut LayoutContext<'_>, report: &mut PhaseReport) -> Result<(), LayoutError> {
        let request = SizingRequest {
            hierarchy: &ctx.hierarchy,
            spatial: &ctx.spatial,
            dimensions: &ctx.dimensions,
            connectors: &ctx.connectors,
            config: ctx.config,
            canvas: ctx.canvas,
        };

        let allocation = if !ctx.hierarchy.has_nesting() {
            direct_allocation(&request)
        } else {
            match self.sizer.allocate(&request) {
                Ok(allocation) => allocation,
                Err(err) => {
                    warn!(sizer = self.sizer.name(), error = %err, "sizer failed, using proportional allocation");
                    report.warn(
                        DiagnosticKind::ExternalTool,
                        format!("{} sizer failed: {err}", self.sizer.name()),
                        Vec::new(),
                    );
                    ctx.metrics.external_tool_failures += 1;
                    ProportionalSizer.compute(&request)
                }
            }
        };

        info!(
            strategy = ?allocation.strategy,
            width = allocation.scale.width,
            height = allocation.scale.height,
            "containers sized"
        );
        for (id, bounds) in &allocation.bounds {
            ctx.set_container_bounds(id, *bounds);
        }
        ctx.scale = allocation.scale;
        ctx.node_hints = allocation.node_hints;
        ctx.metrics.sizing_strategy = Some(allocation.strategy);
        ctx.metrics.containers_shrunk = allocation.containers_shrunk;

        let padding = ctx.unit_padding();
        let corrections = enforce_containment(
            &mut ctx.hierarchy,
            padding,
            ctx.config.sizing.containment_retries,
        )?;
        if corrections > 0 {
            report.info(
                DiagnosticKind::ContainmentViolation,
                format!("corrected {corrections} container placement(s)"),
                Vec::new(),
            );
        }
        ctx.metrics.containment_corrections += corrections;
        validate_containment(&ctx.hierarchy, padding)?;

        ctx.spatial.initialize_from_containers(&ctx.hierarchy, ctx.scale);
        Ok(())
    }
}
