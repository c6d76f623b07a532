//! Nested-container layout: containers are sized inside-out, elements are
//! placed without collisions, connectors get cardinal hooks and rectilinear
//! routes, and finally every area is compacted around its content.

mod branch;
mod collision;
mod compaction;
pub mod context;
pub mod diagnostics;
pub mod error;
pub mod geometry;
pub mod hierarchy;
mod hooks;
mod measure;
pub mod output;
pub mod pipeline;
mod positioning;
mod routing;
pub mod sizing;
pub mod spatial;
mod text;
pub mod types;

pub use branch::{bend_count, is_rectilinear, optimize_path, path_length};
pub use collision::{CollisionItem, bounds_overlap, resolve_collisions};
pub use context::LayoutContext;
pub use diagnostics::{
    Diagnostic, DiagnosticKind, PhaseReport, PhaseStatus, QualityMetrics, RunStatus, Severity,
    SizingStrategy,
};
pub use error::{ConfigError, ContainmentViolation, ExternalToolError, LayoutError};
pub use geometry::{AffineMap, Bounds, Point, UnitScale};
pub use hierarchy::{Hierarchy, derive_connectors, extract_hierarchy};
pub use hooks::{assign_hooks, ordered_others};
pub use measure::measure_element;
pub use output::{HookRecord, LayoutElement, LayoutOutput};
pub use pipeline::{LayoutEngine, LayoutOutcome, LayoutPhase, Pipeline};
pub use routing::{corridors, orthogonal_route, route_connector};
pub use sizing::{Allocation, ClusterSizer, ExternalToolSizer, ProportionalSizer, SizingRequest};
pub use types::*;

use crate::config::Config;
use crate::ir::LogicalGraph;

/// Runs the full pipeline with the strategy `config` selects.
pub fn compute_layout(graph: &LogicalGraph, config: &Config) -> Result<LayoutOutcome, ConfigError> {
    LayoutEngine::new(config.clone()).run(graph)
}
