use std::collections::BTreeMap;

use super::diagnostics::QualityMetrics;
use super::geometry::{Bounds, Point, UnitScale};
use super::hierarchy::Hierarchy;
use super::spatial::SpatialAwareness;
use super::types::{Connector, ConnectorRoute, ElementDimensions, HookAssignment, Placement};
use crate::config::LayoutConfig;
use crate::ir::{ElementKind, LogicalGraph};

/// State shared by the phases of one run. Owned by the engine and handed to
/// each phase in turn; nothing in it outlives the run.
pub struct LayoutContext<'a> {
    pub graph: &'a LogicalGraph,
    pub config: &'a LayoutConfig,
    /// Output canvas size in pixels; the working world is never smaller.
    pub canvas: (f32, f32),
    pub hierarchy: Hierarchy,
    pub connectors: Vec<Connector>,
    pub dimensions: BTreeMap<String, ElementDimensions>,
    pub spatial: SpatialAwareness,
    pub scale: UnitScale,
    /// Preferred element centers suggested by the sizer (unit space).
    pub node_hints: BTreeMap<String, Point>,
    pub placements: BTreeMap<String, Placement>,
    pub hooks: HookAssignment,
    pub routes: BTreeMap<String, ConnectorRoute>,
    pub metrics: QualityMetrics,
}

impl<'a> LayoutContext<'a> {
    pub fn new(
        graph: &'a LogicalGraph,
        config: &'a LayoutConfig,
        canvas: (f32, f32),
        hierarchy: Hierarchy,
        connectors: Vec<Connector>,
    ) -> Self {
        let metrics = QualityMetrics {
            containers: hierarchy.containers.len(),
            elements: hierarchy.element_owner.len(),
            connectors: connectors.len(),
            ..QualityMetrics::default()
        };
        Self {
            graph,
            config,
            canvas,
            hierarchy,
            connectors,
            dimensions: BTreeMap::new(),
            spatial: SpatialAwareness::new(config),
            scale: UnitScale::default(),
            node_hints: BTreeMap::new(),
            placements: BTreeMap::new(),
            hooks: HookAssignment::default(),
            routes: BTreeMap::new(),
            metrics,
        }
    }

    pub fn kind_of(&self, element: &str) -> ElementKind {
        self.graph
            .elements
            .get(element)
            .map(|spec| spec.kind)
            .unwrap_or(ElementKind::Vertex)
    }

    pub fn container_bounds(&self, id: &str) -> Option<Bounds> {
        self.hierarchy.container(id).and_then(|info| info.bounds)
    }

    pub fn set_container_bounds(&mut self, id: &str, bounds: Bounds) {
        if let Some(info) = self.hierarchy.containers.get_mut(id) {
            info.bounds = Some(bounds);
        }
    }

    /// Body rectangle of a placed element.
    pub fn element_body(&self, element: &str) -> Option<Bounds> {
        self.placements.get(element).map(|placement| placement.body)
    }

    /// Padding in unit space, per axis.
    pub fn unit_padding(&self) -> (f32, f32) {
        (
            self.scale.to_unit_x(self.config.padding),
            self.scale.to_unit_y(self.config.padding),
        )
    }

    pub fn unit_gap(&self) -> (f32, f32) {
        (
            self.scale.to_unit_x(self.config.element_gap),
            self.scale.to_unit_y(self.config.element_gap),
        )
    }
}
