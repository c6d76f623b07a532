use serde::Serialize;
use std::collections::BTreeMap;

use super::geometry::{Bounds, Point, UnitScale};
use crate::ir::ElementKind;

/// One node of the container tree. Parent and children are stored as ids.
#[derive(Debug, Clone, Serialize)]
pub struct ContainerInfo {
    pub id: String,
    pub parent_id: Option<String>,
    /// Nested containers in area order.
    pub children: Vec<String>,
    /// Direct leaf members in area order.
    pub element_ids: Vec<String>,
    pub depth: usize,
    pub bounds: Option<Bounds>,
}

impl ContainerInfo {
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ElementDimensions {
    pub width: f32,
    pub height: f32,
    pub clearance_width: f32,
    pub clearance_height: f32,
}

impl ElementDimensions {
    pub fn total_width(&self) -> f32 {
        self.width + self.clearance_width
    }

    pub fn total_height(&self) -> f32 {
        self.height + self.clearance_height
    }

    /// Footprint size in unit space.
    pub fn unit_size(&self, scale: &UnitScale) -> (f32, f32) {
        (
            scale.to_unit_x(self.total_width()),
            scale.to_unit_y(self.total_height()),
        )
    }

    /// Body rectangle of an element occupying `footprint`. Vertices keep
    /// their label clearance below the body; predicates split the hook
    /// clearance evenly on both sides.
    pub fn body_within(&self, kind: ElementKind, footprint: &Bounds, scale: &UnitScale) -> Bounds {
        let w = scale.to_unit_x(self.width);
        let h = scale.to_unit_y(self.height);
        let center = footprint.center();
        match kind {
            ElementKind::Vertex => {
                Bounds::new(center.x - w / 2.0, footprint.top, center.x + w / 2.0, footprint.top + h)
            }
            ElementKind::Predicate => Bounds::from_center(center, w, h),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpaceRequirement {
    pub min_width: f32,
    pub min_height: f32,
    pub preferred_width: f32,
    pub preferred_height: f32,
    pub content_elements: Vec<String>,
    pub child_containers: Vec<String>,
}

impl SpaceRequirement {
    pub fn min_area(&self) -> f32 {
        self.min_width * self.min_height
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OccupiedRegion {
    pub id: String,
    pub bounds: Bounds,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpaceAllocation {
    pub total_bounds: Bounds,
    pub available_bounds: Bounds,
    pub occupied_regions: Vec<OccupiedRegion>,
    pub reserved_regions: Vec<Bounds>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Cardinal {
    #[serde(rename = "N")]
    North,
    #[serde(rename = "E")]
    East,
    #[serde(rename = "S")]
    South,
    #[serde(rename = "W")]
    West,
}

impl Cardinal {
    /// Assignment order around a hub, clockwise in screen space.
    pub const ROTATION: [Cardinal; 4] = [
        Cardinal::East,
        Cardinal::South,
        Cardinal::West,
        Cardinal::North,
    ];

    pub fn rotation_index(self) -> usize {
        match self {
            Cardinal::East => 0,
            Cardinal::South => 1,
            Cardinal::West => 2,
            Cardinal::North => 3,
        }
    }

    /// Nearest cardinal for a screen-space angle in `[0, 2π)`.
    pub fn from_angle(angle: f32) -> Cardinal {
        let quarter = std::f32::consts::FRAC_PI_2;
        let idx = ((angle + quarter / 2.0) / quarter).floor() as i64;
        Self::ROTATION[idx.rem_euclid(4) as usize]
    }

    pub fn direction(self) -> (f32, f32) {
        match self {
            Cardinal::North => (0.0, -1.0),
            Cardinal::East => (1.0, 0.0),
            Cardinal::South => (0.0, 1.0),
            Cardinal::West => (-1.0, 0.0),
        }
    }

    pub fn is_horizontal(self) -> bool {
        matches!(self, Cardinal::East | Cardinal::West)
    }

    /// Midpoint of the matching side of `bounds`.
    pub fn point_on(self, bounds: &Bounds) -> Point {
        let center = bounds.center();
        match self {
            Cardinal::North => Point::new(center.x, bounds.top),
            Cardinal::East => Point::new(bounds.right, center.y),
            Cardinal::South => Point::new(center.x, bounds.bottom),
            Cardinal::West => Point::new(bounds.left, center.y),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Hook {
    pub cardinal: Cardinal,
    pub point: Point,
}

/// `(connector_id, endpoint_id)` → hook.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HookAssignment {
    hooks: BTreeMap<(String, String), Hook>,
}

impl HookAssignment {
    pub fn insert(&mut self, connector: &str, endpoint: &str, hook: Hook) {
        self.hooks
            .insert((connector.to_string(), endpoint.to_string()), hook);
    }

    pub fn get(&self, connector: &str, endpoint: &str) -> Option<&Hook> {
        self.hooks.get(&(connector.to_string(), endpoint.to_string()))
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&(String, String), &Hook)> {
        self.hooks.iter()
    }

    pub fn translate_element(&mut self, endpoint: &str, dx: f32, dy: f32) {
        for ((_, owner), hook) in self.hooks.iter_mut() {
            if owner == endpoint {
                hook.point = hook.point.translate(dx, dy);
            }
        }
    }

    pub fn clear(&mut self) {
        self.hooks.clear();
    }
}

/// A connector (ligature) joining two or more leaf elements.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Connector {
    pub id: String,
    pub endpoints: Vec<String>,
    /// Element the connector's hooks are distributed around.
    pub hub: String,
    /// Deepest container enclosing every endpoint.
    pub parent_area: String,
}

impl Connector {
    pub fn others(&self) -> impl Iterator<Item = &String> {
        self.endpoints.iter().filter(move |id| **id != self.hub)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Placement {
    /// Body plus clearance; this is what must stay inside the container.
    pub footprint: Bounds,
    pub body: Bounds,
    pub fallback: bool,
}

impl Placement {
    pub fn translate(&mut self, dx: f32, dy: f32) {
        self.footprint = self.footprint.translate(dx, dy);
        self.body = self.body.translate(dx, dy);
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ConnectorRoute {
    pub path: Vec<Point>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LayoutKind {
    Container,
    Vertex,
    Predicate,
    Connector,
}

impl From<ElementKind> for LayoutKind {
    fn from(kind: ElementKind) -> Self {
        match kind {
            ElementKind::Vertex => LayoutKind::Vertex,
            ElementKind::Predicate => LayoutKind::Predicate,
        }
    }
}
