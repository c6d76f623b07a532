use std::collections::BTreeMap;

use serde::Serialize;

use super::context::LayoutContext;
use super::geometry::{AffineMap, Bounds, Point};
use super::types::{Cardinal, LayoutKind};
use crate::config::{CoordinateSpace, RenderConfig};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayoutElement {
    pub id: String,
    pub kind: LayoutKind,
    /// Anchor point: the center for boxes, the first path point for
    /// connectors.
    pub position: Point,
    pub bounds: Bounds,
    /// Body plus clearance, leaf elements only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footprint: Option<Bounds>,
    pub parent_area: Option<String>,
    pub z: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<Point>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub endpoints: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HookRecord {
    pub connector: String,
    pub element: String,
    pub cardinal: Cardinal,
    pub point: Point,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayoutOutput {
    pub space: CoordinateSpace,
    pub width: f32,
    pub height: f32,
    pub elements: BTreeMap<String, LayoutElement>,
    /// Containers by depth, then tree order.
    pub container_order: Vec<String>,
    pub hooks: Vec<HookRecord>,
}

impl LayoutOutput {
    pub fn element(&self, id: &str) -> Option<&LayoutElement> {
        self.elements.get(id)
    }

    pub fn of_kind(&self, kind: LayoutKind) -> impl Iterator<Item = &LayoutElement> {
        self.elements.values().filter(move |element| element.kind == kind)
    }
}

/// Map from unit space to the requested output space. Absolute output
/// places the root's top-left at the origin and scales down uniformly when
/// the root does not fit the canvas.
fn output_map(ctx: &LayoutContext<'_>, render: &RenderConfig) -> (AffineMap, f32, f32) {
    match render.space {
        CoordinateSpace::Unit => (AffineMap::identity(), 1.0, 1.0),
        CoordinateSpace::Absolute => {
            let root = ctx
                .container_bounds(&ctx.hierarchy.root)
                .unwrap_or(Bounds::unit());
            let world = ctx.scale.bounds_to_world(&root);
            let fit = if world.width() > 0.0 && world.height() > 0.0 {
                (render.width / world.width())
                    .min(render.height / world.height())
                    .min(1.0)
            } else {
                1.0
            };
            let map = AffineMap {
                sx: ctx.scale.width * fit,
                sy: ctx.scale.height * fit,
                tx: -world.left * fit,
                ty: -world.top * fit,
            };
            (map, render.width, render.height)
        }
    }
}

/// Collects everything placed so far. Items a failed run never reached are
/// left out.
pub fn build_output(ctx: &LayoutContext<'_>, render: &RenderConfig) -> LayoutOutput {
    let (map, width, height) = output_map(ctx, render);
    let max_depth = ctx.hierarchy.max_depth();
    let mut elements = BTreeMap::new();

    let container_order: Vec<String> = ctx
        .hierarchy
        .processing_rank()
        .into_iter()
        .filter(|id| ctx.container_bounds(id).is_some())
        .collect();
    for id in &container_order {
        let Some(info) = ctx.hierarchy.container(id) else {
            continue;
        };
        let Some(bounds) = info.bounds else {
            continue;
        };
        let bounds = map.apply_bounds(&bounds);
        elements.insert(
            id.clone(),
            LayoutElement {
                id: id.clone(),
                kind: LayoutKind::Container,
                position: bounds.center(),
                bounds,
                footprint: None,
                parent_area: info.parent_id.clone(),
                z: info.depth,
                path: Vec::new(),
                endpoints: Vec::new(),
            },
        );
    }

    for (id, placement) in &ctx.placements {
        let bounds = map.apply_bounds(&placement.body);
        elements.insert(
            id.clone(),
            LayoutElement {
                id: id.clone(),
                kind: ctx.kind_of(id).into(),
                position: bounds.center(),
                bounds,
                footprint: Some(map.apply_bounds(&placement.footprint)),
                parent_area: ctx.hierarchy.element_owner.get(id).cloned(),
                z: max_depth + 2,
                path: Vec::new(),
                endpoints: Vec::new(),
            },
        );
    }

    for connector in &ctx.connectors {
        let Some(route) = ctx.routes.get(&connector.id) else {
            continue;
        };
        let path: Vec<Point> = route.path.iter().map(|point| map.apply(*point)).collect();
        let Some(bounds) = Bounds::from_points(&path) else {
            continue;
        };
        elements.insert(
            connector.id.clone(),
            LayoutElement {
                id: connector.id.clone(),
                kind: LayoutKind::Connector,
                position: path[0],
                bounds,
                footprint: None,
                parent_area: Some(connector.parent_area.clone()),
                z: max_depth + 1,
                path,
                endpoints: connector.endpoints.clone(),
            },
        );
    }

    let hooks = ctx
        .hooks
        .iter()
        .map(|((connector, element), hook)| HookRecord {
            connector: connector.clone(),
            element: element.clone(),
            cardinal: hook.cardinal,
            point: map.apply(hook.point),
        })
        .collect();

    LayoutOutput {
        space: render.space,
        width,
        height,
        elements,
        container_order,
        hooks,
    }
}
