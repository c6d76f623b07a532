use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use super::branch::{bend_count, optimize_path, path_length};
use super::context::LayoutContext;
use super::diagnostics::PhaseReport;
use super::error::LayoutError;
use super::geometry::{Bounds, Point, EPSILON};
use super::hooks::ordered_others;
use super::pipeline::LayoutPhase;
use super::types::{Cardinal, Connector, ConnectorRoute, HookAssignment, Placement};
use crate::config::RouteStyle;

// ── Leg construction ────────────────────────────────────────────────

/// Right-angle route from `a` to `b`. The first leg runs along the axis
/// with the larger displacement. One bend is used when the end side is
/// perpendicular to that leg, two bends through the midpoint otherwise.
pub fn orthogonal_route(a: Point, b: Point, end_side: Cardinal) -> Vec<Point> {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    if dx.abs() <= EPSILON || dy.abs() <= EPSILON {
        return vec![a, b];
    }
    if dx.abs() >= dy.abs() {
        if end_side.is_horizontal() {
            let mx = (a.x + b.x) / 2.0;
            vec![a, Point::new(mx, a.y), Point::new(mx, b.y), b]
        } else {
            vec![a, Point::new(b.x, a.y), b]
        }
    } else if end_side.is_horizontal() {
        vec![a, Point::new(a.x, b.y), b]
    } else {
        let my = (a.y + b.y) / 2.0;
        vec![a, Point::new(a.x, my), Point::new(b.x, my), b]
    }
}

/// Leg between two consecutive endpoints of a multi-endpoint connector,
/// bent through the midpoint.
fn midpoint_leg(a: Point, b: Point, style: RouteStyle) -> Vec<Point> {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    if style == RouteStyle::Straight || dx.abs() <= EPSILON || dy.abs() <= EPSILON {
        return vec![a, b];
    }
    if dx.abs() >= dy.abs() {
        let mx = (a.x + b.x) / 2.0;
        vec![a, Point::new(mx, a.y), Point::new(mx, b.y), b]
    } else {
        let my = (a.y + b.y) / 2.0;
        vec![a, Point::new(a.x, my), Point::new(b.x, my), b]
    }
}

// ── Connector routing ───────────────────────────────────────────────

/// Raw polyline through the connector's hook points. Endpoints without a
/// hook are skipped.
pub fn route_connector(
    connector: &Connector,
    hooks: &HookAssignment,
    placements: &BTreeMap<String, Placement>,
    style: RouteStyle,
) -> Vec<Point> {
    let Some(hub) = hooks.get(&connector.id, &connector.hub) else {
        return Vec::new();
    };
    let others = ordered_others(connector, placements);

    if others.len() == 1 {
        let Some(end) = hooks.get(&connector.id, &others[0].0) else {
            return Vec::new();
        };
        return match style {
            RouteStyle::Straight => vec![hub.point, end.point],
            RouteStyle::Rectilinear => orthogonal_route(hub.point, end.point, end.cardinal),
        };
    }

    let mut chain = vec![hub.point];
    chain.extend(
        others
            .iter()
            .filter_map(|(id, _)| hooks.get(&connector.id, id).map(|hook| hook.point)),
    );
    let mut path: Vec<Point> = Vec::new();
    for pair in chain.windows(2) {
        let leg = midpoint_leg(pair[0], pair[1], style);
        let skip = usize::from(!path.is_empty());
        path.extend(leg.into_iter().skip(skip));
    }
    path
}

/// Hook points of the connector, which the optimizer must keep.
fn pinned_points(connector: &Connector, hooks: &HookAssignment) -> Vec<Point> {
    connector
        .endpoints
        .iter()
        .filter_map(|id| hooks.get(&connector.id, id).map(|hook| hook.point))
        .collect()
}

/// Corridor rectangles around each leg of `path`.
pub fn corridors(path: &[Point], half_width: (f32, f32)) -> Vec<Bounds> {
    path.windows(2)
        .filter_map(|pair| Bounds::from_points(pair))
        .map(|bounds| bounds.inflate(half_width.0, half_width.1))
        .collect()
}

pub(super) struct RoutingPhase;

impl LayoutPhase for RoutingPhase {
    fn name(&self) -> &'static str {
        "routing"
    }

    fn depends_on(&self) -> &'static [&'static str] {
        &["hooks"]
    }

    fn run(&self, ctx: &mut LayoutContext<'_>, _report: &mut PhaseReport) -> Result<(), LayoutError> {
        refresh_routes(ctx);
        Ok(())
    }
}

/// Routes every connector, reserves its corridors in the enclosing area and
/// updates the routing metrics.
pub(super) fn refresh_routes(ctx: &mut LayoutContext<'_>) {
    let style = ctx.config.routing.style;
    let half = ctx.config.routing.corridor_width / 2.0;
    let half = (ctx.scale.to_unit_x(half), ctx.scale.to_unit_y(half));

    ctx.spatial.clear_reserved();
    ctx.routes.clear();
    let mut bends = 0;
    let mut length = 0.0;
    let mut crossings = 0;

    for connector in &ctx.connectors {
        let raw = route_connector(connector, &ctx.hooks, &ctx.placements, style);
        let path = optimize_path(&raw, &pinned_points(connector, &ctx.hooks));
        bends += bend_count(&path);
        length += path_length(&path);

        let lanes = corridors(&path, half);
        let endpoints: BTreeSet<&str> = connector.endpoints.iter().map(String::as_str).collect();
        for (id, placement) in &ctx.placements {
            if endpoints.contains(id.as_str()) {
                continue;
            }
            if lanes.iter().any(|lane| lane.intersects(&placement.body)) {
                crossings += 1;
            }
        }
        for lane in lanes {
            ctx.spatial.reserve_region(&connector.parent_area, lane);
        }
        debug!(connector = %connector.id, points = path.len(), "routed connector");
        ctx.routes.insert(connector.id.clone(), ConnectorRoute { path });
    }

    ctx.metrics.connector_bends = bends;
    ctx.metrics.connector_length = length;
    ctx.metrics.connector_element_crossings = crossings;
}
