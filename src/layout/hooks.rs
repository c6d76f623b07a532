use std::collections::BTreeMap;

use tracing::debug;

use super::context::LayoutContext;
use super::diagnostics::PhaseReport;
use super::error::LayoutError;
use super::geometry::{Bounds, Point};
use super::pipeline::LayoutPhase;
use super::types::{Cardinal, Connector, Hook, HookAssignment, Placement};

/// Center used for an endpoint that was never placed.
const UNPLACED: Point = Point { x: 0.5, y: 0.5 };

fn body_of(placements: &BTreeMap<String, Placement>, id: &str) -> Bounds {
    placements
        .get(id)
        .map(|placement| placement.body)
        .unwrap_or(Bounds::from_center(UNPLACED, 0.0, 0.0))
}

/// Non-hub endpoints sorted by angle around the hub, ties by id.
pub fn ordered_others(
    connector: &Connector,
    placements: &BTreeMap<String, Placement>,
) -> Vec<(String, f32)> {
    let hub = body_of(placements, &connector.hub).center();
    let mut others: Vec<(String, f32)> = connector
        .others()
        .map(|id| (id.clone(), hub.angle_to(body_of(placements, id).center())))
        .collect();
    others.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
    others
}

/// Angle from the hub towards the connector's far side: the other endpoint,
/// or the centroid of all others.
fn connector_angle(connector: &Connector, placements: &BTreeMap<String, Placement>) -> f32 {
    let hub = body_of(placements, &connector.hub).center();
    let (sum_x, sum_y, n) = connector.others().fold((0.0, 0.0, 0usize), |(x, y, n), id| {
        let c = body_of(placements, id).center();
        (x + c.x, y + c.y, n + 1)
    });
    if n == 0 {
        return 0.0;
    }
    hub.angle_to(Point::new(sum_x / n as f32, sum_y / n as f32))
}

fn hook_on(body: &Bounds, cardinal: Cardinal, ring: (f32, f32)) -> Hook {
    let point = if body.is_degenerate() {
        let (dx, dy) = cardinal.direction();
        body.center().translate(dx * ring.0, dy * ring.1)
    } else {
        cardinal.point_on(body)
    };
    Hook { cardinal, point }
}

/// Side of `from` facing `to` along the dominant axis.
fn facing(from: Point, to: Point) -> Cardinal {
    let dx = to.x - from.x;
    let dy = to.y - from.y;
    if dx.abs() >= dy.abs() {
        if dx >= 0.0 { Cardinal::East } else { Cardinal::West }
    } else if dy > 0.0 {
        Cardinal::South
    } else {
        Cardinal::North
    }
}

/// Gives every connector endpoint exactly one hook. Connectors sharing a hub
/// are sorted by angle and take cardinals in E, S, W, N rotation starting
/// from the side nearest the first one; past four they wrap around. A lone
/// connector pointing north therefore gets N, not E.
/// `ring` is the fallback offset used for elements without real bounds.
pub fn assign_hooks(
    connectors: &[Connector],
    placements: &BTreeMap<String, Placement>,
    ring: (f32, f32),
) -> HookAssignment {
    let mut by_hub: BTreeMap<&str, Vec<(f32, &Connector)>> = BTreeMap::new();
    for connector in connectors {
        by_hub
            .entry(connector.hub.as_str())
            .or_default()
            .push((connector_angle(connector, placements), connector));
    }

    let mut hooks = HookAssignment::default();
    for (hub, mut group) in by_hub {
        group.sort_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.id.cmp(&b.1.id)));
        let start = group
            .first()
            .map(|(angle, _)| Cardinal::from_angle(*angle).rotation_index())
            .unwrap_or(0);
        let hub_body = body_of(placements, hub);

        for (k, (_, connector)) in group.iter().enumerate() {
            let cardinal = Cardinal::ROTATION[(start + k) % Cardinal::ROTATION.len()];
            hooks.insert(&connector.id, hub, hook_on(&hub_body, cardinal, ring));
            for other in connector.others() {
                let body = body_of(placements, other);
                let side = facing(body.center(), hub_body.center());
                hooks.insert(&connector.id, other, hook_on(&body, side, ring));
            }
            debug!(connector = %connector.id, hub = %hub, cardinal = ?cardinal, "assigned hub hook");
        }
    }
    hooks
}

pub(super) struct HookPhase;

impl LayoutPhase for HookPhase {
    fn name(&self) -> &'static str {
        "hooks"
    }

    fn depends_on(&self) -> &'static [&'static str] {
        &["collisions"]
    }

    fn run(&self, ctx: &mut LayoutContext<'_>, _report: &mut PhaseReport) -> Result<(), LayoutError> {
        refresh_hooks(ctx);
        Ok(())
    }
}

pub(super) fn refresh_hooks(ctx: &mut LayoutContext<'_>) {
    let ring = (
        ctx.scale.to_unit_x(ctx.config.hooks.ring_offset),
        ctx.scale.to_unit_y(ctx.config.hooks.ring_offset),
    );
    ctx.hooks = assign_hooks(&ctx.connectors, &ctx.placements, ring);
    ctx.metrics.hooks_assigned = ctx.hooks.len();
}
