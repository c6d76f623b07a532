use tracing::debug;

use super::context::LayoutContext;
use super::diagnostics::{DiagnosticKind, PhaseReport};
use super::error::LayoutError;
use super::geometry::{Bounds, Point, EPSILON};
use super::pipeline::LayoutPhase;

/// Push direction used when two centers coincide.
const DEFAULT_DIRECTION: (f32, f32) = (1.0, 0.0);

/// Zero-tolerance rectangle intersection.
pub fn bounds_overlap(a: &Bounds, b: &Bounds) -> bool {
    a.intersects(b)
}

#[derive(Debug, Clone, PartialEq)]
pub struct CollisionItem {
    pub id: String,
    /// Item this one is nested in, if it takes part in the same pass.
    pub owner: Option<String>,
    pub bounds: Bounds,
}

impl CollisionItem {
    fn nested_with(&self, other: &CollisionItem) -> bool {
        self.owner.as_deref() == Some(other.id.as_str())
            || other.owner.as_deref() == Some(self.id.as_str())
    }
}

/// Single relaxation pass: every overlapping pair that is not nested is
/// pushed apart along the line between centers, each by half of the
/// distance needed. Later pairs see the moves made by earlier ones. Returns
/// the number of pairs that were separated.
pub fn resolve_collisions(items: &mut [CollisionItem]) -> usize {
    let mut resolved = 0;
    for i in 0..items.len() {
        for j in (i + 1)..items.len() {
            let (a, b) = (items[i].bounds, items[j].bounds);
            if !bounds_overlap(&a, &b) || items[i].nested_with(&items[j]) {
                continue;
            }
            let (dx, dy) = push_direction(a.center(), b.center());
            let (ox, oy) = a.overlap_extent(&b);
            let need_x = if dx.abs() > EPSILON { ox / dx.abs() } else { f32::INFINITY };
            let need_y = if dy.abs() > EPSILON { oy / dy.abs() } else { f32::INFINITY };
            let half = need_x.min(need_y) / 2.0 + EPSILON;
            items[i].bounds = a.translate(-dx * half, -dy * half);
            items[j].bounds = b.translate(dx * half, dy * half);
            resolved += 1;
        }
    }
    resolved
}

fn push_direction(from: Point, to: Point) -> (f32, f32) {
    let dx = to.x - from.x;
    let dy = to.y - from.y;
    let len = (dx * dx + dy * dy).sqrt();
    if len <= EPSILON {
        return DEFAULT_DIRECTION;
    }
    (dx / len, dy / len)
}

/// Declutters each container's direct elements. Moves that would leave
/// the container or enter a nested container are undone.
pub(super) struct CollisionPhase;

impl LayoutPhase for CollisionPhase {
    fn name(&self) -> &'static str {
        "collisions"
    }

    fn depends_on(&self) -> &'static [&'static str] {
        &["positioning"]
    }

    fn run(&self, ctx: &mut LayoutContext<'_>, report: &mut PhaseReport) -> Result<(), LayoutError> {
        let mut remaining = 0;
        for container in ctx.hierarchy.pre_order() {
            let Some(info) = ctx.hierarchy.container(&container) else {
                continue;
            };
            let mut items: Vec<CollisionItem> = info
                .element_ids
                .iter()
                .filter_map(|id| {
                    ctx.placements.get(id).map(|placement| CollisionItem {
                        id: id.clone(),
                        owner: None,
                        bounds: placement.footprint,
                    })
                })
                .collect();
            if items.len() < 2 {
                continue;
            }
            let zones: Vec<Bounds> = info
                .children
                .iter()
                .filter_map(|child| ctx.container_bounds(child))
                .collect();
            let Some(available) = ctx
                .spatial
                .allocation(&container)
                .map(|allocation| allocation.available_bounds)
            else {
                continue;
            };

            let resolved = resolve_collisions(&mut items);
            ctx.metrics.collisions_resolved += resolved;

            for item in &items {
                let Some(placement) = ctx.placements.get_mut(&item.id) else {
                    continue;
                };
                if item.bounds == placement.footprint {
                    continue;
                }
                let moved = item.bounds.clamp_within(&available);
                if zones.iter().any(|zone| zone.intersects(&moved)) {
                    debug!(element = %item.id, "collision move reverted: enters nested container");
                    continue;
                }
                let dx = moved.left - placement.footprint.left;
                let dy = moved.top - placement.footprint.top;
                placement.translate(dx, dy);
                ctx.spatial
                    .register_element(&container, &item.id, placement.footprint);
            }

            let placed: Vec<(&String, Bounds)> = items
                .iter()
                .filter_map(|item| ctx.placements.get(&item.id).map(|p| (&item.id, p.footprint)))
                .collect();
            for (i, (a_id, a)) in placed.iter().enumerate() {
                for (b_id, b) in &placed[i + 1..] {
                    if bounds_overlap(a, b) {
                        remaining += 1;
                        report.warn(
                            DiagnosticKind::Collision,
                            format!("`{a_id}` and `{b_id}` still overlap"),
                            vec![(*a_id).clone(), (*b_id).clone()],
                        );
                    }
                }
            }
        }
        ctx.metrics.remaining_overlaps = remaining;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: &str, bounds: Bounds) -> CollisionItem {
        CollisionItem {
            id: id.to_string(),
            owner: None,
            bounds,
        }
    }

    #[test]
    fn overlap_has_zero_tolerance() {
        let a = Bounds::new(0.0, 0.0, 1.0, 1.0);
        assert!(!bounds_overlap(&a, &Bounds::new(1.0, 0.0, 2.0, 1.0)));
        assert!(bounds_overlap(&a, &Bounds::new(0.999, 0.0, 2.0, 1.0)));
    }

    #[test]
    fn overlapping_pair_is_pushed_apart_symmetrically() {
        let mut items = vec![
            item("a", Bounds::new(0.0, 0.0, 2.0, 2.0)),
            item("b", Bounds::new(1.0, 0.0, 3.0, 2.0)),
        ];
        assert_eq!(resolve_collisions(&mut items), 1);
        assert!(!bounds_overlap(&items[0].bounds, &items[1].bounds));
        assert!((items[0].bounds.left + 0.5).abs() < 1e-3);
        assert!((items[1].bounds.left - 1.5).abs() < 1e-3);
    }

    #[test]
    fn coincident_centers_use_default_direction() {
        let mut items = vec![
            item("a", Bounds::new(0.0, 0.0, 2.0, 1.0)),
            CollisionItem {
                owner: Some("a".to_string()),
                ..item("b", Bounds::new(0.5, 0.0, 1.5, 1.0))
            },
            item("c", Bounds::new(5.0, 0.0, 6.0, 1.0)),
            item("d", Bounds::new(5.0, 0.0, 6.0, 1.0)),
        ];
        // b is nested in a: left alone
        let resolved = resolve_collisions(&mut items);
        assert_eq!(resolved, 1);
        assert_eq!(items[0].bounds, Bounds::new(0.0, 0.0, 2.0, 1.0));
        assert!(items[2].bounds.left < 5.0);
        assert!(items[3].bounds.left > 5.0);
        assert!((items[2].bounds.top).abs() < 1e-6);
    }

    #[test]
    fn diagonal_push_uses_cheaper_axis() {
        let mut items = vec![
            item("a", Bounds::new(0.0, 0.0, 2.0, 2.0)),
            item("b", Bounds::new(1.0, 1.9, 3.0, 3.9)),
        ];
        resolve_collisions(&mut items);
        assert!(!bounds_overlap(&items[0].bounds, &items[1].bounds));
    }
}
