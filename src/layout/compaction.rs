use tracing::{debug, info};

use super::context::LayoutContext;
use super::diagnostics::{DiagnosticKind, PhaseReport};
use super::error::{ContainmentViolation, LayoutError};
use super::geometry::{Bounds, Point};
use super::hooks::refresh_hooks;
use super::pipeline::LayoutPhase;
use super::routing::refresh_routes;
use super::sizing::validate_containment;

/// Replaces every container's allocation with the tight box around its
/// realized content plus padding, deepest containers first.
pub(super) struct CompactionPhase;

impl LayoutPhase for CompactionPhase {
    fn name(&self) -> &'static str {
        "compaction"
    }

    fn depends_on(&self) -> &'static [&'static str] {
        &["routing"]
    }

    fn run(&self, ctx: &mut LayoutContext<'_>, report: &mut PhaseReport) -> Result<(), LayoutError> {
        let padding = ctx.unit_padding();
        let mut shifts = 0;

        for id in ctx.hierarchy.post_order() {
            let (children, elements) = match ctx.hierarchy.container(&id) {
                Some(info) => (info.children.clone(), info.element_ids.clone()),
                None => continue,
            };
            shifts += separate_children(ctx, &children)?;

            let content = children
                .iter()
                .filter_map(|child| ctx.container_bounds(child))
                .chain(
                    elements
                        .iter()
                        .filter_map(|element| ctx.placements.get(element).map(|p| p.footprint)),
                )
                .reduce(|acc, bounds| acc.union(&bounds));
            let bounds = match content {
                Some(content) => content.inflate(padding.0, padding.1),
                None => empty_bounds(ctx, &id),
            };
            debug!(container = %id, width = bounds.width(), height = bounds.height(), "compacted container");
            ctx.set_container_bounds(&id, bounds);
        }

        ctx.metrics.compaction_shifts = shifts;
        ctx.spatial.initialize_from_containers(&ctx.hierarchy, ctx.scale);
        for (element, owner) in &ctx.hierarchy.element_owner {
            if let Some(placement) = ctx.placements.get(element) {
                ctx.spatial.register_element(owner, element, placement.footprint);
            }
        }
        if shifts > 0 {
            info!(shifts, "containers shifted during compaction, rerouting");
            report.info(
                DiagnosticKind::Compaction,
                format!("shifted {shifts} container subtree(s) apart"),
                Vec::new(),
            );
            refresh_hooks(ctx);
        }
        refresh_routes(ctx);

        validate_containment(&ctx.hierarchy, padding)?;
        Ok(())
    }
}

/// Minimum-size box for a container with no content, centered in its
/// allocation and never larger than it.
fn empty_bounds(ctx: &LayoutContext<'_>, id: &str) -> Bounds {
    let (min_w, min_h) = ctx
        .spatial
        .requirement(id)
        .map(|req| (req.min_width, req.min_height))
        .unwrap_or((ctx.config.min_container_width, ctx.config.min_container_height));
    let (w, h) = (ctx.scale.to_unit_x(min_w), ctx.scale.to_unit_y(min_h));
    match ctx.container_bounds(id) {
        Some(allocated) => Bounds::from_center(
            allocated.center(),
            w.min(allocated.width()),
            h.min(allocated.height()),
        ),
        None => Bounds::from_center(Point::new(0.5, 0.5), w, h),
    }
}

/// Moves later siblings away from earlier ones until no two intersect.
/// Returns the number of shifts; fails when overlaps survive the retry
/// budget.
fn separate_children(
    ctx: &mut LayoutContext<'_>,
    children: &[String],
) -> Result<usize, ContainmentViolation> {
    let gap = ctx.unit_gap();
    let retries = ctx.config.sizing.containment_retries;
    let mut shifts = 0;

    for pass in 0..=retries {
        let mut moved = false;
        for i in 0..children.len() {
            for j in (i + 1)..children.len() {
                let (Some(a), Some(b)) = (
                    ctx.container_bounds(&children[i]),
                    ctx.container_bounds(&children[j]),
                ) else {
                    continue;
                };
                if !a.intersects(&b) || a.contains(&b) || b.contains(&a) {
                    continue;
                }
                if pass == retries {
                    return Err(ContainmentViolation::new(
                        &children[i],
                        Some(&children[j]),
                        "sibling containers still overlap after compaction",
                    ));
                }
                let (ox, oy) = a.overlap_extent(&b);
                let (ca, cb) = (a.center(), b.center());
                let (dx, dy) = if ox <= oy {
                    let sign = if cb.x >= ca.x { 1.0 } else { -1.0 };
                    (sign * (ox + gap.0), 0.0)
                } else {
                    let sign = if cb.y >= ca.y { 1.0 } else { -1.0 };
                    (0.0, sign * (oy + gap.1))
                };
                translate_subtree(ctx, &children[j], dx, dy);
                shifts += 1;
                moved = true;
            }
        }
        if !moved {
            break;
        }
    }
    Ok(shifts)
}

/// Moves a container with everything nested in it.
fn translate_subtree(ctx: &mut LayoutContext<'_>, root: &str, dx: f32, dy: f32) {
    for id in ctx.hierarchy.subtree(root) {
        if let Some(bounds) = ctx.container_bounds(&id) {
            ctx.set_container_bounds(&id, bounds.translate(dx, dy));
        }
    }
    for element in ctx.hierarchy.subtree_elements(root) {
        if let Some(placement) = ctx.placements.get_mut(&element) {
            placement.translate(dx, dy);
        }
        ctx.hooks.translate_element(&element, dx, dy);
    }
}
