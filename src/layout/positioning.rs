use tracing::{debug, warn};

use super::context::LayoutContext;
use super::diagnostics::{DiagnosticKind, PhaseReport};
use super::error::LayoutError;
use super::geometry::{Bounds, Point};
use super::pipeline::LayoutPhase;
use super::types::Placement;

enum Origin {
    Hint,
    Search,
    Fallback,
}

/// Places every leaf element inside its container's available bounds.
/// Containers are visited root first; elements in area order.
pub(super) struct PositioningPhase;

impl LayoutPhase for PositioningPhase {
    fn name(&self) -> &'static str {
        "positioning"
    }

    fn depends_on(&self) -> &'static [&'static str] {
        &["sizing"]
    }

    fn run(&self, ctx: &mut LayoutContext<'_>, report: &mut PhaseReport) -> Result<(), LayoutError> {
        ctx.placements.clear();
        let max_attempts = ctx.config.placement.max_attempts;

        for container in ctx.hierarchy.pre_order() {
            let elements = ctx
                .hierarchy
                .container(&container)
                .map(|info| info.element_ids.clone())
                .unwrap_or_default();
            for element in elements {
                let Some(dims) = ctx.dimensions.get(&element).copied() else {
                    continue;
                };
                let size = dims.unit_size(&ctx.scale);
                let (center, origin) = find_position(ctx, &container, &element, size, max_attempts);

                let footprint = Bounds::from_center(center, size.0, size.1);
                let body = dims.body_within(ctx.kind_of(&element), &footprint, &ctx.scale);
                match origin {
                    Origin::Hint => ctx.metrics.placed_by_hint += 1,
                    Origin::Search => ctx.metrics.placed_by_search += 1,
                    Origin::Fallback => {
                        ctx.metrics.fallback_placements += 1;
                        warn!(element = %element, container = %container, "no free position, using container center");
                        report.warn(
                            DiagnosticKind::SpacingExhausted,
                            format!("no free position for `{element}` in `{container}`, placed at center"),
                            vec![element.clone(), container.clone()],
                        );
                        flag_for_resize(ctx, &container, dims.total_width(), dims.total_height());
                    }
                }
                debug!(element = %element, x = center.x, y = center.y, "placed element");
                ctx.spatial.register_element(&container, &element, footprint);
                ctx.placements.insert(
                    element,
                    Placement {
                        footprint,
                        body,
                        fallback: matches!(origin, Origin::Fallback),
                    },
                );
            }
        }
        Ok(())
    }
}

fn find_position(
    ctx: &LayoutContext<'_>,
    container: &str,
    element: &str,
    size: (f32, f32),
    max_attempts: usize,
) -> (Point, Origin) {
    let available = ctx
        .spatial
        .allocation(container)
        .map(|allocation| allocation.available_bounds);

    if let (Some(hint), Some(available)) = (ctx.node_hints.get(element), available) {
        let footprint = Bounds::from_center(*hint, size.0, size.1);
        let (gx, gy) = ctx.unit_gap();
        let padded = footprint.inflate(gx / 2.0, gy / 2.0);
        let free = ctx
            .spatial
            .exclusion_zones(&ctx.hierarchy, container)
            .iter()
            .all(|zone| !zone.intersects(&padded));
        if free && available.contains(&footprint) {
            return (*hint, Origin::Hint);
        }
    }

    let candidates = ctx
        .spatial
        .available_positions(&ctx.hierarchy, container, size, max_attempts);
    if let Some(center) = candidates.first() {
        return (*center, Origin::Search);
    }

    let center = available
        .map(|bounds| {
            ctx.spatial
                .nearest_clear_of_children(&ctx.hierarchy, container, size)
                .unwrap_or_else(|| bounds.center())
        })
        .or_else(|| ctx.container_bounds(container).map(|bounds| bounds.center()))
        .unwrap_or(Point::new(0.5, 0.5));
    (center, Origin::Fallback)
}

/// Grows the container's requirement by one element and records every
/// container the change reached.
fn flag_for_resize(ctx: &mut LayoutContext<'_>, container: &str, width: f32, height: f32) {
    let Some(grown) = ctx.spatial.grown_requirement(container, width, height) else {
        return;
    };
    let affected = ctx
        .spatial
        .propagate_size_change(&ctx.hierarchy, &ctx.dimensions, container, grown);
    for id in affected {
        if !ctx.metrics.containers_flagged_for_resize.contains(&id) {
            ctx.metrics.containers_flagged_for_resize.push(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayoutConfig;
    use crate::ir::LogicalGraph;
    use crate::layout::geometry::UnitScale;
    use crate::layout::hierarchy::extract_hierarchy;
    use crate::layout::measure::MeasurePhase;
    use crate::layout::spatial::RequirementsPhase;

    fn graph() -> LogicalGraph {
        let mut graph = LogicalGraph::new("sheet");
        graph.add_container("C", "sheet");
        graph.add_predicate("C", "p", "Farmer");
        graph.add_predicate("C", "q", "Donkey");
        graph
    }

    fn prepared<'a>(graph: &'a LogicalGraph, config: &'a LayoutConfig, inner: Bounds) -> LayoutContext<'a> {
        let hierarchy = extract_hierarchy(graph).unwrap();
        let mut ctx = LayoutContext::new(graph, config, (1000.0, 1000.0), hierarchy, Vec::new());
        let mut report = PhaseReport::new("setup");
        MeasurePhase.run(&mut ctx, &mut report).unwrap();
        RequirementsPhase.run(&mut ctx, &mut report).unwrap();
        ctx.scale = UnitScale::new(1000.0, 1000.0);
        ctx.set_container_bounds("sheet", Bounds::unit());
        ctx.set_container_bounds("C", inner);
        ctx.spatial.initialize_from_containers(&ctx.hierarchy, ctx.scale);
        ctx
    }

    #[test]
    fn free_hint_is_used_and_search_avoids_it() {
        let graph = graph();
        let config = LayoutConfig::default();
        let mut ctx = prepared(&graph, &config, Bounds::new(0.1, 0.1, 0.9, 0.9));
        ctx.node_hints.insert("p".to_string(), Point::new(0.5, 0.5));

        let mut report = PhaseReport::new("positioning");
        PositioningPhase.run(&mut ctx, &mut report).unwrap();

        assert_eq!(ctx.metrics.placed_by_hint, 1);
        assert_eq!(ctx.metrics.placed_by_search, 1);
        assert!(ctx.placements["p"].body.center().approx_eq(Point::new(0.5, 0.5)));
        assert!(!ctx.placements["p"].footprint.intersects(&ctx.placements["q"].footprint));
        assert!(report.diagnostics.is_empty());
    }

    #[test]
    fn crowded_container_falls_back_to_center_and_grows() {
        let graph = graph();
        let config = LayoutConfig::default();
        let inner = Bounds::new(0.4, 0.4, 0.43, 0.42);
        let mut ctx = prepared(&graph, &config, inner);

        let mut report = PhaseReport::new("positioning");
        PositioningPhase.run(&mut ctx, &mut report).unwrap();

        assert_eq!(ctx.metrics.fallback_placements, 2);
        assert!(ctx.placements["p"].fallback);
        assert_eq!(ctx.metrics.containers_flagged_for_resize.first().map(String::as_str), Some("C"));
        assert_eq!(report.diagnostics.len(), 2);
        assert_eq!(report.diagnostics[0].kind, DiagnosticKind::SpacingExhausted);
        let grown = ctx.spatial.requirement("C").unwrap();
        assert!(grown.min_height > config.min_container_height);
    }

    #[test]
    fn fallback_keeps_clear_of_child_containers() {
        let mut graph = graph();
        graph.add_container("D", "C");
        let config = LayoutConfig::default();
        let mut ctx = prepared(&graph, &config, Bounds::unit());
        let (w, h) = ["p", "q"]
            .iter()
            .map(|id| ctx.dimensions[*id].unit_size(&ctx.scale))
            .fold((0.0f32, 0.0f32), |acc, size| (acc.0.max(size.0), acc.1.max(size.1)));
        let (pad, gap) = (config.padding / 1000.0, config.element_gap / 1000.0);

        // one row of height, and a strip beside D wide enough for one element
        let inner = Bounds::new(0.2, 0.4, 0.8, 0.4 + h * 1.5 + pad * 2.0);
        let available = inner.deflate(pad, pad);
        let child = Bounds::new(
            available.left,
            available.top,
            available.right - w - gap * 2.0,
            available.bottom,
        );
        ctx.set_container_bounds("C", inner);
        ctx.set_container_bounds("D", child);
        ctx.spatial.initialize_from_containers(&ctx.hierarchy, ctx.scale);
        assert!(child.contains_point(available.center()));

        let mut report = PhaseReport::new("positioning");
        PositioningPhase.run(&mut ctx, &mut report).unwrap();

        assert_eq!(ctx.metrics.placed_by_search, 1);
        assert_eq!(ctx.metrics.fallback_placements, 1);
        assert!(ctx.placements["q"].fallback);
        for id in ["p", "q"] {
            assert!(!ctx.placements[id].footprint.intersects(&child), "{id} entered D");
        }
    }
}
