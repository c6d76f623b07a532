use std::collections::BTreeMap;

use tracing::debug;

use super::{Allocation, ClusterSizer, SizingRequest};
use crate::layout::diagnostics::SizingStrategy;
use crate::layout::error::ExternalToolError;
use crate::layout::geometry::{Bounds, UnitScale};
use crate::layout::spatial::grid_shape;
use crate::layout::types::SpaceRequirement;

/// Top-down allocation from requirements alone. Each container splits its
/// padded interior into a grid of child cells sized in proportion to the
/// children's preferred sizes, with a bottom band kept for its own elements.
/// Oversized containers are shrunk about their center before their own
/// children are laid out.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProportionalSizer;

impl ClusterSizer for ProportionalSizer {
    fn name(&self) -> &'static str {
        "proportional"
    }

    fn allocate(&self, request: &SizingRequest<'_>) -> Result<Allocation, ExternalToolError> {
        Ok(self.compute(request))
    }
}

impl ProportionalSizer {
    /// Infallible form of [`ClusterSizer::allocate`].
    pub fn compute(&self, request: &SizingRequest<'_>) -> Allocation {
        let scale = request.working_scale();
        let hierarchy = request.hierarchy;
        let sizing = &request.config.sizing;
        let mut bounds: BTreeMap<String, Bounds> = BTreeMap::new();
        bounds.insert(hierarchy.root.clone(), Bounds::unit());
        let mut shrunk = 0;

        for id in hierarchy.pre_order() {
            let Some(info) = hierarchy.container(&id) else {
                continue;
            };
            let Some(mut own) = bounds.get(&id).copied() else {
                continue;
            };
            let requirement = request.spatial.requirement(&id);

            if !info.is_root() {
                if let Some(req) = requirement {
                    let reduced = shrink_to_content(&own, req, &scale, sizing);
                    if reduced != own {
                        debug!(container = %id, "shrunk oversized allocation");
                        shrunk += 1;
                        own = reduced;
                        bounds.insert(id.clone(), own);
                    }
                }
            }

            if info.children.is_empty() {
                continue;
            }
            let region = self.children_region(request, &id, &own, &scale);
            for (child, cell) in self.child_cells(request, &info.children, &region, &scale) {
                bounds.insert(child, cell);
            }
        }

        Allocation {
            bounds,
            scale,
            node_hints: BTreeMap::new(),
            strategy: SizingStrategy::Proportional,
            containers_shrunk: shrunk,
        }
    }

    /// Interior of `container` left for its children once the element band
    /// at the bottom is reserved.
    fn children_region(
        &self,
        request: &SizingRequest<'_>,
        container: &str,
        own: &Bounds,
        scale: &UnitScale,
    ) -> Bounds {
        let config = request.config;
        let inner = own.deflate(
            scale.to_unit_x(config.padding),
            scale.to_unit_y(config.padding),
        );
        let Some(info) = request.hierarchy.container(container) else {
            return inner;
        };
        if info.element_ids.is_empty() {
            return inner;
        }

        let (_, elements_h) = request
            .spatial
            .element_footprint(&info.element_ids, request.dimensions);
        let (_, children_h) = request.spatial.children_footprint(&info.children);
        let band_px = elements_h + config.element_gap;
        let content_px = band_px + children_h;
        let inner_h = inner.height();
        let mut band = if content_px > 0.0 {
            inner_h * band_px / content_px
        } else {
            0.0
        };
        if info.is_root() {
            let reserve = inner_h * config.sizing.root_element_reserve;
            let ceiling = (inner_h - scale.to_unit_y(children_h)).max(0.0);
            band = band.max(reserve.min(ceiling));
        }
        Bounds::new(inner.left, inner.top, inner.right, inner.bottom - band.min(inner_h))
    }

    /// Splits `region` into grid cells, one per child, in area order.
    fn child_cells(
        &self,
        request: &SizingRequest<'_>,
        children: &[String],
        region: &Bounds,
        scale: &UnitScale,
    ) -> Vec<(String, Bounds)> {
        let (cols, rows) = grid_shape(children.len());
        if cols == 0 {
            return Vec::new();
        }
        let mut col_w = vec![0.0f32; cols];
        let mut row_h = vec![0.0f32; rows];
        for (idx, child) in children.iter().enumerate() {
            let (w, h) = request
                .spatial
                .requirement(child)
                .map(|req| (req.preferred_width, req.preferred_height))
                .unwrap_or((request.config.min_container_width, request.config.min_container_height));
            col_w[idx % cols] = col_w[idx % cols].max(scale.to_unit_x(w));
            row_h[idx / cols] = row_h[idx / cols].max(scale.to_unit_y(h));
        }

        let gap_x = scale.to_unit_x(request.config.element_gap);
        let gap_y = scale.to_unit_y(request.config.element_gap);
        let col_offsets = distribute(&col_w, region.left, region.width(), gap_x);
        let row_offsets = distribute(&row_h, region.top, region.height(), gap_y);

        children
            .iter()
            .enumerate()
            .map(|(idx, child)| {
                let (left, right) = col_offsets[idx % cols];
                let (top, bottom) = row_offsets[idx / cols];
                (child.clone(), Bounds::new(left, top, right, bottom))
            })
            .collect()
    }
}

/// Lays out tracks of the given sizes along one axis, scaling them so the
/// tracks plus gaps fill `span` exactly.
fn distribute(sizes: &[f32], start: f32, span: f32, gap: f32) -> Vec<(f32, f32)> {
    let gaps = gap * sizes.len().saturating_sub(1) as f32;
    let total: f32 = sizes.iter().sum();
    let (gap, factor) = if total <= 0.0 {
        (0.0, 0.0)
    } else if span > gaps {
        (gap, (span - gaps) / total)
    } else {
        (0.0, span.max(0.0) / total)
    };
    let mut cursor = start;
    sizes
        .iter()
        .map(|size| {
            let begin = cursor;
            let end = begin + size * factor;
            cursor = end + gap;
            (begin, end)
        })
        .collect()
}

/// Shrinks `bounds` about its center when its area exceeds the configured
/// multiple of the requirement. Never goes below the minimum size per axis
/// or the minimum shrink factor of the original area.
pub(crate) fn shrink_to_content(
    bounds: &Bounds,
    requirement: &SpaceRequirement,
    scale: &UnitScale,
    sizing: &crate::config::SizingConfig,
) -> Bounds {
    let width_px = bounds.width() * scale.width;
    let height_px = bounds.height() * scale.height;
    let area = width_px * height_px;
    let required = requirement.min_area();
    if required <= 0.0 || area <= required * sizing.shrink_threshold {
        return *bounds;
    }
    let factor = (required * sizing.shrink_target / area).max(sizing.min_shrink_factor);
    let axis = factor.sqrt();
    let new_w = (width_px * axis).clamp(requirement.min_width.min(width_px), width_px);
    let new_h = (height_px * axis).clamp(requirement.min_height.min(height_px), height_px);
    Bounds::from_center(
        bounds.center(),
        scale.to_unit_x(new_w),
        scale.to_unit_y(new_h),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LayoutConfig, SizingConfig};
    use crate::ir::LogicalGraph;
    use crate::layout::hierarchy::extract_hierarchy;
    use crate::layout::measure::measure_element;
    use crate::layout::spatial::SpatialAwareness;
    use crate::layout::types::ElementDimensions;

    fn requirement(min_w: f32, min_h: f32) -> SpaceRequirement {
        SpaceRequirement {
            min_width: min_w,
            min_height: min_h,
            preferred_width: min_w * 1.2,
            preferred_height: min_h * 1.1,
            content_elements: Vec::new(),
            child_containers: Vec::new(),
        }
    }

    #[test]
    fn shrink_keeps_center_and_respects_floor() {
        let scale = UnitScale::new(1000.0, 1000.0);
        let bounds = Bounds::new(0.1, 0.1, 0.9, 0.9);
        let sizing = SizingConfig::default();
        let shrunk = shrink_to_content(&bounds, &requirement(60.0, 40.0), &scale, &sizing);
        assert!(shrunk.width() < bounds.width());
        assert!((shrunk.center().x - 0.5).abs() < 1e-5);
        // area never drops below 30% of the original
        assert!(shrunk.area() >= bounds.area() * 0.3 - 1e-4);
        assert!(shrunk.width() * 1000.0 >= 60.0 - 1e-3);
    }

    #[test]
    fn shrink_leaves_snug_allocations_alone() {
        let scale = UnitScale::new(100.0, 100.0);
        let bounds = Bounds::new(0.0, 0.0, 0.7, 0.5);
        let sizing = SizingConfig::default();
        assert_eq!(
            shrink_to_content(&bounds, &requirement(60.0, 40.0), &scale, &sizing),
            bounds
        );
    }

    #[test]
    fn shrink_target_area_is_reached_when_above_floor() {
        let scale = UnitScale::new(100.0, 100.0);
        let bounds = Bounds::new(0.0, 0.0, 1.0, 1.0);
        let sizing = SizingConfig::default();
        // requirement 40x40 = 1600; 1.5x = 2400 of 10000 -> factor 0.3 floor
        let shrunk = shrink_to_content(&bounds, &requirement(40.0, 40.0), &scale, &sizing);
        assert!((shrunk.area() - 0.3).abs() < 1e-3);
        // requirement 50x50 = 2500; 1.5x = 3750 -> factor 0.375
        let shrunk = shrink_to_content(&bounds, &requirement(50.0, 50.0), &scale, &sizing);
        assert!((shrunk.area() - 0.375).abs() < 1e-3);
    }

    #[test]
    fn distribute_fills_span_with_gaps() {
        let tracks = distribute(&[1.0, 3.0], 0.0, 10.0, 2.0);
        assert_eq!(tracks[0], (0.0, 2.0));
        assert_eq!(tracks[1], (4.0, 10.0));
    }

    #[test]
    fn children_fit_their_parents_with_padding() {
        let mut graph = LogicalGraph::new("sheet");
        graph.add_container("A", "sheet");
        graph.add_container("B", "sheet");
        graph.add_container("C", "A");
        graph.add_predicate("C", "p", "loves");
        graph.add_predicate("sheet", "q", "Q");
        graph.add_vertex("B", "v", Some("Plato"));
        let hierarchy = extract_hierarchy(&graph).unwrap();
        let config = LayoutConfig::default();
        let dimensions: BTreeMap<String, ElementDimensions> = graph
            .elements
            .iter()
            .map(|(id, spec)| (id.clone(), measure_element(spec, &config.measure)))
            .collect();
        let mut spatial = SpatialAwareness::new(&config);
        spatial.calculate_space_requirements(&hierarchy, &dimensions);

        let request = SizingRequest {
            hierarchy: &hierarchy,
            spatial: &spatial,
            dimensions: &dimensions,
            connectors: &[],
            config: &config,
            canvas: (1200.0, 800.0),
        };
        let allocation = ProportionalSizer.compute(&request);
        assert_eq!(allocation.strategy, SizingStrategy::Proportional);
        assert_eq!(allocation.bounds.len(), 4);
        assert_eq!(allocation.bounds["sheet"], Bounds::unit());

        let pad_x = allocation.scale.to_unit_x(config.padding);
        let pad_y = allocation.scale.to_unit_y(config.padding);
        for (child, parent) in [("A", "sheet"), ("B", "sheet"), ("C", "A")] {
            let inner = allocation.bounds[parent].deflate(pad_x, pad_y);
            assert!(inner.contains(&allocation.bounds[child]), "{child} escapes {parent}");
            let req = spatial.requirement(child).unwrap();
            assert!(allocation.bounds[child].width() * allocation.scale.width >= req.min_width - 1e-2);
            assert!(allocation.bounds[child].height() * allocation.scale.height >= req.min_height - 1e-2);
        }
        assert!(!allocation.bounds["A"].intersects(&allocation.bounds["B"]));
    }
}
