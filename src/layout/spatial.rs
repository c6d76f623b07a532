use std::collections::BTreeMap;

use tracing::debug;

use super::context::LayoutContext;
use super::diagnostics::PhaseReport;
use super::error::LayoutError;
use super::geometry::{Bounds, Point, UnitScale, EPSILON};
use super::hierarchy::Hierarchy;
use super::pipeline::LayoutPhase;
use super::types::{ElementDimensions, OccupiedRegion, SpaceAllocation, SpaceRequirement};
use crate::config::LayoutConfig;

/// Columns and rows of the near-square grid used to arrange `n` items.
pub(crate) fn grid_shape(n: usize) -> (usize, usize) {
    if n == 0 {
        return (0, 0);
    }
    let cols = (n as f32).sqrt().ceil().max(1.0) as usize;
    let rows = n.div_ceil(cols);
    (cols, rows)
}

/// Tracks per-container requirements (pixels) and allocations (unit space).
#[derive(Debug, Clone)]
pub struct SpatialAwareness {
    padding: f32,
    gap: f32,
    min_width: f32,
    min_height: f32,
    growth_width: f32,
    growth_height: f32,
    scale: UnitScale,
    requirements: BTreeMap<String, SpaceRequirement>,
    allocations: BTreeMap<String, SpaceAllocation>,
}

impl SpatialAwareness {
    pub fn new(config: &LayoutConfig) -> Self {
        Self {
            padding: config.padding,
            gap: config.element_gap,
            min_width: config.min_container_width,
            min_height: config.min_container_height,
            growth_width: config.growth_width,
            growth_height: config.growth_height,
            scale: UnitScale::default(),
            requirements: BTreeMap::new(),
            allocations: BTreeMap::new(),
        }
    }

    pub fn requirement(&self, id: &str) -> Option<&SpaceRequirement> {
        self.requirements.get(id)
    }

    pub fn requirements(&self) -> &BTreeMap<String, SpaceRequirement> {
        &self.requirements
    }

    pub fn allocation(&self, id: &str) -> Option<&SpaceAllocation> {
        self.allocations.get(id)
    }

    pub fn allocations(&self) -> &BTreeMap<String, SpaceAllocation> {
        &self.allocations
    }

    /// Rebuilds allocations from the containers' current bounds. Occupied
    /// and reserved regions are reset. Containers without bounds are skipped.
    pub fn initialize_from_containers(&mut self, hierarchy: &Hierarchy, scale: UnitScale) {
        self.scale = scale;
        self.allocations.clear();
        let dx = scale.to_unit_x(self.padding);
        let dy = scale.to_unit_y(self.padding);
        for (id, info) in &hierarchy.containers {
            let Some(bounds) = info.bounds else {
                continue;
            };
            self.allocations.insert(
                id.clone(),
                SpaceAllocation {
                    total_bounds: bounds,
                    available_bounds: bounds.deflate(dx, dy),
                    occupied_regions: Vec::new(),
                    reserved_regions: Vec::new(),
                },
            );
        }
    }

    /// Updates one container's bounds, keeping its occupied regions.
    pub fn update_bounds(&mut self, id: &str, bounds: Bounds) {
        let dx = self.scale.to_unit_x(self.padding);
        let dy = self.scale.to_unit_y(self.padding);
        let allocation = self
            .allocations
            .entry(id.to_string())
            .or_insert_with(|| SpaceAllocation {
                total_bounds: bounds,
                available_bounds: bounds,
                occupied_regions: Vec::new(),
                reserved_regions: Vec::new(),
            });
        allocation.total_bounds = bounds;
        allocation.available_bounds = bounds.deflate(dx, dy);
    }

    /// Computes every container's requirement inside-out, so children are
    /// always known before their parent.
    pub fn calculate_space_requirements(
        &mut self,
        hierarchy: &Hierarchy,
        dimensions: &BTreeMap<String, ElementDimensions>,
    ) -> &BTreeMap<String, SpaceRequirement> {
        self.requirements.clear();
        for id in hierarchy.post_order() {
            let requirement = self.compute_requirement(hierarchy, dimensions, &id);
            debug!(
                container = %id,
                min_width = requirement.min_width,
                min_height = requirement.min_height,
                "computed space requirement"
            );
            self.requirements.insert(id, requirement);
        }
        &self.requirements
    }

    fn compute_requirement(
        &self,
        hierarchy: &Hierarchy,
        dimensions: &BTreeMap<String, ElementDimensions>,
        id: &str,
    ) -> SpaceRequirement {
        let (elements, children) = match hierarchy.container(id) {
            Some(info) => (info.element_ids.clone(), info.children.clone()),
            None => (Vec::new(), Vec::new()),
        };

        let (ew, eh) = self.element_footprint(&elements, dimensions);
        let (cw, ch) = self.children_footprint(&children);
        let (content_w, content_h) = match (ew > 0.0, cw > 0.0) {
            (true, true) => (ew.max(cw), eh + ch + self.gap),
            (true, false) => (ew, eh),
            (false, true) => (cw, ch),
            (false, false) => (0.0, 0.0),
        };

        let min_width = (content_w + self.padding * 2.0).max(self.min_width);
        let min_height = (content_h + self.padding * 2.0).max(self.min_height);
        SpaceRequirement {
            min_width,
            min_height,
            preferred_width: min_width * (1.0 + self.growth_width),
            preferred_height: min_height * (1.0 + self.growth_height),
            content_elements: elements,
            child_containers: children,
        }
    }

    /// Pixel size of a near-square grid of element footprints.
    pub fn element_footprint(
        &self,
        elements: &[String],
        dimensions: &BTreeMap<String, ElementDimensions>,
    ) -> (f32, f32) {
        let (cols, rows) = grid_shape(elements.len());
        if cols == 0 {
            return (0.0, 0.0);
        }
        let mut cell_w: f32 = 0.0;
        let mut cell_h: f32 = 0.0;
        for id in elements {
            if let Some(dims) = dimensions.get(id) {
                cell_w = cell_w.max(dims.total_width());
                cell_h = cell_h.max(dims.total_height());
            }
        }
        (
            cols as f32 * (cell_w + self.gap) - self.gap,
            rows as f32 * (cell_h + self.gap) - self.gap,
        )
    }

    /// Pixel size of the child grid: column width and row height are the
    /// largest preferred size in that column or row.
    pub fn children_footprint(&self, children: &[String]) -> (f32, f32) {
        let (cols, rows) = grid_shape(children.len());
        if cols == 0 {
            return (0.0, 0.0);
        }
        let mut col_w = vec![0.0f32; cols];
        let mut row_h = vec![0.0f32; rows];
        for (idx, child) in children.iter().enumerate() {
            let Some(req) = self.requirements.get(child) else {
                continue;
            };
            let (col, row) = (idx % cols, idx / cols);
            col_w[col] = col_w[col].max(req.preferred_width);
            row_h[row] = row_h[row].max(req.preferred_height);
        }
        (
            col_w.iter().sum::<f32>() + self.gap * (cols - 1) as f32,
            row_h.iter().sum::<f32>() + self.gap * (rows - 1) as f32,
        )
    }

    pub fn register_element(&mut self, container: &str, element: &str, bounds: Bounds) {
        let Some(allocation) = self.allocations.get_mut(container) else {
            return;
        };
        match allocation
            .occupied_regions
            .iter_mut()
            .find(|region| region.id == element)
        {
            Some(region) => region.bounds = bounds,
            None => allocation.occupied_regions.push(OccupiedRegion {
                id: element.to_string(),
                bounds,
            }),
        }
    }

    pub fn unregister_element(&mut self, container: &str, element: &str) -> Option<Bounds> {
        let allocation = self.allocations.get_mut(container)?;
        let idx = allocation
            .occupied_regions
            .iter()
            .position(|region| region.id == element)?;
        Some(allocation.occupied_regions.remove(idx).bounds)
    }

    /// Reserves a routing corridor inside a container.
    pub fn reserve_region(&mut self, container: &str, bounds: Bounds) {
        if let Some(allocation) = self.allocations.get_mut(container) {
            allocation.reserved_regions.push(bounds);
        }
    }

    pub fn clear_reserved(&mut self) {
        for allocation in self.allocations.values_mut() {
            allocation.reserved_regions.clear();
        }
    }

    /// Records a grown requirement for `container` and walks its ancestors,
    /// recomputing each from its children. Stops at the first ancestor that
    /// does not need to grow. Returns the containers whose requirement
    /// changed, starting with `container`.
    pub fn propagate_size_change(
        &mut self,
        hierarchy: &Hierarchy,
        dimensions: &BTreeMap<String, ElementDimensions>,
        container: &str,
        new_requirement: SpaceRequirement,
    ) -> Vec<String> {
        let mut affected = vec![container.to_string()];
        self.requirements
            .insert(container.to_string(), new_requirement);

        let mut current = hierarchy.parent(container).map(str::to_string);
        while let Some(id) = current {
            let recomputed = self.compute_requirement(hierarchy, dimensions, &id);
            let grows = match self.requirements.get(&id) {
                Some(old) => {
                    recomputed.min_width > old.min_width + EPSILON
                        || recomputed.min_height > old.min_height + EPSILON
                }
                None => true,
            };
            if !grows {
                break;
            }
            debug!(container = %id, "requirement grew after child change");
            self.requirements.insert(id.clone(), recomputed);
            current = hierarchy.parent(&id).map(str::to_string);
            affected.push(id);
        }
        affected
    }

    /// Requirement of `container` grown to fit one more footprint of the
    /// given pixel size.
    pub fn grown_requirement(&self, container: &str, width: f32, height: f32) -> Option<SpaceRequirement> {
        let mut requirement = self.requirements.get(container)?.clone();
        requirement.min_width = requirement.min_width.max(width + self.padding * 2.0);
        requirement.min_height += height + self.gap;
        requirement.preferred_width = requirement.min_width * (1.0 + self.growth_width);
        requirement.preferred_height = requirement.min_height * (1.0 + self.growth_height);
        Some(requirement)
    }

    /// Candidate centers for a footprint of `size` (unit space) inside the
    /// container's available bounds, in row-major order. Positions whose
    /// footprint touches an occupied region or a child container are
    /// dropped. The regular grid is thinned to stay within `limit`; the far
    /// edges and the slots flush against each exclusion zone are always
    /// tried.
    pub fn available_positions(
        &self,
        hierarchy: &Hierarchy,
        container: &str,
        size: (f32, f32),
        limit: usize,
    ) -> Vec<Point> {
        let Some(allocation) = self.allocations.get(container) else {
            return Vec::new();
        };
        let area = allocation.available_bounds;
        let (w, h) = size;
        if area.width() + EPSILON < w || area.height() + EPSILON < h || limit == 0 {
            return Vec::new();
        }

        let mut step_x = (w / 2.0).max(EPSILON * 10.0);
        let mut step_y = (h / 2.0).max(EPSILON * 10.0);
        let count = |step: f32, span: f32| ((span.max(0.0) / step).floor() as usize) + 1;
        let (mut nx, mut ny) = (count(step_x, area.width() - w), count(step_y, area.height() - h));
        while (nx + 1) * (ny + 1) > limit && (nx > 1 || ny > 1) {
            step_x *= 1.5;
            step_y *= 1.5;
            nx = count(step_x, area.width() - w);
            ny = count(step_y, area.height() - h);
        }

        let exclusions = self.exclusion_zones(hierarchy, container);
        let (gx, gy) = self.half_gap();
        let xs = axis_candidates(
            (area.left, area.right),
            w,
            2.0 * gx,
            (0..nx).map(|i| area.left + w / 2.0 + i as f32 * step_x),
            exclusions.iter().map(|zone| (zone.left, zone.right)),
        );
        let ys = axis_candidates(
            (area.top, area.bottom),
            h,
            2.0 * gy,
            (0..ny).map(|i| area.top + h / 2.0 + i as f32 * step_y),
            exclusions.iter().map(|zone| (zone.top, zone.bottom)),
        );

        let mut positions = Vec::new();
        for &y in &ys {
            for &x in &xs {
                let center = Point::new(x, y);
                let footprint = Bounds::from_center(center, w, h).inflate(gx, gy);
                if exclusions.iter().all(|zone| !zone.intersects(&footprint)) {
                    positions.push(center);
                }
            }
        }
        positions
    }

    /// Center nearest the middle of the container's available bounds whose
    /// footprint keeps clear of every child container. Occupied regions are
    /// ignored. `None` when no such center exists.
    pub fn nearest_clear_of_children(
        &self,
        hierarchy: &Hierarchy,
        container: &str,
        size: (f32, f32),
    ) -> Option<Point> {
        let area = self.allocations.get(container)?.available_bounds;
        let target = area.center();
        let (w, h) = size;
        let (gx, gy) = self.half_gap();
        let zones = self.child_zones(hierarchy, container);
        let xs = axis_candidates(
            (area.left, area.right),
            w,
            2.0 * gx,
            std::iter::once(target.x),
            zones.iter().map(|zone| (zone.left, zone.right)),
        );
        let ys = axis_candidates(
            (area.top, area.bottom),
            h,
            2.0 * gy,
            std::iter::once(target.y),
            zones.iter().map(|zone| (zone.top, zone.bottom)),
        );

        let mut best: Option<(f32, Point)> = None;
        for &y in &ys {
            for &x in &xs {
                let center = Point::new(x, y);
                let footprint = Bounds::from_center(center, w, h).inflate(gx, gy);
                if zones.iter().any(|zone| zone.intersects(&footprint)) {
                    continue;
                }
                let distance = center.distance(target);
                if best.is_none_or(|(closest, _)| distance < closest - EPSILON) {
                    best = Some((distance, center));
                }
            }
        }
        best.map(|(_, center)| center)
    }

    fn half_gap(&self) -> (f32, f32) {
        (
            self.scale.to_unit_x(self.gap) / 2.0,
            self.scale.to_unit_y(self.gap) / 2.0,
        )
    }

    /// Bounds of every child container.
    pub fn child_zones(&self, hierarchy: &Hierarchy, container: &str) -> Vec<Bounds> {
        hierarchy
            .container(container)
            .map(|info| {
                info.children
                    .iter()
                    .filter_map(|child| hierarchy.container(child).and_then(|c| c.bounds))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Occupied regions plus the bounds of every child container.
    pub fn exclusion_zones(&self, hierarchy: &Hierarchy, container: &str) -> Vec<Bounds> {
        let mut zones: Vec<Bounds> = self
            .allocations
            .get(container)
            .map(|allocation| allocation.occupied_regions.iter().map(|r| r.bounds).collect())
            .unwrap_or_default();
        zones.extend(self.child_zones(hierarchy, container));
        zones
    }
}

/// Centers along one axis of `span` for an extent of `size`: the seeds, both
/// edges, and the slots `gap` away from either side of each zone. Values a
/// little past an edge are pulled back onto it. Sorted, without duplicates.
fn axis_candidates(
    span: (f32, f32),
    size: f32,
    gap: f32,
    seeds: impl Iterator<Item = f32>,
    zones: impl Iterator<Item = (f32, f32)>,
) -> Vec<f32> {
    let low = span.0 + size / 2.0;
    let high = (span.1 - size / 2.0).max(low);
    if span.1 - span.0 < size {
        return vec![(span.0 + span.1) / 2.0];
    }
    let slack = EPSILON.max(gap * 0.25);

    let mut centers: Vec<f32> = seeds.chain([low, high]).collect();
    for (near, far) in zones {
        centers.push(far + gap + size / 2.0);
        centers.push(near - gap - size / 2.0);
    }
    let mut centers: Vec<f32> = centers
        .into_iter()
        .filter(|c| *c >= low - slack && *c <= high + slack)
        .map(|c| c.clamp(low, high))
        .collect();
    centers.sort_by(f32::total_cmp);
    centers.dedup_by(|a, b| (*a - *b).abs() <= EPSILON);
    centers
}

pub(super) struct RequirementsPhase;

impl LayoutPhase for RequirementsPhase {
    fn name(&self) -> &'static str {
        "requirements"
    }

    fn depends_on(&self) -> &'static [&'static str] {
        &["measure"]
    }

    fn run(&self, ctx: &mut LayoutContext<'_>, _report: &mut PhaseReport) -> Result<(), LayoutError> {
        let LayoutContext {
            spatial,
            hierarchy,
            dimensions,
            ..
        } = ctx;
        spatial.calculate_space_requirements(hierarchy, dimensions);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::hierarchy::extract_hierarchy;
    use crate::ir::LogicalGraph;

    fn dims(w: f32, h: f32) -> ElementDimensions {
        ElementDimensions {
            width: w,
            height: h,
            clearance_width: 0.0,
            clearance_height: 0.0,
        }
    }

    fn setup() -> (Hierarchy, BTreeMap<String, ElementDimensions>) {
        let mut graph = LogicalGraph::new("sheet");
        graph.add_container("A", "sheet");
        graph.add_container("B", "A");
        graph.add_predicate("B", "p", "P");
        graph.add_predicate("B", "q", "Q");
        graph.add_predicate("sheet", "r", "R");
        let hierarchy = extract_hierarchy(&graph).unwrap();
        let mut dimensions = BTreeMap::new();
        dimensions.insert("p".to_string(), dims(100.0, 40.0));
        dimensions.insert("q".to_string(), dims(60.0, 20.0));
        dimensions.insert("r".to_string(), dims(30.0, 20.0));
        (hierarchy, dimensions)
    }

    #[test]
    fn grid_shape_is_near_square() {
        assert_eq!(grid_shape(0), (0, 0));
        assert_eq!(grid_shape(1), (1, 1));
        assert_eq!(grid_shape(3), (2, 2));
        assert_eq!(grid_shape(5), (3, 2));
        assert_eq!(grid_shape(9), (3, 3));
    }

    #[test]
    fn requirements_grow_inside_out() {
        let (hierarchy, dimensions) = setup();
        let config = LayoutConfig::default();
        let mut spatial = SpatialAwareness::new(&config);
        spatial.calculate_space_requirements(&hierarchy, &dimensions);

        let b = spatial.requirement("B").unwrap();
        // two elements side by side: 2 * (100 + 8) - 8
        assert!((b.min_width - (208.0 + 24.0)).abs() < 1e-3);
        assert!((b.preferred_width - b.min_width * 1.2).abs() < 1e-3);
        assert!((b.preferred_height - b.min_height * 1.1).abs() < 1e-3);

        let a = spatial.requirement("A").unwrap();
        assert!(a.min_width >= b.preferred_width + 24.0 - 1e-3);
        let sheet = spatial.requirement("sheet").unwrap();
        assert!(sheet.min_height > a.preferred_height);
        assert_eq!(sheet.content_elements, vec!["r"]);
        assert_eq!(sheet.child_containers, vec!["A"]);
    }

    #[test]
    fn empty_containers_get_minimum_floor() {
        let mut graph = LogicalGraph::new("sheet");
        graph.add_container("E", "sheet");
        let hierarchy = extract_hierarchy(&graph).unwrap();
        let config = LayoutConfig::default();
        let mut spatial = SpatialAwareness::new(&config);
        spatial.calculate_space_requirements(&hierarchy, &BTreeMap::new());
        let e = spatial.requirement("E").unwrap();
        assert_eq!(e.min_width, config.min_container_width);
        assert_eq!(e.min_height, config.min_container_height);
    }

    #[test]
    fn propagation_stops_when_ancestor_has_room() {
        let (hierarchy, dimensions) = setup();
        let config = LayoutConfig::default();
        let mut spatial = SpatialAwareness::new(&config);
        spatial.calculate_space_requirements(&hierarchy, &dimensions);

        let grown = spatial.grown_requirement("B", 50.0, 50.0).unwrap();
        let affected = spatial.propagate_size_change(&hierarchy, &dimensions, "B", grown);
        assert_eq!(affected, vec!["B", "A", "sheet"]);

        let same = spatial.requirement("B").unwrap().clone();
        let affected = spatial.propagate_size_change(&hierarchy, &dimensions, "B", same);
        assert_eq!(affected, vec!["B"]);
    }

    #[test]
    fn padding_larger_than_bounds_collapses_available_space() {
        let (mut hierarchy, _) = setup();
        hierarchy.containers.get_mut("B").unwrap().bounds = Some(Bounds::new(0.1, 0.1, 0.11, 0.11));
        let config = LayoutConfig::default();
        let mut spatial = SpatialAwareness::new(&config);
        spatial.initialize_from_containers(&hierarchy, UnitScale::new(100.0, 100.0));
        let allocation = spatial.allocation("B").unwrap();
        assert!(allocation.available_bounds.is_degenerate());
        assert!(spatial
            .available_positions(&hierarchy, "B", (0.05, 0.05), 64)
            .is_empty());
        assert!(spatial.allocation("A").is_none());
    }

    #[test]
    fn available_positions_avoid_occupied_regions_and_children() {
        let (mut hierarchy, _) = setup();
        hierarchy.containers.get_mut("sheet").unwrap().bounds = Some(Bounds::unit());
        hierarchy.containers.get_mut("A").unwrap().bounds = Some(Bounds::new(0.1, 0.1, 0.6, 0.6));
        let config = LayoutConfig::default();
        let mut spatial = SpatialAwareness::new(&config);
        spatial.initialize_from_containers(&hierarchy, UnitScale::new(1000.0, 1000.0));
        spatial.register_element("sheet", "x", Bounds::new(0.7, 0.0, 1.0, 0.3));

        let positions = spatial.available_positions(&hierarchy, "sheet", (0.1, 0.1), 256);
        assert!(!positions.is_empty());
        let child = Bounds::new(0.1, 0.1, 0.6, 0.6);
        let occupied = Bounds::new(0.7, 0.0, 1.0, 0.3);
        for center in positions {
            let footprint = Bounds::from_center(center, 0.1, 0.1);
            assert!(!footprint.intersects(&child));
            assert!(!footprint.intersects(&occupied));
        }

        assert_eq!(
            spatial.unregister_element("sheet", "x"),
            Some(Bounds::new(0.7, 0.0, 1.0, 0.3))
        );
        assert!(spatial.unregister_element("sheet", "x").is_none());
    }

    #[test]
    fn slot_that_exactly_fits_the_requirement_is_found() {
        let (mut hierarchy, _) = setup();
        let config = LayoutConfig::default();
        let (w, h) = (0.1, 0.03);
        let (pad, gap) = (config.padding / 1000.0, config.element_gap / 1000.0);
        // two footprints side by side plus one gap, as the requirement sizes it
        let tight = Bounds::new(0.0, 0.0, 2.0 * w + gap + 2.0 * pad, h + 2.0 * pad);
        hierarchy.containers.get_mut("B").unwrap().bounds = Some(tight);
        let mut spatial = SpatialAwareness::new(&config);
        spatial.initialize_from_containers(&hierarchy, UnitScale::new(1000.0, 1000.0));
        let area = spatial.allocation("B").unwrap().available_bounds;

        let first = spatial.available_positions(&hierarchy, "B", (w, h), 256)[0];
        assert!((first.x - (area.left + w / 2.0)).abs() < 1e-5);
        spatial.register_element("B", "p", Bounds::from_center(first, w, h));

        let second = spatial.available_positions(&hierarchy, "B", (w, h), 256);
        assert!(!second.is_empty());
        for center in second {
            assert!((center.x - (area.right - w / 2.0)).abs() < 1e-4);
            assert!(!Bounds::from_center(center, w, h).intersects(&Bounds::from_center(first, w, h)));
        }
    }

    #[test]
    fn nearest_clear_point_steps_out_of_a_child() {
        let (mut hierarchy, _) = setup();
        hierarchy.containers.get_mut("A").unwrap().bounds = Some(Bounds::new(0.0, 0.0, 0.6, 0.2));
        hierarchy.containers.get_mut("B").unwrap().bounds = Some(Bounds::new(0.05, 0.05, 0.45, 0.15));
        let config = LayoutConfig::default();
        let mut spatial = SpatialAwareness::new(&config);
        spatial.initialize_from_containers(&hierarchy, UnitScale::new(1000.0, 1000.0));
        spatial.register_element("A", "x", Bounds::new(0.46, 0.05, 0.58, 0.15));

        let center = spatial
            .nearest_clear_of_children(&hierarchy, "A", (0.1, 0.05))
            .unwrap();
        let footprint = Bounds::from_center(center, 0.1, 0.05);
        assert!(!footprint.intersects(&Bounds::new(0.05, 0.05, 0.45, 0.15)));
        // occupied regions do not count, so the closest side of B wins
        assert!((footprint.left - 0.458).abs() < 1e-4);

        hierarchy.containers.get_mut("B").unwrap().bounds = Some(Bounds::new(0.0, 0.0, 0.6, 0.2));
        assert!(spatial.nearest_clear_of_children(&hierarchy, "A", (0.1, 0.05)).is_none());
    }

    #[test]
    fn candidate_count_respects_limit() {
        let (mut hierarchy, _) = setup();
        hierarchy.containers.get_mut("B").unwrap().bounds = Some(Bounds::unit());
        let config = LayoutConfig::default();
        let mut spatial = SpatialAwareness::new(&config);
        spatial.initialize_from_containers(&hierarchy, UnitScale::new(1000.0, 1000.0));
        let positions = spatial.available_positions(&hierarchy, "B", (0.01, 0.01), 50);
        assert!(positions.len() <= 50);
        assert!(!positions.is_empty());
    }
}
