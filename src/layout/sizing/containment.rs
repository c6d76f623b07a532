use tracing::debug;

use crate::layout::error::ContainmentViolation;
use crate::layout::geometry::{AffineMap, Bounds};
use crate::layout::hierarchy::Hierarchy;

/// Per-retry scale applied to overlapping siblings.
const SIBLING_SHRINK: f32 = 0.9;

/// Pulls every container inside its parent's padded interior and separates
/// partially overlapping siblings. Corrections move whole subtrees. Returns
/// the number of corrections made.
pub fn enforce_containment(
    hierarchy: &mut Hierarchy,
    padding: (f32, f32),
    retries: usize,
) -> Result<usize, ContainmentViolation> {
    let mut corrections = 0;
    for parent in hierarchy.pre_order() {
        let Some(parent_bounds) = hierarchy.container(&parent).and_then(|info| info.bounds) else {
            continue;
        };
        let inner = parent_bounds.deflate(padding.0, padding.1);
        let children = hierarchy
            .container(&parent)
            .map(|info| info.children.clone())
            .unwrap_or_default();

        for child in &children {
            let Some(bounds) = hierarchy.container(child).and_then(|info| info.bounds) else {
                continue;
            };
            if inner.contains(&bounds) {
                continue;
            }
            let fitted = Bounds::from_center(
                bounds.center(),
                bounds.width().min(inner.width()),
                bounds.height().min(inner.height()),
            )
            .clamp_within(&inner);
            debug!(container = %child, parent = %parent, "refitting container into parent");
            map_subtree(hierarchy, child, &AffineMap::between(&bounds, &fitted));
            corrections += 1;
        }

        for (i, a) in children.iter().enumerate() {
            for b in &children[i + 1..] {
                let mut attempts = 0;
                while partially_overlap(hierarchy, a, b) {
                    if attempts >= retries {
                        return Err(ContainmentViolation::new(
                            a,
                            Some(b),
                            "sibling containers overlap after bounded retries",
                        ));
                    }
                    for id in [a, b] {
                        if let Some(bounds) = hierarchy.container(id).and_then(|info| info.bounds) {
                            let shrunk = bounds.scale_about_center(SIBLING_SHRINK, SIBLING_SHRINK);
                            map_subtree(hierarchy, id, &AffineMap::between(&bounds, &shrunk));
                        }
                    }
                    attempts += 1;
                    corrections += 1;
                }
            }
        }
    }
    Ok(corrections)
}

/// Checks nesting and sibling disjointness without modifying anything.
pub fn validate_containment(
    hierarchy: &Hierarchy,
    padding: (f32, f32),
) -> Result<(), ContainmentViolation> {
    for (id, info) in &hierarchy.containers {
        let Some(bounds) = info.bounds else {
            return Err(ContainmentViolation::new(id, None, "container has no bounds"));
        };
        if let Some(parent) = info.parent_id.as_deref() {
            let Some(parent_bounds) = hierarchy.container(parent).and_then(|p| p.bounds) else {
                return Err(ContainmentViolation::new(parent, None, "container has no bounds"));
            };
            if !parent_bounds.deflate(padding.0, padding.1).contains(&bounds) {
                return Err(ContainmentViolation::new(
                    id,
                    Some(parent),
                    "container escapes its parent's padded interior",
                ));
            }
        }
        for (i, a) in info.children.iter().enumerate() {
            for b in &info.children[i + 1..] {
                if partially_overlap(hierarchy, a, b) {
                    return Err(ContainmentViolation::new(
                        a,
                        Some(b),
                        "sibling containers partially overlap",
                    ));
                }
            }
        }
    }
    Ok(())
}

fn partially_overlap(hierarchy: &Hierarchy, a: &str, b: &str) -> bool {
    let (Some(x), Some(y)) = (
        hierarchy.container(a).and_then(|info| info.bounds),
        hierarchy.container(b).and_then(|info| info.bounds),
    ) else {
        return false;
    };
    x.intersects(&y) && !x.contains(&y) && !y.contains(&x)
}

/// Applies `map` to `root` and all of its descendants.
pub(crate) fn map_subtree(hierarchy: &mut Hierarchy, root: &str, map: &AffineMap) {
    for id in hierarchy.subtree(root) {
        if let Some(info) = hierarchy.containers.get_mut(&id) {
            if let Some(bounds) = info.bounds {
                info.bounds = Some(map.apply_bounds(&bounds));
            }
        }
    }
}
