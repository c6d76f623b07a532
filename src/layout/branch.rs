use super::geometry::{Point, EPSILON};

/// Cross-product tolerance for treating three points as collinear.
const COLLINEAR_EPS: f32 = 1e-6;

fn is_pinned(point: Point, pinned: &[Point]) -> bool {
    pinned.iter().any(|p| p.approx_eq(point))
}

fn collinear(a: Point, b: Point, c: Point) -> bool {
    let cross = (b.x - a.x) * (c.y - b.y) - (b.y - a.y) * (c.x - b.x);
    cross.abs() <= COLLINEAR_EPS
}

/// Drops zero-length legs and interior points lying on a straight run
/// (including spikes that double back). The first and last points and any
/// point in `pinned` always survive.
pub fn optimize_path(points: &[Point], pinned: &[Point]) -> Vec<Point> {
    if points.len() <= 2 {
        return points.to_vec();
    }

    let mut deduped: Vec<Point> = Vec::with_capacity(points.len());
    for (idx, point) in points.iter().enumerate() {
        match deduped.last_mut() {
            Some(last) if last.approx_eq(*point) => {
                // keep the exact final coordinate
                if idx == points.len() - 1 {
                    *last = *point;
                }
            }
            _ => deduped.push(*point),
        }
    }
    if deduped.len() < 2 {
        deduped.push(points[points.len() - 1]);
    }

    let mut changed = true;
    while changed && deduped.len() > 2 {
        changed = false;
        let mut out: Vec<Point> = Vec::with_capacity(deduped.len());
        out.push(deduped[0]);
        for idx in 1..deduped.len() - 1 {
            let prev = out[out.len() - 1];
            let curr = deduped[idx];
            let next = deduped[idx + 1];
            if !is_pinned(curr, pinned) && collinear(prev, curr, next) {
                changed = true;
                continue;
            }
            out.push(curr);
        }
        out.push(deduped[deduped.len() - 1]);
        deduped = out;
    }
    deduped
}

/// Number of interior vertices.
pub fn bend_count(points: &[Point]) -> usize {
    points.len().saturating_sub(2)
}

pub fn path_length(points: &[Point]) -> f32 {
    points
        .windows(2)
        .map(|pair| pair[0].distance(pair[1]))
        .sum()
}

/// True when every leg is horizontal or vertical.
pub fn is_rectilinear(points: &[Point]) -> bool {
    points.windows(2).all(|pair| {
        (pair[0].x - pair[1].x).abs() <= EPSILON || (pair[0].y - pair[1].y).abs() <= EPSILON
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: f32, y: f32) -> Point {
        Point::new(x, y)
    }

    #[test]
    fn merges_collinear_runs_and_zero_legs() {
        let path = vec![p(0.0, 0.0), p(0.5, 0.0), p(0.5, 0.0), p(1.0, 0.0), p(1.0, 1.0)];
        assert_eq!(optimize_path(&path, &[]), vec![p(0.0, 0.0), p(1.0, 0.0), p(1.0, 1.0)]);
    }

    #[test]
    fn pinned_points_are_kept() {
        let path = vec![p(0.0, 0.0), p(0.5, 0.0), p(1.0, 0.0)];
        assert_eq!(optimize_path(&path, &[p(0.5, 0.0)]), path);
        assert_eq!(optimize_path(&path, &[]), vec![p(0.0, 0.0), p(1.0, 0.0)]);
    }

    #[test]
    fn endpoints_never_change() {
        let path = vec![p(0.2, 0.2), p(0.2, 0.2), p(0.2, 0.2)];
        let out = optimize_path(&path, &[]);
        assert_eq!(out.first(), Some(&p(0.2, 0.2)));
        assert_eq!(out.last(), Some(&p(0.2, 0.2)));
    }

    #[test]
    fn spikes_are_removed() {
        let path = vec![p(0.0, 0.0), p(1.0, 0.0), p(0.5, 0.0), p(0.5, 1.0)];
        assert_eq!(optimize_path(&path, &[]), vec![p(0.0, 0.0), p(0.5, 0.0), p(0.5, 1.0)]);
    }

    #[test]
    fn metrics_helpers() {
        let path = vec![p(0.0, 0.0), p(1.0, 0.0), p(1.0, 1.0)];
        assert_eq!(bend_count(&path), 1);
        assert!((path_length(&path) - 2.0).abs() < 1e-6);
        assert!(is_rectilinear(&path));
        assert!(!is_rectilinear(&[p(0.0, 0.0), p(1.0, 1.0)]));
    }
}
