//! Closed-region detection for sketches made of axis-aligned line segments.
//!
//! Lines are projected into a 2D basis on the sketch plane whose first axis
//! follows the first sketch line. Every line must then run along one of the two
//! axes. The plane is cut into grid cells at every line position; neighbouring
//! cells whose shared side is not covered by a line merge into one region, and
//! regions that leak through an uncovered outer side are discarded.

use std::collections::HashMap;

use crate::types::*;

/// One closed region before the kernel assigns it an id.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub patches: Vec<[Point3d; 4]>,
}

impl Region {
    pub fn into_profile(self, id: KernelId) -> ProfileRegion {
        let mut min = [f64::INFINITY; 3];
        let mut max = [f64::NEG_INFINITY; 3];
        for corner in self.patches.iter().flatten() {
            for (axis, value) in corner.to_array().into_iter().enumerate() {
                min[axis] = min[axis].min(value);
                max[axis] = max[axis].max(value);
            }
        }
        ProfileRegion {
            id,
            bbox_min: Point3d::from_array(min),
            bbox_max: Point3d::from_array(max),
            patches: self.patches,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Span {
    at: f64,
    lo: f64,
    hi: f64,
}

/// Merged coverage intervals per grid line index.
struct Coverage {
    intervals: HashMap<usize, Vec<(f64, f64)>>,
    tol: f64,
}

impl Coverage {
    fn build(spans: &[Span], positions: &[f64], tol: f64) -> Self {
        let mut intervals: HashMap<usize, Vec<(f64, f64)>> = HashMap::new();
        for span in spans {
            if let Some(index) = position_index(positions, span.at, tol) {
                intervals.entry(index).or_default().push((span.lo, span.hi));
            }
        }
        for list in intervals.values_mut() {
            list.sort_by(|a, b| a.0.total_cmp(&b.0));
            let mut merged: Vec<(f64, f64)> = Vec::with_capacity(list.len());
            for &(lo, hi) in list.iter() {
                match merged.last_mut() {
                    Some(last) if lo <= last.1 + tol => last.1 = last.1.max(hi),
                    _ => merged.push((lo, hi)),
                }
            }
            *list = merged;
        }
        Self { intervals, tol }
    }

    fn covers(&self, index: usize, lo: f64, hi: f64) -> bool {
        self.intervals.get(&index).is_some_and(|list| {
            list.iter()
                .any(|&(a, b)| a <= lo + self.tol && b >= hi - self.tol)
        })
    }
}

fn position_index(positions: &[f64], value: f64, tol: f64) -> Option<usize> {
    let idx = positions.partition_point(|p| *p < value - tol);
    (idx < positions.len() && (positions[idx] - value).abs() <= tol).then_some(idx)
}

fn distinct_sorted(mut values: Vec<f64>, tol: f64) -> Vec<f64> {
    values.sort_by(|a, b| a.total_cmp(b));
    let mut out: Vec<f64> = Vec::with_capacity(values.len());
    for v in values {
        if out.last().map_or(true, |last| v - last > tol) {
            out.push(v);
        }
    }
    out
}

struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            self.parent[ra.max(rb)] = ra.min(rb);
        }
    }
}

/// Tile the closed regions of a rectilinear sketch.
///
/// Regions come back ordered by their lowest cell, scanning the second axis
/// first and then the first axis.
pub fn closed_regions(
    origin: Point3d,
    normal: Vec3,
    lines: &[(Point3d, Point3d)],
    tol: f64,
) -> Result<Vec<Region>, KernelError> {
    let Some(u_axis) = lines.iter().find_map(|(a, b)| {
        let d = a.vector_to(b);
        (d - normal * d.dot(&normal)).normalized()
    }) else {
        return Ok(Vec::new());
    };
    let v_axis = normal.cross(&u_axis);

    let project = |p: &Point3d| -> Result<(f64, f64), KernelError> {
        let rel = origin.vector_to(p);
        if rel.dot(&normal).abs() > tol {
            return Err(KernelError::SketchFailed {
                reason: format!("point {:?} is off the sketch plane", p),
            });
        }
        Ok((rel.dot(&u_axis), rel.dot(&v_axis)))
    };

    let mut along_u = Vec::new();
    let mut along_v = Vec::new();
    for (a, b) in lines {
        let (ua, va) = project(a)?;
        let (ub, vb) = project(b)?;
        let flat_v = (va - vb).abs() <= tol;
        let flat_u = (ua - ub).abs() <= tol;
        match (flat_u, flat_v) {
            (true, true) => continue,
            (false, true) => along_u.push(Span {
                at: (va + vb) * 0.5,
                lo: ua.min(ub),
                hi: ua.max(ub),
            }),
            (true, false) => along_v.push(Span {
                at: (ua + ub) * 0.5,
                lo: va.min(vb),
                hi: va.max(vb),
            }),
            (false, false) => {
                return Err(KernelError::NotSupported {
                    operation: "profile detection for non-rectilinear sketch lines".to_string(),
                })
            }
        }
    }

    let xs = distinct_sorted(along_v.iter().map(|s| s.at).collect(), tol);
    let ys = distinct_sorted(along_u.iter().map(|s| s.at).collect(), tol);
    if xs.len() < 2 || ys.len() < 2 {
        return Ok(Vec::new());
    }

    let horizontal = Coverage::build(&along_u, &ys, tol);
    let vertical = Coverage::build(&along_v, &xs, tol);

    let (nx, ny) = (xs.len() - 1, ys.len() - 1);
    let cell = |i: usize, j: usize| j * nx + i;
    let mut sets = UnionFind::new(nx * ny);
    let mut leaks = Vec::new();

    for j in 0..ny {
        for i in 0..nx {
            let (x0, x1, y0, y1) = (xs[i], xs[i + 1], ys[j], ys[j + 1]);
            let right_closed = vertical.covers(i + 1, y0, y1);
            let top_closed = horizontal.covers(j + 1, x0, x1);
            if i + 1 < nx {
                if !right_closed {
                    sets.union(cell(i, j), cell(i + 1, j));
                }
            } else if !right_closed {
                leaks.push(cell(i, j));
            }
            if j + 1 < ny {
                if !top_closed {
                    sets.union(cell(i, j), cell(i, j + 1));
                }
            } else if !top_closed {
                leaks.push(cell(i, j));
            }
            if i == 0 && !vertical.covers(0, y0, y1) {
                leaks.push(cell(i, j));
            }
            if j == 0 && !horizontal.covers(0, x0, x1) {
                leaks.push(cell(i, j));
            }
        }
    }

    let mut open = vec![false; nx * ny];
    for c in leaks {
        let root = sets.find(c);
        open[root] = true;
    }

    let to_model = |x: f64, y: f64| origin + u_axis * x + v_axis * y;
    let mut order: Vec<usize> = Vec::new();
    let mut grouped: HashMap<usize, Vec<[Point3d; 4]>> = HashMap::new();
    for j in 0..ny {
        for i in 0..nx {
            let root = sets.find(cell(i, j));
            if open[root] {
                continue;
            }
            let patch = [
                to_model(xs[i], ys[j]),
                to_model(xs[i + 1], ys[j]),
                to_model(xs[i + 1], ys[j + 1]),
                to_model(xs[i], ys[j + 1]),
            ];
            let entry = grouped.entry(root).or_insert_with(|| {
                order.push(root);
                Vec::new()
            });
            entry.push(patch);
        }
    }

    Ok(order
        .into_iter()
        .filter_map(|root| grouped.remove(&root))
        .map(|patches| Region { patches })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 1e-9;

    fn p(x: f64, y: f64) -> Point3d {
        Point3d::new(x, y, 0.0)
    }

    fn grid_lines(cols: usize, rows: usize) -> Vec<(Point3d, Point3d)> {
        let (w, h) = (cols as f64, rows as f64);
        let mut lines = vec![(p(0.0, 0.0), p(w, 0.0)), (p(0.0, 0.0), p(0.0, h))];
        for k in 1..=cols {
            lines.push((p(k as f64, 0.0), p(k as f64, h)));
        }
        for k in 1..=rows {
            lines.push((p(0.0, k as f64), p(w, k as f64)));
        }
        lines
    }

    #[test]
    fn test_full_grid_yields_one_region_per_cell() {
        let regions = closed_regions(Point3d::ORIGIN, Vec3::Z, &grid_lines(3, 2), TOL).unwrap();
        assert_eq!(regions.len(), 6);
        assert!(regions.iter().all(|r| r.patches.len() == 1));
        let first = regions[0].clone().into_profile(KernelId(1));
        assert_eq!(first.bbox_midpoint(), Point3d::new(0.5, 0.5, 0.0));
        assert!((first.area() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_missing_interior_line_merges_cells() {
        let mut lines = grid_lines(2, 2);
        lines.retain(|(a, b)| !(a.x == 1.0 && b.x == 1.0));
        lines.push((p(1.0, 1.0), p(1.0, 2.0)));
        let regions = closed_regions(Point3d::ORIGIN, Vec3::Z, &lines, TOL).unwrap();
        assert_eq!(regions.len(), 3);
        assert_eq!(regions[0].patches.len(), 2);
        assert_eq!(regions[1].patches.len(), 1);
    }

    #[test]
    fn test_open_boundary_has_no_region() {
        let mut lines = grid_lines(2, 2);
        lines.retain(|(a, b)| !(a.x == 2.0 && b.x == 2.0));
        let regions = closed_regions(Point3d::ORIGIN, Vec3::Z, &lines, TOL).unwrap();
        // nothing closes the right column
        assert_eq!(regions.len(), 2);
    }

    #[test]
    fn test_skew_line_is_rejected() {
        let lines = vec![(p(0.0, 0.0), p(1.0, 0.0)), (p(0.0, 0.0), p(1.0, 1.0))];
        assert!(matches!(
            closed_regions(Point3d::ORIGIN, Vec3::Z, &lines, TOL),
            Err(KernelError::NotSupported { .. })
        ));
    }

    #[test]
    fn test_off_plane_point_is_rejected() {
        let lines = vec![(p(0.0, 0.0), Point3d::new(1.0, 0.0, 0.5))];
        assert!(matches!(
            closed_regions(Point3d::ORIGIN, Vec3::Z, &lines, TOL),
            Err(KernelError::SketchFailed { .. })
        ));
    }

    #[test]
    fn test_rotated_plane_patches_are_ccw_about_normal() {
        let origin = Point3d::new(0.0, 0.0, 5.0);
        let normal = Vec3::new(0.0, 0.0, 1.0);
        let lines = vec![
            (origin, origin + Vec3::new(0.0, 2.0, 0.0)),
            (origin, origin + Vec3::new(-1.0, 0.0, 0.0)),
            (origin + Vec3::new(0.0, 2.0, 0.0), origin + Vec3::new(-1.0, 2.0, 0.0)),
            (origin + Vec3::new(-1.0, 0.0, 0.0), origin + Vec3::new(-1.0, 2.0, 0.0)),
        ];
        let regions = closed_regions(origin, normal, &lines, TOL).unwrap();
        assert_eq!(regions.len(), 1);
        let c = regions[0].patches[0];
        let turn = c[0].vector_to(&c[1]).cross(&c[1].vector_to(&c[2]));
        assert!(turn.dot(&normal) > 0.0);
    }
}
