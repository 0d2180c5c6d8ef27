//! Scattered-data interpolation onto a regular grid.
//!
//! Piecewise-linear estimation: the input points are Delaunay-triangulated
//! (Bowyer-Watson) and every grid node inside the convex hull gets the
//! barycentric blend of its containing triangle's values. Nodes outside the
//! hull stay NaN; no extrapolation is performed. The triangulation inserts
//! points in input order, so results are deterministic for a fixed ordering.

use crate::{Result, SieveError};

/// Grid nodes on or just inside a triangle edge still count as covered.
const EDGE_TOL: f64 = 1e-9;

/// A regular mesh spanning the observed x/y ranges with one estimated value
/// per node. `values[row][col]` pairs with `(xs[col], ys[row])`; NaN marks a
/// node outside the convex hull of the input.
#[derive(Clone, Debug)]
pub struct GridSurface {
    pub xs: Vec<f64>,
    pub ys: Vec<f64>,
    pub values: Vec<Vec<f64>>,
}

impl GridSurface {
    pub fn resolution(&self) -> usize {
        self.xs.len()
    }

    /// True if at least one node carries a defined value.
    pub fn has_defined_nodes(&self) -> bool {
        self.values
            .iter()
            .any(|row| row.iter().any(|v| !v.is_nan()))
    }

    /// Min and max over the defined nodes, if any.
    pub fn value_range(&self) -> Option<(f64, f64)> {
        let mut range: Option<(f64, f64)> = None;
        for v in self.values.iter().flatten().filter(|v| !v.is_nan()) {
            range = Some(match range {
                Some((lo, hi)) => (lo.min(*v), hi.max(*v)),
                None => (*v, *v),
            });
        }
        range
    }
}

/// `n` evenly spaced values from `a` to `b` inclusive. The last value is
/// pinned to `b` so rounding never shaves the endpoint off the grid.
fn linspace(a: f64, b: f64, n: usize) -> Vec<f64> {
    debug_assert!(n >= 2);
    let step = (b - a) / (n - 1) as f64;
    (0..n)
        .map(|i| if i == n - 1 { b } else { a + step * i as f64 })
        .collect()
}

fn circumcircle(
    p: (f64, f64),
    q: (f64, f64),
    r: (f64, f64),
) -> Option<(f64, f64, f64)> {
    let d = 2.0 * (p.0 * (q.1 - r.1) + q.0 * (r.1 - p.1) + r.0 * (p.1 - q.1));
    if d.abs() < 1e-12 {
        return None;
    }
    let p2 = p.0 * p.0 + p.1 * p.1;
    let q2 = q.0 * q.0 + q.1 * q.1;
    let r2 = r.0 * r.0 + r.1 * r.1;
    let cx = (p2 * (q.1 - r.1) + q2 * (r.1 - p.1) + r2 * (p.1 - q.1)) / d;
    let cy = (p2 * (r.0 - q.0) + q2 * (p.0 - r.0) + r2 * (q.0 - p.0)) / d;
    let dx = p.0 - cx;
    let dy = p.1 - cy;
    Some((cx, cy, dx * dx + dy * dy))
}

/// Bowyer-Watson incremental Delaunay triangulation. Returns vertex-index
/// triples into `pts`. Collinear input produces no triangles.
fn delaunay(pts: &[(f64, f64)]) -> Vec<[usize; 3]> {
    let n = pts.len();
    if n < 3 {
        return Vec::new();
    }

    let (mut min_x, mut min_y) = pts[0];
    let (mut max_x, mut max_y) = pts[0];
    for &(x, y) in pts {
        min_x = min_x.min(x);
        max_x = max_x.max(x);
        min_y = min_y.min(y);
        max_y = max_y.max(y);
    }
    let span = (max_x - min_x).max(max_y - min_y).max(1.0);
    let mid_x = (min_x + max_x) / 2.0;
    let mid_y = (min_y + max_y) / 2.0;

    // Super-triangle far enough out to contain every input point; its three
    // vertices live at indices n, n+1, n+2.
    let mut all: Vec<(f64, f64)> = pts.to_vec();
    all.push((mid_x - 20.0 * span, mid_y - span));
    all.push((mid_x, mid_y + 20.0 * span));
    all.push((mid_x + 20.0 * span, mid_y - span));

    let mut triangles: Vec<[usize; 3]> = vec![[n, n + 1, n + 2]];

    for i in 0..n {
        let p = all[i];

        let mut bad: Vec<usize> = Vec::new();
        for (t, tri) in triangles.iter().enumerate() {
            if let Some((cx, cy, rr)) = circumcircle(all[tri[0]], all[tri[1]], all[tri[2]]) {
                let dx = p.0 - cx;
                let dy = p.1 - cy;
                if dx * dx + dy * dy < rr {
                    bad.push(t);
                }
            }
        }

        // Boundary of the cavity: edges belonging to exactly one bad triangle.
        let mut edges: Vec<(usize, usize)> = Vec::new();
        for &t in &bad {
            let tri = triangles[t];
            for (a, b) in [(tri[0], tri[1]), (tri[1], tri[2]), (tri[2], tri[0])] {
                let key = (a.min(b), a.max(b));
                if let Some(pos) = edges.iter().position(|&e| e == key) {
                    edges.remove(pos);
                } else {
                    edges.push(key);
                }
            }
        }

        for &t in bad.iter().rev() {
            triangles.remove(t);
        }
        for (a, b) in edges {
            triangles.push([a, b, i]);
        }
    }

    triangles.retain(|tri| tri.iter().all(|&v| v < n));
    triangles
}

/// Barycentric coordinates of `p` in the triangle `(a, b, c)`, or None for a
/// degenerate (zero-area) triangle.
fn barycentric(
    a: (f64, f64),
    b: (f64, f64),
    c: (f64, f64),
    p: (f64, f64),
) -> Option<(f64, f64, f64)> {
    let d = (b.1 - c.1) * (a.0 - c.0) + (c.0 - b.0) * (a.1 - c.1);
    if d.abs() < 1e-300 {
        return None;
    }
    let w1 = ((b.1 - c.1) * (p.0 - c.0) + (c.0 - b.0) * (p.1 - c.1)) / d;
    let w2 = ((c.1 - a.1) * (p.0 - c.0) + (a.0 - c.0) * (p.1 - c.1)) / d;
    Some((w1, w2, 1.0 - w1 - w2))
}

/// Interpolate scattered samples of a scalar field onto a regular
/// `resolution` x `resolution` mesh spanning the observed x/y ranges.
///
/// # Arguments
///
/// * `x`, `y`, `z` - Parallel sample coordinates and values; at least 3
///   points with finite coordinates are required
/// * `resolution` - Nodes per axis, must be >= 2 (callers default to 100)
///
/// # Errors
///
/// Fails on mismatched input lengths, fewer than 3 usable points, or when no
/// grid node ends up inside the hull (collinear input, degenerate hull).
pub fn interpolate_to_grid(
    x: &[f64],
    y: &[f64],
    z: &[f64],
    resolution: usize,
) -> Result<GridSurface> {
    if x.len() != y.len() || x.len() != z.len() {
        return Err(SieveError::PointLengthMismatch {
            x: x.len(),
            y: y.len(),
            z: z.len(),
        });
    }
    debug_assert!(resolution >= 2);

    // Rows with a non-finite coordinate or value cannot participate.
    let mut pts: Vec<(f64, f64)> = Vec::with_capacity(x.len());
    let mut vals: Vec<f64> = Vec::with_capacity(z.len());
    for i in 0..x.len() {
        if x[i].is_finite() && y[i].is_finite() && z[i].is_finite() {
            pts.push((x[i], y[i]));
            vals.push(z[i]);
        }
    }
    if pts.len() < 3 {
        return Err(SieveError::NotEnoughPoints(pts.len()));
    }

    let (mut min_x, mut min_y) = pts[0];
    let (mut max_x, mut max_y) = pts[0];
    for &(px, py) in &pts {
        min_x = min_x.min(px);
        max_x = max_x.max(px);
        min_y = min_y.min(py);
        max_y = max_y.max(py);
    }

    let xs = linspace(min_x, max_x, resolution);
    let ys = linspace(min_y, max_y, resolution);

    let triangles = delaunay(&pts);

    let mut any_defined = false;
    let mut values = vec![vec![f64::NAN; resolution]; resolution];
    for (row, &gy) in ys.iter().enumerate() {
        for (col, &gx) in xs.iter().enumerate() {
            for tri in &triangles {
                let (a, b, c) = (pts[tri[0]], pts[tri[1]], pts[tri[2]]);
                if let Some((w1, w2, w3)) = barycentric(a, b, c, (gx, gy)) {
                    if w1 >= -EDGE_TOL && w2 >= -EDGE_TOL && w3 >= -EDGE_TOL {
                        values[row][col] =
                            w1 * vals[tri[0]] + w2 * vals[tri[1]] + w3 * vals[tri[2]];
                        any_defined = true;
                        break;
                    }
                }
            }
        }
    }

    if !any_defined {
        return Err(SieveError::EmptySurface);
    }

    Ok(GridSurface { xs, ys, values })
}
