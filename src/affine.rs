//! Least-squares affine fit between raw sensor points and screen points.
//!
//! Each measured raw point contributes a row `[x, y, -1]` to the design
//! matrix `B`. The normal matrix `N = Bᵗ·B` is always 3×3, whatever the
//! number of points, so both axes are solved in closed form from the
//! cofactors of `N`. Every point carries the same weight.
//!
//! Measured points are taken relative to their centroid while accumulating
//! `N`; the offsets are shifted back once the system is solved.

use serde::{Deserialize, Serialize};

use crate::geometry::Point2D;

/// Minimum number of point pairs for a six-parameter fit.
pub const MIN_POINTS: usize = 3;

/// `|det N|` below this fraction of `n·max(Sxx, Syy)²`, taken over the
/// centred points, is treated as singular.
const SINGULAR_TOLERANCE: f64 = 1e-12;

/// `screen_x = a*raw_x + b*raw_y + c`, `screen_y = d*raw_x + e*raw_y + f`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AffineParameters {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
    /// Root-sum-square distance between the fitted and reference points,
    /// divided by the point count. Screen units.
    pub residual: f64,
}

impl AffineParameters {
    pub fn transform(&self, raw: Point2D) -> Point2D {
        Point2D::new(
            self.a * raw.x + self.b * raw.y + self.c,
            self.d * raw.x + self.e * raw.y + self.f,
        )
    }

    pub fn coefficients(&self) -> [f64; 6] {
        [self.a, self.b, self.c, self.d, self.e, self.f]
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SolveError {
    #[error("reference and measured point counts differ ({references} vs {measured})")]
    LengthMismatch { references: usize, measured: usize },

    #[error("at least {MIN_POINTS} calibration points are required, got {count}")]
    InsufficientPoints { count: usize },

    #[error("calibration points are collinear or duplicated; retry with points spread across the screen")]
    SingularSystem,
}

/// Fit the affine map taking `measured` (raw) points onto `references` (screen).
pub fn solve(references: &[Point2D], measured: &[Point2D]) -> Result<AffineParameters, SolveError> {
    if references.len() != measured.len() {
        return Err(SolveError::LengthMismatch {
            references: references.len(),
            measured: measured.len(),
        });
    }
    let count = references.len();
    if count < MIN_POINTS {
        return Err(SolveError::InsufficientPoints { count });
    }

    let centroid = centroid(measured);
    let normal = NormalEquations::accumulate(references, measured, centroid);
    let cofactors = normal.cofactors();
    let det = normal.n[0][0] * cofactors[0][0]
        + normal.n[0][1] * cofactors[0][1]
        + normal.n[0][2] * cofactors[0][2];

    // Centred, det N = n·(Sxx·Syy - Sxy²), so this ratio depends only on the
    // shape of the point cloud, not on its position or units.
    let spread = normal.n[0][0].max(normal.n[1][1]);
    if !det.is_finite() || det.abs() <= SINGULAR_TOLERANCE * normal.n[2][2] * spread * spread {
        return Err(SolveError::SingularSystem);
    }
    let inv_det = 1.0 / det;
    if !inv_det.is_finite() {
        return Err(SolveError::SingularSystem);
    }

    let p1 = apply(&cofactors, &normal.t1, inv_det);
    let p2 = apply(&cofactors, &normal.t2, inv_det);

    // The third unknown multiplies the -1 column, so the offset is its
    // negation, moved back from the centroid to the raw origin.
    let mut params = AffineParameters {
        a: p1[0],
        b: p1[1],
        c: -p1[2] - p1[0] * centroid.x - p1[1] * centroid.y,
        d: p2[0],
        e: p2[1],
        f: -p2[2] - p2[0] * centroid.x - p2[1] * centroid.y,
        residual: 0.0,
    };
    if params.coefficients().iter().any(|v| !v.is_finite()) {
        return Err(SolveError::SingularSystem);
    }

    let sum_sq: f64 = references
        .iter()
        .zip(measured)
        .map(|(r, m)| params.transform(*m).distance_squared(*r))
        .sum();
    params.residual = sum_sq.sqrt() / count as f64;

    Ok(params)
}

struct NormalEquations {
    n: [[f64; 3]; 3],
    t1: [f64; 3],
    t2: [f64; 3],
}

impl NormalEquations {
    fn accumulate(references: &[Point2D], measured: &[Point2D], origin: Point2D) -> Self {
        let mut n = [[0.0; 3]; 3];
        let mut t1 = [0.0; 3];
        let mut t2 = [0.0; 3];

        for (r, m) in references.iter().zip(measured) {
            let m = Point2D::new(m.x - origin.x, m.y - origin.y);
            n[0][0] += m.x * m.x;
            n[0][1] += m.x * m.y;
            n[0][2] -= m.x;
            n[1][1] += m.y * m.y;
            n[1][2] -= m.y;

            t1[0] += m.x * r.x;
            t1[1] += m.y * r.x;
            t1[2] -= r.x;

            t2[0] += m.x * r.y;
            t2[1] += m.y * r.y;
            t2[2] -= r.y;
        }
        n[2][2] = references.len() as f64;
        n[1][0] = n[0][1];
        n[2][0] = n[0][2];
        n[2][1] = n[1][2];

        Self { n, t1, t2 }
    }

    /// Cofactor matrix of N. N is symmetric, so this is also its adjugate.
    fn cofactors(&self) -> [[f64; 3]; 3] {
        let n = &self.n;
        let c00 = n[1][1] * n[2][2] - n[1][2] * n[1][2];
        let c01 = n[0][2] * n[1][2] - n[0][1] * n[2][2];
        let c02 = n[0][1] * n[1][2] - n[1][1] * n[0][2];
        let c11 = n[0][0] * n[2][2] - n[0][2] * n[0][2];
        let c12 = n[0][1] * n[0][2] - n[0][0] * n[1][2];
        let c22 = n[0][0] * n[1][1] - n[0][1] * n[0][1];
        [[c00, c01, c02], [c01, c11, c12], [c02, c12, c22]]
    }

}

fn centroid(points: &[Point2D]) -> Point2D {
    let count = points.len() as f64;
    let (sx, sy) = points.iter().fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
    Point2D::new(sx / count, sy / count)
}

fn apply(adj: &[[f64; 3]; 3], t: &[f64; 3], inv_det: f64) -> [f64; 3] {
    let mut p = [0.0; 3];
    for (row, out) in adj.iter().zip(p.iter_mut()) {
        *out = (row[0] * t[0] + row[1] * t[1] + row[2] * t[2]) * inv_det;
    }
    p
}
