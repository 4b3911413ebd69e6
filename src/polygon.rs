//! Regular polygons as a reference vertex oracle.
//!
//! The k vertices of a regular k-gon inscribed in the unit circle form the smallest
//! interesting combinatorial solution set: argmax of `<theta, v>` over vertices is piecewise
//! constant in `theta`, and its perturbed expectation lands strictly inside the polygon.
//!
//! Also hosts the 2-D ordering helpers (polar angle, angular sort) used to present a sampled
//! distribution vertex by vertex.

use std::f64::consts::TAU;

use crate::{BoxError, Error, FixedAtomsProbabilityDistribution, Maximizer, Result};

/// Regular polygon with `k >= 3` vertices on the unit circle, vertex 0 at angle 0.
#[derive(Debug, Clone, PartialEq)]
pub struct RegularPolygon {
    vertices: Vec<[f64; 2]>,
}

impl RegularPolygon {
    pub fn new(k: usize) -> Result<Self> {
        if k < 3 {
            return Err(Error::InvalidConfiguration(format!(
                "a polygon needs at least 3 vertices, got {k}"
            )));
        }
        Ok(Self::with_vertex_count(k))
    }

    /// The seven-vertex polygon of the reference scenario.
    pub fn heptagon() -> Self {
        Self::with_vertex_count(7)
    }

    fn with_vertex_count(k: usize) -> Self {
        let vertices = (0..k)
            .map(|v| {
                let a = TAU * v as f64 / k as f64;
                [a.cos(), a.sin()]
            })
            .collect();
        Self { vertices }
    }

    pub fn vertices(&self) -> &[[f64; 2]] {
        &self.vertices
    }

    pub fn k(&self) -> usize {
        self.vertices.len()
    }

    /// Index of the vertex maximizing `<theta, v>`; ties go to the lowest index.
    pub fn argmax(&self, theta: [f64; 2]) -> usize {
        let mut best = 0usize;
        let mut best_score = f64::NEG_INFINITY;
        for (i, v) in self.vertices.iter().enumerate() {
            let s = theta[0] * v[0] + theta[1] * v[1];
            if s > best_score {
                best_score = s;
                best = i;
            }
        }
        best
    }

    /// Mean of the vertices (the origin, up to rounding).
    pub fn centroid(&self) -> [f64; 2] {
        let n = self.vertices.len() as f64;
        let (sx, sy) = self
            .vertices
            .iter()
            .fold((0.0, 0.0), |(x, y), v| (x + v[0], y + v[1]));
        [sx / n, sy / n]
    }

    /// Whether `p` lies in the closed polygon (within `1e-12`).
    pub fn contains_point(&self, p: [f64; 2]) -> bool {
        self.signed_edge_distances(p).all(|d| d >= -1e-12)
    }

    /// Whether `p` lies strictly inside the polygon.
    pub fn contains_point_strictly(&self, p: [f64; 2]) -> bool {
        self.signed_edge_distances(p).all(|d| d > 1e-12)
    }

    /// Cross products of each counter-clockwise edge with `p - edge.start`.
    fn signed_edge_distances(&self, p: [f64; 2]) -> impl Iterator<Item = f64> + '_ {
        let k = self.vertices.len();
        (0..k).map(move |i| {
            let a = self.vertices[i];
            let b = self.vertices[(i + 1) % k];
            (b[0] - a[0]) * (p[1] - a[1]) - (b[1] - a[1]) * (p[0] - a[0])
        })
    }
}

impl Maximizer<()> for RegularPolygon {
    type Output = [f64; 2];

    fn maximize(&self, theta: &[f64], _aux: &()) -> std::result::Result<[f64; 2], BoxError> {
        let &[x, y] = theta else {
            return Err(Error::LengthMismatch(theta.len(), 2).into());
        };
        Ok(self.vertices[self.argmax([x, y])])
    }
}

/// Polar angle of `v` in `[0, 2π)`.
///
/// Fails with [`Error::DegenerateInput`] for a zero (or non-finite) vector instead of
/// returning a meaningless angle.
pub fn polar_angle(v: [f64; 2]) -> Result<f64> {
    let norm = v[0].hypot(v[1]);
    if !(norm.is_finite() && norm > 0.0) {
        return Err(Error::DegenerateInput("polar angle of a zero or non-finite vector"));
    }
    let a = v[1].atan2(v[0]);
    Ok(if a < 0.0 { a + TAU } else { a })
}

/// Reorder a 2-D distribution by increasing polar angle, keeping weights paired.
///
/// Fails with [`Error::DegenerateInput`] if any atom is the zero vector.
pub fn sort_by_angle(
    dist: FixedAtomsProbabilityDistribution<[f64; 2]>,
) -> Result<FixedAtomsProbabilityDistribution<[f64; 2]>> {
    let (atoms, weights) = dist.into_parts();
    let mut rows = atoms
        .into_iter()
        .zip(weights)
        .map(|(a, w)| polar_angle(a).map(|t| (t, a, w)))
        .collect::<Result<Vec<_>>>()?;
    rows.sort_by(|x, y| x.0.total_cmp(&y.0));
    let (atoms, weights) = rows.into_iter().map(|(_, a, w)| (a, w)).unzip();
    FixedAtomsProbabilityDistribution::new(atoms, weights)
}
