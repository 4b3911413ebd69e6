//! Atom capability contract.
//!
//! An atom is one element of a maximizer's output space. The distribution and
//! expectation code only needs three things from it:
//! - approximate equality under an absolute tolerance (for compaction),
//! - scalar multiplication and accumulation (for expectations),
//! - a finiteness check and a dimension (to reject invalid maximizer outputs).

/// A value a maximizer can return, usable as a distribution atom.
///
/// Closeness is Euclidean: `a.approx_eq(b, atol)` iff `‖a - b‖ <= atol`.
/// With `atol = 0` only exactly equal atoms compare equal, and NaN never does.
pub trait Atom: Clone {
    /// Whether `self` and `other` lie within `atol` of each other.
    fn approx_eq(&self, other: &Self, atol: f64) -> bool;

    /// Return `w * self`.
    fn scaled(&self, w: f64) -> Self;

    /// In-place `self += w * other`.
    fn add_scaled(&mut self, other: &Self, w: f64);

    /// Whether every coordinate is finite.
    fn is_finite(&self) -> bool;

    /// Number of coordinates. Atoms combined by `add_scaled` must agree on it.
    fn dim(&self) -> usize;
}

fn dist2(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

fn slice_approx_eq(a: &[f64], b: &[f64], atol: f64) -> bool {
    if a.len() != b.len() {
        return false;
    }
    if atol == 0.0 {
        return a == b;
    }
    dist2(a, b).sqrt() <= atol
}

impl Atom for f64 {
    fn approx_eq(&self, other: &Self, atol: f64) -> bool {
        if atol == 0.0 {
            return self == other;
        }
        (self - other).abs() <= atol
    }

    fn scaled(&self, w: f64) -> Self {
        w * self
    }

    fn add_scaled(&mut self, other: &Self, w: f64) {
        *self += w * other;
    }

    fn is_finite(&self) -> bool {
        f64::is_finite(*self)
    }

    fn dim(&self) -> usize {
        1
    }
}

impl Atom for Vec<f64> {
    fn approx_eq(&self, other: &Self, atol: f64) -> bool {
        slice_approx_eq(self, other, atol)
    }

    fn scaled(&self, w: f64) -> Self {
        self.iter().map(|x| w * x).collect()
    }

    fn add_scaled(&mut self, other: &Self, w: f64) {
        debug_assert_eq!(self.len(), other.len(), "atom dimension mismatch");
        for (x, y) in self.iter_mut().zip(other) {
            *x += w * y;
        }
    }

    fn is_finite(&self) -> bool {
        self.iter().all(|x| x.is_finite())
    }

    fn dim(&self) -> usize {
        self.len()
    }
}

impl<const N: usize> Atom for [f64; N] {
    fn approx_eq(&self, other: &Self, atol: f64) -> bool {
        slice_approx_eq(self, other, atol)
    }

    fn scaled(&self, w: f64) -> Self {
        self.map(|x| w * x)
    }

    fn add_scaled(&mut self, other: &Self, w: f64) {
        for (x, y) in self.iter_mut().zip(other) {
            *x += w * y;
        }
    }

    fn is_finite(&self) -> bool {
        self.iter().all(|x| x.is_finite())
    }

    fn dim(&self) -> usize {
        N
    }
}
