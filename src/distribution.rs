//! Fixed-atom probability distributions.
//!
//! A [`FixedAtomsProbabilityDistribution`] is a finite multiset of `(atom, weight)` pairs.
//! The perturbation sampler produces one with a uniform weight per sample, duplicates included;
//! [`compress`](FixedAtomsProbabilityDistribution::compress) then merges near-identical atoms
//! without changing the total mass, and
//! [`expectation`](FixedAtomsProbabilityDistribution::expectation) reads the weighted mean off
//! the result.

use rand::Rng;
use tracing::debug;

use crate::{Atom, Error, Result};

/// Finite discrete distribution: `weights[i]` is the mass of `atoms[i]`.
///
/// Atoms are not required to be unique. Weights are non-negative and finite, but not required
/// to sum to 1 (a sampler may produce sums like `nb_samples * (1 / nb_samples)` that drift by
/// an ulp).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FixedAtomsProbabilityDistribution<A> {
    atoms: Vec<A>,
    weights: Vec<f64>,
}

impl<A> FixedAtomsProbabilityDistribution<A> {
    /// Pair `atoms` with `weights`.
    ///
    /// Fails with [`Error::InvalidConfiguration`] on a length mismatch or on a negative /
    /// non-finite weight.
    pub fn new(atoms: Vec<A>, weights: Vec<f64>) -> Result<Self> {
        if atoms.len() != weights.len() {
            return Err(Error::InvalidConfiguration(format!(
                "atoms/weights length mismatch: {} vs {}",
                atoms.len(),
                weights.len()
            )));
        }
        if let Some((i, w)) = weights
            .iter()
            .enumerate()
            .find(|(_, w)| !(w.is_finite() && **w >= 0.0))
        {
            return Err(Error::InvalidConfiguration(format!(
                "weight {i} must be finite and non-negative, got {w}"
            )));
        }
        Ok(Self { atoms, weights })
    }

    /// Uniform distribution: every atom gets `1 / atoms.len()`.
    pub fn uniform(atoms: Vec<A>) -> Self {
        let w = if atoms.is_empty() {
            0.0
        } else {
            1.0 / atoms.len() as f64
        };
        let weights = vec![w; atoms.len()];
        Self { atoms, weights }
    }

    pub fn len(&self) -> usize {
        self.atoms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atoms.is_empty()
    }

    pub fn atoms(&self) -> &[A] {
        &self.atoms
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Iterate `(atom, weight)` pairs in storage order.
    pub fn iter(&self) -> impl Iterator<Item = (&A, f64)> + '_ {
        self.atoms.iter().zip(self.weights.iter().copied())
    }

    /// Sum of all weights.
    pub fn total_mass(&self) -> f64 {
        self.weights.iter().sum()
    }

    /// Rescale weights so they sum to 1.
    ///
    /// Fails with [`Error::EmptyDistribution`] if there is no mass to rescale.
    pub fn normalize(&mut self) -> Result<&mut Self> {
        let total = self.total_mass();
        if self.is_empty() || total <= 0.0 {
            return Err(Error::EmptyDistribution);
        }
        for w in &mut self.weights {
            *w /= total;
        }
        Ok(self)
    }

    /// Apply `f` to every atom, keeping weights (post-processing of sampled solutions).
    pub fn map_atoms<B, F>(self, f: F) -> FixedAtomsProbabilityDistribution<B>
    where
        F: FnMut(A) -> B,
    {
        FixedAtomsProbabilityDistribution {
            atoms: self.atoms.into_iter().map(f).collect(),
            weights: self.weights,
        }
    }

    /// Draw one atom with probability proportional to its weight.
    ///
    /// Returns `None` if the distribution is empty or carries no mass.
    pub fn sample_atom<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&A> {
        let total = self.total_mass();
        if self.is_empty() || total <= 0.0 {
            return None;
        }
        let r: f64 = rng.random::<f64>() * total;
        let mut cdf = 0.0;
        for (a, w) in self.iter() {
            cdf += w;
            if r < cdf {
                return Some(a);
            }
        }
        // Numerical fallback: last atom with positive mass.
        self.atoms
            .iter()
            .zip(&self.weights)
            .rev()
            .find(|(_, w)| **w > 0.0)
            .map(|(a, _)| a)
    }

    /// Split into `(atoms, weights)`.
    pub fn into_parts(self) -> (Vec<A>, Vec<f64>) {
        (self.atoms, self.weights)
    }
}

impl<A: Atom> FixedAtomsProbabilityDistribution<A> {
    /// Merge near-duplicate atoms in place; see [`compress_distribution`].
    pub fn compress(&mut self, atol: f64) -> Result<&mut Self> {
        compress_distribution(self, atol)
    }

    /// Weighted sum of atoms; see [`expectation`].
    pub fn expectation(&self) -> Result<A> {
        expectation(self)
    }
}

/// Merge atoms lying within `atol` of each other, in place.
///
/// Scan order is fixed and must not change (outputs are compared against reference runs):
/// - `i` goes from the last index down to the first;
/// - for each `i`, `j` goes up from `0` over `j < i`; the first `j` with
///   `atoms[i] ≈ atoms[j]` absorbs `weights[i]` and `i` is dropped.
///
/// So an atom merges into the *earliest* close atom, not the nearest one. Mass moved into
/// `j` includes whatever `i` had already absorbed from higher indices, so the total weight is
/// unchanged. After the call no two surviving atoms are within `atol`, which makes a second
/// call with the same `atol` a no-op.
///
/// The scan only touches a keep-mask and the working weights; surviving atoms are moved into
/// fresh vectors in one pass afterwards.
///
/// Fails with [`Error::InvalidConfiguration`] if `atol` is negative or NaN.
pub fn compress_distribution<A: Atom>(
    dist: &mut FixedAtomsProbabilityDistribution<A>,
    atol: f64,
) -> Result<&mut FixedAtomsProbabilityDistribution<A>> {
    if !(atol >= 0.0) {
        return Err(Error::InvalidConfiguration(format!(
            "atol must be >= 0, got {atol}"
        )));
    }
    let n = dist.len();
    if n <= 1 {
        return Ok(dist);
    }

    let mut keep = vec![true; n];
    let mut weights = dist.weights.clone();
    for i in (1..n).rev() {
        let ai = &dist.atoms[i];
        if let Some(j) = (0..i).find(|&j| ai.approx_eq(&dist.atoms[j], atol)) {
            weights[j] += weights[i];
            keep[i] = false;
        }
    }

    let survivors = keep.iter().filter(|k| **k).count();
    if survivors < n {
        let atoms = std::mem::take(&mut dist.atoms);
        let mut kept_atoms = Vec::with_capacity(survivors);
        let mut kept_weights = Vec::with_capacity(survivors);
        for ((a, w), k) in atoms.into_iter().zip(weights).zip(keep) {
            if k {
                kept_atoms.push(a);
                kept_weights.push(w);
            }
        }
        dist.atoms = kept_atoms;
        dist.weights = kept_weights;
    }
    debug!(before = n, after = survivors, atol, "compressed distribution");
    Ok(dist)
}

/// `Σ weights[i] * atoms[i]`.
///
/// This is the expectation only when weights sum to 1; normalizing is the caller's call.
/// Exact compaction (`atol = 0`) does not change the result beyond floating-point rounding.
/// With `atol > 0` each merged weight moves at most `atol`, so the result shifts by at most
/// `total_mass * atol`.
///
/// Fails with [`Error::EmptyDistribution`] if there are no atoms, and with
/// [`Error::LengthMismatch`] if the atoms disagree on their dimension.
pub fn expectation<A: Atom>(dist: &FixedAtomsProbabilityDistribution<A>) -> Result<A> {
    let mut it = dist.iter();
    let Some((a0, w0)) = it.next() else {
        return Err(Error::EmptyDistribution);
    };
    let d0 = a0.dim();
    if let Some(a) = dist.atoms.iter().find(|a| a.dim() != d0) {
        return Err(Error::LengthMismatch(d0, a.dim()));
    }
    let mut acc = a0.scaled(w0);
    for (a, w) in it {
        acc.add_scaled(a, w);
    }
    Ok(acc)
}
