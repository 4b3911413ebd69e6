//! `perturbo`: randomized smoothing of combinatorial maximizers.
//!
//! A combinatorial maximizer maps a parameter vector `theta` to a vertex of a fixed finite
//! solution set (an LP vertex, a shortest path, a ranking). It is piecewise constant in
//! `theta`, so its gradient is zero almost everywhere. Perturbing the input,
//!
//! ```text
//!   y_eps(theta) = E_z[ argmax_{y in Y} <theta + eps * z, y> ],    z ~ N(0, I)
//! ```
//!
//! gives a smooth map whose value is an expectation over vertices. This crate estimates that
//! expectation by Monte Carlo and keeps the estimate as an explicit distribution:
//!
//! 1. [`sample`] / [`PerturbedMaximizer`]: call the maximizer on `nb_samples` seeded
//!    perturbations of `theta` and collect a [`FixedAtomsProbabilityDistribution`] with one atom
//!    per sample, each with weight `1 / nb_samples`.
//! 2. [`compress_distribution`]: merge atoms within a tolerance into their earliest match,
//!    conserving total mass. Typical maximizers hit only a handful of distinct vertices, so the
//!    compacted distribution is small.
//! 3. [`expectation`]: weighted sum of atoms.
//!
//! **Goals:**
//! - **Deterministic by default**: same maximizer, `theta`, config and seed produce the same
//!   atoms and weights, sequential or parallel.
//! - **Black-box maximizer**: anything implementing [`Maximizer`] (including plain closures).
//! - **Typed atoms**: the [`Atom`] trait states what compaction and expectation need.
//!
//! **Non-goals:**
//! - Gradients / backward rules, Fenchel–Young losses, training loops.
//! - Plotting.
//!
//! # Example
//!
//! ```rust
//! use perturbo::{PerturbationConfig, PerturbedMaximizer, RegularPolygon};
//!
//! let heptagon = RegularPolygon::heptagon();
//! let layer = PerturbedMaximizer::new(
//!     heptagon.clone(),
//!     PerturbationConfig::additive(0.2, 100).with_seed(0),
//! )
//! .unwrap();
//!
//! let mut dist = layer.distribution(&[0.0, 0.5], &()).unwrap();
//! assert_eq!(dist.len(), 100);
//!
//! dist.compress(0.0).unwrap();
//! assert!(dist.len() < 100);
//!
//! let y = dist.expectation().unwrap();
//! assert!(heptagon.contains_point(y));
//! ```
//!
//! # Cargo features
//!
//! - `parallel` (default): [`PerturbationConfig::parallel`] runs maximizer calls on rayon.
//! - `serde`: `Serialize`/`Deserialize` for configs and distributions.
//!
//! # Logging
//!
//! Sampling and compaction emit [`tracing`] events (`debug` for progress, `warn` on maximizer
//! failure). No subscriber is installed by the library.
//!
//! ## References
//!
//! - Berthet, Blondel, Teboul, Cuturi, Vert, Bach (2020). "Learning with Differentiable
//!   Perturbed Optimizers" (NeurIPS).
//! - Blondel, Martins, Niculae (2020). "Learning with Fenchel-Young Losses" (JMLR).

#![forbid(unsafe_code)]

use thiserror::Error;

mod atom;
pub use atom::*;

mod distribution;
pub use distribution::*;

mod maximizer;
pub use maximizer::*;

mod perturbation;
pub use perturbation::*;

mod sampler;
pub use sampler::*;

pub mod polygon;
pub use polygon::{polar_angle, sort_by_angle, RegularPolygon};

pub const PERTURBO_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Boxed error type that maximizers report failures with.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum Error {
    /// Rejected before any work: bad `epsilon` / `nb_samples` / weights / tolerance.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The external maximizer failed (or returned a non-finite solution) for one sample.
    #[error("maximizer failed on sample {sample}: {source}")]
    MaximizerFailure {
        sample: usize,
        #[source]
        source: BoxError,
    },

    #[error("expectation of an empty distribution")]
    EmptyDistribution,

    /// A zero-norm vector where a direction is required.
    #[error("degenerate input: {0}")]
    DegenerateInput(&'static str),

    #[error("length mismatch: {0} vs {1}")]
    LengthMismatch(usize, usize),
}

pub type Result<T> = std::result::Result<T, Error>;
