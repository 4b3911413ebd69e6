//! The external maximizer contract.
//!
//! A maximizer is any pure map `(theta, aux) -> atom`, typically an LP vertex oracle or a
//! shortest-path solver. This crate never looks inside it: the sampler only calls
//! [`Maximizer::maximize`] once per perturbation draw, possibly from several threads at once.

use crate::{Atom, BoxError};

/// A (combinatorial) maximizer over a fixed solution set.
///
/// Implementations must be deterministic given their inputs and hold no shared mutable
/// state; `Sync` is required so parallel sampling can share one instance.
///
/// Closures of the form `Fn(&[f64], &Aux) -> Result<T, E>` implement this trait directly:
///
/// ```rust
/// use perturbo::{sample, PerturbationConfig};
///
/// // argmax over the two coordinate axes of the unit square.
/// let argmax = |theta: &[f64], _: &()| -> Result<[f64; 2], std::convert::Infallible> {
///     Ok(if theta[0] >= theta[1] { [1.0, 0.0] } else { [0.0, 1.0] })
/// };
/// let cfg = PerturbationConfig::additive(0.5, 16).with_seed(1);
/// let dist = sample(&argmax, &[1.0, 0.0], &(), &cfg).unwrap();
/// assert_eq!(dist.len(), 16);
/// ```
pub trait Maximizer<Aux: ?Sized>: Sync {
    /// Solution type returned for each query.
    type Output: Atom + Send;

    /// Return the maximizing solution for parameter `theta` and problem data `aux`.
    fn maximize(&self, theta: &[f64], aux: &Aux) -> Result<Self::Output, BoxError>;
}

impl<Aux, T, E, F> Maximizer<Aux> for F
where
    Aux: ?Sized,
    F: Fn(&[f64], &Aux) -> Result<T, E> + Sync,
    T: Atom + Send,
    E: Into<BoxError>,
{
    type Output = T;

    fn maximize(&self, theta: &[f64], aux: &Aux) -> Result<T, BoxError> {
        self(theta, aux).map_err(Into::into)
    }
}
