//! Perturbation sampler: Monte Carlo estimate of `E_z[ maximizer(perturb(theta, epsilon, z)) ]`.
//!
//! Notes:
//! - Noise is **seeded**: a fixed seed (default `0`) gives bit-identical distributions.
//! - All `nb_samples` normal draws are taken from one `StdRng`, in sample order, before any
//!   maximizer call. Sample `i` always pairs with the `i`-th draw, so running the calls in
//!   parallel (feature `parallel`) cannot change the result.
//! - Failure is all-or-nothing: the first maximizer error aborts sampling.
//! - Every atom must have the dimension of sample 0's; the first one that does not is reported
//!   as a failure of its sample.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use tracing::{debug, warn};

use crate::{
    Atom, Error, FixedAtomsProbabilityDistribution, Maximizer, PerturbationConfig,
    PerturbationKind, Result,
};

/// Draw the `nb_samples` perturbed copies of `theta` described by `cfg`.
///
/// Does not validate `cfg`; callers go through [`PerturbedMaximizer`] or [`sample`].
fn draw_perturbations(theta: &[f64], cfg: &PerturbationConfig) -> Vec<Vec<f64>> {
    let mut rng = StdRng::seed_from_u64(cfg.effective_seed());
    let d = theta.len();
    let mut z = vec![0.0; d];
    let mut out = Vec::with_capacity(cfg.nb_samples);
    for _ in 0..cfg.nb_samples {
        for zi in z.iter_mut() {
            *zi = rng.sample(StandardNormal);
        }
        out.push(cfg.kind.apply(theta, &z, cfg.epsilon));
    }
    out
}

fn solve_one<M, Aux>(maximizer: &M, i: usize, theta_i: &[f64], aux: &Aux) -> Result<M::Output>
where
    M: Maximizer<Aux>,
    Aux: ?Sized,
{
    match maximizer.maximize(theta_i, aux) {
        Ok(y) if y.is_finite() => Ok(y),
        Ok(_) => {
            warn!(sample = i, "maximizer returned a non-finite solution");
            Err(Error::MaximizerFailure {
                sample: i,
                source: "maximizer returned a non-finite solution".into(),
            })
        }
        Err(source) => {
            warn!(sample = i, error = %source, "maximizer failed");
            Err(Error::MaximizerFailure { sample: i, source })
        }
    }
}

#[cfg(feature = "parallel")]
fn solve_all<M, Aux>(
    maximizer: &M,
    thetas: &[Vec<f64>],
    aux: &Aux,
    parallel: bool,
) -> Result<Vec<M::Output>>
where
    M: Maximizer<Aux>,
    Aux: ?Sized + Sync,
{
    use rayon::prelude::*;

    if parallel {
        // Indexed collect keeps results at their sample position.
        thetas
            .par_iter()
            .enumerate()
            .map(|(i, t)| solve_one(maximizer, i, t, aux))
            .collect()
    } else {
        solve_sequential(maximizer, thetas, aux)
    }
}

#[cfg(not(feature = "parallel"))]
fn solve_all<M, Aux>(
    maximizer: &M,
    thetas: &[Vec<f64>],
    aux: &Aux,
    _parallel: bool,
) -> Result<Vec<M::Output>>
where
    M: Maximizer<Aux>,
    Aux: ?Sized + Sync,
{
    solve_sequential(maximizer, thetas, aux)
}

fn solve_sequential<M, Aux>(
    maximizer: &M,
    thetas: &[Vec<f64>],
    aux: &Aux,
) -> Result<Vec<M::Output>>
where
    M: Maximizer<Aux>,
    Aux: ?Sized,
{
    thetas
        .iter()
        .enumerate()
        .map(|(i, t)| solve_one(maximizer, i, t, aux))
        .collect()
}

fn check_dimensions<A: Atom>(atoms: &[A]) -> Result<()> {
    let Some(d0) = atoms.first().map(Atom::dim) else {
        return Ok(());
    };
    match atoms.iter().position(|a| a.dim() != d0) {
        None => Ok(()),
        Some(i) => {
            let d = atoms[i].dim();
            warn!(sample = i, expected = d0, got = d, "maximizer returned a ragged solution");
            Err(Error::MaximizerFailure {
                sample: i,
                source: Error::LengthMismatch(d0, d).into(),
            })
        }
    }
}

/// Sample the perturbed maximizer: one atom per draw, each with weight `1 / nb_samples`.
///
/// The result is *not* compacted; duplicates are kept so `len() == cfg.nb_samples`.
///
/// Fails with [`Error::InvalidConfiguration`] before any maximizer call if `cfg` is invalid,
/// and with [`Error::MaximizerFailure`] if any call fails (no partial result).
pub fn sample<M, Aux>(
    maximizer: &M,
    theta: &[f64],
    aux: &Aux,
    cfg: &PerturbationConfig,
) -> Result<FixedAtomsProbabilityDistribution<M::Output>>
where
    M: Maximizer<Aux>,
    Aux: ?Sized + Sync,
{
    cfg.validate()?;
    debug!(
        kind = ?cfg.kind,
        epsilon = cfg.epsilon,
        nb_samples = cfg.nb_samples,
        seed = cfg.effective_seed(),
        dim = theta.len(),
        parallel = cfg.parallel,
        "sampling perturbed maximizer"
    );
    let thetas = draw_perturbations(theta, cfg);
    let atoms = solve_all(maximizer, &thetas, aux, cfg.parallel)?;
    check_dimensions(&atoms)?;
    Ok(FixedAtomsProbabilityDistribution::uniform(atoms))
}

/// A maximizer wrapped with a fixed, validated perturbation configuration.
///
/// This is the "perturbed layer": calling [`distribution`](Self::distribution) or
/// [`expected`](Self::expected) on some `theta` gives the smoothed counterpart of calling the
/// wrapped maximizer on `theta`.
#[derive(Debug, Clone)]
pub struct PerturbedMaximizer<M> {
    maximizer: M,
    cfg: PerturbationConfig,
}

impl<M> PerturbedMaximizer<M> {
    /// Wrap `maximizer`. Fails with [`Error::InvalidConfiguration`] if `cfg` is invalid.
    pub fn new(maximizer: M, cfg: PerturbationConfig) -> Result<Self> {
        cfg.validate()?;
        Ok(Self { maximizer, cfg })
    }

    /// Additive noise (`theta + epsilon * z`) with the default seed.
    pub fn additive(maximizer: M, epsilon: f64, nb_samples: usize) -> Result<Self> {
        Self::new(maximizer, PerturbationConfig::additive(epsilon, nb_samples))
    }

    /// Multiplicative noise (`theta * (1 + epsilon * z)`) with the default seed.
    pub fn multiplicative(maximizer: M, epsilon: f64, nb_samples: usize) -> Result<Self> {
        Self::new(maximizer, PerturbationConfig::multiplicative(epsilon, nb_samples))
    }

    pub fn config(&self) -> &PerturbationConfig {
        &self.cfg
    }

    pub fn perturbation_kind(&self) -> PerturbationKind {
        self.cfg.kind
    }

    pub fn maximizer(&self) -> &M {
        &self.maximizer
    }

    /// The perturbed inputs the maximizer would be called on, in sample order.
    pub fn perturbations(&self, theta: &[f64]) -> Vec<Vec<f64>> {
        draw_perturbations(theta, &self.cfg)
    }

    /// Raw (uncompacted) empirical distribution: `nb_samples` atoms of weight `1 / nb_samples`.
    pub fn distribution<Aux>(
        &self,
        theta: &[f64],
        aux: &Aux,
    ) -> Result<FixedAtomsProbabilityDistribution<M::Output>>
    where
        M: Maximizer<Aux>,
        Aux: ?Sized + Sync,
    {
        sample(&self.maximizer, theta, aux, &self.cfg)
    }

    /// [`distribution`](Self::distribution) followed by compaction with tolerance `atol`.
    pub fn distribution_compressed<Aux>(
        &self,
        theta: &[f64],
        aux: &Aux,
        atol: f64,
    ) -> Result<FixedAtomsProbabilityDistribution<M::Output>>
    where
        M: Maximizer<Aux>,
        Aux: ?Sized + Sync,
    {
        let mut dist = self.distribution(theta, aux)?;
        dist.compress(atol)?;
        Ok(dist)
    }

    /// Monte Carlo estimate of the smoothed maximizer at `theta`.
    pub fn expected<Aux>(&self, theta: &[f64], aux: &Aux) -> Result<M::Output>
    where
        M: Maximizer<Aux>,
        Aux: ?Sized + Sync,
    {
        self.distribution(theta, aux)?.expectation()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BoxError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// One-hot argmax over coordinates (the simplex vertex oracle).
    fn one_hot_argmax(theta: &[f64], _: &()) -> std::result::Result<Vec<f64>, BoxError> {
        if theta.is_empty() {
            return Err("empty theta".into());
        }
        let mut best = 0;
        for i in 1..theta.len() {
            if theta[i] > theta[best] {
                best = i;
            }
        }
        let mut y = vec![0.0; theta.len()];
        y[best] = 1.0;
        Ok(y)
    }

    #[test]
    fn sample_count_contract() {
        let cfg = PerturbationConfig::additive(1.0, 37).with_seed(5);
        let d = sample(&one_hot_argmax, &[0.1, 0.2, 0.3], &(), &cfg).unwrap();
        assert_eq!(d.len(), 37);
        for &w in d.weights() {
            assert_eq!(w, 1.0 / 37.0);
        }
    }

    #[test]
    fn invalid_config_fails_before_sampling() {
        let calls = AtomicUsize::new(0);
        let m = |theta: &[f64], _: &()| -> std::result::Result<Vec<f64>, BoxError> {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(theta.to_vec())
        };
        let bad = PerturbationConfig::additive(1.0, 0);
        assert!(matches!(
            sample(&m, &[1.0], &(), &bad),
            Err(Error::InvalidConfiguration(_))
        ));
        let bad = PerturbationConfig::additive(0.0, 4);
        assert!(matches!(
            sample(&m, &[1.0], &(), &bad),
            Err(Error::InvalidConfiguration(_))
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(PerturbedMaximizer::additive(m, -1.0, 3).is_err());
    }

    #[test]
    fn maximizer_called_exactly_n_times() {
        let calls = AtomicUsize::new(0);
        let m = |theta: &[f64], _: &()| -> std::result::Result<Vec<f64>, BoxError> {
            calls.fetch_add(1, Ordering::SeqCst);
            one_hot_argmax(theta, &())
        };
        let cfg = PerturbationConfig::additive(0.3, 25).with_parallel(true);
        sample(&m, &[0.0, 1.0], &(), &cfg).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 25);
    }

    #[test]
    fn maximizer_failure_aborts_with_sample_index() {
        // Fails whenever the first perturbed coordinate is negative.
        let m = |theta: &[f64], _: &()| -> std::result::Result<f64, String> {
            if theta[0] < 0.0 {
                Err(format!("negative input {}", theta[0]))
            } else {
                Ok(theta[0])
            }
        };
        let cfg = PerturbationConfig::additive(1.0, 200)
            .with_seed(0)
            .with_parallel(false);
        let layer = PerturbedMaximizer::new(m, cfg).unwrap();
        let first_bad = layer
            .perturbations(&[0.0])
            .iter()
            .position(|t| t[0] < 0.0)
            .expect("some draw is negative");
        match layer.distribution(&[0.0], &()) {
            Err(Error::MaximizerFailure { sample, .. }) => assert_eq!(sample, first_bad),
            other => panic!("expected MaximizerFailure, got {other:?}"),
        }
    }

    #[test]
    fn non_finite_atom_is_a_maximizer_failure() {
        let m = |_: &[f64], _: &()| -> std::result::Result<[f64; 2], BoxError> {
            Ok([f64::NAN, 0.0])
        };
        let cfg = PerturbationConfig::additive(0.1, 3).with_parallel(false);
        assert!(matches!(
            sample(&m, &[0.0, 0.0], &(), &cfg),
            Err(Error::MaximizerFailure { sample: 0, .. })
        ));
    }

    #[test]
    fn ragged_atoms_are_a_maximizer_failure() {
        // Solution length depends on the sign of the perturbed input.
        let m = |theta: &[f64], _: &()| -> std::result::Result<Vec<f64>, BoxError> {
            Ok(if theta[0] >= 0.0 { vec![1.0, 1.0] } else { vec![1.0] })
        };
        let cfg = PerturbationConfig::additive(1.0, 50).with_seed(0);
        let layer = PerturbedMaximizer::new(m, cfg).unwrap();
        let signs: Vec<bool> = layer
            .perturbations(&[0.0])
            .iter()
            .map(|t| t[0] >= 0.0)
            .collect();
        let first_ragged = signs
            .iter()
            .position(|&s| s != signs[0])
            .expect("both signs are drawn");
        for parallel in [false, true] {
            let cfg = cfg.with_parallel(parallel);
            match sample(&m, &[0.0], &(), &cfg) {
                Err(Error::MaximizerFailure { sample, source }) => {
                    assert_eq!(sample, first_ragged);
                    assert!(source.to_string().contains("length mismatch"), "{source}");
                }
                other => panic!("expected MaximizerFailure, got {other:?}"),
            }
        }
    }

    #[test]
    fn same_seed_same_distribution() {
        let cfg = PerturbationConfig::additive(0.7, 64).with_seed(42);
        let a = sample(&one_hot_argmax, &[0.2, 0.1, 0.0], &(), &cfg).unwrap();
        let b = sample(&one_hot_argmax, &[0.2, 0.1, 0.0], &(), &cfg).unwrap();
        assert_eq!(a, b);

        let c = sample(&one_hot_argmax, &[0.2, 0.1, 0.0], &(), &cfg.with_seed(43)).unwrap();
        assert_ne!(a.atoms(), c.atoms());
    }

    #[test]
    fn parallel_matches_sequential() {
        let cfg = PerturbationConfig::multiplicative(0.5, 128).with_seed(7);
        let seq = sample(&one_hot_argmax, &[1.0, 0.9, 1.1, 0.5], &(), &cfg).unwrap();
        let par = sample(
            &one_hot_argmax,
            &[1.0, 0.9, 1.1, 0.5],
            &(),
            &cfg.with_parallel(true),
        )
        .unwrap();
        assert_eq!(seq, par);
    }

    #[test]
    fn perturbations_follow_kind() {
        let theta = [1.0, 2.0, 3.0];
        let add = PerturbedMaximizer::new(
            one_hot_argmax,
            PerturbationConfig::additive(0.5, 4).with_seed(1),
        )
        .unwrap()
        .perturbations(&theta);
        let mul = PerturbedMaximizer::new(
            one_hot_argmax,
            PerturbationConfig::multiplicative(0.5, 4).with_seed(1),
        )
        .unwrap()
        .perturbations(&theta);
        assert_eq!(add.len(), 4);
        // Same draws z: additive offset is 0.5*z, multiplicative factor is 1 + 0.5*z.
        for (a, m) in add.iter().zip(&mul) {
            for k in 0..3 {
                let z = (a[k] - theta[k]) / 0.5;
                assert!((m[k] - theta[k] * (1.0 + 0.5 * z)).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn expected_is_mean_of_one_hots() {
        let layer = PerturbedMaximizer::additive(one_hot_argmax, 1.0, 500).unwrap();
        let p = layer.expected(&[0.0, 0.0, 0.0], &()).unwrap();
        let s: f64 = p.iter().sum();
        assert!((s - 1.0).abs() < 1e-9, "sum={s}");
        // Symmetric theta: roughly uniform over the three vertices.
        for &pi in &p {
            assert!(pi > 0.2 && pi < 0.47, "p={p:?}");
        }
    }

    #[test]
    fn compressed_distribution_has_at_most_dim_atoms() {
        let layer = PerturbedMaximizer::additive(one_hot_argmax, 1.0, 300).unwrap();
        let d = layer
            .distribution_compressed(&[0.3, 0.0, -0.3, 0.1], &(), 0.0)
            .unwrap();
        assert!(d.len() <= 4);
        assert!((d.total_mass() - 1.0).abs() < 1e-9);
    }
}
