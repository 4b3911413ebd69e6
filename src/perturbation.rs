//! Noise models and sampler configuration.

use crate::{Error, Result};

/// How a standard-normal draw `z` is applied to the parameter vector `theta`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PerturbationKind {
    /// `theta + epsilon * z`.
    #[default]
    Additive,
    /// `theta * (1 + epsilon * z)`, componentwise.
    Multiplicative,
}

impl PerturbationKind {
    /// Write the perturbed vector for one draw into `out`.
    ///
    /// `theta`, `z` and `out` must have the same length.
    pub fn apply_into(self, theta: &[f64], z: &[f64], epsilon: f64, out: &mut [f64]) {
        debug_assert_eq!(theta.len(), z.len());
        debug_assert_eq!(theta.len(), out.len());
        match self {
            Self::Additive => {
                for ((o, t), zi) in out.iter_mut().zip(theta).zip(z) {
                    *o = t + epsilon * zi;
                }
            }
            Self::Multiplicative => {
                for ((o, t), zi) in out.iter_mut().zip(theta).zip(z) {
                    *o = t * (1.0 + epsilon * zi);
                }
            }
        }
    }

    /// Allocating variant of [`apply_into`](Self::apply_into).
    pub fn apply(self, theta: &[f64], z: &[f64], epsilon: f64) -> Vec<f64> {
        let mut out = vec![0.0; theta.len()];
        self.apply_into(theta, z, epsilon, &mut out);
        out
    }
}

/// Seed used when [`PerturbationConfig::seed`] is `None`.
pub const DEFAULT_SEED: u64 = 0;

/// Configuration for perturbation sampling.
///
/// Construct with [`additive`](Self::additive) / [`multiplicative`](Self::multiplicative) or by
/// struct update from `Default`. Validation happens in [`validate`](Self::validate), which
/// [`PerturbedMaximizer::new`](crate::PerturbedMaximizer::new) and [`sample`](crate::sample)
/// call before doing any work.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PerturbationConfig {
    pub kind: PerturbationKind,
    /// Noise scale (must be finite and > 0).
    pub epsilon: f64,
    /// Number of maximizer calls (must be >= 1).
    pub nb_samples: usize,
    /// RNG seed for the noise draws. `None` means [`DEFAULT_SEED`].
    #[cfg_attr(feature = "serde", serde(default, skip_serializing_if = "Option::is_none"))]
    pub seed: Option<u64>,
    /// Run maximizer calls on the rayon pool. Defaults to on when the `parallel` feature is
    /// enabled; ignored without it.
    ///
    /// Output is identical either way.
    #[cfg_attr(feature = "serde", serde(default = "parallel_by_default"))]
    pub parallel: bool,
}

fn parallel_by_default() -> bool {
    cfg!(feature = "parallel")
}

impl Default for PerturbationConfig {
    fn default() -> Self {
        Self {
            kind: PerturbationKind::Additive,
            epsilon: 1.0,
            nb_samples: 1,
            seed: None,
            parallel: parallel_by_default(),
        }
    }
}

impl PerturbationConfig {
    pub fn additive(epsilon: f64, nb_samples: usize) -> Self {
        Self {
            kind: PerturbationKind::Additive,
            epsilon,
            nb_samples,
            ..Self::default()
        }
    }

    pub fn multiplicative(epsilon: f64, nb_samples: usize) -> Self {
        Self {
            kind: PerturbationKind::Multiplicative,
            epsilon,
            nb_samples,
            ..Self::default()
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// The seed actually used for noise draws.
    pub fn effective_seed(&self) -> u64 {
        self.seed.unwrap_or(DEFAULT_SEED)
    }

    /// Check `epsilon > 0` (finite) and `nb_samples >= 1`.
    pub fn validate(&self) -> Result<()> {
        if !(self.epsilon.is_finite() && self.epsilon > 0.0) {
            return Err(Error::InvalidConfiguration(format!(
                "epsilon must be finite and > 0, got {}",
                self.epsilon
            )));
        }
        if self.nb_samples < 1 {
            return Err(Error::InvalidConfiguration(
                "nb_samples must be >= 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn additive_and_multiplicative_apply() {
        let theta = [1.0, -2.0];
        let z = [0.5, 1.0];
        assert_eq!(PerturbationKind::Additive.apply(&theta, &z, 0.2), vec![1.1, -1.8]);
        assert_eq!(
            PerturbationKind::Multiplicative.apply(&theta, &z, 0.5),
            vec![1.25, -3.0]
        );
    }

    #[test]
    fn multiplicative_keeps_zero_coordinates() {
        let out = PerturbationKind::Multiplicative.apply(&[0.0, 3.0], &[10.0, 0.0], 1.0);
        assert_eq!(out, vec![0.0, 3.0]);
    }

    #[test]
    fn validate_rejects_bad_configs() {
        assert!(PerturbationConfig::additive(0.1, 10).validate().is_ok());
        assert!(PerturbationConfig::additive(0.0, 10).validate().is_err());
        assert!(PerturbationConfig::additive(-1.0, 10).validate().is_err());
        assert!(PerturbationConfig::additive(f64::NAN, 10).validate().is_err());
        assert!(PerturbationConfig::additive(f64::INFINITY, 10).validate().is_err());
        assert!(PerturbationConfig::multiplicative(0.1, 0).validate().is_err());
    }

    #[test]
    fn seed_defaults_to_fixed_value() {
        let cfg = PerturbationConfig::default();
        assert_eq!(cfg.effective_seed(), DEFAULT_SEED);
        assert_eq!(cfg.with_seed(9).effective_seed(), 9);
    }

    #[test]
    fn parallel_follows_the_cargo_feature() {
        assert_eq!(PerturbationConfig::default().parallel, cfg!(feature = "parallel"));
        assert_eq!(
            PerturbationConfig::additive(0.5, 8).parallel,
            cfg!(feature = "parallel")
        );
        assert!(!PerturbationConfig::default().with_parallel(false).parallel);
    }
}
