//! Getting Started: smooth a top-k selector in under 60 lines.
//!
//! A "maximizer" here is a closure picking the k largest scores and returning the 0/1
//! indicator vector. It is piecewise constant: nudge a score a little and nothing moves.
//! Perturbing the scores and averaging gives a smooth "soft top-k" in `[0, 1]^d`.
//!
//! Run with:
//!   cargo run --example getting_started

use perturbo::{BoxError, PerturbationConfig, PerturbedMaximizer};

fn main() -> Result<(), perturbo::Error> {
    // -----------------------------------------------------------------
    // 1. A black-box maximizer: top-k indicator (k passed as auxiliary data).
    // -----------------------------------------------------------------
    let top_k = |theta: &[f64], k: &usize| -> Result<Vec<f64>, BoxError> {
        if *k > theta.len() {
            return Err(format!("k={k} exceeds dimension {}", theta.len()).into());
        }
        let mut idx: Vec<usize> = (0..theta.len()).collect();
        idx.sort_by(|&a, &b| theta[b].total_cmp(&theta[a]).then(a.cmp(&b)));
        let mut y = vec![0.0; theta.len()];
        for &i in &idx[..*k] {
            y[i] = 1.0;
        }
        Ok(y)
    };

    let scores = [2.0, 1.9, 0.5, 1.0, -1.0];
    println!("hard top-2:  {:?}", top_k(&scores, &2).map_err(|e| e.to_string()));

    // -----------------------------------------------------------------
    // 2. Wrap it: additive Gaussian noise, 500 samples, fixed seed.
    // -----------------------------------------------------------------
    let cfg = PerturbationConfig::additive(0.5, 500).with_seed(0);
    let layer = PerturbedMaximizer::new(top_k, cfg)?;

    let mut dist = layer.distribution(&scores, &2usize)?;
    println!("raw atoms:   {}", dist.len());

    // -----------------------------------------------------------------
    // 3. Compact exact duplicates; only the distinct selections remain.
    // -----------------------------------------------------------------
    dist.compress(0.0)?;
    println!("distinct:    {}", dist.len());
    for (atom, w) in dist.iter() {
        println!("  {atom:?}  p={w:.3}");
    }

    // -----------------------------------------------------------------
    // 4. Soft top-2: the expectation.
    // -----------------------------------------------------------------
    let soft = dist.expectation()?;
    let pretty: Vec<String> = soft.iter().map(|x| format!("{x:.3}")).collect();
    println!("soft top-2:  [{}]", pretty.join(", "));
    Ok(())
}
