//! The heptagon walkthrough: perturbed argmax over the 7 vertices of a regular polygon.
//!
//! Prints the sampled distribution (sorted by angle), its compaction, and where the
//! expectation lands relative to the hard maximizer and the centroid. Set
//! `RUST_LOG=perturbo=debug` to see the sampler and compactor events.
//!
//! Run with:
//!   cargo run --example heptagon

use perturbo::{polar_angle, sort_by_angle, PerturbationConfig, PerturbedMaximizer, RegularPolygon};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), perturbo::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let h = RegularPolygon::heptagon();
    let theta = [0.0, 0.5];
    let hard = h.vertices()[h.argmax(theta)];
    println!("theta = {theta:?}, hard maximizer = {hard:?}");

    for eps in [0.05, 0.2, 0.5, 2.0] {
        let cfg = PerturbationConfig::additive(eps, 100).with_seed(0).with_parallel(true);
        let layer = PerturbedMaximizer::new(h.clone(), cfg)?;

        let raw = layer.distribution(&theta, &())?;
        let raw_len = raw.len();
        let mut dist = raw;
        dist.compress(0.0)?;
        let dist = sort_by_angle(dist)?;
        let y = dist.expectation()?;

        println!("\n=== eps = {eps} ===");
        println!("atoms: {raw_len} sampled -> {} distinct", dist.len());
        for (a, w) in dist.iter() {
            let deg = polar_angle(*a)?.to_degrees();
            println!("  vertex at {deg:6.1}°  p={w:.2}");
        }
        let dist_to_hard = ((y[0] - hard[0]).powi(2) + (y[1] - hard[1]).powi(2)).sqrt();
        println!(
            "expectation = [{:.3}, {:.3}]  |y - hard| = {dist_to_hard:.3}  inside = {}",
            y[0],
            y[1],
            h.contains_point(y)
        );
    }
    Ok(())
}
