/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! The GA chromosome: the 12 scalar genes RTS consumes (θ, risk, affinity
//! and penalty weights). The affinity matrix and penalty vector are never
//! evolved directly — they are rebuilt from real history for the winning
//! chromosome after evolution finishes.

use std::ops::RangeInclusive;

use rand::Rng;

use crate::params::{AffinityWeights, ParameterBundle, PenaltyWeights, RiskParams, Theta};

pub const THETA_RANGE: RangeInclusive<f64> = 0.0..=10.0;
pub const ALPHA_RANGE: RangeInclusive<f64> = 0.0..=1000.0;
pub const BETA_RANGE: RangeInclusive<f64> = 0.0..=100.0;
pub const WEIGHT_RANGE: RangeInclusive<f64> = 0.0..=10.0;

const THETA_MUTATION_SIGMA: f64 = 0.1;
const ALPHA_MUTATION_SIGMA: f64 = 2.0;
const WEIGHT_MUTATION_SIGMA: f64 = 0.2;
const MUTATION_RATE: f64 = 0.1;
const CROSSOVER_PROBABILITY: f64 = 0.7;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Chromosome {
    pub theta: [f64; 4],
    pub alpha: f64,
    pub beta: f64,
    pub affinity_weights: [f64; 3],
    pub penalty_weights: [f64; 3],
}

impl Chromosome {
    /// The seed chromosome: trained θ, default risk/affinity/penalty
    /// weights.
    pub fn seeded(theta: [f64; 4]) -> Self {
        let defaults = ParameterBundle::default();
        Chromosome {
            theta,
            alpha: defaults.risk.alpha,
            beta: defaults.risk.beta,
            affinity_weights: [
                defaults.affinity_weights.a1,
                defaults.affinity_weights.a2,
                defaults.affinity_weights.a3,
            ],
            penalty_weights: [
                defaults.penalty_weights.g1,
                defaults.penalty_weights.g2,
                defaults.penalty_weights.g3,
            ],
        }
    }

    /// Uniform-random jitter across every gene's valid range.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Chromosome {
            theta: [
                uniform(rng, &THETA_RANGE),
                uniform(rng, &THETA_RANGE),
                uniform(rng, &THETA_RANGE),
                uniform(rng, &THETA_RANGE),
            ],
            alpha: uniform(rng, &ALPHA_RANGE),
            beta: uniform(rng, &BETA_RANGE),
            affinity_weights: [
                uniform(rng, &WEIGHT_RANGE),
                uniform(rng, &WEIGHT_RANGE),
                uniform(rng, &WEIGHT_RANGE),
            ],
            penalty_weights: [
                uniform(rng, &WEIGHT_RANGE),
                uniform(rng, &WEIGHT_RANGE),
                uniform(rng, &WEIGHT_RANGE),
            ],
        }
    }

    /// Uniform crossover, per gene, with `self` as parent 1: with
    /// probability [`CROSSOVER_PROBABILITY`] each gene is a 50/50 coin flip
    /// between the two parents; otherwise the child is a straight copy of
    /// parent 1.
    pub fn crossover<R: Rng + ?Sized>(&self, other: &Chromosome, rng: &mut R) -> Self {
        if !rng.gen_bool(CROSSOVER_PROBABILITY) {
            return *self;
        }
        let mut child = *self;
        for i in 0..4 {
            if rng.gen_bool(0.5) {
                child.theta[i] = other.theta[i];
            }
        }
        if rng.gen_bool(0.5) {
            child.alpha = other.alpha;
        }
        if rng.gen_bool(0.5) {
            child.beta = other.beta;
        }
        for i in 0..3 {
            if rng.gen_bool(0.5) {
                child.affinity_weights[i] = other.affinity_weights[i];
            }
            if rng.gen_bool(0.5) {
                child.penalty_weights[i] = other.penalty_weights[i];
            }
        }
        child
    }

    /// Gaussian mutation at [`MUTATION_RATE`] per gene, clipped to the
    /// gene's valid range after perturbation.
    pub fn mutate<R: Rng + ?Sized>(&self, rng: &mut R) -> Self {
        let mut child = *self;
        for i in 0..4 {
            if rng.gen_bool(MUTATION_RATE) {
                child.theta[i] =
                    clip(child.theta[i] + gaussian(rng) * THETA_MUTATION_SIGMA, &THETA_RANGE);
            }
        }
        if rng.gen_bool(MUTATION_RATE) {
            child.alpha = clip(child.alpha + gaussian(rng) * ALPHA_MUTATION_SIGMA, &ALPHA_RANGE);
        }
        if rng.gen_bool(MUTATION_RATE) {
            child.beta = clip(child.beta + gaussian(rng) * ALPHA_MUTATION_SIGMA, &BETA_RANGE);
        }
        for i in 0..3 {
            if rng.gen_bool(MUTATION_RATE) {
                child.affinity_weights[i] = clip(
                    child.affinity_weights[i] + gaussian(rng) * WEIGHT_MUTATION_SIGMA,
                    &WEIGHT_RANGE,
                );
            }
            if rng.gen_bool(MUTATION_RATE) {
                child.penalty_weights[i] = clip(
                    child.penalty_weights[i] + gaussian(rng) * WEIGHT_MUTATION_SIGMA,
                    &WEIGHT_RANGE,
                );
            }
        }
        child
    }

    /// Combine this chromosome's scalar genes with a rebuilt affinity
    /// matrix and penalty vector into a complete, already-valid bundle.
    pub fn to_bundle(
        &self,
        affinity_matrix: std::collections::HashMap<String, std::collections::HashMap<String, f64>>,
        penalty_vector: std::collections::HashMap<String, f64>,
    ) -> ParameterBundle {
        ParameterBundle {
            theta: Theta::from_array(self.theta),
            risk: RiskParams {
                alpha: self.alpha,
                beta: self.beta,
            },
            affinity_weights: AffinityWeights {
                a1: self.affinity_weights[0],
                a2: self.affinity_weights[1],
                a3: self.affinity_weights[2],
            },
            penalty_weights: PenaltyWeights {
                g1: self.penalty_weights[0],
                g2: self.penalty_weights[1],
                g3: self.penalty_weights[2],
            },
            affinity_matrix,
            penalty_vector,
        }
    }
}

fn uniform<R: Rng + ?Sized>(rng: &mut R, range: &RangeInclusive<f64>) -> f64 {
    rng.gen_range(*range.start()..=*range.end())
}

fn clip(v: f64, range: &RangeInclusive<f64>) -> f64 {
    v.clamp(*range.start(), *range.end())
}

/// Standard-normal sample via the Box-Muller transform. `rand` 0.8 does not
/// ship a Gaussian distribution in its base crate; this avoids pulling in
/// `rand_distr` for one call site.
fn gaussian<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
    let u2: f64 = rng.gen_range(0.0..1.0);
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn seeded_chromosome_carries_trained_theta_and_default_weights() {
        let c = Chromosome::seeded([0.2, 0.2, 0.2, 0.2]);
        assert_eq!(c.theta, [0.2, 0.2, 0.2, 0.2]);
        assert_eq!(c.alpha, 10.0);
        assert_eq!(c.beta, 1.0);
    }

    #[test]
    fn random_chromosome_stays_within_ranges() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let c = Chromosome::random(&mut rng);
            for g in c.theta {
                assert!(THETA_RANGE.contains(&g));
            }
            assert!(ALPHA_RANGE.contains(&c.alpha));
            assert!(BETA_RANGE.contains(&c.beta));
            for g in c.affinity_weights.iter().chain(c.penalty_weights.iter()) {
                assert!(WEIGHT_RANGE.contains(g));
            }
        }
    }

    #[test]
    fn mutation_keeps_genes_within_range_after_many_rounds() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut c = Chromosome::seeded([5.0, 5.0, 5.0, 5.0]);
        for _ in 0..200 {
            c = c.mutate(&mut rng);
            for g in c.theta {
                assert!(THETA_RANGE.contains(&g));
            }
            assert!(ALPHA_RANGE.contains(&c.alpha));
            assert!(BETA_RANGE.contains(&c.beta));
        }
    }

    #[test]
    fn crossover_child_genes_come_from_one_parent_or_the_other() {
        let mut rng = StdRng::seed_from_u64(3);
        let p1 = Chromosome::seeded([1.0, 1.0, 1.0, 1.0]);
        let p2 = Chromosome {
            theta: [9.0, 9.0, 9.0, 9.0],
            alpha: 900.0,
            beta: 90.0,
            affinity_weights: [9.0, 9.0, 9.0],
            penalty_weights: [9.0, 9.0, 9.0],
        };
        let child = p1.crossover(&p2, &mut rng);
        for g in child.theta {
            assert!(g == 1.0 || g == 9.0);
        }
    }
}
