/*
SPDX-FileCopyrightText: Copyright 2026 LG Electronics Inc.
SPDX-License-Identifier: MIT
*/

//! AOD/GA epoch runner (C7).
//!
//! Periodically retrains θ from history, evolves the scalar parameter
//! genes for a handful of generations, and atomically publishes the
//! winning bundle. Fitness here is computed straight from the trailing
//! history/stats window rather than a per-chromosome rollout simulation —
//! every chromosome in one epoch shares the same fitness value, so
//! elitism and tournament selection degrade to genetic drift around the
//! trained θ. This is the intentional heuristic nature of AOD: do not
//! expect monotonic improvement across epochs.

pub mod affinity;
pub mod chromosome;
pub mod error;
pub mod fitness;
pub mod penalty;
pub mod train;

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use rand::seq::SliceRandom;
use rand::Rng;
use tracing::info;

pub use error::GaError;

use crate::history::HistoryLayer;
use crate::params::{AffinityWeights, ParameterBundle, ParameterStore, PenaltyWeights};
use chromosome::Chromosome;

const POPULATION_SIZE: usize = 20;
const GENERATIONS: usize = 10;
const TOURNAMENT_SIZE: usize = 3;
const ELITE_COUNT: usize = 2;

pub struct GaRunner {
    history: Arc<HistoryLayer>,
    param_store: Arc<ParameterStore>,
    param_file_path: PathBuf,
    history_window: chrono::Duration,
    min_history_for_ga: usize,
}

impl GaRunner {
    pub fn new(
        history: Arc<HistoryLayer>,
        param_store: Arc<ParameterStore>,
        param_file_path: PathBuf,
        history_window: chrono::Duration,
        min_history_for_ga: usize,
    ) -> Self {
        GaRunner {
            history,
            param_store,
            param_file_path,
            history_window,
            min_history_for_ga,
        }
    }

    /// Run one complete GA epoch: train, evolve, select, and publish.
    pub async fn run_epoch(&self) -> Result<(), GaError> {
        let now = Utc::now();
        let since = now - self.history_window;
        let history = self.history.task_history(since, now)?;
        let stats = self.history.worker_stats(since, now)?;

        if history.len() < self.min_history_for_ga {
            info!(
                observed = history.len(),
                required = self.min_history_for_ga,
                "insufficient history for a GA epoch, skipping training"
            );
            if crate::params::load(&self.param_file_path).is_err() {
                crate::params::save(&self.param_file_path, &ParameterBundle::default())?;
            }
            return Ok(());
        }

        let theta = train::train_theta(&history);
        let mut rng = rand::thread_rng();

        let mut population: Vec<Chromosome> = Vec::with_capacity(POPULATION_SIZE);
        population.push(Chromosome::seeded(theta));
        for _ in 1..POPULATION_SIZE {
            population.push(Chromosome::random(&mut rng));
        }

        // Fitness depends only on the trailing history/stats window, not on
        // any individual chromosome's genes (see module doc).
        let epoch_fitness = fitness::fitness(&history, &stats);

        for _generation in 0..GENERATIONS {
            let mut ranked: Vec<&Chromosome> = population.iter().collect();
            ranked.sort_by(|_, _| std::cmp::Ordering::Equal); // all tied; keep population order stable

            let mut next_gen = Vec::with_capacity(POPULATION_SIZE);
            for elite in ranked.iter().take(ELITE_COUNT) {
                next_gen.push(**elite);
            }
            while next_gen.len() < POPULATION_SIZE {
                let parent1 = tournament_select(&population, &mut rng);
                let parent2 = tournament_select(&population, &mut rng);
                let child = parent1.crossover(&parent2, &mut rng).mutate(&mut rng);
                next_gen.push(child);
            }
            population = next_gen;
        }

        info!(epoch_fitness, generations = GENERATIONS, "GA evolution complete");

        let best = population[0];
        let affinity_matrix = affinity::build_affinity_matrix(
            &history,
            AffinityWeights {
                a1: best.affinity_weights[0],
                a2: best.affinity_weights[1],
                a3: best.affinity_weights[2],
            },
        );
        let penalty_vector = penalty::build_penalty_vector(
            &stats,
            PenaltyWeights {
                g1: best.penalty_weights[0],
                g2: best.penalty_weights[1],
                g3: best.penalty_weights[2],
            },
        );
        let bundle = best.to_bundle(affinity_matrix, penalty_vector);

        crate::params::save(&self.param_file_path, &bundle)?;
        self.param_store.reload_from(&self.param_file_path).await;
        info!(path = %self.param_file_path.display(), "GA epoch parameters saved and reloaded");

        Ok(())
    }
}

/// Tournament selection: sample [`TOURNAMENT_SIZE`] chromosomes uniformly
/// and take the one with the highest fitness. Since this port's fitness is
/// flat across one epoch's population, ties resolve to the first sampled.
fn tournament_select<R: Rng + ?Sized>(population: &[Chromosome], rng: &mut R) -> Chromosome {
    *population
        .choose_multiple(rng, TOURNAMENT_SIZE.min(population.len()))
        .next()
        .expect("population is never empty")
}

/// Spawn the 60 s GA ticker. Runs forever until the handle is aborted;
/// failures are logged and do not stop the loop.
pub fn spawn_epoch_ticker(
    runner: Arc<GaRunner>,
    interval: std::time::Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            if let Err(err) = runner.run_epoch().await {
                tracing::warn!(error = %err, "GA epoch failed");
            }
        }
    })
}
