//! Batch runner
//!
//! Every round gets its own ChaCha8 stream (`seed`, stream = round index), so a
//! seeded batch is identical whether chunks run sequentially or on rayon.
//! Results are consumed in round order by the statistics and the sinks.

use std::path::Path;
use std::time::Instant;

use ka_engine::{GameContext, RoundResult, RoundSettings, simulate_round};
use log::info;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::{SimConfig, SpeedSelection};
use crate::csv_log::{BonusCsvLog, RoundCsvLog, RoundSink};
use crate::error::SimResult;
use crate::stats::SessionStats;

pub const ROUNDS_CSV_FILE: &str = "simulation_rounds.csv";
pub const BONUS_CSV_FILE: &str = "bonus_rounds.csv";

/// One simulated round with its position in the batch
#[derive(Debug, Clone, PartialEq)]
pub struct PlayedRound {
    /// 1-based game number
    pub number: u64,
    /// Index into the configured speed modes
    pub speed_index: usize,
    pub result: RoundResult,
}

/// Summary of a finished batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub stats: SessionStats,
    /// Seed actually used (drawn from the thread RNG when none was configured)
    pub seed: u64,
    pub elapsed_ms: u64,
}

impl BatchOutcome {
    pub fn rounds_per_second(&self) -> f64 {
        if self.elapsed_ms == 0 {
            return 0.0;
        }
        self.stats.total_rounds as f64 / (self.elapsed_ms as f64 / 1000.0)
    }
}

/// Runs a batch of rounds against one game context
pub struct BatchRunner<'a> {
    ctx: &'a GameContext,
    config: SimConfig,
    seed: u64,
    fixed_speed: Option<usize>,
}

impl<'a> BatchRunner<'a> {
    pub fn new(ctx: &'a GameContext, config: SimConfig) -> SimResult<Self> {
        config.validate(ctx)?;

        let fixed_speed = match &config.speed {
            SpeedSelection::Random => None,
            SpeedSelection::Fixed(name) => {
                let mode = ctx.config().speed_mode(name)?;
                ctx.config().speed_modes.iter().position(|m| m == mode)
            }
        };
        let seed = config.seed.unwrap_or_else(|| rand::rng().random());

        Ok(Self {
            ctx,
            config,
            seed,
            fixed_speed,
        })
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Play round `index` (0-based) on its own stream
    pub fn play_round(&self, index: u64) -> PlayedRound {
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        rng.set_stream(index);

        let modes = &self.ctx.config().speed_modes;
        let speed_index = match self.fixed_speed {
            Some(i) => i,
            None => rng.random_range(0..modes.len()),
        };
        let settings = RoundSettings::new(
            self.config.mode,
            modes[speed_index].increment,
            self.config.cashout,
        );

        PlayedRound {
            number: index + 1,
            speed_index,
            result: simulate_round(self.ctx, &settings, &mut rng),
        }
    }

    /// Rounds `[start, end)` in order
    pub fn play_chunk(&self, start: u64, end: u64) -> Vec<PlayedRound> {
        if self.config.parallel {
            (start..end)
                .into_par_iter()
                .map(|i| self.play_round(i))
                .collect()
        } else {
            (start..end).map(|i| self.play_round(i)).collect()
        }
    }

    /// Run the whole batch, feeding every round to the sinks in order
    pub fn run(&self, sinks: &mut [Box<dyn RoundSink>]) -> SimResult<BatchOutcome> {
        let started = Instant::now();
        let table = self.ctx.table();
        let mut stats = SessionStats::new(self.ctx.config());

        info!(
            "Simulating {} rounds in {} mode (seed {}, {})",
            self.config.rounds,
            self.config.mode,
            self.seed,
            if self.config.parallel { "parallel" } else { "sequential" }
        );

        let total = self.config.rounds;
        let chunk = self.config.chunk_size as u64;
        let mut start = 0;
        while start < total {
            let end = (start + chunk).min(total);
            for played in self.play_chunk(start, end) {
                stats.record(played.speed_index, &played.result);
                for sink in sinks.iter_mut() {
                    sink.record(played.number, &played.result)?;
                }

                let interval = self.config.progress_interval;
                if interval > 0 && (played.number % interval == 0 || played.number == total) {
                    let r = &played.result;
                    info!(
                        "Round {}: Step {}, Multiplier {:.2}x, Outcome: {}, Winnings: ${:.2}, Cost: ${:.2}",
                        played.number,
                        r.final_step,
                        table.get(r.final_step).unwrap_or(0.0),
                        r.outcome_label(),
                        r.total_winnings,
                        r.total_cost
                    );
                }
            }
            start = end;
        }

        for sink in sinks.iter_mut() {
            sink.finish()?;
        }

        Ok(BatchOutcome {
            stats,
            seed: self.seed,
            elapsed_ms: started.elapsed().as_millis() as u64,
        })
    }
}

/// CSV sinks requested by the run configuration, created under `dir`
pub fn open_csv_sinks(
    config: &SimConfig,
    ctx: &GameContext,
    dir: &Path,
) -> SimResult<Vec<Box<dyn RoundSink>>> {
    std::fs::create_dir_all(dir)?;

    let mut sinks: Vec<Box<dyn RoundSink>> = Vec::new();
    if config.write_rounds_csv {
        let path = dir.join(ROUNDS_CSV_FILE);
        info!("Writing round log to {}", path.display());
        sinks.push(Box::new(RoundCsvLog::create(&path, ctx.table())?));
    }
    if config.write_bonus_csv {
        let path = dir.join(BONUS_CSV_FILE);
        info!("Writing bonus log to {}", path.display());
        sinks.push(Box::new(BonusCsvLog::create(&path)?));
    }
    Ok(sinks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ka_engine::{BonusKind, CashoutStrategy, GameConfig, PlayMode};

    #[test]
    fn test_rounds_are_independent_of_order() {
        let ctx = GameContext::new(GameConfig::ascent_50()).unwrap();
        let runner = BatchRunner::new(&ctx, SimConfig::quick().with_seed(3)).unwrap();

        let forward: Vec<_> = (0..50).map(|i| runner.play_round(i)).collect();
        let backward: Vec<_> = (0..50).rev().map(|i| runner.play_round(i)).collect();
        for (a, b) in forward.iter().zip(backward.iter().rev()) {
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_fixed_speed_is_used() {
        let ctx = GameContext::new(GameConfig::ascent_100()).unwrap();
        let config = SimConfig::quick()
            .with_rounds(200)
            .with_speed(SpeedSelection::Fixed("fast".into()));
        let runner = BatchRunner::new(&ctx, config).unwrap();

        let outcome = runner.run(&mut []).unwrap();
        assert_eq!(outcome.stats.speed_counts, vec![0, 200, 0]);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let ctx = GameContext::new(GameConfig::ascent_100()).unwrap();
        let base = SimConfig::quick()
            .with_rounds(3_000)
            .with_chunk_size(700)
            .with_mode(PlayMode::BonusBuy(BonusKind::Mystic))
            .with_cashout(CashoutStrategy::Random)
            .with_seed(1234);

        let sequential = BatchRunner::new(&ctx, base.clone().with_parallel(false))
            .unwrap()
            .run(&mut [])
            .unwrap();
        let parallel = BatchRunner::new(&ctx, base.with_parallel(true))
            .unwrap()
            .run(&mut [])
            .unwrap();

        assert_eq!(sequential.stats, parallel.stats);
        assert_eq!(sequential.seed, 1234);
    }

    #[test]
    fn test_unseeded_runner_picks_a_seed() {
        let ctx = GameContext::new(GameConfig::ascent_50()).unwrap();
        let mut config = SimConfig::quick().with_rounds(10);
        config.seed = None;
        let runner = BatchRunner::new(&ctx, config).unwrap();
        let outcome = runner.run(&mut []).unwrap();
        assert_eq!(outcome.seed, runner.seed());
        assert_eq!(outcome.stats.total_rounds, 10);
    }

    #[test]
    fn test_throughput() {
        let ctx = GameContext::new(GameConfig::ascent_50()).unwrap();
        let mut stats = SessionStats::new(ctx.config());
        stats.total_rounds = 5_000;

        let outcome = BatchOutcome {
            stats,
            seed: 1,
            elapsed_ms: 250,
        };
        assert_eq!(outcome.rounds_per_second(), 20_000.0);

        let instant = BatchOutcome {
            elapsed_ms: 0,
            ..outcome
        };
        assert_eq!(instant.rounds_per_second(), 0.0);
    }
}
