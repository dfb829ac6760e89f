//! Crash distribution — calibration and crash-step sampling
//!
//! The prior is a discretized negative exponential over steps `1..=N`. After
//! reserving the tail mass ("no crash in range", step `N+1`) every probability
//! is scaled once by `target_rtp / E` and renormalized. The pass is not
//! iterated, so the realized RTP can sit away from the target; the residual
//! is kept in a [`CalibrationReport`].

use log::{info, warn};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::GameConfig;
use crate::curve::MultiplierTable;
use crate::error::{EngineError, EngineResult};

/// Relative drift above which calibration logs a warning
pub const DRIFT_WARN_THRESHOLD: f64 = 0.005;

/// Calibration diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationReport {
    /// Expected payout of the un-scaled prior (with tail reserved)
    pub initial_expected_return: f64,
    /// `target_rtp / initial_expected_return`
    pub scaling_factor: f64,
    /// Expected payout under the final distribution
    pub realized_rtp: f64,
    pub target_rtp: f64,
}

impl CalibrationReport {
    /// `realized_rtp - target_rtp`
    pub fn drift(&self) -> f64 {
        self.realized_rtp - self.target_rtp
    }

    /// Drift as a fraction of the target
    pub fn relative_drift(&self) -> f64 {
        self.drift() / self.target_rtp
    }

    /// Whether the realized RTP is within `tolerance` (relative) of the target
    pub fn is_within(&self, tolerance: f64) -> bool {
        self.relative_drift().abs() <= tolerance
    }
}

/// Calibrated per-step crash probabilities plus the beyond-range tail
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrashDistribution {
    /// `probabilities[i]` is the chance of crashing at step `i + 1`
    probabilities: Vec<f64>,
    tail: f64,
    cumulative: Vec<f64>,
    report: CalibrationReport,
}

impl CrashDistribution {
    /// Calibrate the crash distribution for a configuration
    pub fn calibrate(config: &GameConfig, table: &MultiplierTable) -> EngineResult<Self> {
        config.validate()?;
        if !table.matches(config) {
            return Err(EngineError::InvalidTable(format!(
                "table has {} steps to {:.2}x, configuration expects {} steps to {:.2}x",
                table.total_steps(),
                table.top(),
                config.total_steps,
                config.max_multiplier
            )));
        }

        let model = &config.crash;
        let lambda = model.decay_rate;

        // Discretized exponential prior
        let prior: Vec<f64> = (1..=config.total_steps)
            .map(|s| {
                let s = s as f64;
                (-lambda * (s - 1.0)).exp() - (-lambda * s).exp()
            })
            .collect();

        let prior_mass: f64 = prior.iter().sum();
        if !prior_mass.is_finite() || prior_mass <= 0.0 {
            return Err(EngineError::Calibration(format!(
                "exponential prior is not normalizable (mass {prior_mass})"
            )));
        }

        let in_range = 1.0 - model.tail_probability;
        let adjusted: Vec<f64> = prior.iter().map(|p| p / prior_mass * in_range).collect();

        let initial_expected_return = expected_return(&adjusted, model.tail_probability, table);
        if !initial_expected_return.is_finite() || initial_expected_return <= 0.0 {
            return Err(EngineError::Calibration(format!(
                "expected return {initial_expected_return} cannot be scaled"
            )));
        }

        let scaling_factor = model.target_rtp / initial_expected_return;
        let scaled: Vec<f64> = adjusted.iter().map(|p| p * scaling_factor).collect();
        let scaled_tail = model.tail_probability * scaling_factor;

        let total = scaled.iter().sum::<f64>() + scaled_tail;
        let probabilities: Vec<f64> = scaled.iter().map(|p| p / total).collect();
        let tail = scaled_tail / total;

        let realized_rtp = expected_return(&probabilities, tail, table);
        let report = CalibrationReport {
            initial_expected_return,
            scaling_factor,
            realized_rtp,
            target_rtp: model.target_rtp,
        };

        info!(
            "Calibrated {}: E0={:.4}, k={:.6}, RTP={:.2}% (target {:.2}%), P(crash@1)={:.2}%",
            config.name,
            initial_expected_return,
            scaling_factor,
            realized_rtp * 100.0,
            model.target_rtp * 100.0,
            probabilities[0] * 100.0
        );
        if !report.is_within(DRIFT_WARN_THRESHOLD) {
            warn!(
                "{}: realized RTP {:.2}% drifts {:+.2}% from target {:.2}%",
                config.name,
                realized_rtp * 100.0,
                report.relative_drift() * 100.0,
                model.target_rtp * 100.0
            );
        }

        Ok(Self::assemble(probabilities, tail, report))
    }

    /// Wrap precomputed probabilities; they must be non-negative and sum to 1
    pub fn from_probabilities(
        probabilities: Vec<f64>,
        tail: f64,
        table: &MultiplierTable,
        target_rtp: f64,
    ) -> EngineResult<Self> {
        if probabilities.len() != table.total_steps() as usize {
            return Err(EngineError::Calibration(format!(
                "expected {} probabilities, got {}",
                table.total_steps(),
                probabilities.len()
            )));
        }
        if probabilities
            .iter()
            .chain(std::iter::once(&tail))
            .any(|p| !p.is_finite() || *p < 0.0)
        {
            return Err(EngineError::Calibration(
                "probabilities must be finite and non-negative".into(),
            ));
        }
        let total = probabilities.iter().sum::<f64>() + tail;
        if (total - 1.0).abs() > 1e-9 {
            return Err(EngineError::Calibration(format!(
                "probabilities sum to {total}, expected 1"
            )));
        }

        let realized_rtp = expected_return(&probabilities, tail, table);
        let report = CalibrationReport {
            initial_expected_return: realized_rtp,
            scaling_factor: 1.0,
            realized_rtp,
            target_rtp,
        };
        Ok(Self::assemble(probabilities, tail, report))
    }

    fn assemble(probabilities: Vec<f64>, tail: f64, report: CalibrationReport) -> Self {
        let cumulative = probabilities
            .iter()
            .scan(0.0, |acc, p| {
                *acc += p;
                Some(*acc)
            })
            .collect();
        Self {
            probabilities,
            tail,
            cumulative,
            report,
        }
    }

    pub fn total_steps(&self) -> u32 {
        self.probabilities.len() as u32
    }

    /// Probability of crashing exactly at `step` (`N+1` is the tail)
    pub fn probability(&self, step: u32) -> f64 {
        let n = self.total_steps();
        match step {
            0 => 0.0,
            s if s <= n => self.probabilities[(s - 1) as usize],
            s if s == n + 1 => self.tail,
            _ => 0.0,
        }
    }

    /// Per-step probabilities for steps `1..=N`
    pub fn probabilities(&self) -> &[f64] {
        &self.probabilities
    }

    pub fn tail_probability(&self) -> f64 {
        self.tail
    }

    pub fn cumulative(&self) -> &[f64] {
        &self.cumulative
    }

    pub fn report(&self) -> &CalibrationReport {
        &self.report
    }

    /// Expected payout per unit stake for a player cashing out right before the crash
    pub fn expected_payout(&self, table: &MultiplierTable) -> f64 {
        expected_return(&self.probabilities, self.tail, table)
    }

    /// Draw a crash step in `1..=N+1`
    pub fn draw_crash_step<R: Rng>(&self, rng: &mut R) -> u32 {
        self.step_for_draw(rng.random())
    }

    /// Map a uniform draw to a crash step
    fn step_for_draw(&self, u: f64) -> u32 {
        let in_range = self.cumulative.last().copied().unwrap_or(0.0);
        if u >= in_range {
            return self.total_steps() + 1;
        }
        // First step whose cumulative mass reaches u
        let index = self.cumulative.partition_point(|&c| c < u);
        index as u32 + 1
    }

    /// Re-sample a crash step strictly after `start_step`
    ///
    /// Uses the in-range mass of steps `start_step+1..=N`, renormalized.
    /// Returns `N+1` when no such mass remains.
    pub fn draw_crash_step_after<R: Rng>(&self, start_step: u32, rng: &mut R) -> u32 {
        let beyond = self.total_steps() + 1;
        let start = start_step as usize;
        if start >= self.probabilities.len() {
            return beyond;
        }

        let remaining = &self.probabilities[start..];
        let mass: f64 = remaining.iter().sum();
        if mass <= 0.0 {
            return beyond;
        }

        let u = rng.random::<f64>() * mass;
        let mut cumulative = 0.0;
        for (i, p) in remaining.iter().enumerate() {
            cumulative += p;
            if u <= cumulative {
                return start_step + i as u32 + 1;
            }
        }
        beyond
    }
}

/// `Σ p(s)·multiplier(s-1) + tail·multiplier(N)`
fn expected_return(probabilities: &[f64], tail: f64, table: &MultiplierTable) -> f64 {
    let in_range: f64 = probabilities
        .iter()
        .enumerate()
        .map(|(i, p)| p * table.at(i as u32))
        .sum();
    in_range + tail * table.top()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn calibrated(config: &GameConfig) -> (MultiplierTable, CrashDistribution) {
        let table = MultiplierTable::build(config).unwrap();
        let crash = CrashDistribution::calibrate(config, &table).unwrap();
        (table, crash)
    }

    #[test]
    fn test_mass_sums_to_one() {
        for config in [GameConfig::ascent_100(), GameConfig::ascent_50()] {
            let (_, crash) = calibrated(&config);
            let total: f64 = crash.probabilities().iter().sum::<f64>() + crash.tail_probability();
            assert!((total - 1.0).abs() < 1e-9, "total {total}");
            assert!(crash.probabilities().iter().all(|p| *p >= 0.0));
        }
    }

    #[test]
    fn test_first_step_probability() {
        let (_, crash) = calibrated(&GameConfig::ascent_100());
        assert!((crash.probability(1) - 0.0961).abs() < 0.001);

        let (_, crash) = calibrated(&GameConfig::ascent_50());
        assert!((crash.probability(1) - 0.1829).abs() < 0.001);
    }

    #[test]
    fn test_single_pass_drift_is_reported() {
        let (table, crash) = calibrated(&GameConfig::ascent_50());
        let report = crash.report();

        assert_relative_eq!(report.initial_expected_return, 8.7839, max_relative = 1e-3);
        assert_relative_eq!(
            report.scaling_factor,
            0.97 / report.initial_expected_return,
            max_relative = 1e-12
        );
        // Uniform scaling followed by renormalization leaves the shape unchanged
        assert_relative_eq!(
            report.realized_rtp,
            report.initial_expected_return,
            max_relative = 1e-9
        );
        assert_relative_eq!(report.drift(), report.realized_rtp - 0.97);
        assert!(!report.is_within(DRIFT_WARN_THRESHOLD));
        assert_relative_eq!(crash.expected_payout(&table), report.realized_rtp, max_relative = 1e-12);
    }

    #[test]
    fn test_probability_lookup_edges() {
        let (_, crash) = calibrated(&GameConfig::ascent_50());
        assert_eq!(crash.probability(0), 0.0);
        assert_eq!(crash.probability(51), crash.tail_probability());
        assert_eq!(crash.probability(52), 0.0);
        assert!((crash.tail_probability() - 0.0001).abs() < 1e-9);
    }

    #[test]
    fn test_draws_stay_in_domain() {
        let (_, crash) = calibrated(&GameConfig::ascent_50());
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        let mut ones = 0;
        let draws = 50_000;
        for _ in 0..draws {
            let step = crash.draw_crash_step(&mut rng);
            assert!((1..=51).contains(&step));
            if step == 1 {
                ones += 1;
            }
        }
        let observed = ones as f64 / draws as f64;
        assert!((observed - crash.probability(1)).abs() < 0.01, "observed {observed}");
    }

    #[test]
    fn test_conditional_draws_are_strictly_after() {
        let (_, crash) = calibrated(&GameConfig::ascent_100());
        let mut rng = ChaCha8Rng::seed_from_u64(9);

        for start in [0, 1, 15, 60, 98, 99] {
            for _ in 0..300 {
                let step = crash.draw_crash_step_after(start, &mut rng);
                assert!(step > start && step <= 101, "start {start} drew {step}");
            }
        }
        assert_eq!(crash.draw_crash_step_after(100, &mut rng), 101);
        assert_eq!(crash.draw_crash_step_after(250, &mut rng), 101);
    }

    #[test]
    fn test_from_probabilities_validation() {
        let table = MultiplierTable::geometric(2, 4.0).unwrap();
        assert!(CrashDistribution::from_probabilities(vec![0.5, 0.25], 0.25, &table, 0.97).is_ok());
        assert!(CrashDistribution::from_probabilities(vec![0.5, 0.25], 0.2, &table, 0.97).is_err());
        assert!(CrashDistribution::from_probabilities(vec![1.0], 0.0, &table, 0.97).is_err());
        assert!(
            CrashDistribution::from_probabilities(vec![1.5, -0.5], 0.0, &table, 0.97).is_err()
        );
    }

    #[test]
    fn test_zero_mass_after_start_goes_beyond_range() {
        let table = MultiplierTable::geometric(3, 8.0).unwrap();
        let crash =
            CrashDistribution::from_probabilities(vec![0.6, 0.4, 0.0], 0.0, &table, 0.97).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        assert_eq!(crash.draw_crash_step_after(2, &mut rng), 4);
        assert_eq!(crash.draw_crash_step_after(1, &mut rng), 2);
    }

    #[test]
    fn test_draws_outside_in_range_mass_hit_the_tail() {
        let table = MultiplierTable::geometric(3, 8.0).unwrap();
        let all_tail =
            CrashDistribution::from_probabilities(vec![0.0; 3], 1.0, &table, 0.97).unwrap();
        assert_eq!(all_tail.step_for_draw(0.0), 4);
        assert_eq!(all_tail.step_for_draw(0.5), 4);

        let leading_zero =
            CrashDistribution::from_probabilities(vec![0.0, 0.5, 0.0], 0.5, &table, 0.97).unwrap();
        assert_eq!(leading_zero.step_for_draw(0.25), 2);
        assert_eq!(leading_zero.step_for_draw(0.5), 4);
        assert_eq!(leading_zero.step_for_draw(0.75), 4);
    }

    #[test]
    fn test_rejects_mismatched_table() {
        let table = MultiplierTable::build(&GameConfig::ascent_50()).unwrap();
        assert!(matches!(
            CrashDistribution::calibrate(&GameConfig::ascent_100(), &table),
            Err(EngineError::InvalidTable(_))
        ));
    }
}
