//! Session statistics (aggregated round outcomes)

use ka_engine::{GameConfig, RoundOutcome, RoundResult};
use serde::{Deserialize, Serialize};

use crate::error::{SimError, SimResult};

/// Running tallies over a batch of rounds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionStats {
    pub total_steps: u32,
    pub total_rounds: u64,
    pub total_winnings: f64,
    pub total_cost: f64,
    /// Sum of final steps, for the average
    pub steps_reached: u64,
    pub crashes: u64,
    pub bonus_crashes: u64,
    pub cash_outs: u64,
    pub reached_top: u64,
    pub bonus_activations: u64,
    pub free_bonus_activations: u64,
    pub bonus_fees: f64,
    /// Steps gained by bonus jumps that did not crash
    pub bonus_steps: u64,
    pub redistributions: u64,
    pub max_win: f64,
    /// Crash outcomes by final step, `0..=N+1`
    pub crash_counts: Vec<u64>,
    /// Cashouts by final step (reaching the top counts at N), `0..=N`
    pub cashout_counts: Vec<u64>,
    /// Drawn crash steps, `0..=N+1`
    pub crash_point_counts: Vec<u64>,
    /// Chosen cashout steps, `0..=N`
    pub cashout_point_counts: Vec<u64>,
    /// Speed mode names, parallel to `speed_counts`
    pub speed_names: Vec<String>,
    pub speed_counts: Vec<u64>,
}

impl SessionStats {
    pub fn new(config: &GameConfig) -> Self {
        let n = config.total_steps as usize;
        Self {
            total_steps: config.total_steps,
            total_rounds: 0,
            total_winnings: 0.0,
            total_cost: 0.0,
            steps_reached: 0,
            crashes: 0,
            bonus_crashes: 0,
            cash_outs: 0,
            reached_top: 0,
            bonus_activations: 0,
            free_bonus_activations: 0,
            bonus_fees: 0.0,
            bonus_steps: 0,
            redistributions: 0,
            max_win: 0.0,
            crash_counts: vec![0; n + 2],
            cashout_counts: vec![0; n + 1],
            crash_point_counts: vec![0; n + 2],
            cashout_point_counts: vec![0; n + 1],
            speed_names: config.speed_modes.iter().map(|m| m.name.clone()).collect(),
            speed_counts: vec![0; config.speed_modes.len()],
        }
    }

    /// Add one round played with speed mode `speed_index`
    pub fn record(&mut self, speed_index: usize, round: &RoundResult) {
        self.total_rounds += 1;
        self.total_winnings += round.total_winnings;
        self.total_cost += round.total_cost;
        self.steps_reached += u64::from(round.final_step);
        self.max_win = self.max_win.max(round.total_winnings);

        bump(&mut self.crash_point_counts, round.crash_step);
        bump(&mut self.cashout_point_counts, round.cashout_step);
        if let Some(count) = self.speed_counts.get_mut(speed_index) {
            *count += 1;
        }

        match round.outcome {
            RoundOutcome::CrashedDuringMove | RoundOutcome::CrashedOnBonus => {
                self.crashes += 1;
                if round.outcome == RoundOutcome::CrashedOnBonus {
                    self.bonus_crashes += 1;
                }
                bump(&mut self.crash_counts, round.final_step);
            }
            RoundOutcome::CashedOut => {
                self.cash_outs += 1;
                bump(&mut self.cashout_counts, round.final_step);
            }
            RoundOutcome::ReachedTop => {
                self.reached_top += 1;
                bump(&mut self.cashout_counts, self.total_steps);
            }
        }

        self.bonus_activations += round.bonus_count() as u64;
        for event in &round.bonus_events {
            self.bonus_steps += u64::from(event.jump_distance());
            if event.free {
                self.free_bonus_activations += 1;
            }
            self.bonus_fees += event.cost;
            if event.redistributed_crash_step.is_some() {
                self.redistributions += 1;
            }
        }
    }

    /// Fold another session (same game) into this one
    pub fn merge(&mut self, other: &SessionStats) -> SimResult<()> {
        if other.total_steps != self.total_steps || other.speed_names != self.speed_names {
            return Err(SimError::InvalidInput(
                "cannot merge statistics from different games".into(),
            ));
        }

        self.total_rounds += other.total_rounds;
        self.total_winnings += other.total_winnings;
        self.total_cost += other.total_cost;
        self.steps_reached += other.steps_reached;
        self.crashes += other.crashes;
        self.bonus_crashes += other.bonus_crashes;
        self.cash_outs += other.cash_outs;
        self.reached_top += other.reached_top;
        self.bonus_activations += other.bonus_activations;
        self.free_bonus_activations += other.free_bonus_activations;
        self.bonus_fees += other.bonus_fees;
        self.bonus_steps += other.bonus_steps;
        self.redistributions += other.redistributions;
        self.max_win = self.max_win.max(other.max_win);

        add_counts(&mut self.crash_counts, &other.crash_counts);
        add_counts(&mut self.cashout_counts, &other.cashout_counts);
        add_counts(&mut self.crash_point_counts, &other.crash_point_counts);
        add_counts(&mut self.cashout_point_counts, &other.cashout_point_counts);
        add_counts(&mut self.speed_counts, &other.speed_counts);
        Ok(())
    }

    /// RTP in percent (winnings / cost)
    pub fn rtp(&self) -> f64 {
        if self.total_cost > 0.0 {
            (self.total_winnings / self.total_cost) * 100.0
        } else {
            0.0
        }
    }

    pub fn net_profit(&self) -> f64 {
        self.total_winnings - self.total_cost
    }

    pub fn average_step(&self) -> f64 {
        if self.total_rounds > 0 {
            self.steps_reached as f64 / self.total_rounds as f64
        } else {
            0.0
        }
    }

    /// `count` as a percentage of all rounds
    pub fn percent(&self, count: u64) -> f64 {
        if self.total_rounds > 0 {
            count as f64 / self.total_rounds as f64 * 100.0
        } else {
            0.0
        }
    }

    /// Mean steps gained per bonus activation (crashed jumps gain 0)
    pub fn average_bonus_jump(&self) -> f64 {
        if self.bonus_activations > 0 {
            self.bonus_steps as f64 / self.bonus_activations as f64
        } else {
            0.0
        }
    }

    /// Share of rounds that paid out (cashout or top)
    pub fn hit_rate(&self) -> f64 {
        self.percent(self.cash_outs + self.reached_top)
    }
}

fn bump(counts: &mut [u64], step: u32) {
    if let Some(count) = counts.get_mut(step as usize) {
        *count += 1;
    }
}

fn add_counts(into: &mut [u64], from: &[u64]) {
    for (a, b) in into.iter_mut().zip(from) {
        *a += b;
    }
}
