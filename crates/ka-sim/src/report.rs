//! Simulation report (console text and JSON)

use ka_engine::{BonusKind, CalibrationReport, GameContext};
use serde::{Deserialize, Serialize};

use crate::config::SimConfig;
use crate::runner::BatchOutcome;
use crate::stats::SessionStats;

/// One row of the crash probability table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrashRow {
    pub step: u32,
    pub probability: f64,
}

/// Bonus prices at one step (`None` = infeasible)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BonusCostRow {
    pub step: u32,
    pub mystic: Option<f64>,
    pub dragon: Option<f64>,
}

/// Pre-run tables of a game: crash distribution and bonus prices
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameTables {
    pub game: String,
    pub total_steps: u32,
    pub calibration: CalibrationReport,
    pub crash_table: Vec<CrashRow>,
    pub tail_probability: f64,
    pub bonus_costs: Vec<BonusCostRow>,
}

impl GameTables {
    pub fn new(ctx: &GameContext) -> Self {
        let n = ctx.total_steps();
        let crash = ctx.crash();
        Self {
            game: ctx.config().name.clone(),
            total_steps: n,
            calibration: *crash.report(),
            crash_table: (1..=n)
                .map(|step| CrashRow {
                    step,
                    probability: crash.probability(step),
                })
                .collect(),
            tail_probability: crash.tail_probability(),
            bonus_costs: (0..n)
                .map(|step| BonusCostRow {
                    step,
                    mystic: ctx.bonus_cost(BonusKind::Mystic, step),
                    dragon: ctx.bonus_cost(BonusKind::Dragon, step),
                })
                .collect(),
        }
    }

    pub fn probability_sum(&self) -> f64 {
        self.crash_table.iter().map(|r| r.probability).sum::<f64>() + self.tail_probability
    }

    /// Calibration summary lines
    pub fn calibration_text(&self) -> String {
        let c = &self.calibration;
        let mut output = String::new();
        output.push_str(&format!("Initial Expected Return: {:.2}\n", c.initial_expected_return));
        output.push_str(&format!("Scaling Factor: {:.6}\n", c.scaling_factor));
        output.push_str(&format!(
            "Calculated RTP: {:.2}% (Target: {:.2}%, drift {:+.2}%)\n",
            c.realized_rtp * 100.0,
            c.target_rtp * 100.0,
            c.drift() * 100.0
        ));
        if let Some(first) = self.crash_table.first() {
            output.push_str(&format!(
                "Crash Probability at Step 1: {:.2}%\n",
                first.probability * 100.0
            ));
        }
        output
    }

    /// Crash probabilities by step
    pub fn crash_table_text(&self) -> String {
        let mut output = String::new();
        output.push_str("Crash Probabilities by Step:\n");
        output.push_str("Step | Probability (%)\n");
        output.push_str(&"-".repeat(20));
        output.push('\n');
        for row in &self.crash_table {
            output.push_str(&format!("{:>4} | {:.7}%\n", row.step, row.probability * 100.0));
        }
        output.push_str(&format!(
            "Crash at Step {}: {:.7}%\n",
            self.total_steps + 1,
            self.tail_probability * 100.0
        ));
        output.push_str(&"-".repeat(20));
        output.push('\n');
        output.push_str(&format!(
            "Sum of Probabilities: {:.2}%\n",
            self.probability_sum() * 100.0
        ));
        output
    }

    /// Bonus prices by step
    pub fn bonus_cost_text(&self) -> String {
        let mut output = String::new();
        output.push_str("Bonus Costs by Step:\n");
        output.push_str("Step | Mystic Bonus Cost | Dragon Bonus Cost\n");
        output.push_str(&"-".repeat(50));
        output.push('\n');
        for row in &self.bonus_costs {
            output.push_str(&format!(
                "{:>4} | {} | {}\n",
                row.step,
                cost_cell(row.mystic),
                cost_cell(row.dragon)
            ));
        }
        output.push_str(&"-".repeat(50));
        output.push('\n');
        output
    }

    pub fn to_text(&self) -> String {
        let title = format!("{} ({} steps)", self.game, self.total_steps);
        let mut output = String::new();
        output.push_str(&format!("{}\n{}\n\n", title, "=".repeat(title.len())));
        output.push_str(&self.calibration_text());
        output.push('\n');
        output.push_str(&self.crash_table_text());
        output.push('\n');
        output.push_str(&self.bonus_cost_text());
        output
    }
}

/// Full report of one batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationReport {
    pub title: String,
    pub mode: String,
    pub cashout: String,
    pub seed: u64,
    pub elapsed_ms: u64,
    pub rounds_per_second: f64,
    pub tables: GameTables,
    pub stats: SessionStats,
}

impl SimulationReport {
    pub fn new(ctx: &GameContext, config: &SimConfig, outcome: &BatchOutcome) -> Self {
        Self {
            title: format!("Knight Ascent Simulation: {}", ctx.config().name),
            mode: config.mode.label(),
            cashout: config.cashout_label(ctx.total_steps()),
            seed: outcome.seed,
            elapsed_ms: outcome.elapsed_ms,
            rounds_per_second: outcome.rounds_per_second(),
            tables: GameTables::new(ctx),
            stats: outcome.stats.clone(),
        }
    }

    /// Generate text report
    pub fn to_text(&self) -> String {
        let s = &self.stats;
        let mut output = String::new();

        output.push_str(&format!("{}\n", self.title));
        output.push_str(&format!("{}\n\n", "=".repeat(self.title.len())));
        output.push_str(&format!("Mode: {}\n", self.mode));
        output.push_str(&format!("Cashout strategy: {}\n", self.cashout));
        output.push_str(&format!("Seed: {}\n\n", self.seed));

        output.push_str(&self.tables.calibration_text());
        output.push('\n');
        output.push_str(&self.tables.crash_table_text());
        output.push('\n');
        output.push_str(&self.tables.bonus_cost_text());
        output.push('\n');

        // Statistics
        output.push_str("Simulation Statistics:\n");
        output.push_str(&format!("Total Rounds: {}\n", s.total_rounds));
        output.push_str(&format!("Total Winnings: ${:.2}\n", s.total_winnings));
        output.push_str(&format!("Total Cost: ${:.2}\n", s.total_cost));
        output.push_str(&format!("Net Profit: ${:.2}\n", s.net_profit()));
        output.push_str(&format!("Average Step Reached: {:.2}\n", s.average_step()));
        output.push_str(&format!("Hit Rate: {:.2}%\n", s.hit_rate()));
        output.push_str(&format!("Crashes: {} ({:.2}%)\n", s.crashes, s.percent(s.crashes)));
        output.push_str(&format!("Cash Outs: {} ({:.2}%)\n", s.cash_outs, s.percent(s.cash_outs)));
        output.push_str(&format!(
            "Reached Top: {} ({:.2}%)\n",
            s.reached_top,
            s.percent(s.reached_top)
        ));
        if s.bonus_activations > 0 {
            output.push_str(&format!(
                "Bonus Activations: {} ({} free, {} crashed, {} crash points redistributed)\n",
                s.bonus_activations, s.free_bonus_activations, s.bonus_crashes, s.redistributions
            ));
            output.push_str(&format!("Bonus Fees: ${:.2}\n", s.bonus_fees));
            output.push_str(&format!(
                "Average Bonus Jump: {:.2} steps\n",
                s.average_bonus_jump()
            ));
        }
        output.push('\n');

        output.push_str("RTP Calculations:\n");
        output.push_str(&format!(
            "{} RTP: {:.2}% (Winnings: ${:.2}, Cost: ${:.2})\n\n",
            self.mode,
            s.rtp(),
            s.total_winnings,
            s.total_cost
        ));

        // Speed modes
        output.push_str("Speed Mode Distribution:\n");
        output.push_str("Mode   | % Rounds\n");
        output.push_str(&"-".repeat(20));
        output.push('\n');
        for (name, count) in s.speed_names.iter().zip(&s.speed_counts) {
            output.push_str(&format!("{:<7}| {:.7}%\n", name, s.percent(*count)));
        }
        output.push('\n');

        // Per-step statistics
        output.push_str("Per-Step Statistics:\n");
        output.push_str("Step | % Crashes   | % Cashouts  | % Crash Points | % Cashout Points\n");
        output.push_str(&"-".repeat(75));
        output.push('\n');
        let n = s.total_steps as usize;
        for step in 1..=n {
            output.push_str(&format!(
                "{:>4} | {:.7}% | {:.7}% | {:.7}% | {:.7}%\n",
                step,
                s.percent(s.crash_counts[step]),
                s.percent(s.cashout_counts[step]),
                s.percent(s.crash_point_counts[step]),
                s.percent(s.cashout_point_counts[step])
            ));
        }
        output.push_str(&format!(
            "{:>4} | {:.7}% | {:<11} | {:.7}% | {:<11}\n",
            n + 1,
            s.percent(s.crash_counts[n + 1]),
            "N/A",
            s.percent(s.crash_point_counts[n + 1]),
            "N/A"
        ));

        output.push_str(&format!(
            "\nCompleted in {} ms ({:.0} rounds/s)\n",
            self.elapsed_ms, self.rounds_per_second
        ));
        output
    }

    /// Generate JSON report
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".into())
    }
}

fn cost_cell(cost: Option<f64>) -> String {
    match cost {
        Some(c) => format!("${:>16.2}", c),
        None => format!("{:>17}", "N/A"),
    }
}
