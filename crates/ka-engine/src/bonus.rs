//! Bonus jumps — pricing, feasibility and the jump-distance sampler
//!
//! A bonus pays a fee to move the step pointer forward. The distance comes
//! from an ordered table of bins; each bin is a tagged [`JumpKind`] so the
//! sampler dispatches on the variant instead of on magic values. A
//! crash-capable bonus (Dragon) first rolls for an immediate forced loss.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::curve::MultiplierTable;

/// Bonus type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BonusKind {
    /// Safe jump
    Mystic,
    /// High-risk jump with a forced-loss roll
    Dragon,
}

impl BonusKind {
    pub const ALL: [BonusKind; 2] = [BonusKind::Mystic, BonusKind::Dragon];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Mystic => "Mystic",
            Self::Dragon => "Dragon",
        }
    }
}

impl fmt::Display for BonusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How a selected bin turns into a jump
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JumpKind {
    /// Uniform jump distance in `[min, max]`, capped by the room left
    Ranged { min: u32, max: u32 },
    /// Fixed jump distance, capped by the room left
    Exact { steps: u32 },
    /// Jump straight to the last step
    JumpToTop,
    /// Land on a uniform absolute step in `[min, max]`, strictly ahead
    TailRange { min: u32, max: u32 },
}

/// One row of a jump distribution
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JumpBin {
    #[serde(flatten)]
    pub kind: JumpKind,
    pub probability: f64,
}

impl JumpBin {
    pub fn ranged(min: u32, max: u32, probability: f64) -> Self {
        Self {
            kind: JumpKind::Ranged { min, max },
            probability,
        }
    }

    pub fn exact(steps: u32, probability: f64) -> Self {
        Self {
            kind: JumpKind::Exact { steps },
            probability,
        }
    }

    pub fn to_top(probability: f64) -> Self {
        Self {
            kind: JumpKind::JumpToTop,
            probability,
        }
    }

    pub fn tail_range(min: u32, max: u32, probability: f64) -> Self {
        Self {
            kind: JumpKind::TailRange { min, max },
            probability,
        }
    }
}

/// Result of a jump draw
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JumpOutcome {
    /// Move forward by this many steps (always > 0)
    Advance(u32),
    /// No movement; the round continues
    Stay,
    /// Forced loss, the round ends
    Crashed,
}

impl JumpOutcome {
    fn advance(steps: u32) -> Self {
        if steps == 0 { Self::Stay } else { Self::Advance(steps) }
    }

    /// Steps moved (0 for `Stay` and `Crashed`)
    pub fn distance(&self) -> u32 {
        match self {
            Self::Advance(steps) => *steps,
            Self::Stay | Self::Crashed => 0,
        }
    }

    pub fn is_crash(&self) -> bool {
        matches!(self, Self::Crashed)
    }
}

/// Parameters of one bonus type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BonusConfig {
    /// Nominal jump used for pricing and feasibility
    pub target_jump_steps: u32,
    /// Chance of an immediate forced loss (0 for safe bonuses)
    #[serde(default)]
    pub crash_probability: f64,
    /// Per-step activation chance in bonus-buy simulation modes
    pub activation_probability: f64,
    /// Ordered jump distribution
    pub jump_bins: Vec<JumpBin>,
}

impl BonusConfig {
    pub fn mystic_100() -> Self {
        Self {
            target_jump_steps: 15,
            crash_probability: 0.0,
            activation_probability: 0.5,
            jump_bins: vec![
                JumpBin::ranged(5, 10, 0.1994),
                JumpBin::ranged(11, 14, 0.2991),
                JumpBin::exact(15, 0.2991),
                JumpBin::ranged(16, 20, 0.14955),
                JumpBin::ranged(21, 25, 0.04985),
                JumpBin::to_top(0.001),
                JumpBin::tail_range(85, 99, 0.002),
            ],
        }
    }

    pub fn dragon_100() -> Self {
        Self {
            target_jump_steps: 25,
            crash_probability: 0.5,
            activation_probability: 0.5,
            jump_bins: vec![
                JumpBin::ranged(10, 15, 0.1491),
                JumpBin::ranged(16, 20, 0.1988),
                JumpBin::ranged(21, 24, 0.2485),
                JumpBin::exact(25, 0.2485),
                JumpBin::ranged(26, 30, 0.0994),
                JumpBin::ranged(31, 40, 0.0497),
                JumpBin::to_top(0.002),
                JumpBin::tail_range(85, 99, 0.004),
            ],
        }
    }

    pub fn mystic_50() -> Self {
        Self {
            target_jump_steps: 8,
            crash_probability: 0.0,
            activation_probability: 0.5,
            jump_bins: vec![
                JumpBin::ranged(3, 5, 0.1994),
                JumpBin::ranged(6, 7, 0.2991),
                JumpBin::exact(8, 0.2991),
                JumpBin::ranged(9, 10, 0.14955),
                JumpBin::ranged(11, 13, 0.04985),
                JumpBin::to_top(0.001),
                JumpBin::tail_range(43, 49, 0.002),
            ],
        }
    }

    pub fn dragon_50() -> Self {
        Self {
            target_jump_steps: 13,
            crash_probability: 0.5,
            activation_probability: 0.5,
            jump_bins: vec![
                JumpBin::ranged(5, 8, 0.1491),
                JumpBin::ranged(9, 10, 0.1988),
                JumpBin::ranged(11, 12, 0.2485),
                JumpBin::exact(13, 0.2485),
                JumpBin::ranged(14, 15, 0.0994),
                JumpBin::ranged(16, 20, 0.0497),
                JumpBin::to_top(0.002),
                JumpBin::tail_range(43, 49, 0.004),
            ],
        }
    }

    /// Total probability carried by the bins
    pub fn bin_mass(&self) -> f64 {
        self.jump_bins.iter().map(|b| b.probability).sum()
    }

    /// Whether the bonus may be activated at `current_step`
    ///
    /// Activation requires the nominal jump to land strictly below the top.
    pub fn is_feasible(&self, current_step: u32, total_steps: u32) -> bool {
        current_step.saturating_add(self.target_jump_steps) < total_steps
    }

    /// Step the price is computed against
    pub fn target_step(&self, current_step: u32, total_steps: u32) -> u32 {
        current_step
            .saturating_add(self.target_jump_steps)
            .min(total_steps)
    }

    /// Fee for a paid activation, `None` when infeasible
    pub fn cost(&self, table: &MultiplierTable, current_step: u32, bonus_rtp: f64) -> Option<f64> {
        let total_steps = table.total_steps();
        if !self.is_feasible(current_step, total_steps) {
            return None;
        }
        let target = self.target_step(current_step, total_steps);
        Some((table.at(target) - table.at(current_step)) / bonus_rtp)
    }

    /// Draw a jump from `current_step`
    pub fn sample_jump<R: Rng>(&self, current_step: u32, total_steps: u32, rng: &mut R) -> JumpOutcome {
        let max_jump = total_steps.saturating_sub(current_step);
        if max_jump == 0 {
            return JumpOutcome::Stay;
        }

        if self.crash_probability > 0.0 && rng.random::<f64>() < self.crash_probability {
            return JumpOutcome::Crashed;
        }

        let u: f64 = rng.random();
        let mut cumulative = 0.0;
        for bin in &self.jump_bins {
            cumulative += bin.probability;
            if u <= cumulative {
                return resolve_bin(bin.kind, current_step, total_steps, max_jump, rng);
            }
        }

        // Bins summing to slightly under 1.0
        JumpOutcome::Stay
    }

    pub(crate) fn validate(&self, total_steps: u32) -> Result<(), String> {
        if self.target_jump_steps == 0 {
            return Err("target jump must be at least 1 step".into());
        }
        if !(0.0..=1.0).contains(&self.crash_probability) {
            return Err(format!("crash probability {} outside [0, 1]", self.crash_probability));
        }
        if !(0.0..=1.0).contains(&self.activation_probability) {
            return Err(format!(
                "activation probability {} outside [0, 1]",
                self.activation_probability
            ));
        }
        if self.jump_bins.is_empty() {
            return Err("jump distribution is empty".into());
        }

        for bin in &self.jump_bins {
            if !bin.probability.is_finite() || bin.probability < 0.0 {
                return Err(format!("bin probability {} is invalid", bin.probability));
            }
            match bin.kind {
                JumpKind::Ranged { min, max } if min > max => {
                    return Err(format!("ranged bin [{min}, {max}] is inverted"));
                }
                JumpKind::Exact { steps: 0 } => {
                    return Err("exact bin must jump at least 1 step".into());
                }
                JumpKind::TailRange { min, max } if min == 0 || min > max || max > total_steps => {
                    return Err(format!(
                        "tail bin [{min}, {max}] must lie within 1..={total_steps}"
                    ));
                }
                _ => {}
            }
        }

        let mass = self.bin_mass();
        if mass <= 0.0 || mass > 1.0 + 1e-6 {
            return Err(format!("jump probabilities sum to {mass}, expected (0, 1]"));
        }
        Ok(())
    }
}

fn resolve_bin<R: Rng>(
    kind: JumpKind,
    current_step: u32,
    total_steps: u32,
    max_jump: u32,
    rng: &mut R,
) -> JumpOutcome {
    match kind {
        JumpKind::JumpToTop => JumpOutcome::advance(max_jump),
        JumpKind::TailRange { min, max } => {
            let lo = min.max(current_step + 1);
            let hi = max.min(total_steps);
            if lo > hi {
                return JumpOutcome::Stay;
            }
            JumpOutcome::advance(rng.random_range(lo..=hi) - current_step)
        }
        JumpKind::Exact { steps } => JumpOutcome::advance(steps.min(max_jump)),
        JumpKind::Ranged { min, max } => {
            let hi = max.min(max_jump);
            if min > hi {
                return JumpOutcome::Stay;
            }
            JumpOutcome::advance(rng.random_range(min..=hi))
        }
    }
}
