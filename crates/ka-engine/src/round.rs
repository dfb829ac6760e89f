//! Round results and bonus event records

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::bonus::BonusKind;

/// Terminal state of a round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundOutcome {
    CashedOut,
    CrashedDuringMove,
    CrashedOnBonus,
    ReachedTop,
}

impl RoundOutcome {
    pub const ALL: [RoundOutcome; 4] = [
        RoundOutcome::CashedOut,
        RoundOutcome::CrashedDuringMove,
        RoundOutcome::CrashedOnBonus,
        RoundOutcome::ReachedTop,
    ];

    /// Display label used in logs and reports
    pub fn label(&self) -> &'static str {
        match self {
            Self::CashedOut => "Cashed out",
            Self::CrashedDuringMove => "Crashed during move",
            Self::CrashedOnBonus => "Crashed (Bonus)",
            Self::ReachedTop => "Reached the top",
        }
    }

    pub fn is_crash(&self) -> bool {
        matches!(self, Self::CrashedDuringMove | Self::CrashedOnBonus)
    }

    pub fn is_win(&self) -> bool {
        matches!(self, Self::CashedOut | Self::ReachedTop)
    }
}

impl fmt::Display for RoundOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One bonus activation inside a round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BonusEvent {
    pub kind: BonusKind,
    /// Granted by the free-bonus schedule (cost 0)
    pub free: bool,
    pub from_step: u32,
    /// Landing step; equals `from_step` when the bonus crashed
    pub to_step: u32,
    pub cost: f64,
    /// `multiplier(to_step)`, 0 on a crash
    pub payout: f64,
    /// `payout / cost · 100`; free bonuses report `+∞` for any payout
    pub rtp: f64,
    pub crashed: bool,
    /// Crash step before the jump
    pub crash_step: u32,
    /// Crash step after redistribution, if the jump skipped it
    pub redistributed_crash_step: Option<u32>,
}

impl BonusEvent {
    pub fn jump_distance(&self) -> u32 {
        self.to_step - self.from_step
    }
}

/// Everything a round produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundResult {
    pub final_step: u32,
    pub outcome: RoundOutcome,
    /// Stake plus any paid bonus fees
    pub total_cost: f64,
    pub total_winnings: f64,
    /// Final (possibly redistributed) crash step, `N+1` for no crash
    pub crash_step: u32,
    pub cashout_step: u32,
    pub speed_increment: u32,
    /// Last bonus the round continued past, or the one it crashed on.
    /// A cashout inside a bonus jump leaves this at its earlier value.
    pub used_bonus: Option<BonusKind>,
    pub bonus_events: Vec<BonusEvent>,
}

impl RoundResult {
    pub fn is_crash(&self) -> bool {
        self.outcome.is_crash()
    }

    /// Outcome label naming the bonus that crashed, e.g. "Crashed (Dragon Bonus)"
    pub fn outcome_label(&self) -> String {
        match (self.outcome, self.used_bonus) {
            (RoundOutcome::CrashedOnBonus, Some(kind)) => format!("Crashed ({kind} Bonus)"),
            (outcome, _) => outcome.label().to_string(),
        }
    }

    pub fn bonus_count(&self) -> usize {
        self.bonus_events.len()
    }
}
