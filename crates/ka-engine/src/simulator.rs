//! Round simulator — the per-round state machine
//!
//! ```text
//! Active ──bonus crash──────────────> CrashedOnBonus
//!   │    ──cashout inside window────> CashedOut
//!   │    ──crash inside move────────> CrashedDuringMove
//!   └────reached N──────────────────> ReachedTop | CrashedDuringMove
//! ```

use std::fmt;
use std::str::FromStr;

use log::debug;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::bonus::{BonusKind, JumpOutcome};
use crate::context::GameContext;
use crate::error::{EngineError, EngineResult};
use crate::round::{BonusEvent, RoundOutcome, RoundResult};

/// How bonuses are triggered during a round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayMode {
    /// Plain rounds, no bonuses
    Base,
    /// Base game with the decaying free-bonus schedule
    BaseWithFreeBonuses,
    /// Paid bonus of one kind, offered at every step
    BonusBuy(BonusKind),
}

impl PlayMode {
    pub fn label(&self) -> String {
        match self {
            Self::Base => "Base".into(),
            Self::BaseWithFreeBonuses => "Base + free bonuses".into(),
            Self::BonusBuy(kind) => format!("{kind} bonus buy"),
        }
    }
}

impl fmt::Display for PlayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

impl FromStr for PlayMode {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "base" | "plain" => Ok(Self::Base),
            "free" | "free_bonus" | "free-bonus" | "base_with_free_bonuses" => {
                Ok(Self::BaseWithFreeBonuses)
            }
            "mystic" => Ok(Self::BonusBuy(BonusKind::Mystic)),
            "dragon" => Ok(Self::BonusBuy(BonusKind::Dragon)),
            other => Err(EngineError::InvalidConfig(format!("unknown play mode '{other}'"))),
        }
    }
}

/// Where the player intends to cash out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CashoutStrategy {
    /// Uniform in `[0, N]` per round
    Random,
    /// Always the same step
    Fixed(u32),
}

impl CashoutStrategy {
    pub fn validate(&self, total_steps: u32) -> EngineResult<()> {
        match *self {
            Self::Fixed(step) if step > total_steps => {
                Err(EngineError::InvalidCashout { step, total_steps })
            }
            _ => Ok(()),
        }
    }

    /// Cashout step for a new round
    pub fn pick<R: Rng>(&self, total_steps: u32, rng: &mut R) -> u32 {
        match *self {
            Self::Random => rng.random_range(0..=total_steps),
            Self::Fixed(step) => step.min(total_steps),
        }
    }
}

impl Default for CashoutStrategy {
    fn default() -> Self {
        Self::Random
    }
}

/// Per-round player choices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundSettings {
    pub mode: PlayMode,
    /// Steps advanced per ordinary move
    pub speed_increment: u32,
    pub cashout: CashoutStrategy,
}

impl RoundSettings {
    pub fn new(mode: PlayMode, speed_increment: u32, cashout: CashoutStrategy) -> Self {
        Self {
            mode,
            speed_increment,
            cashout,
        }
    }

    pub fn validate(&self, ctx: &GameContext) -> EngineResult<()> {
        if self.speed_increment == 0 {
            return Err(EngineError::InvalidConfig(
                "speed increment must be at least 1".into(),
            ));
        }
        self.cashout.validate(ctx.total_steps())
    }
}

impl Default for RoundSettings {
    fn default() -> Self {
        Self::new(PlayMode::Base, 1, CashoutStrategy::Random)
    }
}

/// Mutable state of the round in flight
struct RoundState {
    current_step: u32,
    crash_step: u32,
    cashout_step: u32,
    total_cost: f64,
    used_bonus: Option<BonusKind>,
    bonus_events: Vec<BonusEvent>,
}

impl RoundState {
    fn finish(
        self,
        outcome: RoundOutcome,
        final_step: u32,
        total_winnings: f64,
        speed_increment: u32,
    ) -> RoundResult {
        RoundResult {
            final_step,
            outcome,
            total_cost: self.total_cost,
            total_winnings,
            crash_step: self.crash_step,
            cashout_step: self.cashout_step,
            speed_increment,
            used_bonus: self.used_bonus,
            bonus_events: self.bonus_events,
        }
    }

    /// Cashout target lies in `(current, next]` and the crash comes later
    fn cashes_out_within(&self, next_step: u32) -> bool {
        self.cashout_step > self.current_step
            && self.cashout_step <= next_step
            && self.crash_step > self.cashout_step
    }
}

/// Play one round to a terminal state
pub fn simulate_round<R: Rng>(ctx: &GameContext, settings: &RoundSettings, rng: &mut R) -> RoundResult {
    let config = ctx.config();
    let table = ctx.table();
    let total_steps = config.total_steps;
    let stake = config.base_stake;
    let speed = settings.speed_increment.max(1);

    let mut state = RoundState {
        current_step: 0,
        crash_step: ctx.crash().draw_crash_step(rng),
        cashout_step: settings.cashout.pick(total_steps, rng),
        total_cost: stake,
        used_bonus: None,
        bonus_events: Vec::new(),
    };

    while state.current_step < total_steps {
        // ═══════════════════════════════════════════════════════════════════
        // BONUS
        // ═══════════════════════════════════════════════════════════════════

        if let Some(activation) = decide_bonus(ctx, settings.mode, state.current_step, rng) {
            let BonusActivation { kind, free, cost } = activation;
            let from_step = state.current_step;
            state.total_cost += cost;

            let jump = config.bonus(kind).sample_jump(from_step, total_steps, rng);
            let original_crash = state.crash_step;

            if jump == JumpOutcome::Crashed {
                state.bonus_events.push(BonusEvent {
                    kind,
                    free,
                    from_step,
                    to_step: from_step,
                    cost,
                    payout: 0.0,
                    rtp: bonus_rtp(0.0, cost),
                    crashed: true,
                    crash_step: original_crash,
                    redistributed_crash_step: None,
                });
                state.used_bonus = Some(kind);
                return state.finish(RoundOutcome::CrashedOnBonus, from_step, 0.0, speed);
            }

            let new_step = from_step + jump.distance();
            let mut redistributed = None;
            if state.crash_step > from_step && state.crash_step <= new_step {
                let moved = ctx.crash().draw_crash_step_after(new_step, rng);
                debug!(
                    "{kind} jump {from_step}->{new_step} skipped crash at {original_crash}, moved to {moved}"
                );
                state.crash_step = moved;
                redistributed = Some(moved);
            }

            let payout = table.at(new_step);
            state.bonus_events.push(BonusEvent {
                kind,
                free,
                from_step,
                to_step: new_step,
                cost,
                payout,
                rtp: bonus_rtp(payout, cost),
                crashed: false,
                crash_step: original_crash,
                redistributed_crash_step: redistributed,
            });

            if state.cashes_out_within(new_step) {
                let cashout = state.cashout_step;
                let winnings = stake * table.at(cashout);
                return state.finish(RoundOutcome::CashedOut, cashout, winnings, speed);
            }

            // Counted as used only once the round continues past the jump
            state.current_step = new_step;
            state.used_bonus = Some(kind);
        }

        // ═══════════════════════════════════════════════════════════════════
        // ORDINARY MOVE
        // ═══════════════════════════════════════════════════════════════════

        let next_step = (state.current_step + speed).min(total_steps);

        if state.cashes_out_within(next_step) {
            let cashout = state.cashout_step;
            let winnings = stake * table.at(cashout);
            return state.finish(RoundOutcome::CashedOut, cashout, winnings, speed);
        }

        if state.crash_step <= next_step {
            let last_safe = state.current_step;
            return state.finish(RoundOutcome::CrashedDuringMove, last_safe, 0.0, speed);
        }

        state.current_step = next_step;
    }

    if state.crash_step > state.cashout_step || state.crash_step == config.beyond_range_step() {
        let winnings = stake * table.top();
        return state.finish(RoundOutcome::ReachedTop, total_steps, winnings, speed);
    }

    let last = state.current_step;
    state.finish(RoundOutcome::CrashedDuringMove, last, 0.0, speed)
}

/// A bonus granted at the current step
struct BonusActivation {
    kind: BonusKind,
    free: bool,
    cost: f64,
}

/// Which bonus (if any) activates at `step`, with its fee
fn decide_bonus<R: Rng>(
    ctx: &GameContext,
    mode: PlayMode,
    step: u32,
    rng: &mut R,
) -> Option<BonusActivation> {
    let config = ctx.config();
    match mode {
        PlayMode::Base => None,
        PlayMode::BaseWithFreeBonuses => {
            let schedule = &config.free_bonus;
            let probability = schedule.probability_at(step);
            if probability <= 0.0 || schedule.kinds.is_empty() {
                return None;
            }
            if rng.random::<f64>() >= probability {
                return None;
            }
            let kind = *schedule.kinds.choose(rng)?;
            config
                .bonus(kind)
                .is_feasible(step, config.total_steps)
                .then_some(BonusActivation {
                    kind,
                    free: true,
                    cost: 0.0,
                })
        }
        PlayMode::BonusBuy(kind) => {
            if rng.random::<f64>() >= config.bonus(kind).activation_probability {
                return None;
            }
            // Infeasible steps have no price and offer no bonus
            let cost = ctx.bonus_cost(kind, step)?;
            Some(BonusActivation {
                kind,
                free: false,
                cost,
            })
        }
    }
}

fn bonus_rtp(payout: f64, cost: f64) -> f64 {
    if cost > 0.0 {
        payout / cost * 100.0
    } else if payout > 0.0 {
        f64::INFINITY
    } else {
        0.0
    }
}

/// Stateful driver: one context, one RNG stream, many rounds
pub struct RoundSimulator<'a> {
    ctx: &'a GameContext,
    settings: RoundSettings,
    rng: ChaCha8Rng,
    rounds_played: u64,
}

impl<'a> RoundSimulator<'a> {
    /// Create a simulator seeded from OS entropy
    pub fn new(ctx: &'a GameContext, settings: RoundSettings) -> EngineResult<Self> {
        settings.validate(ctx)?;
        Ok(Self {
            ctx,
            settings,
            rng: ChaCha8Rng::from_os_rng(),
            rounds_played: 0,
        })
    }

    /// Create a reproducible simulator
    pub fn with_seed(ctx: &'a GameContext, settings: RoundSettings, seed: u64) -> EngineResult<Self> {
        let mut sim = Self::new(ctx, settings)?;
        sim.seed(seed);
        Ok(sim)
    }

    /// Reseed the generator
    pub fn seed(&mut self, seed: u64) {
        self.rng = ChaCha8Rng::seed_from_u64(seed);
    }

    pub fn settings(&self) -> &RoundSettings {
        &self.settings
    }

    pub fn rounds_played(&self) -> u64 {
        self.rounds_played
    }

    /// Play one round with the current settings
    pub fn play(&mut self) -> RoundResult {
        self.rounds_played += 1;
        simulate_round(self.ctx, &self.settings, &mut self.rng)
    }
}

impl Iterator for RoundSimulator<'_> {
    type Item = RoundResult;

    fn next(&mut self) -> Option<RoundResult> {
        Some(self.play())
    }
}
