//! Game configuration
//!
//! A single parameterized configuration replaces the per-variant constant
//! sets: step count, curve height, crash hazard, bonus jump tables and speed
//! modes are all data. Two presets mirror the shipped tunings.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::bonus::{BonusConfig, BonusKind};
use crate::error::{EngineError, EngineResult};

/// Exponential crash-hazard model and its RTP target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrashModel {
    /// Decay rate λ of the negative-exponential prior
    pub decay_rate: f64,
    /// Mass reserved for "no crash within range" (crash at N+1)
    pub tail_probability: f64,
    /// Target expected payout per unit stake (0.97 = 97%)
    pub target_rtp: f64,
}

impl CrashModel {
    /// Tuning for the 100-step curve
    pub fn steps_100() -> Self {
        Self {
            decay_rate: 0.101,
            tail_probability: 0.0001,
            target_rtp: 0.97,
        }
    }

    /// Tuning for the 50-step curve (λ doubled to keep the same shape)
    pub fn steps_50() -> Self {
        Self {
            decay_rate: 0.202,
            tail_probability: 0.0001,
            target_rtp: 0.97,
        }
    }
}

/// Free bonus schedule for base-game rounds
///
/// The chance of a free bonus decays linearly from `start_probability` at
/// step 0 to zero at `fade_out_step`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FreeBonusSchedule {
    pub start_probability: f64,
    pub fade_out_step: u32,
    /// Bonus kinds a free activation may pick from (uniformly)
    pub kinds: Vec<BonusKind>,
}

impl FreeBonusSchedule {
    /// Activation probability at a given step
    pub fn probability_at(&self, step: u32) -> f64 {
        if self.fade_out_step == 0 {
            return 0.0;
        }
        let fade = self.fade_out_step as f64;
        self.start_probability * ((fade - step as f64) / fade).max(0.0)
    }
}

/// Named step increment ("Normal" = 1 step per move)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpeedMode {
    pub name: String,
    pub increment: u32,
}

impl SpeedMode {
    pub fn new(name: impl Into<String>, increment: u32) -> Self {
        Self {
            name: name.into(),
            increment,
        }
    }

    pub fn normal() -> Self {
        Self::new("Normal", 1)
    }

    pub fn fast() -> Self {
        Self::new("Fast", 3)
    }

    pub fn swift() -> Self {
        Self::new("Swift", 10)
    }

    /// The shipped speed table
    pub fn standard_set() -> Vec<Self> {
        vec![Self::normal(), Self::fast(), Self::swift()]
    }
}

/// Complete, immutable game configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameConfig {
    /// Name for reference
    pub name: String,
    /// Number of steps N on the curve (steps are 0..=N)
    pub total_steps: u32,
    /// Multiplier reached at step N
    pub max_multiplier: f64,
    /// Stake paid per round
    pub base_stake: f64,
    /// Crash hazard and RTP target
    pub crash: CrashModel,
    /// RTP target used to price paid bonuses
    pub bonus_rtp: f64,
    /// Safe jump bonus
    pub mystic: BonusConfig,
    /// High-risk jump bonus
    pub dragon: BonusConfig,
    /// Free bonuses in the base game
    pub free_bonus: FreeBonusSchedule,
    /// Available speed modes
    pub speed_modes: Vec<SpeedMode>,
}

impl GameConfig {
    /// 100-step curve to 15,000x
    pub fn ascent_100() -> Self {
        Self {
            name: "Ascent 100".into(),
            total_steps: 100,
            max_multiplier: 15_000.0,
            base_stake: 1.0,
            crash: CrashModel::steps_100(),
            bonus_rtp: 0.95,
            mystic: BonusConfig::mystic_100(),
            dragon: BonusConfig::dragon_100(),
            free_bonus: FreeBonusSchedule {
                start_probability: 0.05,
                fade_out_step: 10,
                kinds: vec![BonusKind::Mystic, BonusKind::Dragon],
            },
            speed_modes: SpeedMode::standard_set(),
        }
    }

    /// 50-step curve to 15,000x; free bonuses are Mystic only
    pub fn ascent_50() -> Self {
        Self {
            name: "Ascent 50".into(),
            total_steps: 50,
            max_multiplier: 15_000.0,
            base_stake: 1.0,
            crash: CrashModel::steps_50(),
            bonus_rtp: 0.95,
            mystic: BonusConfig::mystic_50(),
            dragon: BonusConfig::dragon_50(),
            free_bonus: FreeBonusSchedule {
                start_probability: 0.05,
                fade_out_step: 5,
                kinds: vec![BonusKind::Mystic],
            },
            speed_modes: SpeedMode::standard_set(),
        }
    }

    /// Look up a preset by name
    pub fn preset(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "ascent_100" | "ascent-100" | "100" => Some(Self::ascent_100()),
            "ascent_50" | "ascent-50" | "50" => Some(Self::ascent_50()),
            _ => None,
        }
    }

    /// Builder: set target RTP
    pub fn with_target_rtp(mut self, rtp: f64) -> Self {
        self.crash.target_rtp = rtp;
        self
    }

    /// Builder: set stake
    pub fn with_base_stake(mut self, stake: f64) -> Self {
        self.base_stake = stake;
        self
    }

    /// Crash step meaning "no crash within range"
    pub fn beyond_range_step(&self) -> u32 {
        self.total_steps + 1
    }

    /// Bonus parameters by kind
    pub fn bonus(&self, kind: BonusKind) -> &BonusConfig {
        match kind {
            BonusKind::Mystic => &self.mystic,
            BonusKind::Dragon => &self.dragon,
        }
    }

    /// Speed mode by name (case-insensitive)
    pub fn speed_mode(&self, name: &str) -> EngineResult<&SpeedMode> {
        self.speed_modes
            .iter()
            .find(|m| m.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| EngineError::UnknownSpeedMode(name.to_string()))
    }

    /// Validate everything the engine relies on
    pub fn validate(&self) -> EngineResult<()> {
        if self.total_steps == 0 {
            return Err(invalid("total_steps must be at least 1"));
        }
        if !self.max_multiplier.is_finite() || self.max_multiplier <= 1.0 {
            return Err(invalid(format!(
                "max_multiplier must be finite and above 1, got {}",
                self.max_multiplier
            )));
        }
        if !self.base_stake.is_finite() || self.base_stake <= 0.0 {
            return Err(invalid(format!(
                "base_stake must be positive, got {}",
                self.base_stake
            )));
        }

        let crash = &self.crash;
        if !crash.decay_rate.is_finite() || crash.decay_rate <= 0.0 {
            return Err(invalid(format!(
                "crash decay rate must be positive, got {}",
                crash.decay_rate
            )));
        }
        if !(0.0..1.0).contains(&crash.tail_probability) {
            return Err(invalid(format!(
                "tail probability must be in [0, 1), got {}",
                crash.tail_probability
            )));
        }
        if !crash.target_rtp.is_finite() || crash.target_rtp <= 0.0 {
            return Err(invalid(format!(
                "target RTP must be positive, got {}",
                crash.target_rtp
            )));
        }
        if !self.bonus_rtp.is_finite() || self.bonus_rtp <= 0.0 {
            return Err(invalid(format!(
                "bonus RTP must be positive, got {}",
                self.bonus_rtp
            )));
        }

        for kind in BonusKind::ALL {
            self.bonus(kind)
                .validate(self.total_steps)
                .map_err(|e| invalid(format!("{kind} bonus: {e}")))?;
        }

        let free = &self.free_bonus;
        if !(0.0..=1.0).contains(&free.start_probability) {
            return Err(invalid(format!(
                "free bonus probability must be in [0, 1], got {}",
                free.start_probability
            )));
        }
        if free.start_probability > 0.0 && free.kinds.is_empty() {
            return Err(invalid("free bonus schedule has no eligible bonus kinds"));
        }

        if self.speed_modes.is_empty() {
            return Err(invalid("at least one speed mode is required"));
        }
        let mut names = HashSet::new();
        for mode in &self.speed_modes {
            if mode.increment == 0 {
                return Err(invalid(format!("speed mode {} has zero increment", mode.name)));
            }
            if !names.insert(mode.name.to_ascii_lowercase()) {
                return Err(invalid(format!("duplicate speed mode {}", mode.name)));
            }
        }

        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // SERIALIZATION
    // ═══════════════════════════════════════════════════════════════════════════

    /// Parse and validate a JSON configuration
    pub fn from_json(json: &str) -> EngineResult<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| EngineError::Serialization(format!("Invalid config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a YAML configuration
    pub fn from_yaml(yaml: &str) -> EngineResult<Self> {
        let config: Self = serde_yml::from_str(yaml)
            .map_err(|e| EngineError::Serialization(format!("Invalid config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> EngineResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| EngineError::Serialization(e.to_string()))
    }

    pub fn to_yaml(&self) -> EngineResult<String> {
        serde_yml::to_string(self).map_err(|e| EngineError::Serialization(e.to_string()))
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self::ascent_100()
    }
}

fn invalid(msg: impl Into<String>) -> EngineError {
    EngineError::InvalidConfig(msg.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bonus::{JumpBin, JumpKind};

    #[test]
    fn test_presets_validate() {
        assert!(GameConfig::ascent_100().validate().is_ok());
        assert!(GameConfig::ascent_50().validate().is_ok());
    }

    #[test]
    fn test_preset_lookup() {
        assert_eq!(GameConfig::preset("ascent-50").unwrap().total_steps, 50);
        assert_eq!(GameConfig::preset("100").unwrap().total_steps, 100);
        assert!(GameConfig::preset("ascent-75").is_none());
    }

    #[test]
    fn test_free_bonus_fades_out() {
        let schedule = GameConfig::ascent_50().free_bonus;
        assert!((schedule.probability_at(0) - 0.05).abs() < 1e-12);
        assert!((schedule.probability_at(1) - 0.04).abs() < 1e-12);
        assert_eq!(schedule.probability_at(5), 0.0);
        assert_eq!(schedule.probability_at(40), 0.0);
    }

    #[test]
    fn test_speed_mode_lookup() {
        let config = GameConfig::ascent_100();
        assert_eq!(config.speed_mode("swift").unwrap().increment, 10);
        assert!(matches!(
            config.speed_mode("warp"),
            Err(EngineError::UnknownSpeedMode(_))
        ));
    }

    #[test]
    fn test_rejects_out_of_curve_tail_bin() {
        // 85..99 only fits the 100-step curve
        let mut config = GameConfig::ascent_50();
        config.mystic.jump_bins = vec![JumpBin::tail_range(85, 99, 1.0)];
        assert!(matches!(config.validate(), Err(EngineError::InvalidConfig(_))));
    }

    #[test]
    fn test_rejects_bad_numbers() {
        let mut config = GameConfig::ascent_100();
        config.total_steps = 0;
        assert!(config.validate().is_err());

        let mut config = GameConfig::ascent_100();
        config.crash.tail_probability = 1.0;
        assert!(config.validate().is_err());

        let mut config = GameConfig::ascent_100();
        config.speed_modes.push(SpeedMode::new("normal", 2));
        assert!(config.validate().is_err());

        let mut config = GameConfig::ascent_100();
        config.dragon.jump_bins = vec![JumpBin {
            kind: JumpKind::Ranged { min: 9, max: 3 },
            probability: 1.0,
        }];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_json_and_yaml_roundtrip() {
        let config = GameConfig::ascent_50();

        let json = config.to_json().unwrap();
        assert_eq!(GameConfig::from_json(&json).unwrap(), config);

        let yaml = config.to_yaml().unwrap();
        assert_eq!(GameConfig::from_yaml(&yaml).unwrap(), config);
    }

    #[test]
    fn test_invalid_json_is_reported() {
        assert!(matches!(
            GameConfig::from_json("{ \"total_steps\": 10 }"),
            Err(EngineError::Serialization(_))
        ));
    }
}
