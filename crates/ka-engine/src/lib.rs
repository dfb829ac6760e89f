//! # ka-engine — Crash-curve engine for Knight Ascent
//!
//! Stochastic core of an escalating-multiplier game: a geometric multiplier
//! curve, a crash distribution calibrated toward a target RTP, Mystic/Dragon
//! bonus jumps and the per-round state machine.
//!
//! ## Architecture
//!
//! ```text
//! GameConfig (preset or JSON/YAML)
//!     │
//!     ├── MultiplierTable   (step → multiplier)
//!     └── CrashDistribution (calibrated PMF + tail)
//!           │
//!           v
//!     GameContext ──(shared, read-only)──> simulate_round → RoundResult
//!                                              │
//!                                              └── BonusConfig::sample_jump
//! ```
//!
//! ## Example
//!
//! ```
//! use ka_engine::*;
//! use rand::SeedableRng;
//! use rand_chacha::ChaCha8Rng;
//!
//! let ctx = GameContext::new(GameConfig::ascent_50()).unwrap();
//! let settings = RoundSettings::new(PlayMode::Base, 1, CashoutStrategy::Fixed(10));
//! let mut rng = ChaCha8Rng::seed_from_u64(7);
//!
//! let result = simulate_round(&ctx, &settings, &mut rng);
//! assert!(result.final_step <= 50);
//! ```

pub mod bonus;
pub mod config;
pub mod context;
pub mod crash;
pub mod curve;
pub mod error;
pub mod round;
pub mod simulator;

pub use bonus::*;
pub use config::*;
pub use context::*;
pub use crash::*;
pub use curve::*;
pub use error::*;
pub use round::*;
pub use simulator::*;
