//! HEXFRAY Core - turn-based tactical battle engine
//!
//! This crate provides the battle logic for HEXFRAY:
//! - Hex battlefield geometry (odd-row offset grid, axial distance)
//! - Combat units and distance-gated damage resolution
//! - Battle phase state machine with intent validation
//! - Scripted enemy controller, sequenced as delayed sub-steps
//! - Scenario definitions for battle setup
//!
//! The presentation layer stays outside: it forwards intents (`select_unit`,
//! `move_to`, `choose_action`, ...) into [`Battle`] and renders the
//! [`Snapshot`]s and [`BattleEvent`]s the engine emits.

pub mod ai;
pub mod battle;
pub mod event;
pub mod grid;
pub mod scenario;
pub mod unit;

// Re-exports for convenient access
pub use ai::{choose_combat_action, CombatChoice};
pub use battle::{ActionChoice, Battle, IntentError, Phase, AI_STEP_DELAY, ENEMY_TURN_DELAY};
pub use event::{BattleEvent, Outcome, Snapshot, UnitView};
pub use grid::{Cell, Grid};
pub use scenario::{Scenario, UnitSpec};
pub use unit::{
    can_attack_at_distance, distance_penalty, resolve_attack, resolve_attack_with_variance, Team,
    Unit, UnitId, MAX_ATTACK_RANGE,
};
