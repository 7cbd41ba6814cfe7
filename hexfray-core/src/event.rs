//! Outbound engine notifications
//!
//! The presentation layer receives typed events (each with a human-readable
//! description via `Display`) plus full state snapshots after every mutation.

use crate::battle::Phase;
use crate::grid::Cell;
use crate::unit::{Team, UnitId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Terminal outcome of a battle
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    None,
    PlayerWon,
    PlayerLost,
}

/// Something that happened inside the engine, for the battle log
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum BattleEvent {
    BattleStarted,
    UnitSelected { name: String },
    UnitMoved { name: String, to: Cell },
    MovementSkipped { name: String },
    Defended { name: String },
    AttackLanded {
        attacker: String,
        target: String,
        damage: i32,
        special: bool,
    },
    UnitFell { name: String, team: Team },
    EnemyTurnStarted,
    EnemyHeldPosition { name: String },
    RoundEnded { turn_count: u32 },
    Victory,
    Defeat,
    BattleReset,
}

impl fmt::Display for BattleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BattleEvent::BattleStarted => write!(f, "Battle begins! Your turn."),
            BattleEvent::UnitSelected { name } => write!(f, "{name} is ready to move."),
            BattleEvent::UnitMoved { name, to } => {
                write!(f, "{name} moves to ({}, {}).", to.row, to.col)
            }
            BattleEvent::MovementSkipped { name } => write!(f, "{name} holds position."),
            BattleEvent::Defended { name } => write!(f, "{name} braces for the next attack."),
            BattleEvent::AttackLanded {
                attacker,
                target,
                damage,
                special,
            } => {
                if *special {
                    write!(f, "{attacker} unleashes a special attack on {target} for {damage} damage!")
                } else {
                    write!(f, "{attacker} attacks {target} for {damage} damage!")
                }
            }
            BattleEvent::UnitFell { name, .. } => write!(f, "{name} has fallen!"),
            BattleEvent::EnemyTurnStarted => write!(f, "Enemy turn..."),
            BattleEvent::EnemyHeldPosition { name } => write!(f, "{name} stands its ground."),
            BattleEvent::RoundEnded { turn_count } => {
                write!(f, "Round {turn_count} complete. Your turn!")
            }
            BattleEvent::Victory => write!(f, "Victory! All enemies defeated."),
            BattleEvent::Defeat => write!(f, "Defeat... your squad has been wiped out."),
            BattleEvent::BattleReset => write!(f, "The battle restarts."),
        }
    }
}

/// Per-unit view inside a snapshot
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UnitView {
    pub id: UnitId,
    pub team: Team,
    pub name: String,
    pub hp: i32,
    pub max_hp: i32,
    pub position: Cell,
    pub is_defending: bool,
    pub has_acted_this_turn: bool,
}

/// Full outbound state view, emitted after every state-mutating operation
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Snapshot {
    pub phase: Phase,
    pub is_player_turn: bool,
    pub selected_unit: Option<UnitId>,
    pub units: Vec<UnitView>,
    /// Reachable cells in `Movement`, targetable cells in `Targeting`
    pub highlighted: Vec<Cell>,
    pub special_cooldown: u32,
    pub turn_count: u32,
    pub outcome: Outcome,
}
