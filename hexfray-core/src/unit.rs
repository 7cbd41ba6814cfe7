//! Combat units and damage resolution

use crate::grid::Cell;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Maximum hex distance at which any attack is legal
pub const MAX_ATTACK_RANGE: i32 = 2;

/// Stable unit identity (index into the battle roster)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnitId(pub u32);

/// Owning side
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Team {
    Player,
    Enemy,
}

impl Team {
    pub fn opponent(self) -> Self {
        match self {
            Team::Player => Team::Enemy,
            Team::Enemy => Team::Player,
        }
    }
}

/// A combat unit on the battlefield
///
/// Death is derived state: a unit with `hp == 0` is never removed, it is just
/// excluded from selection, targeting, and occupancy queries.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Unit {
    pub id: UnitId,
    pub team: Team,
    pub name: String,
    pub max_hp: i32,
    pub hp: i32,
    pub attack: i32,
    pub defense: i32,
    pub move_range: i32,
    pub position: Cell,
    pub is_defending: bool,
    pub has_acted_this_turn: bool,
    pub moved_this_turn: bool,
}

impl Unit {
    pub fn new(
        id: UnitId,
        team: Team,
        name: impl Into<String>,
        hp: i32,
        attack: i32,
        defense: i32,
        move_range: i32,
        position: Cell,
    ) -> Self {
        Self {
            id,
            team,
            name: name.into(),
            max_hp: hp,
            hp,
            attack,
            defense,
            move_range,
            position,
            is_defending: false,
            has_acted_this_turn: false,
            moved_this_turn: false,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.hp > 0
    }

    pub fn hp_percent(&self) -> f64 {
        self.hp as f64 / self.max_hp as f64 * 100.0
    }

    /// Brace for the next incoming hit; cleared when that hit lands
    pub fn defend(&mut self) {
        self.is_defending = true;
    }

    /// Clear per-turn flags at the start of the owning side's turn
    pub fn reset_turn_flags(&mut self) {
        self.has_acted_this_turn = false;
        self.moved_this_turn = false;
    }
}

/// Whether any attack is legal at this hex distance
pub fn can_attack_at_distance(distance: i32) -> bool {
    distance >= 1 && distance <= MAX_ATTACK_RANGE
}

/// Damage multiplier by hex distance; `None` means the attack is illegal and
/// must be rejected before any roll is made.
pub fn distance_penalty(distance: i32) -> Option<f64> {
    match distance {
        1 => Some(1.0),
        2 => Some(0.4),
        _ => None,
    }
}

/// Resolve an attack with the variance term already drawn.
///
/// Pipeline: base roll, stationary bonus (+25% if the attacker held position),
/// distance penalty, defense mitigation floored at 1, defend-stance halving.
/// The defender's stance is consumed unconditionally. Returns the damage dealt.
///
/// The caller must have gated the distance via [`can_attack_at_distance`];
/// out-of-range distances panic only in debug builds, production callers never
/// reach this with an illegal distance.
pub fn resolve_attack_with_variance(
    attacker: &Unit,
    defender: &mut Unit,
    distance: i32,
    is_special: bool,
    variance: i32,
) -> i32 {
    debug_assert!(can_attack_at_distance(distance));
    let penalty = distance_penalty(distance).unwrap_or(0.0);

    let base = if is_special {
        (attacker.attack as f64 * 1.5).floor() as i32 + variance
    } else {
        attacker.attack + variance
    };

    let mut rolled = base as f64;
    if !attacker.moved_this_turn {
        rolled = (rolled * 1.25).floor();
    }
    let raw = (rolled * penalty).floor() as i32;

    let mut mitigated = (raw - defender.defense).max(1);
    if defender.is_defending {
        mitigated = (mitigated as f64 * 0.5).floor() as i32;
    }

    defender.hp = (defender.hp - mitigated).max(0);
    defender.is_defending = false;
    mitigated
}

/// Resolve an attack, drawing a fresh variance roll.
///
/// Normal attacks roll `[0,5] - 2`; specials roll `[0,7] - 2` on a 1.5x base.
pub fn resolve_attack<R: Rng>(
    attacker: &Unit,
    defender: &mut Unit,
    distance: i32,
    is_special: bool,
    rng: &mut R,
) -> i32 {
    let variance = if is_special {
        rng.gen_range(0..=7) - 2
    } else {
        rng.gen_range(0..=5) - 2
    };
    resolve_attack_with_variance(attacker, defender, distance, is_special, variance)
}
