//! Battle state machine
//!
//! Validates player intents against the current phase, mutates unit and grid
//! state, and sequences the enemy turn as a FIFO queue of scheduled sub-steps.
//! The embedder drives the queue: `pending_delay` reports how long to wait,
//! `advance` executes the next sub-step. While the queue is non-empty all
//! player intents are rejected.

use crate::ai;
use crate::event::{BattleEvent, Outcome, Snapshot, UnitView};
use crate::grid::{Cell, Grid};
use crate::scenario::Scenario;
use crate::unit::{self, Team, Unit, UnitId, MAX_ATTACK_RANGE};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;
use thiserror::Error;

// ============================================================================
// CONSTANTS
// ============================================================================

/// Suspension before the first enemy sub-step after the player turn ends
pub const ENEMY_TURN_DELAY: Duration = Duration::from_millis(900);

/// Suspension between consecutive enemy sub-steps
pub const AI_STEP_DELAY: Duration = Duration::from_millis(450);

/// Turns the shared player-side special cooldown runs after use
const SPECIAL_COOLDOWN_TURNS: u32 = 3;

// ============================================================================
// CORE TYPES
// ============================================================================

/// Discrete phase of the battle
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    UnitSelection,
    Movement,
    Combat,
    Targeting,
    EnemyTurn,
    GameOver,
}

/// Player action choice in the Combat phase
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionChoice {
    Attack,
    Defend,
    Special,
}

/// Attack action awaiting a target
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum PendingAction {
    Attack,
    Special,
}

/// Rejected player intent. Recoverable: no turn resource is consumed.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum IntentError {
    #[error("the battle is over")]
    GameOver,
    #[error("the enemy turn is still resolving")]
    EnemyTurnInProgress,
    #[error("that action is not available right now")]
    WrongPhase,
    #[error("no such unit")]
    UnknownUnit,
    #[error("that unit is not yours to command")]
    NotYourUnit,
    #[error("that unit is down")]
    UnitDown,
    #[error("that unit has already acted this turn")]
    AlreadyActed,
    #[error("that cell is out of reach")]
    OutOfReach,
    #[error("that unit is not a valid target")]
    InvalidTarget,
    #[error("target is out of attack range")]
    TargetOutOfRange,
    #[error("special attack is on cooldown for {0} more turns")]
    SpecialOnCooldown(u32),
}

/// One enemy-turn sub-step
#[derive(Clone, Copy, Debug)]
enum AiStep {
    Move(UnitId),
    Act(UnitId),
    EndTurn,
}

/// A sub-step scheduled behind a fixed suspension delay. Steps capture the
/// epoch they were scheduled under; a step from a superseded battle is a no-op.
#[derive(Clone, Copy, Debug)]
struct Scheduled {
    step: AiStep,
    epoch: u64,
    delay: Duration,
}

// ============================================================================
// BATTLE STATE
// ============================================================================

/// Full battle state: rosters, phase, selection, enemy-turn queue
pub struct Battle {
    pub(crate) grid: Grid,
    pub(crate) units: Vec<Unit>,
    pub(crate) phase: Phase,
    pub(crate) selected: Option<UnitId>,
    pending_action: Option<PendingAction>,
    /// Reachable cells computed on entering Movement
    pub(crate) reachable: Vec<(Cell, i32)>,
    /// Valid targets computed on entering Targeting
    pub(crate) targets: Vec<UnitId>,
    pub(crate) special_cooldown: u32,
    pub(crate) turn_count: u32,
    pub(crate) outcome: Outcome,
    epoch: u64,
    queue: VecDeque<Scheduled>,
    pub(crate) rng: ChaCha8Rng,
    events: Vec<BattleEvent>,
    scenario: Scenario,
}

impl Battle {
    // ========================================================================
    // CONSTRUCTION
    // ========================================================================

    /// Build from a validated scenario. Public entry is `Scenario::to_battle`.
    pub(crate) fn from_scenario(scenario: Scenario, seed: u64) -> Self {
        let mut battle = Self {
            grid: scenario.grid(),
            units: scenario.build_units(),
            phase: Phase::UnitSelection,
            selected: None,
            pending_action: None,
            reachable: Vec::new(),
            targets: Vec::new(),
            special_cooldown: 0,
            turn_count: 0,
            outcome: Outcome::None,
            epoch: 0,
            queue: VecDeque::new(),
            rng: ChaCha8Rng::seed_from_u64(seed),
            events: Vec::new(),
            scenario,
        };
        battle.push_event(BattleEvent::BattleStarted);
        battle
    }

    // ========================================================================
    // ACCESSORS
    // ========================================================================

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    pub fn is_player_turn(&self) -> bool {
        matches!(
            self.phase,
            Phase::UnitSelection | Phase::Movement | Phase::Combat | Phase::Targeting
        )
    }

    pub fn grid(&self) -> Grid {
        self.grid
    }

    pub fn units(&self) -> &[Unit] {
        &self.units
    }

    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.units.get(id.0 as usize)
    }

    pub fn selected(&self) -> Option<UnitId> {
        self.selected
    }

    pub fn special_cooldown(&self) -> u32 {
        self.special_cooldown
    }

    pub fn turn_count(&self) -> u32 {
        self.turn_count
    }

    /// Reachable cells for the selected unit (valid during Movement)
    pub fn reachable(&self) -> &[(Cell, i32)] {
        &self.reachable
    }

    /// Valid target ids for the pending action (valid during Targeting)
    pub fn targets(&self) -> &[UnitId] {
        &self.targets
    }

    /// Living units of one side, roster order
    pub fn living(&self, team: Team) -> impl Iterator<Item = &Unit> + '_ {
        self.units
            .iter()
            .filter(move |u| u.team == team && u.is_alive())
    }

    /// True while enemy sub-steps are still queued
    pub fn ai_busy(&self) -> bool {
        !self.queue.is_empty()
    }

    pub(crate) fn unit_ref(&self, id: UnitId) -> &Unit {
        &self.units[id.0 as usize]
    }

    pub(crate) fn unit_mut(&mut self, id: UnitId) -> &mut Unit {
        &mut self.units[id.0 as usize]
    }

    /// Cells occupied by living units, minus the given unit's own cell
    pub(crate) fn occupied_except(&self, except: UnitId) -> FxHashSet<Cell> {
        self.units
            .iter()
            .filter(|u| u.is_alive() && u.id != except)
            .map(|u| u.position)
            .collect()
    }

    /// Movement range for this turn: halved (floor) while engaged, i.e.
    /// adjacent to any living opposing unit
    pub(crate) fn effective_range(&self, id: UnitId) -> i32 {
        let unit = self.unit_ref(id);
        let engaged = self
            .living(unit.team.opponent())
            .any(|e| unit.position.distance_to(e.position) == 1);
        if engaged {
            unit.move_range / 2
        } else {
            unit.move_range
        }
    }

    // ========================================================================
    // OUTBOUND VIEW
    // ========================================================================

    /// Full state view for the presentation layer
    pub fn snapshot(&self) -> Snapshot {
        let highlighted = match self.phase {
            Phase::Movement => self.reachable.iter().map(|&(c, _)| c).collect(),
            Phase::Targeting => self
                .targets
                .iter()
                .map(|&id| self.unit_ref(id).position)
                .collect(),
            _ => Vec::new(),
        };
        Snapshot {
            phase: self.phase,
            is_player_turn: self.is_player_turn(),
            selected_unit: self.selected,
            units: self
                .units
                .iter()
                .map(|u| UnitView {
                    id: u.id,
                    team: u.team,
                    name: u.name.clone(),
                    hp: u.hp,
                    max_hp: u.max_hp,
                    position: u.position,
                    is_defending: u.is_defending,
                    has_acted_this_turn: u.has_acted_this_turn,
                })
                .collect(),
            highlighted,
            special_cooldown: self.special_cooldown,
            turn_count: self.turn_count,
            outcome: self.outcome,
        }
    }

    /// Take all events logged since the last drain
    pub fn drain_events(&mut self) -> Vec<BattleEvent> {
        std::mem::take(&mut self.events)
    }

    pub(crate) fn push_event(&mut self, event: BattleEvent) {
        self.events.push(event);
    }

    // ========================================================================
    // PLAYER INTENTS
    // ========================================================================

    fn guard_input(&self) -> Result<(), IntentError> {
        if self.phase == Phase::GameOver {
            return Err(IntentError::GameOver);
        }
        if self.phase == Phase::EnemyTurn || !self.queue.is_empty() {
            return Err(IntentError::EnemyTurnInProgress);
        }
        Ok(())
    }

    /// UnitSelection -> Movement: pick a living, unacted player unit and
    /// compute its reachable cells
    pub fn select_unit(&mut self, id: UnitId) -> Result<(), IntentError> {
        self.guard_input()?;
        if self.phase != Phase::UnitSelection {
            return Err(IntentError::WrongPhase);
        }
        let unit = self.unit(id).ok_or(IntentError::UnknownUnit)?;
        if unit.team != Team::Player {
            return Err(IntentError::NotYourUnit);
        }
        if !unit.is_alive() {
            return Err(IntentError::UnitDown);
        }
        if unit.has_acted_this_turn {
            return Err(IntentError::AlreadyActed);
        }
        let name = unit.name.clone();
        let position = unit.position;

        let range = self.effective_range(id);
        let blocked = self.occupied_except(id);
        self.reachable = self.grid.reachable_cells(position, range, &blocked);
        self.selected = Some(id);
        self.phase = Phase::Movement;
        self.push_event(BattleEvent::UnitSelected { name });
        Ok(())
    }

    /// Movement -> Combat: move the selected unit to one of its reachable cells
    pub fn move_to(&mut self, cell: Cell) -> Result<(), IntentError> {
        self.guard_input()?;
        if self.phase != Phase::Movement {
            return Err(IntentError::WrongPhase);
        }
        let Some(id) = self.selected else {
            return Err(IntentError::WrongPhase);
        };
        if !self.reachable.iter().any(|&(c, _)| c == cell) {
            return Err(IntentError::OutOfReach);
        }
        let unit = self.unit_mut(id);
        unit.position = cell;
        unit.moved_this_turn = true;
        let name = unit.name.clone();
        self.reachable.clear();
        self.phase = Phase::Combat;
        self.push_event(BattleEvent::UnitMoved { name, to: cell });
        Ok(())
    }

    /// Movement -> Combat without moving; keeps the stationary bonus
    pub fn skip_movement(&mut self) -> Result<(), IntentError> {
        self.guard_input()?;
        if self.phase != Phase::Movement {
            return Err(IntentError::WrongPhase);
        }
        let Some(id) = self.selected else {
            return Err(IntentError::WrongPhase);
        };
        let name = self.unit_ref(id).name.clone();
        self.reachable.clear();
        self.phase = Phase::Combat;
        self.push_event(BattleEvent::MovementSkipped { name });
        Ok(())
    }

    /// Combat: Defend finishes the unit's turn immediately; Attack/Special
    /// move to Targeting with the valid target set exposed
    pub fn choose_action(&mut self, choice: ActionChoice) -> Result<(), IntentError> {
        self.guard_input()?;
        if self.phase != Phase::Combat {
            return Err(IntentError::WrongPhase);
        }
        let Some(id) = self.selected else {
            return Err(IntentError::WrongPhase);
        };
        match choice {
            ActionChoice::Defend => {
                let unit = self.unit_mut(id);
                unit.defend();
                let name = unit.name.clone();
                self.push_event(BattleEvent::Defended { name });
                self.finish_unit_turn(id);
            }
            ActionChoice::Attack | ActionChoice::Special => {
                self.pending_action = Some(match choice {
                    ActionChoice::Attack => PendingAction::Attack,
                    _ => PendingAction::Special,
                });
                let pos = self.unit_ref(id).position;
                self.targets = self
                    .living(Team::Enemy)
                    .filter(|e| pos.distance_to(e.position) <= MAX_ATTACK_RANGE)
                    .map(|e| e.id)
                    .collect();
                self.phase = Phase::Targeting;
            }
        }
        Ok(())
    }

    /// Targeting: resolve the pending action against a target. Out-of-range
    /// targets and specials on cooldown are rejected back to Combat with no
    /// turn consumed and no resource spent.
    pub fn select_target(&mut self, target_id: UnitId) -> Result<(), IntentError> {
        self.guard_input()?;
        if self.phase != Phase::Targeting {
            return Err(IntentError::WrongPhase);
        }
        let Some(attacker_id) = self.selected else {
            return Err(IntentError::WrongPhase);
        };
        let Some(pending) = self.pending_action else {
            return Err(IntentError::WrongPhase);
        };

        let target = self.unit(target_id).ok_or(IntentError::UnknownUnit)?;
        let target_valid = target.team == Team::Enemy && target.is_alive();
        let target_pos = target.position;
        if !target_valid {
            self.return_to_combat();
            return Err(IntentError::InvalidTarget);
        }

        let dist = self.unit_ref(attacker_id).position.distance_to(target_pos);
        if !unit::can_attack_at_distance(dist) {
            self.return_to_combat();
            return Err(IntentError::TargetOutOfRange);
        }

        let is_special = pending == PendingAction::Special;
        if is_special && self.special_cooldown > 0 {
            let left = self.special_cooldown;
            self.return_to_combat();
            return Err(IntentError::SpecialOnCooldown(left));
        }

        let variance = if is_special {
            self.rng.gen_range(0..=7) - 2
        } else {
            self.rng.gen_range(0..=5) - 2
        };
        let (attacker, defender) =
            pair_mut(&mut self.units, attacker_id.0 as usize, target_id.0 as usize);
        let damage = unit::resolve_attack_with_variance(attacker, defender, dist, is_special, variance);
        let attacker_name = attacker.name.clone();
        let target_name = defender.name.clone();
        let target_team = defender.team;
        let target_fell = !defender.is_alive();

        self.push_event(BattleEvent::AttackLanded {
            attacker: attacker_name,
            target: target_name.clone(),
            damage,
            special: is_special,
        });
        if target_fell {
            self.push_event(BattleEvent::UnitFell {
                name: target_name,
                team: target_team,
            });
        }
        if is_special {
            self.special_cooldown = SPECIAL_COOLDOWN_TURNS;
        }
        self.finish_unit_turn(attacker_id);
        Ok(())
    }

    /// Rebuild the battle from its scenario. Allowed in any phase; bumps the
    /// epoch so any outstanding scheduled enemy step becomes a no-op.
    pub fn reset(&mut self) {
        self.epoch += 1;
        self.queue.clear();
        self.units = self.scenario.build_units();
        self.grid = self.scenario.grid();
        self.phase = Phase::UnitSelection;
        self.selected = None;
        self.pending_action = None;
        self.reachable.clear();
        self.targets.clear();
        self.special_cooldown = 0;
        self.turn_count = 0;
        self.outcome = Outcome::None;
        self.events.clear();
        self.push_event(BattleEvent::BattleReset);
        self.push_event(BattleEvent::BattleStarted);
    }

    // ========================================================================
    // TURN BOOKKEEPING
    // ========================================================================

    fn return_to_combat(&mut self) {
        self.pending_action = None;
        self.targets.clear();
        self.phase = Phase::Combat;
    }

    /// Mark the acting unit done, then decide what comes next: victory, the
    /// enemy turn, or back to unit selection.
    fn finish_unit_turn(&mut self, id: UnitId) {
        self.unit_mut(id).has_acted_this_turn = true;
        self.selected = None;
        self.pending_action = None;
        self.reachable.clear();
        self.targets.clear();

        if self.living(Team::Enemy).next().is_none() {
            self.end_battle(Outcome::PlayerWon);
            return;
        }
        if self.living(Team::Player).all(|u| u.has_acted_this_turn) {
            self.begin_enemy_turn();
        } else {
            self.phase = Phase::UnitSelection;
        }
    }

    pub(crate) fn end_battle(&mut self, outcome: Outcome) {
        self.outcome = outcome;
        self.phase = Phase::GameOver;
        self.queue.clear();
        match outcome {
            Outcome::PlayerWon => self.push_event(BattleEvent::Victory),
            Outcome::PlayerLost => self.push_event(BattleEvent::Defeat),
            Outcome::None => {}
        }
    }

    // ========================================================================
    // ENEMY TURN SCHEDULING
    // ========================================================================

    /// Snapshot the living enemy roster and queue two sub-steps per unit,
    /// strictly FIFO: unit 1 moves and acts before unit 2 begins.
    fn begin_enemy_turn(&mut self) {
        self.phase = Phase::EnemyTurn;
        for u in self.units.iter_mut().filter(|u| u.team == Team::Enemy) {
            u.reset_turn_flags();
        }
        self.push_event(BattleEvent::EnemyTurnStarted);

        let roster: Vec<UnitId> = self.living(Team::Enemy).map(|u| u.id).collect();
        let epoch = self.epoch;
        let mut delay = ENEMY_TURN_DELAY;
        for id in roster {
            self.queue.push_back(Scheduled {
                step: AiStep::Move(id),
                epoch,
                delay,
            });
            delay = AI_STEP_DELAY;
            self.queue.push_back(Scheduled {
                step: AiStep::Act(id),
                epoch,
                delay,
            });
        }
        self.queue.push_back(Scheduled {
            step: AiStep::EndTurn,
            epoch,
            delay,
        });
    }

    /// Delay the embedder should wait before the next `advance` call
    pub fn pending_delay(&self) -> Option<Duration> {
        self.queue.front().map(|s| s.delay)
    }

    /// Execute the next scheduled enemy sub-step. Returns false when nothing
    /// ran (empty queue, or only stale steps from a superseded epoch).
    pub fn advance(&mut self) -> bool {
        while let Some(sched) = self.queue.pop_front() {
            if sched.epoch != self.epoch {
                continue;
            }
            match sched.step {
                AiStep::Move(id) => ai::movement_step(self, id),
                AiStep::Act(id) => ai::combat_step(self, id),
                AiStep::EndTurn => self.end_enemy_turn(),
            }
            return true;
        }
        false
    }

    /// Close out the enemy turn: reset player flags, tick the special
    /// cooldown down, hand control back to the player.
    fn end_enemy_turn(&mut self) {
        if self.living(Team::Player).next().is_none() {
            // Normally caught in the combat sub-step
            self.end_battle(Outcome::PlayerLost);
            return;
        }
        for u in self.units.iter_mut().filter(|u| u.team == Team::Player) {
            u.reset_turn_flags();
        }
        if self.special_cooldown > 0 {
            self.special_cooldown -= 1;
        }
        self.turn_count += 1;
        self.phase = Phase::UnitSelection;
        self.push_event(BattleEvent::RoundEnded {
            turn_count: self.turn_count,
        });
    }
}

/// Disjoint mutable access to an attacker/defender pair in the roster
pub(crate) fn pair_mut(units: &mut [Unit], a: usize, b: usize) -> (&mut Unit, &mut Unit) {
    assert!(a != b);
    if a < b {
        let (left, right) = units.split_at_mut(b);
        (&mut left[a], &mut right[0])
    } else {
        let (left, right) = units.split_at_mut(a);
        (&mut right[0], &mut left[b])
    }
}

// ============================================================================
// TESTS
// ============================================================================
