//! Headless auto-played battles
//!
//! Plays the player side with a simple policy (close on the nearest enemy,
//! special or attack anything in range, defend otherwise) and drains the AI
//! turn without delays, tallying outcomes across seeded battles.

use anyhow::Result;
use hexfray_core::{
    ActionChoice, Battle, Outcome, Phase, Scenario, Team, UnitId, MAX_ATTACK_RANGE,
};
use tracing::info;

pub fn run(scenario: &Scenario, battles: u32, seed: u64, max_rounds: u32) -> Result<()> {
    let mut wins = 0u32;
    let mut losses = 0u32;
    let mut stalled = 0u32;

    for i in 0..battles {
        let battle_seed = seed.wrapping_add(i as u64);
        let outcome = play_battle(scenario, battle_seed, max_rounds)?;
        match outcome {
            Outcome::PlayerWon => wins += 1,
            Outcome::PlayerLost => losses += 1,
            Outcome::None => stalled += 1,
        }
        info!(battle = i, seed = battle_seed, ?outcome, "battle finished");
    }

    println!("{battles} battles: {wins} won, {losses} lost, {stalled} stalled");
    println!(
        "player win rate: {:.1}%",
        wins as f64 / battles.max(1) as f64 * 100.0
    );
    Ok(())
}

fn play_battle(scenario: &Scenario, seed: u64, max_rounds: u32) -> Result<Outcome> {
    let mut battle = scenario.to_battle(seed)?;
    let mut rounds = 0;

    while battle.outcome() == Outcome::None && rounds < max_rounds {
        while battle.phase() == Phase::UnitSelection {
            let Some(id) = battle
                .living(Team::Player)
                .find(|u| !u.has_acted_this_turn)
                .map(|u| u.id)
            else {
                break;
            };
            act_unit(&mut battle, id)?;
        }
        while battle.advance() {}
        battle.drain_events();
        rounds += 1;
    }
    Ok(battle.outcome())
}

/// Drive one player unit through a full move-and-act sequence
fn act_unit(battle: &mut Battle, id: UnitId) -> Result<()> {
    battle.select_unit(id)?;

    let pos = battle.unit(id).expect("selected unit exists").position;
    let nearest = battle
        .living(Team::Enemy)
        .map(|e| (e.position, pos.distance_to(e.position)))
        .min_by_key(|&(_, d)| d);

    match nearest {
        Some((enemy_pos, dist)) if dist > 1 => {
            // Step toward the nearest enemy if it actually closes the gap
            let best = battle
                .reachable()
                .iter()
                .map(|&(c, _)| c)
                .min_by_key(|c| c.distance_to(enemy_pos));
            match best {
                Some(cell) if cell.distance_to(enemy_pos) < dist => battle.move_to(cell)?,
                _ => battle.skip_movement()?,
            }
        }
        _ => battle.skip_movement()?,
    }

    let pos = battle.unit(id).expect("selected unit exists").position;
    let target = battle
        .living(Team::Enemy)
        .find(|e| pos.distance_to(e.position) <= MAX_ATTACK_RANGE)
        .map(|e| e.id);
    match target {
        Some(target) => {
            let action = if battle.special_cooldown() == 0 {
                ActionChoice::Special
            } else {
                ActionChoice::Attack
            };
            battle.choose_action(action)?;
            battle.select_target(target)?;
        }
        None => battle.choose_action(ActionChoice::Defend)?,
    }
    Ok(())
}
