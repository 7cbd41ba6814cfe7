//! End-to-end battle flow tests driven through the public intent API

use hexfray_core::{
    ActionChoice, Battle, BattleEvent, Cell, IntentError, Outcome, Phase, Scenario, Team, UnitId,
    UnitSpec,
};

fn spec(
    name: &str,
    team: Team,
    hp: i32,
    attack: i32,
    defense: i32,
    move_range: i32,
    row: i32,
    col: i32,
) -> UnitSpec {
    UnitSpec {
        name: name.to_string(),
        team,
        hp,
        attack,
        defense,
        move_range,
        position: Cell::new(row, col),
    }
}

fn battle_with(units: Vec<UnitSpec>, seed: u64) -> Battle {
    Scenario {
        name: "flow-test".to_string(),
        rows: 7,
        cols: 9,
        units,
    }
    .to_battle(seed)
    .expect("valid scenario")
}

/// Act with every available player unit: skip movement, attack a target in
/// range if one exists, otherwise defend. Then drain the enemy turn.
fn play_one_round(battle: &mut Battle) {
    while battle.phase() == Phase::UnitSelection {
        let Some(id) = battle
            .living(Team::Player)
            .find(|u| !u.has_acted_this_turn)
            .map(|u| u.id)
        else {
            break;
        };
        battle.select_unit(id).unwrap();
        battle.skip_movement().unwrap();

        let pos = battle.unit(id).unwrap().position;
        let target = battle
            .living(Team::Enemy)
            .find(|e| pos.distance_to(e.position) <= 2)
            .map(|e| e.id);
        match target {
            Some(target) => {
                battle.choose_action(ActionChoice::Attack).unwrap();
                battle.select_target(target).unwrap();
            }
            None => battle.choose_action(ActionChoice::Defend).unwrap(),
        }
    }
    while battle.advance() {}
}

#[test]
fn victory_ends_the_battle_immediately() {
    let mut battle = battle_with(
        vec![
            spec("Hero", Team::Player, 100, 300, 5, 3, 3, 3),
            spec("Last Cultist", Team::Enemy, 50, 15, 4, 3, 3, 4),
        ],
        3,
    );

    battle.select_unit(UnitId(0)).unwrap();
    battle.skip_movement().unwrap();
    battle.choose_action(ActionChoice::Attack).unwrap();
    battle.select_target(UnitId(1)).unwrap();

    assert_eq!(battle.outcome(), Outcome::PlayerWon);
    assert_eq!(battle.phase(), Phase::GameOver);
    assert!(!battle.advance(), "no enemy turn after victory");

    let events = battle.drain_events();
    assert!(events.iter().any(|e| matches!(e, BattleEvent::Victory)));
    assert!(events
        .iter()
        .any(|e| matches!(e, BattleEvent::UnitFell { .. })));
}

#[test]
fn enemy_turn_eventually_defeats_a_doomed_player() {
    // One fragile player unit pinned against a healthy enemy: the AI attacks
    // with probability 0.8 each round, so defeat arrives within a few rounds.
    let mut battle = battle_with(
        vec![
            spec("Squire", Team::Player, 1, 1, 0, 0, 3, 3),
            spec("Dark Knight", Team::Enemy, 1000, 18, 4, 3, 3, 4),
        ],
        7,
    );

    for _ in 0..100 {
        if battle.outcome() != Outcome::None {
            break;
        }
        battle.select_unit(UnitId(0)).unwrap();
        battle.skip_movement().unwrap();
        battle.choose_action(ActionChoice::Defend).unwrap();
        while battle.advance() {}
    }

    assert_eq!(battle.outcome(), Outcome::PlayerLost);
    assert_eq!(battle.phase(), Phase::GameOver);
    assert_eq!(battle.select_unit(UnitId(0)), Err(IntentError::GameOver));
    let events = battle.drain_events();
    assert_eq!(
        events
            .iter()
            .filter(|e| matches!(e, BattleEvent::Defeat))
            .count(),
        1
    );
}

#[test]
fn default_skirmish_rounds_preserve_invariants() {
    let mut battle = Scenario::default_skirmish().to_battle(42).unwrap();

    for round in 1..=5u32 {
        if battle.outcome() != Outcome::None {
            break;
        }
        play_one_round(&mut battle);

        for unit in battle.units() {
            assert!(unit.hp >= 0 && unit.hp <= unit.max_hp);
        }
        if battle.outcome() == Outcome::None {
            assert_eq!(battle.phase(), Phase::UnitSelection);
            assert_eq!(battle.turn_count(), round);
            assert!(battle.snapshot().is_player_turn);
        }
    }
}

#[test]
fn snapshots_track_the_enemy_turn() {
    let mut battle = Scenario::default_skirmish().to_battle(11).unwrap();

    for unit_id in battle
        .living(Team::Player)
        .map(|u| u.id)
        .collect::<Vec<_>>()
    {
        battle.select_unit(unit_id).unwrap();
        battle.skip_movement().unwrap();
        battle.choose_action(ActionChoice::Defend).unwrap();
    }

    let snap = battle.snapshot();
    assert_eq!(snap.phase, Phase::EnemyTurn);
    assert!(!snap.is_player_turn);

    // Sub-steps resolve strictly in order, with a bounded delay before each
    let mut steps = 0;
    while let Some(delay) = battle.pending_delay() {
        assert!(delay > std::time::Duration::ZERO);
        assert!(battle.advance());
        steps += 1;
        assert!(steps < 100, "enemy turn must terminate");
    }
    assert!(battle.phase() == Phase::UnitSelection || battle.phase() == Phase::GameOver);
}
