//! Interactive terminal play
//!
//! Renders the battle as an ASCII offset-hex board, parses intents from
//! stdin, and paces the enemy turn by sleeping the engine-reported delays.

use anyhow::Result;
use hexfray_core::{ActionChoice, Battle, Cell, Outcome, Phase, Scenario, Team, Unit, UnitId};
use std::io::{self, BufRead, Write};
use std::thread;
use tracing::debug;

/// A parsed player command
enum Command {
    Select(u32),
    Move(i32, i32),
    Skip,
    Action(ActionChoice),
    Target(u32),
    Reset,
    Board,
    Help,
    Quit,
}

pub fn run(scenario: Scenario, seed: u64, no_delay: bool) -> Result<()> {
    let mut battle = scenario.to_battle(seed)?;
    print_events(&mut battle);
    render(&battle);
    print_help();

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        let words: Vec<&str> = line.split_whitespace().collect();
        if words.is_empty() {
            prompt(&battle)?;
            continue;
        }
        let Some(command) = parse(&words) else {
            println!("  unrecognized command, try 'help'");
            prompt(&battle)?;
            continue;
        };
        debug!(?line, "player command");

        match command {
            Command::Quit => break,
            Command::Help => print_help(),
            Command::Board => render(&battle),
            Command::Reset => {
                battle.reset();
                print_events(&mut battle);
                render(&battle);
            }
            other => {
                let result = match other {
                    Command::Select(n) => battle.select_unit(UnitId(n)),
                    Command::Move(row, col) => battle.move_to(Cell::new(row, col)),
                    Command::Skip => battle.skip_movement(),
                    Command::Action(choice) => battle.choose_action(choice),
                    Command::Target(n) => battle.select_target(UnitId(n)),
                    _ => unreachable!(),
                };
                match result {
                    Ok(()) => {
                        print_events(&mut battle);
                        if battle.ai_busy() {
                            run_enemy_turn(&mut battle, no_delay);
                        }
                        render(&battle);
                    }
                    Err(e) => println!("  {e}"),
                }
            }
        }

        if battle.phase() == Phase::GameOver {
            match battle.outcome() {
                Outcome::PlayerWon => println!("== VICTORY =="),
                Outcome::PlayerLost => println!("== DEFEAT =="),
                Outcome::None => {}
            }
            println!("'reset' to play again, 'quit' to leave");
        }
        prompt(&battle)?;
    }
    Ok(())
}

fn parse(words: &[&str]) -> Option<Command> {
    match words {
        ["quit"] | ["q"] => Some(Command::Quit),
        ["help"] | ["h"] => Some(Command::Help),
        ["board"] | ["b"] => Some(Command::Board),
        ["reset"] => Some(Command::Reset),
        ["select", n] => n.parse().ok().map(Command::Select),
        ["move", row, col] => Some(Command::Move(row.parse().ok()?, col.parse().ok()?)),
        ["skip"] => Some(Command::Skip),
        ["attack"] => Some(Command::Action(ActionChoice::Attack)),
        ["defend"] => Some(Command::Action(ActionChoice::Defend)),
        ["special"] => Some(Command::Action(ActionChoice::Special)),
        ["target", n] => n.parse().ok().map(Command::Target),
        _ => None,
    }
}

/// Drain the scheduled enemy sub-steps, sleeping each suspension delay
fn run_enemy_turn(battle: &mut Battle, no_delay: bool) {
    while let Some(delay) = battle.pending_delay() {
        if !no_delay {
            thread::sleep(delay);
        }
        battle.advance();
        print_events(battle);
    }
}

fn print_events(battle: &mut Battle) {
    for event in battle.drain_events() {
        println!("* {event}");
    }
}

fn prompt(battle: &Battle) -> Result<()> {
    let phase = match battle.phase() {
        Phase::UnitSelection => "select a unit",
        Phase::Movement => "move or skip",
        Phase::Combat => "attack, defend, or special",
        Phase::Targeting => "pick a target",
        Phase::EnemyTurn => "enemy turn",
        Phase::GameOver => "battle over",
    };
    print!("[{phase}] > ");
    io::stdout().flush()?;
    Ok(())
}

fn unit_glyph(unit: &Unit) -> char {
    let id = unit.id.0 as u8;
    match unit.team {
        Team::Player if id < 10 => (b'0' + id) as char,
        Team::Enemy if id < 26 => (b'a' + id) as char,
        _ => '?',
    }
}

fn render(battle: &Battle) {
    let grid = battle.grid();
    let snapshot = battle.snapshot();

    print!("    ");
    for col in 0..grid.cols {
        print!("{col} ");
    }
    println!();
    for row in 0..grid.rows {
        print!("{row:>2} ");
        if row % 2 == 1 {
            print!(" ");
        }
        for col in 0..grid.cols {
            let cell = Cell::new(row, col);
            let glyph = battle
                .units()
                .iter()
                .find(|u| u.is_alive() && u.position == cell)
                .map(unit_glyph)
                .unwrap_or(if snapshot.highlighted.contains(&cell) {
                    '*'
                } else {
                    '.'
                });
            print!("{glyph} ");
        }
        println!();
    }

    for unit in battle.units() {
        let mut flags = String::new();
        if unit.is_defending {
            flags.push('D');
        }
        if unit.has_acted_this_turn {
            flags.push('A');
        }
        if !unit.is_alive() {
            flags.push('X');
        }
        println!(
            "  {} [{}] {:<14} {:>3}/{:<3} hp  ({}, {})  {}",
            unit.id.0,
            unit_glyph(unit),
            unit.name,
            unit.hp,
            unit.max_hp,
            unit.position.row,
            unit.position.col,
            flags
        );
    }
    if battle.special_cooldown() > 0 {
        println!("  special cooldown: {} turns", battle.special_cooldown());
    }
}

fn print_help() {
    println!("commands:");
    println!("  select <id>      pick one of your units by roster id");
    println!("  move <row> <col> / skip");
    println!("  attack | defend | special");
    println!("  target <id>      pick an enemy by roster id");
    println!("  board, reset, help, quit");
}
