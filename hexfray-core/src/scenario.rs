//! Scenario - battlefield and roster definition

use crate::battle::Battle;
use crate::grid::{Cell, Grid};
use crate::unit::{Team, Unit, UnitId};
use anyhow::{bail, Context};
use rustc_hash::FxHashSet;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One unit's starting stats and position
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UnitSpec {
    pub name: String,
    pub team: Team,
    pub hp: i32,
    pub attack: i32,
    pub defense: i32,
    pub move_range: i32,
    pub position: Cell,
}

/// Battle setup: grid dimensions plus both rosters in order
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub rows: i32,
    pub cols: i32,
    pub units: Vec<UnitSpec>,
}

impl Scenario {
    /// The built-in skirmish: the hero squad against the Dark Knight's band
    pub fn default_skirmish() -> Self {
        let unit = |name: &str, team, hp, attack, defense, move_range, row, col| UnitSpec {
            name: name.to_string(),
            team,
            hp,
            attack,
            defense,
            move_range,
            position: Cell::new(row, col),
        };
        Self {
            name: "Skirmish at the Ruins".to_string(),
            rows: 7,
            cols: 9,
            units: vec![
                unit("Hero", Team::Player, 100, 20, 5, 3, 6, 3),
                unit("Knight", Team::Player, 120, 18, 8, 2, 6, 5),
                unit("Archer", Team::Player, 80, 16, 4, 3, 6, 1),
                unit("Dark Knight", Team::Enemy, 100, 18, 4, 3, 0, 4),
                unit("Shadow Blade", Team::Enemy, 80, 20, 3, 4, 0, 2),
                unit("Cultist", Team::Enemy, 70, 15, 3, 3, 0, 6),
            ],
        }
    }

    pub fn grid(&self) -> Grid {
        Grid::new(self.rows, self.cols)
    }

    /// Check the setup is playable: positive stats, in-bounds and
    /// non-overlapping starts, at least one unit per side
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.rows <= 0 || self.cols <= 0 {
            bail!("grid must have positive dimensions");
        }
        let grid = self.grid();
        let mut seen = FxHashSet::default();
        for spec in &self.units {
            if spec.hp <= 0 {
                bail!("unit '{}' must start with positive hp", spec.name);
            }
            if spec.attack < 0 || spec.defense < 0 || spec.move_range < 0 {
                bail!("unit '{}' has negative stats", spec.name);
            }
            if !grid.in_bounds(spec.position) {
                bail!("unit '{}' starts off the battlefield", spec.name);
            }
            if !seen.insert(spec.position) {
                bail!("two units start on the same cell");
            }
        }
        for team in [Team::Player, Team::Enemy] {
            if !self.units.iter().any(|u| u.team == team) {
                bail!("scenario needs at least one unit on each side");
            }
        }
        Ok(())
    }

    /// Validate and start a battle with a seeded rng
    pub fn to_battle(&self, seed: u64) -> anyhow::Result<Battle> {
        self.validate()?;
        Ok(Battle::from_scenario(self.clone(), seed))
    }

    /// Load a scenario from a JSON file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading scenario {}", path.display()))?;
        let scenario: Scenario =
            serde_json::from_str(&content).with_context(|| "parsing scenario JSON")?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Build the roster; unit ids are indices into the spec list
    pub(crate) fn build_units(&self) -> Vec<Unit> {
        self.units
            .iter()
            .enumerate()
            .map(|(i, spec)| {
                Unit::new(
                    UnitId(i as u32),
                    spec.team,
                    spec.name.clone(),
                    spec.hp,
                    spec.attack,
                    spec.defense,
                    spec.move_range,
                    spec.position,
                )
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_skirmish_is_valid() {
        let scenario = Scenario::default_skirmish();
        scenario.validate().unwrap();
        let battle = scenario.to_battle(1).unwrap();
        assert_eq!(battle.living(Team::Player).count(), 3);
        assert_eq!(battle.living(Team::Enemy).count(), 3);
    }

    #[test]
    fn test_rejects_overlapping_starts() {
        let mut scenario = Scenario::default_skirmish();
        scenario.units[1].position = scenario.units[0].position;
        assert!(scenario.validate().is_err());
    }

    #[test]
    fn test_rejects_out_of_bounds_start() {
        let mut scenario = Scenario::default_skirmish();
        scenario.units[0].position = Cell::new(99, 0);
        assert!(scenario.validate().is_err());
    }

    #[test]
    fn test_rejects_one_sided_roster() {
        let mut scenario = Scenario::default_skirmish();
        scenario.units.retain(|u| u.team == Team::Player);
        assert!(scenario.validate().is_err());
    }

    #[test]
    fn test_json_round_trip() {
        let scenario = Scenario::default_skirmish();
        let json = serde_json::to_string(&scenario).unwrap();
        let back: Scenario = serde_json::from_str(&json).unwrap();
        assert_eq!(back.name, scenario.name);
        assert_eq!(back.units.len(), scenario.units.len());
    }
}
