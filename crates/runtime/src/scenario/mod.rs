//! Scenario files: which creatures stand where when a skirmish starts.
//!
//! Scenarios are written in RON and turned into an [`Area`] before the
//! engine is built. Stats a placement leaves out fall back to the creature
//! defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};
use skirmish_core::{
    ActionTimer, Area, Controller, Creature, Encounter, EncounterId, EntityId, Faction, Position,
};

use crate::api::{Result, RuntimeError};

/// One creature in the scenario.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreaturePlacement {
    pub id: u32,
    pub name: String,
    pub faction: Faction,
    pub controller: Controller,
    pub position: Position,
    #[serde(default)]
    pub initiative: i32,
    #[serde(default)]
    pub reach: Option<u32>,
    #[serde(default)]
    pub sight: Option<u32>,
    #[serde(default)]
    pub hit_points: Option<i32>,
    #[serde(default)]
    pub action_points: Option<u32>,
    /// Turn function for AI creatures.
    #[serde(default)]
    pub script: Option<String>,
    #[serde(default)]
    pub encounter: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncounterSpec {
    pub id: u32,
    pub experience_per_round: u32,
}

/// Cell that costs more than one action point to enter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerrainCost {
    pub position: Position,
    pub cost: u32,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scenario {
    pub creatures: Vec<CreaturePlacement>,
    #[serde(default)]
    pub encounters: Vec<EncounterSpec>,
    #[serde(default)]
    pub terrain: Vec<TerrainCost>,
}

impl Scenario {
    /// Load scenario from a RON file.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            RuntimeError::InvalidConfig(format!("Failed to read scenario file: {}", e))
        })?;
        Self::from_ron(&content)
    }

    pub fn from_ron(content: &str) -> Result<Self> {
        ron::from_str(content).map_err(|e| {
            RuntimeError::InvalidConfig(format!("Failed to parse scenario RON: {}", e))
        })
    }

    /// Builds the area. Creature ids must be unique and every referenced
    /// encounter must be declared.
    pub fn into_area(self) -> Result<Area> {
        let mut area = Area::new();

        for encounter in &self.encounters {
            area.add_encounter(Encounter::new(
                EncounterId(encounter.id),
                encounter.experience_per_round,
            ));
        }

        for placement in self.creatures {
            let id = EntityId(placement.id);
            if area.creature(id).is_some() {
                return Err(RuntimeError::InvalidConfig(format!(
                    "duplicate creature id {}",
                    placement.id
                )));
            }

            let mut creature = Creature::new(
                id,
                placement.name,
                placement.faction,
                placement.controller,
                placement.position,
            )
            .with_initiative(placement.initiative);

            if let Some(reach) = placement.reach {
                creature = creature.with_reach(reach);
            }
            if let Some(sight) = placement.sight {
                creature = creature.with_sight(sight);
            }
            if let Some(hit_points) = placement.hit_points {
                creature.hit_points = hit_points;
            }
            if let Some(points) = placement.action_points {
                creature = creature.with_timer(ActionTimer::new(points));
            }
            if let Some(script) = placement.script {
                creature = creature.with_script(script);
            }
            if let Some(encounter) = placement.encounter {
                if !self.encounters.iter().any(|e| e.id == encounter) {
                    return Err(RuntimeError::InvalidConfig(format!(
                        "creature {} references unknown encounter {}",
                        placement.id, encounter
                    )));
                }
                creature = creature.with_encounter(EncounterId(encounter));
            }

            area.insert(creature);
        }

        for cell in self.terrain {
            area.set_entry_cost(cell.position, cell.cost);
        }

        tracing::info!(
            creatures = area.creatures().count(),
            encounters = area.encounters().len(),
            "scenario loaded"
        );
        Ok(area)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SKIRMISH: &str = r#"(
        creatures: [
            (id: 1, name: "Aria", faction: Player, controller: Player, position: (x: 0, y: 0),
             initiative: 3),
            (id: 7, name: "Grub", faction: GoblinClan, controller: Ai, position: (x: 4, y: 0),
             script: Some("charge"), encounter: Some(1), action_points: Some(4)),
        ],
        encounters: [(id: 1, experience_per_round: 15)],
        terrain: [(position: (x: 2, y: 0), cost: 2)],
    )"#;

    #[test]
    fn scenario_file_builds_an_area() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SKIRMISH.as_bytes()).unwrap();

        let area = Scenario::load_from_file(file.path()).unwrap().into_area().unwrap();
        let grub = area.creature(EntityId(7)).unwrap();
        assert_eq!(grub.script.as_deref(), Some("charge"));
        assert_eq!(grub.timer.max_action_points, 4);
        assert_eq!(grub.encounter, Some(EncounterId(1)));
        assert_eq!(area.creature(EntityId(1)).unwrap().initiative, 3);
        assert_eq!(area.entry_cost(Position::new(2, 0)), 2);
    }

    #[test]
    fn unknown_encounter_is_rejected() {
        let scenario = Scenario {
            creatures: vec![CreaturePlacement {
                id: 1,
                name: "lost".into(),
                faction: Faction::Hostile,
                controller: Controller::Ai,
                position: Position::ORIGIN,
                initiative: 0,
                reach: None,
                sight: None,
                hit_points: None,
                action_points: None,
                script: None,
                encounter: Some(9),
            }],
            ..Scenario::default()
        };
        assert!(matches!(scenario.into_area(), Err(RuntimeError::InvalidConfig(_))));
    }
}
