//! Scenario used when no file is given.

pub const DEMO_SCENARIO: &str = r#"(
    creatures: [
        (id: 1, name: "Aria", faction: Player, controller: Player, position: (x: 0, y: 0),
         initiative: 4, hit_points: Some(14)),
        (id: 2, name: "Bram", faction: Player, controller: Player, position: (x: 0, y: 2),
         initiative: 1, reach: Some(2), hit_points: Some(12)),
        (id: 10, name: "Goblin skirmisher", faction: GoblinClan, controller: Ai,
         position: (x: 6, y: 1), initiative: 3, script: Some("charge"), encounter: Some(1)),
        (id: 11, name: "Goblin lookout", faction: GoblinClan, controller: Ai,
         position: (x: 7, y: 3), script: Some("charge"), encounter: Some(1),
         action_points: Some(4)),
    ],
    encounters: [(id: 1, experience_per_round: 20)],
    terrain: [(position: (x: 3, y: 1), cost: 2)],
)"#;
