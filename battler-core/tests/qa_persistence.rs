//! QA tests for battle-file persistence: the JSON wire format must keep
//! the exact field names the battle files already use on disk.

use battler_core::combatant::{ActionKind, Combatant};
use battler_core::{persist, Spell};
use tempfile::TempDir;

const GOBLIN_JSON: &str = r#"{
  "statblock": {
    "file_name": "goblin.json",
    "name": "goblin",
    "type": "humanoid",
    "hp": { "current": 7, "max": 7 },
    "ac": 15,
    "speed": 30,
    "abilities": { "str": -1, "dex": 2, "con": 0, "int": 0, "wis": -1, "cha": -1 },
    "saves": { "dex": 4 },
    "skills": { "stealth": 6 },
    "vulnerabilities": ["radiant"],
    "resistances": ["poison"],
    "immunities": [],
    "condition_immunities": ["charmed"],
    "senses": { "darkvision": 60 },
    "languages": { "Speaks": ["common", "goblin"], "Understands": ["common"] },
    "traits": { "nimble_escape": "Can Disengage or Hide as a bonus action." },
    "actions": {
      "scimitar": {
        "attack_roll": { "present": true, "modifier": 4 },
        "saving_throw": { "present": false, "ability": "", "dc": 0 },
        "effects": { "slash": { "roll": "1d6+2", "type": "slashing" } },
        "description": "Melee weapon attack."
      }
    },
    "bonus_actions": {},
    "reactions": {}
  }
}"#;

const FIREBALL_JSON: &str = r#"{
  "name": "fireball",
  "description": "A bright streak blossoms into flame.",
  "base_level": 3,
  "attacks": [],
  "saves": [
    {
      "half_effect_on_success": true,
      "name": "dex save",
      "ability": "dex",
      "dc_key": "main",
      "conditional_attacks": [],
      "effects": [
        {
          "modifier_key": "dmg",
          "dice_expression": "8d6",
          "effect_type": "fire",
          "upcast": { "max_upcast": 6, "levels_per_upcast": 1, "dice_expression": "1d6" }
        }
      ]
    }
  ],
  "unavoidable_effects": []
}"#;

#[test]
fn test_combatant_record_parses_every_field() {
    let goblin: Combatant = serde_json::from_str(GOBLIN_JSON).expect("parse goblin");
    let block = &goblin.stat_block;

    assert_eq!(block.name, "goblin");
    assert_eq!(block.kind, "humanoid");
    assert_eq!(block.hp.current, 7);
    assert_eq!(block.hp.max, 7);
    assert_eq!(block.ac, 15);
    assert_eq!(block.abilities.dexterity, 2);
    assert_eq!(block.saves.get("dex"), Some(&4));
    assert_eq!(block.skills.get("stealth"), Some(&6));
    assert_eq!(block.vulnerabilities, vec!["radiant"]);
    assert_eq!(block.resistances, vec!["poison"]);
    assert_eq!(block.condition_immunities, vec!["charmed"]);
    assert_eq!(block.senses.get("darkvision"), Some(&60));
    assert_eq!(block.languages.speaks, vec!["common", "goblin"]);
    assert_eq!(block.languages.understands, vec!["common"]);
    assert!(block.traits.contains_key("nimble_escape"));
    assert!(block.actions.contains_key("scimitar"));
}

#[test]
fn test_combatant_record_serializes_with_wire_names() {
    let goblin: Combatant = serde_json::from_str(GOBLIN_JSON).expect("parse goblin");
    let out = serde_json::to_value(&goblin).expect("serialize goblin");

    let block = &out["statblock"];
    assert_eq!(block["type"], "humanoid");
    assert_eq!(block["abilities"]["str"], -1);
    assert_eq!(block["languages"]["Speaks"][0], "common");
    assert_eq!(
        block["actions"]["scimitar"]["effects"]["slash"]["type"],
        "slashing"
    );
}

#[test]
fn test_loaded_action_is_performable() {
    let goblin: Combatant = serde_json::from_str(GOBLIN_JSON).expect("parse goblin");
    let report = goblin
        .perform_action("scimitar", ActionKind::Action)
        .expect("scimitar exists");

    let attack = report.attack_roll.expect("attack roll declared");
    assert!((5..=24).contains(&attack));
    assert!(report.required_save.is_none());
    assert_eq!(report.effects.len(), 1);
    assert_eq!(report.effects[0].kind, "slashing");
}

#[test]
fn test_spell_record_parses_every_field() {
    let fireball: Spell = serde_json::from_str(FIREBALL_JSON).expect("parse fireball");

    assert_eq!(fireball.name, "fireball");
    assert_eq!(fireball.base_level, 3);
    assert_eq!(fireball.saves.len(), 1);
    let save = &fireball.saves[0];
    assert!(save.half_effect_on_success);
    assert_eq!(save.ability, "dex");
    assert_eq!(save.dc_key, "main");
    let effect = &save.effects[0];
    assert_eq!(effect.dice_expression, "8d6");
    assert_eq!(effect.effect_type, "fire");
    assert_eq!(effect.upcast.max_upcast, 6);
}

#[tokio::test]
async fn test_directory_load_and_save_round_trip() {
    let temp = TempDir::new().expect("temp dir");
    let combatants = temp.path().join("combatants");
    let spells = temp.path().join("spells");
    std::fs::create_dir_all(&combatants).expect("mkdir");
    std::fs::create_dir_all(&spells).expect("mkdir");
    std::fs::write(combatants.join("goblin.json"), GOBLIN_JSON).expect("write goblin");
    std::fs::write(spells.join("fireball.json"), FIREBALL_JSON).expect("write fireball");

    let roster = persist::load_roster(temp.path()).await.expect("load");
    assert_eq!(roster.combatant_names(), vec!["goblin"]);
    assert_eq!(roster.spell_names(), vec!["fireball"]);

    // Wound the goblin, persist, and reload: the damage must survive.
    roster
        .with_combatant_mut("goblin", |c| {
            c.take_damage(4, "slashing");
        })
        .unwrap();
    persist::save_roster(&roster, temp.path()).await.expect("save");

    let reloaded = persist::load_roster(temp.path()).await.expect("reload");
    let hp = reloaded
        .with_combatant("goblin", |c| c.stat_block.hp.current)
        .unwrap();
    assert_eq!(hp, 3);

    // Spells are reference data; saving must not create a spells record.
    let spell_files: Vec<_> = std::fs::read_dir(&spells)
        .expect("read spells dir")
        .collect();
    assert_eq!(spell_files.len(), 1);
}
