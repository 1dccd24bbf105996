//! Battle-file persistence.
//!
//! Stat-block records live as JSON under a data directory:
//! `<dir>/combatants/*.json` and `<dir>/spells/*.json`. Combatants are
//! written back at session end, keyed by their stored file name; spells
//! are read-only reference data and are never rewritten.

use crate::combatant::Combatant;
use crate::roster::Roster;
use crate::spellbook::Spell;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::info;

/// Errors from persistence operations.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Load every combatant and spell record under `dir` into a fresh roster.
///
/// Missing subdirectories load as empty; a malformed record aborts the
/// load.
pub async fn load_roster(dir: impl AsRef<Path>) -> Result<Roster, PersistError> {
    let dir = dir.as_ref();
    let roster = Roster::new();

    let combatants: Vec<Combatant> = load_records(&dir.join("combatants")).await?;
    let spells: Vec<Spell> = load_records(&dir.join("spells")).await?;
    info!(
        combatants = combatants.len(),
        spells = spells.len(),
        "loaded battle files"
    );

    for combatant in combatants {
        roster.add_combatant(combatant);
    }
    for spell in spells {
        roster.add_spell(spell);
    }
    Ok(roster)
}

/// Write every combatant in the roster back to `<dir>/combatants/`.
pub async fn save_roster(roster: &Roster, dir: impl AsRef<Path>) -> Result<(), PersistError> {
    let combatants_dir = dir.as_ref().join("combatants");
    fs::create_dir_all(&combatants_dir).await?;

    for combatant in roster.combatants() {
        let path = combatant_save_path(&combatants_dir, &combatant);
        let content = serde_json::to_string_pretty(&combatant)?;
        fs::write(path, content).await?;
    }
    Ok(())
}

/// The file a combatant is written to: its stored file name, or a
/// sanitized name when the record never carried one.
pub fn combatant_save_path(dir: impl AsRef<Path>, combatant: &Combatant) -> PathBuf {
    let file_name = if combatant.stat_block.file_name.is_empty() {
        let sanitized = combatant
            .stat_block
            .name
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { '_' })
            .collect::<String>();
        format!("{sanitized}.json")
    } else {
        combatant.stat_block.file_name.clone()
    };
    dir.as_ref().join(file_name)
}

async fn load_records<T: DeserializeOwned>(dir: &Path) -> Result<Vec<T>, PersistError> {
    let mut records = Vec::new();
    if !dir.exists() {
        return Ok(records);
    }

    let mut entries = fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().map(|e| e == "json").unwrap_or(false) {
            let content = fs::read_to_string(&path).await?;
            records.push(serde_json::from_str(&content)?);
        }
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combatant::{Abilities, HitPoints, Languages, StatBlock};
    use indexmap::IndexMap;

    fn sample(name: &str, file_name: &str) -> Combatant {
        Combatant {
            stat_block: StatBlock {
                file_name: file_name.to_string(),
                name: name.to_string(),
                kind: "humanoid".to_string(),
                hp: HitPoints {
                    current: 9,
                    max: 11,
                },
                ac: 13,
                speed: 30,
                abilities: Abilities::default(),
                saves: IndexMap::new(),
                skills: IndexMap::new(),
                vulnerabilities: Vec::new(),
                resistances: Vec::new(),
                immunities: Vec::new(),
                condition_immunities: Vec::new(),
                senses: IndexMap::new(),
                languages: Languages::default(),
                traits: IndexMap::new(),
                actions: IndexMap::new(),
                bonus_actions: IndexMap::new(),
                reactions: IndexMap::new(),
            },
        }
    }

    #[test]
    fn test_save_path_uses_stored_file_name() {
        let combatant = sample("Guard Captain", "guard_captain.json");
        let path = combatant_save_path("/data", &combatant);
        assert!(path.to_string_lossy().ends_with("guard_captain.json"));
    }

    #[test]
    fn test_save_path_sanitizes_missing_file_name() {
        let combatant = sample("Bob's Goon!", "");
        let path = combatant_save_path("/data", &combatant);
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert_eq!(name, "Bob_s_Goon_.json");
    }

    #[tokio::test]
    async fn test_load_missing_directory_is_empty() {
        let temp = tempfile::TempDir::new().expect("temp dir");
        let roster = load_roster(temp.path()).await.expect("load");
        assert!(roster.combatant_names().is_empty());
        assert!(roster.spell_names().is_empty());
    }

    #[tokio::test]
    async fn test_save_and_reload_round_trip() {
        let temp = tempfile::TempDir::new().expect("temp dir");
        let roster = Roster::new();
        let mut combatant = sample("goblin", "goblin.json");
        combatant.take_damage(3, "slashing");
        roster.add_combatant(combatant);

        save_roster(&roster, temp.path()).await.expect("save");
        let reloaded = load_roster(temp.path()).await.expect("load");

        let hp = reloaded
            .with_combatant("goblin", |c| c.stat_block.hp.current)
            .unwrap();
        assert_eq!(hp, 6);
    }

    #[tokio::test]
    async fn test_malformed_record_aborts_load() {
        let temp = tempfile::TempDir::new().expect("temp dir");
        let dir = temp.path().join("combatants");
        std::fs::create_dir_all(&dir).expect("create dir");
        std::fs::write(dir.join("broken.json"), "{ not json").expect("write");

        let result = load_roster(temp.path()).await;
        assert!(matches!(result, Err(PersistError::Json(_))));
    }
}
