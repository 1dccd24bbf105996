//! Combatant stat blocks and single-target combat operations.
//!
//! A [`Combatant`] is loaded once from a JSON stat-block record, mutated in
//! place by damage and healing, and written back at session end. Every
//! mutating operation answers with an [`EffectReport`]; the engine never
//! prints.

use crate::dice::{Advantage, Dice, DiceError, D20};
use indexmap::IndexMap;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors from single-combatant operations.
#[derive(Debug, Error)]
pub enum CombatantError {
    #[error("invalid ability: {0}")]
    InvalidAbility(String),
    #[error("action not found: {0}")]
    ActionNotFound(String),
    #[error(transparent)]
    Dice(#[from] DiceError),
}

/// An entity with hit points, armor class, and combat-relevant attributes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Combatant {
    #[serde(rename = "statblock")]
    pub stat_block: StatBlock,
}

/// The full stat-block record, wire-compatible with the JSON battle files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatBlock {
    #[serde(default)]
    pub file_name: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    pub hp: HitPoints,
    pub ac: i32,
    #[serde(default)]
    pub speed: i32,
    pub abilities: Abilities,
    #[serde(default)]
    pub saves: IndexMap<String, i32>,
    #[serde(default)]
    pub skills: IndexMap<String, i32>,
    #[serde(default)]
    pub vulnerabilities: Vec<String>,
    #[serde(default)]
    pub resistances: Vec<String>,
    #[serde(default)]
    pub immunities: Vec<String>,
    #[serde(default)]
    pub condition_immunities: Vec<String>,
    #[serde(default)]
    pub senses: IndexMap<String, i32>,
    #[serde(default)]
    pub languages: Languages,
    #[serde(default)]
    pub traits: IndexMap<String, String>,
    #[serde(default)]
    pub actions: IndexMap<String, Action>,
    #[serde(default)]
    pub bonus_actions: IndexMap<String, Action>,
    #[serde(default)]
    pub reactions: IndexMap<String, Action>,
}

/// Hit point pool. Invariant: `0 <= current <= max`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HitPoints {
    pub current: i32,
    pub max: i32,
}

/// The six fixed ability scores.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Abilities {
    #[serde(rename = "str")]
    pub strength: i32,
    #[serde(rename = "dex")]
    pub dexterity: i32,
    #[serde(rename = "con")]
    pub constitution: i32,
    #[serde(rename = "int")]
    pub intelligence: i32,
    #[serde(rename = "wis")]
    pub wisdom: i32,
    #[serde(rename = "cha")]
    pub charisma: i32,
}

impl Abilities {
    /// Look up a score by its three-letter key. `None` for unknown keys.
    pub fn score(&self, ability: &str) -> Option<i32> {
        match ability {
            "str" => Some(self.strength),
            "dex" => Some(self.dexterity),
            "con" => Some(self.constitution),
            "int" => Some(self.intelligence),
            "wis" => Some(self.wisdom),
            "cha" => Some(self.charisma),
            _ => None,
        }
    }
}

/// Spoken and understood language sets.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Languages {
    #[serde(rename = "Speaks", default)]
    pub speaks: Vec<String>,
    #[serde(rename = "Understands", default)]
    pub understands: Vec<String>,
}

/// A named action from the stat block's action catalogs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Action {
    #[serde(default)]
    pub attack_roll: AttackRoll,
    #[serde(default)]
    pub saving_throw: SavingThrow,
    #[serde(default)]
    pub effects: IndexMap<String, ActionEffect>,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct AttackRoll {
    #[serde(default)]
    pub present: bool,
    #[serde(default)]
    pub modifier: i32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SavingThrow {
    #[serde(default)]
    pub present: bool,
    #[serde(default)]
    pub ability: String,
    #[serde(default)]
    pub dc: i32,
}

/// One rollable sub-effect of an action: a dice expression plus a type tag.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActionEffect {
    pub roll: String,
    #[serde(rename = "type")]
    pub kind: String,
}

/// Which of the three action catalogs to look in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Action,
    BonusAction,
    Reaction,
}

impl FromStr for ActionKind {
    type Err = CombatantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "action" => Ok(ActionKind::Action),
            "bonus action" | "bonus" => Ok(ActionKind::BonusAction),
            "reaction" => Ok(ActionKind::Reaction),
            other => Err(CombatantError::ActionNotFound(format!(
                "unknown action kind '{other}'"
            ))),
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionKind::Action => write!(f, "action"),
            ActionKind::BonusAction => write!(f, "bonus action"),
            ActionKind::Reaction => write!(f, "reaction"),
        }
    }
}

/// The structured record of one damage or heal application.
///
/// This is the only channel through which the engine reports consequences.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectReport {
    pub was_immune: bool,
    pub was_resistant: bool,
    pub was_vulnerable: bool,
    pub was_at_zero: bool,
    pub dropped_to_zero: bool,
    pub back_above_zero: bool,
    /// The numeric effect actually applied, after all type adjustments.
    pub true_effect: i32,
}

/// Result of narrating an action: rolled totals, no state change.
#[derive(Debug, Clone)]
pub struct ActionReport {
    /// d20 + modifier, when the action declares an attack roll.
    pub attack_roll: Option<i32>,
    /// The saving throw the action forces on its target, when declared.
    pub required_save: Option<RequiredSave>,
    pub effects: Vec<RolledEffect>,
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct RequiredSave {
    pub ability: String,
    pub dc: i32,
}

#[derive(Debug, Clone)]
pub struct RolledEffect {
    pub name: String,
    pub total: i32,
    pub kind: String,
}

impl Combatant {
    pub fn name(&self) -> &str {
        &self.stat_block.name
    }

    /// Apply typed damage.
    ///
    /// A combatant already at 0 HP takes no further change. Immunity zeroes
    /// the damage, vulnerability doubles it, resistance halves it (integer
    /// truncation); vulnerability and resistance are independent and apply
    /// in that order when a type is listed in both sets.
    pub fn take_damage(&mut self, amount: i32, damage_type: &str) -> EffectReport {
        let mut report = EffectReport::default();
        let block = &mut self.stat_block;

        if block.hp.current <= 0 {
            block.hp.current = 0;
            report.was_at_zero = true;
            return report;
        }

        let mut damage = amount;
        if block.immunities.iter().any(|t| t == damage_type) {
            damage = 0;
            report.was_immune = true;
        }
        if block.vulnerabilities.iter().any(|t| t == damage_type) {
            damage *= 2;
            report.was_vulnerable = true;
        }
        if block.resistances.iter().any(|t| t == damage_type) {
            damage /= 2;
            report.was_resistant = true;
        }

        block.hp.current -= damage;
        if block.hp.current <= 0 {
            block.hp.current = 0;
            report.dropped_to_zero = true;
        }

        report.true_effect = damage;
        report
    }

    /// Restore hit points, clamped at max.
    ///
    /// The true effect reports the requested amount even when the heal
    /// clamps at max HP.
    pub fn heal(&mut self, amount: i32) -> EffectReport {
        let mut report = EffectReport {
            true_effect: amount,
            ..Default::default()
        };
        let hp = &mut self.stat_block.hp;

        if hp.current == 0 && amount > 0 {
            report.back_above_zero = true;
        }

        hp.current += amount;
        if hp.current > hp.max {
            hp.current = hp.max;
        }

        report
    }

    /// Does an attack roll total meet this combatant's armor class?
    pub fn hits(&self, attack_roll: i32) -> bool {
        attack_roll >= self.stat_block.ac
    }

    /// Make a saving throw against `dc` with the process-wide RNG.
    pub fn save(&self, dc: i32, ability: &str, advantage: Advantage) -> Result<bool, CombatantError> {
        self.save_with_rng(&mut rand::thread_rng(), dc, ability, advantage)
    }

    /// Make a saving throw with a specific RNG.
    ///
    /// The modifier comes from the explicit saves table, falling back to
    /// the raw ability score for one of the six fixed abilities.
    pub fn save_with_rng<R: Rng>(
        &self,
        rng: &mut R,
        dc: i32,
        ability: &str,
        advantage: Advantage,
    ) -> Result<bool, CombatantError> {
        let modifier = match self.stat_block.saves.get(ability) {
            Some(modifier) => *modifier,
            None => self
                .stat_block
                .abilities
                .score(ability)
                .ok_or_else(|| CombatantError::InvalidAbility(ability.to_string()))?,
        };

        Ok(D20.roll_with_rng(rng, advantage) + modifier >= dc)
    }

    /// Narrate a named action with the process-wide RNG.
    pub fn perform_action(
        &self,
        name: &str,
        kind: ActionKind,
    ) -> Result<ActionReport, CombatantError> {
        self.perform_action_with_rng(&mut rand::thread_rng(), name, kind)
    }

    /// Narrate a named action: roll its attack line and each sub-effect.
    ///
    /// This is a convenience layer over the roller; it never touches HP.
    pub fn perform_action_with_rng<R: Rng>(
        &self,
        rng: &mut R,
        name: &str,
        kind: ActionKind,
    ) -> Result<ActionReport, CombatantError> {
        let catalog = match kind {
            ActionKind::Action => &self.stat_block.actions,
            ActionKind::BonusAction => &self.stat_block.bonus_actions,
            ActionKind::Reaction => &self.stat_block.reactions,
        };
        let action = catalog
            .get(name)
            .ok_or_else(|| CombatantError::ActionNotFound(name.to_string()))?;

        let attack_roll = action
            .attack_roll
            .present
            .then(|| D20.roll_with_rng(rng, Advantage::Normal) + action.attack_roll.modifier);

        let required_save = action.saving_throw.present.then(|| RequiredSave {
            ability: action.saving_throw.ability.clone(),
            dc: action.saving_throw.dc,
        });

        let mut effects = Vec::with_capacity(action.effects.len());
        for (effect_name, effect) in &action.effects {
            let dice = Dice::parse(&effect.roll)?;
            effects.push(RolledEffect {
                name: effect_name.clone(),
                total: dice.roll_with_rng(rng, Advantage::Normal),
                kind: effect.kind.clone(),
            });
        }

        Ok(ActionReport {
            attack_roll,
            required_save,
            effects,
            description: action.description.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn dummy(hp: i32, ac: i32) -> Combatant {
        Combatant {
            stat_block: StatBlock {
                file_name: "dummy.json".to_string(),
                name: "dummy".to_string(),
                kind: "construct".to_string(),
                hp: HitPoints {
                    current: hp,
                    max: hp,
                },
                ac,
                speed: 30,
                abilities: Abilities {
                    strength: 2,
                    dexterity: 3,
                    constitution: 1,
                    intelligence: 0,
                    wisdom: 1,
                    charisma: 0,
                },
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
    fn test_damage_and_clamp_at_zero() {
        let mut target = dummy(10, 12);
        let report = target.take_damage(25, "slashing");
        assert_eq!(report.true_effect, 25);
        assert!(report.dropped_to_zero);
        assert_eq!(target.stat_block.hp.current, 0);
    }

    #[test]
    fn test_damage_at_zero_is_a_no_op() {
        let mut target = dummy(10, 12);
        target.take_damage(25, "slashing");
        let report = target.take_damage(100, "slashing");
        assert!(report.was_at_zero);
        assert!(!report.dropped_to_zero);
        assert_eq!(report.true_effect, 0);
        assert_eq!(target.stat_block.hp.current, 0);
    }

    #[test]
    fn test_resistance_halves_with_truncation() {
        let mut target = dummy(20, 15);
        target.stat_block.resistances.push("fire".to_string());
        let report = target.take_damage(9, "fire");
        assert!(report.was_resistant);
        assert_eq!(report.true_effect, 4);
        assert_eq!(target.stat_block.hp.current, 16);
    }

    #[test]
    fn test_vulnerability_doubles() {
        let mut target = dummy(20, 15);
        target.stat_block.vulnerabilities.push("cold".to_string());
        let report = target.take_damage(6, "cold");
        assert!(report.was_vulnerable);
        assert_eq!(report.true_effect, 12);
        assert_eq!(target.stat_block.hp.current, 8);
    }

    #[test]
    fn test_immunity_zeroes() {
        let mut target = dummy(20, 15);
        target.stat_block.immunities.push("poison".to_string());
        let report = target.take_damage(13, "poison");
        assert!(report.was_immune);
        assert_eq!(report.true_effect, 0);
        assert_eq!(target.stat_block.hp.current, 20);
    }

    #[test]
    fn test_vulnerable_and_resistant_cancel() {
        // Double then halve: floor(2 * raw / 2) = raw.
        let mut target = dummy(20, 15);
        target.stat_block.vulnerabilities.push("acid".to_string());
        target.stat_block.resistances.push("acid".to_string());
        let report = target.take_damage(7, "acid");
        assert!(report.was_vulnerable);
        assert!(report.was_resistant);
        assert_eq!(report.true_effect, 7);
        assert_eq!(target.stat_block.hp.current, 13);
    }

    #[test]
    fn test_heal_clamps_at_max_but_reports_requested() {
        let mut target = dummy(20, 15);
        target.take_damage(5, "slashing");
        let report = target.heal(50);
        assert_eq!(report.true_effect, 50);
        assert_eq!(target.stat_block.hp.current, 20);
    }

    #[test]
    fn test_heal_from_zero_reports_back_above() {
        let mut target = dummy(20, 15);
        target.take_damage(20, "slashing");
        let report = target.heal(4);
        assert!(report.back_above_zero);
        assert_eq!(target.stat_block.hp.current, 4);
    }

    #[test]
    fn test_hits_compares_against_ac() {
        let target = dummy(10, 15);
        assert!(target.hits(15));
        assert!(target.hits(22));
        assert!(!target.hits(14));
    }

    #[test]
    fn test_save_uses_explicit_modifier_over_ability() {
        let mut target = dummy(10, 15);
        target.stat_block.saves.insert("dex".to_string(), 100);
        let mut rng = StdRng::seed_from_u64(1);
        assert!(target
            .save_with_rng(&mut rng, 30, "dex", Advantage::Normal)
            .unwrap());
    }

    #[test]
    fn test_save_falls_back_to_ability_score() {
        let mut target = dummy(10, 15);
        target.stat_block.abilities.wisdom = 100;
        let mut rng = StdRng::seed_from_u64(2);
        assert!(target
            .save_with_rng(&mut rng, 50, "wis", Advantage::Normal)
            .unwrap());
        target.stat_block.abilities.wisdom = -100;
        assert!(!target
            .save_with_rng(&mut rng, 0, "wis", Advantage::Normal)
            .unwrap());
    }

    #[test]
    fn test_save_rejects_unknown_ability() {
        let target = dummy(10, 15);
        let mut rng = StdRng::seed_from_u64(3);
        let err = target
            .save_with_rng(&mut rng, 10, "luck", Advantage::Normal)
            .unwrap_err();
        assert!(matches!(err, CombatantError::InvalidAbility(_)));
    }

    #[test]
    fn test_perform_action_rolls_declared_lines() {
        let mut actor = dummy(10, 15);
        let mut effects = IndexMap::new();
        effects.insert(
            "bite".to_string(),
            ActionEffect {
                roll: "2d6+3".to_string(),
                kind: "piercing".to_string(),
            },
        );
        actor.stat_block.actions.insert(
            "chomp".to_string(),
            Action {
                attack_roll: AttackRoll {
                    present: true,
                    modifier: 4,
                },
                saving_throw: SavingThrow {
                    present: true,
                    ability: "dex".to_string(),
                    dc: 13,
                },
                effects,
                description: "A vicious bite.".to_string(),
            },
        );

        let mut rng = StdRng::seed_from_u64(4);
        let report = actor
            .perform_action_with_rng(&mut rng, "chomp", ActionKind::Action)
            .unwrap();
        let attack = report.attack_roll.unwrap();
        assert!((5..=24).contains(&attack));
        let save = report.required_save.unwrap();
        assert_eq!(save.ability, "dex");
        assert_eq!(save.dc, 13);
        assert_eq!(report.effects.len(), 1);
        assert!((5..=15).contains(&report.effects[0].total));
        assert_eq!(report.description, "A vicious bite.");
    }

    #[test]
    fn test_perform_action_missing() {
        let actor = dummy(10, 15);
        let err = actor.perform_action("nope", ActionKind::Reaction).unwrap_err();
        assert!(matches!(err, CombatantError::ActionNotFound(_)));
    }
}
