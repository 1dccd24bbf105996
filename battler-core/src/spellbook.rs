//! Spells and the casting state machine.
//!
//! A spell holds three independent 1-indexed lists: attacks, forced saves,
//! and unavoidable effects. Each attack or save is a two-outcome gate
//! (hit/miss, success/failure) whose edges lead into effect applications
//! and at most one more gate of the opposite kind, so branch depth is
//! bounded by the authored data, never unbounded recursion.
//!
//! Casting produces an ordered [`CastEvent`] log instead of printing;
//! rendering belongs to the caller.

use crate::combatant::{Combatant, CombatantError, EffectReport};
use crate::dice::{Advantage, Dice, DiceError, D20};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

/// Effect type tag that routes an effect to healing instead of damage.
pub const HEALING: &str = "healing";

/// Errors surfaced (softly) during a cast.
#[derive(Debug, Error)]
pub enum CastError {
    #[error(transparent)]
    Dice(#[from] DiceError),
    #[error(transparent)]
    Combatant(#[from] CombatantError),
    #[error("'{spell}' has no {kind} at position {position}")]
    NoSuchEffect {
        spell: String,
        kind: &'static str,
        position: usize,
    },
}

/// A spell record, wire-compatible with the JSON spell files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Spell {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub base_level: i32,
    #[serde(default)]
    pub attacks: Vec<SpellAttack>,
    #[serde(default)]
    pub saves: Vec<SpellSave>,
    #[serde(default)]
    pub unavoidable_effects: Vec<SpellEffect>,
}

/// One spell attack: a d20 gate with effects and conditional saves behind it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpellAttack {
    pub name: String,
    #[serde(default)]
    pub modifier_key: String,
    #[serde(default)]
    pub conditional_saves: Vec<SpellSave>,
    #[serde(default)]
    pub effects: Vec<SpellEffect>,
}

/// One forced save: a DC gate with effects and conditional attacks behind it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpellSave {
    #[serde(default)]
    pub half_effect_on_success: bool,
    pub name: String,
    pub ability: String,
    #[serde(default)]
    pub dc_key: String,
    #[serde(default)]
    pub conditional_attacks: Vec<SpellAttack>,
    #[serde(default)]
    pub effects: Vec<SpellEffect>,
}

/// One typed effect: modifier lookup + dice + optional upcast scaling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpellEffect {
    #[serde(default)]
    pub modifier_key: String,
    /// Optional; empty means flat/upcast only.
    #[serde(default)]
    pub dice_expression: String,
    pub effect_type: String,
    #[serde(default)]
    pub upcast: Upcast,
}

/// Upcast scaling rule: extra dice per casting-level step above base.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Upcast {
    #[serde(default)]
    pub max_upcast: i32,
    #[serde(default)]
    pub levels_per_upcast: i32,
    #[serde(default)]
    pub dice_expression: String,
}

impl Upcast {
    fn bonus_with_rng<R: Rng>(&self, rng: &mut R, levels_above_base: i32) -> Result<i32, DiceError> {
        // A missing rule or non-positive step means no scaling; the step
        // guard also keeps division by zero out.
        if self.dice_expression.is_empty() || self.levels_per_upcast < 1 {
            return Ok(0);
        }

        let dice = Dice::parse(&self.dice_expression)?;
        // Below-base casts clamp to zero bonus steps.
        let steps = (levels_above_base / self.levels_per_upcast)
            .min(self.max_upcast)
            .max(0);

        let mut bonus = 0;
        for _ in 0..steps {
            bonus += dice.roll_with_rng(rng, Advantage::Normal);
        }
        Ok(bonus)
    }
}

/// The per-cast modifier tables supplied by the caster. Read-only during a
/// cast and discarded afterwards.
#[derive(Debug, Clone, Default)]
pub struct Invocation {
    pub casting_level: i32,
    pub attack_modifiers: HashMap<String, i32>,
    pub effect_modifiers: HashMap<String, i32>,
    pub save_dcs: HashMap<String, i32>,
}

/// One queued entry of a target plan: which effect, how often, how rolled.
#[derive(Debug, Clone, Copy)]
pub struct PlanEntry {
    /// 1-based position into the spell's respective list.
    pub position: usize,
    pub repetitions: u32,
    pub advantage: Advantage,
}

/// Everything queued against a single target, per effect category.
#[derive(Debug, Clone, Default)]
pub struct TargetPlan {
    pub attacks: Vec<PlanEntry>,
    pub saves: Vec<PlanEntry>,
    pub unavoidables: Vec<PlanEntry>,
}

/// One entry of the ordered cast log.
#[derive(Debug, Clone, Serialize)]
pub enum CastEvent {
    TargetBegin {
        target: String,
    },
    AttackBegin {
        attack: String,
        target: String,
        repetition: u32,
    },
    SaveBegin {
        save: String,
        target: String,
        repetition: u32,
    },
    ConditionalSaveBegin {
        save: String,
        target: String,
    },
    ConditionalAttackBegin {
        attack: String,
        target: String,
    },
    AttackRoll {
        attack: String,
        target: String,
        total: i32,
        hit: bool,
    },
    SaveOutcome {
        save: String,
        target: String,
        succeeded: bool,
    },
    EffectApplied {
        target: String,
        effect_type: String,
        amount: i32,
        report: EffectReport,
    },
    /// A soft resolution failure; the cast continues past it.
    Failed {
        message: String,
    },
}

impl SpellEffect {
    /// Apply this effect to one target, with the process-wide RNG.
    pub fn apply(
        &self,
        target: &mut Combatant,
        levels_above_base: i32,
        invocation: &Invocation,
        half_effect: bool,
    ) -> Result<(i32, EffectReport), CastError> {
        self.apply_with_rng(
            &mut rand::thread_rng(),
            target,
            levels_above_base,
            invocation,
            half_effect,
        )
    }

    /// Apply this effect to one target.
    ///
    /// Total = upcast bonus + named effect-modifier lookup (0 when absent)
    /// + straight roll of the effect dice (0 when absent), halved with
    /// truncation after all additions when `half_effect` is set. The total
    /// routes to healing or typed damage per `effect_type`. A dice parse
    /// failure aborts only this one application.
    pub fn apply_with_rng<R: Rng>(
        &self,
        rng: &mut R,
        target: &mut Combatant,
        levels_above_base: i32,
        invocation: &Invocation,
        half_effect: bool,
    ) -> Result<(i32, EffectReport), CastError> {
        let mut total = self.upcast.bonus_with_rng(rng, levels_above_base)?;

        total += invocation
            .effect_modifiers
            .get(&self.modifier_key)
            .copied()
            .unwrap_or(0);

        if !self.dice_expression.is_empty() {
            total += Dice::parse(&self.dice_expression)?.roll_with_rng(rng, Advantage::Normal);
        }

        if half_effect {
            total /= 2;
        }

        let report = if self.effect_type == HEALING {
            target.heal(total)
        } else {
            target.take_damage(total, &self.effect_type)
        };

        Ok((report.true_effect, report))
    }
}

impl SpellAttack {
    /// Resolve one attack roll against the target, then walk its branches.
    fn resolve<R: Rng>(
        &self,
        rng: &mut R,
        target: &mut Combatant,
        levels_above_base: i32,
        invocation: &Invocation,
        advantage: Advantage,
        half_effect: bool,
        events: &mut Vec<CastEvent>,
    ) {
        let modifier = invocation
            .attack_modifiers
            .get(&self.modifier_key)
            .copied()
            .unwrap_or(0);
        let total = D20.roll_with_rng(rng, advantage) + modifier;
        let hit = target.hits(total);
        events.push(CastEvent::AttackRoll {
            attack: self.name.clone(),
            target: target.name().to_string(),
            total,
            hit,
        });

        if !hit {
            return;
        }

        for effect in &self.effects {
            apply_and_record(
                rng,
                effect,
                target,
                levels_above_base,
                invocation,
                half_effect,
                events,
            );
        }

        for save in &self.conditional_saves {
            events.push(CastEvent::ConditionalSaveBegin {
                save: save.name.clone(),
                target: target.name().to_string(),
            });
            if let Err(err) = save.resolve(rng, target, levels_above_base, invocation, advantage, events)
            {
                events.push(CastEvent::Failed {
                    message: err.to_string(),
                });
            }
        }
    }
}

impl SpellSave {
    /// Force this save on the target, then walk its branches.
    ///
    /// Success with `half_effect_on_success` applies effects and
    /// conditional attacks at half value; failure applies them at full
    /// value; plain success does nothing further. Conditional branches
    /// reuse the triggering advantage flags.
    fn resolve<R: Rng>(
        &self,
        rng: &mut R,
        target: &mut Combatant,
        levels_above_base: i32,
        invocation: &Invocation,
        advantage: Advantage,
        events: &mut Vec<CastEvent>,
    ) -> Result<(), CastError> {
        let dc = invocation.save_dcs.get(&self.dc_key).copied().unwrap_or(0);
        let succeeded = target.save_with_rng(rng, dc, &self.ability, advantage)?;
        events.push(CastEvent::SaveOutcome {
            save: self.name.clone(),
            target: target.name().to_string(),
            succeeded,
        });

        let half_effect = if succeeded {
            if !self.half_effect_on_success {
                return Ok(());
            }
            true
        } else {
            false
        };

        for effect in &self.effects {
            apply_and_record(
                rng,
                effect,
                target,
                levels_above_base,
                invocation,
                half_effect,
                events,
            );
        }

        for attack in &self.conditional_attacks {
            events.push(CastEvent::ConditionalAttackBegin {
                attack: attack.name.clone(),
                target: target.name().to_string(),
            });
            attack.resolve(
                rng,
                target,
                levels_above_base,
                invocation,
                advantage,
                half_effect,
                events,
            );
        }

        Ok(())
    }
}

fn apply_and_record<R: Rng>(
    rng: &mut R,
    effect: &SpellEffect,
    target: &mut Combatant,
    levels_above_base: i32,
    invocation: &Invocation,
    half_effect: bool,
    events: &mut Vec<CastEvent>,
) {
    match effect.apply_with_rng(rng, target, levels_above_base, invocation, half_effect) {
        Ok((amount, report)) => events.push(CastEvent::EffectApplied {
            target: target.name().to_string(),
            effect_type: effect.effect_type.clone(),
            amount,
            report,
        }),
        Err(err) => events.push(CastEvent::Failed {
            message: err.to_string(),
        }),
    }
}

impl Spell {
    /// Cast against a sequence of targets with the process-wide RNG.
    pub fn cast<'a>(
        &self,
        targets: impl IntoIterator<Item = (&'a mut Combatant, &'a TargetPlan)>,
        invocation: &Invocation,
    ) -> Vec<CastEvent> {
        self.cast_with_rng(&mut rand::thread_rng(), targets, invocation)
    }

    /// Cast against a sequence of targets, in caller order.
    pub fn cast_with_rng<'a, R: Rng>(
        &self,
        rng: &mut R,
        targets: impl IntoIterator<Item = (&'a mut Combatant, &'a TargetPlan)>,
        invocation: &Invocation,
    ) -> Vec<CastEvent> {
        let mut events = Vec::new();
        for (target, plan) in targets {
            self.cast_on_with_rng(rng, target, plan, invocation, &mut events);
        }
        events
    }

    /// Resolve one target's full plan: queued attacks, then saves, then
    /// unavoidable effects, each entry repeated as queued. Resolution
    /// errors are recorded as [`CastEvent::Failed`] and skip only the
    /// failing repetition.
    pub fn cast_on_with_rng<R: Rng>(
        &self,
        rng: &mut R,
        target: &mut Combatant,
        plan: &TargetPlan,
        invocation: &Invocation,
        events: &mut Vec<CastEvent>,
    ) {
        // Negative for casts below base level; the upcast clamp absorbs it.
        let levels_above_base = self.base_level - invocation.casting_level;
        debug!(
            spell = %self.name,
            target = %target.name(),
            levels_above_base,
            "resolving cast plan"
        );
        events.push(CastEvent::TargetBegin {
            target: target.name().to_string(),
        });

        for entry in &plan.attacks {
            let Some(attack) = lookup(&self.attacks, entry.position) else {
                events.push(self.missing("attack", entry.position));
                continue;
            };
            for repetition in 1..=entry.repetitions {
                events.push(CastEvent::AttackBegin {
                    attack: attack.name.clone(),
                    target: target.name().to_string(),
                    repetition,
                });
                attack.resolve(
                    rng,
                    target,
                    levels_above_base,
                    invocation,
                    entry.advantage,
                    false,
                    events,
                );
            }
        }

        for entry in &plan.saves {
            let Some(save) = lookup(&self.saves, entry.position) else {
                events.push(self.missing("save", entry.position));
                continue;
            };
            for repetition in 1..=entry.repetitions {
                events.push(CastEvent::SaveBegin {
                    save: save.name.clone(),
                    target: target.name().to_string(),
                    repetition,
                });
                if let Err(err) =
                    save.resolve(rng, target, levels_above_base, invocation, entry.advantage, events)
                {
                    events.push(CastEvent::Failed {
                        message: err.to_string(),
                    });
                }
            }
        }

        for entry in &plan.unavoidables {
            let Some(effect) = lookup(&self.unavoidable_effects, entry.position) else {
                events.push(self.missing("unavoidable effect", entry.position));
                continue;
            };
            for _ in 0..entry.repetitions {
                apply_and_record(
                    rng,
                    effect,
                    target,
                    levels_above_base,
                    invocation,
                    false,
                    events,
                );
            }
        }
    }

    fn missing(&self, kind: &'static str, position: usize) -> CastEvent {
        CastEvent::Failed {
            message: CastError::NoSuchEffect {
                spell: self.name.clone(),
                kind,
                position,
            }
            .to_string(),
        }
    }
}

// 1-based position into a spell's effect lists.
fn lookup<T>(list: &[T], position: usize) -> Option<&T> {
    position.checked_sub(1).and_then(|i| list.get(i))
}
