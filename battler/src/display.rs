//! Terminal rendering for stat blocks, reports, and cast logs.
//!
//! The engine only returns structured values; every line an operator sees
//! is formatted here.

use battler_core::combatant::{ActionReport, Combatant, StatBlock};
use battler_core::spellbook::HEALING;
use battler_core::{CastEvent, EffectReport};
use indexmap::IndexMap;

const RULE: &str = "----------------------------------------";

/// Render a full stat block, one field per line.
pub fn stat_block(combatant: &Combatant) -> String {
    let block = &combatant.stat_block;
    let mut out = String::new();

    out.push_str(RULE);
    out.push('\n');
    out.push_str(&format!("{} ({})\n", block.name, block.kind));
    out.push_str(RULE);
    out.push('\n');
    out.push_str(&format!(
        "HP: {}/{}   AC: {}   Speed: {} ft.\n",
        block.hp.current, block.hp.max, block.ac, block.speed
    ));
    out.push_str(&format!(
        "STR {}  DEX {}  CON {}  INT {}  WIS {}  CHA {}\n",
        block.abilities.strength,
        block.abilities.dexterity,
        block.abilities.constitution,
        block.abilities.intelligence,
        block.abilities.wisdom,
        block.abilities.charisma,
    ));

    push_modifier_line(&mut out, "Saves", &block.saves);
    push_modifier_line(&mut out, "Skills", &block.skills);
    push_list_line(&mut out, "Vulnerabilities", &block.vulnerabilities);
    push_list_line(&mut out, "Resistances", &block.resistances);
    push_list_line(&mut out, "Immunities", &block.immunities);
    push_list_line(&mut out, "Condition immunities", &block.condition_immunities);

    if !block.senses.is_empty() {
        let senses: Vec<String> = block
            .senses
            .iter()
            .map(|(sense, range)| format!("{sense} {range} ft."))
            .collect();
        out.push_str(&format!("Senses: {}\n", senses.join(", ")));
    }
    out.push_str(&format!(
        "Passive perception: {}\n",
        passive_perception(block)
    ));

    push_list_line(&mut out, "Speaks", &block.languages.speaks);
    push_list_line(&mut out, "Understands", &block.languages.understands);

    if !block.traits.is_empty() {
        out.push_str("Traits:\n");
        for (name, text) in &block.traits {
            out.push_str(&format!("  {name}: {text}\n"));
        }
    }
    push_action_catalog(&mut out, "Actions", &block.actions);
    push_action_catalog(&mut out, "Bonus actions", &block.bonus_actions);
    push_action_catalog(&mut out, "Reactions", &block.reactions);

    out.push_str(RULE);
    out
}

/// 10 plus the perception skill modifier, falling back to the raw wisdom
/// score when the skill is absent.
fn passive_perception(block: &StatBlock) -> i32 {
    match block.skills.get("perception") {
        Some(modifier) => 10 + modifier,
        None => 10 + block.abilities.wisdom,
    }
}

fn push_modifier_line(out: &mut String, label: &str, table: &IndexMap<String, i32>) {
    if table.is_empty() {
        return;
    }
    let entries: Vec<String> = table
        .iter()
        .map(|(name, modifier)| format!("{name} {modifier:+}"))
        .collect();
    out.push_str(&format!("{label}: {}\n", entries.join(", ")));
}

fn push_list_line(out: &mut String, label: &str, items: &[String]) {
    if !items.is_empty() {
        out.push_str(&format!("{label}: {}\n", items.join(", ")));
    }
}

fn push_action_catalog(
    out: &mut String,
    label: &str,
    catalog: &IndexMap<String, battler_core::combatant::Action>,
) {
    if catalog.is_empty() {
        return;
    }
    out.push_str(&format!("{label}:\n"));
    for (name, action) in catalog {
        out.push_str(&format!("  {name}: {}\n", action.description));
    }
}

/// Render the outcome of a damage or heal application.
pub fn effect_report(target: &str, report: &EffectReport, effect_type: &str) -> String {
    let mut out = String::new();
    if report.was_at_zero {
        out.push_str(&format!("{target} is already at 0 hit points\n"));
        return out;
    }
    if report.was_immune {
        out.push_str(&format!("{target} is immune to {effect_type}\n"));
    }
    if report.was_vulnerable {
        out.push_str(&format!("{target} is vulnerable to {effect_type}\n"));
    }
    if report.was_resistant {
        out.push_str(&format!("{target} is resistant to {effect_type}\n"));
    }
    let verb = if effect_type == HEALING {
        "regains"
    } else {
        "takes"
    };
    out.push_str(&format!(
        "{target} {verb} {} {effect_type}\n",
        report.true_effect
    ));
    if report.dropped_to_zero {
        out.push_str(&format!("{target} drops to 0 hit points\n"));
    }
    if report.back_above_zero {
        out.push_str(&format!("{target} is back above 0 hit points\n"));
    }
    out
}

/// Render a narrated (state-free) action roll.
pub fn action_report(name: &str, report: &ActionReport) -> String {
    let mut out = String::new();
    out.push_str(&format!("{name}: {}\n", report.description));
    if let Some(total) = report.attack_roll {
        out.push_str(&format!("Attack roll: {total}\n"));
    }
    if let Some(save) = &report.required_save {
        out.push_str(&format!("Target saves: DC {} {}\n", save.dc, save.ability));
    }
    for effect in &report.effects {
        out.push_str(&format!(
            "  {}: {} {}\n",
            effect.name, effect.total, effect.kind
        ));
    }
    out
}

/// Render an ordered cast log.
pub fn cast_events(events: &[CastEvent]) -> String {
    let mut out = String::new();
    for event in events {
        match event {
            CastEvent::TargetBegin { target } => {
                out.push_str(&format!("== {target} ==\n"));
            }
            CastEvent::AttackBegin {
                attack,
                target,
                repetition,
            } => {
                out.push_str(&format!("{attack} vs {target} (#{repetition})\n"));
            }
            CastEvent::SaveBegin {
                save,
                target,
                repetition,
            } => {
                out.push_str(&format!("{save} save by {target} (#{repetition})\n"));
            }
            CastEvent::ConditionalSaveBegin { save, target } => {
                out.push_str(&format!("{save} follow-up save by {target}\n"));
            }
            CastEvent::ConditionalAttackBegin { attack, target } => {
                out.push_str(&format!("{attack} follow-up attack vs {target}\n"));
            }
            CastEvent::AttackRoll {
                attack,
                target,
                total,
                hit,
            } => {
                let outcome = if *hit { "hits" } else { "misses" };
                out.push_str(&format!("{attack} rolls {total} and {outcome} {target}\n"));
            }
            CastEvent::SaveOutcome {
                save,
                target,
                succeeded,
            } => {
                let outcome = if *succeeded { "succeeds" } else { "fails" };
                out.push_str(&format!("{target} {outcome} the {save} save\n"));
            }
            CastEvent::EffectApplied {
                target,
                effect_type,
                amount: _,
                report,
            } => {
                out.push_str(&effect_report(target, report, effect_type));
            }
            CastEvent::Failed { message } => {
                out.push_str(&format!("(!) {message}\n"));
            }
        }
    }
    out
}
