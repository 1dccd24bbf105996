//! Command dispatch for the interactive session.
//!
//! Every handler parses its argument groups, calls into the engine, and
//! prints through [`crate::display`]. Handler errors are reported to the
//! operator and never end the session.

use crate::display;
use crate::tokenizer::{ArgGroup, CommandLine, Flag};
use anyhow::{anyhow, bail, Context, Result};
use battler_core::combatant::ActionKind;
use battler_core::{Advantage, Dice, Invocation, PlanEntry, Roster, TargetPlan};
use rand::rngs::StdRng;
use std::path::PathBuf;

/// Session state threaded through every command.
pub struct App {
    pub roster: Roster,
    pub data_dir: PathBuf,
    pub selection: Option<String>,
    pub rng: StdRng,
    pub running: bool,
}

const USAGE: &str = "\
Commands:
  help                                   show this text
  names                                  list loaded combatants and spells
  select <name>                          select a combatant; prints its stat block
  dmg <amount> <type>                    damage the selected combatant
  heal <amount>                          heal the selected combatant
  attack <total>                         test an attack total against the selection's AC
  save <dc> <ability> [adv] [dis]        roll a saving throw for the selection
  action <name> [--kind bonus|reaction]  narrate one of the selection's actions
  roll <dice>                            roll a dice expression, e.g. 2d6+3
  advantage <dice>                       roll keeping the higher of each pair
  disadvantage <dice>                    roll keeping the lower of each pair
  cast <spell> [--lvl N] [--am key N]... [--em key N]... [--dc key N]...,
       <target> [--doatk pos reps [adv] [dis]]... [--dosav ...]... [--do ...]...
                                         cast a spell at one or more targets
  exit                                   save battle files and quit";

/// Execute one tokenized line against the session.
pub fn dispatch(app: &mut App, line: &CommandLine) -> Result<()> {
    match line.name.as_str() {
        "help" => {
            println!("{USAGE}");
            Ok(())
        }
        "exit" | "quit" => {
            app.running = false;
            Ok(())
        }
        "names" => cmd_names(app),
        "select" => cmd_select(app, line),
        "dmg" => cmd_dmg(app, line),
        "heal" => cmd_heal(app, line),
        "attack" => cmd_attack(app, line),
        "save" => cmd_save(app, line),
        "action" => cmd_action(app, line),
        "roll" => cmd_roll(app, line, Advantage::Normal),
        "advantage" => cmd_roll(app, line, Advantage::Advantage),
        "disadvantage" => cmd_roll(app, line, Advantage::Disadvantage),
        "cast" => cmd_cast(app, line),
        other => bail!("unknown command '{other}', try 'help'"),
    }
}

fn selected(app: &App) -> Result<String> {
    app.selection
        .clone()
        .ok_or_else(|| anyhow!("no combatant selected, use 'select <name>' first"))
}

fn cmd_names(app: &App) -> Result<()> {
    println!("Combatants: {}", app.roster.combatant_names().join(", "));
    println!("Spells: {}", app.roster.spell_names().join(", "));
    Ok(())
}

fn cmd_select(app: &mut App, line: &CommandLine) -> Result<()> {
    let name = line.first_group().text;
    if name.is_empty() {
        bail!("usage: select <name>");
    }
    if !app.roster.contains_combatant(&name) {
        bail!("no combatant named '{name}'");
    }
    let rendered = app.roster.with_combatant(&name, display::stat_block)?;
    println!("{rendered}");
    app.selection = Some(name);
    Ok(())
}

fn cmd_dmg(app: &mut App, line: &CommandLine) -> Result<()> {
    let name = selected(app)?;
    let group = line.first_group();
    let mut words = group.text.split_whitespace();
    let amount: i32 = words
        .next()
        .context("usage: dmg <amount> <type>")?
        .parse()
        .context("amount must be an integer")?;
    let damage_type = words.next().context("usage: dmg <amount> <type>")?;

    let report = app
        .roster
        .with_combatant_mut(&name, |c| c.take_damage(amount, damage_type))?;
    print!("{}", display::effect_report(&name, &report, damage_type));
    Ok(())
}

fn cmd_heal(app: &mut App, line: &CommandLine) -> Result<()> {
    let name = selected(app)?;
    let amount: i32 = line
        .first_group()
        .text
        .parse()
        .context("usage: heal <amount>")?;

    let report = app.roster.with_combatant_mut(&name, |c| c.heal(amount))?;
    print!(
        "{}",
        display::effect_report(&name, &report, battler_core::HEALING)
    );
    Ok(())
}

fn cmd_attack(app: &mut App, line: &CommandLine) -> Result<()> {
    let name = selected(app)?;
    let total: i32 = line
        .first_group()
        .text
        .parse()
        .context("usage: attack <total>")?;

    let hit = app.roster.with_combatant(&name, |c| c.hits(total))?;
    if hit {
        println!("{total} hits {name}");
    } else {
        println!("{total} misses {name}");
    }
    Ok(())
}

fn cmd_save(app: &mut App, line: &CommandLine) -> Result<()> {
    let name = selected(app)?;
    let group = line.first_group();
    let words: Vec<&str> = group.text.split_whitespace().collect();
    let (dc, ability) = match words.as_slice() {
        [dc, ability, ..] => (
            dc.parse::<i32>().context("dc must be an integer")?,
            *ability,
        ),
        _ => bail!("usage: save <dc> <ability> [adv] [dis]"),
    };
    let advantage = advantage_from_words(&words[2..]);

    let rng = &mut app.rng;
    let succeeded = app
        .roster
        .with_combatant(&name, |c| c.save_with_rng(rng, dc, ability, advantage))??;
    if succeeded {
        println!("{name} succeeds on the DC {dc} {ability} save");
    } else {
        println!("{name} fails the DC {dc} {ability} save");
    }
    Ok(())
}

fn cmd_action(app: &mut App, line: &CommandLine) -> Result<()> {
    let name = selected(app)?;
    let group = line.first_group();
    if group.text.is_empty() {
        bail!("usage: action <name> [--kind bonus|reaction]");
    }
    let kind = match group.flag("kind") {
        Some(flag) => flag.values.join(" ").parse::<ActionKind>()?,
        None => ActionKind::Action,
    };

    let rng = &mut app.rng;
    let report = app
        .roster
        .with_combatant(&name, |c| c.perform_action_with_rng(rng, &group.text, kind))??;
    print!("{}", display::action_report(&group.text, &report));
    Ok(())
}

fn cmd_roll(app: &mut App, line: &CommandLine, advantage: Advantage) -> Result<()> {
    let notation = line.first_group().text;
    if notation.is_empty() {
        bail!("usage: {} <dice>", line.name);
    }
    let dice = Dice::parse(&notation)?;
    println!("{}", dice.roll_with_rng(&mut app.rng, advantage));
    Ok(())
}

fn cmd_cast(app: &mut App, line: &CommandLine) -> Result<()> {
    let spell_group = line.first_group();
    if spell_group.text.is_empty() {
        bail!("usage: cast <spell> [flags], <target> [flags], ...");
    }
    let invocation = parse_invocation(&spell_group)?;

    let mut targets = Vec::new();
    for group in line.groups.iter().skip(1) {
        if group.text.is_empty() {
            bail!("each target group needs a combatant name");
        }
        targets.push((group.text.clone(), parse_target_plan(group)?));
    }
    if targets.is_empty() {
        bail!("cast needs at least one target group after a comma");
    }

    let events =
        app.roster
            .cast_spell_with_rng(&mut app.rng, &spell_group.text, &targets, &invocation)?;
    print!("{}", display::cast_events(&events));
    Ok(())
}

/// `--lvl N` plus repeatable `--am key N`, `--em key N`, `--dc key N`.
fn parse_invocation(group: &ArgGroup) -> Result<Invocation> {
    let mut invocation = Invocation::default();
    if let Some(flag) = group.flag("lvl") {
        invocation.casting_level = single_int(flag)?;
    }
    for flag in group.flags_named("am") {
        let (key, value) = keyed_int(flag)?;
        invocation.attack_modifiers.insert(key, value);
    }
    for flag in group.flags_named("em") {
        let (key, value) = keyed_int(flag)?;
        invocation.effect_modifiers.insert(key, value);
    }
    for flag in group.flags_named("dc") {
        let (key, value) = keyed_int(flag)?;
        invocation.save_dcs.insert(key, value);
    }
    Ok(invocation)
}

/// Repeatable `--doatk pos reps [adv] [dis]`, `--dosav ...`, `--do ...`.
fn parse_target_plan(group: &ArgGroup) -> Result<TargetPlan> {
    let mut plan = TargetPlan::default();
    for flag in &group.flags {
        let entry = match flag.name.as_str() {
            "doatk" => &mut plan.attacks,
            "dosav" => &mut plan.saves,
            "do" => &mut plan.unavoidables,
            other => bail!("unknown target flag '--{other}'"),
        };
        entry.push(plan_entry(flag)?);
    }
    Ok(plan)
}

fn plan_entry(flag: &Flag) -> Result<PlanEntry> {
    let [position, repetitions, rest @ ..] = flag.values.as_slice() else {
        bail!("--{} needs <position> <repetitions> [adv] [dis]", flag.name);
    };
    Ok(PlanEntry {
        position: position
            .parse()
            .with_context(|| format!("--{} position must be a positive integer", flag.name))?,
        repetitions: repetitions
            .parse()
            .with_context(|| format!("--{} repetitions must be a non-negative integer", flag.name))?,
        advantage: advantage_from_words(
            &rest.iter().map(String::as_str).collect::<Vec<_>>(),
        ),
    })
}

fn advantage_from_words(words: &[&str]) -> Advantage {
    let advantage = words.contains(&"adv");
    let disadvantage = words.contains(&"dis");
    Advantage::from_flags(advantage, disadvantage)
}

fn single_int(flag: &Flag) -> Result<i32> {
    match flag.values.as_slice() {
        [value] => value
            .parse()
            .with_context(|| format!("--{} must be an integer", flag.name)),
        _ => bail!("--{} takes exactly one integer", flag.name),
    }
}

fn keyed_int(flag: &Flag) -> Result<(String, i32)> {
    match flag.values.as_slice() {
        [key, value] => Ok((
            key.clone(),
            value
                .parse()
                .with_context(|| format!("--{} {key} must be an integer", flag.name))?,
        )),
        _ => bail!("--{} takes <key> <integer>", flag.name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::tokenize;

    #[test]
    fn test_parse_invocation_tables() {
        let line = tokenize("cast fireball --lvl 5 --dc main 15 --em blast 2 --am ray 7").unwrap();
        let invocation = parse_invocation(&line.first_group()).unwrap();
        assert_eq!(invocation.casting_level, 5);
        assert_eq!(invocation.save_dcs.get("main"), Some(&15));
        assert_eq!(invocation.effect_modifiers.get("blast"), Some(&2));
        assert_eq!(invocation.attack_modifiers.get("ray"), Some(&7));
    }

    #[test]
    fn test_parse_target_plan_categories() {
        let line = tokenize("cast x, goblin --doatk 1 3 adv --dosav 2 1 --do 1 1 dis").unwrap();
        let plan = parse_target_plan(&line.groups[1]).unwrap();
        assert_eq!(plan.attacks.len(), 1);
        assert_eq!(plan.attacks[0].position, 1);
        assert_eq!(plan.attacks[0].repetitions, 3);
        assert_eq!(plan.attacks[0].advantage, Advantage::Advantage);
        assert_eq!(plan.saves[0].position, 2);
        assert_eq!(plan.unavoidables[0].advantage, Advantage::Disadvantage);
    }

    #[test]
    fn test_plan_entry_rejects_missing_values() {
        let line = tokenize("cast x, goblin --doatk 1").unwrap();
        assert!(parse_target_plan(&line.groups[1]).is_err());
    }

    #[test]
    fn test_unknown_target_flag_is_rejected() {
        let line = tokenize("cast x, goblin --boom 1 1").unwrap();
        assert!(parse_target_plan(&line.groups[1]).is_err());
    }

    #[test]
    fn test_adv_and_dis_cancel() {
        assert_eq!(advantage_from_words(&["adv", "dis"]), Advantage::Normal);
    }
}
