//! Interactive combat session over a directory of battle files.
//!
//! Loads combatants and spells from `<data-dir>/combatants` and
//! `<data-dir>/spells`, runs a line-oriented prompt, and writes combatant
//! state back on exit.

mod commands;
mod display;
mod tokenizer;

use anyhow::Context;
use battler_core::persist;
use clap::Parser;
use commands::App;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::io::{BufRead, Write};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "battler", about = "Tabletop combat resolution session")]
struct Args {
    /// Directory holding the combatant and spell battle files.
    #[arg(long, default_value = "battle_files")]
    data_dir: PathBuf,

    /// Seed for the session dice, for reproducible sessions.
    #[arg(long)]
    seed: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
    let args = Args::parse();

    let roster = persist::load_roster(&args.data_dir)
        .await
        .with_context(|| format!("loading battle files from {}", args.data_dir.display()))?;
    tracing::info!(
        combatants = roster.combatant_names().len(),
        spells = roster.spell_names().len(),
        "session loaded"
    );

    let rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let mut app = App {
        roster,
        data_dir: args.data_dir,
        selection: None,
        rng,
        running: true,
    };

    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    let mut line = String::new();
    while app.running {
        match &app.selection {
            Some(name) => write!(stdout, "{name} > ")?,
            None => write!(stdout, "> ")?,
        }
        stdout.flush()?;

        line.clear();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let Some(command) = tokenizer::tokenize(&line) else {
            continue;
        };
        if let Err(err) = commands::dispatch(&mut app, &command) {
            println!("{err}");
        }
    }

    persist::save_roster(&app.roster, &app.data_dir)
        .await
        .context("saving battle files")?;
    Ok(())
}
