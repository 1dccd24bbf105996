//! Tabletop combat resolution engine.
//!
//! This crate provides:
//! - Dice-notation parsing and the advantage/disadvantage roll model
//! - Combatant stat blocks with damage, healing, attack, and save
//!   resolution against typed defenses
//! - A spell-casting state machine: attacks, forced saves, conditional
//!   branches, unavoidable effects, and upcast scaling across multiple
//!   targets
//! - A lock-guarded roster and JSON battle-file persistence
//!
//! The engine never prints; every consequence comes back as a structured
//! value ([`EffectReport`], [`CastEvent`]) for the caller to render.
//!
//! # Quick Start
//!
//! ```ignore
//! use battler_core::{persist, Invocation, PlanEntry, TargetPlan};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let roster = persist::load_roster("battle_files").await?;
//!
//!     let report = roster.with_combatant_mut("goblin", |goblin| {
//!         goblin.take_damage(7, "fire")
//!     })?;
//!     println!("took {} damage", report.true_effect);
//!
//!     persist::save_roster(&roster, "battle_files").await?;
//!     Ok(())
//! }
//! ```

pub mod combatant;
pub mod dice;
pub mod persist;
pub mod roster;
pub mod spellbook;

// Primary public API
pub use combatant::{
    ActionKind, ActionReport, Combatant, CombatantError, EffectReport, StatBlock,
};
pub use dice::{Advantage, Dice, DiceError};
pub use persist::PersistError;
pub use roster::{Roster, RosterError};
pub use spellbook::{CastError, CastEvent, Invocation, PlanEntry, Spell, TargetPlan, HEALING};
