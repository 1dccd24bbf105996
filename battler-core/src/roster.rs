//! The roster: a concurrency-safe, name-keyed registry of combatants and
//! spells.
//!
//! The roster owns its combatants. All mutation goes through the
//! closure-based accessors or [`Roster::cast_spell_with_rng`], which hold
//! the write lock and hand out a mutable borrow, so damage and healing
//! persist for the rest of the session.

use crate::combatant::Combatant;
use crate::spellbook::{CastEvent, Invocation, Spell, TargetPlan};
use parking_lot::RwLock;
use rand::Rng;
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

/// Lookup misses against the roster.
#[derive(Debug, Error)]
pub enum RosterError {
    #[error("could not find combatant: {0}")]
    CombatantNotFound(String),
    #[error("could not find spell: {0}")]
    SpellNotFound(String),
}

#[derive(Default)]
struct Inner {
    combatants: HashMap<String, Combatant>,
    spells: HashMap<String, Spell>,
}

/// Shared registry guarded by a reader/writer lock: concurrent reads,
/// exclusive writes.
#[derive(Default)]
pub struct Roster {
    inner: RwLock<Inner>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a combatant, keyed by its stat-block name.
    pub fn add_combatant(&self, combatant: Combatant) {
        let mut inner = self.inner.write();
        inner
            .combatants
            .insert(combatant.stat_block.name.clone(), combatant);
    }

    /// Insert or replace a spell, keyed by name.
    pub fn add_spell(&self, spell: Spell) {
        let mut inner = self.inner.write();
        inner.spells.insert(spell.name.clone(), spell);
    }

    pub fn contains_combatant(&self, name: &str) -> bool {
        self.inner.read().combatants.contains_key(name)
    }

    /// Sorted combatant names.
    pub fn combatant_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.read().combatants.keys().cloned().collect();
        names.sort();
        names
    }

    /// Sorted spell names.
    pub fn spell_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.read().spells.keys().cloned().collect();
        names.sort();
        names
    }

    /// Read access to one combatant.
    pub fn with_combatant<T>(
        &self,
        name: &str,
        f: impl FnOnce(&Combatant) -> T,
    ) -> Result<T, RosterError> {
        let inner = self.inner.read();
        let combatant = inner
            .combatants
            .get(name)
            .ok_or_else(|| RosterError::CombatantNotFound(name.to_string()))?;
        Ok(f(combatant))
    }

    /// Mutable access to one combatant; the change lands in the roster.
    pub fn with_combatant_mut<T>(
        &self,
        name: &str,
        f: impl FnOnce(&mut Combatant) -> T,
    ) -> Result<T, RosterError> {
        let mut inner = self.inner.write();
        let combatant = inner
            .combatants
            .get_mut(name)
            .ok_or_else(|| RosterError::CombatantNotFound(name.to_string()))?;
        Ok(f(combatant))
    }

    /// An owned copy of one spell (spells are immutable during a session).
    pub fn get_spell(&self, name: &str) -> Result<Spell, RosterError> {
        self.inner
            .read()
            .spells
            .get(name)
            .cloned()
            .ok_or_else(|| RosterError::SpellNotFound(name.to_string()))
    }

    /// Owned copies of every combatant, for persistence.
    pub fn combatants(&self) -> Vec<Combatant> {
        self.inner.read().combatants.values().cloned().collect()
    }

    /// Cast a spell against named targets, in the order supplied.
    ///
    /// Holds the write lock for the whole cast; each target resolves
    /// fully before the next. An unknown target name becomes a soft
    /// [`CastEvent::Failed`] entry and the cast moves on (fail-soft), but
    /// an unknown spell fails the whole command before anything happens.
    pub fn cast_spell_with_rng<R: Rng>(
        &self,
        rng: &mut R,
        spell_name: &str,
        targets: &[(String, TargetPlan)],
        invocation: &Invocation,
    ) -> Result<Vec<CastEvent>, RosterError> {
        let mut inner = self.inner.write();
        let spell = inner
            .spells
            .get(spell_name)
            .cloned()
            .ok_or_else(|| RosterError::SpellNotFound(spell_name.to_string()))?;

        debug!(spell = spell_name, targets = targets.len(), "casting");
        let mut events = Vec::new();
        for (name, plan) in targets {
            match inner.combatants.get_mut(name) {
                Some(target) => spell.cast_on_with_rng(rng, target, plan, invocation, &mut events),
                None => events.push(CastEvent::Failed {
                    message: RosterError::CombatantNotFound(name.clone()).to_string(),
                }),
            }
        }
        Ok(events)
    }

    /// Cast with the process-wide RNG.
    pub fn cast_spell(
        &self,
        spell_name: &str,
        targets: &[(String, TargetPlan)],
        invocation: &Invocation,
    ) -> Result<Vec<CastEvent>, RosterError> {
        self.cast_spell_with_rng(&mut rand::thread_rng(), spell_name, targets, invocation)
    }
}
