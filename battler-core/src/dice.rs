//! Dice notation parsing and rolling.
//!
//! Supports the `NdM+K` family of expressions (`2d4+2`, `8d6`, `d20-1`)
//! and the advantage/disadvantage roll model.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error type for dice parsing.
#[derive(Debug, Error)]
pub enum DiceError {
    #[error("invalid dice expression '{0}', try something like '2d4+2', '8d6', or 'd20'")]
    InvalidNotation(String),
    #[error("negative die count in '{0}'")]
    NegativeCount(String),
    #[error("negative die size in '{0}'")]
    NegativeSides(String),
}

/// Advantage state for a roll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Advantage {
    #[default]
    Normal,
    Advantage,
    Disadvantage,
}

impl Advantage {
    /// Build from the two operator-facing flags. Both flags cancel each other.
    pub fn from_flags(advantage: bool, disadvantage: bool) -> Advantage {
        match (advantage, disadvantage) {
            (true, false) => Advantage::Advantage,
            (false, true) => Advantage::Disadvantage,
            _ => Advantage::Normal,
        }
    }
}

/// A single d20 with no modifier, the gate die for attacks and saves.
pub const D20: Dice = Dice {
    count: 1,
    sides: 20,
    modifier: 0,
};

/// A parsed dice expression: `count` dice of `sides` faces, each with a
/// flat `modifier` folded in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dice {
    pub count: u32,
    pub sides: u32,
    pub modifier: i32,
}

impl Dice {
    /// Parse a notation string.
    ///
    /// Accepted forms, most to least specific: `NdM+K`, `NdM-K`, `NdM`,
    /// `dM+K`, `dM-K`, `dM`. Count defaults to 1 and modifier to 0 when
    /// omitted; the modifier sign is part of the modifier. A count or die
    /// size written with a leading `-` is rejected whichever form matched.
    pub fn parse(notation: &str) -> Result<Self, DiceError> {
        let text = notation.trim().to_lowercase();
        let d_pos = text
            .find('d')
            .ok_or_else(|| DiceError::InvalidNotation(notation.to_string()))?;
        let count_str = &text[..d_pos];
        let rest = &text[d_pos + 1..];
        if rest.is_empty() {
            return Err(DiceError::InvalidNotation(notation.to_string()));
        }

        // The sign search skips the first character so a leading '-' stays
        // part of the die size and falls into the negative-size rejection.
        let split = rest
            .char_indices()
            .skip(1)
            .find(|(_, c)| *c == '+' || *c == '-')
            .map(|(i, _)| i);
        let (sides_str, modifier_str) = match split {
            Some(i) => (&rest[..i], &rest[i..]),
            None => (rest, ""),
        };

        let count: i64 = if count_str.is_empty() {
            1
        } else {
            count_str
                .parse()
                .map_err(|_| DiceError::InvalidNotation(notation.to_string()))?
        };
        let sides: i64 = sides_str
            .parse()
            .map_err(|_| DiceError::InvalidNotation(notation.to_string()))?;
        let modifier: i32 = if modifier_str.is_empty() {
            0
        } else {
            modifier_str
                .parse()
                .map_err(|_| DiceError::InvalidNotation(notation.to_string()))?
        };

        if count < 0 {
            return Err(DiceError::NegativeCount(notation.to_string()));
        }
        if sides < 0 {
            return Err(DiceError::NegativeSides(notation.to_string()));
        }
        let count =
            u32::try_from(count).map_err(|_| DiceError::InvalidNotation(notation.to_string()))?;
        let sides =
            u32::try_from(sides).map_err(|_| DiceError::InvalidNotation(notation.to_string()))?;

        Ok(Dice {
            count,
            sides,
            modifier,
        })
    }

    /// Roll with the process-wide RNG.
    pub fn roll(&self, advantage: Advantage) -> i32 {
        self.roll_with_rng(&mut rand::thread_rng(), advantage)
    }

    /// Roll with a specific RNG (useful for deterministic tests).
    ///
    /// Each of `count` iterations draws one face plus the modifier; under
    /// advantage or disadvantage it draws twice, modifier applied to each,
    /// and keeps the larger or smaller result. Iterations are summed.
    pub fn roll_with_rng<R: Rng>(&self, rng: &mut R, advantage: Advantage) -> i32 {
        let mut total = 0;
        for _ in 0..self.count {
            total += match advantage {
                Advantage::Normal => self.draw(rng),
                Advantage::Advantage => self.draw(rng).max(self.draw(rng)),
                Advantage::Disadvantage => self.draw(rng).min(self.draw(rng)),
            };
        }
        total
    }

    // A 0-sided die has no face to draw; the iteration is modifier only.
    fn draw<R: Rng>(&self, rng: &mut R) -> i32 {
        if self.sides == 0 {
            self.modifier
        } else {
            rng.gen_range(1..=self.sides) as i32 + self.modifier
        }
    }
}

impl FromStr for Dice {
    type Err = DiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Dice::parse(s)
    }
}

impl fmt::Display for Dice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}d{}", self.count, self.sides)?;
        match self.modifier.cmp(&0) {
            std::cmp::Ordering::Greater => write!(f, "+{}", self.modifier),
            std::cmp::Ordering::Less => write!(f, "{}", self.modifier),
            std::cmp::Ordering::Equal => Ok(()),
        }
    }
}
