use crate::letters::LETTERS_PER_LEVEL;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

pub const LEVELS_PER_TIER: u8 = 5;

/// Skill bands, in progression order. Pro is terminal.
#[derive(
    Debug,
    Copy,
    Clone,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    ValueEnum,
    strum_macros::Display,
    strum_macros::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Tier {
    Beginner,
    Intermediate,
    Expert,
    Pro,
}

impl Tier {
    pub fn next(self) -> Tier {
        match self {
            Tier::Beginner => Tier::Intermediate,
            Tier::Intermediate => Tier::Expert,
            Tier::Expert => Tier::Pro,
            Tier::Pro => Tier::Pro,
        }
    }

    /// The two highest tiers offer the camera evaluation flow.
    pub fn supports_camera(self) -> bool {
        matches!(self, Tier::Expert | Tier::Pro)
    }
}

/// One numbered stage within a tier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Level {
    pub tier: Tier,
    pub number: u8,
}

impl Level {
    pub fn new(tier: Tier, number: u8) -> Self {
        let number = number.clamp(1, LEVELS_PER_TIER);
        Self { tier, number }
    }

    /// Letters introduced by this level alone, as an index range into the
    /// ordered alphabet (clipped to `alphabet_len`).
    pub fn lesson_range(&self, alphabet_len: usize) -> std::ops::Range<usize> {
        let start = LETTERS_PER_LEVEL * (self.number as usize - 1);
        let end = LETTERS_PER_LEVEL * self.number as usize;
        start.min(alphabet_len)..end.min(alphabet_len)
    }

    /// All letters introduced at or before this level. Quizzes draw from
    /// this cumulative set.
    pub fn cumulative_count(&self, alphabet_len: usize) -> usize {
        (LETTERS_PER_LEVEL * self.number as usize).min(alphabet_len)
    }

    /// The level reached after a perfect quiz score: next level within the
    /// tier, or the next tier at level 1 after level 5. Pro 5 stays put.
    pub fn advanced(&self) -> Level {
        if self.number < LEVELS_PER_TIER {
            Level::new(self.tier, self.number + 1)
        } else if self.tier == Tier::Pro {
            *self
        } else {
            Level::new(self.tier.next(), 1)
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} level {}", self.tier, self.number)
    }
}
