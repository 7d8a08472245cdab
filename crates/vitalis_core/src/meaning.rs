//! Meaning: what a stimulus signifies for the organism right now.
//!
//! A `Meaning` pairs a validated significance with a proposed per-dimension
//! impact. The impact is only ever rewritten by a reaction pattern, always
//! starting from the base impact the interpretation produced.

use crate::error::CoreError;
use crate::stimulus::Category;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Per-dimension change to the condition.
///
/// Vitality is expressed in its own units (0-100 range), integrity and
/// stability in theirs (0-1 range).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StateDelta {
    pub vitality: f32,
    pub integrity: f32,
    pub stability: f32,
}

impl StateDelta {
    pub fn new(vitality: f32, integrity: f32, stability: f32) -> Self {
        Self { vitality, integrity, stability }
    }

    pub fn zero() -> Self {
        Self::default()
    }

    pub fn scale(&self, factor: f32) -> Self {
        Self {
            vitality: self.vitality * factor,
            integrity: self.integrity * factor,
            stability: self.stability * factor,
        }
    }

    pub fn is_zero(&self) -> bool {
        self.vitality == 0.0 && self.integrity == 0.0 && self.stability == 0.0
    }

    /// True when any single dimension moved by more than `threshold`.
    pub fn exceeds(&self, threshold: f32) -> bool {
        self.vitality.abs() > threshold
            || self.integrity.abs() > threshold
            || self.stability.abs() > threshold
    }
}

/// The reaction class chosen for a stimulus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReactionPattern {
    Ignore,
    Absorb,
    Dampen,
    Amplify,
}

impl ReactionPattern {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReactionPattern::Ignore => "ignore",
            ReactionPattern::Absorb => "absorb",
            ReactionPattern::Dampen => "dampen",
            ReactionPattern::Amplify => "amplify",
        }
    }

    /// Multiplier this pattern applies to a base impact.
    pub fn impact_factor(&self) -> f32 {
        match self {
            ReactionPattern::Ignore => 0.0,
            ReactionPattern::Absorb => 1.0,
            ReactionPattern::Dampen => 0.5,
            ReactionPattern::Amplify => 1.5,
        }
    }

    pub fn rewrite(&self, base: &StateDelta) -> StateDelta {
        match self {
            // zeroed explicitly so -0.0 never leaks into audit payloads
            ReactionPattern::Ignore => StateDelta::zero(),
            ReactionPattern::Absorb => *base,
            _ => base.scale(self.impact_factor()),
        }
    }
}

impl fmt::Display for ReactionPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReactionPattern {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ignore" => Ok(ReactionPattern::Ignore),
            "absorb" => Ok(ReactionPattern::Absorb),
            "dampen" => Ok(ReactionPattern::Dampen),
            "amplify" => Ok(ReactionPattern::Amplify),
            other => Err(CoreError::UnknownPattern(other.to_string())),
        }
    }
}

/// Interpreted significance and proposed impact of one stimulus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meaning {
    source: Uuid,
    category: Category,
    significance: f32,
    base_impact: StateDelta,
    impact: StateDelta,
}

impl Meaning {
    /// Fails when `significance` is outside [0.0, 1.0] or not a number.
    pub fn new(
        source: Uuid,
        category: Category,
        significance: f32,
        impact: StateDelta,
    ) -> Result<Self, CoreError> {
        if !(0.0..=1.0).contains(&significance) {
            return Err(CoreError::SignificanceOutOfRange(significance));
        }
        Ok(Self {
            source,
            category,
            significance,
            base_impact: impact,
            impact,
        })
    }

    /// Rewrite the impact for `pattern`, starting from the base impact.
    pub fn apply_pattern(&mut self, pattern: ReactionPattern) {
        self.impact = pattern.rewrite(&self.base_impact);
    }

    pub fn source(&self) -> Uuid {
        self.source
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn significance(&self) -> f32 {
        self.significance
    }

    pub fn base_impact(&self) -> StateDelta {
        self.base_impact
    }

    pub fn impact(&self) -> StateDelta {
        self.impact
    }
}
