//! Environmental stimuli
//!
//! A stimulus is one discrete input event: a category from a closed set,
//! a signed intensity in [-1.0, 1.0], the time it occurred and opaque
//! metadata supplied by whoever produced it. Stimuli are immutable once built.

use crate::error::CoreError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Closed set of stimulus categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    AmbientNoise,
    Decay,
    Recovery,
    Shock,
    Idle,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::AmbientNoise,
        Category::Decay,
        Category::Recovery,
        Category::Shock,
        Category::Idle,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::AmbientNoise => "ambient_noise",
            Category::Decay => "decay",
            Category::Recovery => "recovery",
            Category::Shock => "shock",
            Category::Idle => "idle",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = CoreError;

    /// Accepts both `ambient_noise` and `ambient-noise` spellings, case-insensitive.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(CoreError::EmptyCategory);
        }
        match trimmed.to_ascii_lowercase().replace('-', "_").as_str() {
            "ambient_noise" => Ok(Category::AmbientNoise),
            "decay" => Ok(Category::Decay),
            "recovery" => Ok(Category::Recovery),
            "shock" => Ok(Category::Shock),
            "idle" => Ok(Category::Idle),
            _ => Err(CoreError::UnknownCategory(trimmed.to_string())),
        }
    }
}

/// One environmental input event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stimulus {
    id: Uuid,
    category: Category,
    /// Signed intensity (-1.0 to 1.0)
    intensity: f32,
    occurred_at: DateTime<Utc>,
    #[serde(default)]
    metadata: HashMap<String, serde_json::Value>,
}

impl Stimulus {
    /// Build a stimulus occurring now with no metadata.
    /// Intensity is clamped into [-1.0, 1.0]; non-finite values become 0.0.
    pub fn new(category: Category, intensity: f32) -> Self {
        let intensity = if intensity.is_finite() {
            intensity.clamp(-1.0, 1.0)
        } else {
            0.0
        };
        Self {
            id: Uuid::new_v4(),
            category,
            intensity,
            occurred_at: Utc::now(),
            metadata: HashMap::new(),
        }
    }

    /// Strict constructor used at the ingress boundary.
    pub fn try_new(
        category: Category,
        intensity: f32,
        occurred_at: DateTime<Utc>,
        metadata: HashMap<String, serde_json::Value>,
    ) -> Result<Self, CoreError> {
        if !intensity.is_finite() {
            return Err(CoreError::NonFiniteIntensity(intensity));
        }
        Ok(Self {
            id: Uuid::new_v4(),
            category,
            intensity: intensity.clamp(-1.0, 1.0),
            occurred_at,
            metadata,
        })
    }

    pub fn with_occurred_at(mut self, occurred_at: DateTime<Utc>) -> Self {
        self.occurred_at = occurred_at;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn intensity(&self) -> f32 {
        self.intensity
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    pub fn metadata(&self) -> &HashMap<String, serde_json::Value> {
        &self.metadata
    }
}
