//! Condition - the organism's mutable state record.
//!
//! Three bounded resource dimensions plus unbounded counters and the audit
//! trail:
//! - `vitality`: energy reserve (0.0 - 100.0)
//! - `integrity`: structural soundness (0.0 - 1.0)
//! - `stability`: internal steadiness (0.0 - 1.0)
//!
//! Every mutation goes through a method that re-clamps the dimensions, so
//! the bounds hold after any sequence of updates. The scheduler thread is
//! the only writer; everyone else reads a `ConditionSnapshot`.

use crate::audit::{AuditEntry, AuditTrail};
use crate::meaning::{ReactionPattern, StateDelta};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const VITALITY_MAX: f32 = 100.0;

/// Guard against NaN and Infinity in state values.
#[inline]
fn sanitize_f32(v: f32, fallback: f32) -> f32 {
    if v.is_finite() {
        v
    } else {
        tracing::warn!("NaN/Inf detected in condition, resetting to fallback {}", fallback);
        fallback
    }
}

/// The three bounded dimensions, captured at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vitals {
    pub vitality: f32,
    pub integrity: f32,
    pub stability: f32,
}

impl Vitals {
    /// `self - before`, per dimension.
    pub fn delta_since(&self, before: &Vitals) -> StateDelta {
        StateDelta {
            vitality: self.vitality - before.vitality,
            integrity: self.integrity - before.integrity,
            stability: self.stability - before.stability,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub vitality: f32,
    pub integrity: f32,
    pub stability: f32,

    /// Accumulated wall-clock age in seconds
    pub age_secs: f64,
    pub tick_count: u64,

    /// False once any resource dimension reaches zero
    pub active: bool,

    pub audit: AuditTrail,

    pub last_updated: DateTime<Utc>,

    /// Memory subset activated for the stimulus being processed
    #[serde(skip)]
    pub activated_memory: Vec<AuditEntry>,

    #[serde(skip)]
    pub last_pattern: Option<ReactionPattern>,
}

impl Default for Condition {
    fn default() -> Self {
        Self {
            vitality: 100.0,
            integrity: 1.0,
            stability: 0.6,
            age_secs: 0.0,
            tick_count: 0,
            active: true,
            audit: AuditTrail::default(),
            last_updated: Utc::now(),
            activated_memory: Vec::new(),
            last_pattern: None,
        }
    }
}

impl Condition {
    pub fn vitals(&self) -> Vitals {
        Vitals {
            vitality: self.vitality,
            integrity: self.integrity,
            stability: self.stability,
        }
    }

    /// Clamp all dimensions to their valid ranges.
    pub fn normalize(&mut self) {
        self.vitality = sanitize_f32(self.vitality, 0.0).clamp(0.0, VITALITY_MAX);
        self.integrity = sanitize_f32(self.integrity, 0.0).clamp(0.0, 1.0);
        self.stability = sanitize_f32(self.stability, 0.0).clamp(0.0, 1.0);
        self.audit.enforce_capacity();
    }

    /// Apply an impact, then re-clamp.
    pub fn apply(&mut self, delta: &StateDelta) {
        self.vitality += delta.vitality;
        self.integrity += delta.integrity;
        self.stability += delta.stability;
        self.normalize();
        self.last_updated = Utc::now();
    }

    /// Spend vitality, floored at zero.
    pub fn spend_vitality(&mut self, cost: f32) {
        self.vitality = (self.vitality - cost).max(0.0);
        self.normalize();
    }

    pub fn penalize_integrity(&mut self, amount: f32) {
        self.integrity -= amount;
        self.normalize();
    }

    /// True when any dimension is at or below `fraction` of its range.
    pub fn is_low_resource(&self, fraction: f32) -> bool {
        self.vitality <= fraction * VITALITY_MAX
            || self.integrity <= fraction
            || self.stability <= fraction
    }

    /// Flat systemic weakening: every dimension loses `fraction` of its range.
    pub fn degrade(&mut self, fraction: f32) {
        self.apply(&StateDelta {
            vitality: -fraction * VITALITY_MAX,
            integrity: -fraction,
            stability: -fraction,
        });
    }

    /// Recompute the active flag. Returns true when it changed.
    pub fn refresh_active(&mut self) -> bool {
        let active = self.vitality > 0.0 && self.integrity > 0.0 && self.stability > 0.0;
        let changed = active != self.active;
        self.active = active;
        changed
    }

    pub fn record(&mut self, entry: AuditEntry) {
        self.audit.push(entry);
    }

    pub fn snapshot(&self) -> ConditionSnapshot {
        ConditionSnapshot::from(self)
    }
}

/// Read-only copy of the condition for status reporting and telemetry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionSnapshot {
    pub vitality: f32,
    pub integrity: f32,
    pub stability: f32,
    pub age_secs: f64,
    pub tick_count: u64,
    pub active: bool,
    pub audit: Vec<AuditEntry>,
    pub activated_memory: Vec<AuditEntry>,
    pub last_pattern: Option<ReactionPattern>,
    pub last_updated: DateTime<Utc>,
}

impl From<&Condition> for ConditionSnapshot {
    fn from(condition: &Condition) -> Self {
        Self {
            vitality: condition.vitality,
            integrity: condition.integrity,
            stability: condition.stability,
            age_secs: condition.age_secs,
            tick_count: condition.tick_count,
            active: condition.active,
            audit: condition.audit.iter().cloned().collect(),
            activated_memory: condition.activated_memory.clone(),
            last_pattern: condition.last_pattern,
            last_updated: condition.last_updated,
        }
    }
}

impl ConditionSnapshot {
    pub fn vitals(&self) -> Vitals {
        Vitals {
            vitality: self.vitality,
            integrity: self.integrity,
            stability: self.stability,
        }
    }
}
