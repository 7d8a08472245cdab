//! Audit trail - the organism's bounded, append-only record of what happened.
//!
//! Entries are appended by the scheduler thread only. The trail keeps the most
//! recent `AUDIT_CAPACITY` entries; older entries are evicted front-first.

use crate::meaning::{ReactionPattern, StateDelta};
use crate::stimulus::Category;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use uuid::Uuid;

pub const AUDIT_CAPACITY: usize = 50;

/// What an audit entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum AuditCategory {
    /// An interpreted stimulus that changed the condition
    Stimulus(Category),
    /// A reaction applied by the executor
    Reaction(ReactionPattern),
    /// A delayed consequence attributed to an earlier reaction
    Feedback,
}

/// Measured, delayed state change attributed to one past reaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackCorrelation {
    pub reaction_id: u64,
    pub pattern: ReactionPattern,
    /// Condition now minus condition just before the reaction
    pub state_delta: StateDelta,
    pub timestamp: DateTime<Utc>,
    pub delay_ticks: u32,
    /// Stimuli processed while the reaction was pending
    pub associated_stimuli: Vec<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub category: AuditCategory,
    pub significance: f32,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation: Option<FeedbackCorrelation>,
}

impl AuditEntry {
    pub fn stimulus(category: Category, significance: f32, timestamp: DateTime<Utc>) -> Self {
        Self {
            category: AuditCategory::Stimulus(category),
            significance,
            timestamp,
            correlation: None,
        }
    }

    /// Reactions are recorded with zero significance.
    pub fn reaction(pattern: ReactionPattern, timestamp: DateTime<Utc>) -> Self {
        Self {
            category: AuditCategory::Reaction(pattern),
            significance: 0.0,
            timestamp,
            correlation: None,
        }
    }

    pub fn feedback(correlation: FeedbackCorrelation) -> Self {
        Self {
            category: AuditCategory::Feedback,
            significance: 0.0,
            timestamp: correlation.timestamp,
            correlation: Some(correlation),
        }
    }
}

/// Fixed-capacity ring of audit entries, oldest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditTrail {
    capacity: usize,
    entries: VecDeque<AuditEntry>,
}

impl Default for AuditTrail {
    fn default() -> Self {
        Self::with_capacity(AUDIT_CAPACITY)
    }
}

impl AuditTrail {
    /// Capacity is clamped to `1..=AUDIT_CAPACITY`.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.clamp(1, AUDIT_CAPACITY);
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    /// Append an entry, evicting the oldest one when full.
    pub fn push(&mut self, entry: AuditEntry) {
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = &AuditEntry> {
        self.entries.iter()
    }

    pub fn last(&self) -> Option<&AuditEntry> {
        self.entries.back()
    }

    /// Memory activation: the `n` highest-significance stimulus entries of
    /// `category`. Equal significances keep their insertion order.
    pub fn activate(&self, category: Category, n: usize) -> Vec<AuditEntry> {
        let mut matching: Vec<&AuditEntry> = self
            .entries
            .iter()
            .filter(|e| e.category == AuditCategory::Stimulus(category))
            .collect();
        // stable sort: ties stay in insertion order
        matching.sort_by(|a, b| b.significance.total_cmp(&a.significance));
        matching.into_iter().take(n).cloned().collect()
    }

    /// Post-deserialize repair: a stored capacity is never trusted beyond
    /// `AUDIT_CAPACITY`, then the oldest entries are trimmed.
    pub fn enforce_capacity(&mut self) {
        self.capacity = self.capacity.clamp(1, AUDIT_CAPACITY);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }
}
