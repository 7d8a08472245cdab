//! Reaction selection and execution
//!
//! The selector is an override layer on top of the interpretation engine:
//! strongly activated memories force a cautious `Dampen`, otherwise the
//! engine's suggestion stands. It never invents a pattern of its own.
//!
//! The executor applies a pattern's direct side effects. The stimulus impact
//! itself has already been applied by the scheduler at that point.

use chrono::Utc;
use vitalis_core::{AuditEntry, Condition, Meaning, ReactionPattern};

#[derive(Debug, Clone)]
pub struct ReactionSelector {
    significance_floor: f32,
    activation_threshold: f32,
}

impl Default for ReactionSelector {
    fn default() -> Self {
        Self::new(0.1, 0.5)
    }
}

impl ReactionSelector {
    pub fn new(significance_floor: f32, activation_threshold: f32) -> Self {
        Self {
            significance_floor,
            activation_threshold,
        }
    }

    /// Decide the final pattern.
    ///
    /// `activated` is the memory subset activated for this stimulus. When no
    /// suggestion is supplied the pattern is re-derived from significance
    /// alone (`Ignore` below the floor, `Absorb` otherwise).
    pub fn select(
        &self,
        activated: &[AuditEntry],
        meaning: &Meaning,
        suggested: Option<ReactionPattern>,
    ) -> ReactionPattern {
        let peak = activated
            .iter()
            .map(|e| e.significance)
            .fold(f32::NEG_INFINITY, f32::max);

        if peak > self.activation_threshold {
            if suggested != Some(ReactionPattern::Dampen) {
                tracing::debug!(
                    "Activated memory ({:.2}) overrides {:?} with dampen",
                    peak,
                    suggested
                );
            }
            return ReactionPattern::Dampen;
        }

        match suggested {
            Some(pattern) => pattern,
            None if meaning.significance() < self.significance_floor => ReactionPattern::Ignore,
            None => ReactionPattern::Absorb,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReactionExecutor {
    dampen_vitality_cost: f32,
}

impl Default for ReactionExecutor {
    fn default() -> Self {
        Self::new(0.01)
    }
}

impl ReactionExecutor {
    pub fn new(dampen_vitality_cost: f32) -> Self {
        Self {
            dampen_vitality_cost: dampen_vitality_cost.max(0.0),
        }
    }

    /// Record the reaction and apply its direct cost, if any.
    pub fn execute(&self, pattern: ReactionPattern, condition: &mut Condition) {
        condition.record(AuditEntry::reaction(pattern, Utc::now()));
        condition.last_pattern = Some(pattern);

        match pattern {
            ReactionPattern::Dampen => condition.spend_vitality(self.dampen_vitality_cost),
            ReactionPattern::Ignore | ReactionPattern::Absorb | ReactionPattern::Amplify => {}
        }

        tracing::debug!("Executed reaction: {}", pattern);
    }

    /// Execute a pattern given by name. An unrecognized name is logged and
    /// leaves the condition untouched.
    pub fn execute_named(&self, name: &str, condition: &mut Condition) -> Option<ReactionPattern> {
        match name.parse::<ReactionPattern>() {
            Ok(pattern) => {
                self.execute(pattern, condition);
                Some(pattern)
            }
            Err(e) => {
                tracing::warn!("Skipping reaction: {}", e);
                None
            }
        }
    }
}
