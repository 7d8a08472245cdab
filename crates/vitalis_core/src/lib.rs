//! # Vitalis Core
//!
//! Data model of a single stateful organism:
//!
//! - **Stimulus**: one discrete environmental input (category + signed intensity)
//! - **Meaning**: what a stimulus signifies against the current condition
//! - **Condition**: bounded resource dimensions, counters and the audit trail
//! - **Audit trail**: bounded, append-only record of stimuli, reactions and
//!   delayed feedback
//!
//! The tick engine that drives these lives in `vitalis_engine`.

pub mod audit;
pub mod config;
mod error;
pub mod meaning;
pub mod state;
pub mod stimulus;

pub use audit::{AuditCategory, AuditEntry, AuditTrail, FeedbackCorrelation, AUDIT_CAPACITY};
pub use config::{
    EngineConfig, FeedbackConfig, HomeostasisConfig, InterpretationConfig, VitalisConfig,
};
pub use error::CoreError;
pub use meaning::{Meaning, ReactionPattern, StateDelta};
pub use state::{Condition, ConditionSnapshot, Vitals, VITALITY_MAX};
pub use stimulus::{Category, Stimulus};
