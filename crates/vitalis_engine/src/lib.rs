//! # Vitalis Engine
//!
//! The concurrent tick engine driving a single organism.
//!
//! ## Architecture
//!
//! Producers push stimuli into a bounded queue; one scheduler task owns the
//! condition and, once per tick:
//! 1. correlates delayed consequences of earlier reactions
//! 2. drains the queue and runs every stimulus through
//!    interpretation → reaction selection → reaction execution
//! 3. degrades the condition while it is depleted
//! 4. publishes a snapshot, notifies the monitor and persists periodically
//!
//! Readers only ever see `ConditionSnapshot`s published after a tick.

mod error;
pub mod feedback;
pub mod interpretation;
mod monitor;
mod organism;
pub mod persistence;
pub mod queue;
pub mod reaction;
mod scheduler;

pub use error::EngineError;
pub use feedback::{uniform_delay, CorrelationPass, DelayFn, FeedbackCorrelator, PendingReaction};
pub use interpretation::{Interpretation, InterpretationEngine};
pub use monitor::{LogMonitor, Monitor};
pub use organism::{Organism, OrganismBuilder};
pub use persistence::{JsonSnapshotStore, SnapshotStore};
pub use queue::{stimulus_queue, StimulusReceiver, StimulusSender, DEFAULT_QUEUE_CAPACITY};
pub use reaction::{ReactionExecutor, ReactionSelector};
pub use scheduler::{Scheduler, TickReport};
