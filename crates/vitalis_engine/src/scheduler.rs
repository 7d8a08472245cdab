//! Scheduler - the tick loop
//!
//! The scheduler is the sole writer of the `Condition`. Once per tick it:
//! 1. advances age by the measured wall-clock delta
//! 2. runs the feedback correlator and folds emitted correlations into the audit trail
//! 3. drains the stimulus queue and runs each stimulus through
//!    interpret → select → (apply impact, execute, register, audit)
//! 4. degrades the condition while any dimension is depleted
//! 5. publishes a snapshot, calls the monitor and persists every N ticks
//! 6. sleeps for the remainder of the tick interval
//!
//! Steps 1-4 form the tick body. A failing or panicking tick body costs
//! integrity and the loop moves on; monitor and persistence failures are
//! only logged. Nothing but the stop signal ends the loop.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::time::Instant;
use vitalis_core::{AuditEntry, Condition, ConditionSnapshot, ReactionPattern, VitalisConfig};

use crate::error::EngineError;
use crate::feedback::FeedbackCorrelator;
use crate::interpretation::InterpretationEngine;
use crate::monitor::{LogMonitor, Monitor};
use crate::persistence::SnapshotStore;
use crate::queue::StimulusReceiver;
use crate::reaction::{ReactionExecutor, ReactionSelector};

/// What one tick body did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub tick: u64,
    pub drained: usize,
    pub ignored: usize,
    pub reacted: usize,
    pub correlations_emitted: usize,
    pub discarded_no_signal: usize,
    pub discarded_timeout: usize,
    pub degraded: bool,
}

pub struct Scheduler {
    condition: Condition,
    receiver: StimulusReceiver,
    engine: InterpretationEngine,
    selector: ReactionSelector,
    executor: ReactionExecutor,
    correlator: FeedbackCorrelator,
    config: VitalisConfig,
    monitor: Arc<dyn Monitor>,
    store: Option<Arc<dyn SnapshotStore>>,
    snapshot_tx: watch::Sender<ConditionSnapshot>,
}

impl Scheduler {
    pub fn new(
        config: VitalisConfig,
        condition: Condition,
        receiver: StimulusReceiver,
        snapshot_tx: watch::Sender<ConditionSnapshot>,
    ) -> Self {
        let mut condition = condition;
        condition.normalize();

        Self {
            engine: InterpretationEngine::new(config.interpretation.significance_floor),
            selector: ReactionSelector::new(
                config.interpretation.significance_floor,
                config.homeostasis.activation_threshold,
            ),
            executor: ReactionExecutor::new(config.homeostasis.dampen_vitality_cost),
            correlator: FeedbackCorrelator::new(&config.feedback),
            condition,
            receiver,
            config,
            monitor: Arc::new(LogMonitor),
            store: None,
            snapshot_tx,
        }
    }

    pub fn with_monitor(mut self, monitor: Arc<dyn Monitor>) -> Self {
        self.monitor = monitor;
        self
    }

    pub fn with_store(mut self, store: Arc<dyn SnapshotStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_correlator(mut self, correlator: FeedbackCorrelator) -> Self {
        self.correlator = correlator;
        self
    }

    pub fn condition(&self) -> &Condition {
        &self.condition
    }

    pub fn correlator(&self) -> &FeedbackCorrelator {
        &self.correlator
    }

    /// Steps 1-4 of a tick. Synchronous and free of I/O.
    pub fn tick_body(&mut self, dt: Duration) -> Result<TickReport, EngineError> {
        let dt_secs = dt.as_secs_f32();
        self.condition.age_secs += dt.as_secs_f64();
        self.condition.tick_count += 1;

        let mut report = TickReport {
            tick: self.condition.tick_count,
            ..TickReport::default()
        };

        // Delayed consequences of earlier reactions
        let pass = self.correlator.tick(&self.condition.vitals());
        report.correlations_emitted = pass.emitted.len();
        report.discarded_no_signal = pass.no_signal;
        report.discarded_timeout = pass.timed_out;
        for correlation in pass.emitted {
            tracing::debug!(
                "Feedback for reaction #{} ({}) after {} ticks: {:?}",
                correlation.reaction_id,
                correlation.pattern,
                correlation.delay_ticks,
                correlation.state_delta
            );
            self.condition.record(AuditEntry::feedback(correlation));
        }

        let stimuli = self.receiver.drain_all();
        report.drained = stimuli.len();

        for stimulus in stimuli {
            self.condition.activated_memory = self
                .condition
                .audit
                .activate(stimulus.category(), self.config.homeostasis.activation_top_n);

            let interpretation = self.engine.interpret(&stimulus, &self.condition.vitals())?;
            let mut meaning = interpretation.meaning;
            let pattern = self.selector.select(
                &self.condition.activated_memory,
                &meaning,
                Some(interpretation.suggested),
            );
            if pattern != interpretation.suggested {
                meaning.apply_pattern(pattern);
            }
            self.condition.last_pattern = Some(pattern);

            if pattern == ReactionPattern::Ignore {
                report.ignored += 1;
                continue;
            }

            let before = self.condition.vitals();
            self.correlator.observe_stimulus(stimulus.id());
            self.condition.apply(&meaning.impact());
            self.executor.execute(pattern, &mut self.condition);
            self.correlator.register(pattern, before);
            self.condition.record(AuditEntry::stimulus(
                stimulus.category(),
                meaning.significance(),
                Utc::now(),
            ));
            report.reacted += 1;
        }

        // Systemic weakening, independent of stimuli
        let homeostasis = &self.config.homeostasis;
        if self.condition.is_low_resource(homeostasis.low_resource_threshold) {
            self.condition.degrade(homeostasis.degradation_per_sec * dt_secs);
            report.degraded = true;
        }

        if self.condition.refresh_active() {
            if self.condition.active {
                tracing::info!("Condition recovered, organism active again");
            } else {
                tracing::warn!(
                    "Condition depleted (vitality={:.2}, integrity={:.3}, stability={:.3}), organism inactive",
                    self.condition.vitality,
                    self.condition.integrity,
                    self.condition.stability
                );
            }
        }

        Ok(report)
    }

    /// Run the tick body with failure containment.
    ///
    /// An error or a panic costs `tick_failure_penalty` integrity and is
    /// returned to the caller for logging; it never escapes further.
    pub fn contained_tick(&mut self, dt: Duration) -> Result<TickReport, EngineError> {
        let outcome = catch_unwind(AssertUnwindSafe(|| self.tick_body(dt)));
        let result = match outcome {
            Ok(result) => result,
            Err(panic) => Err(EngineError::Panicked(panic_message(panic.as_ref()))),
        };

        if let Err(e) = &result {
            let penalty = self.config.engine.tick_failure_penalty;
            self.condition.penalize_integrity(penalty);
            self.condition.refresh_active();
            tracing::error!(
                "Tick {} failed: {}. Integrity penalized by {:.2} to {:.3}",
                self.condition.tick_count,
                e,
                penalty,
                self.condition.integrity
            );
        }
        result
    }

    /// One full tick: contained body, then publish, monitor and persist.
    pub async fn run_tick(&mut self, dt: Duration) -> Option<TickReport> {
        let report = self.contained_tick(dt).ok();

        let snapshot = self.condition.snapshot();
        self.notify_monitor(&snapshot);
        // stored even when no reader is subscribed
        self.snapshot_tx.send_replace(snapshot);

        self.maybe_persist().await;

        if let Some(report) = &report {
            tracing::trace!("Tick report: {:?}", report);
        }
        report
    }

    /// Monitor errors and panics are logged and never reach the loop.
    fn notify_monitor(&self, snapshot: &ConditionSnapshot) {
        let monitor = &self.monitor;
        match catch_unwind(AssertUnwindSafe(|| monitor.observe(snapshot))) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::warn!("Monitor failed on tick {}: {:#}", snapshot.tick_count, e)
            }
            Err(panic) => tracing::warn!(
                "Monitor panicked on tick {}: {}",
                snapshot.tick_count,
                panic_message(panic.as_ref())
            ),
        }
    }

    async fn maybe_persist(&mut self) {
        let every = self.config.engine.snapshot_every_ticks;
        let Some(store) = &self.store else {
            return;
        };
        if every == 0 || self.condition.tick_count % every != 0 {
            return;
        }

        // bounded so a stuck disk cannot stall the loop indefinitely
        let budget = self.config.engine.tick_interval().max(Duration::from_secs(1));
        match tokio::time::timeout(budget, store.save(&self.condition)).await {
            Ok(Ok(path)) => tracing::debug!("Snapshot written to {}", path.display()),
            Ok(Err(e)) => tracing::warn!(
                "Snapshot at tick {} failed: {:#}",
                self.condition.tick_count,
                e
            ),
            Err(_) => tracing::warn!(
                "Snapshot at tick {} timed out after {:?}",
                self.condition.tick_count,
                budget
            ),
        }
    }

    /// Tick until `stop` turns true (or its sender is dropped), then hand
    /// back the final condition.
    pub async fn run(mut self, mut stop: watch::Receiver<bool>) -> Condition {
        let interval = self.config.engine.tick_interval();
        tracing::info!(
            "Scheduler running: tick interval {:?}, snapshot every {} ticks",
            interval,
            self.config.engine.snapshot_every_ticks
        );

        let mut last_tick = Instant::now();
        loop {
            if *stop.borrow() {
                break;
            }

            let started = Instant::now();
            let dt = started.duration_since(last_tick);
            last_tick = started;

            self.run_tick(dt).await;

            let remaining = interval.saturating_sub(started.elapsed());
            tokio::select! {
                _ = tokio::time::sleep(remaining) => {}
                changed = stop.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        tracing::info!("Scheduler stopped at tick {}", self.condition.tick_count);
        self.condition
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
