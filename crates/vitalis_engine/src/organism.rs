//! Organism handle - the running engine as seen by collaborators
//!
//! Spawns the scheduler as a background task and exposes the boundary
//! operations: stimulus ingress, condition snapshots (snapshot-on-read via a
//! watch channel, so readers never touch the live condition) and a
//! cooperative stop.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use vitalis_core::{Condition, ConditionSnapshot, Stimulus, VitalisConfig};

use crate::error::EngineError;
use crate::feedback::{DelayFn, FeedbackCorrelator};
use crate::monitor::{LogMonitor, Monitor};
use crate::persistence::SnapshotStore;
use crate::queue::{stimulus_queue, StimulusSender};
use crate::scheduler::Scheduler;

pub struct OrganismBuilder {
    config: VitalisConfig,
    condition: Condition,
    monitor: Arc<dyn Monitor>,
    store: Option<Arc<dyn SnapshotStore>>,
    delay: Option<DelayFn>,
}

impl OrganismBuilder {
    /// Start from a recovered condition instead of the default one.
    pub fn condition(mut self, condition: Condition) -> Self {
        self.condition = condition;
        self
    }

    pub fn monitor(mut self, monitor: Arc<dyn Monitor>) -> Self {
        self.monitor = monitor;
        self
    }

    pub fn store(mut self, store: Arc<dyn SnapshotStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Override the feedback check-after delay source.
    pub fn delay_fn(mut self, delay: DelayFn) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Spawn the scheduler task. Must be called inside a tokio runtime.
    pub fn spawn(self) -> Organism {
        let (sender, receiver) = stimulus_queue(self.config.engine.queue_capacity);
        let (snapshot_tx, snapshot_rx) = watch::channel(self.condition.snapshot());
        let (stop_tx, stop_rx) = watch::channel(false);

        let correlator = match self.delay {
            Some(delay) => FeedbackCorrelator::with_delay(&self.config.feedback, delay),
            None => FeedbackCorrelator::new(&self.config.feedback),
        };

        let mut scheduler = Scheduler::new(self.config, self.condition, receiver, snapshot_tx)
            .with_monitor(self.monitor)
            .with_correlator(correlator);
        if let Some(store) = self.store {
            scheduler = scheduler.with_store(store);
        }

        let handle = tokio::spawn(scheduler.run(stop_rx));

        Organism {
            sender,
            snapshot_rx,
            stop_tx,
            handle,
        }
    }
}

pub struct Organism {
    sender: StimulusSender,
    snapshot_rx: watch::Receiver<ConditionSnapshot>,
    stop_tx: watch::Sender<bool>,
    handle: JoinHandle<Condition>,
}

impl Organism {
    pub fn builder(config: VitalisConfig) -> OrganismBuilder {
        OrganismBuilder {
            config,
            condition: Condition::default(),
            monitor: Arc::new(LogMonitor),
            store: None,
            delay: None,
        }
    }

    /// Spawn with the default condition and collaborators.
    pub fn spawn(config: VitalisConfig) -> Self {
        Self::builder(config).spawn()
    }

    /// Ingress: validate raw fields and queue the stimulus.
    pub fn submit_stimulus(
        &self,
        category: &str,
        intensity: Option<f32>,
        occurred_at: Option<DateTime<Utc>>,
        metadata: HashMap<String, serde_json::Value>,
    ) -> Result<(), EngineError> {
        self.sender
            .submit_stimulus(category, intensity, occurred_at, metadata)
    }

    /// Queue an already-built stimulus. Dropped silently when the queue is full.
    pub fn submit(&self, stimulus: Stimulus) -> Result<(), EngineError> {
        if self.sender.is_closed() {
            return Err(EngineError::Stopped);
        }
        self.sender.push(stimulus);
        Ok(())
    }

    /// Producer handle for other threads or tasks.
    pub fn sender(&self) -> StimulusSender {
        self.sender.clone()
    }

    /// Copy of the condition as of the last completed tick.
    pub fn snapshot_condition(&self) -> ConditionSnapshot {
        self.snapshot_rx.borrow().clone()
    }

    /// Receiver notified after every tick.
    pub fn subscribe(&self) -> watch::Receiver<ConditionSnapshot> {
        self.snapshot_rx.clone()
    }

    /// Signal the scheduler to stop after its current tick and wait for it.
    pub async fn stop(self) -> anyhow::Result<Condition> {
        let _ = self.stop_tx.send(true);
        let condition = self
            .handle
            .await
            .map_err(|e| anyhow::anyhow!("Scheduler task failed: {}", e))?;
        Ok(condition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use vitalis_core::{AuditCategory, Category};

    fn fast_config() -> VitalisConfig {
        let mut config = VitalisConfig::default();
        config.engine.tick_interval_ms = 10;
        config.engine.snapshot_every_ticks = 0;
        config
    }

    #[tokio::test(start_paused = true)]
    async fn test_submitted_stimulus_shows_up_in_snapshot() {
        let organism = Organism::spawn(fast_config());
        let mut rx = organism.subscribe();

        organism
            .submit_stimulus("shock", Some(1.0), None, HashMap::new())
            .unwrap();

        // wait for a tick that has processed it
        loop {
            rx.changed().await.unwrap();
            if !rx.borrow().audit.is_empty() {
                break;
            }
        }

        let snapshot = organism.snapshot_condition();
        assert!(snapshot.vitality < 100.0);
        assert!(snapshot
            .audit
            .iter()
            .any(|e| e.category == AuditCategory::Stimulus(Category::Shock)));

        let condition = organism.stop().await.unwrap();
        assert!(condition.tick_count >= 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_producers_on_other_threads() {
        let organism = Organism::builder(fast_config())
            .delay_fn(Box::new(|| 3))
            .spawn();

        let handles: Vec<_> = (0..3)
            .map(|_| {
                let sender = organism.sender();
                std::thread::spawn(move || {
                    for _ in 0..5 {
                        sender.push(Stimulus::new(Category::Recovery, 0.5));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        tokio::time::sleep(Duration::from_millis(50)).await;
        let condition = organism.stop().await.unwrap();
        let stimuli = condition
            .audit
            .iter()
            .filter(|e| e.category == AuditCategory::Stimulus(Category::Recovery))
            .count();
        assert_eq!(stimuli, 15);
    }

    #[tokio::test(start_paused = true)]
    async fn test_ingress_rejects_malformed_input() {
        let organism = Organism::spawn(fast_config());
        assert!(organism
            .submit_stimulus("", Some(0.5), None, HashMap::new())
            .is_err());
        assert!(organism
            .submit_stimulus("meteor", Some(0.5), None, HashMap::new())
            .is_err());
        organism.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_recovered_condition_is_the_starting_point() {
        let mut recovered = Condition::default();
        recovered.tick_count = 41;
        recovered.vitality = 12.0;
        let organism = Organism::builder(fast_config())
            .condition(recovered)
            .spawn();
        assert_eq!(organism.snapshot_condition().tick_count, 41);
        let condition = organism.stop().await.unwrap();
        assert!(condition.tick_count >= 41);
    }
}
