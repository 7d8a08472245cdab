//! Stimulus Queue - bounded multi-producer / single-consumer buffer
//!
//! Producers hold cloneable `StimulusSender`s and never block: when the queue
//! is full the new stimulus is dropped (backpressure policy, not an error).
//! The scheduler owns the only `StimulusReceiver` and drains it once per tick.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::mpsc::{self, error::TryRecvError, error::TrySendError};
use vitalis_core::{Category, CoreError, Stimulus};

use crate::error::EngineError;

pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

/// Create a bounded stimulus queue.
pub fn stimulus_queue(capacity: usize) -> (StimulusSender, StimulusReceiver) {
    let capacity = capacity.max(1);
    let (tx, rx) = mpsc::channel(capacity);
    (StimulusSender { tx }, StimulusReceiver { rx, capacity })
}

/// Producer half. Cheap to clone; safe to use from any thread.
#[derive(Debug, Clone)]
pub struct StimulusSender {
    tx: mpsc::Sender<Stimulus>,
}

impl StimulusSender {
    /// Non-blocking push. Returns false when the stimulus was dropped
    /// because the queue is full or the scheduler is gone.
    pub fn push(&self, stimulus: Stimulus) -> bool {
        match self.tx.try_send(stimulus) {
            Ok(()) => true,
            Err(TrySendError::Full(dropped)) => {
                tracing::trace!(
                    "Stimulus queue full, dropping {} ({:.2})",
                    dropped.category(),
                    dropped.intensity()
                );
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }

    /// Ingress boundary: validate raw fields, then push.
    ///
    /// `intensity` defaults to 0.0 and `occurred_at` to now. A full queue is
    /// not reported; only malformed input and a stopped scheduler are.
    pub fn submit_stimulus(
        &self,
        category: &str,
        intensity: Option<f32>,
        occurred_at: Option<DateTime<Utc>>,
        metadata: HashMap<String, serde_json::Value>,
    ) -> Result<(), EngineError> {
        let stimulus = validate_stimulus(category, intensity, occurred_at, metadata)?;
        if self.tx.is_closed() {
            return Err(EngineError::Stopped);
        }
        self.push(stimulus);
        Ok(())
    }

    /// Advisory number of queued stimuli.
    pub fn size(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    pub fn capacity(&self) -> usize {
        self.tx.max_capacity()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Consumer half, owned by the scheduler.
#[derive(Debug)]
pub struct StimulusReceiver {
    rx: mpsc::Receiver<Stimulus>,
    capacity: usize,
}

impl StimulusReceiver {
    /// Remove and return every queued stimulus in FIFO order.
    ///
    /// At most `capacity` items are taken, so producers refilling the queue
    /// during the drain cannot keep the scheduler here forever.
    pub fn drain_all(&mut self) -> Vec<Stimulus> {
        let mut drained = Vec::new();
        for _ in 0..self.capacity {
            match self.rx.try_recv() {
                Ok(stimulus) => drained.push(stimulus),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        drained
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Turn raw ingress fields into a stimulus, rejecting malformed input.
pub fn validate_stimulus(
    category: &str,
    intensity: Option<f32>,
    occurred_at: Option<DateTime<Utc>>,
    metadata: HashMap<String, serde_json::Value>,
) -> Result<Stimulus, CoreError> {
    let category: Category = category.parse()?;
    Stimulus::try_new(
        category,
        intensity.unwrap_or(0.0),
        occurred_at.unwrap_or_else(Utc::now),
        metadata,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stim(i: usize) -> Stimulus {
        Stimulus::new(Category::Decay, 0.5).with_metadata("seq", serde_json::json!(i))
    }

    fn seq(s: &Stimulus) -> u64 {
        s.metadata()["seq"].as_u64().unwrap()
    }

    #[test]
    fn test_drain_returns_fifo_and_empties() {
        let (tx, mut rx) = stimulus_queue(10);
        for i in 0..5 {
            assert!(tx.push(stim(i)));
        }
        assert_eq!(tx.size(), 5);
        let drained: Vec<u64> = rx.drain_all().iter().map(seq).collect();
        assert_eq!(drained, vec![0, 1, 2, 3, 4]);
        assert!(tx.is_empty());
        assert!(rx.drain_all().is_empty());
    }

    #[test]
    fn test_overflow_drops_newest() {
        let (tx, mut rx) = stimulus_queue(3);
        let accepted: Vec<bool> = (0..6).map(|i| tx.push(stim(i))).collect();
        assert_eq!(accepted, vec![true, true, true, false, false, false]);
        assert_eq!(tx.size(), 3);
        let drained: Vec<u64> = rx.drain_all().iter().map(seq).collect();
        assert_eq!(drained, vec![0, 1, 2]);
        // room again after draining
        assert!(tx.push(stim(9)));
    }

    #[test]
    fn test_concurrent_producers_never_exceed_capacity() {
        let (tx, mut rx) = stimulus_queue(50);
        let handles: Vec<_> = (0..4)
            .map(|p| {
                let tx = tx.clone();
                std::thread::spawn(move || {
                    for i in 0..100 {
                        tx.push(stim(p * 1000 + i));
                        assert!(tx.size() <= 50);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        let drained = rx.drain_all();
        assert_eq!(drained.len(), 50);
        // each producer's accepted items stay in their push order
        for p in 0..4u64 {
            let mine: Vec<u64> = drained
                .iter()
                .map(seq)
                .filter(|s| s / 1000 == p)
                .collect();
            let mut sorted = mine.clone();
            sorted.sort_unstable();
            assert_eq!(mine, sorted);
        }
    }

    #[test]
    fn test_submit_validates_at_boundary() {
        let (tx, mut rx) = stimulus_queue(4);
        assert!(matches!(
            tx.submit_stimulus("", None, None, HashMap::new()),
            Err(EngineError::Core(CoreError::EmptyCategory))
        ));
        assert!(matches!(
            tx.submit_stimulus("hail", Some(0.3), None, HashMap::new()),
            Err(EngineError::Core(CoreError::UnknownCategory(_)))
        ));
        assert!(matches!(
            tx.submit_stimulus("shock", Some(f32::NAN), None, HashMap::new()),
            Err(EngineError::Core(CoreError::NonFiniteIntensity(_)))
        ));
        tx.submit_stimulus("recovery", None, None, HashMap::new()).unwrap();
        let drained = rx.drain_all();
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].category(), Category::Recovery);
        assert_eq!(drained[0].intensity(), 0.0);
    }

    #[test]
    fn test_full_queue_is_not_an_ingress_error() {
        let (tx, _rx) = stimulus_queue(1);
        tx.submit_stimulus("idle", Some(0.1), None, HashMap::new()).unwrap();
        assert!(tx.submit_stimulus("idle", Some(0.1), None, HashMap::new()).is_ok());
        assert_eq!(tx.size(), 1);
    }

    #[test]
    fn test_submit_after_receiver_dropped_reports_stopped() {
        let (tx, rx) = stimulus_queue(4);
        drop(rx);
        assert!(matches!(
            tx.submit_stimulus("idle", None, None, HashMap::new()),
            Err(EngineError::Stopped)
        ));
    }
}
