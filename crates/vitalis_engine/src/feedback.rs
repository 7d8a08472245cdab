//! Feedback Correlator - attributing delayed consequences to past reactions
//!
//! Consequences of a reaction rarely show up on the same tick. Each reaction is
//! registered with the vitals captured just before it, and a check-after delay
//! drawn once at registration. Per pending reaction:
//!
//! ```text
//! Registered --(ticks_waited > max_wait)----------------------> Discarded-Timeout
//!     |
//!     +--(ticks_waited >= check_after)--> Evaluated --(|Δ| > noise)--> Emitted
//!                                              |
//!                                              +--(otherwise)-------> Discarded-NoSignal
//! ```
//!
//! Every terminal transition removes the entry, so a reaction yields at most
//! one correlation.

use chrono::{DateTime, Utc};
use rand::Rng;
use std::collections::BTreeMap;
use uuid::Uuid;
use vitalis_core::{FeedbackConfig, FeedbackCorrelation, ReactionPattern, Vitals};

/// Stimuli remembered per pending reaction
const MAX_ASSOCIATED_STIMULI: usize = 32;

/// Source of check-after delays, in ticks.
pub type DelayFn = Box<dyn FnMut() -> u32 + Send>;

/// Uniform delay in `[min, max]` ticks.
pub fn uniform_delay(min: u32, max: u32) -> DelayFn {
    let (lo, hi) = (min, max.max(min));
    Box::new(move || rand::thread_rng().gen_range(lo..=hi))
}

#[derive(Debug, Clone, PartialEq)]
pub struct PendingReaction {
    pub id: u64,
    pub pattern: ReactionPattern,
    pub before: Vitals,
    pub registered_at: DateTime<Utc>,
    pub check_after_ticks: u32,
    pub ticks_waited: u32,
    pub associated_stimuli: Vec<Uuid>,
}

/// Outcome of one correlator pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CorrelationPass {
    pub emitted: Vec<FeedbackCorrelation>,
    pub no_signal: usize,
    pub timed_out: usize,
}

pub struct FeedbackCorrelator {
    pending: BTreeMap<u64, PendingReaction>,
    next_id: u64,
    delay: DelayFn,
    max_wait_ticks: u32,
    noise_threshold: f32,
}

impl FeedbackCorrelator {
    pub fn new(config: &FeedbackConfig) -> Self {
        Self::with_delay(
            config,
            uniform_delay(config.min_delay_ticks, config.max_delay_ticks),
        )
    }

    /// Use a custom delay source (fixed delays in tests).
    pub fn with_delay(config: &FeedbackConfig, delay: DelayFn) -> Self {
        Self {
            pending: BTreeMap::new(),
            next_id: 1,
            delay,
            max_wait_ticks: config.max_wait_ticks,
            noise_threshold: config.noise_threshold,
        }
    }

    /// Start tracking a reaction. Returns its identifier.
    pub fn register(&mut self, pattern: ReactionPattern, before: Vitals) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        let check_after_ticks = (self.delay)();

        self.pending.insert(
            id,
            PendingReaction {
                id,
                pattern,
                before,
                registered_at: Utc::now(),
                check_after_ticks,
                ticks_waited: 0,
                associated_stimuli: Vec::new(),
            },
        );

        tracing::debug!(
            "Registered reaction #{} ({}), check after {} ticks",
            id,
            pattern,
            check_after_ticks
        );
        id
    }

    /// Note a stimulus processed while reactions are pending.
    pub fn observe_stimulus(&mut self, stimulus: Uuid) {
        for pending in self.pending.values_mut() {
            if pending.associated_stimuli.len() < MAX_ASSOCIATED_STIMULI {
                pending.associated_stimuli.push(stimulus);
            }
        }
    }

    /// Advance every pending reaction by one tick and resolve the ripe ones
    /// against `now`.
    pub fn tick(&mut self, now: &Vitals) -> CorrelationPass {
        let mut pass = CorrelationPass::default();
        let timestamp = Utc::now();

        let max_wait = self.max_wait_ticks;
        let noise = self.noise_threshold;

        self.pending.retain(|id, pending| {
            pending.ticks_waited += 1;

            if pending.ticks_waited > max_wait {
                tracing::debug!(
                    "Reaction #{} timed out after {} ticks",
                    id,
                    pending.ticks_waited
                );
                pass.timed_out += 1;
                return false;
            }

            if pending.ticks_waited < pending.check_after_ticks {
                return true;
            }

            let delta = now.delta_since(&pending.before);
            if delta.exceeds(noise) {
                pass.emitted.push(FeedbackCorrelation {
                    reaction_id: *id,
                    pattern: pending.pattern,
                    state_delta: delta,
                    timestamp,
                    delay_ticks: pending.ticks_waited,
                    associated_stimuli: std::mem::take(&mut pending.associated_stimuli),
                });
            } else {
                pass.no_signal += 1;
            }
            false
        });

        pass
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_pending(&self, id: u64) -> bool {
        self.pending.contains_key(&id)
    }

    pub fn pending(&self, id: u64) -> Option<&PendingReaction> {
        self.pending.get(&id)
    }
}

impl std::fmt::Debug for FeedbackCorrelator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedbackCorrelator")
            .field("pending", &self.pending.len())
            .field("next_id", &self.next_id)
            .field("max_wait_ticks", &self.max_wait_ticks)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vitals(vitality: f32) -> Vitals {
        Vitals { vitality, integrity: 0.5, stability: 0.5 }
    }

    fn fixed(ticks: u32) -> FeedbackCorrelator {
        FeedbackCorrelator::with_delay(&FeedbackConfig::default(), Box::new(move || ticks))
    }

    #[test]
    fn test_emits_on_next_tick_with_exact_delta() {
        let mut correlator = fixed(1);
        let id = correlator.register(ReactionPattern::Absorb, vitals(50.0));

        let pass = correlator.tick(&vitals(49.0));
        assert_eq!(pass.emitted.len(), 1);
        let c = &pass.emitted[0];
        assert_eq!(c.reaction_id, id);
        assert_eq!(c.state_delta.vitality, -1.0);
        assert_eq!(c.state_delta.integrity, 0.0);
        assert_eq!(c.delay_ticks, 1);
        assert!(!correlator.is_pending(id));
    }

    #[test]
    fn test_waits_until_check_after() {
        let mut correlator = fixed(3);
        let id = correlator.register(ReactionPattern::Dampen, vitals(50.0));
        assert!(correlator.tick(&vitals(40.0)).emitted.is_empty());
        assert!(correlator.tick(&vitals(40.0)).emitted.is_empty());
        assert_eq!(correlator.pending(id).unwrap().ticks_waited, 2);
        let pass = correlator.tick(&vitals(40.0));
        assert_eq!(pass.emitted[0].delay_ticks, 3);
        assert_eq!(pass.emitted[0].state_delta.vitality, -10.0);
    }

    #[test]
    fn test_no_signal_is_discarded() {
        let mut correlator = fixed(1);
        correlator.register(ReactionPattern::Absorb, vitals(50.0));
        let pass = correlator.tick(&Vitals { vitality: 50.0005, integrity: 0.5, stability: 0.5 });
        assert!(pass.emitted.is_empty());
        assert_eq!(pass.no_signal, 1);
        assert_eq!(correlator.pending_len(), 0);
    }

    #[test]
    fn test_timeout_never_emits() {
        let mut correlator = fixed(25);
        let id = correlator.register(ReactionPattern::Amplify, vitals(50.0));
        for _ in 0..20 {
            let pass = correlator.tick(&vitals(10.0));
            assert!(pass.emitted.is_empty());
        }
        assert!(correlator.is_pending(id));
        let pass = correlator.tick(&vitals(10.0));
        assert!(pass.emitted.is_empty());
        assert_eq!(pass.timed_out, 1);
        assert!(!correlator.is_pending(id));
        // nothing left to emit later either
        assert_eq!(correlator.tick(&vitals(0.0)), CorrelationPass::default());
    }

    #[test]
    fn test_identifiers_are_unique() {
        let mut correlator = fixed(5);
        let ids: Vec<u64> = (0..10)
            .map(|_| correlator.register(ReactionPattern::Absorb, vitals(50.0)))
            .collect();
        let mut unique = ids.clone();
        unique.dedup();
        assert_eq!(unique.len(), 10);
        assert_eq!(correlator.pending_len(), 10);
    }

    #[test]
    fn test_associated_stimuli_are_reported() {
        let mut correlator = fixed(2);
        correlator.register(ReactionPattern::Absorb, vitals(50.0));
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        correlator.observe_stimulus(a);
        correlator.tick(&vitals(50.0));
        correlator.observe_stimulus(b);
        let pass = correlator.tick(&vitals(45.0));
        assert_eq!(pass.emitted[0].associated_stimuli, vec![a, b]);
    }

    #[test]
    fn test_uniform_delay_stays_in_window() {
        let mut delay = uniform_delay(3, 10);
        for _ in 0..200 {
            let d = delay();
            assert!((3..=10).contains(&d));
        }
    }
}
