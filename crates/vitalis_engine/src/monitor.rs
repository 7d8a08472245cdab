//! Telemetry collaborator, called once per tick with a read-only snapshot.

use vitalis_core::ConditionSnapshot;

/// Observer invoked by the scheduler after every tick.
/// A failure is logged by the scheduler and never stops the tick.
pub trait Monitor: Send + Sync {
    fn observe(&self, snapshot: &ConditionSnapshot) -> anyhow::Result<()>;
}

/// Emits one structured `debug!` event per tick.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogMonitor;

impl Monitor for LogMonitor {
    fn observe(&self, snapshot: &ConditionSnapshot) -> anyhow::Result<()> {
        tracing::debug!(
            tick = snapshot.tick_count,
            vitality = snapshot.vitality,
            integrity = snapshot.integrity,
            stability = snapshot.stability,
            active = snapshot.active,
            audit_len = snapshot.audit.len(),
            last_pattern = ?snapshot.last_pattern,
            "tick"
        );
        Ok(())
    }
}

impl<F> Monitor for F
where
    F: Fn(&ConditionSnapshot) -> anyhow::Result<()> + Send + Sync,
{
    fn observe(&self, snapshot: &ConditionSnapshot) -> anyhow::Result<()> {
        self(snapshot)
    }
}
