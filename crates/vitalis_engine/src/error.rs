use thiserror::Error;
use vitalis_core::CoreError;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Ingress after the scheduler has shut down.
    #[error("organism has stopped")]
    Stopped,

    #[error("tick body panicked: {0}")]
    Panicked(String),
}
