use thiserror::Error;

/// Error kinds surfaced by the orchestration engines. Variants are stable so
/// the web layer can map them to HTTP statuses.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("unknown scenario: {0}")]
    UnknownScenario(String),

    #[error("unknown chain: {0}")]
    UnknownChain(String),

    #[error("scenario is not active: {0}")]
    NotActive(String),

    #[error("{0} not found: {1}")]
    NotFound(&'static str, String),

    #[error("schedule is already enabled")]
    AlreadyEnabled,

    #[error("schedule is already disabled")]
    AlreadyDisabled,

    #[error("invalid cron expression: {0}")]
    InvalidCron(String),

    #[error("end date must not be earlier than start date")]
    InvalidDateRange,

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("chain has a running execution and cannot be deleted")]
    ActiveChainReferenced,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}
