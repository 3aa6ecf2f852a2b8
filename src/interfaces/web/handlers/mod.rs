pub mod chain_schedules;
pub mod chains;
pub mod logs;
pub mod scenarios;
pub mod schedules;
pub mod system;

use crate::core::error::EngineError;

/// Unwraps a required request field or fails the request as invalid.
fn require<T>(value: Option<T>, field: &str) -> Result<T, EngineError> {
    value.ok_or_else(|| EngineError::InvalidRequest(format!("{field} is required")))
}
