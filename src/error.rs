//! Centralized error handling module
//!
//! Provides the error taxonomy shared by the simulation engine, the
//! reference-data loader and the JSONL feed writer.

use thiserror::Error;
use tracing::error;

/// Simulation-wide error types
#[derive(Error, Debug)]
pub enum SimError {
    /// Reference data is missing or inconsistent for an entity. Aborts the run.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A generated value fell outside its declared domain.
    #[error("Range violation: {0}")]
    RangeViolation(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SimError {
    /// Build a configuration error and log it with its entity context.
    pub fn configuration(entity: &str, id: u32, detail: impl Into<String>) -> Self {
        let detail = detail.into();
        error!(entity = entity, id = id, detail = %detail, "Reference data rejected");
        SimError::Configuration(format!("{} {}: {}", entity, id, detail))
    }
}

/// Result type alias for simulation errors
pub type SimResult<T> = Result<T, SimError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_error_message() {
        let error = SimError::configuration("device", 42, "not in fleet");
        assert_eq!(error.to_string(), "Configuration error: device 42: not in fleet");
        assert!(matches!(error, SimError::Configuration(_)));
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let error: SimError = io.into();
        assert!(matches!(error, SimError::Io(_)));
    }

    #[test]
    fn test_range_violation_message() {
        let error = SimError::RangeViolation("battery_level: 101".to_string());
        assert!(error.to_string().contains("battery_level"));
    }
}
