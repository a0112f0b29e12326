//! Error taxonomy for the optimization pipeline
//!
//! Collaborators report failures through [`OptimizeError`]. None of these
//! reach the presentation boundary: the controller absorbs each one where it
//! is detected and logs it.

use thiserror::Error;

/// Errors raised by collaborators and stores
#[derive(Debug, Error)]
pub enum OptimizeError {
    /// Stored config could not be read; recovered by writing defaults
    #[error("Failed to load config: {0}")]
    ConfigLoad(String),

    /// Account discovery failed; the cycle ends with an empty view
    #[error("Account query failed: {0}")]
    AccountQuery(String),

    /// Telemetry query for a single account failed
    #[error("Sample query failed for account {account_id}: {message}")]
    SampleQuery { account_id: i64, message: String },

    /// Pricing could not be fetched for a region
    #[error("Pricing fetch failed for region {region}: {message}")]
    PricingFetch { region: String, message: String },

    /// Pricing payload did not have the expected shape
    #[error("Malformed pricing payload: {0}")]
    PricingParse(String),

    /// Document store failure
    #[error("Store error: {0}")]
    Store(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl OptimizeError {
    /// Short machine-readable kind, used as a log field and metric label
    pub fn kind(&self) -> &'static str {
        match self {
            OptimizeError::ConfigLoad(_) => "config_load",
            OptimizeError::AccountQuery(_) => "account_query",
            OptimizeError::SampleQuery { .. } => "sample_query",
            OptimizeError::PricingFetch { .. } => "pricing_fetch",
            OptimizeError::PricingParse(_) => "pricing_parse",
            OptimizeError::Store(_) => "store",
            OptimizeError::Io(_) => "io",
            OptimizeError::Json(_) => "json",
        }
    }
}

pub type Result<T> = std::result::Result<T, OptimizeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = OptimizeError::SampleQuery {
            account_id: 42,
            message: "timeout".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Sample query failed for account 42: timeout"
        );
        assert_eq!(err.kind(), "sample_query");
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: OptimizeError = io.into();
        assert_eq!(err.kind(), "io");
    }
}
