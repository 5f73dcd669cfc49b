//! Error types for the dots and boxes crate

use thiserror::Error;

/// Main error type for the dots and boxes crate
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("invalid grid dimensions {width}x{height}: {reason}")]
    InvalidDimensions {
        width: usize,
        height: usize,
        reason: String,
    },

    #[error("invalid line number {line} supplied, valid interval is [0, {max}]")]
    LineOutOfRange { line: usize, max: usize },

    #[error("no available actions in state {state}")]
    NoAvailableActions { state: u64 },

    #[error("value table '{name}' not found")]
    TableNotFound { name: String },

    #[error(
        "value table '{name}' has {found_states} states x {found_actions} actions, expected {expected_states} x {expected_actions}"
    )]
    DimensionMismatch {
        name: String,
        expected_states: u64,
        expected_actions: usize,
        found_states: u64,
        found_actions: usize,
    },

    #[error("cannot allocate value table '{name}' with {states} states x {actions} actions")]
    OutOfResources {
        name: String,
        states: u64,
        actions: usize,
    },

    #[error("malformed value table '{name}': {reason}")]
    MalformedTable { name: String, reason: String },

    #[error("failed to {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("failed to {operation}: {message}")]
    SerializationContext { operation: String, message: String },

    #[error("invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    #[error("invalid policy spec '{spec}': {reason}")]
    InvalidPolicySpec { spec: String, reason: String },

    #[error("match aborted by policy '{policy}'")]
    Aborted { policy: String },

    #[error("match cancelled")]
    Cancelled,

    #[error("match '{label}' panicked")]
    MatchPanicked { label: String },

    #[error("progress bar template error: {message}")]
    ProgressBarTemplate { message: String },
}

impl Error {
    /// Storage errors after which the caller should create a fresh table.
    pub fn is_recoverable_storage(&self) -> bool {
        matches!(
            self,
            Error::TableNotFound { .. }
                | Error::DimensionMismatch { .. }
                | Error::MalformedTable { .. }
        )
    }

    /// True for the in-band abort and out-of-band cancellation signals.
    pub fn is_interruption(&self) -> bool {
        matches!(self, Error::Aborted { .. } | Error::Cancelled)
    }
}

/// Convenience type alias for Results using the crate's Error type
pub type Result<T> = std::result::Result<T, Error>;

impl From<std::io::Error> for Error {
    fn from(source: std::io::Error) -> Self {
        Error::Io {
            operation: "IO operation".to_string(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_storage_errors() {
        assert!(
            Error::TableNotFound {
                name: "q.dat".to_string()
            }
            .is_recoverable_storage()
        );
        assert!(
            !Error::OutOfResources {
                name: "q.dat".to_string(),
                states: 1,
                actions: 1,
            }
            .is_recoverable_storage()
        );
    }

    #[test]
    fn test_interruption_errors() {
        assert!(Error::Cancelled.is_interruption());
        assert!(
            Error::Aborted {
                policy: "Console".to_string()
            }
            .is_interruption()
        );
        assert!(!Error::NoAvailableActions { state: 0 }.is_interruption());
    }
}
