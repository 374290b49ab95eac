use thiserror::Error;

use crate::domain::{DomainError, OrderId, PairKey, VenueId};

/// Configuration-related errors with structured variants.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),
}

/// Failures reported by a venue client.
#[derive(Error, Debug, Clone)]
pub enum VenueError {
    #[error("{venue}: transport failure during {operation}: {reason}")]
    Transport {
        venue: VenueId,
        operation: &'static str,
        reason: String,
    },

    #[error("{venue}: malformed response to {operation}: {reason}")]
    Parse {
        venue: VenueId,
        operation: &'static str,
        reason: String,
    },

    #[error("{venue}: order rejected: {reason}")]
    Rejected { venue: VenueId, reason: String },

    #[error("{venue}: unknown order {order_id}")]
    UnknownOrder { venue: VenueId, order_id: OrderId },

    #[error("unknown venue {0}")]
    UnknownVenue(VenueId),

    #[error("{0}: venue is not active")]
    Inactive(VenueId),
}

/// Loop execution errors.
#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("loop {route} is not executable at scale {scale}")]
    NotExecutable {
        route: String,
        scale: rust_decimal::Decimal,
    },

    #[error("hop {hop} on {pair} failed: {source}")]
    HopFailed {
        hop: usize,
        pair: String,
        #[source]
        source: Box<Error>,
    },
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Venue(#[from] VenueError),

    #[error(transparent)]
    Execution(#[from] ExecutionError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unknown pair {0}")]
    UnknownPair(PairKey),

    #[error("unknown fishing instance {0}")]
    UnknownFishing(u64),

    /// A blocking worker panicked or was aborted.
    #[error("worker failed: {0}")]
    Worker(String),

    /// The owner context has stopped and can no longer serve requests.
    #[error("market owner has shut down")]
    OwnerGone,

    /// A fishing instance was switched off while waiting on a venue.
    #[error("fishing instance switched off")]
    Interrupted,

    /// Cooperative cancellation. Never a failure in its own right.
    #[error("cancelled")]
    Cancelled,
}

impl Error {
    /// Whether this error is cooperative cancellation rather than a failure.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        match self {
            Self::Cancelled => true,
            Self::Execution(ExecutionError::HopFailed { source, .. }) => source.is_cancelled(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancellation_is_recognized_through_hop_failures() {
        let err = Error::Execution(ExecutionError::HopFailed {
            hop: 1,
            pair: "X/Y@alpha".into(),
            source: Box::new(Error::Cancelled),
        });
        assert!(err.is_cancelled());
        assert!(!Error::OwnerGone.is_cancelled());
    }

    #[test]
    fn venue_error_message_names_venue_and_operation() {
        let err = VenueError::Transport {
            venue: VenueId::new("alpha"),
            operation: "fetch_balances",
            reason: "timeout".into(),
        };
        assert_eq!(
            err.to_string(),
            "alpha: transport failure during fetch_balances: timeout"
        );
    }
}
