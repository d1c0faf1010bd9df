//! Error types for the fee pipeline. None of these escape a poller tick or a
//! price refresh; they are logged and turned into "no update" or a fallback.
use thiserror::Error;

use crate::network::Network;

/// A raw upstream response could not be turned into a fee snapshot.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NormalizationError {
    #[error("{network}: response is missing `{field}`")]
    MissingField {
        network: Network,
        field: &'static str,
    },

    #[error("{network}: response shape does not match the network's fee source")]
    UnexpectedShape { network: Network },

    #[error("{network}: `{field}` does not fit in 128 bits")]
    OutOfRange {
        network: Network,
        field: &'static str,
    },
}

/// Fetching fee data from a network's upstream failed.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("unexpected response: {0}")]
    DataShape(String),
}

impl From<alloy::transports::TransportError> for FetchError {
    fn from(err: alloy::transports::TransportError) -> Self {
        FetchError::Transport(err.to_string())
    }
}

impl From<alloy::contract::Error> for FetchError {
    fn from(err: alloy::contract::Error) -> Self {
        match err {
            alloy::contract::Error::TransportError(e) => FetchError::Transport(e.to_string()),
            other => FetchError::DataShape(other.to_string()),
        }
    }
}

/// Fetching the reference price failed. Always absorbed into a fallback.
#[derive(Error, Debug)]
pub enum PriceError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("http status {0}")]
    Status(u16),

    #[error("price field missing from response")]
    DataShape,

    #[error("unusable price value {0}")]
    Value(f64),
}
