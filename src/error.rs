// src/error.rs

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can abort a run. Nothing here is retried.
#[derive(Debug, Error)]
pub enum Error {
    /// Network, TLS or auth failure while talking to the reporting service.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The reporting service answered with a non-success status.
    #[error("reporting service returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    /// The response did not have the shape we expect.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Any warehouse-side failure while staging or swapping a table.
    #[error("loading {destination} failed: {source}")]
    Load {
        destination: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("invalid trigger: {0}")]
    InvalidTrigger(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl Error {
    pub fn malformed(msg: impl Into<String>) -> Self {
        Error::MalformedResponse(msg.into())
    }

    pub fn load<E>(destination: impl ToString, source: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Error::Load {
            destination: destination.to_string(),
            source: source.into(),
        }
    }
}
