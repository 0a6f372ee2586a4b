//! Error handling and custom error types
//!
//! Provides unified error handling for the speaker client and probes using
//! thiserror. The image sniffer has no error states and never returns these.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Speaker API error: {0}")]
    Speaker(String),

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Transport, IO and HTTP status failures: the speaker could not be
    /// queried, as opposed to answering with something unparseable.
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Error::Io(_) | Error::Http(_) | Error::Speaker(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
