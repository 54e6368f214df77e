use thiserror::Error;

use crate::status::Status;

/// Errors in framing or parsing wire messages.
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid request type: {0}")]
    InvalidRequestType(u32),

    #[error("Methylome name is not valid UTF-8")]
    NameNotUtf8,

    #[error("Request names no methylomes")]
    NoNames,

    #[error("Methylome names exceed header capacity")]
    NamesTooLong,

    #[error("Unknown status code: {0}")]
    UnknownStatus(u32),

    #[error("Query payload is not sorted by range start")]
    UnsortedQuery,

    #[error("Query range is backwards: [{start}, {stop})")]
    BackwardsRange { start: u32, stop: u32 },

    #[error("Payload truncated: expected {expected} bytes, found {found}")]
    PayloadTruncated { expected: usize, found: usize },
}

/// Errors surfaced by the query clients.
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("Server returned status: {0}")]
    Status(Status),

    #[error(transparent)]
    Index(#[from] methq_index::IndexError),

    #[error(transparent)]
    Methylome(#[from] methq_methylome::MethylomeError),
}

/// Errors that stop the server from starting or keep it from running.
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Index(#[from] methq_index::IndexError),

    #[error("Invalid configuration: {0}")]
    Config(String),
}
