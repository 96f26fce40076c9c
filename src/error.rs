use crate::types::RouteId;
use thiserror::Error;

/// A single log line that could not be decoded into a route point
#[derive(Error, Debug, Clone, PartialEq)]
#[error("line {line}: {reason}")]
pub struct ParseError {
    /// 1-based line number within the uploaded text
    pub line: usize,
    pub reason: String,
}

/// Upload failures reported to the caller
#[derive(Error, Debug)]
pub enum UploadError {
    #[error("No data provided")]
    NoPayload,

    #[error("No valid data to upload ({discarded} line(s) rejected)")]
    NoValidData { discarded: usize },

    #[error("Internal error: {0}")]
    Internal(#[from] StoreError),
}

/// Route store failures
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Route not found: {0}")]
    NotFound(RouteId),

    #[error("Invalid route id: {0:?}")]
    InvalidId(String),

    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Document encoding error: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("Store lock poisoned")]
    Poisoned,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GeometryError {
    #[error("Route has no points")]
    Empty,
}

/// Animator state machine violations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnimationError {
    #[error("Route has no points")]
    EmptyRoute,

    #[error("Invalid animation transition: {0}")]
    InvalidTransition(&'static str),
}

impl From<GeometryError> for AnimationError {
    fn from(err: GeometryError) -> Self {
        match err {
            GeometryError::Empty => AnimationError::EmptyRoute,
        }
    }
}

/// Failures talking to the route service
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Route not found: {0}")]
    NotFound(RouteId),

    #[error("Request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Failed to decode response: {0}")]
    Decode(String),
}

#[derive(Error, Debug)]
pub enum SerialError {
    #[error("Serial I/O error: {0}")]
    Io(#[from] std::io::Error),
}
