//! Error types for the Drip client.
//!
//! # Design
//! Failures are tagged internally so tests and embedders can tell them
//! apart. The convenience operations on `DripClient` collapse every variant
//! into `None`; `execute` keeps the tag.

/// Failure of a single round trip at the transport layer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("network error: {0}")]
    Network(String),
}

/// A method name outside GET, POST, PUT, DELETE and PATCH.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported HTTP method: {0}")]
pub struct ParseMethodError(pub String);

/// Errors returned by `DripClient` operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// No endpoint is registered under this operation name.
    #[error("unknown operation: {0}")]
    UnknownOperation(String),

    /// A placeholder referenced by the operation's templates has no value.
    #[error("operation {operation} is missing required parameter {name}")]
    MissingParameter { operation: String, name: String },

    #[error(transparent)]
    Transport(#[from] TransportError),

    /// An endpoint table could not be parsed.
    #[error("invalid endpoint configuration: {0}")]
    Config(String),

    /// A required environment variable is absent.
    #[error("environment variable {0} is not set")]
    MissingEnv(&'static str),
}
