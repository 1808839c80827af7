//! Server error types

use thiserror::Error;

/// Errors that can occur while running the feed server.
///
/// "Not found" outcomes of `REMOVE` and `CONTAINS` are not errors; they are
/// reported as `success: false` in the response.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ServerError {
    /// The request stream contained input that could not be decoded.
    ///
    /// The protocol defines no recovery for this, so the dispatcher stops
    /// accepting requests once it is seen.
    #[error("malformed request at line {line}, column {column}: {message}")]
    Decode {
        /// Underlying decoder message
        message: String,
        /// Line of the offending input (1-based, 0 when unknown)
        line: usize,
        /// Column of the offending input (1-based, 0 when unknown)
        column: usize,
    },

    /// A response could not be encoded onto the sink.
    #[error("failed to encode response: {message}")]
    Encode {
        /// Underlying encoder message
        message: String,
    },

    /// An I/O error on the request source or the response sink.
    #[error("server I/O error: {message}")]
    Io {
        /// Underlying I/O error message
        message: String,
    },

    /// The server configuration cannot be run.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// Description of the problem
        message: String,
    },

    /// A consumer thread panicked while processing requests.
    #[error("consumer {worker} panicked")]
    WorkerPanicked {
        /// Index of the consumer that panicked
        worker: usize,
    },
}

impl From<std::io::Error> for ServerError {
    #[cold]
    fn from(err: std::io::Error) -> Self {
        ServerError::Io {
            message: err.to_string(),
        }
    }
}
