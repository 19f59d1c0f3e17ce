//! Errors of the RPC client.
//!
//! These never leave the crate's public [`BitcoinRpc`](crate::traits::BitcoinRpc) methods, which
//! log them and degrade to "unknown".

use thiserror::Error;

/// Errors that can occur while talking to the Bitcoin node.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The HTTP client could not be set up or the request could not be sent.
    #[error("connection: {0}")]
    Connection(#[from] reqwest::Error),

    /// The node answered with a non-success status.
    #[error("http status {0}")]
    Status(u16),

    /// The node answered with a JSON-RPC error.
    #[error("rpc error {code}: {message}")]
    Rpc {
        /// The JSON-RPC error code.
        code: i64,
        /// The message returned by the node.
        message: String,
    },

    /// The response could not be decoded.
    #[error("could not parse response: {0}")]
    Parse(String),
}

/// Result type of the RPC client.
pub type ClientResult<T> = Result<T, ClientError>;
