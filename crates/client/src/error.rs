//! Client-side error type.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    /// Transport failure, including the page transport timeout.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server cancelled the statement; a narrower search may succeed.
    #[error("query timeout")]
    QueryTimeout,

    /// Any other non-success response.
    #[error("server error {status}: {message}")]
    Server { status: u16, message: String },

    /// The request was superseded or never issued.
    #[error("request cancelled")]
    Cancelled,

    /// The response body did not have the expected shape.
    #[error("malformed response: {0}")]
    Decode(String),
}
