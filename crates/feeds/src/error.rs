//! Feed error types.

use thiserror::Error;

/// Errors from external data sources.
#[derive(Error, Debug)]
pub enum FeedError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected response: {0}")]
    Parse(String),
    #[error("RPC error: {0}")]
    Rpc(String),
}
