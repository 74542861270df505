//! Judgment oracle adapter
//!
//! The natural-language judgment itself is an external capability: it
//! is invoked with structured instructions and a JSON payload, and
//! returns structured JSON or fails. Everything behind this seam is a
//! black box; the scoring engines only depend on the `Oracle` trait,
//! so tests run them against deterministic fakes.

mod http;
pub mod prompts;

pub use http::{HttpOracle, OracleSettings};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Oracle invocation errors
#[derive(Debug, Error)]
pub enum OracleError {
    /// Network-level failure (connect, TLS, transport)
    #[error("Network error: {0}")]
    Network(String),

    /// The oracle endpoint did not answer within the deadline
    #[error("Oracle timed out")]
    Timeout,

    /// Non-success HTTP status from the oracle endpoint
    #[error("Oracle API error {0}: {1}")]
    Api(u16, String),

    /// The response was not JSON, or did not match the expected shape
    #[error("Malformed oracle response: {0}")]
    SchemaMismatch(String),
}

/// Narrow capability interface for the external judgment oracle.
///
/// `instructions` describe the judgment to perform; `payload` carries
/// the structured inputs. The result is the oracle's parsed JSON
/// output, not yet validated against a response shape; call sites
/// validate with [`expect_shape`].
#[async_trait]
pub trait Oracle: Send + Sync {
    async fn invoke(
        &self,
        instructions: &str,
        payload: serde_json::Value,
    ) -> Result<serde_json::Value, OracleError>;
}

/// Validate an oracle response against one of the fixed response
/// shapes. Any deserialization failure counts as an oracle failure.
pub fn expect_shape<T: DeserializeOwned>(value: serde_json::Value) -> Result<T, OracleError> {
    serde_json::from_value(value).map_err(|e| OracleError::SchemaMismatch(e.to_string()))
}
