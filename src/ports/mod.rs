//! Ports Layer - Trait definitions for external dependencies
//!
//! Following hexagonal architecture, these traits abstract:
//! - Raw JSON-RPC transport (one HTTP POST against one endpoint)
//! - Typed chain reads used by the discovery pipeline
//! - Descriptive token metadata from an off-chain source

pub mod chain;
#[doc(hidden)]
pub mod mocks;
pub mod token_info;
pub mod transport;

use thiserror::Error;

pub use chain::{ChainReader, HolderAccount, SignatureInfo};
pub use token_info::{TokenInfoError, TokenInfoSource};
pub use transport::{HttpReply, RpcTransport, TransportError};

/// Terminal outcome of a logical RPC call
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RpcError {
    /// Non-retryable JSON-RPC error (method not found, invalid params)
    #[error("RPC rejected request ({code}): {message}")]
    Rejected { code: i64, message: String },

    /// Every endpoint failed for this call
    #[error("No RPC endpoint available for {method}")]
    NoEndpointAvailable { method: String },

    #[error("Failed to decode {method} response: {message}")]
    Decode { method: String, message: String },

    #[error("Deadline exceeded")]
    DeadlineExceeded,
}
