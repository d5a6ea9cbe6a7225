mod client;
mod signing;
mod webhook;

pub use client::{
    Customer, ProviderClient, SlipRequest, SlipTransaction, SlipType, TransactionResponse,
};
pub use signing::sign_values;
pub use webhook::{WebhookVerifier, SIGNATURE_HEADER};

use thiserror::Error;

/// Failure taxonomy for outbound provider calls.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Network-level failure reaching the provider (includes timeouts).
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Provider returned a structured (non-success) response.
    #[error("provider rejected request: {0}")]
    Api(String),

    /// Success status but a payload shape the protocol does not allow.
    #[error("protocol error: {0}")]
    Protocol(String),
}
