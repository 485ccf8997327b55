use crate::rpc::RpcError;
use thiserror::Error;

/// Failures surfaced by a [`crate::gateway::LedgerGateway`].
#[derive(Error, Debug, Clone)]
pub enum GatewayError {
    #[error("Transport failure: {0}")]
    Transport(String),

    #[error(transparent)]
    Rpc(#[from] RpcError),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl GatewayError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }
}

#[derive(Error, Debug, Clone)]
pub enum AggregateError {
    #[error("Fetching block {block_number} failed: {source}")]
    FetchFailed {
        block_number: u64,
        #[source]
        source: GatewayError,
    },
}

impl AggregateError {
    pub fn fetch_failed(block_number: u64, source: GatewayError) -> Self {
        Self::FetchFailed {
            block_number,
            source,
        }
    }
}

#[derive(Error, Debug)]
pub enum RunError {
    #[error("Invalid run request: {message}")]
    InvalidRunRequest { message: String },

    #[error("Reset is only allowed while no run is in progress")]
    ResetWhileRunning,

    #[error("Resolving the latest block failed: {0}")]
    LatestBlock(#[source] GatewayError),
}

impl RunError {
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRunRequest {
            message: message.into(),
        }
    }
}
