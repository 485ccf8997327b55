use crate::errors::GatewayError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A block header reduced to what the aggregation needs: its transaction hashes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerBlock {
    pub number: u64,
    pub transaction_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerTransaction {
    pub hash: String,
    pub gas_price_wei: u128,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerReceipt {
    pub hash: String,
    pub gas_used: u64,
}

/// Read access to a ledger.
///
/// Every call may fail with a transport or provider error; callers do not retry.
/// Retry, timeout and rate-limit policies belong in decorators implementing this
/// same trait around a concrete client.
#[async_trait]
pub trait LedgerGateway: Send + Sync {
    async fn get_latest_block_number(&self) -> Result<u64, GatewayError>;

    async fn get_block(&self, number: u64) -> Result<LedgerBlock, GatewayError>;

    async fn get_transaction(&self, id: &str) -> Result<LedgerTransaction, GatewayError>;

    async fn get_transaction_receipt(&self, id: &str) -> Result<LedgerReceipt, GatewayError>;
}
