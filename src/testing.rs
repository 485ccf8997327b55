//! In-memory ledger and sink used by unit tests.

use crate::errors::GatewayError;
use crate::gateway::{LedgerBlock, LedgerGateway, LedgerReceipt, LedgerTransaction};
use crate::sink::PresentationSink;
use crate::types::BlockRow;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{Notify, Semaphore};

#[derive(Debug, Clone)]
struct MockTx {
    gas_price_wei: u128,
    gas_used: u64,
}

/// Holds transaction fetches of one block until released.
#[derive(Clone)]
pub struct FetchGate {
    pub entered: Arc<Notify>,
    release: Arc<Semaphore>,
}

impl FetchGate {
    pub fn release(&self) {
        self.release.add_permits(Semaphore::MAX_PERMITS / 2);
    }
}

#[derive(Default)]
pub struct MockLedger {
    latest: u64,
    blocks: HashMap<u64, Vec<String>>,
    transactions: HashMap<String, MockTx>,
    failing: HashSet<String>,
    gates: HashMap<u64, FetchGate>,
    block_fetches: AtomicUsize,
    transaction_fetches: AtomicUsize,
}

impl MockLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tx_id(block_number: u64, index: usize) -> String {
        format!("0x{:x}{:04x}", block_number, index)
    }

    /// Adds a block whose transactions are `(gas_price_wei, gas_used)` pairs.
    pub fn with_block(mut self, number: u64, txs: &[(u128, u64)]) -> Self {
        let ids = txs
            .iter()
            .enumerate()
            .map(|(index, (gas_price_wei, gas_used))| {
                let id = Self::tx_id(number, index);
                self.transactions.insert(
                    id.clone(),
                    MockTx {
                        gas_price_wei: *gas_price_wei,
                        gas_used: *gas_used,
                    },
                );
                id
            })
            .collect();

        self.blocks.insert(number, ids);
        self.latest = self.latest.max(number);
        self
    }

    pub fn with_failing_transaction(mut self, id: String) -> Self {
        self.failing.insert(id);
        self
    }

    pub fn with_gate(mut self, block_number: u64) -> (Self, FetchGate) {
        let gate = FetchGate {
            entered: Arc::new(Notify::new()),
            release: Arc::new(Semaphore::new(0)),
        };
        self.gates.insert(block_number, gate.clone());
        (self, gate)
    }

    pub fn block_fetches(&self) -> usize {
        self.block_fetches.load(Ordering::SeqCst)
    }

    pub fn transaction_fetches(&self) -> usize {
        self.transaction_fetches.load(Ordering::SeqCst)
    }

    fn block_of(&self, id: &str) -> Option<u64> {
        self.blocks
            .iter()
            .find(|(_, ids)| ids.iter().any(|tx| tx == id))
            .map(|(number, _)| *number)
    }
}

#[async_trait]
impl LedgerGateway for MockLedger {
    async fn get_latest_block_number(&self) -> Result<u64, GatewayError> {
        Ok(self.latest)
    }

    async fn get_block(&self, number: u64) -> Result<LedgerBlock, GatewayError> {
        self.block_fetches.fetch_add(1, Ordering::SeqCst);

        let ids = self
            .blocks
            .get(&number)
            .ok_or_else(|| GatewayError::not_found(format!("block {}", number)))?;

        Ok(LedgerBlock {
            number,
            transaction_ids: ids.clone(),
        })
    }

    async fn get_transaction(&self, id: &str) -> Result<LedgerTransaction, GatewayError> {
        self.transaction_fetches.fetch_add(1, Ordering::SeqCst);

        if let Some(gate) = self.block_of(id).and_then(|number| self.gates.get(&number)) {
            gate.entered.notify_one();
            gate.release
                .acquire()
                .await
                .map_err(|e| GatewayError::transport(e.to_string()))?
                .forget();
        }

        if self.failing.contains(id) {
            return Err(GatewayError::transport(format!("connection reset fetching {}", id)));
        }

        let tx = self
            .transactions
            .get(id)
            .ok_or_else(|| GatewayError::not_found(format!("transaction {}", id)))?;

        Ok(LedgerTransaction {
            hash: id.to_string(),
            gas_price_wei: tx.gas_price_wei,
        })
    }

    async fn get_transaction_receipt(&self, id: &str) -> Result<LedgerReceipt, GatewayError> {
        let tx = self
            .transactions
            .get(id)
            .ok_or_else(|| GatewayError::not_found(format!("receipt {}", id)))?;

        Ok(LedgerReceipt {
            hash: id.to_string(),
            gas_used: tx.gas_used,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SinkEvent {
    Progress(u64, u8),
    Block(BlockRow),
    RangeChanged(Vec<BlockRow>),
    Summary,
    Failed(String),
}

#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<SinkEvent>>,
}

impl RecordingSink {
    pub fn events(&self) -> Vec<SinkEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn progress(&self) -> Vec<(u64, u8)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                SinkEvent::Progress(block, percent) => Some((block, percent)),
                _ => None,
            })
            .collect()
    }

    pub fn rows(&self) -> Vec<SinkEvent> {
        self.events()
            .into_iter()
            .filter(|e| matches!(e, SinkEvent::Block(_) | SinkEvent::RangeChanged(_)))
            .collect()
    }

    fn push(&self, event: SinkEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

impl PresentationSink for RecordingSink {
    fn on_progress(&self, block_number: u64, percent: u8) {
        self.push(SinkEvent::Progress(block_number, percent));
    }

    fn on_block_aggregate(&self, row: &BlockRow) {
        self.push(SinkEvent::Block(row.clone()));
    }

    fn on_range_changed(&self, rows: &[BlockRow]) {
        self.push(SinkEvent::RangeChanged(rows.to_vec()));
    }

    fn on_run_summary(&self, _elapsed_ms: u64) {
        self.push(SinkEvent::Summary);
    }

    fn on_run_failed(&self, error: &str) {
        self.push(SinkEvent::Failed(error.to_string()));
    }
}
