use crate::errors::{AggregateError, GatewayError};
use crate::gateway::LedgerGateway;
use crate::range::GlobalRange;
use crate::sink::PresentationSink;
use crate::stats::StatSummary;
use crate::types::TxSample;
use crate::utils::wei_to_gwei;
use futures::stream::{FuturesUnordered, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

/// A fetched block before binning and caching.
#[derive(Debug, Clone)]
pub struct ProcessedBlock {
    pub block_number: u64,
    pub samples: Vec<TxSample>,
    pub stats: StatSummary,
    /// Whether any sample of this block widened the global range.
    pub range_changed: bool,
}

#[derive(Debug)]
pub enum BlockOutcome {
    Processed(ProcessedBlock),
    Cancelled,
}

/// Turns one block number into samples and statistics.
pub struct BlockAggregator<'a> {
    gateway: &'a dyn LedgerGateway,
    range: &'a GlobalRange,
    sink: &'a dyn PresentationSink,
    stop_requested: &'a AtomicBool,
}

impl<'a> BlockAggregator<'a> {
    pub fn new(
        gateway: &'a dyn LedgerGateway,
        range: &'a GlobalRange,
        sink: &'a dyn PresentationSink,
        stop_requested: &'a AtomicBool,
    ) -> Self {
        Self {
            gateway,
            range,
            sink,
            stop_requested,
        }
    }

    pub async fn process_block(&self, block_number: u64) -> Result<BlockOutcome, AggregateError> {
        let block = self
            .gateway
            .get_block(block_number)
            .await
            .map_err(|e| AggregateError::fetch_failed(block_number, e))?;

        if self.stop_requested.load(Ordering::SeqCst) {
            debug!(block_number, "Stop requested before fetching transactions");
            return Ok(BlockOutcome::Cancelled);
        }

        let total = block.transaction_ids.len();
        let mut progress = Progress::new(block_number, total, self.sink);

        let mut pending: FuturesUnordered<_> = block
            .transaction_ids
            .iter()
            .enumerate()
            .map(|(index, id)| async move { (index, self.fetch_sample(id).await) })
            .collect();

        let mut slots: Vec<Option<TxSample>> = vec![None; total];
        let mut range_changed = false;

        // Returning early drops the remaining fetches, nothing partial escapes
        while let Some((index, result)) = pending.next().await {
            let (sample, widened) =
                result.map_err(|e| AggregateError::fetch_failed(block_number, e))?;

            range_changed |= widened;
            slots[index] = Some(sample);
            progress.tick();
        }

        progress.finish();

        let samples: Vec<TxSample> = slots.into_iter().flatten().collect();
        let prices: Vec<f64> = samples.iter().map(|s| s.gas_price_gwei).collect();

        debug!(
            block_number,
            transactions = samples.len(),
            range_changed,
            "Processed block"
        );

        Ok(BlockOutcome::Processed(ProcessedBlock {
            block_number,
            stats: StatSummary::from_prices(&prices),
            samples,
            range_changed,
        }))
    }

    /// Fetches one transaction and its receipt, then widens the range with its price.
    async fn fetch_sample(&self, id: &str) -> Result<(TxSample, bool), GatewayError> {
        let (transaction, receipt) = futures::try_join!(
            self.gateway.get_transaction(id),
            self.gateway.get_transaction_receipt(id)
        )?;

        let gas_price_gwei = wei_to_gwei(transaction.gas_price_wei)
            .map_err(|e| GatewayError::invalid_response(e.to_string()))?;

        let widened = self.range.observe(gas_price_gwei).await;

        Ok((
            TxSample {
                gas_price_gwei,
                gas_used: receipt.gas_used,
            },
            widened,
        ))
    }
}

/// Percentage ticks for one block, coalesced to whole percent steps.
struct Progress<'a> {
    block_number: u64,
    total: usize,
    done: usize,
    last_percent: Option<u8>,
    sink: &'a dyn PresentationSink,
}

impl<'a> Progress<'a> {
    fn new(block_number: u64, total: usize, sink: &'a dyn PresentationSink) -> Self {
        Self {
            block_number,
            total,
            done: 0,
            last_percent: None,
            sink,
        }
    }

    fn tick(&mut self) {
        self.done += 1;
        let percent = (self.done * 100 / self.total.max(1)) as u8;

        // The final 100 is left to finish()
        if percent < 100 && self.last_percent != Some(percent) {
            self.last_percent = Some(percent);
            self.sink.on_progress(self.block_number, percent);
        }
    }

    fn finish(&mut self) {
        self.last_percent = Some(100);
        self.sink.on_progress(self.block_number, 100);
    }
}
