use crate::histogram::{build_bins, HistogramSettings};
use crate::types::{BlockAggregate, BlockRow, PriceRange};
use std::collections::BTreeMap;

/// Fully processed blocks of the current run, keyed by block number.
///
/// Entries are only ever added whole and never evicted; a reset drops them all.
#[derive(Debug, Default)]
pub struct BlockCache {
    blocks: BTreeMap<u64, BlockAggregate>,
}

impl BlockCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, block_number: u64) -> bool {
        self.blocks.contains_key(&block_number)
    }

    #[cfg(test)]
    pub fn get(&self, block_number: u64) -> Option<&BlockAggregate> {
        self.blocks.get(&block_number)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Inserts a block unless it is already cached. Returns whether it was added.
    pub fn insert(&mut self, aggregate: BlockAggregate) -> bool {
        if self.contains(aggregate.block_number) {
            return false;
        }

        self.blocks.insert(aggregate.block_number, aggregate);
        true
    }

    /// Recomputes the bins of one block against `range`.
    pub fn rebin(
        &mut self,
        block_number: u64,
        range: PriceRange,
        settings: &HistogramSettings,
    ) -> Option<&BlockAggregate> {
        let aggregate = self.blocks.get_mut(&block_number)?;
        aggregate.bins = build_bins(&aggregate.samples, range, settings);
        Some(aggregate)
    }

    /// Recomputes the bins of every cached block against `range`.
    pub fn rebin_all(&mut self, range: PriceRange, settings: &HistogramSettings) {
        for aggregate in self.blocks.values_mut() {
            aggregate.bins = build_bins(&aggregate.samples, range, settings);
        }
    }

    /// Cached blocks, highest block number first.
    pub fn iter_descending(&self) -> impl Iterator<Item = &BlockAggregate> {
        self.blocks.values().rev()
    }

    pub fn rows(&self, range: PriceRange) -> Vec<BlockRow> {
        self.iter_descending()
            .map(|aggregate| aggregate.to_row(range))
            .collect()
    }

    pub fn clear(&mut self) {
        self.blocks.clear();
    }
}
