use crate::histogram::BinSet;
use crate::stats::StatSummary;
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use strum_macros::{Display, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TxSample {
    pub gas_price_gwei: f64,
    pub gas_used: u64,
}

/// Lowest and highest gas price observed so far, in GWei.
///
/// Starts as the empty range (`+inf`, `-inf`) and only ever widens.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
}

impl Default for PriceRange {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl PriceRange {
    pub const EMPTY: PriceRange = PriceRange {
        min: f64::INFINITY,
        max: f64::NEG_INFINITY,
    };

    #[cfg(test)]
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn is_empty(&self) -> bool {
        self.min > self.max
    }

    pub fn is_degenerate(&self) -> bool {
        self.min == self.max
    }

    pub fn contains(&self, price: f64) -> bool {
        price >= self.min && price <= self.max
    }

    /// Widens the range to include `price`. Returns whether it changed.
    pub fn include(&mut self, price: f64) -> bool {
        let mut changed = false;

        if price < self.min {
            self.min = price;
            changed = true;
        }

        if price > self.max {
            self.max = price;
            changed = true;
        }

        changed
    }
}

// An empty range has infinite bounds, which JSON cannot carry
impl Serialize for PriceRange {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;

        let mut state = serializer.serialize_struct("PriceRange", 2)?;
        if self.is_empty() {
            state.serialize_field("min", &None::<f64>)?;
            state.serialize_field("max", &None::<f64>)?;
        } else {
            state.serialize_field("min", &Some(self.min))?;
            state.serialize_field("max", &Some(self.max))?;
        }
        state.end()
    }
}

/// A block whose transactions have all been fetched.
#[derive(Debug, Clone)]
pub struct BlockAggregate {
    pub block_number: u64,
    pub samples: Vec<TxSample>,
    pub stats: StatSummary,
    pub bins: BinSet,
}

impl BlockAggregate {
    pub fn to_row(&self, range: PriceRange) -> BlockRow {
        BlockRow {
            block_number: self.block_number,
            stats: self.stats,
            bins: self.bins.clone(),
            sample_count: self.samples.len(),
            range,
        }
    }
}

/// What the presentation layer receives for one block.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockRow {
    pub block_number: u64,
    pub stats: StatSummary,
    pub bins: BinSet,
    pub sample_count: usize,
    pub range: PriceRange,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Serialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    #[default]
    Idle,
    Running,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunState {
    pub status: RunStatus,
    pub running: bool,
    pub requested_range_start: Option<i64>,
    pub requested_range_count: Option<i64>,
    pub cached_blocks: usize,
    pub range: PriceRange,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_range_widens_only() {
        let mut range = PriceRange::EMPTY;
        assert!(range.is_empty());

        assert!(range.include(5.0));
        assert_eq!(range, PriceRange::new(5.0, 5.0));
        assert!(range.is_degenerate());

        assert!(range.include(10.0));
        assert!(!range.include(7.0));
        assert!(range.include(1.0));
        assert_eq!(range, PriceRange::new(1.0, 10.0));
        assert!(range.contains(7.0));
    }

    #[test]
    fn test_empty_range_serializes_as_nulls() {
        let value = serde_json::to_value(PriceRange::EMPTY).unwrap();
        assert!(value["min"].is_null());
        assert!(value["max"].is_null());

        let value = serde_json::to_value(PriceRange::new(1.0, 2.0)).unwrap();
        assert_eq!(value["min"], 1.0);
        assert_eq!(value["max"], 2.0);
    }

    #[test]
    fn test_run_status_display() {
        assert_eq!(RunStatus::Running.to_string(), "running");
        assert_eq!("failed".parse::<RunStatus>().unwrap(), RunStatus::Failed);
    }
}
