/*
Order statistics over a block's gas prices.

Every function works on a private sorted copy, so callers may pass samples in any
order. Statistics that are not defined for the given sample size are `None`
rather than zero.
*/

use crate::utils::round_to_9_places;
use serde::Serialize;
use std::cmp::Ordering;

/// Rank used for the "10th highest" and "10th lowest" summary fields.
pub const TAIL_RANK: usize = 10;

fn sorted(samples: &[f64]) -> Vec<f64> {
    let mut sorted = samples.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    sorted
}

pub fn median(samples: &[f64]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }

    let sorted = sorted(samples);
    let mid = sorted.len() / 2;

    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

pub fn mean(samples: &[f64]) -> Option<f64> {
    if samples.is_empty() {
        return None;
    }

    Some(samples.iter().sum::<f64>() / samples.len() as f64)
}

/// The `k`-th largest (or smallest) sample, 1-indexed.
///
/// Only defined when there are more than `2k` samples, so the highest and
/// lowest picks never overlap.
pub fn order_statistic(samples: &[f64], k: usize, from_high_end: bool) -> Option<f64> {
    if k == 0 || samples.len() <= 2 * k {
        return None;
    }

    let sorted = sorted(samples);

    if from_high_end {
        Some(sorted[sorted.len() - k])
    } else {
        Some(sorted[k - 1])
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct StatSummary {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub median: Option<f64>,
    pub mean: Option<f64>,
    pub tenth_highest: Option<f64>,
    pub tenth_lowest: Option<f64>,
}

impl StatSummary {
    pub fn from_prices(prices: &[f64]) -> Self {
        let min = prices.iter().copied().reduce(f64::min);
        let max = prices.iter().copied().reduce(f64::max);

        Self {
            min,
            max,
            median: median(prices),
            mean: mean(prices).map(round_to_9_places),
            tenth_highest: order_statistic(prices, TAIL_RANK, true),
            tenth_lowest: order_statistic(prices, TAIL_RANK, false),
        }
    }
}
