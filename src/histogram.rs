use crate::types::{PriceRange, TxSample};
use serde::Serialize;

pub const DEFAULT_NUM_BINS: usize = 40;
pub const DEFAULT_NUM_LEVELS: u8 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistogramSettings {
    pub num_bins: usize,
    pub num_levels: u8,
}

impl Default for HistogramSettings {
    fn default() -> Self {
        Self {
            num_bins: DEFAULT_NUM_BINS,
            num_levels: DEFAULT_NUM_LEVELS,
        }
    }
}

/// Gas used per price bin, log10 scaled, and its quantized intensity levels.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BinSet {
    pub weights: Vec<f64>,
    pub levels: Vec<u8>,
}

impl BinSet {
    pub fn empty(num_bins: usize) -> Self {
        Self {
            weights: vec![0.0; num_bins],
            levels: vec![0; num_bins],
        }
    }
}

/// Bin for `price` within `range`, clamped to the valid indices.
///
/// A degenerate range puts everything into bin 0.
pub fn bin_index(price: f64, range: PriceRange, num_bins: usize) -> usize {
    if num_bins <= 1 || range.is_degenerate() || range.is_empty() {
        return 0;
    }

    let position = (price - range.min) / (range.max - range.min) * (num_bins - 1) as f64;

    if position.is_nan() || position <= 0.0 {
        0
    } else {
        (position.floor() as usize).min(num_bins - 1)
    }
}

pub fn build_bins(samples: &[TxSample], range: PriceRange, settings: &HistogramSettings) -> BinSet {
    let num_bins = settings.num_bins;
    let mut raw = vec![0u128; num_bins];

    if num_bins == 0 {
        return BinSet::empty(0);
    }

    for sample in samples {
        let idx = bin_index(sample.gas_price_gwei, range, num_bins);
        raw[idx] += sample.gas_used as u128;
    }

    let weights: Vec<f64> = raw
        .iter()
        .map(|&w| if w == 0 { 0.0 } else { (w as f64).log10() })
        .collect();

    let levels = quantize(&raw, &weights, settings.num_levels);

    BinSet { weights, levels }
}

/// Maps non-empty bins linearly from `[min, max]` weight onto levels `1..num_levels`.
/// Empty bins are level 0.
fn quantize(raw: &[u128], weights: &[f64], num_levels: u8) -> Vec<u8> {
    let top = num_levels.saturating_sub(1);

    let non_empty = || {
        raw.iter()
            .zip(weights)
            .filter(|(r, _)| **r > 0)
            .map(|(_, w)| *w)
    };

    let Some(min_weight) = non_empty().reduce(f64::min) else {
        return vec![0; raw.len()];
    };
    let max_weight = non_empty().reduce(f64::max).unwrap_or(min_weight);

    raw.iter()
        .zip(weights)
        .map(|(&r, &w)| {
            if r == 0 {
                0
            } else if max_weight == min_weight || top <= 1 {
                top
            } else {
                let scaled = (w - min_weight) / (max_weight - min_weight) * (top - 1) as f64;
                1 + scaled.round() as u8
            }
        })
        .collect()
}

/// Glyph ramp used to draw a [`BinSet`] in a terminal.
#[derive(Debug, Clone)]
pub struct Palette {
    glyphs: Vec<char>,
}

impl Palette {
    const RAMP: [char; 5] = [' ', '░', '▒', '▓', '█'];

    pub fn new(num_levels: u8) -> Self {
        let last = Self::RAMP.len() - 1;
        let top = num_levels.saturating_sub(1).max(1) as usize;

        let glyphs = (0..num_levels as usize)
            .map(|level| Self::RAMP[(level * last + top / 2) / top])
            .collect();

        Self { glyphs }
    }

    pub fn glyph(&self, level: u8) -> char {
        self.glyphs
            .get(level as usize)
            .or(self.glyphs.last())
            .copied()
            .unwrap_or(' ')
    }

    pub fn render(&self, bins: &BinSet) -> String {
        bins.levels.iter().map(|&level| self.glyph(level)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(price: f64, gas_used: u64) -> TxSample {
        TxSample {
            gas_price_gwei: price,
            gas_used,
        }
    }

    fn assert_weights(bins: &BinSet, expected: &[f64]) {
        assert_eq!(bins.weights.len(), expected.len());
        for (actual, expected) in bins.weights.iter().zip(expected) {
            assert!((actual - expected).abs() < 1e-9, "{} != {}", actual, expected);
        }
    }

    #[test]
    fn test_bin_index_extremes() {
        let range = PriceRange::new(1.0, 10.0);

        assert_eq!(bin_index(1.0, range, 40), 0);
        assert_eq!(bin_index(10.0, range, 40), 39);
        assert_eq!(bin_index(5.5, range, 40), 19);
        // Outside the range clamps
        assert_eq!(bin_index(0.5, range, 40), 0);
        assert_eq!(bin_index(20.0, range, 40), 39);
    }

    #[test]
    fn test_degenerate_range_uses_bin_zero() {
        let range = PriceRange::new(5.0, 5.0);
        let samples = vec![sample(5.0, 21_000), sample(5.0, 50_000)];

        let bins = build_bins(&samples, range, &HistogramSettings::default());

        assert_eq!(bins.levels.len(), DEFAULT_NUM_BINS);
        assert_eq!(bins.levels[0], DEFAULT_NUM_LEVELS - 1);
        assert!(bins.levels[1..].iter().all(|&l| l == 0));
        assert!((bins.weights[0] - 71_000f64.log10()).abs() < 1e-12);
    }

    #[test]
    fn test_weights_sum_gas_used_not_count() {
        let range = PriceRange::new(0.0, 1.0);
        let settings = HistogramSettings {
            num_bins: 2,
            num_levels: 5,
        };
        let samples = vec![sample(0.0, 100), sample(0.0, 900), sample(1.0, 10)];

        let bins = build_bins(&samples, range, &settings);

        assert_weights(&bins, &[3.0, 1.0]);
        assert_eq!(bins.levels, vec![4, 1]);
    }

    #[test]
    fn test_quantize_linear_levels() {
        let range = PriceRange::new(0.0, 4.0);
        let settings = HistogramSettings {
            num_bins: 5,
            num_levels: 5,
        };
        // log10 weights 1, 2, 3, 4 and one empty bin
        let samples = vec![
            sample(0.0, 10),
            sample(1.0, 100),
            sample(3.0, 1_000),
            sample(4.0, 10_000),
        ];

        let bins = build_bins(&samples, range, &settings);

        assert_weights(&bins, &[1.0, 2.0, 0.0, 3.0, 4.0]);
        assert_eq!(bins.levels, vec![1, 2, 0, 3, 4]);
    }

    #[test]
    fn test_equal_non_empty_bins_get_top_level() {
        let range = PriceRange::new(0.0, 1.0);
        let settings = HistogramSettings {
            num_bins: 3,
            num_levels: 5,
        };
        let samples = vec![sample(0.0, 500), sample(1.0, 500)];

        let bins = build_bins(&samples, range, &settings);

        assert_eq!(bins.levels, vec![4, 0, 4]);
    }

    #[test]
    fn test_zero_gas_used_stays_empty() {
        let range = PriceRange::new(0.0, 1.0);
        let samples = vec![sample(0.5, 0)];

        let bins = build_bins(&samples, range, &HistogramSettings::default());

        assert!(bins.weights.iter().all(|&w| w == 0.0));
        assert!(bins.levels.iter().all(|&l| l == 0));
    }

    #[test]
    fn test_no_samples() {
        let bins = build_bins(&[], PriceRange::EMPTY, &HistogramSettings::default());
        assert_eq!(bins, BinSet::empty(DEFAULT_NUM_BINS));
    }

    #[test]
    fn test_deterministic() {
        let range = PriceRange::new(1.0, 3.0);
        let samples = vec![sample(1.2, 21_000), sample(2.9, 80_000), sample(2.0, 5)];
        let settings = HistogramSettings::default();

        assert_eq!(
            build_bins(&samples, range, &settings),
            build_bins(&samples, range, &settings)
        );
    }

    #[test]
    fn test_palette_render() {
        let palette = Palette::new(5);
        let bins = BinSet {
            weights: vec![0.0; 5],
            levels: vec![0, 1, 2, 3, 4],
        };

        assert_eq!(palette.render(&bins), " ░▒▓█");
    }

    #[test]
    fn test_palette_fewer_levels_spans_ramp() {
        let palette = Palette::new(2);
        assert_eq!(palette.glyph(0), ' ');
        assert_eq!(palette.glyph(1), '█');
        // Out of range levels saturate
        assert_eq!(palette.glyph(9), '█');
    }
}
