use crate::histogram::Palette;
use crate::types::BlockRow;
use tracing::{debug, error, info};

/// Consumer of run output: progress ticks, block rows and run summaries.
///
/// Calls arrive from the controller's run task and must not block for long.
pub trait PresentationSink: Send + Sync {
    fn on_progress(&self, block_number: u64, percent: u8);

    fn on_block_aggregate(&self, row: &BlockRow);

    /// The price range widened; every cached block was re-binned.
    /// Rows are in descending block order.
    fn on_range_changed(&self, rows: &[BlockRow]);

    /// Closes every run, including one that failed.
    fn on_run_summary(&self, elapsed_ms: u64);

    /// Called before the summary when a block fetch failed the run.
    fn on_run_failed(&self, _error: &str) {}
}

/// Renders rows as structured log lines.
pub struct LogSink {
    palette: Palette,
}

impl LogSink {
    pub fn new(num_levels: u8) -> Self {
        Self {
            palette: Palette::new(num_levels),
        }
    }

    fn render_row(&self, row: &BlockRow, rerender: bool) {
        info!(
            block_number = row.block_number,
            transactions = row.sample_count,
            min = ?row.stats.min,
            max = ?row.stats.max,
            median = ?row.stats.median,
            mean = ?row.stats.mean,
            tenth_highest = ?row.stats.tenth_highest,
            tenth_lowest = ?row.stats.tenth_lowest,
            range_min = row.range.min,
            range_max = row.range.max,
            rerender,
            "|{}|",
            self.palette.render(&row.bins)
        );
    }
}

impl PresentationSink for LogSink {
    fn on_progress(&self, block_number: u64, percent: u8) {
        debug!(block_number, percent, "Fetching block transactions");
    }

    fn on_block_aggregate(&self, row: &BlockRow) {
        self.render_row(row, false);
    }

    fn on_range_changed(&self, rows: &[BlockRow]) {
        if let Some(first) = rows.first() {
            info!(
                blocks = rows.len(),
                range_min = first.range.min,
                range_max = first.range.max,
                "Price range widened, re-rendering cached blocks"
            );
        }

        for row in rows {
            self.render_row(row, true);
        }
    }

    fn on_run_summary(&self, elapsed_ms: u64) {
        info!(elapsed_ms, "Run finished");
    }

    fn on_run_failed(&self, error: &str) {
        error!(error, "Run failed");
    }
}
