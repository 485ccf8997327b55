use crate::types::PriceRange;
use tokio::sync::RwLock;

/// Run-wide price range shared by every in-flight fetch of a block.
///
/// Only the aggregator widens it; readers take snapshots.
#[derive(Debug, Default)]
pub struct GlobalRange {
    inner: RwLock<PriceRange>,
}

impl GlobalRange {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn snapshot(&self) -> PriceRange {
        *self.inner.read().await
    }

    /// Widens the range with one observed price. Returns whether it moved.
    pub async fn observe(&self, price: f64) -> bool {
        // Cheap read first, most prices land inside the current range
        if self.inner.read().await.contains(price) {
            return false;
        }

        self.inner.write().await.include(price)
    }

    pub async fn reset(&self) {
        *self.inner.write().await = PriceRange::EMPTY;
    }
}
