use std::sync::Arc;
use tokio::sync::RwLock;

/// Holds the most recently fetched price, or `None` until the first
/// successful fetch.
///
/// The presence scheduler is the only writer; anything holding a clone may
/// read. Failed fetches never touch it, so a reader either sees the latest
/// successful price or the uninitialized marker. Last-write-wins.
#[derive(Debug, Clone, Default)]
pub struct PriceCache {
    inner: Arc<RwLock<Option<f64>>>,
}

impl PriceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrites the cached price with a freshly fetched value.
    pub async fn store(&self, price: f64) {
        let mut guard = self.inner.write().await;
        *guard = Some(price);
    }

    /// Returns the latest successfully fetched price, if any.
    pub async fn latest(&self) -> Option<f64> {
        *self.inner.read().await
    }
}
