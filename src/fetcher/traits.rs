use crate::model::{FetchOutcome, SeriesRequest};

/// Capability to retrieve daily history for one instrument.
#[async_trait::async_trait]
pub trait MarketDataSource: Send + Sync {
    async fn fetch_series(&self, req: &SeriesRequest) -> FetchOutcome;
}
