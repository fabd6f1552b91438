use crate::domain::model::SensorConfig;
use async_trait::async_trait;
use std::time::Duration;
use url::Url;

pub trait ConfigProvider: Send + Sync {
    fn chords_host(&self) -> &str;
    fn instrument_id(&self) -> &str;
    fn api_email(&self) -> &str;
    fn api_key(&self) -> &str;
    fn smart_sensors(&self) -> Option<&[SensorConfig]>;
}

/// Destination for rendered CHORDS URIs.
#[async_trait]
pub trait Submitter: Send + Sync {
    /// Queues a URI without waiting for delivery.
    fn submit(&self, uri: Url);

    /// Number of URIs not yet delivered.
    fn waiting(&self) -> usize;

    /// Resolves once `waiting()` reaches zero.
    async fn drain(&self);

    /// Drains for at most `limit`. Returns `false` if URIs were still waiting.
    async fn drain_with_timeout(&self, limit: Duration) -> bool {
        tokio::time::timeout(limit, self.drain()).await.is_ok()
    }
}
