use crate::core::forwarder::{ForwardStats, Forwarder};
use crate::core::rtl::{RtlSettings, RtlSupervisor, SupervisorReport};
use crate::domain::ports::{ConfigProvider, Submitter};
use crate::utils::error::Result;
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::BufReader;

/// How long a live run waits for queued data after shutdown.
pub const SHUTDOWN_DRAIN_LIMIT: Duration = Duration::from_secs(30);

pub struct BridgeEngine<C: ConfigProvider, S: Submitter> {
    forwarder: Forwarder<C, S>,
    rtl: RtlSettings,
    shutdown_drain_limit: Duration,
}

impl<C: ConfigProvider, S: Submitter> BridgeEngine<C, S> {
    pub fn new(config: Arc<C>, submitter: Arc<S>, rtl: RtlSettings) -> Self {
        Self {
            forwarder: Forwarder::new(config, submitter),
            rtl,
            shutdown_drain_limit: SHUTDOWN_DRAIN_LIMIT,
        }
    }

    pub fn with_shutdown_drain_limit(mut self, limit: Duration) -> Self {
        self.shutdown_drain_limit = limit;
        self
    }

    /// Forwards a captured JSON-lines file, then waits for every submission to go out.
    pub async fn run_file(&self, path: &Path) -> Result<ForwardStats> {
        tracing::info!("📁 Reading RTL data from {}", path.display());
        let file = tokio::fs::File::open(path).await?;
        let stats = self.forwarder.forward_from_stream(BufReader::new(file)).await?;
        tracing::info!(
            "Read {} lines, {} readings, {} malformed, {} values queued",
            stats.lines,
            stats.readings,
            stats.malformed,
            stats.submitted
        );

        self.forwarder.submitter().drain().await;
        Ok(stats)
    }

    /// Supervises rtl_433 until `shutdown` resolves, then drains the queue for a bounded time.
    pub async fn run_live<F: Future<Output = ()>>(&self, shutdown: F) -> SupervisorReport {
        tracing::info!("📡 Forwarding RTL data from {}", self.rtl.command);
        let report = RtlSupervisor::new(self.rtl.clone())
            .run_until(&self.forwarder, shutdown)
            .await;

        let submitter = self.forwarder.submitter();
        if !submitter.drain_with_timeout(self.shutdown_drain_limit).await {
            tracing::warn!(
                "Stopped with {} values still queued",
                submitter.waiting()
            );
        }
        report
    }
}
