use crate::core::chords::redacted;
use crate::domain::ports::Submitter;
use crate::utils::error::Result;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use url::Url;

#[derive(Debug, Clone)]
pub struct SenderSettings {
    pub max_queue_length: usize,
    pub request_timeout: Duration,
    pub retry_delay: Duration,
    pub drain_poll: Duration,
}

impl Default for SenderSettings {
    fn default() -> Self {
        Self {
            max_queue_length: crate::config::station::DEFAULT_MAX_QUEUE_LENGTH,
            request_timeout: Duration::from_secs(10),
            retry_delay: Duration::from_secs(1),
            drain_poll: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SenderStats {
    pub sent: u64,
    pub retried: u64,
    pub rejected: u64,
    pub dropped: u64,
}

struct SendQueue {
    pending: Mutex<VecDeque<Url>>,
    in_flight: AtomicUsize,
    notify: Notify,
    max_len: usize,
    sent: AtomicU64,
    retried: AtomicU64,
    rejected: AtomicU64,
    dropped: AtomicU64,
}

impl SendQueue {
    fn new(max_len: usize) -> Self {
        Self {
            pending: Mutex::new(VecDeque::new()),
            in_flight: AtomicUsize::new(0),
            notify: Notify::new(),
            max_len: max_len.max(1),
            sent: AtomicU64::new(0),
            retried: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<Url>> {
        self.pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn push_back(&self, uri: Url) {
        {
            let mut pending = self.lock();
            if pending.len() >= self.max_len {
                if let Some(oldest) = pending.pop_front() {
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                    tracing::warn!("Send queue full, dropping {}", redacted(&oldest));
                }
            }
            pending.push_back(uri);
        }
        self.notify.notify_one();
    }

    /// Puts a failed URI back at the head, unless newer data already filled the queue.
    fn push_front(&self, uri: Url) {
        let mut pending = self.lock();
        if pending.len() >= self.max_len {
            self.dropped.fetch_add(1, Ordering::Relaxed);
            tracing::warn!("Send queue full, dropping {}", redacted(&uri));
        } else {
            pending.push_front(uri);
        }
        self.in_flight.store(0, Ordering::SeqCst);
    }

    fn take_next(&self) -> Option<Url> {
        let mut pending = self.lock();
        let next = pending.pop_front();
        if next.is_some() {
            self.in_flight.store(1, Ordering::SeqCst);
        }
        next
    }

    fn finish(&self) {
        let _pending = self.lock();
        self.in_flight.store(0, Ordering::SeqCst);
    }

    fn waiting(&self) -> usize {
        let pending = self.lock();
        pending.len() + self.in_flight.load(Ordering::SeqCst)
    }

    fn stats(&self) -> SenderStats {
        SenderStats {
            sent: self.sent.load(Ordering::Relaxed),
            retried: self.retried.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

enum Delivery {
    Sent,
    Retry(String),
    Rejected(StatusCode),
}

async fn deliver(client: &Client, uri: &Url) -> Delivery {
    match client.get(uri.clone()).send().await {
        Ok(response) => {
            let status = response.status();
            if status.is_success() {
                Delivery::Sent
            } else if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
                Delivery::Retry(format!("status {}", status))
            } else {
                Delivery::Rejected(status)
            }
        }
        Err(e) => Delivery::Retry(e.to_string()),
    }
}

async fn run_worker(queue: Arc<SendQueue>, client: Client, retry_delay: Duration) {
    loop {
        let Some(uri) = queue.take_next() else {
            queue.notify.notified().await;
            continue;
        };

        match deliver(&client, &uri).await {
            Delivery::Sent => {
                queue.sent.fetch_add(1, Ordering::Relaxed);
                queue.finish();
                tracing::debug!("Sent {}", redacted(&uri));
            }
            Delivery::Retry(reason) => {
                queue.retried.fetch_add(1, Ordering::Relaxed);
                tracing::warn!("CHORDS submit failed ({}), retrying in {:?}", reason, retry_delay);
                queue.push_front(uri);
                tokio::time::sleep(retry_delay).await;
            }
            Delivery::Rejected(status) => {
                queue.rejected.fetch_add(1, Ordering::Relaxed);
                queue.finish();
                tracing::error!("CHORDS rejected {} with status {}", redacted(&uri), status);
            }
        }
    }
}

/// Bounded FIFO of CHORDS URIs delivered by one background task.
///
/// When full, the oldest entry is dropped. Failed deliveries caused by the
/// network or the server are retried in order; client errors are dropped.
pub struct ChordsSender {
    queue: Arc<SendQueue>,
    settings: SenderSettings,
    worker: JoinHandle<()>,
}

impl ChordsSender {
    /// Must be called inside a tokio runtime.
    pub fn start(settings: SenderSettings) -> Result<Self> {
        let client = Client::builder().timeout(settings.request_timeout).build()?;
        let queue = Arc::new(SendQueue::new(settings.max_queue_length));
        let worker = tokio::spawn(run_worker(queue.clone(), client, settings.retry_delay));

        tracing::info!(
            "CHORDS sender started (max queue length {})",
            settings.max_queue_length
        );
        Ok(Self {
            queue,
            settings,
            worker,
        })
    }

    pub fn stats(&self) -> SenderStats {
        self.queue.stats()
    }
}

impl Drop for ChordsSender {
    fn drop(&mut self) {
        self.worker.abort();
    }
}

#[async_trait]
impl Submitter for ChordsSender {
    fn submit(&self, uri: Url) {
        self.queue.push_back(uri);
    }

    fn waiting(&self) -> usize {
        self.queue.waiting()
    }

    async fn drain(&self) {
        loop {
            let remaining = self.waiting();
            tracing::info!("Queue length: {}", remaining);
            if remaining == 0 {
                break;
            }
            tokio::time::sleep(self.settings.drain_poll).await;
        }
    }
}

/// Logs URIs instead of sending them.
#[derive(Debug, Default)]
pub struct DryRunSubmitter {
    count: AtomicU64,
}

impl DryRunSubmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Submitter for DryRunSubmitter {
    fn submit(&self, uri: Url) {
        self.count.fetch_add(1, Ordering::Relaxed);
        tracing::info!("Dry run, not submitting: {}", redacted(&uri));
    }

    fn waiting(&self) -> usize {
        0
    }

    async fn drain(&self) {}
}
