//! Background click recording.
//!
//! Visits are queued on a bounded channel and recorded by a detached worker, so
//! the caller never waits on analytics writes. Each event goes through the
//! dedup check, then the click counter is bumped for accepted visits only.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Semaphore, mpsc};
use tokio::task::{JoinHandle, JoinSet};
use tokio_retry::RetryIf;
use tokio_retry::strategy::{ExponentialBackoff, jitter};
use tracing::{debug, error, info, warn};

use crate::application::services::UrlService;
use crate::domain::click_event::ClickEvent;
use crate::domain::repositories::{ClickRepository, UrlRepository};
use crate::error::AppError;

/// Retries after the first attempt for a store failure.
const STORE_RETRIES: usize = 3;

/// Handle to the background click worker.
///
/// Dropping the handle closes the queue; the worker finishes the events already
/// queued and exits. Use [`ClickRecorder::shutdown`] to wait for that.
pub struct ClickRecorder {
    sender: mpsc::Sender<ClickEvent>,
    worker: JoinHandle<()>,
}

impl ClickRecorder {
    /// Spawns the worker on the current runtime.
    ///
    /// # Arguments
    ///
    /// - `service` - Service used to record clicks and bump counters
    /// - `capacity` - Queue bound; events beyond it are dropped
    /// - `concurrency` - Maximum events processed at once
    pub fn spawn<U, K>(service: Arc<UrlService<U, K>>, capacity: usize, concurrency: usize) -> Self
    where
        U: UrlRepository + 'static,
        K: ClickRepository + 'static,
    {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let worker = tokio::spawn(run_click_worker(receiver, service, concurrency));
        info!(capacity, concurrency, "Click worker started");

        Self { sender, worker }
    }

    /// Queues a click without waiting.
    ///
    /// Returns `false` if the event was dropped because the queue is full or closed.
    pub fn record(&self, event: ClickEvent) -> bool {
        match self.sender.try_send(event) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(event)) => {
                warn!(code = %event.code, "Click queue full, dropping event");
                false
            }
            Err(mpsc::error::TrySendError::Closed(event)) => {
                warn!(code = %event.code, "Click queue closed, dropping event");
                false
            }
        }
    }

    /// Closes the queue and waits until every queued click has been processed.
    pub async fn shutdown(self) {
        drop(self.sender);
        if let Err(e) = self.worker.await {
            error!(error = %e, "Click worker terminated abnormally");
        }
        info!("Click worker stopped");
    }
}

/// Processes click events until the channel closes, then drains in-flight work.
pub async fn run_click_worker<U, K>(
    mut receiver: mpsc::Receiver<ClickEvent>,
    service: Arc<UrlService<U, K>>,
    concurrency: usize,
) where
    U: UrlRepository + 'static,
    K: ClickRepository + 'static,
{
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut tasks = JoinSet::new();

    while let Some(event) = receiver.recv().await {
        let Ok(permit) = semaphore.clone().acquire_owned().await else {
            break;
        };
        let service = service.clone();

        tasks.spawn(async move {
            process_click(&service, event).await;
            drop(permit);
        });

        // Reap finished tasks so the set does not grow with the queue.
        while tasks.try_join_next().is_some() {}
    }

    while tasks.join_next().await.is_some() {}
}

fn retry_strategy() -> impl Iterator<Item = Duration> {
    ExponentialBackoff::from_millis(10)
        .max_delay(Duration::from_secs(2))
        .map(jitter)
        .take(STORE_RETRIES)
}

async fn process_click<U, K>(service: &UrlService<U, K>, event: ClickEvent)
where
    U: UrlRepository,
    K: ClickRepository,
{
    let client = event.client_info();
    let location = event.location();

    let recorded = RetryIf::spawn(
        retry_strategy(),
        || service.record_click(&event.code, &event.ip, location, client.browser, client.device),
        |e: &AppError| e.is_store_failure(),
    )
    .await;

    match recorded {
        Ok(_) => {}
        Err(AppError::RecentClick(_)) => {
            debug!(code = %event.code, "Recent click from the same visitor, not incrementing");
            return;
        }
        Err(e) => {
            error!(code = %event.code, error = %e, "Failed to record click");
            return;
        }
    }

    let incremented = RetryIf::spawn(
        retry_strategy(),
        || service.increment_clicks(&event.code),
        |e: &AppError| e.is_store_failure(),
    )
    .await;

    if let Err(e) = incremented {
        error!(code = %event.code, error = %e, "Failed to increment click count");
    }
}
