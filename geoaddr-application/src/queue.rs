//! In-process queue for geocoding jobs.
//!
//! Every job is identified by its uniqueness key (see
//! [`geocode_job_key`]). While a job is pending or running, further
//! jobs with the same key are dropped. The lock expires after the
//! configured period even if the job never finishes.
//!
//! Jobs run on the blocking thread pool of the Tokio runtime, at most
//! `workers` at a time. A job that fails with a retryable error is
//! repeated after a fixed backoff until the number of tries is
//! exhausted.

use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use parking_lot::Mutex;
use tokio::{
    sync::{mpsc, Mutex as AsyncMutex, OwnedSemaphorePermit, Semaphore},
    task::{self, JoinError, JoinSet},
    time::sleep,
};

use geoaddr_core::{
    gateways::queue::{geocode_job_key, GeocodeJobQueue},
    usecases::{GeocodeJobError, GeocodeOutcome},
};

use crate::{prelude::GeocodeAddressJob, AddressId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueSettings {
    pub name: String,
    pub workers: usize,
    pub tries: u32,
    pub backoff: Duration,
    pub unique_for: Duration,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            name: "geocoding".to_owned(),
            workers: 2,
            tries: 3,
            backoff: Duration::from_secs(60),
            unique_for: Duration::from_secs(60 * 60),
        }
    }
}

pub trait GeocodeJobHandler: Send + Sync + 'static {
    fn handle(&self, id: &AddressId) -> Result<GeocodeOutcome, GeocodeJobError>;
}

impl GeocodeJobHandler for GeocodeAddressJob {
    fn handle(&self, id: &AddressId) -> Result<GeocodeOutcome, GeocodeJobError> {
        self.run(id)
    }
}

impl<F> GeocodeJobHandler for F
where
    F: Fn(&AddressId) -> Result<GeocodeOutcome, GeocodeJobError> + Send + Sync + 'static,
{
    fn handle(&self, id: &AddressId) -> Result<GeocodeOutcome, GeocodeJobError> {
        self(id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Completed,
    Failed,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct QueueStats {
    pub completed: usize,
    pub failed: usize,
}

impl QueueStats {
    fn record(&mut self, result: Result<JobStatus, JoinError>) {
        match result {
            Ok(JobStatus::Completed) => self.completed += 1,
            Ok(JobStatus::Failed) => self.failed += 1,
            Err(err) => {
                error!("Geocoding job aborted: {err}");
                self.failed += 1;
            }
        }
    }
}

#[derive(Clone)]
pub struct GeocodeQueue {
    inner: Arc<Inner>,
}

struct Inner {
    settings: QueueSettings,
    sender: mpsc::UnboundedSender<AddressId>,
    receiver: AsyncMutex<mpsc::UnboundedReceiver<AddressId>>,
    // Uniqueness key -> expiry, `None` if beyond the clock's range
    locks: Mutex<HashMap<String, Option<Instant>>>,
    workers: Arc<Semaphore>,
}

fn is_active(expires_at: Option<Instant>, now: Instant) -> bool {
    expires_at.is_none_or(|expires_at| expires_at > now)
}

impl GeocodeQueue {
    pub fn new(settings: QueueSettings) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        let workers = Arc::new(Semaphore::new(settings.workers.max(1)));
        Self {
            inner: Arc::new(Inner {
                settings,
                sender,
                receiver: AsyncMutex::new(receiver),
                locks: Mutex::new(HashMap::new()),
                workers,
            }),
        }
    }

    pub fn settings(&self) -> &QueueSettings {
        &self.inner.settings
    }

    /// Checks if a job for this address is pending or running.
    pub fn is_locked(&self, address_id: &AddressId) -> bool {
        let key = geocode_job_key(address_id);
        self.inner
            .locks
            .lock()
            .get(&key)
            .is_some_and(|expires_at| is_active(*expires_at, Instant::now()))
    }

    fn try_lock(&self, key: String) -> bool {
        let now = Instant::now();
        let mut locks = self.inner.locks.lock();
        locks.retain(|_, expires_at| is_active(*expires_at, now));
        if locks.contains_key(&key) {
            return false;
        }
        locks.insert(key, now.checked_add(self.inner.settings.unique_for));
        true
    }

    fn unlock(&self, address_id: &AddressId) {
        self.inner.locks.lock().remove(&geocode_job_key(address_id));
    }

    async fn next_permit(&self) -> Option<OwnedSemaphorePermit> {
        Arc::clone(&self.inner.workers)
            .acquire_owned()
            .await
            .inspect_err(|err| error!("Queue '{}' is closed: {err}", self.inner.settings.name))
            .ok()
    }

    /// Runs all jobs until the queue is empty.
    pub async fn process_pending<H>(&self, handler: Arc<H>) -> QueueStats
    where
        H: GeocodeJobHandler,
    {
        let mut stats = QueueStats::default();
        let mut jobs = JoinSet::new();
        loop {
            let next = self.inner.receiver.lock().await.try_recv().ok();
            if let Some(address_id) = next {
                let Some(permit) = self.next_permit().await else {
                    break;
                };
                jobs.spawn(
                    self.clone()
                        .run_job(Arc::clone(&handler), address_id, permit),
                );
                continue;
            }
            // Running jobs might still enqueue further jobs
            match jobs.join_next().await {
                Some(result) => stats.record(result),
                None => break,
            }
        }
        while let Some(result) = jobs.join_next().await {
            stats.record(result);
        }
        info!(
            "Processed {} job(s) of queue '{}': {} completed, {} failed",
            stats.completed + stats.failed,
            self.inner.settings.name,
            stats.completed,
            stats.failed
        );
        stats
    }

    /// Runs jobs as they arrive until the returned future is dropped.
    pub async fn run<H>(&self, handler: Arc<H>)
    where
        H: GeocodeJobHandler,
    {
        let QueueSettings { name, workers, .. } = &self.inner.settings;
        info!("Starting queue '{name}' with {workers} worker(s)");
        loop {
            let Some(address_id) = self.inner.receiver.lock().await.recv().await else {
                break;
            };
            let Some(permit) = self.next_permit().await else {
                break;
            };
            tokio::spawn(
                self.clone()
                    .run_job(Arc::clone(&handler), address_id, permit),
            );
        }
        info!("Stopped queue '{name}'");
    }

    async fn run_job<H>(
        self,
        handler: Arc<H>,
        address_id: AddressId,
        _permit: OwnedSemaphorePermit,
    ) -> JobStatus
    where
        H: GeocodeJobHandler,
    {
        let QueueSettings {
            name,
            tries,
            backoff,
            ..
        } = &self.inner.settings;
        let tries = (*tries).max(1);
        let mut attempt = 1;
        let status = loop {
            let job_handler = Arc::clone(&handler);
            let result = task::spawn_blocking(move || job_handler.handle(&address_id)).await;
            match result {
                Ok(Ok(outcome)) => {
                    match outcome {
                        GeocodeOutcome::Geocoded(_) => {
                            debug!("Geocoding job for address {address_id} on queue '{name}' completed");
                        }
                        GeocodeOutcome::Skipped(reason) => {
                            debug!("Geocoding job for address {address_id} on queue '{name}' skipped: {reason}");
                        }
                    }
                    break JobStatus::Completed;
                }
                Ok(Err(err)) if err.is_retryable() && attempt < tries => {
                    warn!(
                        "Geocoding job for address {address_id} on queue '{name}' failed (attempt {attempt} of {tries}): {err}"
                    );
                    attempt += 1;
                    sleep(*backoff).await;
                }
                Ok(Err(err)) => {
                    error!(
                        "Geocoding job for address {address_id} on queue '{name}' failed permanently after {attempt} attempt(s): {err}"
                    );
                    break JobStatus::Failed;
                }
                Err(err) => {
                    error!("Geocoding job for address {address_id} on queue '{name}' aborted: {err}");
                    break JobStatus::Failed;
                }
            }
        };
        self.unlock(&address_id);
        status
    }
}

impl GeocodeJobQueue for GeocodeQueue {
    fn enqueue_geocoding(&self, address_id: &AddressId) -> bool {
        let key = geocode_job_key(address_id);
        if !self.try_lock(key.clone()) {
            debug!("Job {key} is already pending");
            return false;
        }
        if let Err(err) = self.inner.sender.send(*address_id) {
            error!("Failed to enqueue job {key}: {err}");
            self.unlock(address_id);
            return false;
        }
        debug!("Enqueued job {key} on queue '{}'", self.inner.settings.name);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn settings(tries: u32) -> QueueSettings {
        QueueSettings {
            name: "test".into(),
            workers: 2,
            tries,
            backoff: Duration::from_millis(1),
            unique_for: Duration::from_secs(60),
        }
    }

    fn counting_handler<F>(
        result: F,
    ) -> (
        Arc<impl GeocodeJobHandler>,
        Arc<AtomicUsize>,
    )
    where
        F: Fn(&AddressId) -> Result<GeocodeOutcome, GeocodeJobError> + Send + Sync + 'static,
    {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let handler = move |id: &AddressId| {
            counter.fetch_add(1, Ordering::SeqCst);
            result(id)
        };
        (Arc::new(handler), calls)
    }

    fn skipped(_: &AddressId) -> Result<GeocodeOutcome, GeocodeJobError> {
        Ok(GeocodeOutcome::Skipped(
            geoaddr_core::usecases::GeocodeSkipReason::AlreadyGeocoded,
        ))
    }

    #[test]
    fn deduplicate_pending_jobs() {
        let queue = GeocodeQueue::new(settings(3));
        let id = AddressId::new();
        assert!(queue.enqueue_geocoding(&id));
        assert!(!queue.enqueue_geocoding(&id));
        assert!(queue.is_locked(&id));
        assert!(queue.enqueue_geocoding(&AddressId::new()));
    }

    #[test]
    fn expired_lock_is_released() {
        let queue = GeocodeQueue::new(QueueSettings {
            unique_for: Duration::ZERO,
            ..settings(3)
        });
        let id = AddressId::new();
        assert!(queue.enqueue_geocoding(&id));
        assert!(!queue.is_locked(&id));
        assert!(queue.enqueue_geocoding(&id));
    }

    #[test]
    fn lock_beyond_clock_range() {
        let queue = GeocodeQueue::new(QueueSettings {
            unique_for: Duration::MAX,
            ..settings(3)
        });
        let id = AddressId::new();
        assert!(queue.enqueue_geocoding(&id));
        assert!(queue.is_locked(&id));
        assert!(!queue.enqueue_geocoding(&id));
    }

    #[tokio::test]
    async fn process_and_release_jobs() {
        let queue = GeocodeQueue::new(settings(3));
        let (handler, calls) = counting_handler(skipped);
        let first = AddressId::new();
        let second = AddressId::new();
        queue.enqueue_geocoding(&first);
        queue.enqueue_geocoding(&second);
        queue.enqueue_geocoding(&first);
        let stats = queue.process_pending(handler).await;
        assert_eq!(stats, QueueStats { completed: 2, failed: 0 });
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(!queue.is_locked(&first));
        // can be enqueued again once finished
        assert!(queue.enqueue_geocoding(&first));
    }

    #[tokio::test]
    async fn retry_until_tries_are_exhausted() {
        let queue = GeocodeQueue::new(settings(3));
        let (handler, calls) = counting_handler(|id: &AddressId| {
            Err(GeocodeJobError::GeocodingFailed { address_id: *id })
        });
        queue.enqueue_geocoding(&AddressId::new());
        let stats = queue.process_pending(handler).await;
        assert_eq!(stats, QueueStats { completed: 0, failed: 1 });
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn succeed_on_second_try() {
        let queue = GeocodeQueue::new(settings(3));
        let attempts = AtomicUsize::new(0);
        let (handler, calls) = counting_handler(move |id: &AddressId| {
            if attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(GeocodeJobError::GeocodingFailed { address_id: *id })
            } else {
                skipped(id)
            }
        });
        queue.enqueue_geocoding(&AddressId::new());
        let stats = queue.process_pending(handler).await;
        assert_eq!(stats, QueueStats { completed: 1, failed: 0 });
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn do_not_retry_missing_records() {
        let queue = GeocodeQueue::new(settings(3));
        let (handler, calls) = counting_handler(|_: &AddressId| {
            Err(GeocodeJobError::Repo(geoaddr_core::RepoError::NotFound))
        });
        queue.enqueue_geocoding(&AddressId::new());
        let stats = queue.process_pending(handler).await;
        assert_eq!(stats.failed, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn run_until_stopped() {
        let queue = GeocodeQueue::new(settings(1));
        let (handler, calls) = counting_handler(skipped);
        let id = AddressId::new();
        queue.enqueue_geocoding(&id);
        let worker = tokio::spawn({
            let queue = queue.clone();
            async move { queue.run(handler).await }
        });
        for _ in 0..100 {
            if !queue.is_locked(&id) {
                break;
            }
            sleep(Duration::from_millis(10)).await;
        }
        worker.abort();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!queue.is_locked(&id));
    }
}
