//! The harvesting engine as one explicit context object.
//!
//! A [`Harvester`] owns the live source set, the work channel, the worker
//! pool and the flush loop. It is also the control-plane boundary: the HTTP
//! layer calls [`stop`](Harvester::stop), [`resume`](Harvester::resume),
//! [`set_interval`](Harvester::set_interval) and [`delete`](Harvester::delete)
//! on a shared instance.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use uuid::Uuid;

use crate::buffer::{FlushLoop, FlushReport, ResultBuffer};
use crate::config::HarvestConfig;
use crate::error::AppError;
use crate::queue::{JobReceiver, JobSender, work_channel};
use crate::registry::ExtractorRegistry;
use crate::scheduler::{SourceScheduler, SourceStatus};
use crate::traits::{ArticleStore, Fetcher};
use crate::util::parse_duration;
use crate::worker::{TracingWorkerReporter, Worker};

type SourceMap = HashMap<String, SourceScheduler>;

pub struct Harvester<F: Fetcher, S: ArticleStore> {
    fetcher: F,
    store: S,
    registry: Arc<ExtractorRegistry>,
    config: HarvestConfig,
    sources: Mutex<SourceMap>,
    jobs_tx: JobSender,
    jobs_rx: JobReceiver,
    buffer: ResultBuffer,
    cancel: CancellationToken,
    flush_cancel: CancellationToken,
    tracker: TaskTracker,
    flush_task: StdMutex<Option<JoinHandle<()>>>,
    started: AtomicBool,
}

impl<F, S> Harvester<F, S>
where
    F: Fetcher + 'static,
    S: ArticleStore + 'static,
{
    pub fn new(
        fetcher: F,
        store: S,
        registry: Arc<ExtractorRegistry>,
        config: HarvestConfig,
    ) -> Self {
        let (jobs_tx, jobs_rx) = work_channel(config.queue_capacity);
        Self {
            fetcher,
            store,
            registry,
            config,
            sources: Mutex::new(HashMap::new()),
            jobs_tx,
            jobs_rx,
            buffer: ResultBuffer::new(),
            cancel: CancellationToken::new(),
            flush_cancel: CancellationToken::new(),
            tracker: TaskTracker::new(),
            flush_task: StdMutex::new(None),
            started: AtomicBool::new(false),
        }
    }

    /// Load the persisted catalog, then spawn one scheduler per catalog
    /// source, the worker pool and the flush loop.
    ///
    /// The registry seeds the catalog only while it is empty, so a deleted
    /// source stays deleted across restarts. Catalog rows without a
    /// registered extractor are skipped. Returns the number of sources
    /// started.
    pub async fn start(&self) -> Result<usize, AppError> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(AppError::ConfigError("harvester already started".into()));
        }

        let mut catalog = self.store.list_sources().await?;
        if catalog.is_empty() {
            for row in self.registry.catalog() {
                self.store.register_source(&row).await?;
            }
            catalog = self.store.list_sources().await?;
            tracing::info!(sources = catalog.len(), "Seeded empty catalog from registry");
        }

        let mut sources = self.sources.lock().await;
        for row in catalog {
            let plugin = match self.registry.lookup(&row.id) {
                Ok(plugin) => plugin,
                Err(_) => {
                    tracing::warn!(source = %row.id, "No extractor registered, skipping source");
                    continue;
                }
            };

            let scheduler = SourceScheduler::new(
                row.id.clone(),
                row.seed_url,
                Arc::clone(&plugin.extractor),
                self.config.default_interval,
                self.cancel.child_token(),
            );
            self.tracker
                .spawn(scheduler.clone().run(self.fetcher.clone(), self.jobs_tx.clone()));
            sources.insert(row.id, scheduler);
        }
        let started = sources.len();
        drop(sources);

        for id in 0..self.config.workers {
            let worker = Worker::new(
                id,
                self.fetcher.clone(),
                self.jobs_rx.clone(),
                self.buffer.clone(),
            );
            let cancel = self.cancel.clone();
            self.tracker
                .spawn(async move { worker.run(cancel, &TracingWorkerReporter).await });
        }

        let flush = FlushLoop::new(
            self.buffer.clone(),
            self.store.clone(),
            self.config.flush_interval,
        );
        let handle = tokio::spawn(flush.run(self.flush_cancel.clone()));
        *self
            .flush_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(handle);

        tracing::info!(
            sources = started,
            workers = self.config.workers,
            interval = ?self.config.default_interval,
            "Harvester started"
        );
        Ok(started)
    }

    /// Stop schedulers and workers, then run the final flush.
    pub async fn shutdown(&self) {
        tracing::info!("Harvester shutting down");
        self.cancel.cancel();
        self.tracker.close();
        self.tracker.wait().await;

        self.flush_cancel.cancel();
        let handle = self
            .flush_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle
            && let Err(e) = handle.await
        {
            tracing::error!(error = %e, "Flush task failed");
        }
        tracing::info!("Harvester stopped");
    }

    /// Pause a source.
    pub async fn stop(&self, id: &str) -> Result<(), AppError> {
        let sources = self.sources.lock().await;
        live(&sources, id)?.stop()
    }

    /// Resume a paused source.
    pub async fn resume(&self, id: &str) -> Result<(), AppError> {
        let sources = self.sources.lock().await;
        live(&sources, id)?.resume()
    }

    /// Change a source's poll interval from a string such as `"5m"`.
    ///
    /// The source must exist before the duration is looked at; on any error
    /// the interval is left as it was.
    pub async fn set_interval(&self, id: &str, interval: &str) -> Result<Duration, AppError> {
        let sources = self.sources.lock().await;
        let scheduler = live(&sources, id)?;
        let interval = parse_duration(interval)?;
        scheduler.set_interval(interval);
        Ok(interval)
    }

    /// Remove a source and all of its stored articles.
    ///
    /// Storage goes first. If the cascade fails the source keeps running and
    /// stays in the catalog. Otherwise the scheduler is retired, its queued
    /// jobs are discarded by the workers and its unflushed records are
    /// dropped. Returns the ids of the deleted articles.
    pub async fn delete(&self, id: &str) -> Result<Vec<Uuid>, AppError> {
        let mut sources = self.sources.lock().await;
        live(&sources, id)?;

        let deleted = self.store.delete_source(id).await.inspect_err(|e| {
            tracing::error!(source = %id, error = %e, "Cascade delete failed, source kept");
        })?;

        if let Some(scheduler) = sources.remove(id) {
            scheduler.retire();
        }
        let purged = self.buffer.discard_source(id);
        tracing::info!(source = %id, articles = deleted.len(), purged, "Source deleted");
        Ok(deleted)
    }

    /// Status of every live source, sorted by id.
    pub async fn sources(&self) -> Vec<SourceStatus> {
        let sources = self.sources.lock().await;
        let mut statuses: Vec<_> = sources.values().map(SourceScheduler::status).collect();
        statuses.sort_by(|a, b| a.id.cmp(&b.id));
        statuses
    }

    pub async fn source(&self, id: &str) -> Result<SourceStatus, AppError> {
        let sources = self.sources.lock().await;
        Ok(live(&sources, id)?.status())
    }

    /// Flush the buffer immediately, outside the periodic schedule.
    pub async fn flush_now(&self) -> FlushReport {
        FlushLoop::new(
            self.buffer.clone(),
            self.store.clone(),
            self.config.flush_interval,
        )
        .flush_once()
        .await
    }

    pub fn config(&self) -> &HarvestConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

fn live<'a>(sources: &'a SourceMap, id: &str) -> Result<&'a SourceScheduler, AppError> {
    sources
        .get(id)
        .ok_or_else(|| AppError::SourceNotFound(id.to_string()))
}
