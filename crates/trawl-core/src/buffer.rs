//! Shared result buffer and the periodic flush that drains it into storage.

use std::mem;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::models::ArticleRecord;
use crate::util::{MAX_INTERVAL, deadline_after};
use crate::traits::ArticleStore;

/// Records produced by workers and not yet flushed.
#[derive(Debug, Clone, Default)]
pub struct ResultBuffer {
    records: Arc<Mutex<Vec<ArticleRecord>>>,
}

impl ResultBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, record: ArticleRecord) {
        self.lock().push(record);
    }

    /// Take every buffered record, leaving the buffer empty.
    ///
    /// The lock is held only for the swap so workers are never blocked on
    /// storage I/O.
    pub fn drain(&self) -> Vec<ArticleRecord> {
        mem::take(&mut *self.lock())
    }

    /// Drop every buffered record of `source_id`. Returns how many went.
    pub fn discard_source(&self, source_id: &str) -> usize {
        let mut records = self.lock();
        let before = records.len();
        records.retain(|record| record.source_id != source_id);
        before - records.len()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<ArticleRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Outcome of one flush pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushReport {
    pub written: usize,
    /// Records that failed validation.
    pub dropped: usize,
    /// Valid records the store refused.
    pub failed: usize,
}

impl FlushReport {
    pub fn total(&self) -> usize {
        self.written + self.dropped + self.failed
    }
}

pub struct FlushLoop<S: ArticleStore> {
    buffer: ResultBuffer,
    store: S,
    period: Duration,
}

impl<S: ArticleStore> FlushLoop<S> {
    pub fn new(buffer: ResultBuffer, store: S, period: Duration) -> Self {
        Self {
            buffer,
            store,
            period: period.clamp(Duration::from_millis(1), MAX_INTERVAL),
        }
    }

    /// Drain the buffer and write every record that validates.
    ///
    /// A failing write is logged and does not stop the rest of the batch.
    /// Failed records are not re-buffered.
    pub async fn flush_once(&self) -> FlushReport {
        let batch = self.buffer.drain();
        let mut report = FlushReport::default();

        for record in batch {
            let article = match record.validate() {
                Ok(article) => article,
                Err(e) => {
                    tracing::warn!(source = %record.source_id, url = %record.url, error = %e, "Dropping invalid record");
                    report.dropped += 1;
                    continue;
                }
            };

            match self.store.write_record(&article).await {
                Ok(id) => {
                    tracing::debug!(%id, url = %article.url, "Article stored");
                    report.written += 1;
                }
                Err(e) => {
                    tracing::error!(source = %article.source_id, url = %article.url, error = %e, "Failed to store article");
                    report.failed += 1;
                }
            }
        }

        if report.total() > 0 {
            tracing::info!(
                written = report.written,
                dropped = report.dropped,
                failed = report.failed,
                "Flush complete"
            );
        }
        report
    }

    /// Flush every `period` until cancelled, then flush one last time.
    pub async fn run(self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval_at(deadline_after(self.period), self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    self.flush_once().await;
                }
            }
        }

        let report = self.flush_once().await;
        tracing::info!(written = report.written, "Flush loop stopped");
    }
}
