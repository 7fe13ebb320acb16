use std::panic::{AssertUnwindSafe, catch_unwind};

use tokio_util::sync::CancellationToken;

use crate::buffer::ResultBuffer;
use crate::error::AppError;
use crate::job::ArticleJob;
use crate::models::ArticleRecord;
use crate::queue::JobReceiver;
use crate::traits::Fetcher;
use crate::util::panic_message;

/// Events emitted by the worker for monitoring/logging.
#[derive(Debug, Clone)]
pub enum WorkerEvent<'a> {
    Started {
        worker_id: usize,
    },
    JobReceived {
        job: &'a ArticleJob,
    },
    JobDiscarded {
        source_id: &'a str,
        url: &'a str,
    },
    RecordBuffered {
        source_id: &'a str,
        url: &'a str,
    },
    ExtractionFailed {
        source_id: &'a str,
        url: &'a str,
        error: &'a AppError,
    },
    Stopped {
        worker_id: usize,
    },
}

/// Trait for receiving worker events (decoupled logging).
pub trait WorkerReporter: Send + Sync {
    fn report(&self, event: WorkerEvent<'_>) {
        let _ = event;
    }
}

/// Reporter that uses the `tracing` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingWorkerReporter;

impl WorkerReporter for TracingWorkerReporter {
    fn report(&self, event: WorkerEvent<'_>) {
        match event {
            WorkerEvent::Started { worker_id } => {
                tracing::info!(%worker_id, "Worker started");
            }
            WorkerEvent::JobReceived { job } => {
                tracing::debug!(source = %job.source_id, url = %job.url, "Job received");
            }
            WorkerEvent::JobDiscarded { source_id, url } => {
                tracing::debug!(source = %source_id, %url, "Job of retired source discarded");
            }
            WorkerEvent::RecordBuffered { source_id, url } => {
                tracing::debug!(source = %source_id, %url, "Record buffered");
            }
            WorkerEvent::ExtractionFailed {
                source_id,
                url,
                error,
            } => {
                tracing::warn!(source = %source_id, %url, %error, "Extraction failed, buffering partial record");
            }
            WorkerEvent::Stopped { worker_id } => {
                tracing::info!(%worker_id, "Worker stopped");
            }
        }
    }
}

/// One member of the worker pool: pulls jobs, fetches and extracts each
/// article, and appends the result to the shared buffer.
pub struct Worker<F: Fetcher> {
    id: usize,
    fetcher: F,
    jobs: JobReceiver,
    buffer: ResultBuffer,
}

impl<F: Fetcher> Worker<F> {
    pub fn new(id: usize, fetcher: F, jobs: JobReceiver, buffer: ResultBuffer) -> Self {
        Self {
            id,
            fetcher,
            jobs,
            buffer,
        }
    }

    /// Run until cancellation or until the channel closes.
    pub async fn run<WR: WorkerReporter>(self, cancel_token: CancellationToken, reporter: &WR) {
        reporter.report(WorkerEvent::Started { worker_id: self.id });

        loop {
            let job = tokio::select! {
                () = cancel_token.cancelled() => break,
                job = self.jobs.recv() => match job {
                    Some(job) => job,
                    None => break,
                },
            };
            reporter.report(WorkerEvent::JobReceived { job: &job });
            self.process_job(&job, reporter).await;
        }

        reporter.report(WorkerEvent::Stopped { worker_id: self.id });
    }

    /// Turn one job into a buffered record.
    ///
    /// Fetch errors and extractor panics still buffer a partial record
    /// carrying the URL and source id; validation at flush time drops it.
    pub async fn process_job<WR: WorkerReporter>(&self, job: &ArticleJob, reporter: &WR) {
        if job.is_retired() {
            reporter.report(WorkerEvent::JobDiscarded {
                source_id: &job.source_id,
                url: &job.url,
            });
            return;
        }

        let mut record = match self.extract(job).await {
            Ok(record) => record,
            Err(e) => {
                reporter.report(WorkerEvent::ExtractionFailed {
                    source_id: &job.source_id,
                    url: &job.url,
                    error: &e,
                });
                ArticleRecord::partial(&job.url, &job.source_id)
            }
        };

        // The source may have been deleted while the page was downloading.
        if job.is_retired() {
            reporter.report(WorkerEvent::JobDiscarded {
                source_id: &job.source_id,
                url: &job.url,
            });
            return;
        }

        record.source_id = job.source_id.clone();
        if record.url.trim().is_empty() {
            record.url = job.url.clone();
        }

        self.buffer.push(record);
        reporter.report(WorkerEvent::RecordBuffered {
            source_id: &job.source_id,
            url: &job.url,
        });
    }

    async fn extract(&self, job: &ArticleJob) -> Result<ArticleRecord, AppError> {
        let html = self.fetcher.fetch(&job.url).await?;
        catch_unwind(AssertUnwindSafe(|| job.extractor.extract_record(&html, &job.url))).map_err(
            |payload| {
                AppError::ValidationError(format!(
                    "extractor panicked: {}",
                    panic_message(payload.as_ref())
                ))
            },
        )
    }
}
