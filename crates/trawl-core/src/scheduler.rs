//! Per-source scan loop.
//!
//! Each registered source gets one [`SourceScheduler`] running on its own
//! task. On every tick it fetches the source's seed page, extracts article
//! links and pushes each link it has not dispatched before onto the work
//! channel. Control-plane calls flip its state and wake the loop.

use std::collections::HashSet;
use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::AppError;
use crate::job::{ArticleJob, SourceState};
use crate::queue::JobSender;
use crate::traits::{Fetcher, SourceExtractor};
use crate::util::{deadline_after, panic_message};

struct Schedule {
    state: SourceState,
    interval: Duration,
    next_fire: Instant,
}

struct Shared {
    schedule: Mutex<Schedule>,
    wake: Notify,
    dispatched: Mutex<HashSet<String>>,
}

/// Point-in-time view of a scheduler, for listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceStatus {
    pub id: String,
    pub seed_url: String,
    pub state: SourceState,
    pub interval: Duration,
    /// Distinct article URLs handed to workers so far.
    pub dispatched: usize,
}

/// Handle to one source's schedule. Clones share the same state.
#[derive(Clone)]
pub struct SourceScheduler {
    id: String,
    seed_url: String,
    extractor: Arc<dyn SourceExtractor>,
    shared: Arc<Shared>,
    cancel: CancellationToken,
}

impl SourceScheduler {
    /// Create an active scheduler whose first scan is one `interval` away.
    pub fn new(
        id: impl Into<String>,
        seed_url: impl Into<String>,
        extractor: Arc<dyn SourceExtractor>,
        interval: Duration,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            id: id.into(),
            seed_url: seed_url.into(),
            extractor,
            shared: Arc::new(Shared {
                schedule: Mutex::new(Schedule {
                    state: SourceState::Active,
                    interval,
                    next_fire: deadline_after(interval),
                }),
                wake: Notify::new(),
                dispatched: Mutex::new(HashSet::new()),
            }),
            cancel,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> SourceState {
        self.schedule().state
    }

    pub fn interval(&self) -> Duration {
        self.schedule().interval
    }

    /// Pause scanning. Pausing an already paused source is a no-op.
    pub fn stop(&self) -> Result<(), AppError> {
        {
            let mut schedule = self.schedule();
            if schedule.state.is_terminal() {
                return Err(AppError::SourceNotFound(self.id.clone()));
            }
            schedule.state = SourceState::Paused;
        }
        self.shared.wake.notify_one();
        tracing::info!(source = %self.id, "Source paused");
        Ok(())
    }

    /// Resume a paused source. The next scan comes one full interval from now.
    pub fn resume(&self) -> Result<(), AppError> {
        {
            let mut schedule = self.schedule();
            match schedule.state {
                SourceState::Active => {
                    return Err(AppError::SourceAlreadyActive(self.id.clone()));
                }
                SourceState::Retired => return Err(AppError::SourceNotFound(self.id.clone())),
                SourceState::Paused => {
                    schedule.state = SourceState::Active;
                    schedule.next_fire = deadline_after(schedule.interval);
                }
            }
        }
        self.shared.wake.notify_one();
        tracing::info!(source = %self.id, "Source resumed");
        Ok(())
    }

    /// Replace the poll interval. The pending deadline is kept; the new
    /// interval applies from the following cycle.
    pub fn set_interval(&self, interval: Duration) {
        self.schedule().interval = interval;
        tracing::info!(source = %self.id, interval = ?interval, "Source interval changed");
    }

    /// Permanently stop the source and cancel its queued jobs.
    pub fn retire(&self) {
        self.schedule().state = SourceState::Retired;
        self.cancel.cancel();
        self.shared.wake.notify_one();
        tracing::info!(source = %self.id, "Source retired");
    }

    pub fn status(&self) -> SourceStatus {
        let (state, interval) = {
            let schedule = self.schedule();
            (schedule.state, schedule.interval)
        };
        SourceStatus {
            id: self.id.clone(),
            seed_url: self.seed_url.clone(),
            state,
            interval,
            dispatched: self.dispatched().len(),
        }
    }

    /// Run one scan of the seed page. Returns the number of jobs sent.
    ///
    /// Fetch failures and extractor panics are logged and end the scan with
    /// nothing sent. Each URL is sent at most once over the scheduler's life.
    pub async fn scan<F: Fetcher>(&self, fetcher: &F, jobs: &JobSender) -> usize {
        let html = match fetcher.fetch(&self.seed_url).await {
            Ok(html) => html,
            Err(e) => {
                tracing::warn!(source = %self.id, url = %self.seed_url, error = %e, "Seed page fetch failed");
                return 0;
            }
        };

        let links = match catch_unwind(AssertUnwindSafe(|| self.extractor.extract_links(&html))) {
            Ok(links) => links,
            Err(payload) => {
                tracing::error!(
                    source = %self.id,
                    panic = %panic_message(payload.as_ref()),
                    "Link extraction panicked"
                );
                return 0;
            }
        };

        let found = links.len();
        let mut sent = 0;
        for url in links {
            if url.is_empty() || self.dispatched().contains(&url) {
                continue;
            }

            let job = ArticleJob {
                url: url.clone(),
                source_id: self.id.clone(),
                extractor: Arc::clone(&self.extractor),
                cancel: self.cancel.clone(),
            };
            tokio::select! {
                () = self.cancel.cancelled() => break,
                result = jobs.send(job) => {
                    if result.is_err() {
                        tracing::warn!(source = %self.id, "Work channel closed, ending scan");
                        break;
                    }
                }
            }

            self.dispatched().insert(url);
            sent += 1;
        }

        tracing::info!(source = %self.id, found, sent, "Scan finished");
        sent
    }

    /// Drive the schedule until the source is retired or cancelled.
    pub async fn run<F: Fetcher>(self, fetcher: F, jobs: JobSender) {
        tracing::info!(source = %self.id, "Source scheduler started");

        loop {
            let (state, deadline) = {
                let schedule = self.schedule();
                (schedule.state, schedule.next_fire)
            };

            match state {
                SourceState::Retired => break,
                SourceState::Paused => {
                    tokio::select! {
                        () = self.cancel.cancelled() => break,
                        () = self.shared.wake.notified() => continue,
                    }
                }
                SourceState::Active => {
                    tokio::select! {
                        () = self.cancel.cancelled() => break,
                        () = self.shared.wake.notified() => continue,
                        () = tokio::time::sleep_until(deadline) => {}
                    }

                    // State may have changed while the timer was pending.
                    if !self.fire_due() {
                        continue;
                    }
                    self.scan(&fetcher, &jobs).await;
                    self.rearm();
                }
            }
        }

        tracing::info!(source = %self.id, "Source scheduler stopped");
    }

    fn fire_due(&self) -> bool {
        let schedule = self.schedule();
        schedule.state == SourceState::Active && Instant::now() >= schedule.next_fire
    }

    fn rearm(&self) {
        let mut schedule = self.schedule();
        schedule.next_fire = deadline_after(schedule.interval);
    }

    fn schedule(&self) -> MutexGuard<'_, Schedule> {
        self.shared
            .schedule
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn dispatched(&self) -> MutexGuard<'_, HashSet<String>> {
        self.shared
            .dispatched
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for SourceScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceScheduler")
            .field("id", &self.id)
            .field("seed_url", &self.seed_url)
            .field("state", &self.state())
            .finish()
    }
}
