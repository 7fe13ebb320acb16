//! The work distribution channel between source schedulers and workers.
//!
//! Bounded on purpose: when every worker is busy and the buffer slots are
//! taken, `send` suspends the scanning source, which in turn delays its next
//! scan. That back-pressure is what keeps a slow store from letting work
//! pile up without limit.

use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};

use crate::job::ArticleJob;

/// Producer half, cloned into every source scheduler.
pub type JobSender = mpsc::Sender<ArticleJob>;

/// Consumer half, shared by all workers.
#[derive(Clone)]
pub struct JobReceiver {
    inner: Arc<Mutex<mpsc::Receiver<ArticleJob>>>,
}

impl JobReceiver {
    /// Wait for the next job. Returns `None` once every sender is gone.
    ///
    /// Only one worker waits on the channel at a time; the rest queue on the
    /// mutex, so each job goes to exactly one worker.
    pub async fn recv(&self) -> Option<ArticleJob> {
        self.inner.lock().await.recv().await
    }
}

/// Create the channel. A capacity of zero is raised to one, the smallest
/// buffer Tokio allows.
pub fn work_channel(capacity: usize) -> (JobSender, JobReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (
        tx,
        JobReceiver {
            inner: Arc::new(Mutex::new(rx)),
        },
    )
}
