//! Shared job-state map. One `Arc<AppState>` is shared by all HTTP
//! handlers and job workers; every access goes through the lock.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::sync::Arc;

use crate::core::types::JobStatus;
use crate::scraping::ControlSignals;

/// Retained log lines per job; older lines are dropped.
pub const LOG_CAP: usize = 200;

/// Everything a job accumulates over its lifetime. Control signals are
/// shared with the worker so pause/stop land while the run is in flight.
#[derive(Debug)]
pub struct JobState {
    pub status: JobStatus,
    pub progress: u8,
    pub logs: Vec<String>,
    pub keywords: String,
    pub max_pages: usize,
    pub headless_mode: bool,
    pub exclude_free_emails: bool,
    pub scraped_text: String,
    pub emails_found: Vec<String>,
    pub error: Option<String>,
    pub signals: Arc<ControlSignals>,
}

impl JobState {
    pub fn new(
        keywords: String,
        max_pages: usize,
        headless_mode: bool,
        exclude_free_emails: bool,
    ) -> Self {
        Self {
            status: JobStatus::Idle,
            progress: 0,
            logs: Vec::new(),
            keywords,
            max_pages,
            headless_mode,
            exclude_free_emails,
            scraped_text: String::new(),
            emails_found: Vec::new(),
            error: None,
            signals: Arc::new(ControlSignals::new()),
        }
    }

    /// Append a log line, keeping at most [`LOG_CAP`] lines.
    pub fn log(&mut self, message: impl Into<String>) {
        self.logs.push(message.into());
        if self.logs.len() > LOG_CAP {
            let excess = self.logs.len() - LOG_CAP;
            self.logs.drain(..excess);
        }
    }
}

#[derive(Debug, Default)]
pub struct AppState {
    jobs: Mutex<HashMap<String, JobState>>,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_jobs(&self) -> MutexGuard<'_, HashMap<String, JobState>> {
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn insert_job(&self, job_id: String, job: JobState) {
        self.lock_jobs().insert(job_id, job);
    }

    /// Run `f` against the named job under the lock. Returns `None` when the
    /// job does not exist. `f` must not block.
    pub fn with_job<R>(&self, job_id: &str, f: impl FnOnce(&mut JobState) -> R) -> Option<R> {
        self.lock_jobs().get_mut(job_id).map(f)
    }

    pub fn contains_job(&self, job_id: &str) -> bool {
        self.lock_jobs().contains_key(job_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_is_capped() {
        let mut job = JobState::new("kw".into(), 1, true, false);
        for i in 0..(LOG_CAP + 25) {
            job.log(format!("line {i}"));
        }
        assert_eq!(job.logs.len(), LOG_CAP);
        assert_eq!(job.logs[0], "line 25");
    }

    #[test]
    fn with_job_returns_none_for_unknown_id() {
        let state = AppState::new();
        assert!(!state.contains_job("missing"));
        assert!(state.with_job("missing", |_| ()).is_none());
    }

    #[test]
    fn with_job_mutates_in_place() {
        let state = AppState::new();
        state.insert_job("j1".into(), JobState::new("kw".into(), 3, true, false));
        state.with_job("j1", |job| {
            job.status = JobStatus::Running;
            job.progress = 10;
        });
        let progress = state.with_job("j1", |job| job.progress);
        assert_eq!(progress, Some(10));
    }
}
