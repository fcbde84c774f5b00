//! The session seam the run loop drives, plus its control signals.
//!
//! The pagination driver and readiness prober only ever talk to a
//! [`SearchSession`], so the whole state machine can be exercised against an
//! in-memory fake; the production implementation lives in
//! [`browser`](super::browser).

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use super::{PageError, ScrapeError};

/// One browser plus one active result page, exclusively owned by a run.
#[async_trait]
pub trait SearchSession: Send {
    /// Load `url`, blocking until the page settles or the navigation
    /// ceiling elapses. A timeout is reported as [`PageError::Timeout`] and
    /// is non-fatal to the surrounding run.
    async fn navigate(&mut self, url: &str) -> Result<(), PageError>;

    /// Poll for a CSS selector until it appears or `timeout` elapses.
    /// Returns whether the selector was seen.
    async fn wait_for_selector(&mut self, css: &str, timeout: Duration) -> bool;

    /// The page's rendered visible text (`document.body.innerText`).
    async fn visible_text(&mut self) -> Result<String, PageError>;

    /// The page's raw markup, for fallback extraction.
    async fn page_content(&mut self) -> Result<String, PageError>;

    /// Release the page and browser. Must be safe to call more than once
    /// and after a partially failed setup.
    async fn close(&mut self);
}

/// Launches sessions for the pagination driver. One launch per run.
#[async_trait]
pub trait SessionLauncher: Send + Sync {
    async fn launch(&self, opts: &SessionOptions) -> Result<Box<dyn SearchSession>, ScrapeError>;
}

/// Per-run browser options.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub headless: bool,
    /// Keep the window visible and usable for manual interaction.
    pub interactive: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            headless: true,
            interactive: false,
        }
    }
}

/// Externally settable pause/stop flags, observed cooperatively by the run
/// loop at its poll points. Setting a flag never interrupts an in-flight
/// page operation; it takes effect at the next poll.
#[derive(Debug, Default)]
pub struct ControlSignals {
    paused: AtomicBool,
    stopped: AtomicBool,
}

impl ControlSignals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
    }

    pub fn stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    pub fn stop_requested(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Runs start from "not paused, not stopped" even when the caller reuses
    /// the same signal pair across runs.
    pub fn reset(&self) {
        self.paused.store(false, Ordering::SeqCst);
        self.stopped.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signals_default_clear_and_reset() {
        let signals = ControlSignals::new();
        assert!(!signals.is_paused());
        assert!(!signals.stop_requested());

        signals.pause();
        signals.stop();
        assert!(signals.is_paused());
        assert!(signals.stop_requested());

        signals.reset();
        assert!(!signals.is_paused());
        assert!(!signals.stop_requested());
    }

    #[test]
    fn resume_only_clears_pause() {
        let signals = ControlSignals::new();
        signals.pause();
        signals.stop();
        signals.resume();
        assert!(!signals.is_paused());
        assert!(signals.stop_requested());
    }
}
