//! Browser-driven collection of Google result pages.
//!
//! The pieces fit together like this:
//! * [`session`] — the `SearchSession` seam plus the cooperative
//!   pause/stop control signals.
//! * [`browser`] — the chromiumoxide-backed session (executable discovery,
//!   stealth launch, navigation, interactive helpers).
//! * [`readiness`] — the cascade of "has the page rendered yet?" probes.
//! * [`extract`] — visible-text extraction with a markup-strip fallback.
//! * [`search_loop`] — the paginated run state machine tying it together.

pub mod browser;
pub mod extract;
pub mod readiness;
pub mod search_loop;
pub mod session;

pub use session::{ControlSignals, SearchSession, SessionLauncher, SessionOptions};

use std::time::Duration;
use thiserror::Error;

/// Failure that aborts a run before any page was fetched.
///
/// This is the only error that crosses the run boundary; everything that
/// happens after the browser is up degrades to log lines and a shorter
/// result instead (see [`search_loop`]).
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("no usable browser executable found (set CHROME_EXECUTABLE to override discovery)")]
    BrowserNotFound,

    #[error("browser launch failed: {0}")]
    Launch(String),
}

/// Failure of a single page operation. Absorbed at the per-page boundary.
#[derive(Debug, Error)]
pub enum PageError {
    #[error("page operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("{0}")]
    Cdp(String),
}
