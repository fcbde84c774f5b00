//! Page readiness probing.
//!
//! Google result markup is JS-rendered and its DOM markers are not stable,
//! so readiness is an ordered cascade of increasingly weak signals, each
//! with its own bound. Nothing here is fatal: when every probe times out the
//! caller proceeds anyway and leans on the extractor's fallback path.

use std::time::Duration;

use tracing::debug;

use super::session::SearchSession;

/// Marker for a fully rendered results page.
pub const RESULTS_CONTAINER_SELECTOR: &str = "div[data-sokoban-container]";
/// Marker for an individual organic result; the page may still be partial.
pub const RESULT_ITEM_SELECTOR: &str = "div[data-rank]";

const CONTAINER_TIMEOUT: Duration = Duration::from_secs(10);
const RESULT_ITEM_TIMEOUT: Duration = Duration::from_secs(10);
const BODY_TIMEOUT: Duration = Duration::from_secs(8);

/// Which signal confirmed the page, strongest first. Diagnostic only —
/// extraction runs regardless of the outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadinessSignal {
    /// The results container rendered.
    Container,
    /// At least one result item rendered.
    ResultItem,
    /// Only the document body was confirmed; a short settle delay was
    /// applied to let late scripts run.
    Body,
    /// Every probe timed out; proceeding on hope and the fallback extractor.
    TimedOut,
}

impl ReadinessSignal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Container => "container",
            Self::ResultItem => "result-item",
            Self::Body => "body",
            Self::TimedOut => "timed-out",
        }
    }
}

/// Walk the probe cascade until one signal fires.
///
/// `settle` is the fixed delay applied after the body-only probe (the page
/// exists but nothing result-shaped was seen, so give scripts a moment).
pub async fn await_ready(session: &mut dyn SearchSession, settle: Duration) -> ReadinessSignal {
    if session
        .wait_for_selector(RESULTS_CONTAINER_SELECTOR, CONTAINER_TIMEOUT)
        .await
    {
        return ReadinessSignal::Container;
    }
    debug!("results container not seen, probing individual results");

    if session
        .wait_for_selector(RESULT_ITEM_SELECTOR, RESULT_ITEM_TIMEOUT)
        .await
    {
        return ReadinessSignal::ResultItem;
    }
    debug!("result items not seen, probing body");

    if session.wait_for_selector("body", BODY_TIMEOUT).await {
        tokio::time::sleep(settle).await;
        return ReadinessSignal::Body;
    }

    ReadinessSignal::TimedOut
}
