//! The paginated search run: one session, `max_pages` result fetches,
//! cooperative pause/stop, per-page failure isolation, unconditional
//! teardown.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::core::config;

use super::extract::extract_page_text;
use super::readiness::await_ready;
use super::session::{ControlSignals, SearchSession, SessionLauncher, SessionOptions};
use super::{PageError, ScrapeError};

/// The one URL scheme this system targets.
pub const GOOGLE_SEARCH_BASE: &str = "https://www.google.com/search";

/// Google paginates organic results ten per page.
pub const RESULTS_PER_PAGE: usize = 10;

/// Immutable per-run parameters. The caller validates `keywords` non-blank
/// and `max_pages >= 1` before invoking.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub keywords: String,
    pub max_pages: usize,
    pub headless: bool,
    pub interactive: bool,
}

/// The loop's fixed waits. [`Default`] carries the production values;
/// tests shrink them to keep runs instant.
#[derive(Debug, Clone)]
pub struct LoopDelays {
    /// Poll interval while the pause flag is held.
    pub pause_poll: Duration,
    /// Cool-down between result pages.
    pub inter_page: Duration,
    /// Settle delay after a body-only readiness confirmation.
    pub render_settle: Duration,
}

impl Default for LoopDelays {
    fn default() -> Self {
        Self {
            pause_poll: Duration::from_millis(500),
            inter_page: config::inter_page_delay(),
            render_settle: Duration::from_secs(2),
        }
    }
}

/// Drives one paginated scraping run at a time. Each run owns its own
/// session; concurrent runs take one `SearchScraper` instance each.
pub struct SearchScraper<L: SessionLauncher> {
    launcher: L,
    signals: Arc<ControlSignals>,
    delays: LoopDelays,
}

impl<L: SessionLauncher> SearchScraper<L> {
    pub fn new(launcher: L) -> Self {
        Self::with_signals(launcher, Arc::new(ControlSignals::new()))
    }

    /// Share externally owned control signals, e.g. a job's pause/stop
    /// surface.
    pub fn with_signals(launcher: L, signals: Arc<ControlSignals>) -> Self {
        Self {
            launcher,
            signals,
            delays: LoopDelays::default(),
        }
    }

    pub fn with_delays(mut self, delays: LoopDelays) -> Self {
        self.delays = delays;
        self
    }

    pub fn signals(&self) -> Arc<ControlSignals> {
        Arc::clone(&self.signals)
    }

    /// Request cooperative pause; honored at the top of the next iteration.
    pub fn pause(&self) {
        self.signals.pause();
    }

    pub fn resume(&self) {
        self.signals.resume();
    }

    /// Request cooperative termination. In-flight page work finishes first.
    pub fn stop(&self) {
        self.signals.stop();
    }

    /// Run the full paginated fetch and return the accumulated text, one
    /// newline-terminated block per successfully extracted page.
    ///
    /// Fails only when the session itself cannot be established; every
    /// per-page failure is logged and skipped, so a run where all pages
    /// failed still returns an empty string.
    pub async fn run<F>(&self, cfg: &RunConfig, mut on_progress: F) -> Result<String, ScrapeError>
    where
        F: FnMut(usize, usize),
    {
        self.signals.reset();

        let opts = SessionOptions {
            headless: cfg.headless,
            interactive: cfg.interactive,
        };
        let mut session = self.launcher.launch(&opts).await?;

        let mut all_text = String::new();

        for page_num in 0..cfg.max_pages {
            // Poll point: stop breaks before any work on this page starts.
            if self.signals.stop_requested() {
                info!("scraping stopped by caller");
                break;
            }

            // Poll point: pause blocks progression but holds no page
            // resources.
            while self.signals.is_paused() {
                tokio::time::sleep(self.delays.pause_poll).await;
                if self.signals.stop_requested() {
                    break;
                }
            }
            if self.signals.stop_requested() {
                info!("scraping stopped by caller");
                break;
            }

            let url = page_url(&cfg.keywords, page_num);
            info!(page = page_num + 1, total = cfg.max_pages, %url, "loading result page");

            match self
                .fetch_page(session.as_mut(), &url, &mut all_text)
                .await
            {
                Ok(()) => {
                    on_progress(page_num + 1, cfg.max_pages);
                    if page_num + 1 < cfg.max_pages {
                        tokio::time::sleep(self.delays.inter_page).await;
                    }
                }
                Err(e) => {
                    // Failure isolation: one bad page never aborts the run.
                    warn!(page = page_num + 1, error = %e, "page failed, continuing");
                    on_progress(page_num + 1, cfg.max_pages);
                }
            }
        }

        // Teardown happens on every exit path: completion, stop, or a loop
        // where every page errored.
        session.close().await;

        info!(chars = all_text.len(), "scraping completed");
        Ok(all_text)
    }

    async fn fetch_page(
        &self,
        session: &mut dyn SearchSession,
        url: &str,
        all_text: &mut String,
    ) -> Result<(), PageError> {
        session.navigate(url).await?;

        let readiness = await_ready(session, self.delays.render_settle).await;
        info!(signal = readiness.as_str(), "page readiness");

        let text = extract_page_text(session).await;
        if !text.is_empty() {
            all_text.push_str(&text);
            all_text.push('\n');
        }
        Ok(())
    }
}

/// Build the result-page URL for a 0-based page index. The shape is
/// contractual: `{base}?q={keywords}&start={index * 10}`, no encoding.
pub fn page_url(keywords: &str, page_index: usize) -> String {
    let start = page_index * RESULTS_PER_PAGE;
    format!("{GOOGLE_SEARCH_BASE}?q={keywords}&start={start}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_url_offsets_by_ten() {
        assert_eq!(
            page_url("foo bar", 0),
            "https://www.google.com/search?q=foo bar&start=0"
        );
        assert_eq!(
            page_url("foo bar", 2),
            "https://www.google.com/search?q=foo bar&start=20"
        );
    }

    #[test]
    fn default_delays_match_production_values() {
        let delays = LoopDelays::default();
        assert_eq!(delays.pause_poll, Duration::from_millis(500));
        assert_eq!(delays.inter_page, Duration::from_millis(3_000));
        assert_eq!(delays.render_settle, Duration::from_secs(2));
    }
}
