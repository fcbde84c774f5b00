//! The background job pipeline: scrape → harvest emails → filter → ready
//! for export. One worker task per job; all status flows through the
//! shared [`AppState`] map.

use std::sync::Arc;

use thiserror::Error;
use tracing::{error, info};

use crate::core::types::JobStatus;
use crate::core::AppState;
use crate::emails;
use crate::scraping::browser::CdpLauncher;
use crate::scraping::search_loop::{RunConfig, SearchScraper};

/// Upper bound a caller may request; more pages than this mostly yields
/// rate-limit pages anyway.
pub const MAX_PAGES_LIMIT: usize = 10;

/// Request parameters rejected before a job exists. The run loop assumes
/// non-blank keywords and an in-range page count and never re-checks them.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvalidJobRequest {
    #[error("Please enter search keywords")]
    BlankKeywords,

    #[error("Max pages must be between 1 and {MAX_PAGES_LIMIT}")]
    MaxPagesOutOfRange,
}

/// Validate raw request parameters; returns the trimmed keywords.
pub fn validate_job_request(
    keywords: &str,
    max_pages: usize,
) -> Result<String, InvalidJobRequest> {
    let keywords = keywords.trim();
    if keywords.is_empty() {
        return Err(InvalidJobRequest::BlankKeywords);
    }
    if !(1..=MAX_PAGES_LIMIT).contains(&max_pages) {
        return Err(InvalidJobRequest::MaxPagesOutOfRange);
    }
    Ok(keywords.to_string())
}

/// Spawn the pipeline for an already-inserted job.
pub fn spawn_job(state: Arc<AppState>, job_id: String) {
    tokio::spawn(run_job(state, job_id));
}

async fn run_job(state: Arc<AppState>, job_id: String) {
    // Capture the run parameters and flip to running in one critical
    // section. A missing job means it was dropped before we started.
    let Some((keywords, max_pages, headless, exclude_free, signals)) =
        state.with_job(&job_id, |job| {
            job.status = JobStatus::Running;
            job.progress = 0;
            job.error = None;
            job.scraped_text.clear();
            job.emails_found.clear();
            job.logs.clear();
            (
                job.keywords.clone(),
                job.max_pages,
                job.headless_mode,
                job.exclude_free_emails,
                Arc::clone(&job.signals),
            )
        })
    else {
        return;
    };

    state.with_job(&job_id, |job| {
        job.log(format!("Starting search for: {keywords}"));
        job.log(format!("Max pages: {max_pages}"));
        job.log(format!("Headless mode: {headless}"));
    });

    let cfg = RunConfig {
        keywords: keywords.clone(),
        max_pages,
        headless,
        interactive: false,
    };
    let scraper = SearchScraper::with_signals(CdpLauncher, signals);

    let progress_state = Arc::clone(&state);
    let progress_id = job_id.clone();
    let result = scraper
        .run(&cfg, move |current, total| {
            progress_state.with_job(&progress_id, |job| {
                job.progress = ((current as f64 / total.max(1) as f64) * 50.0) as u8;
                job.log(format!("Page {current}/{total} completed"));
            });
        })
        .await;

    let scraped_text = match result {
        Ok(text) => text,
        Err(e) => {
            error!(job_id = %job_id, error = %e, "job failed during session setup");
            state.with_job(&job_id, |job| {
                job.status = JobStatus::Error;
                job.error = Some(e.to_string());
                job.log(format!("ERROR: {e}"));
            });
            return;
        }
    };

    state.with_job(&job_id, |job| {
        job.progress = 50;
        job.log(format!(
            "Scraping complete. Extracted {} characters",
            scraped_text.len()
        ));
        job.log("Starting email extraction...");
        job.scraped_text = scraped_text.clone();
    });

    let mut found = emails::extract_emails(&scraped_text);
    if exclude_free {
        let before = found.len();
        found = emails::exclude_free_providers(found);
        let after = found.len();
        state.with_job(&job_id, |job| {
            job.log(format!(
                "Filtered: {before} -> {after} (removed {} free-provider addresses)",
                before - after
            ));
        });
    }
    let sorted = emails::sorted_emails(found);

    info!(job_id = %job_id, emails = sorted.len(), "job finished");
    state.with_job(&job_id, |job| {
        job.progress = 75;
        job.log(format!(
            "Email extraction complete. Final count: {}",
            sorted.len()
        ));
        job.emails_found = sorted;
        job.progress = 100;
        job.log("Exports ready for download");
        job.status = JobStatus::Done;
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_keywords_are_rejected() {
        assert_eq!(
            validate_job_request("", 2),
            Err(InvalidJobRequest::BlankKeywords)
        );
        assert_eq!(
            validate_job_request("   \t ", 2),
            Err(InvalidJobRequest::BlankKeywords)
        );
    }

    #[test]
    fn max_pages_bounds_are_enforced() {
        assert_eq!(
            validate_job_request("kw", 0),
            Err(InvalidJobRequest::MaxPagesOutOfRange)
        );
        assert_eq!(
            validate_job_request("kw", MAX_PAGES_LIMIT + 1),
            Err(InvalidJobRequest::MaxPagesOutOfRange)
        );
        assert!(validate_job_request("kw", 1).is_ok());
        assert!(validate_job_request("kw", MAX_PAGES_LIMIT).is_ok());
    }

    #[test]
    fn keywords_are_trimmed() {
        assert_eq!(
            validate_job_request("  rust jobs  ", 2).as_deref(),
            Ok("rust jobs")
        );
    }
}
