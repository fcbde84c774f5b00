//! chromiumoxide-backed [`SearchSession`].
//!
//! Owns executable discovery, the stealth launch configuration, and the
//! lifetime of one browser process plus its single result page.

use std::path::Path;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chromiumoxide::browser::BrowserConfig;
use chromiumoxide::cdp::browser_protocol::page::AddScriptToEvaluateOnNewDocumentParams;
use chromiumoxide::handler::viewport::Viewport;
use chromiumoxide::{Browser, Page};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::core::config;

use super::session::{SearchSession, SessionLauncher, SessionOptions};
use super::{PageError, ScrapeError};

/// Fixed desktop user agent; a realistic pinned string keeps result markup
/// consistent across pages of one run.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                              (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

const VIEWPORT_WIDTH: u32 = 1400;
const VIEWPORT_HEIGHT: u32 = 900;

const SELECTOR_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Masks the `navigator.webdriver` automation marker before any page script
/// runs.
const STEALTH_INIT_SCRIPT: &str = r#"
Object.defineProperty(navigator, 'webdriver', {
    get: () => false,
});
"#;

/// Find a usable Chromium-family executable.
///
/// Resolution order:
/// 1. `CHROME_EXECUTABLE` env var (explicit override)
/// 2. PATH scan
/// 3. OS-specific well-known install locations
pub fn find_chrome_executable() -> Option<String> {
    if let Ok(p) = std::env::var("CHROME_EXECUTABLE") {
        if Path::new(&p).exists() {
            return Some(p);
        }
    }

    if let Ok(path_var) = std::env::var("PATH") {
        let names = [
            "google-chrome",
            "google-chrome-stable",
            "chromium",
            "chromium-browser",
            "chrome",
        ];
        for dir in std::env::split_paths(&path_var) {
            for name in names {
                let full = dir.join(name);
                if full.exists() {
                    return Some(full.to_string_lossy().to_string());
                }
            }
        }
    }

    #[cfg(target_os = "macos")]
    {
        let candidates = [
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
            "/Applications/Chromium.app/Contents/MacOS/Chromium",
        ];
        for c in candidates {
            if Path::new(c).exists() {
                return Some(c.to_string());
            }
        }
    }

    #[cfg(target_os = "linux")]
    {
        let candidates = [
            "/usr/bin/google-chrome",
            "/usr/bin/chromium",
            "/usr/bin/chromium-browser",
            "/usr/local/bin/chromium",
        ];
        for c in candidates {
            if Path::new(c).exists() {
                return Some(c.to_string());
            }
        }
    }

    #[cfg(target_os = "windows")]
    {
        let candidates = [
            r"C:\Program Files\Google\Chrome\Application\chrome.exe",
            r"C:\Program Files (x86)\Google\Chrome\Application\chrome.exe",
        ];
        for c in candidates {
            if Path::new(c).exists() {
                return Some(c.to_string());
            }
        }
    }

    None
}

/// Build the launch configuration for one session.
///
/// Flags chosen for CI-friendliness (`--no-sandbox`, `--disable-dev-shm-usage`)
/// and to suppress the automation fingerprint
/// (`--disable-blink-features=AutomationControlled`, pinned user agent).
fn build_browser_config(exe: &str, opts: &SessionOptions) -> Result<BrowserConfig, ScrapeError> {
    let mut builder = BrowserConfig::builder()
        .chrome_executable(exe)
        .viewport(Viewport {
            width: VIEWPORT_WIDTH,
            height: VIEWPORT_HEIGHT,
            device_scale_factor: Some(1.0),
            emulating_mobile: false,
            is_landscape: true,
            has_touch: false,
        })
        .window_size(VIEWPORT_WIDTH, VIEWPORT_HEIGHT)
        .arg("--disable-blink-features=AutomationControlled")
        .arg("--no-sandbox")
        .arg("--disable-dev-shm-usage")
        .arg("--disable-gpu")
        .arg("--disable-extensions")
        .arg("--disable-notifications")
        .arg("--disable-popup-blocking")
        .arg("--no-first-run")
        .arg("--no-default-browser-check")
        .arg(format!("--user-agent={USER_AGENT}"));

    if !opts.headless {
        builder = builder.with_head();
        if opts.interactive {
            builder = builder.arg("--start-maximized");
        }
    }

    builder.build().map_err(ScrapeError::Launch)
}

/// Launches one stealth-configured chromiumoxide session per run.
#[derive(Debug, Default, Clone, Copy)]
pub struct CdpLauncher;

#[async_trait]
impl SessionLauncher for CdpLauncher {
    async fn launch(&self, opts: &SessionOptions) -> Result<Box<dyn SearchSession>, ScrapeError> {
        let session = CdpSession::open(opts).await?;
        Ok(Box::new(session))
    }
}

/// One browser process and one active page. Created and destroyed inside a
/// single run; never shared.
pub struct CdpSession {
    browser: Option<Browser>,
    page: Option<Page>,
    handler_task: Option<JoinHandle<()>>,
}

impl CdpSession {
    /// Launch the browser and prepare the single page with stealth
    /// measures applied.
    pub async fn open(opts: &SessionOptions) -> Result<Self, ScrapeError> {
        let exe = find_chrome_executable().ok_or(ScrapeError::BrowserNotFound)?;
        info!(browser = %exe, headless = opts.headless, "launching browser session");

        let config = build_browser_config(&exe, opts)?;
        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| ScrapeError::Launch(format!("{exe}: {e}")))?;

        // Drain CDP events for the lifetime of the session.
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("CDP handler event error: {e}");
                }
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(p) => p,
            Err(e) => {
                // Tear down the half-open browser before reporting.
                let mut partial = Self {
                    browser: Some(browser),
                    page: None,
                    handler_task: Some(handler_task),
                };
                partial.close().await;
                return Err(ScrapeError::Launch(format!("failed to open page: {e}")));
            }
        };

        if let Err(e) = page
            .execute(AddScriptToEvaluateOnNewDocumentParams::new(
                STEALTH_INIT_SCRIPT,
            ))
            .await
        {
            warn!("stealth script injection failed: {e}");
        }

        Ok(Self {
            browser: Some(browser),
            page: Some(page),
            handler_task: Some(handler_task),
        })
    }

    fn active_page(&self) -> Option<&Page> {
        self.page.as_ref()
    }

    /// Run a fire-and-forget script against the active page. Returns whether
    /// the action was issued; never errors.
    async fn best_effort_eval(&self, script: &str) -> bool {
        let Some(page) = self.active_page() else {
            return false;
        };
        match page.evaluate(script).await {
            Ok(_) => true,
            Err(e) => {
                warn!("page action failed: {e}");
                false
            }
        }
    }

    // Interactive helpers: each is a single best-effort action against the
    // active page; `false` means there was no session to act on.

    pub async fn scroll_down(&self) -> bool {
        self.best_effort_eval("window.scrollBy(0, window.innerHeight * 0.9)")
            .await
    }

    pub async fn scroll_up(&self) -> bool {
        self.best_effort_eval("window.scrollBy(0, -window.innerHeight * 0.9)")
            .await
    }

    pub async fn select_all_text(&self) -> bool {
        self.best_effort_eval("window.getSelection().selectAllChildren(document.body)")
            .await
    }

    pub async fn copy_selected_text(&self) -> bool {
        self.best_effort_eval("document.execCommand('copy')").await
    }

    pub async fn go_back(&self) -> bool {
        self.best_effort_eval("history.back()").await
    }

    pub async fn go_forward(&self) -> bool {
        self.best_effort_eval("history.forward()").await
    }

    pub async fn refresh_page(&self) -> bool {
        self.best_effort_eval("location.reload()").await
    }
}

#[async_trait]
impl SearchSession for CdpSession {
    async fn navigate(&mut self, url: &str) -> Result<(), PageError> {
        let page = self
            .page
            .as_ref()
            .ok_or_else(|| PageError::Cdp("no active page".into()))?;

        let ceiling = config::navigation_timeout();
        match tokio::time::timeout(ceiling, page.goto(url)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(PageError::Cdp(e.to_string())),
            Err(_) => Err(PageError::Timeout(ceiling)),
        }
    }

    async fn wait_for_selector(&mut self, css: &str, timeout: Duration) -> bool {
        let Some(page) = self.active_page() else {
            return false;
        };
        let probe = format!("document.querySelector({css:?}) !== null");
        let deadline = Instant::now() + timeout;

        loop {
            let found = page
                .evaluate(probe.as_str())
                .await
                .ok()
                .and_then(|v| v.into_value::<bool>().ok())
                .unwrap_or(false);
            if found {
                return true;
            }
            if Instant::now() + SELECTOR_POLL_INTERVAL >= deadline {
                return false;
            }
            tokio::time::sleep(SELECTOR_POLL_INTERVAL).await;
        }
    }

    async fn visible_text(&mut self) -> Result<String, PageError> {
        let page = self
            .page
            .as_ref()
            .ok_or_else(|| PageError::Cdp("no active page".into()))?;
        page.evaluate("document.body ? document.body.innerText : ''")
            .await
            .map_err(|e| PageError::Cdp(e.to_string()))?
            .into_value::<String>()
            .map_err(|e| PageError::Cdp(e.to_string()))
    }

    async fn page_content(&mut self) -> Result<String, PageError> {
        let page = self
            .page
            .as_ref()
            .ok_or_else(|| PageError::Cdp("no active page".into()))?;
        page.content()
            .await
            .map_err(|e| PageError::Cdp(e.to_string()))
    }

    async fn close(&mut self) {
        // Tolerates partial setup and repeated calls: every handle is taken
        // exactly once.
        drop(self.page.take());

        if let Some(mut browser) = self.browser.take() {
            if let Err(e) = browser.close().await {
                warn!("browser close error (non-fatal): {e}");
            }
        }

        if let Some(task) = self.handler_task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_agent_is_desktop_chrome() {
        assert!(USER_AGENT.contains("Mozilla"));
        assert!(USER_AGENT.contains("Chrome/"));
    }

    #[test]
    fn stealth_script_masks_webdriver_flag() {
        assert!(STEALTH_INIT_SCRIPT.contains("navigator"));
        assert!(STEALTH_INIT_SCRIPT.contains("webdriver"));
    }
}
