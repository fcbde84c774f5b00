//! Environment-variable tunables with coded defaults.

use std::time::Duration;

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(default)
}

/// HTTP listen port: `MAILSWEEP_PORT` → `PORT` → 8000.
pub fn server_port() -> u16 {
    for key in ["MAILSWEEP_PORT", "PORT"] {
        if let Ok(v) = std::env::var(key) {
            if let Ok(p) = v.trim().parse::<u16>() {
                return p;
            }
        }
    }
    8000
}

/// Ceiling for a single page navigation. `NAV_TIMEOUT_SECS`, default 60s.
/// Hitting it skips the page, it does not abort the run.
pub fn navigation_timeout() -> Duration {
    Duration::from_secs(env_u64("NAV_TIMEOUT_SECS", 60))
}

/// Delay between result pages, to stay under rate-limiting radar.
/// `INTER_PAGE_DELAY_MS`, default 3000.
pub fn inter_page_delay() -> Duration {
    Duration::from_millis(env_u64("INTER_PAGE_DELAY_MS", 3_000))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_env() {
        assert_eq!(navigation_timeout(), Duration::from_secs(60));
        assert_eq!(inter_page_delay(), Duration::from_millis(3_000));
    }
}
