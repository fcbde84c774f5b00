use serde::{Deserialize, Serialize};

fn default_max_pages() -> usize {
    2
}

fn default_headless() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct StartJobRequest {
    pub keywords: String,
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,
    #[serde(default = "default_headless")]
    pub headless_mode: bool,
    #[serde(default)]
    pub exclude_free_emails: bool,
}

#[derive(Debug, Serialize)]
pub struct StartJobResponse {
    pub job_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Idle,
    Running,
    Done,
    Error,
}

#[derive(Debug, Serialize)]
pub struct JobStatusResponse {
    pub status: JobStatus,
    /// 0–100: pages map to 0–50, email extraction to 75, export to 100.
    pub progress: u8,
    /// Most recent log lines (capped by the handler).
    pub logs: Vec<String>,
    pub keywords: String,
    pub max_pages: usize,
    pub headless_mode: bool,
    pub exclude_free_emails: bool,
    pub scraped_text_length: usize,
    pub emails_found: Vec<String>,
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_request_fills_defaults() {
        let req: StartJobRequest = serde_json::from_str(r#"{"keywords":"rust jobs"}"#).unwrap();
        assert_eq!(req.max_pages, 2);
        assert!(req.headless_mode);
        assert!(!req.exclude_free_emails);
    }

    #[test]
    fn status_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&JobStatus::Running).unwrap(), "\"running\"");
    }
}
