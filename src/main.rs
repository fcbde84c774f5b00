use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use mailsweep::core::app_state::JobState;
use mailsweep::core::config;
use mailsweep::export;
use mailsweep::jobs;
use mailsweep::types::*;
use mailsweep::AppState;

const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

type ApiError = (StatusCode, Json<ErrorResponse>);

/// `--port 9000` / `--port=9000`; the first parseable value wins.
fn port_override(mut args: impl Iterator<Item = String>) -> Option<u16> {
    while let Some(arg) = args.next() {
        let value = match arg.strip_prefix("--port") {
            Some("") => args.next(),
            Some(rest) => rest.strip_prefix('=').map(str::to_string),
            None => continue,
        };
        if let Some(port) = value.and_then(|v| v.parse().ok()) {
            return Some(port);
        }
    }
    None
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=warn"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    info!("Starting mailsweep service");

    let state = Arc::new(AppState::new());

    let app = Router::new()
        .route("/", get(health_check))
        .route("/health", get(health_check))
        .route("/api/start", post(start_job))
        .route("/api/status/{job_id}", get(job_status))
        .route("/api/pause/{job_id}", post(pause_job))
        .route("/api/resume/{job_id}", post(resume_job))
        .route("/api/stop/{job_id}", post(stop_job))
        .route("/download/{job_id}/csv", get(download_csv))
        .route("/download/{job_id}/txt", get(download_txt))
        .route("/download/{job_id}/xlsx", get(download_xlsx))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let port = port_override(std::env::args().skip(1)).unwrap_or_else(config::server_port);
    let bind_addr = format!("0.0.0.0:{port}");
    let listener = match tokio::net::TcpListener::bind(&bind_addr).await {
        Ok(l) => l,
        Err(e) if e.kind() == std::io::ErrorKind::AddrInUse => {
            anyhow::bail!(
                "Address already in use: {}. Stop the existing process or run with --port {} (or set PORT/MAILSWEEP_PORT).",
                bind_addr,
                port.saturating_add(1)
            )
        }
        Err(e) => return Err(e.into()),
    };
    info!("mailsweep listening on http://{bind_addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).ok();

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = async {
                if let Some(ref mut s) = sigterm {
                    s.recv().await;
                } else {
                    futures::future::pending::<()>().await;
                }
            } => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "ok": true,
        "service": "mailsweep",
        "version": env!("CARGO_PKG_VERSION"),
        "time": chrono::Utc::now().timestamp(),
    }))
}

fn bad_request(message: impl Into<String>) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

fn not_found() -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: "Job not found".to_string(),
        }),
    )
}

async fn start_job(
    State(state): State<Arc<AppState>>,
    Json(request): Json<StartJobRequest>,
) -> Result<Json<StartJobResponse>, ApiError> {
    let keywords = jobs::validate_job_request(&request.keywords, request.max_pages)
        .map_err(|e| bad_request(e.to_string()))?;

    let job_id = uuid::Uuid::new_v4().simple().to_string();
    let job = JobState::new(
        keywords,
        request.max_pages,
        request.headless_mode,
        request.exclude_free_emails,
    );
    state.insert_job(job_id.clone(), job);
    jobs::spawn_job(Arc::clone(&state), job_id.clone());

    Ok(Json(StartJobResponse { job_id }))
}

async fn job_status(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> Result<Json<JobStatusResponse>, ApiError> {
    state
        .with_job(&job_id, |job| JobStatusResponse {
            status: job.status,
            progress: job.progress,
            logs: job.logs.iter().rev().take(20).rev().cloned().collect(),
            keywords: job.keywords.clone(),
            max_pages: job.max_pages,
            headless_mode: job.headless_mode,
            exclude_free_emails: job.exclude_free_emails,
            scraped_text_length: job.scraped_text.len(),
            emails_found: job.emails_found.clone(),
            error: job.error.clone(),
        })
        .map(Json)
        .ok_or_else(not_found)
}

async fn pause_job(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state
        .with_job(&job_id, |job| {
            job.signals.pause();
            job.log("Pause requested");
        })
        .map(|_| StatusCode::NO_CONTENT)
        .ok_or_else(not_found)
}

async fn resume_job(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state
        .with_job(&job_id, |job| {
            job.signals.resume();
            job.log("Resume requested");
        })
        .map(|_| StatusCode::NO_CONTENT)
        .ok_or_else(not_found)
}

async fn stop_job(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state
        .with_job(&job_id, |job| {
            job.signals.stop();
            job.log("Stop requested");
        })
        .map(|_| StatusCode::NO_CONTENT)
        .ok_or_else(not_found)
}

/// The job's harvested addresses and keywords, or the API error for a
/// missing or still-empty job.
fn job_emails(state: &AppState, job_id: &str) -> Result<(Vec<String>, String), ApiError> {
    let Some((emails, keywords)) = state.with_job(job_id, |job| {
        (job.emails_found.clone(), job.keywords.clone())
    }) else {
        return Err(not_found());
    };

    if emails.is_empty() {
        return Err(bad_request("No emails available"));
    }
    Ok((emails, keywords))
}

fn attachment(filename: String, content_type: &'static str, body: Vec<u8>) -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        body,
    )
}

async fn download_csv(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let (emails, keywords) = job_emails(&state, &job_id)?;
    Ok(attachment(
        export::download_filename(&keywords, "csv"),
        "text/csv",
        export::render_csv(&emails),
    ))
}

async fn download_txt(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let (emails, keywords) = job_emails(&state, &job_id)?;
    Ok(attachment(
        export::download_filename(&keywords, "txt"),
        "text/plain",
        export::render_lines(&emails),
    ))
}

async fn download_xlsx(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let (emails, keywords) = job_emails(&state, &job_id)?;
    let body = export::render_xlsx(&emails).map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse {
                error: format!("workbook rendering failed: {e}"),
            }),
        )
    })?;
    Ok(attachment(
        export::download_filename(&keywords, "xlsx"),
        XLSX_CONTENT_TYPE,
        body,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> impl Iterator<Item = String> {
        list.iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .into_iter()
    }

    #[test]
    fn port_flag_accepts_both_forms() {
        assert_eq!(port_override(args(&["--port", "9001"])), Some(9001));
        assert_eq!(port_override(args(&["--port=9002"])), Some(9002));
    }

    #[test]
    fn port_flag_ignores_noise() {
        assert_eq!(port_override(args(&[])), None);
        assert_eq!(port_override(args(&["--verbose"])), None);
        assert_eq!(port_override(args(&["--port", "not-a-port"])), None);
        assert_eq!(port_override(args(&["--portable"])), None);
    }
}
