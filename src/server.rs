use axum::Router;
use axum::extract::{Json, Query, State};
use axum::http::StatusCode;
use axum::http::header::{CACHE_CONTROL, CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use axum::routing::get;

use crate::error::Error;
use crate::render::{RenderParams, RenderRequest, RenderResponse, Renderer};

pub fn router(renderer: Renderer) -> Router {
    Router::new()
        .route("/api/pdf", get(render_pdf))
        .route("/health", get(health_check))
        .with_state(renderer)
}

pub async fn serve(renderer: Renderer, bind: &str) -> Result<(), Error> {
    let listener = tokio::net::TcpListener::bind(bind).await?;
    log::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, router(renderer)).await?;
    Ok(())
}

pub async fn health_check() -> &'static str {
    "OK"
}

/// `GET /api/pdf?id=&type=facture|devis&action=view|download`
pub async fn render_pdf(
    State(renderer): State<Renderer>,
    Query(params): Query<RenderParams>,
) -> Response {
    match render_blocking(renderer, params).await {
        Ok(rendered) => (
            [
                (CONTENT_TYPE, rendered.content_type().to_string()),
                (CONTENT_DISPOSITION, rendered.content_disposition()),
                (CACHE_CONTROL, rendered.cache_control().to_string()),
            ],
            rendered.bytes,
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

/// Layout and serialization are CPU-bound: run them off the async workers,
/// bounded by the configured deadline. The task shares the cut-off, so once
/// the caller has its timeout the task no longer stores the artifact.
async fn render_blocking(
    renderer: Renderer,
    params: RenderParams,
) -> Result<RenderResponse, Error> {
    let request = RenderRequest::from_params(&params)?;
    let deadline = renderer.options().deadline;
    let cutoff = std::time::Instant::now() + deadline;
    let task = tokio::task::spawn_blocking(move || renderer.render_until(&request, cutoff));
    match tokio::time::timeout_at(tokio::time::Instant::from_std(cutoff), task).await {
        Err(_) => Err(Error::Timeout(deadline)),
        Ok(Err(join)) => Err(Error::Render(format!("render task failed: {join}"))),
        Ok(Ok(result)) => result,
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            log::error!("request failed: {self}");
        } else {
            log::debug!("request rejected: {self}");
        }
        let body = serde_json::json!({ "error": self.public_message() });
        (status, Json(body)).into_response()
    }
}
