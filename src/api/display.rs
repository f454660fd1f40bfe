//! Operator view for the QR display
//!
//! Every handler reads the latest published snapshot or enqueues a command;
//! the display state itself is owned by the refresh loop.

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Json, Response},
};
use base64::{engine::general_purpose, Engine as _};
use serde_json::json;
use std::sync::Arc;
use tracing::warn;

use crate::state::AppState;

/// HTML display page. Re-reads the snapshot on a meta-refresh matching the
/// poll interval, mirroring the auto-refresh behavior of the view.
pub async fn display_page(State(app_state): State<Arc<AppState>>) -> Html<String> {
    let snapshot = app_state.display.snapshot();
    let refresh_seconds = (app_state.config.poll_interval_ms / 1000).max(1);

    let mut body = String::new();

    if let Some(error) = &snapshot.last_error {
        body.push_str(&format!(
            r#"<p class="error">⚠️ Last refresh failed: {}</p>"#,
            escape_html(error)
        ));
    }

    match (&snapshot.qr_png, &snapshot.deep_link, &snapshot.last_seen) {
        (Some(png), Some(link), Some(record)) => {
            let encoded = general_purpose::STANDARD.encode(png);
            body.push_str(&format!(
                r#"<img src="data:image/png;base64,{}" alt="Company QR" width="300">
<p>Token Date: <strong>{}</strong></p>
<p>🔗 Employee Deep Link: <code>{}</code></p>"#,
                encoded,
                record.token_date,
                escape_html(link),
            ));
            if let Some(updated_at) = record.updated_at {
                body.push_str(&format!(
                    "<p>Last backend update: {}</p>",
                    updated_at.to_rfc3339()
                ));
            }
        }
        _ => {
            body.push_str("<p>Waiting for the first successful token fetch…</p>");
        }
    }

    if let Some(checked) = snapshot.last_checked {
        body.push_str(&format!("<p>Last checked: {}</p>", checked.to_rfc3339()));
    }

    Html(format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<meta http-equiv="refresh" content="{refresh_seconds}">
<title>QR Display — Auto Update</title>
<style>
body {{ font-family: sans-serif; max-width: 640px; margin: 2rem auto; }}
.error {{ color: #b00020; }}
code {{ background: #f4f4f4; padding: 2px 4px; }}
footer {{ color: #777; font-size: 0.85em; margin-top: 2rem; }}
</style>
</head>
<body>
<h1>🔳 QR Display — Auto Update</h1>
{body}
<footer>Backend: <code>{backend}</code> · Company #{company_id} · polls every {refresh_seconds}s</footer>
</body>
</html>"#,
        refresh_seconds = refresh_seconds,
        body = body,
        backend = escape_html(&app_state.config.backend_url),
        company_id = app_state.config.company_id,
    ))
}

/// Raw PNG of the current QR image; 404 until the first successful fetch.
pub async fn qr_png(State(app_state): State<Arc<AppState>>) -> Response {
    match app_state.display.snapshot().qr_png {
        Some(png) => ([(header::CONTENT_TYPE, "image/png")], png).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// JSON snapshot of the display state.
pub async fn status(State(app_state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    let snapshot = app_state.display.snapshot();

    Json(json!({
        "phase": snapshot.phase(),
        "company_id": app_state.config.company_id,
        "token_date": snapshot.last_seen.as_ref().map(|r| r.token_date),
        "updated_at": snapshot.last_seen.as_ref().and_then(|r| r.updated_at),
        "deep_link": snapshot.deep_link,
        "render_count": snapshot.render_count,
        "last_checked": snapshot.last_checked,
        "last_error": snapshot.last_error,
    }))
}

/// Forwards the caller's bearer token to the backend rotation endpoint and
/// triggers an immediate refresh. The client holds no credentials of its own.
pub async fn regenerate(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<(StatusCode, Json<serde_json::Value>), StatusCode> {
    let bearer_token = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::to_owned);

    let Some(bearer_token) = bearer_token else {
        warn!("🚫 Regenerate request without a bearer token");
        return Err(StatusCode::UNAUTHORIZED);
    };

    app_state
        .display
        .regenerate(bearer_token)
        .await
        .map_err(|_| StatusCode::SERVICE_UNAVAILABLE)?;

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({
            "status": "accepted",
            "detail": "regeneration requested; the display refreshes as soon as the backend rotates the token"
        })),
    ))
}

/// Liveness probe.
pub async fn health(State(app_state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "service": "qr_display",
        "phase": app_state.display.snapshot().phase(),
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}

fn escape_html(raw: &str) -> String {
    raw.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
