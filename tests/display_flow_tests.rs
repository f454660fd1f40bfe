use hrms_qr_ws::backend::BackendClient;
use hrms_qr_ws::qr::{DisplayState, QrDisplay};
use serde_json::json;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::timeout;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn token_body(token: &str) -> serde_json::Value {
    json!({
        "token": token,
        "token_date": "2025-08-06",
        "updated_at": "2025-08-06T00:05:00Z",
    })
}

fn spawn_display(server: &MockServer, company_id: i64, poll: Duration) -> QrDisplay {
    let client = BackendClient::new(server.uri(), 5).expect("failed to build backend client");
    QrDisplay::spawn(client, company_id, String::new(), poll)
}

/// Observes committed snapshots until one matches the predicate.
async fn wait_for<F>(rx: &mut watch::Receiver<DisplayState>, mut pred: F) -> DisplayState
where
    F: FnMut(&DisplayState) -> bool,
{
    timeout(Duration::from_secs(10), async {
        loop {
            {
                let snapshot = rx.borrow_and_update();
                if pred(&snapshot) {
                    return snapshot.clone();
                }
            }
            rx.changed().await.expect("display loop stopped");
        }
    })
    .await
    .expect("timed out waiting for display snapshot")
}

#[tokio::test]
async fn test_redraw_happens_iff_token_changed() {
    let server = MockServer::start().await;
    // Two ticks see "abc123", every later one sees "xyz789".
    Mock::given(method("GET"))
        .and(path("/qr/1/version"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("abc123")))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/qr/1/version"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("xyz789")))
        .mount(&server)
        .await;

    let display = spawn_display(&server, 1, Duration::from_millis(100));
    let mut rx = display.subscribe();

    let first = wait_for(&mut rx, |s| s.render_count == 1).await;
    assert_eq!(first.phase(), "displayed");
    assert_eq!(first.deep_link.as_deref(), Some("/?company_id=1&qr_token=abc123"));
    assert!(first.qr_png.is_some());

    let second = wait_for(&mut rx, |s| s.render_count == 2).await;
    assert_eq!(second.deep_link.as_deref(), Some("/?company_id=1&qr_token=xyz789"));
    assert_eq!(second.last_seen.as_ref().unwrap().token, "xyz789");

    // The token is now stable, so further fetches must not redraw.
    for _ in 0..3 {
        rx.changed().await.expect("display loop stopped");
        assert_eq!(rx.borrow_and_update().render_count, 2);
    }
}

#[tokio::test]
async fn test_fetch_failure_preserves_displayed_image() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/qr/1/version"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("abc123")))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/qr/1/version"))
        .respond_with(ResponseTemplate::new(500).set_body_string("token table unavailable"))
        .mount(&server)
        .await;

    let display = spawn_display(&server, 1, Duration::from_millis(100));
    let mut rx = display.subscribe();

    let displayed = wait_for(&mut rx, |s| s.render_count == 1).await;
    assert!(displayed.qr_png.is_some());

    let failed = wait_for(&mut rx, |s| s.last_error.is_some()).await;
    assert_eq!(failed.phase(), "displayed");
    assert_eq!(failed.render_count, 1);
    assert_eq!(failed.last_seen.as_ref().unwrap().token, "abc123");
    assert_eq!(failed.qr_png, displayed.qr_png);
    assert!(failed.last_error.as_deref().unwrap().contains("500"));
}

#[tokio::test]
async fn test_unauthorized_fetch_never_displays() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/qr/1/version"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"detail": "Not authenticated"})))
        .mount(&server)
        .await;

    let display = spawn_display(&server, 1, Duration::from_millis(100));
    let mut rx = display.subscribe();

    let snapshot = wait_for(&mut rx, |s| s.last_error.is_some()).await;
    assert_eq!(snapshot.phase(), "idle");
    assert_eq!(snapshot.render_count, 0);
    assert!(snapshot.qr_png.is_none());
    assert!(snapshot.deep_link.is_none());
}

#[tokio::test]
async fn test_regenerate_rotates_and_redraws() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/qr/1/version"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("abc123")))
        .mount(&server)
        .await;

    let display = spawn_display(&server, 1, Duration::from_millis(500));
    let mut rx = display.subscribe();
    wait_for(&mut rx, |s| s.render_count == 1).await;

    // HR rotates the token; the fetch right after the rotation sees it.
    server.reset().await;
    Mock::given(method("POST"))
        .and(path("/qr/regenerate"))
        .and(header("Authorization", "Bearer hr-jwt"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/qr/1/version"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("xyz789")))
        .mount(&server)
        .await;

    display.regenerate("hr-jwt".to_string()).await.unwrap();

    let rotated = wait_for(&mut rx, |s| s.render_count == 2).await;
    assert_eq!(rotated.deep_link.as_deref(), Some("/?company_id=1&qr_token=xyz789"));
}

#[tokio::test]
async fn test_failed_regenerate_keeps_token_and_reports_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/qr/1/version"))
        .respond_with(ResponseTemplate::new(200).set_body_json(token_body("abc123")))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/qr/regenerate"))
        .respond_with(ResponseTemplate::new(500).set_body_string("rotation unavailable"))
        .mount(&server)
        .await;

    let display = spawn_display(&server, 1, Duration::from_millis(500));
    let mut rx = display.subscribe();
    wait_for(&mut rx, |s| s.render_count == 1).await;

    display.regenerate("hr-jwt".to_string()).await.unwrap();

    let failed = wait_for(&mut rx, |s| s.last_error.is_some()).await;
    assert_eq!(failed.phase(), "displayed");
    assert_eq!(failed.render_count, 1);
    assert_eq!(failed.last_seen.as_ref().unwrap().token, "abc123");
    assert!(failed.last_error.as_deref().unwrap().contains("500"));
}
