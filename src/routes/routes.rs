//! Defines routes for the paste service.
//!
//! ## Structure
//! - `GET  /`               — submission form
//! - `POST /`               — submit a paste (url-encoded or multipart form)
//! - `GET  /{id}`           — paste rendered as HTML
//! - `GET  /{id}/raw`       — paste body as plain text
//! - `GET  /static/{file}`  — files from the static directory
//! - `GET  /healthz`, `GET /readyz` — health checks

use crate::{
    handlers::{
        health_handlers::{healthz, readyz},
        paste_handlers::{
            get_paste, get_raw_paste, get_static, index, not_found, submit_paste,
        },
    },
    services::paste_service::PasteService,
};
use axum::{Router, extract::DefaultBodyLimit, routing::get};

/// Allowance for form encoding and multipart boundaries on top of the paste.
const FORM_OVERHEAD: usize = 16 * 1024;

/// Build the router and attach `service` as shared state.
///
/// Request bodies are capped at twice the maximum paste size plus form
/// overhead; anything within the cap but over `max_size` is truncated by the
/// service.
pub fn routes(service: PasteService) -> Router {
    let body_limit = service
        .config()
        .max_size
        .saturating_mul(2)
        .saturating_add(FORM_OVERHEAD);

    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/favicon.ico", get(not_found))
        .route("/robots.txt", get(not_found))
        .route("/static/{file}", get(get_static))
        .route("/", get(index).post(submit_paste))
        .route("/{id}", get(get_paste))
        .route("/{id}/raw", get(get_raw_paste))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(service)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::AppConfig, storage::fs::FsStore};
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode, header},
    };
    use std::sync::Arc;
    use tempfile::TempDir;
    use tower::ServiceExt;

    async fn setup_app(max_size: usize) -> (Router, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let paste_dir = temp_dir.path().join("paste");
        let static_dir = temp_dir.path().join("static");
        std::fs::create_dir(&paste_dir).unwrap();
        std::fs::create_dir(&static_dir).unwrap();
        std::fs::write(static_dir.join("binnit.css"), "body {}").unwrap();

        let backend = FsStore::open(&paste_dir).await.unwrap();
        let config = AppConfig {
            server_prefix: "http://paste.test".into(),
            paste_dir,
            static_dir,
            templ_dir: temp_dir.path().join("tpl"),
            max_size,
            ..AppConfig::default()
        };
        (
            routes(PasteService::new(Arc::new(backend), config)),
            temp_dir,
        )
    }

    fn post_form(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn body_string(response: axum::response::Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    async fn submit(app: &Router, body: &str) -> String {
        let response = app.clone().oneshot(post_form(body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let link = body_string(response).await;
        link.trim_end()
            .strip_prefix("http://paste.test/")
            .unwrap()
            .to_string()
    }

    #[tokio::test]
    async fn test_submit_then_read_raw() {
        let (app, _temp_dir) = setup_app(4096).await;

        let id = submit(&app, "title=Hello&lang=text&paste=hello+%3Cworld%3E").await;
        assert_eq!(id.len(), 16);

        let response = app.oneshot(get(&format!("/{id}/raw"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/plain; charset=utf-8"
        );
        assert_eq!(body_string(response).await, "hello <world>");
    }

    #[tokio::test]
    async fn test_rendered_paste_is_escaped() {
        let (app, _temp_dir) = setup_app(4096).await;
        let id = submit(&app, "title=%3Cscript%3E&lang=rust&paste=a+%26+b").await;

        let response = app.oneshot(get(&format!("/{id}"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let page = body_string(response).await;
        assert!(page.contains("<h1>&lt;script&gt;</h1>"));
        assert!(page.contains("a &amp; b"));
        assert!(page.contains("Language: rust"));
    }

    #[tokio::test]
    async fn test_submit_with_show_returns_html_link() {
        let (app, _temp_dir) = setup_app(4096).await;

        let response = app
            .oneshot(post_form("title=t&paste=body&show=1"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let page = body_string(response).await;
        assert!(page.starts_with("<html><body>Link: <a href='http://paste.test/"));
    }

    #[tokio::test]
    async fn test_multipart_submission() {
        let (app, _temp_dir) = setup_app(4096).await;
        let body = concat!(
            "--XBOUNDARY\r\n",
            "Content-Disposition: form-data; name=\"title\"\r\n\r\n",
            "multi\r\n",
            "--XBOUNDARY\r\n",
            "Content-Disposition: form-data; name=\"paste\"\r\n\r\n",
            "line one\nline two\r\n",
            "--XBOUNDARY--\r\n"
        );
        let request = Request::builder()
            .method("POST")
            .uri("/")
            .header(header::CONTENT_TYPE, "multipart/form-data; boundary=XBOUNDARY")
            .body(Body::from(body))
            .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let link = body_string(response).await;
        let id = link.trim_end().rsplit('/').next().unwrap().to_string();

        let response = app.oneshot(get(&format!("/{id}/raw"))).await.unwrap();
        assert_eq!(body_string(response).await, "line one\nline two");
    }

    async fn raw_bytes(app: &Router, id: &str) -> Vec<u8> {
        let response = app.clone().oneshot(get(&format!("/{id}/raw"))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        to_bytes(response.into_body(), usize::MAX).await.unwrap().to_vec()
    }

    #[tokio::test]
    async fn test_urlencoded_binary_paste_round_trips() {
        let (app, _temp_dir) = setup_app(4096).await;

        let id = submit(&app, "title=bin&paste=a%FF%FEz").await;

        assert_eq!(raw_bytes(&app, &id).await, b"a\xff\xfez");
    }

    #[tokio::test]
    async fn test_multipart_binary_paste_round_trips() {
        let (app, _temp_dir) = setup_app(4096).await;
        let mut body = Vec::new();
        body.extend_from_slice(
            b"--XBOUNDARY\r\nContent-Disposition: form-data; name=\"paste\"\r\n\r\n",
        );
        body.extend_from_slice(b"a\xff\xfez");
        body.extend_from_slice(b"\r\n--XBOUNDARY--\r\n");
        let request = Request::builder()
            .method("POST")
            .uri("/")
            .header(header::CONTENT_TYPE, "multipart/form-data; boundary=XBOUNDARY")
            .body(Body::from(body))
            .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let link = body_string(response).await;
        let id = link.trim_end().rsplit('/').next().unwrap().to_string();

        assert_eq!(raw_bytes(&app, &id).await, b"a\xff\xfez");
    }

    #[tokio::test]
    async fn test_submit_rejects_other_content_types() {
        let (app, _temp_dir) = setup_app(4096).await;
        let request = Request::builder()
            .method("POST")
            .uri("/")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{}"))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }

    #[tokio::test]
    async fn test_oversized_paste_is_truncated() {
        let (app, _temp_dir) = setup_app(5).await;
        let id = submit(&app, "paste=0123456789").await;

        let response = app.oneshot(get(&format!("/{id}/raw"))).await.unwrap();
        assert_eq!(body_string(response).await, "01234");
    }

    #[tokio::test]
    async fn test_unknown_paste_is_not_found() {
        let (app, _temp_dir) = setup_app(4096).await;

        for uri in ["/0123456789abcdef", "/0123456789abcdef/raw", "/not-a-name"] {
            let response = app.clone().oneshot(get(uri)).await.unwrap();
            assert_eq!(response.status(), StatusCode::NOT_FOUND, "{uri}");
        }
    }

    #[tokio::test]
    async fn test_index_falls_back_to_builtin_form() {
        let (app, _temp_dir) = setup_app(4096).await;

        let response = app.oneshot(get("/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_string(response).await.contains("name=\"paste\""));
    }

    #[tokio::test]
    async fn test_index_prefers_template_dir() {
        let (app, temp_dir) = setup_app(4096).await;
        let tpl = temp_dir.path().join("tpl");
        std::fs::create_dir(&tpl).unwrap();
        std::fs::write(tpl.join("index.html"), "<p>custom</p>").unwrap();

        let response = app.oneshot(get("/")).await.unwrap();
        assert_eq!(body_string(response).await, "<p>custom</p>");
    }

    #[tokio::test]
    async fn test_static_files() {
        let (app, _temp_dir) = setup_app(4096).await;

        let response = app.clone().oneshot(get("/static/binnit.css")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/css"
        );
        assert_eq!(body_string(response).await, "body {}");

        let response = app.clone().oneshot(get("/static/missing.js")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = app.oneshot(get("/favicon.ico")).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_health_endpoints() {
        let (app, temp_dir) = setup_app(4096).await;

        let response = app.clone().oneshot(get("/healthz")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app.oneshot(get("/readyz")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json: serde_json::Value =
            serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(json["checks"]["disk"]["ok"], true);
        assert_eq!(
            std::fs::read_dir(temp_dir.path().join("paste")).unwrap().count(),
            0
        );
    }
}
