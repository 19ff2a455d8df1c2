//! HTTP routes.
//!
//! - `GET /?url=<url>[&force=<flag>]` exports the page as a PDF
//! - `GET /health` reports store reachability

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State, rejection::QueryRejection},
    http::{
        HeaderName, HeaderValue, StatusCode,
        header::{CONTENT_DISPOSITION, CONTENT_TYPE, InvalidHeaderValue},
    },
    response::{IntoResponse, Response},
    routing::get,
};
use pdfsnap_client::PdfExporter;
use pdfsnap_core::cache::PDF_CONTENT_TYPE;
use pdfsnap_core::{CacheDb, Error};
use serde::Serialize;

use crate::error::HttpError;

/// `X-Cache: HIT | MISS | REFRESH`
pub static X_CACHE: HeaderName = HeaderName::from_static("x-cache");

/// `X-Cache-Write: failed` when the rendered PDF could not be stored.
pub static X_CACHE_WRITE: HeaderName = HeaderName::from_static("x-cache-write");

const MISSING_URL: &str = "A URL must be provided: /?url=<url to export to pdf>";

/// Shared state for all handlers.
#[derive(Clone)]
pub struct AppState {
    exporter: Arc<PdfExporter>,
    disposition: HeaderValue,
    db: Option<CacheDb>,
}

impl AppState {
    /// # Errors
    ///
    /// Fails if `filename` cannot be carried in a header value.
    pub fn new(exporter: PdfExporter, filename: &str) -> Result<Self, InvalidHeaderValue> {
        let disposition = HeaderValue::from_str(&format!("inline; filename=\"{filename}\""))?;
        Ok(Self { exporter: Arc::new(exporter), disposition, db: None })
    }

    /// Report object counts of this database on `/health`.
    pub fn with_db(mut self, db: CacheDb) -> Self {
        self.db = Some(db);
        self
    }
}

/// Query parameters of the export route.
#[derive(Debug, Default)]
pub struct ExportParams {
    pub url: Option<String>,
    pub force: Option<String>,
}

impl ExportParams {
    /// Repeated keys keep their last value; unknown keys are ignored.
    fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut params = Self::default();
        for (key, value) in pairs {
            match key.as_str() {
                "url" => params.url = Some(value),
                "force" => params.force = Some(value),
                _ => {}
            }
        }
        params
    }
}

#[derive(Debug, Serialize)]
struct HealthOutput {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    bucket: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    objects: Option<u64>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(export_pdf))
        .route("/health", get(health))
        .with_state(state)
}

/// `force` counts as set unless it is absent, empty, or a common "off" spelling.
fn is_truthy(value: &str) -> bool {
    !matches!(value.trim().to_ascii_lowercase().as_str(), "" | "0" | "false" | "no" | "off")
}

async fn export_pdf(
    State(state): State<AppState>, query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Result<Response, HttpError> {
    let Query(pairs) = query.map_err(|rejection| Error::InvalidInput(rejection.body_text()))?;
    let params = ExportParams::from_pairs(pairs);
    let url = params
        .url
        .filter(|u| !u.is_empty())
        .ok_or_else(|| Error::InvalidInput(MISSING_URL.to_string()))?;
    let force = params.force.as_deref().is_some_and(is_truthy);

    let artifact = state.exporter.export(&url, force).await?;

    let content_type =
        HeaderValue::from_str(&artifact.content_type).unwrap_or(HeaderValue::from_static(PDF_CONTENT_TYPE));
    let mut response = (
        StatusCode::OK,
        [
            (CONTENT_TYPE, content_type),
            (CONTENT_DISPOSITION, state.disposition.clone()),
            (X_CACHE.clone(), HeaderValue::from_static(artifact.status.as_str())),
        ],
        artifact.body,
    )
        .into_response();

    if artifact.persist_error.is_some() {
        response
            .headers_mut()
            .insert(X_CACHE_WRITE.clone(), HeaderValue::from_static("failed"));
    }

    Ok(response)
}

async fn health(State(state): State<AppState>) -> Response {
    let Some(db) = &state.db else {
        return Json(HealthOutput { status: "ok", bucket: None, objects: None }).into_response();
    };

    match db.count_objects().await {
        Ok(objects) => {
            Json(HealthOutput { status: "ok", bucket: Some(db.bucket().to_string()), objects: Some(objects) })
                .into_response()
        }
        Err(e) => {
            tracing::warn!(error = %e, "health check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthOutput { status: "unavailable", bucket: Some(db.bucket().to_string()), objects: None }),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use bytes::Bytes;
    use pdfsnap_client::{RenderError, Renderer};
    use pdfsnap_core::{DomainWhitelist, MemoryStore, ObjectStore};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt;
    use url::Url;

    #[derive(Default)]
    struct StubRenderer {
        calls: AtomicUsize,
        fail: bool,
    }

    #[async_trait::async_trait]
    impl Renderer for StubRenderer {
        async fn render(&self, _url: &Url) -> Result<Bytes, RenderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(RenderError::Timeout(30_000));
            }
            Ok(Bytes::from_static(b"%PDF-1.7 stub"))
        }
    }

    struct Harness {
        app: Router,
        store: Arc<MemoryStore>,
        renderer: Arc<StubRenderer>,
    }

    fn harness(renderer: StubRenderer) -> Harness {
        let store = Arc::new(MemoryStore::new());
        let renderer = Arc::new(renderer);
        let exporter = PdfExporter::new(DomainWhitelist::parse("example.com"), store.clone(), renderer.clone());
        let app = router(AppState::new(exporter, "Export.pdf").unwrap());
        Harness { app, store, renderer }
    }

    async fn get(app: &Router, uri: &str) -> Response {
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        app.clone().oneshot(request).await.unwrap()
    }

    async fn body_string(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[test]
    fn test_is_truthy() {
        for value in ["1", "true", "yes", "TRUE", "anything"] {
            assert!(is_truthy(value), "{value} should be truthy");
        }
        for value in ["", "0", "false", "No", "off", " "] {
            assert!(!is_truthy(value), "{value:?} should be falsy");
        }
    }

    #[tokio::test]
    async fn test_missing_url_is_rejected_before_anything_runs() {
        let h = harness(StubRenderer::default());

        for uri in ["/", "/?force=1", "/?url="] {
            let response = get(&h.app, uri).await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
            assert_eq!(body_string(response).await, format!("\"{MISSING_URL}\""));
        }

        assert_eq!(h.store.get_calls(), 0);
        assert_eq!(h.store.put_calls(), 0);
        assert_eq!(h.renderer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_not_whitelisted() {
        let h = harness(StubRenderer::default());

        let response = get(&h.app, "/?url=https%3A%2F%2Fexample.com.evil.org%2Fx").await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_string(response).await,
            "\"The URL https://example.com.evil.org/x is not a whitelisted URL\""
        );
        assert_eq!(h.store.get_calls(), 0);
        assert_eq!(h.renderer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_export_miss_then_hit() {
        let h = harness(StubRenderer::default());
        let uri = "/?url=https%3A%2F%2Fwww.example.com%2Freport";

        let response = get(&h.app, uri).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], "application/pdf");
        assert_eq!(response.headers()[CONTENT_DISPOSITION], "inline; filename=\"Export.pdf\"");
        assert_eq!(response.headers()[&X_CACHE], "MISS");
        assert!(response.headers().get(&X_CACHE_WRITE).is_none());
        assert_eq!(body_string(response).await, "%PDF-1.7 stub");

        let response = get(&h.app, uri).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[&X_CACHE], "HIT");

        assert_eq!(h.renderer.calls.load(Ordering::SeqCst), 1);
        assert_eq!(h.store.put_calls(), 1);
    }

    #[tokio::test]
    async fn test_force_flag() {
        let h = harness(StubRenderer::default());
        h.store
            .put(
                &pdfsnap_core::cache::object_key("https://example.com/"),
                Bytes::from_static(b"%PDF old"),
                PDF_CONTENT_TYPE,
            )
            .await
            .unwrap();

        let response = get(&h.app, "/?url=https%3A%2F%2Fexample.com%2F&force=false").await;
        assert_eq!(response.headers()[&X_CACHE], "HIT");
        assert_eq!(body_string(response).await, "%PDF old");

        let response = get(&h.app, "/?url=https%3A%2F%2Fexample.com%2F&force=1").await;
        assert_eq!(response.headers()[&X_CACHE], "REFRESH");
        assert_eq!(body_string(response).await, "%PDF-1.7 stub");
        assert_eq!(h.renderer.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_repeated_params_keep_last_value() {
        let h = harness(StubRenderer::default());

        let response = get(&h.app, "/?url=https%3A%2F%2Fevil.org%2F&url=https%3A%2F%2Fexample.com%2Fb").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[&X_CACHE], "MISS");
        assert!(h.store.get(&pdfsnap_core::cache::object_key("https://example.com/b")).await.unwrap().is_some());

        let response = get(&h.app, "/?url=https%3A%2F%2Fexample.com%2Fb&force=1&force=0").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[&X_CACHE], "HIT");

        let response = get(&h.app, "/?url=https%3A%2F%2Fexample.com%2Fb&force=0&force=1").await;
        assert_eq!(response.headers()[&X_CACHE], "REFRESH");
        assert_eq!(h.renderer.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_repeated_url_last_value_is_still_gated() {
        let h = harness(StubRenderer::default());

        let response = get(&h.app, "/?url=https%3A%2F%2Fexample.com%2F&url=https%3A%2F%2Fevil.org%2F").await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
        assert_eq!(body_string(response).await, "\"The URL https://evil.org/ is not a whitelisted URL\"");
        assert_eq!(h.renderer.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_render_failure_maps_to_gateway_timeout() {
        let h = harness(StubRenderer { fail: true, ..Default::default() });

        let response = get(&h.app, "/?url=https%3A%2F%2Fexample.com%2Fslow").await;

        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
        assert!(body_string(response).await.starts_with('"'));
        assert_eq!(h.store.put_calls(), 0);
    }

    #[tokio::test]
    async fn test_health_with_database() {
        let db = CacheDb::open_in_memory("exports").await.unwrap();
        let exporter =
            PdfExporter::new(DomainWhitelist::parse("example.com"), Arc::new(db.clone()), Arc::new(StubRenderer::default()));
        let app = router(AppState::new(exporter, "Export.pdf").unwrap().with_db(db));

        let response = get(&app, "/health").await;

        assert_eq!(response.status(), StatusCode::OK);
        let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["bucket"], "exports");
        assert_eq!(body["objects"], 0);
    }

    #[tokio::test]
    async fn test_health_reports_unavailable_store() {
        let db = CacheDb::open_in_memory("exports").await.unwrap();
        let exporter =
            PdfExporter::new(DomainWhitelist::parse("example.com"), Arc::new(db.clone()), Arc::new(StubRenderer::default()));
        let app = router(AppState::new(exporter, "Export.pdf").unwrap().with_db(db.clone()));
        db.close().await.unwrap();

        let response = get(&app, "/health").await;

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let body: serde_json::Value = serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(body["status"], "unavailable");
        assert_eq!(body["bucket"], "exports");
        assert!(body.get("objects").is_none());
    }

    #[tokio::test]
    async fn test_invalid_filename_header() {
        let exporter = PdfExporter::new(
            DomainWhitelist::parse("example.com"),
            Arc::new(MemoryStore::new()),
            Arc::new(StubRenderer::default()),
        );
        assert!(AppState::new(exporter, "bad\nname.pdf").is_err());
    }
}
