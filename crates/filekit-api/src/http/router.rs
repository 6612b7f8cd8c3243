//! Router construction and server host for the API.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::Request,
    middleware,
    routing::{get, post},
};
use filekit_config::HttpSettings;
use filekit_pipeline::RequestPipeline;
use filekit_telemetry::{Metrics, build_sha};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{Span, info};

use crate::error::{ApiServerError, ApiServerResult};
use crate::http::health::{health, metrics};
use crate::http::operations::{compress_image, convert_image, generate_qr, merge_pdfs};
use crate::http::seo::{robots_txt, sitemap_xml};
use crate::http::telemetry::{request_id, route_label, track_request};
use crate::state::ApiState;

/// Axum router wrapper that hosts the filekit endpoints.
pub struct ApiServer {
    router: Router,
}

impl ApiServer {
    /// Wire the pipeline and metrics into the router and its middleware.
    #[must_use]
    pub fn new(pipeline: RequestPipeline, telemetry: Metrics, http: &HttpSettings) -> Self {
        let state = Arc::new(ApiState::new(
            pipeline,
            telemetry.clone(),
            http.site_url.clone(),
        ));
        let trace_layer = TraceLayer::new_for_http()
            .make_span_with(|request: &Request<_>| {
                tracing::info_span!(
                    "http.request",
                    method = %request.method(),
                    route = %route_label(request),
                    request_id = %request_id(request),
                    build_sha = %build_sha(),
                    status_code = tracing::field::Empty,
                    latency_ms = tracing::field::Empty
                )
            })
            .on_request(|_request: &Request<_>, _span: &Span| {})
            .on_response(
                |response: &axum::response::Response, latency: Duration, span: &Span| {
                    span.record("status_code", response.status().as_u16());
                    let latency_ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
                    span.record("latency_ms", latency_ms);
                },
            );
        let layered = ServiceBuilder::new()
            .layer(filekit_telemetry::set_request_id_layer())
            .layer(filekit_telemetry::propagate_request_id_layer())
            .layer(trace_layer)
            .layer(middleware::from_fn_with_state(telemetry, track_request));

        let router = Self::operation_routes()
            .merge(Self::public_routes())
            .layer(DefaultBodyLimit::max(http.max_upload_bytes))
            .route_layer(layered)
            .with_state(state);

        Self { router }
    }

    fn operation_routes() -> Router<Arc<ApiState>> {
        Router::new()
            .route("/api/heic", post(convert_image))
            .route("/api/qr", post(generate_qr))
            .route("/api/merge", post(merge_pdfs))
            .route("/api/compress", post(compress_image))
    }

    fn public_routes() -> Router<Arc<ApiState>> {
        Router::new()
            .route("/robots.txt", get(robots_txt))
            .route("/sitemap.xml", get(sitemap_xml))
            .route("/health", get(health))
            .route("/metrics", get(metrics))
    }

    /// Serve on `addr` until `shutdown` resolves, then drain in-flight requests.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener fails to bind or the server terminates unexpectedly.
    pub async fn serve<F>(self, addr: SocketAddr, shutdown: F) -> ApiServerResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ApiServerError::Bind { addr, source })?;
        info!(%addr, "starting API");
        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|source| ApiServerError::Serve { source })?;
        info!("API stopped");
        Ok(())
    }

    #[cfg(test)]
    pub(crate) const fn router(&self) -> &Router {
        &self.router
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::{Result, anyhow};
    use axum::body::{Body, to_bytes};
    use axum::http::{StatusCode, header};
    use axum::response::Response;
    use async_trait::async_trait;
    use filekit_audit::{AuditRecord, AuditResult, AuditSink, AuditStore, ContentArchive};
    use filekit_codec::FormatCodecs;
    use filekit_config::CodecSettings;
    use filekit_storage::WorkingStorage;
    use filekit_telemetry::REQUEST_ID_HEADER;
    use filekit_test_support::fixtures;
    use std::net::IpAddr;
    use tempfile::TempDir;
    use tower::ServiceExt;

    const BOUNDARY: &str = "filekit-test-boundary";

    #[derive(Default)]
    struct MemoryStore {
        records: std::sync::Mutex<Vec<AuditRecord>>,
    }

    #[async_trait]
    impl AuditStore for MemoryStore {
        async fn insert(&self, record: &AuditRecord) -> AuditResult<()> {
            if let Ok(mut records) = self.records.lock() {
                records.push(record.clone());
            }
            Ok(())
        }
    }

    struct TestApi {
        _root: TempDir,
        metrics: Metrics,
        store: Arc<MemoryStore>,
        pipeline: RequestPipeline,
        server: ApiServer,
    }

    impl TestApi {
        fn new() -> Result<Self> {
            Self::with_limit(10 * 1024 * 1024)
        }

        fn with_limit(max_upload_bytes: usize) -> Result<Self> {
            let root = tempfile::tempdir()?;
            let working = root.path().join("uploads");
            let archive = root.path().join("monitor_db");
            std::fs::create_dir_all(&working)?;
            std::fs::create_dir_all(&archive)?;

            let metrics = Metrics::new()?;
            let store = Arc::new(MemoryStore::default());
            let sink = AuditSink::new(
                ContentArchive::new(&archive, metrics.clone()),
                store.clone(),
                metrics.clone(),
            );
            let pipeline = RequestPipeline::new(
                WorkingStorage::new(&working),
                sink,
                FormatCodecs::new(CodecSettings::default()),
                metrics.clone(),
            );
            let http = HttpSettings {
                bind_addr: IpAddr::from([127, 0, 0, 1]),
                port: 5000,
                max_upload_bytes,
                site_url: "https://files.example/".to_string(),
            };
            let server = ApiServer::new(pipeline.clone(), metrics.clone(), &http);
            Ok(Self {
                _root: root,
                metrics,
                store,
                pipeline,
                server,
            })
        }

        async fn audited_kinds(&self) -> Vec<&'static str> {
            self.pipeline.drain_audit().await;
            self.store
                .records
                .lock()
                .map(|records| records.iter().map(|record| record.kind.as_str()).collect())
                .unwrap_or_default()
        }

        async fn send(&self, request: Request<Body>) -> Result<Response> {
            Ok(self.server.router().clone().oneshot(request).await?)
        }
    }

    struct Part<'a> {
        name: &'a str,
        file_name: Option<&'a str>,
        bytes: &'a [u8],
    }

    fn multipart(uri: &str, parts: &[Part<'_>]) -> Result<Request<Body>> {
        let mut body = Vec::new();
        for part in parts {
            body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            let disposition = match part.file_name {
                Some(file_name) => format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{file_name}\"\r\n\
                     Content-Type: application/octet-stream\r\n\r\n",
                    part.name
                ),
                None => format!(
                    "Content-Disposition: form-data; name=\"{}\"\r\n\r\n",
                    part.name
                ),
            };
            body.extend_from_slice(disposition.as_bytes());
            body.extend_from_slice(part.bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        Ok(Request::post(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))?)
    }

    fn header_value(response: &Response, name: header::HeaderName) -> Result<String> {
        Ok(response
            .headers()
            .get(&name)
            .ok_or_else(|| anyhow!("missing {name} header"))?
            .to_str()?
            .to_string())
    }

    async fn body_bytes(response: Response) -> Result<Vec<u8>> {
        Ok(to_bytes(response.into_body(), usize::MAX).await?.to_vec())
    }

    async fn error_message(response: Response) -> Result<String> {
        let json: serde_json::Value = serde_json::from_slice(&body_bytes(response).await?)?;
        json.get("error")
            .and_then(serde_json::Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| anyhow!("error body missing message: {json}"))
    }

    #[tokio::test]
    async fn health_reports_ok_and_echoes_request_id() -> Result<()> {
        let api = TestApi::new()?;
        let request = Request::get("/health")
            .header(REQUEST_ID_HEADER, "req-123")
            .body(Body::empty())?;
        let response = api.send(request).await?;

        assert_eq!(response.status(), StatusCode::OK);
        let echoed = header_value(&response, header::HeaderName::from_static(REQUEST_ID_HEADER))?;
        assert_eq!(echoed, "req-123");
        let json: serde_json::Value = serde_json::from_slice(&body_bytes(response).await?)?;
        assert_eq!(json["status"], "ok");
        assert!(json["build"].is_string());
        Ok(())
    }

    #[tokio::test]
    async fn convert_returns_png_attachment_named_after_upload() -> Result<()> {
        let api = TestApi::new()?;
        let input = fixtures::png_rgba(6, 4);
        let request = multipart(
            "/api/heic",
            &[Part {
                name: "file",
                file_name: Some("holiday.heic"),
                bytes: &input,
            }],
        )?;
        let response = api.send(request).await?;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(header_value(&response, header::CONTENT_TYPE)?, "image/png");
        assert_eq!(
            header_value(&response, header::CONTENT_DISPOSITION)?,
            "attachment; filename=\"holiday.png\""
        );
        let decoded = image::load_from_memory(&body_bytes(response).await?)?;
        assert_eq!((decoded.width(), decoded.height()), (6, 4));
        Ok(())
    }

    #[tokio::test]
    async fn convert_without_file_field_is_json_error() -> Result<()> {
        let api = TestApi::new()?;
        let request = multipart(
            "/api/heic",
            &[Part {
                name: "other",
                file_name: None,
                bytes: b"ignored",
            }],
        )?;
        let response = api.send(request).await?;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(error_message(response).await?.contains("file"));
        assert_eq!(api.metrics.operation_count("HEIC_CONVERT", "failure"), 1);
        Ok(())
    }

    #[tokio::test]
    async fn non_form_body_still_runs_the_pipeline() -> Result<()> {
        let api = TestApi::new()?;
        let request = Request::post("/api/compress")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{}"))?;
        let response = api.send(request).await?;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!error_message(response).await?.is_empty());
        assert_eq!(api.metrics.operation_count("COMPRESS", "failure"), 1);
        assert_eq!(api.audited_kinds().await, vec!["COMPRESS"]);
        Ok(())
    }

    #[tokio::test]
    async fn qr_accepts_urlencoded_and_multipart_forms() -> Result<()> {
        let api = TestApi::new()?;
        let encoded = Request::post("/api/qr")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from("text=https%3A%2F%2Fexample.com&logo=ignored"))?;
        let response = api.send(encoded).await?;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(header_value(&response, header::CONTENT_TYPE)?, "image/png");
        assert_eq!(
            header_value(&response, header::CONTENT_DISPOSITION)?,
            "inline; filename=\"qrcode.png\""
        );
        let from_urlencoded = body_bytes(response).await?;

        let form = multipart(
            "/api/qr",
            &[
                Part {
                    name: "logo",
                    file_name: Some("logo.png"),
                    bytes: b"not used",
                },
                Part {
                    name: "text",
                    file_name: None,
                    bytes: b"https://example.com",
                },
            ],
        )?;
        let response = api.send(form).await?;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_bytes(response).await?, from_urlencoded);
        Ok(())
    }

    #[tokio::test]
    async fn qr_without_text_encodes_empty_string() -> Result<()> {
        let api = TestApi::new()?;
        let request = Request::post("/api/qr").body(Body::empty())?;
        let response = api.send(request).await?;
        assert_eq!(response.status(), StatusCode::OK);
        image::load_from_memory(&body_bytes(response).await?)?;
        Ok(())
    }

    #[tokio::test]
    async fn merge_concatenates_files_in_submission_order() -> Result<()> {
        let api = TestApi::new()?;
        let first = fixtures::sample_pdf(&[200]);
        let second = fixtures::sample_pdf(&[300, 400]);
        let request = multipart(
            "/api/merge",
            &[
                Part {
                    name: "files",
                    file_name: Some("a.pdf"),
                    bytes: &first,
                },
                Part {
                    name: "files",
                    file_name: Some("b.pdf"),
                    bytes: &second,
                },
            ],
        )?;
        let response = api.send(request).await?;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(header_value(&response, header::CONTENT_TYPE)?, "application/pdf");
        assert_eq!(
            header_value(&response, header::CONTENT_DISPOSITION)?,
            "attachment; filename=\"merged.pdf\""
        );
        let merged = lopdf::Document::load_mem(&body_bytes(response).await?)?;
        assert_eq!(merged.get_pages().len(), 3);
        Ok(())
    }

    #[tokio::test]
    async fn compress_returns_inline_jpeg() -> Result<()> {
        let api = TestApi::new()?;
        let input = fixtures::png_indexed(8, 8);
        let request = multipart(
            "/api/compress",
            &[Part {
                name: "file",
                file_name: Some("palette.png"),
                bytes: &input,
            }],
        )?;
        let response = api.send(request).await?;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(header_value(&response, header::CONTENT_TYPE)?, "image/jpeg");
        assert_eq!(
            header_value(&response, header::CONTENT_DISPOSITION)?,
            "inline; filename=\"compressed.jpg\""
        );
        let body = body_bytes(response).await?;
        assert_eq!(image::guess_format(&body)?, image::ImageFormat::Jpeg);
        Ok(())
    }

    #[tokio::test]
    async fn oversized_upload_is_rejected_with_json_error() -> Result<()> {
        let api = TestApi::with_limit(1024)?;
        let input = fixtures::png_noise(64, 64);
        let request = multipart(
            "/api/compress",
            &[Part {
                name: "file",
                file_name: Some("big.png"),
                bytes: &input,
            }],
        )?;
        let response = api.send(request).await?;

        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert!(
            error_message(response)
                .await?
                .starts_with("unreadable request body")
        );
        assert_eq!(api.metrics.operation_count("COMPRESS", "failure"), 1);
        assert_eq!(api.audited_kinds().await, vec!["COMPRESS"]);
        Ok(())
    }

    #[tokio::test]
    async fn truncated_multipart_is_audited_processing_failure() -> Result<()> {
        let api = TestApi::new()?;
        let body = format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"cut.png\"\r\n\
             Content-Type: image/png\r\n\r\n\
             PNG header without a closing boundary"
        );
        let request = Request::post("/api/compress")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))?;
        let response = api.send(request).await?;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(
            error_message(response)
                .await?
                .starts_with("unreadable request body")
        );
        assert_eq!(api.metrics.operation_count("COMPRESS", "failure"), 1);
        assert_eq!(api.audited_kinds().await, vec!["COMPRESS"]);
        Ok(())
    }

    #[tokio::test]
    async fn static_documents_are_served() -> Result<()> {
        let api = TestApi::new()?;
        let response = api
            .send(Request::get("/robots.txt").body(Body::empty())?)
            .await?;
        assert_eq!(header_value(&response, header::CONTENT_TYPE)?, "text/plain");
        assert_eq!(
            String::from_utf8(body_bytes(response).await?)?,
            "User-agent: *\nDisallow:\nAllow: /"
        );

        let response = api
            .send(Request::get("/sitemap.xml").body(Body::empty())?)
            .await?;
        assert_eq!(
            header_value(&response, header::CONTENT_TYPE)?,
            "application/xml"
        );
        let xml = String::from_utf8(body_bytes(response).await?)?;
        assert!(xml.contains("<loc>https://files.example/</loc>"));
        Ok(())
    }

    #[tokio::test]
    async fn metrics_count_routed_requests() -> Result<()> {
        let api = TestApi::new()?;
        api.send(Request::get("/health").body(Body::empty())?)
            .await?;
        let response = api
            .send(Request::get("/metrics").body(Body::empty())?)
            .await?;

        assert_eq!(
            header_value(&response, header::CONTENT_TYPE)?,
            "text/plain; version=0.0.4"
        );
        let text = String::from_utf8(body_bytes(response).await?)?;
        assert!(text.contains("http_requests_total{code=\"200\",route=\"/health\"} 1"));
        Ok(())
    }
}
