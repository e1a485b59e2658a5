//! HTTP routes for update search.
//!
//! Every search route takes a form with a non-empty `content` field and runs
//! it through the update graph. Both url-encoded and multipart forms are
//! accepted.

use crate::graph::UpdateGraph;
use crate::orchestrator::Orchestrator;
use axum::{
    extract::{FromRequest, Multipart, Request, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Routes as `(method, path)` pairs, for the startup banner.
pub const ROUTES: &[(&str, &str)] = &[
    ("POST", "/search-updates"),
    ("POST", "/search-updates-agent"),
    ("POST", "/search-updates-graph"),
    ("POST", "/agent-with-mcp"),
    ("GET", "/health"),
];

#[derive(Deserialize)]
struct SearchForm {
    #[serde(default)]
    content: Option<String>,
}

/// The `content` form field, present only if the body parsed as a form and
/// the field is a single non-empty string.
struct SearchContent(Option<String>);

impl<S> FromRequest<S> for SearchContent
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("multipart/form-data"));

        let content = if is_multipart {
            match Multipart::from_request(req, state).await {
                Ok(multipart) => multipart_content(multipart).await,
                Err(_) => None,
            }
        } else {
            Form::<SearchForm>::from_request(req, state)
                .await
                .ok()
                .and_then(|Form(form)| form.content)
        };

        Ok(Self(content.filter(|content| !content.is_empty())))
    }
}

/// A repeated `content` field or a file upload is not a valid string.
async fn multipart_content(mut multipart: Multipart) -> Option<String> {
    let mut content = None;
    while let Some(field) = multipart.next_field().await.ok()? {
        if field.name() != Some("content") {
            continue;
        }
        if content.is_some() || field.file_name().is_some() {
            return None;
        }
        content = Some(field.text().await.ok()?);
    }
    content
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// Build the application router.
pub fn router(state: Arc<Orchestrator>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/search-updates", post(search_updates))
        .route("/search-updates-agent", post(search_updates))
        .route("/search-updates-graph", post(search_updates))
        .route("/agent-with-mcp", post(agent_with_mcp))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn search_updates(
    State(state): State<Arc<Orchestrator>>,
    SearchContent(content): SearchContent,
) -> Response {
    match content {
        Some(content) => run_graph(&state, state.graph(), content).await,
        None => invalid(),
    }
}

async fn agent_with_mcp(
    State(state): State<Arc<Orchestrator>>,
    SearchContent(content): SearchContent,
) -> Response {
    match content {
        Some(content) => run_graph(&state, state.mcp_graph(), content).await,
        None => invalid(),
    }
}

fn invalid() -> Response {
    (StatusCode::UNAUTHORIZED, "Invalid!").into_response()
}

async fn run_graph(state: &Orchestrator, graph: &UpdateGraph, content: String) -> Response {
    match graph.invoke(state.conversation(content)).await {
        Ok(run) => {
            run.log_summary();
            for call in &run.tool_calls {
                info!("Tool call: {}", call);
            }
            (
                StatusCode::CREATED,
                Json(serde_json::json!({ "message": "Created!" })),
            )
                .into_response()
        }
        Err(e) => {
            error!("Graph run failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    error: e.to_string(),
                }),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::conversation::{Message, ToolCallRequest};
    use crate::error::{Result, WhatsNewError};
    use crate::feed::{FeedFetcher, FeedItem};
    use crate::graph::ChatModel;
    use crate::tools::{ToolSpec, GET_AWS_UPDATES};
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tower::ServiceExt;

    /// Asks for S3 updates once, then answers.
    #[derive(Default)]
    struct S3Model {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ChatModel for S3Model {
        async fn invoke(&self, messages: &[Message], _tools: &[ToolSpec]) -> Result<Message> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match messages.last() {
                Some(Message::Tool { content, .. }) => Ok(Message::ai(format!("Found: {}", content))),
                _ => Ok(Message::ai_with_tool_calls(
                    "",
                    vec![ToolCallRequest {
                        id: "call_1".to_string(),
                        name: GET_AWS_UPDATES.to_string(),
                        arguments: r#"{"serviceName":"S3"}"#.to_string(),
                    }],
                )),
            }
        }

        fn name(&self) -> &str {
            "s3"
        }
    }

    struct StaticFeed;

    #[async_trait]
    impl FeedFetcher for StaticFeed {
        async fn fetch(&self) -> Result<Vec<FeedItem>> {
            Ok(vec![FeedItem {
                title: Some("Amazon S3 adds a feature".to_string()),
                pub_date: Some("Mon, 01 Jan 2024 00:00:00 GMT".to_string()),
                content_snippet: Some("New S3 feature".to_string()),
                content: None,
            }])
        }
    }

    struct DownFeed;

    #[async_trait]
    impl FeedFetcher for DownFeed {
        async fn fetch(&self) -> Result<Vec<FeedItem>> {
            Err(WhatsNewError::FeedFetch("connection refused".to_string()))
        }
    }

    fn app(model: Arc<S3Model>, feed: Arc<dyn FeedFetcher>) -> Router {
        router(Arc::new(Orchestrator::from_parts(
            Settings::default(),
            model,
            feed,
            None,
        )))
    }

    fn form_request(path: &str, body: &'static str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(path)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap()
    }

    fn multipart_request(path: &str, parts: &[(&str, Option<&str>, &str)]) -> Request<Body> {
        let mut body = String::new();
        for (name, file_name, value) in parts {
            body.push_str("--XYZ\r\n");
            match file_name {
                Some(file) => body.push_str(&format!(
                    "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\r\n",
                    name, file
                )),
                None => body.push_str(&format!(
                    "Content-Disposition: form-data; name=\"{}\"\r\n\r\n",
                    name
                )),
            }
            body.push_str(value);
            body.push_str("\r\n");
        }
        body.push_str("--XYZ--\r\n");

        Request::builder()
            .method("POST")
            .uri(path)
            .header(header::CONTENT_TYPE, "multipart/form-data; boundary=XYZ")
            .body(Body::from(body))
            .unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = app(Arc::default(), Arc::new(StaticFeed))
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, r#"{"status":"ok"}"#);
    }

    #[tokio::test]
    async fn test_valid_content_is_created() {
        for (method, path) in ROUTES.iter().filter(|(m, _)| *m == "POST") {
            let model = Arc::new(S3Model::default());
            let response = app(model.clone(), Arc::new(StaticFeed))
                .oneshot(form_request(path, "content=Any+S3+updates%3F"))
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::CREATED, "{} {}", method, path);
            assert_eq!(body_text(response).await, r#"{"message":"Created!"}"#);
            assert_eq!(model.calls.load(Ordering::SeqCst), 2);
        }
    }

    #[tokio::test]
    async fn test_empty_content_is_rejected() {
        let model = Arc::new(S3Model::default());
        let response = app(model.clone(), Arc::new(StaticFeed))
            .oneshot(form_request("/search-updates", "content="))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_text(response).await, "Invalid!");
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_missing_content_is_rejected() {
        let model = Arc::new(S3Model::default());
        let response = app(model.clone(), Arc::new(StaticFeed))
            .oneshot(form_request("/agent-with-mcp", "other=value"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_multipart_content_is_created() {
        let model = Arc::new(S3Model::default());
        let response = app(model.clone(), Arc::new(StaticFeed))
            .oneshot(multipart_request(
                "/search-updates",
                &[("note", None, "ignored"), ("content", None, "What's new in S3?")],
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(body_text(response).await, r#"{"message":"Created!"}"#);
        assert_eq!(model.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_invalid_multipart_content_is_rejected() {
        let cases: [&[(&str, Option<&str>, &str)]; 4] = [
            &[("content", None, "")],
            &[("other", None, "S3")],
            &[("content", None, "S3"), ("content", None, "EC2")],
            &[("content", Some("q.txt"), "S3")],
        ];

        for parts in cases {
            let model = Arc::new(S3Model::default());
            let response = app(model.clone(), Arc::new(StaticFeed))
                .oneshot(multipart_request("/agent-with-mcp", parts))
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{:?}", parts);
            assert_eq!(model.calls.load(Ordering::SeqCst), 0);
        }
    }

    #[tokio::test]
    async fn test_repeated_urlencoded_content_is_rejected() {
        let response = app(Arc::default(), Arc::new(StaticFeed))
            .oneshot(form_request("/search-updates", "content=S3&content=EC2"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_non_form_body_is_rejected() {
        let request = Request::builder()
            .method("POST")
            .uri("/search-updates-graph")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"content":"S3"}"#))
            .unwrap();

        let response = app(Arc::default(), Arc::new(StaticFeed))
            .oneshot(request)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_feed_failure_is_server_error() {
        let response = app(Arc::default(), Arc::new(DownFeed))
            .oneshot(form_request("/search-updates", "content=S3"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body_text(response).await.contains("connection refused"));
    }
}
