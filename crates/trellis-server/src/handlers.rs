//! REST API handlers

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use trellis_core::GraphPayload;

use crate::{AnalyzeError, ServerState, Target, TrellisConfig};

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    #[serde(rename = "runToken")]
    pub run_token: Option<String>,
    pub watching: bool,
}

/// Body of `POST /api/analyze`: a configured target name, or an explicit
/// root and entry.
#[derive(Debug, Default, Deserialize)]
pub struct AnalyzeRequest {
    pub target: Option<String>,
    pub root: Option<PathBuf>,
    pub entry: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResponse {
    pub run_token: String,
    pub snapshot: Option<String>,
    pub graph: GraphPayload,
}

/// Error body: `{"error": "..."}` with a matching status.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        ApiError {
            status,
            message: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(serde_json::json!({ "error": self.message }))).into_response()
    }
}

impl From<AnalyzeError> for ApiError {
    fn from(err: AnalyzeError) -> Self {
        let status = match &err {
            AnalyzeError::Busy => StatusCode::CONFLICT,
            AnalyzeError::Build(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AnalyzeError::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        ApiError::new(status, err.to_string())
    }
}

/// Requests without an `Origin` header (CLI tools) and same-origin browser
/// requests pass; other origins must be listed in `allowed_origins`.
pub(crate) fn origin_allowed(config: &TrellisConfig, headers: &HeaderMap) -> bool {
    let Some(origin) = headers.get(header::ORIGIN).and_then(|v| v.to_str().ok()) else {
        return true;
    };
    let authority = origin
        .strip_prefix("http://")
        .or_else(|| origin.strip_prefix("https://"));
    let same_origin = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|host| authority == Some(host));
    same_origin || config.server.allowed_origins.iter().any(|o| o == origin)
}

/// Health check endpoint
pub async fn health_check(State(state): State<Arc<ServerState>>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        run_token: state.propagator.run_token(),
        watching: state.propagator.is_watching(),
    })
}

/// Configured targets
pub async fn list_targets(State(state): State<Arc<ServerState>>) -> Json<Vec<Target>> {
    Json(state.config.targets.clone())
}

/// Latest snapshot
pub async fn get_graph(State(state): State<Arc<ServerState>>) -> Result<Json<GraphPayload>, ApiError> {
    let latest = state.latest.read().await;
    match latest.as_ref() {
        Some(run) => Ok(Json(run.payload.clone())),
        None => Err(ApiError::new(StatusCode::NOT_FOUND, "no analysis has run yet")),
    }
}

/// Run an analysis and return its graph. Only configured targets, or roots
/// inside a configured target root, may be analyzed.
pub async fn analyze(
    State(state): State<Arc<ServerState>>,
    headers: HeaderMap,
    Json(request): Json<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>, ApiError> {
    if !origin_allowed(&state.config, &headers) {
        return Err(ApiError::new(StatusCode::FORBIDDEN, "origin not allowed"));
    }
    let (root, entry) = match (request.target, request.root, request.entry) {
        (Some(name), _, _) => {
            let target = state
                .config
                .target(&name)
                .ok_or_else(|| ApiError::new(StatusCode::NOT_FOUND, format!("unknown target {:?}", name)))?;
            (target.root.clone(), target.entry.clone())
        }
        (None, Some(root), Some(entry)) => {
            let authorized = state.config.authorize_root(&root).ok_or_else(|| {
                tracing::warn!("Rejected analysis of unconfigured root {}", root.display());
                ApiError::new(
                    StatusCode::FORBIDDEN,
                    format!("{} is not inside a configured target", root.display()),
                )
            })?;
            (authorized, entry)
        }
        _ => {
            return Err(ApiError::new(
                StatusCode::BAD_REQUEST,
                "expected {\"target\"} or {\"root\", \"entry\"}",
            ));
        }
    };

    tracing::info!("Analyze requested: {} ({})", root.display(), entry.display());
    let run = state.analyze(root, entry).await?;
    Ok(Json(AnalyzeResponse {
        run_token: run.run_token,
        snapshot: run.snapshot.map(|p| p.display().to_string()),
        graph: run.payload,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use std::fs;
    use tempfile::TempDir;

    fn state_with_target(dir: &TempDir) -> Arc<ServerState> {
        let mut config = TrellisConfig::default();
        config.targets.push(Target {
            name: "demo".to_string(),
            root: dir.path().to_path_buf(),
            entry: PathBuf::from("index.js"),
        });
        Arc::new(ServerState::new(config))
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_check() {
        let state = Arc::new(ServerState::new(TrellisConfig::default()));
        let response = health_check(State(state)).await.into_response();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
        assert!(body["runToken"].is_null());
    }

    #[tokio::test]
    async fn test_graph_before_and_after_analysis() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("index.js"), "require('./lib.js');\n").unwrap();
        fs::write(dir.path().join("lib.js"), "module.exports = 1;\n").unwrap();
        let state = state_with_target(&dir);

        let err = get_graph(State(Arc::clone(&state))).await.unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);

        let request = AnalyzeRequest {
            target: Some("demo".to_string()),
            ..Default::default()
        };
        let Json(analyzed) = analyze(State(Arc::clone(&state)), HeaderMap::new(), Json(request)).await.unwrap();
        assert!(analyzed.run_token.starts_with("run-"));
        assert!(analyzed.graph.has_link("index.js", trellis_core::LinkType::Use, "lib.js"));

        let Json(graph) = get_graph(State(state)).await.unwrap();
        assert_eq!(graph, analyzed.graph);
    }

    #[tokio::test]
    async fn test_analyze_error_statuses() {
        let dir = TempDir::new().unwrap();
        let state = state_with_target(&dir);

        let unknown = AnalyzeRequest {
            target: Some("nope".to_string()),
            ..Default::default()
        };
        let err = analyze(State(Arc::clone(&state)), HeaderMap::new(), Json(unknown)).await.unwrap_err();
        assert_eq!(err.status, StatusCode::NOT_FOUND);

        let partial = AnalyzeRequest {
            root: Some(dir.path().to_path_buf()),
            ..Default::default()
        };
        let err = analyze(State(Arc::clone(&state)), HeaderMap::new(), Json(partial)).await.unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);

        // The configured entry does not exist.
        let missing = AnalyzeRequest {
            target: Some("demo".to_string()),
            ..Default::default()
        };
        let err = analyze(State(state), HeaderMap::new(), Json(missing)).await.unwrap_err();
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);

        let body = body_json(err.into_response()).await;
        assert!(body["error"].as_str().unwrap().contains("cannot read entrypoint"));
    }

    #[tokio::test]
    async fn test_explicit_root_must_be_configured() {
        let outside = TempDir::new().unwrap();
        fs::write(outside.path().join("index.js"), "// Private notes\n").unwrap();
        let state = Arc::new(ServerState::new(TrellisConfig::default()));

        let request = AnalyzeRequest {
            root: Some(outside.path().to_path_buf()),
            entry: Some(PathBuf::from("index.js")),
            ..Default::default()
        };
        let err = analyze(State(Arc::clone(&state)), HeaderMap::new(), Json(request))
            .await
            .unwrap_err();
        assert_eq!(err.status, StatusCode::FORBIDDEN);
        assert!(!outside.path().join(".trellis").exists());
        assert!(state.latest.read().await.is_none());
    }

    #[tokio::test]
    async fn test_explicit_root_inside_target() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("pkg")).unwrap();
        fs::write(dir.path().join("pkg/main.js"), "module.exports = 1;\n").unwrap();
        let state = state_with_target(&dir);

        let request = AnalyzeRequest {
            root: Some(dir.path().join("pkg")),
            entry: Some(PathBuf::from("main.js")),
            ..Default::default()
        };
        let Json(analyzed) = analyze(State(state), HeaderMap::new(), Json(request)).await.unwrap();
        assert_eq!(analyzed.graph.meta.entry, "main.js");
    }

    #[tokio::test]
    async fn test_cross_origin_analyze_is_forbidden() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("index.js"), "module.exports = 1;\n").unwrap();
        let state = state_with_target(&dir);

        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, "127.0.0.1:7890".parse().unwrap());
        headers.insert(header::ORIGIN, "http://evil.example".parse().unwrap());
        let request = AnalyzeRequest {
            target: Some("demo".to_string()),
            ..Default::default()
        };
        let err = analyze(State(state), headers, Json(request)).await.unwrap_err();
        assert_eq!(err.status, StatusCode::FORBIDDEN);
        assert!(!dir.path().join(".trellis").exists());
    }

    #[test]
    fn test_origin_allowed() {
        let mut config = TrellisConfig::default();
        let mut headers = HeaderMap::new();
        assert!(origin_allowed(&config, &headers));

        headers.insert(header::HOST, "127.0.0.1:7890".parse().unwrap());
        headers.insert(header::ORIGIN, "http://127.0.0.1:7890".parse().unwrap());
        assert!(origin_allowed(&config, &headers));

        headers.insert(header::ORIGIN, "http://localhost:5173".parse().unwrap());
        assert!(!origin_allowed(&config, &headers));
        config.server.allowed_origins.push("http://localhost:5173".to_string());
        assert!(origin_allowed(&config, &headers));
    }

    #[test]
    fn test_busy_maps_to_conflict() {
        assert_eq!(ApiError::from(AnalyzeError::Busy).status, StatusCode::CONFLICT);
    }
}
