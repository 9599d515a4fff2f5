//! HTTP + WebSocket server

pub mod config;
pub mod handlers;
pub mod probe;
pub mod router;
pub mod websocket;

pub use config::{CONFIG_FILE, ConfigError, ServerConfig, Target, TrellisConfig};

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::{Mutex, RwLock, broadcast};
use trellis_core::GraphPayload;
use trellis_indexer::BuildError;
use trellis_watcher::ChangePropagator;
use websocket::WsMessage;

#[derive(Debug, Error)]
pub enum AnalyzeError {
    #[error("an analysis is already running")]
    Busy,
    #[error(transparent)]
    Build(#[from] BuildError),
    #[error("analysis task failed: {0}")]
    Task(String),
}

/// The outcome of one successful analysis.
#[derive(Debug, Clone)]
pub struct AnalysisRun {
    pub root: PathBuf,
    pub run_token: String,
    pub payload: GraphPayload,
    /// Where the snapshot was written, if writing succeeded.
    pub snapshot: Option<PathBuf>,
}

/// Shared state behind every route.
pub struct ServerState {
    pub config: TrellisConfig,
    pub propagator: ChangePropagator,
    pub latest: RwLock<Option<AnalysisRun>>,
    /// Announces completed analyses to WebSocket clients.
    pub analysis_tx: broadcast::Sender<WsMessage>,
    build_lock: Mutex<()>,
    runs: AtomicU64,
}

impl ServerState {
    pub fn new(config: TrellisConfig) -> Self {
        let (analysis_tx, _) = broadcast::channel(16);
        ServerState {
            propagator: ChangePropagator::with_debounce(config.debounce()),
            config,
            latest: RwLock::new(None),
            analysis_tx,
            build_lock: Mutex::new(()),
            runs: AtomicU64::new(0),
        }
    }

    fn next_run_token(&self) -> String {
        let n = self.runs.fetch_add(1, Ordering::SeqCst) + 1;
        format!("run-{}-{}", chrono::Utc::now().timestamp_millis(), n)
    }

    /// Build, probe, persist, then point the propagator at `root`.
    /// Only one analysis runs at a time; a concurrent call gets `Busy`.
    pub async fn analyze(&self, root: PathBuf, entry: PathBuf) -> Result<AnalysisRun, AnalyzeError> {
        let _guard = self.build_lock.try_lock().map_err(|_| AnalyzeError::Busy)?;

        let build_root = root.clone();
        let mut payload = tokio::task::spawn_blocking(move || trellis_indexer::build(&build_root, &entry))
            .await
            .map_err(|err| AnalyzeError::Task(err.to_string()))??;

        if let Some(url_info) = payload.meta.url_info.as_mut() {
            probe::probe(url_info).await;
        }

        let snapshot = match trellis_core::save_snapshot(&payload, &root) {
            Ok(path) => Some(path),
            Err(err) => {
                tracing::warn!("Failed to persist snapshot: {}", err);
                None
            }
        };

        let run_token = self.next_run_token();
        self.propagator.activate(&root, run_token.clone());

        let run = AnalysisRun {
            root,
            run_token,
            payload,
            snapshot,
        };
        let announcement = WsMessage::Analyzed {
            run_token: run.run_token.clone(),
            entry: run.payload.meta.entry.clone(),
            nodes: run.payload.nodes.len(),
            links: run.payload.links.len(),
        };
        // Publish before announcing so `/api/graph` already serves this run.
        *self.latest.write().await = Some(run.clone());
        // No receivers is fine.
        let _ = self.analysis_tx.send(announcement);
        tracing::info!(
            "Analysis {} complete: {} nodes, {} links",
            run.run_token,
            run.payload.nodes.len(),
            run.payload.links.len()
        );
        Ok(run)
    }
}

/// The Trellis server
pub struct TrellisServer {
    state: Arc<ServerState>,
}

impl TrellisServer {
    pub fn new(config: TrellisConfig) -> Self {
        TrellisServer {
            state: Arc::new(ServerState::new(config)),
        }
    }

    pub fn state(&self) -> Arc<ServerState> {
        Arc::clone(&self.state)
    }

    /// Serve on an already bound listener.
    pub async fn serve(self, listener: TcpListener) -> anyhow::Result<()> {
        let app = router::create_router(self.state);
        axum::serve(listener, app).await?;
        Ok(())
    }
}
