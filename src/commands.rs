//! CLI command implementations

use anyhow::Context;
use std::path::PathBuf;
use tokio::net::TcpListener;
use trellis_server::{TrellisConfig, TrellisServer};
use trellis_watcher::{ChangePropagator, RunTokenFilter};

pub async fn analyze(root: PathBuf, entry: PathBuf, out: Option<PathBuf>) -> anyhow::Result<()> {
    tracing::info!("Analyzing {} from {}", root.display(), entry.display());

    let build_root = root.clone();
    let mut payload = tokio::task::spawn_blocking(move || trellis_indexer::build(&build_root, &entry)).await??;
    if let Some(url_info) = payload.meta.url_info.as_mut() {
        trellis_server::probe::probe(url_info).await;
    }

    let written = match out {
        Some(path) => {
            trellis_core::write_snapshot(&payload, &path)?;
            path
        }
        None => trellis_core::save_snapshot(&payload, &root)?,
    };

    tracing::info!(
        "Wrote {} nodes, {} links to {}",
        payload.nodes.len(),
        payload.links.len(),
        written.display()
    );
    println!("{}", written.display());
    Ok(())
}

pub async fn serve(config_path: PathBuf, host: Option<String>, port: Option<u16>, open: bool) -> anyhow::Result<()> {
    if let Ok(path) = dotenvy::dotenv() {
        tracing::debug!("Loaded environment from {}", path.display());
    }

    let mut config = TrellisConfig::load(&config_path)?;
    config.apply_env()?;
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("cannot bind {}", addr))?;
    let local = listener.local_addr()?;
    tracing::info!(
        "Trellis server listening on http://{} ({} targets)",
        local,
        config.targets.len()
    );

    if open {
        let url = format!("http://{}/api/graph", local);
        if let Err(e) = open::that(&url) {
            tracing::warn!("Failed to open browser at {}: {}", url, e);
        }
    }

    TrellisServer::new(config).serve(listener).await
}

pub async fn watch(root: PathBuf) -> anyhow::Result<()> {
    let token = format!("watch-{}", std::process::id());
    let propagator = ChangePropagator::new();
    propagator.activate(&root, token.clone());
    let mut subscription = propagator.subscribe();
    let filter = RunTokenFilter::new(token);

    tracing::info!("Watching {} (Ctrl-C to stop)", root.display());
    loop {
        tokio::select! {
            notice = subscription.recv() => {
                let Some(notice) = notice else { break };
                if filter.accepts(&notice) {
                    println!("{}", serde_json::to_string(&notice)?);
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    propagator.teardown();
    Ok(())
}
