//! Integration tests for Trellis
//!
//! These tests verify that the indexer, snapshot store, watcher and server
//! work together.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use trellis_core::LinkType;
use trellis_server::{TrellisConfig, TrellisServer};
use trellis_watcher::{ChangeKind, ChangeNotice, ChangePropagator, RunTokenFilter};

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn express_project() -> TempDir {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "app/server.js",
        "// Demo server\nconst express = require('express');\nconst routes = require('./routes');\nconst app = express();\napp.use(express.static(path.join(__dirname, '../public')));\napp.listen(3000);\n",
    );
    write(dir.path(), "app/routes/index.js", "module.exports = function routes() {};\n");
    write(dir.path(), "public/index.html", "<script src=\"js/main.js\"></script>\n");
    write(dir.path(), "public/js/main.js", "console.log('hi');\n");
    dir
}

#[test]
fn test_analyze_and_snapshot_round_trip() {
    let dir = express_project();
    let payload = tokio_test::assert_ok!(trellis_indexer::build(dir.path(), Path::new("app/server.js")));

    assert_eq!(payload.meta.entry, "app/server.js");
    assert_eq!(payload.meta.url_info.as_ref().map(|u| u.port), Some(3000));
    assert!(payload.has_link("app/server.js", LinkType::Use, "app/routes/index.js"));
    assert!(payload.has_link("app/server.js", LinkType::Include, "public"));
    assert!(payload.node("public/js/main.js").is_some());
    assert!(payload.node("node_modules/express").is_none());

    let path = trellis_core::save_snapshot(&payload, dir.path()).unwrap();
    assert_eq!(path, dir.path().join(".trellis/graph.json"));
    let loaded = trellis_core::load_snapshot(dir.path()).unwrap();
    assert_eq!(loaded, payload);

    // The snapshot directory never shows up in a rebuild.
    let again = trellis_indexer::build(dir.path(), Path::new("app/server.js")).unwrap();
    assert_eq!(again, payload);
}

#[tokio::test]
async fn test_change_feed_for_analyzed_root() {
    let dir = express_project();
    let propagator = ChangePropagator::with_debounce(Duration::from_millis(50));
    propagator.activate(dir.path(), "run-a");
    let mut subscription = propagator.subscribe();
    let mut filter = RunTokenFilter::new("run-a");
    // Give the backend a moment to register.
    tokio::time::sleep(Duration::from_millis(200)).await;

    write(dir.path(), "app/routes/users.js", "module.exports = {};\n");

    let notice = timeout(Duration::from_secs(10), async {
        loop {
            let notice = subscription.recv().await.unwrap();
            if let ChangeNotice::Fs(event) = &notice {
                if event.id == "app/routes/users.js" {
                    return notice;
                }
            }
        }
    })
    .await
    .unwrap();
    assert!(filter.accepts(&notice));
    if let ChangeNotice::Fs(event) = &notice {
        assert!(matches!(event.ev, ChangeKind::Add | ChangeKind::Change));
    }

    // A consumer that has moved on to a newer run ignores it.
    filter.observe("run-b");
    assert!(!filter.accepts(&notice));
}

async fn http_get(addr: std::net::SocketAddr, path: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!("GET {} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n", path);
    stream.write_all(request.as_bytes()).await.unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    response
}

#[tokio::test]
async fn test_server_serves_latest_analysis() {
    let dir = express_project();
    let server = TrellisServer::new(TrellisConfig::default());
    let state = server.state();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(server.serve(listener));

    let health = http_get(addr, "/api/health").await;
    assert!(health.starts_with("HTTP/1.1 200"));
    assert!(health.contains(env!("CARGO_PKG_VERSION")));

    let run = state
        .analyze(dir.path().to_path_buf(), PathBuf::from("app/server.js"))
        .await
        .unwrap();

    let graph = http_get(addr, "/api/graph").await;
    assert!(graph.starts_with("HTTP/1.1 200"));
    let body = graph.split("\r\n\r\n").nth(1).unwrap();
    let served: trellis_core::GraphPayload = serde_json::from_str(body).unwrap();
    assert_eq!(served, run.payload);
}
