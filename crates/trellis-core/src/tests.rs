//! Unit tests for the graph store and payload

use crate::graph::ProjectGraph;
use crate::model::*;

fn metrics(lines: u32, complexity: u32, header: &str) -> NodeMetrics {
    NodeMetrics {
        lines,
        complexity,
        header_comment: header.to_string(),
    }
}

#[test]
fn test_nodes_keep_insertion_order() {
    let mut graph = ProjectGraph::new();
    graph.ensure_node("b.js", NodeKind::File);
    graph.ensure_node("a.js", NodeKind::File);
    graph.ensure_node("c", NodeKind::Dir);
    graph.ensure_node("a.js", NodeKind::Asset);

    let ids: Vec<_> = graph.nodes().map(|n| n.id.as_str()).collect();
    assert_eq!(ids, vec!["b.js", "a.js", "c"]);
    assert_eq!(graph.node("a.js").unwrap().kind, Some(NodeKind::File));
}

#[test]
fn test_links_are_deduplicated_by_triple() {
    let mut graph = ProjectGraph::new();
    graph.ensure_node("a.js", NodeKind::File);
    graph.ensure_node("b.js", NodeKind::File);

    assert!(graph.add_link("a.js", LinkType::Use, "b.js"));
    assert!(!graph.add_link("a.js", LinkType::Use, "b.js"));
    assert!(graph.add_link("a.js", LinkType::Include, "b.js"));
    assert!(graph.add_link("b.js", LinkType::Use, "a.js"));
    assert_eq!(graph.link_count(), 3);
}

#[test]
fn test_links_require_known_distinct_endpoints() {
    let mut graph = ProjectGraph::new();
    graph.ensure_node("a.js", NodeKind::File);
    assert!(!graph.add_link("a.js", LinkType::Use, "missing.js"));
    assert!(!graph.add_link("a.js", LinkType::Include, "a.js"));
    assert_eq!(graph.link_count(), 0);
}

#[test]
fn test_placeholder_upgrade_keeps_single_node() {
    let mut graph = ProjectGraph::new();
    graph.ensure_node("lib/util.js", NodeKind::Asset);
    assert!(graph.node("lib/util.js").unwrap().is_placeholder());

    graph.upsert_source("lib/util.js", &metrics(12, 3, "Helpers"));
    assert_eq!(graph.node_count(), 1);
    let node = graph.node("lib/util.js").unwrap();
    assert_eq!(node.lines, 12);
    assert_eq!(node.complexity, 3);
    assert_eq!(node.header_comment, "Helpers");
    assert_eq!(node.kind, Some(NodeKind::File));
}

#[test]
fn test_upgrade_never_downgrades() {
    let mut graph = ProjectGraph::new();
    graph.upsert_source("a.js", &metrics(10, 2, "Real header"));
    graph.upsert_source("a.js", &metrics(0, 0, ""));
    graph.upsert_source("a.js", &metrics(99, 9, "Other"));

    let node = graph.node("a.js").unwrap();
    assert_eq!(node.lines, 10);
    assert_eq!(node.complexity, 2);
    assert_eq!(node.header_comment, "Real header");
}

#[test]
fn test_dir_kind_survives_upsert() {
    let mut graph = ProjectGraph::new();
    graph.ensure_node("public", NodeKind::Dir);
    graph.upsert_source("public", &metrics(1, 0, ""));
    assert_eq!(graph.node("public").unwrap().kind, Some(NodeKind::Dir));
}

#[test]
fn test_reachable_from() {
    let mut graph = ProjectGraph::new();
    for id in ["a", "b", "c", "island"] {
        graph.ensure_node(id, NodeKind::File);
    }
    graph.add_link("a", LinkType::Use, "b");
    graph.add_link("b", LinkType::Include, "c");

    let reached = graph.reachable_from("a");
    assert!(reached.contains("a") && reached.contains("b") && reached.contains("c"));
    assert!(!reached.contains("island"));
    assert!(graph.reachable_from("nope").is_empty());
}

#[test]
fn test_from_payload_keeps_order_and_links() {
    let mut graph = ProjectGraph::new();
    graph.upsert_source("app/server.js", &metrics(4, 2, "Entry"));
    graph.ensure_node("public", NodeKind::Dir);
    graph.add_link("app/server.js", LinkType::Include, "public");
    let payload = graph.into_payload(Meta {
        entry: "app/server.js".to_string(),
        url_info: None,
    });

    let rebuilt = ProjectGraph::from_payload(&payload);
    assert_eq!(rebuilt.node("app/server.js").unwrap().lines, 4);
    assert!(rebuilt.reachable_from("app/server.js").contains("public"));
    assert_eq!(rebuilt.into_payload(payload.meta.clone()), payload);
}

#[test]
fn test_display_name() {
    assert_eq!(display_name("app/routes/apps.js"), "apps.js");
    assert_eq!(display_name("public/"), "public");
    assert_eq!(display_name("."), ".");
}

#[test]
fn test_payload_shape() {
    let mut graph = ProjectGraph::new();
    graph.upsert_source("app/server.js", &metrics(3, 1, "Entry"));
    graph.ensure_node("app/routes/apps.js", NodeKind::File);
    graph.add_link("app/server.js", LinkType::Use, "app/routes/apps.js");

    let payload = graph.into_payload(Meta {
        entry: "app/server.js".to_string(),
        url_info: None,
    });

    insta::assert_json_snapshot!(payload, @r###"
    {
      "meta": {
        "entry": "app/server.js",
        "urlInfo": null
      },
      "nodes": [
        {
          "id": "app/server.js",
          "file": "server.js",
          "lines": 3,
          "complexity": 1,
          "headerComment": "Entry",
          "kind": "file"
        },
        {
          "id": "app/routes/apps.js",
          "file": "apps.js",
          "lines": 0,
          "complexity": 0,
          "headerComment": "",
          "kind": "file"
        }
      ],
      "links": [
        {
          "source": "app/server.js",
          "target": "app/routes/apps.js",
          "type": "use"
        }
      ]
    }
    "###);
}

#[test]
fn test_snapshot_roundtrip_on_disk() {
    let dir = tempfile::TempDir::new().unwrap();
    let mut graph = ProjectGraph::new();
    graph.upsert_source("index.js", &metrics(1, 0, ""));
    let payload = graph.into_payload(Meta {
        entry: "index.js".to_string(),
        url_info: Some(UrlInfo::local(3000)),
    });

    let path = crate::save_snapshot(&payload, dir.path()).unwrap();
    assert!(path.ends_with(".trellis/graph.json"));
    assert_eq!(crate::load_snapshot(dir.path()), Some(payload));
}
