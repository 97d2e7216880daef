//! Shared test utilities for connector integration tests
#![allow(dead_code)]

use std::fs;
use std::path::Path;
use std::sync::Arc;

use common::connector::{Connector, Params, Response};
use common::node::Node;
use common::volume::{VolumeConfig, VolumeRegistry};
use serde_json::Value;
use tempfile::TempDir;

/// A connector over a single "Media" volume with a small fixture tree:
///
/// ```text
/// docs/
///   a.txt
///   sub/b.txt
/// notes.txt
/// ```
pub fn setup_connector() -> (Connector, TempDir) {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join("docs/sub")).unwrap();
    fs::write(dir.path().join("docs/a.txt"), b"alpha").unwrap();
    fs::write(dir.path().join("docs/sub/b.txt"), b"beta").unwrap();
    fs::write(dir.path().join("notes.txt"), b"notes").unwrap();

    let registry = VolumeRegistry::new(
        vec![VolumeConfig::new("Media", dir.path(), "/media/")],
        None,
    )
    .unwrap();
    (Connector::new(Arc::new(registry)), dir)
}

/// Two volumes, "First" and "Second", each with one file.
pub fn setup_two_volumes() -> (Connector, TempDir, TempDir) {
    let first = TempDir::new().unwrap();
    let second = TempDir::new().unwrap();
    fs::write(first.path().join("one.txt"), b"1").unwrap();
    fs::write(second.path().join("two.txt"), b"2").unwrap();

    let registry = VolumeRegistry::new(
        vec![
            VolumeConfig::new("First", first.path(), "/first/"),
            VolumeConfig::new("Second", second.path(), "/second/"),
        ],
        None,
    )
    .unwrap();
    (Connector::new(Arc::new(registry)), first, second)
}

pub fn node(connector: &Connector, volume: &str, path: &str) -> Node {
    Node::new(connector.registry().get(volume).unwrap().clone(), path)
}

pub fn hash(connector: &Connector, path: &str) -> String {
    node(connector, "Media", path).hash()
}

/// Dispatch and serialize the response as the daemon would.
pub fn run(connector: &Connector, params: Params) -> Value {
    let response = connector.dispatch(params);
    assert!(response.is_json(), "expected a JSON response, got {response:?}");
    serde_json::to_value(response).unwrap()
}

pub fn dispatch(connector: &Connector, params: Params) -> Response {
    connector.dispatch(params)
}

pub fn names(list: &Value) -> Vec<String> {
    list.as_array()
        .unwrap()
        .iter()
        .map(|info| info["name"].as_str().unwrap().to_string())
        .collect()
}

pub fn errors(body: &Value) -> Vec<String> {
    body["error"]
        .as_array()
        .map(|codes| {
            codes
                .iter()
                .map(|c| c.as_str().unwrap().to_string())
                .collect()
        })
        .unwrap_or_default()
}

pub fn write_png(path: &Path, width: u32, height: u32) {
    image::RgbaImage::from_pixel(width, height, image::Rgba([200, 10, 10, 255]))
        .save(path)
        .unwrap();
}
