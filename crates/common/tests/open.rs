//! Integration tests for open, tree and parents

mod common;

use std::fs;

use ::common::connector::Params;

#[test]
fn test_open_init_defaults_to_root() {
    let (connector, _dir) = common::setup_connector();
    let body = common::run(
        &connector,
        Params::new().with("cmd", "open").with("init", "1"),
    );

    assert_eq!(body["api"], "2.0");
    assert_eq!(body["cwd"]["name"], "Media");
    assert_eq!(body["cwd"]["hash"], common::hash(&connector, "/"));
    assert!(body["cwd"].get("phash").is_none());
    assert_eq!(body["netDrivers"], serde_json::json!([]));
    assert_eq!(body["uplMaxSize"], "32M");
    assert_eq!(body["options"]["separator"], "/");

    let mut names = common::names(&body["files"]);
    names.sort();
    assert_eq!(names, vec!["Media", "docs", "notes.txt"]);
}

#[test]
fn test_open_without_target_or_init_fails() {
    let (connector, _dir) = common::setup_connector();
    let body = common::run(&connector, Params::new().with("cmd", "open"));
    assert_eq!(common::errors(&body), vec!["errFileNotFound"]);
}

#[test]
fn test_open_subdirectory_with_tree() {
    let (connector, _dir) = common::setup_connector();
    let docs = common::hash(&connector, "/docs");

    let body = common::run(
        &connector,
        Params::new().with("cmd", "open").with("target", docs.clone()),
    );
    assert_eq!(common::names(&body["files"]), vec!["a.txt", "sub"]);
    assert_eq!(body["cwd"]["phash"], common::hash(&connector, "/"));
    assert_eq!(body["cwd"]["dirs"], 1);

    let body = common::run(
        &connector,
        Params::new()
            .with("cmd", "open")
            .with("target", docs)
            .with("tree", "1"),
    );
    assert_eq!(
        common::names(&body["files"]),
        vec!["a.txt", "sub", "Media", "docs"]
    );
}

#[test]
fn test_open_lists_every_volume_root() {
    let (connector, _first, _second) = common::setup_two_volumes();
    let body = common::run(
        &connector,
        Params::new().with("cmd", "open").with("init", "true"),
    );
    assert_eq!(body["cwd"]["name"], "First");
    assert_eq!(
        common::names(&body["files"]),
        vec!["one.txt", "First", "two.txt", "Second"]
    );
}

#[test]
fn test_hidden_files_are_not_listed() {
    let (connector, dir) = common::setup_connector();
    fs::write(dir.path().join("docs/.secret"), b"").unwrap();
    let body = common::run(
        &connector,
        Params::new()
            .with("cmd", "open")
            .with("target", common::hash(&connector, "/docs")),
    );
    assert!(!common::names(&body["files"]).contains(&".secret".to_string()));
}

#[test]
fn test_tree_is_recursive() {
    let (connector, _dir) = common::setup_connector();
    let body = common::run(
        &connector,
        Params::new()
            .with("cmd", "tree")
            .with("target", common::hash(&connector, "/docs")),
    );
    assert_eq!(
        common::names(&body["tree"]),
        vec!["docs", "a.txt", "sub", "b.txt"]
    );
}

#[test]
fn test_parents_walks_to_root() {
    let (connector, _dir) = common::setup_connector();
    let body = common::run(
        &connector,
        Params::new()
            .with("cmd", "parents")
            .with("target", common::hash(&connector, "/docs/sub")),
    );
    let mut names = common::names(&body["tree"]);
    names.sort();
    assert_eq!(
        names,
        vec!["Media", "a.txt", "b.txt", "docs", "notes.txt", "sub"]
    );
}

#[test]
fn test_listing_empty_directory_is_repeatable() {
    let (connector, dir) = common::setup_connector();
    fs::create_dir(dir.path().join("empty")).unwrap();
    let empty = common::node(&connector, "Media", "/empty");

    for _ in 0..2 {
        let listed = connector.filesystem().list(&empty, false).unwrap();
        assert!(listed.is_empty());
    }

    for _ in 0..2 {
        let body = common::run(
            &connector,
            Params::new()
                .with("cmd", "open")
                .with("target", empty.hash()),
        );
        assert!(body.get("error").is_none());
        assert_eq!(body["cwd"]["name"], "empty");
        assert!(body["files"].as_array().unwrap().is_empty());
    }
}
