//! Integration tests for search

mod common;

use std::fs;

use ::common::connector::Params;

#[test]
fn test_search_matches_substrings_across_volumes() {
    let (connector, first, second) = common::setup_two_volumes();
    fs::create_dir(first.path().join("nested")).unwrap();
    fs::write(first.path().join("nested/done.txt"), b"").unwrap();
    fs::write(second.path().join(".one-hidden"), b"").unwrap();

    let body = common::run(
        &connector,
        Params::new().with("cmd", "search").with("q", "one"),
    );
    let mut names = common::names(&body["files"]);
    names.sort();
    assert_eq!(names, vec!["done.txt", "one.txt"]);
}

#[test]
fn test_search_is_case_sensitive_and_skips_roots() {
    let (connector, _dir) = common::setup_connector();
    let body = common::run(
        &connector,
        Params::new().with("cmd", "search").with("q", "Media"),
    );
    assert_eq!(body["files"], serde_json::json!([]));

    let body = common::run(
        &connector,
        Params::new().with("cmd", "search").with("q", "TXT"),
    );
    assert_eq!(body["files"], serde_json::json!([]));
}

#[test]
fn test_empty_query_is_rejected() {
    let (connector, _dir) = common::setup_connector();
    let body = common::run(
        &connector,
        Params::new().with("cmd", "search").with("q", ""),
    );
    assert_eq!(common::errors(&body), vec!["errCmdParams"]);
}
