//! Integration tests for path containment across every entry point

mod common;

use std::fs;

use ::common::connector::Params;
use ::common::hash::NodeHash;

#[test]
fn test_traversal_hashes_stay_inside_volume() {
    let (connector, dir) = common::setup_connector();
    let outside = dir.path().parent().unwrap().join("elfinder-outside.txt");

    for path in ["/../elfinder-outside.txt", "../../../../etc", "/docs/../../.."] {
        let token = NodeHash::new("Media", path).to_string();
        let body = common::run(
            &connector,
            Params::new()
                .with("cmd", "mkfile")
                .with("target", token)
                .with("name", "created.txt"),
        );
        // the path clamps to a directory inside the volume or fails to exist
        if body.get("added").is_some() {
            let added = body["added"][0]["hash"].as_str().unwrap();
            let parsed = NodeHash::parse(added).unwrap();
            assert_eq!(parsed.root, "Media");
            assert!(dir.path().join(parsed.path.trim_start_matches('/')).exists());
            fs::remove_file(dir.path().join(parsed.path.trim_start_matches('/'))).unwrap();
        } else {
            assert!(!common::errors(&body).is_empty());
        }
    }
    assert!(!outside.exists());
}

#[test]
fn test_names_cannot_escape() {
    let (connector, _dir) = common::setup_connector();
    let docs = common::hash(&connector, "/docs");
    for name in ["../escape.txt", "..", "a/b", "a\\b"] {
        let body = common::run(
            &connector,
            Params::new()
                .with("cmd", "mkdir")
                .with("target", docs.clone())
                .with("name", name),
        );
        assert_eq!(common::errors(&body), vec!["errInvName"], "name {name:?}");
    }
}

#[cfg(unix)]
#[test]
fn test_symlink_out_of_volume_is_not_found() {
    let (connector, dir) = common::setup_connector();
    let outside = tempfile::TempDir::new().unwrap();
    fs::write(outside.path().join("secret.txt"), b"secret").unwrap();
    std::os::unix::fs::symlink(outside.path(), dir.path().join("link")).unwrap();

    let token = common::hash(&connector, "/link/secret.txt");
    let body = common::run(
        &connector,
        Params::new().with("cmd", "get").with("target", token),
    );
    assert_eq!(common::errors(&body), vec!["errFileNotFound"]);

    // symlinks never show up in listings
    let body = common::run(
        &connector,
        Params::new()
            .with("cmd", "open")
            .with("target", common::hash(&connector, "/")),
    );
    assert!(!common::names(&body["files"]).contains(&"link".to_string()));
}

#[test]
fn test_unknown_volume_is_not_found() {
    let (connector, _dir) = common::setup_connector();
    let token = NodeHash::new("Elsewhere", "/").to_string();
    let body = common::run(
        &connector,
        Params::new().with("cmd", "tree").with("target", token),
    );
    assert_eq!(common::errors(&body), vec!["errFileNotFound"]);
}
