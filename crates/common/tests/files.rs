//! Integration tests for file, get, put, mkfile, rename and upload

mod common;

use std::fs;

use ::common::connector::{FileResponse, Params, Response, UploadedFile};

#[test]
fn test_get_and_put() {
    let (connector, dir) = common::setup_connector();
    let target = common::hash(&connector, "/docs/a.txt");

    let body = common::run(
        &connector,
        Params::new().with("cmd", "get").with("target", target.clone()),
    );
    assert_eq!(body["content"], "alpha");

    let body = common::run(
        &connector,
        Params::new()
            .with("cmd", "put")
            .with("target", target.clone())
            .with("content", "omega"),
    );
    assert_eq!(body["changed"][0]["hash"], target);
    assert_eq!(body["changed"][0]["size"], 5);
    assert_eq!(fs::read(dir.path().join("docs/a.txt")).unwrap(), b"omega");
}

#[test]
fn test_get_directory_is_rejected() {
    let (connector, _dir) = common::setup_connector();
    let body = common::run(
        &connector,
        Params::new()
            .with("cmd", "get")
            .with("target", common::hash(&connector, "/docs")),
    );
    assert_eq!(common::errors(&body), vec!["errCmdParams"]);
}

#[test]
fn test_file_download_and_redirect() {
    let (connector, dir) = common::setup_connector();
    fs::write(dir.path().join("docs/with space.txt"), b"spaced").unwrap();
    let target = common::hash(&connector, "/docs/with space.txt");

    match common::dispatch(
        &connector,
        Params::new()
            .with("cmd", "file")
            .with("target", target.clone())
            .with("download", "1"),
    ) {
        Response::File(FileResponse::Download {
            name,
            mime,
            content,
        }) => {
            assert_eq!(name, "with space.txt");
            assert_eq!(mime, "text/plain");
            assert_eq!(content, b"spaced");
        }
        other => panic!("unexpected response {other:?}"),
    }

    match common::dispatch(
        &connector,
        Params::new().with("cmd", "file").with("target", target),
    ) {
        Response::File(FileResponse::Redirect { location }) => {
            assert_eq!(location, "/media/docs/with%20space.txt");
        }
        other => panic!("unexpected response {other:?}"),
    }
}

#[test]
fn test_mkfile_and_rename() {
    let (connector, dir) = common::setup_connector();
    let docs = common::hash(&connector, "/docs");

    let body = common::run(
        &connector,
        Params::new()
            .with("cmd", "mkfile")
            .with("target", docs.clone())
            .with("name", "empty.txt"),
    );
    let created = body["added"][0]["hash"].as_str().unwrap().to_string();
    assert_eq!(body["added"][0]["size"], 0);

    let body = common::run(
        &connector,
        Params::new()
            .with("cmd", "mkfile")
            .with("target", docs)
            .with("name", "empty.txt"),
    );
    assert_eq!(common::errors(&body), vec!["errExists"]);

    let body = common::run(
        &connector,
        Params::new()
            .with("cmd", "rename")
            .with("target", created.clone())
            .with("name", "full.txt"),
    );
    assert_eq!(common::names(&body["added"]), vec!["full.txt"]);
    assert_eq!(body["removed"], serde_json::json!([created]));
    assert!(dir.path().join("docs/full.txt").exists());

    let body = common::run(
        &connector,
        Params::new()
            .with("cmd", "rename")
            .with("target", common::hash(&connector, "/docs/full.txt"))
            .with("name", "a.txt"),
    );
    assert_eq!(common::errors(&body), vec!["errExists"]);
}

#[test]
fn test_upload_batch() {
    let (connector, dir) = common::setup_connector();
    let mut params = Params::new()
        .with("cmd", "upload")
        .with("target", common::hash(&connector, "/docs"));
    params.add_file(UploadedFile::new("new.bin", vec![1u8, 2, 3]));
    params.add_file(UploadedFile::new("a.txt", b"clobber".to_vec()));

    let body = common::run(&connector, params);
    assert_eq!(common::names(&body["added"]), vec!["new.bin"]);
    assert_eq!(body["warning"], serde_json::json!(["errExists"]));
    assert_eq!(fs::read(dir.path().join("docs/new.bin")).unwrap(), [1, 2, 3]);
    assert_eq!(fs::read(dir.path().join("docs/a.txt")).unwrap(), b"alpha");
}

#[test]
fn test_ping() {
    let (connector, _dir) = common::setup_connector();
    assert!(matches!(
        common::dispatch(&connector, Params::new().with("cmd", "ping")),
        Response::Ping
    ));
}
