//! Integration tests for command validation

mod common;

use ::common::connector::Params;

#[test]
fn test_unknown_command() {
    let (connector, _dir) = common::setup_connector();
    for params in [
        Params::new(),
        Params::new().with("cmd", "archive"),
        Params::new().with("cmd", "OPEN"),
    ] {
        let body = common::run(&connector, params);
        assert_eq!(common::errors(&body), vec!["errUnknownCmd"]);
    }
}

#[test]
fn test_violations_are_collected() {
    let (connector, _dir) = common::setup_connector();
    let body = common::run(
        &connector,
        Params::new()
            .with("cmd", "resize")
            .with("target", "not-a-hash")
            .with("width", "wide")
            .with("mode", "spin"),
    );
    assert_eq!(
        common::errors(&body),
        vec!["errFileNotFound", "errCmdParams", "errResize"]
    );
}

#[test]
fn test_missing_required_params() {
    let (connector, _dir) = common::setup_connector();
    let body = common::run(&connector, Params::new().with("cmd", "mkdir"));
    assert_eq!(common::errors(&body), vec!["errCmdParams"]);

    let body = common::run(
        &connector,
        Params::new()
            .with("cmd", "paste")
            .with("dst", common::hash(&connector, "/docs")),
    );
    assert_eq!(common::errors(&body), vec!["errCmdParams"]);
}

#[test]
fn test_bad_boolean() {
    let (connector, _dir) = common::setup_connector();
    let body = common::run(
        &connector,
        Params::new()
            .with("cmd", "file")
            .with("target", common::hash(&connector, "/notes.txt"))
            .with("download", "perhaps"),
    );
    assert_eq!(common::errors(&body), vec!["errCmdParams"]);
}
