use std::fmt;
use std::io;

use serde::{Deserialize, Serialize};

use crate::fs::FsError;
use crate::node::image::ImagingError;
use crate::node::NodeError;

/// Error codes understood by the client; these are the only error detail
/// that leaves the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    #[serde(rename = "errUnknownCmd")]
    UnknownCommand,
    #[serde(rename = "errCmdParams")]
    ValidationFailed,
    #[serde(rename = "errFileNotFound")]
    NotFound,
    #[serde(rename = "errPerm")]
    PermissionDenied,
    #[serde(rename = "errResize")]
    InvalidResizeMode,
    #[serde(rename = "errExists")]
    Exists,
    #[serde(rename = "errInvName")]
    InvalidName,
    #[serde(rename = "errUnknown")]
    Unknown,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnknownCommand => "errUnknownCmd",
            Self::ValidationFailed => "errCmdParams",
            Self::NotFound => "errFileNotFound",
            Self::PermissionDenied => "errPerm",
            Self::InvalidResizeMode => "errResize",
            Self::Exists => "errExists",
            Self::InvalidName => "errInvName",
            Self::Unknown => "errUnknown",
        }
    }

    fn from_io(err: &io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::NotFound => Self::NotFound,
            io::ErrorKind::PermissionDenied => Self::PermissionDenied,
            io::ErrorKind::AlreadyExists => Self::Exists,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&FsError> for ErrorCode {
    fn from(err: &FsError) -> Self {
        match err {
            FsError::NotFound(_) | FsError::Volume(_) => Self::NotFound,
            FsError::PermissionDenied(_) | FsError::RootNotAllowed(_) => Self::PermissionDenied,
            FsError::AlreadyExists(_) => Self::Exists,
            FsError::InvalidName(_) => Self::InvalidName,
            FsError::NotADirectory(_) | FsError::NotAFile(_) | FsError::CopyIntoSelf(_) => {
                Self::ValidationFailed
            }
            FsError::Imaging(ImagingError::Volume(_)) => Self::NotFound,
            FsError::Imaging(ImagingError::Io(err)) => match Self::from_io(err) {
                Self::Unknown => Self::InvalidResizeMode,
                code => code,
            },
            FsError::Imaging(_) => Self::InvalidResizeMode,
            FsError::Io { source, .. } => Self::from_io(source),
        }
    }
}

impl From<&NodeError> for ErrorCode {
    fn from(err: &NodeError) -> Self {
        match err {
            NodeError::Decode(_) | NodeError::Volume(_) => Self::NotFound,
            NodeError::Io(err) => Self::from_io(err),
        }
    }
}

/// One rejected parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub field: &'static str,
    pub code: ErrorCode,
    pub reason: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} ({})", self.field, self.reason, self.code)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConnectorError {
    #[error("unknown command: {0:?}")]
    UnknownCommand(Option<String>),
    #[error("invalid parameters: {}", format_violations(.0))]
    Invalid(Vec<Violation>),
    #[error(transparent)]
    Fs(#[from] FsError),
    #[error("every target failed: {0:?}")]
    Batch(Vec<ErrorCode>),
}

fn format_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(Violation::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ConnectorError {
    /// Client-facing codes, de-duplicated in order of first occurrence.
    pub fn codes(&self) -> Vec<ErrorCode> {
        let codes: Vec<ErrorCode> = match self {
            Self::UnknownCommand(_) => vec![ErrorCode::UnknownCommand],
            Self::Invalid(violations) => violations.iter().map(|v| v.code).collect(),
            Self::Fs(err) => vec![ErrorCode::from(err)],
            Self::Batch(codes) => codes.clone(),
        };
        dedup(codes)
    }
}

pub(crate) fn dedup(codes: Vec<ErrorCode>) -> Vec<ErrorCode> {
    let mut unique = Vec::with_capacity(codes.len());
    for code in codes {
        if !unique.contains(&code) {
            unique.push(code);
        }
    }
    unique
}
