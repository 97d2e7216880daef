use serde::Serialize;

use super::error::ErrorCode;
use crate::node::NodeInfo;

/// Protocol revision reported by `open`.
pub const API_VERSION: &str = "2.0";

/// Result of a command. All variants except [`Response::File`] and
/// [`Response::Ping`] are JSON bodies with exactly one key set.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Response {
    Open(Box<OpenPayload>),
    Files {
        files: Vec<NodeInfo>,
    },
    Tree {
        tree: Vec<NodeInfo>,
    },
    AddedRemoved {
        added: Vec<NodeInfo>,
        removed: Vec<String>,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        warning: Vec<ErrorCode>,
    },
    Added {
        added: Vec<NodeInfo>,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        warning: Vec<ErrorCode>,
    },
    Removed {
        removed: Vec<String>,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        warning: Vec<ErrorCode>,
    },
    Changed {
        changed: Vec<NodeInfo>,
    },
    Content {
        content: String,
    },
    Error {
        error: Vec<ErrorCode>,
    },
    #[serde(skip_serializing)]
    File(FileResponse),
    #[serde(skip_serializing)]
    Ping,
}

impl Response {
    pub fn error(codes: Vec<ErrorCode>) -> Self {
        Self::Error { error: codes }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    /// Whether this response is sent as a JSON document.
    pub fn is_json(&self) -> bool {
        !matches!(self, Self::File(_) | Self::Ping)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OpenPayload {
    pub api: String,
    pub cwd: NodeInfo,
    pub files: Vec<NodeInfo>,
    #[serde(rename = "netDrivers")]
    pub net_drivers: Vec<String>,
    #[serde(rename = "uplMaxSize")]
    pub upl_max_size: String,
    pub options: VolumeOptions,
}

/// Per-volume client options sent alongside `cwd`.
#[derive(Debug, Clone, Serialize)]
pub struct VolumeOptions {
    /// Display path of the cwd, volume id first
    pub path: String,
    pub url: String,
    #[serde(rename = "tmbUrl")]
    pub tmb_url: String,
    pub separator: String,
    pub disabled: Vec<String>,
    #[serde(rename = "copyOverwrite")]
    pub copy_overwrite: u8,
    pub archivers: Archivers,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Archivers {
    pub create: Vec<String>,
    pub extract: Vec<String>,
}

/// `file` command result: the bytes themselves or where to fetch them.
#[derive(Clone, PartialEq, Eq)]
pub enum FileResponse {
    Download {
        name: String,
        mime: String,
        content: Vec<u8>,
    },
    Redirect {
        location: String,
    },
}

impl std::fmt::Debug for FileResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Download { name, mime, content } => f
                .debug_struct("Download")
                .field("name", name)
                .field("mime", mime)
                .field("len", &content.len())
                .finish(),
            Self::Redirect { location } => f
                .debug_struct("Redirect")
                .field("location", location)
                .finish(),
        }
    }
}
