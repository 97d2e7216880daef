//! Typed commands and their parameter validation.

use std::fmt;
use std::str::FromStr;

use super::error::{ConnectorError, ErrorCode, Violation};
use super::params::{parse_bool, Params, UploadedFile};
use crate::node::image::ResizeMode;
use crate::node::Node;
use crate::volume::VolumeRegistry;

/// Longest accepted free-text argument (`name`, `q`).
pub const MAX_TEXT_LEN: usize = 4096;

macro_rules! verbs {
    ($($variant:ident => $name:literal),+ $(,)?) => {
        /// Command verbs of the protocol.
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum Verb {
            $($variant),+
        }

        impl Verb {
            pub const ALL: &'static [Verb] = &[$(Verb::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Verb::$variant => $name),+
                }
            }
        }

        impl FromStr for Verb {
            type Err = ConnectorError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($name => Ok(Verb::$variant),)+
                    other => Err(ConnectorError::UnknownCommand(Some(other.to_string()))),
                }
            }
        }
    };
}

verbs! {
    Open => "open",
    File => "file",
    Tree => "tree",
    Parents => "parents",
    Get => "get",
    Mkdir => "mkdir",
    Mkfile => "mkfile",
    Rename => "rename",
    Put => "put",
    Rm => "rm",
    Duplicate => "duplicate",
    Paste => "paste",
    Search => "search",
    Resize => "resize",
    Upload => "upload",
    Ping => "ping",
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub enum Command {
    Open {
        target: Option<Node>,
        init: bool,
        tree: bool,
    },
    File {
        target: Node,
        download: bool,
    },
    Tree {
        target: Node,
    },
    Parents {
        target: Node,
    },
    Get {
        target: Node,
    },
    Mkdir {
        target: Node,
        name: String,
    },
    Mkfile {
        target: Node,
        name: String,
    },
    Rename {
        target: Node,
        name: String,
    },
    Put {
        target: Node,
        content: String,
    },
    Rm {
        targets: Vec<Node>,
    },
    Duplicate {
        targets: Vec<Node>,
    },
    Paste {
        targets: Vec<Node>,
        dst: Node,
        cut: bool,
    },
    Search {
        q: String,
    },
    Resize {
        target: Node,
        width: u32,
        height: u32,
        x: u32,
        y: u32,
        mode: ResizeMode,
    },
    Upload {
        target: Node,
        files: Vec<UploadedFile>,
    },
    Ping,
}

impl Command {
    /// Validate a parameter map into a command. Every violation is
    /// collected before failing.
    pub fn parse(registry: &VolumeRegistry, mut params: Params) -> Result<Self, ConnectorError> {
        let verb: Verb = params
            .get("cmd")
            .ok_or(ConnectorError::UnknownCommand(None))?
            .parse()?;

        let files = params.take_files();
        let mut v = Validator::new(registry, &params);
        let command = match verb {
            Verb::Open => {
                let init = v.flag("init");
                let tree = v.flag("tree");
                let target = v.optional_target("target");
                if target.is_none() && !init && !v.has_violation("target") {
                    v.reject("target", ErrorCode::NotFound, "no target and not init");
                }
                Some(Command::Open { target, init, tree })
            }
            Verb::File => {
                let target = v.target("target");
                let download = v.flag("download");
                target.map(|target| Command::File { target, download })
            }
            Verb::Tree => v.target("target").map(|target| Command::Tree { target }),
            Verb::Parents => v.target("target").map(|target| Command::Parents { target }),
            Verb::Get => v.target("target").map(|target| Command::Get { target }),
            Verb::Mkdir | Verb::Mkfile | Verb::Rename => {
                let target = v.target("target");
                let name = v.text("name");
                match (target, name) {
                    (Some(target), Some(name)) => Some(match verb {
                        Verb::Mkdir => Command::Mkdir { target, name },
                        Verb::Mkfile => Command::Mkfile { target, name },
                        _ => Command::Rename { target, name },
                    }),
                    _ => None,
                }
            }
            Verb::Put => {
                let target = v.target("target");
                let content = v.raw("content");
                match (target, content) {
                    (Some(target), Some(content)) => Some(Command::Put { target, content }),
                    _ => None,
                }
            }
            Verb::Rm => v.targets("targets").map(|targets| Command::Rm { targets }),
            Verb::Duplicate => v
                .targets("targets")
                .map(|targets| Command::Duplicate { targets }),
            Verb::Paste => {
                let targets = v.targets("targets");
                let dst = v.target("dst");
                let cut = v.flag("cut");
                match (targets, dst) {
                    (Some(targets), Some(dst)) => Some(Command::Paste { targets, dst, cut }),
                    _ => None,
                }
            }
            Verb::Search => v.text("q").map(|q| Command::Search { q }),
            Verb::Resize => {
                let target = v.target("target");
                let width = v.dimension("width");
                let height = v.dimension("height");
                let x = v.offset("x");
                let y = v.offset("y");
                let mode = v.mode("mode");
                match (target, width, height, x, y, mode) {
                    (Some(target), Some(width), Some(height), Some(x), Some(y), Some(mode)) => {
                        Some(Command::Resize {
                            target,
                            width,
                            height,
                            x,
                            y,
                            mode,
                        })
                    }
                    _ => None,
                }
            }
            Verb::Upload => {
                let target = v.target("target");
                if files.is_empty() {
                    v.reject("upload[]", ErrorCode::ValidationFailed, "no files");
                }
                target.map(|target| Command::Upload { target, files })
            }
            Verb::Ping => Some(Command::Ping),
        };

        match (command, v.finish()) {
            (Some(command), Ok(())) => Ok(command),
            (_, Err(err)) => Err(err),
            (None, Ok(())) => Err(ConnectorError::Invalid(vec![Violation {
                field: "cmd",
                code: ErrorCode::ValidationFailed,
                reason: format!("incomplete {verb} command"),
            }])),
        }
    }

    pub fn verb(&self) -> Verb {
        match self {
            Command::Open { .. } => Verb::Open,
            Command::File { .. } => Verb::File,
            Command::Tree { .. } => Verb::Tree,
            Command::Parents { .. } => Verb::Parents,
            Command::Get { .. } => Verb::Get,
            Command::Mkdir { .. } => Verb::Mkdir,
            Command::Mkfile { .. } => Verb::Mkfile,
            Command::Rename { .. } => Verb::Rename,
            Command::Put { .. } => Verb::Put,
            Command::Rm { .. } => Verb::Rm,
            Command::Duplicate { .. } => Verb::Duplicate,
            Command::Paste { .. } => Verb::Paste,
            Command::Search { .. } => Verb::Search,
            Command::Resize { .. } => Verb::Resize,
            Command::Upload { .. } => Verb::Upload,
            Command::Ping => Verb::Ping,
        }
    }
}

/// Accumulates violations while extracting typed values.
struct Validator<'a> {
    registry: &'a VolumeRegistry,
    params: &'a Params,
    violations: Vec<Violation>,
}

impl<'a> Validator<'a> {
    fn new(registry: &'a VolumeRegistry, params: &'a Params) -> Self {
        Self {
            registry,
            params,
            violations: Vec::new(),
        }
    }

    fn param(&self, field: &str) -> Option<&'a str> {
        let params: &'a Params = self.params;
        params.get(field)
    }

    fn reject(&mut self, field: &'static str, code: ErrorCode, reason: impl Into<String>) {
        self.violations.push(Violation {
            field,
            code,
            reason: reason.into(),
        });
    }

    fn has_violation(&self, field: &str) -> bool {
        self.violations.iter().any(|v| v.field == field)
    }

    fn finish(self) -> Result<(), ConnectorError> {
        if self.violations.is_empty() {
            Ok(())
        } else {
            Err(ConnectorError::Invalid(self.violations))
        }
    }

    fn decode(&mut self, field: &'static str, hash: &str) -> Option<Node> {
        match Node::from_hash(self.registry, hash) {
            Ok(node) => Some(node),
            Err(err) => {
                self.reject(field, ErrorCode::from(&err), err.to_string());
                None
            }
        }
    }

    /// Decoded hash of an existing node.
    fn target(&mut self, field: &'static str) -> Option<Node> {
        match self.param(field).filter(|h| !h.is_empty()) {
            Some(hash) => self.existing(field, hash),
            None => {
                self.reject(field, ErrorCode::ValidationFailed, "required");
                None
            }
        }
    }

    fn optional_target(&mut self, field: &'static str) -> Option<Node> {
        let hash = self.param(field).filter(|h| !h.is_empty())?;
        self.existing(field, hash)
    }

    fn existing(&mut self, field: &'static str, hash: &str) -> Option<Node> {
        let node = self.decode(field, hash)?;
        if node.exists() {
            Some(node)
        } else {
            self.reject(field, ErrorCode::NotFound, format!("{node} does not exist"));
            None
        }
    }

    /// Non-empty list of decodable hashes. Existence is left to the
    /// operation so batches can fail per target.
    fn targets(&mut self, field: &'static str) -> Option<Vec<Node>> {
        let params = self.params;
        let hashes = params.get_list(field);
        if hashes.is_empty() {
            self.reject(field, ErrorCode::ValidationFailed, "at least one target required");
            return None;
        }
        let nodes: Vec<Option<Node>> = hashes.iter().map(|h| self.decode(field, h)).collect();
        nodes.into_iter().collect()
    }

    fn raw(&mut self, field: &'static str) -> Option<String> {
        match self.param(field) {
            Some(value) => Some(value.to_string()),
            None => {
                self.reject(field, ErrorCode::ValidationFailed, "required");
                None
            }
        }
    }

    fn text(&mut self, field: &'static str) -> Option<String> {
        let value = self.raw(field)?;
        if value.is_empty() {
            self.reject(field, ErrorCode::ValidationFailed, "must not be empty");
            None
        } else if value.len() > MAX_TEXT_LEN {
            self.reject(field, ErrorCode::ValidationFailed, "too long");
            None
        } else {
            Some(value)
        }
    }

    fn flag(&mut self, field: &'static str) -> bool {
        let Some(value) = self.param(field) else {
            return false;
        };
        match parse_bool(value) {
            Some(flag) => flag,
            None => {
                self.reject(field, ErrorCode::ValidationFailed, format!("not a boolean: {value}"));
                false
            }
        }
    }

    fn integer(&mut self, field: &'static str, default: Option<u32>) -> Option<u32> {
        match (self.param(field), default) {
            (Some(value), _) => match value.trim().parse::<u32>() {
                Ok(n) => Some(n),
                Err(_) => {
                    self.reject(
                        field,
                        ErrorCode::ValidationFailed,
                        format!("not a non-negative integer: {value}"),
                    );
                    None
                }
            },
            (None, Some(default)) => Some(default),
            (None, None) => {
                self.reject(field, ErrorCode::ValidationFailed, "required");
                None
            }
        }
    }

    fn dimension(&mut self, field: &'static str) -> Option<u32> {
        let value = self.integer(field, None)?;
        if value == 0 {
            self.reject(field, ErrorCode::ValidationFailed, "must be positive");
            None
        } else {
            Some(value)
        }
    }

    fn offset(&mut self, field: &'static str) -> Option<u32> {
        self.integer(field, Some(0))
    }

    fn mode(&mut self, field: &'static str) -> Option<ResizeMode> {
        let Some(value) = self.param(field) else {
            self.reject(field, ErrorCode::ValidationFailed, "required");
            return None;
        };
        match value.parse() {
            Ok(mode) => Some(mode),
            Err(err) => {
                self.reject(field, ErrorCode::InvalidResizeMode, err.to_string());
                None
            }
        }
    }
}
