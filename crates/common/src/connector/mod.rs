//! Command dispatcher: parameters in, protocol response out.

pub mod command;
pub mod error;
pub mod params;
pub mod response;

use std::collections::HashSet;
use std::sync::Arc;

use crate::fs::{FsError, Filesystem};
use crate::node::Node;
use crate::volume::VolumeRegistry;

pub use command::{Command, Verb};
pub use error::{ConnectorError, ErrorCode, Violation};
pub use params::{Params, UploadedFile};
pub use response::{FileResponse, OpenPayload, Response, VolumeOptions};

use response::{Archivers, API_VERSION};

pub const DEFAULT_UPLOAD_MAX_SIZE: &str = "32M";

#[derive(Debug, Clone)]
pub struct ConnectorOptions {
    /// Advertised to the client as `uplMaxSize`
    pub upload_max_size: String,
    /// Commands the client should hide
    pub disabled: Vec<String>,
}

impl Default for ConnectorOptions {
    fn default() -> Self {
        Self {
            upload_max_size: DEFAULT_UPLOAD_MAX_SIZE.to_string(),
            disabled: Vec::new(),
        }
    }
}

pub struct Connector {
    fs: Filesystem,
    options: ConnectorOptions,
}

impl Connector {
    pub fn new(registry: Arc<VolumeRegistry>) -> Self {
        Self::with_options(registry, ConnectorOptions::default())
    }

    pub fn with_options(registry: Arc<VolumeRegistry>, options: ConnectorOptions) -> Self {
        Self {
            fs: Filesystem::new(registry),
            options,
        }
    }

    pub fn registry(&self) -> &Arc<VolumeRegistry> {
        self.fs.registry()
    }

    pub fn filesystem(&self) -> &Filesystem {
        &self.fs
    }

    /// Validate and run one request. Failures become an `error` response;
    /// their detail is only logged.
    pub fn dispatch(&self, params: Params) -> Response {
        let cmd = params.get("cmd").unwrap_or_default().to_string();
        let result = Command::parse(self.registry(), params).and_then(|command| {
            tracing::debug!(cmd = %command.verb(), "dispatching command");
            self.execute(command)
        });

        match result {
            Ok(response) => response,
            Err(err) => {
                match &err {
                    ConnectorError::Fs(FsError::Io { .. }) => {
                        tracing::error!(%cmd, error = %err, "command failed")
                    }
                    _ => tracing::info!(%cmd, error = %err, "command rejected"),
                }
                Response::error(err.codes())
            }
        }
    }

    pub fn execute(&self, command: Command) -> Result<Response, ConnectorError> {
        let fs = &self.fs;
        let response = match command {
            Command::Open { target, tree, .. } => {
                let cwd = match target {
                    Some(target) => target,
                    None => Node::root(self.registry().default_volume()),
                };
                self.open(cwd, tree)?
            }
            Command::File { target, download } => {
                let file = if download {
                    FileResponse::Download {
                        name: target.name().to_string(),
                        mime: target.mime(),
                        content: fs.read(&target)?,
                    }
                } else {
                    FileResponse::Redirect {
                        location: target.url(),
                    }
                };
                Response::File(file)
            }
            Command::Tree { target } => Response::Tree {
                tree: fs.describe(&fs.list(&target, true)?),
            },
            Command::Parents { target } => Response::Tree {
                tree: fs.describe(&self.parents(&target)?),
            },
            Command::Get { target } => Response::Content {
                content: String::from_utf8_lossy(&fs.read(&target)?).into_owned(),
            },
            Command::Mkdir { target, name } => Response::Added {
                added: fs.describe(&[fs.mkdir(&target, &name)?]),
                warning: Vec::new(),
            },
            Command::Mkfile { target, name } => Response::Added {
                added: fs.describe(&[fs.mkfile(&target, &name)?]),
                warning: Vec::new(),
            },
            Command::Rename { target, name } => {
                let renamed = fs.rename(&target, &name)?;
                Response::AddedRemoved {
                    added: fs.describe(&[renamed]),
                    removed: vec![target.hash()],
                    warning: Vec::new(),
                }
            }
            Command::Put { target, content } => Response::Changed {
                changed: fs.describe(&[fs.write(&target, content.as_bytes())?]),
            },
            Command::Rm { targets } => {
                let (removed, warning) = batch(&targets, |node| {
                    fs.delete(node)?;
                    Ok(node.hash())
                })?;
                Response::Removed { removed, warning }
            }
            Command::Duplicate { targets } => {
                let (added, warning) = batch(&targets, |node| fs.duplicate(node))?;
                Response::Added {
                    added: fs.describe(&added),
                    warning,
                }
            }
            Command::Paste { targets, dst, cut } => {
                let (pasted, warning) = batch(&targets, |node| {
                    let copy = fs.copy(node, &dst, cut)?;
                    Ok((copy, node.hash()))
                })?;
                let (added, removed): (Vec<Node>, Vec<String>) = pasted.into_iter().unzip();
                Response::AddedRemoved {
                    added: fs.describe(&added),
                    removed: if cut { removed } else { Vec::new() },
                    warning,
                }
            }
            Command::Search { q } => Response::Files {
                files: fs.describe(&fs.search(&q)),
            },
            Command::Resize {
                target,
                width,
                height,
                x,
                y,
                mode,
            } => Response::Changed {
                changed: fs.describe(&[fs.resize(&target, width, height, x, y, mode)?]),
            },
            Command::Upload { target, files } => {
                let (added, warning) = batch(&files, |file| {
                    fs.upload(&target, &file.name, &file.content)
                })?;
                Response::Added {
                    added: fs.describe(&added),
                    warning,
                }
            }
            Command::Ping => Response::Ping,
        };
        Ok(response)
    }

    /// `cwd` plus its listing. Opening a volume root lists every volume
    /// root with its children; with `tree` the roots and the cwd are added
    /// to any other listing.
    fn open(&self, cwd: Node, tree: bool) -> Result<Response, ConnectorError> {
        let fs = &self.fs;
        let mut nodes = Vec::new();
        if cwd.is_root() {
            for volume in self.registry().list() {
                let root = Node::root(volume);
                nodes.extend(fs.list(&root, false)?);
                nodes.push(root);
            }
        } else {
            nodes.extend(fs.list(&cwd, false)?);
            if tree {
                nodes.extend(self.registry().list().iter().map(Node::root));
                nodes.push(cwd.clone());
            }
        }

        let cwd_info = fs.info(&cwd)?;
        let volume = cwd.volume();
        let options = VolumeOptions {
            path: format!("{}{}", volume.id(), cwd.path().trim_end_matches('/')),
            url: volume.url().to_string(),
            tmb_url: volume.thumbnails_url(),
            separator: "/".to_string(),
            disabled: self.options.disabled.clone(),
            copy_overwrite: 0,
            archivers: Archivers::default(),
        };

        Ok(Response::Open(Box::new(OpenPayload {
            api: API_VERSION.to_string(),
            cwd: cwd_info,
            files: fs.describe(&unique(nodes)),
            net_drivers: Vec::new(),
            upl_max_size: self.options.upload_max_size.clone(),
            options,
        })))
    }

    /// Every ancestor up to the volume root, each with its children.
    fn parents(&self, target: &Node) -> Result<Vec<Node>, ConnectorError> {
        let mut nodes = Vec::new();
        let mut current = Some(target.clone());
        while let Some(node) = current {
            if node.is_dir() {
                nodes.extend(self.fs.list(&node, false)?);
            }
            current = node.parent();
            nodes.push(node);
        }
        Ok(unique(nodes))
    }
}

/// Run `op` for each item. Failures are logged and reported as warnings;
/// only when nothing succeeded is the batch an error.
fn batch<I, T>(
    items: &[I],
    mut op: impl FnMut(&I) -> Result<T, FsError>,
) -> Result<(Vec<T>, Vec<ErrorCode>), ConnectorError>
where
    I: std::fmt::Debug,
{
    let mut done = Vec::with_capacity(items.len());
    let mut failed = Vec::new();
    for item in items {
        match op(item) {
            Ok(value) => done.push(value),
            Err(err) => {
                tracing::warn!(item = ?item, error = %err, "batch item failed");
                failed.push(ErrorCode::from(&err));
            }
        }
    }
    if done.is_empty() && !failed.is_empty() {
        return Err(ConnectorError::Batch(failed));
    }
    Ok((done, error::dedup(failed)))
}

fn unique(nodes: Vec<Node>) -> Vec<Node> {
    let mut seen = HashSet::new();
    nodes.into_iter().filter(|n| seen.insert(n.hash())).collect()
}
