//! Volume registry and the containment-checking path resolver.
//!
//! A volume is a real directory exposed as one root of the virtual
//! filesystem. The registry is built once at startup and never mutated;
//! it is shared behind an `Arc` by everything that needs it.

use std::collections::HashSet;
use std::fs::FileType;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::hash::NodeHash;
use crate::node::Node;

pub const DEFAULT_THUMBNAILS_DIR: &str = ".tmb";

fn default_thumbnails_dir() -> String {
    DEFAULT_THUMBNAILS_DIR.to_string()
}

/// On-disk description of a volume, as found in the daemon's config file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeConfig {
    /// Unique volume id, also the display name of the volume root
    pub id: String,
    /// Real base directory
    pub path: PathBuf,
    /// Public URL prefix under which the volume's files are served
    pub url: String,
    /// Thumbnail cache directory, relative to `path`
    #[serde(default = "default_thumbnails_dir")]
    pub thumbnails_dir: String,
    /// Show dotfiles in listings
    #[serde(default)]
    pub show_hidden: bool,
}

impl VolumeConfig {
    pub fn new(id: impl Into<String>, path: impl Into<PathBuf>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            path: path.into(),
            url: url.into(),
            thumbnails_dir: default_thumbnails_dir(),
            show_hidden: false,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("at least one volume must be configured")]
    Empty,
    #[error("duplicate volume id: {0}")]
    DuplicateId(String),
    #[error("volume id must not be empty")]
    EmptyId,
    #[error("volume '{id}' base directory is not a directory: {path}")]
    NotADirectory { id: String, path: PathBuf },
    #[error("default root '{0}' is not a configured volume")]
    UnknownDefault(String),
    #[error("invalid thumbnails directory for volume '{0}'")]
    InvalidThumbnailsDir(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum VolumeError {
    #[error("unknown volume: {0}")]
    UnknownVolume(String),
    #[error("path escapes volume '{volume}': {path}")]
    OutsideVolume { volume: String, path: String },
}

/// A registered volume with its canonical base directory.
#[derive(Debug)]
pub struct Volume {
    index: usize,
    id: String,
    base_dir: PathBuf,
    url: String,
    thumbnails_dir: String,
    show_hidden: bool,
    volume_id: String,
}

impl Volume {
    fn from_config(index: usize, config: VolumeConfig) -> Result<Self, RegistryError> {
        if config.id.is_empty() {
            return Err(RegistryError::EmptyId);
        }
        let base_dir = config.path.canonicalize()?;
        if !base_dir.is_dir() {
            return Err(RegistryError::NotADirectory {
                id: config.id,
                path: base_dir,
            });
        }

        let thumbnails_dir = normalize_path(&config.thumbnails_dir);
        if thumbnails_dir == "/" {
            return Err(RegistryError::InvalidThumbnailsDir(config.id));
        }

        let mut url = config.url;
        if !url.ends_with('/') {
            url.push('/');
        }

        let volume_id = NodeHash::volume_token(&config.id);
        Ok(Self {
            index,
            id: config.id,
            base_dir,
            url,
            thumbnails_dir: thumbnails_dir.trim_start_matches('/').to_string(),
            show_hidden: config.show_hidden,
            volume_id,
        })
    }

    /// Position in the registry; also the lock acquisition order.
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn show_hidden(&self) -> bool {
        self.show_hidden
    }

    /// Encoded volume id plus separator; the prefix of every hash in this volume.
    pub fn volume_id(&self) -> &str {
        &self.volume_id
    }

    /// Virtual path of the thumbnail cache directory.
    pub fn thumbnails_path(&self) -> String {
        format!("/{}", self.thumbnails_dir)
    }

    /// Public URL of the thumbnail cache directory.
    pub fn thumbnails_url(&self) -> String {
        format!("{}{}/", self.url, self.thumbnails_dir)
    }

    pub fn is_root(path: &str) -> bool {
        normalize_path(path) == "/"
    }

    /// Whether a directory entry shows up in listings and searches.
    /// Symbolic links never do; dotfiles only when the volume allows them.
    pub fn is_visible(&self, name: &str, file_type: FileType) -> bool {
        if file_type.is_symlink() {
            return false;
        }
        self.show_hidden || !name.starts_with('.')
    }

    /// Resolve a virtual path to a real path inside this volume.
    ///
    /// The path is normalized first (`..` is clamped at the volume root), then
    /// the deepest existing ancestor of the joined path is canonicalized and
    /// checked against the base directory so symlinks cannot lead outside.
    pub fn resolve(&self, path: &str) -> Result<PathBuf, VolumeError> {
        let normalized = normalize_path(path);
        let real = self.base_dir.join(normalized.trim_start_matches('/'));
        self.ensure_contained(&real, &normalized)?;
        Ok(real)
    }

    fn ensure_contained(&self, real: &Path, virtual_path: &str) -> Result<(), VolumeError> {
        let mut probe = Some(real);
        while let Some(candidate) = probe {
            if let Ok(canonical) = candidate.canonicalize() {
                if canonical.starts_with(&self.base_dir) {
                    return Ok(());
                }
                break;
            }
            probe = candidate.parent();
        }
        tracing::warn!(
            volume = %self.id,
            path = %virtual_path,
            "rejected path resolving outside of volume"
        );
        Err(VolumeError::OutsideVolume {
            volume: self.id.clone(),
            path: virtual_path.to_string(),
        })
    }
}

/// Collapse `.`, `..` and duplicate separators; the result always starts
/// with `/` and never climbs above it.
pub fn normalize_path(path: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            name => parts.push(name),
        }
    }
    format!("/{}", parts.join("/"))
}

/// Ordered, immutable set of volumes.
#[derive(Debug)]
pub struct VolumeRegistry {
    volumes: Vec<Arc<Volume>>,
    default_root: usize,
}

impl VolumeRegistry {
    pub fn new(
        configs: Vec<VolumeConfig>,
        default_root: Option<&str>,
    ) -> Result<Self, RegistryError> {
        if configs.is_empty() {
            return Err(RegistryError::Empty);
        }

        let mut seen = HashSet::new();
        let mut volumes = Vec::with_capacity(configs.len());
        for (index, config) in configs.into_iter().enumerate() {
            if !seen.insert(config.id.clone()) {
                return Err(RegistryError::DuplicateId(config.id));
            }
            let volume = Volume::from_config(index, config)?;
            tracing::debug!(
                volume = %volume.id,
                base_dir = %volume.base_dir.display(),
                "registered volume"
            );
            volumes.push(Arc::new(volume));
        }

        let default_root = match default_root {
            Some(id) => volumes
                .iter()
                .position(|v| v.id == id)
                .ok_or_else(|| RegistryError::UnknownDefault(id.to_string()))?,
            None => 0,
        };

        Ok(Self {
            volumes,
            default_root,
        })
    }

    /// Volumes in registration order.
    pub fn list(&self) -> &[Arc<Volume>] {
        &self.volumes
    }

    pub fn get(&self, id: &str) -> Result<&Arc<Volume>, VolumeError> {
        self.volumes
            .iter()
            .find(|v| v.id == id)
            .ok_or_else(|| VolumeError::UnknownVolume(id.to_string()))
    }

    /// Volume opened when the client does not name a target.
    pub fn default_volume(&self) -> &Arc<Volume> {
        &self.volumes[self.default_root]
    }

    /// Root node of the named volume.
    pub fn root(&self, id: &str) -> Result<Node, VolumeError> {
        Ok(Node::root(self.get(id)?))
    }

    pub fn len(&self) -> usize {
        self.volumes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.volumes.is_empty()
    }
}
