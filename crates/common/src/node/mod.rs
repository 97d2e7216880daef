//! Virtual files and directories.
//!
//! A [`Node`] is a `(volume, path)` pair; everything else about it is read
//! from the real filesystem on demand and never cached.

pub mod image;
pub mod info;
pub mod mime;

use std::fmt;
use std::fs::{self, Metadata};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

use crate::hash::{DecodeError, NodeHash};
use crate::volume::{normalize_path, Volume, VolumeError, VolumeRegistry};

pub use info::NodeInfo;

/// Characters escaped when a node path is turned into a public URL.
const URL_PATH: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    #[error("invalid node hash: {0}")]
    Decode(#[from] DecodeError),
    #[error(transparent)]
    Volume(#[from] VolumeError),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug, Clone)]
pub struct Node {
    volume: Arc<Volume>,
    path: String,
}

impl Node {
    pub fn new(volume: Arc<Volume>, path: &str) -> Self {
        Self {
            volume,
            path: normalize_path(path),
        }
    }

    pub fn root(volume: &Arc<Volume>) -> Self {
        Self::new(volume.clone(), "/")
    }

    /// Decode a wire hash into a node of a registered volume.
    /// The node is not required to exist.
    pub fn from_hash(registry: &VolumeRegistry, token: &str) -> Result<Self, NodeError> {
        let hash = NodeHash::parse(token)?;
        let volume = registry.get(&hash.root)?;
        let node = Self::new(volume.clone(), &hash.path);
        node.real_path()?;
        Ok(node)
    }

    pub fn volume(&self) -> &Arc<Volume> {
        &self.volume
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn is_root(&self) -> bool {
        self.path == "/"
    }

    /// Real location, re-checked against the volume on every call.
    pub fn real_path(&self) -> Result<PathBuf, VolumeError> {
        self.volume.resolve(&self.path)
    }

    /// Metadata without following a final symlink.
    pub fn metadata(&self) -> Result<Metadata, NodeError> {
        Ok(fs::symlink_metadata(self.real_path()?)?)
    }

    pub fn exists(&self) -> bool {
        self.metadata().is_ok()
    }

    pub fn is_dir(&self) -> bool {
        self.metadata().map(|m| m.is_dir()).unwrap_or(false)
    }

    pub fn is_file(&self) -> bool {
        self.metadata().map(|m| m.is_file()).unwrap_or(false)
    }

    /// Leaf name; a volume root is named after its volume.
    pub fn name(&self) -> &str {
        if self.is_root() {
            return self.volume.id();
        }
        self.path.rsplit('/').next().unwrap_or_default()
    }

    pub fn hash(&self) -> String {
        NodeHash::new(self.volume.id(), self.path.as_str()).to_string()
    }

    pub fn parent(&self) -> Option<Node> {
        if self.is_root() {
            return None;
        }
        let parent = match self.path.rfind('/') {
            Some(0) | None => "/",
            Some(idx) => &self.path[..idx],
        };
        Some(Self::new(self.volume.clone(), parent))
    }

    pub fn parent_hash(&self) -> Option<String> {
        self.parent().map(|p| p.hash())
    }

    pub fn child(&self, name: &str) -> Node {
        let path = if self.is_root() {
            format!("/{name}")
        } else {
            format!("{}/{name}", self.path)
        };
        Self::new(self.volume.clone(), &path)
    }

    pub fn is_same(&self, other: &Node) -> bool {
        Arc::ptr_eq(&self.volume, &other.volume) && self.path == other.path
    }

    /// Whether `self` is `other` or lies below it.
    pub fn is_within(&self, other: &Node) -> bool {
        if !Arc::ptr_eq(&self.volume, &other.volume) {
            return false;
        }
        other.is_root()
            || self.path == other.path
            || self
                .path
                .strip_prefix(other.path.as_str())
                .is_some_and(|rest| rest.starts_with('/'))
    }

    pub fn mime(&self) -> String {
        match self.real_path() {
            Ok(path) => mime::guess(&path, self.is_dir()),
            Err(_) => mime::UNKNOWN.to_string(),
        }
    }

    /// Immediate visible children, sorted by name.
    pub fn children(&self) -> Result<Vec<Node>, NodeError> {
        let mut names = Vec::new();
        for entry in fs::read_dir(self.real_path()?)? {
            let entry = entry?;
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                tracing::debug!(path = ?entry.path(), "skipping non UTF-8 entry");
                continue;
            };
            if self.volume.is_visible(&name, entry.file_type()?) {
                names.push(name);
            }
        }
        names.sort();
        Ok(names.iter().map(|name| self.child(name)).collect())
    }

    /// Any visible immediate child is a directory. Listing failures count as no.
    pub fn has_subdirectories(&self) -> bool {
        if !self.is_dir() {
            return false;
        }
        match self.children() {
            Ok(children) => children.iter().any(Node::is_dir),
            Err(_) => false,
        }
    }

    pub fn readable(&self) -> bool {
        self.check_access(access::READ)
    }

    pub fn writable(&self) -> bool {
        self.check_access(access::WRITE)
    }

    /// A node is locked when its real parent directory cannot be written.
    pub fn locked(&self) -> bool {
        let Ok(path) = self.real_path() else {
            return true;
        };
        match path.parent() {
            Some(parent) => !access::check(parent, access::WRITE),
            None => true,
        }
    }

    fn check_access(&self, mode: access::Mode) -> bool {
        let Ok(path) = self.real_path() else {
            return false;
        };
        let mut ok = access::check(&path, mode);
        if ok && self.is_dir() {
            ok = access::check(&path, access::EXECUTE);
        }
        ok
    }

    /// Public URL of the node under its volume's URL prefix.
    pub fn url(&self) -> String {
        let relative = self.path.trim_start_matches('/');
        format!(
            "{}{}",
            self.volume.url(),
            utf8_percent_encode(relative, URL_PATH)
        )
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.volume.id(), self.path)
    }
}

#[cfg(unix)]
mod access {
    use std::ffi::CString;
    use std::os::unix::ffi::OsStrExt;
    use std::path::Path;

    pub type Mode = libc::c_int;

    pub const READ: Mode = libc::R_OK;
    pub const WRITE: Mode = libc::W_OK;
    pub const EXECUTE: Mode = libc::X_OK;

    /// access(2) against the real uid of the process.
    pub fn check(path: &Path, mode: Mode) -> bool {
        let Ok(c_path) = CString::new(path.as_os_str().as_bytes()) else {
            return false;
        };
        // SAFETY: c_path is a valid NUL-terminated string for the duration of the call
        unsafe { libc::access(c_path.as_ptr(), mode) == 0 }
    }
}

#[cfg(not(unix))]
mod access {
    use std::path::Path;

    pub type Mode = u8;

    pub const READ: Mode = 0b001;
    pub const WRITE: Mode = 0b010;
    pub const EXECUTE: Mode = 0b100;

    pub fn check(path: &Path, mode: Mode) -> bool {
        match std::fs::metadata(path) {
            Ok(meta) if mode & WRITE != 0 => !meta.permissions().readonly(),
            Ok(_) => true,
            Err(_) => false,
        }
    }
}
