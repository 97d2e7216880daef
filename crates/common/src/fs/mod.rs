//! Filesystem operations on nodes.
//!
//! Every public operation takes the per-volume locks it needs and then
//! calls into unlocked helpers; helpers never lock.

pub mod lock;
pub mod naming;

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::Path;
use std::sync::Arc;

use walkdir::WalkDir;

use crate::node::image::{self as imaging, ImagingError, ResizeMode};
use crate::node::{Node, NodeError, NodeInfo};
use crate::volume::{VolumeError, VolumeRegistry};

use lock::LockTable;

#[derive(Debug, thiserror::Error)]
pub enum FsError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("already exists: {0}")]
    AlreadyExists(String),
    #[error("invalid name: {0:?}")]
    InvalidName(String),
    #[error("not a directory: {0}")]
    NotADirectory(String),
    #[error("not a file: {0}")]
    NotAFile(String),
    #[error("operation not allowed on volume root: {0}")]
    RootNotAllowed(String),
    #[error("cannot copy {0} into itself")]
    CopyIntoSelf(String),
    #[error(transparent)]
    Volume(#[from] VolumeError),
    #[error(transparent)]
    Imaging(#[from] ImagingError),
    #[error("IO error on {node}: {source}")]
    Io {
        node: String,
        #[source]
        source: io::Error,
    },
}

impl FsError {
    /// Classify an I/O failure on `node` by its kind.
    pub fn from_io(err: io::Error, node: &Node) -> Self {
        let node = node.to_string();
        match err.kind() {
            io::ErrorKind::NotFound => Self::NotFound(node),
            io::ErrorKind::PermissionDenied => Self::PermissionDenied(node),
            io::ErrorKind::AlreadyExists => Self::AlreadyExists(node),
            _ => Self::Io { node, source: err },
        }
    }

    fn from_node(err: NodeError, node: &Node) -> Self {
        match err {
            NodeError::Io(err) => Self::from_io(err, node),
            NodeError::Volume(err) => Self::Volume(err),
            NodeError::Decode(_) => Self::NotFound(node.to_string()),
        }
    }
}

pub struct Filesystem {
    registry: Arc<VolumeRegistry>,
    locks: LockTable,
}

impl Filesystem {
    pub fn new(registry: Arc<VolumeRegistry>) -> Self {
        let locks = LockTable::new(registry.len());
        Self { registry, locks }
    }

    pub fn registry(&self) -> &Arc<VolumeRegistry> {
        &self.registry
    }

    /// Immediate children, or with `recursive` the node itself followed by
    /// all visible descendants in depth-first name order.
    pub fn list(&self, node: &Node, recursive: bool) -> Result<Vec<Node>, FsError> {
        let _guard = self.locks.read(&[node.volume().index()]);
        require_exists(node)?;
        if !recursive {
            return node.children().map_err(|e| FsError::from_node(e, node));
        }

        let root = node.real_path()?;
        let volume = node.volume();
        let walker = WalkDir::new(&root)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                entry.depth() == 0
                    || entry
                        .file_name()
                        .to_str()
                        .is_some_and(|name| volume.is_visible(name, entry.file_type()))
            });

        let mut nodes = Vec::new();
        for entry in walker {
            let entry = entry.map_err(|e| walk_error(e, node))?;
            match relative_node(node, &root, entry.path()) {
                Some(found) => nodes.push(found),
                None => tracing::debug!(path = ?entry.path(), "skipping unrepresentable entry"),
            }
        }
        Ok(nodes)
    }

    pub fn mkdir(&self, parent: &Node, name: &str) -> Result<Node, FsError> {
        let _guard = self.locks.write(&[parent.volume().index()]);
        let target = new_child(parent, name)?;
        fs::create_dir(target.real_path()?).map_err(|e| FsError::from_io(e, &target))?;
        tracing::info!(node = %target, "created directory");
        Ok(target)
    }

    pub fn mkfile(&self, parent: &Node, name: &str) -> Result<Node, FsError> {
        let _guard = self.locks.write(&[parent.volume().index()]);
        let target = new_child(parent, name)?;
        create_new(&target)?;
        tracing::info!(node = %target, "created file");
        Ok(target)
    }

    /// Rename within the same parent. Never overwrites.
    pub fn rename(&self, node: &Node, name: &str) -> Result<Node, FsError> {
        let _guard = self.locks.write(&[node.volume().index()]);
        require_not_root(node)?;
        require_exists(node)?;
        if node.name() == name {
            return Ok(node.clone());
        }
        let parent = node
            .parent()
            .ok_or_else(|| FsError::RootNotAllowed(node.to_string()))?;
        let target = new_child(&parent, name)?;
        if target.exists() {
            return Err(FsError::AlreadyExists(target.to_string()));
        }
        fs::rename(node.real_path()?, target.real_path()?)
            .map_err(|e| FsError::from_io(e, node))?;
        tracing::info!(from = %node, to = %target, "renamed");
        Ok(target)
    }

    pub fn delete(&self, node: &Node) -> Result<(), FsError> {
        let _guard = self.locks.write(&[node.volume().index()]);
        remove(node)
    }

    /// Copy next to the original as `<base> copy <n>[.<ext>]`.
    pub fn duplicate(&self, node: &Node) -> Result<Node, FsError> {
        let _guard = self.locks.write(&[node.volume().index()]);
        require_not_root(node)?;
        require_exists(node)?;
        let parent = node
            .parent()
            .ok_or_else(|| FsError::RootNotAllowed(node.to_string()))?;
        require_writable(&parent)?;

        let name = naming::next_copy_name(node.name(), node.is_dir(), |candidate| {
            parent.child(candidate).exists()
        });
        let target = parent.child(&name);
        copy_tree(node, &target)?;
        tracing::info!(from = %node, to = %target, "duplicated");
        Ok(target)
    }

    /// Deep copy `node` into directory `dst`, keeping its name. With `cut`
    /// the source is removed once the copy succeeded.
    pub fn copy(&self, node: &Node, dst: &Node, cut: bool) -> Result<Node, FsError> {
        let _guard = self
            .locks
            .write(&[node.volume().index(), dst.volume().index()]);
        require_not_root(node)?;
        require_exists(node)?;
        require_dir(dst)?;
        require_writable(dst)?;
        if node.is_dir() && dst.is_within(node) {
            return Err(FsError::CopyIntoSelf(node.to_string()));
        }

        let target = dst.child(node.name());
        if target.exists() {
            return Err(FsError::AlreadyExists(target.to_string()));
        }
        copy_tree(node, &target)?;
        if cut {
            remove(node)?;
        }
        tracing::info!(from = %node, to = %target, cut, "pasted");
        Ok(target)
    }

    pub fn read(&self, node: &Node) -> Result<Vec<u8>, FsError> {
        let _guard = self.locks.read(&[node.volume().index()]);
        require_file(node)?;
        fs::read(node.real_path()?).map_err(|e| FsError::from_io(e, node))
    }

    /// Overwrite the file's content in place.
    pub fn write(&self, node: &Node, content: &[u8]) -> Result<Node, FsError> {
        let _guard = self.locks.write(&[node.volume().index()]);
        require_file(node)?;
        fs::write(node.real_path()?, content).map_err(|e| FsError::from_io(e, node))?;
        tracing::info!(node = %node, bytes = content.len(), "wrote file");
        Ok(node.clone())
    }

    /// Create a new file under `parent` holding `content`.
    pub fn upload(&self, parent: &Node, name: &str, content: &[u8]) -> Result<Node, FsError> {
        let _guard = self.locks.write(&[parent.volume().index()]);
        let target = new_child(parent, name)?;
        let mut file = create_new(&target)?;
        if let Err(err) = file.write_all(content).and_then(|_| file.sync_all()) {
            drop(file);
            if let Ok(path) = target.real_path() {
                let _ = fs::remove_file(path);
            }
            return Err(FsError::from_io(err, &target));
        }
        tracing::info!(node = %target, bytes = content.len(), "uploaded file");
        Ok(target)
    }

    /// Case-sensitive substring match on names across every volume.
    /// Volume roots never match; hidden entries and symlinks are skipped.
    pub fn search(&self, query: &str) -> Vec<Node> {
        let indices: Vec<usize> = self.registry.list().iter().map(|v| v.index()).collect();
        let _guard = self.locks.read(&indices);

        let mut found = Vec::new();
        for volume in self.registry.list() {
            let root = Node::root(volume);
            let base = volume.base_dir();
            let walker = WalkDir::new(base)
                .min_depth(1)
                .follow_links(false)
                .sort_by_file_name()
                .into_iter()
                .filter_entry(|entry| {
                    entry.depth() == 0
                        || entry
                            .file_name()
                            .to_str()
                            .is_some_and(|name| volume.is_visible(name, entry.file_type()))
                });
            for entry in walker {
                let entry = match entry {
                    Ok(entry) => entry,
                    Err(err) => {
                        tracing::debug!(volume = %volume.id(), error = %err, "search skipped entry");
                        continue;
                    }
                };
                let matches = entry
                    .file_name()
                    .to_str()
                    .is_some_and(|name| name.contains(query));
                if matches {
                    if let Some(node) = relative_node(&root, base, entry.path()) {
                        found.push(node);
                    }
                }
            }
        }
        found
    }

    pub fn resize(
        &self,
        node: &Node,
        width: u32,
        height: u32,
        x: u32,
        y: u32,
        mode: ResizeMode,
    ) -> Result<Node, FsError> {
        let _guard = self.locks.write(&[node.volume().index()]);
        require_file(node)?;
        require_writable(node)?;
        imaging::resize(node, width, height, x, y, mode)?;
        Ok(node.clone())
    }

    pub fn info(&self, node: &Node) -> Result<NodeInfo, FsError> {
        let _guard = self.locks.read(&[node.volume().index()]);
        NodeInfo::from_node(node).map_err(|e| FsError::from_node(e, node))
    }

    /// Describe many nodes under one set of read locks. Nodes that vanished
    /// in the meantime are dropped from the result.
    pub fn describe(&self, nodes: &[Node]) -> Vec<NodeInfo> {
        let indices: Vec<usize> = nodes.iter().map(|n| n.volume().index()).collect();
        let _guard = self.locks.read(&indices);
        nodes
            .iter()
            .filter_map(|node| match NodeInfo::from_node(node) {
                Ok(info) => Some(info),
                Err(err) => {
                    tracing::debug!(node = %node, error = %err, "dropping node from listing");
                    None
                }
            })
            .collect()
    }
}

fn require_exists(node: &Node) -> Result<(), FsError> {
    match node.metadata() {
        Ok(_) => Ok(()),
        Err(err) => Err(FsError::from_node(err, node)),
    }
}

fn require_not_root(node: &Node) -> Result<(), FsError> {
    if node.is_root() {
        Err(FsError::RootNotAllowed(node.to_string()))
    } else {
        Ok(())
    }
}

fn require_dir(node: &Node) -> Result<(), FsError> {
    require_exists(node)?;
    if node.is_dir() {
        Ok(())
    } else {
        Err(FsError::NotADirectory(node.to_string()))
    }
}

fn require_file(node: &Node) -> Result<(), FsError> {
    require_exists(node)?;
    if node.is_file() {
        Ok(())
    } else {
        Err(FsError::NotAFile(node.to_string()))
    }
}

fn require_writable(node: &Node) -> Result<(), FsError> {
    if node.writable() {
        Ok(())
    } else {
        Err(FsError::PermissionDenied(node.to_string()))
    }
}

/// Validated child of a writable directory.
fn new_child(parent: &Node, name: &str) -> Result<Node, FsError> {
    if !naming::is_valid_name(name) {
        return Err(FsError::InvalidName(name.to_string()));
    }
    require_dir(parent)?;
    require_writable(parent)?;
    let child = parent.child(name);
    child.real_path()?;
    Ok(child)
}

fn create_new(node: &Node) -> Result<fs::File, FsError> {
    OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(node.real_path()?)
        .map_err(|e| FsError::from_io(e, node))
}

fn remove(node: &Node) -> Result<(), FsError> {
    require_not_root(node)?;
    let path = node.real_path()?;
    let metadata = node.metadata().map_err(|e| FsError::from_node(e, node))?;
    let result = if metadata.is_dir() {
        fs::remove_dir_all(&path)
    } else {
        fs::remove_file(&path)
    };
    result.map_err(|e| FsError::from_io(e, node))?;
    tracing::info!(node = %node, "removed");
    Ok(())
}

/// Recursive copy of `src` to the not yet existing `dst`. Symlinks inside
/// the tree are skipped. A partial copy is cleaned up on failure.
fn copy_tree(src: &Node, dst: &Node) -> Result<(), FsError> {
    let from = src.real_path()?;
    let to = dst.real_path()?;
    if src.is_file() {
        return copy_file(&from, &to).map_err(|e| FsError::from_io(e, src));
    }

    let result = (|| -> Result<(), FsError> {
        for entry in WalkDir::new(&from).follow_links(false) {
            let entry = entry.map_err(|e| walk_error(e, src))?;
            let relative = entry
                .path()
                .strip_prefix(&from)
                .map_err(|_| FsError::NotFound(src.to_string()))?;
            let target = to.join(relative);
            let file_type = entry.file_type();
            if file_type.is_dir() {
                fs::create_dir(&target).map_err(|e| FsError::from_io(e, dst))?;
            } else if file_type.is_file() {
                copy_file(entry.path(), &target).map_err(|e| FsError::from_io(e, src))?;
            } else {
                tracing::debug!(path = ?entry.path(), "not copying special file");
            }
        }
        Ok(())
    })();

    if result.is_err() && to.exists() {
        if let Err(err) = fs::remove_dir_all(&to) {
            tracing::warn!(node = %dst, error = %err, "failed to clean up partial copy");
        }
    }
    result
}

/// Copy into a new file. A target this call created is removed again when
/// the copy fails partway.
fn copy_file(from: &Path, to: &Path) -> io::Result<()> {
    let mut source = fs::File::open(from)?;
    let mut target = OpenOptions::new().write(true).create_new(true).open(to)?;
    let result = io::copy(&mut source, &mut target)
        .and_then(|_| source.metadata())
        .and_then(|metadata| target.set_permissions(metadata.permissions()));
    if result.is_err() {
        drop(target);
        if let Err(err) = fs::remove_file(to) {
            tracing::warn!(path = %to.display(), error = %err, "failed to remove partial copy");
        }
    }
    result
}

fn walk_error(err: walkdir::Error, node: &Node) -> FsError {
    match err.into_io_error() {
        Some(io) => FsError::from_io(io, node),
        None => FsError::NotFound(node.to_string()),
    }
}

/// Map a real path below `base` back to a node below `anchor`.
fn relative_node(anchor: &Node, base: &Path, path: &Path) -> Option<Node> {
    let relative = path.strip_prefix(base).ok()?.to_str()?;
    if relative.is_empty() {
        return Some(anchor.clone());
    }
    let joined = format!("{}/{}", anchor.path().trim_end_matches('/'), relative);
    Some(Node::new(anchor.volume().clone(), &joined))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::volume::VolumeConfig;
    use tempfile::TempDir;

    fn setup() -> (TempDir, Filesystem) {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("docs/sub")).unwrap();
        fs::write(dir.path().join("docs/a.txt"), b"alpha").unwrap();
        fs::write(dir.path().join("docs/sub/b.txt"), b"beta").unwrap();
        let registry = VolumeRegistry::new(
            vec![VolumeConfig::new("Media", dir.path(), "/media/")],
            None,
        )
        .unwrap();
        (dir, Filesystem::new(Arc::new(registry)))
    }

    fn root(fs: &Filesystem) -> Node {
        fs.registry().root("Media").unwrap()
    }

    #[test]
    fn test_list_recursive_is_depth_first() {
        let (_dir, fs) = setup();
        let docs = root(&fs).child("docs");
        let paths: Vec<String> = fs
            .list(&docs, true)
            .unwrap()
            .iter()
            .map(|n| n.path().to_string())
            .collect();
        assert_eq!(
            paths,
            vec!["/docs", "/docs/a.txt", "/docs/sub", "/docs/sub/b.txt"]
        );
        assert_eq!(fs.list(&docs, false).unwrap().len(), 2);
    }

    #[test]
    fn test_mkdir_and_mkfile_refuse_existing() {
        let (_dir, fs) = setup();
        let root = root(&fs);
        let created = fs.mkdir(&root, "new").unwrap();
        assert!(created.is_dir());
        assert!(matches!(
            fs.mkdir(&root, "new"),
            Err(FsError::AlreadyExists(_))
        ));
        fs.mkfile(&created, "empty.txt").unwrap();
        assert!(matches!(
            fs.mkfile(&created, "empty.txt"),
            Err(FsError::AlreadyExists(_))
        ));
        assert!(matches!(
            fs.mkfile(&created, "../escape"),
            Err(FsError::InvalidName(_))
        ));
    }

    #[test]
    fn test_rename_refuses_overwrite() {
        let (_dir, fs) = setup();
        let docs = root(&fs).child("docs");
        fs.mkfile(&docs, "c.txt").unwrap();
        let a = docs.child("a.txt");
        assert!(matches!(
            fs.rename(&a, "c.txt"),
            Err(FsError::AlreadyExists(_))
        ));
        let same = fs.rename(&a, "a.txt").unwrap();
        assert!(same.is_same(&a));
        let renamed = fs.rename(&a, "z.txt").unwrap();
        assert_eq!(renamed.path(), "/docs/z.txt");
        assert!(!a.exists());
    }

    #[test]
    fn test_root_is_protected() {
        let (_dir, fs) = setup();
        let root = root(&fs);
        assert!(matches!(fs.delete(&root), Err(FsError::RootNotAllowed(_))));
        assert!(matches!(
            fs.rename(&root, "other"),
            Err(FsError::RootNotAllowed(_))
        ));
        assert!(matches!(
            fs.duplicate(&root),
            Err(FsError::RootNotAllowed(_))
        ));
    }

    #[test]
    fn test_copy_into_itself_is_refused() {
        let (_dir, fs) = setup();
        let docs = root(&fs).child("docs");
        assert!(matches!(
            fs.copy(&docs, &docs.child("sub"), false),
            Err(FsError::CopyIntoSelf(_))
        ));
        assert!(matches!(
            fs.copy(&docs, &docs, false),
            Err(FsError::CopyIntoSelf(_))
        ));
    }

    #[test]
    fn test_read_write_require_files() {
        let (_dir, fs) = setup();
        let docs = root(&fs).child("docs");
        assert!(matches!(fs.read(&docs), Err(FsError::NotAFile(_))));
        let a = docs.child("a.txt");
        fs.write(&a, b"rewritten").unwrap();
        assert_eq!(fs.read(&a).unwrap(), b"rewritten");
        assert!(matches!(
            fs.read(&docs.child("missing")),
            Err(FsError::NotFound(_))
        ));
    }

    #[test]
    fn test_failed_file_copy_leaves_no_partial_target() {
        let dir = TempDir::new().unwrap();
        let to = dir.path().join("copy");
        // reading a directory as a file fails after the target is created
        assert!(copy_file(dir.path(), &to).is_err());
        assert!(!to.exists());

        let existing = dir.path().join("existing.txt");
        std::fs::write(&existing, b"keep").unwrap();
        let source = dir.path().join("source.txt");
        std::fs::write(&source, b"new").unwrap();
        assert!(copy_file(&source, &existing).is_err());
        assert_eq!(std::fs::read(&existing).unwrap(), b"keep");
    }
}
