use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::image::{self as imaging, is_supported_image};
use super::{Node, NodeError};

/// Protocol view of a node, as it appears in `cwd`, `files`, `added`, `tree`
/// and `changed`. Flags are integers (0/1) on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeInfo {
    pub name: String,
    pub hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phash: Option<String>,
    pub mime: String,
    pub ts: i64,
    /// Deprecated by the protocol in favour of `ts`, kept for old clients
    pub date: String,
    pub size: u64,
    pub dirs: u8,
    pub read: u8,
    pub write: u8,
    pub locked: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tmb: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dim: Option<String>,
    pub volumeid: String,
}

fn flag(value: bool) -> u8 {
    u8::from(value)
}

impl NodeInfo {
    pub fn from_node(node: &Node) -> Result<Self, NodeError> {
        let metadata = node.metadata()?;
        let ts = metadata
            .modified()
            .ok()
            .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
            .map(|d| d.as_secs() as i64)
            .unwrap_or_default();
        let date = DateTime::<Utc>::from_timestamp(ts, 0)
            .map(|dt| dt.format("%c").to_string())
            .unwrap_or_default();

        let mime = node.mime();
        let (tmb, dim) = if is_supported_image(&mime) {
            image_fields(node)
        } else {
            (None, None)
        };

        Ok(Self {
            name: node.name().to_string(),
            hash: node.hash(),
            phash: node.parent_hash(),
            mime,
            ts,
            date,
            size: metadata.len(),
            dirs: flag(metadata.is_dir() && node.has_subdirectories()),
            read: flag(node.readable()),
            write: flag(node.writable()),
            locked: flag(node.locked()),
            tmb,
            dim,
            volumeid: node.volume().volume_id().to_string(),
        })
    }
}

/// Broken images still get listed, just without `tmb`/`dim`.
fn image_fields(node: &Node) -> (Option<String>, Option<String>) {
    let tmb = imaging::thumbnail(node, false).unwrap_or_else(|err| {
        tracing::warn!(node = %node, error = %err, "thumbnail generation failed");
        None
    });
    let dim = match imaging::dimensions(node) {
        Ok((w, h)) => Some(format!("{w}x{h}")),
        Err(err) => {
            tracing::warn!(node = %node, error = %err, "could not read image dimensions");
            None
        }
    };
    (tmb, dim)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::volume::{VolumeConfig, VolumeRegistry};
    use ::image::{Rgba, RgbaImage};
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_info_for_file_dir_and_image() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("docs/sub")).unwrap();
        fs::write(dir.path().join("docs/a.txt"), b"hello").unwrap();
        RgbaImage::from_pixel(8, 4, Rgba([0, 0, 0, 255]))
            .save(dir.path().join("pic.png"))
            .unwrap();
        let registry = VolumeRegistry::new(
            vec![VolumeConfig::new("Media", dir.path(), "/media/")],
            None,
        )
        .unwrap();
        let root = registry.root("Media").unwrap();

        let info = NodeInfo::from_node(&root).unwrap();
        assert_eq!(info.name, "Media");
        assert!(info.phash.is_none());
        assert_eq!(info.mime, "directory");
        assert_eq!(info.dirs, 1);
        assert_eq!(info.volumeid, root.volume().volume_id());

        let file = root.child("docs").child("a.txt");
        let info = NodeInfo::from_node(&file).unwrap();
        assert_eq!(info.size, 5);
        assert_eq!(info.dirs, 0);
        assert_eq!(info.read, 1);
        assert_eq!(info.phash, Some(root.child("docs").hash()));
        assert!(info.tmb.is_none());

        let json = serde_json::to_value(&info).unwrap();
        assert!(json.get("tmb").is_none());
        assert_eq!(json["read"], 1);

        let image = NodeInfo::from_node(&root.child("pic.png")).unwrap();
        assert_eq!(image.dim.as_deref(), Some("8x4"));
        assert!(image.tmb.unwrap().starts_with("/media/.tmb/"));
    }

    #[test]
    fn test_missing_node_is_an_error() {
        let dir = TempDir::new().unwrap();
        let registry = VolumeRegistry::new(
            vec![VolumeConfig::new("Media", dir.path(), "/media/")],
            None,
        )
        .unwrap();
        let missing = registry.root("Media").unwrap().child("nope");
        assert!(matches!(
            NodeInfo::from_node(&missing),
            Err(NodeError::Io(_))
        ));
    }
}
