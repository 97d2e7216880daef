//! Raster image support: dimensions, cached thumbnails and in-place resize.

use std::fs;
use std::io::BufReader;
use std::path::Path;
use std::str::FromStr;

use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, ImageReader, Limits, Rgba, RgbaImage};
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;

use super::Node;
use crate::volume::VolumeError;

/// Mime types for which thumbnails, dimensions and resizing are offered.
pub const SUPPORTED_MIMES: &[&str] = &[
    "image/jpeg",
    "image/png",
    "image/gif",
    "image/x-icon",
    "image/vnd.microsoft.icon",
];

/// Thumbnails fit in a square box of this many pixels.
pub const THUMBNAIL_SIZE: u32 = 50;

const MAX_DIMENSION: u32 = 16384;
const MAX_ALLOC: u64 = 512 * 1024 * 1024;

pub fn is_supported_image(mime: &str) -> bool {
    SUPPORTED_MIMES.contains(&mime)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeMode {
    /// Scale to exactly the requested size
    Resize,
    /// Cut out a window at an offset
    Crop,
}

impl FromStr for ResizeMode {
    type Err = ImagingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "resize" => Ok(Self::Resize),
            "crop" => Ok(Self::Crop),
            other => Err(ImagingError::InvalidMode(other.to_string())),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ImagingError {
    #[error("not a supported image: {0}")]
    NotAnImage(String),
    #[error("invalid resize mode: {0}")]
    InvalidMode(String),
    #[error("image format could not be determined")]
    UnknownFormat,
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Volume(#[from] VolumeError),
    #[error("failed to persist image: {0}")]
    Persist(#[from] tempfile::PersistError),
}

fn open_reader(path: &Path) -> Result<ImageReader<BufReader<fs::File>>, ImagingError> {
    let mut reader = ImageReader::open(path)?.with_guessed_format()?;
    let mut limits = Limits::default();
    limits.max_image_width = Some(MAX_DIMENSION);
    limits.max_image_height = Some(MAX_DIMENSION);
    limits.max_alloc = Some(MAX_ALLOC);
    reader.limits(limits);
    Ok(reader)
}

fn ensure_image(node: &Node) -> Result<(), ImagingError> {
    let mime = node.mime();
    if is_supported_image(&mime) {
        Ok(())
    } else {
        Err(ImagingError::NotAnImage(mime))
    }
}

/// Width and height, read from the image header only.
pub fn dimensions(node: &Node) -> Result<(u32, u32), ImagingError> {
    ensure_image(node)?;
    Ok(open_reader(&node.real_path()?)?.into_dimensions()?)
}

/// Cache file name of a node's thumbnail.
pub fn thumbnail_name(node: &Node) -> String {
    format!("{}.png", hex::encode(Sha256::digest(node.hash().as_bytes())))
}

/// URL of the node's thumbnail, generating it first when missing or forced.
/// Returns `None` for anything that is not a supported image.
pub fn thumbnail(node: &Node, force: bool) -> Result<Option<String>, ImagingError> {
    if !is_supported_image(&node.mime()) {
        return Ok(None);
    }

    let volume = node.volume();
    let dir = volume.resolve(&volume.thumbnails_path())?;
    let name = thumbnail_name(node);
    let target = dir.join(&name);

    if force || !target.exists() {
        fs::create_dir_all(&dir)?;
        let source = open_reader(&node.real_path()?)?.decode()?;
        let canvas = render_thumbnail(&source);

        let mut file = NamedTempFile::new_in(&dir)?;
        DynamicImage::ImageRgba8(canvas).write_to(&mut file, ImageFormat::Png)?;
        file.persist(&target)?;
        tracing::debug!(node = %node, thumbnail = %name, "generated thumbnail");
    }

    Ok(Some(format!("{}{}", volume.thumbnails_url(), name)))
}

/// Scale into the thumbnail box and center on a transparent canvas.
fn render_thumbnail(source: &DynamicImage) -> RgbaImage {
    let scaled = source.thumbnail(THUMBNAIL_SIZE, THUMBNAIL_SIZE).to_rgba8();
    let mut canvas =
        RgbaImage::from_pixel(THUMBNAIL_SIZE, THUMBNAIL_SIZE, Rgba([255, 255, 255, 0]));
    let x = (THUMBNAIL_SIZE - scaled.width()) / 2;
    let y = (THUMBNAIL_SIZE - scaled.height()) / 2;
    imageops::overlay(&mut canvas, &scaled, i64::from(x), i64::from(y));
    canvas
}

/// Resize or crop the image in place, then refresh its thumbnail.
pub fn resize(
    node: &Node,
    width: u32,
    height: u32,
    x: u32,
    y: u32,
    mode: ResizeMode,
) -> Result<(), ImagingError> {
    ensure_image(node)?;
    let path = node.real_path()?;
    let reader = open_reader(&path)?;
    let format = reader.format().ok_or(ImagingError::UnknownFormat)?;
    let source = reader.decode()?;

    let result = match mode {
        ResizeMode::Resize => source.resize_exact(width, height, FilterType::Lanczos3),
        ResizeMode::Crop => crop_window(&source, x, y, width, height),
    };
    let result = match format {
        // jpeg cannot carry alpha
        ImageFormat::Jpeg => DynamicImage::ImageRgb8(result.to_rgb8()),
        _ => result,
    };

    let dir = path.parent().ok_or(ImagingError::UnknownFormat)?;
    let mut file = NamedTempFile::new_in(dir)?;
    result.write_to(&mut file, format)?;
    file.persist(&path)?;

    tracing::info!(
        node = %node,
        ?mode,
        width = result.width(),
        height = result.height(),
        "resized image"
    );
    if let Err(err) = thumbnail(node, true) {
        tracing::warn!(node = %node, error = %err, "thumbnail refresh failed after resize");
    }
    Ok(())
}

/// Exactly `width`x`height`; the part of the window past the image edge is
/// left transparent (black once flattened for jpeg).
fn crop_window(source: &DynamicImage, x: u32, y: u32, width: u32, height: u32) -> DynamicImage {
    let mut canvas = RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 0]));
    let inside = source.crop_imm(x, y, width, height).to_rgba8();
    imageops::overlay(&mut canvas, &inside, 0, 0);
    DynamicImage::ImageRgba8(canvas)
}
