use std::path::Path;

pub const DIRECTORY: &str = "directory";
pub const UNKNOWN: &str = "file";

/// Mime type by extension. Directories are `directory`, unknown files `file`.
pub fn guess(path: &Path, is_dir: bool) -> String {
    if is_dir {
        return DIRECTORY.to_string();
    }
    mime_guess::from_path(path)
        .first_raw()
        .unwrap_or(UNKNOWN)
        .to_string()
}
