//! Path utilities
//!
//! Small helpers for deriving output names and locating raster files.

use std::path::{Path, PathBuf};

/// Removes trailing slashes from a directory argument ("out/" -> "out")
///
/// A bare "/" is returned unchanged.
pub fn trim_trailing_slash(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() && path.starts_with('/') {
        "/"
    } else {
        trimmed
    }
}

/// Last path segment without its extension ("data/scene.v2.tif" -> "scene.v2")
pub fn file_name_root(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Whether the path carries a `.tif` or `.tiff` extension (any case)
pub fn has_tiff_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("tif") || ext.eq_ignore_ascii_case("tiff"))
        .unwrap_or(false)
}

/// Appends `.tif` unless the path already has a TIFF extension
pub fn ensure_tif_extension(path: &Path) -> PathBuf {
    if has_tiff_extension(path) {
        return path.to_path_buf();
    }
    let mut name = path.as_os_str().to_os_string();
    name.push(".tif");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trim_trailing_slash() {
        assert_eq!(trim_trailing_slash("out/"), "out");
        assert_eq!(trim_trailing_slash("out//"), "out");
        assert_eq!(trim_trailing_slash("out"), "out");
        assert_eq!(trim_trailing_slash("/"), "/");
    }

    #[test]
    fn test_file_name_root() {
        assert_eq!(file_name_root(Path::new("exports/area_51.tif")), "area_51");
        assert_eq!(file_name_root(Path::new("scene.v2.tiff")), "scene.v2");
        assert_eq!(file_name_root(Path::new("plain")), "plain");
    }

    #[test]
    fn test_ensure_tif_extension() {
        assert_eq!(ensure_tif_extension(Path::new("a/b")), PathBuf::from("a/b.tif"));
        assert_eq!(ensure_tif_extension(Path::new("a/b.TIFF")), PathBuf::from("a/b.TIFF"));
        assert_eq!(ensure_tif_extension(Path::new("a/b.v1")), PathBuf::from("a/b.v1.tif"));
    }
}
