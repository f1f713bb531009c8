//! Image catalog
//!
//! Built once at startup from a recursive scan of the configured folders.
//! Files added later are not picked up.

use crate::Result;
use rand::Rng;
use std::path::{Path, PathBuf};

/// Extensions (lowercase) recognised as images
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp"];

/// Matched image extension (lowercase), by file-name suffix.
///
/// A bare `.png` counts as a PNG.
fn image_extension(path: &Path) -> Option<&'static str> {
    let name = path.file_name()?.to_string_lossy().to_ascii_lowercase();
    IMAGE_EXTENSIONS.iter().copied().find(|&ext| {
        name.len() > ext.len() && name.ends_with(ext) && name[..name.len() - ext.len()].ends_with('.')
    })
}

/// Content type for an image path, by extension only.
pub fn image_mime_type(path: &Path) -> &'static str {
    match image_extension(path) {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("bmp") => "image/bmp",
        _ => "application/octet-stream",
    }
}

/// Immutable list of discovered image files
#[derive(Debug, Clone, Default)]
pub struct ImageCatalog {
    images: Vec<PathBuf>,
}

impl ImageCatalog {
    pub fn new(images: Vec<PathBuf>) -> Self {
        Self { images }
    }

    /// Recursively scan `dirs`. Directories that do not exist are skipped,
    /// as are entries that cannot be read.
    ///
    /// Symlinked directories are not descended into; symlinked files are kept.
    pub fn scan<P: AsRef<Path>>(dirs: &[P]) -> Result<Self> {
        let mut images = Vec::new();

        for dir in dirs {
            let dir = dir.as_ref();
            if !dir.is_dir() {
                tracing::debug!(dir = %dir.display(), "image folder missing, skipped");
                continue;
            }

            let mut pending = vec![dir.to_path_buf()];
            while let Some(current) = pending.pop() {
                let root = glob::Pattern::escape(&current.to_string_lossy());
                let pattern = format!("{}/*", root.trim_end_matches('/'));

                for entry in glob::glob(&pattern)? {
                    let path = match entry {
                        Ok(path) => path,
                        Err(e) => {
                            tracing::debug!(error = %e, "unreadable entry during image scan");
                            continue;
                        }
                    };

                    match std::fs::symlink_metadata(&path) {
                        Ok(meta) if meta.is_dir() => pending.push(path),
                        Ok(_) if image_extension(&path).is_some() && path.is_file() => {
                            images.push(path)
                        }
                        Ok(_) => {}
                        Err(e) => tracing::debug!(path = %path.display(), error = %e, "cannot stat entry"),
                    }
                }
            }
        }

        Ok(Self::new(images))
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn images(&self) -> &[PathBuf] {
        &self.images
    }

    /// Uniformly random image, `None` when the catalog is empty.
    pub fn choose(&self) -> Option<&Path> {
        if self.images.is_empty() {
            return None;
        }
        let index = rand::thread_rng().gen_range(0..self.images.len());
        Some(&self.images[index])
    }
}
