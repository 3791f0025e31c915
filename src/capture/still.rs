//! Still image sources for single-shot decoding.

use super::{Frame, SourceError};
use std::path::{Path, PathBuf};

/// Something that can be turned into exactly one frame.
pub trait ImageSource {
    /// Loads the image as a grayscale frame.
    fn load(&mut self) -> Result<Frame, SourceError>;
}

impl ImageSource for Frame {
    fn load(&mut self) -> Result<Frame, SourceError> {
        if !self.is_valid() {
            return Err(SourceError::Unreadable(format!(
                "{} bytes for {}x{} frame",
                self.pixels().len(),
                self.width(),
                self.height()
            )));
        }
        Ok(self.clone())
    }
}

/// An image file on disk, decoded with the `image` crate.
#[derive(Debug, Clone)]
pub struct ImageFile {
    path: PathBuf,
}

impl ImageFile {
    /// Refers to the image at `path`; nothing is read until `load`.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Returns the file path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ImageSource for ImageFile {
    fn load(&mut self) -> Result<Frame, SourceError> {
        let image = image::open(&self.path).map_err(|e| match e {
            image::ImageError::IoError(io) if io.kind() == std::io::ErrorKind::NotFound => {
                SourceError::DeviceNotFound(self.path.display().to_string())
            }
            image::ImageError::IoError(io)
                if io.kind() == std::io::ErrorKind::PermissionDenied =>
            {
                SourceError::PermissionDenied(self.path.display().to_string())
            }
            other => SourceError::Unreadable(format!("{}: {}", self.path.display(), other)),
        })?;

        tracing::debug!(
            path = %self.path.display(),
            width = image.width(),
            height = image.height(),
            "Loaded still image"
        );
        Ok(Frame::from_luma(image.to_luma8(), 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_not_found() {
        let mut file = ImageFile::new("/definitely/not/here.png");
        assert!(matches!(file.load(), Err(SourceError::DeviceNotFound(_))));
    }

    #[test]
    fn test_invalid_frame_is_unreadable() {
        let mut frame = Frame::new(vec![0u8; 3], 4, 4, 1);
        assert!(matches!(frame.load(), Err(SourceError::Unreadable(_))));
    }

    #[test]
    fn test_png_roundtrip_through_disk() {
        let path = std::env::temp_dir().join(format!(
            "symbol-scanner-still-{}.png",
            std::process::id()
        ));
        image::GrayImage::from_pixel(6, 5, image::Luma([42u8]))
            .save(&path)
            .unwrap();

        let frame = ImageFile::new(&path).load().unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!((frame.width(), frame.height()), (6, 5));
        assert_eq!(frame.luma(0, 0), 42);
    }
}
