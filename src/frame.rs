//! Captured frames and their on-disk encoding

use crate::errors::SkywatchError;
use chrono::{DateTime, Local};
use image::codecs::jpeg::JpegEncoder;
use image::{ImageFormat, ImageReader, RgbImage};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// A decoded capture, owned by the loop for one iteration
#[derive(Debug, Clone)]
pub struct Frame {
    pub image: RgbImage,
    pub captured_at: DateTime<Local>,
    pub filename: String,
    pub path: PathBuf,
}

impl Frame {
    /// Decode the file at `path`. The container format is sniffed from the
    /// content, so a mislabelled extension still decodes.
    pub fn open(
        path: &Path,
        filename: String,
        captured_at: DateTime<Local>,
    ) -> Result<Self, SkywatchError> {
        let image = decode_image(path)?;
        Ok(Self {
            image,
            captured_at,
            filename,
            path: path.to_path_buf(),
        })
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    /// Replace the pixels and rewrite the backing file.
    pub fn replace_image(&mut self, image: RgbImage, jpeg_quality: u8) -> Result<(), SkywatchError> {
        save_image(&image, &self.path, jpeg_quality)?;
        self.image = image;
        Ok(())
    }

    /// Remove the backing file
    pub fn discard(self) -> Result<(), SkywatchError> {
        std::fs::remove_file(&self.path)?;
        Ok(())
    }
}

/// Decode any supported image file to 8-bit RGB
pub fn decode_image(path: &Path) -> Result<RgbImage, SkywatchError> {
    let reader = ImageReader::open(path)
        .map_err(|e| SkywatchError::unreadable(path, e))?
        .with_guessed_format()
        .map_err(|e| SkywatchError::unreadable(path, e))?;
    let image = reader
        .decode()
        .map_err(|e| SkywatchError::unreadable(path, e))?;
    Ok(image.to_rgb8())
}

/// Write `image` to `path`, in the format its extension names. JPEG output
/// uses `jpeg_quality`.
///
/// The image is encoded into a temporary file beside `path` and renamed over
/// it, so a failed encode leaves any existing file untouched.
pub fn save_image(image: &RgbImage, path: &Path, jpeg_quality: u8) -> Result<(), SkywatchError> {
    let format = ImageFormat::from_path(path).unwrap_or(ImageFormat::Jpeg);
    let encode_error = |e: image::ImageError| {
        SkywatchError::Capture(format!("Failed to encode {}: {}", path.display(), e))
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        if format == ImageFormat::Jpeg {
            JpegEncoder::new_with_quality(&mut writer, jpeg_quality)
                .encode_image(image)
                .map_err(encode_error)?;
        } else {
            image.write_to(&mut writer, format).map_err(encode_error)?;
        }
        writer.flush()?;
    }
    tmp.as_file().sync_all()?;

    // Temp files are created owner-only; keep the mode of the file being replaced
    if let Ok(existing) = std::fs::metadata(path) {
        tmp.as_file().set_permissions(existing.permissions())?;
    }

    tmp.persist(path).map_err(|e| {
        SkywatchError::Capture(format!("Failed to replace {}: {}", path.display(), e.error))
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{checkerboard_frame, uniform_frame};

    #[test]
    fn test_decode_garbage_is_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("auto_broken.jpg");
        std::fs::write(&path, [0xFF, 0xD8, 0x00, 0x01]).unwrap();
        let err = decode_image(&path).unwrap_err();
        assert!(matches!(err, SkywatchError::UnreadableInput { .. }));
    }

    #[test]
    fn test_decode_missing_file_is_unreadable() {
        let err = decode_image(Path::new("/nonexistent/auto_0.jpg")).unwrap_err();
        assert!(matches!(err, SkywatchError::UnreadableInput { .. }));
    }

    #[test]
    fn test_png_round_trip_is_lossless() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.png");
        let image = checkerboard_frame(16, 12, 4);
        save_image(&image, &path, 95).unwrap();
        assert_eq!(decode_image(&path).unwrap(), image);
    }

    #[test]
    fn test_replace_image_rewrites_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("auto_1.jpg");
        save_image(&uniform_frame(40, 30, 120), &path, 95).unwrap();

        let mut frame = Frame::open(&path, "auto_1.jpg".to_string(), Local::now()).unwrap();
        assert_eq!(frame.dimensions(), (40, 30));
        frame.replace_image(uniform_frame(20, 10, 120), 95).unwrap();
        assert_eq!(decode_image(&path).unwrap().dimensions(), (20, 10));

        frame.discard().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn test_failed_encode_keeps_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("auto_1.ico");
        std::fs::write(&path, b"original").unwrap();

        // ICO cannot hold images wider than 256 pixels
        let err = save_image(&uniform_frame(300, 300, 120), &path, 95).unwrap_err();
        assert!(matches!(err, SkywatchError::Capture(_)));

        assert_eq!(std::fs::read(&path).unwrap(), b"original");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_rewrite_keeps_file_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("auto_2.jpg");
        save_image(&uniform_frame(40, 30, 120), &path, 95).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        save_image(&uniform_frame(20, 10, 120), &path, 95).unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o644);
        assert_eq!(decode_image(&path).unwrap().dimensions(), (20, 10));
    }
}
