/// "Save Canvas" snapshots
///
/// The window is captured as raw RGBA by iced; this module turns the capture
/// into `<ID>_JADESView.png`.
use image::RgbaImage;
use log::info;
use std::path::{Path, PathBuf};

use super::RenderError;

/// Snapshot file name for an object.
pub fn snapshot_file_name(object_id: i64) -> String {
    format!("{}_JADESView.png", object_id)
}

/// Snapshot path for an object inside `dir`.
pub fn snapshot_path(dir: &Path, object_id: i64) -> PathBuf {
    dir.join(snapshot_file_name(object_id))
}

/// Wrap a captured RGBA buffer.
pub fn sheet_from_rgba(bytes: &[u8], width: u32, height: u32) -> Result<RgbaImage, RenderError> {
    RgbaImage::from_raw(width, height, bytes.to_vec()).ok_or(RenderError::SnapshotSize {
        len: bytes.len(),
        width,
        height,
    })
}

/// Write the sheet as PNG with an opaque white background.
pub fn save_sheet(sheet: &RgbaImage, path: &Path) -> Result<(), RenderError> {
    let mut opaque = sheet.clone();
    for pixel in opaque.pixels_mut() {
        let alpha = pixel[3] as u32;
        for c in 0..3 {
            pixel[c] = ((pixel[c] as u32 * alpha + 255 * (255 - alpha)) / 255) as u8;
        }
        pixel[3] = 255;
    }
    opaque.save_with_format(path, image::ImageFormat::Png)?;
    info!("💾 Saved canvas to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    #[test]
    fn test_file_name() {
        assert_eq!(snapshot_file_name(20178), "20178_JADESView.png");
        assert_eq!(
            snapshot_path(Path::new("/tmp/out"), 7),
            PathBuf::from("/tmp/out/7_JADESView.png")
        );
    }

    #[test]
    fn test_buffer_size_checked() {
        assert!(sheet_from_rgba(&[0; 16], 2, 2).is_ok());
        assert!(matches!(
            sheet_from_rgba(&[0; 15], 2, 2),
            Err(RenderError::SnapshotSize { len: 15, .. })
        ));
    }

    #[test]
    fn test_save_flattens_alpha() {
        let dir = tempfile::tempdir().unwrap();
        let path = snapshot_path(dir.path(), 101);

        let mut sheet = RgbaImage::new(2, 1);
        sheet.put_pixel(0, 0, Rgba([10, 20, 30, 255]));
        save_sheet(&sheet, &path).unwrap();

        let back = image::open(&path).unwrap().to_rgba8();
        assert_eq!(back.get_pixel(0, 0), &Rgba([10, 20, 30, 255]));
        assert_eq!(back.get_pixel(1, 0), &Rgba([255, 255, 255, 255]));
    }
}
