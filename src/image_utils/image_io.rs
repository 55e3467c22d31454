use crate::error::Result;
use image::{self, RgbImage};
use std::path::Path;

/// File extensions picked up when a folder of images is scanned.
pub const IMAGE_EXTENSIONS: [&str; 7] = ["bmp", "jpg", "jpeg", "png", "tif", "tiff", "webp"];

pub fn read_image_as_rgb8(filepath: &Path) -> Result<RgbImage> {
    Ok(image::open(filepath)?.into_rgb8())
}

pub fn has_image_extension(filepath: &Path) -> bool {
    filepath
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn write_test_image(dir: &Path) -> std::path::PathBuf {
        // 3x3: black row, red/green/blue row, white row.
        let mut img = RgbImage::new(3, 3);
        img.put_pixel(0, 1, Rgb([255, 0, 0]));
        img.put_pixel(1, 1, Rgb([0, 255, 0]));
        img.put_pixel(2, 1, Rgb([0, 0, 255]));
        for x in 0..3 {
            img.put_pixel(x, 2, Rgb([255, 255, 255]));
        }
        let path = dir.join("test_image.png");
        img.save(&path).unwrap();
        path
    }

    #[test]
    fn read_test_data_as_rgb8() {
        let dir = tempfile::tempdir().unwrap();
        let img = read_image_as_rgb8(&write_test_image(dir.path())).unwrap();
        assert_eq!(img.get_pixel(0, 0), &Rgb([0, 0, 0]));
        assert_eq!(img.get_pixel(0, 1), &Rgb([255, 0, 0]));
        assert_eq!(img.get_pixel(1, 1), &Rgb([0, 255, 0]));
        assert_eq!(img.get_pixel(2, 1), &Rgb([0, 0, 255]));
        assert_eq!(img.get_pixel(2, 2), &Rgb([255, 255, 255]));
    }

    #[test]
    fn unreadable_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"not a png").unwrap();
        assert!(read_image_as_rgb8(&path).is_err());
    }

    #[test]
    fn image_extensions_are_case_insensitive() {
        assert!(has_image_extension(Path::new("a/b/c.JPG")));
        assert!(has_image_extension(Path::new("c.tiff")));
        assert!(!has_image_extension(Path::new("c.txt")));
        assert!(!has_image_extension(Path::new("images")));
    }
}
