//! Scanned page images: discovery and vertical merge

use std::fs;
use std::path::{Path, PathBuf};

use image::{ImageFormat, Rgb, RgbImage};
use tracing::{debug, info};

use crate::error::{Error, Result};

pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "gif", "tiff"];

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Image files directly inside `dir`, sorted by file name
pub fn discover_images(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|source| Error::IoRead {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut images = Vec::new();
    for entry in entries {
        let path = entry
            .map_err(|source| Error::IoRead { path: dir.to_path_buf(), source })?
            .path();
        if path.is_file() && is_image(&path) {
            images.push(path);
        }
    }

    if images.is_empty() {
        return Err(Error::empty_input(
            dir,
            format!("no image files found (expected one of: {})", IMAGE_EXTENSIONS.join(", ")),
        ));
    }

    images.sort();
    debug!(dir = %dir.display(), count = images.len(), "Discovered page images");
    Ok(images)
}

/// Stack images top to bottom, each centered horizontally on a white canvas
pub fn merge_vertical(paths: &[PathBuf]) -> Result<RgbImage> {
    let mut pages = Vec::with_capacity(paths.len());
    for path in paths {
        let page = image::open(path)
            .map_err(|e| Error::ImageDecode {
                path: path.clone(),
                message: e.to_string(),
            })?
            .to_rgb8();
        pages.push(page);
    }

    let width = pages.iter().map(|p| p.width()).max().unwrap_or(0);
    let height: u32 = pages.iter().map(|p| p.height()).sum();
    if width == 0 || height == 0 {
        return Err(Error::empty_input(
            paths.first().cloned().unwrap_or_default(),
            "images have no pixels",
        ));
    }

    let mut canvas = RgbImage::from_pixel(width, height, Rgb([255, 255, 255]));
    let mut y = 0i64;
    for page in &pages {
        let x = i64::from((width - page.width()) / 2);
        image::imageops::replace(&mut canvas, page, x, y);
        y += i64::from(page.height());
    }
    Ok(canvas)
}

/// Merge `paths` into one PNG at `output`
pub fn merge_to_png(paths: &[PathBuf], output: &Path) -> Result<u64> {
    let canvas = merge_vertical(paths)?;
    canvas
        .save_with_format(output, ImageFormat::Png)
        .map_err(|e| Error::IoWrite {
            path: output.to_path_buf(),
            source: std::io::Error::other(e.to_string()),
        })?;

    let size = fs::metadata(output)
        .map_err(|source| Error::IoRead { path: output.to_path_buf(), source })?
        .len();
    info!(
        pages = paths.len(),
        width = canvas.width(),
        height = canvas.height(),
        bytes = size,
        "Page images merged"
    );
    Ok(size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_png(path: &Path, w: u32, h: u32, color: [u8; 3]) {
        RgbImage::from_pixel(w, h, Rgb(color)).save(path).unwrap();
    }

    #[test]
    fn test_discovery_is_sorted_and_case_insensitive() {
        let dir = TempDir::new().unwrap();
        write_png(&dir.path().join("b.PNG"), 2, 2, [0, 0, 0]);
        write_png(&dir.path().join("a.png"), 2, 2, [0, 0, 0]);
        fs::write(dir.path().join("notes.txt"), "x").unwrap();
        fs::write(dir.path().join("c.JPEG"), "not really").unwrap();

        let found = discover_images(dir.path()).unwrap();
        let names: Vec<_> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["a.png", "b.PNG", "c.JPEG"]);
    }

    #[test]
    fn test_no_images_is_empty_input() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("readme.md"), "x").unwrap();
        assert!(matches!(discover_images(dir.path()), Err(Error::EmptyInput { .. })));
    }

    #[test]
    fn test_merge_stacks_and_centers() {
        let dir = TempDir::new().unwrap();
        let wide = dir.path().join("1.png");
        let narrow = dir.path().join("2.png");
        write_png(&wide, 4, 2, [10, 10, 10]);
        write_png(&narrow, 2, 3, [200, 0, 0]);

        let merged = merge_vertical(&[wide, narrow]).unwrap();
        assert_eq!((merged.width(), merged.height()), (4, 5));
        // narrow page sits in columns 1..3, white margin around it
        assert_eq!(merged.get_pixel(0, 3), &Rgb([255, 255, 255]));
        assert_eq!(merged.get_pixel(1, 3), &Rgb([200, 0, 0]));
        assert_eq!(merged.get_pixel(0, 0), &Rgb([10, 10, 10]));
    }

    #[test]
    fn test_undecodable_image() {
        let dir = TempDir::new().unwrap();
        let bad = dir.path().join("bad.png");
        fs::write(&bad, "not a png").unwrap();
        assert!(matches!(merge_vertical(&[bad]), Err(Error::ImageDecode { .. })));
    }

    #[test]
    fn test_merge_to_png_writes_file() {
        let dir = TempDir::new().unwrap();
        let page = dir.path().join("p.png");
        write_png(&page, 3, 3, [1, 2, 3]);
        let out = dir.path().join("merged.png");
        let size = merge_to_png(&[page], &out).unwrap();
        assert!(size > 0);
        assert_eq!(image::open(&out).unwrap().width(), 3);
    }
}
