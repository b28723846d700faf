use std::fs;
use std::path::Path;

use image::buffer::ConvertBuffer;
use image::{ImageFormat, RgbImage, RgbaImage};

use crate::error::{Error, Result};

/// Side length of a compute work-group.
pub const WORKGROUP_SIZE: u32 = 16;

/// Largest width or height of a Metal 2D texture.
pub const MAX_TEXTURE_SIZE: u32 = 16384;

// Loads an image as 8-bit RGB, whatever its channel count on disk
pub fn load_image(path: &Path) -> Result<RgbImage> {
    let img = image::open(path).map_err(|source| Error::ImageLoad {
        path: path.to_path_buf(),
        source,
    })?;
    let img = img.to_rgb8();
    if img.width() == 0 || img.height() == 0 {
        return Err(Error::EmptyImage(path.to_path_buf()));
    }
    Ok(img)
}

/// Expands to RGBA with an opaque alpha channel for upload.
pub fn to_rgba(image: &RgbImage) -> RgbaImage {
    image.convert()
}

/// Rejects sizes the GPU cannot allocate a texture for.
pub fn check_texture_size(width: u32, height: u32) -> Result<()> {
    if width > MAX_TEXTURE_SIZE || height > MAX_TEXTURE_SIZE {
        return Err(Error::ImageTooLarge {
            width,
            height,
            limit: MAX_TEXTURE_SIZE,
        });
    }
    Ok(())
}

pub fn save_image(image: &RgbaImage, path: &Path) -> Result<()> {
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(|source| Error::CreateDir {
            path: dir.to_path_buf(),
            source,
        })?;
    }
    image
        .save_with_format(path, ImageFormat::Png)
        .map_err(|source| Error::ImageSave {
            path: path.to_path_buf(),
            source,
        })
}

/// Number of work-groups needed to cover a `width` x `height` image.
pub fn workgroup_grid(width: u32, height: u32) -> (u32, u32) {
    (
        width.div_ceil(WORKGROUP_SIZE),
        height.div_ceil(WORKGROUP_SIZE),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, Rgba};

    #[test]
    fn grid_rounds_up_to_whole_tiles() {
        assert_eq!(workgroup_grid(1, 1), (1, 1));
        assert_eq!(workgroup_grid(16, 16), (1, 1));
        assert_eq!(workgroup_grid(17, 33), (2, 3));
        assert_eq!(workgroup_grid(1920, 1080), (120, 68));
    }

    #[test]
    fn load_drops_alpha() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("in.png");
        let src = RgbaImage::from_fn(3, 2, |x, y| Rgba([x as u8 * 10, y as u8 * 20, 7, 9]));
        src.save(&path).unwrap();

        let img = load_image(&path).unwrap();
        assert_eq!(img.dimensions(), (3, 2));
        assert_eq!(*img.get_pixel(2, 1), Rgb([20, 20, 7]));
    }

    #[test]
    fn load_rejects_empty_image() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("e.ppm");
        fs::write(&path, b"P6\n0 0\n255\n").unwrap();

        match load_image(&path).unwrap_err() {
            Error::EmptyImage(p) => assert_eq!(p, path),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn texture_size_limit() {
        assert!(check_texture_size(1, 1).is_ok());
        assert!(check_texture_size(MAX_TEXTURE_SIZE, MAX_TEXTURE_SIZE).is_ok());
        for (w, h) in [(20000, 100), (100, MAX_TEXTURE_SIZE + 1)] {
            match check_texture_size(w, h).unwrap_err() {
                Error::ImageTooLarge { width, height, limit } => {
                    assert_eq!((width, height, limit), (w, h, MAX_TEXTURE_SIZE));
                }
                other => panic!("unexpected {other:?}"),
            }
        }
    }

    #[test]
    fn load_missing_file_reports_path() {
        let err = load_image(Path::new("does/not/exist.png")).unwrap_err();
        match err {
            Error::ImageLoad { path, .. } => assert_eq!(path, Path::new("does/not/exist.png")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn rgba_is_opaque() {
        let rgb = RgbImage::from_pixel(4, 4, Rgb([1, 2, 3]));
        let rgba = to_rgba(&rgb);
        assert!(rgba.pixels().all(|p| *p == Rgba([1, 2, 3, 255])));
    }

    #[test]
    fn save_creates_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out.png");
        let img = RgbaImage::from_pixel(5, 3, Rgba([200, 100, 50, 255]));

        save_image(&img, &path).unwrap();

        let back = image::open(&path).unwrap().to_rgba8();
        assert_eq!(back, img);
    }
}
