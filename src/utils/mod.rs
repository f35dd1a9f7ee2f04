use crate::error::DiffError;
use image::{GrayImage, RgbImage};
use std::path::Path;

/// Decode an image file into an owned RGB buffer. Any read or decode problem
/// is reported as a [`DiffError::Decode`] carrying the offending path.
pub fn load_image(path: &Path) -> Result<RgbImage, DiffError> {
    let img = image::open(path).map_err(|source| DiffError::Decode {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(img.to_rgb8())
}

/// Encode an image to disk, format chosen from the file extension.
pub fn save_image(image: &RgbImage, path: &Path) -> Result<(), DiffError> {
    image.save(path).map_err(|source| DiffError::Encode {
        path: path.to_path_buf(),
        source,
    })
}

/// Validate that image dimensions fall within reasonable limits.
pub fn validate_image_size(image: &RgbImage, min_size: u32, max_size: u32) -> Result<(), DiffError> {
    let (width, height) = image.dimensions();

    if width < min_size || height < min_size {
        return Err(DiffError::ImageTooSmall {
            width,
            height,
            min: min_size,
        });
    }

    if width > max_size || height > max_size {
        return Err(DiffError::ImageTooLarge {
            width,
            height,
            max: max_size,
        });
    }

    Ok(())
}

/// Mean per-pixel absolute luminance difference, an alignment-quality metric.
/// Zero for identical images.
pub fn mean_absolute_difference(a: &GrayImage, b: &GrayImage) -> f64 {
    assert_eq!(a.dimensions(), b.dimensions());

    let total: u64 = a
        .as_raw()
        .iter()
        .zip(b.as_raw().iter())
        .map(|(&pa, &pb)| pa.abs_diff(pb) as u64)
        .sum();

    total as f64 / (a.width() as f64 * a.height() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn missing_file_is_a_decode_error() {
        let err = load_image(Path::new("/nonexistent/drawing.png")).unwrap_err();
        assert!(matches!(err, DiffError::Decode { .. }));
    }

    #[test]
    fn size_validation_limits() {
        let image = RgbImage::new(64, 64);
        assert!(validate_image_size(&image, 10, 10000).is_ok());
        assert!(matches!(
            validate_image_size(&image, 100, 10000),
            Err(DiffError::ImageTooSmall { .. })
        ));
        assert!(matches!(
            validate_image_size(&image, 10, 32),
            Err(DiffError::ImageTooLarge { .. })
        ));
    }

    #[test]
    fn mean_difference_of_identical_images_is_zero() {
        let image = GrayImage::from_pixel(16, 16, Luma([77]));
        assert_eq!(mean_absolute_difference(&image, &image), 0.0);
    }

    #[test]
    fn mean_difference_of_constant_offset() {
        let a = GrayImage::from_pixel(8, 8, Luma([100]));
        let b = GrayImage::from_pixel(8, 8, Luma([130]));
        assert_eq!(mean_absolute_difference(&a, &b), 30.0);
    }
}
