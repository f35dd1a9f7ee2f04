use crate::config::DiffConfig;
use crate::error::DiffError;
use crate::pipeline::{DetectionResult, DiffRegion};
use image::{imageops, GrayImage, Rgb, RgbImage};
use imageproc::contours::{find_contours, BorderType, Contour};
use imageproc::distance_transform::Norm;
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::filter::gaussian_blur_f32;
use imageproc::morphology::dilate;
use imageproc::point::Point;
use imageproc::rect::Rect;
use instant::Instant;
use tracing::debug;

/// Robust pixel-difference change detector: smoothed luminance difference,
/// fixed binarization, dilation to merge nearby fragments, outer-contour
/// extraction with an area filter, and bounding-box annotation.
pub struct ChangeDetector {
    config: DiffConfig,
}

impl Default for ChangeDetector {
    fn default() -> Self {
        Self::new(DiffConfig::default())
    }
}

impl ChangeDetector {
    pub fn new(config: DiffConfig) -> Self {
        Self { config }
    }

    /// Compare the reference image against the (best-effort aligned)
    /// secondary image. Both inputs must share dimensions; zero retained
    /// regions is a valid outcome.
    pub fn detect(
        &self,
        reference: &RgbImage,
        aligned: &RgbImage,
    ) -> Result<DetectionResult, DiffError> {
        if reference.dimensions() != aligned.dimensions() {
            return Err(DiffError::DimensionMismatch {
                expected_width: reference.width(),
                expected_height: reference.height(),
                actual_width: aligned.width(),
                actual_height: aligned.height(),
            });
        }

        let start = Instant::now();

        let mut reference_gray = imageops::grayscale(reference);
        let mut aligned_gray = imageops::grayscale(aligned);

        if self.config.blur_kernel > 1 {
            let sigma = sigma_for_kernel(self.config.blur_kernel);
            reference_gray = gaussian_blur_f32(&reference_gray, sigma);
            aligned_gray = gaussian_blur_f32(&aligned_gray, sigma);
        }

        let difference = absolute_difference(&reference_gray, &aligned_gray);
        let mut mask = binarize(&difference, self.config.threshold);

        let radius = (self.config.dilate_kernel / 2) as u8;
        for _ in 0..self.config.dilate_iterations {
            mask = dilate(&mask, Norm::LInf, radius);
        }

        let regions: Vec<DiffRegion> = find_contours::<i32>(&mask)
            .iter()
            .filter(|contour| contour.border_type == BorderType::Outer && contour.parent.is_none())
            .filter_map(|contour| self.region_from_contour(contour))
            .collect();

        let mut annotated = aligned.clone();
        for region in &regions {
            self.draw_region(&mut annotated, region);
        }

        debug!(
            regions = regions.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "change detection finished"
        );

        Ok(DetectionResult { annotated, regions })
    }

    fn region_from_contour(&self, contour: &Contour<i32>) -> Option<DiffRegion> {
        let area = polygon_area(&contour.points);
        if area <= self.config.min_region_area {
            return None;
        }

        let min_x = contour.points.iter().map(|p| p.x).min()?;
        let max_x = contour.points.iter().map(|p| p.x).max()?;
        let min_y = contour.points.iter().map(|p| p.y).min()?;
        let max_y = contour.points.iter().map(|p| p.y).max()?;

        Some(DiffRegion {
            x: min_x,
            y: min_y,
            width: (max_x - min_x + 1) as u32,
            height: (max_y - min_y + 1) as u32,
            area,
        })
    }

    fn draw_region(&self, canvas: &mut RgbImage, region: &DiffRegion) {
        let color = Rgb(self.config.highlight);
        // imageproc rectangles are one pixel wide, so a thicker stroke is a
        // set of nested outlines growing outward.
        for i in 0..self.config.stroke_width as i32 {
            let rect = Rect::at(region.x - i, region.y - i)
                .of_size(region.width + 2 * i as u32, region.height + 2 * i as u32);
            draw_hollow_rect_mut(canvas, rect, color);
        }
    }
}

/// Sigma the way OpenCV derives it from a fixed kernel size when none is
/// given: `0.3 * ((k - 1) / 2 - 1) + 0.8`.
fn sigma_for_kernel(kernel: u32) -> f32 {
    0.3 * ((kernel as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

fn absolute_difference(a: &GrayImage, b: &GrayImage) -> GrayImage {
    GrayImage::from_fn(a.width(), a.height(), |x, y| {
        let pa = a.get_pixel(x, y)[0];
        let pb = b.get_pixel(x, y)[0];
        image::Luma([pa.abs_diff(pb)])
    })
}

fn binarize(difference: &GrayImage, threshold: u8) -> GrayImage {
    GrayImage::from_fn(difference.width(), difference.height(), |x, y| {
        if difference.get_pixel(x, y)[0] > threshold {
            image::Luma([255u8])
        } else {
            image::Luma([0u8])
        }
    })
}

/// Shoelace area of the traced boundary polygon.
fn polygon_area(points: &[Point<i32>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }

    let mut doubled: i64 = 0;
    for i in 0..points.len() {
        let p = points[i];
        let q = points[(i + 1) % points.len()];
        doubled += p.x as i64 * q.y as i64 - q.x as i64 * p.y as i64;
    }

    (doubled.abs() as f64) / 2.0
}
