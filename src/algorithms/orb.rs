use crate::config::DetectorConfig;
use image::{imageops, GrayImage};
use imageproc::corners::corners_fast9;
use imageproc::filter::gaussian_blur_f32;
use rayon::prelude::*;
use std::cmp::Ordering;

/// A detected keypoint in level-0 image coordinates.
#[derive(Debug, Clone, Copy)]
pub struct Keypoint {
    pub x: f32,
    pub y: f32,
    pub response: f32,
    pub angle: f32,
    pub octave: u8,
    pub scale: f32,
}

/// Keypoint plus its 256-bit binary descriptor.
#[derive(Debug, Clone)]
pub struct Feature {
    pub keypoint: Keypoint,
    pub descriptor: [u8; 32],
}

/// Scale- and rotation-tolerant corner detector: FAST-9 over an image
/// pyramid, intensity-centroid orientation, rotated binary descriptors
/// sampled from a fixed test pattern on a smoothed copy of each level.
///
/// Detection carries no randomness, so identical pixels and configuration
/// always produce identical features.
pub struct OrbDetector {
    config: DetectorConfig,
}

// Fixed 256-pair descriptor test pattern within a 31x31 patch
// (learned offsets, same table across all levels and images).
const ORB_PATTERN: [(i8, i8, i8, i8); 256] = [
    (8, -3, 9, 5), (-11, 9, -8, 2), (3, -12, -13, 2), (-3, -7, -4, 5),
    (1, -11, 12, -2), (1, -1, 11, -1), (4, -2, -5, -8), (2, -13, -8, 9),
    (-11, 1, 6, 2), (11, 11, 12, -1), (6, -12, -9, -8), (12, 5, 3, -6),
    (1, 1, -4, -1), (7, -4, -6, 7), (-3, 2, 9, -8), (-4, -8, 3, 3),
    (-5, 3, 0, -4), (2, -11, -13, 0), (10, 5, 5, 2), (0, 9, 10, -3),
    (5, -8, -10, 1), (8, 3, -8, -5), (2, -6, -9, -4), (-12, 2, 0, -10),
    (5, -10, -7, -2), (-7, 9, -1, 0), (0, -1, -3, 3), (-12, 5, -2, -1),
    (-1, 1, -5, -11), (-1, 2, -3, 0), (-5, -6, 7, -1), (4, 7, 0, -8),
    (-9, 9, 3, -13), (7, -3, 13, -7), (10, -4, -5, 3), (6, 1, -13, -13),
    (-12, -11, 7, 0), (0, -1, -8, -6), (-10, -5, -6, 7), (10, 2, -6, -12),
    (-11, 8, 4, -2), (9, 0, -11, -4), (0, 11, 6, -11), (4, 1, -10, -3),
    (-6, 12, 1, 12), (-4, -8, 8, -7), (-3, 0, 8, 3), (3, 3, -3, -1),
    (-6, -11, -2, 12), (0, -3, -6, -3), (-6, 3, -12, -8), (6, 3, -2, -10),
    (-3, -10, -1, 0), (11, 2, 11, 3), (1, -8, -10, 8), (2, -2, -7, 8),
    (0, -13, 13, 0), (6, -9, -1, -1), (7, 5, 6, 3), (-13, 7, -7, -7),
    (-5, -13, 5, -11), (6, 7, -2, 12), (-6, -11, 8, 6), (-2, -2, -5, 9),
    (5, 4, 7, -6), (0, 11, -4, -5), (10, 1, 2, -8), (-3, -10, -10, -10),
    (1, 9, 6, -5), (-7, -11, 11, 3), (11, -2, -4, 3), (7, -1, 5, 12),
    (-5, 5, -2, -5), (8, -11, -1, -13), (-13, 2, -11, -8), (-2, 9, 5, 0),
    (2, -5, 2, 0), (3, -13, -12, 9), (6, -3, 5, 4), (10, 10, 1, -9),
    (-13, -8, -4, 10), (2, -2, -3, 8), (-13, -11, -8, -3), (2, -4, -7, -3),
    (12, 0, -2, 13), (-11, 7, -10, -1), (-5, -10, 0, -11), (6, 7, 12, -3),
    (-1, -1, 8, -6), (-6, 3, -1, -3), (-2, -11, -11, -3), (12, -2, 3, -10),
    (-11, -1, -2, -8), (3, -1, 7, 3), (2, -2, -12, 12), (6, -4, 12, -2),
    (-3, 11, 2, -12), (-1, 3, 2, 3), (1, 3, -11, -3), (2, -8, -7, -5),
    (0, -5, -11, -6), (-12, 8, -2, 9), (3, -7, 9, -8), (-10, -6, -1, -11),
    (11, -6, -3, -13), (3, 0, 0, -8), (-5, -2, -1, -13), (-8, -5, -10, -13),
    (7, -13, 0, -3), (1, -4, -1, -13), (6, -5, -7, 8), (8, 7, -5, -13),
    (2, 0, -8, -6), (-8, -3, -13, -6), (-6, 5, 0, 6), (-8, 8, -9, 1),
    (10, 1, -9, 4), (-4, -8, -5, 7), (7, 7, 10, -8), (-7, -3, -1, 1),
    (10, -1, 3, 1), (5, 6, -10, -8), (-6, -13, 5, -8), (4, -3, -4, -13),
    (-3, 4, -2, -13), (10, -11, 9, 11), (-9, 0, 12, 2), (-4, -2, 13, -6),
    (2, -10, -6, 1), (11, -13, 4, -13), (1, -1, 1, 9), (1, -5, -13, -5),
    (7, 4, 12, -7), (0, -2, -8, 3), (7, 2, 2, -8), (-2, 7, -12, -4),
    (1, 11, 6, -2), (-1, -1, -4, 10), (0, 8, 0, -13), (3, 12, 5, -13),
    (-9, -1, 9, -13), (12, 4, -6, -4), (-13, 13, 1, -4), (0, -2, -7, -9),
    (10, -8, -13, 3), (2, -13, 6, 8), (10, -6, -7, 0), (-11, 7, -1, -7),
    (12, 0, 5, -4), (-7, -8, 4, -12), (-13, 5, -5, -2), (0, 5, 4, 4),
    (-2, -11, -1, 8), (9, 3, -1, -12), (0, 6, -10, 12), (1, -8, -7, -10),
    (-6, 4, -6, 3), (5, 1, -3, -9), (-6, 6, -6, 3), (7, -8, 1, -7),
    (3, 8, -9, -5), (2, -4, 5, 7), (11, 4, 6, -3), (-8, -1, 11, -1),
    (-3, -6, -10, -8), (2, 7, 3, -12), (-4, -10, 12, -3), (1, -2, -4, 6),
    (3, 11, -11, 0), (-6, 2, 3, -8), (6, 12, 0, -13), (3, 2, -2, -5),
    (-4, 1, -6, 5), (-12, 0, -13, 9), (-6, 2, 7, -8), (-2, -4, -6, 5),
    (0, 0, 0, -13), (9, -13, -2, 0), (3, -13, 5, -12), (10, 11, -13, -13),
    (-2, 3, -12, 3), (11, 7, -7, 0), (12, 2, 1, -13), (12, -11, 12, -8),
    (-7, -2, -4, -7), (7, 5, -1, -13), (-5, -8, -9, 10), (6, 0, -3, -13),
    (12, 4, -13, 1), (-7, 8, 8, -3), (10, -4, 0, -13), (2, 1, -7, 0),
    (-5, 4, 2, -8), (12, 8, 4, -13), (8, 7, -10, 0), (-3, 6, -2, 4),
    (-5, -1, -8, -12), (4, -1, -2, -10), (6, -4, -13, 9), (-7, 8, -6, -12),
    (-10, 2, -13, 10), (-1, -7, 0, 2), (-5, 6, -5, -12), (6, -13, 7, -3),
    (-13, 2, -1, 8), (2, 8, -13, 0), (-6, -9, 1, -4), (-9, 13, 0, -13),
    (-2, -3, 8, 0), (4, 0, -11, 12), (0, 3, -10, 10), (-6, -9, -3, -2),
    (9, -4, -6, 2), (5, 0, -13, -10), (-3, -8, -13, 3), (-12, -1, -4, -2),
    (7, -9, -4, 3), (-8, -4, 1, 11), (11, 6, 2, -12), (6, 6, -8, 12),
    (-3, -8, 2, -10), (2, 5, -8, 8), (-9, 8, -6, -8), (-4, 0, -11, -7),
    (7, 6, -3, 8), (-5, 7, -12, 5), (2, -8, -5, 1), (0, 4, -5, -3),
    (9, -9, -6, -12), (0, -13, 0, -13), (-7, -11, -3, -13), (6, -12, -7, 10),
    (6, -8, -13, 7), (8, 7, -11, -1), (-11, -5, -6, 9), (6, 4, 2, -13),
    (-1, -6, 3, -9), (1, -4, 4, -3), (-6, 8, -12, 0), (-11, 3, -6, 2),
    (7, -10, 11, -6), (5, 0, 12, -13), (4, -8, 1, -1), (-13, 12, -6, 3),
    (1, 4, -9, -2), (-8, -12, -8, 7), (-9, 5, 0, -5), (9, 7, 5, 3),
    (-12, -2, 8, -8), (3, 7, 12, -8), (-13, 3, -1, -1), (-10, -4, -10, 12),
    (5, -2, 0, 13), (-7, 1, -12, 8), (2, 9, -5, -11), (11, -13, 0, 2),
];

impl Default for OrbDetector {
    fn default() -> Self {
        Self::new(DetectorConfig::default())
    }
}

impl OrbDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self { config }
    }

    /// Detect keypoints and descriptors across the image pyramid, keeping at
    /// most `max_features` of the strongest responses. An empty result means
    /// the image has too little texture (or is too small) for registration.
    pub fn detect(&self, image: &GrayImage) -> Vec<Feature> {
        let pyramid = self.build_pyramid(image);

        let level_features: Vec<Vec<Feature>> = pyramid
            .par_iter()
            .enumerate()
            .map(|(octave, (level_image, scale))| {
                self.extract_level_features(level_image, octave as u8, *scale)
            })
            .collect();

        let mut all_features = Vec::new();
        for features in level_features {
            all_features.extend(features);
        }

        self.retain_best_features(all_features)
    }

    fn build_pyramid(&self, image: &GrayImage) -> Vec<(GrayImage, f32)> {
        let mut pyramid = Vec::with_capacity(self.config.pyramid_levels as usize);
        pyramid.push((image.clone(), 1.0));

        let mut current_image = image.clone();
        let mut current_scale = 1.0;

        for _ in 1..self.config.pyramid_levels {
            let new_width = (current_image.width() as f32 / self.config.scale_factor) as u32;
            let new_height = (current_image.height() as f32 / self.config.scale_factor) as u32;

            // Levels smaller than the descriptor patch carry no usable corners.
            if new_width < 2 * self.config.edge_threshold
                || new_height < 2 * self.config.edge_threshold
            {
                break;
            }

            current_scale *= self.config.scale_factor;
            current_image = imageops::resize(
                &current_image,
                new_width,
                new_height,
                imageops::FilterType::Gaussian,
            );

            pyramid.push((current_image.clone(), current_scale));
        }

        pyramid
    }

    fn extract_level_features(&self, image: &GrayImage, octave: u8, scale: f32) -> Vec<Feature> {
        let margin = self.config.edge_threshold;
        if image.width() <= 2 * margin || image.height() <= 2 * margin {
            return Vec::new();
        }

        let mut corners: Vec<Keypoint> = corners_fast9(image, self.config.fast_threshold)
            .into_iter()
            .filter(|c| {
                c.x >= margin
                    && c.y >= margin
                    && c.x < image.width() - margin
                    && c.y < image.height() - margin
            })
            .map(|c| Keypoint {
                x: c.x as f32,
                y: c.y as f32,
                response: c.score,
                angle: 0.0,
                octave,
                scale,
            })
            .collect();

        corners = self.non_maximum_suppression_grid(corners);

        let smoothed = gaussian_blur_f32(image, self.config.descriptor_sigma);

        corners
            .par_iter()
            .map(|corner| {
                let mut keypoint = *corner;
                keypoint.angle =
                    compute_keypoint_orientation(image, corner.x as u32, corner.y as u32);

                let descriptor = compute_descriptor(&smoothed, &keypoint);

                // Report the location in level-0 coordinates.
                keypoint.x *= scale;
                keypoint.y *= scale;

                Feature {
                    keypoint,
                    descriptor,
                }
            })
            .collect()
    }

    /// Grid-based non-maximum suppression: strongest response claims each
    /// cell, later corners landing in an occupied 3x3 neighbourhood are
    /// dropped.
    fn non_maximum_suppression_grid(&self, mut corners: Vec<Keypoint>) -> Vec<Keypoint> {
        if corners.is_empty() {
            return corners;
        }

        corners.par_sort_by(|a, b| {
            b.response
                .partial_cmp(&a.response)
                .unwrap_or(Ordering::Equal)
        });

        let mut selected = Vec::new();
        let mut occupied = std::collections::HashSet::new();

        for corner in corners {
            let grid_x = (corner.x / self.config.nms_radius) as i32;
            let grid_y = (corner.y / self.config.nms_radius) as i32;

            let mut is_maximum = true;
            'grid: for dy in -1..=1 {
                for dx in -1..=1 {
                    if occupied.contains(&(grid_x + dx, grid_y + dy)) {
                        is_maximum = false;
                        break 'grid;
                    }
                }
            }

            if is_maximum {
                occupied.insert((grid_x, grid_y));
                selected.push(corner);
                if selected.len() >= self.config.max_features {
                    break;
                }
            }
        }

        selected
    }

    fn retain_best_features(&self, mut features: Vec<Feature>) -> Vec<Feature> {
        features.par_sort_by(|a, b| {
            b.keypoint
                .response
                .partial_cmp(&a.keypoint.response)
                .unwrap_or(Ordering::Equal)
        });

        features.truncate(self.config.max_features);
        features
    }
}

/// Intensity-centroid orientation: the angle of the first-moment vector over
/// a circular patch around the keypoint.
fn compute_keypoint_orientation(image: &GrayImage, x: u32, y: u32) -> f32 {
    let radius: i32 = 15;
    let mut m01 = 0.0;
    let mut m10 = 0.0;

    for dy in -radius..=radius {
        for dx in -radius..=radius {
            let px = x as i32 + dx;
            let py = y as i32 + dy;

            if px >= 0 && py >= 0 && (px as u32) < image.width() && (py as u32) < image.height() {
                let distance_sq = dx * dx + dy * dy;
                if distance_sq <= radius * radius {
                    let intensity = image.get_pixel(px as u32, py as u32)[0] as f32;
                    m01 += intensity * dy as f32;
                    m10 += intensity * dx as f32;
                }
            }
        }
    }

    m01.atan2(m10)
}

/// Sample the rotated test pattern around the keypoint on the smoothed level
/// image. Coordinates are clamped at the borders; the edge margin keeps that
/// from dominating any descriptor.
fn compute_descriptor(image: &GrayImage, keypoint: &Keypoint) -> [u8; 32] {
    let mut descriptor = [0u8; 32];
    let x = keypoint.x as i32;
    let y = keypoint.y as i32;
    let cos_angle = keypoint.angle.cos();
    let sin_angle = keypoint.angle.sin();

    for (byte_idx, byte_tests) in ORB_PATTERN.chunks(8).enumerate() {
        let mut byte_val = 0u8;

        for (bit_idx, &(dx1, dy1, dx2, dy2)) in byte_tests.iter().enumerate() {
            let rx1 = (dx1 as f32 * cos_angle - dy1 as f32 * sin_angle) as i32;
            let ry1 = (dx1 as f32 * sin_angle + dy1 as f32 * cos_angle) as i32;
            let rx2 = (dx2 as f32 * cos_angle - dy2 as f32 * sin_angle) as i32;
            let ry2 = (dx2 as f32 * sin_angle + dy2 as f32 * cos_angle) as i32;

            let p1_x = (x + rx1).clamp(0, image.width() as i32 - 1) as u32;
            let p1_y = (y + ry1).clamp(0, image.height() as i32 - 1) as u32;
            let p2_x = (x + rx2).clamp(0, image.width() as i32 - 1) as u32;
            let p2_y = (y + ry2).clamp(0, image.height() as i32 - 1) as u32;

            let intensity1 = image.get_pixel(p1_x, p1_y)[0];
            let intensity2 = image.get_pixel(p2_x, p2_y)[0];

            if intensity1 < intensity2 {
                byte_val |= 1 << bit_idx;
            }
        }

        descriptor[byte_idx] = byte_val;
    }

    descriptor
}
