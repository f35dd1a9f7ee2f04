use crate::algorithms::{estimate_homography, match_descriptors, select_good_matches, Homography, OrbDetector};
use crate::config::{Config, DetectorConfig, MatcherConfig, RansacConfig};
use crate::pipeline::AlignmentFailure;
use image::{imageops, Rgb, RgbImage};
use imageproc::geometric_transformations::{warp_into, Interpolation, Projection};
use instant::Instant;
use tracing::debug;

/// Registers a secondary image onto a reference image's coordinate frame via
/// sparse feature matching and a robust projective-transform estimate.
///
/// Every failure mode is an [`AlignmentFailure`], never a panic; callers are
/// expected to fall back to the unaligned secondary image.
pub struct Aligner {
    detector: OrbDetector,
    matcher: MatcherConfig,
    ransac: RansacConfig,
}

impl Default for Aligner {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl Aligner {
    pub fn new(detector: DetectorConfig, matcher: MatcherConfig, ransac: RansacConfig) -> Self {
        Self {
            detector: OrbDetector::new(detector),
            matcher,
            ransac,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.detector.clone(),
            config.matcher.clone(),
            config.ransac.clone(),
        )
    }

    /// Estimate the transform mapping `secondary` coordinates onto the
    /// `reference` frame.
    pub fn estimate(
        &self,
        reference: &RgbImage,
        secondary: &RgbImage,
    ) -> Result<Homography, AlignmentFailure> {
        let start = Instant::now();

        let reference_gray = imageops::grayscale(reference);
        let secondary_gray = imageops::grayscale(secondary);

        let reference_features = self.detector.detect(&reference_gray);
        let secondary_features = self.detector.detect(&secondary_gray);
        debug!(
            reference = reference_features.len(),
            secondary = secondary_features.len(),
            "detected keypoints"
        );

        if reference_features.is_empty() || secondary_features.is_empty() {
            return Err(AlignmentFailure::InsufficientFeatures);
        }

        let matches = match_descriptors(&reference_features, &secondary_features);
        if matches.is_empty() {
            return Err(AlignmentFailure::NoMatches);
        }

        let good = select_good_matches(matches, self.matcher.max_good_matches);
        debug!(good_matches = good.len(), "selected correspondence set");

        let src: Vec<(f64, f64)> = good
            .iter()
            .map(|m| {
                let kp = &secondary_features[m.secondary_idx].keypoint;
                (kp.x as f64, kp.y as f64)
            })
            .collect();
        let dst: Vec<(f64, f64)> = good
            .iter()
            .map(|m| {
                let kp = &reference_features[m.reference_idx].keypoint;
                (kp.x as f64, kp.y as f64)
            })
            .collect();

        let homography =
            estimate_homography(&src, &dst, &self.ransac).ok_or(AlignmentFailure::NoHomography)?;

        debug!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            "homography estimated"
        );

        Ok(homography)
    }

    /// Warp `secondary` into the reference pixel grid. The output canvas has
    /// exactly the reference dimensions; pixels mapping outside the secondary
    /// image are black.
    pub fn align(
        &self,
        reference: &RgbImage,
        secondary: &RgbImage,
    ) -> Result<RgbImage, AlignmentFailure> {
        let homography = self.estimate(reference, secondary)?;

        let projection = Projection::from_matrix(homography.to_row_major_f32())
            .ok_or(AlignmentFailure::NoHomography)?;

        let mut warped = RgbImage::new(reference.width(), reference.height());
        warp_into(
            secondary,
            &projection,
            Interpolation::Bilinear,
            Rgb([0, 0, 0]),
            &mut warped,
        );

        Ok(warped)
    }
}
