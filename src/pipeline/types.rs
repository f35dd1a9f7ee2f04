use image::RgbImage;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Why the aligner could not produce a transform. Recoverable: the pipeline
/// substitutes the unaligned secondary image and keeps going.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum AlignmentFailure {
    #[error("insufficient features for alignment")]
    InsufficientFeatures,
    #[error("no correspondence found between the images")]
    NoMatches,
    #[error("no valid homography could be estimated")]
    NoHomography,
}

/// Which input the change detector actually saw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlignmentOutcome {
    /// The secondary image was warped onto the reference frame.
    Aligned,
    /// Alignment failed; detection ran on the unaligned secondary image.
    FellBack(AlignmentFailure),
}

impl AlignmentOutcome {
    pub fn is_aligned(&self) -> bool {
        matches!(self, AlignmentOutcome::Aligned)
    }
}

/// Bounding box of one changed region, plus the contour area that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DiffRegion {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    pub area: f64,
}

impl DiffRegion {
    /// Whether `other` lies fully inside this box.
    pub fn contains(&self, other: &DiffRegion) -> bool {
        self.x <= other.x
            && self.y <= other.y
            && other.x + other.width as i32 <= self.x + self.width as i32
            && other.y + other.height as i32 <= self.y + self.height as i32
    }
}

/// Annotated image plus the retained change regions. An empty region list is
/// a meaningful "no significant change" result, not a failure.
#[derive(Debug, Clone)]
pub struct DetectionResult {
    pub annotated: RgbImage,
    pub regions: Vec<DiffRegion>,
}

impl DetectionResult {
    pub fn change_count(&self) -> usize {
        self.regions.len()
    }
}

/// Detection result plus the alignment path that produced it, so a distorted
/// diff is always attributable to the fallback.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub detection: DetectionResult,
    pub alignment: AlignmentOutcome,
}
