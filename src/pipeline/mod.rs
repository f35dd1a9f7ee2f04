pub mod aligner;
pub mod detector;
pub mod types;

pub use aligner::Aligner;
pub use detector::ChangeDetector;
pub use types::*;

use crate::config::Config;
use crate::error::DiffError;
use image::{imageops, RgbImage};
use tracing::{info, warn};

/// The full alignment-and-diff pipeline with the documented fallback policy:
/// alignment failures are recovered locally by running detection on the
/// unaligned secondary image, never surfaced as hard errors.
pub struct ChangePipeline {
    aligner: Aligner,
    detector: ChangeDetector,
}

impl Default for ChangePipeline {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}

impl ChangePipeline {
    pub fn new(config: &Config) -> Self {
        Self {
            aligner: Aligner::from_config(config),
            detector: ChangeDetector::new(config.diff.clone()),
        }
    }

    pub fn run(
        &self,
        reference: &RgbImage,
        secondary: &RgbImage,
    ) -> Result<PipelineOutcome, DiffError> {
        match self.aligner.align(reference, secondary) {
            Ok(aligned) => {
                info!("secondary image registered onto the reference frame");
                let detection = self.detector.detect(reference, &aligned)?;
                Ok(PipelineOutcome {
                    detection,
                    alignment: AlignmentOutcome::Aligned,
                })
            }
            Err(failure) => {
                warn!(%failure, "alignment failed, continuing with the unaligned image");

                let fallback = if secondary.dimensions() == reference.dimensions() {
                    secondary.clone()
                } else {
                    warn!(
                        reference_width = reference.width(),
                        reference_height = reference.height(),
                        secondary_width = secondary.width(),
                        secondary_height = secondary.height(),
                        "resizing the unaligned image to the reference canvas"
                    );
                    imageops::resize(
                        secondary,
                        reference.width(),
                        reference.height(),
                        imageops::FilterType::Triangle,
                    )
                };

                let detection = self.detector.detect(reference, &fallback)?;
                Ok(PipelineOutcome {
                    detection,
                    alignment: AlignmentOutcome::FellBack(failure),
                })
            }
        }
    }
}
