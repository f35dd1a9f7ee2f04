//! Alignment-tolerant change detection for scanned technical drawings.
//!
//! Two stages run in strict order: [`pipeline::Aligner`] registers a modified
//! capture onto the reference drawing's coordinate frame (sparse features,
//! cross-checked Hamming matching, RANSAC homography, perspective warp), and
//! [`pipeline::ChangeDetector`] extracts and annotates regions where the two
//! images differ. [`pipeline::ChangePipeline`] ties them together with the
//! fallback contract: a failed alignment degrades to detection on the
//! unaligned image instead of aborting.

pub mod algorithms;
pub mod config;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod utils;

pub use config::Config;
pub use error::DiffError;
pub use pipeline::{
    Aligner, AlignmentFailure, AlignmentOutcome, ChangeDetector, ChangePipeline, DetectionResult,
    DiffRegion, PipelineOutcome,
};
pub use utils::{load_image, save_image};
