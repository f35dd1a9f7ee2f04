use std::path::PathBuf;
use thiserror::Error;

/// Fatal errors surfaced to the caller. Alignment failures are not errors;
/// they are recovered inside the pipeline (see [`crate::pipeline::AlignmentFailure`]).
#[derive(Debug, Error)]
pub enum DiffError {
    #[error("failed to decode image {}: {source}", .path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("failed to encode image {}: {source}", .path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("image dimensions do not match: {expected_width}x{expected_height} vs {actual_width}x{actual_height}")]
    DimensionMismatch {
        expected_width: u32,
        expected_height: u32,
        actual_width: u32,
        actual_height: u32,
    },

    #[error("image too small: {width}x{height}, minimum: {min}x{min}")]
    ImageTooSmall { width: u32, height: u32, min: u32 },

    #[error("image too large: {width}x{height}, maximum: {max}x{max}")]
    ImageTooLarge { width: u32, height: u32, max: u32 },
}
