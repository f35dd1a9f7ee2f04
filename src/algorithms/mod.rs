pub mod homography;
pub mod matching;
pub mod orb;

pub use homography::*;
pub use matching::*;
pub use orb::*;
