pub mod detection;
pub mod smoothing;

pub use detection::{DetectionResult, DetectionStrategy};
pub use smoothing::smooth;
