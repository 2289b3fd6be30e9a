//! Road Frame Library
//!
//! Frame types and geometric pre-processing for the lane tracker:
//! - RGB road camera frames with image file I/O
//! - Binary bird's-eye frames consumed by the tracker
//! - Lens distortion correction from known intrinsics
//! - Four-point perspective (bird's-eye) transform

pub mod binary;
pub mod camera;
pub mod frame;
pub mod perspective;

pub use binary::BinaryFrame;
pub use camera::{CameraIntrinsics, Distortion};
pub use frame::RoadFrame;
pub use perspective::{PerspectiveConfig, PerspectiveTransform};

use thiserror::Error;

/// Frame error types
#[derive(Error, Debug)]
pub enum FrameError {
    #[error("Image I/O failed: {0}")]
    Image(#[from] image::ImageError),

    #[error("Invalid frame buffer: expected {expected} bytes, got {actual}")]
    Buffer { expected: usize, actual: usize },

    #[error("Frame of {width}x{height} pixels does not fit in memory")]
    TooLarge { width: u32, height: u32 },

    #[error("Degenerate perspective control points")]
    DegenerateProjection,

    #[error("Invalid camera intrinsics: {0}")]
    Intrinsics(String),
}
