//! Mask Error Types

use thiserror::Error;

/// Errors while building a lane-candidate mask
#[derive(Debug, Clone, Error)]
pub enum MaskError {
    /// Threshold bounds are inverted or not finite
    #[error("{field} threshold [{min}, {max}] is invalid")]
    InvalidRange {
        field: &'static str,
        min: f64,
        max: f64,
    },

    /// Region of interest needs at least three distinct vertices
    #[error("Region of interest has {0} vertices, need at least 3")]
    InvalidRegion(usize),

    /// Input image has no pixels
    #[error("Cannot mask an empty image")]
    EmptyImage,
}
