//! Model adapter: the opaque per-frame scoring capability.

mod loader;

pub use loader::{log_device_info, OnnxDenoiser};

use ndarray::{Array2, ArrayView2};

use crate::error::Result;

/// A pretrained denoising model, scored one frame at a time.
///
/// Implementations must preserve the spatial shape: the output of
/// [`score`](Denoiser::score) has the same `(height, width)` as the input.
/// The pipeline verifies this per frame and fails the file otherwise. The
/// trait keeps the model swappable: ONNX Runtime in production, pure
/// functions in tests.
pub trait Denoiser {
    /// Score a single `(height, width)` frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Inference`](crate::Error::Inference) if the model
    /// invocation fails.
    fn score(&mut self, frame: ArrayView2<'_, f32>) -> Result<Array2<f32>>;
}
