//! ONNX model loading and frame scoring.

use std::path::Path;

use ndarray::{Array2, ArrayView2, Axis};
use ort::execution_providers::{CUDAExecutionProvider, ExecutionProvider};
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;

use crate::error::{Error, Result};

use super::Denoiser;

/// A [`Denoiser`] backed by an ONNX Runtime session.
///
/// The session is loaded once per batch run and reused for every frame of
/// every file. Frames are fed as `(1, height, width)` tensors; the first
/// output tensor is taken as the scored frame and may come back with or
/// without the leading sample axis.
pub struct OnnxDenoiser {
    session: Session,
}

impl OnnxDenoiser {
    /// Load the serialized model artifact from `path`.
    ///
    /// Registers the CUDA execution provider when available; ONNX Runtime
    /// falls back to CPU otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ModelLoad`] if the artifact is missing or corrupt.
    pub fn load(path: &Path) -> Result<Self> {
        tracing::info!("Loading model: {}", path.display());

        let session = Session::builder()
            .and_then(|builder| {
                builder
                    .with_execution_providers([CUDAExecutionProvider::default().build()])?
                    .with_optimization_level(GraphOptimizationLevel::Level3)?
                    .commit_from_file(path)
            })
            .map_err(|source| Error::ModelLoad {
                path: path.to_path_buf(),
                source,
            })?;

        tracing::info!("Model loaded successfully");

        Ok(Self { session })
    }
}

impl Denoiser for OnnxDenoiser {
    fn score(&mut self, frame: ArrayView2<'_, f32>) -> Result<Array2<f32>> {
        let (height, width) = frame.dim();

        // (H, W) -> (1, H, W), matching the model's per-sample input.
        let input = frame.to_owned().insert_axis(Axis(0));
        let tensor =
            Tensor::from_array(input).map_err(|source| Error::Inference { source })?;

        let outputs = self
            .session
            .run(ort::inputs![tensor])
            .map_err(|source| Error::Inference { source })?;

        let output = outputs.values().next().ok_or_else(|| Error::ShapeMismatch {
            expected: "one output tensor".to_string(),
            actual: "no output".to_string(),
        })?;

        let (shape_info, data) = output
            .try_extract_tensor::<f32>()
            .map_err(|source| Error::Inference { source })?;

        // Non-negative tensor dims fit in usize.
        #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
        let dims: Vec<usize> = shape_info.iter().map(|&x| x as usize).collect();

        let spatial = match dims.as_slice() {
            [1, h, w] | [h, w] => (*h, *w),
            _ => {
                return Err(Error::ShapeMismatch {
                    expected: format!("(1, {height}, {width})"),
                    actual: format!("{dims:?}"),
                })
            }
        };

        Array2::from_shape_vec(spatial, data.to_vec()).map_err(|_| Error::ShapeMismatch {
            expected: format!("{spatial:?}"),
            actual: format!("{} elements", data.len()),
        })
    }
}

/// Log acceleration hardware availability at batch start.
///
/// Operational visibility only; nothing downstream consumes this.
pub fn log_device_info() {
    match CUDAExecutionProvider::default().is_available() {
        Ok(true) => tracing::info!("CUDA execution provider is available"),
        Ok(false) => tracing::info!("CUDA execution provider not available, using CPU"),
        Err(err) => tracing::warn!("Could not query CUDA availability: {err}"),
    }
}
