//! Custom error types for stackdenoise.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the stackdenoise library.
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to decode an input image stack.
    #[error("failed to decode image stack {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: tiff::TiffError,
    },

    /// Decoded stack is dimensionally invalid.
    #[error("unsupported stack shape {shape:?}: {reason}")]
    Shape { shape: Vec<usize>, reason: String },

    /// Model invocation failed.
    #[error("model inference failed: {source}")]
    Inference {
        #[source]
        source: ort::Error,
    },

    /// Model changed the spatial shape of a frame.
    #[error("model changed spatial shape of frame {frame}: expected {expected:?}, got {actual:?}")]
    InferenceShape {
        frame: usize,
        expected: (usize, usize),
        actual: (usize, usize),
    },

    /// Element count of the inference results does not match the original stack.
    #[error("shape mismatch during assembly: expected {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },

    /// Failed to serialize an output image.
    #[error("failed to write image to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File is not a valid MetaImage.
    #[error("malformed MetaImage {path}: {reason}")]
    Meta { path: PathBuf, reason: String },

    /// Failed to load the ONNX model artifact. Fatal for the whole batch.
    #[error("failed to load ONNX model {path}: {source}")]
    ModelLoad {
        path: PathBuf,
        #[source]
        source: ort::Error,
    },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for stackdenoise operations.
pub type Result<T> = std::result::Result<T, Error>;
