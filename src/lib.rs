//! # stackdenoise
//!
//! A batch denoising inference runner for multi-frame image stacks.
//!
//! Noisy TIFF stacks are read from a fixed input interface directory,
//! scored frame by frame with a pretrained ONNX model, reassembled into
//! their original shape, and written as compressed MetaImage (.mha) files
//! for downstream medical-imaging consumers.
//!
//! ## Example
//!
//! ```no_run
//! use std::path::Path;
//! use stackdenoise::{run_batch, BatchConfig, OnnxDenoiser};
//!
//! # fn main() -> stackdenoise::Result<()> {
//! let mut model = OnnxDenoiser::load(Path::new("resources/model.onnx"))?;
//! let summary = run_batch(&BatchConfig::default(), &mut model)?;
//! assert!(summary.is_success());
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod image;
pub mod model;
pub mod pipeline;

pub use error::{Error, Result};
pub use model::{Denoiser, OnnxDenoiser};
pub use pipeline::{run_batch, BatchConfig, BatchSummary};
