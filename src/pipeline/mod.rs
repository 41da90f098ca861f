//! Per-file inference pipeline and batch orchestration.

mod batch;
mod infer;

pub use batch::{run_batch, BatchConfig, BatchSummary, INPUT_INTERFACE, OUTPUT_INTERFACE};
pub use infer::{assemble, run_inference};
