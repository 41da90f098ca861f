//! Frame-by-frame inference and result assembly.

use indicatif::{ProgressBar, ProgressStyle};
use ndarray::{Array2, Axis};

use crate::error::{Error, Result};
use crate::image::{restore_shape, FlatSamples, ImageStack};
use crate::model::Denoiser;

/// Score every frame of a flattened stack, in order.
///
/// Frames are processed one at a time; the result order matches the input
/// order exactly, which is what lets [`assemble`] invert the row-major
/// flattening. A frame whose scored output differs in spatial shape fails
/// the whole file; no partial result is returned.
///
/// # Errors
///
/// Returns [`Error::Inference`] if a model call fails and
/// [`Error::InferenceShape`] if the model changes a frame's shape.
pub fn run_inference(
    frames: &FlatSamples,
    model: &mut dyn Denoiser,
) -> Result<Vec<Array2<f32>>> {
    let total = frames.len_of(Axis(0));

    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} Denoising [{bar:40.cyan/blue}] {pos}/{len}")
            .expect("valid template")
            .progress_chars("#>-"),
    );

    let mut results = Vec::with_capacity(total);
    for (index, frame) in frames.outer_iter().enumerate() {
        let expected = frame.dim();
        let scored = model.score(frame)?;

        if scored.dim() != expected {
            return Err(Error::InferenceShape {
                frame: index,
                expected,
                actual: scored.dim(),
            });
        }

        results.push(scored);
        pb.inc(1);
    }

    pb.finish_and_clear();
    Ok(results)
}

/// Restack scored frames and reshape to the original stack shape.
///
/// # Errors
///
/// Returns [`Error::ShapeMismatch`] if the results do not account for
/// exactly the original element count.
pub fn assemble(results: &[Array2<f32>], original_shape: &[usize]) -> Result<ImageStack> {
    let expected: usize = original_shape.iter().product();

    let Some(first) = results.first() else {
        return Err(Error::ShapeMismatch {
            expected: format!("{original_shape:?} ({expected} elements)"),
            actual: "no frames".to_string(),
        });
    };

    let (height, width) = first.dim();
    if results.len() * height * width != expected {
        return Err(Error::ShapeMismatch {
            expected: format!("{original_shape:?} ({expected} elements)"),
            actual: format!(
                "{} frames of ({height}, {width}) ({} elements)",
                results.len(),
                results.len() * height * width
            ),
        });
    }

    let views: Vec<_> = results.iter().map(ndarray::Array2::view).collect();
    let stacked = ndarray::stack(Axis(0), &views).map_err(|_| Error::ShapeMismatch {
        expected: format!("{} frames of ({height}, {width})", results.len()),
        actual: "frames of differing shapes".to_string(),
    })?;

    restore_shape(stacked, original_shape)
}
