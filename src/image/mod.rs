//! Image stack loading, reshaping, and saving utilities.

mod load;
mod mha;

pub use load::load_stack;
pub use mha::{read_mha, write_mha};

use ndarray::{Array3, ArrayD, IxDyn};

use crate::error::{Error, Result};

/// An image stack: N-dimensional, floating point, last two axes spatial.
/// Leading axes (channel, depth, time, ...) are opaque to the pipeline.
pub type ImageStack = ArrayD<f32>;

/// A flat sequence of 2-D frames, shape `(samples, height, width)`.
pub type FlatSamples = Array3<f32>;

/// Collapse all leading axes of a stack into a single sample axis.
///
/// The flattening is row-major, so frame `i` of the result corresponds to
/// the `i`-th entry of the C-order enumeration of the stack's leading axes.
/// [`restore_shape`] is the exact inverse.
///
/// # Errors
///
/// Returns [`Error::Shape`] if the stack has fewer than two dimensions.
pub fn flatten_samples(stack: ImageStack) -> Result<FlatSamples> {
    let shape = stack.shape().to_vec();
    if shape.len() < 2 {
        return Err(Error::Shape {
            shape,
            reason: "stack must have at least two spatial dimensions".to_string(),
        });
    }

    let (height, width) = (shape[shape.len() - 2], shape[shape.len() - 1]);
    let samples: usize = shape[..shape.len() - 2].iter().product();

    stack
        .into_shape_with_order((samples, height, width))
        .map_err(|_| Error::ShapeMismatch {
            expected: format!("({samples}, {height}, {width})"),
            actual: format!("{shape:?}"),
        })
}

/// Reshape a flat sample sequence back to the original stack shape.
///
/// Inverse of [`flatten_samples`]: the sample axis is re-expanded into the
/// original leading axes in row-major order.
///
/// # Errors
///
/// Returns [`Error::ShapeMismatch`] if the element counts disagree.
pub fn restore_shape(samples: FlatSamples, original_shape: &[usize]) -> Result<ImageStack> {
    let expected: usize = original_shape.iter().product();
    if samples.len() != expected {
        return Err(Error::ShapeMismatch {
            expected: format!("{original_shape:?} ({expected} elements)"),
            actual: format!("{:?} ({} elements)", samples.shape(), samples.len()),
        });
    }

    samples
        .into_shape_with_order(IxDyn(original_shape))
        .map_err(|_| Error::ShapeMismatch {
            expected: format!("{original_shape:?}"),
            actual: "non-contiguous sample sequence".to_string(),
        })
}
