//! Multi-frame TIFF stack loading.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use ndarray::{ArrayD, IxDyn};
use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::ColorType;

use crate::error::{Error, Result};

use super::{flatten_samples, FlatSamples};

/// Load a multi-frame image stack from a TIFF file.
///
/// Every page is decoded to `f32` and the pages are stacked along a new
/// leading axis (a single-page file decodes to a rank-2 stack). The
/// returned shape is the stack's shape before flattening; reshaping the
/// denoised frames back to it recovers the input layout exactly.
///
/// # Errors
///
/// Returns [`Error::Decode`] if the file cannot be parsed as a TIFF, and
/// [`Error::Shape`] if pages disagree in size or are not single-channel.
pub fn load_stack(path: &Path) -> Result<(FlatSamples, Vec<usize>)> {
    tracing::debug!("Reading stack: {}", path.display());

    let file = File::open(path)?;
    let mut decoder = Decoder::new(BufReader::new(file))
        .map_err(|source| Error::Decode {
            path: path.to_path_buf(),
            source,
        })?
        .with_limits(Limits::unlimited());

    let mut data = Vec::new();
    let mut pages = 0usize;
    let mut page_dims: Option<(usize, usize)> = None;

    loop {
        let (width, height) = decoder.dimensions().map_err(|source| Error::Decode {
            path: path.to_path_buf(),
            source,
        })?;
        let dims = (height as usize, width as usize);

        match page_dims {
            None => page_dims = Some(dims),
            Some(first) if first != dims => {
                return Err(Error::Shape {
                    shape: vec![pages, first.0, first.1],
                    reason: format!("page {pages} has differing size {dims:?}"),
                });
            }
            Some(_) => {}
        }

        let color = decoder.colortype().map_err(|source| Error::Decode {
            path: path.to_path_buf(),
            source,
        })?;
        if !matches!(color, ColorType::Gray(_)) {
            return Err(Error::Shape {
                shape: vec![dims.0, dims.1],
                reason: format!("only single-channel stacks are supported, got {color:?}"),
            });
        }

        let page = decoder.read_image().map_err(|source| Error::Decode {
            path: path.to_path_buf(),
            source,
        })?;
        append_as_f32(page, &mut data);
        pages += 1;

        if !decoder.more_images() {
            break;
        }
        decoder.next_image().map_err(|source| Error::Decode {
            path: path.to_path_buf(),
            source,
        })?;
    }

    let (height, width) = page_dims.unwrap_or((0, 0));
    let original_shape = if pages == 1 {
        vec![height, width]
    } else {
        vec![pages, height, width]
    };

    let stack =
        ArrayD::from_shape_vec(IxDyn(&original_shape), data).map_err(|_| Error::Shape {
            shape: original_shape.clone(),
            reason: "page data does not match reported dimensions".to_string(),
        })?;

    tracing::debug!("Loaded stack shape: {original_shape:?}");

    let frames = flatten_samples(stack)?;
    Ok((frames, original_shape))
}

/// Cast a decoded page to `f32` and append it to the stack buffer.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
fn append_as_f32(page: DecodingResult, data: &mut Vec<f32>) {
    match page {
        DecodingResult::U8(v) => data.extend(v.iter().map(|&x| f32::from(x))),
        DecodingResult::U16(v) => data.extend(v.iter().map(|&x| f32::from(x))),
        DecodingResult::U32(v) => data.extend(v.iter().map(|&x| x as f32)),
        DecodingResult::U64(v) => data.extend(v.iter().map(|&x| x as f32)),
        DecodingResult::I8(v) => data.extend(v.iter().map(|&x| f32::from(x))),
        DecodingResult::I16(v) => data.extend(v.iter().map(|&x| f32::from(x))),
        DecodingResult::I32(v) => data.extend(v.iter().map(|&x| x as f32)),
        DecodingResult::I64(v) => data.extend(v.iter().map(|&x| x as f32)),
        DecodingResult::F32(v) => data.extend_from_slice(&v),
        DecodingResult::F64(v) => data.extend(v.iter().map(|&x| x as f32)),
    }
}
