//! MetaImage (.mha) serialization.
//!
//! The output format is fixed by the downstream contract: a single-file
//! MetaImage with zlib-compressed `MET_FLOAT` pixel data. MetaImage lists
//! `DimSize` fastest-varying axis first (x y z ...), so the header carries
//! the stack shape reversed while the pixel payload stays in C order.

use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use ndarray::{ArrayD, IxDyn};

use crate::error::{Error, Result};

use super::ImageStack;

/// Write a stack to `path` as a compressed MetaImage.
///
/// # Errors
///
/// Returns [`Error::Write`] if the destination cannot be created or the
/// serialization fails.
pub fn write_mha(stack: &ImageStack, path: &Path) -> Result<()> {
    tracing::debug!("Writing image to: {}", path.display());

    let ndims = stack.ndim();
    let standard = stack.as_standard_layout();

    let mut raw = Vec::with_capacity(standard.len() * 4);
    for &value in standard.iter() {
        raw.extend_from_slice(&value.to_le_bytes());
    }

    let compressed = (|| {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&raw)?;
        encoder.finish()
    })()
    .map_err(|source| Error::Write {
        path: path.to_path_buf(),
        source,
    })?;

    let dim_size = join_reversed(stack.shape());
    let zeros = vec!["0"; ndims].join(" ");
    let ones = vec!["1"; ndims].join(" ");
    let transform = identity_matrix(ndims);

    (|| {
        let mut out = BufWriter::new(File::create(path)?);
        writeln!(out, "ObjectType = Image")?;
        writeln!(out, "NDims = {ndims}")?;
        writeln!(out, "BinaryData = True")?;
        writeln!(out, "BinaryDataByteOrderMSB = False")?;
        writeln!(out, "CompressedData = True")?;
        writeln!(out, "CompressedDataSize = {}", compressed.len())?;
        writeln!(out, "TransformMatrix = {transform}")?;
        writeln!(out, "Offset = {zeros}")?;
        writeln!(out, "CenterOfRotation = {zeros}")?;
        writeln!(out, "ElementSpacing = {ones}")?;
        writeln!(out, "DimSize = {dim_size}")?;
        writeln!(out, "ElementType = MET_FLOAT")?;
        writeln!(out, "ElementDataFile = LOCAL")?;
        out.write_all(&compressed)?;
        out.flush()
    })()
    .map_err(|source| Error::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Read a MetaImage written by [`write_mha`] back into a stack.
///
/// Supports single-file `MET_FLOAT` images with optional zlib compression.
///
/// # Errors
///
/// Returns [`Error::Meta`] if the header or payload is malformed.
pub fn read_mha(path: &Path) -> Result<ImageStack> {
    let bytes = std::fs::read(path)?;

    let malformed = |reason: &str| Error::Meta {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    };

    let mut ndims = None;
    let mut dim_size: Option<Vec<usize>> = None;
    let mut element_type = None;
    let mut compressed = false;
    let mut offset = 0usize;

    loop {
        let rest = &bytes[offset..];
        let line_end = rest
            .iter()
            .position(|&b| b == b'\n')
            .ok_or_else(|| malformed("header not terminated"))?;
        let line = std::str::from_utf8(&rest[..line_end])
            .map_err(|_| malformed("header is not valid UTF-8"))?;
        offset += line_end + 1;

        let (key, value) = line
            .split_once('=')
            .ok_or_else(|| malformed("header line missing '='"))?;
        let (key, value) = (key.trim(), value.trim());

        match key {
            "NDims" => {
                ndims = Some(
                    value
                        .parse::<usize>()
                        .map_err(|_| malformed("invalid NDims"))?,
                );
            }
            "DimSize" => {
                let dims = value
                    .split_whitespace()
                    .map(str::parse)
                    .collect::<std::result::Result<Vec<usize>, _>>()
                    .map_err(|_| malformed("invalid DimSize"))?;
                dim_size = Some(dims);
            }
            "ElementType" => element_type = Some(value.to_string()),
            "CompressedData" => compressed = value.eq_ignore_ascii_case("true"),
            "ElementDataFile" => {
                if value != "LOCAL" {
                    return Err(malformed("only ElementDataFile = LOCAL is supported"));
                }
                break;
            }
            _ => {}
        }
    }

    if element_type.as_deref() != Some("MET_FLOAT") {
        return Err(malformed("only MET_FLOAT element type is supported"));
    }

    let dim_size = dim_size.ok_or_else(|| malformed("missing DimSize"))?;
    if ndims.is_some_and(|n| n != dim_size.len()) {
        return Err(malformed("NDims does not match DimSize"));
    }

    let payload = &bytes[offset..];
    let raw = if compressed {
        let mut decoder = ZlibDecoder::new(payload);
        let mut raw = Vec::new();
        decoder
            .read_to_end(&mut raw)
            .map_err(|_| malformed("failed to decompress pixel data"))?;
        raw
    } else {
        payload.to_vec()
    };

    // DimSize is x-fastest; the in-memory shape is its reverse.
    let shape: Vec<usize> = dim_size.iter().rev().copied().collect();
    let expected: usize = shape.iter().product();
    if raw.len() != expected * 4 {
        return Err(malformed("pixel data does not match DimSize"));
    }

    let values = raw
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();

    ArrayD::from_shape_vec(IxDyn(&shape), values)
        .map_err(|_| malformed("pixel data does not match DimSize"))
}

fn join_reversed(shape: &[usize]) -> String {
    shape
        .iter()
        .rev()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

fn identity_matrix(n: usize) -> String {
    let mut entries = Vec::with_capacity(n * n);
    for i in 0..n {
        for j in 0..n {
            entries.push(if i == j { "1" } else { "0" });
        }
    }
    entries.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array;

    fn sequential_stack(shape: &[usize]) -> ImageStack {
        let len: usize = shape.iter().product();
        #[allow(clippy::cast_precision_loss)]
        Array::from_shape_vec(IxDyn(shape), (0..len).map(|i| i as f32).collect())
            .expect("valid shape")
    }

    #[test]
    fn test_write_read_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("stack.mha");
        let stack = sequential_stack(&[3, 4, 5]);

        write_mha(&stack, &path).expect("write");
        let decoded = read_mha(&path).expect("read");

        assert_eq!(decoded, stack);
    }

    #[test]
    fn test_round_trip_rank_two() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("frame.mha");
        let stack = sequential_stack(&[8, 6]);

        write_mha(&stack, &path).expect("write");
        assert_eq!(read_mha(&path).expect("read"), stack);
    }

    #[test]
    fn test_header_reverses_dim_size() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("stack.mha");
        write_mha(&sequential_stack(&[2, 3, 4]), &path).expect("write");

        let bytes = std::fs::read(&path).expect("read file");
        let header_end = bytes
            .windows(b"ElementDataFile = LOCAL\n".len())
            .position(|w| w == b"ElementDataFile = LOCAL\n")
            .expect("header terminator");
        let header = std::str::from_utf8(&bytes[..header_end]).expect("utf8 header");

        assert!(header.contains("NDims = 3"));
        assert!(header.contains("DimSize = 4 3 2"));
        assert!(header.contains("CompressedData = True"));
        assert!(header.contains("ElementType = MET_FLOAT"));
    }

    #[test]
    fn test_payload_is_compressed() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("zeros.mha");
        let stack = ImageStack::zeros(IxDyn(&[16, 64, 64]));

        write_mha(&stack, &path).expect("write");
        let size = std::fs::metadata(&path).expect("metadata").len();

        // 16*64*64 f32 zeros are 256 KiB raw; zlib shrinks them drastically.
        assert!(size < 16 * 1024, "payload does not look compressed: {size}");
    }

    #[test]
    fn test_read_rejects_garbage() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("garbage.mha");
        std::fs::write(&path, b"ObjectType = Image\nNDims = banana\n").expect("write");

        let err = read_mha(&path).expect_err("must fail");
        assert!(matches!(err, Error::Meta { .. }));
    }
}
