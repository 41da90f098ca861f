//! Batch orchestration over the input interface directory.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::image;
use crate::model::Denoiser;

use super::infer;

/// Name of the input interface directory under the input root.
pub const INPUT_INTERFACE: &str = "image-stack-structured-noise";

/// Name of the output interface directory under the output root.
pub const OUTPUT_INTERFACE: &str = "image-stack-denoised";

/// Batch run configuration.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Root containing the input interface directory.
    pub input_root: PathBuf,

    /// Root under which the output interface directory is created.
    pub output_root: PathBuf,

    /// Stop at the first failed file instead of continuing with the rest.
    pub halt_on_error: bool,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            input_root: PathBuf::from("/input/images"),
            output_root: PathBuf::from("/output/images"),
            halt_on_error: false,
        }
    }
}

/// Outcome of a batch run.
#[derive(Debug, Default, Clone, Copy)]
pub struct BatchSummary {
    /// Files denoised and written successfully.
    pub processed: usize,

    /// Files that failed; their outputs were not written.
    pub failed: usize,
}

impl BatchSummary {
    /// True when every discovered file was processed successfully.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.failed == 0
    }
}

/// Run the denoising pipeline over every stack in the input interface.
///
/// Files are processed independently in lexicographic filename order with
/// a single model loaded up front. A per-file failure is logged and
/// counted; depending on [`BatchConfig::halt_on_error`] the batch either
/// continues with the next file (default) or stops.
///
/// # Errors
///
/// Returns an error only for batch-fatal conditions: an unreadable input
/// interface directory or an output directory that cannot be created.
/// Per-file failures are reported through the summary instead.
pub fn run_batch(config: &BatchConfig, model: &mut dyn Denoiser) -> Result<BatchSummary> {
    let input_dir = config.input_root.join(INPUT_INTERFACE);
    let output_dir = config.output_root.join(OUTPUT_INTERFACE);

    fs::create_dir_all(&output_dir)?;

    let inputs = discover_inputs(&input_dir)?;
    tracing::info!(
        "Found {} input stack(s) in {}",
        inputs.len(),
        input_dir.display()
    );

    let mut summary = BatchSummary::default();

    for input in &inputs {
        match process_file(input, &output_dir, model) {
            Ok(output) => {
                tracing::info!("{} -> {}", input.display(), output.display());
                summary.processed += 1;
            }
            Err(err) => {
                tracing::error!("Failed to process {}: {err}", input.display());
                summary.failed += 1;
                if config.halt_on_error {
                    tracing::warn!("Halting batch after first failure");
                    break;
                }
            }
        }
    }

    Ok(summary)
}

/// All TIFF files in the interface directory, lexicographic by filename.
fn discover_inputs(input_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut inputs = Vec::new();

    for entry in fs::read_dir(input_dir)? {
        let path = entry?.path();
        let is_tiff = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("tif") || e.eq_ignore_ascii_case("tiff"));
        if path.is_file() && is_tiff {
            inputs.push(path);
        }
    }

    inputs.sort_by_key(|p| p.file_name().map(std::ffi::OsStr::to_os_string));
    Ok(inputs)
}

/// Read one stack, score every frame, and write the reassembled result.
fn process_file(input: &Path, output_dir: &Path, model: &mut dyn Denoiser) -> Result<PathBuf> {
    tracing::info!("Processing stack: {}", input.display());

    let (frames, original_shape) = image::load_stack(input)?;
    let results = infer::run_inference(&frames, model)?;
    let assembled = infer::assemble(&results, &original_shape)?;

    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    let output = output_dir.join(format!("{stem}.mha"));

    image::write_mha(&assembled, &output)?;
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use ndarray::Array2;
    use std::fs::File;
    use tiff::encoder::{colortype, TiffEncoder};

    struct IdentityModel;

    impl Denoiser for IdentityModel {
        fn score(&mut self, frame: ndarray::ArrayView2<'_, f32>) -> Result<Array2<f32>> {
            Ok(frame.to_owned())
        }
    }

    /// Records the order in which frames reach the model.
    struct RecordingModel {
        seen: Vec<f32>,
    }

    impl Denoiser for RecordingModel {
        fn score(&mut self, frame: ndarray::ArrayView2<'_, f32>) -> Result<Array2<f32>> {
            self.seen.push(frame[[0, 0]]);
            Ok(frame.to_owned())
        }
    }

    fn write_tiff(path: &Path, pages: &[Vec<f32>], width: u32, height: u32) {
        let file = File::create(path).expect("create tiff");
        let mut encoder = TiffEncoder::new(file).expect("encoder");
        for page in pages {
            encoder
                .write_image::<colortype::Gray32Float>(width, height, page)
                .expect("write page");
        }
    }

    fn batch_dirs() -> (tempfile::TempDir, BatchConfig, PathBuf) {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = BatchConfig {
            input_root: dir.path().join("input"),
            output_root: dir.path().join("output"),
            halt_on_error: false,
        };
        let input_dir = config.input_root.join(INPUT_INTERFACE);
        fs::create_dir_all(&input_dir).expect("input dir");
        (dir, config, input_dir)
    }

    #[test]
    fn test_files_processed_in_lexicographic_order() {
        let (_dir, config, input_dir) = batch_dirs();
        // Tag each file's first pixel so the model can observe the order.
        for (name, tag) in [("b.tif", 1.0f32), ("a.tif", 0.0), ("c.tif", 2.0)] {
            write_tiff(&input_dir.join(name), &[vec![tag; 4]], 2, 2);
        }

        let mut model = RecordingModel { seen: Vec::new() };
        let summary = run_batch(&config, &mut model).expect("batch");

        assert_eq!(summary.processed, 3);
        assert_eq!(model.seen, vec![0.0, 1.0, 2.0]);
    }

    #[test]
    fn test_end_to_end_identity() {
        let (_dir, config, input_dir) = batch_dirs();
        let pages: Vec<Vec<f32>> = (0..3)
            .map(|p| (0..64 * 64).map(|i| (p * 64 * 64 + i) as f32).collect())
            .collect();
        write_tiff(&input_dir.join("stack.tif"), &pages, 64, 64);

        let summary = run_batch(&config, &mut IdentityModel).expect("batch");
        assert!(summary.is_success());
        assert_eq!(summary.processed, 1);

        let output = config
            .output_root
            .join(OUTPUT_INTERFACE)
            .join("stack.mha");
        let decoded = image::read_mha(&output).expect("read output");

        assert_eq!(decoded.shape(), &[3, 64, 64]);
        let expected: Vec<f32> = pages.concat();
        for (&got, &want) in decoded.iter().zip(&expected) {
            approx::assert_abs_diff_eq!(got, want, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_bad_file_does_not_stop_batch() {
        let (_dir, config, input_dir) = batch_dirs();
        write_tiff(&input_dir.join("a.tif"), &[vec![1.0; 4]], 2, 2);
        fs::write(input_dir.join("broken.tif"), b"not a tiff").expect("write");
        write_tiff(&input_dir.join("z.tif"), &[vec![2.0; 4]], 2, 2);

        let summary = run_batch(&config, &mut IdentityModel).expect("batch");

        assert_eq!(summary.processed, 2);
        assert_eq!(summary.failed, 1);
        assert!(!summary.is_success());

        let output_dir = config.output_root.join(OUTPUT_INTERFACE);
        assert!(output_dir.join("a.mha").exists());
        assert!(output_dir.join("z.mha").exists());
        assert!(!output_dir.join("broken.mha").exists());
    }

    #[test]
    fn test_halt_on_error_stops_batch() {
        let (_dir, mut config, input_dir) = batch_dirs();
        config.halt_on_error = true;
        fs::write(input_dir.join("a.tif"), b"not a tiff").expect("write");
        write_tiff(&input_dir.join("z.tif"), &[vec![2.0; 4]], 2, 2);

        let summary = run_batch(&config, &mut IdentityModel).expect("batch");

        assert_eq!(summary.processed, 0);
        assert_eq!(summary.failed, 1);
        let output_dir = config.output_root.join(OUTPUT_INTERFACE);
        assert!(!output_dir.join("z.mha").exists());
    }

    #[test]
    fn test_non_tiff_files_are_ignored() {
        let (_dir, config, input_dir) = batch_dirs();
        write_tiff(&input_dir.join("a.tif"), &[vec![1.0; 4]], 2, 2);
        fs::write(input_dir.join("notes.txt"), b"ignore me").expect("write");

        let summary = run_batch(&config, &mut IdentityModel).expect("batch");
        assert_eq!(summary.processed, 1);
        assert_eq!(summary.failed, 0);
    }

    #[test]
    fn test_missing_input_dir_is_batch_fatal() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = BatchConfig {
            input_root: dir.path().join("missing"),
            output_root: dir.path().join("output"),
            halt_on_error: false,
        };

        let err = run_batch(&config, &mut IdentityModel).expect_err("must fail");
        assert!(matches!(err, Error::Io(_)));
    }
}
