//! Image pipeline: recompress PNG and JPEG, copy everything else.
//!
//! PNG is re-encoded losslessly at the highest compression level. JPEG is
//! re-encoded at the configured quality. Whichever of the original and the
//! re-encoded bytes is smaller gets written, so an image never grows.

use super::{output_path, write_output, PipelineOutput, TransformError};
use crate::build::SourceFile;
use crate::config::ImageConfig;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::{ColorType, ImageEncoder, ImageFormat};
use rayon::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};

/// Formats the pipeline re-encodes.
fn recompressible(path: &Path) -> Option<ImageFormat> {
    match ImageFormat::from_path(path).ok()? {
        format @ (ImageFormat::Png | ImageFormat::Jpeg) => Some(format),
        _ => None,
    }
}

fn encode_png(img: &image::DynamicImage) -> image::ImageResult<Vec<u8>> {
    let mut buf = Vec::new();
    PngEncoder::new_with_quality(&mut buf, CompressionType::Best, FilterType::Adaptive)
        .write_image(img.as_bytes(), img.width(), img.height(), img.color())?;
    Ok(buf)
}

fn encode_jpeg(img: &image::DynamicImage, quality: u8) -> image::ImageResult<Vec<u8>> {
    let rgb = img.to_rgb8();
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, quality).write_image(
        rgb.as_raw(),
        rgb.width(),
        rgb.height(),
        ColorType::Rgb8,
    )?;
    Ok(buf)
}

/// Optimized bytes for one image file.
pub fn optimize(path: &Path, config: &ImageConfig) -> Result<Vec<u8>, TransformError> {
    let original = fs::read(path)
        .map_err(|source| TransformError::Read { path: path.to_path_buf(), source })?;

    let Some(format) = recompressible(path) else {
        return Ok(original);
    };
    let image_error =
        |e: image::ImageError| TransformError::Image { path: path.to_path_buf(), message: e.to_string() };

    let img = image::load_from_memory_with_format(&original, format).map_err(image_error)?;
    let encoded = match format {
        ImageFormat::Png if config.optimize_png => encode_png(&img).map_err(image_error)?,
        ImageFormat::Jpeg => encode_jpeg(&img, config.jpeg_quality).map_err(image_error)?,
        _ => return Ok(original),
    };

    if encoded.len() < original.len() {
        tracing::debug!(
            file = %path.display(),
            before = original.len(),
            after = encoded.len(),
            "recompressed image"
        );
        Ok(encoded)
    } else {
        Ok(original)
    }
}

/// Run the image pipeline, processing files in parallel.
pub fn run(
    sources: &[SourceFile],
    dest: &Path,
    config: &ImageConfig,
) -> Result<PipelineOutput, TransformError> {
    let outputs = sources
        .par_iter()
        .map(|source| {
            let bytes = optimize(&source.path, config)?;
            let target = output_path(dest, source, None);
            write_output(&target, &bytes)?;
            Ok(target)
        })
        .collect::<Result<Vec<PathBuf>, TransformError>>()?;

    Ok(PipelineOutput { outputs, warnings: vec![] })
}
