//! Images task: recompress raster images and clean up SVGs.

use std::borrow::Cow;
use std::fs;
use std::path::Path;

use image::ImageFormat;

use crate::events::BuildEvents;
use crate::paths::Category;
use crate::tasks::{run_files, sources, write_output, TaskError, TaskReport};
use crate::PipelineConfig;

/// oxipng preset; 5 matches `optipng -o5`.
const PNG_PRESET: u8 = 5;

/// Optimize every matched image. The first failure aborts the run.
pub fn run(config: &PipelineConfig, events: &dyn BuildEvents) -> Result<TaskReport, TaskError> {
    let files = sources(Category::Images, config)?;

    run_files(Category::Images, files, events, None, |file| {
        let original = fs::read(&file.path).map_err(|e| TaskError::io(&file.path, e))?;
        let optimized = optimize(&file.path, &original, config.jpeg_quality)?;
        write_output(&file.output(), optimized)
    })
}

/// Recompress `bytes` according to the file extension.
///
/// JPEG, PNG and SVG keep the original bytes when recompression does not
/// shrink them. GIFs are always rewritten interlaced. Other formats come back
/// unchanged.
pub fn optimize(path: &Path, bytes: &[u8], jpeg_quality: u8) -> Result<Vec<u8>, TaskError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let image_error = |message: String| TaskError::Image {
        path: path.to_path_buf(),
        message,
    };

    let optimized = match ext.as_str() {
        "jpg" | "jpeg" => compress_jpeg(bytes, jpeg_quality),
        "png" => compress_png(bytes),
        "svg" => clean_svg(bytes),
        "gif" => return interlace_gif(bytes).map_err(image_error),
        _ => return Ok(bytes.to_vec()),
    }
    .map_err(image_error)?;

    Ok(smallest(optimized, bytes))
}

/// Re-encode as a progressive JPEG.
fn compress_jpeg(bytes: &[u8], quality: u8) -> Result<Vec<u8>, String> {
    let img = image::load_from_memory_with_format(bytes, ImageFormat::Jpeg)
        .map_err(|e| e.to_string())?;

    let too_large = |_| format!("{}x{} is too large for JPEG", img.width(), img.height());
    let width = u16::try_from(img.width()).map_err(too_large)?;
    let height = u16::try_from(img.height()).map_err(too_large)?;

    let (pixels, color) = match img.color() {
        image::ColorType::L8 | image::ColorType::L16 => {
            (img.to_luma8().into_raw(), jpeg_encoder::ColorType::Luma)
        }
        _ => (img.to_rgb8().into_raw(), jpeg_encoder::ColorType::Rgb),
    };

    let mut out = Vec::new();
    let mut encoder = jpeg_encoder::Encoder::new(&mut out, quality);
    encoder.set_progressive(true);
    encoder
        .encode(&pixels, width, height, color)
        .map_err(|e| e.to_string())?;
    Ok(out)
}

/// Lossless PNG optimization.
fn compress_png(bytes: &[u8]) -> Result<Vec<u8>, String> {
    let options = oxipng::Options::from_preset(PNG_PRESET);
    oxipng::optimize_from_memory(bytes, &options).map_err(|e| e.to_string())
}

fn clean_svg(bytes: &[u8]) -> Result<Vec<u8>, String> {
    // Text would need font resolution to survive a round trip.
    if bytes.windows(5).any(|w| w == b"<text") {
        return Ok(bytes.to_vec());
    }

    let tree = usvg::Tree::from_data(bytes, &usvg::Options::default())
        .map_err(|e| format!("Failed to parse SVG: {}", e))?;

    let write_options = usvg::WriteOptions {
        indent: usvg::Indent::None,
        ..Default::default()
    };

    Ok(tree.to_string(&write_options).into_bytes())
}

/// Rewrite every frame of a GIF with interlaced rows.
fn interlace_gif(bytes: &[u8]) -> Result<Vec<u8>, String> {
    let mut options = gif::DecodeOptions::new();
    options.set_color_output(gif::ColorOutput::Indexed);
    let mut decoder = options.read_info(bytes).map_err(|e| e.to_string())?;

    let palette = decoder.global_palette().unwrap_or_default().to_vec();
    let repeat = decoder.repeat();

    let mut out = Vec::new();
    {
        let mut encoder = gif::Encoder::new(&mut out, decoder.width(), decoder.height(), &palette)
            .map_err(|e| e.to_string())?;
        encoder.set_repeat(repeat).map_err(|e| e.to_string())?;

        // Decoded frames are always in display row order.
        while let Some(frame) = decoder.read_next_frame().map_err(|e| e.to_string())? {
            let mut frame = frame.clone();
            frame.buffer = Cow::Owned(interlace_rows(&frame.buffer, frame.width as usize));
            frame.interlaced = true;
            encoder.write_frame(&frame).map_err(|e| e.to_string())?;
        }
    }

    Ok(out)
}

/// Reorder rows into the four GIF interlace passes.
fn interlace_rows(buffer: &[u8], width: usize) -> Vec<u8> {
    if width == 0 {
        return buffer.to_vec();
    }

    let rows: Vec<&[u8]> = buffer.chunks(width).collect();
    let mut out = Vec::with_capacity(buffer.len());
    for (first, step) in [(0, 8), (4, 8), (2, 4), (1, 2)] {
        for row in rows.iter().skip(first).step_by(step) {
            out.extend_from_slice(row);
        }
    }
    out
}

/// Keep the original when recompression does not pay off.
fn smallest(optimized: Vec<u8>, original: &[u8]) -> Vec<u8> {
    if optimized.len() < original.len() {
        optimized
    } else {
        original.to_vec()
    }
}
