//! Frame → model input tensor.
//!
//! Optional square letterbox (top-left anchored, zero fill), bilinear resize
//! to the model's input size, then NCHW float32 scaled to `[0, 1]`.

use image::imageops::{self, FilterType};
use ndarray::Array4;

use crate::detection::domain::detection_postprocessor::ScaleFactors;
use crate::shared::frame::Frame;

/// Model input tensor plus the factors that map its coordinates back onto
/// the source frame.
pub struct PreparedInput {
    pub tensor: Array4<f32>,
    pub scale: ScaleFactors,
}

/// Pads `frame` to a `max(w, h)` square canvas, copying it into the top-left
/// corner and leaving the rest black.
pub fn pad_to_square(frame: &Frame) -> Frame {
    let w = frame.width();
    let h = frame.height();
    if w == h {
        return frame.clone();
    }
    let side = w.max(h);
    let mut canvas = Frame::zeros(side, side, frame.index());

    let src_row = w as usize * Frame::CHANNELS;
    let dst_row = side as usize * Frame::CHANNELS;
    let src = frame.data();
    let dst = canvas.data_mut();
    for y in 0..h as usize {
        let dst_start = y * dst_row;
        dst[dst_start..dst_start + src_row].copy_from_slice(&src[y * src_row..(y + 1) * src_row]);
    }
    canvas
}

/// Resizes `frame` to `input_size` and lays it out as `[1, 3, H, W]`.
pub fn to_input_tensor(
    frame: &Frame,
    input_size: (u32, u32),
) -> Result<Array4<f32>, Box<dyn std::error::Error>> {
    let (in_w, in_h) = input_size;
    let img = frame
        .to_rgb_image()
        .ok_or("Failed to create image from frame data")?;
    let resized = if img.dimensions() == input_size {
        img
    } else {
        imageops::resize(&img, in_w, in_h, FilterType::Triangle)
    };

    let mut tensor = Array4::<f32>::zeros((1, 3, in_h as usize, in_w as usize));
    for (x, y, pixel) in resized.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, c, y as usize, x as usize]] = pixel[c] as f32 / 255.0;
        }
    }
    Ok(tensor)
}

/// Letterboxes when requested and the model input is square, then builds
/// the input tensor and the matching scale factors.
pub fn prepare(
    frame: &Frame,
    input_size: (u32, u32),
    letterbox: bool,
) -> Result<PreparedInput, Box<dyn std::error::Error>> {
    if frame.width() == 0 || frame.height() == 0 {
        return Err("Cannot prepare an empty frame".into());
    }
    let squared;
    let source = if letterbox && input_size.0 == input_size.1 {
        squared = pad_to_square(frame);
        &squared
    } else {
        frame
    };

    let tensor = to_input_tensor(source, input_size)?;
    let scale = ScaleFactors::from_sizes((source.width(), source.height()), input_size);
    Ok(PreparedInput { tensor, scale })
}
