use crate::shared::frame::{Frame, PixelFormat};
use crate::shared::orientation::Orientation;

use super::frame_source::{CaptureError, RawFrame, RawPixelFormat};

/// Turns device frames into tightly packed, upright RGB8 [`Frame`]s and
/// assigns them sequential indices.
#[derive(Debug, Default)]
pub struct FrameAdapter {
    next_index: usize,
}

impl FrameAdapter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn adapt(&mut self, raw: &RawFrame) -> Result<Frame, CaptureError> {
        let rgb = to_rgb(raw)?;
        let orientation = Orientation::from_degrees(raw.rotation);
        let (data, width, height) = rotate(&rgb, raw.width, raw.height, orientation);

        let frame = Frame::new(data, width, height, PixelFormat::Rgb8, self.next_index)
            .with_orientation(orientation);
        self.next_index += 1;
        Ok(frame)
    }
}

/// Strips row padding and reorders channels into RGB.
fn to_rgb(raw: &RawFrame) -> Result<Vec<u8>, CaptureError> {
    let w = raw.width as usize;
    let h = raw.height as usize;
    let bpp = raw.format.bytes_per_pixel();
    let row_bytes = w * bpp;

    if raw.stride < row_bytes {
        return Err(CaptureError::InvalidFrame(format!(
            "stride {} shorter than row of {row_bytes} bytes",
            raw.stride
        )));
    }
    if h > 0 && raw.data.len() < raw.stride * (h - 1) + row_bytes {
        return Err(CaptureError::InvalidFrame(format!(
            "{} bytes cannot hold {w}x{h} with stride {}",
            raw.data.len(),
            raw.stride
        )));
    }

    let mut out = Vec::with_capacity(w * h * 3);
    for row in 0..h {
        let start = row * raw.stride;
        let line = &raw.data[start..start + row_bytes];
        match raw.format {
            RawPixelFormat::Rgb24 => out.extend_from_slice(line),
            RawPixelFormat::Rgba => {
                for px in line.chunks_exact(4) {
                    out.extend_from_slice(&px[..3]);
                }
            }
            RawPixelFormat::Bgra => {
                for px in line.chunks_exact(4) {
                    out.extend_from_slice(&[px[2], px[1], px[0]]);
                }
            }
        }
    }
    Ok(out)
}

/// Rotates a packed RGB buffer clockwise by `orientation`.
fn rotate(data: &[u8], width: u32, height: u32, orientation: Orientation) -> (Vec<u8>, u32, u32) {
    if orientation == Orientation::Up {
        return (data.to_vec(), width, height);
    }

    let w = width as usize;
    let h = height as usize;
    let (out_w, out_h) = if orientation.swaps_dimensions() {
        (height, width)
    } else {
        (width, height)
    };
    let ow = out_w as usize;
    let mut out = vec![0u8; data.len()];

    for y in 0..h {
        for x in 0..w {
            let (dx, dy) = match orientation {
                Orientation::Right => (h - 1 - y, x),
                Orientation::Down => (w - 1 - x, h - 1 - y),
                Orientation::Left => (y, w - 1 - x),
                Orientation::Up => (x, y),
            };
            let src = (y * w + x) * 3;
            let dst = (dy * ow + dx) * 3;
            out[dst..dst + 3].copy_from_slice(&data[src..src + 3]);
        }
    }
    (out, out_w, out_h)
}
