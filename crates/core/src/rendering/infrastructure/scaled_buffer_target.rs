use std::sync::Arc;

use image::imageops::FilterType;
use image::{DynamicImage, RgbImage, RgbaImage};

use crate::rendering::domain::draw_target::DrawTarget;
use crate::shared::frame::{Frame, PixelFormat};
use crate::shared::geometry::{Extent, Rect};

/// A drawn RGBA8 image at surface pixel dimensions.
#[derive(Clone, Debug, PartialEq)]
pub struct PresentedImage {
    pub pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub frame_index: usize,
}

/// Draws into an in-memory RGBA8 buffer that a UI host displays.
///
/// Scaling uses a triangle filter; the newest image replaces the last.
#[derive(Default)]
pub struct ScaledBufferTarget {
    latest: Option<Arc<PresentedImage>>,
}

impl ScaledBufferTarget {
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recently drawn image.
    pub fn latest(&self) -> Option<Arc<PresentedImage>> {
        self.latest.clone()
    }
}

impl DrawTarget for ScaledBufferTarget {
    fn draw(
        &mut self,
        image: &Frame,
        source: Rect,
        target: Extent,
    ) -> Result<(), Box<dyn std::error::Error>> {
        if target.is_empty() {
            return Ok(());
        }

        let full = to_dynamic(image)?;
        let (x, y, w, h) = source_window(source, image.extent()).ok_or("Empty source region")?;
        let cropped = if (x, y, w, h) == (0, 0, image.width(), image.height()) {
            full.to_rgba8()
        } else {
            full.crop_imm(x, y, w, h).to_rgba8()
        };

        let scaled = if (w, h) == (target.width, target.height) {
            cropped
        } else {
            image::imageops::resize(&cropped, target.width, target.height, FilterType::Triangle)
        };

        self.latest = Some(Arc::new(PresentedImage {
            width: scaled.width(),
            height: scaled.height(),
            pixels: scaled.into_raw(),
            frame_index: image.index(),
        }));
        Ok(())
    }
}

fn to_dynamic(frame: &Frame) -> Result<DynamicImage, Box<dyn std::error::Error>> {
    let (w, h) = (frame.width(), frame.height());
    let data = frame.data().to_vec();
    let image = match frame.format() {
        PixelFormat::Rgb8 => RgbImage::from_raw(w, h, data).map(DynamicImage::ImageRgb8),
        PixelFormat::Rgba8 => RgbaImage::from_raw(w, h, data).map(DynamicImage::ImageRgba8),
    };
    image.ok_or_else(|| "Frame buffer does not match its dimensions".into())
}

/// Integer source window clamped to the image, or `None` if empty.
fn source_window(source: Rect, extent: Extent) -> Option<(u32, u32, u32, u32)> {
    let x0 = source.x.round().clamp(0.0, extent.width as f64) as u32;
    let y0 = source.y.round().clamp(0.0, extent.height as f64) as u32;
    let x1 = (source.x + source.width).round().clamp(0.0, extent.width as f64) as u32;
    let y1 = (source.y + source.height).round().clamp(0.0, extent.height as f64) as u32;
    if x1 <= x0 || y1 <= y0 {
        return None;
    }
    Some((x0, y0, x1 - x0, y1 - y0))
}
