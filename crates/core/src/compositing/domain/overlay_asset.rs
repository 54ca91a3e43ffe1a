use std::sync::Arc;

use crate::shared::constants::{MAX_OVERLAY_DIAMETER, MIN_OVERLAY_DIAMETER};

/// Immutable RGBA8 overlay image, loaded once and shared for the process
/// lifetime. Cloning shares the pixel buffer.
#[derive(Clone, Debug, PartialEq)]
pub struct OverlayAsset {
    pixels: Arc<Vec<u8>>,
    width: u32,
    height: u32,
}

impl OverlayAsset {
    pub fn new(pixels: Vec<u8>, width: u32, height: u32) -> Result<Self, String> {
        if width == 0 || height == 0 {
            return Err(format!("Overlay must not be empty, got {width}x{height}"));
        }
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(format!(
                "Overlay data length {} does not match {width}x{height} RGBA ({expected})",
                pixels.len()
            ));
        }
        Ok(Self {
            pixels: Arc::new(pixels),
            width,
            height,
        })
    }

    /// A cartoon eyeball: outlined white sclera, blue iris, black pupil and
    /// a specular highlight, with anti-aliased transparent corners.
    ///
    /// The diameter is clamped to `MIN_OVERLAY_DIAMETER..=MAX_OVERLAY_DIAMETER`.
    pub fn cartoon_eyeball(diameter: u32) -> Self {
        let d = diameter.clamp(MIN_OVERLAY_DIAMETER, MAX_OVERLAY_DIAMETER);
        let r = d as f64 / 2.0;
        let outline = (d as f64 / 24.0).max(1.0);
        let highlight = (r * 0.72, r * 0.72, r * 0.1);

        let mut pixels = Vec::with_capacity(d as usize * d as usize * 4);
        for y in 0..d {
            for x in 0..d {
                let px = x as f64 + 0.5;
                let py = y as f64 + 0.5;
                let dist = ((px - r).powi(2) + (py - r).powi(2)).sqrt();

                let rgb = if dist <= r * 0.22 {
                    [10, 10, 10]
                } else if dist <= r * 0.45 {
                    [46, 104, 196]
                } else if dist <= r - outline {
                    [250, 250, 250]
                } else {
                    [20, 20, 20]
                };
                let hd = ((px - highlight.0).powi(2) + (py - highlight.1).powi(2)).sqrt();
                let rgb = if hd <= highlight.2 { [255, 255, 255] } else { rgb };

                let coverage = (r - dist + 0.5).clamp(0.0, 1.0);
                pixels.extend_from_slice(&rgb);
                pixels.push((coverage * 255.0).round() as u8);
            }
        }

        Self {
            pixels: Arc::new(pixels),
            width: d,
            height: d,
        }
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn half_extent(&self) -> (f64, f64) {
        (self.width as f64 / 2.0, self.height as f64 / 2.0)
    }

    pub fn rgba_at(&self, x: u32, y: u32) -> [u8; 4] {
        let i = (y as usize * self.width as usize + x as usize) * 4;
        [
            self.pixels[i],
            self.pixels[i + 1],
            self.pixels[i + 2],
            self.pixels[i + 3],
        ]
    }

    /// Pixels as little-endian packed `u32` RGBA, the layout GPU shaders read.
    pub fn packed(&self) -> Vec<u32> {
        self.pixels
            .chunks_exact(4)
            .map(|p| u32::from_le_bytes([p[0], p[1], p[2], p[3]]))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_validates_length() {
        assert!(OverlayAsset::new(vec![0u8; 16], 2, 2).is_ok());
        assert!(OverlayAsset::new(vec![0u8; 15], 2, 2).is_err());
    }

    #[test]
    fn test_new_rejects_empty() {
        assert!(OverlayAsset::new(Vec::new(), 0, 0).is_err());
    }

    #[test]
    fn test_half_extent() {
        let asset = OverlayAsset::new(vec![0u8; 6 * 4 * 4], 6, 4).unwrap();
        assert_eq!(asset.half_extent(), (3.0, 2.0));
    }

    #[test]
    fn test_clone_shares_pixels() {
        let asset = OverlayAsset::cartoon_eyeball(16);
        let cloned = asset.clone();
        assert!(std::ptr::eq(asset.pixels(), cloned.pixels()));
    }

    #[test]
    fn test_cartoon_eyeball_shape() {
        let eye = OverlayAsset::cartoon_eyeball(64);
        assert_eq!((eye.width(), eye.height()), (64, 64));

        // corners are transparent, center is an opaque dark pupil
        assert_eq!(eye.rgba_at(0, 0)[3], 0);
        assert_eq!(eye.rgba_at(63, 63)[3], 0);
        let center = eye.rgba_at(32, 32);
        assert_eq!(center[3], 255);
        assert!(center[0] < 50);

        // sclera between iris and outline is white
        let sclera = eye.rgba_at(32, 8);
        assert_eq!(sclera, [250, 250, 250, 255]);
    }

    #[test]
    fn test_cartoon_eyeball_minimum_size() {
        let eye = OverlayAsset::cartoon_eyeball(1);
        assert_eq!(eye.width(), 8);
    }

    #[test]
    fn test_cartoon_eyeball_maximum_size() {
        let eye = OverlayAsset::cartoon_eyeball(40_000);
        assert_eq!(eye.width(), MAX_OVERLAY_DIAMETER);
        assert_eq!(eye.pixels().len(), 4096 * 4096 * 4);
    }

    #[test]
    fn test_packed_is_little_endian_rgba() {
        let asset = OverlayAsset::new(vec![1, 2, 3, 4], 1, 1).unwrap();
        assert_eq!(asset.packed(), vec![0x04030201]);
    }
}
