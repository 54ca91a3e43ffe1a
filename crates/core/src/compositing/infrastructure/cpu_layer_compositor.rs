use crate::compositing::domain::layer_compositor::LayerCompositor;
use crate::compositing::domain::overlay_asset::OverlayAsset;
use crate::compositing::domain::placement::Translation;
use crate::shared::frame::Frame;
use crate::shared::geometry::Extent;

/// CPU source-atop compositor.
///
/// Copies the background and alpha-blends the clipped overlay window into
/// the copy with integer arithmetic. The background's own alpha channel, if
/// any, is preserved.
pub struct CpuLayerCompositor {
    asset: OverlayAsset,
}

impl CpuLayerCompositor {
    pub fn new(asset: OverlayAsset) -> Self {
        Self { asset }
    }
}

impl LayerCompositor for CpuLayerCompositor {
    fn asset(&self) -> &OverlayAsset {
        &self.asset
    }

    fn source_atop(
        &self,
        background: &Frame,
        at: Translation,
    ) -> Result<Frame, Box<dyn std::error::Error>> {
        let mut out = background.clone();
        let overlay = &self.asset;
        let overlay_extent = Extent::new(overlay.width(), overlay.height());
        let Some(window) = at.clip(overlay_extent, background.extent()) else {
            return Ok(out);
        };

        let bw = background.width() as usize;
        let ow = overlay.width() as usize;
        let channels = background.channels() as usize;
        let src = overlay.pixels();
        let dst = out.data_mut();

        for row in 0..window.height as usize {
            let oy = window.overlay_y as usize + row;
            let by = window.background_y as usize + row;
            for col in 0..window.width as usize {
                let ox = window.overlay_x as usize + col;
                let bx = window.background_x as usize + col;
                let s = (oy * ow + ox) * 4;
                let d = (by * bw + bx) * channels;
                let alpha = src[s + 3] as u32;
                if alpha == 0 {
                    continue;
                }
                for c in 0..3 {
                    dst[d + c] = blend(src[s + c], dst[d + c], alpha);
                }
            }
        }

        Ok(out)
    }
}

/// `(fg * a + bg * (255 - a)) / 255`, rounded.
#[inline]
pub fn blend(fg: u8, bg: u8, alpha: u32) -> u8 {
    ((fg as u32 * alpha + bg as u32 * (255 - alpha) + 127) / 255) as u8
}
