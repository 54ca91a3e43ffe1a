use crate::shared::frame::Frame;

use super::overlay_asset::OverlayAsset;
use super::placement::Translation;

/// Domain interface for placing the overlay asset on a background.
///
/// Implementations own the asset so a backend can keep it resident (for
/// example uploaded to the GPU once). `source_atop` must leave the
/// background untouched and return a new frame with the background's
/// extent, format and orientation: overlay pixels win where the overlay has
/// coverage, the background shows through elsewhere, and overlay pixels
/// falling outside the background are clipped.
pub trait LayerCompositor: Send {
    fn asset(&self) -> &OverlayAsset;

    fn source_atop(
        &self,
        background: &Frame,
        at: Translation,
    ) -> Result<Frame, Box<dyn std::error::Error>>;
}
