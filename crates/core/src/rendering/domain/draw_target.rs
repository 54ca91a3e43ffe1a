use crate::shared::frame::Frame;
use crate::shared::geometry::{Extent, Rect};

/// Where composited frames end up.
pub trait DrawTarget: Send {
    /// Draw the `source` region of `image` stretched to fill `target`.
    ///
    /// Aspect ratio is not preserved; there is no letterboxing.
    fn draw(
        &mut self,
        image: &Frame,
        source: Rect,
        target: Extent,
    ) -> Result<(), Box<dyn std::error::Error>>;
}
