use std::sync::Arc;
use std::time::Instant;

use crate::compositing::domain::overlay_compositor::OverlayCompositor;
use crate::detection::domain::face_descriptor::FaceDescriptor;
use crate::pipeline::pipeline_logger::PipelineLogger;
use crate::shared::frame::Frame;
use crate::shared::geometry::Extent;

use super::draw_target::DrawTarget;

/// What a single redraw did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RedrawOutcome {
    /// Nothing has been captured yet; nothing was drawn.
    NoFrame,
    /// The surface has a zero-sized layout; nothing was drawn.
    Skipped,
    Presented { frame_index: usize, extent: Extent },
}

/// Composites the latest frame and draws it scaled to fill the target.
pub struct RenderSurface<T: DrawTarget> {
    compositor: OverlayCompositor,
    target: T,
    extent: Option<Extent>,
}

impl<T: DrawTarget> RenderSurface<T> {
    pub fn new(compositor: OverlayCompositor, target: T) -> Self {
        Self {
            compositor,
            target,
            extent: None,
        }
    }

    /// Set the size the next redraw fills. Until the first layout, frames
    /// are drawn at their own extent.
    pub fn layout(&mut self, width: u32, height: u32) {
        self.extent = Some(Extent::new(width, height));
    }

    pub fn extent(&self) -> Option<Extent> {
        self.extent
    }

    pub fn target(&self) -> &T {
        &self.target
    }

    pub fn redraw(
        &mut self,
        frame: Option<Arc<Frame>>,
        logger: &mut dyn PipelineLogger,
    ) -> Result<RedrawOutcome, Box<dyn std::error::Error>> {
        let Some(frame) = frame else {
            return Ok(RedrawOutcome::NoFrame);
        };
        let extent = self.extent.unwrap_or_else(|| frame.extent());
        if extent.is_empty() {
            return Ok(RedrawOutcome::Skipped);
        }

        let t0 = Instant::now();
        let composited = self.compositor.composite_both_eyes(&frame)?;
        logger.timing("composite", t0.elapsed().as_secs_f64() * 1000.0);
        log_face(frame.index(), self.compositor.last_face());
        logger.metric(
            "face_found",
            if self.compositor.last_face().is_some() { 1.0 } else { 0.0 },
        );

        let t1 = Instant::now();
        self.target
            .draw(&composited, composited.extent().to_rect(), extent)?;
        logger.timing("draw", t1.elapsed().as_secs_f64() * 1000.0);

        Ok(RedrawOutcome::Presented {
            frame_index: frame.index(),
            extent,
        })
    }
}

fn log_face(frame_index: usize, face: Option<&FaceDescriptor>) {
    let Some(face) = face else {
        log::debug!("frame {frame_index}: no face");
        return;
    };
    let b = &face.bounds;
    log::debug!(
        "frame {frame_index}: face ({:.0}, {:.0}) {:.0}x{:.0} conf {:.2} track {:?} left_eye {:?} right_eye {:?} mouth {:?}",
        b.x,
        b.y,
        b.width,
        b.height,
        face.confidence,
        face.track_id,
        face.left_eye.map(|p| (p.x.round(), p.y.round())),
        face.right_eye.map(|p| (p.x.round(), p.y.round())),
        face.mouth.map(|p| (p.x.round(), p.y.round())),
    );
}
