use std::sync::Arc;

use crate::capture::domain::frame_adapter::FrameAdapter;
use crate::capture::domain::frame_source::{CaptureError, FrameSource};
use crate::compositing::domain::overlay_compositor::OverlayCompositor;
use crate::rendering::domain::draw_target::DrawTarget;
use crate::rendering::domain::render_surface::{RedrawOutcome, RenderSurface};

use super::pipeline_coordinator::{PipelineCoordinator, PipelineStats};
use super::pipeline_logger::PipelineLogger;

/// Lifecycle of a [`LiveOverlayPipeline`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PipelineState {
    Uninitialized,
    Capturing,
    Stopped,
}

/// Wires a frame source to a render surface for live eye overlays.
///
/// The source pushes frames into the coordinator from its own thread. The
/// host calls [`redraw_if_requested`](Self::redraw_if_requested) (or
/// [`redraw`](Self::redraw)) from its presentation loop and
/// [`layout`](Self::layout) when the surface is resized. Detection and
/// compositing happen synchronously inside the redraw.
pub struct LiveOverlayPipeline<T: DrawTarget> {
    source: Box<dyn FrameSource>,
    coordinator: Arc<PipelineCoordinator>,
    surface: RenderSurface<T>,
    logger: Box<dyn PipelineLogger>,
    state: PipelineState,
}

impl<T: DrawTarget> LiveOverlayPipeline<T> {
    pub fn new(
        source: Box<dyn FrameSource>,
        compositor: OverlayCompositor,
        target: T,
        logger: Box<dyn PipelineLogger>,
    ) -> Self {
        Self {
            source,
            coordinator: Arc::new(PipelineCoordinator::new()),
            surface: RenderSurface::new(compositor, target),
            logger,
            state: PipelineState::Uninitialized,
        }
    }

    /// Open the source and begin capturing. Fails if the device cannot be
    /// opened or the pipeline was already started.
    pub fn start(&mut self) -> Result<(), CaptureError> {
        if self.state != PipelineState::Uninitialized {
            return Err(CaptureError::AlreadyStarted);
        }

        let coordinator = Arc::clone(&self.coordinator);
        let mut adapter = FrameAdapter::new();
        self.source.start(Box::new(move |raw| match adapter.adapt(&raw) {
            Ok(frame) => coordinator.on_frame_captured(Arc::new(frame)),
            Err(e) => log::warn!("Dropping captured frame: {e}"),
        }))?;

        self.state = PipelineState::Capturing;
        self.logger.info("Capture started");
        Ok(())
    }

    /// Redraw only if a new frame arrived since the last request was taken.
    pub fn redraw_if_requested(
        &mut self,
    ) -> Result<Option<RedrawOutcome>, Box<dyn std::error::Error>> {
        if !self.coordinator.take_redraw_request() {
            return Ok(None);
        }
        self.redraw().map(Some)
    }

    /// Composite and draw the latest frame, if there is one.
    pub fn redraw(&mut self) -> Result<RedrawOutcome, Box<dyn std::error::Error>> {
        let frame = self.coordinator.current_frame();
        let outcome = self.surface.redraw(frame, self.logger.as_mut())?;
        if let RedrawOutcome::Presented { .. } = outcome {
            self.coordinator.mark_presented();
            self.logger.frame_presented(&self.coordinator.stats());
        }
        Ok(outcome)
    }

    pub fn layout(&mut self, width: u32, height: u32) {
        log::debug!("Surface layout {width}x{height}");
        self.surface.layout(width, height);
    }

    /// Stop capturing and join the capture thread. Idempotent.
    pub fn stop(&mut self) {
        if self.state != PipelineState::Capturing {
            return;
        }
        self.source.stop();
        self.state = PipelineState::Stopped;
        self.logger.info("Capture stopped");
        self.logger.summary();
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn stats(&self) -> PipelineStats {
        self.coordinator.stats()
    }

    pub fn coordinator(&self) -> &Arc<PipelineCoordinator> {
        &self.coordinator
    }

    pub fn surface(&self) -> &RenderSurface<T> {
        &self.surface
    }
}

impl<T: DrawTarget> Drop for LiveOverlayPipeline<T> {
    fn drop(&mut self) {
        self.stop();
    }
}
