use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender, TrySendError};

use crate::shared::frame::Frame;

use super::frame_slot::FrameSlot;

/// Frame counters since the coordinator was created.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub captured: u64,
    pub presented: u64,
    /// Frames replaced in the slot before any redraw read them.
    pub dropped: u64,
}

/// Hands frames from the capture thread to the presentation thread.
///
/// Holds only the most recent frame and a coalescing redraw trigger: any
/// number of captures between two redraws produce a single pending request,
/// and the redraw sees only the newest frame. Nothing is queued.
pub struct PipelineCoordinator {
    slot: FrameSlot,
    redraw_tx: Sender<()>,
    redraw_rx: Receiver<()>,
    captured: AtomicU64,
    presented: AtomicU64,
    dropped: AtomicU64,
}

impl PipelineCoordinator {
    pub fn new() -> Self {
        let (redraw_tx, redraw_rx) = crossbeam_channel::bounded(1);
        Self {
            slot: FrameSlot::new(),
            redraw_tx,
            redraw_rx,
            captured: AtomicU64::new(0),
            presented: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    /// Called on the capture thread for every frame. Never blocks.
    pub fn on_frame_captured(&self, frame: Arc<Frame>) {
        self.captured.fetch_add(1, Ordering::Relaxed);
        if self.slot.set(frame) {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
        match self.redraw_tx.try_send(()) {
            // Full means a redraw is already pending
            Ok(()) | Err(TrySendError::Full(())) => {}
            Err(TrySendError::Disconnected(())) => {
                log::debug!("Redraw trigger disconnected");
            }
        }
    }

    pub fn current_frame(&self) -> Option<Arc<Frame>> {
        self.slot.get()
    }

    /// Consumes a pending redraw request, if any. Never blocks.
    pub fn take_redraw_request(&self) -> bool {
        self.redraw_rx.try_recv().is_ok()
    }

    /// Receiver side of the redraw trigger for hosts that want to wait or
    /// select on it. Receiving consumes the request.
    pub fn redraw_requests(&self) -> Receiver<()> {
        self.redraw_rx.clone()
    }

    pub fn mark_presented(&self) {
        self.presented.fetch_add(1, Ordering::Relaxed);
    }

    pub fn stats(&self) -> PipelineStats {
        PipelineStats {
            captured: self.captured.load(Ordering::Relaxed),
            presented: self.presented.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

impl Default for PipelineCoordinator {
    fn default() -> Self {
        Self::new()
    }
}
