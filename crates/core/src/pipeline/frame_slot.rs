use std::sync::{Arc, Mutex, PoisonError};

use crate::shared::frame::Frame;

/// Single-frame cell shared between the capture and presentation threads.
///
/// `set` replaces whatever was there; `get` hands out another `Arc` to the
/// current frame, so readers never see a partially written buffer. A lock
/// is only held for a pointer swap.
#[derive(Default)]
pub struct FrameSlot {
    inner: Mutex<SlotState>,
}

#[derive(Default)]
struct SlotState {
    frame: Option<Arc<Frame>>,
    observed: bool,
}

impl FrameSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `frame`, discarding the previous one.
    ///
    /// Returns `true` if the discarded frame was never read.
    pub fn set(&self, frame: Arc<Frame>) -> bool {
        // Poisoning cannot leave an Option<Arc> half-written
        let mut state = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let dropped = state.frame.is_some() && !state.observed;
        state.frame = Some(frame);
        state.observed = false;
        dropped
    }

    pub fn get(&self) -> Option<Arc<Frame>> {
        let mut state = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        state.observed = true;
        state.frame.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::frame::PixelFormat;

    fn frame(index: usize) -> Arc<Frame> {
        Arc::new(Frame::new(vec![0; 3], 1, 1, PixelFormat::Rgb8, index))
    }

    #[test]
    fn test_empty_slot_returns_none() {
        assert!(FrameSlot::new().get().is_none());
    }

    #[test]
    fn test_latest_frame_wins() {
        let slot = FrameSlot::new();
        slot.set(frame(1));
        slot.set(frame(2));
        assert_eq!(slot.get().unwrap().index(), 2);
    }

    #[test]
    fn test_get_shares_the_stored_frame() {
        let slot = FrameSlot::new();
        let f = frame(7);
        slot.set(Arc::clone(&f));
        assert!(Arc::ptr_eq(&slot.get().unwrap(), &f));
    }

    #[test]
    fn test_reports_unobserved_replacement() {
        let slot = FrameSlot::new();
        assert!(!slot.set(frame(0)));
        assert!(slot.set(frame(1)));
        slot.get();
        assert!(!slot.set(frame(2)));
    }

    #[test]
    fn test_concurrent_set_and_get() {
        let slot = Arc::new(FrameSlot::new());
        let writer = {
            let slot = Arc::clone(&slot);
            std::thread::spawn(move || {
                for i in 0..1000 {
                    slot.set(frame(i));
                }
            })
        };
        let mut last = 0;
        for _ in 0..1000 {
            if let Some(f) = slot.get() {
                assert!(f.index() >= last, "frames must never go backwards");
                last = f.index();
            }
        }
        writer.join().unwrap();
        assert_eq!(slot.get().unwrap().index(), 999);
    }
}
