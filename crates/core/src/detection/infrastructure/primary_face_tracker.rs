/// Single-target tracker that follows the primary face across frames.
///
/// Association follows ByteTrack's two-tier rule restricted to one track:
/// the existing track is continued by the best-overlapping detection of any
/// confidence, but only a high-confidence detection may start a new track.
/// This keeps the overlay on the same face through momentary confidence
/// drops while ignoring weak spurious faces.
use super::math::bbox_iou;

#[derive(Clone, Debug)]
pub struct Detection {
    pub bbox: [f64; 4],
    pub score: f64,
}

/// The tracked primary face for the current frame.
#[derive(Clone, Debug, PartialEq)]
pub struct Track {
    pub id: u32,
    pub bbox: [f64; 4],
    /// Index into the detections passed to `update`.
    pub det_index: usize,
}

const HIGH_THRESH: f64 = 0.5;
const MATCH_THRESH: f64 = 0.3;

#[derive(Clone, Debug)]
struct TrackState {
    id: u32,
    bbox: [f64; 4],
    frames_lost: usize,
}

pub struct PrimaryFaceTracker {
    track: Option<TrackState>,
    next_id: u32,
    max_lost: usize,
}

impl PrimaryFaceTracker {
    pub fn new(max_lost: usize) -> Self {
        Self {
            track: None,
            next_id: 1,
            max_lost,
        }
    }

    /// Associate this frame's detections with the primary track.
    ///
    /// Returns `None` when the primary face is not visible in this frame.
    /// A lost track is kept internally for up to `max_lost` frames so the
    /// face keeps its id when it reappears.
    pub fn update(&mut self, detections: &[Detection]) -> Option<Track> {
        if let Some(di) = self.match_existing(detections) {
            return self.continue_track(di, &detections[di]);
        }

        if let Some(di) = best_high_confidence(detections) {
            return Some(self.start_track(di, &detections[di]));
        }

        self.age_track();
        None
    }

    fn match_existing(&self, detections: &[Detection]) -> Option<usize> {
        let track = self.track.as_ref()?;
        detections
            .iter()
            .enumerate()
            .map(|(i, d)| (i, bbox_iou(&track.bbox, &d.bbox)))
            .filter(|(_, iou)| *iou >= MATCH_THRESH)
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(i, _)| i)
    }

    fn continue_track(&mut self, det_index: usize, det: &Detection) -> Option<Track> {
        let track = self.track.as_mut()?;
        track.bbox = det.bbox;
        track.frames_lost = 0;
        Some(Track {
            id: track.id,
            bbox: track.bbox,
            det_index,
        })
    }

    fn start_track(&mut self, det_index: usize, det: &Detection) -> Track {
        let id = self.next_id;
        self.next_id += 1;
        self.track = Some(TrackState {
            id,
            bbox: det.bbox,
            frames_lost: 0,
        });
        Track {
            id,
            bbox: det.bbox,
            det_index,
        }
    }

    fn age_track(&mut self) {
        let max_lost = self.max_lost;
        if let Some(track) = self.track.as_mut() {
            track.frames_lost += 1;
            if track.frames_lost > max_lost {
                self.track = None;
            }
        }
    }
}

fn best_high_confidence(detections: &[Detection]) -> Option<usize> {
    detections
        .iter()
        .enumerate()
        .filter(|(_, d)| d.score >= HIGH_THRESH)
        .max_by(|a, b| {
            a.1.score
                .partial_cmp(&b.1.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .map(|(i, _)| i)
}
