/// YOLO-pose face landmark detector using ONNX Runtime via `ort`.
///
/// Handles letterbox preprocessing, inference, NMS post-processing, primary
/// face tracking and landmark smoothing. Produces at most one
/// [`FaceDescriptor`] per frame.
use std::path::Path;

use crate::detection::domain::detector_options::{
    DetectorAccuracy, DetectorOptions, HIGH_ACCURACY_INPUT_SIZE, LOW_ACCURACY_INPUT_SIZE,
};
use crate::detection::domain::face_descriptor::FaceDescriptor;
use crate::detection::domain::face_landmarks::FaceLandmarks;
use crate::detection::domain::landmark_detector::LandmarkDetector;
use crate::detection::domain::landmark_smoother::{LandmarkSmoother, LandmarkSmootherInterface};
use crate::shared::constants::TRACKER_MAX_LOST;
use crate::shared::frame::Frame;
use crate::shared::geometry::{Point, Rect};

use super::execution_provider::preferred_execution_providers;
use super::math::bbox_iou;
use super::primary_face_tracker::{Detection as TrackerDetection, PrimaryFaceTracker};

/// NMS IoU threshold.
const NMS_IOU_THRESH: f64 = 0.45;

/// Number of keypoints per detection (5 landmarks × 3 values each: x, y, conf).
const NUM_KEYPOINT_VALUES: usize = 15;

/// Minimum keypoint confidence to treat a landmark as visible.
const KEYPOINT_CONF_THRESH: f64 = 0.5;

/// Temporal stabilization used when tracking is enabled.
///
/// Tracker and smoother advance once per frame index. Repeat calls for the
/// same frame (one per eye pass) get that frame's result without aging the
/// track or blending the observation in a second time.
struct Tracking {
    tracker: PrimaryFaceTracker,
    smoother: Box<dyn LandmarkSmootherInterface>,
    last: Option<(usize, Option<FaceDescriptor>)>,
}

impl Tracking {
    fn new() -> Self {
        Self {
            tracker: PrimaryFaceTracker::new(TRACKER_MAX_LOST),
            smoother: Box::new(LandmarkSmoother::default()),
            last: None,
        }
    }
}

/// YOLO-pose landmark detector backed by an ONNX Runtime session.
pub struct OnnxLandmarkDetector {
    session: ort::session::Session,
    tracking: Option<Tracking>,
    confidence: f64,
    input_size: u32,
}

impl OnnxLandmarkDetector {
    /// Load a YOLO-pose ONNX model and prepare for inference.
    ///
    /// A model with a fixed NCHW input shape dictates the input size.
    /// Dynamic-shape models run at the size implied by `options.accuracy`.
    pub fn new(model_path: &Path, options: DetectorOptions) -> Result<Self, Box<dyn std::error::Error>> {
        options.validate()?;

        let session = ort::session::Session::builder()?
            .with_execution_providers(preferred_execution_providers())?
            .commit_from_file(model_path)?;

        let model_size = session.inputs().first().and_then(|input| {
            if let ort::value::ValueType::Tensor { ref shape, .. } = input.dtype() {
                // [N, C, H, W]; H and W are equal for square input
                if shape.len() >= 4 && shape[2] > 0 {
                    Some(shape[2] as u32)
                } else {
                    None
                }
            } else {
                None
            }
        });
        let input_size = resolve_input_size(model_size, options.accuracy);

        let tracking = options.tracking.then(Tracking::new);

        log::info!(
            "Landmark detector ready (input={input_size}, accuracy={:?}, tracking={})",
            options.accuracy,
            options.tracking
        );

        Ok(Self {
            session,
            tracking,
            confidence: options.confidence,
            input_size,
        })
    }

    fn infer(&mut self, frame: &Frame) -> Result<Vec<RawDetection>, Box<dyn std::error::Error>> {
        let (input_tensor, scale, pad_x, pad_y) = letterbox(frame, self.input_size);

        let input_value = ort::value::Tensor::from_array(input_tensor)?;
        let outputs = self.session.run(ort::inputs![input_value])?;
        if outputs.len() == 0 {
            return Err("YOLO model produced no outputs".into());
        }
        let tensor = outputs[0].try_extract_array::<f32>()?;
        let shape = tensor.shape().to_vec();

        // [1, features, detections] (transposed) or [1, detections, features]
        if shape.len() != 3 {
            return Err(format!("Unexpected YOLO output shape: {shape:?}").into());
        }
        let transposed = shape[1] < shape[2];
        let (num_dets, num_feats) = if transposed {
            (shape[2], shape[1])
        } else {
            (shape[1], shape[2])
        };

        let data = tensor.as_slice().ok_or("Cannot get tensor slice")?;
        let mut raw_dets = Vec::new();
        for i in 0..num_dets {
            let row: Vec<f32> = if transposed {
                (0..num_feats).map(|f| data[f * num_dets + i]).collect()
            } else {
                data[i * num_feats..(i + 1) * num_feats].to_vec()
            };
            if let Some(det) = parse_row(&row, self.confidence, scale, pad_x, pad_y) {
                raw_dets.push(det);
            }
        }

        Ok(nms(&mut raw_dets, NMS_IOU_THRESH))
    }
}

impl LandmarkDetector for OnnxLandmarkDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Option<FaceDescriptor>, Box<dyn std::error::Error>> {
        let detections = self.infer(frame)?;
        Ok(select_primary(&detections, frame.index(), self.tracking.as_mut()))
    }
}

/// Pick the primary face among NMS survivors.
///
/// Without tracking this is the highest-confidence detection (NMS output is
/// already sorted). With tracking the tracker decides, and the smoother
/// stabilizes the result.
fn select_primary(
    detections: &[RawDetection],
    frame_index: usize,
    tracking: Option<&mut Tracking>,
) -> Option<FaceDescriptor> {
    let Some(tracking) = tracking else {
        return detections.first().map(|d| d.to_descriptor(None));
    };

    if let Some((index, result)) = &tracking.last {
        if *index == frame_index {
            return result.clone();
        }
    }
    let result = advance_tracking(detections, tracking);
    tracking.last = Some((frame_index, result.clone()));
    result
}

fn advance_tracking(detections: &[RawDetection], tracking: &mut Tracking) -> Option<FaceDescriptor> {
    let tracker_dets: Vec<TrackerDetection> = detections
        .iter()
        .map(|d| TrackerDetection {
            bbox: d.bbox(),
            score: d.confidence,
        })
        .collect();

    let track = tracking.tracker.update(&tracker_dets)?;
    let descriptor = detections[track.det_index].to_descriptor(Some(track.id));
    Some(tracking.smoother.smooth(descriptor))
}

fn resolve_input_size(model_size: Option<u32>, accuracy: DetectorAccuracy) -> u32 {
    match (model_size, accuracy) {
        (Some(size), DetectorAccuracy::Low) => {
            log::info!("Model input fixed at {size}px; low accuracy setting has no effect");
            size
        }
        (Some(size), DetectorAccuracy::High) => size,
        (None, DetectorAccuracy::High) => HIGH_ACCURACY_INPUT_SIZE,
        (None, DetectorAccuracy::Low) => LOW_ACCURACY_INPUT_SIZE,
    }
}

// ---------------------------------------------------------------------------
// Preprocessing
// ---------------------------------------------------------------------------

/// Letterbox-resize a frame to `target_size` × `target_size`.
///
/// Returns `(NCHW float32 tensor, scale, pad_x, pad_y)`.
fn letterbox(frame: &Frame, target_size: u32) -> (ndarray::Array4<f32>, f64, u32, u32) {
    let fw = frame.width() as f64;
    let fh = frame.height() as f64;
    let target = target_size as f64;

    let scale = (target / fw).min(target / fh);
    let new_w = (fw * scale).round() as u32;
    let new_h = (fh * scale).round() as u32;
    let pad_x = (target_size - new_w) / 2;
    let pad_y = (target_size - new_h) / 2;

    // Padded with 114/255 gray, YOLO convention
    let gray = 114.0f32 / 255.0;
    let mut tensor =
        ndarray::Array4::<f32>::from_elem((1, 3, target_size as usize, target_size as usize), gray);

    let src = frame.as_ndarray(); // [H, W, C] u8
    let src_h = frame.height() as usize;
    let src_w = frame.width() as usize;

    // Nearest-neighbor resize; alpha, if any, is ignored
    for y in 0..new_h as usize {
        let src_y = ((y as f64 / scale) as usize).min(src_h - 1);
        for x in 0..new_w as usize {
            let src_x = ((x as f64 / scale) as usize).min(src_w - 1);
            let ty = pad_y as usize + y;
            let tx = pad_x as usize + x;
            for c in 0..3 {
                tensor[[0, c, ty, tx]] = src[[src_y, src_x, c]] as f32 / 255.0;
            }
        }
    }

    (tensor, scale, pad_x, pad_y)
}

// ---------------------------------------------------------------------------
// Postprocessing
// ---------------------------------------------------------------------------

#[derive(Clone, Debug)]
struct RawDetection {
    x1: f64,
    y1: f64,
    x2: f64,
    y2: f64,
    confidence: f64,
    landmarks: Option<FaceLandmarks>,
}

impl RawDetection {
    fn bbox(&self) -> [f64; 4] {
        [self.x1, self.y1, self.x2, self.y2]
    }

    fn to_descriptor(&self, track_id: Option<u32>) -> FaceDescriptor {
        let bounds = Rect::from_corners(self.bbox());
        match &self.landmarks {
            Some(lm) => lm.to_descriptor(bounds, self.confidence, track_id),
            None => FaceDescriptor {
                confidence: self.confidence,
                track_id,
                ..FaceDescriptor::new(bounds)
            },
        }
    }
}

/// Decode one output row: `[cx, cy, w, h, conf, kp0_x, kp0_y, kp0_conf, ...]`.
///
/// Coordinates are mapped from letterbox space back to frame space.
fn parse_row(row: &[f32], confidence: f64, scale: f64, pad_x: u32, pad_y: u32) -> Option<RawDetection> {
    if row.len() < 5 {
        return None;
    }
    let conf = row[4] as f64;
    if conf < confidence {
        return None;
    }

    let unmap = |v: f32, pad: u32| (v as f64 - pad as f64) / scale;
    let cx = row[0];
    let cy = row[1];
    let w = row[2];
    let h = row[3];

    let landmarks = (row.len() >= 5 + NUM_KEYPOINT_VALUES).then(|| {
        let mut pts = [None; 5];
        for (k, pt) in pts.iter_mut().enumerate() {
            let base = 5 + k * 3;
            if row[base + 2] as f64 >= KEYPOINT_CONF_THRESH {
                *pt = Some(Point::new(unmap(row[base], pad_x), unmap(row[base + 1], pad_y)));
            }
        }
        FaceLandmarks::new(pts)
    });

    Some(RawDetection {
        x1: unmap(cx - w / 2.0, pad_x),
        y1: unmap(cy - h / 2.0, pad_y),
        x2: unmap(cx + w / 2.0, pad_x),
        y2: unmap(cy + h / 2.0, pad_y),
        confidence: conf,
        landmarks,
    })
}

/// Greedy NMS: sort by confidence descending, suppress overlapping boxes.
fn nms(dets: &mut [RawDetection], iou_thresh: f64) -> Vec<RawDetection> {
    dets.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut keep = Vec::new();
    let mut suppressed = vec![false; dets.len()];

    for i in 0..dets.len() {
        if suppressed[i] {
            continue;
        }
        keep.push(dets[i].clone());
        for j in (i + 1)..dets.len() {
            if suppressed[j] {
                continue;
            }
            if bbox_iou(&dets[i].bbox(), &dets[j].bbox()) > iou_thresh {
                suppressed[j] = true;
            }
        }
    }
    keep
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
