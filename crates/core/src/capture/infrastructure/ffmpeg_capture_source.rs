use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::capture::domain::frame_source::{
    CaptureError, FrameCallback, FrameSource, RawFrame, RawPixelFormat,
};
use crate::shared::orientation::normalize_rotation;

/// What to open and how.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CaptureConfig {
    /// Device name (`/dev/video0`, `0`, `video=Integrated Camera`) or a file/URL.
    pub input: String,
    /// libavdevice demuxer such as `v4l2`, `avfoundation` or `dshow`.
    /// `None` lets ffmpeg probe the input as a regular file or stream.
    pub input_format: Option<String>,
    /// Clockwise rotation in degrees that replaces the rotation the input reports.
    pub rotation_override: Option<i32>,
}

/// Captures frames from a camera or video file via ffmpeg-next
/// (libavdevice + libavformat + libavcodec).
///
/// Decoding runs on a dedicated thread that converts each frame to RGB24
/// and hands it to the callback. File inputs are paced to their frame rate
/// so they play like a live camera; the thread ends at end of stream.
pub struct FfmpegCaptureSource {
    config: CaptureConfig,
    stop_flag: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl FfmpegCaptureSource {
    pub fn new(config: CaptureConfig) -> Self {
        Self {
            config,
            stop_flag: Arc::new(AtomicBool::new(false)),
            handle: None,
        }
    }

    /// Whether the capture thread is still delivering frames.
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl FrameSource for FfmpegCaptureSource {
    fn start(&mut self, mut on_frame: FrameCallback) -> Result<(), CaptureError> {
        if self.handle.is_some() {
            return Err(CaptureError::AlreadyStarted);
        }
        self.stop_flag.store(false, Ordering::Relaxed);

        // ffmpeg contexts are not Send, so the input is opened on the capture
        // thread and only the outcome crosses back.
        let (ready_tx, ready_rx) = crossbeam_channel::bounded(1);
        let config = self.config.clone();
        let stop = Arc::clone(&self.stop_flag);

        let handle = std::thread::Builder::new()
            .name("capture".into())
            .spawn(move || {
                let mut session = match CaptureSession::open(&config) {
                    Ok(session) => {
                        let _ = ready_tx.send(Ok(()));
                        session
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                match session.run(&stop, &mut on_frame) {
                    Ok(frames) => log::info!("Capture of {} ended after {frames} frames", config.input),
                    Err(e) => log::warn!("Capture of {} failed: {e}", config.input),
                }
            })
            .map_err(|e| CaptureError::Thread(e.to_string()))?;

        match ready_rx.recv() {
            Ok(Ok(())) => {
                self.handle = Some(handle);
                Ok(())
            }
            Ok(Err(e)) => {
                let _ = handle.join();
                Err(e)
            }
            Err(_) => {
                let _ = handle.join();
                Err(CaptureError::Thread(
                    "capture thread exited before opening the input".into(),
                ))
            }
        }
    }

    fn stop(&mut self) {
        self.stop_flag.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::warn!("Capture thread panicked");
            }
        }
    }
}

impl Drop for FfmpegCaptureSource {
    fn drop(&mut self) {
        self.stop();
    }
}

/// An opened input, owned by the capture thread.
struct CaptureSession {
    ictx: ffmpeg_next::format::context::Input,
    stream_index: usize,
    decode: DecodeState,
}

struct DecodeState {
    decoder: ffmpeg_next::decoder::Video,
    scaler: ffmpeg_next::software::scaling::Context,
    width: u32,
    height: u32,
    rotation: i32,
    frame_interval: Option<Duration>,
    next_due: Option<Instant>,
    delivered: usize,
}

impl CaptureSession {
    fn open(config: &CaptureConfig) -> Result<Self, CaptureError> {
        let open_err = |reason: String| CaptureError::Open {
            input: config.input.clone(),
            reason,
        };

        ffmpeg_next::init().map_err(|e| open_err(e.to_string()))?;
        ffmpeg_next::device::register_all();

        let ictx = match &config.input_format {
            Some(name) => {
                let format = find_input_format(name)
                    .ok_or_else(|| open_err(format!("unknown input format '{name}'")))?;
                let ctx = ffmpeg_next::format::open_with(
                    &config.input,
                    &format,
                    ffmpeg_next::Dictionary::new(),
                )
                .map_err(|e| open_err(e.to_string()))?;
                match ctx {
                    ffmpeg_next::format::context::Context::Input(input) => input,
                    _ => return Err(open_err("not an input device".into())),
                }
            }
            None => ffmpeg_next::format::input(&config.input).map_err(|e| open_err(e.to_string()))?,
        };

        let stream = ictx
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or_else(|| CaptureError::NoVideoStream(config.input.clone()))?;
        let stream_index = stream.index();

        let codec_ctx = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())
            .map_err(|e| open_err(e.to_string()))?;
        let decoder = codec_ctx
            .decoder()
            .video()
            .map_err(|e| open_err(e.to_string()))?;
        let (width, height) = (decoder.width(), decoder.height());

        let scaler = ffmpeg_next::software::scaling::Context::get(
            decoder.format(),
            width,
            height,
            ffmpeg_next::format::Pixel::RGB24,
            width,
            height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )
        .map_err(|e| open_err(e.to_string()))?;

        let rotation = config
            .rotation_override
            .map(normalize_rotation)
            .unwrap_or_else(|| extract_rotation(&stream));

        // Devices deliver in real time on their own; files would otherwise
        // decode as fast as the CPU allows.
        let is_file = config.input_format.is_none() && Path::new(&config.input).is_file();
        let frame_interval = if is_file {
            frame_interval(stream.avg_frame_rate()).or_else(|| frame_interval(stream.rate()))
        } else {
            None
        };

        log::info!(
            "Opened {} ({width}x{height}, rotation {rotation}, {})",
            config.input,
            match frame_interval {
                Some(iv) => format!("paced at {:.1} fps", 1.0 / iv.as_secs_f64()),
                None => "live".to_string(),
            }
        );

        Ok(Self {
            ictx,
            stream_index,
            decode: DecodeState {
                decoder,
                scaler,
                width,
                height,
                rotation,
                frame_interval,
                next_due: None,
                delivered: 0,
            },
        })
    }

    /// Decodes until end of stream or until `stop` is set. Returns the
    /// number of frames delivered.
    fn run(
        &mut self,
        stop: &AtomicBool,
        on_frame: &mut FrameCallback,
    ) -> Result<usize, ffmpeg_next::Error> {
        for (stream, packet) in self.ictx.packets() {
            if stop.load(Ordering::Relaxed) {
                return Ok(self.decode.delivered);
            }
            if stream.index() != self.stream_index {
                continue;
            }
            if self.decode.decoder.send_packet(&packet).is_err() {
                continue;
            }
            self.decode.drain(stop, on_frame)?;
        }

        if !stop.load(Ordering::Relaxed) {
            self.decode.decoder.send_eof()?;
            self.decode.drain(stop, on_frame)?;
        }
        Ok(self.decode.delivered)
    }
}

impl DecodeState {
    fn drain(
        &mut self,
        stop: &AtomicBool,
        on_frame: &mut FrameCallback,
    ) -> Result<(), ffmpeg_next::Error> {
        let mut decoded = ffmpeg_next::util::frame::video::Video::empty();
        while self.decoder.receive_frame(&mut decoded).is_ok() {
            if stop.load(Ordering::Relaxed) {
                return Ok(());
            }
            let mut rgb = ffmpeg_next::util::frame::video::Video::empty();
            self.scaler.run(&decoded, &mut rgb)?;

            self.pace();
            on_frame(RawFrame {
                data: rgb.data(0).to_vec(),
                width: self.width,
                height: self.height,
                stride: rgb.stride(0),
                format: RawPixelFormat::Rgb24,
                rotation: self.rotation,
            });
            self.delivered += 1;
        }
        Ok(())
    }

    /// Sleeps until the next frame is due. Falling behind resets the clock
    /// instead of bursting to catch up.
    fn pace(&mut self) {
        let Some(interval) = self.frame_interval else {
            return;
        };
        let now = Instant::now();
        let due = self.next_due.unwrap_or(now);
        if due > now {
            std::thread::sleep(due - now);
            self.next_due = Some(due + interval);
        } else {
            self.next_due = Some(now + interval);
        }
    }
}

fn frame_interval(rate: ffmpeg_next::Rational) -> Option<Duration> {
    if rate.numerator() <= 0 || rate.denominator() <= 0 {
        return None;
    }
    Some(Duration::from_secs_f64(
        rate.denominator() as f64 / rate.numerator() as f64,
    ))
}

/// Extracts the rotation angle from a video stream.
///
/// Tries stream side data (DisplayMatrix) first, then falls back to the
/// `"rotate"` metadata tag. Returns 0, 90, 180, or 270.
fn extract_rotation(stream: &ffmpeg_next::format::stream::Stream) -> i32 {
    for side_data in stream.side_data() {
        if side_data.kind() == ffmpeg_next::codec::packet::side_data::Type::DisplayMatrix {
            if let Some(angle) = parse_display_matrix(side_data.data()) {
                return normalize_rotation(angle);
            }
        }
    }

    if let Some(rotate) = stream.metadata().get("rotate") {
        if let Ok(angle) = rotate.parse::<i32>() {
            return normalize_rotation(angle);
        }
    }

    0
}

/// Parses a 3x3 display matrix (9 x i32, 16.16 fixed-point, little-endian)
/// into the clockwise rotation in degrees needed to show the frame upright.
///
/// The matrix describes the inverse transform, hence the negation.
fn parse_display_matrix(data: &[u8]) -> Option<i32> {
    if data.len() < 36 {
        return None;
    }

    let m00 = i32::from_le_bytes(data[0..4].try_into().ok()?) as f64 / 65536.0;
    let m10 = i32::from_le_bytes(data[4..8].try_into().ok()?) as f64 / 65536.0;

    Some(-(m10.atan2(m00).to_degrees().round() as i32))
}

/// Looks up a libavdevice video input (`v4l2`, `avfoundation`, `dshow`, ...)
/// by name. The device iterator already yields `Format::Input` values.
fn find_input_format(name: &str) -> Option<ffmpeg_next::Format> {
    device_inputs().find(|f| f.name() == name)
}

/// Registered video input devices. With none registered the ffmpeg-next
/// iterator yields a null format and then never ends, so stop at the first
/// null entry.
fn device_inputs() -> impl Iterator<Item = ffmpeg_next::Format> {
    ffmpeg_next::device::register_all();
    ffmpeg_next::device::input::video().take_while(|format| match format {
        // SAFETY: only the pointer value is inspected, it is not dereferenced.
        ffmpeg_next::Format::Input(input) => unsafe { !input.as_ptr().is_null() },
        ffmpeg_next::Format::Output(_) => false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn create_test_video(path: &Path, num_frames: usize, width: u32, height: u32, fps: i32) {
        ffmpeg_next::init().unwrap();

        let mut octx = ffmpeg_next::format::output(path).unwrap();
        let global_header = octx
            .format()
            .flags()
            .contains(ffmpeg_next::format::Flags::GLOBAL_HEADER);

        let codec = ffmpeg_next::encoder::find(ffmpeg_next::codec::Id::MPEG4).unwrap();
        let mut ost = octx.add_stream(Some(codec)).unwrap();

        let mut encoder_ctx = ffmpeg_next::codec::context::Context::new_with_codec(codec)
            .encoder()
            .video()
            .unwrap();
        encoder_ctx.set_width(width);
        encoder_ctx.set_height(height);
        encoder_ctx.set_format(ffmpeg_next::format::Pixel::YUV420P);
        encoder_ctx.set_time_base(ffmpeg_next::Rational(1, fps));
        encoder_ctx.set_frame_rate(Some(ffmpeg_next::Rational(fps, 1)));
        if global_header {
            encoder_ctx.set_flags(ffmpeg_next::codec::Flags::GLOBAL_HEADER);
        }

        let mut encoder = encoder_ctx
            .open_with(ffmpeg_next::Dictionary::new())
            .unwrap();
        ost.set_parameters(&encoder);
        octx.write_header().unwrap();
        let ost_time_base = octx.stream(0).unwrap().time_base();

        let mut scaler = ffmpeg_next::software::scaling::Context::get(
            ffmpeg_next::format::Pixel::RGB24,
            width,
            height,
            ffmpeg_next::format::Pixel::YUV420P,
            width,
            height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )
        .unwrap();

        for i in 0..num_frames {
            let mut rgb_frame = ffmpeg_next::util::frame::video::Video::new(
                ffmpeg_next::format::Pixel::RGB24,
                width,
                height,
            );
            let value = ((i * 40) % 256) as u8;
            rgb_frame.data_mut(0).fill(value);

            let mut yuv_frame = ffmpeg_next::util::frame::video::Video::empty();
            scaler.run(&rgb_frame, &mut yuv_frame).unwrap();
            yuv_frame.set_pts(Some(i as i64));
            encoder.send_frame(&yuv_frame).unwrap();
            let mut encoded = ffmpeg_next::Packet::empty();
            while encoder.receive_packet(&mut encoded).is_ok() {
                encoded.set_stream(0);
                encoded.rescale_ts(ffmpeg_next::Rational(1, fps), ost_time_base);
                encoded.write_interleaved(&mut octx).unwrap();
            }
        }

        encoder.send_eof().unwrap();
        let mut encoded = ffmpeg_next::Packet::empty();
        while encoder.receive_packet(&mut encoded).is_ok() {
            encoded.set_stream(0);
            encoded.rescale_ts(ffmpeg_next::Rational(1, fps), ost_time_base);
            encoded.write_interleaved(&mut octx).unwrap();
        }
        octx.write_trailer().unwrap();
    }

    fn test_video_path(dir: &Path) -> PathBuf {
        dir.join("test.mp4")
    }

    fn file_config(path: &Path) -> CaptureConfig {
        CaptureConfig {
            input: path.to_string_lossy().into_owned(),
            ..Default::default()
        }
    }

    fn collecting_callback() -> (FrameCallback, crossbeam_channel::Receiver<RawFrame>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        let callback: FrameCallback = Box::new(move |raw| {
            let _ = tx.send(raw);
        });
        (callback, rx)
    }

    fn wait_until_finished(source: &FfmpegCaptureSource) {
        let deadline = Instant::now() + Duration::from_secs(10);
        while source.is_running() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(10));
        }
    }

    #[test]
    fn test_start_nonexistent_input_fails_synchronously() {
        let mut source = FfmpegCaptureSource::new(file_config(Path::new("/nonexistent/cam.mp4")));
        let (callback, _rx) = collecting_callback();
        let result = source.start(callback);
        assert!(matches!(result, Err(CaptureError::Open { .. })));
        assert!(!source.is_running());
    }

    #[test]
    fn test_find_input_format_returns_registered_device_inputs() {
        ffmpeg_next::init().unwrap();
        assert!(find_input_format("no-such-device-format").is_none());
        for device in device_inputs() {
            let found = find_input_format(device.name()).unwrap();
            assert_eq!(found.name(), device.name());
            assert!(matches!(found, ffmpeg_next::Format::Input(_)));
        }
    }

    #[test]
    fn test_unknown_input_format_fails() {
        let mut source = FfmpegCaptureSource::new(CaptureConfig {
            input: "0".into(),
            input_format: Some("no-such-device-format".into()),
            rotation_override: None,
        });
        let (callback, _rx) = collecting_callback();
        assert!(matches!(source.start(callback), Err(CaptureError::Open { .. })));
    }

    #[test]
    fn test_file_delivers_every_frame_then_ends() {
        let dir = tempfile::tempdir().unwrap();
        let path = test_video_path(dir.path());
        create_test_video(&path, 5, 160, 120, 30);

        let mut source = FfmpegCaptureSource::new(file_config(&path));
        let (callback, rx) = collecting_callback();
        source.start(callback).unwrap();
        wait_until_finished(&source);
        source.stop();

        let frames: Vec<RawFrame> = rx.try_iter().collect();
        assert_eq!(frames.len(), 5);
        for raw in &frames {
            assert_eq!((raw.width, raw.height), (160, 120));
            assert_eq!(raw.format, RawPixelFormat::Rgb24);
            assert!(raw.stride >= 160 * 3);
            assert!(raw.data.len() >= raw.stride * 119 + 160 * 3);
            assert_eq!(raw.rotation, 0);
        }
    }

    #[test]
    fn test_file_playback_is_paced() {
        let dir = tempfile::tempdir().unwrap();
        let path = test_video_path(dir.path());
        create_test_video(&path, 6, 64, 48, 20);

        let mut source = FfmpegCaptureSource::new(file_config(&path));
        let (callback, _rx) = collecting_callback();
        let started = Instant::now();
        source.start(callback).unwrap();
        wait_until_finished(&source);
        source.stop();

        // Six frames at 20 fps span five 50 ms intervals
        assert!(started.elapsed() >= Duration::from_millis(200));
    }

    #[test]
    fn test_rotation_override_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = test_video_path(dir.path());
        create_test_video(&path, 2, 64, 48, 30);

        let mut source = FfmpegCaptureSource::new(CaptureConfig {
            rotation_override: Some(-90),
            ..file_config(&path)
        });
        let (callback, rx) = collecting_callback();
        source.start(callback).unwrap();
        wait_until_finished(&source);
        source.stop();

        let first = rx.try_recv().unwrap();
        assert_eq!(first.rotation, 270);
    }

    #[test]
    fn test_start_twice_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = test_video_path(dir.path());
        create_test_video(&path, 30, 64, 48, 30);

        let mut source = FfmpegCaptureSource::new(file_config(&path));
        let (first, _rx1) = collecting_callback();
        let (second, _rx2) = collecting_callback();
        source.start(first).unwrap();
        assert!(matches!(source.start(second), Err(CaptureError::AlreadyStarted)));
        source.stop();
    }

    #[test]
    fn test_stop_halts_delivery() {
        let dir = tempfile::tempdir().unwrap();
        let path = test_video_path(dir.path());
        create_test_video(&path, 60, 64, 48, 30);

        let mut source = FfmpegCaptureSource::new(file_config(&path));
        let (callback, rx) = collecting_callback();
        source.start(callback).unwrap();
        rx.recv_timeout(Duration::from_secs(5)).unwrap();
        source.stop();
        assert!(!source.is_running());

        let after_stop = rx.try_iter().count();
        assert!(after_stop < 59, "stop should cut playback short");
    }

    #[test]
    fn test_stop_is_idempotent_and_safe_before_start() {
        let mut source = FfmpegCaptureSource::new(CaptureConfig::default());
        source.stop();
        source.stop();
    }

    #[test]
    fn test_parse_display_matrix_quarter_turn() {
        let mut data = vec![0u8; 36];
        data[4..8].copy_from_slice(&65536i32.to_le_bytes());
        let angle = parse_display_matrix(&data).unwrap();
        assert_eq!(normalize_rotation(angle), 270);
    }

    #[test]
    fn test_parse_display_matrix_identity() {
        let mut data = vec![0u8; 36];
        data[0..4].copy_from_slice(&65536i32.to_le_bytes());
        let angle = parse_display_matrix(&data).unwrap();
        assert_eq!(normalize_rotation(angle), 0);
    }

    #[test]
    fn test_parse_display_matrix_too_short() {
        assert!(parse_display_matrix(&[0u8; 20]).is_none());
    }

    #[test]
    fn test_frame_interval_from_rate() {
        let iv = frame_interval(ffmpeg_next::Rational(25, 1)).unwrap();
        assert_eq!(iv, Duration::from_millis(40));
        assert!(frame_interval(ffmpeg_next::Rational(0, 1)).is_none());
        assert!(frame_interval(ffmpeg_next::Rational(30, 0)).is_none());
    }
}
