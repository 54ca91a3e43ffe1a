use std::sync::Mutex;

use iced::widget::{container, image, text};
use iced::{window, ContentFit, Element, Length, Size, Subscription, Task};

use eyeball_core::compositing::domain::overlay_asset::OverlayAsset;
use eyeball_core::rendering::domain::render_surface::RedrawOutcome;
use eyeball_core::shared::constants::APP_NAME;

use crate::settings::Settings;
use crate::startup::{Pipeline, StartupError};

#[derive(Debug, Clone)]
pub enum Message {
    /// The window is about to draw a new frame.
    Tick,
    Opened(window::Id),
    /// Logical size reported by the window.
    Resized(window::Id, Size),
    ScaleFactor(f32),
}

pub struct App {
    pipeline: Option<Pipeline>,
    image: Option<image::Handle>,
    logical_size: Size,
    scale_factor: f32,
}

impl App {
    pub fn new(pipeline: Option<Pipeline>, logical_size: Size) -> (Self, Task<Message>) {
        (
            Self {
                pipeline,
                image: None,
                logical_size,
                scale_factor: 1.0,
            },
            Task::none(),
        )
    }

    pub fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::Tick => self.present(),
            Message::Opened(id) => return window::scale_factor(id).map(Message::ScaleFactor),
            Message::Resized(id, size) => {
                self.logical_size = size;
                self.relayout();
                // Moving between monitors resizes the window; pick up the new factor too.
                return window::scale_factor(id).map(Message::ScaleFactor);
            }
            Message::ScaleFactor(factor) => {
                self.scale_factor = factor;
                self.relayout();
            }
        }
        Task::none()
    }

    /// The render surface is laid out in physical pixels.
    fn surface_extent(&self) -> (u32, u32) {
        physical_extent(self.logical_size, self.scale_factor)
    }

    fn relayout(&mut self) {
        let (width, height) = self.surface_extent();
        if let Some(pipeline) = self.pipeline.as_mut() {
            pipeline.layout(width, height);
        }
    }

    /// Redraw when the capture thread has delivered a new frame. A failed
    /// redraw keeps the previous image on screen.
    fn present(&mut self) {
        let Some(pipeline) = self.pipeline.as_mut() else {
            return;
        };
        match pipeline.redraw_if_requested() {
            Ok(Some(RedrawOutcome::Presented { .. })) => {
                if let Some(latest) = pipeline.surface().target().latest() {
                    self.image = Some(image::Handle::from_rgba(
                        latest.width,
                        latest.height,
                        latest.pixels.clone(),
                    ));
                }
            }
            Ok(_) => {}
            Err(e) => log::warn!("Redraw failed: {e}"),
        }
    }

    pub fn view(&self) -> Element<'_, Message> {
        match &self.image {
            Some(handle) => image(handle.clone())
                .content_fit(ContentFit::Fill)
                .width(Length::Fill)
                .height(Length::Fill)
                .into(),
            None => container(text("Waiting for camera\u{2026}"))
                .center(Length::Fill)
                .into(),
        }
    }

    pub fn subscription(&self) -> Subscription<Message> {
        Subscription::batch([
            window::frames().map(|_| Message::Tick),
            window::open_events().map(Message::Opened),
            window::resize_events().map(|(id, size)| Message::Resized(id, size)),
        ])
    }
}

/// Open the window and run until it is closed. The pipeline stops when the
/// app state is dropped.
pub fn run(pipeline: Pipeline, settings: &Settings) -> Result<(), StartupError> {
    // Boot may be invoked through a shared reference; hand the pipeline over once.
    let slot = Mutex::new(Some(pipeline));
    let size = Size::new(settings.window_width as f32, settings.window_height as f32);
    let boot = move || {
        let pipeline = slot.lock().ok().and_then(|mut guard| guard.take());
        App::new(pipeline, size)
    };

    iced::application(boot, App::update, App::view)
        .title(APP_NAME)
        .subscription(App::subscription)
        .window(window::Settings {
            size,
            icon: window_icon(),
            ..Default::default()
        })
        .run()?;
    Ok(())
}

/// Convert a logical window size to whole device pixels.
fn physical_extent(logical: Size, scale_factor: f32) -> (u32, u32) {
    let scale = if scale_factor.is_finite() && scale_factor > 0.0 {
        scale_factor
    } else {
        1.0
    };
    (
        (logical.width * scale).round().max(0.0) as u32,
        (logical.height * scale).round().max(0.0) as u32,
    )
}

fn window_icon() -> Option<window::Icon> {
    let eye = OverlayAsset::cartoon_eyeball(64);
    window::icon::from_rgba(eye.pixels().to_vec(), eye.width(), eye.height()).ok()
}
