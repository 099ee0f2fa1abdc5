// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! On-screen window for annotated frames.

use image::DynamicImage;
use minifb::{Key, Window, WindowOptions};

use crate::error::{Result, SocialDistanceError};
use crate::io::FrameSink;

/// A simple image viewer using minifb.
///
/// The window is created on the first rendered frame so it opens at the
/// frame's size. Closing it, or pressing `Esc` or `Q`, stops streaming.
pub struct Viewer {
    title: String,
    display: u32,
    window: Option<Window>,
    pub width: usize,
    pub height: usize,
    buffer: Vec<u32>,
    closed: bool,
}

impl Viewer {
    /// Create a viewer for `display://<display>`. No window is opened until the first frame.
    #[must_use]
    pub fn new(title: &str, display: u32) -> Self {
        Self {
            title: title.to_string(),
            display,
            window: None,
            width: 0,
            height: 0,
            buffer: Vec::new(),
            closed: false,
        }
    }

    fn open_window(&self, width: usize, height: usize) -> Result<Window> {
        let mut window = Window::new(
            &self.title,
            width,
            height,
            WindowOptions {
                resize: true,
                ..WindowOptions::default()
            },
        )
        .map_err(|e| SocialDistanceError::VisualizerError(format!("Failed to create window: {e}")))?;

        // Limit update rate
        window.limit_update_rate(Some(std::time::Duration::from_micros(16600)));
        Ok(window)
    }

    fn user_closed(window: &Window) -> bool {
        !window.is_open() || window.is_key_down(Key::Escape) || window.is_key_down(Key::Q)
    }

    /// Update the window with a new image.
    ///
    /// Returns `false` once the user has closed the window.
    ///
    /// # Errors
    ///
    /// Returns an error if the window cannot be created or updated.
    pub fn update(&mut self, image: &DynamicImage) -> Result<bool> {
        if self.closed {
            return Ok(false);
        }

        let (img_width, img_height) = (image.width() as usize, image.height() as usize);
        if self.window.is_none() {
            self.window = Some(self.open_window(img_width, img_height)?);
        }

        // Pack as 0x00RRGGBB
        let rgb = image.to_rgb8();
        self.buffer.clear();
        self.buffer.extend(rgb.pixels().map(|p| {
            (u32::from(p[0]) << 16) | (u32::from(p[1]) << 8) | u32::from(p[2])
        }));
        self.width = img_width;
        self.height = img_height;

        let Some(window) = self.window.as_mut() else {
            return Ok(false);
        };
        if Self::user_closed(window) {
            self.closed = true;
            return Ok(false);
        }
        window
            .update_with_buffer(&self.buffer, self.width, self.height)
            .map_err(|e| {
                SocialDistanceError::VisualizerError(format!("Failed to update window: {e}"))
            })?;

        Ok(true)
    }
}

impl FrameSink for Viewer {
    fn render(&mut self, image: &DynamicImage) -> Result<()> {
        self.update(image).map(|_| ())
    }

    fn set_status(&mut self, status: &str) {
        if let Some(window) = self.window.as_mut() {
            window.set_title(&format!("{} | {status}", self.title));
        }
    }

    fn is_streaming(&self) -> bool {
        !self.closed
    }

    fn uri(&self) -> String {
        format!("display://{}", self.display)
    }
}
