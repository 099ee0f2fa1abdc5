// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Input source handling.
//!
//! This module provides abstractions for the inputs the monitor reads frames
//! from: single images, image folders, video files, webcams and streaming URLs.
//! Live sources may fail to deliver a frame on a given capture; that is
//! reported as `Ok(None)` and the caller simply retries.

use std::path::{Path, PathBuf};

use image::DynamicImage;

use crate::error::{Result, SocialDistanceError};

/// Consecutive failed reads after which a live source is considered closed.
#[cfg(feature = "video")]
const MAX_CONSECUTIVE_MISSES: usize = 100;

/// Represents different input sources.
#[derive(Debug, Clone)]
pub enum Source {
    /// Path to an image file.
    Image(PathBuf),
    /// In-memory image.
    ImageBuffer(DynamicImage),
    /// List of image paths.
    ImageList(Vec<PathBuf>),
    /// Path to a video file.
    Video(PathBuf),
    /// Webcam device index (`/dev/videoN` on Linux).
    Webcam(u32),
    /// Streaming URL (RTSP, RTMP, HTTP).
    Stream(String),
    /// Directory containing images.
    Directory(PathBuf),
    /// Glob pattern for images.
    Glob(String),
}

impl Source {
    /// Check if this source is a single image.
    #[must_use]
    pub const fn is_image(&self) -> bool {
        matches!(self, Self::Image(_) | Self::ImageBuffer(_))
    }

    /// Check if this source is a video or stream.
    #[must_use]
    pub const fn is_video(&self) -> bool {
        matches!(self, Self::Video(_) | Self::Webcam(_) | Self::Stream(_))
    }

    /// Check if this source is a live device or network stream.
    #[must_use]
    pub const fn is_live(&self) -> bool {
        matches!(self, Self::Webcam(_) | Self::Stream(_))
    }

    /// Check if this source is a directory or glob pattern.
    #[must_use]
    pub const fn is_batch(&self) -> bool {
        matches!(
            self,
            Self::Directory(_) | Self::Glob(_) | Self::ImageList(_)
        )
    }

    /// Get the path if this source has one.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Image(p) | Self::Video(p) | Self::Directory(p) => Some(p),
            _ => None,
        }
    }

    /// Human-readable identifier for logs and frame metadata.
    #[must_use]
    pub fn uri(&self) -> String {
        match self {
            Self::Image(p) | Self::Video(p) | Self::Directory(p) => p.display().to_string(),
            Self::ImageBuffer(_) => "image".to_string(),
            Self::ImageList(paths) => format!("{} images", paths.len()),
            Self::Webcam(idx) => format!("/dev/video{idx}"),
            Self::Stream(url) | Self::Glob(url) => url.clone(),
        }
    }
}

/// Convert from a string URI to Source.
impl From<&str> for Source {
    fn from(s: &str) -> Self {
        // Check for webcam index
        if let Ok(idx) = s.parse::<u32>() {
            return Self::Webcam(idx);
        }

        // V4L2 device nodes, optionally with a scheme
        let device = s.strip_prefix("v4l2://").unwrap_or(s);
        if let Some(idx) = device
            .strip_prefix("/dev/video")
            .and_then(|n| n.parse::<u32>().ok())
        {
            return Self::Webcam(idx);
        }

        // Check for streaming URLs
        if s.starts_with("rtsp://")
            || s.starts_with("rtmp://")
            || s.starts_with("http://")
            || s.starts_with("https://")
        {
            return Self::Stream(s.to_string());
        }

        let s = s.strip_prefix("file://").unwrap_or(s);

        // Check for glob pattern
        if s.contains('*') {
            return Self::Glob(s.to_string());
        }

        let path = PathBuf::from(s);

        // Check if it's a directory
        if path.is_dir() {
            return Self::Directory(path);
        }

        if is_video_file(&path) {
            return Self::Video(path);
        }

        // Default to image
        Self::Image(path)
    }
}

impl From<String> for Source {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl From<PathBuf> for Source {
    fn from(path: PathBuf) -> Self {
        Self::from(path.to_string_lossy().as_ref())
    }
}

impl From<&Path> for Source {
    fn from(path: &Path) -> Self {
        Self::from(path.to_string_lossy().as_ref())
    }
}

impl From<DynamicImage> for Source {
    fn from(img: DynamicImage) -> Self {
        Self::ImageBuffer(img)
    }
}

impl From<u32> for Source {
    fn from(idx: u32) -> Self {
        Self::Webcam(idx)
    }
}

/// Check if a path is a video file based on extension.
pub(crate) fn is_video_file(path: &Path) -> bool {
    path.extension().is_some_and(|ext| {
        let ext = ext.to_string_lossy().to_lowercase();
        matches!(
            ext.as_str(),
            "mp4" | "avi" | "mov" | "mkv" | "wmv" | "flv" | "webm" | "m4v" | "mpeg" | "mpg"
        )
    })
}

/// Check if a path is an image file based on extension.
pub(crate) fn is_image_file(path: &Path) -> bool {
    path.extension().is_some_and(|ext| {
        let ext = ext.to_string_lossy().to_lowercase();
        matches!(
            ext.as_str(),
            "jpg" | "jpeg" | "png" | "bmp" | "webp"
        )
    })
}

/// Metadata about a source frame.
#[derive(Debug, Clone)]
pub struct SourceMeta {
    /// Frame index (0 for single images).
    pub frame_idx: usize,
    /// Total frames (1 for single images, may be unknown for streams).
    pub total_frames: Option<usize>,
    /// Source path or identifier.
    pub path: String,
    /// Frames per second (for video sources).
    pub fps: Option<f32>,
}

impl Default for SourceMeta {
    fn default() -> Self {
        Self {
            frame_idx: 0,
            total_frames: Some(1),
            path: String::new(),
            fps: None,
        }
    }
}

/// One captured frame.
#[derive(Debug, Clone)]
pub struct Frame {
    pub image: DynamicImage,
    pub meta: SourceMeta,
}

impl Frame {
    #[must_use]
    pub const fn new(image: DynamicImage, meta: SourceMeta) -> Self {
        Self { image, meta }
    }
}

/// Supplies frames on demand.
pub trait FrameSource {
    /// Capture the next frame.
    ///
    /// `Ok(None)` means no frame was available this time (a timeout on a live
    /// source, or the end of the input); check [`FrameSource::is_streaming`]
    /// to tell the two apart.
    ///
    /// # Errors
    ///
    /// Returns an error if a frame was read but could not be decoded.
    fn capture(&mut self) -> Result<Option<Frame>>;

    /// Whether the source may still produce frames.
    fn is_streaming(&self) -> bool;

    /// Identifier of the source for logging.
    fn uri(&self) -> String;
}

/// Reads frames from a [`Source`].
pub struct SourceIterator {
    source: Source,
    current_frame: usize,
    image_paths: Vec<PathBuf>,
    streaming: bool,
    #[cfg(feature = "video")]
    decoder: Option<video_rs::decode::Decoder>,
    #[cfg(feature = "video")]
    total_frames: Option<usize>,
    #[cfg(feature = "video")]
    consecutive_misses: usize,
}

impl SourceIterator {
    /// Create a new source iterator.
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be opened, or if it is a video
    /// source and the `video` feature is disabled.
    pub fn new(source: Source) -> Result<Self> {
        #[cfg(not(feature = "video"))]
        if source.is_video() {
            return Err(SocialDistanceError::FeatureNotEnabled(
                "Video and stream input requires the 'video' feature".to_string(),
            ));
        }

        let image_paths = match &source {
            Source::Directory(path) => Self::collect_images_from_dir(path)?,
            Source::Glob(pattern) => Self::collect_images_from_glob(pattern)?,
            Source::Image(path) => vec![path.clone()],
            Source::ImageList(paths) => paths.clone(),
            _ => vec![],
        };

        Ok(Self {
            source,
            current_frame: 0,
            image_paths,
            streaming: true,
            #[cfg(feature = "video")]
            decoder: None,
            #[cfg(feature = "video")]
            total_frames: None,
            #[cfg(feature = "video")]
            consecutive_misses: 0,
        })
    }

    /// The source being read.
    #[must_use]
    pub const fn source(&self) -> &Source {
        &self.source
    }

    /// Collect image paths from a directory.
    fn collect_images_from_dir(dir: &Path) -> Result<Vec<PathBuf>> {
        if !dir.is_dir() {
            return Err(SocialDistanceError::SourceError(format!(
                "Not a directory: {}",
                dir.display()
            )));
        }

        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(std::result::Result::ok)
            .map(|entry| entry.path())
            .filter(|path| is_image_file(path))
            .collect();

        paths.sort();
        Ok(paths)
    }

    /// Collect image paths from a glob pattern.
    ///
    /// Only supports patterns like "dir/*.jpg".
    fn collect_images_from_glob(pattern: &str) -> Result<Vec<PathBuf>> {
        let Some(star_pos) = pattern.find('*') else {
            return Ok(vec![PathBuf::from(pattern)]);
        };

        let dir_part = &pattern[..star_pos];
        let dir = if dir_part.is_empty() {
            Path::new(".")
        } else {
            Path::new(dir_part.trim_end_matches('/').trim_end_matches('\\'))
        };

        // Get extension filter from pattern (e.g., "*.jpg" -> "jpg")
        let ext_filter: Option<String> = pattern[star_pos..]
            .strip_prefix("*.")
            .map(str::to_lowercase);

        if !dir.is_dir() {
            return Err(SocialDistanceError::SourceError(format!(
                "Directory not found: {}",
                dir.display()
            )));
        }

        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(std::result::Result::ok)
            .map(|entry| entry.path())
            .filter(|path| {
                ext_filter.as_ref().map_or_else(
                    || is_image_file(path),
                    |ext| {
                        path.extension()
                            .is_some_and(|e| e.to_string_lossy().to_lowercase() == *ext)
                    },
                )
            })
            .collect();

        paths.sort();
        Ok(paths)
    }

    /// Get the next image from a file list.
    fn capture_image(&mut self) -> Result<Option<Frame>> {
        let Some(path) = self.image_paths.get(self.current_frame) else {
            self.streaming = false;
            return Ok(None);
        };

        let meta = SourceMeta {
            frame_idx: self.current_frame,
            total_frames: Some(self.image_paths.len()),
            path: path.to_string_lossy().to_string(),
            fps: None,
        };
        self.current_frame += 1;
        if self.current_frame >= self.image_paths.len() {
            self.streaming = false;
        }

        let image = image::open(path).map_err(|e| {
            SocialDistanceError::ImageError(format!("Failed to load {}: {e}", path.display()))
        })?;
        Ok(Some(Frame::new(image, meta)))
    }

    #[cfg(feature = "video")]
    fn open_decoder(&self) -> Result<video_rs::decode::Decoder> {
        crate::io::init_video();
        let decoder = match &self.source {
            Source::Video(path) => video_rs::decode::Decoder::new(path.as_path()),
            Source::Webcam(idx) => {
                let device = PathBuf::from(format!("/dev/video{idx}"));
                video_rs::decode::Decoder::new(device.as_path())
            }
            Source::Stream(url) => {
                let url = url.parse::<video_rs::Url>().map_err(|e| {
                    SocialDistanceError::SourceError(format!("Invalid stream URL {url}: {e}"))
                })?;
                video_rs::decode::Decoder::new(url)
            }
            other => {
                return Err(SocialDistanceError::SourceError(format!(
                    "Not a video source: {}",
                    other.uri()
                )));
            }
        };
        decoder.map_err(|e| {
            SocialDistanceError::VideoError(format!(
                "Failed to open {}: {e}",
                self.source.uri()
            ))
        })
    }

    /// Get the next video frame.
    #[cfg(feature = "video")]
    fn capture_video_frame(&mut self) -> Result<Option<Frame>> {
        if self.decoder.is_none() {
            let decoder = self.open_decoder()?;
            // Calculate total frames from duration and frame rate
            if !self.source.is_live()
                && let Ok(duration) = decoder.duration()
            {
                let fps = decoder.frame_rate();
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                {
                    self.total_frames = Some((duration.as_secs_f64() * f64::from(fps)) as usize);
                }
            }
            self.decoder = Some(decoder);
        }

        let Some(decoder) = self.decoder.as_mut() else {
            return Ok(None);
        };

        match decoder.decode() {
            Ok((_ts, frame)) => {
                self.consecutive_misses = 0;
                let meta = SourceMeta {
                    frame_idx: self.current_frame,
                    total_frames: self.total_frames,
                    path: self.source.uri(),
                    fps: Some(decoder.frame_rate()),
                };
                self.current_frame += 1;
                let image = video_frame_to_image(&frame)?;
                Ok(Some(Frame::new(image, meta)))
            }
            Err(video_rs::Error::ReadExhausted | video_rs::Error::DecodeExhausted) => {
                self.streaming = false;
                Ok(None)
            }
            Err(_) if self.source.is_live() => {
                // Timeouts and dropped packets on live inputs are transient.
                self.consecutive_misses += 1;
                if self.consecutive_misses >= MAX_CONSECUTIVE_MISSES {
                    self.streaming = false;
                }
                Ok(None)
            }
            Err(e) => {
                self.streaming = false;
                Err(SocialDistanceError::VideoError(format!(
                    "Failed to decode {}: {e}",
                    self.source.uri()
                )))
            }
        }
    }

    #[cfg(not(feature = "video"))]
    fn capture_video_frame(&mut self) -> Result<Option<Frame>> {
        self.streaming = false;
        Err(SocialDistanceError::FeatureNotEnabled(
            "Video support requires 'video' feature".to_string(),
        ))
    }
}

impl FrameSource for SourceIterator {
    fn capture(&mut self) -> Result<Option<Frame>> {
        if !self.streaming {
            return Ok(None);
        }

        match &self.source {
            Source::Image(_) | Source::Directory(_) | Source::Glob(_) | Source::ImageList(_) => {
                self.capture_image()
            }
            Source::ImageBuffer(img) => {
                let frame = Frame::new(img.clone(), SourceMeta::default());
                self.current_frame = 1;
                self.streaming = false;
                Ok(Some(frame))
            }
            Source::Video(_) | Source::Webcam(_) | Source::Stream(_) => self.capture_video_frame(),
        }
    }

    fn is_streaming(&self) -> bool {
        self.streaming
    }

    fn uri(&self) -> String {
        self.source.uri()
    }
}

impl Iterator for SourceIterator {
    type Item = Result<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        while self.streaming {
            match self.capture() {
                Ok(Some(frame)) => return Some(Ok(frame)),
                Ok(None) => {}
                Err(e) => return Some(Err(e)),
            }
        }
        None
    }
}

#[cfg(feature = "video")]
/// Convert a `video_rs` Frame (HWC RGB) to `DynamicImage`.
fn video_frame_to_image(arr: &video_rs::Frame) -> Result<DynamicImage> {
    let shape = arr.shape();
    let height = u32::try_from(shape[0]).map_err(|_| {
        SocialDistanceError::ImageError("Image height exceeds u32::MAX".to_string())
    })?;
    let width = u32::try_from(shape[1])
        .map_err(|_| SocialDistanceError::ImageError("Image width exceeds u32::MAX".to_string()))?;

    let rgb_data: Vec<u8> = arr.iter().copied().collect();

    let img_buffer = image::RgbImage::from_raw(width, height, rgb_data).ok_or_else(|| {
        SocialDistanceError::ImageError("Failed to create image from video frame".to_string())
    })?;

    Ok(DynamicImage::ImageRgb8(img_buffer))
}
