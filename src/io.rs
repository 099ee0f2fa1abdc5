// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Output sinks: display windows, video recordings and image files.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use image::DynamicImage;

#[cfg(feature = "video")]
use video_rs::{Encoder, Time, encode::Settings as EncoderSettings};

use crate::error::{Result, SocialDistanceError};
use crate::source::is_video_file;

#[cfg(feature = "video")]
use std::sync::Once;

#[cfg(feature = "video")]
static INIT: Once = Once::new();

/// File name of the realtime recording written next to single-image results.
pub const RECORDING_NAME: &str = "proximity_realtime";

/// Initialize `video-rs` and silence `FFmpeg` logging.
///
/// Safe to call multiple times.
#[allow(clippy::missing_const_for_fn)]
pub fn init_video() {
    #[cfg(feature = "video")]
    INIT.call_once(|| {
        if let Err(e) = video_rs::init() {
            eprintln!("Failed to initialize video-rs: {e}");
        }
    });
}

/// Accepts rendered frames.
pub trait FrameSink {
    /// Render one frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame cannot be written or displayed.
    fn render(&mut self, image: &DynamicImage) -> Result<()>;

    /// Show a one-line status (e.g. in a window title). Ignored by file sinks.
    fn set_status(&mut self, _status: &str) {}

    /// Frame rate reported by the source, passed before each frame is rendered.
    fn set_frame_rate(&mut self, _fps: f32) {}

    /// Whether the sink still accepts frames.
    fn is_streaming(&self) -> bool;

    /// Identifier of the sink for logging.
    fn uri(&self) -> String;

    /// Flush and close the sink.
    ///
    /// # Errors
    ///
    /// Returns an error if finalizing the output fails.
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Parsed output URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    /// On-screen window (`display://N`).
    Display(u32),
    /// Video file or frame directory (`file://path` or a bare path).
    File(PathBuf),
}

impl Output {
    /// Whether frames written here end up in a video container.
    #[must_use]
    pub fn is_video_file(&self) -> bool {
        matches!(self, Self::File(path) if is_video_file(path))
    }
}

impl FromStr for Output {
    type Err = SocialDistanceError;

    fn from_str(s: &str) -> Result<Self> {
        if let Some(rest) = s.strip_prefix("display://") {
            let idx = if rest.is_empty() {
                0
            } else {
                rest.parse::<u32>().map_err(|_| {
                    SocialDistanceError::SourceError(format!("Invalid display index in '{s}'"))
                })?
            };
            return Ok(Self::Display(idx));
        }

        let path = s.strip_prefix("file://").unwrap_or(s);
        if path.is_empty() {
            return Err(SocialDistanceError::SourceError(
                "Output path is empty".to_string(),
            ));
        }
        Ok(Self::File(PathBuf::from(path)))
    }
}

impl fmt::Display for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Display(idx) => write!(f, "display://{idx}"),
            Self::File(path) => write!(f, "file://{}", path.display()),
        }
    }
}

/// Open a sink for `output`.
///
/// # Arguments
///
/// * `output` - Where frames go.
/// * `title` - Window title for display outputs.
/// * `fps` - Frame rate for video file outputs.
///
/// # Errors
///
/// Returns [`SocialDistanceError::FeatureNotEnabled`] if the output needs a
/// feature that was not compiled in, or any error opening the output.
pub fn open_sink(output: &Output, title: &str, fps: f32) -> Result<Box<dyn FrameSink>> {
    match output {
        Output::Display(idx) => {
            #[cfg(feature = "visualize")]
            {
                Ok(Box::new(crate::visualizer::Viewer::new(title, *idx)))
            }
            #[cfg(not(feature = "visualize"))]
            {
                let _ = (title, idx);
                Err(SocialDistanceError::FeatureNotEnabled(format!(
                    "{output} requires the 'visualize' feature"
                )))
            }
        }
        Output::File(path) if is_video_file(path) => {
            #[cfg(feature = "video")]
            {
                Ok(Box::new(VideoFileSink::new(path.clone(), fps)))
            }
            #[cfg(not(feature = "video"))]
            {
                let _ = fps;
                Err(SocialDistanceError::FeatureNotEnabled(format!(
                    "{output} requires the 'video' feature"
                )))
            }
        }
        Output::File(path) => Ok(Box::new(ImageSequenceWriter::new(path.clone()))),
    }
}

/// Output used for the realtime recording inside `result_dir`.
///
/// An MP4 file when video encoding is available, otherwise a directory of frames.
#[must_use]
pub fn recording_output(result_dir: &Path) -> Output {
    if cfg!(feature = "video") {
        Output::File(result_dir.join(format!("{RECORDING_NAME}.mp4")))
    } else {
        Output::File(result_dir.join(RECORDING_NAME))
    }
}

/// Path of the annotated copy of `image_path` inside `result_dir`.
///
/// `photos/street.png` becomes `<result_dir>/street_result.png`.
#[must_use]
pub fn result_path(result_dir: &Path, image_path: &Path) -> PathBuf {
    let stem = image_path
        .file_stem()
        .map_or_else(|| "image".to_string(), |s| s.to_string_lossy().to_string());
    let ext = image_path
        .extension()
        .map_or_else(|| "jpg".to_string(), |e| e.to_string_lossy().to_string());
    result_dir.join(format!("{stem}_result.{ext}"))
}

/// Save an annotated image, creating parent directories as needed.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or the image cannot be encoded.
pub fn save_image(path: &Path, image: &DynamicImage) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|e| {
            SocialDistanceError::IoError(format!(
                "Failed to create directory {}: {e}",
                parent.display()
            ))
        })?;
    }
    image.save(path).map_err(|e| {
        SocialDistanceError::ImageError(format!("Failed to save {}: {e}", path.display()))
    })
}

/// Writes every frame as a numbered JPEG into a directory.
pub struct ImageSequenceWriter {
    dir: PathBuf,
    next_idx: usize,
}

impl ImageSequenceWriter {
    #[must_use]
    pub const fn new(dir: PathBuf) -> Self {
        Self { dir, next_idx: 0 }
    }

    /// Number of frames written so far.
    #[must_use]
    pub const fn frames_written(&self) -> usize {
        self.next_idx
    }
}

impl FrameSink for ImageSequenceWriter {
    fn render(&mut self, image: &DynamicImage) -> Result<()> {
        let path = self.dir.join(format!("frame_{:06}.jpg", self.next_idx));
        // JPEG has no alpha channel.
        save_image(&path, &DynamicImage::ImageRgb8(image.to_rgb8()))?;
        self.next_idx += 1;
        Ok(())
    }

    fn is_streaming(&self) -> bool {
        true
    }

    fn uri(&self) -> String {
        format!("file://{}", self.dir.display())
    }
}

/// A wrapper around `video-rs` encoder to simplify video saving.
#[cfg(feature = "video")]
pub struct VideoWriter {
    encoder: Encoder,
    frame_duration: Time,
    position: Time,
    width: usize,
    height: usize,
}

#[cfg(feature = "video")]
impl VideoWriter {
    /// Create a new `VideoWriter`.
    ///
    /// # Arguments
    ///
    /// * `path` - Output video path (e.g., "output.mp4").
    /// * `width` - Video width.
    /// * `height` - Video height.
    /// * `fps` - Frames per second.
    ///
    /// # Errors
    ///
    /// Returns an error if the encoder cannot be initialized.
    pub fn new<P: AsRef<Path>>(path: P, width: usize, height: usize, fps: f32) -> Result<Self> {
        init_video();
        let output_path = path.as_ref().to_path_buf();

        // Ensure parent directory exists
        if let Some(parent) = output_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                SocialDistanceError::IoError(format!(
                    "Failed to create directory {}: {e}",
                    parent.display()
                ))
            })?;
        }

        let settings = EncoderSettings::preset_h264_yuv420p(width, height, false);
        let encoder = Encoder::new(output_path.as_path(), settings).map_err(|e| {
            SocialDistanceError::VideoError(format!("Failed to create video encoder: {e}"))
        })?;

        let frame_duration = Time::from_secs_f64(1.0 / f64::from(fps));

        Ok(Self {
            encoder,
            frame_duration,
            position: Time::zero(),
            width,
            height,
        })
    }

    /// Write a frame to the video.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails or frame dimensions don't match.
    pub fn write_frame(&mut self, frame: &DynamicImage) -> Result<()> {
        let img_buffer = frame.to_rgb8();
        let width = img_buffer.width() as usize;
        let height = img_buffer.height() as usize;

        if width != self.width || height != self.height {
            return Err(SocialDistanceError::VideoError(format!(
                "Frame dimensions {}x{} do not match video dimensions {}x{}",
                width, height, self.width, self.height
            )));
        }

        let frame_array = ndarray::Array3::from_shape_vec((height, width, 3), img_buffer.into_raw())
            .map_err(|e| SocialDistanceError::VideoError(e.to_string()))?;

        self.encoder
            .encode(&frame_array, self.position)
            .map_err(|e| SocialDistanceError::VideoError(format!("Failed to encode frame: {e}")))?;

        self.position = self.position.aligned_with(self.frame_duration).add();
        Ok(())
    }

    /// Finish writing the video.
    ///
    /// # Errors
    ///
    /// Returns an error if the encoder fails to finish.
    pub fn finish(mut self) -> Result<()> {
        self.encoder.finish().map_err(|e| {
            SocialDistanceError::VideoError(format!("Failed to finish video encoding: {e}"))
        })
    }
}

/// Records frames to a video file.
///
/// Size and frame rate are fixed by the first frame. The rate given to
/// [`VideoFileSink::new`] applies only if the source reports none.
#[cfg(feature = "video")]
pub struct VideoFileSink {
    path: PathBuf,
    fps: f32,
    writer: Option<VideoWriter>,
}

#[cfg(feature = "video")]
impl VideoFileSink {
    #[must_use]
    pub const fn new(path: PathBuf, fps: f32) -> Self {
        Self {
            path,
            fps,
            writer: None,
        }
    }

    /// Frame rate the recording is (or will be) encoded at.
    #[must_use]
    pub const fn frame_rate(&self) -> f32 {
        self.fps
    }
}

#[cfg(feature = "video")]
impl FrameSink for VideoFileSink {
    fn render(&mut self, image: &DynamicImage) -> Result<()> {
        if self.writer.is_none() {
            self.writer = Some(VideoWriter::new(
                &self.path,
                image.width() as usize,
                image.height() as usize,
                self.fps,
            )?);
        }
        match self.writer.as_mut() {
            Some(writer) => writer.write_frame(image),
            None => Ok(()),
        }
    }

    fn set_frame_rate(&mut self, fps: f32) {
        if self.writer.is_none() && fps.is_finite() && fps > 0.0 {
            self.fps = fps;
        }
    }

    fn is_streaming(&self) -> bool {
        true
    }

    fn uri(&self) -> String {
        format!("file://{}", self.path.display())
    }

    fn finish(&mut self) -> Result<()> {
        match self.writer.take() {
            Some(writer) => writer.finish(),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_parsing() {
        assert_eq!("display://0".parse::<Output>().unwrap(), Output::Display(0));
        assert_eq!("display://".parse::<Output>().unwrap(), Output::Display(0));
        assert_eq!(
            "file://out/rec.mp4".parse::<Output>().unwrap(),
            Output::File(PathBuf::from("out/rec.mp4"))
        );
        assert_eq!(
            "frames".parse::<Output>().unwrap(),
            Output::File(PathBuf::from("frames"))
        );
        assert!("display://x".parse::<Output>().is_err());
        assert!("file://".parse::<Output>().is_err());
    }

    #[test]
    fn test_output_display_roundtrip() {
        let out = Output::File(PathBuf::from("a/b.mp4"));
        assert!(out.is_video_file());
        assert_eq!(out.to_string(), "file://a/b.mp4");
        assert_eq!(out.to_string().parse::<Output>().unwrap(), out);
        assert!(!Output::Display(1).is_video_file());
    }

    #[test]
    fn test_result_path() {
        let path = result_path(Path::new("result"), Path::new("photos/street.png"));
        assert_eq!(path, PathBuf::from("result/street_result.png"));

        let path = result_path(Path::new("result"), Path::new("noext"));
        assert_eq!(path, PathBuf::from("result/noext_result.jpg"));
    }

    #[test]
    fn test_recording_output() {
        let out = recording_output(Path::new("result"));
        assert_eq!(out.is_video_file(), cfg!(feature = "video"));
    }

    #[test]
    fn test_image_sequence_writer() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("frames");
        let mut sink = ImageSequenceWriter::new(target.clone());
        let image = DynamicImage::new_rgb8(8, 8);

        sink.render(&image).unwrap();
        sink.render(&image).unwrap();
        sink.finish().unwrap();

        assert!(sink.is_streaming());
        assert_eq!(sink.frames_written(), 2);
        assert!(target.join("frame_000000.jpg").exists());
        assert!(target.join("frame_000001.jpg").exists());
    }

    #[cfg(feature = "video")]
    #[test]
    fn test_video_sink_takes_source_frame_rate() {
        let mut sink = VideoFileSink::new(PathBuf::from("rec.mp4"), 30.0);
        sink.set_frame_rate(0.0);
        assert!((sink.frame_rate() - 30.0).abs() < f32::EPSILON);
        sink.set_frame_rate(25.0);
        assert!((sink.frame_rate() - 25.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_save_image_creates_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out_result.png");
        save_image(&path, &DynamicImage::new_rgb8(2, 2)).unwrap();
        assert!(path.exists());
    }
}
