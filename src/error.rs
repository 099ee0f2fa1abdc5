// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Error types for the proximity monitor.

use std::fmt;

/// Result type alias for proximity operations.
pub type Result<T> = std::result::Result<T, SocialDistanceError>;

/// Main error type for the crate.
#[derive(Debug)]
pub enum SocialDistanceError {
    /// A pose with no keypoints was passed to center or height estimation.
    EmptyPose,
    /// A frame's pose list contains a pose with no keypoints.
    InvalidPose {
        /// Position of the offending pose in the frame's pose list.
        index: usize,
    },
    /// Invalid configuration provided.
    ConfigError(String),
    /// IO error with context (file not found, permission denied, etc.).
    IoError(String),
    /// Wrapped `std::io::Error`.
    Io(std::io::Error),
    /// Error loading, decoding or saving images.
    ImageError(String),
    /// Malformed or unreadable pose export.
    PoseFileError(String),
    /// Video/stream processing error.
    VideoError(String),
    /// Display window error.
    VisualizerError(String),
    /// Input or output URI could not be opened.
    SourceError(String),
    /// Feature not enabled at compile time.
    FeatureNotEnabled(String),
}

impl fmt::Display for SocialDistanceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyPose => write!(f, "Invalid pose: no keypoints"),
            Self::InvalidPose { index } => {
                write!(f, "Invalid pose: person {index} has no keypoints")
            }
            Self::ConfigError(msg) => write!(f, "Config error: {msg}"),
            Self::IoError(msg) => write!(f, "IO error: {msg}"),
            Self::Io(err) => write!(f, "IO error: {err}"),
            Self::ImageError(msg) => write!(f, "Image error: {msg}"),
            Self::PoseFileError(msg) => write!(f, "Pose file error: {msg}"),
            Self::VideoError(msg) => write!(f, "Video error: {msg}"),
            Self::VisualizerError(msg) => write!(f, "Visualizer error: {msg}"),
            Self::SourceError(msg) => write!(f, "Source error: {msg}"),
            Self::FeatureNotEnabled(msg) => write!(f, "Feature not enabled: {msg}"),
        }
    }
}

impl std::error::Error for SocialDistanceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for SocialDistanceError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<image::ImageError> for SocialDistanceError {
    fn from(err: image::ImageError) -> Self {
        Self::ImageError(err.to_string())
    }
}

impl From<serde_json::Error> for SocialDistanceError {
    fn from(err: serde_json::Error) -> Self {
        Self::PoseFileError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SocialDistanceError::InvalidPose { index: 3 };
        assert_eq!(err.to_string(), "Invalid pose: person 3 has no keypoints");

        let err = SocialDistanceError::EmptyPose;
        assert_eq!(err.to_string(), "Invalid pose: no keypoints");

        let err = SocialDistanceError::ConfigError("test".to_string());
        assert_eq!(err.to_string(), "Config error: test");

        let err = SocialDistanceError::FeatureNotEnabled("video".to_string());
        assert_eq!(err.to_string(), "Feature not enabled: video");
    }

    #[test]
    fn test_io_error_source() {
        use std::error::Error;

        let err: SocialDistanceError =
            std::io::Error::new(std::io::ErrorKind::NotFound, "missing").into();
        assert!(err.source().is_some());
        assert!(SocialDistanceError::InvalidPose { index: 0 }.source().is_none());
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<Vec<u32>>("not json").unwrap_err();
        let err: SocialDistanceError = json_err.into();
        assert!(matches!(err, SocialDistanceError::PoseFileError(_)));
    }
}
