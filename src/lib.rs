// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

#![allow(clippy::multiple_crate_versions)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! # Social Distance
//!
//! Proximity monitoring over human pose keypoints. Given the poses an external
//! pose engine detected in a frame, this library estimates where each person
//! stands and how tall they appear. It then flags every pair of people who are
//! closer than a configurable threshold.
//!
//! Two rules are evaluated for every unordered pair:
//!
//! - **Absolute** - pixel distance between the two person centers
//! - **Relative** - that distance divided by the pair's average height, which
//!   stays meaningful as people move closer to or further from the camera
//!
//! A pair is a violation when either distance is strictly below its threshold,
//! and a frame is a violation when any pair is.
//!
//! ## Quick Start (Library)
//!
//! ```rust
//! use social_distance::{Keypoint, KeypointId, Pose, ProximityAnalyzer, ProximityConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let person = |x: f32| {
//!         Pose::new(vec![
//!             Keypoint::new(KeypointId::Nose, x, 100.0),
//!             Keypoint::new(KeypointId::LeftHip, x - 10.0, 250.0),
//!             Keypoint::new(KeypointId::RightHip, x + 10.0, 250.0),
//!             Keypoint::new(KeypointId::LeftAnkle, x - 10.0, 400.0),
//!         ])
//!     };
//!
//!     let analyzer = ProximityAnalyzer::new(ProximityConfig::default())?;
//!     let analysis = analyzer.analyze(&[person(100.0), person(220.0)])?;
//!
//!     assert!(analysis.any_violation);
//!     for pair in analysis.violations() {
//!         println!("{} and {} are {:.0}px apart", pair.i, pair.j, pair.abs_distance);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Streams
//!
//! [`ProximityMonitor`] drives a [`PoseDetector`] and the analyzer over any
//! [`FrameSource`], annotating each frame and rendering it to [`FrameSink`]s:
//!
//! ```no_run
//! use social_distance::{
//!     Annotator, OverlayOptions, ProximityAnalyzer, ProximityConfig, ProximityMonitor,
//!     RecordedPoses, Source, SourceIterator,
//! };
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ProximityConfig::default();
//! let detector = RecordedPoses::load("walk.json", config.keypoint_threshold)?;
//! let mut monitor = ProximityMonitor::new(
//!     detector,
//!     ProximityAnalyzer::new(config)?,
//!     Annotator::new(OverlayOptions::ALL),
//! );
//!
//! let mut frames = SourceIterator::new(Source::from("frames/"))?;
//! let stats = monitor.run(&mut frames, &mut [], |outcome| {
//!     println!("frame {}: {}", outcome.frame_idx, outcome.analysis.status());
//! })?;
//! println!("{} of {} frames had violations", stats.violation_frames, stats.frames);
//! # Ok(())
//! # }
//! ```
//!
//! ## CLI Usage
//!
//! ```bash
//! # Single image: writes result/street_result.jpg
//! social-distance monitor --image street.jpg --poses street.json
//!
//! # Video to a window, recording to result/proximity_realtime.mp4
//! social-distance monitor walk.mp4 display://0 --poses walk.json --overlay all
//!
//! # Verdicts only, as JSON lines
//! social-distance analyze walk.json --json
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `annotate` | Skeleton, center, pair and banner overlays (default) |
//! | `visualize` | Real-time window display (default) |
//! | `video` | Video file, webcam and stream input; MP4 recording |
//!
//! ## License
//!
//! This project is licensed under [AGPL-3.0](https://ultralytics.com/license).

// Modules
pub mod analyzer;
pub mod annotate;
pub mod cli;
pub mod config;
pub mod detector;
pub mod error;
pub mod io;
pub mod keypoint;
pub mod report;
pub mod source;
pub mod stream;
pub mod visualizer;

// Re-export main types for convenience
pub use analyzer::{
    FrameAnalysis, FrameStatus, PairVerdict, PersonGeometry, ProximityAnalyzer, analyze_poses,
    normalization_height, pairwise_distance, person_center, person_height,
};
pub use annotate::{Annotator, OverlayOptions};
pub use config::ProximityConfig;
pub use detector::{PoseDetector, RecordedPoses, poses_from_array};
pub use error::{Result, SocialDistanceError};
pub use io::{FrameSink, ImageSequenceWriter, Output, open_sink};
pub use keypoint::{Keypoint, KeypointId, Point, Pose};
pub use source::{Frame, FrameSource, Source, SourceIterator, SourceMeta};
pub use stream::{FrameOutcome, ProximityMonitor, StreamStats};

#[cfg(feature = "video")]
pub use io::{VideoFileSink, VideoWriter};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name.
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(VERSION.contains('.'));
    }

    #[test]
    fn test_name() {
        assert_eq!(NAME, "social-distance");
    }
}
