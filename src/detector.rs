// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Pose detector seam.
//!
//! Pose estimation itself is performed by an external engine. This module
//! defines the [`PoseDetector`] trait the monitor calls once per frame, plus
//! two ways of feeding it: [`RecordedPoses`], which replays keypoints exported
//! by an upstream engine, and [`poses_from_array`], which converts a YOLO-pose
//! style `(N, K, 3)` keypoint tensor.
//!
//! # Pose export format
//!
//! A JSON array with one entry per frame. A frame is either a list of persons
//! or an object `{"frame": <index>, "poses": [...]}`. Each person is either:
//!
//! * a list of `{"id": 11, "x": 320.5, "y": 410.0, "conf": 0.92}` objects, or
//! * a list of `[x, y, conf]` (or `[x, y]`) rows in COCO keypoint order, as
//!   produced by `results[0].keypoints.data.tolist()`.
//!
//! ```json
//! [
//!   [[{"id": 11, "x": 100, "y": 300}, {"id": 12, "x": 140, "y": 302}]],
//!   {"frame": 5, "poses": []}
//! ]
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use ndarray::ArrayView3;
use serde::Deserialize;

use crate::error::{Result, SocialDistanceError};
use crate::keypoint::{Keypoint, KeypointId, Pose};
use crate::source::Frame;

/// Produces the poses visible in a frame.
pub trait PoseDetector {
    /// Detect every person in `frame`.
    ///
    /// # Errors
    ///
    /// Returns an error if detection fails; the monitor treats it as fatal.
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Pose>>;
}

impl<F> PoseDetector for F
where
    F: FnMut(&Frame) -> Result<Vec<Pose>>,
{
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Pose>> {
        self(frame)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PersonRecord {
    Rows(Vec<[f32; 3]>),
    RowsXy(Vec<[f32; 2]>),
    Keypoints(Vec<Keypoint>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FrameRecord {
    Indexed {
        frame: usize,
        poses: Vec<PersonRecord>,
    },
    Bare(Vec<PersonRecord>),
}

/// Exporters zero-fill keypoints they did not find.
fn is_missing_slot(x: f32, y: f32) -> bool {
    x == 0.0 && y == 0.0
}

fn pose_from_rows(rows: impl Iterator<Item = (f32, f32, f32)>, threshold: f32) -> Pose {
    rows.enumerate()
        .filter(|&(_, (x, y, conf))| conf >= threshold && !is_missing_slot(x, y))
        .map(|(k, (x, y, conf))| {
            #[allow(clippy::cast_possible_truncation)]
            let id = KeypointId::from_index(k as u32);
            Keypoint::new(id, x, y).with_conf(conf)
        })
        .collect()
}

impl PersonRecord {
    fn into_pose(self, threshold: f32) -> Pose {
        match self {
            Self::Rows(rows) => {
                pose_from_rows(rows.into_iter().map(|[x, y, c]| (x, y, c)), threshold)
            }
            Self::RowsXy(rows) => {
                pose_from_rows(rows.into_iter().map(|[x, y]| (x, y, 1.0)), threshold)
            }
            Self::Keypoints(keypoints) => Pose::new(keypoints).filtered(threshold),
        }
    }
}

/// Convert a keypoint tensor into poses.
///
/// `data` has shape `(N, K, 2)` or `(N, K, 3)`: one row of `[x, y(, conf)]`
/// per keypoint, in schema order. Keypoints below `threshold`, zero-filled
/// slots and persons left without keypoints are dropped.
///
/// # Errors
///
/// Returns [`SocialDistanceError::PoseFileError`] if the last dimension is
/// smaller than 2.
pub fn poses_from_array(data: ArrayView3<'_, f32>, threshold: f32) -> Result<Vec<Pose>> {
    let channels = data.shape()[2];
    if channels < 2 {
        return Err(SocialDistanceError::PoseFileError(format!(
            "Keypoint tensor must have shape (N, K, 2) or (N, K, 3), got {:?}",
            data.shape()
        )));
    }
    let has_conf = channels >= 3;
    Ok(data
        .outer_iter()
        .map(|person| {
            let rows = person.outer_iter().map(|row| {
                let conf = if has_conf { row[2] } else { 1.0 };
                (row[0], row[1], conf)
            });
            pose_from_rows(rows, threshold)
        })
        .filter(|pose| !pose.is_empty())
        .collect())
}

/// Replays poses exported by an external pose engine.
///
/// Poses are looked up by the frame index reported by the source, so a
/// retried capture never desynchronizes the replay. Frames missing from the
/// export have no people in them.
#[derive(Debug, Clone, Default)]
pub struct RecordedPoses {
    frames: BTreeMap<usize, Vec<Pose>>,
}

impl RecordedPoses {
    /// Load a pose export from disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a valid export.
    pub fn load<P: AsRef<Path>>(path: P, threshold: f32) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| {
            SocialDistanceError::IoError(format!("Failed to read {}: {e}", path.display()))
        })?;
        Self::from_json_str(&text, threshold).map_err(|e| match e {
            SocialDistanceError::PoseFileError(msg) => {
                SocialDistanceError::PoseFileError(format!("{}: {msg}", path.display()))
            }
            other => other,
        })
    }

    /// Parse a pose export.
    ///
    /// # Errors
    ///
    /// Returns [`SocialDistanceError::PoseFileError`] if the JSON does not
    /// match the export format.
    pub fn from_json_str(json: &str, threshold: f32) -> Result<Self> {
        let records: Vec<FrameRecord> = serde_json::from_str(json)?;

        let mut frames = BTreeMap::new();
        for (position, record) in records.into_iter().enumerate() {
            let (index, persons) = match record {
                FrameRecord::Indexed { frame, poses } => (frame, poses),
                FrameRecord::Bare(poses) => (position, poses),
            };
            let poses: Vec<Pose> = persons
                .into_iter()
                .map(|p| p.into_pose(threshold))
                .filter(|pose| !pose.is_empty())
                .collect();
            frames.insert(index, poses);
        }

        Ok(Self { frames })
    }

    /// Build a replay directly from per-frame poses.
    #[must_use]
    pub fn from_frames(frames: Vec<Vec<Pose>>) -> Self {
        Self {
            frames: frames.into_iter().enumerate().collect(),
        }
    }

    /// Poses recorded for `frame_idx` (empty if the frame is absent).
    #[must_use]
    pub fn poses(&self, frame_idx: usize) -> &[Pose] {
        self.frames.get(&frame_idx).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Recorded frames in index order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &[Pose])> {
        self.frames.iter().map(|(idx, poses)| (*idx, poses.as_slice()))
    }

    /// Number of frames present in the export.
    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl PoseDetector for RecordedPoses {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Pose>> {
        Ok(self.poses(frame.meta.frame_idx).to_vec())
    }
}
