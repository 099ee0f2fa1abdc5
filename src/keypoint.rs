// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Keypoint and pose types.
//!
//! Identifiers follow the COCO-17 body schema used by YOLO-pose and poseNet
//! `resnet18-body`. poseNet's extra `neck` joint (17) is named too; anything
//! beyond that is carried as [`KeypointId::Other`] and only contributes to the
//! fallback center and the height estimate.

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// Number of joints in the COCO body schema.
pub const NUM_COCO_KEYPOINTS: usize = 17;

/// Body joint identifier.
///
/// Identifiers compare by schema index, so `Other(11)` is the left hip.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub enum KeypointId {
    Nose,
    LeftEye,
    RightEye,
    LeftEar,
    RightEar,
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftWrist,
    RightWrist,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
    LeftAnkle,
    RightAnkle,
    /// poseNet body-model neck.
    Neck,
    /// Identifier outside the known schema.
    Other(u32),
}

impl KeypointId {
    /// The named joints in schema order.
    pub const NAMED: [Self; 18] = [
        Self::Nose,
        Self::LeftEye,
        Self::RightEye,
        Self::LeftEar,
        Self::RightEar,
        Self::LeftShoulder,
        Self::RightShoulder,
        Self::LeftElbow,
        Self::RightElbow,
        Self::LeftWrist,
        Self::RightWrist,
        Self::LeftHip,
        Self::RightHip,
        Self::LeftKnee,
        Self::RightKnee,
        Self::LeftAnkle,
        Self::RightAnkle,
        Self::Neck,
    ];

    /// Map a raw schema index to an identifier.
    #[must_use]
    pub const fn from_index(index: u32) -> Self {
        if (index as usize) < Self::NAMED.len() {
            Self::NAMED[index as usize]
        } else {
            Self::Other(index)
        }
    }

    /// Raw schema index of this identifier.
    #[must_use]
    pub const fn index(self) -> u32 {
        match self {
            Self::Nose => 0,
            Self::LeftEye => 1,
            Self::RightEye => 2,
            Self::LeftEar => 3,
            Self::RightEar => 4,
            Self::LeftShoulder => 5,
            Self::RightShoulder => 6,
            Self::LeftElbow => 7,
            Self::RightElbow => 8,
            Self::LeftWrist => 9,
            Self::RightWrist => 10,
            Self::LeftHip => 11,
            Self::RightHip => 12,
            Self::LeftKnee => 13,
            Self::RightKnee => 14,
            Self::LeftAnkle => 15,
            Self::RightAnkle => 16,
            Self::Neck => 17,
            Self::Other(index) => index,
        }
    }

    /// Snake-case joint name as used by pose exports.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match Self::from_index(self.index()) {
            Self::Nose => "nose",
            Self::LeftEye => "left_eye",
            Self::RightEye => "right_eye",
            Self::LeftEar => "left_ear",
            Self::RightEar => "right_ear",
            Self::LeftShoulder => "left_shoulder",
            Self::RightShoulder => "right_shoulder",
            Self::LeftElbow => "left_elbow",
            Self::RightElbow => "right_elbow",
            Self::LeftWrist => "left_wrist",
            Self::RightWrist => "right_wrist",
            Self::LeftHip => "left_hip",
            Self::RightHip => "right_hip",
            Self::LeftKnee => "left_knee",
            Self::RightKnee => "right_knee",
            Self::LeftAnkle => "left_ankle",
            Self::RightAnkle => "right_ankle",
            Self::Neck => "neck",
            Self::Other(_) => "other",
        }
    }
}

impl PartialEq for KeypointId {
    fn eq(&self, other: &Self) -> bool {
        self.index() == other.index()
    }
}

impl Eq for KeypointId {}

impl Hash for KeypointId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index().hash(state);
    }
}

impl From<u32> for KeypointId {
    fn from(index: u32) -> Self {
        Self::from_index(index)
    }
}

impl From<KeypointId> for u32 {
    fn from(id: KeypointId) -> Self {
        id.index()
    }
}

impl fmt::Display for KeypointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match Self::from_index(self.index()) {
            Self::Other(index) => write!(f, "keypoint_{index}"),
            named => f.write_str(named.name()),
        }
    }
}

/// A 2D point in image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Coordinate-wise midpoint of two points.
    #[must_use]
    pub fn midpoint(self, other: Self) -> Self {
        Self::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }
}

impl From<(f32, f32)> for Point {
    fn from((x, y): (f32, f32)) -> Self {
        Self::new(x, y)
    }
}

/// A single detected body joint.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    pub id: KeypointId,
    pub x: f32,
    pub y: f32,
    /// Detector confidence; exports without one are treated as fully confident.
    #[serde(default = "full_confidence")]
    pub conf: f32,
}

const fn full_confidence() -> f32 {
    1.0
}

impl Keypoint {
    #[must_use]
    pub const fn new(id: KeypointId, x: f32, y: f32) -> Self {
        Self {
            id,
            x,
            y,
            conf: 1.0,
        }
    }

    #[must_use]
    pub const fn with_conf(mut self, conf: f32) -> Self {
        self.conf = conf;
        self
    }

    #[must_use]
    pub const fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// All keypoints detected for one person in one frame.
///
/// Poses carry no identity: they are produced fresh per frame and the only
/// link between a pose and its derived geometry is its position in the
/// frame's pose list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Pose {
    keypoints: Vec<Keypoint>,
}

impl Pose {
    #[must_use]
    pub const fn new(keypoints: Vec<Keypoint>) -> Self {
        Self { keypoints }
    }

    /// Find the first keypoint with the given identifier.
    #[must_use]
    pub fn find(&self, id: KeypointId) -> Option<&Keypoint> {
        self.keypoints.iter().find(|kp| kp.id == id)
    }

    #[must_use]
    pub fn keypoints(&self) -> &[Keypoint] {
        &self.keypoints
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Keypoint> {
        self.keypoints.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.keypoints.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keypoints.is_empty()
    }

    /// Drop keypoints below `threshold` confidence.
    #[must_use]
    pub fn filtered(mut self, threshold: f32) -> Self {
        self.keypoints.retain(|kp| kp.conf >= threshold);
        self
    }
}

impl FromIterator<Keypoint> for Pose {
    fn from_iter<I: IntoIterator<Item = Keypoint>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Pose {
    type Item = &'a Keypoint;
    type IntoIter = std::slice::Iter<'a, Keypoint>;

    fn into_iter(self) -> Self::IntoIter {
        self.keypoints.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keypoint_id_roundtrip_indices() {
        for (i, id) in KeypointId::NAMED.iter().enumerate() {
            assert_eq!(id.index() as usize, i);
            assert_eq!(KeypointId::from_index(i as u32), *id);
        }
        assert_eq!(KeypointId::from_index(11), KeypointId::LeftHip);
        assert_eq!(KeypointId::from_index(12), KeypointId::RightHip);
        assert_eq!(KeypointId::from_index(42), KeypointId::Other(42));
    }

    #[test]
    fn test_other_ids_in_schema_match_named_joints() {
        use std::collections::HashSet;

        assert_eq!(KeypointId::Other(11), KeypointId::LeftHip);
        assert_eq!(KeypointId::Other(12), KeypointId::RightHip);
        assert_ne!(KeypointId::Other(18), KeypointId::Neck);
        assert_eq!(KeypointId::Other(12).to_string(), "right_hip");

        let ids: HashSet<KeypointId> = [KeypointId::Other(0), KeypointId::Nose].into();
        assert_eq!(ids.len(), 1);

        let pose = Pose::new(vec![Keypoint::new(KeypointId::Other(11), 10.0, 40.0)]);
        assert_eq!(pose.find(KeypointId::LeftHip).map(|kp| kp.y), Some(40.0));
    }

    #[test]
    fn test_keypoint_id_display() {
        assert_eq!(KeypointId::LeftHip.to_string(), "left_hip");
        assert_eq!(KeypointId::Other(20).to_string(), "keypoint_20");
    }

    #[test]
    fn test_keypoint_serde_uses_integer_ids() {
        let kp: Keypoint = serde_json::from_str(r#"{"id": 12, "x": 1.5, "y": 2.0}"#).unwrap();
        assert_eq!(kp.id, KeypointId::RightHip);
        assert!((kp.conf - 1.0).abs() < f32::EPSILON);

        let json = serde_json::to_string(&Keypoint::new(KeypointId::LeftHip, 0.0, 0.0)).unwrap();
        assert!(json.contains("\"id\":11"));
    }

    #[test]
    fn test_pose_find() {
        let pose = Pose::new(vec![
            Keypoint::new(KeypointId::Nose, 5.0, 1.0),
            Keypoint::new(KeypointId::RightHip, 7.0, 9.0),
        ]);
        assert_eq!(pose.find(KeypointId::RightHip).map(|kp| kp.x), Some(7.0));
        assert!(pose.find(KeypointId::LeftHip).is_none());
        assert_eq!(pose.len(), 2);
    }

    #[test]
    fn test_pose_filtered() {
        let pose: Pose = [
            Keypoint::new(KeypointId::Nose, 0.0, 0.0).with_conf(0.9),
            Keypoint::new(KeypointId::LeftEye, 0.0, 0.0).with_conf(0.1),
        ]
        .into_iter()
        .collect();
        let pose = pose.filtered(0.15);
        assert_eq!(pose.len(), 1);
        assert_eq!(pose.keypoints()[0].id, KeypointId::Nose);
    }

    #[test]
    fn test_point_midpoint() {
        let mid = Point::new(0.0, 10.0).midpoint(Point::new(4.0, 20.0));
        assert_eq!(mid, Point::new(2.0, 15.0));
    }
}
