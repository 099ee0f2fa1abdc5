// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use crate::keypoint::KeypointId::{
    self, LeftAnkle, LeftEar, LeftElbow, LeftEye, LeftHip, LeftKnee, LeftShoulder, LeftWrist,
    Nose, RightAnkle, RightEar, RightElbow, RightEye, RightHip, RightKnee, RightShoulder,
    RightWrist,
};

/// COCO-Pose skeleton: keypoint pairs joined by a limb.
pub const SKELETON: [(KeypointId, KeypointId); 19] = [
    (LeftAnkle, LeftKnee),
    (LeftKnee, LeftHip),
    (RightAnkle, RightKnee),
    (RightKnee, RightHip),
    (LeftHip, RightHip),
    (LeftShoulder, LeftHip),
    (RightShoulder, RightHip),
    (LeftShoulder, RightShoulder),
    (LeftShoulder, LeftElbow),
    (RightShoulder, RightElbow),
    (LeftElbow, LeftWrist),
    (RightElbow, RightWrist),
    (LeftEye, RightEye),
    (Nose, LeftEye),
    (Nose, RightEye),
    (LeftEye, LeftEar),
    (RightEye, RightEar),
    (LeftEar, LeftShoulder),
    (RightEar, RightShoulder),
];

/// Limb color indices mapping to `POSE_COLORS`
/// Mapping: legs=orange, torso=pink, arms=blue, face=green
pub const LIMB_COLOR_INDICES: [usize; 19] = [
    0, 0, 0, 0, 7, 7, 7, 9, 9, 9, 9, 9, 16, 16, 16, 16, 16, 16, 16,
];

/// Keypoint color indices mapping to `POSE_COLORS`, in COCO order.
pub const KPT_COLOR_INDICES: [usize; 17] = [16, 16, 16, 16, 16, 9, 9, 9, 9, 9, 9, 0, 0, 0, 0, 0, 0];

/// Palette index for a keypoint. Keypoints outside COCO share the last slot.
#[must_use]
pub fn keypoint_color_index(id: KeypointId) -> usize {
    KPT_COLOR_INDICES
        .get(id.index() as usize)
        .copied()
        .unwrap_or(19)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skeleton_uses_coco_ids() {
        assert!(
            SKELETON
                .iter()
                .all(|(a, b)| a.index() < 17 && b.index() < 17 && a != b)
        );
        assert_eq!(SKELETON.len(), LIMB_COLOR_INDICES.len());
    }

    #[test]
    fn test_keypoint_color_index() {
        assert_eq!(keypoint_color_index(KeypointId::Nose), 16);
        assert_eq!(keypoint_color_index(KeypointId::LeftHip), 0);
        assert_eq!(keypoint_color_index(KeypointId::Neck), 19);
        assert_eq!(keypoint_color_index(KeypointId::Other(42)), 19);
    }
}
