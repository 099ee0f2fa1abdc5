// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Proximity analysis over one frame's detected poses.
//!
//! Each pose is reduced to a center point and a pixel height. Every unordered
//! pair of people is then scored twice: by the absolute distance between their
//! centers and by that distance normalized by the pair's average height. A
//! pair is a violation when either score falls strictly below its threshold.
//!
//! The analysis is a pure function of the frame: no state is carried between
//! frames and people are identified only by their index in the input list.

use std::fmt;

use serde::Serialize;

use crate::config::ProximityConfig;
use crate::error::{Result, SocialDistanceError};
use crate::keypoint::{KeypointId, Point, Pose};

/// Center and height estimate for one person.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PersonGeometry {
    pub center: Point,
    /// Vertical keypoint span in pixels.
    pub height: f32,
}

/// Distance scores and verdict for one unordered pair of people.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PairVerdict {
    /// Index of the first person (always less than `j`).
    pub i: usize,
    /// Index of the second person.
    pub j: usize,
    /// Euclidean distance between the two centers in pixels.
    pub abs_distance: f32,
    /// Height used for normalization; 1.0 when either height is degenerate.
    pub avg_height: f32,
    /// `abs_distance / avg_height`.
    pub rel_distance: f32,
    pub abs_violation: bool,
    pub rel_violation: bool,
}

impl PairVerdict {
    /// Whether either rule flagged this pair.
    #[must_use]
    pub const fn is_violation(&self) -> bool {
        self.abs_violation || self.rel_violation
    }
}

/// Overall status of a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FrameStatus {
    Safe,
    Violation,
}

impl fmt::Display for FrameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Safe => f.write_str("SAFE"),
            Self::Violation => f.write_str("VIOLATION"),
        }
    }
}

/// Result of analyzing one frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FrameAnalysis {
    /// True if at least one pair set either violation flag.
    pub any_violation: bool,
    /// Per-person geometry, in input order.
    pub persons: Vec<PersonGeometry>,
    /// One verdict per unordered pair, ordered by `(i, j)`.
    pub pairs: Vec<PairVerdict>,
}

impl FrameAnalysis {
    #[must_use]
    pub fn centers(&self) -> Vec<Point> {
        self.persons.iter().map(|p| p.center).collect()
    }

    #[must_use]
    pub fn heights(&self) -> Vec<f32> {
        self.persons.iter().map(|p| p.height).collect()
    }

    #[must_use]
    pub const fn status(&self) -> FrameStatus {
        if self.any_violation {
            FrameStatus::Violation
        } else {
            FrameStatus::Safe
        }
    }

    /// Pairs flagged by at least one rule.
    pub fn violations(&self) -> impl Iterator<Item = &PairVerdict> {
        self.pairs.iter().filter(|p| p.is_violation())
    }

    /// Number of people in the frame.
    #[must_use]
    pub fn num_people(&self) -> usize {
        self.persons.len()
    }
}

/// Estimate a person's center.
///
/// Uses the midpoint of the two hips when both are present, otherwise the
/// mean of all keypoints.
///
/// # Errors
///
/// Returns [`SocialDistanceError::EmptyPose`] if the pose has no keypoints.
pub fn person_center(pose: &Pose) -> Result<Point> {
    if pose.is_empty() {
        return Err(SocialDistanceError::EmptyPose);
    }

    if let (Some(left), Some(right)) = (
        pose.find(KeypointId::LeftHip),
        pose.find(KeypointId::RightHip),
    ) {
        return Ok(left.position().midpoint(right.position()));
    }

    #[allow(clippy::cast_precision_loss)]
    let n = pose.len() as f32;
    let (sum_x, sum_y) = pose
        .iter()
        .fold((0.0_f32, 0.0_f32), |(sx, sy), kp| (sx + kp.x, sy + kp.y));
    Ok(Point::new(sum_x / n, sum_y / n))
}

/// Estimate a person's on-screen height as the vertical span of its keypoints.
///
/// A single-keypoint pose has height 0.
///
/// # Errors
///
/// Returns [`SocialDistanceError::EmptyPose`] if the pose has no keypoints.
pub fn person_height(pose: &Pose) -> Result<f32> {
    if pose.is_empty() {
        return Err(SocialDistanceError::EmptyPose);
    }

    let (min_y, max_y) = pose
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), kp| {
            (lo.min(kp.y), hi.max(kp.y))
        });
    Ok(max_y - min_y)
}

/// Euclidean distance between two points.
#[must_use]
pub fn pairwise_distance(c1: Point, c2: Point) -> f32 {
    (c1.x - c2.x).hypot(c1.y - c2.y)
}

/// Height used to normalize a pair's distance.
///
/// Falls back to 1.0 unless both heights are strictly positive, so a
/// degenerate pose never divides by zero or a near-zero span.
#[must_use]
pub fn normalization_height(h1: f32, h2: f32) -> f32 {
    if h1 > 0.0 && h2 > 0.0 {
        (h1 + h2) / 2.0
    } else {
        1.0
    }
}

/// Analyze a frame's poses against explicit thresholds.
///
/// # Errors
///
/// Returns [`SocialDistanceError::InvalidPose`] with the offending index if
/// any pose has no keypoints.
pub fn analyze_poses(
    poses: &[Pose],
    abs_threshold: f32,
    rel_threshold: f32,
) -> Result<FrameAnalysis> {
    if poses.is_empty() {
        return Ok(FrameAnalysis::default());
    }

    let persons = poses
        .iter()
        .enumerate()
        .map(|(index, pose)| {
            let center = person_center(pose);
            let height = person_height(pose);
            match (center, height) {
                (Ok(center), Ok(height)) => Ok(PersonGeometry { center, height }),
                _ => Err(SocialDistanceError::InvalidPose { index }),
            }
        })
        .collect::<Result<Vec<_>>>()?;

    let n = persons.len();
    let mut pairs = Vec::with_capacity(n * n.saturating_sub(1) / 2);
    for i in 0..n {
        for j in (i + 1)..n {
            let (a, b) = (&persons[i], &persons[j]);
            let abs_distance = pairwise_distance(a.center, b.center);
            let avg_height = normalization_height(a.height, b.height);
            let rel_distance = abs_distance / avg_height;

            pairs.push(PairVerdict {
                i,
                j,
                abs_distance,
                avg_height,
                rel_distance,
                abs_violation: abs_distance < abs_threshold,
                rel_violation: rel_distance < rel_threshold,
            });
        }
    }

    let any_violation = pairs.iter().any(PairVerdict::is_violation);

    Ok(FrameAnalysis {
        any_violation,
        persons,
        pairs,
    })
}

/// Stateless analyzer bound to a set of thresholds.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProximityAnalyzer {
    config: ProximityConfig,
}

impl ProximityAnalyzer {
    /// Create an analyzer from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SocialDistanceError::ConfigError`] if the thresholds are invalid.
    pub fn new(config: ProximityConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    #[must_use]
    pub const fn config(&self) -> &ProximityConfig {
        &self.config
    }

    /// Analyze one frame's poses.
    ///
    /// # Errors
    ///
    /// Returns [`SocialDistanceError::InvalidPose`] if any pose is empty.
    pub fn analyze(&self, poses: &[Pose]) -> Result<FrameAnalysis> {
        analyze_poses(poses, self.config.abs_threshold, self.config.rel_threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keypoint::Keypoint;

    const EPS: f32 = 1e-4;

    /// Pose with hips at `(cx, cy)` spanning `height` pixels vertically.
    fn person(cx: f32, cy: f32, height: f32) -> Pose {
        Pose::new(vec![
            Keypoint::new(KeypointId::Nose, cx, cy - height / 2.0),
            Keypoint::new(KeypointId::LeftHip, cx - 10.0, cy),
            Keypoint::new(KeypointId::RightHip, cx + 10.0, cy),
            Keypoint::new(KeypointId::LeftAnkle, cx, cy + height / 2.0),
        ])
    }

    #[test]
    fn test_center_uses_hip_midpoint() {
        let pose = Pose::new(vec![
            Keypoint::new(KeypointId::Nose, 500.0, 0.0),
            Keypoint::new(KeypointId::LeftHip, 10.0, 40.0),
            Keypoint::new(KeypointId::RightHip, 30.0, 60.0),
        ]);
        assert_eq!(person_center(&pose).unwrap(), Point::new(20.0, 50.0));
    }

    #[test]
    fn test_center_symmetric_in_hip_order() {
        let a = Pose::new(vec![
            Keypoint::new(KeypointId::LeftHip, 10.0, 40.0),
            Keypoint::new(KeypointId::RightHip, 30.0, 60.0),
        ]);
        let b = Pose::new(vec![
            Keypoint::new(KeypointId::RightHip, 30.0, 60.0),
            Keypoint::new(KeypointId::LeftHip, 10.0, 40.0),
        ]);
        assert_eq!(person_center(&a).unwrap(), person_center(&b).unwrap());
    }

    #[test]
    fn test_center_uses_hips_given_as_raw_ids() {
        let pose = Pose::new(vec![
            Keypoint::new(KeypointId::Nose, 500.0, 0.0),
            Keypoint::new(KeypointId::Other(11), 10.0, 40.0),
            Keypoint::new(KeypointId::Other(12), 30.0, 60.0),
        ]);
        let center = person_center(&pose).unwrap();
        assert!((center.x - 20.0).abs() < EPS);
        assert!((center.y - 50.0).abs() < EPS);
    }

    #[test]
    fn test_center_falls_back_to_mean() {
        let pose = Pose::new(vec![
            Keypoint::new(KeypointId::Nose, 0.0, 0.0),
            Keypoint::new(KeypointId::LeftHip, 30.0, 90.0),
            Keypoint::new(KeypointId::LeftAnkle, 60.0, 30.0),
        ]);
        let center = person_center(&pose).unwrap();
        assert!((center.x - 30.0).abs() < EPS);
        assert!((center.y - 40.0).abs() < EPS);
    }

    #[test]
    fn test_empty_pose_is_rejected() {
        let empty = Pose::default();
        assert!(matches!(
            person_center(&empty),
            Err(SocialDistanceError::EmptyPose)
        ));
        assert!(matches!(
            person_height(&empty),
            Err(SocialDistanceError::EmptyPose)
        ));

        let poses = vec![person(0.0, 0.0, 100.0), Pose::default()];
        match analyze_poses(&poses, 150.0, 0.7) {
            Err(SocialDistanceError::InvalidPose { index }) => assert_eq!(index, 1),
            other => panic!("expected InvalidPose, got {other:?}"),
        }
    }

    #[test]
    fn test_height_is_vertical_span() {
        let pose = Pose::new(vec![
            Keypoint::new(KeypointId::Nose, 0.0, 25.0),
            Keypoint::new(KeypointId::LeftAnkle, 0.0, 225.0),
            Keypoint::new(KeypointId::LeftWrist, 0.0, 100.0),
        ]);
        assert!((person_height(&pose).unwrap() - 200.0).abs() < EPS);
    }

    #[test]
    fn test_single_keypoint_pose() {
        let pose = Pose::new(vec![Keypoint::new(KeypointId::Nose, 42.0, 7.0)]);
        assert_eq!(person_center(&pose).unwrap(), Point::new(42.0, 7.0));
        assert!(person_height(&pose).unwrap().abs() < EPS);

        // Height 0 triggers the normalization guard for every pair involving it.
        let poses = vec![pose, person(142.0, 7.0, 100.0)];
        let analysis = analyze_poses(&poses, 50.0, 0.5).unwrap();
        let pair = analysis.pairs[0];
        assert!((pair.avg_height - 1.0).abs() < f32::EPSILON);
        assert!((pair.rel_distance - pair.abs_distance).abs() < EPS);
    }

    #[test]
    fn test_pairwise_distance() {
        let d = pairwise_distance(Point::new(0.0, 0.0), Point::new(3.0, 4.0));
        assert!((d - 5.0).abs() < EPS);
    }

    #[test]
    fn test_normalization_height_guard() {
        assert!((normalization_height(100.0, 300.0) - 200.0).abs() < EPS);
        assert!((normalization_height(0.0, 300.0) - 1.0).abs() < f32::EPSILON);
        assert!((normalization_height(100.0, -5.0) - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_empty_frame() {
        let analysis = analyze_poses(&[], 150.0, 0.7).unwrap();
        assert!(!analysis.any_violation);
        assert!(analysis.persons.is_empty());
        assert!(analysis.pairs.is_empty());
        assert_eq!(analysis.status(), FrameStatus::Safe);
    }

    #[test]
    fn test_single_person_has_no_pairs() {
        let analysis = analyze_poses(&[person(0.0, 0.0, 100.0)], 1e6, 1e6).unwrap();
        assert_eq!(analysis.num_people(), 1);
        assert!(analysis.pairs.is_empty());
        assert!(!analysis.any_violation);
    }

    #[test]
    fn test_close_pair_violates_both_rules() {
        let poses = vec![person(0.0, 0.0, 200.0), person(100.0, 0.0, 200.0)];
        let analysis = analyze_poses(&poses, 150.0, 0.7).unwrap();
        let pair = analysis.pairs[0];

        assert!((pair.abs_distance - 100.0).abs() < EPS);
        assert!((pair.avg_height - 200.0).abs() < EPS);
        assert!((pair.rel_distance - 0.5).abs() < EPS);
        assert!(pair.abs_violation);
        assert!(pair.rel_violation);
        assert!(analysis.any_violation);
        assert_eq!(analysis.status(), FrameStatus::Violation);
    }

    #[test]
    fn test_distant_pair_is_safe() {
        let poses = vec![person(0.0, 0.0, 100.0), person(200.0, 0.0, 100.0)];
        let analysis = analyze_poses(&poses, 150.0, 0.7).unwrap();
        let pair = analysis.pairs[0];

        assert!((pair.abs_distance - 200.0).abs() < EPS);
        assert!((pair.rel_distance - 2.0).abs() < EPS);
        assert!(!pair.abs_violation);
        assert!(!pair.rel_violation);
        assert!(!analysis.any_violation);
    }

    #[test]
    fn test_threshold_equality_is_not_a_violation() {
        let poses = vec![person(0.0, 0.0, 100.0), person(150.0, 0.0, 100.0)];
        let analysis = analyze_poses(&poses, 150.0, 1.5).unwrap();
        let pair = analysis.pairs[0];
        assert!((pair.abs_distance - 150.0).abs() < EPS);
        assert!(!pair.abs_violation);
        assert!(!pair.rel_violation);
        assert!(!analysis.any_violation);
    }

    #[test]
    fn test_three_people_single_violating_pair() {
        let poses = vec![
            person(0.0, 0.0, 100.0),
            person(50.0, 0.0, 100.0),
            person(500.0, 0.0, 100.0),
        ];
        let analysis = analyze_poses(&poses, 150.0, 0.3).unwrap();

        let keys: Vec<(usize, usize)> = analysis.pairs.iter().map(|p| (p.i, p.j)).collect();
        assert_eq!(keys, vec![(0, 1), (0, 2), (1, 2)]);
        assert!((analysis.pairs[0].abs_distance - 50.0).abs() < EPS);
        assert!((analysis.pairs[1].abs_distance - 500.0).abs() < EPS);
        assert!((analysis.pairs[2].abs_distance - 450.0).abs() < EPS);

        let flagged: Vec<(usize, usize)> = analysis.violations().map(|p| (p.i, p.j)).collect();
        assert_eq!(flagged, vec![(0, 1)]);
        assert!(analysis.any_violation);
    }

    #[test]
    fn test_pair_count_and_or_aggregation() {
        for n in 0..7_usize {
            #[allow(clippy::cast_precision_loss)]
            let poses: Vec<Pose> = (0..n)
                .map(|k| person(k as f32 * 60.0, (k % 2) as f32 * 30.0, 80.0 + k as f32))
                .collect();
            let analysis = analyze_poses(&poses, 100.0, 0.9).unwrap();
            assert_eq!(analysis.pairs.len(), n * n.saturating_sub(1) / 2);
            let expected = analysis
                .pairs
                .iter()
                .any(|p| p.abs_violation || p.rel_violation);
            assert_eq!(analysis.any_violation, expected);
        }
    }

    #[test]
    fn test_centers_and_heights_preserve_order() {
        let poses = vec![person(5.0, 1.0, 10.0), person(-3.0, 2.0, 20.0)];
        let analysis = analyze_poses(&poses, 0.0, 0.0).unwrap();
        assert_eq!(
            analysis.centers(),
            vec![Point::new(5.0, 1.0), Point::new(-3.0, 2.0)]
        );
        let heights = analysis.heights();
        assert!((heights[0] - 10.0).abs() < EPS);
        assert!((heights[1] - 20.0).abs() < EPS);
    }

    #[test]
    fn test_analyzer_uses_config() {
        let analyzer =
            ProximityAnalyzer::new(ProximityConfig::new().with_abs_threshold(300.0)).unwrap();
        let poses = vec![person(0.0, 0.0, 100.0), person(200.0, 0.0, 100.0)];
        let analysis = analyzer.analyze(&poses).unwrap();
        assert!(analysis.pairs[0].abs_violation);

        assert!(ProximityAnalyzer::new(ProximityConfig::new().with_rel_threshold(-0.1)).is_err());
    }
}
