// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Human-readable and JSON renderings of frame analyses.

use serde::Serialize;

use crate::analyzer::{FrameAnalysis, FrameStatus, PairVerdict, PersonGeometry};
use crate::config::ProximityConfig;
use crate::error::Result;

/// Plural of a count noun ("persons", "frames").
#[must_use]
pub fn pluralize(word: &str) -> String {
    format!("{word}s")
}

/// `"1 person"`, `"3 persons"`.
#[must_use]
pub fn count_label(count: usize, word: &str) -> String {
    if count == 1 {
        format!("{count} {word}")
    } else {
        format!("{count} {}", pluralize(word))
    }
}

/// `Person 0: center = (100.00, 200.00), height ~ 160.00 px`
#[must_use]
pub fn format_person(index: usize, person: &PersonGeometry) -> String {
    format!(
        "Person {index}: center = ({:.2}, {:.2}), height ~ {:.2} px",
        person.center.x, person.center.y, person.height
    )
}

/// `Person 0 - Person 1: abs = 100.00 px, avg_height = 1.00 px, norm = 100.00 => abs_violation=1, rel_violation=0`
#[must_use]
pub fn format_pair(pair: &PairVerdict) -> String {
    format!(
        "Person {} - Person {}: abs = {:.2} px, avg_height = {:.2} px, norm = {:.2} => abs_violation={}, rel_violation={}",
        pair.i,
        pair.j,
        pair.abs_distance,
        pair.avg_height,
        pair.rel_distance,
        u8::from(pair.abs_violation),
        u8::from(pair.rel_violation)
    )
}

#[must_use]
pub fn format_thresholds(config: &ProximityConfig) -> String {
    format!(
        "Absolute threshold = {:.2} px, relative threshold = {:.2} (distance/height)",
        config.abs_threshold, config.rel_threshold
    )
}

#[must_use]
pub fn format_verdict(analysis: &FrameAnalysis) -> String {
    if analysis.any_violation {
        "=> TOO CLOSE DETECTED (at least one rule violated)".to_string()
    } else {
        "=> NO VIOLATION (no pair closer than thresholds)".to_string()
    }
}

/// One-line frame summary, e.g. `frame 12: VIOLATION, people=3`.
#[must_use]
pub fn format_frame(frame_idx: usize, analysis: &FrameAnalysis) -> String {
    format!(
        "frame {frame_idx}: {}, people={}",
        analysis.status(),
        analysis.num_people()
    )
}

/// Full diagnostic block for one frame: persons, pairs, thresholds and verdict.
#[must_use]
pub fn diagnostic_lines(analysis: &FrameAnalysis, config: &ProximityConfig) -> Vec<String> {
    if analysis.persons.is_empty() {
        return vec!["No people detected.".to_string()];
    }

    let mut lines = Vec::with_capacity(analysis.persons.len() + analysis.pairs.len() + 4);
    lines.push("Person centers & heights (image coordinates):".to_string());
    lines.extend(
        analysis
            .persons
            .iter()
            .enumerate()
            .map(|(i, p)| format!("  {}", format_person(i, p))),
    );
    if !analysis.pairs.is_empty() {
        lines.push("Pairwise distances:".to_string());
        lines.extend(analysis.pairs.iter().map(|p| format!("  {}", format_pair(p))));
    }
    lines.push(format_thresholds(config));
    lines.push(format_verdict(analysis));
    lines
}

/// Serializable per-frame record used for `--json` output.
#[derive(Debug, Serialize)]
pub struct FrameReport<'a> {
    pub frame: usize,
    pub status: FrameStatus,
    pub people: usize,
    pub violations: usize,
    #[serde(flatten)]
    pub analysis: &'a FrameAnalysis,
}

impl<'a> FrameReport<'a> {
    #[must_use]
    pub fn new(frame: usize, analysis: &'a FrameAnalysis) -> Self {
        Self {
            frame,
            status: analysis.status(),
            people: analysis.num_people(),
            violations: analysis.violations().count(),
            analysis,
        }
    }

    /// Render as a single JSON line.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json_line(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::analyze_poses;
    use crate::keypoint::{Keypoint, KeypointId, Pose};

    fn single(x: f32, y: f32) -> Pose {
        Pose::new(vec![Keypoint::new(KeypointId::Nose, x, y)])
    }

    #[test]
    fn test_pluralize() {
        assert_eq!(pluralize("person"), "persons");
        assert_eq!(pluralize("pair"), "pairs");
        assert_eq!(count_label(1, "frame"), "1 frame");
        assert_eq!(count_label(0, "frame"), "0 frames");
    }

    #[test]
    fn test_pair_line_format() {
        let analysis = analyze_poses(&[single(0.0, 0.0), single(100.0, 0.0)], 150.0, 0.7).unwrap();
        assert_eq!(
            format_pair(&analysis.pairs[0]),
            "Person 0 - Person 1: abs = 100.00 px, avg_height = 1.00 px, norm = 100.00 => abs_violation=1, rel_violation=0"
        );
        assert_eq!(
            format_person(1, &analysis.persons[1]),
            "Person 1: center = (100.00, 0.00), height ~ 0.00 px"
        );
    }

    #[test]
    fn test_diagnostic_block() {
        let config = ProximityConfig::default();
        let analysis = analyze_poses(&[single(0.0, 0.0), single(200.0, 0.0)], 150.0, 0.7).unwrap();
        let lines = diagnostic_lines(&analysis, &config);
        assert_eq!(lines.len(), 1 + 2 + 1 + 1 + 2);
        assert_eq!(lines.last().unwrap(), &format_verdict(&analysis));
        assert!(lines.last().unwrap().contains("NO VIOLATION"));
        assert!(lines.iter().any(|l| l.starts_with("Absolute threshold = 150.00 px")));

        let empty = diagnostic_lines(&FrameAnalysis::default(), &config);
        assert_eq!(empty, vec!["No people detected.".to_string()]);
    }

    #[test]
    fn test_frame_line() {
        let analysis = analyze_poses(&[single(0.0, 0.0), single(50.0, 0.0)], 150.0, 0.7).unwrap();
        assert_eq!(format_frame(4, &analysis), "frame 4: VIOLATION, people=2");
        assert!(format_verdict(&analysis).contains("TOO CLOSE DETECTED"));
    }

    #[test]
    fn test_json_report() {
        let analysis = analyze_poses(&[single(0.0, 0.0), single(50.0, 0.0)], 150.0, 0.7).unwrap();
        let line = FrameReport::new(7, &analysis).to_json_line().unwrap();
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["frame"], 7);
        assert_eq!(value["status"], "VIOLATION");
        assert_eq!(value["people"], 2);
        assert_eq!(value["violations"], 1);
        assert_eq!(value["any_violation"], true);
        assert_eq!(value["pairs"][0]["abs_violation"], true);
        assert_eq!(value["persons"].as_array().unwrap().len(), 2);
    }
}
