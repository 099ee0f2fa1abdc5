// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use crate::analyzer::{FrameAnalysis, ProximityAnalyzer};
use crate::cli::args::AnalyzeArgs;
use crate::cli::logging::set_verbose;
use crate::config::ProximityConfig;
use crate::detector::RecordedPoses;
use crate::error::Result;
use crate::report::{FrameReport, count_label, diagnostic_lines, format_frame};
use crate::{error, info, section, status, verbose};

/// Print one frame's analysis, as a JSON line or as diagnostics plus a status line.
pub(crate) fn print_frame(
    frame_idx: usize,
    analysis: &FrameAnalysis,
    config: &ProximityConfig,
    json: bool,
) {
    if json {
        match FrameReport::new(frame_idx, analysis).to_json_line() {
            Ok(line) => {
                info!("{line}");
            }
            Err(e) => {
                error!("Failed to serialize frame {frame_idx}: {e}");
            }
        }
        return;
    }

    for line in diagnostic_lines(analysis, config) {
        verbose!("{line}");
    }
    status!(analysis.any_violation, "{}", format_frame(frame_idx, analysis));
}

/// Run the analyzer over every frame of a pose export.
///
/// # Errors
///
/// Returns an error if the thresholds are invalid, the export cannot be
/// loaded, or a recorded pose is empty.
pub fn run_analyze(args: &AnalyzeArgs) -> Result<()> {
    set_verbose(args.verbose && !args.json);

    let config = args.thresholds.to_config();
    let analyzer = ProximityAnalyzer::new(config)?;
    let recorded = RecordedPoses::load(&args.poses, config.keypoint_threshold)?;
    verbose!(
        "Loaded {} from {}",
        count_label(recorded.len(), "frame"),
        args.poses.display()
    );

    let mut violation_frames = 0;
    for (frame_idx, poses) in recorded.iter() {
        let analysis = analyzer.analyze(poses)?;
        if analysis.any_violation {
            violation_frames += 1;
        }
        print_frame(frame_idx, &analysis, &config, args.json);
    }

    section!("Summary");
    verbose!(
        "{} analyzed, {} with violations",
        count_label(recorded.len(), "frame"),
        violation_frames
    );
    Ok(())
}
