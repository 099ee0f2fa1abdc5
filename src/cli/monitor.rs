// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use std::path::Path;

use crate::analyzer::ProximityAnalyzer;
use crate::annotate::{Annotator, OverlayOptions};
use crate::cli::analyze::print_frame;
use crate::cli::args::MonitorArgs;
use crate::cli::logging::set_verbose;
use crate::config::ProximityConfig;
use crate::detector::RecordedPoses;
use crate::error::{Result, SocialDistanceError};
use crate::io::{FrameSink, Output, open_sink, recording_output, result_path, save_image};
use crate::report::count_label;
use crate::source::{FrameSource, Source, SourceIterator};
use crate::stream::ProximityMonitor;
use crate::{VERSION, section, success, verbose, warn};

/// Window title for the display output.
const WINDOW_TITLE: &str = "Social Distance";

/// Frame rate used for recordings when the source does not report one.
const RECORD_FPS: f32 = 30.0;

/// Run proximity monitoring on a single image or a stream.
///
/// # Errors
///
/// Returns an error if neither `--image` nor an input is given, or on any
/// configuration, source, detector or sink failure.
pub fn run_monitor(args: &MonitorArgs) -> Result<()> {
    set_verbose(args.verbose && !args.json);

    let config = args.thresholds.to_config();
    let analyzer = ProximityAnalyzer::new(config)?;
    let overlay: OverlayOptions = args.overlay.parse()?;
    if !overlay.is_empty() && !Annotator::is_supported() {
        warn!(
            "--overlay requires the 'annotate' feature. Frames are rendered without annotations."
        );
    }

    verbose!("Social Distance {VERSION} 🚀 overlay={overlay}");
    let detector = load_detector(args.poses.as_deref(), &config)?;
    let monitor = ProximityMonitor::new(detector, analyzer, Annotator::new(overlay));

    if let Some(ref image) = args.image {
        return run_single_image(monitor, image, args);
    }

    let Some(ref input) = args.input else {
        return Err(SocialDistanceError::ConfigError(
            "please specify either --image or an input stream URI (e.g. /dev/video0)".to_string(),
        ));
    };
    run_stream(monitor, input, args)
}

fn load_detector(poses: Option<&Path>, config: &ProximityConfig) -> Result<RecordedPoses> {
    let Some(path) = poses else {
        warn!("'poses' argument is missing. Every frame is analyzed with no people in it.");
        return Ok(RecordedPoses::default());
    };
    let recorded = RecordedPoses::load(path, config.keypoint_threshold)?;
    verbose!(
        "Loaded poses for {} from {}",
        count_label(recorded.len(), "frame"),
        path.display()
    );
    Ok(recorded)
}

fn run_single_image(
    mut monitor: ProximityMonitor<RecordedPoses>,
    image: &str,
    args: &MonitorArgs,
) -> Result<()> {
    verbose!("Loading image: {image}");
    let source = Source::from(image);
    if !source.is_image() {
        return Err(SocialDistanceError::SourceError(format!(
            "--image expects a single image file, got {}",
            source.uri()
        )));
    }

    let mut frames = SourceIterator::new(source)?;
    let Some(mut frame) = frames.capture()? else {
        return Err(SocialDistanceError::SourceError(format!(
            "No frame read from {image}"
        )));
    };

    let outcome = monitor.process_frame(&mut frame)?;
    verbose!("Detected {} in image.", count_label(outcome.poses.len(), "person"));
    print_frame(
        outcome.frame_idx,
        &outcome.analysis,
        monitor.analyzer().config(),
        args.json,
    );

    let out_path = result_path(&args.result_dir, Path::new(image));
    save_image(&out_path, &frame.image)?;
    if args.verbose && !args.json {
        success!("Saved annotated image to: {}", out_path.display());
    }
    Ok(())
}

fn run_stream(
    mut monitor: ProximityMonitor<RecordedPoses>,
    input: &str,
    args: &MonitorArgs,
) -> Result<()> {
    let output: Output = args.output.parse()?;
    verbose!("Realtime mode from input='{input}' to output='{output}'");

    let mut frames = SourceIterator::new(Source::from(input))?;
    let mut sinks: Vec<Box<dyn FrameSink>> = vec![open_sink(&output, WINDOW_TITLE, RECORD_FPS)?];

    let recording = if args.no_record {
        None
    } else {
        let target = recording_output(&args.result_dir);
        sinks.push(open_sink(&target, WINDOW_TITLE, RECORD_FPS)?);
        verbose!("Recording realtime video to: {target}");
        Some(target)
    };

    let config = *monitor.analyzer().config();
    let stats = monitor.run(&mut frames, &mut sinks, |outcome| {
        print_frame(outcome.frame_idx, &outcome.analysis, &config, args.json);
    })?;

    section!("Summary");
    verbose!(
        "{} processed ({} with violations), {} missed, {:.1}ms mean detection + analysis",
        count_label(stats.frames, "frame"),
        stats.violation_frames,
        stats.missed,
        stats.mean_analysis_ms()
    );
    if let Some(target) = recording {
        verbose!("Finished. Recording saved to: {target}");
    } else {
        verbose!("Finished.");
    }
    Ok(())
}
