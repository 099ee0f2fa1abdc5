// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::{
    DEFAULT_ABS_THRESHOLD, DEFAULT_KEYPOINT_THRESHOLD, DEFAULT_REL_THRESHOLD, ProximityConfig,
};

/// CLI arguments parser.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
#[command(after_help = r#"Monitor Options:
    --image <IMAGE>              Analyze a single image and save it to <result-dir>
    [INPUT]                      Input stream (video file, /dev/video0, rtsp://, image directory)
    [OUTPUT]                     Primary output [default: display://0]
    --poses <POSES>              Pose export (JSON) replayed as the detector
    --threshold <THRESHOLD>      Minimum keypoint confidence [default: 0.15]
    --distance <DISTANCE>        Absolute distance threshold in pixels [default: 150]
    --rel-threshold <REL>        Distance/height threshold [default: 0.7]
    --overlay <OVERLAY>          links,keypoints,centers,pairs,status,all,none [default: links,keypoints]
    --result-dir <DIR>           Where results and recordings go [default: result]
    --no-record                  Do not record the realtime stream
    --json                       Print one JSON record per frame

Examples:
    social-distance monitor --image street.jpg --poses street.json
    social-distance monitor walk.mp4 --poses walk.json --overlay all
    social-distance monitor /dev/video0 display://0 --poses live.json --no-record
    social-distance analyze walk.json --distance 120 --json"#)]
pub struct Cli {
    #[command(subcommand)]
    /// Subcommand to execute.
    pub command: Commands,
}

/// Commands for the CLI.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Monitor an image, video, or stream for proximity violations
    Monitor(MonitorArgs),
    /// Analyze a pose export without touching images
    Analyze(AnalyzeArgs),
}

/// Thresholds shared by every command.
#[derive(Args, Debug, Clone, Copy)]
pub struct ThresholdArgs {
    /// Minimum keypoint confidence
    #[arg(long, default_value_t = DEFAULT_KEYPOINT_THRESHOLD)]
    pub threshold: f32,

    /// Absolute distance threshold in pixels
    #[arg(long, default_value_t = DEFAULT_ABS_THRESHOLD)]
    pub distance: f32,

    /// Relative threshold (distance / average height)
    #[arg(long = "rel-threshold", default_value_t = DEFAULT_REL_THRESHOLD)]
    pub rel_threshold: f32,
}

impl ThresholdArgs {
    #[must_use]
    pub fn to_config(&self) -> ProximityConfig {
        ProximityConfig::new()
            .with_abs_threshold(self.distance)
            .with_rel_threshold(self.rel_threshold)
            .with_keypoint_threshold(self.threshold)
    }
}

/// Arguments for the monitor command.
#[derive(Args, Debug)]
#[allow(clippy::struct_excessive_bools)]
pub struct MonitorArgs {
    /// Input stream URI (video file, webcam index or device, rtsp/http URL, image directory)
    pub input: Option<String>,

    /// Primary output URI (display://N, file://out.mp4, or a directory for frames)
    #[arg(default_value = "display://0")]
    pub output: String,

    /// Analyze a single image instead of a stream
    #[arg(long)]
    pub image: Option<String>,

    /// Pose export (JSON) replayed as the detector
    #[arg(long)]
    pub poses: Option<PathBuf>,

    #[command(flatten)]
    pub thresholds: ThresholdArgs,

    /// Layers drawn on each frame
    #[arg(long, default_value = "links,keypoints")]
    pub overlay: String,

    /// Directory for annotated images and recordings
    #[arg(long, default_value = "result")]
    pub result_dir: PathBuf,

    /// Do not record the realtime stream to <result-dir>
    #[arg(long, default_value_t = false)]
    pub no_record: bool,

    /// Print one JSON record per frame instead of text diagnostics
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// Show verbose output
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub verbose: bool,
}

/// Arguments for the analyze command.
#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// Pose export (JSON)
    pub poses: PathBuf,

    #[command(flatten)]
    pub thresholds: ThresholdArgs,

    /// Print one JSON record per frame
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// Show verbose output
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub verbose: bool,
}
