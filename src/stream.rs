// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Frame-by-frame proximity monitoring.
//!
//! [`ProximityMonitor`] ties a [`PoseDetector`] to a [`ProximityAnalyzer`]
//! and drives them over a [`FrameSource`], one frame at a time:
//! capture, detect, analyze, annotate, render to every sink, push status.
//! The loop ends when the source or any sink stops streaming.

use std::time::{Duration, Instant};

use crate::analyzer::{FrameAnalysis, ProximityAnalyzer};
use crate::annotate::Annotator;
use crate::detector::PoseDetector;
use crate::error::Result;
use crate::io::FrameSink;
use crate::keypoint::Pose;
use crate::source::{Frame, FrameSource};

/// Result of processing one frame.
#[derive(Debug, Clone)]
pub struct FrameOutcome {
    /// Index reported by the source.
    pub frame_idx: usize,
    pub poses: Vec<Pose>,
    pub analysis: FrameAnalysis,
    /// Time spent in detection and analysis.
    pub elapsed: Duration,
}

/// Counters accumulated over a monitoring run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamStats {
    /// Frames processed.
    pub frames: usize,
    /// Frames with at least one violating pair.
    pub violation_frames: usize,
    /// Captures that returned no frame.
    pub missed: usize,
    /// Total detection and analysis time.
    pub analysis_time: Duration,
}

impl StreamStats {
    fn record(&mut self, outcome: &FrameOutcome) {
        self.frames += 1;
        if outcome.analysis.any_violation {
            self.violation_frames += 1;
        }
        self.analysis_time += outcome.elapsed;
    }

    /// Mean detection and analysis time per frame in milliseconds.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn mean_analysis_ms(&self) -> f64 {
        if self.frames == 0 {
            return 0.0;
        }
        self.analysis_time.as_secs_f64() * 1000.0 / self.frames as f64
    }
}

/// Smoothed loop rate.
#[derive(Debug, Clone, Copy, Default)]
struct FpsMeter {
    last: Option<Instant>,
    fps: f64,
}

impl FpsMeter {
    const SMOOTHING: f64 = 0.1;

    fn tick(&mut self) -> f64 {
        let now = Instant::now();
        if let Some(last) = self.last.replace(now) {
            let dt = now.duration_since(last).as_secs_f64();
            if dt > 0.0 {
                let instant = 1.0 / dt;
                self.fps = if self.fps == 0.0 {
                    instant
                } else {
                    self.fps + Self::SMOOTHING * (instant - self.fps)
                };
            }
        }
        self.fps
    }
}

/// Drives detection, analysis and annotation over a stream of frames.
pub struct ProximityMonitor<D> {
    detector: D,
    analyzer: ProximityAnalyzer,
    annotator: Annotator,
}

impl<D: PoseDetector> ProximityMonitor<D> {
    #[must_use]
    pub const fn new(detector: D, analyzer: ProximityAnalyzer, annotator: Annotator) -> Self {
        Self {
            detector,
            analyzer,
            annotator,
        }
    }

    #[must_use]
    pub const fn analyzer(&self) -> &ProximityAnalyzer {
        &self.analyzer
    }

    /// Detect, analyze and annotate a single frame in place.
    ///
    /// # Errors
    ///
    /// Returns an error if detection fails or a detected pose is empty.
    pub fn process_frame(&mut self, frame: &mut Frame) -> Result<FrameOutcome> {
        let start = Instant::now();
        let poses = self.detector.detect(frame)?;
        let analysis = self.analyzer.analyze(&poses)?;
        let elapsed = start.elapsed();

        self.annotator.annotate(&mut frame.image, &poses, &analysis);

        Ok(FrameOutcome {
            frame_idx: frame.meta.frame_idx,
            poses,
            analysis,
            elapsed,
        })
    }

    /// Run until the source or any sink stops streaming.
    ///
    /// `on_frame` is called after each frame is analyzed and before it is
    /// rendered. Every sink is finished before returning, even on error.
    ///
    /// # Errors
    ///
    /// Returns the first capture, detection, analysis or sink error.
    pub fn run<S, F>(
        &mut self,
        source: &mut S,
        sinks: &mut [Box<dyn FrameSink>],
        on_frame: F,
    ) -> Result<StreamStats>
    where
        S: FrameSource + ?Sized,
        F: FnMut(&FrameOutcome),
    {
        let result = self.drive(source, sinks, on_frame);
        let finished = sinks.iter_mut().try_for_each(|sink| sink.finish());
        let stats = result?;
        finished?;
        Ok(stats)
    }

    fn drive<S, F>(
        &mut self,
        source: &mut S,
        sinks: &mut [Box<dyn FrameSink>],
        mut on_frame: F,
    ) -> Result<StreamStats>
    where
        S: FrameSource + ?Sized,
        F: FnMut(&FrameOutcome),
    {
        let mut stats = StreamStats::default();
        let mut fps = FpsMeter::default();

        loop {
            let Some(mut frame) = source.capture()? else {
                if !source.is_streaming() {
                    break;
                }
                stats.missed += 1;
                continue;
            };

            let outcome = self.process_frame(&mut frame)?;
            stats.record(&outcome);
            on_frame(&outcome);

            let status = format!("{} | {:.0} FPS", outcome.analysis.status(), fps.tick());
            for sink in sinks.iter_mut() {
                if let Some(rate) = frame.meta.fps {
                    sink.set_frame_rate(rate);
                }
                sink.render(&frame.image)?;
                sink.set_status(&status);
            }

            if !source.is_streaming() || sinks.iter().any(|sink| !sink.is_streaming()) {
                break;
            }
        }

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotate::OverlayOptions;
    use crate::config::ProximityConfig;
    use crate::detector::RecordedPoses;
    use crate::error::SocialDistanceError;
    use crate::keypoint::{Keypoint, KeypointId};
    use crate::source::SourceMeta;
    use image::DynamicImage;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    /// Scripted source: `None` entries are transient misses.
    struct ScriptedSource {
        script: VecDeque<Option<usize>>,
        fps: Option<f32>,
    }

    impl ScriptedSource {
        fn new(script: &[Option<usize>]) -> Self {
            Self {
                script: script.iter().copied().collect(),
                fps: None,
            }
        }

        fn with_fps(mut self, fps: f32) -> Self {
            self.fps = Some(fps);
            self
        }
    }

    impl FrameSource for ScriptedSource {
        fn capture(&mut self) -> Result<Option<Frame>> {
            Ok(self.script.pop_front().flatten().map(|idx| {
                let meta = SourceMeta {
                    frame_idx: idx,
                    total_frames: None,
                    path: "scripted".to_string(),
                    fps: self.fps,
                };
                Frame::new(DynamicImage::new_rgb8(8, 8), meta)
            }))
        }

        fn is_streaming(&self) -> bool {
            !self.script.is_empty()
        }

        fn uri(&self) -> String {
            "scripted://".to_string()
        }
    }

    #[derive(Default)]
    struct SinkLog {
        rendered: usize,
        statuses: Vec<String>,
        frame_rates: Vec<f32>,
        finished: bool,
    }

    /// Sink that closes after `capacity` frames.
    struct CountingSink {
        log: Rc<RefCell<SinkLog>>,
        capacity: usize,
    }

    impl FrameSink for CountingSink {
        fn render(&mut self, _image: &DynamicImage) -> Result<()> {
            self.log.borrow_mut().rendered += 1;
            Ok(())
        }

        fn set_status(&mut self, status: &str) {
            self.log.borrow_mut().statuses.push(status.to_string());
        }

        fn set_frame_rate(&mut self, fps: f32) {
            self.log.borrow_mut().frame_rates.push(fps);
        }

        fn is_streaming(&self) -> bool {
            self.log.borrow().rendered < self.capacity
        }

        fn uri(&self) -> String {
            "counting://".to_string()
        }

        fn finish(&mut self) -> Result<()> {
            self.log.borrow_mut().finished = true;
            Ok(())
        }
    }

    fn sink(capacity: usize) -> (Box<dyn FrameSink>, Rc<RefCell<SinkLog>>) {
        let log = Rc::new(RefCell::new(SinkLog::default()));
        let sink = CountingSink {
            log: Rc::clone(&log),
            capacity,
        };
        (Box::new(sink), log)
    }

    fn person(cx: f32) -> Pose {
        Pose::new(vec![
            Keypoint::new(KeypointId::LeftHip, cx - 5.0, 100.0),
            Keypoint::new(KeypointId::RightHip, cx + 5.0, 100.0),
        ])
    }

    fn monitor<D: PoseDetector>(detector: D) -> ProximityMonitor<D> {
        let analyzer = ProximityAnalyzer::new(ProximityConfig::default()).unwrap();
        ProximityMonitor::new(detector, analyzer, Annotator::new(OverlayOptions::NONE))
    }

    #[test]
    fn test_run_retries_misses_until_source_ends() {
        let detector = RecordedPoses::from_frames(vec![
            vec![person(0.0), person(100.0)],
            vec![person(0.0), person(400.0)],
        ]);
        let mut source = ScriptedSource::new(&[None, Some(0), None, None, Some(1)]);
        let (display, log) = sink(usize::MAX);
        let mut sinks = vec![display];

        let mut seen = Vec::new();
        let stats = monitor(detector)
            .run(&mut source, &mut sinks, |o| {
                seen.push((o.frame_idx, o.analysis.any_violation));
            })
            .unwrap();

        assert_eq!(seen, vec![(0, true), (1, false)]);
        assert_eq!(stats.frames, 2);
        assert_eq!(stats.violation_frames, 1);
        assert_eq!(stats.missed, 3);

        let log = log.borrow();
        assert_eq!(log.rendered, 2);
        assert!(log.finished);
        assert!(log.statuses[0].starts_with("VIOLATION | "));
        assert!(log.statuses[1].starts_with("SAFE | "));
        assert!(log.statuses.iter().all(|s| s.ends_with(" FPS")));
    }

    #[test]
    fn test_run_stops_when_a_sink_closes() {
        let detector = |_: &Frame| -> Result<Vec<Pose>> { Ok(vec![person(0.0)]) };
        let mut source = ScriptedSource::new(&[Some(0), Some(1), Some(2), Some(3), Some(4)]);
        let (display, display_log) = sink(2);
        let (record, record_log) = sink(usize::MAX);
        let mut sinks = vec![display, record];

        let stats = monitor(detector).run(&mut source, &mut sinks, |_| {}).unwrap();

        assert_eq!(stats.frames, 2);
        assert_eq!(display_log.borrow().rendered, 2);
        assert_eq!(record_log.borrow().rendered, 2);
        assert!(record_log.borrow().finished);
    }

    #[test]
    fn test_run_passes_source_frame_rate_to_sinks() {
        let detector = |_: &Frame| -> Result<Vec<Pose>> { Ok(vec![]) };
        let mut source = ScriptedSource::new(&[Some(0), Some(1)]).with_fps(25.0);
        let (record, log) = sink(usize::MAX);
        let mut sinks = vec![record];

        monitor(detector).run(&mut source, &mut sinks, |_| {}).unwrap();
        assert_eq!(log.borrow().frame_rates, vec![25.0, 25.0]);

        let mut source = ScriptedSource::new(&[Some(0)]);
        let (record, log) = sink(usize::MAX);
        let mut sinks = vec![record];
        monitor(|_: &Frame| -> Result<Vec<Pose>> { Ok(vec![]) })
            .run(&mut source, &mut sinks, |_| {})
            .unwrap();
        assert!(log.borrow().frame_rates.is_empty());
    }

    #[test]
    fn test_run_without_sinks_drains_source() {
        let detector = |_: &Frame| -> Result<Vec<Pose>> { Ok(vec![]) };
        let mut source = ScriptedSource::new(&[Some(0), Some(1), Some(2)]);
        let stats = monitor(detector).run(&mut source, &mut [], |_| {}).unwrap();
        assert_eq!(stats.frames, 3);
        assert_eq!(stats.violation_frames, 0);
    }

    #[test]
    fn test_run_propagates_invalid_pose_and_finishes_sinks() {
        let detector = |_: &Frame| -> Result<Vec<Pose>> { Ok(vec![person(0.0), Pose::default()]) };
        let mut source = ScriptedSource::new(&[Some(0), Some(1)]);
        let (display, log) = sink(usize::MAX);
        let mut sinks = vec![display];

        let err = monitor(detector)
            .run(&mut source, &mut sinks, |_| {})
            .unwrap_err();

        assert!(matches!(err, SocialDistanceError::InvalidPose { index: 1 }));
        assert_eq!(log.borrow().rendered, 0);
        assert!(log.borrow().finished);
    }

    #[test]
    fn test_process_frame_reports_index() {
        let detector = RecordedPoses::from_frames(vec![vec![], vec![person(0.0)]]);
        let mut m = monitor(detector);
        let meta = SourceMeta {
            frame_idx: 1,
            ..SourceMeta::default()
        };
        let mut frame = Frame::new(DynamicImage::new_rgb8(4, 4), meta);
        let outcome = m.process_frame(&mut frame).unwrap();
        assert_eq!(outcome.frame_idx, 1);
        assert_eq!(outcome.poses.len(), 1);
        assert!(!outcome.analysis.any_violation);
    }

    #[test]
    fn test_stats_mean_time() {
        let stats = StreamStats {
            frames: 4,
            analysis_time: Duration::from_millis(10),
            ..StreamStats::default()
        };
        assert!((stats.mean_analysis_ms() - 2.5).abs() < 1e-9);
        assert!(StreamStats::default().mean_analysis_ms().abs() < f64::EPSILON);
    }
}
