//! Lane Pipeline
//!
//! Drives the lane tracker over a directory of road images:
//! undistort, bird's-eye warp, threshold mask, track, then draw the lane
//! back onto the camera view and log the geometry of every frame.

pub mod config;
pub mod overlay;
pub mod report;

pub use config::{PipelineConfig, RunMode};
pub use overlay::OverlayConfig;
pub use report::{FrameRecord, ReportWriter};

use std::fs;
use std::path::{Path, PathBuf};

use image::{GrayImage, RgbImage};
use lane_mask::{MaskError, MaskProvider, ThresholdMasker};
use lane_tracker::{FrameOutcome, FrameReport, LaneTracker, TrackerError};
use road_frame::{FrameError, PerspectiveTransform, RoadFrame};
use thiserror::Error;
use tracing::{debug, info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// File name of the per-frame geometry log
pub const REPORT_FILE: &str = "geometry.jsonl";

const IMAGE_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Pipeline error types
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Frame error: {0}")]
    Frame(#[from] FrameError),

    #[error("Mask error: {0}")]
    Mask(#[from] MaskError),

    #[error("Tracker error: {0}")]
    Tracker(#[from] TrackerError),

    #[error("Configuration error: {0}")]
    Config(#[from] ::config::ConfigError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Report serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Outcome counts for a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub processed: usize,
    pub fresh: usize,
    pub held: usize,
    pub no_lane: usize,
    /// Inputs that could not be decoded
    pub skipped: usize,
}

impl RunSummary {
    fn count(&mut self, outcome: FrameOutcome) {
        self.processed += 1;
        match outcome {
            FrameOutcome::Fresh => self.fresh += 1,
            FrameOutcome::Held => self.held += 1,
            FrameOutcome::NoLane => self.no_lane += 1,
        }
    }
}

/// One processed frame
#[derive(Debug, Clone)]
pub struct ProcessedFrame {
    pub report: FrameReport,
    /// Camera view with the lane drawn in
    pub annotated: RgbImage,
    /// Intermediate images, kept when `debug_stages` is set
    pub stages: Option<DebugStages>,
}

/// Intermediate images of one frame
#[derive(Debug, Clone)]
pub struct DebugStages {
    pub undistorted: RgbImage,
    pub top_down: RgbImage,
    pub binary: GrayImage,
}

impl DebugStages {
    /// Write `<stem>-0-undist.png`, `<stem>-1-topdown.png` and `<stem>-2-mask.png`
    pub fn save(&self, dir: &Path, stem: &str) -> Result<(), PipelineError> {
        self.undistorted
            .save(dir.join(format!("{}-0-undist.png", stem)))
            .map_err(FrameError::from)?;
        self.top_down
            .save(dir.join(format!("{}-1-topdown.png", stem)))
            .map_err(FrameError::from)?;
        self.binary
            .save(dir.join(format!("{}-2-mask.png", stem)))
            .map_err(FrameError::from)?;
        Ok(())
    }
}

/// Image-to-geometry pipeline around a single `LaneTracker`
pub struct LanePipeline<M: MaskProvider = ThresholdMasker> {
    config: PipelineConfig,
    masker: M,
    transform: Option<((u32, u32), PerspectiveTransform)>,
    tracker: Option<LaneTracker>,
}

impl LanePipeline<ThresholdMasker> {
    pub fn new(config: PipelineConfig) -> Result<Self, PipelineError> {
        Self::with_masker(config, ThresholdMasker)
    }
}

impl<M: MaskProvider> LanePipeline<M> {
    /// Pipeline with a custom mask provider
    pub fn with_masker(config: PipelineConfig, masker: M) -> Result<Self, PipelineError> {
        config.validate()?;
        Ok(Self {
            config,
            masker,
            transform: None,
            tracker: None,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn tracker(&self) -> Option<&LaneTracker> {
        self.tracker.as_ref()
    }

    /// Forget tracked state before an unrelated image
    pub fn reset(&mut self) {
        if let Some(tracker) = self.tracker.as_mut() {
            tracker.reset();
        }
    }

    /// Run one camera frame through the whole chain
    pub fn process(&mut self, frame: &RoadFrame) -> Result<ProcessedFrame, PipelineError> {
        let frame = match &self.config.camera {
            Some(camera) => camera.undistort(frame)?,
            None => frame.clone(),
        };
        let camera_view = frame.to_rgb_image();
        let dims = camera_view.dimensions();

        let transform = match self.transform {
            Some((size, transform)) if size == dims => transform,
            _ => {
                let points = self.config.perspective_for(dims.0, dims.1);
                let transform = PerspectiveTransform::from_config(&points)?;
                self.transform = Some((dims, transform));
                transform
            }
        };

        let top_down = transform.forward(&camera_view);
        let binary = self.masker.mask(&top_down, &self.config.mask)?;

        let rebuild = match &self.tracker {
            None => true,
            Some(t) => self.config.mode == RunMode::Batch && t.dimensions() != binary.dimensions(),
        };
        let tracker = match &mut self.tracker {
            Some(t) if !rebuild => t,
            slot => {
                let (w, h) = binary.dimensions();
                slot.insert(LaneTracker::new(self.config.tracker.clone(), w, h)?)
            }
        };

        let masker = &self.masker;
        let relaxed = self.config.relaxed_mask.as_ref();
        let report = tracker.process_frame_with(&binary, || {
            let config = relaxed?;
            match masker.mask(&top_down, config) {
                Ok(remask) => Some(remask),
                Err(e) => {
                    warn!(frame = frame.sequence, "Relaxed remask failed: {}", e);
                    None
                }
            }
        })?;

        debug!(
            frame = frame.sequence,
            search = report.search.as_str(),
            left = report.left_points,
            right = report.right_points,
            outcome = ?report.outcome,
            "Frame processed"
        );

        let stages = self.config.debug_stages.then(|| DebugStages {
            undistorted: camera_view.clone(),
            top_down,
            binary: binary.to_gray(),
        });
        let annotated = match report.geometry() {
            Some(geometry) => {
                overlay::annotate(&camera_view, geometry, &transform, &self.config.overlay)
            }
            None => camera_view,
        };
        Ok(ProcessedFrame {
            report,
            annotated,
            stages,
        })
    }

    /// Process every image in `input_dir` in file-name order
    pub fn run(&mut self) -> Result<RunSummary, PipelineError> {
        let inputs = list_images(&self.config.input_dir)?;
        fs::create_dir_all(&self.config.output_dir)?;
        let mut writer = ReportWriter::create(self.config.output_dir.join(REPORT_FILE))?;
        let mut summary = RunSummary::default();

        info!(
            images = inputs.len(),
            mode = ?self.config.mode,
            input = %self.config.input_dir.display(),
            "Starting lane pipeline"
        );

        for (index, path) in inputs.iter().enumerate() {
            let index = index as u32;
            let frame = match RoadFrame::load(path, index) {
                Ok(frame) => frame,
                Err(e) => {
                    warn!("Skipping {}: {}", path.display(), e);
                    summary.skipped += 1;
                    continue;
                }
            };

            if self.config.mode == RunMode::Batch {
                self.reset();
            }

            let processed = self.process(&frame)?;
            let name = file_name(path);
            processed
                .annotated
                .save(self.config.output_dir.join(&name))
                .map_err(FrameError::from)?;
            if let Some(stages) = &processed.stages {
                stages.save(&self.config.output_dir, &file_stem(path))?;
            }
            writer.write(&FrameRecord::new(index, name, &processed.report))?;
            summary.count(processed.report.outcome);
        }

        writer.finish()?;
        info!(
            processed = summary.processed,
            fresh = summary.fresh,
            held = summary.held,
            no_lane = summary.no_lane,
            skipped = summary.skipped,
            "Lane pipeline finished"
        );
        Ok(summary)
    }
}

/// PNG/JPEG files directly inside `dir`, sorted by name
pub fn list_images(dir: &Path) -> Result<Vec<PathBuf>, PipelineError> {
    let mut images: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .map_or(false, |ext| {
                        IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str())
                    })
        })
        .collect();
    images.sort();
    Ok(images)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Initialize logging
pub fn init_logging(level: &str) {
    let level = level.parse::<Level>().unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use road_frame::PerspectiveConfig;

    const W: u32 = 640;
    const H: u32 = 360;

    /// Grey road with two saturated yellow stripes
    fn road_image(left: u32, right: u32) -> RgbImage {
        RgbImage::from_fn(W, H, |x, _| {
            if (left..left + 6).contains(&x) || (right..right + 6).contains(&x) {
                Rgb([255, 220, 0])
            } else {
                Rgb([90, 90, 90])
            }
        })
    }

    fn identity_config() -> PipelineConfig {
        let corners = [(0.0, 0.0), (0.0, H as f32), (W as f32, H as f32), (W as f32, 0.0)];
        PipelineConfig {
            perspective: PerspectiveConfig {
                src: corners,
                dst: corners,
            },
            reference_size: (W, H),
            ..Default::default()
        }
    }

    fn temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("lane-pipeline-{}-{}", tag, std::process::id()));
        fs::remove_dir_all(&dir).ok();
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_process_finds_painted_lane() {
        let mut pipeline = LanePipeline::new(identity_config()).unwrap();
        let frame = RoadFrame::from_rgb_image(road_image(150, 450), 0);
        let out = pipeline.process(&frame).unwrap();

        assert_eq!(out.report.outcome, FrameOutcome::Fresh);
        let geometry = out.report.geometry().unwrap();
        let width_px = geometry.lane_width_m / pipeline.config().tracker.scale.xm_per_pix;
        assert!((width_px - 300.0).abs() < 3.0, "width {} px", width_px);
        assert_eq!(pipeline.tracker().unwrap().dimensions(), (W, H));

        // Lane interior is tinted, the verge is not
        assert!(out.annotated.get_pixel(300, 200)[1] > 90);
        assert_eq!(out.annotated.get_pixel(20, 200), &Rgb([90, 90, 90]));
    }

    #[test]
    fn test_blank_road_reports_no_lane() {
        let mut pipeline = LanePipeline::new(identity_config()).unwrap();
        let blank = RoadFrame::from_rgb_image(RgbImage::from_pixel(W, H, Rgb([90, 90, 90])), 0);
        let out = pipeline.process(&blank).unwrap();
        assert_eq!(out.report.outcome, FrameOutcome::NoLane);
        assert!(out.report.remasked);
        assert_eq!(out.annotated.get_pixel(300, 200), &Rgb([90, 90, 90]));
    }

    #[test]
    fn test_batch_run_writes_images_and_report() {
        let input = temp_dir("in");
        let output = temp_dir("out");
        road_image(150, 450).save(input.join("a.png")).unwrap();
        RgbImage::from_pixel(W, H, Rgb([90, 90, 90]))
            .save(input.join("b.png"))
            .unwrap();
        fs::write(input.join("notes.txt"), "not an image").unwrap();

        let config = PipelineConfig {
            input_dir: input.clone(),
            output_dir: output.clone(),
            ..identity_config()
        };
        let summary = LanePipeline::new(config).unwrap().run().unwrap();

        assert_eq!(
            summary,
            RunSummary {
                processed: 2,
                fresh: 1,
                held: 0,
                no_lane: 1,
                skipped: 0,
            }
        );
        assert!(output.join("a.png").is_file());
        assert!(output.join("b.png").is_file());

        let text = fs::read_to_string(output.join(REPORT_FILE)).unwrap();
        let records: Vec<FrameRecord> = text
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].file, "a.png");
        assert_eq!(records[0].outcome, FrameOutcome::Fresh);
        assert_eq!(records[1].outcome, FrameOutcome::NoLane);
        assert!(records[1].geometry.is_none());

        fs::remove_dir_all(&input).ok();
        fs::remove_dir_all(&output).ok();
    }

    #[test]
    fn test_sequence_mode_holds_geometry() {
        let config = PipelineConfig {
            mode: RunMode::Sequence,
            ..identity_config()
        };
        let mut pipeline = LanePipeline::new(config).unwrap();
        let lane = RoadFrame::from_rgb_image(road_image(150, 450), 0);
        let blank = RoadFrame::from_rgb_image(RgbImage::from_pixel(W, H, Rgb([90, 90, 90])), 1);

        let first = pipeline.process(&lane).unwrap();
        let second = pipeline.process(&blank).unwrap();
        assert_eq!(second.report.outcome, FrameOutcome::Held);
        assert_eq!(second.report.geometry, first.report.geometry);
    }

    #[test]
    fn test_debug_stages_written_per_image() {
        let input = temp_dir("stages-in");
        let output = temp_dir("stages-out");
        road_image(150, 450).save(input.join("a.png")).unwrap();

        let config = PipelineConfig {
            input_dir: input.clone(),
            output_dir: output.clone(),
            debug_stages: true,
            ..identity_config()
        };
        LanePipeline::new(config).unwrap().run().unwrap();

        for name in ["a-0-undist.png", "a-1-topdown.png", "a-2-mask.png"] {
            assert!(output.join(name).is_file(), "missing {}", name);
        }
        let mask = image::open(output.join("a-2-mask.png")).unwrap().to_luma8();
        assert_eq!(mask.get_pixel(152, 300)[0], 255);
        assert_eq!(mask.get_pixel(20, 300)[0], 0);

        fs::remove_dir_all(&input).ok();
        fs::remove_dir_all(&output).ok();
    }

    #[test]
    fn test_stages_absent_by_default() {
        let mut pipeline = LanePipeline::new(identity_config()).unwrap();
        let frame = RoadFrame::from_rgb_image(road_image(150, 450), 0);
        assert!(pipeline.process(&frame).unwrap().stages.is_none());
    }

    #[test]
    fn test_list_images_filters_and_sorts() {
        let dir = temp_dir("list");
        for name in ["b.JPG", "a.png", "c.txt"] {
            fs::write(dir.join(name), b"").unwrap();
        }
        let names: Vec<String> = list_images(&dir)
            .unwrap()
            .iter()
            .map(|p| file_name(p))
            .collect();
        assert_eq!(names, vec!["a.png", "b.JPG"]);
        fs::remove_dir_all(&dir).ok();
    }
}
