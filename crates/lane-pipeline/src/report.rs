//! Per-frame geometry report (JSON lines)

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use lane_tracker::{FrameOutcome, FrameReport, LaneGeometry, SearchMode};
use serde::{Deserialize, Serialize};

use crate::PipelineError;

/// One line of `geometry.jsonl`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameRecord {
    pub index: u32,
    pub file: String,
    pub outcome: FrameOutcome,
    pub search: SearchMode,
    pub remasked: bool,
    pub left_points: usize,
    pub right_points: usize,
    /// Weighted radius in meters; `None` for a straight lane or no lane
    pub curvature_m: Option<f64>,
    pub geometry: Option<LaneGeometry>,
}

impl FrameRecord {
    pub fn new(index: u32, file: impl Into<String>, report: &FrameReport) -> Self {
        Self {
            index,
            file: file.into(),
            outcome: report.outcome,
            search: report.search,
            remasked: report.remasked,
            left_points: report.left_points,
            right_points: report.right_points,
            curvature_m: report.geometry().and_then(|g| g.curvature.meters()),
            geometry: report.geometry.clone(),
        }
    }
}

/// Appends `FrameRecord`s to a JSON-lines file
pub struct ReportWriter<W: Write> {
    out: W,
    written: usize,
}

impl ReportWriter<BufWriter<File>> {
    pub fn create(path: impl AsRef<Path>) -> Result<Self, PipelineError> {
        Ok(Self::new(BufWriter::new(File::create(path)?)))
    }
}

impl<W: Write> ReportWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out, written: 0 }
    }

    pub fn write(&mut self, record: &FrameRecord) -> Result<(), PipelineError> {
        serde_json::to_writer(&mut self.out, record)?;
        self.out.write_all(b"\n")?;
        self.written += 1;
        Ok(())
    }

    pub fn written(&self) -> usize {
        self.written
    }

    pub fn finish(mut self) -> Result<W, PipelineError> {
        self.out.flush()?;
        Ok(self.out)
    }
}
