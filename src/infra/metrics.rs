// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Appends one CSV row per progress report during training:
//
//   epoch,step,avg_loss,steps_per_sec
//   0,0,0.693147,1.520000
//   0,10,0.684210,12.110000
//
// avg_loss is the mean batch loss since the previous report,
// so the file plots directly as a smoothed learning curve.
//
// Output file: <save_model_path>/metrics.csv
// The header is written only when the file is new, so resumed
// runs keep appending to the same log.

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

const HEADER: &str = "epoch,step,avg_loss,steps_per_sec";

/// One progress report
#[derive(Debug, Clone, PartialEq)]
pub struct StepMetrics {
    pub epoch:         usize,
    pub step:          usize,
    pub avg_loss:      f64,
    pub steps_per_sec: f64,
}

/// Logs step metrics to a CSV file for later analysis.
pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Create the logger under `dir`, writing the header if the file is new.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)
            .with_context(|| format!("Cannot create '{}'", dir.display()))?;

        let csv_path = dir.join("metrics.csv");
        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)
                .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
            writeln!(f, "{HEADER}")?;
            tracing::debug!("Created metrics CSV: '{}'", csv_path.display());
        }

        Ok(Self { csv_path })
    }

    /// Append one row.
    pub fn log(&self, m: &StepMetrics) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot open '{}'", self.csv_path.display()))?;

        writeln!(
            f,
            "{},{},{:.6},{:.6}",
            m.epoch, m.step, m.avg_loss, m.steps_per_sec,
        )?;
        Ok(())
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}
