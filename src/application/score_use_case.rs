// ============================================================
// Layer 2 — Score Use Case
// ============================================================
// Rates (context, response) pairs with a saved param set:
//   1. Read the pairs file (same layout as training data; the
//      label column is optional and ignored)
//   2. Rebuild the network from the param directory
//   3. Score every pair, preserving input order

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::domain::dialogue_pair::DialoguePair;
use crate::domain::traits::ResponseScorer;
use crate::ml::device::{check_device, DeviceKind};
use crate::ml::inferencer::Inferencer;

pub struct ScoreUseCase {
    param_dir: PathBuf,
    use_gpu:   bool,
}

impl ScoreUseCase {
    pub fn new(param_dir: impl Into<PathBuf>, use_gpu: bool) -> Self {
        Self { param_dir: param_dir.into(), use_gpu }
    }

    /// Score every pair in `input`; one value per non-empty line.
    pub fn score_file(&self, input: &Path) -> Result<Vec<f32>> {
        let text = std::fs::read_to_string(input)
            .with_context(|| format!("Cannot read '{}'", input.display()))?;
        let pairs = parse_pairs(&text)?;
        tracing::info!("Scoring {} pairs from '{}'", pairs.len(), input.display());
        self.scorer()?.score(&pairs)
    }

    fn scorer(&self) -> Result<Box<dyn ResponseScorer>> {
        match check_device(self.use_gpu)? {
            DeviceKind::Cpu => {
                use burn::backend::{ndarray::NdArrayDevice, NdArray};
                let inf = Inferencer::<NdArray>::from_param_dir(&self.param_dir, NdArrayDevice::Cpu)?;
                Ok(Box::new(inf))
            }
            DeviceKind::Gpu => self.gpu_scorer(),
        }
    }

    #[cfg(feature = "gpu")]
    fn gpu_scorer(&self) -> Result<Box<dyn ResponseScorer>> {
        use burn::backend::{wgpu::WgpuDevice, Wgpu};
        let inf = Inferencer::<Wgpu>::from_param_dir(&self.param_dir, WgpuDevice::default())?;
        Ok(Box::new(inf))
    }

    #[cfg(not(feature = "gpu"))]
    fn gpu_scorer(&self) -> Result<Box<dyn ResponseScorer>> {
        anyhow::bail!("GPU backend is not compiled in")
    }
}

/// Parse `context \t response [\t label]` lines. Unlike training, a bad
/// or blank line is an error: output line N is the score of input line N.
fn parse_pairs(text: &str) -> Result<Vec<DialoguePair>> {
    let mut pairs = Vec::new();
    for (i, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            anyhow::bail!("line {}: blank line, every line must hold a pair", i + 1);
        }
        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() < 2 {
            anyhow::bail!("line {}: expected context and response separated by a tab", i + 1);
        }
        let context  = parse_ids(fields[0]).with_context(|| format!("line {}: context", i + 1))?;
        let response = parse_ids(fields[1]).with_context(|| format!("line {}: response", i + 1))?;
        if context.is_empty() || response.is_empty() {
            anyhow::bail!("line {}: context and response must be non-empty", i + 1);
        }
        pairs.push(DialoguePair::new(context, response, 0));
    }
    Ok(pairs)
}

fn parse_ids(field: &str) -> Result<Vec<u32>> {
    field
        .split_whitespace()
        .map(|t| t.parse::<u32>().with_context(|| format!("'{t}' is not a token id")))
        .collect()
}
