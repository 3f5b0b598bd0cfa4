// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores model state with Burn's named MessagePack
// recorder, gzip-compressed and at full f32 precision so weights
// and Adam moments come back bit for bit.
//
// Two kinds of snapshot are written, each into its own root:
//
//   <save_model_path>/<save_checkpoint>/step_1000/
//     model.mpk.gz          ← all learned parameters
//     optimizer.mpk.gz      ← Adam moments, needed to resume
//
//   <save_model_path>/<save_param>/step_1000/
//     model.mpk.gz          ← parameters only
//     model_config.json     ← architecture, so `score` can rebuild the net
//
// A checkpoint resumes an interrupted run exactly. A param set
// warm-starts a new run (init_from_pretrain_model) or feeds the
// scorer. Either root can be switched off in the config, in
// which case the matching save is a no-op.

use anyhow::{Context, Result};
use std::{fs, path::{Path, PathBuf}};
use burn::{
    optim::Optimizer,
    prelude::*,
    record::{FullPrecisionSettings, NamedMpkGzFileRecorder, Recorder},
    tensor::backend::AutodiffBackend,
};

use crate::application::config::TrainConfig;
use crate::ml::model::{AdeNet, AdeNetConfig};

const MODEL_FILE:        &str = "model";
const OPTIMIZER_FILE:    &str = "optimizer";
const MODEL_CONFIG_FILE: &str = "model_config.json";

/// Writes `<name>.mpk.gz` without any precision loss
type SnapshotRecorder = NamedMpkGzFileRecorder<FullPrecisionSettings>;

/// Writes checkpoints and parameter snapshots under the configured roots.
pub struct CheckpointManager {
    /// Root for full checkpoints, None when disabled
    checkpoint_root: Option<PathBuf>,
    /// Root for parameter-only snapshots, None when disabled
    param_root:      Option<PathBuf>,
}

impl CheckpointManager {
    pub fn new(checkpoint_root: Option<PathBuf>, param_root: Option<PathBuf>) -> Self {
        Self { checkpoint_root, param_root }
    }

    pub fn from_config(cfg: &TrainConfig) -> Self {
        Self::new(cfg.checkpoint_root(), cfg.param_root())
    }

    /// Save model + optimizer state as `<checkpoint_root>/<name>`.
    /// Returns the directory written, or None if checkpoints are disabled.
    pub fn save_checkpoint<B, O>(
        &self,
        model: &AdeNet<B>,
        optim: &O,
        name:  &str,
    ) -> Result<Option<PathBuf>>
    where
        B: AutodiffBackend,
        O: Optimizer<AdeNet<B>, B>,
    {
        let Some(root) = &self.checkpoint_root else {
            return Ok(None);
        };
        let dir = create_snapshot_dir(root, name)?;
        let recorder = SnapshotRecorder::new();

        let model_path = dir.join(MODEL_FILE);
        Recorder::<B>::record(&recorder, model.clone().into_record(), model_path.clone())
            .with_context(|| format!("Failed to save model to '{}'", model_path.display()))?;

        let optim_path = dir.join(OPTIMIZER_FILE);
        Recorder::<B>::record(&recorder, optim.to_record(), optim_path.clone())
            .with_context(|| format!("Failed to save optimizer to '{}'", optim_path.display()))?;

        tracing::info!("Saved checkpoint '{}'", dir.display());
        Ok(Some(dir))
    }

    /// Save parameters and the architecture config as `<param_root>/<name>`.
    /// Returns the directory written, or None if param saving is disabled.
    pub fn save_params<B: Backend>(
        &self,
        model:     &AdeNet<B>,
        model_cfg: &AdeNetConfig,
        name:      &str,
    ) -> Result<Option<PathBuf>> {
        let Some(root) = &self.param_root else {
            return Ok(None);
        };
        let dir = create_snapshot_dir(root, name)?;

        let model_path = dir.join(MODEL_FILE);
        let recorder = SnapshotRecorder::new();
        Recorder::<B>::record(&recorder, model.clone().into_record(), model_path.clone())
            .with_context(|| format!("Failed to save params to '{}'", model_path.display()))?;

        let cfg_path = dir.join(MODEL_CONFIG_FILE);
        model_cfg
            .save(&cfg_path)
            .with_context(|| format!("Cannot write model config to '{}'", cfg_path.display()))?;

        tracing::info!("Saved params '{}'", dir.display());
        Ok(Some(dir))
    }
}

/// Restore model weights and optimizer state from a checkpoint directory,
/// to resume a previous run.
pub fn init_from_checkpoint<B, O>(
    dir:    &Path,
    model:  AdeNet<B>,
    optim:  O,
    device: &B::Device,
) -> Result<(AdeNet<B>, O)>
where
    B: AutodiffBackend,
    O: Optimizer<AdeNet<B>, B>,
{
    let model = load_model(dir, model, device)?;

    let optim_path = dir.join(OPTIMIZER_FILE);
    let record: O::Record = Recorder::<B>::load(&SnapshotRecorder::new(), optim_path.clone(), device)
        .with_context(|| {
            format!("Cannot load optimizer state '{}'", optim_path.display())
        })?;

    tracing::info!("Resumed from checkpoint '{}'", dir.display());
    Ok((model, optim.load_record(record)))
}

/// Load parameters only (no optimizer state) from a checkpoint or param
/// directory, to warm-start a new run.
pub fn init_from_pretrain_model<B: Backend>(
    dir:    &Path,
    model:  AdeNet<B>,
    device: &B::Device,
) -> Result<AdeNet<B>> {
    let model = load_model(dir, model, device)?;
    tracing::info!("Initialised from pretrained params '{}'", dir.display());
    Ok(model)
}

/// Read the architecture saved next to a param set.
pub fn load_model_config(dir: &Path) -> Result<AdeNetConfig> {
    let path = dir.join(MODEL_CONFIG_FILE);
    AdeNetConfig::load(&path)
        .map_err(|e| anyhow::anyhow!("{:?}", e))
        .with_context(|| {
            format!(
                "Cannot read model config '{}'. Was this directory written with save_param?",
                path.display()
            )
        })
}

fn load_model<B: Backend>(dir: &Path, model: AdeNet<B>, device: &B::Device) -> Result<AdeNet<B>> {
    let path = dir.join(MODEL_FILE);
    let record = Recorder::<B>::load(&SnapshotRecorder::new(), path.clone(), device)
        .with_context(|| format!("Cannot load model params '{}'", path.display()))?;
    Ok(model.load_record(record))
}

fn create_snapshot_dir(root: &Path, name: &str) -> Result<PathBuf> {
    let dir = root.join(name);
    fs::create_dir_all(&dir)
        .with_context(|| format!("Cannot create directory '{}'", dir.display()))?;
    Ok(dir)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::config::LossType;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    fn logits(model: &AdeNet<TestBackend>) -> Vec<f32> {
        let device = Default::default();
        let ids  = Tensor::<TestBackend, 1, Int>::from_ints([1, 2, 3], &device).reshape([1, 3]);
        let lens = Tensor::<TestBackend, 1, Int>::from_ints([3], &device);
        model
            .forward(ids.clone(), lens.clone(), ids, lens)
            .into_data()
            .to_vec()
            .unwrap()
    }

    #[test]
    fn test_params_round_trip() {
        let tmp    = tempfile::tempdir().unwrap();
        let device = Default::default();
        let cfg    = AdeNetConfig::new(10, 4, 3, LossType::L2);

        // Values that f16 would round: they must survive unchanged.
        let mut table = vec![0.5f32; 10 * 4];
        table[..6].copy_from_slice(&[1.0001, 1.23e-5, 1000.37, 3.14159, 1.0002, -7.777e-4]);
        let matrix = Tensor::<TestBackend, 1>::from_floats(table.as_slice(), &device).reshape([10, 4]);
        let model: AdeNet<TestBackend> = cfg.init(&device).with_word_embedding(matrix).unwrap();

        let manager = CheckpointManager::new(None, Some(tmp.path().join("params")));
        let dir = manager.save_params(&model, &cfg, "step_0").unwrap().unwrap();
        assert!(dir.join("model.mpk.gz").exists());

        let loaded_cfg = load_model_config(&dir).unwrap();
        assert_eq!(loaded_cfg.hidden_size, 3);
        assert_eq!(loaded_cfg.loss_type, LossType::L2);

        // A freshly initialised model differs; loading restores the saved weights.
        let fresh: AdeNet<TestBackend> = loaded_cfg.init(&device);
        let restored = init_from_pretrain_model(&dir, fresh, &device).unwrap();
        assert_eq!(logits(&model), logits(&restored));

        let restored_table: Vec<f32> =
            restored.word_embedding.weight.val().into_data().to_vec().unwrap();
        assert_eq!(restored_table, table);
    }

    #[test]
    fn test_disabled_roots_are_noops() {
        let device  = Default::default();
        let cfg     = AdeNetConfig::new(10, 4, 3, LossType::Cls);
        let model: AdeNet<TestBackend> = cfg.init(&device);
        let manager = CheckpointManager::new(None, None);
        assert!(manager.save_params(&model, &cfg, "step_0").unwrap().is_none());
    }

    #[test]
    fn test_missing_param_dir_is_an_error() {
        let device = Default::default();
        let model: AdeNet<TestBackend> = AdeNetConfig::new(10, 4, 3, LossType::Cls).init(&device);
        assert!(init_from_pretrain_model(Path::new("/no/such/dir"), model, &device).is_err());
    }
}
