// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Two subcommands: `train` and `score`.
//
// `train` reads a YAML config first; every flag below is an
// optional override applied on top of it, so the file holds
// the experiment and the command line only tweaks it:
//
//   ade-trainer train --config data/config/ade.yaml --epoch 3 --use-gpu

use anyhow::Result;
use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::application::config::{LossType, TrainConfig, DEFAULT_CONFIG_PATH};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train the response scoring model
    Train(TrainArgs),

    /// Score (context, response) pairs with a saved param set
    Score(ScoreArgs),
}

#[derive(Args, Debug, Default)]
pub struct TrainArgs {
    /// YAML config file [default: ./data/config/ade.yaml, if present]
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Tab-separated token-id training file
    #[arg(long)]
    pub training_file: Option<PathBuf>,

    /// Number of passes over the training data
    #[arg(long)]
    pub epoch: Option<usize>,

    #[arg(long)]
    pub batch_size: Option<usize>,

    #[arg(long)]
    pub learning_rate: Option<f64>,

    /// Sequences longer than this are truncated
    #[arg(long)]
    pub max_seq_len: Option<usize>,

    /// Probability of keeping each example in an epoch
    #[arg(long)]
    pub sample_pro: Option<f64>,

    /// CLS or L2
    #[arg(long)]
    pub loss_type: Option<LossType>,

    #[arg(long)]
    pub random_seed: Option<u64>,

    #[arg(long)]
    pub print_steps: Option<usize>,

    #[arg(long)]
    pub save_steps: Option<usize>,

    /// Root directory for checkpoints, params and metrics
    #[arg(long)]
    pub save_model_path: Option<PathBuf>,

    /// Resume from this checkpoint directory (params + optimizer)
    #[arg(long)]
    pub init_from_checkpoint: Option<PathBuf>,

    /// Warm-start from this param directory (params only)
    #[arg(long)]
    pub init_from_pretrain_model: Option<PathBuf>,

    /// Pickled embedding matrix for the shared word embedding
    #[arg(long)]
    pub word_emb_init: Option<PathBuf>,

    /// Train on the WGPU backend
    #[arg(long)]
    pub use_gpu: bool,

    /// Print continuous-evaluation KPI lines at the end
    #[arg(long)]
    pub enable_ce: bool,
}

impl TrainArgs {
    /// Load the YAML config and apply every flag that was given.
    pub fn resolve(self) -> Result<TrainConfig> {
        let mut cfg = match &self.config {
            Some(path) => TrainConfig::load(path)?,
            None if std::path::Path::new(DEFAULT_CONFIG_PATH).exists() => {
                TrainConfig::load(DEFAULT_CONFIG_PATH)?
            }
            None => {
                tracing::warn!("No config file at '{}', using defaults", DEFAULT_CONFIG_PATH);
                TrainConfig::default()
            }
        };
        self.apply_to(&mut cfg);
        Ok(cfg)
    }

    fn apply_to(self, cfg: &mut TrainConfig) {
        if let Some(v) = self.training_file { cfg.training_file = v; }
        if let Some(v) = self.epoch         { cfg.epoch = v; }
        if let Some(v) = self.batch_size    { cfg.batch_size = v; }
        if let Some(v) = self.learning_rate { cfg.learning_rate = v; }
        if let Some(v) = self.max_seq_len   { cfg.max_seq_len = v; }
        if let Some(v) = self.sample_pro    { cfg.sample_pro = v; }
        if let Some(v) = self.loss_type     { cfg.loss_type = v; }
        if let Some(v) = self.random_seed   { cfg.random_seed = v; }
        if let Some(v) = self.print_steps   { cfg.print_steps = v; }
        if let Some(v) = self.save_steps    { cfg.save_steps = v; }
        if let Some(v) = self.save_model_path { cfg.save_model_path = v; }
        if let Some(v) = self.init_from_checkpoint {
            cfg.init_from_checkpoint = Some(v);
        }
        if let Some(v) = self.init_from_pretrain_model {
            cfg.init_from_pretrain_model = Some(v);
        }
        if let Some(v) = self.word_emb_init { cfg.word_emb_init = Some(v); }
        // Flags can only switch these on; the YAML value stands otherwise
        if self.use_gpu   { cfg.use_gpu = true; }
        if self.enable_ce { cfg.enable_ce = true; }
    }
}

#[derive(Args, Debug)]
pub struct ScoreArgs {
    /// Param directory written during training, e.g. <save_model_path>/params/step_final
    #[arg(long)]
    pub param_dir: PathBuf,

    /// Pairs to score: `context ids \t response ids [\t label]` per line.
    /// Blank lines are rejected so output lines match input lines.
    #[arg(long)]
    pub input: PathBuf,

    /// Write scores here instead of stdout, one per line
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Score on the WGPU backend
    #[arg(long)]
    pub use_gpu: bool,
}
