// ============================================================
// Layer 2 — Training Configuration
// ============================================================
// All hyperparameters and paths for a run, loaded from a YAML
// file (default: ./data/config/ade.yaml). Any key missing from
// the file falls back to the value in `Default`, and the CLI
// can override individual keys afterwards.
//
// Optional paths use an empty string in YAML to mean "not set".
//
//   init_from_checkpoint: ""        → None
//   word_emb_init: "data/emb.pkl"   → Some("data/emb.pkl")
//
// The same struct is what the trainer, the checkpoint manager
// and the scorer receive. It never sees clap types.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Deserializer, Serialize};
use std::{fmt, fs, path::{Path, PathBuf}, str::FromStr};

/// Default location of the YAML config file
pub const DEFAULT_CONFIG_PATH: &str = "./data/config/ade.yaml";

// ─── LossType ─────────────────────────────────────────────────────────────────
/// Which objective the matching network is trained with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LossType {
    /// Sigmoid cross-entropy against a binary label
    #[serde(rename = "CLS")]
    Cls,
    /// Squared error between 2 * sigmoid(logit) and a 0..=2 grade
    #[serde(rename = "L2")]
    L2,
}

impl FromStr for LossType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "CLS" => Ok(LossType::Cls),
            "L2"  => Ok(LossType::L2),
            other => bail!("unknown loss_type '{other}', expected CLS or L2"),
        }
    }
}

impl fmt::Display for LossType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LossType::Cls => write!(f, "CLS"),
            LossType::L2  => write!(f, "L2"),
        }
    }
}

// ─── TrainConfig ──────────────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    // data
    pub training_file: PathBuf,
    pub max_seq_len:   usize,
    pub batch_size:    usize,
    /// Probability of keeping each training example in an epoch
    pub sample_pro:    f64,

    // network
    pub vocab_size:  usize,
    pub emb_size:    usize,
    pub hidden_size: usize,
    pub loss_type:   LossType,
    /// Per-example loss is clipped to [-loss_clip, loss_clip] (CLS only)
    pub loss_clip:   f64,

    // optimisation
    pub epoch:         usize,
    pub learning_rate: f64,
    /// Gradients are clipped element-wise to [-grad_clip, grad_clip]
    pub grad_clip:     f32,
    pub random_seed:   u64,

    // logging and saving
    pub print_steps:     usize,
    pub save_steps:      usize,
    pub save_model_path: PathBuf,
    /// Sub-directory for full checkpoints (params + optimizer state)
    #[serde(deserialize_with = "empty_as_none")]
    pub save_checkpoint: Option<String>,
    /// Sub-directory for parameter-only snapshots
    #[serde(deserialize_with = "empty_as_none")]
    pub save_param:      Option<String>,

    // warm starts
    #[serde(deserialize_with = "empty_as_none")]
    pub init_from_checkpoint:     Option<PathBuf>,
    #[serde(deserialize_with = "empty_as_none")]
    pub init_from_pretrain_model: Option<PathBuf>,
    /// Pickled [vocab_size, emb_size] matrix used to seed the embedding
    #[serde(deserialize_with = "empty_as_none")]
    pub word_emb_init:            Option<PathBuf>,

    // runtime
    #[serde(alias = "use_cuda")]
    pub use_gpu:   bool,
    /// Print continuous-evaluation KPI lines at the end of training
    pub enable_ce: bool,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            training_file:            PathBuf::from("data/input/data/unlabel_data/train.ids"),
            max_seq_len:              50,
            batch_size:               256,
            sample_pro:               1.0,
            vocab_size:               484016,
            emb_size:                 256,
            hidden_size:              256,
            loss_type:                LossType::Cls,
            loss_clip:                10.0,
            epoch:                    1,
            learning_rate:            0.001,
            grad_clip:                1.0,
            random_seed:              110,
            print_steps:              10,
            save_steps:               1000,
            save_model_path:          PathBuf::from("data/saved_models/trained_models"),
            save_checkpoint:          Some("checkpoints".to_string()),
            save_param:               Some("params".to_string()),
            init_from_checkpoint:     None,
            init_from_pretrain_model: None,
            word_emb_init:            None,
            use_gpu:                  false,
            enable_ce:                false,
        }
    }
}

impl TrainConfig {
    /// Read a YAML config file. Keys not present keep their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("Cannot read config file '{}'", path.display()))?;
        Self::from_yaml_str(&text)
            .with_context(|| format!("Invalid config file '{}'", path.display()))
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Reject settings the trainer cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.vocab_size == 0 || self.emb_size == 0 || self.hidden_size == 0 {
            bail!("vocab_size, emb_size and hidden_size must be > 0");
        }
        if self.max_seq_len == 0 || self.batch_size == 0 {
            bail!("max_seq_len and batch_size must be > 0");
        }
        if self.print_steps == 0 || self.save_steps == 0 {
            bail!("print_steps and save_steps must be > 0");
        }
        if !(self.sample_pro > 0.0 && self.sample_pro <= 1.0) {
            bail!("sample_pro must be in (0, 1], got {}", self.sample_pro);
        }
        if self.learning_rate <= 0.0 {
            bail!("learning_rate must be > 0, got {}", self.learning_rate);
        }
        if self.grad_clip <= 0.0 {
            bail!("grad_clip must be > 0, got {}", self.grad_clip);
        }
        // Resuming and warm-starting restore the same parameters from
        // different places, so only one may be given.
        if self.init_from_checkpoint.is_some() && self.init_from_pretrain_model.is_some() {
            bail!("init_from_checkpoint and init_from_pretrain_model cannot both be set");
        }
        Ok(())
    }

    /// Log every key of the effective configuration.
    pub fn print(&self) {
        match serde_yaml::to_string(self) {
            Ok(yaml) => {
                tracing::info!("----------- Configuration Arguments -----------");
                for line in yaml.lines() {
                    tracing::info!("{line}");
                }
                tracing::info!("------------------------------------------------");
            }
            Err(e) => tracing::warn!("Cannot render configuration: {e}"),
        }
    }

    /// `<save_model_path>/<save_checkpoint>`, if checkpoints are enabled
    pub fn checkpoint_root(&self) -> Option<PathBuf> {
        self.save_checkpoint.as_ref().map(|d| self.save_model_path.join(d))
    }

    /// `<save_model_path>/<save_param>`, if parameter snapshots are enabled
    pub fn param_root(&self) -> Option<PathBuf> {
        self.save_param.as_ref().map(|d| self.save_model_path.join(d))
    }
}

/// Deserialize an optional string-like value, mapping "" and null to None.
fn empty_as_none<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: From<String>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .map(T::from))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_keys_use_defaults() {
        let cfg = TrainConfig::from_yaml_str("batch_size: 32\nepoch: 3\n").unwrap();
        assert_eq!(cfg.batch_size, 32);
        assert_eq!(cfg.epoch, 3);
        assert_eq!(cfg.max_seq_len, TrainConfig::default().max_seq_len);
    }

    #[test]
    fn test_empty_strings_mean_unset() {
        let yaml = "init_from_checkpoint: \"\"\nsave_param: \"\"\nword_emb_init: emb.pkl\n";
        let cfg  = TrainConfig::from_yaml_str(yaml).unwrap();
        assert!(cfg.init_from_checkpoint.is_none());
        assert!(cfg.save_param.is_none());
        assert_eq!(cfg.word_emb_init, Some(PathBuf::from("emb.pkl")));
    }

    #[test]
    fn test_use_cuda_alias_and_loss_type() {
        let cfg = TrainConfig::from_yaml_str("use_cuda: true\nloss_type: L2\n").unwrap();
        assert!(cfg.use_gpu);
        assert_eq!(cfg.loss_type, LossType::L2);
    }

    #[test]
    fn test_both_init_sources_rejected() {
        let cfg = TrainConfig {
            init_from_checkpoint:     Some("a".into()),
            init_from_pretrain_model: Some("b".into()),
            ..TrainConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_sample_pro_range() {
        let mut cfg = TrainConfig::default();
        assert!(cfg.validate().is_ok());
        cfg.sample_pro = 0.0;
        assert!(cfg.validate().is_err());
        cfg.sample_pro = 1.5;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_loss_type_from_str() {
        assert_eq!("cls".parse::<LossType>().unwrap(), LossType::Cls);
        assert!("hinge".parse::<LossType>().is_err());
    }

    #[test]
    fn test_save_roots() {
        let cfg = TrainConfig {
            save_model_path: PathBuf::from("out"),
            save_checkpoint: Some("ckpt".into()),
            save_param:      None,
            ..TrainConfig::default()
        };
        assert_eq!(cfg.checkpoint_root(), Some(PathBuf::from("out/ckpt")));
        assert_eq!(cfg.param_root(), None);
    }
}
