// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates a training run in order:
//
//   Step 1: Validate and print the config     (Layer 2)
//   Step 2: Check the requested device        (Layer 5 - ml)
//   Step 3: Read the training file            (Layer 4 - data)
//   Step 4: Load the embedding init, if any   (Layer 6 - infra)
//   Step 5: Prepare checkpoint + metrics dirs (Layer 6 - infra)
//   Step 6: Run the training loop             (Layer 5 - ml)

use anyhow::Result;

use crate::application::config::TrainConfig;
use crate::data::reader::DataProcessor;
use crate::domain::traits::ExampleSource;
use crate::infra::{
    checkpoint::CheckpointManager,
    embedding_init::load_word_embedding,
    metrics::MetricsLogger,
};
use crate::ml::device::check_device;
use crate::ml::trainer::{run_training, TrainOutputs, TrainSummary};

pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Execute the full training pipeline end to end
    pub fn execute(&self) -> Result<TrainSummary> {
        let cfg = &self.config;

        // ── Step 1: Config ────────────────────────────────────────────────────
        cfg.validate()?;
        cfg.print();

        // ── Step 2: Device ────────────────────────────────────────────────────
        let device = check_device(cfg.use_gpu)?;
        tracing::info!("Training device: {}", device);

        // ── Step 3: Training data ─────────────────────────────────────────────
        let processor = DataProcessor::new(
            &cfg.training_file,
            cfg.max_seq_len,
            cfg.batch_size,
            cfg.vocab_size,
        )?
        .with_sampling(cfg.sample_pro, cfg.random_seed);

        if processor.num_examples() == 0 {
            anyhow::bail!(
                "No usable examples in '{}'",
                processor.path().display()
            );
        }
        if processor.skipped() > 0 {
            tracing::warn!("{} malformed lines were skipped", processor.skipped());
        }
        println!("Num train examples: {}", processor.num_examples());
        println!("Max train steps: {}", processor.max_train_steps(cfg.epoch));

        // ── Step 4: Embedding init ────────────────────────────────────────────
        let word_emb = match &cfg.word_emb_init {
            Some(path) => Some(load_word_embedding(path)?),
            None => None,
        };

        // ── Step 5: Outputs ───────────────────────────────────────────────────
        let outputs = TrainOutputs {
            checkpoints: CheckpointManager::from_config(cfg),
            metrics:     MetricsLogger::new(&cfg.save_model_path)?,
        };
        tracing::info!("Step metrics → '{}'", outputs.metrics.csv_path().display());

        // ── Step 6: Train ─────────────────────────────────────────────────────
        run_training(cfg, &processor, word_emb, outputs)
    }
}
