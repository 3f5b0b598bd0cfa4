// ============================================================
// Layer 5 — Inferencer
// ============================================================
use anyhow::Result;
use burn::{data::dataloader::batcher::Batcher, prelude::*};
use std::path::Path;

use crate::data::batcher::DialogueBatcher;
use crate::domain::dialogue_pair::DialoguePair;
use crate::domain::traits::ResponseScorer;
use crate::infra::checkpoint::{init_from_pretrain_model, load_model_config};
use crate::ml::model::{AdeNet, MatchingLoss};

/// Pairs scored per forward pass
const SCORE_BATCH: usize = 64;

pub struct Inferencer<B: Backend> {
    model:      AdeNet<B>,
    vocab_size: usize,
    loss:    MatchingLoss,
    batcher: DialogueBatcher<B>,
}

impl<B: Backend> Inferencer<B> {
    /// Rebuild the network described by `<dir>/model_config.json` and load its params.
    pub fn from_param_dir(dir: &Path, device: B::Device) -> Result<Self> {
        let cfg   = load_model_config(dir)?;
        let model = init_from_pretrain_model(dir, cfg.init::<B>(&device), &device)?;
        tracing::info!(
            "Scorer loaded from '{}' (hidden={}, loss={})",
            dir.display(), cfg.hidden_size, cfg.loss_type
        );
        Ok(Self {
            model,
            vocab_size: cfg.vocab_size,
            loss:       cfg.loss(),
            batcher:    DialogueBatcher::new(device),
        })
    }

    fn score_chunk(&self, pairs: &[DialoguePair]) -> Result<Vec<f32>> {
        let batch  = self.batcher.batch(pairs.to_vec());
        let logits = self.model.forward(
            batch.context_ids,
            batch.context_lens,
            batch.response_ids,
            batch.response_lens,
        );
        self.loss
            .score(logits)
            .into_data()
            .convert::<f32>()
            .to_vec::<f32>()
            .map_err(|e| anyhow::anyhow!("Cannot read scores: {e:?}"))
    }
}

impl<B: Backend> ResponseScorer for Inferencer<B> {
    fn score(&self, pairs: &[DialoguePair]) -> Result<Vec<f32>> {
        // An id past the embedding table would panic inside the lookup
        if let Some((i, id)) = pairs
            .iter()
            .enumerate()
            .filter_map(|(i, p)| p.max_token_id().map(|id| (i, id)))
            .find(|&(_, id)| id as usize >= self.vocab_size)
        {
            anyhow::bail!("pair {}: token id {} is outside vocab_size {}", i, id, self.vocab_size);
        }

        let mut scores = Vec::with_capacity(pairs.len());
        for chunk in pairs.chunks(SCORE_BATCH) {
            scores.extend(self.score_chunk(chunk)?);
        }
        Ok(scores)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::config::LossType;
    use crate::infra::checkpoint::CheckpointManager;
    use crate::ml::model::AdeNetConfig;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_scores_follow_input_order_and_range() {
        let tmp    = tempfile::tempdir().unwrap();
        let device = Default::default();
        let cfg    = AdeNetConfig::new(12, 4, 4, LossType::Cls);
        let model: AdeNet<TestBackend> = cfg.init(&device);
        let dir = CheckpointManager::new(None, Some(tmp.path().to_path_buf()))
            .save_params(&model, &cfg, "step_final")
            .unwrap()
            .unwrap();

        let scorer = Inferencer::<TestBackend>::from_param_dir(&dir, device).unwrap();
        let pairs: Vec<DialoguePair> = (0..70)
            .map(|i| DialoguePair::new(vec![i % 12, 1], vec![(i + 3) % 12], 0))
            .collect();

        let scores = scorer.score(&pairs).unwrap();
        assert_eq!(scores.len(), 70);
        assert!(scores.iter().all(|s| (0.0..=1.0).contains(s)));

        // Same pair, same score, regardless of which chunk it landed in
        let single = scorer.score(&pairs[65..66]).unwrap();
        assert!((single[0] - scores[65]).abs() < 1e-5);

        let out_of_vocab = [DialoguePair::new(vec![12], vec![1], 0)];
        assert!(scorer.score(&out_of_vocab).is_err());
    }
}
