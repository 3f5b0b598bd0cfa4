use burn::{
    module::Param,
    nn::{
        Embedding, EmbeddingConfig,
        Initializer,
        Lstm, LstmConfig,
    },
    prelude::*,
    tensor::activation::sigmoid,
};

use crate::application::config::{LossType, TrainConfig};

/// Architecture of the matching network. Saved as `model_config.json`
/// next to every param set so the scorer can rebuild it.
#[derive(Config, Debug)]
pub struct AdeNetConfig {
    pub vocab_size:  usize,
    pub emb_size:    usize,
    pub hidden_size: usize,
    pub loss_type:   LossType,
    #[config(default = 10.0)]
    pub loss_clip:   f64,
}

impl AdeNetConfig {
    pub fn from_train_config(cfg: &TrainConfig) -> Self {
        Self::new(cfg.vocab_size, cfg.emb_size, cfg.hidden_size, cfg.loss_type)
            .with_loss_clip(cfg.loss_clip)
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> AdeNet<B> {
        // One embedding table and one encoder are shared by context and
        // response, so both sides live in the same representation space.
        let word_embedding = EmbeddingConfig::new(self.vocab_size, self.emb_size)
            .with_initializer(Initializer::Normal { mean: 0.0, std: 0.1 })
            .init(device);
        let encoder  = LstmConfig::new(self.emb_size, self.hidden_size, true).init(device);
        let bilinear = BilinearConfig::new(self.hidden_size).init(device);
        AdeNet { word_embedding, encoder, bilinear }
    }

    pub fn loss(&self) -> MatchingLoss {
        MatchingLoss { kind: self.loss_type, clip: self.loss_clip }
    }
}

// ─── Bilinear matching layer ──────────────────────────────────────────────────
// logit = cᵀ W r + b, one scalar per (context, response) pair.

#[derive(Config, Debug)]
pub struct BilinearConfig {
    pub size: usize,
}

impl BilinearConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Bilinear<B> {
        let std    = 1.0 / (self.size as f64).sqrt();
        let weight = Initializer::Normal { mean: 0.0, std }.init([self.size, self.size], device);
        let bias   = Initializer::Zeros.init([1], device);
        Bilinear { weight, bias }
    }
}

#[derive(Module, Debug)]
pub struct Bilinear<B: Backend> {
    pub weight: Param<Tensor<B, 2>>,
    pub bias:   Param<Tensor<B, 1>>,
}

impl<B: Backend> Bilinear<B> {
    /// x, y: [batch, size] → [batch]
    pub fn forward(&self, x: Tensor<B, 2>, y: Tensor<B, 2>) -> Tensor<B, 1> {
        let [batch_size, _] = x.dims();
        let projected = x.matmul(self.weight.val());
        (projected * y)
            .sum_dim(1)
            .reshape([batch_size])
            .add(self.bias.val())
    }
}

// ─── AdeNet ───────────────────────────────────────────────────────────────────

#[derive(Module, Debug)]
pub struct AdeNet<B: Backend> {
    pub word_embedding: Embedding<B>,
    pub encoder:        Lstm<B>,
    pub bilinear:       Bilinear<B>,
}

impl<B: Backend> AdeNet<B> {
    /// Returns one matching logit per pair: [batch]
    pub fn forward(
        &self,
        context_ids:   Tensor<B, 2, Int>,
        context_lens:  Tensor<B, 1, Int>,
        response_ids:  Tensor<B, 2, Int>,
        response_lens: Tensor<B, 1, Int>,
    ) -> Tensor<B, 1> {
        let context_rep  = self.encode(context_ids, context_lens);
        let response_rep = self.encode(response_ids, response_lens);
        self.bilinear.forward(context_rep, response_rep)
    }

    /// ids: [batch, seq_len], lens: [batch] → hidden state at the last real token [batch, hidden]
    fn encode(&self, ids: Tensor<B, 2, Int>, lens: Tensor<B, 1, Int>) -> Tensor<B, 2> {
        let emb = self.word_embedding.forward(ids);
        let (hidden, _) = self.encoder.forward(emb, None); // [batch, seq_len, hidden]
        let [batch_size, _, hidden_size] = hidden.dims();

        // Sequences are right-padded, so state at index len-1 has only seen real tokens.
        let last = lens
            .sub_scalar(1)
            .clamp_min(0)
            .reshape([batch_size, 1, 1])
            .expand([batch_size, 1, hidden_size]);

        hidden.gather(1, last).reshape([batch_size, hidden_size])
    }

    /// Replace the shared word embedding with a pretrained matrix.
    ///
    /// The parameter keeps its id so optimizer state restored from a
    /// checkpoint still lines up with it.
    pub fn with_word_embedding(mut self, matrix: Tensor<B, 2>) -> anyhow::Result<Self> {
        let expected = self.word_embedding.weight.dims();
        let found    = matrix.dims();
        if expected != found {
            anyhow::bail!(
                "word embedding shape mismatch: model expects {:?}, file has {:?}",
                expected, found
            );
        }
        let id = self.word_embedding.weight.id.clone();
        self.word_embedding.weight = Param::initialized(id, matrix.require_grad());
        Ok(self)
    }
}

// ─── MatchingLoss ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
pub struct MatchingLoss {
    pub kind: LossType,
    pub clip: f64,
}

impl MatchingLoss {
    /// logits, labels: [batch] → mean loss [1]
    pub fn forward<B: Backend>(&self, logits: Tensor<B, 1>, labels: Tensor<B, 1>) -> Tensor<B, 1> {
        match self.kind {
            LossType::Cls => {
                // Numerically stable sigmoid cross-entropy:
                //   max(x, 0) - x*z + ln(1 + e^{-|x|})
                let per_pair = logits.clone().clamp_min(0.0)
                    - logits.clone() * labels
                    + logits.abs().neg().exp().add_scalar(1.0).log();
                per_pair.clamp(-self.clip, self.clip).mean()
            }
            LossType::L2 => {
                let diff = sigmoid(logits).mul_scalar(2.0) - labels;
                diff.powf_scalar(2.0).div_scalar(4.0).mean()
            }
        }
    }

    /// Map raw logits to the label scale: [0, 1] for CLS, [0, 2] for L2.
    pub fn score<B: Backend>(&self, logits: Tensor<B, 1>) -> Tensor<B, 1> {
        match self.kind {
            LossType::Cls => sigmoid(logits),
            LossType::L2  => sigmoid(logits).mul_scalar(2.0),
        }
    }
}
