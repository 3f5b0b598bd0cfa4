// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The application layer talks to these traits, not to the
// concrete reader or model, so a different file format or
// a different scorer can be dropped in later.

use anyhow::Result;
use crate::domain::dialogue_pair::DialoguePair;

// ─── ExampleSource ────────────────────────────────────────────────────────────
/// Anything that can hand out the training examples for one epoch.
///
/// Implementations:
///   - DataProcessor → tab-separated token-id file
pub trait ExampleSource {
    /// Total number of usable examples before any sampling
    fn num_examples(&self) -> usize;

    /// The examples for one pass over the data.
    /// `epoch` is passed so implementations can vary sampling per pass.
    fn epoch_examples(&self, epoch: usize) -> Vec<DialoguePair>;
}

// ─── ResponseScorer ───────────────────────────────────────────────────────────
/// Any component that can rate how well a response fits a context.
///
/// Implementations:
///   - Inferencer → the trained matching network
pub trait ResponseScorer {
    /// Score a batch of pairs; one value per pair, in input order.
    fn score(&self, pairs: &[DialoguePair]) -> Result<Vec<f32>>;
}
