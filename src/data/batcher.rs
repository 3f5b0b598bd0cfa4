// ============================================================
// Layer 4 — Dialogue Batcher
// ============================================================
// Implements Burn's Batcher trait to turn a Vec<DialoguePair>
// into tensors the matching network can consume.
//
// Context and response sequences have different lengths, so
// each side is right-padded with PAD_ID up to the longest
// sequence *in this batch* (not to max_seq_len):
//
//   context:  [12 85  3  7]      lengths: [4]
//             [ 9  2  0  0]               [2]
//
// The true lengths travel with the batch; the encoder uses
// them to read the hidden state at the last real token, so
// padding never leaks into the representation.

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::domain::dialogue_pair::DialoguePair;

/// Token id used for padding
pub const PAD_ID: u32 = 0;

// ─── DialogueBatch ────────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct DialogueBatch<B: Backend> {
    /// Context token ids — shape: [batch_size, max_context_len]
    pub context_ids: Tensor<B, 2, Int>,

    /// Real length of each context — shape: [batch_size]
    pub context_lens: Tensor<B, 1, Int>,

    /// Response token ids — shape: [batch_size, max_response_len]
    pub response_ids: Tensor<B, 2, Int>,

    /// Real length of each response — shape: [batch_size]
    pub response_lens: Tensor<B, 1, Int>,

    /// Labels as floats — shape: [batch_size]
    pub labels: Tensor<B, 1>,
}

// ─── DialogueBatcher ──────────────────────────────────────────────────────────
#[derive(Clone, Debug)]
pub struct DialogueBatcher<B: Backend> {
    /// The device to create tensors on
    pub device: B::Device,
}

impl<B: Backend> DialogueBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }

    /// Pad a group of sequences and return (ids [n, max_len], lengths [n]).
    fn pad<'a>(
        &self,
        seqs: impl Iterator<Item = &'a [u32]> + Clone,
    ) -> (Tensor<B, 2, Int>, Tensor<B, 1, Int>) {
        let rows    = seqs.clone().count();
        // At least one column so an all-empty batch still has a valid shape
        let max_len = seqs.clone().map(<[u32]>::len).max().unwrap_or(0).max(1);

        let mut flat = Vec::with_capacity(rows * max_len);
        let mut lens = Vec::with_capacity(rows);
        for seq in seqs {
            flat.extend(seq.iter().map(|&id| id as i32));
            flat.extend(std::iter::repeat(PAD_ID as i32).take(max_len - seq.len()));
            lens.push(seq.len() as i32);
        }

        let ids = Tensor::<B, 1, Int>::from_ints(flat.as_slice(), &self.device)
            .reshape([rows, max_len]);
        let lens = Tensor::<B, 1, Int>::from_ints(lens.as_slice(), &self.device);
        (ids, lens)
    }
}

impl<B: Backend> Batcher<DialoguePair, DialogueBatch<B>> for DialogueBatcher<B> {
    fn batch(&self, items: Vec<DialoguePair>) -> DialogueBatch<B> {
        let (context_ids, context_lens) =
            self.pad(items.iter().map(|p| p.context.as_slice()));
        let (response_ids, response_lens) =
            self.pad(items.iter().map(|p| p.response.as_slice()));

        let labels: Vec<f32> = items.iter().map(|p| p.label as f32).collect();
        let labels = Tensor::<B, 1>::from_floats(labels.as_slice(), &self.device);

        DialogueBatch {
            context_ids,
            context_lens,
            response_ids,
            response_lens,
            labels,
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_pads_to_longest_in_batch() {
        let batcher = DialogueBatcher::<TestBackend>::new(Default::default());
        let batch   = batcher.batch(vec![
            DialoguePair::new(vec![5, 6, 7], vec![1], 1),
            DialoguePair::new(vec![8], vec![2, 3], 0),
        ]);

        assert_eq!(batch.context_ids.dims(), [2, 3]);
        assert_eq!(batch.response_ids.dims(), [2, 2]);

        let ctx: Vec<i64> = batch.context_ids.into_data().convert::<i64>().to_vec().unwrap();
        assert_eq!(ctx, vec![5, 6, 7, 8, 0, 0]);

        let lens: Vec<i64> = batch.context_lens.into_data().convert::<i64>().to_vec().unwrap();
        assert_eq!(lens, vec![3, 1]);
    }

    #[test]
    fn test_labels_become_floats() {
        let batcher = DialogueBatcher::<TestBackend>::new(Default::default());
        let batch   = batcher.batch(vec![
            DialoguePair::new(vec![1], vec![1], 2),
            DialoguePair::new(vec![1], vec![1], 0),
        ]);
        let labels: Vec<f32> = batch.labels.into_data().to_vec().unwrap();
        assert_eq!(labels, vec![2.0, 0.0]);
    }
}
