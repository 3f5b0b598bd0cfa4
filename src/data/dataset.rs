use burn::data::dataset::Dataset;

use crate::domain::dialogue_pair::DialoguePair;

/// In-memory dataset of dialogue pairs for one epoch.
pub struct DialogueDataset {
    pairs: Vec<DialoguePair>,
}

impl DialogueDataset {
    pub fn new(pairs: Vec<DialoguePair>) -> Self { Self { pairs } }
}

impl Dataset<DialoguePair> for DialogueDataset {
    fn get(&self, index: usize) -> Option<DialoguePair> {
        self.pairs.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.pairs.len()
    }
}
