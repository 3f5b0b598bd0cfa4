// ============================================================
// Layer 3 — DialoguePair Domain Type
// ============================================================
// One training example for response-quality scoring:
//   - context:  the dialogue history, as token ids
//   - response: a candidate reply, as token ids
//   - label:    how good the reply is for that context
//
// With the CLS loss the label is binary (1 = good reply).
// With the L2 loss it is a grade in 0..=2, matching the
// range of 2 * sigmoid(logit).
//
// Example line in a training file:
//   "12 85 3 7\t44 19 2\t1"
//    ^context   ^response ^label

/// A tokenised (context, response, label) triple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialoguePair {
    /// Token ids of the dialogue history
    pub context: Vec<u32>,

    /// Token ids of the candidate response
    pub response: Vec<u32>,

    /// Quality label for this (context, response) pair
    pub label: i64,
}

impl DialoguePair {
    pub fn new(context: Vec<u32>, response: Vec<u32>, label: i64) -> Self {
        Self { context, response, label }
    }

    /// Cut both sequences down to at most `max_len` tokens.
    ///
    /// The context keeps its most recent tokens (the tail of the
    /// conversation), the response keeps its beginning.
    pub fn truncate(&mut self, max_len: usize) {
        if self.context.len() > max_len {
            let cut = self.context.len() - max_len;
            self.context.drain(..cut);
        }
        self.response.truncate(max_len);
    }

    /// Largest token id appearing in either sequence
    pub fn max_token_id(&self) -> Option<u32> {
        self.context.iter().chain(self.response.iter()).copied().max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_keeps_context_tail_and_response_head() {
        let mut p = DialoguePair::new(vec![1, 2, 3, 4, 5], vec![6, 7, 8, 9], 1);
        p.truncate(3);
        assert_eq!(p.context, vec![3, 4, 5]);
        assert_eq!(p.response, vec![6, 7, 8]);
    }

    #[test]
    fn test_truncate_leaves_short_sequences_alone() {
        let mut p = DialoguePair::new(vec![1, 2], vec![3], 0);
        p.truncate(10);
        assert_eq!(p.context, vec![1, 2]);
        assert_eq!(p.response, vec![3]);
    }

    #[test]
    fn test_max_token_id() {
        let p = DialoguePair::new(vec![4, 17], vec![9], 1);
        assert_eq!(p.max_token_id(), Some(17));
    }
}
