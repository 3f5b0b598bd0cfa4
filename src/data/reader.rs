// ============================================================
// Layer 4 — Training File Reader
// ============================================================
// Reads the tab-separated token-id file used for training:
//
//   <context ids>\t<response ids>\t<label>
//   "12 85 3 7\t44 19 2\t1"
//
// Every line is validated once, up front. A line is skipped
// (with a warning) when:
//   - it does not have exactly three tab-separated fields
//   - a token or the label is not an integer
//   - the context or the response is empty
//   - a token id is outside the embedding table (>= vocab_size)
//
// The surviving examples are truncated to max_seq_len and kept
// in memory. Each epoch then asks for its own copy, optionally
// subsampled with probability sample_pro, so a fresh random
// subset is seen on every pass.

use anyhow::{Context, Result};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
};

use crate::domain::dialogue_pair::DialoguePair;
use crate::domain::traits::ExampleSource;

/// Log a progress line every this many input lines
const PROGRESS_EVERY: usize = 100_000;

/// Loads dialogue pairs from a token-id file and serves them per epoch.
pub struct DataProcessor {
    path:        PathBuf,
    examples:    Vec<DialoguePair>,
    batch_size:  usize,
    sample_pro:  f64,
    seed:        u64,
    skipped:     usize,
}

impl DataProcessor {
    /// Parse `path` and keep every valid example.
    pub fn new(
        path:        impl AsRef<Path>,
        max_seq_len: usize,
        batch_size:  usize,
        vocab_size:  usize,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)
            .with_context(|| format!("Cannot open training file '{}'", path.display()))?;

        let mut examples = Vec::new();
        let mut skipped  = 0usize;

        for (index, line) in BufReader::new(file).lines().enumerate() {
            let line = line
                .with_context(|| format!("Cannot read line {} of '{}'", index + 1, path.display()))?;

            if index > 0 && index % PROGRESS_EVERY == 0 {
                tracing::info!("Read {} lines from '{}'", index, path.display());
            }

            if line.trim().is_empty() {
                continue;
            }

            match parse_line(&line, vocab_size) {
                Ok(mut pair) => {
                    pair.truncate(max_seq_len);
                    examples.push(pair);
                }
                Err(reason) => {
                    skipped += 1;
                    tracing::warn!("Skipping line {}: {}", index + 1, reason);
                }
            }
        }

        tracing::info!(
            "Loaded {} examples from '{}' ({} skipped)",
            examples.len(),
            path.display(),
            skipped
        );

        Ok(Self {
            path,
            examples,
            batch_size,
            sample_pro: 1.0,
            seed: 0,
            skipped,
        })
    }

    /// Keep each example with probability `sample_pro` on every epoch.
    /// `seed` makes the per-epoch subsets reproducible.
    pub fn with_sampling(mut self, sample_pro: f64, seed: u64) -> Self {
        self.sample_pro = sample_pro;
        self.seed       = seed;
        self
    }

    /// Number of lines rejected while parsing
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Upper bound on optimisation steps for a run of `epochs` passes
    pub fn max_train_steps(&self, epochs: usize) -> usize {
        epochs * self.examples.len() / self.batch_size.max(1)
    }
}

impl ExampleSource for DataProcessor {
    fn num_examples(&self) -> usize {
        self.examples.len()
    }

    fn epoch_examples(&self, epoch: usize) -> Vec<DialoguePair> {
        if self.sample_pro >= 1.0 {
            return self.examples.clone();
        }

        let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(epoch as u64));
        self.examples
            .iter()
            .filter(|_| rng.gen::<f64>() <= self.sample_pro)
            .cloned()
            .collect()
    }
}

/// Parse one `context \t response \t label` line.
fn parse_line(line: &str, vocab_size: usize) -> std::result::Result<DialoguePair, String> {
    let fields: Vec<&str> = line.trim_end_matches(['\r', '\n']).split('\t').collect();
    if fields.len() != 3 {
        return Err(format!("expected 3 tab-separated fields, found {}", fields.len()));
    }

    let context  = parse_ids(fields[0]).map_err(|e| format!("context: {e}"))?;
    let response = parse_ids(fields[1]).map_err(|e| format!("response: {e}"))?;
    let label: i64 = fields[2]
        .trim()
        .parse()
        .map_err(|_| format!("label '{}' is not an integer", fields[2].trim()))?;

    if context.is_empty() || response.is_empty() {
        return Err("context and response must both be non-empty".to_string());
    }

    let pair = DialoguePair::new(context, response, label);
    if let Some(max_id) = pair.max_token_id() {
        if max_id as usize >= vocab_size {
            return Err(format!("token id {max_id} is outside vocab_size {vocab_size}"));
        }
    }
    Ok(pair)
}

fn parse_ids(field: &str) -> std::result::Result<Vec<u32>, String> {
    field
        .split_whitespace()
        .map(|tok| tok.parse::<u32>().map_err(|_| format!("'{tok}' is not a token id")))
        .collect()
}
