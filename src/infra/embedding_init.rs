// ============================================================
// Layer 6 — Word Embedding Initialisation File
// ============================================================
// Reads a pretrained embedding matrix from a Python pickle.
//
// The file holds a list of rows, one per vocabulary entry:
//
//   [[0.12, -0.40, ...],     ← row for token id 0
//    [0.03,  0.88, ...],     ← row for token id 1
//    ...]
//
// Values may be floats or ints (pickled as Python numbers) and
// are cast to f32. All rows must have the same width. Pickled
// numpy arrays are not supported; convert with `arr.tolist()`
// before dumping.

use anyhow::{bail, Context, Result};
use std::{fs::File, io::BufReader, path::Path};

/// A dense row-major [rows, cols] matrix of f32 values.
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingMatrix {
    pub rows:   usize,
    pub cols:   usize,
    pub values: Vec<f32>,
}

impl EmbeddingMatrix {
    pub fn shape(&self) -> [usize; 2] {
        [self.rows, self.cols]
    }
}

/// Load a pickled `list[list[float]]` embedding table.
pub fn load_word_embedding(path: &Path) -> Result<EmbeddingMatrix> {
    let file = File::open(path)
        .with_context(|| format!("Cannot open embedding file '{}'", path.display()))?;

    let rows: Vec<Vec<f64>> = serde_pickle::from_reader(BufReader::new(file), serde_pickle::DeOptions::new())
        .with_context(|| {
            format!(
                "Cannot unpickle embedding file '{}' (expected list[list[float]])",
                path.display()
            )
        })?;

    from_rows(rows).with_context(|| format!("Bad embedding matrix in '{}'", path.display()))
}

fn from_rows(rows: Vec<Vec<f64>>) -> Result<EmbeddingMatrix> {
    let Some(first) = rows.first() else {
        bail!("embedding matrix is empty");
    };
    let cols = first.len();
    if cols == 0 {
        bail!("embedding rows are empty");
    }

    let mut values = Vec::with_capacity(rows.len() * cols);
    for (i, row) in rows.iter().enumerate() {
        if row.len() != cols {
            bail!("row {} has {} values, expected {}", i, row.len(), cols);
        }
        values.extend(row.iter().map(|&v| v as f32));
    }

    Ok(EmbeddingMatrix { rows: rows.len(), cols, values })
}
