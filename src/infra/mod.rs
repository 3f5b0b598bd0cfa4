// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Cross-cutting file I/O used by the other layers:
//
//   checkpoint.rs      — Saving and loading model weights and
//                        optimizer state with Burn's
//                        gzipped MessagePack recorder, plus the model config
//                        JSON the scorer needs.
//
//   embedding_init.rs  — Reads a pickled pretrained embedding
//                        matrix for the shared word embedding.
//
//   metrics.rs         — Appends step-level loss and speed to
//                        a CSV file.

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Pretrained word embedding loading
pub mod embedding_init;

/// Training metrics CSV logger
pub mod metrics;
