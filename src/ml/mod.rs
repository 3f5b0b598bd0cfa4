// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All Burn model code lives here:
//
//   model.rs      — the matching network: shared word
//                   embedding, shared LSTM encoder, bilinear
//                   scorer, plus the CLS / L2 losses
//
//   trainer.rs    — the step-driven training loop with
//                   gradient-clipped Adam, progress reports
//                   and periodic snapshots
//
//   inferencer.rs — loads a param set and scores pairs
//
//   device.rs     — backend selection (NdArray CPU / WGPU)

/// Response matching network and its losses
pub mod model;

/// Training loop with checkpointing
pub mod trainer;

/// Scoring with a saved param set
pub mod inferencer;

/// CPU / GPU backend selection
pub mod device;
