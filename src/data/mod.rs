// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// From a token-id file on disk to tensor batches:
//
//   train.ids
//       │
//       ▼
//   DataProcessor     → parses, validates, truncates, samples per epoch
//       │
//       ▼
//   DialogueDataset   → implements Burn's Dataset trait
//       │
//       ▼
//   DialogueBatcher   → pads and stacks pairs into tensors
//       │
//       ▼
//   DataLoader        → feeds batches to the training loop

/// Reads and validates the tab-separated training file
pub mod reader;

/// Implements Burn's Dataset trait for dialogue pairs
pub mod dataset;

/// Implements Burn's Batcher trait to create padded tensor batches
pub mod batcher;
