// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Orchestrates the other layers for one goal at a time.
//
// Rules for this layer:
//   - No ML math or model code here
//   - No direct file-format parsing of training data (Layer 4)
//   - Only workflow coordination and configuration

// Run configuration (YAML + defaults + validation)
pub mod config;

// The training workflow
pub mod train_use_case;

// Scoring pairs with a trained param set
pub mod score_use_case;
