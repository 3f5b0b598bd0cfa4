// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types describing what the system works with:
// dialogue pairs (context, response, label) and the small
// set of traits the data and ml layers implement.
//
// Rules for this layer:
//   - NO Burn framework types allowed here
//   - NO file I/O
//   - Only plain Rust structs, enums, and traits

// A tokenised (context, response, label) example
pub mod dialogue_pair;

// Core abstractions (traits) that other layers implement
pub mod traits;
