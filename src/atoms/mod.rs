// Concierge Engine — Atoms
//
// The pure layer: constants, error types, and data types.
// Nothing in here performs I/O or depends on the engine or server layers.

pub mod constants;
pub mod error;
pub mod types;
