//! Utility functions for the engine module.
//!
//! Random selection helpers shared by the reconstruction and distillation
//! workflows: distinct index sampling and per-task seed derivation.

pub mod sampling;
