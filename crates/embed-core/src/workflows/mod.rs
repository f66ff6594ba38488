//! # Workflows Module
//!
//! High-level entry points that tie the engine stages together.
//!
//! - **Reconstruction** ([`reconstruct`]) - smooths a contact map's bounds once, then draws an
//!   ensemble of Cα models by sampling distances and embedding them in three dimensions.
//! - **Distillation** ([`distill`]) - scores random contact subsets against the full map to
//!   find the contacts that carry the most geometric information.
//!
//! Both workflows report progress through [`crate::engine::progress::ProgressReporter`] and
//! stop early when its cancellation token is set.

pub mod distill;
pub mod reconstruct;
