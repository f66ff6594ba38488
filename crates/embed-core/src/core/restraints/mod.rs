//! Turning residue contact maps into distance bounds.
//!
//! - [`table`] - Per-atom-category and per-residue-pair bound lookups
//! - [`builder`] - The [`builder::ContactSource`] abstraction and the conversion
//!   into a [`crate::core::models::bounds::SparseBoundsMatrix`]

pub mod builder;
pub mod table;
