//! # Core Module
//!
//! Stateless building blocks of the EMBED distance-geometry pipeline.
//!
//! ## Overview
//!
//! Everything in this layer is plain data plus pure functions: no randomness,
//! no progress reporting and no configuration. The [`crate::engine`] layer
//! consumes these types to smooth, sample and embed.
//!
//! ## Architecture
//!
//! - **Data Models** ([`models`]) - Distance bounds, bounds matrices, distance
//!   matrices, residue indices, amino acids and contact types
//! - **Restraints** ([`restraints`]) - Conversion of residue contact maps into
//!   a sparse bounds matrix, driven by a distance bounds lookup table
//! - **Geometry** ([`utils`]) - Centroids, radius of gyration, RMSD and optimal
//!   superposition of point sets
//!
//! ## Scientific Foundation
//!
//! Residue contacts observed at a distance cutoff translate into interval
//! restraints `[lower, upper]` on Cα-Cα distances, with consecutive Cα atoms
//! held at a fixed 3.8 Å. Crippen & Havel's distance geometry then recovers
//! coordinates compatible with those intervals.

pub mod models;
pub mod restraints;
pub mod utils;
