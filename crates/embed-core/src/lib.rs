//! # EMBED++ Core Library
//!
//! A modernized library for reconstructing protein Cα coordinates from residue contact maps,
//! based on the EMBED distance-geometry method.
//!
//! ## Architectural Philosophy
//!
//! The library keeps the same three-layer split as its sibling projects:
//!
//! - **[`core`]: The Foundation.** Stateless data models (`SparseBoundsMatrix`,
//!   `AllPairsBoundsMatrix`, `DistanceMatrix`), the contact-type distance bounds table and
//!   the contact-map to bounds conversion, plus geometry helpers.
//!
//! - **[`engine`]: The Logic Core.** Bounds smoothing, distance sampling with optional
//!   metrization, metric-matrix embedding, subset scoring, configuration, progress reporting
//!   and the engine error type.
//!
//! - **[`workflows`]: The Public API.** End-to-end procedures built from the engine:
//!   ensemble reconstruction ([`workflows::reconstruct`]) and contact-map distillation
//!   ([`workflows::distill`]).

pub mod core;
pub mod engine;
pub mod workflows;
