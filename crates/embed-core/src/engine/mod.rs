//! # Engine Module
//!
//! The distance-geometry pipeline behind the workflows.
//!
//! ## Architecture
//!
//! - **Smoothing** ([`smoothing`]) - shortest-path tightening of sparse bounds into a complete
//!   all-pairs bounds matrix
//! - **Metrization** ([`metrization`]) - random distance selection inside the bounds, with
//!   optional re-tightening after each choice
//! - **Embedding** ([`embedding`]) - metric-matrix eigendecomposition into 3D coordinates and
//!   the scaling applied afterwards
//! - **Scoring** ([`scoring`]) - how well a contact subset reproduces the full map's bounds
//! - **Configuration** ([`config`]) - validated parameters for reconstruction and distillation
//! - **Progress Monitoring** ([`progress`]) - progress callbacks and cooperative cancellation
//! - **Error Handling** ([`error`]) - the engine-wide error type

pub mod config;
pub mod embedding;
pub mod error;
pub mod metrization;
pub mod progress;
pub mod scoring;
pub mod smoothing;
pub mod utils;
