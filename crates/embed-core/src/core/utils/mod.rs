//! Geometry helpers for comparing and analysing reconstructed coordinates.

pub mod geometry;
