//! # Core Models Module
//!
//! Data structures shared by every stage of the EMBED pipeline.
//!
//! ## Key Components
//!
//! - [`bounds`] - Distance intervals and the sparse / all-pairs bounds matrices
//! - [`distance`] - Complete symmetric matrices of concrete distances
//! - [`index`] - The fixed mapping between matrix indices and residue serials
//! - [`residue`] - Amino acid identities used to look up per-pair bounds
//! - [`contact`] - Contact types and the atom categories they decompose into
//!
//! A [`bounds::SparseBoundsMatrix`] is built once from a contact map and is
//! read-only afterwards. The smoother turns it into an
//! [`bounds::AllPairsBoundsMatrix`], from which every draw samples its own
//! [`distance::DistanceMatrix`].
//!
//! ```ignore
//! use embedpp::core::models::bounds::{Bound, SparseBoundsMatrix};
//!
//! let backbone = Bound::fixed(3.8)?;
//! let mut bounds = SparseBoundsMatrix::with_size(10, backbone);
//! bounds.insert(0, 5, Bound::new(2.8, 8.0)?)?;
//! ```

pub mod bounds;
pub mod contact;
pub mod distance;
pub mod index;
pub mod residue;
