use super::table::{BACKBONE_CA_DISTANCE, DistanceBoundsTable};
use crate::core::models::bounds::{Bound, BoundsError, SparseBoundsMatrix};
use crate::core::models::contact::{ContactType, ContactTypeError};
use crate::core::models::index::ResidueIndex;
use crate::core::models::residue::AminoAcid;
use nalgebra::Point3;
use std::collections::HashMap;
use thiserror::Error;
use tracing::{debug, warn};

/// A residue contact map that can be turned into distance bounds.
///
/// Residues are identified by their serial; contacts are unordered serial
/// pairs. Every contact shares the map's contact type and distance cutoff.
pub trait ContactSource {
    fn contact_type(&self) -> &str;
    fn cutoff(&self) -> f64;
    fn residues(&self) -> impl Iterator<Item = (isize, AminoAcid)> + '_;
    fn contacts(&self) -> impl Iterator<Item = (isize, isize)> + '_;
}

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Invalid contact type: {0}")]
    InvalidContactType(#[from] ContactTypeError),
    #[error("Contact references residue serial {0}, which is not part of the contact map")]
    UnknownResidue(isize),
    #[error("Residue {0} cannot be in contact with itself")]
    SelfContact(isize),
    #[error("Contact cutoff must be finite and positive, got {0}")]
    InvalidCutoff(f64),
    #[error("Contact ({first}, {second}) produced an invalid bound: {source}")]
    InvalidContactBound {
        first: isize,
        second: isize,
        source: BoundsError,
    },
    #[error("Bounds matrix error: {0}")]
    Bounds(#[from] BoundsError),
}

/// A plain in-memory contact map.
#[derive(Debug, Clone, PartialEq)]
pub struct ContactMap {
    contact_type: String,
    cutoff: f64,
    residues: Vec<(isize, AminoAcid)>,
    contacts: Vec<(isize, isize)>,
}

impl ContactMap {
    pub fn new(contact_type: impl Into<String>, cutoff: f64) -> Self {
        Self {
            contact_type: contact_type.into(),
            cutoff,
            residues: Vec::new(),
            contacts: Vec::new(),
        }
    }

    /// A map over a one-letter sequence, residue `k` (zero-based) getting serial `k + 1`.
    pub fn from_sequence(contact_type: impl Into<String>, cutoff: f64, sequence: &str) -> Self {
        let mut map = Self::new(contact_type, cutoff);
        for (k, aa) in AminoAcid::parse_sequence(sequence).into_iter().enumerate() {
            map.add_residue(k as isize + 1, aa);
        }
        map
    }

    /// Contacts every residue pair whose coordinates lie within `cutoff` of
    /// each other. `points[k]` belongs to the `k`-th residue of `residues`.
    pub fn from_coordinates(
        contact_type: impl Into<String>,
        cutoff: f64,
        residues: &[(isize, AminoAcid)],
        points: &[Point3<f64>],
    ) -> Self {
        let mut map = Self::new(contact_type, cutoff);
        for &(serial, aa) in residues {
            map.add_residue(serial, aa);
        }
        for (a, pa) in residues.iter().zip(points) {
            for (b, pb) in residues.iter().zip(points) {
                if a.0 < b.0 && nalgebra::distance(pa, pb) <= cutoff {
                    map.add_contact(a.0, b.0);
                }
            }
        }
        map
    }

    pub fn add_residue(&mut self, serial: isize, amino_acid: AminoAcid) {
        self.residues.push((serial, amino_acid));
    }

    pub fn add_contact(&mut self, first: isize, second: isize) {
        self.contacts.push((first, second));
    }

    pub fn contact_count(&self) -> usize {
        self.contacts.len()
    }
}

impl ContactSource for ContactMap {
    fn contact_type(&self) -> &str {
        &self.contact_type
    }

    fn cutoff(&self) -> f64 {
        self.cutoff
    }

    fn residues(&self) -> impl Iterator<Item = (isize, AminoAcid)> + '_ {
        self.residues.iter().copied()
    }

    fn contacts(&self) -> impl Iterator<Item = (isize, isize)> + '_ {
        self.contacts.iter().copied()
    }
}

/// Converts a contact map into a sparse bounds matrix.
///
/// Every non-adjacent contact gets the bound looked up in `table` for its
/// residue types; consecutive residues always get the fixed backbone bound
/// of [`BACKBONE_CA_DISTANCE`]. Matrix indices cover every serial from the
/// first residue to the last, so residues missing from the map never make
/// their neighbours adjacent.
pub fn build_bounds_matrix<S: ContactSource>(
    source: &S,
    table: &DistanceBoundsTable,
) -> Result<SparseBoundsMatrix, BuildError> {
    let contact_type: ContactType = source.contact_type().parse()?;
    let cutoff = source.cutoff();
    if !cutoff.is_finite() || cutoff <= 0.0 {
        return Err(BuildError::InvalidCutoff(cutoff));
    }

    let residue_types: HashMap<isize, AminoAcid> = source.residues().collect();
    let observed = ResidueIndex::new(source.residues().map(|(serial, _)| serial))?;
    let index = observed.with_gaps_filled();
    if index.len() > observed.len() {
        warn!(
            missing = index.len() - observed.len(),
            "Residue serials have gaps; missing residues are kept as unconstrained chain positions"
        );
    }
    let mut bounds = SparseBoundsMatrix::new(index, Bound::fixed(BACKBONE_CA_DISTANCE)?);

    let mut stored = 0usize;
    for (first, second) in source.contacts() {
        if first == second {
            return Err(BuildError::SelfContact(first));
        }
        let lookup = |serial: isize| {
            bounds
                .index()
                .index_of(serial)
                .zip(residue_types.get(&serial).copied())
                .ok_or(BuildError::UnknownResidue(serial))
        };
        let (i, aa_i) = lookup(first)?;
        let (j, aa_j) = lookup(second)?;
        if SparseBoundsMatrix::is_backbone_pair(i, j) {
            continue;
        }

        let (dist_min, dist_max) = table.contact_bounds(contact_type, aa_i, aa_j, cutoff);
        let bound = Bound::new(dist_min, dist_max).map_err(|source| {
            BuildError::InvalidContactBound {
                first,
                second,
                source,
            }
        })?;
        bounds.insert(i, j, bound)?;
        stored += 1;
    }

    debug!(
        residues = bounds.size(),
        contacts = stored,
        contact_type = %contact_type,
        cutoff,
        "Built sparse bounds matrix from contact map"
    );
    Ok(bounds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::restraints::table::CategoryBounds;
    use crate::core::models::contact::AtomCategory;

    fn helix_map(contact_type: &str) -> ContactMap {
        let mut map = ContactMap::from_sequence(contact_type, 8.0, "MKVLAAGIVG");
        map.add_contact(1, 5);
        map.add_contact(3, 2);
        map.add_contact(8, 4);
        map
    }

    #[test]
    fn builds_backbone_and_non_adjacent_contact_bounds() {
        let bounds = build_bounds_matrix(&helix_map("Ca"), &DistanceBoundsTable::default()).unwrap();

        assert_eq!(bounds.size(), 10);
        assert_eq!(bounds.get(0, 1), Some(Bound::fixed(3.8).unwrap()));
        assert_eq!(bounds.get(8, 9), Some(Bound::fixed(3.8).unwrap()));
        assert_eq!(bounds.get(0, 4), Some(Bound::new(2.8, 8.0).unwrap()));
        assert_eq!(bounds.get(7, 3), Some(Bound::new(2.8, 8.0).unwrap()));
        // adjacent contact (3, 2) keeps the backbone bound
        assert_eq!(bounds.get(1, 2), Some(Bound::fixed(3.8).unwrap()));
        assert_eq!(bounds.contacts().count(), 2);
    }

    #[test]
    fn index_follows_sorted_serials() {
        let mut map = ContactMap::new("Cb", 8.0);
        map.add_residue(12, AminoAcid::Alanine);
        map.add_residue(10, AminoAcid::Glycine);
        map.add_residue(11, AminoAcid::Serine);
        map.add_residue(13, AminoAcid::Serine);
        map.add_contact(13, 10);

        let bounds = build_bounds_matrix(&map, &DistanceBoundsTable::default()).unwrap();
        assert_eq!(bounds.index().serials(), &[10, 11, 12, 13]);
        assert_eq!(bounds.get(0, 3), Some(Bound::new(2.6, 8.0).unwrap()));
    }

    #[test]
    fn gaps_in_serials_never_become_backbone_pairs() {
        let mut map = ContactMap::new("Ca", 8.0);
        map.add_residue(10, AminoAcid::Alanine);
        map.add_residue(15, AminoAcid::Glycine);
        map.add_residue(16, AminoAcid::Serine);
        map.add_contact(10, 15);

        let bounds = build_bounds_matrix(&map, &DistanceBoundsTable::default()).unwrap();
        assert_eq!(bounds.size(), 7);
        let (i, j) = (
            bounds.index().index_of(10).unwrap(),
            bounds.index().index_of(15).unwrap(),
        );
        assert_eq!((i, j), (0, 5));
        assert_eq!(bounds.get(i, j), Some(Bound::new(2.8, 8.0).unwrap()));
        assert_eq!(bounds.contacts().count(), 1);
        assert_eq!(bounds.get(5, 6), Some(Bound::fixed(3.8).unwrap()));

        map.add_contact(10, 12);
        let result = build_bounds_matrix(&map, &DistanceBoundsTable::default());
        assert!(matches!(result, Err(BuildError::UnknownResidue(12))));
    }

    #[test]
    fn crossed_contact_type_uses_both_categories() {
        let mut table = DistanceBoundsTable::default();
        table.set_category(AtomCategory::Cg, CategoryBounds { lower: 3.0, upper: 2.0 });
        let bounds = build_bounds_matrix(&helix_map("Ca/Cg"), &table).unwrap();
        let bound = bounds.get(0, 4).unwrap();
        assert!((bound.lower() - 2.9).abs() < 1e-12);
        assert!((bound.upper() - 9.0).abs() < 1e-12);
    }

    #[test]
    fn rejects_undecomposable_contact_types() {
        for contact_type in ["BB", "SC", "Ca+Cb"] {
            let result = build_bounds_matrix(&helix_map(contact_type), &DistanceBoundsTable::default());
            assert!(matches!(result, Err(BuildError::InvalidContactType(_))));
        }
    }

    #[test]
    fn rejects_unknown_residues_and_self_contacts() {
        let mut map = helix_map("Ca");
        map.add_contact(2, 42);
        let result = build_bounds_matrix(&map, &DistanceBoundsTable::default());
        assert!(matches!(result, Err(BuildError::UnknownResidue(42))));

        let mut map = helix_map("Ca");
        map.add_contact(6, 6);
        let result = build_bounds_matrix(&map, &DistanceBoundsTable::default());
        assert!(matches!(result, Err(BuildError::SelfContact(6))));
    }

    #[test]
    fn rejects_bounds_with_lower_above_upper() {
        let mut map = ContactMap::from_sequence("Ca", 2.0, "AAAA");
        map.add_contact(1, 4);
        let result = build_bounds_matrix(&map, &DistanceBoundsTable::default());
        assert!(matches!(
            result,
            Err(BuildError::InvalidContactBound { first: 1, second: 4, .. })
        ));
    }

    #[test]
    fn rejects_duplicate_serials() {
        let mut map = ContactMap::new("Ca", 8.0);
        map.add_residue(1, AminoAcid::Alanine);
        map.add_residue(1, AminoAcid::Glycine);
        let result = build_bounds_matrix(&map, &DistanceBoundsTable::default());
        assert!(matches!(
            result,
            Err(BuildError::Bounds(BoundsError::DuplicateSerial(1)))
        ));
    }

    #[test]
    fn from_coordinates_contacts_pairs_within_cutoff() {
        let residues: Vec<_> = (1..=4).map(|s| (s, AminoAcid::Alanine)).collect();
        let points = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(3.8, 0.0, 0.0),
            Point3::new(3.8, 3.8, 0.0),
            Point3::new(0.0, 3.8, 0.0),
        ];
        let map = ContactMap::from_coordinates("Ca", 4.0, &residues, &points);
        assert_eq!(map.contact_count(), 4);
        let bounds = build_bounds_matrix(&map, &DistanceBoundsTable::default()).unwrap();
        assert_eq!(bounds.get(0, 3), Some(Bound::new(2.8, 4.0).unwrap()));
    }
}
