use super::distance::DistanceMatrix;
use super::index::ResidueIndex;
use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

/// Tolerance used when comparing distances against bounds.
pub const BOUND_TOLERANCE: f64 = 1e-4;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum BoundsError {
    #[error("Invalid bound [{lower}, {upper}]: bounds must be finite, non-negative and lower <= upper")]
    InvalidBound { lower: f64, upper: f64 },
    #[error("Index {index} is out of range for a bounds matrix of size {size}")]
    IndexOutOfRange { index: usize, size: usize },
    #[error("A bound cannot be defined between index {0} and itself")]
    SelfPair(usize),
    #[error("Pair ({0}, {1}) has no bound in the source matrix")]
    MissingPair(usize, usize),
    #[error("Residue serial {0} appears more than once")]
    DuplicateSerial(isize),
    #[error("Pair ({0}, {1}) is a backbone pair and always carries the backbone bound")]
    BackbonePair(usize, usize),
}

/// A distance interval `[lower, upper]` between two points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bound {
    pub(crate) lower: f64,
    pub(crate) upper: f64,
}

impl Bound {
    pub fn new(lower: f64, upper: f64) -> Result<Self, BoundsError> {
        if !lower.is_finite() || !upper.is_finite() || lower < 0.0 || lower > upper {
            return Err(BoundsError::InvalidBound { lower, upper });
        }
        Ok(Self { lower, upper })
    }

    pub fn fixed(value: f64) -> Result<Self, BoundsError> {
        Self::new(value, value)
    }

    #[inline]
    pub fn lower(&self) -> f64 {
        self.lower
    }

    #[inline]
    pub fn upper(&self) -> f64 {
        self.upper
    }

    #[inline]
    pub fn width(&self) -> f64 {
        self.upper - self.lower
    }

    /// Returns `true` if `distance` lies inside the interval, widened by `tolerance` on both sides.
    #[inline]
    pub fn contains(&self, distance: f64, tolerance: f64) -> bool {
        distance >= self.lower - tolerance && distance <= self.upper + tolerance
    }
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:.2}, {:.2}]", self.lower, self.upper)
    }
}

#[inline]
fn ordered(i: usize, j: usize) -> (usize, usize) {
    if i < j { (i, j) } else { (j, i) }
}

/// A partial, symmetric assignment of distance bounds to index pairs.
///
/// Bounds live in an arena; each index keeps an adjacency list of
/// `(neighbor, arena slot)` entries so that graph algorithms can walk the
/// constraint network without materializing a dense matrix. Consecutive
/// indices always carry the backbone bound.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseBoundsMatrix {
    index: ResidueIndex,
    backbone: Bound,
    arena: Vec<Bound>,
    pairs: Vec<(usize, usize)>,
    adjacency: Vec<Vec<(usize, usize)>>,
    slots: HashMap<(usize, usize), usize>,
}

impl SparseBoundsMatrix {
    /// Creates a matrix over the given residue index, pre-populated with the
    /// backbone bound for every pair of consecutive indices.
    pub fn new(index: ResidueIndex, backbone: Bound) -> Self {
        let size = index.len();
        let mut matrix = Self {
            index,
            backbone,
            arena: Vec::new(),
            pairs: Vec::new(),
            adjacency: vec![Vec::new(); size],
            slots: HashMap::new(),
        };
        for i in 1..size {
            matrix.store(i - 1, i, backbone);
        }
        matrix
    }

    /// Creates a matrix of `size` indices mapped to serials `1..=size`.
    pub fn with_size(size: usize, backbone: Bound) -> Self {
        Self::new(ResidueIndex::sequential(size), backbone)
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.index.len()
    }

    #[inline]
    pub fn index(&self) -> &ResidueIndex {
        &self.index
    }

    #[inline]
    pub fn backbone_bound(&self) -> Bound {
        self.backbone
    }

    /// Number of pairs carrying a bound, backbone pairs included.
    #[inline]
    pub fn len(&self) -> usize {
        self.arena.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    #[inline]
    pub fn is_backbone_pair(i: usize, j: usize) -> bool {
        i.abs_diff(j) == 1
    }

    /// Defines (or overwrites) the bound of pair `(i, j)`. Backbone pairs are
    /// fixed at construction and cannot be redefined.
    pub fn insert(&mut self, i: usize, j: usize, bound: Bound) -> Result<(), BoundsError> {
        self.check_pair(i, j)?;
        self.store(i, j, bound);
        Ok(())
    }

    pub fn get(&self, i: usize, j: usize) -> Option<Bound> {
        self.slots.get(&ordered(i, j)).map(|&slot| self.arena[slot])
    }

    pub fn contains(&self, i: usize, j: usize) -> bool {
        self.slots.contains_key(&ordered(i, j))
    }

    /// Iterates over every defined pair `(i, j)` with `i < j`, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = ((usize, usize), Bound)> + '_ {
        self.pairs.iter().copied().zip(self.arena.iter().copied())
    }

    /// Iterates over the defined pairs that are not backbone pairs.
    pub fn contacts(&self) -> impl Iterator<Item = ((usize, usize), Bound)> + '_ {
        self.iter()
            .filter(|&((i, j), _)| !Self::is_backbone_pair(i, j))
    }

    pub fn neighbors(&self, i: usize) -> impl Iterator<Item = (usize, Bound)> + '_ {
        self.adjacency
            .get(i)
            .into_iter()
            .flatten()
            .map(|&(neighbor, slot)| (neighbor, self.arena[slot]))
    }

    /// A matrix over the same index holding only the backbone bounds.
    pub fn backbone_only(&self) -> Self {
        Self::new(self.index.clone(), self.backbone)
    }

    /// A matrix over the same index holding the backbone bounds plus the given
    /// pairs, each copied from this matrix.
    pub fn subset<I>(&self, pairs: I) -> Result<Self, BoundsError>
    where
        I: IntoIterator<Item = (usize, usize)>,
    {
        let mut subset = self.backbone_only();
        for (i, j) in pairs {
            let bound = self.get(i, j).ok_or(BoundsError::MissingPair(i, j))?;
            subset.insert(i, j, bound)?;
        }
        Ok(subset)
    }

    fn check_pair(&self, i: usize, j: usize) -> Result<(), BoundsError> {
        let size = self.size();
        for index in [i, j] {
            if index >= size {
                return Err(BoundsError::IndexOutOfRange { index, size });
            }
        }
        if i == j {
            return Err(BoundsError::SelfPair(i));
        }
        if Self::is_backbone_pair(i, j) {
            return Err(BoundsError::BackbonePair(i.min(j), i.max(j)));
        }
        Ok(())
    }

    fn store(&mut self, i: usize, j: usize, bound: Bound) {
        let key = ordered(i, j);
        if let Some(&slot) = self.slots.get(&key) {
            self.arena[slot] = bound;
            return;
        }
        let slot = self.arena.len();
        self.arena.push(bound);
        self.pairs.push(key);
        self.adjacency[key.0].push((key.1, slot));
        self.adjacency[key.1].push((key.0, slot));
        self.slots.insert(key, slot);
    }
}

/// Counts of realized distances falling outside their bounds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BoundViolations {
    pub lower: usize,
    pub upper: usize,
}

impl BoundViolations {
    #[inline]
    pub fn total(&self) -> usize {
        self.lower + self.upper
    }
}

/// Dense, symmetric bounds for every pair of indices.
///
/// Only produced by the bounds smoother; read-only for callers.
#[derive(Debug, Clone, PartialEq)]
pub struct AllPairsBoundsMatrix {
    index: ResidueIndex,
    backbone: Bound,
    bounds: Vec<Bound>,
}

impl AllPairsBoundsMatrix {
    pub(crate) fn from_rows(index: ResidueIndex, backbone: Bound, bounds: Vec<Bound>) -> Self {
        debug_assert_eq!(bounds.len(), index.len() * index.len());
        Self {
            index,
            backbone,
            bounds,
        }
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.index.len()
    }

    #[inline]
    pub fn index(&self) -> &ResidueIndex {
        &self.index
    }

    /// Bound of pair `(i, j)`. The diagonal holds `[0, 0]`.
    ///
    /// # Panics
    ///
    /// Panics if `i` or `j` is out of range.
    #[inline]
    pub fn get(&self, i: usize, j: usize) -> Bound {
        self.bounds[i * self.size() + j]
    }

    #[inline]
    pub fn lower(&self, i: usize, j: usize) -> f64 {
        self.get(i, j).lower
    }

    #[inline]
    pub fn upper(&self, i: usize, j: usize) -> f64 {
        self.get(i, j).upper
    }

    #[inline]
    pub(crate) fn set(&mut self, i: usize, j: usize, bound: Bound) {
        let n = self.size();
        self.bounds[i * n + j] = bound;
        self.bounds[j * n + i] = bound;
    }

    /// Iterates over the upper triangle `(i, j)`, `i < j`, in row-major order.
    pub fn iter_pairs(&self) -> impl Iterator<Item = ((usize, usize), Bound)> + '_ {
        let n = self.size();
        (0..n).flat_map(move |i| ((i + 1)..n).map(move |j| ((i, j), self.get(i, j))))
    }

    /// Re-expresses every pair as an explicit sparse bound.
    pub fn to_sparse(&self) -> SparseBoundsMatrix {
        let mut sparse = SparseBoundsMatrix::new(self.index.clone(), self.backbone);
        for ((i, j), bound) in self.iter_pairs() {
            sparse.store(i, j, bound);
        }
        sparse
    }

    /// Counts how many distances of `distances` fall outside their bound.
    pub fn count_violations(&self, distances: &DistanceMatrix, tolerance: f64) -> BoundViolations {
        let mut violations = BoundViolations::default();
        for ((i, j), bound) in self.iter_pairs() {
            let d = distances.get(i, j);
            if d < bound.lower - tolerance {
                violations.lower += 1;
            } else if d > bound.upper + tolerance {
                violations.upper += 1;
            }
        }
        violations
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backbone() -> Bound {
        Bound::fixed(3.8).unwrap()
    }

    #[test]
    fn bound_new_rejects_inverted_and_negative_intervals() {
        assert!(matches!(
            Bound::new(5.0, 4.0),
            Err(BoundsError::InvalidBound { .. })
        ));
        assert!(Bound::new(-1.0, 4.0).is_err());
        assert!(Bound::new(1.0, f64::INFINITY).is_err());
        assert!(Bound::new(2.0, 2.0).is_ok());
    }

    #[test]
    fn bound_contains_respects_tolerance() {
        let bound = Bound::new(2.0, 4.0).unwrap();
        assert!(bound.contains(3.0, 0.0));
        assert!(!bound.contains(4.05, 0.0));
        assert!(bound.contains(4.05, 0.1));
    }

    #[test]
    fn new_matrix_contains_backbone_bounds_for_consecutive_indices() {
        let matrix = SparseBoundsMatrix::with_size(4, backbone());
        assert_eq!(matrix.len(), 3);
        for i in 0..3 {
            assert_eq!(matrix.get(i, i + 1), Some(backbone()));
            assert_eq!(matrix.get(i + 1, i), Some(backbone()));
        }
        assert_eq!(matrix.get(0, 2), None);
        assert_eq!(matrix.contacts().count(), 0);
    }

    #[test]
    fn insert_is_symmetric_and_overwrites() {
        let mut matrix = SparseBoundsMatrix::with_size(6, backbone());
        matrix.insert(4, 1, Bound::new(2.8, 8.0).unwrap()).unwrap();
        assert_eq!(matrix.get(1, 4), Some(Bound::new(2.8, 8.0).unwrap()));
        matrix.insert(1, 4, Bound::new(2.8, 6.0).unwrap()).unwrap();
        assert_eq!(matrix.get(4, 1), Some(Bound::new(2.8, 6.0).unwrap()));
        assert_eq!(matrix.contacts().count(), 1);
        assert_eq!(matrix.neighbors(1).count(), 3);
    }

    #[test]
    fn insert_rejects_invalid_pairs() {
        let mut matrix = SparseBoundsMatrix::with_size(3, backbone());
        let bound = Bound::new(2.8, 8.0).unwrap();
        assert_eq!(
            matrix.insert(0, 3, bound),
            Err(BoundsError::IndexOutOfRange { index: 3, size: 3 })
        );
        assert_eq!(matrix.insert(1, 1, bound), Err(BoundsError::SelfPair(1)));
    }

    #[test]
    fn insert_never_replaces_the_backbone_bound() {
        let mut matrix = SparseBoundsMatrix::with_size(4, backbone());
        assert_eq!(
            matrix.insert(2, 1, Bound::new(0.0, 50.0).unwrap()),
            Err(BoundsError::BackbonePair(1, 2))
        );
        assert_eq!(matrix.get(1, 2), Some(backbone()));
        assert_eq!(
            matrix.subset([(0, 1)]),
            Err(BoundsError::BackbonePair(0, 1))
        );
    }

    #[test]
    fn subset_keeps_backbone_and_requested_pairs_only() {
        let mut matrix = SparseBoundsMatrix::with_size(8, backbone());
        matrix.insert(0, 4, Bound::new(2.8, 8.0).unwrap()).unwrap();
        matrix.insert(2, 7, Bound::new(2.8, 8.0).unwrap()).unwrap();
        let subset = matrix.subset([(2, 7)]).unwrap();
        assert_eq!(subset.len(), 8);
        assert!(subset.contains(2, 7));
        assert!(!subset.contains(0, 4));
        assert_eq!(
            matrix.subset([(1, 5)]),
            Err(BoundsError::MissingPair(1, 5))
        );
    }
}
