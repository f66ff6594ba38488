use super::bounds::BoundsError;
use std::collections::HashMap;

/// Stable bijection between matrix indices `0..n` and residue serials.
///
/// Serials are kept in ascending order, so index order always follows
/// sequence order. Consecutive indices are consecutive residues only when the
/// index is contiguous; see [`ResidueIndex::with_gaps_filled`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResidueIndex {
    serials: Vec<isize>,
    lookup: HashMap<isize, usize>,
}

impl ResidueIndex {
    pub fn new<I>(serials: I) -> Result<Self, BoundsError>
    where
        I: IntoIterator<Item = isize>,
    {
        let mut serials: Vec<isize> = serials.into_iter().collect();
        serials.sort_unstable();
        if let Some(window) = serials.windows(2).find(|w| w[0] == w[1]) {
            return Err(BoundsError::DuplicateSerial(window[0]));
        }
        let lookup = serials
            .iter()
            .enumerate()
            .map(|(idx, &serial)| (serial, idx))
            .collect();
        Ok(Self { serials, lookup })
    }

    /// Index `i` mapped to serial `i + 1`.
    pub fn sequential(size: usize) -> Self {
        let serials: Vec<isize> = (1..=size as isize).collect();
        let lookup = serials
            .iter()
            .enumerate()
            .map(|(idx, &serial)| (serial, idx))
            .collect();
        Self { serials, lookup }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.serials.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.serials.is_empty()
    }

    #[inline]
    pub fn serial_of(&self, index: usize) -> Option<isize> {
        self.serials.get(index).copied()
    }

    #[inline]
    pub fn index_of(&self, serial: isize) -> Option<usize> {
        self.lookup.get(&serial).copied()
    }

    pub fn serials(&self) -> &[isize] {
        &self.serials
    }

    /// `true` when every serial between the first and the last is present.
    pub fn is_contiguous(&self) -> bool {
        self.serials.windows(2).all(|w| w[1] == w[0] + 1)
    }

    /// An index over every serial from the first to the last one, so that
    /// residues missing from the input still occupy their chain position.
    pub fn with_gaps_filled(&self) -> Self {
        match (self.serials.first(), self.serials.last()) {
            (Some(&first), Some(&last)) if !self.is_contiguous() => {
                let serials: Vec<isize> = (first..=last).collect();
                let lookup = serials
                    .iter()
                    .enumerate()
                    .map(|(idx, &serial)| (serial, idx))
                    .collect();
                Self { serials, lookup }
            }
            _ => self.clone(),
        }
    }
}
