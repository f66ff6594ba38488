use crate::core::models::contact::{AtomCategory, ContactType};
use crate::core::models::residue::AminoAcid;
use phf::{Map, phf_map};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Fixed distance between consecutive Cα atoms, in Å.
pub const BACKBONE_CA_DISTANCE: f64 = 3.8;

// (lower bound, upper-bound offset added on top of the contact cutoff)
static DEFAULT_CATEGORY_BOUNDS: Map<&'static str, (f64, f64)> = phf_map! {
    "Ca" => (2.8, 0.0),
    "Cb" => (2.6, 0.0),
    "Cg" => (2.6, 0.0),
    "C" => (2.8, 0.0),
};

/// Lower bound and upper-bound offset for one atom category.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct CategoryBounds {
    pub lower: f64,
    #[serde(default)]
    pub upper: f64,
}

#[derive(Debug, Deserialize)]
struct CategoryFile {
    #[serde(default)]
    categories: HashMap<String, CategoryBounds>,
}

#[derive(Debug, Deserialize)]
struct PairRecord {
    category: String,
    res1: AminoAcid,
    res2: AminoAcid,
    lower: f64,
    upper: f64,
}

#[derive(Debug, Error)]
pub enum TableLoadError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("CSV parsing error for '{path}': {source}")]
    Csv { path: String, source: csv::Error },
    #[error("TOML parsing error for '{path}': {source}")]
    Toml {
        path: String,
        source: toml::de::Error,
    },
    #[error("Unknown atom category '{category}' in '{path}'")]
    UnknownCategory { path: String, category: String },
}

/// Lookup table of per-atom-category distance bounds, with optional
/// amino-acid-pair specific overrides.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceBoundsTable {
    categories: HashMap<AtomCategory, CategoryBounds>,
    pairs: HashMap<(AtomCategory, AminoAcid, AminoAcid), CategoryBounds>,
}

impl Default for DistanceBoundsTable {
    fn default() -> Self {
        let categories = [
            AtomCategory::Ca,
            AtomCategory::Cb,
            AtomCategory::Cg,
            AtomCategory::C,
        ]
        .into_iter()
        .filter_map(|category| {
            DEFAULT_CATEGORY_BOUNDS
                .get(category.as_str())
                .map(|&(lower, upper)| (category, CategoryBounds { lower, upper }))
        })
        .collect();
        Self {
            categories,
            pairs: HashMap::new(),
        }
    }
}

#[inline]
fn pair_key(category: AtomCategory, a: AminoAcid, b: AminoAcid) -> (AtomCategory, AminoAcid, AminoAcid) {
    if a <= b { (category, a, b) } else { (category, b, a) }
}

impl DistanceBoundsTable {
    /// Default table overlaid with the category overrides of `categories_path`
    /// (TOML) and the amino-acid-pair overrides of `pairs_path` (CSV).
    pub fn load(categories_path: &Path, pairs_path: &Path) -> Result<Self, TableLoadError> {
        let mut table = Self::default();
        for (category, bounds) in Self::load_categories(categories_path)? {
            table.set_category(category, bounds);
        }
        for ((category, a, b), bounds) in Self::load_pair_csv(pairs_path)? {
            table.set_pair(category, a, b, bounds);
        }
        Ok(table)
    }

    pub fn set_category(&mut self, category: AtomCategory, bounds: CategoryBounds) {
        self.categories.insert(category, bounds);
    }

    /// Overrides the bounds of `category` for the residue pair `{a, b}`, in either order.
    pub fn set_pair(&mut self, category: AtomCategory, a: AminoAcid, b: AminoAcid, bounds: CategoryBounds) {
        self.pairs.insert(pair_key(category, a, b), bounds);
    }

    pub fn lookup(&self, category: AtomCategory, a: AminoAcid, b: AminoAcid) -> CategoryBounds {
        self.pairs
            .get(&pair_key(category, a, b))
            .or_else(|| self.categories.get(&category))
            .copied()
            .unwrap_or(CategoryBounds {
                lower: 0.0,
                upper: 0.0,
            })
    }

    pub fn lower_bound(&self, category: AtomCategory, a: AminoAcid, b: AminoAcid) -> f64 {
        self.lookup(category, a, b).lower
    }

    pub fn upper_bound(&self, category: AtomCategory, a: AminoAcid, b: AminoAcid) -> f64 {
        self.lookup(category, a, b).upper
    }

    /// `(dist_min, dist_max)` for a contact of type `contact_type` between
    /// residues of type `a` and `b`, given the contact-map distance `cutoff`.
    ///
    /// Both values average the lookups of the two endpoint categories; the
    /// upper average is added on top of `cutoff`.
    pub fn contact_bounds(
        &self,
        contact_type: ContactType,
        a: AminoAcid,
        b: AminoAcid,
        cutoff: f64,
    ) -> (f64, f64) {
        let first = self.lookup(contact_type.first, a, b);
        let second = self.lookup(contact_type.second, a, b);
        let dist_min = (first.lower + second.lower) / 2.0;
        let dist_max = (first.upper + second.upper) / 2.0 + cutoff;
        (dist_min, dist_max)
    }

    fn load_categories(
        path: &Path,
    ) -> Result<HashMap<AtomCategory, CategoryBounds>, TableLoadError> {
        let content = std::fs::read_to_string(path).map_err(|e| TableLoadError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        let file: CategoryFile = toml::from_str(&content).map_err(|e| TableLoadError::Toml {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        file.categories
            .into_iter()
            .map(|(name, bounds)| {
                let category = name
                    .parse::<AtomCategory>()
                    .map_err(|_| TableLoadError::UnknownCategory {
                        path: path.to_string_lossy().to_string(),
                        category: name.clone(),
                    })?;
                Ok((category, bounds))
            })
            .collect()
    }

    fn load_pair_csv(
        path: &Path,
    ) -> Result<HashMap<(AtomCategory, AminoAcid, AminoAcid), CategoryBounds>, TableLoadError> {
        let mut reader = csv::Reader::from_path(path).map_err(|e| TableLoadError::Csv {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;

        let mut pairs = HashMap::new();
        for result in reader.deserialize::<PairRecord>() {
            let record = result.map_err(|e| TableLoadError::Csv {
                path: path.to_string_lossy().to_string(),
                source: e,
            })?;
            let category = record.category.parse::<AtomCategory>().map_err(|_| {
                TableLoadError::UnknownCategory {
                    path: path.to_string_lossy().to_string(),
                    category: record.category.clone(),
                }
            })?;
            pairs.insert(
                pair_key(category, record.res1, record.res2),
                CategoryBounds {
                    lower: record.lower,
                    upper: record.upper,
                },
            );
        }
        Ok(pairs)
    }
}
