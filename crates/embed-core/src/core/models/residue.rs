use phf::{Map, phf_map};
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
#[serde(try_from = "String")]
pub enum AminoAcid {
    // --- Aliphatic, Nonpolar ---
    Alanine,    // ALA
    Glycine,    // GLY
    Isoleucine, // ILE
    Leucine,    // LEU
    Proline,    // PRO
    Valine,     // VAL

    // --- Aromatic ---
    Phenylalanine, // PHE
    Tryptophan,    // TRP
    Tyrosine,      // TYR

    // --- Polar, Uncharged ---
    Asparagine, // ASN
    Cysteine,   // CYS
    Glutamine,  // GLN
    Serine,     // SER
    Threonine,  // THR
    Methionine, // MET

    // --- Positively Charged (Basic) ---
    Arginine,  // ARG
    Histidine, // HIS
    Lysine,    // LYS

    // --- Negatively Charged (Acidic) ---
    AsparticAcid, // ASP
    GlutamicAcid, // GLU

    // Nonstandard or unobserved residue (XXX / X)
    Unknown,
}

static THREE_LETTER_CODES: Map<&'static str, AminoAcid> = phf_map! {
    "ALA" => AminoAcid::Alanine,
    "GLY" => AminoAcid::Glycine,
    "ILE" => AminoAcid::Isoleucine,
    "LEU" => AminoAcid::Leucine,
    "PRO" => AminoAcid::Proline,
    "VAL" => AminoAcid::Valine,
    "PHE" => AminoAcid::Phenylalanine,
    "TRP" => AminoAcid::Tryptophan,
    "TYR" => AminoAcid::Tyrosine,
    "ASN" => AminoAcid::Asparagine,
    "CYS" => AminoAcid::Cysteine,
    "GLN" => AminoAcid::Glutamine,
    "SER" => AminoAcid::Serine,
    "THR" => AminoAcid::Threonine,
    "MET" => AminoAcid::Methionine,
    "ARG" => AminoAcid::Arginine,
    "HIS" => AminoAcid::Histidine,
    "HSE" => AminoAcid::Histidine,
    "HSD" => AminoAcid::Histidine,
    "HSP" => AminoAcid::Histidine,
    "LYS" => AminoAcid::Lysine,
    "ASP" => AminoAcid::AsparticAcid,
    "GLU" => AminoAcid::GlutamicAcid,
    "XXX" => AminoAcid::Unknown,
};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Unrecognized amino acid code: '{0}'")]
pub struct ParseAminoAcidError(pub String);

impl AminoAcid {
    pub fn from_one_letter(code: char) -> Option<Self> {
        let aa = match code.to_ascii_uppercase() {
            'A' => Self::Alanine,
            'G' => Self::Glycine,
            'I' => Self::Isoleucine,
            'L' => Self::Leucine,
            'P' => Self::Proline,
            'V' => Self::Valine,
            'F' => Self::Phenylalanine,
            'W' => Self::Tryptophan,
            'Y' => Self::Tyrosine,
            'N' => Self::Asparagine,
            'C' => Self::Cysteine,
            'Q' => Self::Glutamine,
            'S' => Self::Serine,
            'T' => Self::Threonine,
            'M' => Self::Methionine,
            'R' => Self::Arginine,
            'H' => Self::Histidine,
            'K' => Self::Lysine,
            'D' => Self::AsparticAcid,
            'E' => Self::GlutamicAcid,
            'X' => Self::Unknown,
            _ => return None,
        };
        Some(aa)
    }

    pub fn to_three_letter(self) -> &'static str {
        match self {
            Self::Alanine => "ALA",
            Self::Glycine => "GLY",
            Self::Isoleucine => "ILE",
            Self::Leucine => "LEU",
            Self::Proline => "PRO",
            Self::Valine => "VAL",
            Self::Phenylalanine => "PHE",
            Self::Tryptophan => "TRP",
            Self::Tyrosine => "TYR",
            Self::Asparagine => "ASN",
            Self::Cysteine => "CYS",
            Self::Glutamine => "GLN",
            Self::Serine => "SER",
            Self::Threonine => "THR",
            Self::Methionine => "MET",
            Self::Arginine => "ARG",
            Self::Histidine => "HIS",
            Self::Lysine => "LYS",
            Self::AsparticAcid => "ASP",
            Self::GlutamicAcid => "GLU",
            Self::Unknown => "XXX",
        }
    }

    /// Parses a one-letter sequence; any unrecognized letter becomes [`AminoAcid::Unknown`].
    pub fn parse_sequence(sequence: &str) -> Vec<Self> {
        sequence
            .chars()
            .filter(|c| !c.is_whitespace())
            .map(|c| Self::from_one_letter(c).unwrap_or(Self::Unknown))
            .collect()
    }
}

impl FromStr for AminoAcid {
    type Err = ParseAminoAcidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Some(aa) = THREE_LETTER_CODES.get(trimmed.to_ascii_uppercase().as_str()) {
            return Ok(*aa);
        }
        let mut chars = trimmed.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Self::from_one_letter(c),
            _ => None,
        }
        .ok_or_else(|| ParseAminoAcidError(s.to_string()))
    }
}

impl TryFrom<String> for AminoAcid {
    type Error = ParseAminoAcidError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl fmt::Display for AminoAcid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_three_letter())
    }
}
