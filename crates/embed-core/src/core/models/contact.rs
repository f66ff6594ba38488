use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Single-atom categories a contact can be defined on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize)]
pub enum AtomCategory {
    Ca,
    Cb,
    Cg,
    C,
}

impl AtomCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ca => "Ca",
            Self::Cb => "Cb",
            Self::Cg => "Cg",
            Self::C => "C",
        }
    }
}

impl FromStr for AtomCategory {
    type Err = ContactTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Ca" => Ok(Self::Ca),
            "Cb" => Ok(Self::Cb),
            "Cg" => Ok(Self::Cg),
            "C" => Ok(Self::C),
            _ => Err(ContactTypeError::Invalid(s.to_string())),
        }
    }
}

impl fmt::Display for AtomCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ContactTypeError {
    #[error("Contact type '{0}' cannot be decomposed into single-atom categories")]
    Invalid(String),
}

/// A contact type such as `Ca` or the crossed form `Ca/Cb`.
///
/// Multi-atom (`BB`, `SC`) and combined (`Ca+Cb`) types are rejected: only
/// types that decompose into one recognized atom category per endpoint can
/// be turned into distance bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContactType {
    pub first: AtomCategory,
    pub second: AtomCategory,
}

impl ContactType {
    pub fn single(category: AtomCategory) -> Self {
        Self {
            first: category,
            second: category,
        }
    }

    pub fn is_crossed(&self) -> bool {
        self.first != self.second
    }
}

impl FromStr for ContactType {
    type Err = ContactTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ContactTypeError::Invalid(s.to_string());
        let trimmed = s.trim();
        if trimmed.contains('+') {
            return Err(invalid());
        }
        match trimmed.split_once('/') {
            Some((first, second)) => Ok(Self {
                first: first.parse().map_err(|_| invalid())?,
                second: second.parse().map_err(|_| invalid())?,
            }),
            None => Ok(Self::single(trimmed.parse().map_err(|_| invalid())?)),
        }
    }
}

impl fmt::Display for ContactType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_crossed() {
            write!(f, "{}/{}", self.first, self.second)
        } else {
            write!(f, "{}", self.first)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_atom_contact_types() {
        let ct: ContactType = "Ca".parse().unwrap();
        assert_eq!(ct, ContactType::single(AtomCategory::Ca));
        assert!(!ct.is_crossed());
        assert_eq!(ct.to_string(), "Ca");
    }

    #[test]
    fn parses_crossed_contact_types() {
        let ct: ContactType = "Ca/Cg".parse().unwrap();
        assert_eq!(ct.first, AtomCategory::Ca);
        assert_eq!(ct.second, AtomCategory::Cg);
        assert_eq!(ct.to_string(), "Ca/Cg");
    }

    #[test]
    fn rejects_multi_atom_and_combined_contact_types() {
        for bad in ["BB", "SC", "Ca+Cb", "Ca/SC", "", "CA"] {
            assert_eq!(
                bad.parse::<ContactType>(),
                Err(ContactTypeError::Invalid(bad.to_string())),
                "'{bad}' should be rejected"
            );
        }
    }
}
