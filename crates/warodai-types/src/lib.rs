//! Shared types that mirror the structure of a Warodai dictionary entry.
//!
//! A Warodai record is keyed by a three-part entry id ([`Eid`]) and carries
//! lexemes, readings, numbered translation senses and sense-scoped
//! cross-references ([`Reference`]). The loader (`warodai-db`) produces
//! [`DictionaryEntry`] values, the store (`warodai-lookup`) serves them.
//!
//! The [`script`] module holds the character classifiers and kana helpers the
//! parser and the lookup validation share.
//!
//! ```rust
//! use warodai_types::{Eid, MeaningSelection, Reference};
//!
//! let mut eid: Eid = "009-99-99".parse().unwrap();
//! assert_eq!(eid.increment(), "010-00-00");
//!
//! let r = Reference::new("001-00-01", MeaningSelection::All);
//! assert!(r.usable);
//! ```

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod script;

/// Sense number (`"1"`, `"2"`, ...) to values, in source order.
pub type SenseMap<T> = IndexMap<String, Vec<T>>;

#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum EidError {
    #[error("malformed entry id `{0}`: expected three dash-separated numbers")]
    Malformed(String),
}

/// Entry identifier such as `009-04-11`.
///
/// Formatting pads the segments to widths 3, 2 and 2, and ordering compares
/// the formatted strings, so `001-02-03 < 001-02-04` and `002-00-00 > 001-99-99`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct Eid {
    major: u32,
    middle: u32,
    minor: u32,
}

impl Eid {
    /// Parse a dash-separated id. Exactly three numeric segments are required.
    pub fn parse(raw: &str) -> Result<Self, EidError> {
        let malformed = || EidError::Malformed(raw.to_string());
        let mut parts = raw.trim().split('-');
        let mut next = || -> Result<u32, EidError> {
            let part = parts.next().ok_or_else(malformed)?;
            if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
                return Err(malformed());
            }
            part.parse().map_err(|_| malformed())
        };
        let eid = Self {
            major: next()?,
            middle: next()?,
            minor: next()?,
        };
        if parts.next().is_some() {
            return Err(malformed());
        }
        Ok(eid)
    }

    /// Advance to the next id in place and return its formatted form.
    ///
    /// The two low segments carry at 100 so the fixed-width format keeps
    /// holding: `009-99-99` becomes `010-00-00`.
    pub fn increment(&mut self) -> String {
        self.minor += 1;
        if self.minor >= 100 {
            self.minor -= 100;
            self.middle += 1;
        }
        if self.middle >= 100 {
            self.middle -= 100;
            self.major += 1;
        }
        self.to_string()
    }
}

impl fmt::Display for Eid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:03}-{:02}-{:02}", self.major, self.middle, self.minor)
    }
}

impl FromStr for Eid {
    type Err = EidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Ord for Eid {
    fn cmp(&self, other: &Self) -> Ordering {
        self.to_string().cmp(&other.to_string())
    }
}

impl PartialOrd for Eid {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Which senses of the target entry a reference pulls in.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeaningSelection {
    /// Every sense of the target.
    All,
    /// Only the listed sense numbers. An empty list never resolves.
    Senses(Vec<String>),
}

impl MeaningSelection {
    pub fn is_all(&self) -> bool {
        matches!(self, MeaningSelection::All)
    }
}

/// Sense-scoped "see also" link from one entry to another.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Reference {
    pub eid: String,
    pub meanings: MeaningSelection,
    /// Usage label prepended to every pulled gloss.
    pub mode: Option<String>,
    /// Caption text prepended to every pulled gloss, before `mode`.
    pub body: Option<String>,
    /// Only glosses starting with this text are pulled.
    pub prefix: Option<String>,
    pub usable: bool,
}

impl Reference {
    pub fn new(eid: impl Into<String>, meanings: MeaningSelection) -> Self {
        Self {
            eid: eid.into(),
            meanings,
            mode: None,
            body: None,
            prefix: None,
            usable: true,
        }
    }

    pub fn with_mode(mut self, mode: impl Into<String>) -> Self {
        self.mode = Some(mode.into()).filter(|m: &String| !m.is_empty());
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into()).filter(|b: &String| !b.is_empty());
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into()).filter(|p: &String| !p.is_empty());
        self
    }
}

/// One dictionary article.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct DictionaryEntry {
    pub eid: String,
    pub lexeme: Vec<String>,
    pub reading: Vec<String>,
    pub translation: SenseMap<String>,
    pub references: SenseMap<Reference>,
}

impl DictionaryEntry {
    /// All glosses across senses, in sense order.
    pub fn translations(&self) -> impl Iterator<Item = &String> + '_ {
        self.translation.values().flatten()
    }

    /// All references across senses, usable or not.
    pub fn all_references(&self) -> impl Iterator<Item = &Reference> + '_ {
        self.references.values().flatten()
    }

    pub fn usable_references(&self) -> impl Iterator<Item = &Reference> + '_ {
        self.all_references().filter(|r| r.usable)
    }

    /// True when `sense` is a key of either the translation or the reference map.
    pub fn has_sense(&self, sense: &str) -> bool {
        self.translation.contains_key(sense) || self.references.contains_key(sense)
    }

    /// Append another entry's senses, keyed by sense number.
    pub fn merge_senses(
        &mut self,
        translation: SenseMap<String>,
        references: SenseMap<Reference>,
    ) {
        for (sense, glosses) in translation {
            self.translation.entry(sense).or_default().extend(glosses);
        }
        for (sense, refs) in references {
            self.references.entry(sense).or_default().extend(refs);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn increment_carries_through_segments() {
        let mut eid = Eid::parse("009-99-99").unwrap();
        assert_eq!(eid.increment(), "010-00-00");
        let mut eid = Eid::parse("000-00-00").unwrap();
        assert_eq!(eid.increment(), "000-00-01");
        assert_eq!(eid.increment(), "000-00-02");
        assert_eq!(eid.to_string(), "000-00-02");
        let mut eid = Eid::parse("003-41-99").unwrap();
        assert_eq!(eid.increment(), "003-42-00");
    }

    #[test]
    fn ordering_follows_padded_form() {
        let a = Eid::parse("001-02-03").unwrap();
        let b = Eid::parse("001-02-04").unwrap();
        let c = Eid::parse("002-00-00").unwrap();
        let d = Eid::parse("001-99-99").unwrap();
        assert!(a < b);
        assert!(!(c < d));
        assert_eq!(Eid::parse("1-2-3").unwrap(), a);
        assert_eq!(
            [c, a, d, b].iter().max().map(ToString::to_string),
            Some("002-00-00".to_string())
        );
    }

    #[test]
    fn rejects_malformed_ids() {
        for raw in ["", "001-02", "001-02-03-04", "a01-02-03", "001--03", "〔001-02-03〕"] {
            assert_eq!(
                Eid::parse(raw),
                Err(EidError::Malformed(raw.to_string())),
                "{raw}"
            );
        }
    }

    #[test]
    fn merge_senses_appends_by_key() {
        let mut entry = DictionaryEntry {
            eid: "009-00-01".into(),
            lexeme: vec!["猫".into()],
            ..Default::default()
        };
        entry.translation.insert("1".into(), vec!["cat".into()]);
        let mut more = SenseMap::new();
        more.insert("1".into(), vec!["kitty".into()]);
        more.insert("2".into(), vec!["geisha".into()]);
        entry.merge_senses(more, SenseMap::new());
        assert_eq!(entry.translation["1"], vec!["cat", "kitty"]);
        assert_eq!(entry.translations().count(), 3);
        assert!(entry.has_sense("2"));
        assert!(!entry.has_sense("3"));
    }

    #[test]
    fn empty_labels_are_dropped() {
        let r = Reference::new("001-00-01", MeaningSelection::All)
            .with_mode("")
            .with_body("см.")
            .with_prefix("");
        assert_eq!(r.mode, None);
        assert_eq!(r.body.as_deref(), Some("см."));
        assert_eq!(r.prefix, None);
    }

    #[test]
    fn entry_serializes_senses_in_order() {
        let mut entry = DictionaryEntry::default();
        entry.translation.insert("2".into(), vec!["b".into()]);
        entry.translation.insert("1".into(), vec!["a".into()]);
        let json = serde_json::to_string(&entry).unwrap();
        let back: DictionaryEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(back.translation.keys().collect::<Vec<_>>(), ["2", "1"]);
        assert_eq!(back, entry);
    }
}
