//! Query a built Warodai dictionary.
//!
//! [`Dictionary`] owns the resolved entry list produced by `warodai-db` and
//! answers two kinds of questions:
//!
//! - [`Dictionary::lookup`]: find entries by lexeme (and optionally reading),
//!   first by substring match and then, if nothing matched, by a fuzzy search
//!   that ranks entries sharing kanji with the query.
//! - [`Dictionary::translate`]: collect an entry's glosses together with the
//!   glosses its cross-references pull in, following references transitively
//!   and never visiting the same entry twice.
//!
//! The store is read-only once built; lookups take `&self` and can run from
//! several threads at once. Rebuilding while lookups are in flight is not
//! supported.
//!
//! # Example
//! ```no_run
//! use warodai_lookup::{Dictionary, LoadMode, SearchMode};
//!
//! # fn main() -> anyhow::Result<()> {
//! let dict = Dictionary::load_with_mode("warodai.json", LoadMode::Mmap)?;
//! for hit in dict.lookup("猫", "", SearchMode::Consecutive, 1)? {
//!     println!("{:?} [{}]: {}", hit.lexeme, hit.reading.join(", "), hit.translation.join("; "));
//! }
//! # Ok(()) }
//! ```
//!
//! For a runnable demo, see `cargo run -p warodai-lookup --example lookup -- <db> <word>`.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use warodai_types::script::{is_hira_or_kata, is_hiragana, is_kanji};
use warodai_types::{DictionaryEntry, MeaningSelection, Reference};

mod distance;
mod persist;

pub use distance::distance;
pub use persist::{Buffer, LoadMode, read_file};

/// Bracketed lead-in stripped from clauses pulled through a prefix filter.
static LEAD_IN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(〈.+?[〉＿]\s)").expect("valid lead-in pattern"));

/// Rejected [`Dictionary::lookup`] arguments.
#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum ValidationError {
    #[error("order value ({0}) is less than 1")]
    OrderTooSmall(usize),
    #[error("unknown search mode ({0})")]
    UnknownSearchMode(String),
    #[error("bad characters in lexeme ({0})")]
    BadLexeme(String),
    #[error("bad characters in reading ({0})")]
    BadReading(String),
}

/// How [`Dictionary::lookup`] searches.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    /// Substring search, falling back to deep search when nothing matched.
    #[default]
    Consecutive,
    ShallowOnly,
    DeepOnly,
}

impl FromStr for SearchMode {
    type Err = ValidationError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "consecutive" => Ok(SearchMode::Consecutive),
            "shallow" | "shallow_only" => Ok(SearchMode::ShallowOnly),
            "deep" | "deep_only" => Ok(SearchMode::DeepOnly),
            other => Err(ValidationError::UnknownSearchMode(other.to_string())),
        }
    }
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SearchMode::Consecutive => "consecutive",
            SearchMode::ShallowOnly => "shallow_only",
            SearchMode::DeepOnly => "deep_only",
        })
    }
}

/// One matched entry with its fully assembled translation list.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub reading: Vec<String>,
    pub lexeme: Vec<String>,
    pub translation: Vec<String>,
}

/// Resolved Warodai entries with an eid index.
#[derive(Clone, Debug, Default)]
pub struct Dictionary {
    entries: Vec<DictionaryEntry>,
    by_eid: HashMap<String, usize>,
}

impl Dictionary {
    /// Wrap an already resolved entry list. On duplicate eids the first entry wins.
    pub fn from_entries(entries: Vec<DictionaryEntry>) -> Self {
        let mut by_eid = HashMap::with_capacity(entries.len());
        for (idx, entry) in entries.iter().enumerate() {
            by_eid.entry(entry.eid.clone()).or_insert(idx);
        }
        Self { entries, by_eid }
    }

    pub fn into_entries(self) -> Vec<DictionaryEntry> {
        self.entries
    }

    pub fn entries(&self) -> &[DictionaryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, eid: &str) -> Option<&DictionaryEntry> {
        self.by_eid.get(eid).map(|&idx| &self.entries[idx])
    }

    /// Find entries for `lexeme`, optionally narrowed by a hiragana `reading`
    /// (pass `""` for none).
    ///
    /// `order` selects how many distinct score tiers of the deep search are
    /// kept; `1` keeps only the best-scoring entries. An empty lexeme matches
    /// nothing.
    pub fn lookup(
        &self,
        lexeme: &str,
        reading: &str,
        mode: SearchMode,
        order: usize,
    ) -> Result<Vec<SearchResult>, ValidationError> {
        validate(lexeme, reading, order)?;
        if lexeme.is_empty() {
            return Ok(Vec::new());
        }

        let mut hits: Vec<&DictionaryEntry> = Vec::new();
        if mode != SearchMode::DeepOnly {
            hits = self
                .entries
                .iter()
                .filter(|e| contains_any(&e.lexeme, lexeme))
                .filter(|e| reading.is_empty() || contains_any(&e.reading, reading))
                .collect();
        }

        if mode != SearchMode::ShallowOnly && hits.is_empty() {
            debug!(lexeme, reading, "shallow search empty, searching deep");
            hits = self.deep_search(lexeme, reading, order);
        }

        Ok(hits
            .into_iter()
            .map(|entry| SearchResult {
                reading: entry.reading.clone(),
                lexeme: entry.lexeme.clone(),
                translation: self.translate(&entry.eid),
            })
            .collect())
    }

    /// All translations for `lexeme` across every match, de-duplicated in
    /// first-seen order.
    pub fn lookup_translations_only(
        &self,
        lexeme: &str,
        reading: &str,
    ) -> Result<Vec<String>, ValidationError> {
        let mut seen = HashSet::new();
        Ok(self
            .lookup(lexeme, reading, SearchMode::Consecutive, 1)?
            .into_iter()
            .flat_map(|hit| hit.translation)
            .filter(|t| seen.insert(t.clone()))
            .collect())
    }

    /// Own glosses of `eid` followed by everything its usable references pull
    /// in. Unknown eids yield an empty list.
    pub fn translate(&self, eid: &str) -> Vec<String> {
        let Some(entry) = self.get(eid) else {
            debug!(eid, "translate: no such entry");
            return Vec::new();
        };
        let mut visited = HashSet::from([entry.eid.clone()]);
        let mut out: Vec<String> = entry.translations().cloned().collect();
        let pulled = self.pull_references(entry.usable_references().collect(), &mut visited);
        out.extend(pulled.into_iter().filter(|m| !m.is_empty()));
        out
    }

    /// Follow `refs` breadth-first. `visited` is shared by the whole walk, so a
    /// target reached through two chains contributes once.
    fn pull_references<'a>(
        &'a self,
        mut refs: Vec<&'a Reference>,
        visited: &mut HashSet<String>,
    ) -> Vec<String> {
        let mut meanings = Vec::new();
        while !refs.is_empty() {
            let mut nested = Vec::new();
            for reference in refs {
                if visited.contains(&reference.eid) {
                    continue;
                }
                let Some(target) = self.get(&reference.eid) else {
                    continue;
                };
                let (mut pulled, mut pulled_refs) = select_senses(target, &reference.meanings);

                if let Some(prefix) = reference.prefix.as_deref() {
                    pulled = pulled
                        .join("; ")
                        .split("; ")
                        .filter(|clause| clause.starts_with(prefix))
                        .map(|clause| LEAD_IN.replace_all(clause, "").into_owned())
                        .collect();
                    pulled_refs.retain(|r| r.body.as_deref().is_some_and(|b| b.contains(prefix)));
                }
                if let Some(mode) = reference.mode.as_deref() {
                    for meaning in &mut pulled {
                        *meaning = format!("{mode} {meaning}");
                    }
                }
                if let Some(body) = reference.body.as_deref() {
                    for meaning in &mut pulled {
                        *meaning = format!("{body} {meaning}");
                    }
                }

                meanings.extend(pulled);
                nested.extend(pulled_refs);
                visited.insert(reference.eid.clone());
            }
            refs = nested;
        }
        meanings
    }

    fn deep_search(&self, lexeme: &str, reading: &str, order: usize) -> Vec<&DictionaryEntry> {
        let kanji: Vec<char> = lexeme.chars().filter(|&c| is_kanji(c)).collect();
        if kanji.is_empty() {
            return self
                .entries
                .iter()
                .filter(|e| contains_any(&e.lexeme, lexeme) || contains_any(&e.reading, lexeme))
                .collect();
        }

        let mut candidates: Vec<&DictionaryEntry> = self
            .entries
            .iter()
            .filter(|e| e.lexeme.iter().any(|lex| kanji.iter().any(|&k| lex.contains(k))))
            .collect();
        if !reading.is_empty() {
            let narrowed: Vec<_> = candidates
                .iter()
                .copied()
                .filter(|e| contains_any(&e.reading, reading))
                .collect();
            if !narrowed.is_empty() {
                candidates = narrowed;
            }
        }
        if candidates.is_empty() {
            return candidates;
        }

        let mut scored: Vec<(i64, &DictionaryEntry)> = candidates
            .into_iter()
            .map(|entry| (score(lexeme, entry), entry))
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0));

        let mut tiers: Vec<i64> = scored.iter().map(|(s, _)| *s).collect();
        tiers.dedup();
        let threshold = tiers[(order - 1).min(tiers.len() - 1)];
        debug!(lexeme, tiers = tiers.len(), threshold, "deep search scored");

        scored
            .into_iter()
            .filter(|(s, _)| *s >= threshold)
            .map(|(_, entry)| entry)
            .collect()
    }
}

fn validate(lexeme: &str, reading: &str, order: usize) -> Result<(), ValidationError> {
    if order < 1 {
        return Err(ValidationError::OrderTooSmall(order));
    }
    if !lexeme.chars().all(|c| is_kanji(c) || is_hira_or_kata(c)) {
        return Err(ValidationError::BadLexeme(lexeme.to_string()));
    }
    if !reading.chars().all(is_hiragana) {
        return Err(ValidationError::BadReading(reading.to_string()));
    }
    Ok(())
}

fn contains_any(values: &[String], needle: &str) -> bool {
    values.iter().any(|v| v.contains(needle))
}

/// Smallest non-negative similarity over the entry's lexemes, or the largest
/// negative one when no lexeme is comparable.
fn score(query: &str, entry: &DictionaryEntry) -> i64 {
    let scores: Vec<i64> = entry.lexeme.iter().map(|lex| distance(query, lex)).collect();
    scores
        .iter()
        .copied()
        .filter(|s| *s >= 0)
        .min()
        .or_else(|| scores.iter().copied().max())
        .unwrap_or(i64::MIN)
}

fn select_senses<'a>(
    target: &'a DictionaryEntry,
    meanings: &MeaningSelection,
) -> (Vec<String>, Vec<&'a Reference>) {
    match meanings {
        MeaningSelection::All => (
            target.translations().cloned().collect(),
            target.usable_references().collect(),
        ),
        MeaningSelection::Senses(senses) => {
            let mut pulled = Vec::new();
            let mut refs = Vec::new();
            for sense in senses {
                if let Some(glosses) = target.translation.get(sense) {
                    pulled.extend(glosses.iter().cloned());
                }
                if let Some(sense_refs) = target.references.get(sense) {
                    refs.extend(sense_refs.iter().filter(|r| r.usable));
                }
            }
            (pulled, refs)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warodai_types::SenseMap;

    /// Build an entry from `(sense, gloss)` pairs.
    fn entry(eid: &str, lexeme: &[&str], reading: &[&str], glosses: &[(&str, &str)]) -> DictionaryEntry {
        let mut translation = SenseMap::new();
        for (sense, gloss) in glosses {
            translation
                .entry(sense.to_string())
                .or_insert_with(Vec::new)
                .push(gloss.to_string());
        }
        DictionaryEntry {
            eid: eid.to_string(),
            lexeme: lexeme.iter().map(|s| s.to_string()).collect(),
            reading: reading.iter().map(|s| s.to_string()).collect(),
            translation,
            references: SenseMap::new(),
        }
    }

    fn with_ref(mut e: DictionaryEntry, sense: &str, r: Reference) -> DictionaryEntry {
        e.references.entry(sense.to_string()).or_default().push(r);
        e
    }

    fn sample() -> Dictionary {
        Dictionary::from_entries(vec![
            entry("001-00-01", &["猫"], &["ねこ"], &[("1", "кошка")]),
            entry("001-00-02", &["猫舌"], &["ねこじた"], &[("1", "чувствительный к горячему")]),
            entry("001-00-03", &["犬"], &["いぬ"], &[("1", "собака")]),
            entry("001-00-04", &["子猫", "仔猫"], &["こねこ"], &[("1", "котёнок")]),
        ])
    }

    #[test]
    fn rejects_bad_arguments() {
        let dict = sample();
        assert_eq!(
            dict.lookup("猫", "", SearchMode::Consecutive, 0),
            Err(ValidationError::OrderTooSmall(0))
        );
        assert_eq!(
            dict.lookup("cat", "", SearchMode::Consecutive, 1),
            Err(ValidationError::BadLexeme("cat".into()))
        );
        assert_eq!(
            dict.lookup("猫", "CAT", SearchMode::Consecutive, 1),
            Err(ValidationError::BadReading("CAT".into()))
        );
        assert_eq!(
            dict.lookup("猫", "ネコ", SearchMode::Consecutive, 1),
            Err(ValidationError::BadReading("ネコ".into()))
        );
        assert_eq!(
            "fuzzy".parse::<SearchMode>(),
            Err(ValidationError::UnknownSearchMode("fuzzy".into()))
        );
    }

    #[test]
    fn empty_lexeme_finds_nothing() {
        let dict = sample();
        for mode in [SearchMode::Consecutive, SearchMode::ShallowOnly, SearchMode::DeepOnly] {
            assert_eq!(dict.lookup("", "", mode, 1), Ok(Vec::new()));
        }
        assert_eq!(dict.lookup_translations_only("", "ねこ"), Ok(Vec::new()));
        assert_eq!(
            dict.lookup("", "CAT", SearchMode::Consecutive, 1),
            Err(ValidationError::BadReading("CAT".into()))
        );
    }

    #[test]
    fn shallow_search_matches_substrings() {
        let dict = sample();
        let hits = dict.lookup("猫", "", SearchMode::ShallowOnly, 1).unwrap();
        let lexemes: Vec<_> = hits.iter().map(|h| h.lexeme[0].as_str()).collect();
        assert_eq!(lexemes, ["猫", "猫舌", "子猫"]);

        let hits = dict.lookup("猫", "こねこ", SearchMode::ShallowOnly, 1).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].translation, ["котёнок"]);
    }

    #[test]
    fn shallow_miss_falls_back_to_deep() {
        let dict = sample();
        assert!(dict.lookup("犬猫", "", SearchMode::ShallowOnly, 1).unwrap().is_empty());

        let hits = dict.lookup("犬猫", "", SearchMode::Consecutive, 1).unwrap();
        assert!(!hits.is_empty());
        assert!(hits.iter().all(|h| h.lexeme.iter().any(|l| l.contains('犬') || l.contains('猫'))));
    }

    #[test]
    fn order_widens_the_kept_tiers() {
        let dict = Dictionary::from_entries(vec![
            entry("001-00-01", &["猫"], &["ねこ"], &[("1", "кошка")]),
            entry("001-00-02", &["子猫舌"], &[], &[("1", "x")]),
            entry("001-00-03", &["子猫"], &["こねこ"], &[("1", "котёнок")]),
            entry("001-00-04", &["犬"], &["いぬ"], &[("1", "собака")]),
        ]);
        let lexemes = |order| {
            dict.lookup("子猫", "", SearchMode::DeepOnly, order)
                .unwrap()
                .into_iter()
                .map(|hit| hit.lexeme[0].clone())
                .collect::<Vec<_>>()
        };
        assert_eq!(lexemes(1), ["子猫"]);
        assert_eq!(lexemes(2), ["子猫", "子猫舌"]);
        assert_eq!(lexemes(3), ["子猫", "子猫舌", "猫"]);
        assert_eq!(lexemes(9), lexemes(3));
    }

    #[test]
    fn reading_narrowing_is_advisory_in_deep_search() {
        let dict = sample();
        let hits = dict.lookup("猫", "ねこじた", SearchMode::DeepOnly, 9).unwrap();
        assert_eq!(hits.len(), 1);
        let hits = dict.lookup("猫", "ぬ", SearchMode::DeepOnly, 9).unwrap();
        assert_eq!(hits.len(), 3);
    }

    #[test]
    fn kana_only_deep_search_uses_readings() {
        let dict = sample();
        let hits = dict.lookup("いぬ", "", SearchMode::DeepOnly, 1).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].translation, ["собака"]);
    }

    #[test]
    fn translation_follows_cycles_once() {
        let a = with_ref(
            entry("002-00-01", &["甲"], &["こう"], &[("1", "a")]),
            "1",
            Reference::new("002-00-02", MeaningSelection::All),
        );
        let b = with_ref(
            entry("002-00-02", &["乙"], &["おつ"], &[("1", "b")]),
            "1",
            Reference::new("002-00-01", MeaningSelection::All),
        );
        let c = with_ref(
            with_ref(
                entry("002-00-03", &["丙"], &["へい"], &[]),
                "1",
                Reference::new("002-00-02", MeaningSelection::All),
            ),
            "2",
            Reference::new("002-00-01", MeaningSelection::All),
        );
        let dict = Dictionary::from_entries(vec![a, b, c]);
        assert_eq!(dict.translate("002-00-01"), ["a", "b"]);
        assert_eq!(dict.translate("002-00-03"), ["b", "a"]);
    }

    #[test]
    fn unusable_and_dangling_references_are_skipped() {
        let mut broken = Reference::new("002-00-02", MeaningSelection::All);
        broken.usable = false;
        let src = with_ref(
            with_ref(
                entry("002-00-01", &["甲"], &[], &[("1", "a")]),
                "1",
                broken,
            ),
            "1",
            Reference::new("999-00-00", MeaningSelection::All),
        );
        let dict = Dictionary::from_entries(vec![
            src,
            entry("002-00-02", &["乙"], &[], &[("1", "b")]),
        ]);
        assert_eq!(dict.translate("002-00-01"), ["a"]);
        assert!(dict.translate("404-00-00").is_empty());
    }

    #[test]
    fn sense_selection_mode_and_body() {
        let src = with_ref(
            entry("003-00-01", &["甲"], &[], &[]),
            "1",
            Reference::new("003-00-02", MeaningSelection::Senses(vec!["2".into()]))
                .with_mode("《уст.》")
                .with_body("то же, что"),
        );
        let target = entry(
            "003-00-02",
            &["乙"],
            &[],
            &[("1", "first"), ("2", "second"), ("2", "другое")],
        );
        let dict = Dictionary::from_entries(vec![src, target]);
        assert_eq!(
            dict.translate("003-00-01"),
            ["то же, что 《уст.》 second", "то же, что 《уст.》 другое"]
        );
    }

    #[test]
    fn prefix_keeps_matching_clauses() {
        let src = with_ref(
            entry("004-00-01", &["甲"], &[], &[]),
            "1",
            Reference::new("004-00-02", MeaningSelection::Senses(vec!["1".into()]))
                .with_prefix("〈~suru〉"),
        );
        let target = entry(
            "004-00-02",
            &["乙"],
            &[],
            &[("1", "X foo; 〈~suru〉 делать"), ("1", "Y bar")],
        );
        let dict = Dictionary::from_entries(vec![src, target]);
        assert_eq!(dict.translate("004-00-01"), ["делать"]);

        let plain = with_ref(
            entry("004-00-03", &["丙"], &[], &[]),
            "1",
            Reference::new("004-00-04", MeaningSelection::All).with_prefix("X"),
        );
        let dict = Dictionary::from_entries(vec![
            plain,
            entry("004-00-04", &["丁"], &[], &[("1", "X foo"), ("1", "Y bar")]),
        ]);
        assert_eq!(dict.translate("004-00-03"), ["X foo"]);
    }

    #[test]
    fn translations_only_deduplicates() {
        let dict = Dictionary::from_entries(vec![
            entry("005-00-01", &["猫"], &["ねこ"], &[("1", "кошка")]),
            entry("005-00-02", &["猫"], &["びょう"], &[("1", "кошка"), ("1", "кот")]),
        ]);
        assert_eq!(
            dict.lookup_translations_only("猫", "").unwrap(),
            ["кошка", "кот"]
        );
    }

    #[test]
    fn get_uses_first_duplicate() {
        let dict = Dictionary::from_entries(vec![
            entry("006-00-01", &["一"], &[], &[]),
            entry("006-00-01", &["二"], &[], &[]),
        ]);
        assert_eq!(dict.get("006-00-01").map(|e| e.lexeme[0].as_str()), Some("一"));
        assert_eq!(dict.len(), 2);
        assert!(!dict.is_empty());
    }
}
