//! Side entries: alternate spellings announced by `(《label》 lexeme)`
//! captions inside glosses, or by a whole-entry note under the header.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;
use warodai_types::script::{is_hiragana, katakana_to_hiragana};
use warodai_types::{DictionaryEntry, MeaningSelection, Reference, SenseMap};

use super::header::GlobalNote;
use crate::BuildError;
use crate::tables::Collocations;

static SENSE_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"〔\d+〕").expect("valid sense pattern"));
static SLASHED_READING: Lazy<Regex> = Lazy::new(|| Regex::new(r"/.+?/").expect("valid reading pattern"));
static SLASHED_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"/[^\s]+?/").expect("valid reading pattern"));
static SPECIAL_READING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/([^/]+?)/").expect("valid reading pattern"));
static DOUBLE_CAPTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\((《[а-я\s.]+?》 [^)a-zа-я]+\) \(《[а-я\s.]+》 [^)a-zа-я]+)\)")
        .expect("valid double caption pattern")
});
static CAPTION_PART: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?P<to_remove>《(?P<mode>[^》]+)》 (?P<lexeme>.+))").expect("valid caption pattern")
});
static SINGLE_CAPTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?P<to_remove>\(《(?P<mode>[^)》]+?)》 (?P<lexeme>[^<a-zа-я0-9(]+?)\) )")
        .expect("valid caption pattern")
});
static ALSO_OR_ONLY: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s?т[жк]\.\s?").expect("valid label pattern"));

/// Labels whose caption lexeme is an etymology; it is romanized in place.
const ETYMOLOGY_MODES: [&str; 4] = ["сокр. от", "от сокр.", "сокр. яп.", "производное от"];
/// Labels that never spin out an entry: the caption is about the lexeme itself.
const SELF_MODES: [&str; 2] = ["о своем тк.", "о себе тк."];
/// Labels whose caption is a substitution or source form, romanized in place.
const INLINE_MODES: [&str; 4] = ["вм.", "сокр.", "от", "от первой буквы слова"];

/// Where a side entry was found in its parent record.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SideOrigin {
    GlobalNote,
    DoubleCaption,
    Caption,
}

/// An entry spun out of another record. It gets a real eid when the
/// dictionary is assembled.
#[derive(Clone, Debug, PartialEq)]
pub struct SideEntry {
    pub origin: SideOrigin,
    pub lexeme: Vec<String>,
    pub reading: Vec<String>,
    pub translation: SenseMap<String>,
    pub references: SenseMap<Reference>,
}

impl SideEntry {
    fn with_gloss(origin: SideOrigin, lexeme: Vec<String>, reading: Vec<String>, gloss: String) -> Self {
        let mut translation = SenseMap::new();
        translation.insert("1".to_string(), vec![gloss]);
        Self {
            origin,
            lexeme,
            reading,
            translation,
            references: SenseMap::new(),
        }
    }

    /// Same lexemes and readings, ignoring order.
    pub fn same_headword(&self, other: &SideEntry) -> bool {
        sorted(&self.lexeme) == sorted(&other.lexeme) && sorted(&self.reading) == sorted(&other.reading)
    }

    pub fn into_entry(self, eid: String) -> DictionaryEntry {
        DictionaryEntry {
            eid,
            lexeme: self.lexeme,
            reading: self.reading,
            translation: self.translation,
            references: self.references,
        }
    }
}

fn sorted(items: &[String]) -> Vec<&str> {
    let mut items: Vec<&str> = items.iter().map(String::as_str).collect();
    items.sort_unstable();
    items
}

fn strip_sense(line: &str) -> String {
    SENSE_MARKER.replace_all(line, "").into_owned()
}

fn split_lexemes(raw: &str) -> Vec<String> {
    SLASHED_READING
        .replace_all(raw, "")
        .split(", ")
        .map(str::to_string)
        .collect()
}

/// The parent's readings, unless an alternate lexeme spells kana that none of
/// them contain.
pub fn resolve_ref_reading(readings: &[String], lexemes: &str) -> Vec<String> {
    for lexeme in split_lexemes(lexemes) {
        let kana: Vec<char> = lexeme.chars().filter(|&c| is_hiragana(c)).collect();
        if kana.is_empty() {
            continue;
        }
        if readings.iter().any(|r| kana.iter().any(|&c| !r.contains(c))) {
            return Vec::new();
        }
    }
    readings.to_vec()
}

/// A whole-entry note names an alternate spelling of the record itself.
///
/// The side entry carries the parent's glosses under the note's label, or,
/// when every sense of the parent is a reference, a reference back to it.
pub fn global_side_entry(
    note: &GlobalNote,
    parent_eid: &str,
    readings: &[String],
    translations: &[String],
    references: &SenseMap<Reference>,
) -> Option<SideEntry> {
    if !note.is_recognized() {
        return None;
    }
    let lexeme = split_lexemes(&note.lexeme);
    let reading = resolve_ref_reading(readings, &note.lexeme);
    let prefix = note.prefix();

    if !translations.is_empty() {
        let glosses = translations
            .iter()
            .map(|t| format!("{prefix}{}", strip_sense(t)))
            .collect();
        let mut translation = SenseMap::new();
        translation.insert("1".to_string(), glosses);
        return Some(SideEntry {
            origin: SideOrigin::GlobalNote,
            lexeme,
            reading,
            translation,
            references: SenseMap::new(),
        });
    }
    if references.is_empty() {
        return None;
    }
    let bare_mode = prefix.trim().trim_start_matches('《').trim_end_matches('》');
    let mut refs = SenseMap::new();
    refs.insert(
        "1".to_string(),
        vec![Reference::new(parent_eid, MeaningSelection::All).with_mode(bare_mode)],
    );
    Some(SideEntry {
        origin: SideOrigin::GlobalNote,
        lexeme,
        reading,
        translation: SenseMap::new(),
        references: refs,
    })
}

/// `(《a》 x) (《b》 y)` pairs: each caption becomes its own side entry
/// sharing the surrounding gloss.
pub fn double_captions(translations: &mut Vec<String>, readings: &[String]) -> Vec<SideEntry> {
    let mut side = Vec::new();
    let mut dropped = Vec::new();

    for i in 0..translations.len() {
        let Some(pair) = DOUBLE_CAPTION
            .captures(&translations[i])
            .map(|c| c[1].to_string())
        else {
            continue;
        };
        let parts: Vec<(String, String, String)> = pair
            .split(") (")
            .filter_map(|p| CAPTION_PART.captures(p))
            .map(|c| (c["to_remove"].to_string(), c["mode"].to_string(), c["lexeme"].to_string()))
            .filter(|(_, mode, _)| mode != "о себе тк.")
            .collect();
        let gloss = strip_sense(&translations[i].replace(&format!("({pair}) "), ""));

        for (_, mode, lexeme) in &parts {
            let text = if mode == "тк." || mode == "тж." {
                gloss.clone()
            } else {
                format!("《{}》 {gloss}", mode.replace("тк.", "").trim())
            };
            debug!(lexeme = %lexeme, mode = %mode, "double caption side entry");
            side.push(SideEntry::with_gloss(
                SideOrigin::DoubleCaption,
                vec![lexeme.clone()],
                readings.to_vec(),
                text,
            ));
        }

        if parts.iter().any(|(_, mode, _)| mode == "тк.") {
            dropped.push(i);
        } else {
            for (to_remove, _, _) in &parts {
                translations[i] = translations[i].replace(&format!("({to_remove}) "), "");
            }
        }
    }

    remove_indices(translations, &dropped);
    side
}

/// Single `(《label》 lexeme) ` captions.
///
/// Captions naming one of the record's own lexemes stay put. Etymology and
/// substitution captions are romanized in place. Every other caption becomes
/// a side entry, and the parent keeps a mapped label (or nothing) where the
/// caption was.
pub fn single_captions(
    translations: &mut Vec<String>,
    lexemes: &[String],
    readings: &[String],
    collocations: &Collocations,
) -> Result<Vec<SideEntry>, BuildError> {
    let mut side = Vec::new();
    let mut dropped = Vec::new();

    for i in 0..translations.len() {
        let Some((to_remove, mode, lexeme)) = SINGLE_CAPTION.captures(&translations[i]).map(|c| {
            (c["to_remove"].to_string(), c["mode"].to_string(), c["lexeme"].to_string())
        }) else {
            continue;
        };
        let line = translations[i].clone();

        let known = lexeme.split(", ").all(|l| lexemes.iter().any(|x| x == l));
        if (known && !mode.contains("тк.")) || SELF_MODES.contains(&mode.as_str())
            || ETYMOLOGY_MODES.contains(&mode.as_str())
        {
            if ETYMOLOGY_MODES.contains(&mode.as_str()) {
                translations[i] = line.replace(&lexeme, &collocations.normalize(&lexeme)?);
            }
            continue;
        }

        if INLINE_MODES.contains(&mode.as_str()) || mode.contains("форм") {
            let romanized = lexeme
                .split(", ")
                .map(|l| collocations.normalize(l))
                .collect::<Result<Vec<_>, _>>()?
                .join(" + ");
            let line = line.replace(&lexeme, &romanized);
            translations[i] = SLASHED_TOKEN.replace_all(&line, "").into_owned();
            continue;
        }

        let label = ALSO_OR_ONLY.replace_all(&mode, "").into_owned();
        let (label, replace_with) = match label.as_str() {
            "правильнее" => (String::new(), "《неправ.》 ".to_string()),
            "обычно" => (String::new(), "《реже》 ".to_string()),
            "часто" | "чаще" => (String::new(), String::new()),
            "сокр. погов." => (String::new(), to_remove.clone()),
            "неправ. вм." => (String::new(), "《неправ.》 ".to_string()),
            "искаж." => (String::new(), "《искаж.》 ".to_string()),
            _ => (label, String::new()),
        };
        let prefix = if label.is_empty() {
            String::new()
        } else {
            format!("《{label}》 ")
        };

        let reading = match SPECIAL_READING.captures(&lexeme) {
            Some(c) => vec![katakana_to_hiragana(&c[1])],
            None => resolve_ref_reading(readings, &lexeme),
        };
        debug!(lexeme = %lexeme, mode = %mode, "caption side entry");
        side.push(SideEntry::with_gloss(
            SideOrigin::Caption,
            split_lexemes(&lexeme),
            reading,
            strip_sense(&line.replace(&to_remove, &prefix)),
        ));

        if mode.contains("тк.") {
            dropped.push(i);
        } else {
            translations[i] = line.replace(&to_remove, &replace_with);
        }
    }

    remove_indices(translations, &dropped);
    Ok(side)
}

fn remove_indices(items: &mut Vec<String>, indices: &[usize]) {
    for &i in indices.iter().rev() {
        items.remove(i);
    }
}
