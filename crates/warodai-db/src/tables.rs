//! Bundled substitution tables and collocation transliteration.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use warodai_types::script::hiragana_to_latin;

use crate::BuildError;

/// Literal (find, replace) pairs applied in order to the whole raw dump.
pub static SOURCE_SUBSTITUTIONS: Lazy<Vec<(String, String)>> = Lazy::new(|| {
    serde_json::from_str(include_str!("../data/source_substitutions.json"))
        .expect("bundled source substitutions are valid JSON")
});

/// Literal pairs applied to the throwaway copy of a line that decides
/// whether the line is a translation.
pub static PROBE_SUBSTITUTIONS: Lazy<Vec<(String, String)>> = Lazy::new(|| {
    serde_json::from_str(include_str!("../data/probe_substitutions.json"))
        .expect("bundled probe substitutions are valid JSON")
});

/// Romanized kana fragment to its spaced gloss, e.g. `ninaru` to `ni naru`.
static COLLOCATIONS: Lazy<HashMap<String, String>> = Lazy::new(|| {
    serde_json::from_str(include_str!("../data/collocations.json"))
        .expect("bundled collocations are valid JSON")
});

pub const BULLETS: [char; 6] = ['～', '…', '＝', '｜', '＋', '＊'];

/// Canonical form of a collocation bullet glyph.
pub fn bullet_form(bullet: &str) -> Option<&'static str> {
    Some(match bullet {
        "～" => "~",
        "…" => "-",
        "＝" => "",
        "｜" => "|",
        "＋" => "~…",
        "＊" => "…〉〈~",
        _ => return None,
    })
}

/// Maps the kana fragment following a bullet to its gloss.
#[derive(Clone, Copy, Debug)]
pub struct Collocations {
    transliterate: bool,
}

impl Collocations {
    pub fn new(transliterate: bool) -> Self {
        Self { transliterate }
    }

    /// Look `fragment` up by its Hepburn romanization. Fragments are kept
    /// verbatim when transliteration is off.
    pub fn normalize(&self, fragment: &str) -> Result<String, BuildError> {
        if !self.transliterate {
            return Ok(fragment.to_string());
        }
        let key = hiragana_to_latin(fragment);
        COLLOCATIONS
            .get(&key)
            .cloned()
            .ok_or_else(|| BuildError::UnknownCollocation {
                fragment: fragment.to_string(),
                key,
            })
    }
}
