use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Delimiters wrapped around usage labels and emphasized captions.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Highlighting {
    pub open: String,
    pub close: String,
}

impl Default for Highlighting {
    fn default() -> Self {
        Self {
            open: "《".to_string(),
            close: "》".to_string(),
        }
    }
}

impl Highlighting {
    pub fn new(open: impl Into<String>, close: impl Into<String>) -> Self {
        Self {
            open: open.into(),
            close: close.into(),
        }
    }

    pub fn wrap(&self, text: &str) -> String {
        format!("{}{}{}", self.open, text, self.close)
    }

    /// Swap the parser's internal `《..》` markers for the configured pair.
    pub fn apply(&self, text: &str) -> String {
        if self.open == "《" && self.close == "》" {
            return text.to_string();
        }
        text.replace('《', &self.open).replace('》', &self.close)
    }
}

/// Text encoding of the raw dump.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    #[default]
    Utf16le,
    Utf8,
}

/// Settings for one dictionary build. Missing fields take their defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    pub highlighting: Highlighting,
    /// Replace kana collocations after bullet glyphs with their romanized gloss.
    pub transliterate_collocations: bool,
    /// Records skipped outright: form tables, link-only stubs and a duplicate.
    pub denylist: Vec<String>,
    /// Leading segment of the id range fresh entry ids are minted from.
    pub synthetic_prefix: String,
    pub encoding: Encoding,
    /// Readings for side entries whose reading cannot be taken from the parent
    /// record, keyed by the side entry's first lexeme.
    pub custom_readings: BTreeMap<String, Vec<String>>,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            highlighting: Highlighting::default(),
            transliterate_collocations: true,
            denylist: DEFAULT_DENYLIST.iter().map(|s| s.to_string()).collect(),
            synthetic_prefix: "009".to_string(),
            encoding: Encoding::Utf16le,
            custom_readings: DEFAULT_CUSTOM_READINGS
                .iter()
                .map(|(lexeme, readings)| {
                    (
                        lexeme.to_string(),
                        readings.iter().map(|r| r.to_string()).collect(),
                    )
                })
                .collect(),
        }
    }
}

impl LoaderConfig {
    /// Read a JSON config file; absent keys keep their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("parse config {}", path.display()))
    }

    pub fn is_denylisted(&self, eid: &str) -> bool {
        self.denylist.iter().any(|d| d == eid)
    }
}

const DEFAULT_DENYLIST: &[&str] = &[
    // form tables
    "006-98-10",
    "005-88-27",
    // links without an article
    "004-93-94",
    "003-76-16",
    "003-28-65",
    "002-08-39",
    "003-56-77",
    "002-95-49",
    "004-46-25",
    "000-29-73",
    "002-84-88",
    "002-50-71",
    "002-78-60",
    "003-64-62",
    "006-88-95",
    "000-08-43",
    // duplicate article
    "009-19-87",
];

const DEFAULT_CUSTOM_READINGS: &[(&str, &[&str])] = &[
    ("尼さん", &["あまさん"]),
    ("うっちゃって置く", &["うっちゃっておく"]),
    ("いみじき", &["いみじき"]),
    ("いざという時は親知らず子知らず", &["いざというときはおやしらずこしらず"]),
    ("辞世の歌", &["じせいのうた"]),
    ("次席の人", &["じせきのひと"]),
    ("自尊の念", &["じそんのねん"]),
    ("其限", &["それきり", "それっきり"]),
    ("取りつ置きつ", &["とりつおきつ"]),
    ("なおりあい", &["なおりあい"]),
    ("無くする", &["なくする"]),
    ("失くする", &["なくする"]),
    ("亡くする", &["なくする"]),
    ("ねんねえ", &["ねんねえ"]),
    ("不惑の年", &["ふわくのとし"]),
    ("放っておく", &["ほうっておく"]),
    ("骨を折る", &["ほねをおる"]),
    ("持たせてやる", &["もたせてやる"]),
    ("エデンの国", &["えでんのくに"]),
];
