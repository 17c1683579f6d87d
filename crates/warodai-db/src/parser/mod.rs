//! One record block in, one primary entry plus side entries out.

mod cleanup;
mod header;
mod quasi;
mod references;

use tracing::{debug, warn};
use warodai_types::{DictionaryEntry, SenseMap};

use crate::BuildError;
use crate::config::LoaderConfig;
use crate::tables::Collocations;

pub use cleanup::extract_translations;
pub use header::{GlobalNote, Header, global_note, parse_header, record_eid};
pub use quasi::{SideEntry, SideOrigin, resolve_ref_reading};
pub use references::{extract_references, highlight_bodies, normalize_translations};

/// Outcome of parsing one record block.
#[derive(Clone, Debug, PartialEq)]
pub enum Record {
    /// No `〔eid〕` on the first line.
    Malformed,
    /// The eid is on the configured denylist.
    Skipped { eid: String },
    /// Nothing survived: no glosses, no references and no side entries.
    Failed { eid: String },
    Parsed {
        primary: Option<DictionaryEntry>,
        side: Vec<SideEntry>,
    },
}

pub struct RecordParser<'a> {
    config: &'a LoaderConfig,
    collocations: Collocations,
}

impl<'a> RecordParser<'a> {
    pub fn new(config: &'a LoaderConfig) -> Self {
        Self {
            config,
            collocations: Collocations::new(config.transliterate_collocations),
        }
    }

    /// Parse one block. Only an unknown collocation is an error; every other
    /// problem is reported through the returned [`Record`].
    pub fn parse(&self, block: &str) -> Result<Record, BuildError> {
        let lines: Vec<&str> = block.split('\n').collect();
        let first = lines.first().copied().unwrap_or_default();
        let Some(eid) = record_eid(first) else {
            return Ok(Record::Malformed);
        };
        if self.config.is_denylisted(&eid) {
            debug!(eid = %eid, "denylisted record");
            return Ok(Record::Skipped { eid });
        }
        let Some(Header { lexemes, readings }) = parse_header(first) else {
            warn!(eid = %eid, "unreadable header");
            return Ok(Record::Failed { eid });
        };

        let note = lines.get(1).and_then(|l| global_note(l));
        let body_start = match &note {
            Some(n) if n.is_recognized() => 2,
            _ => 1,
        };
        let body = lines.get(body_start..).unwrap_or_default();
        let mut translations = extract_translations(body, &self.collocations)?;

        let mut references = SenseMap::new();
        let mut side = Vec::new();
        if !translations.is_empty() {
            let (refs, rest) = extract_references(translations);
            references = refs;
            translations = rest;

            if let Some(entry) = note.as_ref().and_then(|n| {
                quasi::global_side_entry(n, &eid, &readings, &translations, &references)
            }) {
                side.push(entry);
            }
            side.extend(quasi::double_captions(&mut translations, &readings));
            side.extend(quasi::single_captions(
                &mut translations,
                &lexemes,
                &readings,
                &self.collocations,
            )?);
        }

        let highlighting = &self.config.highlighting;
        highlight_bodies(&mut references, highlighting);
        for entry in &mut side {
            for gloss in entry.translation.values_mut().flatten() {
                *gloss = highlighting.apply(gloss);
            }
            highlight_bodies(&mut entry.references, highlighting);
        }

        if translations.is_empty() && references.is_empty() {
            if side.is_empty() {
                warn!(eid = %eid, "failed to parse record");
                return Ok(Record::Failed { eid });
            }
            return Ok(Record::Parsed { primary: None, side });
        }

        let primary = DictionaryEntry {
            eid,
            lexeme: lexemes,
            reading: readings,
            translation: normalize_translations(&translations, highlighting),
            references,
        };
        Ok(Record::Parsed {
            primary: Some(primary),
            side,
        })
    }
}
