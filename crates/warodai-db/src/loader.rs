use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, info, warn};
use warodai_lookup::{Dictionary, LoadMode, read_file};

use crate::BuildError;
use crate::config::LoaderConfig;
use crate::parser::{Record, RecordParser};
use crate::resolve::{EidMinter, add_synthetic_entries, extend_with_side_entries, resolve_references};
use crate::source::{decode, preprocess, segment};

/// What a build saw and did, for callers without a tracing subscriber.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize)]
pub struct BuildReport {
    pub records_seen: usize,
    pub malformed_blocks: usize,
    pub denylisted: usize,
    pub parse_failures: usize,
    pub side_entries: usize,
    pub duplicates_merged: usize,
    pub unusable_references: usize,
    pub pruned_entries: usize,
    pub entries: usize,
}

/// Builds a [`Dictionary`] from the raw Warodai dump. The configuration is
/// fixed for the loader's lifetime.
#[derive(Clone, Debug, Default)]
pub struct Loader {
    config: LoaderConfig,
}

impl Loader {
    pub fn new(config: LoaderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Read, decode and build from a dump on disk.
    pub fn rescan_file(&self, path: impl AsRef<Path>, mode: LoadMode) -> Result<(Dictionary, BuildReport)> {
        let path = path.as_ref();
        let buffer = read_file(path, mode)?;
        let text = decode(buffer.as_slice(), self.config.encoding)
            .with_context(|| format!("decode {}", path.display()))?;
        let built = self
            .rescan(&text)
            .with_context(|| format!("build dictionary from {}", path.display()))?;
        Ok(built)
    }

    /// Build from decoded dump text.
    ///
    /// Records are parsed in order, fresh ids are minted above the synthetic
    /// range for the two implied entries and then for the side entries
    /// (duplicates merged first), and finally every reference is validated.
    pub fn rescan(&self, raw: &str) -> Result<(Dictionary, BuildReport), BuildError> {
        let text = preprocess(raw);
        let parser = RecordParser::new(&self.config);
        let mut report = BuildReport::default();
        let mut entries = Vec::new();
        let mut side = Vec::new();

        for block in segment(&text) {
            report.records_seen += 1;
            match parser.parse(block)? {
                Record::Malformed => {
                    report.malformed_blocks += 1;
                    warn!(block = %block.lines().next().unwrap_or_default(), "record without an eid");
                }
                Record::Skipped { .. } => report.denylisted += 1,
                Record::Failed { .. } => report.parse_failures += 1,
                Record::Parsed { primary, side: more } => {
                    entries.extend(primary);
                    side.extend(more);
                }
            }
        }
        info!(records = report.records_seen, entries = entries.len(), "parsed records");

        let mut minter = EidMinter::after_max(&entries, &self.config.synthetic_prefix)?;
        debug!(after = %minter.current(), "minting fresh eids");
        add_synthetic_entries(&mut entries, &mut minter, &self.config.highlighting);

        let side_count = side.len();
        report.duplicates_merged = extend_with_side_entries(&mut entries, side, &mut minter, &self.config);
        report.side_entries = side_count - report.duplicates_merged;
        info!(
            side_entries = report.side_entries,
            merged = report.duplicates_merged,
            "added side entries"
        );

        let stats = resolve_references(&mut entries, &self.config.highlighting);
        report.unusable_references = stats.unusable_references;
        report.pruned_entries = stats.pruned_entries;

        let dictionary = Dictionary::from_entries(entries);
        report.entries = dictionary.len();
        info!(
            entries = report.entries,
            pruned = report.pruned_entries,
            unusable_references = report.unusable_references,
            "dictionary ready"
        );
        Ok((dictionary, report))
    }
}
