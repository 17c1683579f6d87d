use std::fmt;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use memmap2::Mmap;
use serde::{Deserialize, Serialize};
use tracing::info;
use warodai_types::DictionaryEntry;

use crate::Dictionary;

/// Strategy for reading files from disk.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadMode {
    /// Memory-map the file (fast, zero-copy).
    #[default]
    Mmap,
    /// Read the file into an owned buffer (portable fallback).
    Owned,
}

impl FromStr for LoadMode {
    type Err = String;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.to_ascii_lowercase().as_str() {
            "mmap" => Ok(LoadMode::Mmap),
            "owned" => Ok(LoadMode::Owned),
            other => Err(format!("unknown load mode `{other}` (expected mmap or owned)")),
        }
    }
}

impl fmt::Display for LoadMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LoadMode::Mmap => "mmap",
            LoadMode::Owned => "owned",
        })
    }
}

/// Bytes of a file, either mapped or owned.
pub enum Buffer {
    Mmap(Mmap),
    Owned(Vec<u8>),
}

impl Buffer {
    pub fn as_slice(&self) -> &[u8] {
        match self {
            Buffer::Mmap(m) => m.as_ref(),
            Buffer::Owned(v) => v.as_slice(),
        }
    }
}

/// Open `path` using the requested strategy.
pub fn read_file(path: impl AsRef<Path>, mode: LoadMode) -> Result<Buffer> {
    let path = path.as_ref();
    match mode {
        LoadMode::Mmap => {
            let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
            // An empty file cannot be mapped on every platform.
            if file.metadata().map(|m| m.len() == 0).unwrap_or(false) {
                return Ok(Buffer::Owned(Vec::new()));
            }
            unsafe { Mmap::map(&file) }
                .map(Buffer::Mmap)
                .with_context(|| format!("mmap {}", path.display()))
        }
        LoadMode::Owned => {
            let mut file = File::open(path).with_context(|| format!("open {}", path.display()))?;
            let mut buf = Vec::new();
            file.read_to_end(&mut buf)
                .with_context(|| format!("read {}", path.display()))?;
            Ok(Buffer::Owned(buf))
        }
    }
}

#[derive(Serialize)]
struct StoredRef<'a> {
    format: u32,
    entries: &'a [DictionaryEntry],
}

#[derive(Deserialize)]
struct Stored {
    format: u32,
    entries: Vec<DictionaryEntry>,
}

const FORMAT_VERSION: u32 = 1;

impl Dictionary {
    /// Serialize every entry, including reference flags, to a JSON blob.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(&StoredRef {
            format: FORMAT_VERSION,
            entries: self.entries(),
        })
        .context("serialize dictionary")
    }

    /// Rebuild a dictionary from a blob produced by [`Dictionary::to_bytes`].
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let stored: Stored = serde_json::from_slice(bytes).context("deserialize dictionary")?;
        if stored.format != FORMAT_VERSION {
            anyhow::bail!(
                "unsupported dictionary format {} (expected {FORMAT_VERSION})",
                stored.format
            );
        }
        Ok(Self::from_entries(stored.entries))
    }

    /// Write the dictionary to `path`, replacing any existing file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let bytes = self.to_bytes()?;
        let mut file =
            File::create(path).with_context(|| format!("create {}", path.display()))?;
        file.write_all(&bytes)
            .with_context(|| format!("write {}", path.display()))?;
        info!("saved {} entries to {}", self.len(), path.display());
        Ok(())
    }

    /// Load a saved dictionary, memory-mapping the file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::load_with_mode(path, LoadMode::Mmap)
    }

    /// Load a saved dictionary choosing between mmap and an owned buffer.
    pub fn load_with_mode(path: impl AsRef<Path>, mode: LoadMode) -> Result<Self> {
        let path = path.as_ref();
        let buffer = read_file(path, mode)?;
        let dict = Self::from_slice(buffer.as_slice())
            .with_context(|| format!("load dictionary from {}", path.display()))?;
        info!("loaded {} entries from {} ({mode})", dict.len(), path.display());
        Ok(dict)
    }
}
