//! Command functions behind the `warodai` binary.
//!
//! Settings come from flags, then `WARODAI_*` environment variables, then
//! defaults. The binary only parses arguments and prints what these return.

use std::env;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;
use warodai_db::{BuildReport, Dictionary, LoadMode, Loader, LoaderConfig};
use warodai_lookup::{SearchMode, SearchResult};

pub const DEFAULT_SOURCE: &str = "warodai.txt";
pub const DEFAULT_DB: &str = "warodai.json";

/// Inputs of `warodai build`; `None` falls back to the environment.
#[derive(Clone, Debug, Default)]
pub struct BuildOptions {
    pub source: Option<PathBuf>,
    pub out: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub load_mode: Option<LoadMode>,
}

/// Inputs of `warodai lookup`.
#[derive(Clone, Debug)]
pub struct LookupOptions {
    pub db: Option<PathBuf>,
    pub lexeme: String,
    pub reading: String,
    pub mode: SearchMode,
    pub order: usize,
    pub translations_only: bool,
    pub load_mode: Option<LoadMode>,
}

impl Default for LookupOptions {
    fn default() -> Self {
        Self {
            db: None,
            lexeme: String::new(),
            reading: String::new(),
            mode: SearchMode::Consecutive,
            order: 1,
            translations_only: false,
            load_mode: None,
        }
    }
}

/// What `lookup` prints.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum LookupOutput {
    Results(Vec<SearchResult>),
    Translations(Vec<String>),
}

/// Build the dictionary from the source dump and save it; returns the report
/// alongside the path written.
pub fn build(opts: &BuildOptions) -> Result<(PathBuf, BuildReport)> {
    let source = resolve_path(opts.source.clone(), "WARODAI_SOURCE", DEFAULT_SOURCE);
    let out = resolve_path(opts.out.clone(), "WARODAI_DB", DEFAULT_DB);
    let mode = resolve_load_mode(opts.load_mode);
    let config = match opts
        .config
        .clone()
        .or_else(|| env::var("WARODAI_CONFIG").ok().map(PathBuf::from))
    {
        Some(path) => {
            info!("using loader config at {}", path.display());
            LoaderConfig::from_json_file(&path)?
        }
        None => LoaderConfig::default(),
    };
    info!("building from {} (mode: {})", source.display(), mode);

    let start = Instant::now();
    let (dict, report) = Loader::new(config).rescan_file(&source, mode)?;
    info!("dictionary built in {} ms", start.elapsed().as_millis());

    dict.save(&out)
        .with_context(|| format!("save dictionary to {}", out.display()))?;
    Ok((out, report))
}

/// Load the saved dictionary and run one query.
pub fn lookup(opts: &LookupOptions) -> Result<LookupOutput> {
    let db = resolve_path(opts.db.clone(), "WARODAI_DB", DEFAULT_DB);
    let dict = load_dictionary(&db, resolve_load_mode(opts.load_mode))?;
    let output = if opts.translations_only {
        LookupOutput::Translations(dict.lookup_translations_only(&opts.lexeme, &opts.reading)?)
    } else {
        LookupOutput::Results(dict.lookup(&opts.lexeme, &opts.reading, opts.mode, opts.order)?)
    };
    Ok(output)
}

fn load_dictionary(path: &Path, mode: LoadMode) -> Result<Dictionary> {
    let start = Instant::now();
    let dict = Dictionary::load_with_mode(path, mode)?;
    info!("dictionary loaded in {} ms", start.elapsed().as_millis());
    Ok(dict)
}

fn resolve_path(flag: Option<PathBuf>, var: &str, default: &str) -> PathBuf {
    flag.or_else(|| env::var(var).ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(default))
}

fn resolve_load_mode(flag: Option<LoadMode>) -> LoadMode {
    flag.or_else(|| {
        env::var("WARODAI_LOAD_MODE")
            .ok()
            .as_deref()
            .and_then(parse_load_mode)
    })
    .unwrap_or(LoadMode::Mmap)
}

/// Lenient parse for the environment: unknown values fall back to the default.
pub fn parse_load_mode(raw: &str) -> Option<LoadMode> {
    raw.parse().ok()
}
