//! Build a queryable Warodai dictionary from the raw text dump.
//!
//! The dump is a UTF-16LE file of blank-line separated records, each opening
//! with a `reading【lexeme】(transcription)〔eid〕` header followed by gloss
//! lines full of inline markup. [`Loader::rescan`] turns it into a
//! [`warodai_lookup::Dictionary`]:
//!
//! - bulk source substitutions, then one block per record;
//! - per record: header, gloss clean-up into `〔n〕` senses, sense-scoped
//!   references, and side entries for alternate spellings;
//! - fresh ids for side entries, with same-headword side entries merged;
//! - reference validation, pruning of entries left with nothing to show.
//!
//! Bad records are logged and counted in the [`BuildReport`]; only a
//! collocation missing from the bundled table aborts the build.
//!
//! # Example
//! ```no_run
//! use warodai_db::{LoadMode, Loader, LoaderConfig};
//!
//! # fn main() -> anyhow::Result<()> {
//! let loader = Loader::new(LoaderConfig::default());
//! let (dict, report) = loader.rescan_file("/path/to/warodai.txt", LoadMode::Mmap)?;
//! println!("{} entries, {} pruned", report.entries, report.pruned_entries);
//! dict.save("/path/to/warodai.json")?;
//! # Ok(()) }
//! ```
//!
//! For a runnable demo, see `cargo run -p warodai-db --example stats -- <dump>`.

pub mod config;
pub mod parser;
pub mod resolve;
pub mod source;
pub mod tables;

mod loader;

pub use config::{Encoding, Highlighting, LoaderConfig};
pub use loader::{BuildReport, Loader};
pub use parser::{Record, RecordParser, SideEntry};
pub use warodai_lookup::{Dictionary, LoadMode};

/// Errors that abort a build.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    /// A collocation fragment is missing from the bundled table.
    #[error("unknown collocation {fragment:?} (key {key:?})")]
    UnknownCollocation { fragment: String, key: String },
    /// The configured id prefix cannot start an eid.
    #[error("synthetic eid prefix {0:?} is not a number")]
    BadEidPrefix(String),
}
