use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};
use warodai_db::{LoadMode, Loader, LoaderConfig};

fn main() -> Result<()> {
    let source = env::args()
        .nth(1)
        .map(PathBuf::from)
        .context("usage: cargo run -p warodai-db --example stats -- <path-to-warodai-dump>")?;

    let loader = Loader::new(LoaderConfig::default());
    let (dict, report) = loader
        .rescan_file(&source, LoadMode::Mmap)
        .with_context(|| format!("building Warodai from {}", source.display()))?;

    let mut gloss_count = 0usize;
    let mut reference_count = 0usize;
    let mut usable_count = 0usize;
    for entry in dict.entries() {
        gloss_count += entry.translations().count();
        reference_count += entry.all_references().count();
        usable_count += entry.usable_references().count();
    }

    println!("Source: {}", source.display());
    println!("Records seen      : {}", report.records_seen);
    println!("Malformed blocks  : {}", report.malformed_blocks);
    println!("Denylisted        : {}", report.denylisted);
    println!("Parse failures    : {}", report.parse_failures);
    println!("Side entries      : {}", report.side_entries);
    println!("Duplicates merged : {}", report.duplicates_merged);
    println!("Pruned entries    : {}", report.pruned_entries);
    println!("Entries           : {}", dict.len());
    println!("Glosses           : {}", gloss_count);
    println!("References        : {} ({} usable)", reference_count, usable_count);

    // Spot-check a common word.
    for hit in dict.lookup("猫", "ねこ", Default::default(), 1)? {
        println!("{:?} {:?}: {:?}", hit.lexeme, hit.reading, hit.translation);
    }

    Ok(())
}
