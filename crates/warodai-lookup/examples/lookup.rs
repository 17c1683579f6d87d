use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};
use warodai_lookup::{Dictionary, LoadMode, SearchMode};

fn main() -> Result<()> {
    let mut args = env::args().skip(1);
    let db = args
        .next()
        .map(PathBuf::from)
        .context("usage: cargo run -p warodai-lookup --example lookup -- <dictionary.json> <word> [reading]")?;
    let word = args.next().context("missing word to look up")?;
    let reading = args.next().unwrap_or_default();

    let dict = Dictionary::load_with_mode(&db, LoadMode::Mmap)
        .with_context(|| format!("loading dictionary from {}", db.display()))?;
    println!("Entries: {}", dict.len());

    let hits = dict.lookup(&word, &reading, SearchMode::Consecutive, 1)?;
    if hits.is_empty() {
        println!("No match for {word}");
    }
    for hit in hits {
        println!("{} [{}]", hit.lexeme.join(", "), hit.reading.join(", "));
        for (i, line) in hit.translation.iter().enumerate() {
            println!("  {}. {}", i + 1, line);
        }
    }

    Ok(())
}
