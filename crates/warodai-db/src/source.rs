//! Decoding and segmenting the raw Warodai dump.

use anyhow::{Context, Result};

use crate::config::Encoding;
use crate::tables::SOURCE_SUBSTITUTIONS;

/// Decode the dump, dropping a leading byte-order mark.
pub fn decode(bytes: &[u8], encoding: Encoding) -> Result<String> {
    match encoding {
        Encoding::Utf8 => {
            let text = std::str::from_utf8(bytes).context("source is not valid UTF-8")?;
            Ok(text.strip_prefix('\u{feff}').unwrap_or(text).to_string())
        }
        Encoding::Utf16le => {
            if bytes.len() % 2 != 0 {
                anyhow::bail!("UTF-16LE source has an odd byte count ({})", bytes.len());
            }
            let units = bytes
                .chunks_exact(2)
                .map(|pair| u16::from_le_bytes([pair[0], pair[1]]));
            let text = char::decode_utf16(units)
                .collect::<Result<String, _>>()
                .context("source is not valid UTF-16LE")?;
            Ok(text.strip_prefix('\u{feff}').unwrap_or(&text).to_string())
        }
    }
}

/// Normalize line endings and apply the bundled source substitutions in order.
pub fn preprocess(text: &str) -> String {
    let mut text = text.replace("\r\n", "\n");
    for (from, to) in SOURCE_SUBSTITUTIONS.iter() {
        if text.contains(from.as_str()) {
            text = text.replace(from.as_str(), to);
        }
    }
    text
}

/// Split into record blocks, skipping the dump's leading header block.
pub fn segment(text: &str) -> impl Iterator<Item = &str> + '_ {
    text.split("\n\n").skip(1)
}
