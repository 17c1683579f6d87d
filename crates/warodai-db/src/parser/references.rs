use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;
use warodai_types::{MeaningSelection, Reference, SenseMap};

use crate::config::Highlighting;

static LINK_REF: Lazy<Regex> = Lazy::new(|| {
    Regex::new(concat!(
        r"(?P<left_part>〔\d+〕.*?)(?P<body>[^;]*)(?P<mode>《[^《]+?》)",
        r##"(?P<to_remove> <a href="#(?P<eid>.+?)">.+?(?P<lexeme_number>[iv]+)?\s?"##,
        r"(?P<meaning_number>[0-9,\s]+)?(?:\((?P<prefix>〈.+[〉＿])\))?</a>,?)",
        r"(?P<right_part>.+)?",
    ))
    .expect("valid link reference pattern")
});
static LEADING_SENSE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^〔(\d+)〕").expect("valid sense pattern"));
static BARE_SENSE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^〔\d+〕$").expect("valid sense pattern"));
static SEE_QUALIFIER: Lazy<Regex> = Lazy::new(|| Regex::new(r",?\s?см.").expect("valid see pattern"));
static TRAILING_SEPARATOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"; $").expect("valid separator pattern"));
static SENSE_VALUE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"〔(?P<sense>\d+)〕(?P<value>.+)").expect("valid sense pattern"));

enum Peel {
    Link(Link),
    /// An etymology link ("abbreviation of", "from"); it stays inline.
    Inline,
    Done,
}

/// One peeled `<a href>` link.
struct Link {
    sense: String,
    mode: String,
    body: String,
    to_remove: String,
    reference: Reference,
}

fn next_link(line: &str) -> Peel {
    let Some(caps) = LINK_REF.captures(line) else {
        return Peel::Done;
    };
    let mode = &caps["mode"];
    if mode.contains("сокр.") || mode.contains("от ") || mode.contains(" от") {
        return Peel::Inline;
    }
    let Some(sense) = LEADING_SENSE.captures(&caps["left_part"]).map(|c| c[1].to_string()) else {
        return Peel::Done;
    };

    let inner = mode
        .strip_prefix('《')
        .and_then(|m| m.strip_suffix('》'))
        .unwrap_or(mode);
    let meanings = match caps.name("meaning_number") {
        Some(m) => MeaningSelection::Senses(
            m.as_str().trim().split(", ").map(str::to_string).collect(),
        ),
        None => MeaningSelection::All,
    };
    let mut reference = Reference::new(&caps["eid"], meanings)
        .with_mode(SEE_QUALIFIER.replace_all(inner, ""));
    if let Some(prefix) = caps.name("prefix") {
        reference = reference.with_prefix(prefix.as_str());
    }

    Peel::Link(Link {
        sense,
        mode: mode.to_string(),
        body: caps["body"].to_string(),
        to_remove: caps["to_remove"].to_string(),
        reference,
    })
}

/// Split sense-scoped links out of cleaned `〔n〕` lines.
///
/// Every link becomes a [`Reference`] keyed by the line's sense number. The
/// label and caption text in front of the first link are carried by each
/// reference of the line and removed from the gloss; a line left with only
/// its sense marker is dropped.
pub fn extract_references(lines: Vec<String>) -> (SenseMap<Reference>, Vec<String>) {
    let mut references = SenseMap::new();
    if !lines.iter().any(|l| l.contains("a href")) {
        return (references, lines);
    }

    let mut out = Vec::with_capacity(lines.len());
    for line in lines {
        let mut line = line.replace("《сокр. см.》", "《сокр.》");
        if line.contains("a href") {
            let mut mode = String::new();
            let mut body = String::new();
            loop {
                match next_link(&line) {
                    Peel::Link(link) => {
                        if mode.is_empty() {
                            mode = link.mode;
                        }
                        if body.is_empty() {
                            body = link.body;
                        }
                        let reference = link.reference.with_body(body.trim());
                        debug!(target_eid = %reference.eid, sense = %link.sense, "extracted reference");
                        references
                            .entry(link.sense)
                            .or_insert_with(Vec::new)
                            .push(reference);
                        line = line.replace(&link.to_remove, "");
                    }
                    Peel::Inline => break,
                    Peel::Done => {
                        let caption = format!("{body}{mode}");
                        if !caption.is_empty() {
                            line = line.replace(&caption, "");
                        }
                        line = TRAILING_SEPARATOR.replace(&line, "").into_owned();
                        if BARE_SENSE.is_match(&line) {
                            line.clear();
                        }
                        break;
                    }
                }
            }
        }
        let line = line.trim();
        if !line.is_empty() {
            out.push(line.to_string());
        }
    }
    (references, out)
}

/// Group `〔n〕gloss` lines by sense number, swapping in the configured
/// highlight delimiters. Lines without a sense marker are dropped.
pub fn normalize_translations(lines: &[String], highlighting: &Highlighting) -> SenseMap<String> {
    let mut senses = SenseMap::new();
    for line in lines {
        let Some(caps) = SENSE_VALUE.captures(line) else {
            debug!(line = %line, "gloss without sense marker");
            continue;
        };
        senses
            .entry(caps["sense"].to_string())
            .or_insert_with(Vec::new)
            .push(highlighting.apply(&caps["value"]));
    }
    senses
}

/// Swap the internal `《..》` markers in reference captions for the
/// configured pair, as [`normalize_translations`] does for glosses.
pub fn highlight_bodies(references: &mut SenseMap<Reference>, highlighting: &Highlighting) {
    for reference in references.values_mut().flatten() {
        if let Some(body) = reference.body.take() {
            reference.body = Some(highlighting.apply(&body));
        }
    }
}
