//! Turning the raw body lines of a record into `〔n〕gloss` lines.
//!
//! The pipeline runs in a fixed order: pick translation lines with a probe,
//! scrub non-referential links and notes, fold the `1.`/`1)` numbering into
//! `〔n〕` sense markers, rewrite `<i>` emphasis into `《..》`, and rewrite
//! collocation bullets into `〈..〉` glosses.

use std::collections::BTreeSet;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use warodai_types::script::{contains_kana, contains_kanji, is_hira_or_kata, is_kanji};

use crate::BuildError;
use crate::tables::{BULLETS, Collocations, PROBE_SUBSTITUTIONS, bullet_form};

fn re(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid pattern {pattern}: {e}"))
}

static PROBE_PATTERNS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    vec![
        (re(r"(～)([^\s]+?\s)"), "${1} "),
        (re(r"([＝＋＊][^\s]+)\s"), " "),
        (re(r"…([^～]+)～"), ""),
        (re(r"｜([^～]+)～"), ""),
        (re(r"(…?～ )"), ""),
        (re(r"\(<i>(?P<mode>[^)]+?)</i> (?P<lexeme>[^<a-zа-я0-9(]+?)\) "), ""),
        (
            re(r"\(<i>[а-я\s]+\.?</i> [^)]+\) \(<i>[а-я\s]+\.?</i> [^)]+\)"),
            "",
        ),
    ]
});
static PROBE_LINK: Lazy<Regex> = Lazy::new(|| re(r"(<a href=.+?</a>)"));
static PROBE_MASKED_CAPTION: Lazy<Regex> = Lazy::new(|| re(r"\(<i>@.+?\s[^～]+?\)"));
static PROBE_BRACES: Lazy<Regex> = Lazy::new(|| re(r"\{.+\}"));
static BRACKETED_LEXEME: Lazy<Regex> = Lazy::new(|| re(r"(【.+?】)"));

static NOT_TO_CONFUSE: Lazy<[Regex; 3]> = Lazy::new(|| {
    [
        re(r"(\(<i>не смешивать с.+?\)\s?)"),
        re(r"(<i>не смешивать .+?</i> <a href=.+?>.+?</a>)"),
        re(r"(\d\) <i>не смешивать с.+)"),
    ]
});
static COLON_AFTER_BRACKET_NUMBER: Lazy<Regex> = Lazy::new(|| re(r"^(\d+\)):"));
static COLON_AFTER_POINT_NUMBER: Lazy<Regex> = Lazy::new(|| re(r"(^\d+\.):(\s.+)"));

/// Link phrases that are not sense-scoped references: "see", "compare",
/// "antonym", "mainly" and bare parenthesized links.
static LINK_PHRASES: Lazy<Vec<Regex>> = Lazy::new(|| {
    vec![
        re(r"\((?P<mode><i>с[мр]\.[\sа-я\.]*)</i>\s(?P<to_remove><a.+?>.+?</a>,?\s?)"),
        re(r">?(?P<mode>(?:[;,] )?<i>ср\.[\sа-я\.]*)</i>\s(?P<to_remove><a.+?>.+?</a>[,;]?\s?)"),
        re(r"(?P<mode>[;,] с[мр]\.[\sа-я\.]*)</i>\s(?P<to_remove><a.+?>.+?</a>[,;]?\s?)"),
        re(r">?(?P<mode>[;,] <i>с[мр]\.[\sа-я\.]*)</i>\s(?P<to_remove><a.+?>.+?</a>[,;]?\s?)"),
        re(r"(?P<mode>(?:; )?<i>ант.)</i>\s(?P<to_remove><a.+?>.+?</a>)"),
        re(r"(?P<mode><i>гл. обр.)</i>\s(?P<to_remove><a.+?>.+?</a>[,;]?\s?)"),
        re(r"(?P<mode>)(?P<to_remove>\s\(<a href.+?>.+?</a>\))"),
    ]
});
static LONE_PUNCT: Lazy<Regex> = Lazy::new(|| re(r"^[.;]$"));
static EMPTY_NUMBERED: Lazy<Regex> = Lazy::new(|| re(r"^\d+\)\s?.$"));

static POINT_NUMBER: Lazy<Regex> = Lazy::new(|| re(r"(^\d+\.)(.*)"));
static BRACKET_NUMBER: Lazy<Regex> = Lazy::new(|| re(r"(^\d+\))(.*)"));
static POINT_PROBE: Lazy<Regex> = Lazy::new(|| re(r"^\d\."));
static BRACKET_PROBE: Lazy<Regex> = Lazy::new(|| re(r"^\d\)"));
static ANY_NUMBER_PROBE: Lazy<Regex> = Lazy::new(|| re(r"^\d[.)]"));
static BARE_POINT: Lazy<Regex> = Lazy::new(|| re(r"^\d\.$"));
static POINT_WITH_TEXT: Lazy<Regex> = Lazy::new(|| re(r"^\d\..+$"));
static LETTER_ITEM: Lazy<Regex> = Lazy::new(|| re(r"^[а-ж]\)\s"));
static CYRILLIC_START: Lazy<Regex> = Lazy::new(|| re(r"^[а-я]+"));
static ITALIC_CAPTION: Lazy<Regex> = Lazy::new(|| re(r"^<i>[^</i>]+</i>$"));
static INNER_ITEM: Lazy<Regex> = Lazy::new(|| re(r"(\s[а-ж\d]+\)\s)"));
static SENSE_NUMBER: Lazy<Regex> =
    Lazy::new(|| re(r"^(?P<number>\d+)[\d).]+\s(?P<value>.*)"));
static LETTER_ITEM_REST: Lazy<Regex> = Lazy::new(|| re(r"^(?P<a_p>[а-ж]\))(?P<rest>\s.+)"));

static EMPHASIS: Lazy<Regex> = Lazy::new(|| {
    re(r"<i>(?P<op_pr>\(?)(?P<body>.+?)(?P<punct>[:;]?)(?P<cl_pr>\)?)</i>")
});
static TRAILING_CAPTION: Lazy<Regex> = Lazy::new(|| re(r"《([^》]+)》$"));
static LATIN: Lazy<Regex> = Lazy::new(|| re(r"[a-zA-Z]+"));
static CAPTION_PERIOD: Lazy<Regex> = Lazy::new(|| re(r"\.》$"));
static PARENS_AROUND_CAPTION: Lazy<Regex> = Lazy::new(|| re(r"\(《([^\(\)]+)》\)"));
static PARENS_INSIDE_CAPTION: Lazy<Regex> = Lazy::new(|| re(r"《\(([^\(\)]+)\)》"));
static QUOTED_CAPTION: Lazy<Regex> = Lazy::new(|| re(r"《«([^《«»》]+)»》"));

static BULLET_RUN: Lazy<Regex> = Lazy::new(|| re(r"[^а-я>【]([…～＝｜＋＊][^\s<,;a-zа-я».]+)"));
static UNOPENED_PAREN: Lazy<Regex> = Lazy::new(|| re(r"^[^(]+\)"));
static BAR_GLOSS: Lazy<Regex> = Lazy::new(|| re(r"〈\|([^〈]+?)〉～?"));
static BRACKETED_TILDE: Lazy<Regex> = Lazy::new(|| re(r"〈~\[([a-z\s]+)\]〉"));
static TRAILING_PUNCT: Lazy<Regex> = Lazy::new(|| re(r"([.;])$"));

/// Caption endings that are abbreviations, not sentence ends.
const ABBREVIATED_ENDINGS: [&str; 9] = [
    " вр.", "-л.", "знач.", "гл.", " гг.", "т. п.", "и др.", "т. д.", "накл.",
];

/// Clean the body lines of one record into `〔n〕gloss` lines.
pub fn extract_translations(
    lines: &[&str],
    collocations: &Collocations,
) -> Result<Vec<String>, BuildError> {
    let mut lines: Vec<String> = lines
        .iter()
        .filter(|line| is_translation(line))
        .map(|line| line.to_string())
        .collect();
    if lines.is_empty() {
        return Ok(lines);
    }

    scrub_notes(&mut lines);
    scrub_link_phrases(&mut lines);
    let lines = number_senses(lines);
    let lines = rewrite_emphasis(lines);
    rewrite_bullets(lines, collocations)
}

/// Probe a masked copy of `line`: translation lines keep no kana once
/// collocations, captions and links are masked out.
fn is_translation(line: &str) -> bool {
    let mut probe = line.to_string();
    for (from, to) in PROBE_SUBSTITUTIONS.iter() {
        probe = probe.replace(from.as_str(), to);
    }
    probe = PROBE_LINK.replace_all(&probe, "").into_owned();
    probe = PROBE_MASKED_CAPTION.replace_all(&probe, "").into_owned();
    probe = PROBE_BRACES.replace_all(&probe, "").into_owned();
    probe.push(' ');
    for (pattern, replacement) in PROBE_PATTERNS.iter() {
        probe = pattern.replace_all(&probe, *replacement).into_owned();
    }

    if probe.is_empty()
        || (contains_kanji(&probe) && contains_kanji(&BRACKETED_LEXEME.replace_all(&probe, "")))
        || probe.contains("на своем месте по алфавиту")
    {
        return false;
    }
    !contains_kana(&probe)
}

fn scrub_notes(lines: &mut Vec<String>) {
    for line in lines.iter_mut() {
        for pattern in NOT_TO_CONFUSE.iter() {
            *line = pattern.replace_all(line, "").into_owned();
        }
        let fixed = line
            .replace(": ～", " ～")
            .replace(": …", " …")
            .replace('◇', "")
            .replace(".:", ".")
            .replace(r##"<a href="#004-81-10">二</a>"##, "二");
        let fixed = COLON_AFTER_BRACKET_NUMBER.replace(fixed.trim(), "${1}");
        *line = fixed.into_owned();
    }
    lines.retain(|line| !line.is_empty());
    for line in lines.iter_mut() {
        let fixed = line
            .replace(" <i>и</i>", ",")
            .replace(" <i>а тж.</i>", "")
            .replace("<i>и ср.</i>", "<i>ср.</i>")
            .replace("</a> и <a", "</a>, <a")
            .replace(" <i>(зима)</i>", "")
            .replace(" <i>(весна)</i>", "")
            .replace(" <i>(лето)</i>", "")
            .replace(" <i>(осень)</i>", "");
        *line = COLON_AFTER_POINT_NUMBER
            .replace(&fixed, "${1}${2}")
            .into_owned();
    }
}

fn scrub_link_phrases(lines: &mut Vec<String>) {
    for line in lines.iter_mut() {
        if !line.contains("a href") {
            continue;
        }
        for pattern in LINK_PHRASES.iter() {
            let mut mode = String::new();
            while let Some(caps) = pattern.captures(line) {
                if mode.is_empty() {
                    mode = caps["mode"].to_string();
                }
                let to_remove = caps["to_remove"].to_string();
                *line = line.replace(&to_remove, "");
            }
            if !mode.is_empty() {
                *line = line.replace(&format!("{mode}</i> <i>и т. п.</i>"), "");
                if mode.contains("<i>") {
                    *line = line.replace(&format!("{mode}</i> "), "");
                } else {
                    *line = line.replace(&mode, "");
                }
                *line = line.replace(" ()", "").replace("()", "");
            }
        }
    }
    for line in lines.iter_mut() {
        let fixed = LONE_PUNCT.replace(line, "");
        let fixed = EMPTY_NUMBERED.replace(&fixed, "");
        *line = fixed.into_owned();
    }
    lines.retain(|line| !line.is_empty());
    for line in lines.iter_mut() {
        *line = line.replace(" )", ")");
    }
}

fn first_char(line: &str) -> Option<char> {
    line.chars().next()
}

/// A line continuing the previous numbered sense rather than opening one.
fn is_continuation(line: &str) -> bool {
    let Some(first) = first_char(line) else {
        return false;
    };
    matches!(first, '～' | '｜' | '＝' | '…' | '[' | '＋')
        || is_kanji(first)
        || is_hira_or_kata(first)
        || line.starts_with("<i>")
        || LETTER_ITEM.is_match(line)
        || CYRILLIC_START.is_match(line)
}

/// Fold `1.`, `1)` and `1.` + `1)` numbering into `〔n〕` sense markers.
fn number_senses(mut lines: Vec<String>) -> Vec<String> {
    let pointed = lines.iter().any(|l| POINT_PROBE.is_match(l));
    let bracketed = lines.iter().any(|l| BRACKET_PROBE.is_match(l));
    let numbered = pointed || bracketed;
    let number = if bracketed { &BRACKET_NUMBER } else { &POINT_NUMBER };

    // A leading unnumbered line is a caption shared by every numbered sense.
    if numbered && lines.len() > 1 && !ANY_NUMBER_PROBE.is_match(&lines[0]) {
        let caption = lines.remove(0);
        for line in lines.iter_mut() {
            if let Some(caps) = number.captures(line) {
                *line = format!("{} {}{}", &caps[1], caption, &caps[2]);
            }
        }
    }

    if numbered {
        let mut current: Option<usize> = None;
        for i in 0..lines.len() {
            let opens = POINT_NUMBER.is_match(&lines[i])
                || (bracketed && BRACKET_NUMBER.is_match(&lines[i]));
            if opens {
                current = Some(i);
            } else if is_continuation(&lines[i]) {
                let Some(cur) = current else { continue };
                let tail = std::mem::take(&mut lines[i]);
                let separator = match lines[cur].chars().last() {
                    Some(';' | ')' | '.') => " ",
                    _ => "; ",
                };
                lines[cur] = format!("{}{separator}{tail}", lines[cur]);
            }
        }
        lines.retain(|l| !l.is_empty());
    }

    if pointed && bracketed {
        combine_two_levels(&mut lines);
    }

    if !numbered && lines.len() > 1 && ITALIC_CAPTION.is_match(&lines[0]) {
        let caption = lines.remove(0);
        for line in lines.iter_mut() {
            *line = format!("{caption} {line}");
        }
    }

    let mut lines: Vec<String> = lines
        .into_iter()
        .filter(|l| !l.is_empty())
        .map(|l| INNER_ITEM.replace_all(&l, " ").into_owned())
        .collect();

    if !numbered {
        return lines.into_iter().map(|l| format!("〔1〕{l}")).collect();
    }

    let mut current: Option<usize> = None;
    for i in 0..lines.len() {
        if let Some(caps) = SENSE_NUMBER.captures(&lines[i]) {
            lines[i] = format!("〔{}〕{}", &caps["number"], &caps["value"]);
            current = Some(i);
            continue;
        }
        let Some(cur) = current.filter(|_| i > 0) else {
            continue;
        };
        if matches!(first_char(&lines[i]), Some('～' | '＊' | '＝' | '＋')) {
            let tail = std::mem::take(&mut lines[i]);
            lines[cur].push(' ');
            lines[cur].push_str(&tail);
        } else if let Some(rest) = LETTER_ITEM_REST
            .captures(&lines[i])
            .map(|c| c["rest"].to_string())
        {
            lines[cur].push_str(&rest);
            lines[i].clear();
        }
    }
    lines.retain(|l| !l.is_empty());
    lines
}

/// `1.` heads over `1)` items: each item becomes `1.1) head-text item-text`.
fn combine_two_levels(lines: &mut Vec<String>) {
    let mut head: Option<usize> = None;
    let mut head_number = String::new();
    let mut head_text = String::new();
    for i in 0..lines.len() {
        if BARE_POINT.is_match(&lines[i]) {
            head_number = lines[i].clone();
            head = Some(i);
            head_text.clear();
        } else if POINT_WITH_TEXT.is_match(&lines[i]) {
            if let Some(caps) = POINT_NUMBER.captures(&lines[i]) {
                head_number = caps[1].to_string();
                head_text = caps[2].chars().skip(1).collect();
            }
            head = Some(i);
        } else if let Some(caps) = BRACKET_NUMBER.captures(&lines[i]) {
            let separator = if first_char(&lines[i]).is_some_and(char::is_numeric) {
                ""
            } else {
                " "
            };
            let combined = if head_text.is_empty() {
                format!("{head_number}{separator}{} ", lines[i])
            } else {
                format!("{head_number}{separator}{} {head_text}{} ", &caps[1], &caps[2])
            };
            lines[i] = combined;
            if let Some(h) = head {
                lines[h].clear();
            }
        }
    }
    lines.retain(|l| !l.is_empty());
}

/// `<i>..</i>` emphasis to `《..》` captions, with caption clean-ups.
fn rewrite_emphasis(lines: Vec<String>) -> Vec<String> {
    let mut lines: Vec<String> = lines
        .into_iter()
        .map(|l| {
            EMPHASIS
                .replace_all(&l, |c: &Captures| {
                    format!("《{}{}{}》", &c["op_pr"], &c["body"], &c["cl_pr"])
                })
                .into_owned()
        })
        .collect();

    if lines.iter().any(|l| l.contains('》')) {
        for line in lines.iter_mut() {
            let sentence_like = TRAILING_CAPTION.captures(line).is_some_and(|c| {
                let caption = &c[1];
                caption.contains(' ')
                    && !LATIN.is_match(caption)
                    && caption.ends_with('.')
                    && !ABBREVIATED_ENDINGS.iter().any(|end| caption.ends_with(end))
                    && caption != "С. У."
            });
            if sentence_like {
                *line = CAPTION_PERIOD.replace(line, "》").into_owned();
            }
        }
    }

    lines
        .into_iter()
        .map(|l| {
            let l = PARENS_AROUND_CAPTION.replace_all(&l, "《${1}》");
            let l = PARENS_INSIDE_CAPTION.replace_all(&l, "《${1}》");
            let l = l.replace(", ср.》", "》");
            let l = QUOTED_CAPTION.replace_all(&l, "《${1}》");
            l.replace(".》 《", ". ").replace("》; 《", "; ")
        })
        .collect()
}

/// Rewrite `bullet + fragment` runs into `〈canonical-bullet gloss〉`, then
/// apply the final caption merge and case folding.
fn rewrite_bullets(
    lines: Vec<String>,
    collocations: &Collocations,
) -> Result<Vec<String>, BuildError> {
    let mut out = Vec::with_capacity(lines.len());
    for mut line in lines {
        let padded = format!(" {line}");
        let runs: BTreeSet<String> = BULLET_RUN
            .captures_iter(&padded)
            .map(|c| {
                let run = c[1].to_string();
                if UNOPENED_PAREN.is_match(&run) {
                    let mut run = run;
                    run.pop();
                    run
                } else {
                    run
                }
            })
            .collect();

        let mut split_runs: Vec<Vec<String>> = runs.iter().map(|r| split_on_bullets(r)).collect();
        split_runs.sort_by(|a, b| b.cmp(a));

        for parts in &split_runs {
            let parts: Vec<&str> = parts[1..]
                .iter()
                .map(String::as_str)
                .filter(|p| !p.is_empty())
                .collect();
            let parity = |part: &&str| parts.iter().position(|p| p == part).unwrap_or(0) % 2;
            let bullets: Vec<&str> = parts.iter().copied().filter(|p| parity(p) == 0).collect();
            let fragments: Vec<&str> = parts.iter().copied().filter(|p| parity(p) == 1).collect();
            for (bullet, fragment) in bullets.iter().zip(fragments.iter()) {
                let Some(canonical) = bullet_form(bullet) else {
                    continue;
                };
                let gloss = collocations.normalize(fragment)?;
                line = line.replace(
                    &format!("{bullet}{fragment}"),
                    &format!("〈{canonical}{gloss}〉"),
                );
            }
        }
        if !runs.is_empty() {
            line = line.replace("〈-", "…〈-");
            line = BAR_GLOSS.replace_all(&line, "＿≪-${1}≫").into_owned();
            line = line.replace("〉〈~", "〉＿〈~").replace("〉～", "〉＿");
        }

        line = BRACKETED_TILDE.replace_all(&line, "〈[~${1}]〉").into_owned();
        line = line.replace("》 《", ", ");
        if !line.contains("т. п.》; 《") {
            line = line.replace("》; 《", "; ");
        }
        let line = TRAILING_PUNCT.replace(&line.to_lowercase(), "").replace('\u{301}', "");
        let line = line.trim();
        if !line.is_empty() {
            out.push(line.to_string());
        }
    }
    Ok(out)
}

/// Split keeping the bullet glyphs, like a capturing split: `～a＝b` gives
/// `["", "～", "a", "＝", "b"]`.
fn split_on_bullets(run: &str) -> Vec<String> {
    let mut parts = vec![String::new()];
    for ch in run.chars() {
        if BULLETS.contains(&ch) {
            parts.push(ch.to_string());
            parts.push(String::new());
        } else if let Some(last) = parts.last_mut() {
            last.push(ch);
        }
    }
    parts
}
