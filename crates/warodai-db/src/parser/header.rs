//! The record's first line (`reading【lexeme】(transcription)〔eid〕`) and the
//! optional whole-entry usage note on the line after it.

use once_cell::sync::Lazy;
use regex::Regex;
use warodai_types::script::katakana_to_hiragana;

static EID: Lazy<Regex> = Lazy::new(|| Regex::new(r"〔(.*)〕").expect("valid eid pattern"));
static HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<reading>.*?)…?\s?(?:【(?P<lexeme>.*?)】)?\(").expect("valid header pattern")
});
static HOMOGRAPH_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[IV]+").expect("valid numeral pattern"));
static LEXEME_SEPARATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[･ ,]").expect("valid separator pattern"));
static READING_NOISE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[…IV]+|[a-zA-Z]+").expect("valid reading noise pattern"));
static READING_SEPARATOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[,･]").expect("valid separator pattern"));
static GLOBAL_NOTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^<i>(?P<mode>[^)(]+?)</i> (?P<lexeme>[^<a-zA-Zа-яА-Я0-9(～]+?)$")
        .expect("valid global note pattern")
});

/// Usage labels that make a second-line note apply to the whole entry.
const GLOBAL_MODES: [&str; 6] = ["уст.", "неправ.", "кн.", "редко", "тж.", "чаще"];

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Header {
    pub lexemes: Vec<String>,
    pub readings: Vec<String>,
}

/// `<i>mode</i> lexeme` on the line right after the header.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GlobalNote {
    pub mode: String,
    pub lexeme: String,
}

impl GlobalNote {
    /// Whether the note names one of the whole-entry labels.
    pub fn is_recognized(&self) -> bool {
        GLOBAL_MODES.contains(&self.mode.as_str())
    }

    /// Label prefix for the alternate spelling's glosses. "Also" carries no label.
    pub fn prefix(&self) -> String {
        let mode = self.mode.replace("тж.", "");
        let mode = mode.trim();
        if mode.is_empty() {
            String::new()
        } else {
            format!("《{mode}》 ")
        }
    }
}

pub fn record_eid(first_line: &str) -> Option<String> {
    EID.captures(first_line).map(|c| c[1].to_string())
}

pub fn parse_header(first_line: &str) -> Option<Header> {
    let caps = HEADER.captures(first_line)?;
    let reading = caps.name("reading").map_or("", |m| m.as_str());

    let lexemes = match caps.name("lexeme") {
        Some(lexeme) => {
            let lexeme = lexeme.as_str().replace('…', "");
            let lexeme = HOMOGRAPH_NUMBER.replace_all(&lexeme, "");
            LEXEME_SEPARATOR
                .split(&lexeme)
                .filter(|l| !l.is_empty())
                .map(str::to_string)
                .collect()
        }
        None => {
            let lexeme = reading.replace('…', "");
            let lexeme = HOMOGRAPH_NUMBER.replace_all(&lexeme, "");
            lexeme
                .split(", ")
                .filter(|l| !l.is_empty())
                .map(str::to_string)
                .collect()
        }
    };

    let reading = katakana_to_hiragana(&READING_NOISE.replace_all(reading, ""))
        .replace(['・', '！'], "");
    let readings = READING_SEPARATOR
        .split(&reading)
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
        .collect();

    Some(Header { lexemes, readings })
}

pub fn global_note(second_line: &str) -> Option<GlobalNote> {
    GLOBAL_NOTE.captures(second_line).map(|c| GlobalNote {
        mode: c["mode"].to_string(),
        lexeme: c["lexeme"].to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn reads_eid_from_first_line() {
        assert_eq!(
            record_eid("ねこ【猫】(нэко)〔001-00-01〕").as_deref(),
            Some("001-00-01")
        );
        assert_eq!(record_eid("ねこ【猫】(нэко)"), None);
    }

    #[test]
    fn splits_bracketed_lexemes() {
        let h = parse_header("あいきょう【愛嬌･愛敬】(аикё:)〔000-00-38〕").unwrap();
        assert_eq!(h.lexemes, strings(&["愛嬌", "愛敬"]));
        assert_eq!(h.readings, strings(&["あいきょう"]));
    }

    #[test]
    fn strips_homograph_numerals() {
        let h = parse_header("かI【蚊】(ка)〔001-23-45〕").unwrap();
        assert_eq!(h.lexemes, strings(&["蚊"]));
        assert_eq!(h.readings, strings(&["か"]));

        let h = parse_header("あII【亜】(а)〔000-00-02〕").unwrap();
        assert_eq!(h.lexemes, strings(&["亜"]));
    }

    #[test]
    fn lexeme_falls_back_to_reading() {
        let h = parse_header("アイス, アイスクリーム(аису)〔000-01-00〕").unwrap();
        assert_eq!(h.lexemes, strings(&["アイス", "アイスクリーム"]));
        assert_eq!(h.readings, strings(&["あいす", "あいすくりーむ"]));
    }

    #[test]
    fn cleans_readings() {
        let h = parse_header("…がち【勝ち】(…гати)〔001-02-03〕").unwrap();
        assert_eq!(h.lexemes, strings(&["勝ち"]));
        assert_eq!(h.readings, strings(&["がち"]));

        let h = parse_header("ああ！【嗚呼】(а:)〔000-00-01〕").unwrap();
        assert_eq!(h.readings, strings(&["ああ"]));
    }

    #[test]
    fn header_without_transcription_fails() {
        assert_eq!(parse_header("〔001-00-01〕"), None);
    }

    #[test]
    fn global_notes() {
        let note = global_note("<i>уст.</i> 嗚乎").unwrap();
        assert!(note.is_recognized());
        assert_eq!(note.prefix(), "《уст.》 ");
        assert_eq!(note.lexeme, "嗚乎");

        let note = global_note("<i>тж.</i> 猫").unwrap();
        assert!(note.is_recognized());
        assert_eq!(note.prefix(), "");

        let note = global_note("<i>диал.</i> 猫").unwrap();
        assert!(!note.is_recognized());

        assert_eq!(global_note("1) кошка"), None);
        assert_eq!(global_note("<i>уст.</i> кошка"), None);
    }
}
