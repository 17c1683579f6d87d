//! Assembling the final entry list: fresh ids, side-entry merging and
//! reference validation.

use std::collections::{HashMap, HashSet};

use tracing::{debug, info, warn};
use warodai_types::{DictionaryEntry, Eid, MeaningSelection, Reference, SenseMap};

use crate::BuildError;
use crate::config::{Highlighting, LoaderConfig};
use crate::parser::SideEntry;

/// Hands out fresh eids above the largest one already in the synthetic range.
#[derive(Debug)]
pub struct EidMinter {
    current: Eid,
}

impl EidMinter {
    /// Start after the largest eid of `entries` whose first segment is `prefix`.
    pub fn after_max(entries: &[DictionaryEntry], prefix: &str) -> Result<Self, BuildError> {
        let floor = Eid::parse(&format!("{prefix}-00-00"))
            .map_err(|_| BuildError::BadEidPrefix(prefix.to_string()))?;
        let current = entries
            .iter()
            .filter(|e| e.eid.starts_with(prefix))
            .filter_map(|e| Eid::parse(&e.eid).ok())
            .max()
            .unwrap_or(floor);
        Ok(Self { current })
    }

    pub fn next(&mut self) -> String {
        self.current.increment()
    }

    pub fn current(&self) -> String {
        self.current.to_string()
    }
}

/// Entries the dump only implies: the written form 尽く of 008-04-11 (which
/// 003-19-23 is redirected to) and 細工 as a compound component.
pub fn add_synthetic_entries(
    entries: &mut Vec<DictionaryEntry>,
    minter: &mut EidMinter,
    highlighting: &Highlighting,
) {
    let written_form = minter.next();
    let mut references = SenseMap::new();
    references.insert(
        "1".to_string(),
        vec![Reference::new("008-04-11", MeaningSelection::All).with_mode("письменная форма гл.")],
    );
    entries.push(DictionaryEntry {
        eid: written_form.clone(),
        lexeme: vec!["尽く".to_string()],
        reading: vec!["つく".to_string()],
        translation: SenseMap::new(),
        references,
    });

    match entries
        .iter_mut()
        .find(|e| e.eid == "003-19-23")
        .and_then(|e| e.references.get_mut("1"))
        .and_then(|refs| refs.first_mut())
    {
        Some(reference) => reference.eid = written_form,
        None => debug!("003-19-23 has no first reference to redirect"),
    }

    let mut translation = SenseMap::new();
    translation.insert(
        "1".to_string(),
        vec![format!(
            "{} [мелкие] изделия, поделки",
            highlighting.wrap("как 2-й компонент сложн. сл.")
        )],
    );
    entries.push(DictionaryEntry {
        eid: minter.next(),
        lexeme: vec!["細工".to_string()],
        reading: vec!["ざいく".to_string()],
        translation,
        references: SenseMap::new(),
    });
}

/// Give side entries fresh eids and append them. Side entries with the same
/// lexemes and readings collapse into the first one, senses appended.
/// Returns how many were merged away.
pub fn extend_with_side_entries(
    entries: &mut Vec<DictionaryEntry>,
    side: Vec<SideEntry>,
    minter: &mut EidMinter,
    config: &LoaderConfig,
) -> usize {
    let mut kept: Vec<SideEntry> = Vec::new();
    let mut merged = 0;
    for entry in side {
        if let Some(existing) = kept.iter_mut().find(|k| k.same_headword(&entry)) {
            debug!(lexeme = ?entry.lexeme, "merging duplicate side entry");
            for (sense, glosses) in entry.translation {
                existing.translation.entry(sense).or_default().extend(glosses);
            }
            for (sense, refs) in entry.references {
                existing.references.entry(sense).or_default().extend(refs);
            }
            merged += 1;
            continue;
        }
        let mut entry = entry;
        if entry.reading.is_empty() {
            match entry.lexeme.first().and_then(|l| config.custom_readings.get(l)) {
                Some(readings) => entry.reading = readings.clone(),
                None => warn!(lexeme = ?entry.lexeme, "side entry without a reading"),
            }
        }
        kept.push(entry);
    }

    entries.extend(kept.into_iter().map(|e| {
        let eid = minter.next();
        e.into_entry(eid)
    }));
    merged
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ResolveStats {
    pub unusable_references: usize,
    pub pruned_entries: usize,
}

/// Verdict for one reference, computed against the unmodified entry list.
struct Verdict {
    meanings: MeaningSelection,
    usable: bool,
}

fn judge(reference: &Reference, target: Option<&DictionaryEntry>) -> Verdict {
    let Some(target) = target else {
        return Verdict {
            meanings: reference.meanings.clone(),
            usable: false,
        };
    };
    let (meanings, mut usable) = match &reference.meanings {
        MeaningSelection::All => (
            MeaningSelection::All,
            !(target.translation.is_empty() && target.references.is_empty()),
        ),
        MeaningSelection::Senses(senses) => {
            let kept: Vec<String> = senses.iter().filter(|s| target.has_sense(s)).cloned().collect();
            let usable = !kept.is_empty();
            (MeaningSelection::Senses(kept), usable)
        }
    };
    if let Some(prefix) = &reference.prefix {
        let matched = target
            .translations()
            .flat_map(|t| t.split("; "))
            .any(|t| t.starts_with(prefix.as_str()));
        usable &= matched;
    }
    Verdict { meanings, usable }
}

/// Validate every reference against its target, wrap labels in the configured
/// delimiters and prune entries left with nothing to show.
///
/// Verdicts depend only on each target's own senses, so they are computed in
/// one pass over the unmodified list and applied afterwards. References that
/// still point at a pruned entry are then marked unusable, which may prune
/// their owners in turn.
pub fn resolve_references(entries: &mut Vec<DictionaryEntry>, highlighting: &Highlighting) -> ResolveStats {
    let verdicts: Vec<Vec<(String, Vec<Verdict>)>> = {
        let index: HashMap<&str, &DictionaryEntry> =
            entries.iter().rev().map(|e| (e.eid.as_str(), e)).collect();
        entries
            .iter()
            .map(|entry| {
                entry
                    .references
                    .iter()
                    .map(|(sense, refs)| {
                        let verdicts = refs
                            .iter()
                            .map(|r| judge(r, index.get(r.eid.as_str()).copied()))
                            .collect();
                        (sense.clone(), verdicts)
                    })
                    .collect()
            })
            .collect()
    };

    let mut stats = ResolveStats::default();
    for (entry, senses) in entries.iter_mut().zip(verdicts) {
        for (sense, verdicts) in senses {
            let Some(refs) = entry.references.get_mut(&sense) else {
                continue;
            };
            for (reference, verdict) in refs.iter_mut().zip(verdicts) {
                if let Some(mode) = reference.mode.take() {
                    reference.mode = Some(highlighting.wrap(&mode));
                }
                reference.meanings = verdict.meanings;
                reference.usable = verdict.usable;
                if !verdict.usable {
                    stats.unusable_references += 1;
                    debug!(eid = %entry.eid, target = %reference.eid, "unusable reference");
                }
            }
        }
    }

    // Pruning can strand an owner whose last usable reference pointed at a
    // pruned entry, so repeat until a round prunes nothing.
    loop {
        let mut pruned = HashSet::new();
        entries.retain(|entry| {
            let keep = !entry.translation.is_empty() || entry.usable_references().next().is_some();
            if !keep {
                info!(eid = %entry.eid, "no translations and no usable references");
                pruned.insert(entry.eid.clone());
            }
            keep
        });
        if pruned.is_empty() {
            break;
        }
        stats.pruned_entries += pruned.len();

        for entry in entries.iter_mut() {
            for reference in entry.references.values_mut().flatten() {
                if reference.usable && pruned.contains(&reference.eid) {
                    warn!(eid = %entry.eid, target = %reference.eid, "reference to pruned entry");
                    reference.usable = false;
                    stats.unusable_references += 1;
                }
            }
        }
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::SideOrigin;

    fn entry(eid: &str, glosses: &[(&str, &str)]) -> DictionaryEntry {
        let mut translation = SenseMap::new();
        for (sense, gloss) in glosses {
            translation
                .entry(sense.to_string())
                .or_insert_with(Vec::new)
                .push(gloss.to_string());
        }
        DictionaryEntry {
            eid: eid.to_string(),
            lexeme: vec![format!("lex-{eid}")],
            reading: vec![],
            translation,
            references: SenseMap::new(),
        }
    }

    fn with_ref(mut e: DictionaryEntry, sense: &str, r: Reference) -> DictionaryEntry {
        e.references.entry(sense.to_string()).or_default().push(r);
        e
    }

    fn side(lexeme: &[&str], reading: &[&str], gloss: &str) -> SideEntry {
        let mut translation = SenseMap::new();
        translation.insert("1".to_string(), vec![gloss.to_string()]);
        SideEntry {
            origin: SideOrigin::Caption,
            lexeme: lexeme.iter().map(|s| s.to_string()).collect(),
            reading: reading.iter().map(|s| s.to_string()).collect(),
            translation,
            references: SenseMap::new(),
        }
    }

    #[test]
    fn minter_starts_after_synthetic_range() {
        let entries = vec![entry("009-00-05", &[]), entry("009-00-07", &[]), entry("010-00-00", &[])];
        let mut minter = EidMinter::after_max(&entries, "009").unwrap();
        assert_eq!(minter.current(), "009-00-07");
        assert_eq!(minter.next(), "009-00-08");

        let mut minter = EidMinter::after_max(&[], "009").unwrap();
        assert_eq!(minter.next(), "009-00-01");

        assert!(matches!(
            EidMinter::after_max(&[], "x9"),
            Err(BuildError::BadEidPrefix(p)) if p == "x9"
        ));
    }

    #[test]
    fn synthetic_entries_and_redirect() {
        let original = Reference::new("001-00-01", MeaningSelection::All);
        let mut entries = vec![with_ref(entry("003-19-23", &[]), "1", original)];
        let mut minter = EidMinter::after_max(&entries, "009").unwrap();
        add_synthetic_entries(&mut entries, &mut minter, &Highlighting::default());

        assert_eq!(entries.len(), 3);
        assert_eq!(entries[1].eid, "009-00-01");
        assert_eq!(entries[1].lexeme, ["尽く"]);
        assert_eq!(entries[0].references["1"][0].eid, "009-00-01");
        assert_eq!(entries[2].lexeme, ["細工"]);
        assert_eq!(
            entries[2].translation["1"],
            ["《как 2-й компонент сложн. сл.》 [мелкие] изделия, поделки"]
        );
    }

    #[test]
    fn duplicate_side_entries_merge_in_order() {
        let mut entries = Vec::new();
        let mut minter = EidMinter::after_max(&entries, "009").unwrap();
        let merged = extend_with_side_entries(
            &mut entries,
            vec![
                side(&["猫", "貓"], &["ねこ"], "кошка"),
                side(&["犬"], &["いぬ"], "собака"),
                side(&["貓", "猫"], &["ねこ"], "кот"),
            ],
            &mut minter,
            &LoaderConfig::default(),
        );
        assert_eq!(merged, 1);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].eid, "009-00-01");
        assert_eq!(entries[0].translation["1"], ["кошка", "кот"]);
        assert_eq!(entries[1].eid, "009-00-02");
    }

    #[test]
    fn missing_reading_comes_from_custom_table() {
        let mut entries = Vec::new();
        let mut minter = EidMinter::after_max(&entries, "009").unwrap();
        extend_with_side_entries(
            &mut entries,
            vec![side(&["其限"], &[], "только")],
            &mut minter,
            &LoaderConfig::default(),
        );
        assert_eq!(entries[0].reading, ["それきり", "それっきり"]);
    }

    #[test]
    fn resolution_flags_and_prunes() {
        let hl = Highlighting::default();
        let mut entries = vec![
            entry("001", &[("1", "кошка"), ("2", "〈~ni〉 кошкой; гейша")]),
            with_ref(entry("002", &[]), "1", Reference::new("404", MeaningSelection::All)),
            with_ref(
                entry("003", &[]),
                "1",
                Reference::new("001", MeaningSelection::Senses(vec!["2".into(), "9".into()]))
                    .with_mode("уст."),
            ),
            with_ref(
                entry("004", &[]),
                "1",
                Reference::new("001", MeaningSelection::All).with_prefix("гейша"),
            ),
            with_ref(
                entry("005", &[]),
                "1",
                Reference::new("001", MeaningSelection::All).with_prefix("собака"),
            ),
        ];
        let stats = resolve_references(&mut entries, &hl);

        let eids: Vec<_> = entries.iter().map(|e| e.eid.as_str()).collect();
        assert_eq!(eids, ["001", "003", "004"]);
        let r = &entries[1].references["1"][0];
        assert_eq!(r.meanings, MeaningSelection::Senses(vec!["2".to_string()]));
        assert_eq!(r.mode.as_deref(), Some("《уст.》"));
        assert!(entries[2].references["1"][0].usable);
        assert_eq!(stats.pruned_entries, 2);
        assert_eq!(stats.unusable_references, 2);
    }

    #[test]
    fn references_to_pruned_entries_are_swept() {
        let mut entries = vec![
            entry("001", &[("1", "кошка")]),
            with_ref(entry("002", &[]), "1", Reference::new("404", MeaningSelection::All)),
            with_ref(
                entry("003", &[("1", "кот")]),
                "2",
                Reference::new("002", MeaningSelection::All),
            ),
        ];
        let stats = resolve_references(&mut entries, &Highlighting::default());
        assert_eq!(entries.len(), 2);
        assert!(!entries[1].references["2"][0].usable);
        assert_eq!(stats.unusable_references, 2);
    }

    #[test]
    fn pruning_cascades_through_reference_chains() {
        let mut entries = vec![
            with_ref(entry("001-00-01", &[]), "1", Reference::new("001-00-02", MeaningSelection::All)),
            with_ref(entry("001-00-02", &[]), "1", Reference::new("999-99-99", MeaningSelection::All)),
            with_ref(
                entry("001-00-03", &[("1", "кот")]),
                "1",
                Reference::new("001-00-01", MeaningSelection::All),
            ),
        ];
        let stats = resolve_references(&mut entries, &Highlighting::default());

        let eids: Vec<_> = entries.iter().map(|e| e.eid.as_str()).collect();
        assert_eq!(eids, ["001-00-03"]);
        assert!(!entries[0].references["1"][0].usable);
        assert_eq!(stats.pruned_entries, 2);
        assert_eq!(stats.unusable_references, 3);
        assert!(
            entries
                .iter()
                .all(|e| !e.translation.is_empty() || e.usable_references().next().is_some())
        );
    }

    #[test]
    fn merged_side_entries_resolve_every_reference() {
        let mut a = side(&["猫"], &["ねこ"], "кошка");
        a.references
            .insert("2".to_string(), vec![Reference::new("404", MeaningSelection::All)]);
        let mut b = side(&["猫"], &["ねこ"], "кот");
        b.references
            .insert("2".to_string(), vec![Reference::new("001", MeaningSelection::All)]);

        let mut entries = vec![entry("001", &[("1", "собака")])];
        let mut minter = EidMinter::after_max(&entries, "009").unwrap();
        extend_with_side_entries(&mut entries, vec![a, b], &mut minter, &LoaderConfig::default());
        resolve_references(&mut entries, &Highlighting::default());

        let merged = &entries[1];
        let usable: Vec<_> = merged.references["2"].iter().map(|r| r.usable).collect();
        assert_eq!(usable, [false, true]);
        assert_eq!(merged.translation["1"], ["кошка", "кот"]);
    }
}
