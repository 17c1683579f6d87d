use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use warodai_cli::{BuildOptions, LookupOptions, LookupOutput, build, lookup};
use warodai_db::LoadMode;
use warodai_lookup::SearchMode;

fn fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("warodai-db")
        .join("tests")
        .join("fixtures")
        .join("warodai_sample.txt")
}

/// The fixture is stored as UTF-8, so every build needs this config.
fn write_config(dir: &Path) -> PathBuf {
    let path = dir.join("loader.json");
    fs::write(&path, r#"{"encoding": "utf8"}"#).expect("write config");
    path
}

fn build_into(dir: &Path) -> PathBuf {
    let (out, report) = build(&BuildOptions {
        source: Some(fixture_path()),
        out: Some(dir.join("warodai.json")),
        config: Some(write_config(dir)),
        load_mode: Some(LoadMode::Owned),
    })
    .expect("build fixture");
    assert_eq!(report.entries, 10);
    out
}

#[test]
fn build_then_lookup() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = build_into(dir.path());
    assert!(db.exists());

    let output = lookup(&LookupOptions {
        db: Some(db.clone()),
        lexeme: "猫".to_string(),
        load_mode: Some(LoadMode::Mmap),
        ..LookupOptions::default()
    })
    .expect("lookup");
    let LookupOutput::Results(hits) = output else {
        panic!("expected full results");
    };
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].reading, ["ねこ"]);
    assert_eq!(hits[0].translation, ["cat"]);

    let output = lookup(&LookupOptions {
        db: Some(db),
        lexeme: "子犬".to_string(),
        translations_only: true,
        ..LookupOptions::default()
    })
    .expect("lookup");
    assert_eq!(output, LookupOutput::Translations(vec!["собака".to_string()]));
}

#[test]
fn shallow_lookup_of_pruned_entry_is_empty() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = build_into(dir.path());
    let output = lookup(&LookupOptions {
        db: Some(db),
        lexeme: "幽霊".to_string(),
        mode: SearchMode::ShallowOnly,
        ..LookupOptions::default()
    })
    .expect("lookup");
    assert_eq!(output, LookupOutput::Results(Vec::new()));
}

#[test]
fn invalid_query_is_an_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = build_into(dir.path());
    let err = lookup(&LookupOptions {
        db: Some(db),
        lexeme: "cat".to_string(),
        ..LookupOptions::default()
    })
    .expect_err("latin lexeme");
    assert!(err.to_string().contains("lexeme"), "{err}");

    let err = lookup(&LookupOptions {
        db: Some(dir.path().join("missing.json")),
        lexeme: "猫".to_string(),
        ..LookupOptions::default()
    })
    .expect_err("no such file");
    assert!(format!("{err:#}").contains("missing.json"), "{err:#}");
}

#[test]
fn binary_prints_json() {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = dir.path().join("warodai.json");
    let status = Command::new(env!("CARGO_BIN_EXE_warodai"))
        .arg("build")
        .arg("--source")
        .arg(fixture_path())
        .arg("--out")
        .arg(&db)
        .arg("--config")
        .arg(write_config(dir.path()))
        .arg("--load-mode=owned")
        .status()
        .expect("run build");
    assert!(status.success());

    let output = Command::new(env!("CARGO_BIN_EXE_warodai"))
        .args(["lookup", "犬", "--mode", "shallow", "--db"])
        .arg(&db)
        .output()
        .expect("run lookup");
    assert!(output.status.success());
    let hits: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json on stdout");
    assert_eq!(hits[0]["lexeme"][0], "犬");
    assert_eq!(hits[0]["translation"][0], "собака");
}
