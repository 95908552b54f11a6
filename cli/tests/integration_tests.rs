//! Integration tests for the relmap CLI binary.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Output;

use rusqlite::Connection;

const BIN: &str = env!("CARGO_BIN_EXE_relmap");

/// Widget model with an identity key, a JSON collection column, an index,
/// and an FTS mirror excluding the key.
fn write_model(dir: &Path) -> PathBuf {
    let json = r#"[
  {
    "name": "Widget",
    "is_table": true,
    "dynamic_name": false,
    "indexes": [["Name"]],
    "fields": [
      { "name": "Id", "ty": "Int32", "key": { "column": "Id", "auto": true } },
      { "name": "Name", "ty": "Text" },
      { "name": "Tags", "ty": { "List": "Text" }, "nullable": true }
    ],
    "fts": { "excluded": ["Id"] }
  }
]"#;
    let path = dir.join("model.json");
    fs::write(&path, json).expect("failed to write model file");
    path
}

fn run(args: &[&str]) -> Output {
    std::process::Command::new(BIN)
        .args(args)
        .output()
        .expect("failed to run relmap")
}

#[test]
fn ddl_prints_all_statements() {
    let dir = tempfile::tempdir().unwrap();
    let model = write_model(dir.path());

    let out = run(&["ddl", "--model", model.to_str().unwrap()]);
    assert!(out.status.success());

    let stdout = String::from_utf8(out.stdout).unwrap();
    assert!(stdout.contains(
        "CREATE TABLE IF NOT EXISTS Widget (Id INTEGER UNIQUE PRIMARY KEY NOT NULL, \
         Name TEXT NOT NULL, Tags TEXT);"
    ));
    assert!(stdout.contains("CREATE INDEX IF NOT EXISTS IDX_Widget_Name ON Widget (Name);"));
    assert!(stdout.contains(
        "CREATE VIRTUAL TABLE IF NOT EXISTS Widget_fts USING fts5(Name, Tags);"
    ));
}

#[test]
fn create_status_drop_lifecycle() {
    let dir = tempfile::tempdir().unwrap();
    let model = write_model(dir.path());
    let db = dir.path().join("widgets.db");
    let model_arg = model.to_str().unwrap();
    let db_arg = db.to_str().unwrap();

    let out = run(&["create", "--model", model_arg, "--db", db_arg]);
    assert!(out.status.success());

    let out = run(&["status", "--model", model_arg, "--db", db_arg]);
    let stdout = String::from_utf8(out.stdout).unwrap();
    assert!(stdout.contains("Widget"));
    assert!(stdout.contains("0 row(s)"));

    let out = run(&["drop", "--model", model_arg, "--db", db_arg]);
    assert!(out.status.success());

    let out = run(&["status", "--model", model_arg, "--db", db_arg]);
    let stdout = String::from_utf8(out.stdout).unwrap();
    assert!(stdout.contains("missing"));
}

#[test]
fn create_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    let model = write_model(dir.path());
    let db = dir.path().join("widgets.db");
    let model_arg = model.to_str().unwrap();
    let db_arg = db.to_str().unwrap();

    assert!(run(&["create", "--model", model_arg, "--db", db_arg]).status.success());
    assert!(run(&["create", "--model", model_arg, "--db", db_arg]).status.success());
}

#[test]
fn fts_rebuild_scrubs_markup() {
    let dir = tempfile::tempdir().unwrap();
    let model = write_model(dir.path());
    let db = dir.path().join("widgets.db");
    let model_arg = model.to_str().unwrap();
    let db_arg = db.to_str().unwrap();

    assert!(run(&["create", "--model", model_arg, "--db", db_arg]).status.success());

    {
        let conn = Connection::open(&db).unwrap();
        conn.execute(
            "INSERT INTO Widget (Name, Tags) VALUES (?1, ?2)",
            ("<b>bold</b> claim", r#"["styled"]"#),
        )
        .unwrap();
    }

    let out = run(&["fts-rebuild", "--model", model_arg, "--db", db_arg]);
    assert!(out.status.success());
    let stdout = String::from_utf8(out.stdout).unwrap();
    assert!(stdout.contains("1 row(s) mirrored"));

    let conn = Connection::open(&db).unwrap();
    let name: String = conn
        .query_row(
            "SELECT Name FROM Widget_fts WHERE Widget_fts MATCH 'bold'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(name, "bold claim");
}

#[test]
fn invalid_model_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.json");
    fs::write(&path, "{ not json").unwrap();

    let out = run(&["ddl", "--model", path.to_str().unwrap()]);
    assert!(!out.status.success());
    let stderr = String::from_utf8(out.stderr).unwrap();
    assert!(stderr.contains("error:"));
}

#[test]
fn duplicate_type_in_model_fails() {
    let dir = tempfile::tempdir().unwrap();
    let json = r#"[
  { "name": "Widget", "is_table": true, "fields": [ { "name": "Name", "ty": "Text" } ] },
  { "name": "Widget", "is_table": true, "fields": [ { "name": "Name", "ty": "Text" } ] }
]"#;
    let path = dir.path().join("model.json");
    fs::write(&path, json).unwrap();

    let out = run(&["ddl", "--model", path.to_str().unwrap()]);
    assert!(!out.status.success());
}
