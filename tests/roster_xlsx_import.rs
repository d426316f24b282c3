#[path = "../src/roster.rs"]
mod roster;
#[path = "../src/sample.rs"]
mod sample;
#[path = "../src/xlsx_links.rs"]
mod xlsx_links;

use roster::{parse_roster, RosterError, SourceLanguage};
use sample::{create_sample_set, roster_xlsx, CellLink};
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

fn rows(values: &[&[&str]]) -> Vec<Vec<String>> {
    values
        .iter()
        .map(|row| row.iter().map(|v| v.to_string()).collect())
        .collect()
}

#[test]
fn sample_workbook_imports_every_student() {
    let dir = temp_dir("batchmail-roster-sample");
    let set = create_sample_set(&dir.join("sample-set"), "docent@school.nl").expect("sample set");
    let bytes = std::fs::read(&set.roster).expect("read roster");

    let roster = parse_roster(&bytes).expect("parse roster");
    assert_eq!(roster.source_language, SourceLanguage::English);
    assert_eq!(roster.students.len(), set.students.len());
    let first = &roster.students[0];
    assert_eq!(first.firstname, set.students[0].firstname);
    assert_eq!(first.lastname, set.students[0].lastname);
    assert_eq!(first.email, set.students[0].email);
    assert_eq!(first.studentid, "S0001");
    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn dutch_headers_and_linked_email_cells() {
    let sheet = rows(&[
        &["Voornaam", "Achternaam", "Email", "Student ID"],
        &["Jan", "de Vries", "", "1001"],
        &["Voornaam", "Achternaam", "Email", ""],
        &["Sanne", "Bakker", "sanne@school.nl", "1002"],
    ]);
    let links = [CellLink {
        row: 1,
        col: 2,
        target: "jan.devries@school.nl".to_string(),
    }];
    let bytes = roster_xlsx(&sheet, &links).expect("workbook");

    let roster = parse_roster(&bytes).expect("parse roster");
    assert_eq!(roster.source_language, SourceLanguage::Dutch);
    assert_eq!(roster.students.len(), 2);
    assert_eq!(roster.students[0].email, "jan.devries@school.nl");
    assert_eq!(roster.students[0].studentid, "1001");
    assert_eq!(roster.students[1].firstname, "Sanne");
    assert!(roster
        .students
        .iter()
        .all(|s| s.source_language == SourceLanguage::Dutch));
}

#[test]
fn roster_without_email_column_reports_it() {
    let sheet = rows(&[&["First Name", "Last Name"], &["Jan", "Bakker"]]);
    let bytes = roster_xlsx(&sheet, &[]).expect("workbook");

    let e = parse_roster(&bytes).expect_err("email column is required");
    assert_eq!(e, RosterError::MissingColumns(vec!["email".to_string()]));
    assert_eq!(e.code(), "missing_columns");
    assert_eq!(e.to_string(), "Missing required column(s): email");
}

#[test]
fn header_only_sheet_is_missing_every_required_column() {
    let sheet = rows(&[&["firstname", "lastname", "email"]]);
    let bytes = roster_xlsx(&sheet, &[]).expect("workbook");
    match parse_roster(&bytes) {
        Err(RosterError::MissingColumns(columns)) => {
            assert_eq!(columns, ["firstname", "lastname", "email"]);
        }
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn garbage_bytes_are_unreadable() {
    let e = parse_roster(b"definitely not a spreadsheet").expect_err("not a workbook");
    assert_eq!(e.code(), "unreadable_file");
}
