#[path = "../src/collate.rs"]
mod collate;
#[path = "../src/matcher.rs"]
mod matcher;
#[path = "../src/resolver.rs"]
mod resolver;
#[path = "../src/roster.rs"]
mod roster;
#[path = "../src/sample.rs"]
mod sample;
#[path = "../src/tokenize.rs"]
mod tokenize;
#[path = "../src/xlsx_links.rs"]
mod xlsx_links;

use matcher::compute_matches;
use resolver::{resolve_entries, DropEntry, UploadCache};
use roster::parse_roster;
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

#[test]
fn sample_set_matches_every_student_to_their_pdf() {
    let dir = temp_dir("batchmail-pipeline-sample");
    let set = sample::create_sample_set(&dir.join("set"), "docent").expect("sample set");
    let roster = parse_roster(&std::fs::read(&set.roster).expect("read")).expect("roster");
    let cache = UploadCache::reset(dir.join("cache")).expect("cache");

    let resolution = resolve_entries(&[DropEntry::Path(set.files_dir.clone())], &cache);
    assert!(resolution.skipped.is_empty());
    assert_eq!(resolution.files.len(), set.students.len());

    let matches = compute_matches(&roster.students, &resolution.files);
    assert_eq!(matches.len(), set.students.len());
    for m in &matches {
        let expected = format!(
            "{}-{}.pdf",
            m.firstname.to_lowercase(),
            m.lastname.to_lowercase()
        );
        assert_eq!(m.file_name, expected);
        assert!(m.email.contains("+"));
    }
    let lastnames: Vec<&str> = matches.iter().map(|m| m.lastname.as_str()).collect();
    let mut sorted = lastnames.clone();
    sorted.sort_by(|a, b| collate::compare(a, b));
    assert_eq!(lastnames, sorted);
    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn folder_and_file_dropped_together_resolve_once() {
    let dir = temp_dir("batchmail-pipeline-dedupe");
    let drop = dir.join("drop");
    std::fs::create_dir_all(drop.join("nested")).expect("mkdir");
    std::fs::write(drop.join("jan_bakker.pdf"), b"%PDF").expect("write");
    std::fs::write(drop.join("nested").join("Piet Jansen.docx"), b"doc").expect("write");
    let cache = UploadCache::reset(dir.join("cache")).expect("cache");

    let resolution = resolve_entries(
        &[
            DropEntry::Path(drop.clone()),
            DropEntry::Path(drop.join("jan_bakker.pdf")),
            DropEntry::Path(drop.join("vanished.pdf")),
        ],
        &cache,
    );
    let names: Vec<&str> = resolution.files.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names, ["jan_bakker.pdf", "Piet Jansen.docx"]);
    assert!(resolution.skipped.is_empty());
    let _ = std::fs::remove_dir_all(dir);
}

#[cfg(unix)]
#[test]
fn symlink_cycles_terminate() {
    let dir = temp_dir("batchmail-pipeline-cycle");
    let drop = dir.join("drop");
    std::fs::create_dir_all(&drop).expect("mkdir");
    std::fs::write(drop.join("emma_diaz.pdf"), b"%PDF").expect("write");
    std::os::unix::fs::symlink(&drop, drop.join("loop")).expect("symlink");
    let cache = UploadCache::reset(dir.join("cache")).expect("cache");

    let resolution = resolve_entries(&[DropEntry::Path(drop)], &cache);
    assert_eq!(resolution.files.len(), 1);
    assert_eq!(resolution.files[0].name, "emma_diaz.pdf");
    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn uploaded_blobs_are_cached_and_matchable() {
    let dir = temp_dir("batchmail-pipeline-blob");
    let cache = UploadCache::reset(dir.join("cache")).expect("cache");
    let sheet = vec![
        vec!["firstname".to_string(), "lastname".to_string(), "email".to_string()],
        vec!["Mia".to_string(), "Novak".to_string(), "mia@school.nl".to_string()],
    ];
    let roster = parse_roster(&sample::roster_xlsx(&sheet, &[]).expect("xlsx")).expect("roster");

    let resolution = resolve_entries(
        &[
            DropEntry::Blob {
                name: "Feedback: Novak, Mia.pdf".to_string(),
                data: b"%PDF".to_vec(),
            },
            DropEntry::Blob {
                name: "empty.pdf".to_string(),
                data: Vec::new(),
            },
        ],
        &cache,
    );
    assert_eq!(resolution.files.len(), 1);
    let stored = &resolution.files[0];
    assert_eq!(stored.name, "Feedback: Novak, Mia.pdf");
    assert!(stored.path.ends_with("Feedback_ Novak, Mia.pdf"));
    assert!(PathBuf::from(&stored.path).starts_with(cache.root()));

    let matches = compute_matches(&roster.students, &resolution.files);
    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].file_path, stored.path);
    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn dutch_and_english_headers_match_identically() {
    let dir = temp_dir("batchmail-pipeline-language");
    let drop = dir.join("drop");
    std::fs::create_dir_all(&drop).expect("mkdir");
    for name in ["Bakker, Jan - rubric.pdf", "sanne_de_vries.docx", "onbekend.pdf"] {
        std::fs::write(drop.join(name), b"%PDF").expect("write");
    }
    let cache = UploadCache::reset(dir.join("cache")).expect("cache");
    let pool = resolve_entries(&[DropEntry::Path(drop)], &cache).files;

    let body = [
        ["Jan", "Bakker", "jan@school.nl"],
        ["Sanne", "de Vries", "sanne@school.nl"],
        ["Piet", "Jansen", "piet@school.nl"],
    ];
    let workbook = |header: [&str; 3]| {
        let mut rows = vec![header.iter().map(|v| v.to_string()).collect::<Vec<_>>()];
        rows.extend(body.iter().map(|r| r.iter().map(|v| v.to_string()).collect()));
        parse_roster(&sample::roster_xlsx(&rows, &[]).expect("xlsx")).expect("roster")
    };
    let dutch = workbook(["Voornaam", "Achternaam", "Email"]);
    let english = workbook(["firstname", "lastname", "email"]);
    assert_eq!(dutch.source_language, roster::SourceLanguage::Dutch);
    assert_eq!(english.source_language, roster::SourceLanguage::English);

    let from_dutch = compute_matches(&dutch.students, &pool);
    let from_english = compute_matches(&english.students, &pool);
    assert_eq!(from_dutch.len(), 2);
    assert_eq!(from_dutch, from_english);
    let _ = std::fs::remove_dir_all(dir);
}
