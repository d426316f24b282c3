use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::collate;
use crate::resolver::ResolvedFile;
use crate::roster::PersonRecord;
use crate::tokenize::{name_tokens, tokenize_file_name, TokenSet};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MatchRecord {
    pub id: String,
    pub firstname: String,
    pub lastname: String,
    pub email: String,
    pub studentid: String,
    pub file_name: String,
    pub file_path: String,
}

/// Stable per-pairing key; changes whenever the person or the file does.
pub fn match_id(firstname: &str, lastname: &str, file_path: &str) -> String {
    [firstname, lastname, file_path]
        .iter()
        .map(|part| part.to_lowercase())
        .collect::<Vec<_>>()
        .join("|")
}

/// Pairs each person with the first unclaimed file whose name contains all
/// of their name tokens. Roster order decides who claims a file first; the
/// result is sorted by last name, then first name.
pub fn compute_matches(students: &[PersonRecord], files: &[ResolvedFile]) -> Vec<MatchRecord> {
    let pool: Vec<(&ResolvedFile, TokenSet)> = files
        .iter()
        .map(|file| (file, tokenize_file_name(&file.name)))
        .collect();
    let mut claimed = vec![false; pool.len()];
    let mut matches = Vec::new();

    for student in students {
        let firstname = student.firstname.trim();
        let lastname = student.lastname.trim();
        let wanted = name_tokens(firstname, lastname);
        if wanted.is_empty() {
            continue;
        }

        let hit = pool
            .iter()
            .enumerate()
            .find(|(idx, (_, tokens))| !claimed[*idx] && wanted.is_subset(tokens));
        let Some((idx, (file, _))) = hit else {
            continue;
        };
        claimed[idx] = true;

        matches.push(MatchRecord {
            id: match_id(firstname, lastname, &file.path),
            firstname: firstname.to_string(),
            lastname: lastname.to_string(),
            email: student.email.trim().to_string(),
            studentid: student.studentid.trim().to_string(),
            file_name: file.name.clone(),
            file_path: file.path.clone(),
        });
    }

    debug!(
        students = students.len(),
        files = files.len(),
        matched = matches.len(),
        "computed matches"
    );

    matches.sort_by(|a, b| {
        collate::compare(&a.lastname, &b.lastname)
            .then_with(|| collate::compare(&a.firstname, &b.firstname))
    });
    matches
}
