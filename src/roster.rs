use calamine::{open_workbook_auto_from_rs, Data, Range, Reader};
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use thiserror::Error;
use tracing::{debug, info};

use crate::xlsx_links::{self, SheetLinks};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceLanguage {
    Dutch,
    English,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonRecord {
    pub firstname: String,
    pub lastname: String,
    pub email: String,
    pub studentid: String,
    pub source_language: SourceLanguage,
}

impl PersonRecord {
    fn blank(source_language: SourceLanguage) -> Self {
        Self {
            firstname: String::new(),
            lastname: String::new(),
            email: String::new(),
            studentid: String::new(),
            source_language,
        }
    }

    fn field(&self, field: Field) -> &str {
        match field {
            Field::FirstName => &self.firstname,
            Field::LastName => &self.lastname,
            Field::Email => &self.email,
            Field::StudentId => &self.studentid,
        }
    }

    fn set(&mut self, field: Field, value: &str) {
        let slot = match field {
            Field::FirstName => &mut self.firstname,
            Field::LastName => &mut self.lastname,
            Field::Email => &mut self.email,
            Field::StudentId => &mut self.studentid,
        };
        *slot = value.to_string();
    }

    /// Export tools sometimes repeat the header row inside the data.
    fn repeats_header(&self) -> bool {
        [&self.firstname, &self.lastname, &self.email]
            .iter()
            .any(|v| HEADER_WORDS.contains(&v.to_lowercase().as_str()))
    }

    fn is_blank(&self) -> bool {
        self.firstname.is_empty() && self.lastname.is_empty() && self.email.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Roster {
    pub source_language: SourceLanguage,
    pub students: Vec<PersonRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    FirstName,
    LastName,
    Email,
    StudentId,
}

impl Field {
    fn as_str(self) -> &'static str {
        match self {
            Field::FirstName => "firstname",
            Field::LastName => "lastname",
            Field::Email => "email",
            Field::StudentId => "studentid",
        }
    }
}

const REQUIRED_FIELDS: [Field; 3] = [Field::FirstName, Field::LastName, Field::Email];

const HEADER_SYNONYMS: &[(&str, Field, Option<SourceLanguage>)] = &[
    ("voornaam", Field::FirstName, Some(SourceLanguage::Dutch)),
    ("achternaam", Field::LastName, Some(SourceLanguage::Dutch)),
    ("firstname", Field::FirstName, Some(SourceLanguage::English)),
    ("first name", Field::FirstName, Some(SourceLanguage::English)),
    ("lastname", Field::LastName, Some(SourceLanguage::English)),
    ("last name", Field::LastName, Some(SourceLanguage::English)),
    ("email", Field::Email, None),
    ("email address", Field::Email, None),
    ("studentid", Field::StudentId, None),
    ("student id", Field::StudentId, None),
    ("id", Field::StudentId, None),
];

const HEADER_WORDS: &[&str] = &[
    "voornaam",
    "achternaam",
    "email",
    "firstname",
    "lastname",
    "first name",
    "last name",
];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RosterError {
    #[error("Workbook does not contain any sheets.")]
    EmptyWorkbook,
    #[error("Worksheet does not contain any data.")]
    EmptySheet,
    #[error("Missing required column(s): {}", .0.join(", "))]
    MissingColumns(Vec<String>),
    #[error("Unable to read spreadsheet: {0}")]
    UnreadableFile(String),
}

impl RosterError {
    pub fn code(&self) -> &'static str {
        match self {
            RosterError::EmptyWorkbook => "empty_workbook",
            RosterError::EmptySheet => "empty_sheet",
            RosterError::MissingColumns(_) => "missing_columns",
            RosterError::UnreadableFile(_) => "unreadable_file",
        }
    }
}

/// A worksheet cell as the normalizer sees it.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Bool(bool),
    Formula { result: Box<Cell> },
    Link { text: Option<String>, target: String },
}

impl Cell {
    pub fn display_text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.clone(),
            Cell::Number(n) => n.to_string(),
            Cell::Bool(b) => b.to_string(),
            Cell::Formula { result } => result.display_text(),
            Cell::Link { text: Some(text), .. } => text.clone(),
            Cell::Link { text: None, target } => target.clone(),
        }
    }
}

impl From<&Data> for Cell {
    fn from(data: &Data) -> Self {
        match data {
            Data::Empty => Cell::Empty,
            Data::String(s) => Cell::Text(s.clone()),
            Data::Float(f) => Cell::Number(*f),
            Data::Int(n) => Cell::Number(*n as f64),
            Data::Bool(b) => Cell::Bool(*b),
            Data::DateTime(dt) => Cell::Number(dt.as_f64()),
            Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
            Data::Error(e) => Cell::Text(e.to_string()),
        }
    }
}

/// Parses a spreadsheet buffer and normalizes its first worksheet.
pub fn parse_roster(bytes: &[u8]) -> Result<Roster, RosterError> {
    let rows = read_first_sheet(bytes)?;
    let roster = normalize_rows(&rows)?;
    info!(
        students = roster.students.len(),
        language = ?roster.source_language,
        "roster parsed"
    );
    Ok(roster)
}

/// Reads the first worksheet into rows of cells. Formula cells keep their
/// cached result; empty cells carrying a hyperlink become links.
pub fn read_first_sheet(bytes: &[u8]) -> Result<Vec<Vec<Cell>>, RosterError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
        .map_err(|e| RosterError::UnreadableFile(e.to_string()))?;

    let sheet_names = workbook.sheet_names();
    let Some(first_sheet) = sheet_names.first() else {
        return Err(RosterError::EmptyWorkbook);
    };

    let values = workbook
        .worksheet_range(first_sheet)
        .map_err(|e| RosterError::UnreadableFile(e.to_string()))?;
    let formulas = match workbook.worksheet_formula(first_sheet) {
        Ok(range) => Some(range),
        Err(e) => {
            debug!("formula range unavailable: {e}");
            None
        }
    };
    let links = xlsx_links::first_sheet_hyperlinks(bytes);

    Ok(collect_rows(&values, formulas.as_ref(), &links))
}

fn collect_rows(
    values: &Range<Data>,
    formulas: Option<&Range<String>>,
    links: &SheetLinks,
) -> Vec<Vec<Cell>> {
    let Some((row0, col0)) = values.start() else {
        return Vec::new();
    };

    values
        .rows()
        .enumerate()
        .map(|(r, row)| {
            row.iter()
                .enumerate()
                .map(|(c, data)| {
                    let pos = (row0 + r as u32, col0 + c as u32);
                    let cell = Cell::from(data);
                    let has_formula = formulas
                        .and_then(|f| f.get_value(pos))
                        .is_some_and(|f| !f.is_empty());
                    match (cell, links.target_at(pos)) {
                        (cell, _) if has_formula => Cell::Formula {
                            result: Box::new(cell),
                        },
                        (Cell::Empty, Some(target)) => Cell::Link {
                            text: None,
                            target: target.to_string(),
                        },
                        (cell, _) => cell,
                    }
                })
                .collect()
        })
        .collect()
}

fn match_header(text: &str) -> Option<(Field, Option<SourceLanguage>)> {
    let key = text.trim().to_lowercase();
    HEADER_SYNONYMS
        .iter()
        .find(|(synonym, _, _)| *synonym == key)
        .map(|(_, field, language)| (*field, *language))
}

/// Turns worksheet rows into person records. The first non-blank row is
/// the header row.
pub fn normalize_rows(rows: &[Vec<Cell>]) -> Result<Roster, RosterError> {
    let mut text_rows = rows
        .iter()
        .map(|row| row.iter().map(Cell::display_text).collect::<Vec<_>>())
        .filter(|row| row.iter().any(|v| !v.trim().is_empty()));

    let Some(header) = text_rows.next() else {
        return Err(RosterError::EmptySheet);
    };

    let columns: Vec<Option<(Field, Option<SourceLanguage>)>> =
        header.iter().map(|h| match_header(h)).collect();
    let source_language = if columns
        .iter()
        .flatten()
        .any(|(_, lang)| *lang == Some(SourceLanguage::Dutch))
    {
        SourceLanguage::Dutch
    } else {
        SourceLanguage::English
    };

    let mut students = Vec::new();
    for row in text_rows {
        let mut record = PersonRecord::blank(source_language);
        for (idx, column) in columns.iter().enumerate() {
            let Some((field, _)) = column else {
                continue;
            };
            let value = row.get(idx).map(|v| v.trim()).unwrap_or("");
            if !value.is_empty() {
                record.set(*field, value);
            }
        }
        if record.repeats_header() {
            debug!("skipping repeated header row");
            continue;
        }
        students.push(record);
    }

    let missing: Vec<String> = REQUIRED_FIELDS
        .iter()
        .filter(|field| students.iter().all(|s| s.field(**field).is_empty()))
        .map(|field| field.as_str().to_string())
        .collect();
    if !missing.is_empty() {
        return Err(RosterError::MissingColumns(missing));
    }

    students.retain(|s| !s.is_blank());
    Ok(Roster {
        source_language,
        students,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(values: &[&str]) -> Vec<Cell> {
        values
            .iter()
            .map(|v| {
                if v.is_empty() {
                    Cell::Empty
                } else {
                    Cell::Text(v.to_string())
                }
            })
            .collect()
    }

    #[test]
    fn dutch_headers_mark_whole_sheet_dutch() {
        let rows = vec![
            row(&["Voornaam", "Achternaam", "Email"]),
            row(&["Ana", "Devi", "ana@x.com"]),
        ];
        let roster = normalize_rows(&rows).expect("normalize");
        assert_eq!(roster.source_language, SourceLanguage::Dutch);
        assert_eq!(roster.students.len(), 1);
        let ana = &roster.students[0];
        assert_eq!(ana.firstname, "Ana");
        assert_eq!(ana.lastname, "Devi");
        assert_eq!(ana.email, "ana@x.com");
        assert_eq!(ana.studentid, "");
        assert_eq!(ana.source_language, SourceLanguage::Dutch);
    }

    #[test]
    fn english_headers_are_case_and_space_insensitive() {
        let rows = vec![
            row(&["  First Name ", "LAST NAME", "Email Address", "Student ID"]),
            row(&[" Jan ", "Bakker", "jan@x.nl", "S1"]),
        ];
        let roster = normalize_rows(&rows).expect("normalize");
        assert_eq!(roster.source_language, SourceLanguage::English);
        assert_eq!(roster.students[0].firstname, "Jan");
        assert_eq!(roster.students[0].studentid, "S1");
    }

    #[test]
    fn missing_email_column_is_reported() {
        let rows = vec![
            row(&["firstname", "lastname", "notes"]),
            row(&["Jan", "Bakker", "late"]),
        ];
        let err = normalize_rows(&rows).expect_err("should fail");
        assert_eq!(err, RosterError::MissingColumns(vec!["email".to_string()]));
        assert_eq!(err.code(), "missing_columns");
        assert_eq!(err.to_string(), "Missing required column(s): email");
    }

    #[test]
    fn every_missing_required_column_is_named() {
        let rows = vec![row(&["id", "other"]), row(&["1", "x"])];
        let err = normalize_rows(&rows).expect_err("should fail");
        assert_eq!(
            err,
            RosterError::MissingColumns(vec![
                "firstname".to_string(),
                "lastname".to_string(),
                "email".to_string()
            ])
        );
    }

    #[test]
    fn sparse_column_is_not_missing() {
        let rows = vec![
            row(&["firstname", "lastname", "email"]),
            row(&["Jan", "Bakker", ""]),
            row(&["Piet", "Jansen", "piet@x.nl"]),
        ];
        let roster = normalize_rows(&rows).expect("normalize");
        assert_eq!(roster.students.len(), 2);
        assert_eq!(roster.students[0].email, "");
    }

    #[test]
    fn empty_sheet_and_blank_only_rows() {
        assert_eq!(normalize_rows(&[]), Err(RosterError::EmptySheet));
        let blanks = vec![row(&["", " "]), row(&[])];
        assert_eq!(normalize_rows(&blanks), Err(RosterError::EmptySheet));
    }

    #[test]
    fn repeated_header_rows_are_discarded() {
        let rows = vec![
            row(&["Voornaam", "Achternaam", "Email"]),
            row(&["Voornaam", "Achternaam", "Email"]),
            row(&["Ana", "Devi", "ana@x.com"]),
            row(&["FirstName", "x", "y"]),
        ];
        let roster = normalize_rows(&rows).expect("normalize");
        assert_eq!(roster.students.len(), 1);
        assert_eq!(roster.students[0].firstname, "Ana");
    }

    #[test]
    fn rows_without_name_or_email_are_dropped_in_order() {
        let rows = vec![
            row(&["firstname", "lastname", "email", "studentid"]),
            row(&["B", "Two", "b@x", ""]),
            row(&["", "", "", "S9"]),
            row(&["A", "One", "a@x", ""]),
        ];
        let roster = normalize_rows(&rows).expect("normalize");
        let names: Vec<&str> = roster.students.iter().map(|s| s.firstname.as_str()).collect();
        assert_eq!(names, ["B", "A"]);
    }

    #[test]
    fn unrecognized_headers_are_ignored() {
        let rows = vec![
            row(&["class", "firstname", "lastname", "email"]),
            row(&["4B", "Jan", "Bakker", "jan@x.nl"]),
        ];
        let roster = normalize_rows(&rows).expect("normalize");
        assert_eq!(roster.students[0].firstname, "Jan");
    }

    #[test]
    fn cell_values_collapse_to_text() {
        assert_eq!(Cell::Number(12345.0).display_text(), "12345");
        assert_eq!(Cell::Number(1.5).display_text(), "1.5");
        assert_eq!(Cell::Bool(true).display_text(), "true");
        let formula = Cell::Formula {
            result: Box::new(Cell::Text("Bakker".into())),
        };
        assert_eq!(formula.display_text(), "Bakker");
        let bare_link = Cell::Link {
            text: None,
            target: "mailto:jan@x.nl".into(),
        };
        assert_eq!(bare_link.display_text(), "mailto:jan@x.nl");
        let labelled = Cell::Link {
            text: Some("Jan".into()),
            target: "https://x".into(),
        };
        assert_eq!(labelled.display_text(), "Jan");
    }

    #[test]
    fn numeric_student_ids_and_formula_names_normalize() {
        let rows = vec![
            row(&["firstname", "lastname", "email", "id"]),
            vec![
                Cell::Formula {
                    result: Box::new(Cell::Text(" Jan ".into())),
                },
                Cell::Text("Bakker".into()),
                Cell::Link {
                    text: None,
                    target: "jan@x.nl".into(),
                },
                Cell::Number(20231.0),
            ],
        ];
        let roster = normalize_rows(&rows).expect("normalize");
        let jan = &roster.students[0];
        assert_eq!(jan.firstname, "Jan");
        assert_eq!(jan.email, "jan@x.nl");
        assert_eq!(jan.studentid, "20231");
    }

    #[test]
    fn garbage_bytes_are_unreadable() {
        let err = parse_roster(b"definitely not a spreadsheet").expect_err("should fail");
        assert_eq!(err.code(), "unreadable_file");
    }
}
