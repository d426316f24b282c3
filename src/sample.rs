//! Demo data: a roster workbook plus one feedback PDF per student.

use anyhow::{bail, Context};
use quick_xml::escape::escape;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

const FIRST_NAMES: [&str; 20] = [
    "Liam", "Noah", "Olivia", "Emma", "Ava", "Sophia", "Mason", "Ethan", "Isabella", "Mia",
    "Lucas", "Logan", "Harper", "Charlotte", "Amelia", "Evelyn", "Henry", "Sebastian", "Luna",
    "Ella",
];

const LAST_NAMES: [&str; 20] = [
    "Anderson", "Bennett", "Carter", "Diaz", "Edwards", "Foster", "Garcia", "Harrison", "Iverson",
    "Jacobs", "Kensington", "Lopez", "Montgomery", "Novak", "Owens", "Patel", "Quincy",
    "Reynolds", "Santiago", "Turner",
];

pub const SAMPLE_SIZE: usize = 60;

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">
  <Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>
  <Default Extension="xml" ContentType="application/xml"/>
  <Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>
  <Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>
</Types>"#;

const PACKAGE_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>
</Relationships>"#;

const WORKBOOK: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
  <sheets>
    <sheet name="Students" sheetId="1" r:id="rId1"/>
  </sheets>
</workbook>"#;

const WORKBOOK_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
</Relationships>"#;

/// An external hyperlink on a zero-based (row, column) cell.
#[derive(Debug, Clone)]
pub struct CellLink {
    pub row: u32,
    pub col: u32,
    pub target: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SampleStudent {
    pub firstname: String,
    pub lastname: String,
    pub email: String,
    pub studentid: String,
    pub slug: String,
}

#[derive(Debug, Clone)]
pub struct SampleSet {
    pub root: PathBuf,
    pub roster: PathBuf,
    pub files_dir: PathBuf,
    pub students: Vec<SampleStudent>,
}

fn column_name(mut col: u32) -> String {
    let mut name = Vec::new();
    loop {
        name.push(b'A' + (col % 26) as u8);
        if col < 26 {
            break;
        }
        col = col / 26 - 1;
    }
    name.reverse();
    String::from_utf8_lossy(&name).into_owned()
}

fn sheet_xml(rows: &[Vec<String>], links: &[CellLink]) -> String {
    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
         <worksheet xmlns=\"http://schemas.openxmlformats.org/spreadsheetml/2006/main\" \
         xmlns:r=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships\">\n<sheetData>\n",
    );
    for (r, row) in rows.iter().enumerate() {
        let r = r + 1;
        xml.push_str(&format!("<row r=\"{r}\">"));
        for (c, value) in row.iter().enumerate() {
            if value.is_empty() {
                continue;
            }
            xml.push_str(&format!(
                "<c r=\"{}{r}\" t=\"inlineStr\"><is><t>{}</t></is></c>",
                column_name(c as u32),
                escape(value.as_str())
            ));
        }
        xml.push_str("</row>\n");
    }
    xml.push_str("</sheetData>\n");
    if !links.is_empty() {
        xml.push_str("<hyperlinks>");
        for (i, link) in links.iter().enumerate() {
            xml.push_str(&format!(
                "<hyperlink ref=\"{}{}\" r:id=\"rIdLink{}\"/>",
                column_name(link.col),
                link.row + 1,
                i + 1
            ));
        }
        xml.push_str("</hyperlinks>\n");
    }
    xml.push_str("</worksheet>");
    xml
}

fn sheet_rels_xml(links: &[CellLink]) -> String {
    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
         <Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">\n",
    );
    for (i, link) in links.iter().enumerate() {
        xml.push_str(&format!(
            "<Relationship Id=\"rIdLink{}\" Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink\" Target=\"{}\" TargetMode=\"External\"/>\n",
            i + 1,
            escape(link.target.as_str())
        ));
    }
    xml.push_str("</Relationships>");
    xml
}

/// Builds a one-sheet `.xlsx` with every value stored as an inline string.
/// Empty strings leave the cell out, so a link can sit on a blank cell.
pub fn roster_xlsx(rows: &[Vec<String>], links: &[CellLink]) -> anyhow::Result<Vec<u8>> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut parts: Vec<(&str, String)> = vec![
        ("[Content_Types].xml", CONTENT_TYPES.to_string()),
        ("_rels/.rels", PACKAGE_RELS.to_string()),
        ("xl/workbook.xml", WORKBOOK.to_string()),
        ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS.to_string()),
        ("xl/worksheets/sheet1.xml", sheet_xml(rows, links)),
    ];
    if !links.is_empty() {
        parts.push(("xl/worksheets/_rels/sheet1.xml.rels", sheet_rels_xml(links)));
    }
    for (name, body) in parts {
        zip.start_file(name, options)
            .with_context(|| format!("failed to start {name}"))?;
        zip.write_all(body.as_bytes())
            .with_context(|| format!("failed to write {name}"))?;
    }
    let cursor = zip.finish().context("failed to finish workbook")?;
    Ok(cursor.into_inner())
}

/// A single-page PDF that shows `text` in Helvetica.
pub fn minimal_pdf(text: &str) -> Vec<u8> {
    let content = format!("BT /F1 24 Tf 72 720 Td ({text}) Tj ET");
    let stream = format!(
        "4 0 obj<< /Length {} >>stream\n{content}\nendstream endobj\n",
        content.len()
    );
    let objects: [&[u8]; 5] = [
        b"1 0 obj<< /Type /Catalog /Pages 2 0 R >>endobj\n",
        b"2 0 obj<< /Type /Pages /Kids [3 0 R] /Count 1 >>endobj\n",
        b"3 0 obj<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Resources << /Font << /F1 5 0 R >> >> /Contents 4 0 R >>endobj\n",
        stream.as_bytes(),
        b"5 0 obj<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica >>endobj\n",
    ];

    let mut pdf: Vec<u8> = b"%PDF-1.4\n%\xe2\xe3\xcf\xd3\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());
    for obj in objects {
        offsets.push(pdf.len());
        pdf.extend_from_slice(obj);
    }
    let xref_pos = pdf.len();
    pdf.extend_from_slice(format!("xref\n0 {}\n", objects.len() + 1).as_bytes());
    pdf.extend_from_slice(b"0000000000 65535 f \n");
    for offset in offsets {
        pdf.extend_from_slice(format!("{offset:010} 00000 n \n").as_bytes());
    }
    pdf.extend_from_slice(
        format!(
            "trailer<< /Size {} /Root 1 0 R >>\nstartxref\n{xref_pos}\n%%EOF",
            objects.len() + 1
        )
        .as_bytes(),
    );
    pdf
}

/// Splits an address into local part and domain; a bare local part gets
/// `gmail.com`.
pub fn normalize_email_base(value: &str) -> anyhow::Result<(String, String)> {
    let (local, domain) = value.split_once('@').unwrap_or((value, ""));
    let local = local.trim();
    let domain = match domain.trim() {
        "" => "gmail.com",
        d => d,
    };
    if local.is_empty() {
        bail!("Invalid Gmail address provided");
    }
    Ok((local.to_string(), domain.to_string()))
}

pub fn slugify(value: &str) -> String {
    let dashed: String = value
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect();
    dashed.trim_matches('-').replace("--", "-")
}

/// Sixty distinct name pairs, the same on every run.
pub fn sample_students(local: &str, domain: &str) -> Vec<SampleStudent> {
    (0..SAMPLE_SIZE)
        .map(|k| {
            let pair = (k * 37 + 11) % (FIRST_NAMES.len() * LAST_NAMES.len());
            let first = FIRST_NAMES[pair / LAST_NAMES.len()];
            let last = LAST_NAMES[pair % LAST_NAMES.len()];
            let n = k + 1;
            let slug = [slugify(first), slugify(last)]
                .into_iter()
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join("-");
            let slug = if slug.is_empty() { format!("student-{n:02}") } else { slug };
            SampleStudent {
                firstname: first.to_string(),
                lastname: last.to_string(),
                email: format!("{local}+{slug}-{n:02}@{domain}"),
                studentid: format!("S{n:04}"),
                slug,
            }
        })
        .collect()
}

/// Recreates `root` with `feedback-files/` and `student-sampleset.xlsx`.
pub fn create_sample_set(root: &Path, address: &str) -> anyhow::Result<SampleSet> {
    let (local, domain) = normalize_email_base(address)?;
    if root.exists() {
        std::fs::remove_dir_all(root)
            .with_context(|| format!("failed to remove {}", root.to_string_lossy()))?;
    }
    let files_dir = root.join("feedback-files");
    std::fs::create_dir_all(&files_dir)
        .with_context(|| format!("failed to create {}", files_dir.to_string_lossy()))?;

    let students = sample_students(&local, &domain);
    let mut rows = vec![vec![
        "firstname".to_string(),
        "lastname".to_string(),
        "email".to_string(),
        "studentid".to_string(),
    ]];
    for s in &students {
        let pdf_path = files_dir.join(format!("{}.pdf", s.slug));
        let pdf = minimal_pdf(&format!("Feedback for {} {}", s.firstname, s.lastname));
        std::fs::write(&pdf_path, pdf)
            .with_context(|| format!("failed to write {}", pdf_path.to_string_lossy()))?;
        rows.push(vec![
            s.firstname.clone(),
            s.lastname.clone(),
            s.email.clone(),
            s.studentid.clone(),
        ]);
    }

    let roster = root.join("student-sampleset.xlsx");
    std::fs::write(&roster, roster_xlsx(&rows, &[])?)
        .with_context(|| format!("failed to write {}", roster.to_string_lossy()))?;

    Ok(SampleSet {
        root: root.to_path_buf(),
        roster,
        files_dir,
        students,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn email_base_defaults_to_gmail() {
        assert_eq!(
            normalize_email_base(" docent ").expect("local only"),
            ("docent".to_string(), "gmail.com".to_string())
        );
        assert_eq!(
            normalize_email_base("docent@school.nl").expect("full"),
            ("docent".to_string(), "school.nl".to_string())
        );
        assert!(normalize_email_base("@school.nl").is_err());
    }

    #[test]
    fn slugs_are_lowercase_and_dashed() {
        assert_eq!(slugify("Anne-Marie O'Neil"), "anne-marie-o-neil");
        assert_eq!(slugify("  Émile "), "émile");
    }

    #[test]
    fn sample_students_are_distinct_and_stable() {
        let a = sample_students("me", "gmail.com");
        assert_eq!(a.len(), SAMPLE_SIZE);
        let pairs: HashSet<(String, String)> = a
            .iter()
            .map(|s| (s.firstname.clone(), s.lastname.clone()))
            .collect();
        assert_eq!(pairs.len(), SAMPLE_SIZE);
        assert_eq!(a, sample_students("me", "gmail.com"));
        assert_eq!(a[0].studentid, "S0001");
        assert!(a[0].email.starts_with(&format!("me+{}-01@", a[0].slug)));
    }

    #[test]
    fn column_names_roll_over() {
        assert_eq!(column_name(0), "A");
        assert_eq!(column_name(25), "Z");
        assert_eq!(column_name(26), "AA");
    }

    #[test]
    fn pdf_has_header_and_trailer() {
        let pdf = minimal_pdf("Feedback for Jan");
        assert!(pdf.starts_with(b"%PDF-1.4"));
        assert!(pdf.ends_with(b"%%EOF"));
    }
}
