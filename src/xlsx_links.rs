//! Hyperlink targets of the first worksheet, read straight from the xlsx
//! package. calamine only hands back cell values, so a cell that holds
//! nothing but a link would otherwise look empty.

use anyhow::Context;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::HashMap;
use std::io::{Cursor, Read, Seek};
use tracing::debug;
use zip::ZipArchive;

/// Zero-based (row, column), the same addressing calamine uses.
pub type CellPos = (u32, u32);

/// One `<hyperlink>` anchor, kept as the rectangle it covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkRange {
    pub start: CellPos,
    pub end: CellPos,
    pub target: String,
}

impl LinkRange {
    fn contains(&self, (row, col): CellPos) -> bool {
        (self.start.0..=self.end.0).contains(&row) && (self.start.1..=self.end.1).contains(&col)
    }
}

/// Hyperlinks of a worksheet in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SheetLinks {
    ranges: Vec<LinkRange>,
}

impl SheetLinks {
    /// Later anchors win where ranges overlap.
    pub fn target_at(&self, pos: CellPos) -> Option<&str> {
        self.ranges
            .iter()
            .rev()
            .find(|r| r.contains(pos))
            .map(|r| r.target.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }
}

/// Best effort: anything that is not an xlsx package, or is malformed,
/// yields no links.
pub fn first_sheet_hyperlinks(bytes: &[u8]) -> SheetLinks {
    match read_hyperlinks(bytes) {
        Ok(links) => links,
        Err(e) => {
            debug!("no hyperlink overlay: {e:#}");
            SheetLinks::default()
        }
    }
}

struct Anchor {
    cell_ref: String,
    rel_id: Option<String>,
    location: Option<String>,
}

fn read_hyperlinks(bytes: &[u8]) -> anyhow::Result<SheetLinks> {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).context("not a zip package")?;

    let workbook = read_entry(&mut archive, "xl/workbook.xml")?;
    let Some(sheet_rel) = first_sheet_rel_id(&workbook)? else {
        return Ok(SheetLinks::default());
    };
    let workbook_rels = parse_relationships(&read_entry(&mut archive, "xl/_rels/workbook.xml.rels")?)?;
    let Some(target) = workbook_rels.get(&sheet_rel) else {
        return Ok(SheetLinks::default());
    };

    let sheet_path = resolve_part("xl", target);
    let anchors = parse_anchors(&read_entry(&mut archive, &sheet_path)?)?;
    if anchors.is_empty() {
        return Ok(SheetLinks::default());
    }
    let sheet_rels = match read_entry(&mut archive, &rels_path_for(&sheet_path)) {
        Ok(xml) => parse_relationships(&xml)?,
        Err(_) => HashMap::new(),
    };

    let mut ranges = Vec::new();
    for anchor in anchors {
        let target = anchor
            .rel_id
            .as_ref()
            .and_then(|id| sheet_rels.get(id).cloned())
            .or(anchor.location);
        let Some(target) = target else {
            continue;
        };
        let Some((start, end)) = parse_range(&anchor.cell_ref) else {
            continue;
        };
        ranges.push(LinkRange { start, end, target });
    }
    Ok(SheetLinks { ranges })
}

fn read_entry<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> anyhow::Result<String> {
    let mut entry = archive
        .by_name(name)
        .with_context(|| format!("package missing {name}"))?;
    let mut text = String::new();
    entry
        .read_to_string(&mut text)
        .with_context(|| format!("failed to read {name}"))?;
    Ok(text)
}

fn first_sheet_rel_id(workbook_xml: &str) -> anyhow::Result<Option<String>> {
    let mut reader = Reader::from_str(workbook_xml);
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"sheet" => {
                for attr in e.attributes().flatten() {
                    if attr.key.local_name().as_ref() == b"id" {
                        return Ok(Some(attr.unescape_value()?.into_owned()));
                    }
                }
            }
            Event::Eof => return Ok(None),
            _ => {}
        }
    }
}

fn parse_relationships(xml: &str) -> anyhow::Result<HashMap<String, String>> {
    let mut reader = Reader::from_str(xml);
    let mut rels = HashMap::new();
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                let mut id = None;
                let mut target = None;
                for attr in e.attributes().flatten() {
                    match attr.key.local_name().as_ref() {
                        b"Id" => id = Some(attr.unescape_value()?.into_owned()),
                        b"Target" => target = Some(attr.unescape_value()?.into_owned()),
                        _ => {}
                    }
                }
                if let (Some(id), Some(target)) = (id, target) {
                    rels.insert(id, target);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(rels)
}

fn parse_anchors(sheet_xml: &str) -> anyhow::Result<Vec<Anchor>> {
    let mut reader = Reader::from_str(sheet_xml);
    let mut anchors = Vec::new();
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"hyperlink" => {
                let mut cell_ref = None;
                let mut rel_id = None;
                let mut location = None;
                for attr in e.attributes().flatten() {
                    let value = attr.unescape_value()?.into_owned();
                    match attr.key.local_name().as_ref() {
                        b"ref" => cell_ref = Some(value),
                        b"id" => rel_id = Some(value),
                        b"location" => location = Some(value),
                        _ => {}
                    }
                }
                if let Some(cell_ref) = cell_ref {
                    anchors.push(Anchor {
                        cell_ref,
                        rel_id,
                        location,
                    });
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(anchors)
}

/// Resolves a relationship target against the folder of its source part.
fn resolve_part(base_dir: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }
    let mut parts: Vec<&str> = base_dir.split('/').filter(|p| !p.is_empty()).collect();
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    parts.join("/")
}

fn rels_path_for(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{dir}/_rels/{file}.rels"),
        None => format!("_rels/{part}.rels"),
    }
}

/// `B3` -> (2, 1). Column letters are base 26 with A = 1.
fn parse_cell_ref(cell_ref: &str) -> Option<CellPos> {
    let cell_ref = cell_ref.trim().replace('$', "");
    let split = cell_ref.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = cell_ref.split_at(split);
    if letters.is_empty() {
        return None;
    }
    let mut col: u32 = 0;
    for c in letters.chars() {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        col = col
            .checked_mul(26)?
            .checked_add(c.to_ascii_uppercase() as u32 - 'A' as u32 + 1)?;
    }
    let row: u32 = digits.parse().ok()?;
    if row == 0 {
        return None;
    }
    Some((row - 1, col - 1))
}

/// `A1` or `A1:C3`, normalized so `start` is the top-left corner.
fn parse_range(cell_ref: &str) -> Option<(CellPos, CellPos)> {
    let (a, b) = match cell_ref.split_once(':') {
        Some((a, b)) => (parse_cell_ref(a)?, parse_cell_ref(b)?),
        None => {
            let single = parse_cell_ref(cell_ref)?;
            (single, single)
        }
    };
    Some(((a.0.min(b.0), a.1.min(b.1)), (a.0.max(b.0), a.1.max(b.1))))
}
