//! Minimal `.xlsx` reader: one named sheet → positional rows of cell text.
//!
//! Resolves the sheet through `xl/workbook.xml` and its relationships part,
//! then reads `<sheetData>`; shared strings, inline strings, booleans and raw
//! numeric text are supported. Formatting, formulas and dates are not
//! interpreted (cached values are returned as written).

use std::io::{Read, Seek};
use std::path::Path;

use hashbrown::HashMap;
use zip::ZipArchive;

use crate::document::xml::{XmlDocument, XmlElement};
use crate::{Error, Result};

/// Rows of a sheet, indexed positionally; `None` marks an empty cell.
pub type SheetRows = Vec<Vec<Option<String>>>;

const WORKBOOK_PART: &str = "xl/workbook.xml";
const WORKBOOK_RELS_PART: &str = "xl/_rels/workbook.xml.rels";
const SHARED_STRINGS_PART: &str = "xl/sharedStrings.xml";

/// Sheet bounds of the format: rows 1..=1048576, columns A..=XFD.
const MAX_ROWS: usize = 1_048_576;
const MAX_COLUMNS: usize = 16_384;

pub struct Workbook<R: Read + Seek> {
    archive: ZipArchive<R>,
    shared_strings: Vec<String>,
    /// Sheet name → part path inside the archive.
    sheets: Vec<(String, String)>,
}

impl Workbook<std::fs::File> {
    pub fn open(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }
}

impl<R: Read + Seek> Workbook<R> {
    pub fn from_reader(reader: R) -> Result<Self> {
        let mut archive = ZipArchive::new(reader).map_err(|e| Error::Workbook(e.to_string()))?;

        let workbook = XmlDocument::parse(&read_part(&mut archive, WORKBOOK_PART)?)?;
        let rels = XmlDocument::parse(&read_part(&mut archive, WORKBOOK_RELS_PART)?)?;
        let targets: HashMap<&str, &str> = rels
            .root
            .descendants("Relationship")
            .into_iter()
            .filter_map(|r| Some((r.attribute("Id")?, r.attribute("Target")?)))
            .collect();

        let mut sheets = Vec::new();
        for sheet in workbook.root.descendants("sheet") {
            let (Some(name), Some(rel)) = (sheet.attribute("name"), sheet.attribute("r:id")) else {
                continue;
            };
            match targets.get(rel) {
                Some(target) => sheets.push((name.to_string(), part_path(target))),
                None => tracing::warn!(sheet = name, rel, "sheet relationship not found"),
            }
        }

        let shared_strings = if archive.index_for_name(SHARED_STRINGS_PART).is_some() {
            let doc = XmlDocument::parse(&read_part(&mut archive, SHARED_STRINGS_PART)?)?;
            doc.root.children_named("si").map(shared_string_text).collect()
        } else {
            Vec::new()
        };

        Ok(Self { archive, shared_strings, sheets })
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// All rows of the named sheet. Rows and columns keep their positions
    /// (row 1 is index 0, column A is index 0); gaps are filled with `None`.
    pub fn rows(&mut self, sheet: &str) -> Result<SheetRows> {
        let part = self
            .sheets
            .iter()
            .find(|(name, _)| name == sheet)
            .map(|(_, part)| part.clone())
            .ok_or_else(|| Error::NotFound(format!("sheet '{sheet}'")))?;
        let doc = XmlDocument::parse(&read_part(&mut self.archive, &part)?)?;

        let mut rows: SheetRows = Vec::new();
        let Some(data) = doc.root.find("sheetData") else { return Ok(rows) };
        for row in data.children_named("row") {
            let row_index = match row.attribute("r").and_then(|r| r.parse::<usize>().ok()) {
                Some(r) if r > 0 => r - 1,
                _ => rows.len(),
            };
            if row_index >= MAX_ROWS {
                return Err(Error::Workbook(format!("{sheet}: row {} beyond the sheet limit", row_index + 1)));
            }
            if rows.len() <= row_index {
                rows.resize(row_index + 1, Vec::new());
            }

            let cells = &mut rows[row_index];
            for cell in row.children_named("c") {
                let col = match cell.attribute("r") {
                    Some(reference) => column_index(reference)?,
                    None => None,
                }
                .unwrap_or(cells.len());
                if col >= MAX_COLUMNS {
                    return Err(Error::Workbook(format!("{sheet}: column {} beyond the sheet limit", col + 1)));
                }
                if cells.len() <= col {
                    cells.resize(col + 1, None);
                }
                cells[col] = self.cell_value(cell);
            }
        }
        Ok(rows)
    }

    fn cell_value(&self, cell: &XmlElement) -> Option<String> {
        let raw = cell.child("v").map(XmlElement::text);
        let value = match cell.attribute("t") {
            Some("s") => raw
                .and_then(|v| v.parse::<usize>().ok())
                .and_then(|i| self.shared_strings.get(i).cloned()),
            Some("inlineStr") => cell.child("is").map(shared_string_text),
            Some("b") => raw.map(|v| if v == "1" { "TRUE".into() } else { "FALSE".into() }),
            _ => raw,
        };
        value.filter(|v| !v.is_empty())
    }
}

fn read_part<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Result<String> {
    let mut file = archive
        .by_name(name)
        .map_err(|e| Error::Workbook(format!("{name}: {e}")))?;
    let mut text = String::new();
    file.read_to_string(&mut text)?;
    Ok(text)
}

/// Relationship targets are relative to `xl/` unless absolute.
fn part_path(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("xl/{target}"),
    }
}

/// Text of an `<si>` / `<is>` element: plain `<t>` or rich-text runs,
/// phonetic hints excluded.
fn shared_string_text(si: &XmlElement) -> String {
    if let Some(t) = si.child("t") {
        return t.deep_text();
    }
    si.children_named("r")
        .filter_map(|run| run.child("t"))
        .map(XmlElement::deep_text)
        .collect()
}

/// Zero-based column of a cell reference such as `AB12`; `None` when the
/// reference carries no column letters.
fn column_index(reference: &str) -> Result<Option<usize>> {
    let letters: Vec<u8> = reference
        .bytes()
        .take_while(|b| b.is_ascii_alphabetic())
        .map(|b| b.to_ascii_uppercase())
        .collect();
    if letters.is_empty() {
        return Ok(None);
    }
    let index = letters
        .iter()
        .try_fold(0usize, |acc, b| acc.checked_mul(26)?.checked_add(usize::from(b - b'A' + 1)))
        .filter(|&index| index <= MAX_COLUMNS)
        .ok_or_else(|| Error::Workbook(format!("cell '{reference}' beyond column XFD")))?;
    Ok(Some(index - 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_index() {
        assert_eq!(column_index("A1").unwrap(), Some(0));
        assert_eq!(column_index("C7").unwrap(), Some(2));
        assert_eq!(column_index("Z3").unwrap(), Some(25));
        assert_eq!(column_index("AB12").unwrap(), Some(27));
        assert_eq!(column_index("XFD1").unwrap(), Some(16_383));
        assert_eq!(column_index("12").unwrap(), None);
    }

    #[test]
    fn test_column_index_rejects_out_of_range() {
        assert!(matches!(column_index("XFE1"), Err(Error::Workbook(_))));
        assert!(matches!(column_index("AAAAAAAAAAAAAAAAAAAA1"), Err(Error::Workbook(_))));
    }

    #[test]
    fn test_part_path() {
        assert_eq!(part_path("worksheets/sheet1.xml"), "xl/worksheets/sheet1.xml");
        assert_eq!(part_path("/xl/worksheets/sheet2.xml"), "xl/worksheets/sheet2.xml");
    }

    #[test]
    fn test_rich_text_shared_string() {
        let doc = XmlDocument::parse(
            "<si><r><t>Fire </t></r><r><rPr/><t>rating</t></r><rPh><t>x</t></rPh></si>",
        ).unwrap();
        assert_eq!(shared_string_text(&doc.root), "Fire rating");
    }

    #[test]
    fn test_preserved_space_run_is_kept() {
        let doc = XmlDocument::parse(
            r#"<si><r><t>Fire</t></r><r><rPr/><t xml:space="preserve"> </t></r><r><t>rating</t></r></si>"#,
        ).unwrap();
        assert_eq!(shared_string_text(&doc.root), "Fire rating");

        let doc = XmlDocument::parse(r#"<si><t xml:space="preserve"> </t></si>"#).unwrap();
        assert_eq!(shared_string_text(&doc.root), " ");
    }
}
