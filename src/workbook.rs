use anyhow::{anyhow, Context};
use calamine::{open_workbook_auto, Data, Reader, Sheets};
use quick_xml::escape::escape;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::table::Table;

/// Load the first sheet of an xlsx as a `Table`. A missing file bootstraps an
/// empty table instead of failing: the store starts life as a blank sheet.
/// Header cells are trimmed on the way in; data cells are kept verbatim.
pub fn load(path: &Path) -> anyhow::Result<Table> {
    if !path.exists() {
        return Ok(Table::default());
    }

    let mut excel: Sheets<_> = open_workbook_auto(path)
        .with_context(|| format!("failed to open workbook {}", path.display()))?;
    let sheet_names = excel.sheet_names();
    let Some(first) = sheet_names.first().cloned() else {
        return Err(anyhow!("workbook {} has no sheets", path.display()));
    };
    let range = excel
        .worksheet_range(&first)
        .with_context(|| format!("failed to read sheet {:?} of {}", first, path.display()))?;

    let mut rows_iter = range.rows();
    let Some(header_row) = rows_iter.next() else {
        return Ok(Table::default());
    };
    let header: Vec<String> = header_row
        .iter()
        .map(|c| cell_to_string(c).trim().to_string())
        .collect();
    let rows: Vec<Vec<String>> = rows_iter
        .map(|r| r.iter().map(cell_to_string).collect())
        .collect();

    Ok(Table::new(header, rows))
}

/// Rewrite the whole xlsx from the in-memory table: single sheet, every cell
/// an inline string. The bytes go to a temp sibling first and are renamed into
/// place, so a failed write never truncates the store. There is no cross
/// process lock; racing writers are last-writer-wins (see the interleaving
/// test below).
pub fn save(path: &Path, table: &Table, sheet_name: &str) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }

    let tmp = path.with_extension("xlsx.writing");
    let out = File::create(&tmp)
        .with_context(|| format!("failed to create temp workbook {}", tmp.display()))?;
    let mut zip = ZipWriter::new(out);
    let opts = FileOptions::default().compression_method(CompressionMethod::Deflated);

    zip.start_file("[Content_Types].xml", opts)
        .context("failed to start content types entry")?;
    zip.write_all(CONTENT_TYPES_XML.as_bytes())
        .context("failed to write content types entry")?;

    zip.start_file("_rels/.rels", opts)
        .context("failed to start package rels entry")?;
    zip.write_all(PACKAGE_RELS_XML.as_bytes())
        .context("failed to write package rels entry")?;

    zip.start_file("xl/workbook.xml", opts)
        .context("failed to start workbook entry")?;
    zip.write_all(workbook_xml(sheet_name).as_bytes())
        .context("failed to write workbook entry")?;

    zip.start_file("xl/_rels/workbook.xml.rels", opts)
        .context("failed to start workbook rels entry")?;
    zip.write_all(WORKBOOK_RELS_XML.as_bytes())
        .context("failed to write workbook rels entry")?;

    zip.start_file("xl/worksheets/sheet1.xml", opts)
        .context("failed to start worksheet entry")?;
    zip.write_all(sheet_xml(table).as_bytes())
        .context("failed to write worksheet entry")?;

    zip.finish().context("failed to finalize workbook")?;

    std::fs::rename(&tmp, path).with_context(|| {
        format!(
            "failed to move workbook into place at {}",
            path.display()
        )
    })?;
    Ok(())
}

fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => {
            // Whole-number floats print as integers so a roll "7" survives a
            // trip through a numeric cell.
            if f.fract() == 0.0 && f.is_finite() && f.abs() < 1e15 {
                format!("{}", *f as i64)
            } else {
                f.to_string()
            }
        }
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => dt.as_f64().to_string(),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Error(_) => String::new(),
    }
}

const CONTENT_TYPES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/></Types>"#;

const PACKAGE_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

const WORKBOOK_RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#;

fn workbook_xml(sheet_name: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="{}" sheetId="1" r:id="rId1"/></sheets></workbook>"#,
        escape(sheet_name)
    )
}

fn sheet_xml(table: &Table) -> String {
    let mut body = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>"#,
    );

    let mut all_rows: Vec<&[String]> = Vec::with_capacity(table.rows.len() + 1);
    if !table.is_empty() {
        all_rows.push(&table.header);
        for row in &table.rows {
            all_rows.push(row);
        }
    }

    for (r, row) in all_rows.iter().enumerate() {
        body.push_str(&format!(r#"<row r="{}">"#, r + 1));
        for (c, cell) in row.iter().enumerate() {
            body.push_str(&format!(
                r#"<c r="{}{}" t="inlineStr"><is><t xml:space="preserve">{}</t></is></c>"#,
                column_ref(c),
                r + 1,
                escape(cell.as_str())
            ));
        }
        body.push_str("</row>");
    }

    body.push_str("</sheetData></worksheet>");
    body
}

/// 0-based column index to spreadsheet letters (0 → A, 26 → AA).
fn column_ref(mut idx: usize) -> String {
    let mut out = Vec::new();
    loop {
        out.push(b'A' + (idx % 26) as u8);
        if idx < 26 {
            break;
        }
        idx = idx / 26 - 1;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}
