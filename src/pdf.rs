use anyhow::{anyhow, Context};
use printpdf::{BuiltinFont, IndirectFontRef, Mm, PdfDocument, PdfLayerReference};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const MARGIN_MM: f32 = 40.0;
const BOTTOM_MM: f32 = 25.0;

// Identity and summary fields rendered in the fixed sections; everything else
// in the record is listed as a subject row with the fixed out-of mark.
const NON_SUBJECT_FIELDS: &[&str] = &[
    "roll",
    "Name",
    "Class",
    "FatherName",
    "Session",
    "Semester",
    "Remarks",
    "ImagePath",
    "Total",
    "Percentage",
    "Grade",
];

const SUBJECT_OUT_OF: &str = "75";

/// Paginated A4 progress report from a resolved external-field record.
pub fn render_report(record: &BTreeMap<String, String>, out_path: &Path) -> anyhow::Result<()> {
    let get = |key: &str| record.get(key).map(String::as_str).unwrap_or("");

    let (doc, page, layer) = PdfDocument::new(
        "Progress Report",
        Mm(PAGE_WIDTH_MM),
        Mm(PAGE_HEIGHT_MM),
        "Layer 1",
    );
    let font = doc
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(|e| anyhow!("failed to load report font: {e}"))?;
    let bold = doc
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(|e| anyhow!("failed to load report font: {e}"))?;

    let mut layer_ref = doc.get_page(page).get_layer(layer);
    let mut y = PAGE_HEIGHT_MM - 30.0;

    center_text(&layer_ref, "Progress Report", 18.0, &bold, y);
    y -= 14.0;

    two_column(
        &layer_ref,
        &format!("Roll No: {}", get("roll")),
        &format!("Name: {}", get("Name")),
        &font,
        y,
    );
    y -= 7.0;
    two_column(
        &layer_ref,
        &format!("Class: {}", get("Class")),
        &format!("Father Name: {}", get("FatherName")),
        &font,
        y,
    );
    y -= 12.0;

    two_column(&layer_ref, "Subject", "Total    Obtained", &bold, y);
    y -= 7.0;

    for (key, value) in record {
        if NON_SUBJECT_FIELDS.contains(&key.as_str()) {
            continue;
        }
        if y < BOTTOM_MM {
            let (next_page, next_layer) =
                doc.add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");
            layer_ref = doc.get_page(next_page).get_layer(next_layer);
            y = PAGE_HEIGHT_MM - 30.0;
        }
        two_column(
            &layer_ref,
            key,
            &format!("{SUBJECT_OUT_OF}       {value}"),
            &font,
            y,
        );
        y -= 6.0;
    }

    y -= 4.0;
    two_column(
        &layer_ref,
        &format!("Total: {}", get("Total")),
        "",
        &bold,
        y,
    );
    y -= 8.0;
    two_column(
        &layer_ref,
        &format!("Percentage: {}%", get("Percentage")),
        &format!("Grade: {}", get("Grade")),
        &font,
        y,
    );
    y -= 8.0;
    layer_ref.use_text(
        format!("Remarks: {}", get("Remarks")),
        12.0,
        Mm(MARGIN_MM),
        Mm(y),
        &font,
    );
    y -= 16.0;
    center_text(
        &layer_ref,
        "Unique School System, Lehtrar Road, Punjgran, Islamabad",
        10.0,
        &font,
        y.max(12.0),
    );

    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }
    let out = File::create(out_path)
        .with_context(|| format!("failed to create output file {}", out_path.display()))?;
    doc.save(&mut BufWriter::new(out))
        .map_err(|e| anyhow!("failed to write pdf: {e}"))?;
    Ok(())
}

fn two_column(
    layer: &PdfLayerReference,
    left: &str,
    right: &str,
    font: &IndirectFontRef,
    y: f32,
) {
    layer.use_text(left, 12.0, Mm(MARGIN_MM), Mm(y), font);
    if !right.is_empty() {
        layer.use_text(right, 12.0, Mm(PAGE_WIDTH_MM / 2.0 + 10.0), Mm(y), font);
    }
}

fn center_text(
    layer: &PdfLayerReference,
    text: &str,
    size: f32,
    font: &IndirectFontRef,
    y: f32,
) {
    // Helvetica averages roughly half the point size per glyph; close enough
    // for centering headings on A4.
    let approx_width_mm = text.len() as f32 * size * 0.5 * 0.3528;
    let x = ((PAGE_WIDTH_MM - approx_width_mm) / 2.0).max(MARGIN_MM / 2.0);
    layer.use_text(text, size, Mm(x), Mm(y), font);
}

#[cfg(test)]
mod tests {
    use super::*;
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
    fn renders_a_pdf_file() {
        let dir = temp_dir("schooldesk-pdf-render");
        let out = dir.join("Result_7.pdf");
        let record: BTreeMap<String, String> = [
            ("roll", "7"),
            ("Name", "Ali"),
            ("Class", "5"),
            ("FatherName", "Akbar"),
            ("Math", "68"),
            ("Urdu", "71"),
            ("Total", "139"),
            ("Percentage", "92"),
            ("Grade", "A+"),
            ("Remarks", "Excellent"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        render_report(&record, &out).expect("render");
        let bytes = std::fs::read(&out).expect("read pdf");
        assert!(bytes.starts_with(b"%PDF"));
        assert!(bytes.len() > 500);
    }

    #[test]
    fn long_subject_lists_spill_onto_extra_pages() {
        let dir = temp_dir("schooldesk-pdf-pages");
        let out = dir.join("Result_long.pdf");
        let mut record: BTreeMap<String, String> = BTreeMap::new();
        record.insert("roll".into(), "7".into());
        for i in 0..80 {
            record.insert(format!("Subject {i:02}"), "50".into());
        }
        render_report(&record, &out).expect("render");
        assert!(std::fs::read(&out).expect("read pdf").starts_with(b"%PDF"));
    }
}
