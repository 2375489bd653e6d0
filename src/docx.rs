use anyhow::Context;
use quick_xml::escape::escape;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

const DOCUMENT_ENTRY: &str = "word/document.xml";

/// Render a result document from a docx template: every archive entry is
/// copied through untouched except `word/document.xml`, where `{Field}` tags
/// are substituted with XML-escaped record values. Tags with no matching
/// record key are left in place.
pub fn render_template(
    template_path: &Path,
    out_path: &Path,
    record: &BTreeMap<String, String>,
) -> anyhow::Result<()> {
    let template = File::open(template_path).with_context(|| {
        format!("failed to open template {}", template_path.display())
    })?;
    let mut archive = ZipArchive::new(template).context("template is not a valid docx archive")?;

    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }
    let out = File::create(out_path)
        .with_context(|| format!("failed to create output file {}", out_path.display()))?;
    let mut zip = ZipWriter::new(out);
    let opts = FileOptions::default().compression_method(CompressionMethod::Deflated);

    for i in 0..archive.len() {
        let is_document = {
            let entry = archive.by_index_raw(i).context("failed to read template entry")?;
            entry.name() == DOCUMENT_ENTRY
        };

        if is_document {
            let mut xml = String::new();
            archive
                .by_index(i)
                .context("failed to open document entry")?
                .read_to_string(&mut xml)
                .context("failed to read document entry")?;
            let rendered = substitute_tags(&xml, record);
            zip.start_file(DOCUMENT_ENTRY, opts)
                .context("failed to start document entry")?;
            zip.write_all(rendered.as_bytes())
                .context("failed to write document entry")?;
        } else {
            let entry = archive.by_index_raw(i).context("failed to read template entry")?;
            zip.raw_copy_file(entry)
                .context("failed to copy template entry")?;
        }
    }

    zip.finish().context("failed to finalize document")?;
    Ok(())
}

fn substitute_tags(xml: &str, record: &BTreeMap<String, String>) -> String {
    let mut out = xml.to_string();
    for (key, value) in record {
        let tag = format!("{{{key}}}");
        if out.contains(&tag) {
            out = out.replace(&tag, &escape(value.as_str()));
        }
    }
    out
}
