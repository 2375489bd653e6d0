use anyhow::Context;
use std::path::{Path, PathBuf};

/// Move a staged upload into the photo directory as `<key><ext>`, taking the
/// extension from the uploaded file name and defaulting to `.jpg`. Rename
/// first; fall back to copy+remove when the staging area is on another
/// filesystem.
pub fn store_photo(
    photo_dir: &Path,
    key: &str,
    staged: &Path,
    original_name: &str,
) -> anyhow::Result<PathBuf> {
    let ext = Path::new(original_name)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty())
        .map(|e| format!(".{e}"))
        .unwrap_or_else(|| ".jpg".to_string());
    let dest = photo_dir.join(format!("{key}{ext}"));

    if std::fs::rename(staged, &dest).is_err() {
        std::fs::copy(staged, &dest).with_context(|| {
            format!(
                "failed to store photo from {} to {}",
                staged.display(),
                dest.display()
            )
        })?;
        let _ = std::fs::remove_file(staged);
    }
    Ok(dest)
}

/// Filesystem lookup for a photo named by the key. Photos are not recorded in
/// the sheet; existence is decided per read. On a hit the served path carries
/// a cache-busting token from the current time, so the path differs between
/// reads of the same file.
pub fn access_path(photo_dir: &Path, key: &str) -> Option<String> {
    let jpg = photo_dir.join(format!("{key}.jpg"));
    if jpg.is_file() {
        return Some(with_token(&format!("{key}.jpg")));
    }

    // Other extensions: first directory entry whose stem matches the key.
    let entries = std::fs::read_dir(photo_dir).ok()?;
    for ent in entries.flatten() {
        let p = ent.path();
        if !p.is_file() {
            continue;
        }
        if p.file_stem().and_then(|s| s.to_str()) == Some(key) {
            if let Some(name) = p.file_name().and_then(|s| s.to_str()) {
                return Some(with_token(name));
            }
        }
    }
    None
}

fn with_token(file_name: &str) -> String {
    format!(
        "/photos/{}?t={}",
        file_name,
        chrono::Utc::now().timestamp_millis()
    )
}
