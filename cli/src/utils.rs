use std::path::Path;

use anyhow::{Context as _, Result};
use campus_uploads::SourceFile;

/// Reads a local file, guessing its MIME type from the extension.
pub fn read_source_file(path: &Path) -> Result<SourceFile> {
    let name = path
        .file_name()
        .context("Invalid filename")?
        .to_string_lossy()
        .into_owned();

    let mime_type = mime_guess::from_path(path)
        .first_or_octet_stream()
        .to_string();

    let bytes = std::fs::read(path).with_context(|| format!("Failed to read file: {path:?}"))?;
    log::debug!("read file name={name} mime={mime_type} bytes={}", bytes.len());

    Ok(SourceFile::new(name, mime_type, bytes))
}

pub fn truncate_str(s: &str, max_len: usize) -> String {
    if s.chars().count() > max_len {
        let truncated: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{truncated}...")
    } else {
        s.to_owned()
    }
}

pub fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else if bytes < 1024 * 1024 * 1024 {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    } else {
        format!("{:.2} GB", bytes as f64 / (1024.0 * 1024.0 * 1024.0))
    }
}
