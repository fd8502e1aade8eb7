//! Zip packaging of a run directory for download.

use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use zip::write::{FileOptions, ZipWriter};
use zip::CompressionMethod;

use crate::error::DesignError;
use crate::store::is_image_file;

pub const ARCHIVE_FILE_NAME: &str = "interior_design_report.zip";

/// Image files anywhere under `dir`, sorted by path.
pub fn collect_images(dir: &Path) -> Result<Vec<PathBuf>, DesignError> {
    let mut found = Vec::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        for entry in std::fs::read_dir(&current)? {
            let path = entry?.path();
            if path.is_dir() {
                pending.push(path);
            } else if is_image_file(&path) {
                found.push(path);
            }
        }
    }
    found.sort();
    Ok(found)
}

/// Packs the HTML report and every image under `output_dir` into one flat
/// archive. Entry order and timestamps are fixed so identical inputs give
/// identical bytes.
pub fn build_report_archive(html_path: &Path, output_dir: &Path) -> Result<Vec<u8>, DesignError> {
    let options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(zip::DateTime::default())
        .unix_permissions(0o644);

    let mut entries = vec![html_path.to_path_buf()];
    entries.extend(collect_images(output_dir)?);

    let mut buffer = Vec::new();
    {
        let mut zip = ZipWriter::new(std::io::Cursor::new(&mut buffer));
        let mut names = HashSet::new();
        for path in &entries {
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                warn!("⚠️ Skipping unnamed archive entry: {}", path.display());
                continue;
            };
            if !names.insert(name.to_string()) {
                warn!("⚠️ Skipping duplicate archive entry: {}", path.display());
                continue;
            }
            let data = std::fs::read(path)?;
            zip.start_file(name, options)?;
            zip.write_all(&data)?;
        }
        zip.finish()?;
    }

    info!("📦 Built report archive with {} bytes from {}", buffer.len(), output_dir.display());
    Ok(buffer)
}
