//! Output packaging.
//!
//! [`pack`] bundles a job's output directory into a zip archive next to
//! it; [`register`] hands a job's results to an [`AssetCatalog`]. A failure
//! in either is fatal to that step only: frames already on disk are left in
//! place.

use std::fs::File;
use std::io;
use std::path::{Component, Path, PathBuf};

use walkdir::WalkDir;
use zip::{CompressionMethod, ZipWriter, write::SimpleFileOptions};

use crate::catalog::AssetCatalog;
use crate::error::StillshotError;
use crate::extractor::ExtractionResult;

/// Archive every file under `output_dir` into `<output_dir>.zip`.
///
/// Entry names are relative to the directory's parent, so the archive's
/// single root entry is the output folder itself. Entries are written in
/// file-name order, but ordering is not part of the contract.
///
/// # Errors
///
/// [`StillshotError::Packaging`] if the directory cannot be walked or the
/// archive cannot be written.
///
/// # Example
///
/// ```no_run
/// let archive = stillshot::pack("out/dQw4w9WgXcQ".as_ref())?;
/// assert!(archive.ends_with("dQw4w9WgXcQ.zip"));
/// # Ok::<(), stillshot::StillshotError>(())
/// ```
pub fn pack(output_dir: &Path) -> Result<PathBuf, StillshotError> {
    let folder_name = output_dir
        .file_name()
        .ok_or_else(|| StillshotError::packaging(output_dir, "path has no folder name"))?;
    if !output_dir.is_dir() {
        return Err(StillshotError::packaging(output_dir, "not a directory"));
    }
    let base = output_dir.parent().unwrap_or_else(|| Path::new(""));
    let archive_path =
        output_dir.with_file_name(format!("{}.zip", folder_name.to_string_lossy()));

    log::debug!("Packing {} into {}", output_dir.display(), archive_path.display());

    let file = File::create(&archive_path)
        .map_err(|error| StillshotError::packaging(&archive_path, error))?;
    let mut writer = ZipWriter::new(file);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut file_count = 0usize;
    for entry in WalkDir::new(output_dir).sort_by_file_name() {
        let entry = entry.map_err(|error| StillshotError::packaging(output_dir, error))?;
        let relative = entry
            .path()
            .strip_prefix(base)
            .map_err(|error| StillshotError::packaging(entry.path(), error))?;
        let name = archive_name(relative);

        if entry.file_type().is_dir() {
            writer
                .add_directory(name, options)
                .map_err(|error| StillshotError::packaging(&archive_path, error))?;
        } else {
            writer
                .start_file(name, options)
                .map_err(|error| StillshotError::packaging(&archive_path, error))?;
            let mut source = File::open(entry.path())
                .map_err(|error| StillshotError::packaging(entry.path(), error))?;
            io::copy(&mut source, &mut writer)
                .map_err(|error| StillshotError::packaging(&archive_path, error))?;
            file_count += 1;
        }
    }

    writer
        .finish()
        .map_err(|error| StillshotError::packaging(&archive_path, error))?;

    log::info!("Archived {file_count} file(s) into {}", archive_path.display());
    Ok(archive_path)
}

/// Zip entry names always use `/`.
fn archive_name(relative: &Path) -> String {
    relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Add every result to `folder_id` in one batch.
///
/// An empty result set makes no catalog calls.
///
/// # Errors
///
/// Whatever the catalog returns, normally [`StillshotError::Catalog`].
pub fn register<C: AssetCatalog + ?Sized>(
    catalog: &C,
    results: &[ExtractionResult],
    folder_id: &str,
) -> Result<(), StillshotError> {
    if results.is_empty() {
        return Ok(());
    }
    log::info!("Registering {} frame(s) in catalog folder {folder_id}", results.len());
    catalog.add_items(results, folder_id)
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::archive_name;

    #[test]
    fn archive_names_use_forward_slashes() {
        assert_eq!(archive_name(Path::new("job/00_00_00.png")), "job/00_00_00.png");
        assert_eq!(archive_name(Path::new("./job/nested/a.png")), "job/nested/a.png");
        assert_eq!(archive_name(Path::new("job")), "job");
    }
}
