use std::fs::File;
use std::io::ErrorKind;
use std::path::Path;
use tracing::{debug, error};
use zip::{result::ZipError, ZipArchive};
use crate::domain::error::IngestionError;

/// Extracts every entry of the archive at `archive_path` into `dest_dir`.
/// `url` is only used to give corrupt-archive errors some context.
pub fn extract_zip(archive_path: &Path, dest_dir: &Path, url: &str) -> Result<usize, IngestionError> {
    let file = File::open(archive_path)
        .map_err(|e| IngestionError::filesystem(format!("opening {}", archive_path.display()), e))?;

    let mut archive = ZipArchive::new(file).map_err(|e| map_zip_error(e, url, "opening archive"))?;
    let entries = archive.len();
    debug!("Archive from {} holds {} entries", url, entries);

    // `extract` rejects entry paths that would escape `dest_dir`.
    archive
        .extract(dest_dir)
        .map_err(|e| map_zip_error(e, url, "extracting archive"))?;

    Ok(entries)
}

/// Names of the top-level regular files in `dir`, sorted.
pub fn list_entries(dir: &Path) -> Result<Vec<String>, IngestionError> {
    let read_dir = std::fs::read_dir(dir)
        .map_err(|e| IngestionError::filesystem(format!("listing {}", dir.display()), e))?;

    let mut names = Vec::new();
    for entry in read_dir {
        let entry = entry
            .map_err(|e| IngestionError::filesystem(format!("listing {}", dir.display()), e))?;
        let file_type = entry
            .file_type()
            .map_err(|e| IngestionError::filesystem(format!("inspecting {}", entry.path().display()), e))?;
        if !file_type.is_file() {
            continue;
        }
        // Non UTF-8 names can never match the allowlist.
        if let Ok(name) = entry.file_name().into_string() {
            names.push(name);
        }
    }
    names.sort();
    Ok(names)
}

fn map_zip_error(err: ZipError, url: &str, action: &str) -> IngestionError {
    error!("Failed {} from {}: {}", action, url, err);
    match err {
        // Bad CRCs, broken deflate streams and truncated entries surface as
        // these kinds while reading; they describe the archive, not the disk.
        ZipError::Io(source)
            if matches!(
                source.kind(),
                ErrorKind::InvalidData | ErrorKind::UnexpectedEof | ErrorKind::Other
            ) =>
        {
            IngestionError::ArchiveCorrupt {
                url: url.to_string(),
                message: source.to_string(),
            }
        }
        ZipError::Io(source) => IngestionError::filesystem(action, source),
        other => IngestionError::ArchiveCorrupt {
            url: url.to_string(),
            message: other.to_string(),
        },
    }
}
