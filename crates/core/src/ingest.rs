use crate::{build_chunks, ChunkingConfig, DocumentChunk, IngestError};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const TEXT_EXTENSIONS: [&str; 3] = ["txt", "md", "markdown"];

pub fn discover_text_files(folder: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();

    for entry in WalkDir::new(folder)
        .into_iter()
        .filter_map(|item| item.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }

        let is_text = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                TEXT_EXTENSIONS
                    .iter()
                    .any(|known| ext.eq_ignore_ascii_case(known))
            });

        if is_text {
            files.push(entry.path().to_path_buf());
        }
    }

    files.sort_unstable();
    files
}

pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

pub struct IngestionReport {
    pub chunks: Vec<DocumentChunk>,
    pub skipped_files: Vec<SkippedFile>,
}

pub fn load_folder_chunks(
    folder: &Path,
    config: ChunkingConfig,
) -> Result<Vec<DocumentChunk>, IngestError> {
    let report = load_folder_chunks_best_effort(folder, config)?;
    Ok(report.chunks)
}

/// Reads every text file under `folder` into chunks whose source is the file path.
/// Files that cannot be read are reported, not fatal.
pub fn load_folder_chunks_best_effort(
    folder: &Path,
    config: ChunkingConfig,
) -> Result<IngestionReport, IngestError> {
    config.validate()?;
    let files = discover_text_files(folder);

    if files.is_empty() {
        return Err(IngestError::InvalidArgument(format!(
            "no text files found in {}",
            folder.display()
        )));
    }

    let mut chunks = Vec::new();
    let mut skipped_files = Vec::new();

    for path in files {
        let loaded = fs::read_to_string(&path)
            .map_err(IngestError::from)
            .and_then(|text| build_chunks(&path.to_string_lossy(), &text, config));

        match loaded {
            Ok(file_chunks) => chunks.extend(file_chunks),
            Err(error) => skipped_files.push(SkippedFile {
                path,
                reason: error.to_string(),
            }),
        }
    }

    Ok(IngestionReport {
        chunks,
        skipped_files,
    })
}
