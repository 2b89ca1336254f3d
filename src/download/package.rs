//! Packaging of a finished batch: archive, failure manifest and summary.

use std::collections::HashSet;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::models::BatchResult;

/// Errors raised while packaging results
#[derive(Debug, thiserror::Error)]
pub enum PackageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

/// Zip the successful downloads with bare file names.
///
/// Returns `None` and writes nothing when no DOI succeeded. A DOI listed twice
/// in a batch is downloaded twice into the same file; it is archived once.
pub fn write_archive(result: &BatchResult, path: &Path) -> Result<Option<PathBuf>, PackageError> {
    if result.records.is_empty() {
        return Ok(None);
    }

    let mut zip = ZipWriter::new(File::create(path)?);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut added = HashSet::new();
    for record in &result.records {
        let name = match record.path.file_name() {
            Some(name) => name.to_string_lossy().into_owned(),
            None => record.doi.file_name(),
        };
        if !added.insert(name.clone()) {
            tracing::debug!("{} already archived, skipping", name);
            continue;
        }
        zip.start_file(name, options)?;
        zip.write_all(&std::fs::read(&record.path)?)?;
    }

    zip.finish()?;
    tracing::info!("Archived {} papers into {}", added.len(), path.display());
    Ok(Some(path.to_path_buf()))
}

/// Failed DOIs, one per line, in failure order
pub fn failure_manifest(result: &BatchResult) -> String {
    result
        .failed
        .iter()
        .map(|doi| doi.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Write the failure manifest. Returns `None` when nothing failed.
pub fn write_failure_manifest(
    result: &BatchResult,
    path: &Path,
) -> Result<Option<PathBuf>, PackageError> {
    if result.failed.is_empty() {
        return Ok(None);
    }
    std::fs::write(path, failure_manifest(result))?;
    Ok(Some(path.to_path_buf()))
}

/// Plain text report of the batch
pub fn summary(result: &BatchResult) -> String {
    let mut text = format!(
        "Total DOIs Processed: {}\nSuccessful Downloads: {}\nFailed Downloads: {}\n",
        result.total(),
        result.success_count(),
        result.failed_count()
    );
    if !result.failed.is_empty() {
        let failed: Vec<&str> = result.failed.iter().map(|d| d.as_str()).collect();
        text.push_str(&format!("Failed DOIs: {}\n", failed.join(", ")));
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Doi, DownloadRecord, DownloadSource};
    use std::io::Read;
    use tempfile::tempdir;
    use zip::ZipArchive;

    fn result_with_files(dir: &Path) -> BatchResult {
        let papers = dir.join("papers");
        std::fs::create_dir_all(&papers).unwrap();

        let mut result = BatchResult::new();
        for (doi, body) in [("10.1/a", "%PDF-a"), ("10.1/b", "%PDF-b")] {
            let doi = Doi::normalize(doi);
            let path = papers.join(doi.file_name());
            std::fs::write(&path, body).unwrap();
            result.push_success(DownloadRecord {
                doi,
                source: DownloadSource::Mirror("https://m/".to_string()),
                path,
                bytes: body.len() as u64,
                warnings: vec![],
            });
        }
        result.push_failure(Doi::normalize("10.1/x"), vec![]);
        result.push_failure(Doi::normalize("10.1/y"), vec![]);
        result
    }

    #[test]
    fn test_archive_is_flat() {
        let dir = tempdir().unwrap();
        let result = result_with_files(dir.path());
        let path = dir.path().join("downloaded_papers.zip");

        assert_eq!(write_archive(&result, &path).unwrap(), Some(path.clone()));

        let mut archive = ZipArchive::new(File::open(&path).unwrap()).unwrap();
        let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
        names.sort();
        assert_eq!(names, vec!["10.1_a.pdf", "10.1_b.pdf"]);

        let mut content = String::new();
        archive
            .by_name("10.1_b.pdf")
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "%PDF-b");
    }

    #[test]
    fn test_archive_keeps_one_entry_per_file_name() {
        let dir = tempdir().unwrap();
        let papers = dir.path().join("papers");
        std::fs::create_dir_all(&papers).unwrap();

        let mut result = BatchResult::new();
        for raw in ["10.1/AAA", "https://doi.org/10.1/AAA", "10.1/a\\b", "10.1/a/b"] {
            let doi = Doi::normalize(raw);
            let path = papers.join(doi.file_name());
            std::fs::write(&path, "%PDF-1.4").unwrap();
            result.push_success(DownloadRecord {
                doi,
                source: DownloadSource::Mirror("https://m/".to_string()),
                path,
                bytes: 8,
                warnings: vec![],
            });
        }
        assert_eq!(result.success_count(), 4);

        let path = dir.path().join("downloaded_papers.zip");
        assert_eq!(write_archive(&result, &path).unwrap(), Some(path.clone()));

        let archive = ZipArchive::new(File::open(&path).unwrap()).unwrap();
        let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
        names.sort();
        assert_eq!(names, vec!["10.1_AAA.pdf", "10.1_a_b.pdf"]);
    }

    #[test]
    fn test_archive_skipped_without_successes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("downloaded_papers.zip");
        let mut result = BatchResult::new();
        result.push_failure(Doi::normalize("10.1/x"), vec![]);

        assert_eq!(write_archive(&result, &path).unwrap(), None);
        assert!(!path.exists());
    }

    #[test]
    fn test_failure_manifest() {
        let dir = tempdir().unwrap();
        let result = result_with_files(dir.path());
        assert_eq!(failure_manifest(&result), "10.1/x\n10.1/y");

        let path = dir.path().join("failed_dois.txt");
        write_failure_manifest(&result, &path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "10.1/x\n10.1/y");

        let empty = BatchResult::new();
        let other = dir.path().join("none.txt");
        assert_eq!(write_failure_manifest(&empty, &other).unwrap(), None);
        assert!(!other.exists());
    }

    #[test]
    fn test_summary() {
        let dir = tempdir().unwrap();
        let result = result_with_files(dir.path());
        assert_eq!(
            summary(&result),
            "Total DOIs Processed: 4\nSuccessful Downloads: 2\nFailed Downloads: 2\nFailed DOIs: 10.1/x, 10.1/y\n"
        );

        let empty = BatchResult::new();
        assert!(!summary(&empty).contains("Failed DOIs"));
    }
}
