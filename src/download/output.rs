//! Flat output directory for downloaded PDFs.

use std::path::{Path, PathBuf};

use crate::models::Doi;

/// Directory that receives one `{sanitized_doi}.pdf` per successful DOI
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputDir {
    root: PathBuf,
}

impl OutputDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the directory ready for a batch.
    ///
    /// With `clear`, anything left over from a previous run is removed first.
    pub fn prepare(&self, clear: bool) -> std::io::Result<()> {
        if clear && self.root.exists() {
            std::fs::remove_dir_all(&self.root)?;
            tracing::info!("Previous downloads cleared from {}", self.root.display());
        }
        std::fs::create_dir_all(&self.root)
    }

    /// Where the PDF for a DOI is written
    pub fn path_for(&self, doi: &Doi) -> PathBuf {
        self.root.join(doi.file_name())
    }

    /// Write a payload for a DOI, replacing any previous file
    pub async fn write(&self, doi: &Doi, bytes: &[u8]) -> std::io::Result<PathBuf> {
        tokio::fs::create_dir_all(&self.root).await?;
        let path = self.path_for(doi);
        tokio::fs::write(&path, bytes).await?;
        Ok(path)
    }

    /// Remove a file written by [`OutputDir::write`]. A missing file is not an error.
    pub async fn remove(&self, path: &Path) -> std::io::Result<()> {
        match tokio::fs::remove_file(path).await {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}
