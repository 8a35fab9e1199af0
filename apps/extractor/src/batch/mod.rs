//! Batch Runner: resolves a path into documents and writes one artifact each.
//!
//! Documents run on a bounded pool smaller than the per-document section pool,
//! so concurrent model load stays at roughly
//! `document_concurrency × section_concurrency`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};
use walkdir::WalkDir;

use crate::documents::is_supported;
use crate::extraction::{DocumentExtractor, ExtractionOutcome};

/// Suffix appended to the input's stem to name its artifact.
pub const ARTIFACT_SUFFIX: &str = "_json_output.json";

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    #[error("Cannot create output directory {path}: {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Summary of one `process_path` call.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BatchReport {
    /// Distinct artifact paths, in completion order.
    pub written: Vec<PathBuf>,
    /// Writes that replaced an artifact from the same batch.
    pub overwritten: usize,
    /// Inputs that produced the empty sentinel.
    pub unreadable: usize,
    /// Inputs whose artifact could not be written.
    pub failed: usize,
}

impl BatchReport {
    fn record(&mut self, result: DocumentResult) {
        match result {
            DocumentResult::Written { artifact, unreadable } => {
                if unreadable {
                    self.unreadable += 1;
                }
                if self.written.contains(&artifact) {
                    self.overwritten += 1;
                } else {
                    self.written.push(artifact);
                }
            }
            DocumentResult::Failed => self.failed += 1,
        }
    }
}

enum DocumentResult {
    Written { artifact: PathBuf, unreadable: bool },
    Failed,
}

pub struct BatchRunner {
    extractor: Arc<DocumentExtractor>,
    output_dir: PathBuf,
    document_concurrency: usize,
}

impl BatchRunner {
    pub fn new(
        extractor: Arc<DocumentExtractor>,
        output_dir: impl Into<PathBuf>,
        document_concurrency: usize,
    ) -> Self {
        Self {
            extractor,
            output_dir: output_dir.into(),
            document_concurrency: document_concurrency.max(1),
        }
    }

    /// Creates the artifact directory if it is missing.
    pub async fn prepare_output_dir(&self) -> Result<&Path, BatchError> {
        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|source| BatchError::OutputDir {
                path: self.output_dir.clone(),
                source,
            })?;
        Ok(&self.output_dir)
    }

    /// Processes a single file, or every supported file under a directory.
    ///
    /// Per-document failures are counted in the report and never abort the
    /// batch. A path that is neither file nor directory writes nothing.
    pub async fn process_path(&self, path: &Path) -> Result<BatchReport, BatchError> {
        let documents = if path.is_file() {
            vec![path.to_path_buf()]
        } else if path.is_dir() {
            discover(path)
        } else {
            return Err(BatchError::PathNotFound(path.to_path_buf()));
        };

        self.prepare_output_dir().await?;

        warn_on_shared_stems(&documents);
        info!(
            documents = documents.len(),
            root = %path.display(),
            "Starting batch"
        );

        let semaphore = Arc::new(Semaphore::new(self.document_concurrency));
        let mut handles = Vec::with_capacity(documents.len());
        for document in documents {
            let extractor = Arc::clone(&self.extractor);
            let semaphore = Arc::clone(&semaphore);
            let output_dir = self.output_dir.clone();

            handles.push(tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                let outcome = extractor.process_document(&document).await;
                write_artifact(&output_dir, &document, &outcome).await
            }));
        }

        let mut report = BatchReport::default();
        for handle in handles {
            let result = handle.await.unwrap_or_else(|e| {
                error!(error = %e, "Document task aborted");
                DocumentResult::Failed
            });
            report.record(result);
        }

        info!(
            written = report.written.len(),
            overwritten = report.overwritten,
            unreadable = report.unreadable,
            failed = report.failed,
            "Batch finished"
        );
        Ok(report)
    }
}

/// Expands a leading `~` to the home directory. Other paths pass through.
pub fn expand_home(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}

/// Every supported file under `dir`, recursively, in path order.
pub fn discover(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(error = %e, "Skipping unreadable directory entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file() && is_supported(entry.path()))
        .map(|entry| entry.into_path())
        .collect();
    files.sort();
    files
}

/// `<stem>_json_output.json`
pub fn artifact_name(input: &Path) -> String {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    format!("{stem}{ARTIFACT_SUFFIX}")
}

fn warn_on_shared_stems(documents: &[PathBuf]) {
    let mut by_name: HashMap<String, Vec<&PathBuf>> = HashMap::new();
    for document in documents {
        by_name.entry(artifact_name(document)).or_default().push(document);
    }
    for (name, inputs) in by_name.into_iter().filter(|(_, v)| v.len() > 1) {
        warn!(
            artifact = %name,
            inputs = ?inputs,
            "Inputs share an artifact name, the last write wins"
        );
    }
}

async fn write_artifact(
    output_dir: &Path,
    input: &Path,
    outcome: &ExtractionOutcome,
) -> DocumentResult {
    let name = artifact_name(input);
    let artifact = output_dir.join(&name);

    let body = match outcome.to_pretty_json() {
        Ok(body) => body,
        Err(e) => {
            error!(file = %input.display(), error = %e, "Cannot serialize record");
            return DocumentResult::Failed;
        }
    };

    match tokio::fs::write(&artifact, body).await {
        Ok(()) => {
            println!("✅ {name} saved");
            info!(artifact = %artifact.display(), "Wrote artifact");
            DocumentResult::Written {
                artifact,
                unreadable: outcome.is_unreadable(),
            }
        }
        Err(e) => {
            error!(artifact = %artifact.display(), error = %e, "Cannot write artifact");
            DocumentResult::Failed
        }
    }
}
