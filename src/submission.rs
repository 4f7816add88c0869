use log::info;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::SubmissionError;
use crate::raster::RasterArtifact;

/// Descriptive fields sent alongside the image
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionMetadata {
    pub filename: String,
    pub content_type: String,
    pub size: usize,
    pub width: u32,
    pub height: u32,
    pub notes: Option<String>,
    /// RFC 3339
    pub created_at: String,
}

/// A validated artifact ready to hand to an upload client
#[derive(Debug, Clone)]
pub struct Submission {
    pub metadata: SubmissionMetadata,
    pub bytes: std::sync::Arc<[u8]>,
}

impl Submission {
    pub fn prepare(artifact: &RasterArtifact, notes: Option<&str>) -> Result<Self, SubmissionError> {
        validate(artifact)?;
        let notes = notes
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string);
        Ok(Self {
            metadata: SubmissionMetadata {
                filename: artifact.suggested_filename().to_string(),
                content_type: artifact.content_type().to_string(),
                size: artifact.size(),
                width: artifact.width(),
                height: artifact.height(),
                notes,
                created_at: chrono::Local::now().to_rfc3339(),
            },
            bytes: artifact.shared_bytes(),
        })
    }

    pub fn metadata_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(&self.metadata)
    }
}

fn validate(artifact: &RasterArtifact) -> Result<(), SubmissionError> {
    if artifact.size() == 0 {
        return Err(SubmissionError::EmptyArtifact);
    }
    if !artifact.content_type().starts_with("image/") {
        return Err(SubmissionError::UnsupportedContentType(
            artifact.content_type().to_string(),
        ));
    }
    Ok(())
}

/// Write the image into `dir` under its suggested filename
pub fn export_to_dir(artifact: &RasterArtifact, dir: impl AsRef<Path>) -> Result<PathBuf, SubmissionError> {
    validate(artifact)?;
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;
    let path = dir.join(artifact.suggested_filename());
    fs::write(&path, artifact.bytes())?;
    info!("Exported {} ({} bytes)", path.display(), artifact.size());
    Ok(path)
}
