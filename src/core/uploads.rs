//! Upload limits and file naming rules.
//!
//! Guards the blob store against:
//! - Empty or oversized payloads
//! - Path-like names (`..`, separators)
//! - Denylisted file names (executables, secrets)

use std::path::Path;

use glob::Pattern;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::FilePayload;
use crate::error::CatalogError;

/// Limits applied to every uploaded file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadPolicy {
    /// Maximum payload size in bytes (default: 50MB)
    #[serde(default = "default_max_file_bytes")]
    pub max_file_bytes: u64,

    /// Glob patterns matched against the original file name
    #[serde(default = "default_denylist")]
    pub denylist_patterns: Vec<String>,
}

fn default_max_file_bytes() -> u64 {
    50 * 1024 * 1024
}

fn default_denylist() -> Vec<String> {
    vec![
        ".env*".to_string(),
        "*.exe".to_string(),
        "*.bat".to_string(),
        "*.sh".to_string(),
        "*.pem".to_string(),
        "*.key".to_string(),
    ]
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            max_file_bytes: default_max_file_bytes(),
            denylist_patterns: default_denylist(),
        }
    }
}

impl UploadPolicy {
    /// Check a file name against the denylist
    pub fn is_denylisted(&self, name: &str) -> bool {
        let lower = name.to_lowercase();
        self.denylist_patterns
            .iter()
            .filter_map(|p| Pattern::new(p).ok())
            .any(|pattern| pattern.matches(&lower))
    }

    /// Validate a payload before it reaches the blob store
    pub fn validate(&self, file: &FilePayload) -> Result<(), UploadViolation> {
        if file.is_empty() {
            return Err(UploadViolation::EmptyFile {
                name: file.original_name.clone(),
            });
        }

        let size = file.len() as u64;
        if size > self.max_file_bytes {
            return Err(UploadViolation::TooLarge {
                actual: size,
                limit: self.max_file_bytes,
            });
        }

        let name = file.original_name.trim();
        if name.is_empty() || name.contains("..") || name.contains('/') || name.contains('\\') {
            return Err(UploadViolation::InvalidName {
                name: file.original_name.clone(),
            });
        }

        if self.is_denylisted(name) {
            return Err(UploadViolation::DenylistMatch {
                name: name.to_string(),
            });
        }

        Ok(())
    }
}

/// Upload rejections
#[derive(Debug, Clone, Error)]
pub enum UploadViolation {
    #[error("Refusing to store empty file: {name}")]
    EmptyFile { name: String },

    #[error("File too large: {actual} > {limit} bytes")]
    TooLarge { actual: u64, limit: u64 },

    #[error("Invalid file name: {name}")]
    InvalidName { name: String },

    #[error("File name matches denylist pattern: {name}")]
    DenylistMatch { name: String },
}

impl From<UploadViolation> for CatalogError {
    fn from(v: UploadViolation) -> Self {
        CatalogError::Validation(v.to_string())
    }
}

/// MIME type for a file name, by extension
pub fn content_type_for(name: &str) -> &'static str {
    let extension = Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "pdf" => "application/pdf",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "mp4" => "video/mp4",
        "mp3" => "audio/mpeg",
        "txt" => "text/plain",
        "html" | "htm" => "text/html",
        "csv" => "text/csv",
        "doc" | "docx" => "application/msword",
        _ => "application/octet-stream",
    }
}

/// Thumbnail reference derived from a stored file reference (`<stem>_thumb.<ext>`)
pub fn thumbnail_ref_for(file_ref: &str) -> String {
    match file_ref.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{}_thumb.{}", stem, ext),
        _ => format!("{}_thumb", file_ref),
    }
}
