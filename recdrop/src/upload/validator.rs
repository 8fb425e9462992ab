//! Acceptance rules for the uploaded file part.

use crate::config::UploadLimitsConfig;
use crate::errors::{Error, Result};

/// Multipart field that carries the recording.
pub const FILE_FIELD: &str = "file";

/// Content-type assumed for a file part that does not declare one.
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// Process-wide upload limits, read-only after startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadLimits {
    pub max_size_bytes: u64,
    pub accepted_mime_prefix: String,
}

impl UploadLimits {
    pub fn from_config(config: &UploadLimitsConfig) -> Self {
        Self {
            max_size_bytes: config.max_size_bytes(),
            accepted_mime_prefix: config.accepted_mime_prefix.clone(),
        }
    }

    /// Accept the declared content-type only if it starts with the configured prefix, so both
    /// `audio/webm` and `audio/webm;codecs=opus` pass.
    pub fn check_mime_type(&self, declared: &str) -> Result<()> {
        if declared.starts_with(&self.accepted_mime_prefix) {
            Ok(())
        } else {
            Err(Error::InvalidMimeType {
                mimetype: declared.to_string(),
            })
        }
    }

    pub fn size_gauge(&self) -> SizeGauge {
        SizeGauge {
            limit: self.max_size_bytes,
            received: 0,
        }
    }
}

/// Check that a file part arrived under the expected field and is the first one.
pub fn check_file_field(field_name: &str, already_received: bool) -> Result<()> {
    if field_name != FILE_FIELD || already_received {
        return Err(Error::UnexpectedField {
            field: field_name.to_string(),
        });
    }
    Ok(())
}

/// Running byte count of one file part, checked chunk by chunk.
#[derive(Debug)]
pub struct SizeGauge {
    limit: u64,
    received: u64,
}

impl SizeGauge {
    /// Add a chunk to the total. Fails as soon as the total exceeds the limit.
    pub fn record(&mut self, chunk_len: usize) -> Result<u64> {
        self.received = self.received.saturating_add(chunk_len as u64);
        if self.received > self.limit {
            return Err(Error::PayloadTooLarge { limit_bytes: self.limit });
        }
        Ok(self.received)
    }

    pub fn received(&self) -> u64 {
        self.received
    }
}
