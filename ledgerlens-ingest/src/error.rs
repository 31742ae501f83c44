//! Failures of a single extraction collaborator call.
//!
//! These never leave the crate as errors; the extractor turns them into
//! [`PageFailure`](ledgerlens_core::PageFailure) records on the page.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("pdf: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("page {0} is out of range")]
    PageOutOfRange(usize),

    #[error("image: {0}")]
    Image(#[from] image::ImageError),

    #[error("failed to run {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} exited with {status}: {stderr}")]
    ToolFailed {
        tool: String,
        status: String,
        stderr: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("worker task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl IngestError {
    pub(crate) fn tool_failed(tool: &str, status: std::process::ExitStatus, stderr: &[u8]) -> Self {
        Self::ToolFailed {
            tool: tool.to_string(),
            status: status.to_string(),
            stderr: String::from_utf8_lossy(stderr).trim().to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, IngestError>;
