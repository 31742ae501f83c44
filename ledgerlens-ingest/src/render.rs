//! Page rasterization.

use async_trait::async_trait;
use image::DynamicImage;
use std::io::Write;
use std::process::Stdio;
use tempfile::NamedTempFile;
use tokio::process::Command;

use crate::error::{IngestError, Result};

#[async_trait]
pub trait PageRenderer: Send + Sync {
    /// Rasterize page `index` (0-based) at `dpi`.
    async fn render(&self, index: usize, dpi: u32) -> Result<DynamicImage>;
}

/// Renders through poppler's `pdftoppm`, one page per call.
pub struct PdftoppmRenderer {
    binary: String,
    input: NamedTempFile,
}

impl PdftoppmRenderer {
    /// The document is spooled to a temporary file that lives as long as
    /// the renderer.
    pub fn new(bytes: &[u8], binary: impl Into<String>) -> Result<Self> {
        let mut input = tempfile::Builder::new().prefix("ledgerlens-").suffix(".pdf").tempfile()?;
        input.write_all(bytes)?;
        input.flush()?;
        Ok(Self {
            binary: binary.into(),
            input,
        })
    }
}

#[async_trait]
impl PageRenderer for PdftoppmRenderer {
    async fn render(&self, index: usize, dpi: u32) -> Result<DynamicImage> {
        let out_dir = tempfile::tempdir()?;
        let prefix = out_dir.path().join("page");
        // pdftoppm pages are 1-based
        let page = (index + 1).to_string();

        let output = Command::new(&self.binary)
            .arg("-png")
            .arg("-r")
            .arg(dpi.to_string())
            .arg("-f")
            .arg(&page)
            .arg("-l")
            .arg(&page)
            .arg("-singlefile")
            .arg(self.input.path())
            .arg(&prefix)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| IngestError::Spawn {
                tool: self.binary.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(IngestError::tool_failed(&self.binary, output.status, &output.stderr));
        }

        let bytes = tokio::fs::read(prefix.with_extension("png")).await?;
        let image = image::load_from_memory(&bytes)?;
        tracing::debug!(page = index, width = image.width(), height = image.height(), "rendered page");
        Ok(image)
    }
}
