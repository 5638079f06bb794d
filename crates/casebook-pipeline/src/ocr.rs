use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use casebook_core::config::ExtractionConfig;
use casebook_core::{CasebookError, DocumentKind, ExtractionResult, Result};
use tempfile::TempDir;
use tokio::process::Command;

/// Recognises text in scanned documents
#[async_trait]
pub trait OcrEngine: Send + Sync {
    fn name(&self) -> &str;

    async fn recognize(&self, file_name: &str, kind: DocumentKind, bytes: &[u8]) -> Result<ExtractionResult>;
}

/// OCR through the `tesseract` CLI. PDFs are rasterised with `pdftoppm` first.
pub struct TesseractOcr {
    tesseract: String,
    pdftoppm: String,
    timeout: Duration,
    dpi: u32,
}

impl TesseractOcr {
    pub fn new(tesseract: &str, pdftoppm: &str) -> Self {
        Self {
            tesseract: tesseract.to_string(),
            pdftoppm: pdftoppm.to_string(),
            timeout: Duration::from_secs(120),
            dpi: 300,
        }
    }

    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self::new(&config.ocr_command, &config.pdftoppm_command)
            .with_timeout(Duration::from_secs(config.request_timeout_secs))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    async fn rasterize(&self, pdf: &Path, dir: &Path) -> Result<Vec<PathBuf>> {
        let prefix = dir.join("page");
        let dpi = self.dpi.to_string();
        self.execute_command(
            &self.pdftoppm,
            &[
                OsStr::new("-r"),
                OsStr::new(&dpi),
                OsStr::new("-png"),
                pdf.as_os_str(),
                prefix.as_os_str(),
            ],
        )
        .await?;

        let mut pages = Vec::new();
        let mut entries = tokio::fs::read_dir(dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if page_number(&path).is_some() {
                pages.push(path);
            }
        }
        pages.sort_by_key(|p| page_number(p));

        if pages.is_empty() {
            return Err(CasebookError::Ocr("PDF produced no page images".to_string()));
        }
        Ok(pages)
    }

    async fn execute_command(&self, program: &str, args: &[&OsStr]) -> Result<String> {
        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = cmd
            .spawn()
            .map_err(|e| CasebookError::Ocr(format!("Failed to start {}: {}", program, e)))?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| CasebookError::Timeout(self.timeout.as_millis() as u64))??;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CasebookError::Ocr(format!(
                "{} exited with {}: {}",
                program,
                output.status,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl OcrEngine for TesseractOcr {
    fn name(&self) -> &str {
        "tesseract"
    }

    async fn recognize(&self, file_name: &str, kind: DocumentKind, bytes: &[u8]) -> Result<ExtractionResult> {
        let dir = TempDir::new()?;
        let extension = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("bin")
            .to_ascii_lowercase();
        let input = dir.path().join(format!("input.{}", extension));
        tokio::fs::write(&input, bytes).await?;

        let images = match kind {
            DocumentKind::Pdf => self.rasterize(&input, dir.path()).await?,
            DocumentKind::Image => vec![input],
            other => {
                return Err(CasebookError::Ocr(format!(
                    "OCR does not apply to {} documents",
                    other.label()
                )))
            }
        };

        let mut pages = Vec::with_capacity(images.len());
        for image in &images {
            let text = self
                .execute_command(&self.tesseract, &[image.as_os_str(), OsStr::new("stdout")])
                .await?;
            pages.push(text.trim().to_string());
        }

        tracing::info!("OCR recognised {} page(s) of {}", pages.len(), file_name);
        Ok(ExtractionResult::from_text(
            pages.join("\n\n"),
            pages.len() as u32,
            "ocr",
        ))
    }
}

/// Page number of a `pdftoppm` output file such as `page-07.png`
fn page_number(path: &Path) -> Option<u32> {
    let stem = path.file_stem()?.to_str()?;
    let ext = path.extension()?.to_str()?;
    if ext != "png" {
        return None;
    }
    stem.strip_prefix("page-")?.parse().ok()
}
