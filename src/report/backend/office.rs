//! Office-automation DOCX-to-PDF converter.
//!
//! Writes the bound Word document into a scoped temp directory, invokes an
//! external office conversion command (LibreOffice headless by default) and
//! reads the PDF back. The whole temp directory is removed on every exit
//! path. This backend needs a desktop office suite installed; when the
//! expected PDF never appears it reports the environment as unavailable
//! instead of hanging or returning empty bytes.

use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use uuid::Uuid;

use crate::report::ReportError;

use super::{PageOptions, RenderBackend, RenderContent};

const CONVERT_TIMEOUT: Duration = Duration::from_secs(60);

pub struct OfficeConverter {
    soffice_bin: String,
}

impl OfficeConverter {
    pub fn new(soffice_bin: String) -> Self {
        Self { soffice_bin }
    }

    /// Run the conversion with all temp artifacts under `work_root`.
    async fn convert_in(
        &self,
        work_root: &std::path::Path,
        docx: Vec<u8>,
    ) -> Result<Vec<u8>, ReportError> {
        let temp_dir =
            tempfile::tempdir_in(work_root).map_err(|e| ReportError::RenderFailed {
                detail: format!("temp dir: {e}"),
            })?;
        let stem = format!("report-{}", Uuid::new_v4());
        let docx_path = temp_dir.path().join(format!("{stem}.docx"));
        let pdf_path = temp_dir.path().join(format!("{stem}.pdf"));

        tokio::fs::write(&docx_path, &docx)
            .await
            .map_err(|e| ReportError::RenderFailed {
                detail: format!("write document: {e}"),
            })?;

        let mut command = Command::new(&self.soffice_bin);
        command
            .arg("--headless")
            .arg("--convert-to")
            .arg("pdf")
            .arg("--outdir")
            .arg(temp_dir.path())
            .arg(&docx_path)
            .kill_on_drop(true);

        let outcome = tokio::time::timeout(CONVERT_TIMEOUT, command.status()).await;

        // Any exit, including launch failure or timeout, without the output
        // artifact means the conversion environment is unusable.
        let detail = match outcome {
            Err(_) => Some(format!(
                "office conversion timed out after {CONVERT_TIMEOUT:?}"
            )),
            Ok(Err(e)) => Some(format!("failed to launch {}: {e}", self.soffice_bin)),
            Ok(Ok(status)) if !status.success() => Some(format!(
                "{} exited with status {}",
                self.soffice_bin,
                status.code().unwrap_or(-1)
            )),
            Ok(Ok(_)) => None,
        };

        if let Some(detail) = detail {
            log::error!("Office conversion failed: {detail}");
            return Err(ReportError::ConversionEnvironmentUnavailable { detail });
        }

        match tokio::fs::read(&pdf_path).await {
            Ok(pdf) if !pdf.is_empty() => Ok(pdf),
            Ok(_) => Err(ReportError::ConversionEnvironmentUnavailable {
                detail: "converter produced an empty PDF".into(),
            }),
            Err(_) => Err(ReportError::ConversionEnvironmentUnavailable {
                detail: format!(
                    "expected PDF artifact never appeared; is {} installed?",
                    self.soffice_bin
                ),
            }),
        }
    }
}

#[async_trait]
impl RenderBackend for OfficeConverter {
    async fn render(
        &self,
        content: RenderContent,
        _options: &PageOptions,
    ) -> Result<Vec<u8>, ReportError> {
        let docx = match content {
            RenderContent::OfficeDocument(bytes) => bytes,
            RenderContent::Markup(_) => {
                return Err(ReportError::RenderFailed {
                    detail: "office converter accepts office documents only".into(),
                })
            }
        };
        self.convert_in(&std::env::temp_dir(), docx).await
    }
}
