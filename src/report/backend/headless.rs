//! Local headless-browser renderer.
//!
//! Writes the report markup into a scoped temp directory and drives a
//! headless Chromium to print it to PDF. The temp directory guard and
//! `kill_on_drop` together guarantee the browser context and all artifacts
//! are released on every exit path, including timeout and cancellation.

use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

use crate::report::ReportError;

use super::{expect_markup, PageOptions, RenderBackend, RenderContent};

const RENDER_TIMEOUT: Duration = Duration::from_secs(60);

/// Page geometry travels as print CSS; `--print-to-pdf` has no page-setup
/// flags of its own, so without this rule Chromium falls back to its own
/// default paper size and margins.
fn apply_page_options(html: &str, options: &PageOptions) -> String {
    let mut rules = format!(
        "@page {{ size: {}; margin: {}; }}",
        options.page_size, options.margin
    );
    if options.print_background {
        rules.push_str(" body { -webkit-print-color-adjust: exact; print-color-adjust: exact; }");
    }
    let style = format!("<style>{rules}</style>");
    match html.find("</head>") {
        Some(idx) => format!("{}{style}{}", &html[..idx], &html[idx..]),
        None => format!("{style}{html}"),
    }
}

pub struct HeadlessChromiumRenderer {
    chromium_bin: String,
}

impl HeadlessChromiumRenderer {
    pub fn new(chromium_bin: String) -> Self {
        Self { chromium_bin }
    }
}

#[async_trait]
impl RenderBackend for HeadlessChromiumRenderer {
    async fn render(
        &self,
        content: RenderContent,
        options: &PageOptions,
    ) -> Result<Vec<u8>, ReportError> {
        let html = apply_page_options(&expect_markup(content)?, options);

        let temp_dir = tempfile::tempdir().map_err(|e| ReportError::RenderFailed {
            detail: format!("temp dir: {e}"),
        })?;
        let html_path = temp_dir.path().join("report.html");
        let pdf_path = temp_dir.path().join("report.pdf");

        tokio::fs::write(&html_path, &html)
            .await
            .map_err(|e| ReportError::RenderFailed {
                detail: format!("write markup: {e}"),
            })?;

        // --virtual-time-budget lets in-page resource loading settle before
        // printing, the headless equivalent of waiting for network idle.
        let mut command = Command::new(&self.chromium_bin);
        command
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--no-pdf-header-footer")
            .arg("--virtual-time-budget=5000")
            .arg(format!("--print-to-pdf={}", pdf_path.display()))
            .arg(&html_path)
            .kill_on_drop(true);

        let status = tokio::time::timeout(RENDER_TIMEOUT, command.status())
            .await
            .map_err(|_| ReportError::RenderFailed {
                detail: format!("headless render timed out after {RENDER_TIMEOUT:?}"),
            })?
            .map_err(|e| ReportError::RenderFailed {
                detail: format!("failed to launch {}: {e}", self.chromium_bin),
            })?;

        if !status.success() {
            return Err(ReportError::RenderFailed {
                detail: format!(
                    "{} exited with status {}",
                    self.chromium_bin,
                    status.code().unwrap_or(-1)
                ),
            });
        }

        let pdf = tokio::fs::read(&pdf_path)
            .await
            .map_err(|e| ReportError::RenderFailed {
                detail: format!("read rendered PDF: {e}"),
            })?;

        log::debug!("Headless render produced {} bytes", pdf.len());
        Ok(pdf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_options_become_print_css_inside_head() {
        let html = "<html><head><title>r</title></head><body></body></html>";
        let printed = apply_page_options(html, &PageOptions::default());
        assert!(printed.contains("@page { size: Letter; margin: 0.5in; }"));
        assert!(printed.contains("print-color-adjust: exact"));
        let style = printed.find("<style>").unwrap();
        assert!(style < printed.find("</head>").unwrap());
    }

    #[test]
    fn markup_without_a_head_still_gets_print_css() {
        let printed = apply_page_options("<p>report</p>", &PageOptions::default());
        assert!(printed.starts_with("<style>"));
        assert!(printed.ends_with("<p>report</p>"));
    }

    #[test]
    fn background_printing_can_be_disabled() {
        let options = PageOptions {
            print_background: false,
            ..PageOptions::default()
        };
        let printed = apply_page_options("<html><head></head></html>", &options);
        assert!(printed.contains("@page"));
        assert!(!printed.contains("print-color-adjust"));
    }

    #[tokio::test]
    async fn office_document_content_is_rejected() {
        let renderer = HeadlessChromiumRenderer::new("chromium".into());
        let err = renderer
            .render(
                RenderContent::OfficeDocument(vec![0u8; 4]),
                &PageOptions::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ReportError::RenderFailed { .. }));
    }

    #[tokio::test]
    async fn missing_browser_binary_fails_cleanly() {
        let renderer = HeadlessChromiumRenderer::new("definitely-not-a-browser".into());
        let err = renderer
            .render(
                RenderContent::Markup("<html></html>".into()),
                &PageOptions::default(),
            )
            .await
            .unwrap_err();
        match err {
            ReportError::RenderFailed { detail } => {
                assert!(detail.contains("definitely-not-a-browser"))
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
