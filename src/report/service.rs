//! Report orchestration.
//!
//! `ReportService` glues the pipeline together: fetch the record, pick a
//! template and render backend from the policy table, bind, render, and hand
//! back bytes plus a suggested filename. Backend choice lives in one table
//! here; nothing else in the crate branches on strategy.

use std::sync::Arc;

use serde::Deserialize;
use utoipa::ToSchema;

use crate::config::{AppConfig, RenderCapability};
use crate::dataverse::{EquipmentRecord, RecordClient};

use super::backend::{
    CloudRenderClient, HeadlessChromiumRenderer, OfficeConverter, PageOptions, RenderBackend,
    RenderContent,
};
use super::docx::DocxTemplate;
use super::template::HtmlTemplate;
use super::{RenderedDocument, ReportError, DOCX_MIME, PDF_MIME};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Pdf,
    Docx,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Pdf => "PDF",
            Self::Docx => "DOCX",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum RenderStrategy {
    /// Headless browser on this host.
    Local,
    /// Remote HTML-to-PDF API.
    Cloud,
    /// Word template through the office converter.
    OfficeAutomation,
}

impl RenderStrategy {
    fn label(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Cloud => "cloud",
            Self::OfficeAutomation => "office-automation",
        }
    }
}

/// One report request. Built per HTTP call, never persisted.
#[derive(Debug, Clone)]
pub struct ReportRequest {
    pub record_id: String,
    pub format: OutputFormat,
    pub strategy: RenderStrategy,
}

/// How a given request will be served, as resolved by the policy table.
enum RenderPlan<'a> {
    /// Bind the Word template and return the DOCX itself.
    BoundDocx,
    /// Bind the markup template, render to PDF with the given backend.
    MarkupToPdf(&'a dyn RenderBackend),
    /// Bind the Word template, convert to PDF with the office backend.
    DocxToPdf(&'a dyn RenderBackend),
}

pub struct ReportService {
    records: Arc<RecordClient>,
    html_template: HtmlTemplate,
    docx_template: DocxTemplate,
    headless: Option<HeadlessChromiumRenderer>,
    cloud: Option<CloudRenderClient>,
    office: Option<OfficeConverter>,
}

impl ReportService {
    /// Wire up templates and whichever backends this deployment is capable
    /// of. Backends missing here surface later as `CapabilityUnavailable`,
    /// never as a partial render attempt.
    pub fn new(
        records: Arc<RecordClient>,
        render_http: reqwest::Client,
        config: &AppConfig,
    ) -> Result<Self, ReportError> {
        let local_allowed = config.capability == RenderCapability::Full;

        Ok(Self {
            records,
            html_template: HtmlTemplate::new()?,
            docx_template: DocxTemplate::from_path(&config.docx_template)?,
            headless: local_allowed
                .then(|| HeadlessChromiumRenderer::new(config.chromium_bin.clone())),
            cloud: config
                .render_api
                .as_ref()
                .map(|api| CloudRenderClient::new(render_http, api)),
            office: local_allowed.then(|| OfficeConverter::new(config.soffice_bin.clone())),
        })
    }

    /// What a plain PDF request uses when no strategy is asked for: the
    /// local browser when this deployment has one, the cloud API otherwise.
    pub fn default_pdf_strategy(&self) -> RenderStrategy {
        if self.headless.is_some() {
            RenderStrategy::Local
        } else {
            RenderStrategy::Cloud
        }
    }

    /// The policy table: (format, strategy, capability) -> plan.
    fn plan(&self, request: &ReportRequest) -> Result<RenderPlan<'_>, ReportError> {
        let unavailable = || ReportError::CapabilityUnavailable {
            format: request.format.label().to_string(),
            strategy: request.strategy.label().to_string(),
        };

        match (request.format, request.strategy) {
            // DOCX output needs no render backend at all.
            (OutputFormat::Docx, _) => Ok(RenderPlan::BoundDocx),
            (OutputFormat::Pdf, RenderStrategy::Local) => self
                .headless
                .as_ref()
                .map(|b| RenderPlan::MarkupToPdf(b))
                .ok_or_else(unavailable),
            (OutputFormat::Pdf, RenderStrategy::Cloud) => self
                .cloud
                .as_ref()
                .map(|b| RenderPlan::MarkupToPdf(b))
                .ok_or_else(unavailable),
            (OutputFormat::Pdf, RenderStrategy::OfficeAutomation) => self
                .office
                .as_ref()
                .map(|b| RenderPlan::DocxToPdf(b))
                .ok_or_else(unavailable),
        }
    }

    /// Produce the finished report for one record.
    pub async fn generate(&self, request: &ReportRequest) -> Result<RenderedDocument, ReportError> {
        let id = &request.record_id;
        // Resolve the plan before any I/O so an unconfigured backend is a
        // clean capability error, not a half-done render.
        let plan = self.plan(request).map_err(|e| e.for_record(id))?;

        let record = self
            .records
            .get(id)
            .await
            .map_err(|e| ReportError::from(e).for_record(id))?;

        let filename = suggested_filename(&record, id, request.format);
        log::info!(
            "Generating {} report for record {id} via {}",
            request.format.label(),
            request.strategy.label()
        );

        let (bytes, content_type) = match plan {
            RenderPlan::BoundDocx => {
                let docx = self
                    .docx_template
                    .render(&record)
                    .map_err(|e| e.for_record(id))?;
                (docx, DOCX_MIME)
            }
            RenderPlan::MarkupToPdf(backend) => {
                let html = self.html_template.render(&record);
                let pdf = backend
                    .render(RenderContent::Markup(html), &PageOptions::default())
                    .await
                    .map_err(|e| e.for_record(id))?;
                (pdf, PDF_MIME)
            }
            RenderPlan::DocxToPdf(backend) => {
                let docx = self
                    .docx_template
                    .render(&record)
                    .map_err(|e| e.for_record(id))?;
                let pdf = backend
                    .render(
                        RenderContent::OfficeDocument(docx),
                        &PageOptions::default(),
                    )
                    .await
                    .map_err(|e| e.for_record(id))?;
                (pdf, PDF_MIME)
            }
        };

        Ok(RenderedDocument {
            bytes,
            content_type,
            filename,
        })
    }
}

/// Deterministic download filename: `Equipment_<number-or-id>_Report.<ext>`.
pub fn suggested_filename(
    record: &EquipmentRecord,
    requested_id: &str,
    format: OutputFormat,
) -> String {
    let stem = record
        .equipment_number
        .as_deref()
        .filter(|n| !n.is_empty())
        .unwrap_or(requested_id);
    format!(
        "Equipment_{}_Report.{}",
        sanitize_filename::sanitize(stem),
        format.extension()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RenderApiConfig;
    use std::path::PathBuf;

    fn record(json: &str) -> EquipmentRecord {
        serde_json::from_str(json).unwrap()
    }

    fn config(capability: RenderCapability, with_cloud: bool) -> AppConfig {
        AppConfig {
            tenant_id: "tenant".into(),
            client_id: "client".into(),
            client_secret: "secret".into(),
            dataverse_url: "https://example.crm3.dynamics.com".into(),
            api_version: "9.2".into(),
            render_api: with_cloud.then(|| RenderApiConfig {
                endpoint: "https://render.example.com/convert".into(),
                api_key: "key".into(),
            }),
            capability,
            chromium_bin: "chromium".into(),
            soffice_bin: "soffice".into(),
            docx_template: PathBuf::from(concat!(
                env!("CARGO_MANIFEST_DIR"),
                "/static/SOP_Report_Rosemount_87XX.docx"
            )),
        }
    }

    fn service(capability: RenderCapability, with_cloud: bool) -> ReportService {
        let config = config(capability, with_cloud);
        let http = reqwest::Client::new();
        let records = Arc::new(RecordClient::new(http.clone(), &config));
        ReportService::new(records, http, &config).unwrap()
    }

    fn request(format: OutputFormat, strategy: RenderStrategy) -> ReportRequest {
        ReportRequest {
            record_id: "rec-1".into(),
            format,
            strategy,
        }
    }

    #[test]
    fn sandboxed_deployment_cannot_render_locally() {
        let service = service(RenderCapability::Sandboxed, true);
        for strategy in [RenderStrategy::Local, RenderStrategy::OfficeAutomation] {
            let err = service
                .plan(&request(OutputFormat::Pdf, strategy))
                .err()
                .expect("local strategies must be unavailable when sandboxed");
            assert!(matches!(err, ReportError::CapabilityUnavailable { .. }));
        }
        assert!(service
            .plan(&request(OutputFormat::Pdf, RenderStrategy::Cloud))
            .is_ok());
    }

    #[tokio::test]
    async fn capability_errors_carry_the_record_id() {
        let service = service(RenderCapability::Sandboxed, false);
        let err = service
            .generate(&request(OutputFormat::Pdf, RenderStrategy::Local))
            .await
            .unwrap_err();
        match &err {
            ReportError::Record { id, source } => {
                assert_eq!(id, "rec-1");
                assert!(matches!(**source, ReportError::CapabilityUnavailable { .. }));
            }
            other => panic!("unexpected error shape: {other}"),
        }
    }

    #[test]
    fn cloud_strategy_needs_a_configured_render_api() {
        let service = service(RenderCapability::Full, false);
        let err = service
            .plan(&request(OutputFormat::Pdf, RenderStrategy::Cloud))
            .err()
            .unwrap();
        match err {
            ReportError::CapabilityUnavailable { format, strategy } => {
                assert_eq!(format, "PDF");
                assert_eq!(strategy, "cloud");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn docx_output_never_needs_a_backend() {
        let service = service(RenderCapability::Sandboxed, false);
        assert!(matches!(
            service
                .plan(&request(OutputFormat::Docx, RenderStrategy::Local))
                .unwrap(),
            RenderPlan::BoundDocx
        ));
    }

    #[test]
    fn full_deployment_serves_every_pdf_strategy() {
        let service = service(RenderCapability::Full, true);
        for strategy in [
            RenderStrategy::Local,
            RenderStrategy::Cloud,
            RenderStrategy::OfficeAutomation,
        ] {
            assert!(service.plan(&request(OutputFormat::Pdf, strategy)).is_ok());
        }
    }

    #[test]
    fn filename_uses_equipment_number_for_pdf() {
        let record = record(
            r#"{"cr164_equipmentid": "abc-123", "cr164_equipmentnumber": "000040694"}"#,
        );
        assert_eq!(
            suggested_filename(&record, "abc-123", OutputFormat::Pdf),
            "Equipment_000040694_Report.pdf"
        );
    }

    #[test]
    fn filename_falls_back_to_record_id() {
        let record = record(r#"{"cr164_equipmentid": "abc-123"}"#);
        assert_eq!(
            suggested_filename(&record, "abc-123", OutputFormat::Docx),
            "Equipment_abc-123_Report.docx"
        );
    }

    #[test]
    fn filename_component_is_sanitized() {
        let record = record(
            r#"{"cr164_equipmentid": "abc", "cr164_equipmentnumber": "40/694: \"A\""}"#,
        );
        let name = suggested_filename(&record, "abc", OutputFormat::Pdf);
        assert!(name.starts_with("Equipment_"));
        assert!(name.ends_with("_Report.pdf"));
        assert!(!name.contains('/'));
        assert!(!name.contains('"'));
    }

    #[test]
    fn format_and_strategy_parse_from_query_values() {
        assert_eq!(
            serde_json::from_str::<OutputFormat>("\"pdf\"").unwrap(),
            OutputFormat::Pdf
        );
        assert_eq!(
            serde_json::from_str::<RenderStrategy>("\"office-automation\"").unwrap(),
            RenderStrategy::OfficeAutomation
        );
    }
}
