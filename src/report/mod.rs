//! Report generation pipeline.
//!
//! This module is split into submodules for separation of concerns:
//! - `template` - markup report template binding
//! - `docx` - Word template merge-field binding
//! - `backend` - interchangeable render backends (headless browser, cloud
//!   API, office converter)
//! - `service` - orchestration and backend selection

pub mod backend;
pub mod docx;
pub mod service;
pub mod template;

pub use service::{OutputFormat, RenderStrategy, ReportRequest, ReportService};

use thiserror::Error;

use crate::dataverse::DataverseError;

pub const PDF_MIME: &str = "application/pdf";
pub const DOCX_MIME: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// Errors that can occur while producing a report.
#[derive(Debug, Error)]
pub enum ReportError {
    /// The template references a merge field the binding map does not supply.
    #[error("template references unbound field '{field}'")]
    TemplateBinding { field: String },
    /// The office conversion environment is missing or produced no output.
    #[error("document conversion environment unavailable: {detail}")]
    ConversionEnvironmentUnavailable { detail: String },
    /// No backend is configured for the requested format in this deployment.
    #[error("no render backend available for {format} via {strategy} in this deployment")]
    CapabilityUnavailable { format: String, strategy: String },
    /// A backend attempted the render and failed.
    #[error("render failed: {detail}")]
    RenderFailed { detail: String },
    /// The report template itself could not be loaded.
    #[error("failed to load report template: {0}")]
    TemplateIo(#[source] std::io::Error),
    /// The office template is not a well-formed document container.
    #[error("invalid office template: {detail}")]
    TemplateInvalid { detail: String },
    #[error(transparent)]
    Dataverse(#[from] DataverseError),
    /// Wrapper attaching the originating record id to any underlying error.
    #[error("report generation for record {id} failed: {source}")]
    Record {
        id: String,
        #[source]
        source: Box<ReportError>,
    },
}

impl ReportError {
    /// Attach the originating record id, unless it is already recorded.
    pub fn for_record(self, id: &str) -> Self {
        match self {
            already @ ReportError::Record { .. } => already,
            other => ReportError::Record {
                id: id.to_string(),
                source: Box::new(other),
            },
        }
    }

    /// Strip the record wrapper to reach the underlying failure.
    pub fn root(&self) -> &ReportError {
        match self {
            ReportError::Record { source, .. } => source.root(),
            other => other,
        }
    }
}

/// A finished document: raw bytes plus what the HTTP layer needs to serve it.
#[derive(Debug)]
pub struct RenderedDocument {
    pub bytes: Vec<u8>,
    pub content_type: &'static str,
    pub filename: String,
}
