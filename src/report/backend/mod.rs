//! Interchangeable render backends.
//!
//! All three backends share one contract: take renderable content and page
//! options, return final document bytes. Which backend serves a request is
//! decided by the policy table in `report::service`, never here.

mod cloud;
mod headless;
mod office;

pub use cloud::CloudRenderClient;
pub use headless::HeadlessChromiumRenderer;
pub use office::OfficeConverter;

use async_trait::async_trait;
use serde::Serialize;

use super::ReportError;

/// Content handed to a backend: either report markup or an already-bound
/// office document.
#[derive(Debug, Clone)]
pub enum RenderContent {
    Markup(String),
    OfficeDocument(Vec<u8>),
}

/// Page geometry for paginated output. Mirrors the report's print settings:
/// Letter, half-inch margins, background graphics on.
#[derive(Debug, Clone, Serialize)]
pub struct PageOptions {
    pub page_size: &'static str,
    pub margin: &'static str,
    pub print_background: bool,
}

impl Default for PageOptions {
    fn default() -> Self {
        Self {
            page_size: "Letter",
            margin: "0.5in",
            print_background: true,
        }
    }
}

/// A strategy for turning rendered content into document bytes.
#[async_trait]
pub trait RenderBackend: Send + Sync {
    async fn render(
        &self,
        content: RenderContent,
        options: &PageOptions,
    ) -> Result<Vec<u8>, ReportError>;
}

/// Shared guard for backends that only accept markup.
fn expect_markup(content: RenderContent) -> Result<String, ReportError> {
    match content {
        RenderContent::Markup(html) => Ok(html),
        RenderContent::OfficeDocument(_) => Err(ReportError::RenderFailed {
            detail: "backend accepts markup content only".into(),
        }),
    }
}
