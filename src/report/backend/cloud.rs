//! Cloud HTML-to-PDF renderer.
//!
//! Posts the report markup and page options to a remote conversion service.
//! Used by sandboxed deployments that cannot run a local browser.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::config::RenderApiConfig;
use crate::report::ReportError;

use super::{expect_markup, PageOptions, RenderBackend, RenderContent};

const RENDER_TIMEOUT: Duration = Duration::from_secs(60);

pub struct CloudRenderClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
}

#[derive(Serialize)]
struct RenderPayload<'a> {
    html: &'a str,
    page_size: &'static str,
    margin: &'static str,
    print_background: bool,
}

impl CloudRenderClient {
    pub fn new(http: reqwest::Client, config: &RenderApiConfig) -> Self {
        Self {
            http,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
        }
    }
}

#[async_trait]
impl RenderBackend for CloudRenderClient {
    async fn render(
        &self,
        content: RenderContent,
        options: &PageOptions,
    ) -> Result<Vec<u8>, ReportError> {
        let html = expect_markup(content)?;
        let payload = RenderPayload {
            html: &html,
            page_size: options.page_size,
            margin: options.margin,
            print_background: options.print_background,
        };

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .timeout(RENDER_TIMEOUT)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ReportError::RenderFailed {
                detail: format!("render API unreachable: {e}"),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            log::error!("Render API returned {status}: {body}");
            return Err(ReportError::RenderFailed {
                detail: format!("render API returned {status}: {body}"),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ReportError::RenderFailed {
                detail: format!("render API body: {e}"),
            })?;
        Ok(bytes.to_vec())
    }
}
