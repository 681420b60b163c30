//! Environment-driven configuration.
//!
//! All settings come from the process environment (a `.env` file is loaded by
//! `run()` before this is read). `AppConfig::from_env` fails fast with a
//! descriptive message when a required variable is missing.

use std::env;
use std::path::{Path, PathBuf};

const DEFAULT_API_VERSION: &str = "9.2";
const DEFAULT_CHROMIUM_BIN: &str = "chromium";
const DEFAULT_SOFFICE_BIN: &str = "soffice";

/// Which render backends this deployment is allowed to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderCapability {
    /// Local headless browser and office converter are installed.
    Full,
    /// Sandboxed deployment (e.g. serverless): only the cloud render API.
    Sandboxed,
}

impl RenderCapability {
    fn parse(value: &str) -> Result<Self, String> {
        match value.to_ascii_lowercase().as_str() {
            "full" => Ok(Self::Full),
            "sandboxed" => Ok(Self::Sandboxed),
            other => Err(format!(
                "RENDER_CAPABILITY must be 'full' or 'sandboxed', got '{other}'"
            )),
        }
    }
}

/// Remote HTML-to-PDF conversion service settings.
#[derive(Debug, Clone)]
pub struct RenderApiConfig {
    pub endpoint: String,
    pub api_key: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Azure AD tenant the client-credentials exchange runs against.
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
    /// Base URL of the Dataverse environment, no trailing slash.
    pub dataverse_url: String,
    /// Web API version segment, e.g. "9.2".
    pub api_version: String,
    /// Optional cloud render API; absent in deployments that never use it.
    pub render_api: Option<RenderApiConfig>,
    pub capability: RenderCapability,
    pub chromium_bin: String,
    pub soffice_bin: String,
    /// Path to the Word report template with merge fields.
    pub docx_template: PathBuf,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, String> {
        let tenant_id = require("TENANT_ID")?;
        let client_id = require("CLIENT_ID")?;
        let client_secret = require("CLIENT_SECRET")?;
        let dataverse_url = require("DATAVERSE_URL")?.trim_end_matches('/').to_string();
        let api_version =
            env::var("DATAVERSE_API_VERSION").unwrap_or_else(|_| DEFAULT_API_VERSION.to_string());

        let render_api = match env::var("RENDER_API_URL") {
            Ok(endpoint) if !endpoint.is_empty() => Some(RenderApiConfig {
                endpoint,
                api_key: env::var("RENDER_API_KEY").unwrap_or_default(),
            }),
            _ => None,
        };

        let capability = match env::var("RENDER_CAPABILITY") {
            Ok(value) => RenderCapability::parse(&value)?,
            Err(_) => RenderCapability::Full,
        };

        let chromium_bin =
            env::var("CHROMIUM_BIN").unwrap_or_else(|_| DEFAULT_CHROMIUM_BIN.to_string());
        let soffice_bin =
            env::var("SOFFICE_BIN").unwrap_or_else(|_| DEFAULT_SOFFICE_BIN.to_string());

        let docx_template = env::var("REPORT_DOCX_TEMPLATE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/static"))
                    .join("SOP_Report_Rosemount_87XX.docx")
            });

        Ok(Self {
            tenant_id,
            client_id,
            client_secret,
            dataverse_url,
            api_version,
            render_api,
            capability,
            chromium_bin,
            soffice_bin,
            docx_template,
        })
    }

    /// OAuth2 scope for the client-credentials exchange.
    pub fn token_scope(&self) -> String {
        format!("{}/.default", self.dataverse_url)
    }

    /// Token endpoint of the identity provider.
    pub fn token_endpoint(&self) -> String {
        format!(
            "https://login.microsoftonline.com/{}/oauth2/v2.0/token",
            self.tenant_id
        )
    }
}

fn require(name: &str) -> Result<String, String> {
    env::var(name).map_err(|_| format!("{name} must be set"))
}
