//! Shared application state.

use std::sync::Arc;
use std::time::Duration;

use crate::config::AppConfig;
use crate::dataverse::RecordClient;
use crate::report::ReportService;

/// Timeout for token and CRUD calls. Render calls carry their own, longer
/// per-request timeouts.
const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(15);

pub struct AppState {
    pub records: Arc<RecordClient>,
    pub reports: ReportService,
}

impl AppState {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let config = AppConfig::from_env()?;
        Self::new_with_config(config)
    }

    pub fn new_with_config(config: AppConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let http = reqwest::Client::builder()
            .timeout(UPSTREAM_TIMEOUT)
            .pool_idle_timeout(Duration::from_secs(900))
            .user_agent("indus-equipment-server/1.0")
            .build()?;

        let records = Arc::new(RecordClient::new(http.clone(), &config));
        let reports = ReportService::new(records.clone(), http, &config)?;

        Ok(Self { records, reports })
    }
}
