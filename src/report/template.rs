//! Markup report template binding.
//!
//! The verification report layout lives in `static/equipment-report.html`
//! with `{{name}}` placeholders. Binding substitutes per-field values from an
//! equipment record; a missing field becomes the literal "N/A", never an
//! error.

use std::fs;
use std::path::Path;

use chrono::{Datelike, Utc};

use crate::dataverse::EquipmentRecord;

use super::ReportError;

const TEMPLATE_FILE: &str = "equipment-report.html";

/// Placeholder value for absent record fields.
pub const MISSING: &str = "N/A";

/// Date format used on reports, e.g. "August 30, 2026".
pub fn format_report_date() -> String {
    let now = Utc::now().date_naive();
    let months = [
        "January",
        "February",
        "March",
        "April",
        "May",
        "June",
        "July",
        "August",
        "September",
        "October",
        "November",
        "December",
    ];
    let month = months[(now.month0() as usize).min(months.len() - 1)];
    format!("{month} {}, {}", now.day(), now.year())
}

/// Escape a value for embedding in HTML text content.
pub fn escape_html(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

fn field(value: &Option<String>) -> String {
    match value.as_deref() {
        Some(v) if !v.is_empty() => escape_html(v),
        _ => MISSING.to_string(),
    }
}

/// The verification report markup template.
pub struct HtmlTemplate {
    template: String,
}

impl HtmlTemplate {
    /// Load the template from the crate's static directory.
    pub fn new() -> Result<Self, ReportError> {
        Self::from_path(&get_static_dir().join(TEMPLATE_FILE))
    }

    pub fn from_path(path: &Path) -> Result<Self, ReportError> {
        let template = fs::read_to_string(path).map_err(ReportError::TemplateIo)?;
        Ok(Self { template })
    }

    #[cfg(test)]
    fn from_source(template: &str) -> Self {
        Self {
            template: template.to_string(),
        }
    }

    /// Bind an equipment record into the template.
    pub fn render(&self, record: &EquipmentRecord) -> String {
        let status = match record.state_label() {
            Some(label) => escape_html(&label),
            None => MISSING.to_string(),
        };
        let status_class = if record.is_active() {
            "status-active"
        } else {
            "status-inactive"
        };

        let bindings = [
            ("currentDate", format_report_date()),
            ("equipmentNumber", field(&record.equipment_number)),
            ("description", field(&record.description)),
            ("location", field(&record.location)),
            ("manufacturer", field(&record.manufacturer)),
            ("model", field(&record.model)),
            ("serialNumber", field(&record.serial_number)),
            ("flowRange", field(&record.flow_range)),
            ("status", status),
            ("statusClass", status_class.to_string()),
        ];

        let mut html = self.template.clone();
        for (name, value) in bindings {
            html = html.replace(&format!("{{{{{name}}}}}"), &value);
        }
        html
    }
}

/// Get the static assets directory path.
pub fn get_static_dir() -> &'static Path {
    Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/static"))
}
