//! Word template merge-field binding.
//!
//! The SOP verification report ships as a pre-built `.docx` whose XML parts
//! carry `{FieldName}` merge tags. Binding replaces every tag with a value
//! from a fixed superset of field names; a tag with no binding is a
//! template/data contract violation and fails hard rather than being
//! silently blanked.

use std::collections::BTreeMap;
use std::fs;
use std::io::{Cursor, Read, Write};
use std::path::Path;

use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

use crate::dataverse::EquipmentRecord;

use super::template::{format_report_date, MISSING};
use super::ReportError;

fn opt(value: &Option<String>) -> String {
    match value.as_deref() {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => MISSING.to_string(),
    }
}

/// Merge data for one record: equipment attributes plus the static block of
/// test-result and tool values. The static values are report boilerplate
/// tied to this template version, reproduced as literal constants.
pub fn merge_data(record: &EquipmentRecord) -> BTreeMap<String, String> {
    let date = format_report_date();
    let number = opt(&record.equipment_number);
    let location = opt(&record.location);

    let mut data = BTreeMap::new();
    let mut put = |key: &str, value: String| {
        data.insert(key.to_string(), value);
    };

    // Customer information
    put("CustomerName", "Region of Niagara".into());
    put("PlantName", opt(&record.description));
    put("SiteAddress", location.clone());

    // Device information
    put("Make", opt(&record.manufacturer));
    put("Model", opt(&record.model));
    put("OrderCode", MISSING.into());
    put("SerialNo", opt(&record.serial_number));
    put("SoftwareVersion", "5.3.1".into());
    put("JobLocation", location);
    put("AssetID", number.clone());

    // Service information
    put("Date", date.clone());
    put("ReportNo", number.clone());
    put("JobNo", number);

    // Flow details
    put("Unit", "MLD".into());
    put("FlowRange", opt(&record.flow_range));
    put("CurrentOutput", "4-20 mA".into());
    put("SetPoint4mA", "0".into());
    put("SetPoint20mA", "14.725".into());

    // Sensor details
    put("LineSize", "6\"".into());
    put("FlowCalTubeNo", "090490550".into());
    put("Mounting", "Remote".into());
    put("InstReadingASFOUND", "385.74".into());
    put("InstReadingFlow", "0.56".into());

    // Test results (fixed four-point verification table)
    let test_rows: [[&str; 8]; 4] = [
        ["0.00", "0.00", "4.00", "0.00", "4.00", "0.00", "4.00", "0.00"],
        ["3.00", "3.00", "5.60", "2.98", "5.56", "0.02", "5.60", "1.44"],
        ["10.00", "10.00", "9.33", "10.03", "9.28", "-0.03", "9.33", "4.91"],
        ["30.00", "30.00", "20.00", "29.97", "19.98", "0.03", "20.00", "14.69"],
    ];
    let test_columns = [
        "TestPoint",
        "CalcFlow",
        "CalcOP",
        "UUTDisplay",
        "UUTOutput",
        "Deviation",
        "CalcmA",
        "SCADAValue",
    ];
    for (row, values) in test_rows.iter().enumerate() {
        for (column, value) in test_columns.iter().zip(values) {
            put(&format!("{column}{}", row + 1), (*value).into());
        }
    }

    // Tools used
    let tools = [
        ("Calibrator", "Rosemount", "8714D"),
        ("Electrical Multimeter", "Fluke", "T79"),
        (MISSING, MISSING, MISSING),
    ];
    for (i, (description, manufacturer, model)) in tools.iter().enumerate() {
        put(&format!("Tool{}Description", i + 1), (*description).into());
        put(&format!("Tool{}Manufacturer", i + 1), (*manufacturer).into());
        put(&format!("Tool{}Model", i + 1), (*model).into());
    }

    // Signature block
    put("ServiceTechnician", "Chetan Parekh".into());
    put("PrintedDate", date);

    put(
        "Status",
        record.state_label().unwrap_or_else(|| MISSING.into()),
    );

    data
}

/// Escape a value for insertion into document XML text nodes.
fn escape_xml(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// The pre-built Word report template.
pub struct DocxTemplate {
    bytes: Vec<u8>,
}

impl DocxTemplate {
    pub fn from_path(path: &Path) -> Result<Self, ReportError> {
        let bytes = fs::read(path).map_err(ReportError::TemplateIo)?;
        Ok(Self { bytes })
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Bind a record into the template, producing a finished DOCX.
    pub fn render(&self, record: &EquipmentRecord) -> Result<Vec<u8>, ReportError> {
        let data = merge_data(record);
        self.render_with(&data)
    }

    fn render_with(&self, data: &BTreeMap<String, String>) -> Result<Vec<u8>, ReportError> {
        let mut archive =
            ZipArchive::new(Cursor::new(&self.bytes)).map_err(|e| ReportError::TemplateInvalid {
                detail: e.to_string(),
            })?;
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default();

        for index in 0..archive.len() {
            let mut part = archive
                .by_index(index)
                .map_err(|e| ReportError::TemplateInvalid {
                    detail: e.to_string(),
                })?;
            let name = part.name().to_string();

            writer
                .start_file(&name, options)
                .map_err(|e| ReportError::TemplateInvalid {
                    detail: e.to_string(),
                })?;

            if is_bindable_part(&name) {
                let mut xml = String::new();
                part.read_to_string(&mut xml)
                    .map_err(|e| ReportError::TemplateInvalid {
                        detail: format!("{name}: {e}"),
                    })?;
                let bound = bind_tags(&xml, data)?;
                writer
                    .write_all(bound.as_bytes())
                    .map_err(ReportError::TemplateIo)?;
            } else {
                let mut raw = Vec::new();
                part.read_to_end(&mut raw)
                    .map_err(|e| ReportError::TemplateInvalid {
                        detail: format!("{name}: {e}"),
                    })?;
                writer.write_all(&raw).map_err(ReportError::TemplateIo)?;
            }
        }

        let cursor = writer.finish().map_err(|e| ReportError::TemplateInvalid {
            detail: e.to_string(),
        })?;
        Ok(cursor.into_inner())
    }
}

/// Parts that can carry merge tags: the document body plus headers/footers.
fn is_bindable_part(name: &str) -> bool {
    name == "word/document.xml"
        || (name.starts_with("word/header") && name.ends_with(".xml"))
        || (name.starts_with("word/footer") && name.ends_with(".xml"))
}

/// Replace every `{Tag}` occurrence with its bound value. A tag without a
/// binding is a hard error naming the offending field.
fn bind_tags(xml: &str, data: &BTreeMap<String, String>) -> Result<String, ReportError> {
    let mut output = String::with_capacity(xml.len());
    let mut rest = xml;

    while let Some(open) = rest.find('{') {
        output.push_str(&rest[..open]);
        let after_open = &rest[open + 1..];

        match after_open.find('}') {
            Some(close) if is_tag_name(&after_open[..close]) => {
                let tag = &after_open[..close];
                match data.get(tag) {
                    Some(value) => output.push_str(&escape_xml(value)),
                    None => {
                        return Err(ReportError::TemplateBinding {
                            field: tag.to_string(),
                        })
                    }
                }
                rest = &after_open[close + 1..];
            }
            _ => {
                // A lone brace in XML content, not a merge tag.
                output.push('{');
                rest = after_open;
            }
        }
    }

    output.push_str(rest);
    Ok(output)
}

fn is_tag_name(candidate: &str) -> bool {
    !candidate.is_empty()
        && candidate
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}
