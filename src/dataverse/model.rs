use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One row of the `cr164_equipments` table.
///
/// The identifier is assigned by Dataverse and never changes; every other
/// field may be absent and renders as "N/A" downstream.
#[derive(Debug, Serialize, Deserialize, Clone, ToSchema)]
pub struct EquipmentRecord {
    #[schema(example = "b2f7e6a0-1c2d-4e3f-9a8b-7c6d5e4f3a2b")]
    #[serde(rename = "cr164_equipmentid")]
    pub id: String,
    #[schema(example = "000040694")]
    #[serde(rename = "cr164_equipmentnumber")]
    pub equipment_number: Option<String>,
    #[schema(example = "Raw water inflow meter")]
    #[serde(rename = "cr164_equipmentdescription")]
    pub description: Option<String>,
    #[schema(example = "Decew WTP")]
    #[serde(rename = "cr164_location")]
    pub location: Option<String>,
    #[schema(example = "Rosemount")]
    #[serde(rename = "cr164_manufacturer")]
    pub manufacturer: Option<String>,
    #[schema(example = "8750W")]
    #[serde(rename = "cr164_model")]
    pub model: Option<String>,
    #[schema(example = "1178295")]
    #[serde(rename = "cr164_serialnumber")]
    pub serial_number: Option<String>,
    #[schema(example = "0 - 14.725 MLD")]
    #[serde(rename = "cr164_flowrange")]
    pub flow_range: Option<String>,
    /// Raw state code: 0 is Active, anything else Inactive.
    #[schema(example = 0)]
    #[serde(rename = "statecode")]
    pub state_code: Option<i32>,
    #[serde(rename = "createdon")]
    pub created_on: Option<DateTime<Utc>>,
    /// Formatted state label supplied by Dataverse alongside the raw code.
    #[schema(example = "Active")]
    #[serde(rename = "statecode@OData.Community.Display.V1.FormattedValue")]
    pub state_formatted: Option<String>,
}

impl EquipmentRecord {
    /// Human-readable state label. Prefers the formatted annotation from the
    /// service, falls back to deriving one from the raw code.
    pub fn state_label(&self) -> Option<String> {
        if let Some(formatted) = &self.state_formatted {
            return Some(formatted.clone());
        }
        self.state_code
            .map(|code| if code == 0 { "Active" } else { "Inactive" }.to_string())
    }

    /// True when the raw state code marks the record active.
    pub fn is_active(&self) -> bool {
        self.state_code == Some(0)
    }
}

/// Sparse payload for creating a record. Absent attributes are left out of
/// the outgoing JSON entirely so Dataverse applies its own defaults.
#[derive(Debug, Default, Serialize, Deserialize, Clone, ToSchema)]
pub struct NewEquipment {
    #[schema(example = "000040694")]
    #[serde(rename = "cr164_equipmentnumber", skip_serializing_if = "Option::is_none")]
    pub equipment_number: Option<String>,
    #[serde(rename = "cr164_equipmentdescription", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "cr164_location", skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(rename = "cr164_manufacturer", skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,
    #[serde(rename = "cr164_model", skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(rename = "cr164_serialnumber", skip_serializing_if = "Option::is_none")]
    pub serial_number: Option<String>,
    #[serde(rename = "cr164_flowrange", skip_serializing_if = "Option::is_none")]
    pub flow_range: Option<String>,
}

/// Sparse payload for updating a record. Fields left `None` are omitted from
/// the PATCH body, never sent as null.
pub type EquipmentPatch = NewEquipment;

/// Envelope Dataverse wraps list responses in.
#[derive(Debug, Deserialize)]
pub struct ListEnvelope {
    pub value: Vec<EquipmentRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    /// OData annotation key Dataverse uses for the readable state value.
    const STATE_FORMATTED_KEY: &str = "statecode@OData.Community.Display.V1.FormattedValue";

    #[test]
    fn deserializes_record_with_formatted_state() {
        let json = format!(
            r#"{{
                "cr164_equipmentid": "abc-123",
                "cr164_equipmentnumber": "000040694",
                "statecode": 0,
                "{STATE_FORMATTED_KEY}": "Active"
            }}"#
        );
        let record: EquipmentRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(record.id, "abc-123");
        assert_eq!(record.equipment_number.as_deref(), Some("000040694"));
        assert_eq!(record.state_label().as_deref(), Some("Active"));
        assert!(record.is_active());
        assert!(record.location.is_none());
    }

    #[test]
    fn state_label_falls_back_to_raw_code() {
        let json = r#"{"cr164_equipmentid": "abc", "statecode": 1}"#;
        let record: EquipmentRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.state_label().as_deref(), Some("Inactive"));
        assert!(!record.is_active());

        let json = r#"{"cr164_equipmentid": "abc"}"#;
        let record: EquipmentRecord = serde_json::from_str(json).unwrap();
        assert!(record.state_label().is_none());
    }

    #[test]
    fn partial_create_payload_serializes_only_present_keys() {
        let payload = NewEquipment {
            equipment_number: Some("000040694".into()),
            ..Default::default()
        };
        let value = serde_json::to_value(&payload).unwrap();
        let object = value.as_object().unwrap();
        assert_eq!(object.len(), 1);
        assert_eq!(
            object["cr164_equipmentnumber"],
            serde_json::json!("000040694")
        );
    }
}
