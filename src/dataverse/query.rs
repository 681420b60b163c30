//! OData query string construction for the equipment table.
//!
//! Everything here is a pure function so the generated `$filter` / `$select`
//! clauses can be tested without a live environment. Filter values are user
//! input; embedded single quotes are escaped by doubling them, the OData
//! string-literal rule, so a value can never break out of its predicate.

use serde::Deserialize;
use utoipa::IntoParams;

pub const ENTITY_SET: &str = "cr164_equipments";

/// Projection used by every read. Explicit on purpose; a wildcard would pull
/// the whole column set across the wire.
const SELECT_FIELDS: [&str; 10] = [
    "cr164_equipmentid",
    "cr164_equipmentnumber",
    "cr164_equipmentdescription",
    "cr164_location",
    "cr164_manufacturer",
    "cr164_model",
    "cr164_serialnumber",
    "cr164_flowrange",
    "statecode",
    "createdon",
];

/// Substring filters accepted by the equipment list endpoint. Empty or
/// absent values are excluded from the query entirely.
#[derive(Debug, Default, Clone, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct EquipmentFilters {
    pub equipment_number: Option<String>,
    pub location: Option<String>,
    pub manufacturer: Option<String>,
    pub serial_number: Option<String>,
}

impl EquipmentFilters {
    /// (remote field name, pattern) pairs for the present, non-empty keys,
    /// in stable declaration order.
    fn present(&self) -> Vec<(&'static str, &str)> {
        let candidates = [
            ("cr164_equipmentnumber", &self.equipment_number),
            ("cr164_location", &self.location),
            ("cr164_manufacturer", &self.manufacturer),
            ("cr164_serialnumber", &self.serial_number),
        ];
        candidates
            .into_iter()
            .filter_map(|(field, value)| match value.as_deref() {
                Some(pattern) if !pattern.is_empty() => Some((field, pattern)),
                _ => None,
            })
            .collect()
    }
}

/// Escape a string for use inside an OData single-quoted literal.
pub fn escape_odata_string(value: &str) -> String {
    value.replace('\'', "''")
}

/// Build the `$filter` clause, or `None` when no filter applies.
pub fn build_filter(filters: &EquipmentFilters) -> Option<String> {
    let predicates: Vec<String> = filters
        .present()
        .into_iter()
        .map(|(field, pattern)| format!("contains({field}, '{}')", escape_odata_string(pattern)))
        .collect();

    if predicates.is_empty() {
        None
    } else {
        Some(predicates.join(" and "))
    }
}

/// Fixed `$select` projection.
pub fn select_clause() -> String {
    SELECT_FIELDS.join(",")
}

/// Fixed ordering for list queries: newest record first.
pub fn order_clause() -> &'static str {
    "createdon desc"
}

/// Relative path + query for a filtered list request.
pub fn list_path(filters: &EquipmentFilters) -> String {
    let mut path = format!("{ENTITY_SET}?$select={}", select_clause());
    if let Some(filter) = build_filter(filters) {
        path.push_str("&$filter=");
        path.push_str(&filter);
    }
    path.push_str("&$orderby=");
    path.push_str(order_clause());
    path
}

/// Relative path for a single-record request, with the same projection.
pub fn entity_path(id: &str) -> String {
    format!("{ENTITY_SET}({id})?$select={}", select_clause())
}

/// Relative path for requests addressing a record without a projection
/// (PATCH, DELETE).
pub fn entity_ref(id: &str) -> String {
    format!("{ENTITY_SET}({id})")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_filters_emit_no_clause() {
        assert_eq!(build_filter(&EquipmentFilters::default()), None);

        let blank = EquipmentFilters {
            equipment_number: Some(String::new()),
            location: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(build_filter(&blank), None);
        assert!(!list_path(&blank).contains("$filter"));
    }

    #[test]
    fn single_filter_emits_one_predicate() {
        let filters = EquipmentFilters {
            manufacturer: Some("Rosemount".into()),
            ..Default::default()
        };
        assert_eq!(
            build_filter(&filters).unwrap(),
            "contains(cr164_manufacturer, 'Rosemount')"
        );
    }

    #[test]
    fn multiple_filters_join_with_and_in_stable_order() {
        let filters = EquipmentFilters {
            serial_number: Some("1178295".into()),
            equipment_number: Some("000040694".into()),
            location: Some("Decew".into()),
            manufacturer: None,
        };
        let clause = build_filter(&filters).unwrap();
        assert_eq!(
            clause,
            "contains(cr164_equipmentnumber, '000040694') and \
             contains(cr164_location, 'Decew') and \
             contains(cr164_serialnumber, '1178295')"
        );
        assert_eq!(clause.matches("contains(").count(), 3);
    }

    #[test]
    fn embedded_quotes_are_doubled() {
        let filters = EquipmentFilters {
            location: Some("O'Connor plant".into()),
            ..Default::default()
        };
        assert_eq!(
            build_filter(&filters).unwrap(),
            "contains(cr164_location, 'O''Connor plant')"
        );
    }

    #[test]
    fn values_stay_case_sensitive_and_verbatim() {
        let filters = EquipmentFilters {
            manufacturer: Some("RoseMount 87XX".into()),
            ..Default::default()
        };
        assert!(build_filter(&filters).unwrap().contains("'RoseMount 87XX'"));
    }

    #[test]
    fn list_path_shape() {
        let filters = EquipmentFilters {
            equipment_number: Some("0000".into()),
            ..Default::default()
        };
        let path = list_path(&filters);
        assert!(path.starts_with("cr164_equipments?$select=cr164_equipmentid,"));
        assert!(path.contains("&$filter=contains(cr164_equipmentnumber, '0000')"));
        assert!(path.ends_with("&$orderby=createdon desc"));
        // The projection is explicit, never a wildcard.
        assert!(!path.contains('*'));
    }

    #[test]
    fn entity_paths() {
        assert_eq!(
            entity_path("abc-123"),
            format!("cr164_equipments(abc-123)?$select={}", select_clause())
        );
        assert_eq!(entity_ref("abc-123"), "cr164_equipments(abc-123)");
    }
}
