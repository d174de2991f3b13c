//! Read-only field projections over a [`CompanySnapshot`].
//!
//! Each descriptor pairs a stable key with a pure extractor; the host (or the
//! CLI harness) renders whatever the extractor yields. Extractors are total:
//! missing or malformed data yields `None`, never an error.

use crate::models::CompanySnapshot;
use chrono::NaiveDate;
use serde_json::Value;
use std::fmt;

/// Date format used throughout the Companies House API.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Company status values the registry is known to report. Display metadata
/// only: an unrecognized status is passed through, not rejected.
pub const STATUS_OPTIONS: &[&str] = &[
    "active",
    "dissolved",
    "liquidation",
    "receivership",
    "administration",
    "voluntary-arrangement",
    "converted-closed",
    "insolvency-proceedings",
    "registered",
    "removed",
    "closed",
    "open",
];

/// A scalar projection result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SensorValue {
    Text(String),
    Date(NaiveDate),
}

impl fmt::Display for SensorValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SensorValue::Text(text) => f.write_str(text),
            SensorValue::Date(date) => write!(f, "{}", date.format(DATE_FORMAT)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorDeviceClass {
    Date,
    Enum,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinarySensorDeviceClass {
    /// The flag signals a problem when true (overdue filings, disputes).
    Problem,
}

/// A boolean projection descriptor.
pub struct BinarySensorDescriptor {
    pub key: &'static str,
    pub device_class: Option<BinarySensorDeviceClass>,
    pub value_fn: fn(&CompanySnapshot) -> Option<bool>,
}

/// A scalar/date projection descriptor.
pub struct SensorDescriptor {
    pub key: &'static str,
    pub icon: &'static str,
    pub device_class: Option<SensorDeviceClass>,
    pub options: Option<&'static [&'static str]>,
    pub value_fn: fn(&CompanySnapshot) -> Option<SensorValue>,
}

fn parse_profile_date(raw: Option<&str>) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw?, DATE_FORMAT).ok()
}

fn date_value(snapshot: &CompanySnapshot, keys: &[&str]) -> Option<SensorValue> {
    parse_profile_date(snapshot.str_at(keys)).map(SensorValue::Date)
}

fn text_value(snapshot: &CompanySnapshot, keys: &[&str]) -> Option<SensorValue> {
    snapshot
        .str_at(keys)
        .map(|text| SensorValue::Text(text.to_owned()))
}

/// Renders a registered-office address object as a single comma-joined line,
/// skipping absent or empty components.
fn format_address(address: Option<&Value>) -> Option<String> {
    const COMPONENTS: &[&str] = &[
        "premises",
        "address_line_1",
        "address_line_2",
        "locality",
        "region",
        "postal_code",
        "country",
    ];

    let address = address?.as_object()?;
    let parts: Vec<&str> = COMPONENTS
        .iter()
        .filter_map(|key| address.get(*key).and_then(Value::as_str))
        .filter(|part| !part.is_empty())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join(", "))
    }
}

/// Joins SIC classification codes into "12345, 67890"; `None` when the list
/// is absent or empty.
fn join_sic_codes(codes: Option<&Value>) -> Option<String> {
    let codes: Vec<&str> = codes?.as_array()?.iter().filter_map(Value::as_str).collect();
    if codes.is_empty() {
        None
    } else {
        Some(codes.join(", "))
    }
}

pub const BINARY_SENSORS: &[BinarySensorDescriptor] = &[
    BinarySensorDescriptor {
        key: "accounts_overdue",
        device_class: Some(BinarySensorDeviceClass::Problem),
        value_fn: |snapshot| snapshot.bool_at(&["accounts", "next_accounts", "overdue"]),
    },
    BinarySensorDescriptor {
        key: "confirmation_statement_overdue",
        device_class: Some(BinarySensorDeviceClass::Problem),
        value_fn: |snapshot| snapshot.bool_at(&["confirmation_statement", "overdue"]),
    },
    BinarySensorDescriptor {
        key: "has_insolvency_history",
        device_class: Some(BinarySensorDeviceClass::Problem),
        value_fn: |snapshot| snapshot.bool_at(&["has_insolvency_history"]),
    },
    BinarySensorDescriptor {
        key: "can_file",
        device_class: None,
        value_fn: |snapshot| snapshot.bool_at(&["can_file"]),
    },
    BinarySensorDescriptor {
        key: "registered_office_is_in_dispute",
        device_class: Some(BinarySensorDeviceClass::Problem),
        value_fn: |snapshot| snapshot.bool_at(&["registered_office_is_in_dispute"]),
    },
    BinarySensorDescriptor {
        key: "undeliverable_registered_office_address",
        device_class: Some(BinarySensorDeviceClass::Problem),
        value_fn: |snapshot| snapshot.bool_at(&["undeliverable_registered_office_address"]),
    },
];

pub const SENSORS: &[SensorDescriptor] = &[
    SensorDescriptor {
        key: "company_status",
        icon: "mdi:domain",
        device_class: Some(SensorDeviceClass::Enum),
        options: Some(STATUS_OPTIONS),
        value_fn: |snapshot| text_value(snapshot, &["company_status"]),
    },
    SensorDescriptor {
        key: "date_of_creation",
        icon: "mdi:calendar-star",
        device_class: Some(SensorDeviceClass::Date),
        options: None,
        value_fn: |snapshot| date_value(snapshot, &["date_of_creation"]),
    },
    SensorDescriptor {
        key: "accounts_next_due",
        icon: "mdi:calendar-clock",
        device_class: Some(SensorDeviceClass::Date),
        options: None,
        value_fn: |snapshot| date_value(snapshot, &["accounts", "next_accounts", "due_on"]),
    },
    SensorDescriptor {
        key: "last_accounts_type",
        icon: "mdi:file-percent",
        device_class: None,
        options: None,
        value_fn: |snapshot| text_value(snapshot, &["accounts", "last_accounts", "type"]),
    },
    SensorDescriptor {
        key: "confirmation_statement_next_due",
        icon: "mdi:calendar-clock",
        device_class: Some(SensorDeviceClass::Date),
        options: None,
        value_fn: |snapshot| date_value(snapshot, &["confirmation_statement", "next_due"]),
    },
    SensorDescriptor {
        key: "company_type",
        icon: "mdi:briefcase-variant",
        device_class: None,
        options: None,
        value_fn: |snapshot| text_value(snapshot, &["type"]),
    },
    SensorDescriptor {
        key: "jurisdiction",
        icon: "mdi:map-marker-radius",
        device_class: None,
        options: None,
        value_fn: |snapshot| text_value(snapshot, &["jurisdiction"]),
    },
    SensorDescriptor {
        key: "registered_office_address",
        icon: "mdi:map-marker",
        device_class: None,
        options: None,
        value_fn: |snapshot| {
            format_address(snapshot.get("registered_office_address")).map(SensorValue::Text)
        },
    },
    SensorDescriptor {
        key: "sic_codes",
        icon: "mdi:tag-multiple",
        device_class: None,
        options: None,
        value_fn: |snapshot| join_sic_codes(snapshot.get("sic_codes")).map(SensorValue::Text),
    },
    SensorDescriptor {
        key: "last_accounts_period_end",
        icon: "mdi:calendar-arrow-left",
        device_class: Some(SensorDeviceClass::Date),
        options: None,
        value_fn: |snapshot| {
            date_value(snapshot, &["accounts", "last_accounts", "period_end_on"])
        },
    },
    SensorDescriptor {
        key: "next_accounts_period_start",
        icon: "mdi:calendar-start",
        device_class: Some(SensorDeviceClass::Date),
        options: None,
        value_fn: |snapshot| {
            date_value(snapshot, &["accounts", "next_accounts", "period_start_on"])
        },
    },
    SensorDescriptor {
        key: "next_accounts_period_end",
        icon: "mdi:calendar-end",
        device_class: Some(SensorDeviceClass::Date),
        options: None,
        value_fn: |snapshot| {
            date_value(snapshot, &["accounts", "next_accounts", "period_end_on"])
        },
    },
    SensorDescriptor {
        key: "confirmation_statement_last_made",
        icon: "mdi:file-document-check",
        device_class: Some(SensorDeviceClass::Date),
        options: None,
        value_fn: |snapshot| {
            date_value(snapshot, &["confirmation_statement", "last_made_up_to"])
        },
    },
];

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snapshot(value: serde_json::Value) -> CompanySnapshot {
        CompanySnapshot::from_value(value).expect("object")
    }

    fn sensor(key: &str) -> &'static SensorDescriptor {
        SENSORS
            .iter()
            .find(|descriptor| descriptor.key == key)
            .expect("known sensor key")
    }

    fn binary_sensor(key: &str) -> &'static BinarySensorDescriptor {
        BINARY_SENSORS
            .iter()
            .find(|descriptor| descriptor.key == key)
            .expect("known binary sensor key")
    }

    #[test]
    fn descriptor_keys_are_unique() {
        let mut keys: Vec<&str> = BINARY_SENSORS
            .iter()
            .map(|d| d.key)
            .chain(SENSORS.iter().map(|d| d.key))
            .collect();
        let total = keys.len();
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(keys.len(), total);
        assert_eq!(BINARY_SENSORS.len(), 6);
        assert_eq!(SENSORS.len(), 13);
    }

    #[test]
    fn accounts_overdue_reads_nested_flag() {
        let descriptor = binary_sensor("accounts_overdue");
        let snap = snapshot(json!({"accounts": {"next_accounts": {"overdue": true}}}));
        assert_eq!((descriptor.value_fn)(&snap), Some(true));

        let empty = snapshot(json!({}));
        assert_eq!((descriptor.value_fn)(&empty), None);
    }

    #[test]
    fn date_of_creation_parses_iso_dates() {
        let descriptor = sensor("date_of_creation");
        let snap = snapshot(json!({"date_of_creation": "2020-01-15"}));
        let expected = NaiveDate::from_ymd_opt(2020, 1, 15).unwrap();
        assert_eq!((descriptor.value_fn)(&snap), Some(SensorValue::Date(expected)));
    }

    #[test]
    fn malformed_or_absent_dates_yield_none() {
        let descriptor = sensor("date_of_creation");
        let malformed = snapshot(json!({"date_of_creation": "not-a-date"}));
        assert_eq!((descriptor.value_fn)(&malformed), None);

        let absent = snapshot(json!({}));
        assert_eq!((descriptor.value_fn)(&absent), None);
    }

    #[test]
    fn sic_codes_join_with_comma() {
        let descriptor = sensor("sic_codes");
        let snap = snapshot(json!({"sic_codes": ["12345", "67890"]}));
        assert_eq!(
            (descriptor.value_fn)(&snap),
            Some(SensorValue::Text("12345, 67890".into()))
        );
    }

    #[test]
    fn empty_or_absent_sic_codes_yield_none() {
        let descriptor = sensor("sic_codes");
        assert_eq!((descriptor.value_fn)(&snapshot(json!({"sic_codes": []}))), None);
        assert_eq!((descriptor.value_fn)(&snapshot(json!({}))), None);
    }

    #[test]
    fn address_skips_empty_components() {
        let descriptor = sensor("registered_office_address");
        let snap = snapshot(json!({
            "registered_office_address": {
                "premises": "1",
                "address_line_1": "Main Street",
                "address_line_2": "",
                "locality": "London",
                "postal_code": "EC1A 1AA"
            }
        }));
        assert_eq!(
            (descriptor.value_fn)(&snap),
            Some(SensorValue::Text("1, Main Street, London, EC1A 1AA".into()))
        );
    }

    #[test]
    fn address_yields_none_when_absent_or_empty() {
        let descriptor = sensor("registered_office_address");
        assert_eq!((descriptor.value_fn)(&snapshot(json!({}))), None);
        assert_eq!(
            (descriptor.value_fn)(&snapshot(json!({"registered_office_address": {}}))),
            None
        );
    }

    #[test]
    fn unknown_company_status_passes_through() {
        let descriptor = sensor("company_status");
        let snap = snapshot(json!({"company_status": "suspended-pending-review"}));
        assert_eq!(
            (descriptor.value_fn)(&snap),
            Some(SensorValue::Text("suspended-pending-review".into()))
        );
        assert_eq!(descriptor.options, Some(STATUS_OPTIONS));
    }

    #[test]
    fn date_values_render_in_api_format() {
        let value = SensorValue::Date(NaiveDate::from_ymd_opt(2021, 12, 31).unwrap());
        assert_eq!(value.to_string(), "2021-12-31");
    }
}
