use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// A registered company number, held in the registry's canonical form.
///
/// Companies House treats numbers case-insensitively and ignores surrounding
/// whitespace; this type normalizes on construction (trim, upper-case) so a
/// `CompanyNumber` can be used directly as a unique watch key and in request
/// paths. Normalization is idempotent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct CompanyNumber(String);

impl CompanyNumber {
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(raw.as_ref().trim().to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CompanyNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for CompanyNumber {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for CompanyNumber {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<CompanyNumber> for String {
    fn from(value: CompanyNumber) -> Self {
        value.0
    }
}

/// An API key for the registry. `Debug` and `Display` never reveal the value;
/// callers that build credentials use [`ApiKey::expose`].
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(raw.as_ref().trim().to_owned())
    }

    /// The raw key material.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey([REDACTED])")
    }
}

impl From<String> for ApiKey {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<ApiKey> for String {
    fn from(value: ApiKey) -> Self {
        value.0
    }
}

/// The last successfully fetched company-profile document.
///
/// A snapshot is immutable once built; the poller replaces the whole document
/// on a successful refresh and never mutates one in place. All lookups are
/// null-safe: absent keys and non-object intermediates yield `None`, never an
/// error, so projections stay total over partial documents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompanySnapshot(Map<String, Value>);

impl CompanySnapshot {
    /// Builds a snapshot from an arbitrary JSON value. Returns `None` when
    /// the value is not an object.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Top-level field lookup.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Nested lookup along `keys`. Stops with `None` as soon as an
    /// intermediate node is absent or not an object.
    pub fn path(&self, keys: &[&str]) -> Option<&Value> {
        let (first, rest) = keys.split_first()?;
        let mut current = self.0.get(*first)?;
        for key in rest {
            current = current.as_object()?.get(*key)?;
        }
        Some(current)
    }

    /// Nested lookup yielding a string, or `None` for anything else.
    pub fn str_at(&self, keys: &[&str]) -> Option<&str> {
        self.path(keys).and_then(Value::as_str)
    }

    /// Nested lookup yielding a boolean, or `None` for anything else.
    pub fn bool_at(&self, keys: &[&str]) -> Option<bool> {
        self.path(keys).and_then(Value::as_bool)
    }

    /// The registered company name, when present.
    pub fn company_name(&self) -> Option<&str> {
        self.str_at(&["company_name"])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snapshot(value: Value) -> CompanySnapshot {
        CompanySnapshot::from_value(value).expect("object")
    }

    #[test]
    fn company_number_normalizes() {
        assert_eq!(CompanyNumber::new(" ab123 ").as_str(), "AB123");
    }

    #[test]
    fn company_number_normalization_is_idempotent() {
        let once = CompanyNumber::new(" ab123 ");
        let twice = CompanyNumber::new(once.as_str());
        assert_eq!(once, twice);
    }

    #[test]
    fn api_key_debug_is_redacted() {
        let key = ApiKey::new("super-secret");
        assert!(!format!("{key:?}").contains("super-secret"));
    }

    #[test]
    fn path_walks_nested_objects() {
        let snap = snapshot(json!({
            "accounts": {"next_accounts": {"overdue": true}}
        }));
        assert_eq!(
            snap.bool_at(&["accounts", "next_accounts", "overdue"]),
            Some(true)
        );
    }

    #[test]
    fn path_is_null_safe() {
        let snap = snapshot(json!({}));
        assert_eq!(snap.bool_at(&["accounts", "next_accounts", "overdue"]), None);

        // Intermediate node is a scalar, not an object.
        let snap = snapshot(json!({"accounts": 7}));
        assert_eq!(snap.path(&["accounts", "next_accounts"]), None);
    }

    #[test]
    fn from_value_rejects_non_objects() {
        assert!(CompanySnapshot::from_value(json!([1, 2, 3])).is_none());
        assert!(CompanySnapshot::from_value(json!("text")).is_none());
    }
}
