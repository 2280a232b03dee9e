//! Status check records pulled from the remote dump endpoint.

use std::fmt;

use serde::{Deserialize, Deserializer};

use crate::error::ParseError;

/// One status check as stored in the destination table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusRecord {
    pub site: String,
    pub status: i32,
    /// Latency in milliseconds.
    pub ms: i32,
    pub pod: String,
    pub redir: Option<String>,
    pub cross_domain: bool,
    /// Check time in milliseconds since the Unix epoch.
    pub time: i64,
}

impl StatusRecord {
    /// Natural key used for deduplication.
    pub fn key(&self) -> RecordKey {
        RecordKey::new(&self.site, self.time)
    }

    /// Validate one JSON item from the remote `data` array.
    pub fn from_json(value: &serde_json::Value) -> Result<Self, ParseError> {
        if !value.is_object() {
            return Err(ParseError::Malformed(format!(
                "expected an object, got {}",
                json_kind(value)
            )));
        }
        let raw = RawStatusRecord::deserialize(value)
            .map_err(|e| ParseError::Malformed(e.to_string()))?;
        Self::try_from(raw)
    }
}

/// `(site, timestamp)` pair identifying a record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordKey {
    pub site: String,
    pub timestamp: i64,
}

impl RecordKey {
    pub fn new(site: &str, timestamp: i64) -> Self {
        Self {
            site: site.to_string(),
            timestamp,
        }
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.site, self.timestamp)
    }
}

/// Wire shape with every field optional so validation can name what is missing.
#[derive(Debug, Deserialize)]
struct RawStatusRecord {
    site: Option<String>,
    status: Option<i64>,
    ms: Option<i64>,
    pod: Option<String>,
    #[serde(default)]
    redir: Option<String>,
    #[serde(
        default,
        rename = "cross-domain",
        alias = "cross_domain",
        deserialize_with = "deserialize_flag"
    )]
    cross_domain: Option<bool>,
    time: Option<i64>,
}

impl TryFrom<RawStatusRecord> for StatusRecord {
    type Error = ParseError;

    fn try_from(raw: RawStatusRecord) -> Result<Self, Self::Error> {
        let site = raw
            .site
            .map(|s| s.trim().to_string())
            .ok_or(ParseError::MissingField("site"))?;
        if site.is_empty() {
            return Err(ParseError::InvalidField {
                field: "site",
                reason: "empty".to_string(),
            });
        }

        let status = narrow("status", raw.status.ok_or(ParseError::MissingField("status"))?)?;
        let ms = narrow("ms", raw.ms.ok_or(ParseError::MissingField("ms"))?)?;
        let pod = raw.pod.ok_or(ParseError::MissingField("pod"))?;
        let time = raw.time.ok_or(ParseError::MissingField("time"))?;

        Ok(StatusRecord {
            site,
            status,
            ms,
            pod,
            redir: raw.redir,
            cross_domain: raw.cross_domain.unwrap_or(false),
            time,
        })
    }
}

fn narrow(field: &'static str, value: i64) -> Result<i32, ParseError> {
    i32::try_from(value).map_err(|_| ParseError::InvalidField {
        field,
        reason: format!("{} out of range", value),
    })
}

/// Accepts `true`/`false`, `0`/`1` and `null`.
fn deserialize_flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Int(i64),
    }

    Ok(match Option::<Flag>::deserialize(deserializer)? {
        Some(Flag::Bool(b)) => Some(b),
        Some(Flag::Int(n)) => Some(n != 0),
        None => None,
    })
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_full_record() {
        let value = json!({
            "site": "example.com",
            "status": 301,
            "ms": 120,
            "pod": "pod-eu-1",
            "redir": "https://other.example/",
            "cross-domain": true,
            "time": 1_700_000_000_000i64
        });

        let record = StatusRecord::from_json(&value).unwrap();
        assert_eq!(record.site, "example.com");
        assert_eq!(record.status, 301);
        assert_eq!(record.redir.as_deref(), Some("https://other.example/"));
        assert!(record.cross_domain);
        assert_eq!(record.key().to_string(), "example.com_1700000000000");
    }

    #[test]
    fn test_optional_fields_default() {
        let value = json!({
            "site": "example.com",
            "status": 200,
            "ms": 40,
            "pod": "pod-us-2",
            "redir": null,
            "time": 5
        });

        let record = StatusRecord::from_json(&value).unwrap();
        assert_eq!(record.redir, None);
        assert!(!record.cross_domain);
    }

    #[test]
    fn test_cross_domain_accepts_integer_flag() {
        let value = json!({
            "site": "a.com", "status": 302, "ms": 1, "pod": "p", "cross-domain": 1, "time": 9
        });
        assert!(StatusRecord::from_json(&value).unwrap().cross_domain);
    }

    #[test]
    fn test_missing_required_field_is_rejected() {
        let value = json!({ "site": "example.com", "status": 200, "ms": 40, "pod": "p" });
        assert_eq!(
            StatusRecord::from_json(&value),
            Err(ParseError::MissingField("time"))
        );

        let value = json!({ "status": 200, "ms": 40, "pod": "p", "time": 1 });
        assert_eq!(
            StatusRecord::from_json(&value),
            Err(ParseError::MissingField("site"))
        );
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let blank = json!({ "site": "  ", "status": 200, "ms": 40, "pod": "p", "time": 1 });
        assert!(matches!(
            StatusRecord::from_json(&blank),
            Err(ParseError::InvalidField { field: "site", .. })
        ));

        let huge = json!({ "site": "a", "status": 200, "ms": 1i64 << 40, "pod": "p", "time": 1 });
        assert!(matches!(
            StatusRecord::from_json(&huge),
            Err(ParseError::InvalidField { field: "ms", .. })
        ));

        let wrong_type = json!({ "site": "a", "status": "ok", "ms": 1, "pod": "p", "time": 1 });
        assert!(matches!(
            StatusRecord::from_json(&wrong_type),
            Err(ParseError::Malformed(_))
        ));

        assert!(matches!(
            StatusRecord::from_json(&json!([1, 2])),
            Err(ParseError::Malformed(_))
        ));
    }
}
