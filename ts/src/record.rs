//! Records persisted by the TargetStore

use chrono::{Local, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One desired acquisition target (a course section)
///
/// Field aliases accept the keys used by the course catalog
/// (`kch_id`, `kcmc`, `jxb_id`, `jxbmc`) so catalog exports load as-is. Every
/// other top-level key lands in `attributes`. Missing ids deserialize as empty
/// strings; see [`TargetResource::is_valid`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetResource {
    /// Stable resource identifier (course number)
    #[serde(alias = "kch_id", default)]
    pub resource_id: String,

    /// Human-readable course name
    #[serde(alias = "kcmc", default)]
    pub name: String,

    /// Section / teaching-class identifier
    #[serde(alias = "jxb_id", default)]
    pub section_id: String,

    /// Human-readable section name
    #[serde(alias = "jxbmc", default, skip_serializing_if = "Option::is_none")]
    pub section_name: Option<String>,

    /// Opaque attributes forwarded to the acquisition client (e.g. `qz`)
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl TargetResource {
    /// Create a target with no section name and no attributes
    pub fn new(resource_id: impl Into<String>, name: impl Into<String>, section_id: impl Into<String>) -> Self {
        Self {
            resource_id: resource_id.into(),
            name: name.into(),
            section_id: section_id.into(),
            section_name: None,
            attributes: Map::new(),
        }
    }

    /// Set the section name
    pub fn with_section_name(mut self, section_name: impl Into<String>) -> Self {
        self.section_name = Some(section_name.into());
        self
    }

    /// Add an opaque attribute
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Look up a string attribute
    pub fn attribute_str(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(Value::as_str)
    }

    /// Name to show the operator
    pub fn display_name(&self) -> &str {
        if !self.name.is_empty() {
            &self.name
        } else if let Some(section_name) = self.section_name.as_deref() {
            section_name
        } else {
            &self.resource_id
        }
    }

    /// A target is usable only when both identifiers are present
    pub fn is_valid(&self) -> bool {
        !self.resource_id.trim().is_empty() && !self.section_id.trim().is_empty()
    }
}

/// Last-known status of a target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TargetStatus {
    #[default]
    Waiting,
    Success,
    Failed,
}

impl std::fmt::Display for TargetStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Waiting => write!(f, "waiting"),
            Self::Success => write!(f, "success"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl std::str::FromStr for TargetStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "waiting" => Ok(Self::Waiting),
            "success" => Ok(Self::Success),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("Unknown status: {}", s)),
        }
    }
}

/// Status entry for one target; overwritten on every update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusRecord {
    pub status: TargetStatus,
    #[serde(default)]
    pub message: String,
    #[serde(with = "local_time")]
    pub updated_at: NaiveDateTime,
}

impl StatusRecord {
    /// Create a record stamped with the current local time
    pub fn now(status: TargetStatus, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            updated_at: Local::now().naive_local(),
        }
    }
}

/// On-disk snapshot of the target list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetSnapshot {
    /// Unix timestamp (seconds, fractional) of the save
    pub timestamp: f64,
    /// Local wall-clock time of the save
    #[serde(with = "local_time")]
    pub created_at: NaiveDateTime,
    /// Targets in operator order
    #[serde(default)]
    pub courses: Vec<TargetResource>,
}

impl TargetSnapshot {
    /// Stamp a new snapshot for the given targets
    pub fn new(courses: Vec<TargetResource>) -> Self {
        Self {
            timestamp: Utc::now().timestamp_millis() as f64 / 1000.0,
            created_at: Local::now().naive_local(),
            courses,
        }
    }
}

mod local_time {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::TIMESTAMP_FORMAT;

    pub fn serialize<S: Serializer>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.format(TIMESTAMP_FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&raw, TIMESTAMP_FORMAT).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_aliases() {
        let json = r#"{"kch_id": "08305001", "kcmc": "Compilers", "jxb_id": "JXB-7", "jxbmc": "Compilers (Tue)"}"#;
        let target: TargetResource = serde_json::from_str(json).unwrap();

        assert_eq!(target.resource_id, "08305001");
        assert_eq!(target.name, "Compilers");
        assert_eq!(target.section_id, "JXB-7");
        assert_eq!(target.section_name.as_deref(), Some("Compilers (Tue)"));
        assert!(target.attributes.is_empty());
    }

    #[test]
    fn test_top_level_keys_round_trip_as_attributes() {
        let json = r#"{"kch_id": "C1", "jxb_id": "J1", "qz": "90"}"#;
        let target: TargetResource = serde_json::from_str(json).unwrap();
        assert_eq!(target.attribute_str("qz"), Some("90"));

        let saved = serde_json::to_value(&target).unwrap();
        assert_eq!(saved["qz"], "90");
        assert_eq!(saved["resource_id"], "C1");
        let back: TargetResource = serde_json::from_value(saved).unwrap();
        assert_eq!(back, target);
    }

    #[test]
    fn test_missing_ids_load_as_invalid() {
        let target: TargetResource = serde_json::from_str(r#"{"kch_id": "C2"}"#).unwrap();
        assert_eq!(target.section_id, "");
        assert!(!target.is_valid());
    }

    #[test]
    fn test_attributes() {
        let target = TargetResource::new("A", "Algebra", "S1").with_attribute("qz", "90");
        assert_eq!(target.attribute_str("qz"), Some("90"));
        assert_eq!(target.attribute_str("missing"), None);

        let json = serde_json::to_string(&target).unwrap();
        assert!(json.contains("\"qz\":\"90\""));
        assert!(!json.contains("section_name"));
    }

    #[test]
    fn test_display_name_fallbacks() {
        assert_eq!(TargetResource::new("A", "Algebra", "S1").display_name(), "Algebra");
        assert_eq!(
            TargetResource::new("A", "", "S1").with_section_name("Sec").display_name(),
            "Sec"
        );
        assert_eq!(TargetResource::new("A", "", "S1").display_name(), "A");
    }

    #[test]
    fn test_is_valid() {
        assert!(TargetResource::new("A", "", "S1").is_valid());
        assert!(!TargetResource::new("", "Algebra", "S1").is_valid());
        assert!(!TargetResource::new("A", "Algebra", "  ").is_valid());
    }

    #[test]
    fn test_status_serde() {
        assert_eq!(serde_json::to_string(&TargetStatus::Success).unwrap(), "\"success\"");
        assert_eq!("FAILED".parse::<TargetStatus>().unwrap(), TargetStatus::Failed);
        assert!("done".parse::<TargetStatus>().is_err());
    }

    #[test]
    fn test_status_record_timestamp_format() {
        let json = r#"{"status": "failed", "message": "full", "updated_at": "2025-02-17 09:30:00"}"#;
        let record: StatusRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.status, TargetStatus::Failed);
        assert_eq!(record.updated_at.format("%H:%M").to_string(), "09:30");

        let back = serde_json::to_string(&record).unwrap();
        assert!(back.contains("\"2025-02-17 09:30:00\""));
    }
}
