//! Reading target lists supplied by the operator

use eyre::{Context, Result, eyre};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use targetstore::TargetResource;
use tracing::{debug, warn};

/// Accepted file shapes: a bare list, or a saved snapshot with `courses`
#[derive(Deserialize)]
#[serde(untagged)]
enum TargetFile {
    List(Vec<TargetResource>),
    Snapshot { courses: Vec<TargetResource> },
}

impl TargetFile {
    fn into_targets(self) -> Vec<TargetResource> {
        match self {
            Self::List(targets) | Self::Snapshot { courses: targets } => targets,
        }
    }
}

/// Parse a target list from JSON or YAML text
pub fn parse_targets(content: &str) -> Result<Vec<TargetResource>> {
    if let Ok(file) = serde_json::from_str::<TargetFile>(content) {
        return Ok(file.into_targets());
    }
    let file: TargetFile =
        serde_yaml::from_str(content).context("Target file is neither a JSON nor a YAML list of targets")?;
    Ok(file.into_targets())
}

/// Read and parse a target file
pub fn load_target_file(path: &Path) -> Result<Vec<TargetResource>> {
    debug!(path = %path.display(), "load_target_file: called");
    let content = fs::read_to_string(path).context(format!("Failed to read {}", path.display()))?;
    let targets = parse_targets(&content)?;
    if targets.is_empty() {
        return Err(eyre!("{} holds no targets", path.display()));
    }
    Ok(targets)
}

/// Drop targets missing a course or section id
///
/// Returns the kept targets and the number dropped.
pub fn sanitize(targets: Vec<TargetResource>) -> (Vec<TargetResource>, usize) {
    let total = targets.len();
    let kept: Vec<_> = targets
        .into_iter()
        .filter(|t| {
            let valid = t.is_valid();
            if !valid {
                warn!(id = %t.resource_id, section = %t.section_id, "Dropping target without course or section id");
            }
            valid
        })
        .collect();
    let dropped = total - kept.len();
    (kept, dropped)
}

/// Merge new targets into an existing list; a new entry replaces one with the same id
pub fn merge(existing: Vec<TargetResource>, incoming: Vec<TargetResource>) -> Vec<TargetResource> {
    let mut merged = existing;
    for target in incoming {
        match merged.iter_mut().find(|t| t.resource_id == target.resource_id) {
            Some(slot) => *slot = target,
            None => merged.push(target),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_json_catalog_keys() {
        let json = r#"[
            {"kch_id": "C1", "kcmc": "Calculus", "jxb_id": "J1", "jxbmc": "Calculus-01"},
            {"resource_id": "C2", "name": "Physics", "section_id": "J2", "qz": "1"}
        ]"#;

        let targets = parse_targets(json).unwrap();
        assert_eq!(targets.len(), 2);
        assert_eq!(targets[0].resource_id, "C1");
        assert_eq!(targets[0].section_name.as_deref(), Some("Calculus-01"));
        assert_eq!(targets[1].attribute_str("qz"), Some("1"));
    }

    #[test]
    fn test_incomplete_entry_dropped_rest_kept() {
        let json = r#"[
            {"kch_id": "C1", "kcmc": "Calculus", "jxb_id": "J1"},
            {"kch_id": "C2", "kcmc": "Physics"}
        ]"#;

        let (kept, dropped) = sanitize(parse_targets(json).unwrap());
        assert_eq!(dropped, 1);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].resource_id, "C1");
    }

    #[test]
    fn test_catalog_weighting_code_kept() {
        let json = r#"[{"kch_id": "C1", "kcmc": "Calc", "jxb_id": "J1", "qz": "90", "xf": 3}]"#;

        let targets = parse_targets(json).unwrap();
        assert_eq!(targets[0].attribute_str("qz"), Some("90"));
        assert_eq!(targets[0].attributes.get("xf"), Some(&serde_json::json!(3)));
        assert!(!targets[0].attributes.contains_key("kch_id"));
    }

    #[test]
    fn test_parse_snapshot_shape() {
        let json = r#"{"timestamp": 1.0, "created_at": "2024-09-01 08:00:00",
                       "courses": [{"kch_id": "C1", "jxb_id": "J1"}]}"#;
        let targets = parse_targets(json).unwrap();
        assert_eq!(targets.len(), 1);
        assert_eq!(targets[0].display_name(), "C1");
    }

    #[test]
    fn test_parse_yaml() {
        let yaml = "- resource_id: C1\n  name: Calculus\n  section_id: J1\n";
        let targets = parse_targets(yaml).unwrap();
        assert_eq!(targets[0].name, "Calculus");
    }

    #[test]
    fn test_parse_garbage_fails() {
        assert!(parse_targets("just some text").is_err());
    }

    #[test]
    fn test_sanitize_drops_invalid() {
        let targets = vec![
            TargetResource::new("C1", "Calculus", "J1"),
            TargetResource::new("", "Nameless", "J2"),
            TargetResource::new("C3", "No section", " "),
        ];
        let (kept, dropped) = sanitize(targets);
        assert_eq!(kept.len(), 1);
        assert_eq!(dropped, 2);
    }

    #[test]
    fn test_merge_replaces_by_id() {
        let existing = vec![
            TargetResource::new("C1", "Calculus", "J1"),
            TargetResource::new("C2", "Physics", "J2"),
        ];
        let incoming = vec![
            TargetResource::new("C2", "Physics", "J9"),
            TargetResource::new("C3", "Chemistry", "J3"),
        ];

        let merged = merge(existing, incoming);
        let ids: Vec<_> = merged.iter().map(|t| t.resource_id.as_str()).collect();
        assert_eq!(ids, vec!["C1", "C2", "C3"]);
        assert_eq!(merged[1].section_id, "J9");
    }
}
