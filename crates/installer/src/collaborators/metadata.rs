//! Package metadata and dependency rule types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

use crate::collaborators::store::ModRecord;
use crate::install::error::{FileOperation, InstallError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleKind {
    Requires,
    Recommends,
    Conflicts,
    Before,
    After,
}

/// Identifies a package by whatever the metadata knows about it.
/// Unset fields match anything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModReference {
    #[serde(rename = "fileId", default, skip_serializing_if = "Option::is_none")]
    pub file_id: Option<String>,
    #[serde(rename = "logicalFileName", default, skip_serializing_if = "Option::is_none")]
    pub logical_file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl ModReference {
    pub fn by_file_id<S: Into<String>>(file_id: S) -> Self {
        Self {
            file_id: Some(file_id.into()),
            ..Self::default()
        }
    }

    pub fn by_name<S: Into<String>>(logical_file_name: S) -> Self {
        Self {
            logical_file_name: Some(logical_file_name.into()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.file_id.is_none() && self.logical_file_name.is_none() && self.version.is_none()
    }

    /// Whether a metadata record describes the referenced package
    pub fn describes(&self, metadata: &ModMetadata) -> bool {
        if self.is_empty() {
            return false;
        }
        let check = |expected: &Option<String>, actual: &Option<String>| match expected {
            Some(expected) => actual.as_deref().is_some_and(|a| a.eq_ignore_ascii_case(expected)),
            None => true,
        };
        check(&self.file_id, &metadata.file_id)
            && check(&self.logical_file_name, &metadata.logical_file_name)
            && check(&self.version, &metadata.file_version)
    }

    /// Whether an installed package satisfies this reference
    pub fn matches(&self, record: &ModRecord) -> bool {
        if self.is_empty() {
            return false;
        }
        let check = |expected: &Option<String>, attribute: &str| match expected {
            Some(expected) => record.attribute_str(attribute) == Some(expected.as_str()),
            None => true,
        };
        check(&self.file_id, "fileId")
            && check(&self.logical_file_name, "logicalFileName")
            && check(&self.version, "version")
    }
}

impl std::fmt::Display for ModReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.logical_file_name, &self.file_id) {
            (Some(name), _) => write!(f, "{}", name)?,
            (None, Some(id)) => write!(f, "file {}", id)?,
            (None, None) => write!(f, "<unknown>")?,
        }
        if let Some(version) = &self.version {
            write!(f, " {}", version)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModRule {
    #[serde(rename = "type")]
    pub kind: RuleKind,
    pub reference: ModReference,
}

impl ModRule {
    pub fn requires(reference: ModReference) -> Self {
        Self {
            kind: RuleKind::Requires,
            reference,
        }
    }
}

/// One candidate metadata record for an archive
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModMetadata {
    #[serde(rename = "fileId", default)]
    pub file_id: Option<String>,
    #[serde(rename = "logicalFileName", default)]
    pub logical_file_name: Option<String>,
    #[serde(rename = "fileVersion", default)]
    pub file_version: Option<String>,
    #[serde(rename = "sourceURI", default)]
    pub source_uri: Option<String>,
    #[serde(default)]
    pub rules: Vec<ModRule>,
}

/// Looks up what is known about an archive or a referenced package
#[async_trait]
pub trait MetadataLookup: Send + Sync {
    async fn lookup(&self, archive: &Path, game_id: &str) -> Result<Vec<ModMetadata>>;

    async fn lookup_reference(&self, reference: &ModReference) -> Result<Vec<ModMetadata>>;
}

/// Lookup that never knows anything
#[derive(Debug, Default)]
pub struct NoMetadata;

#[async_trait]
impl MetadataLookup for NoMetadata {
    async fn lookup(&self, _archive: &Path, _game_id: &str) -> Result<Vec<ModMetadata>> {
        Ok(Vec::new())
    }

    async fn lookup_reference(&self, _reference: &ModReference) -> Result<Vec<ModMetadata>> {
        Ok(Vec::new())
    }
}

/// Metadata kept in a JSON object keyed by archive file name:
///
/// ```json
/// { "SkyUI_5_2.7z": { "fileId": "3863", "logicalFileName": "SkyUI",
///                     "rules": [{"type": "requires", "reference": {"logicalFileName": "SKSE"}}] },
///   "SKSE.7z": { "logicalFileName": "SKSE", "sourceURI": "https://example.com/SKSE.7z" } }
/// ```
#[derive(Debug, Clone, Default)]
pub struct JsonMetadata {
    archives: HashMap<String, ModMetadata>,
}

impl JsonMetadata {
    pub fn from_json(json: &str) -> Result<Self> {
        let archives: HashMap<String, ModMetadata> =
            serde_json::from_str(json).map_err(|e| InstallError::Metadata(e.to_string()))?;
        // file names compare case-insensitively
        let archives = archives
            .into_iter()
            .map(|(name, metadata)| (name.to_lowercase(), metadata))
            .collect();
        Ok(Self { archives })
    }

    pub async fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| InstallError::fs(path, FileOperation::Read, e))?;
        let metadata = Self::from_json(&text)?;
        debug!("loaded metadata for {} archives from {}", metadata.archives.len(), path.display());
        Ok(metadata)
    }
}

#[async_trait]
impl MetadataLookup for JsonMetadata {
    async fn lookup(&self, archive: &Path, _game_id: &str) -> Result<Vec<ModMetadata>> {
        let name = archive
            .file_name()
            .map(|n| n.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        Ok(self.archives.get(&name).cloned().into_iter().collect())
    }

    async fn lookup_reference(&self, reference: &ModReference) -> Result<Vec<ModMetadata>> {
        Ok(self
            .archives
            .values()
            .filter(|metadata| reference.describes(metadata))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_reference_matches_attributes() {
        let mut record = ModRecord::new("SkyUI");
        record.attributes.insert("fileId".into(), json!("1000"));
        record.attributes.insert("logicalFileName".into(), json!("SkyUI"));

        assert!(ModReference::by_file_id("1000").matches(&record));
        assert!(ModReference::by_name("SkyUI").matches(&record));
        assert!(!ModReference::by_file_id("2000").matches(&record));
        assert!(!ModReference::default().matches(&record));
    }

    #[test]
    fn test_rule_deserializes() {
        let rule: ModRule = serde_json::from_value(json!({
            "type": "requires",
            "reference": {"logicalFileName": "SKSE"}
        }))
        .unwrap();
        assert_eq!(rule, ModRule::requires(ModReference::by_name("SKSE")));
    }

    #[tokio::test]
    async fn test_json_metadata_lookups() {
        let metadata = JsonMetadata::from_json(
            r#"{
                "SkyUI_5_2.7z": {
                    "fileId": "3863",
                    "logicalFileName": "SkyUI",
                    "rules": [{"type": "requires", "reference": {"logicalFileName": "SKSE"}}]
                },
                "SKSE.7z": {"logicalFileName": "SKSE", "sourceURI": "https://example.com/SKSE.7z"}
            }"#,
        )
        .unwrap();

        let found = metadata.lookup(Path::new("/dl/skyui_5_2.7z"), "skyrimse").await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].rules, vec![ModRule::requires(ModReference::by_name("SKSE"))]);
        assert!(metadata.lookup(Path::new("/dl/other.7z"), "skyrimse").await.unwrap().is_empty());

        let skse = metadata.lookup_reference(&ModReference::by_name("skse")).await.unwrap();
        assert_eq!(skse[0].source_uri.as_deref(), Some("https://example.com/SKSE.7z"));
        assert!(metadata.lookup_reference(&ModReference::default()).await.unwrap().is_empty());
    }

    #[test]
    fn test_bad_json_is_a_metadata_error() {
        let result = JsonMetadata::from_json("[1, 2]");
        assert!(matches!(result, Err(InstallError::Metadata(_))));
    }
}
