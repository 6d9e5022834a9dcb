//! Submodule instruction
//!
//! References a nested archive that is installed into the same destination.
//! Execution lives in the executor because it re-enters the whole pipeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmoduleInstruction {
    /// Nested archive to extract
    pub path: PathBuf,
    /// Distinguishes the nested staging directory
    pub key: String,
    /// Type override applied to the package once the submodule is installed
    #[serde(rename = "submoduleType", default, skip_serializing_if = "Option::is_none")]
    pub submodule_type: Option<String>,
}

impl SubmoduleInstruction {
    pub fn new<P: Into<PathBuf>, K: Into<String>>(path: P, key: K) -> Self {
        Self {
            path: path.into(),
            key: key.into(),
            submodule_type: None,
        }
    }

    pub fn with_type<S: Into<String>>(mut self, submodule_type: S) -> Self {
        self.submodule_type = Some(submodule_type.into());
        self
    }
}
