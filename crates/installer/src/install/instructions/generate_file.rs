//! GenerateFile instruction implementation
//!
//! Writes literal content produced by the installer.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::install::error::Result;
use crate::install::instructions::common_instruction_utils::{resolve_relative, write_file};

/// Write literal content to a file inside the package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateFileInstruction {
    pub destination: String,
    pub content: String,
}

impl GenerateFileInstruction {
    pub fn new<D: Into<String>, C: Into<String>>(destination: D, content: C) -> Self {
        Self {
            destination: destination.into(),
            content: content.into(),
        }
    }

    /// Write the content, creating intermediate directories first
    pub async fn execute(&self, destination_path: &Path, retry_delay: Duration) -> Result<()> {
        let output_path = resolve_relative(destination_path, &self.destination)?;
        write_file(&output_path, self.content.as_bytes(), retry_delay).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_generates_nested_file() {
        let dest = tempdir().unwrap();
        let instruction = GenerateFileInstruction::new("config/settings.json", "{\"a\": 1}");

        instruction.execute(dest.path(), Duration::from_millis(1)).await.unwrap();

        let written = tokio::fs::read_to_string(dest.path().join("config/settings.json")).await.unwrap();
        assert_eq!(written, "{\"a\": 1}");
    }
}
