//! MkDir instruction implementation
//!
//! Creates directories that must exist even when empty.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::install::error::Result;
use crate::install::instructions::common_instruction_utils::{ensure_dir, resolve_relative};

/// Create a directory inside the package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MkDirInstruction {
    pub destination: String,
}

impl MkDirInstruction {
    pub fn new<D: Into<String>>(destination: D) -> Self {
        Self {
            destination: destination.into(),
        }
    }

    pub async fn execute(&self, destination_path: &Path, retry_delay: Duration) -> Result<()> {
        let dir = resolve_relative(destination_path, &self.destination)?;
        ensure_dir(&dir, retry_delay).await
    }
}
