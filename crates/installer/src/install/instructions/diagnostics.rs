//! Unsupported and Error instructions
//!
//! Neither touches the filesystem. `Error` aborts the install before any
//! other group runs; `Unsupported` is reported once per function name.

use serde::{Deserialize, Serialize};

/// The installer hit functionality it can't express
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnsupportedInstruction {
    pub function: String,
}

impl UnsupportedInstruction {
    pub fn new<S: Into<String>>(function: S) -> Self {
        Self { function: function.into() }
    }
}

/// The installer itself failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInstruction {
    pub message: String,
}

impl ErrorInstruction {
    pub fn new<S: Into<String>>(message: S) -> Self {
        Self { message: message.into() }
    }
}

/// Distinct function names in order of first appearance
pub fn distinct_functions(unsupported: &[UnsupportedInstruction]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for instruction in unsupported {
        if !names.contains(&instruction.function) {
            names.push(instruction.function.clone());
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicates_are_suppressed() {
        let unsupported = vec![
            UnsupportedInstruction::new("GetFileVersion"),
            UnsupportedInstruction::new("EditXml"),
            UnsupportedInstruction::new("GetFileVersion"),
        ];
        assert_eq!(distinct_functions(&unsupported), vec!["GetFileVersion", "EditXml"]);
    }
}
