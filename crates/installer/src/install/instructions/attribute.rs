//! Attribute and SetModType instructions
//!
//! Pure metadata writes against the package record.

use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeInstruction {
    pub key: String,
    pub value: serde_json::Value,
}

impl AttributeInstruction {
    pub fn new<K: Into<String>>(key: K, value: serde_json::Value) -> Self {
        Self { key: key.into(), value }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetModTypeInstruction {
    pub value: String,
}

impl SetModTypeInstruction {
    pub fn new<S: Into<String>>(value: S) -> Self {
        Self { value: value.into() }
    }
}

/// The type to apply: the last one wins.
// Multiple SetModType instructions are probably an installer bug; we keep
// last-wins and only log it.
pub fn effective_mod_type(types: &[SetModTypeInstruction]) -> Option<&str> {
    if types.len() > 1 {
        let all: Vec<&str> = types.iter().map(|t| t.value.as_str()).collect();
        warn!(types = ?all, "got more than one mod type, only the last was used");
    }
    types.last().map(|t| t.value.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_mod_type_wins() {
        let types = vec![SetModTypeInstruction::new("enb"), SetModTypeInstruction::new("dinput")];
        assert_eq!(effective_mod_type(&types), Some("dinput"));
        assert_eq!(effective_mod_type(&[]), None);
    }
}
