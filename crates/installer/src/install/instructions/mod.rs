//! Install instruction model
//!
//! Installers turn an archive listing into a flat sequence of instructions.
//! Each instruction type is defined in its own file along with the code that
//! applies it. The sequence is grouped by kind before application; see
//! [`InstructionGroups`].

use serde::{Deserialize, Serialize};

pub mod attribute;
pub mod common_instruction_utils;
pub mod copy;
pub mod diagnostics;
pub mod generate_file;
pub mod ini_edit;
pub mod mkdir;
pub mod submodule;

pub use attribute::{AttributeInstruction, SetModTypeInstruction};
pub use copy::{CopyInstruction, CopyReport};
pub use diagnostics::{ErrorInstruction, UnsupportedInstruction};
pub use generate_file::GenerateFileInstruction;
pub use ini_edit::IniEditInstruction;
pub use mkdir::MkDirInstruction;
pub use submodule::SubmoduleInstruction;

/// One declarative install action.
///
/// Serialized as an internally tagged object, e.g.
/// `{"type": "copy", "source": "a.esp", "destination": "a.esp"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Instruction {
    Copy(CopyInstruction),
    MkDir(MkDirInstruction),
    GenerateFile(GenerateFileInstruction),
    IniEdit(IniEditInstruction),
    Submodule(SubmoduleInstruction),
    Attribute(AttributeInstruction),
    SetModType(SetModTypeInstruction),
    Unsupported(UnsupportedInstruction),
    Error(ErrorInstruction),
}

impl Instruction {
    pub fn copy<S: Into<String>, D: Into<String>>(source: S, destination: D) -> Self {
        Instruction::Copy(CopyInstruction::new(source, destination))
    }

    pub fn mkdir<D: Into<String>>(destination: D) -> Self {
        Instruction::MkDir(MkDirInstruction::new(destination))
    }

    pub fn generate_file<D: Into<String>, C: Into<String>>(destination: D, content: C) -> Self {
        Instruction::GenerateFile(GenerateFileInstruction::new(destination, content))
    }

    pub fn ini_edit(destination: &str, section: &str, key: &str, value: &str) -> Self {
        Instruction::IniEdit(IniEditInstruction::new(destination, section, key, value))
    }

    pub fn attribute<K: Into<String>>(key: K, value: serde_json::Value) -> Self {
        Instruction::Attribute(AttributeInstruction::new(key, value))
    }

    pub fn set_mod_type<S: Into<String>>(value: S) -> Self {
        Instruction::SetModType(SetModTypeInstruction::new(value))
    }

    pub fn unsupported<S: Into<String>>(function: S) -> Self {
        Instruction::Unsupported(UnsupportedInstruction::new(function))
    }

    pub fn error<S: Into<String>>(message: S) -> Self {
        Instruction::Error(ErrorInstruction::new(message))
    }

    /// Short name of the instruction kind, as used on the wire
    pub fn kind(&self) -> &'static str {
        match self {
            Instruction::Copy(_) => "copy",
            Instruction::MkDir(_) => "mkdir",
            Instruction::GenerateFile(_) => "generatefile",
            Instruction::IniEdit(_) => "iniedit",
            Instruction::Submodule(_) => "submodule",
            Instruction::Attribute(_) => "attribute",
            Instruction::SetModType(_) => "setmodtype",
            Instruction::Unsupported(_) => "unsupported",
            Instruction::Error(_) => "error",
        }
    }
}

/// What an installer hands back.
///
/// `instructions == None` means the installer already told the user what went
/// wrong; the install ends without a second report. An empty sequence is a
/// hard failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InstallOutcome {
    pub instructions: Option<Vec<Instruction>>,
}

impl InstallOutcome {
    pub fn new(instructions: Vec<Instruction>) -> Self {
        Self {
            instructions: Some(instructions),
        }
    }

    /// Failure the installer has already surfaced itself
    pub fn already_reported() -> Self {
        Self { instructions: None }
    }
}

/// Instructions bucketed by kind, input order preserved inside each bucket.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstructionGroups {
    pub mkdir: Vec<MkDirInstruction>,
    pub copy: Vec<CopyInstruction>,
    pub generate_file: Vec<GenerateFileInstruction>,
    pub ini_edit: Vec<IniEditInstruction>,
    pub submodule: Vec<SubmoduleInstruction>,
    pub attribute: Vec<AttributeInstruction>,
    pub set_mod_type: Vec<SetModTypeInstruction>,
    pub unsupported: Vec<UnsupportedInstruction>,
    pub error: Vec<ErrorInstruction>,
}

impl InstructionGroups {
    pub fn from_instructions(instructions: &[Instruction]) -> Self {
        let mut groups = Self::default();
        for instruction in instructions {
            match instruction {
                Instruction::Copy(i) => groups.copy.push(i.clone()),
                Instruction::MkDir(i) => groups.mkdir.push(i.clone()),
                Instruction::GenerateFile(i) => groups.generate_file.push(i.clone()),
                Instruction::IniEdit(i) => groups.ini_edit.push(i.clone()),
                Instruction::Submodule(i) => groups.submodule.push(i.clone()),
                Instruction::Attribute(i) => groups.attribute.push(i.clone()),
                Instruction::SetModType(i) => groups.set_mod_type.push(i.clone()),
                Instruction::Unsupported(i) => groups.unsupported.push(i.clone()),
                Instruction::Error(i) => groups.error.push(i.clone()),
            }
        }
        groups
    }

    pub fn has_errors(&self) -> bool {
        !self.error.is_empty()
    }
}
