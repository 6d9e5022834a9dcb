//! IniEdit instruction implementation
//!
//! Edits are never merged into a live ini file. They are rendered into one
//! fragment per target file inside the package's ini tweaks directory.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::install::error::Result;
use crate::install::instructions::common_instruction_utils::{ensure_dir, resolve_relative, write_file};

#[cfg(windows)]
const LINE_ENDING: &str = "\r\n";
#[cfg(not(windows))]
const LINE_ENDING: &str = "\n";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IniEditInstruction {
    /// Name of the ini file the tweak targets
    pub destination: String,
    pub section: String,
    pub key: String,
    pub value: String,
}

impl IniEditInstruction {
    pub fn new(destination: &str, section: &str, key: &str, value: &str) -> Self {
        Self {
            destination: destination.to_string(),
            section: section.to_string(),
            key: key.to_string(),
            value: value.to_string(),
        }
    }
}

/// Render one fragment per destination: a `[section]` header per section,
/// followed by `key = value` lines in submission order.
pub fn render_fragments(edits: &[IniEditInstruction]) -> Vec<(String, String)> {
    let mut by_destination: Vec<(&str, Vec<(&str, Vec<&IniEditInstruction>)>)> = Vec::new();

    for edit in edits {
        let idx = match by_destination.iter().position(|(d, _)| *d == edit.destination) {
            Some(idx) => idx,
            None => {
                by_destination.push((&edit.destination, Vec::new()));
                by_destination.len() - 1
            }
        };
        let sections = &mut by_destination[idx].1;
        match sections.iter_mut().find(|(s, _)| *s == edit.section) {
            Some((_, entries)) => entries.push(edit),
            None => sections.push((&edit.section, vec![edit])),
        }
    }

    by_destination
        .into_iter()
        .map(|(destination, sections)| {
            let content = sections
                .iter()
                .map(|(section, entries)| {
                    std::iter::once(format!("[{}]", section))
                        .chain(entries.iter().map(|e| format!("{} = {}", e.key, e.value)))
                        .collect::<Vec<_>>()
                        .join(LINE_ENDING)
                })
                .collect::<Vec<_>>()
                .join(LINE_ENDING);
            (destination.to_string(), content)
        })
        .collect()
}

/// Write all fragments below `<destination>/<tweaks_dir>`
pub async fn write_fragments(
    edits: &[IniEditInstruction],
    destination_path: &Path,
    tweaks_dir: &str,
    retry_delay: Duration,
) -> Result<()> {
    if edits.is_empty() {
        return Ok(());
    }

    let tweaks_path = destination_path.join(tweaks_dir);
    ensure_dir(&tweaks_path, retry_delay).await?;

    for (destination, content) in render_fragments(edits) {
        let fragment_path = resolve_relative(&tweaks_path, &destination)?;
        write_file(&fragment_path, content.as_bytes(), retry_delay).await?;
    }
    Ok(())
}
