//! Package type classification
//!
//! A mod type decides from the final instruction list what kind of package
//! was installed (e.g. an ENB preset or a script extender). Types are
//! evaluated highest priority first; the first match wins and no match
//! leaves the empty type.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use crate::install::instructions::Instruction;

/// The type assigned when nothing matches
pub const DEFAULT_MOD_TYPE: &str = "";

#[async_trait]
pub trait ModType: Send + Sync {
    fn id(&self) -> &str;

    fn priority(&self) -> i32;

    /// Whether this type applies to packages of the game at all
    fn is_supported(&self, _game_id: &str) -> bool {
        true
    }

    async fn test(&self, instructions: &[Instruction]) -> bool;
}

type Predicate = dyn Fn(&[Instruction]) -> bool + Send + Sync;

/// Mod type backed by a plain predicate, optionally limited to some games
pub struct PredicateModType {
    id: String,
    priority: i32,
    games: Option<Vec<String>>,
    predicate: Arc<Predicate>,
}

impl PredicateModType {
    pub fn new<S, F>(id: S, priority: i32, predicate: F) -> Self
    where
        S: Into<String>,
        F: Fn(&[Instruction]) -> bool + Send + Sync + 'static,
    {
        Self {
            id: id.into(),
            priority,
            games: None,
            predicate: Arc::new(predicate),
        }
    }

    pub fn for_games<I, S>(mut self, games: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.games = Some(games.into_iter().map(Into::into).collect());
        self
    }

    /// Matches when any copied file lands at one of the given top-level names
    pub fn with_root_files<S: Into<String>>(id: S, priority: i32, names: &[&str]) -> Self {
        let names: Vec<String> = names.iter().map(|n| n.to_lowercase()).collect();
        Self::new(id, priority, move |instructions| {
            instructions.iter().any(|instruction| match instruction {
                Instruction::Copy(copy) => {
                    let destination = copy.destination.replace('\\', "/").to_lowercase();
                    names.iter().any(|name| destination == *name)
                }
                _ => false,
            })
        })
    }
}

#[async_trait]
impl ModType for PredicateModType {
    fn id(&self) -> &str {
        &self.id
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn is_supported(&self, game_id: &str) -> bool {
        self.games
            .as_ref()
            .is_none_or(|games| games.iter().any(|g| g == game_id))
    }

    async fn test(&self, instructions: &[Instruction]) -> bool {
        (self.predicate)(instructions)
    }
}

/// Read-only during installs; register everything up front
#[derive(Default)]
pub struct ModTypeRegistry {
    types: Vec<Arc<dyn ModType>>,
}

impl ModTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keeps the list ordered by descending priority, stable on ties
    pub fn register(&mut self, mod_type: Arc<dyn ModType>) {
        self.types.push(mod_type);
        self.types.sort_by_key(|t| std::cmp::Reverse(t.priority()));
    }

    pub fn with_type<T: ModType + 'static>(mut self, mod_type: T) -> Self {
        self.register(Arc::new(mod_type));
        self
    }

    /// Id of the first type (by descending priority) whose test accepts the
    /// instructions
    pub async fn classify(&self, game_id: &str, instructions: &[Instruction]) -> String {
        for mod_type in self.types.iter().filter(|t| t.is_supported(game_id)) {
            if mod_type.test(instructions).await {
                debug!(mod_type = mod_type.id(), "classified package");
                return mod_type.id().to_string();
            }
        }
        DEFAULT_MOD_TYPE.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> ModTypeRegistry {
        ModTypeRegistry::new()
            .with_type(PredicateModType::with_root_files("dinput", 10, &["dinput8.dll"]))
            .with_type(PredicateModType::with_root_files("enb", 50, &["enbseries.ini", "d3d11.dll"]))
            .with_type(PredicateModType::new("everything", 0, |_| true).for_games(["fallout4"]))
    }

    #[tokio::test]
    async fn test_highest_priority_match_wins() {
        let instructions = vec![
            Instruction::copy("d3d11.dll", "d3d11.dll"),
            Instruction::copy("dinput8.dll", "dinput8.dll"),
        ];
        assert_eq!(registry().classify("skyrimse", &instructions).await, "enb");
    }

    #[tokio::test]
    async fn test_no_match_gives_default_type() {
        let instructions = vec![Instruction::copy("data/foo.esp", "foo.esp")];
        assert_eq!(registry().classify("skyrimse", &instructions).await, DEFAULT_MOD_TYPE);
        assert_eq!(registry().classify("fallout4", &instructions).await, "everything");
    }
}
