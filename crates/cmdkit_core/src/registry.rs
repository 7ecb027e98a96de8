//! In-memory set of loaded commands
//!
//! Readers take a cheap snapshot. Reload builds a complete replacement off to
//! the side and publishes it with a single swap, so routing never observes a
//! half-built set.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::warn;

use crate::command::{CommandDefinition, CommandInfo};

/// An immutable set of commands with unique names
#[derive(Debug, Default)]
pub struct CommandSet {
    commands: Vec<Arc<CommandDefinition>>,
}

impl CommandSet {
    /// Build a set from definitions in load order.
    ///
    /// When two definitions share a name the one loaded last wins and keeps
    /// its own position; the earlier one is dropped with a warning.
    pub fn from_definitions(definitions: Vec<CommandDefinition>) -> Self {
        let mut slots: Vec<Option<Arc<CommandDefinition>>> = Vec::with_capacity(definitions.len());
        let mut by_name: HashMap<String, usize> = HashMap::new();

        for definition in definitions {
            let name = definition.name().to_string();
            if let Some(previous) = by_name.get(&name).copied() {
                if let Some(dropped) = slots[previous].take() {
                    warn!(
                        "Duplicate command name '{}': {} replaces {}",
                        name,
                        definition.info.file_path.display(),
                        dropped.info.file_path.display()
                    );
                }
            }
            by_name.insert(name, slots.len());
            slots.push(Some(Arc::new(definition)));
        }

        Self {
            commands: slots.into_iter().flatten().collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Arc<CommandDefinition>> {
        self.commands.iter().find(|c| c.name() == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<CommandDefinition>> {
        self.commands.iter()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Definitions without their handlers
    pub fn infos(&self) -> Vec<Arc<CommandInfo>> {
        self.commands.iter().map(|c| c.info.clone()).collect()
    }
}

/// Shared holder of the current [`CommandSet`]
#[derive(Debug, Default)]
pub struct CommandRegistry {
    current: RwLock<Arc<CommandSet>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The set as of now; unaffected by later reloads
    pub fn snapshot(&self) -> Arc<CommandSet> {
        self.current.read().clone()
    }

    /// Replace the whole set, returning the previous one
    pub fn publish(&self, set: CommandSet) -> Arc<CommandSet> {
        std::mem::replace(&mut *self.current.write(), Arc::new(set))
    }

    pub fn clear(&self) -> Arc<CommandSet> {
        self.publish(CommandSet::default())
    }

    pub fn get(&self, name: &str) -> Option<Arc<CommandDefinition>> {
        self.snapshot().get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.current.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
