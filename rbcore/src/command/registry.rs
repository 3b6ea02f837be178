use std::collections::HashMap;

use crate::{
    command::{
        CommandConstructor,
        CommandRegistry,
        SleepCommand,
    },
    error::CommandError,
};

pub struct PreparedCommandRegistry {
    table: HashMap<String, CommandConstructor>,
}

impl CommandRegistry for PreparedCommandRegistry {
    fn register(&mut self, name: &str, constructor: CommandConstructor) {
        if self.table.contains_key(name) {
            log::debug!("command {name} already registered");
            return;
        }
        self.table.insert(name.to_string(), constructor);
        log::debug!("registered command {name}");
    }

    fn resolve(&self, name: &str) -> Result<CommandConstructor, CommandError> {
        self.table
            .get(name)
            .copied()
            .ok_or_else(|| CommandError::UnknownCommand(name.to_string()))
    }

    fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.table.keys().cloned().collect();
        names.sort();
        names
    }
}

impl PreparedCommandRegistry {
    pub fn new() -> Self {
        Self {
            table: HashMap::new(),
        }
    }

    /// A registry with every command shipped with this crate.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(SleepCommand::NAME, SleepCommand::construct);
        registry
    }
}

impl Default for PreparedCommandRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
