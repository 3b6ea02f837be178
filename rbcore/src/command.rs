use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{
    Map,
    Value,
};
use std::fmt;

use crate::error::{
    CommandError,
    ValueError,
};

mod registry;
mod sleep;

pub use registry::PreparedCommandRegistry;
pub use sleep::SleepCommand;

/// The opaque form of a command as carried by a task, on the wire and in
/// the backend alike.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct SerializedCommand {
    pub name: String,
    #[serde(default)]
    pub data: Map<String, Value>,
}

impl SerializedCommand {
    pub fn new(name: impl Into<String>, data: Value) -> Result<Self, ValueError> {
        let name = name.into();
        match data {
            Value::Object(data) => Ok(Self { name, data }),
            Value::Null => Ok(Self { name, data: Map::new() }),
            other => Err(ValueError::InvalidCommand(format!(
                "data for `{name}` must be an object, got {other}"
            ))),
        }
    }
}

/// A runnable command rehydrated from its serialized form.
#[async_trait]
pub trait Command: fmt::Debug + Send + Sync {
    fn name(&self) -> &str;
    fn serialize(&self) -> SerializedCommand;
    async fn run(&self) -> Result<(), CommandError>;
}

pub type CommandConstructor = fn(&Map<String, Value>) -> Result<Box<dyn Command>, CommandError>;

pub trait CommandRegistry: Send + Sync {
    /// Registering a name that is already present leaves the existing
    /// constructor in place.
    fn register(&mut self, name: &str, constructor: CommandConstructor);
    fn resolve(&self, name: &str) -> Result<CommandConstructor, CommandError>;
    fn names(&self) -> Vec<String>;

    fn deserialize(
        &self,
        command: &SerializedCommand,
    ) -> Result<Box<dyn Command>, CommandError> {
        let constructor = self.resolve(&command.name)?;
        constructor(&command.data)
    }
}
