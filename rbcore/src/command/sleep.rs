use async_trait::async_trait;
use serde_json::{
    Map,
    Number,
    Value,
};
use std::time::Duration;

use crate::{
    command::{
        Command,
        SerializedCommand,
    },
    error::CommandError,
};

/// Sleeps for `duration` seconds; stands in for real render work.
///
/// The duration is kept as the JSON number it was given as so that it
/// serializes back unchanged.
#[derive(Clone, Debug, PartialEq)]
pub struct SleepCommand {
    duration: Number,
}

fn invalid(reason: String) -> CommandError {
    CommandError::Deserialization(SleepCommand::NAME.to_string(), reason)
}

impl SleepCommand {
    pub const NAME: &'static str = "SleepCommand";

    pub fn new(duration: f64) -> Result<Self, CommandError> {
        let duration = Number::from_f64(duration)
            .ok_or_else(|| invalid(format!("invalid duration {duration}")))?;
        Self::from_number(duration)
    }

    fn from_number(duration: Number) -> Result<Self, CommandError> {
        match duration.as_f64() {
            Some(seconds) if seconds.is_finite() && seconds >= 0.0 => Ok(Self { duration }),
            _ => Err(invalid(format!("invalid duration {duration}"))),
        }
    }

    pub fn duration(&self) -> f64 {
        self.duration.as_f64().unwrap_or_default()
    }

    pub fn construct(data: &Map<String, Value>) -> Result<Box<dyn Command>, CommandError> {
        match data.get("duration") {
            Some(Value::Number(duration)) => Ok(Box::new(Self::from_number(duration.clone())?)),
            _ => Err(invalid("missing numeric `duration`".to_string())),
        }
    }
}

#[async_trait]
impl Command for SleepCommand {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn serialize(&self) -> SerializedCommand {
        let mut data = Map::new();
        data.insert("duration".to_string(), Value::Number(self.duration.clone()));
        SerializedCommand {
            name: Self::NAME.to_string(),
            data,
        }
    }

    async fn run(&self) -> Result<(), CommandError> {
        log::debug!("sleeping for {}s", self.duration);
        tokio::time::sleep(Duration::from_secs_f64(self.duration())).await;
        Ok(())
    }
}
