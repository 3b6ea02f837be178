use std::{
    fmt,
    str::FromStr,
};
use uuid::Uuid;

use crate::{
    command::SerializedCommand,
    error::ValueError,
    task::*,
};

impl TaskState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::Progress => "progress",
            Self::Completed => "completed",
        }
    }
}

impl FromStr for TaskState {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "waiting" => Ok(Self::Waiting),
            "progress" => Ok(Self::Progress),
            "completed" => Ok(Self::Completed),
            _ => Err(ValueError::InvalidState("task", s.to_string())),
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Task {
    /// A fresh waiting task with the default priority, stamped now.
    pub fn new(command: SerializedCommand) -> Self {
        Self {
            id: Uuid::new_v4(),
            job_id: None,
            priority: DEFAULT_PRIORITY,
            command,
            state: TaskState::Waiting,
            timestamp: crate::timestamp(),
        }
    }

    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_state(mut self, state: TaskState) -> Self {
        self.state = state;
        self
    }

    pub fn with_job_id(mut self, job_id: Option<Uuid>) -> Self {
        self.job_id = job_id;
        self
    }

    pub fn with_timestamp(mut self, timestamp: f64) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn is_completed(&self) -> bool {
        self.state == TaskState::Completed
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task {} [{}] ({}, priority {})",
            self.id,
            self.command.name,
            self.state,
            self.priority,
        )
    }
}
