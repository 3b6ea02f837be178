use std::{
    fmt,
    str::FromStr,
};
use uuid::Uuid;

use crate::{
    error::ValueError,
    job::*,
    task::{
        DEFAULT_PRIORITY,
        Task,
    },
};

impl JobState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::Progress => "progress",
            Self::Completed => "completed",
        }
    }
}

impl FromStr for JobState {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "waiting" => Ok(Self::Waiting),
            "progress" => Ok(Self::Progress),
            "completed" => Ok(Self::Completed),
            _ => Err(ValueError::InvalidState("job", s.to_string())),
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Job {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            priority: DEFAULT_PRIORITY,
            state: JobState::Waiting,
            timestamp: crate::timestamp(),
            tasks: Vec::new(),
        }
    }

    /// Take ownership of the task, pointing it back at this job.
    pub fn add_task(&mut self, task: Task) {
        self.tasks.push(task.with_job_id(Some(self.id)));
    }

    pub fn with_task(mut self, task: Task) -> Self {
        self.add_task(task);
        self
    }

    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_state(mut self, state: JobState) -> Self {
        self.state = state;
        self
    }

    pub fn with_timestamp(mut self, timestamp: f64) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn is_completed(&self) -> bool {
        self.state == JobState::Completed
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job {} `{}` ({})", self.id, self.name, self.state)
    }
}
