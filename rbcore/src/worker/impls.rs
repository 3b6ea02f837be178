use std::{
    fmt,
    str::FromStr,
};
use uuid::Uuid;

use crate::{
    error::ValueError,
    worker::*,
};

impl WorkerState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Working => "working",
            Self::Offline => "offline",
        }
    }
}

impl FromStr for WorkerState {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "idle" => Ok(Self::Idle),
            "working" => Ok(Self::Working),
            "offline" => Ok(Self::Offline),
            _ => Err(ValueError::InvalidState("worker", s.to_string())),
        }
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Worker {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            state: WorkerState::Idle,
            timestamp: crate::timestamp(),
            task_id: None,
        }
    }

    pub fn with_id(mut self, id: Option<i64>) -> Self {
        self.id = id;
        self
    }

    // every state change restamps the worker as that is its last update
    pub fn with_state(mut self, state: WorkerState) -> Self {
        self.state = state;
        self.timestamp = crate::timestamp();
        self
    }

    pub fn with_task_id(mut self, task_id: Option<Uuid>) -> Self {
        self.task_id = task_id;
        self
    }
}

impl fmt::Display for Worker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id {
            Some(id) => write!(f, "worker {id}:`{}` ({})", self.name, self.state),
            None => write!(f, "worker `{}` ({})", self.name, self.state),
        }
    }
}

#[cfg(test)]
mod tests {
    use test_rb::chrono::set_timestamp;
    use crate::worker::*;

    #[test]
    fn test_worker_state_restamps() {
        set_timestamp(1000);
        let worker = Worker::new("host-a");
        assert_eq!(worker.timestamp, 1000.0);
        set_timestamp(2000);
        let worker = worker.with_state(WorkerState::Working);
        assert_eq!(worker.state, WorkerState::Working);
        assert_eq!(worker.timestamp, 2000.0);
    }

    #[test]
    fn test_worker_name_only_payload() -> anyhow::Result<()> {
        set_timestamp(1234567890);
        let worker: Worker = serde_json::from_str(r#"{"name": "host-a"}"#)?;
        assert_eq!(worker, Worker::new("host-a"));
        Ok(())
    }

    #[test]
    fn test_worker_round_trip() -> anyhow::Result<()> {
        let worker = Worker::new("host-b")
            .with_id(Some(4))
            .with_state(WorkerState::Offline)
            .with_task_id(Some(uuid::Uuid::new_v4()));
        let value = serde_json::to_value(&worker)?;
        assert_eq!(value["state"], "offline");
        let decoded: Worker = serde_json::from_value(value)?;
        assert_eq!(decoded, worker);
        Ok(())
    }
}
