use serde::{
    Deserialize,
    Serialize,
    de::DeserializeOwned,
};
use serde_json::Value;
use std::fmt;

use crate::error::ProtocolError;

mod codec;
pub use codec::MessageCodec;

/// Names of the messages exchanged between the server and its peers.
pub mod names {
    pub const WORKERS_REGISTER: &str = "workers.register";
    pub const WORKERS_ALL: &str = "workers.all";
    pub const TASKS_NEXT: &str = "tasks.next";
    pub const TASKS_COMPLETE: &str = "tasks.complete";
    pub const TASKS_CREATE: &str = "tasks.create";
    pub const TASKS_ALL: &str = "tasks.all";
    pub const JOBS_CREATE: &str = "jobs.create";
    pub const JOBS_ALL: &str = "jobs.all";
    pub const CONNECTION_CLOSE: &str = "connection.close";
    pub const CONNECTION_DOCS: &str = "connection.docs";

    // responses
    pub const SUCCESS: &str = "success";
    pub const FAILURE: &str = "failure";
    pub const OK: &str = "ok";
    pub const TASKS: &str = "tasks";
    pub const JOB_CREATED: &str = "job_created";
    pub const TASK_CREATED: &str = "task_created";
    pub const ALL_JOBS: &str = "all_jobs";
    pub const ALL_TASKS: &str = "all_tasks";
    pub const ALL_WORKERS: &str = "all_workers";
    pub const DOCS: &str = "docs";
    pub const UNREGISTERED: &str = "unregistered message";
}

/// The envelope carried by every frame.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Message {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl Message {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data<T: Serialize + ?Sized>(
        message: impl Into<String>,
        data: &T,
    ) -> Result<Self, ProtocolError> {
        Ok(Self {
            message: message.into(),
            data: Some(serde_json::to_value(data)?),
        })
    }

    pub fn failure(reason: impl fmt::Display) -> Self {
        Self {
            message: names::FAILURE.to_string(),
            data: Some(Value::String(reason.to_string())),
        }
    }

    pub fn unregistered() -> Self {
        Self::new(names::UNREGISTERED)
    }

    /// Decode the payload; a missing or `null` payload is `None`.
    pub fn data_as<T: DeserializeOwned>(&self) -> Result<Option<T>, ProtocolError> {
        match &self.data {
            None | Some(Value::Null) => Ok(None),
            Some(value) => Ok(Some(T::deserialize(value)?)),
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.data {
            Some(_) => write!(f, "<{} with data>", self.message),
            None => write!(f, "<{}>", self.message),
        }
    }
}
