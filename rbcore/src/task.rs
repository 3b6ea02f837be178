use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::command::SerializedCommand;

pub const DEFAULT_PRIORITY: i64 = 50;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    #[default]
    Waiting,
    Progress,
    Completed,
}

/// The schedulable unit of work.
///
/// A task is only ever mutated by the server in response to claim and
/// complete events; the history is retained as tasks are never deleted.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Task {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    #[serde(default)]
    pub job_id: Option<Uuid>,
    #[serde(default = "default_priority")]
    pub priority: i64,
    pub command: SerializedCommand,
    #[serde(default)]
    pub state: TaskState,
    #[serde(default = "crate::timestamp")]
    pub timestamp: f64,
}

pub(crate) fn default_priority() -> i64 {
    DEFAULT_PRIORITY
}

mod impls;
pub mod traits;
