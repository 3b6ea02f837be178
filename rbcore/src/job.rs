use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::task::{
    Task,
    default_priority,
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    #[default]
    Waiting,
    Progress,
    Completed,
}

/// A named unit of work composed of tasks.
///
/// The `tasks` are only carried at submission time; a job read back from
/// a backend has an empty list and its tasks are listed by job id.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Job {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub name: String,
    #[serde(default = "default_priority")]
    pub priority: i64,
    #[serde(default)]
    pub state: JobState,
    #[serde(default = "crate::timestamp")]
    pub timestamp: f64,
    #[serde(default)]
    pub tasks: Vec<Task>,
}

mod impls;
pub mod traits;
