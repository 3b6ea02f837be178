use crate::{
    job::traits::JobBackend,
    task::traits::TaskBackend,
    worker::traits::WorkerBackend,
};

mod connector;
pub use connector::{ConnectorOption, PlatformConnector};

pub trait PlatformUrl {
    fn url(&self) -> &str;
}

/// QueuePlatform - the render queue platform
///
/// Everything the job manager needs from a backend: the persistence of
/// jobs, tasks and workers, along with the atomic claim of the next
/// waiting task.
///
/// This trait is applicable to everything that correctly implements the
/// relevant backends that compose this trait.
pub trait QueuePlatform: JobBackend
    + TaskBackend
    + WorkerBackend
    + PlatformUrl

    + Send
    + Sync
{
}

pub trait DefaultQueuePlatform: QueuePlatform {}

impl<P: JobBackend
    + TaskBackend
    + WorkerBackend
    + PlatformUrl

    + DefaultQueuePlatform

    + Send
    + Sync
> QueuePlatform for P {}
