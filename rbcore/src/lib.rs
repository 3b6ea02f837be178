pub mod command;
pub mod error;
pub mod job;
pub mod platform;
pub mod task;
pub mod worker;

pub(crate) mod chrono {
    pub use ::chrono::*;
    #[cfg(test)]
    pub use test_rb::chrono::Utc;
}

/// Seconds since the epoch, with sub-second precision, as stored on
/// every entity.
pub fn timestamp() -> f64 {
    let now = chrono::Utc::now();
    now.timestamp() as f64 + f64::from(now.timestamp_subsec_micros()) / 1_000_000.0
}
