//! Sink trait for log output destinations

use super::{error::Result, level::Level};

/// A destination for encoded records.
///
/// Receivers are `&self`: every sink serializes access to its own resource,
/// so unrelated destinations never contend on a shared lock.
pub trait Sink: Send + Sync {
    /// Write one fully encoded record
    fn write(&self, level: Level, bytes: &[u8]) -> Result<()>;
    fn flush(&self) -> Result<()>;
    fn name(&self) -> &str;
}
