//! Sink implementations

pub mod console;
pub mod discard;
pub mod rotating_file;
pub mod socket;

pub use console::ConsoleSink;
pub use discard::DiscardSink;
pub use rotating_file::{RotatingFileSink, RotationPolicy};
pub use socket::{SocketKind, SocketSink, CONNECT_TIMEOUT};

pub use crate::core::Sink;
