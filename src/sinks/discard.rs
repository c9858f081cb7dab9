//! Sink that drops everything

use crate::core::{Level, Result, Sink};

/// Accepts every record and writes nothing.
///
/// Used when a configuration enables no destination, and handy for
/// benchmarking the routing path without I/O.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiscardSink;

impl DiscardSink {
    pub fn new() -> Self {
        DiscardSink
    }
}

impl Sink for DiscardSink {
    fn write(&self, _level: Level, _bytes: &[u8]) -> Result<()> {
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        "discard"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_discard_always_succeeds() {
        let sink = DiscardSink::new();
        for level in Level::ALL {
            assert!(sink.write(level, b"ignored\n").is_ok());
        }
        assert!(sink.flush().is_ok());
        assert_eq!(sink.name(), "discard");
    }
}
