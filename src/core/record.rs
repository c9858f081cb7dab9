//! Log record structure

use super::field::Fields;
use super::level::Level;
use chrono::{DateTime, Utc};
use std::fmt;
use std::panic::Location;
use std::path::Path;
use std::sync::Arc;

/// Source location of a log call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub file: String,
    pub line: u32,
    pub function: Option<String>,
}

impl Caller {
    pub fn new(file: impl Into<String>, line: u32) -> Self {
        Self {
            file: file.into(),
            line,
            function: None,
        }
    }

    /// Build from a `#[track_caller]` location
    pub fn from_location(location: &Location<'_>) -> Self {
        Self::new(location.file(), location.line())
    }

    #[must_use]
    pub fn with_function(mut self, function: impl Into<String>) -> Self {
        self.function = Some(function.into());
        self
    }

    /// `path/to/file.rs:42`
    pub fn full(&self) -> String {
        format!("{}:{}", self.file, self.line)
    }

    /// `file.rs:42`
    pub fn short(&self) -> String {
        let base = Path::new(&self.file)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(&self.file);
        format!("{}:{}", base, self.line)
    }
}

impl fmt::Display for Caller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// One structured log event. Built fresh per call and never mutated after
/// it is handed to the router.
#[derive(Debug, Clone)]
pub struct Record {
    pub timestamp: DateTime<Utc>,
    pub level: Level,
    pub message: String,
    pub caller: Option<Caller>,
    pub fields: Arc<Fields>,
    pub stack: Option<String>,
}

impl Record {
    /// The message is kept verbatim; the text encoder escapes it on output.
    pub fn new(level: Level, message: impl AsRef<str>) -> Self {
        Self {
            timestamp: Utc::now(),
            level,
            message: message.as_ref().to_string(),
            caller: None,
            fields: Arc::new(Fields::new()),
            stack: None,
        }
    }

    #[must_use]
    pub fn with_caller(mut self, caller: Caller) -> Self {
        self.caller = Some(caller);
        self
    }

    #[must_use]
    pub fn with_fields(mut self, fields: Arc<Fields>) -> Self {
        self.fields = fields;
        self
    }

    #[must_use]
    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    #[must_use]
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}
