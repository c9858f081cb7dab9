//! Logger facade
//!
//! A [`Logger`] is a cheap, cloneable handle: a shared [`Router`] plus an
//! immutable set of ambient fields. Deriving a logger with extra fields
//! never changes the parent, and every derived logger keeps routing through
//! the same sinks and the same dynamic level.

use super::{
    error::Result,
    field::{Field, FieldValue, Fields},
    level::Level,
    record::{Caller, Record},
    router::Router,
    timestamp::local_now,
};
use crate::config::Config;
use std::backtrace::Backtrace;
use std::fmt;
use std::io::{self, Write};
use std::panic::Location;
use std::sync::Arc;

/// What happens after a `panic` or `fatal` record has been routed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TerminationPolicy {
    /// `panic` unwinds with the message; `fatal` syncs and exits with status 1
    #[default]
    Conventional,
    /// Both return normally after routing the record
    LogOnly,
}

/// The termination decided for one record
#[must_use]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Escalation {
    Continue,
    /// Unwind with this panic message
    Unwind(String),
    /// Sync all sinks, then exit with this status
    Exit(i32),
}

#[derive(Clone)]
pub struct Logger {
    router: Arc<Router>,
    fields: Arc<Fields>,
    stack_level: Level,
    termination: TerminationPolicy,
}

impl Logger {
    /// Logger over `router` with no fields, stack traces from `Panic` up
    pub fn new(router: Arc<Router>) -> Self {
        Self {
            router,
            fields: Arc::new(Fields::new()),
            stack_level: Level::Panic,
            termination: TerminationPolicy::default(),
        }
    }

    /// Build the standard sink topology from `config`
    ///
    /// Sinks that cannot be opened are reported on stderr and skipped.
    pub fn from_config(config: &Config) -> Self {
        let fields: Fields = config.service_field().into_iter().collect();
        Self {
            router: Arc::new(Router::from_config(config)),
            fields: Arc::new(fields),
            stack_level: config.stacktrace_level,
            termination: TerminationPolicy::default(),
        }
    }

    /// Logger that drops every record
    pub fn discard() -> Self {
        Self::new(Arc::new(Router::discard()))
    }

    pub fn builder() -> LoggerBuilder {
        LoggerBuilder::new()
    }

    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    pub fn stack_level(&self) -> Level {
        self.stack_level
    }

    pub fn termination(&self) -> TerminationPolicy {
        self.termination
    }

    /// Same logger with a different termination policy
    #[must_use]
    pub fn with_termination(mut self, termination: TerminationPolicy) -> Self {
        self.termination = termination;
        self
    }

    /// Same logger with a different stack trace threshold
    #[must_use]
    pub fn with_stack_level(mut self, level: Level) -> Self {
        self.stack_level = level;
        self
    }

    /// Derive a logger whose records also carry `fields`
    ///
    /// New keys override inherited ones; the parent is unchanged.
    #[must_use]
    pub fn with<I>(&self, fields: I) -> Self
    where
        I: IntoIterator<Item = Field>,
    {
        Self {
            router: Arc::clone(&self.router),
            fields: Arc::new(self.fields.overlay(fields)),
            stack_level: self.stack_level,
            termination: self.termination,
        }
    }

    /// Derive a logger with one extra field
    ///
    /// # Example
    ///
    /// ```
    /// use rust_tee_logger::Logger;
    ///
    /// let base = Logger::discard();
    /// let request = base.with_field("request_id", "abc-123").with_field("attempt", 2);
    ///
    /// assert_eq!(request.fields().len(), 2);
    /// assert!(base.fields().is_empty());
    /// ```
    #[must_use]
    pub fn with_field(&self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.with(std::iter::once(Field::new(key, value)))
    }

    /// Derive a logger with every entry of a map
    #[must_use]
    pub fn with_fields(&self, fields: impl Into<Fields>) -> Self {
        let fields: Fields = fields.into();
        self.with(fields.iter().cloned())
    }

    /// Move the shared dynamic threshold of every logger on this router
    pub fn set_level(&self, level: Level) {
        self.router.set_level(level);
    }

    pub fn level(&self) -> Level {
        self.router.level()
    }

    /// Whether a record at `level` would reach any sink
    pub fn enabled(&self, level: Level) -> bool {
        self.router.enabled(level)
    }

    /// Flush every sink; returns the first failure
    pub fn sync(&self) -> Result<()> {
        self.router.sync()
    }

    /// Route a record and report the termination it calls for, without
    /// acting on it
    ///
    /// `panic` and `fatal` records call for termination even when no sink
    /// accepts them. Under [`TerminationPolicy::LogOnly`] the result is
    /// always [`Escalation::Continue`].
    #[track_caller]
    pub fn log_escalating(
        &self,
        level: Level,
        message: &str,
        function: Option<&str>,
    ) -> Escalation {
        let message = message.trim_end_matches(['\n', '\r']);

        if level != Level::Nil && self.router.enabled(level) {
            let mut caller = Caller::from_location(Location::caller());
            if let Some(function) = function {
                caller = caller.with_function(function);
            }
            let mut record = Record::new(level, message)
                .with_caller(caller)
                .with_fields(Arc::clone(&self.fields));
            if level >= self.stack_level {
                record = record.with_stack(Backtrace::force_capture().to_string());
            }
            self.router.write(&record);
        }

        match (self.termination, level) {
            (TerminationPolicy::LogOnly, _) => Escalation::Continue,
            (_, Level::Panic) => Escalation::Unwind(message.to_string()),
            (_, Level::Fatal) => Escalation::Exit(1),
            _ => Escalation::Continue,
        }
    }

    /// Route a prebuilt record with this logger's fields attached
    pub(crate) fn route_record(&self, record: Record) {
        self.router
            .write(&record.with_fields(Arc::clone(&self.fields)));
    }

    /// Carry out an [`Escalation`]
    pub fn escalate(&self, escalation: Escalation) {
        match escalation {
            Escalation::Continue => {}
            Escalation::Unwind(message) => std::panic::panic_any(message),
            Escalation::Exit(code) => {
                if let Err(e) = self.sync() {
                    eprintln!("[LOGGER ERROR] Sync before exit failed: {}", e);
                }
                std::process::exit(code);
            }
        }
    }

    /// Log a message at `level`, then apply the termination policy
    #[track_caller]
    pub fn log(&self, level: Level, message: impl fmt::Display) {
        self.emit(level, &message, None);
    }

    /// printf-style entry point used by the logging macros
    #[track_caller]
    pub fn log_args(&self, level: Level, args: fmt::Arguments<'_>, function: Option<&str>) {
        self.emit(level, &args, function);
    }

    #[track_caller]
    fn emit(&self, level: Level, message: &dyn fmt::Display, function: Option<&str>) {
        // Skip formatting entirely when nothing listens and nothing escalates
        if level < Level::Panic && !self.router.enabled(level) {
            return;
        }
        let escalation = self.log_escalating(level, &message.to_string(), function);
        self.escalate(escalation);
    }

    #[track_caller]
    pub fn debug(&self, message: impl fmt::Display) {
        self.emit(Level::Debug, &message, None);
    }

    #[track_caller]
    pub fn info(&self, message: impl fmt::Display) {
        self.emit(Level::Info, &message, None);
    }

    #[track_caller]
    pub fn warn(&self, message: impl fmt::Display) {
        self.emit(Level::Warn, &message, None);
    }

    #[track_caller]
    pub fn error(&self, message: impl fmt::Display) {
        self.emit(Level::Error, &message, None);
    }

    /// Log at `Panic`, then unwind (under the conventional policy)
    #[track_caller]
    pub fn panic(&self, message: impl fmt::Display) {
        self.emit(Level::Panic, &message, None);
    }

    /// Log at `Fatal`, then sync and exit (under the conventional policy)
    #[track_caller]
    pub fn fatal(&self, message: impl fmt::Display) {
        self.emit(Level::Fatal, &message, None);
    }

    #[track_caller]
    pub fn debugf(&self, args: fmt::Arguments<'_>) {
        self.emit(Level::Debug, &args, None);
    }

    #[track_caller]
    pub fn infof(&self, args: fmt::Arguments<'_>) {
        self.emit(Level::Info, &args, None);
    }

    #[track_caller]
    pub fn warnf(&self, args: fmt::Arguments<'_>) {
        self.emit(Level::Warn, &args, None);
    }

    #[track_caller]
    pub fn errorf(&self, args: fmt::Arguments<'_>) {
        self.emit(Level::Error, &args, None);
    }

    #[track_caller]
    pub fn panicf(&self, args: fmt::Arguments<'_>) {
        self.emit(Level::Panic, &args, None);
    }

    #[track_caller]
    pub fn fatalf(&self, args: fmt::Arguments<'_>) {
        self.emit(Level::Fatal, &args, None);
    }

    /// Print straight to stdout, bypassing sinks and levels:
    /// `<local time> console <file:line> <message>`
    #[track_caller]
    pub fn println(&self, message: impl fmt::Display) {
        write_console_line(&console_line(Location::caller(), &message));
    }

    #[track_caller]
    pub fn printf(&self, args: fmt::Arguments<'_>) {
        write_console_line(&console_line(Location::caller(), &args));
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::discard()
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("level", &self.level())
            .field("routes", &self.router.routes().len())
            .field("fields", &self.fields)
            .field("stack_level", &self.stack_level)
            .field("termination", &self.termination)
            .finish()
    }
}

fn console_line(location: &Location<'_>, message: &dyn fmt::Display) -> String {
    let message = message.to_string();
    format!(
        "{} console {} {}\n",
        local_now(),
        Caller::from_location(location).short(),
        message.trim_end_matches(['\n', '\r'])
    )
}

fn write_console_line(line: &str) {
    let mut stdout = io::stdout().lock();
    // Best effort, like print!, but without panicking on a closed stdout
    let _ = stdout.write_all(line.as_bytes());
}

/// Builder for [`Logger`]
///
/// # Example
///
/// ```
/// use rust_tee_logger::core::{Encoder, Level, Logger, Router, TerminationPolicy};
/// use rust_tee_logger::sinks::ConsoleSink;
/// use std::sync::Arc;
///
/// let router = Router::builder()
///     .dynamic_route(Arc::new(Encoder::json()), Arc::new(ConsoleSink::new()))
///     .build();
///
/// let logger = Logger::builder()
///     .router(Arc::new(router))
///     .field("service", "billing")
///     .stack_level(Level::Error)
///     .termination(TerminationPolicy::LogOnly)
///     .build();
///
/// logger.info("ready");
/// ```
pub struct LoggerBuilder {
    router: Option<Arc<Router>>,
    fields: Fields,
    stack_level: Level,
    termination: TerminationPolicy,
}

impl LoggerBuilder {
    pub fn new() -> Self {
        Self {
            router: None,
            fields: Fields::new(),
            stack_level: Level::Panic,
            termination: TerminationPolicy::default(),
        }
    }

    #[must_use]
    pub fn router(mut self, router: Arc<Router>) -> Self {
        self.router = Some(router);
        self
    }

    #[must_use]
    pub fn field(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(Field::new(key, value));
        self
    }

    #[must_use]
    pub fn stack_level(mut self, level: Level) -> Self {
        self.stack_level = level;
        self
    }

    #[must_use]
    pub fn termination(mut self, termination: TerminationPolicy) -> Self {
        self.termination = termination;
        self
    }

    /// Finish; without a router the logger discards everything
    pub fn build(self) -> Logger {
        Logger {
            router: self
                .router
                .unwrap_or_else(|| Arc::new(Router::discard())),
            fields: Arc::new(self.fields),
            stack_level: self.stack_level,
            termination: self.termination,
        }
    }
}

impl Default for LoggerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
