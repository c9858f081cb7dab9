//! Default logger registry
//!
//! A [`Registry`] owns the "current" logger. The first `get` on an empty
//! registry builds a logger from the registry's config; later `init` or
//! `set` calls replace it atomically. A process-wide registry backs the
//! free functions in this module, so applications can log without passing
//! a logger around:
//!
//! ```no_run
//! use rust_tee_logger::{registry, Config};
//!
//! registry::init(Config::console_only()).unwrap();
//! registry::info("service started");
//! registry::with_field("user", 42).warn("quota almost reached");
//! registry::sync().ok();
//! ```

use crate::config::Config;
use crate::core::{Field, FieldValue, Fields, Level, Logger, Result};
use parking_lot::RwLock;
use std::fmt;
use std::io::Read;
use std::path::Path;

pub struct Registry {
    slot: RwLock<Option<Logger>>,
    /// Used for lazy construction; `None` means [`Config::default`]
    config: RwLock<Option<Config>>,
}

impl Registry {
    pub const fn new() -> Self {
        Self {
            slot: parking_lot::const_rwlock(None),
            config: parking_lot::const_rwlock(None),
        }
    }

    /// Registry that lazily builds its logger from `config`
    pub fn with_config(config: Config) -> Self {
        Self {
            slot: RwLock::new(None),
            config: RwLock::new(Some(config)),
        }
    }

    /// Current logger, built on first use
    ///
    /// Two threads racing on an empty registry observe the same logger.
    pub fn get(&self) -> Logger {
        if let Some(logger) = self.slot.read().as_ref() {
            return logger.clone();
        }

        let mut slot = self.slot.write();
        if let Some(logger) = slot.as_ref() {
            return logger.clone();
        }
        let config = self.config.read().clone().unwrap_or_default();
        let logger = Logger::from_config(&config);
        *slot = Some(logger.clone());
        logger
    }

    /// Replace the current logger
    pub fn set(&self, logger: Logger) {
        *self.slot.write() = Some(logger);
    }

    /// Build a logger from `config` and make it current
    ///
    /// Sink failures are reported on stderr and do not fail the call.
    pub fn init(&self, config: Config) -> Result<()> {
        let logger = Logger::from_config(&config);
        *self.config.write() = Some(config);
        self.set(logger);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed; the current
    /// logger is left untouched in that case
    pub fn init_from_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.init(Config::from_file(path)?)
    }

    pub fn init_from_reader<R: Read>(&self, reader: R) -> Result<()> {
        self.init(Config::from_reader(reader)?)
    }

    pub fn is_initialized(&self) -> bool {
        self.slot.read().is_some()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

static GLOBAL: Registry = Registry::new();

/// The process-wide registry
pub fn global() -> &'static Registry {
    &GLOBAL
}

pub fn init(config: Config) -> Result<()> {
    GLOBAL.init(config)
}

/// Initialize the default logger from an INI-style file
///
/// The path is used as given; relative paths resolve against the current
/// working directory.
pub fn init_from_file<P: AsRef<Path>>(path: P) -> Result<()> {
    GLOBAL.init_from_file(path)
}

pub fn init_from_reader<R: Read>(reader: R) -> Result<()> {
    GLOBAL.init_from_reader(reader)
}

pub fn default_logger() -> Logger {
    GLOBAL.get()
}

pub fn set_default_logger(logger: Logger) {
    GLOBAL.set(logger);
}

pub fn set_level(level: Level) {
    GLOBAL.get().set_level(level);
}

pub fn level() -> Level {
    GLOBAL.get().level()
}

pub fn sync() -> Result<()> {
    GLOBAL.get().sync()
}

pub fn with<I>(fields: I) -> Logger
where
    I: IntoIterator<Item = Field>,
{
    GLOBAL.get().with(fields)
}

pub fn with_field(key: impl Into<String>, value: impl Into<FieldValue>) -> Logger {
    GLOBAL.get().with_field(key, value)
}

pub fn with_fields(fields: impl Into<Fields>) -> Logger {
    GLOBAL.get().with_fields(fields)
}

#[track_caller]
pub fn debug(message: impl fmt::Display) {
    GLOBAL.get().debug(message);
}

#[track_caller]
pub fn info(message: impl fmt::Display) {
    GLOBAL.get().info(message);
}

#[track_caller]
pub fn warn(message: impl fmt::Display) {
    GLOBAL.get().warn(message);
}

#[track_caller]
pub fn error(message: impl fmt::Display) {
    GLOBAL.get().error(message);
}

#[track_caller]
pub fn panic(message: impl fmt::Display) {
    GLOBAL.get().panic(message);
}

#[track_caller]
pub fn fatal(message: impl fmt::Display) {
    GLOBAL.get().fatal(message);
}

#[track_caller]
pub fn debugf(args: fmt::Arguments<'_>) {
    GLOBAL.get().debugf(args);
}

#[track_caller]
pub fn infof(args: fmt::Arguments<'_>) {
    GLOBAL.get().infof(args);
}

#[track_caller]
pub fn warnf(args: fmt::Arguments<'_>) {
    GLOBAL.get().warnf(args);
}

#[track_caller]
pub fn errorf(args: fmt::Arguments<'_>) {
    GLOBAL.get().errorf(args);
}

#[track_caller]
pub fn panicf(args: fmt::Arguments<'_>) {
    GLOBAL.get().panicf(args);
}

#[track_caller]
pub fn fatalf(args: fmt::Arguments<'_>) {
    GLOBAL.get().fatalf(args);
}

#[track_caller]
pub fn println(message: impl fmt::Display) {
    GLOBAL.get().println(message);
}

#[track_caller]
pub fn printf(args: fmt::Arguments<'_>) {
    GLOBAL.get().printf(args);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::sync::{Arc, Barrier};
    use std::thread;

    fn quiet_config() -> Config {
        Config {
            file_logger: false,
            console_logger: false,
            ..Config::default()
        }
    }

    #[test]
    fn test_lazy_get_builds_once() {
        let registry = Registry::with_config(quiet_config());
        assert!(!registry.is_initialized());

        let first = registry.get();
        let second = registry.get();
        assert!(registry.is_initialized());
        assert!(Arc::ptr_eq(first.router(), second.router()));
    }

    #[test]
    fn test_racing_first_calls_observe_same_logger() {
        let registry = Arc::new(Registry::with_config(quiet_config()));
        let barrier = Arc::new(Barrier::new(8));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    registry.get()
                })
            })
            .collect();

        let loggers: Vec<Logger> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for logger in &loggers[1..] {
            assert!(Arc::ptr_eq(loggers[0].router(), logger.router()));
        }
    }

    #[test]
    fn test_set_replaces_logger() {
        let registry = Registry::with_config(quiet_config());
        let original = registry.get();

        let replacement = Logger::discard().with_field("replaced", true);
        registry.set(replacement);

        let current = registry.get();
        assert!(!Arc::ptr_eq(original.router(), current.router()));
        assert!(current.fields().contains_key("replaced"));
    }

    #[test]
    fn test_init_applies_level() {
        let registry = Registry::new();
        registry
            .init(Config {
                level: Level::Warn,
                ..quiet_config()
            })
            .unwrap();
        assert_eq!(registry.get().level(), Level::Warn);
    }

    #[test]
    fn test_init_from_reader_error_keeps_current_logger() {
        let registry = Registry::with_config(quiet_config());
        let before = registry.get();

        let result = registry.init_from_reader(Cursor::new("level = shouting\n"));
        assert!(result.is_err());
        assert!(Arc::ptr_eq(before.router(), registry.get().router()));
    }

    #[test]
    fn test_init_from_reader() {
        let registry = Registry::new();
        registry
            .init_from_reader(Cursor::new(
                "fileLogger = false\nconsoleLogger = false\nlevel = error\n",
            ))
            .unwrap();
        assert_eq!(registry.get().level(), Level::Error);
    }
}
