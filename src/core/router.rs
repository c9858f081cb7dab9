//! Multi-sink router
//!
//! A [`Router`] holds an ordered list of routes, each pairing an encoder and
//! a sink behind a severity gate. Every route except the fixed ones shares
//! one dynamic gate, so a single `set_level` call moves them all.
//!
//! **Per-Sink Isolation**: each sink call is wrapped in `catch_unwind`. A
//! sink that errors or panics is reported on stderr and counted; the other
//! sinks still receive the record and the caller never sees the failure.

use super::encoder::{Encoder, OutputFormat};
use super::error::{LoggerError, Result};
use super::level::Level;
use super::level_gate::LevelGate;
use super::metrics::RouterMetrics;
use super::record::Record;
use super::sink::Sink;
use crate::config::Config;
use crate::sinks::{ConsoleSink, DiscardSink, RotatingFileSink, SocketSink};
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// One (encoder, sink, gate) triple
#[derive(Clone)]
pub struct Route {
    encoder: Arc<Encoder>,
    sink: Arc<dyn Sink>,
    gate: Arc<LevelGate>,
}

impl Route {
    pub fn new(encoder: Arc<Encoder>, sink: Arc<dyn Sink>, gate: Arc<LevelGate>) -> Self {
        Self { encoder, sink, gate }
    }

    pub fn encoder(&self) -> &Arc<Encoder> {
        &self.encoder
    }

    pub fn sink(&self) -> &Arc<dyn Sink> {
        &self.sink
    }

    pub fn gate(&self) -> &Arc<LevelGate> {
        &self.gate
    }
}

/// Routes each record to every sink whose gate admits it
pub struct Router {
    routes: Vec<Route>,
    dynamic_gate: Arc<LevelGate>,
    metrics: RouterMetrics,
}

impl Router {
    pub fn builder() -> RouterBuilder {
        RouterBuilder::new()
    }

    /// A router with a single discard route
    pub fn discard() -> Self {
        RouterBuilder::new().build()
    }

    /// Build the standard topology described by `config`.
    ///
    /// In order: socket, consolidated file, error-only file, console. A sink
    /// that cannot be opened is reported on stderr and left out; the rest
    /// are built normally. The error-only file uses its own fixed gate at
    /// `config.error_file_level` and shares the consolidated file's encoder.
    pub fn from_config(config: &Config) -> Self {
        let json = Arc::new(Encoder::new(config.encoder_config(OutputFormat::Json)));
        let file_encoder = if config.file_logger_json {
            Arc::clone(&json)
        } else {
            Arc::new(Encoder::new(config.encoder_config(OutputFormat::Text)))
        };
        let console_encoder = if config.console_logger_json {
            Arc::clone(&json)
        } else {
            Arc::new(Encoder::new(
                config
                    .encoder_config(OutputFormat::Text)
                    .with_color_level(true),
            ))
        };

        let mut builder = RouterBuilder::new().initial_level(config.level);

        if config.socket_logger_enable {
            let address = config.socket_address();
            match SocketSink::connect(config.socket_type, address) {
                Ok(sink) => {
                    let encoder = if config.socket_logger_json {
                        Arc::clone(&json)
                    } else {
                        Arc::new(Encoder::new(config.encoder_config(OutputFormat::Text)))
                    };
                    builder = builder.dynamic_route(encoder, Arc::new(sink));
                }
                Err(e) => {
                    eprintln!("[LOGGER WARNING] {}. Socket sink disabled.", e);
                }
            }
        }

        if config.file_logger {
            match RotatingFileSink::with_policy(&config.log_file_name, config.rotation_policy()) {
                Ok(sink) => {
                    builder = builder.dynamic_route(Arc::clone(&file_encoder), Arc::new(sink));
                }
                Err(e) => eprintln!("[LOGGER WARNING] {}. File sink disabled.", e),
            }

            if config.error_file_enable {
                match RotatingFileSink::with_policy(
                    &config.error_file_name,
                    config.rotation_policy(),
                ) {
                    Ok(sink) => {
                        builder = builder.fixed_route(
                            Arc::clone(&file_encoder),
                            Arc::new(sink),
                            config.error_file_level,
                        );
                    }
                    Err(e) => eprintln!("[LOGGER WARNING] {}. Error file sink disabled.", e),
                }
            }
        }

        if config.console_logger {
            builder = builder.dynamic_route(console_encoder, Arc::new(ConsoleSink::new()));
        }

        builder.build()
    }

    /// Route one record. Never fails from the caller's point of view.
    pub fn write(&self, record: &Record) {
        // Encoded bytes keyed by encoder identity, so shared encoders run once
        let mut encoded: Vec<(*const Encoder, Vec<u8>)> = Vec::with_capacity(2);
        let mut routed = false;

        for (idx, route) in self.routes.iter().enumerate() {
            if !route.gate.passes(record.level) {
                continue;
            }
            routed = true;

            let key = Arc::as_ptr(&route.encoder);
            let slot = match encoded.iter().position(|(k, _)| *k == key) {
                Some(slot) => slot,
                None => {
                    encoded.push((key, route.encoder.encode(record)));
                    encoded.len() - 1
                }
            };
            let bytes = &encoded[slot].1;

            let result = panic::catch_unwind(AssertUnwindSafe(|| {
                route.sink.write(record.level, bytes)
            }));
            match result {
                Ok(Ok(())) => self.metrics.record_sink_write(bytes.len()),
                Ok(Err(e)) => {
                    self.metrics.record_sink_failure();
                    eprintln!(
                        "[LOGGER ERROR] Sink #{} ({}) failed: {}",
                        idx,
                        route.sink.name(),
                        e
                    );
                }
                Err(payload) => {
                    self.metrics.record_sink_failure();
                    eprintln!(
                        "[LOGGER CRITICAL] Sink #{} ({}) panicked: {}. \
                         Other sinks continue to function.",
                        idx,
                        route.sink.name(),
                        panic_message(payload.as_ref())
                    );
                }
            }
        }

        if routed {
            self.metrics.record_routed();
        }
    }

    /// Whether any route would accept a record at `level`
    #[inline]
    pub fn enabled(&self, level: Level) -> bool {
        self.routes.iter().any(|route| route.gate.passes(level))
    }

    /// Move the shared dynamic threshold; fixed gates are unaffected
    pub fn set_level(&self, level: Level) {
        self.dynamic_gate.set_threshold(level);
    }

    pub fn level(&self) -> Level {
        self.dynamic_gate.threshold().unwrap_or(Level::Fatal)
    }

    pub fn dynamic_gate(&self) -> &Arc<LevelGate> {
        &self.dynamic_gate
    }

    /// Flush every sink in route order.
    ///
    /// All sinks are attempted even after a failure; the first error is
    /// returned.
    pub fn sync(&self) -> Result<()> {
        let mut first_error = None;

        for (idx, route) in self.routes.iter().enumerate() {
            let result = panic::catch_unwind(AssertUnwindSafe(|| route.sink.flush()));
            let error = match result {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => {
                    eprintln!(
                        "[LOGGER ERROR] Sink #{} ({}) flush failed: {}",
                        idx,
                        route.sink.name(),
                        e
                    );
                    e
                }
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    eprintln!(
                        "[LOGGER CRITICAL] Sink #{} ({}) panicked during flush: {}. \
                         Other sinks continue to function.",
                        idx,
                        route.sink.name(),
                        message
                    );
                    LoggerError::sink_panicked(route.sink.name(), message)
                }
            };
            self.metrics.record_flush_failure();
            first_error.get_or_insert(error);
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn metrics(&self) -> &RouterMetrics {
        &self.metrics
    }
}

/// Assembles a [`Router`] route by route
///
/// # Example
///
/// ```
/// use rust_tee_logger::core::{Encoder, Level, Router};
/// use rust_tee_logger::sinks::ConsoleSink;
/// use std::sync::Arc;
///
/// let encoder = Arc::new(Encoder::text());
/// let router = Router::builder()
///     .initial_level(Level::Info)
///     .dynamic_route(Arc::clone(&encoder), Arc::new(ConsoleSink::with_writer(std::io::sink())))
///     .fixed_route(encoder, Arc::new(ConsoleSink::with_writer(std::io::sink())), Level::Error)
///     .build();
///
/// assert!(router.enabled(Level::Info));
/// assert!(!router.enabled(Level::Debug));
/// ```
pub struct RouterBuilder {
    routes: Vec<Route>,
    dynamic_gate: Arc<LevelGate>,
}

impl RouterBuilder {
    pub fn new() -> Self {
        Self {
            routes: Vec::new(),
            dynamic_gate: Arc::new(LevelGate::default()),
        }
    }

    /// Starting threshold of the shared dynamic gate
    #[must_use]
    pub fn initial_level(self, level: Level) -> Self {
        self.dynamic_gate.set_threshold(level);
        self
    }

    /// Add a route behind the shared dynamic gate
    #[must_use]
    pub fn dynamic_route(mut self, encoder: Arc<Encoder>, sink: Arc<dyn Sink>) -> Self {
        let gate = Arc::clone(&self.dynamic_gate);
        self.routes.push(Route::new(encoder, sink, gate));
        self
    }

    /// Add a route behind its own gate, fixed at `level`
    #[must_use]
    pub fn fixed_route(mut self, encoder: Arc<Encoder>, sink: Arc<dyn Sink>, level: Level) -> Self {
        let gate = Arc::new(LevelGate::new(level));
        self.routes.push(Route::new(encoder, sink, gate));
        self
    }

    /// Add a fully specified route
    #[must_use]
    pub fn route(mut self, route: Route) -> Self {
        self.routes.push(route);
        self
    }

    /// Finish; an empty builder yields a single discard route
    pub fn build(mut self) -> Router {
        if self.routes.is_empty() {
            let gate = Arc::clone(&self.dynamic_gate);
            self.routes.push(Route::new(
                Arc::new(Encoder::text()),
                Arc::new(DiscardSink::new()),
                gate,
            ));
        }
        Router {
            routes: self.routes,
            dynamic_gate: self.dynamic_gate,
            metrics: RouterMetrics::new(),
        }
    }
}

impl Default for RouterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Fields, Level};
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::tempdir;

    #[derive(Default)]
    struct MemorySink {
        lines: Mutex<Vec<String>>,
        flushes: AtomicUsize,
    }

    impl MemorySink {
        fn lines(&self) -> Vec<String> {
            self.lines.lock().clone()
        }
    }

    impl Sink for MemorySink {
        fn write(&self, _level: Level, bytes: &[u8]) -> Result<()> {
            self.lines
                .lock()
                .push(String::from_utf8_lossy(bytes).trim_end().to_string());
            Ok(())
        }

        fn flush(&self) -> Result<()> {
            self.flushes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn name(&self) -> &str {
            "memory"
        }
    }

    struct FailingSink;

    impl Sink for FailingSink {
        fn write(&self, _level: Level, _bytes: &[u8]) -> Result<()> {
            Err(LoggerError::writer("always fails"))
        }

        fn flush(&self) -> Result<()> {
            Err(LoggerError::writer("flush fails"))
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    struct PanickingSink;

    impl Sink for PanickingSink {
        fn write(&self, _level: Level, _bytes: &[u8]) -> Result<()> {
            panic!("sink exploded");
        }

        fn flush(&self) -> Result<()> {
            panic!("flush exploded");
        }

        fn name(&self) -> &str {
            "panicking"
        }
    }

    /// Counts writes that reach it
    struct CountingSink {
        count: AtomicUsize,
    }

    impl Sink for CountingSink {
        fn write(&self, _level: Level, _bytes: &[u8]) -> Result<()> {
            self.count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn flush(&self) -> Result<()> {
            Ok(())
        }

        fn name(&self) -> &str {
            "counting"
        }
    }

    fn record(level: Level, message: &str) -> Record {
        Record::new(level, message)
    }

    #[test]
    fn test_dynamic_threshold_applies_to_all_dynamic_routes() {
        let a = Arc::new(MemorySink::default());
        let b = Arc::new(MemorySink::default());
        let errors = Arc::new(MemorySink::default());
        let encoder = Arc::new(Encoder::json());

        let router = Router::builder()
            .dynamic_route(Arc::clone(&encoder), a.clone())
            .dynamic_route(Arc::clone(&encoder), b.clone())
            .fixed_route(encoder, errors.clone(), Level::Error)
            .build();

        router.set_level(Level::Warn);
        assert_eq!(router.level(), Level::Warn);

        for level in Level::ALL {
            router.write(&record(level, level.as_str()));
        }

        let expected = Level::ALL.iter().filter(|l| **l >= Level::Warn).count();
        assert_eq!(a.lines().len(), expected);
        assert_eq!(b.lines().len(), expected);
        // Error, Panic, Fatal regardless of the dynamic level
        assert_eq!(errors.lines().len(), 3);
    }

    #[test]
    fn test_fixed_gate_ignores_set_level() {
        let errors = Arc::new(MemorySink::default());
        let router = Router::builder()
            .fixed_route(Arc::new(Encoder::text()), errors.clone(), Level::Error)
            .build();

        router.set_level(Level::Fatal);
        router.write(&record(Level::Error, "still recorded"));
        assert_eq!(errors.lines().len(), 1);

        router.set_level(Level::Debug);
        router.write(&record(Level::Warn, "below the fixed gate"));
        assert_eq!(errors.lines().len(), 1);
    }

    #[test]
    fn test_enabled() {
        let router = Router::builder()
            .initial_level(Level::Warn)
            .dynamic_route(Arc::new(Encoder::text()), Arc::new(MemorySink::default()))
            .build();

        assert!(!router.enabled(Level::Info));
        assert!(router.enabled(Level::Warn));
        router.dynamic_gate().close();
        assert!(!router.enabled(Level::Fatal));
    }

    #[test]
    fn test_failing_sink_does_not_block_others() {
        let good = Arc::new(MemorySink::default());
        let router = Router::builder()
            .dynamic_route(Arc::new(Encoder::text()), Arc::new(FailingSink))
            .dynamic_route(Arc::new(Encoder::text()), Arc::new(PanickingSink))
            .dynamic_route(Arc::new(Encoder::text()), good.clone())
            .build();

        router.write(&record(Level::Info, "survives"));
        router.write(&record(Level::Info, "again"));

        assert_eq!(good.lines().len(), 2);
        assert_eq!(router.metrics().sink_failures(), 4);
        assert_eq!(router.metrics().sink_writes(), 2);
        assert_eq!(router.metrics().records_routed(), 2);
    }

    #[test]
    fn test_sync_attempts_all_and_returns_first_error() {
        let good = Arc::new(MemorySink::default());
        let router = Router::builder()
            .dynamic_route(Arc::new(Encoder::text()), Arc::new(FailingSink))
            .dynamic_route(Arc::new(Encoder::text()), Arc::new(PanickingSink))
            .dynamic_route(Arc::new(Encoder::text()), good.clone())
            .build();

        let err = router.sync().unwrap_err();
        assert!(matches!(err, LoggerError::WriterError(_)));
        assert_eq!(good.flushes.load(Ordering::SeqCst), 1);
        assert_eq!(router.metrics().flush_failures(), 2);
    }

    #[test]
    fn test_shared_encoder_encodes_once_and_writes_same_bytes() {
        let a = Arc::new(MemorySink::default());
        let b = Arc::new(MemorySink::default());
        let encoder = Arc::new(Encoder::json());
        let router = Router::builder()
            .dynamic_route(Arc::clone(&encoder), a.clone())
            .dynamic_route(encoder, b.clone())
            .build();

        let fields = Fields::new().with_field("k", 1);
        router.write(&record(Level::Info, "same").with_fields(Arc::new(fields)));
        assert_eq!(a.lines(), b.lines());
    }

    #[test]
    fn test_empty_builder_discards() {
        let router = Router::discard();
        assert_eq!(router.routes().len(), 1);
        assert_eq!(router.routes()[0].sink().name(), "discard");
        router.write(&record(Level::Error, "nowhere"));
        assert!(router.sync().is_ok());
    }

    #[test]
    fn test_closed_gate_routes_nothing() {
        let counting = Arc::new(CountingSink {
            count: AtomicUsize::new(0),
        });
        let router = Router::builder()
            .dynamic_route(Arc::new(Encoder::text()), counting.clone())
            .build();
        router.dynamic_gate().close();
        router.write(&record(Level::Fatal, "dropped"));
        assert_eq!(counting.count.load(Ordering::SeqCst), 0);
        assert_eq!(router.metrics().records_routed(), 0);
    }

    #[test]
    fn test_from_config_topology() {
        let dir = tempdir().unwrap();
        let config = Config {
            log_file_name: dir.path().join("all.log"),
            error_file_name: dir.path().join("error.log"),
            error_file_enable: true,
            console_logger: false,
            ..Config::default()
        };

        let router = Router::from_config(&config);
        let names: Vec<&str> = router.routes().iter().map(|r| r.sink().name()).collect();
        assert_eq!(names, vec!["rotating_file", "rotating_file"]);
        // File and error file share one encoder
        assert!(Arc::ptr_eq(
            router.routes()[0].encoder(),
            router.routes()[1].encoder()
        ));

        router.write(&record(Level::Info, "info only"));
        router.write(&record(Level::Error, "both files"));
        router.sync().unwrap();

        let all = std::fs::read_to_string(dir.path().join("all.log")).unwrap();
        let errors = std::fs::read_to_string(dir.path().join("error.log")).unwrap();
        assert_eq!(all.lines().count(), 2);
        assert_eq!(errors.lines().count(), 1);
        assert!(errors.contains("both files"));
    }

    #[test]
    fn test_from_config_nothing_enabled() {
        let config = Config {
            file_logger: false,
            console_logger: false,
            ..Config::default()
        };
        let router = Router::from_config(&config);
        assert_eq!(router.routes().len(), 1);
        assert_eq!(router.routes()[0].sink().name(), "discard");
    }

    #[test]
    fn test_from_config_unreachable_socket_is_omitted() {
        let config = Config {
            socket_logger_enable: true,
            socket_type: crate::sinks::SocketKind::Tcp,
            socket_ip: "not a host name".to_string(),
            file_logger: false,
            console_logger: false,
            ..Config::default()
        };
        let router = Router::from_config(&config);
        assert_eq!(router.routes().len(), 1);
        assert_eq!(router.routes()[0].sink().name(), "discard");
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("static str");
        assert_eq!(panic_message(payload.as_ref()), "static str");
        let payload: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(payload.as_ref()), "owned");
        let payload: Box<dyn Any + Send> = Box::new(42u8);
        assert_eq!(panic_message(payload.as_ref()), "Unknown panic");
    }
}
