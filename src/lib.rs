//! # Rust Tee Logger
//!
//! A structured logging facade that routes every record to several sinks at
//! once, each with its own encoding and severity gate.
//!
//! ## Features
//!
//! - **Fan-out routing**: console, rotating file, error-only file and UDP/TCP
//!   socket sinks behind a single logger
//! - **Dynamic level**: one shared threshold moved at runtime, plus fixed
//!   per-route gates such as the error file's
//! - **Structured fields**: cheap copy-on-write derivation with `with_field`
//! - **Failure isolation**: a failing or panicking sink never stops the others
//! - **Panic capture**: recovered panics are reported with a bounded stack
//!
//! ## Example
//!
//! ```
//! use rust_tee_logger::prelude::*;
//! use std::sync::Arc;
//!
//! let router = Router::builder()
//!     .dynamic_route(Arc::new(Encoder::text()), Arc::new(ConsoleSink::new()))
//!     .build();
//! let logger = Logger::new(Arc::new(router)).with_field("service", "billing");
//!
//! logger.info("Application started");
//! info!(logger, "listening on port {}", 8080);
//! logger.set_level(Level::Warn);
//! logger.info("filtered out");
//! logger.sync().ok();
//! ```

pub mod config;
pub mod core;
pub mod macros;
pub mod panic_capture;
pub mod registry;
pub mod sinks;

pub mod prelude {
    pub use crate::config::Config;
    pub use crate::core::{
        CallerStyle, Encoder, EncoderConfig, Escalation, Field, FieldValue, Fields, Level,
        LevelGate, Logger, LoggerBuilder, LoggerError, OutputFormat, Result, Router,
        RouterBuilder, RouterMetrics, Sink, TerminationPolicy, TimeFormat,
    };
    pub use crate::sinks::{
        ConsoleSink, DiscardSink, RotatingFileSink, RotationPolicy, SocketKind, SocketSink,
    };
    pub use crate::{
        debug, debugln, error, errorln, fatal, fatalln, info, infoln, log, logln, panic_log,
        panicln, warn, warnln,
    };
}

pub use config::Config;
pub use core::{
    Caller, CallerStyle, Encoder, EncoderConfig, Escalation, Field, FieldValue, Fields, Level,
    LevelGate, Logger, LoggerBuilder, LoggerError, OutputFormat, Record, Result, Route, Router,
    RouterBuilder, RouterMetrics, Sink, TerminationPolicy, TimeFormat,
};
pub use panic_capture::{catch_panic, install_panic_hook, PanicReport};
pub use sinks::{
    ConsoleSink, DiscardSink, RotatingFileSink, RotationPolicy, SocketKind, SocketSink,
};
