//! Core logger types and traits

pub mod encoder;
pub mod error;
pub mod field;
pub mod level;
pub mod level_gate;
pub mod logger;
pub mod metrics;
pub mod record;
pub mod router;
pub mod sink;
pub mod timestamp;

pub use encoder::{
    CallerStyle, Encoder, EncoderConfig, OutputFormat, CALLER_KEY, FUNCTION_KEY, LEVEL_KEY,
    MESSAGE_KEY, STACK_KEY, TIME_KEY,
};
pub use error::{LoggerError, Result};
pub use field::{Field, FieldValue, Fields};
pub use level::Level;
pub use level_gate::LevelGate;
pub use logger::{Escalation, Logger, LoggerBuilder, TerminationPolicy};
pub use metrics::RouterMetrics;
pub use record::{Caller, Record};
pub use router::{Route, Router, RouterBuilder};
pub use sink::Sink;
pub use timestamp::TimeFormat;
