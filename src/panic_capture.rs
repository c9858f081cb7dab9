//! Panic capture
//!
//! Turns a panic into an error-level record carrying a bounded traceback:
//!
//! ```text
//! 2025-01-08 10:30:45.123 capture panic--------------------------------------- start
//! runtime error: attempt to divide by zero
//! traceback:
//!     stack: 1 [ file: src/main.rs:12 ] func: demo::divide
//!     stack: 2 [ file: src/main.rs:20 ] func: demo::main
//! 2025-01-08 10:30:45.123 capture panic--------------------------------------- end
//! ```
//!
//! [`catch_panic`] runs a closure and reports a panic instead of
//! propagating it. [`install_panic_hook`] reports every panic that is not
//! already inside `catch_panic`, then defers to the previous hook.

use crate::core::router::panic_message;
use crate::core::timestamp::local_now;
use crate::core::{Caller, Level, Logger, Record};
use parking_lot::RwLock;
use std::backtrace::Backtrace;
use std::cell::{Cell, RefCell};
use std::panic::{self, UnwindSafe};
use std::sync::Once;

/// Maximum number of frames in a report
pub const MAX_STACK_FRAMES: usize = 20;

/// Frames the report opens and closes with
pub const SEPARATOR: &str = "capture panic---------------------------------------";

/// Function-name prefixes of runtime and capture frames left out of reports
const SKIPPED_FRAME_PREFIXES: &[&str] = &[
    "std::",
    "core::",
    "alloc::",
    "rust_begin_unwind",
    "__rust",
    "rust_tee_logger::panic_capture",
    "<alloc::boxed::Box",
];

static HOOK: Once = Once::new();
static HOOK_LOGGER: RwLock<Option<Logger>> = parking_lot::const_rwlock(None);

thread_local! {
    static CAPTURE_DEPTH: Cell<usize> = const { Cell::new(0) };
    static IN_HOOK: Cell<bool> = const { Cell::new(false) };
    static CAPTURED: RefCell<Option<PanicReport>> = const { RefCell::new(None) };
}

/// One frame of a traceback
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub function: String,
    /// `file:line`, when debug info is available
    pub location: Option<String>,
}

/// A captured panic: message, origin and bounded traceback
#[derive(Debug, Clone)]
pub struct PanicReport {
    pub message: String,
    pub location: Option<(String, u32)>,
    pub frames: Vec<Frame>,
}

impl PanicReport {
    fn new(
        message: String,
        location: Option<(String, u32)>,
        backtrace: Option<&Backtrace>,
    ) -> Self {
        let frames = backtrace
            .map(|bt| parse_frames(&bt.to_string()))
            .unwrap_or_default();
        Self {
            message,
            location,
            frames,
        }
    }

    /// Multi-line report framed by [`SEPARATOR`]
    pub fn render(&self) -> String {
        let now = local_now();
        let mut out = format!(
            "{} {} start\nruntime error: {}\ntraceback:\n",
            now, SEPARATOR, self.message
        );
        for (i, frame) in self.frames.iter().enumerate() {
            out.push_str(&format!(
                "\tstack: {} [ file: {} ] func: {}\n",
                i + 1,
                frame.location.as_deref().unwrap_or("unknown"),
                frame.function
            ));
        }
        out.push_str(&format!("{} {} end\n", now, SEPARATOR));
        out
    }

    /// Route the report through `logger` at error severity
    pub fn log(&self, logger: &Logger) {
        if !logger.enabled(Level::Error) {
            return;
        }
        let mut record = Record::new(Level::Error, format!("capture panic: {}", self.message))
            .with_stack(self.render());
        if let Some((file, line)) = &self.location {
            record = record.with_caller(Caller::new(file.clone(), *line));
        }
        logger.route_record(record);
    }
}

/// Extract up to [`MAX_STACK_FRAMES`] user frames from a rendered
/// `std::backtrace::Backtrace`
pub fn parse_frames(text: &str) -> Vec<Frame> {
    let mut frames: Vec<Frame> = Vec::new();

    for line in text.lines() {
        let trimmed = line.trim();
        if let Some(location) = trimmed.strip_prefix("at ") {
            if let Some(frame) = frames.last_mut() {
                if frame.location.is_none() {
                    frame.location = Some(strip_column(location).to_string());
                }
            }
            continue;
        }
        if let Some((index, function)) = trimmed.split_once(": ") {
            if !index.is_empty() && index.chars().all(|c| c.is_ascii_digit()) {
                frames.push(Frame {
                    function: function.to_string(),
                    location: None,
                });
            }
        }
    }

    frames
        .into_iter()
        .filter(|frame| {
            !SKIPPED_FRAME_PREFIXES
                .iter()
                .any(|prefix| frame.function.starts_with(prefix))
        })
        .take(MAX_STACK_FRAMES)
        .collect()
}

/// `file.rs:12:5` -> `file.rs:12`
fn strip_column(location: &str) -> &str {
    match location.rsplit_once(':') {
        Some((rest, column))
            if column.chars().all(|c| c.is_ascii_digit()) && rest.contains(':') =>
        {
            rest
        }
        _ => location,
    }
}

fn ensure_hook() {
    HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            // A panic raised while reporting a panic goes straight through
            if IN_HOOK.with(|flag| flag.replace(true)) {
                previous(info);
                return;
            }

            let location = info.location().map(|l| (l.file().to_string(), l.line()));
            let report = PanicReport::new(
                panic_message(info.payload()),
                location,
                Some(&Backtrace::force_capture()),
            );

            if CAPTURE_DEPTH.with(|depth| depth.get()) > 0 {
                CAPTURED.with(|slot| *slot.borrow_mut() = Some(report));
            } else {
                let logger = HOOK_LOGGER.read().clone();
                if let Some(logger) = logger {
                    report.log(&logger);
                }
                previous(info);
            }

            IN_HOOK.with(|flag| flag.set(false));
        }));
    });
}

/// Run `f`, reporting a panic through `logger` instead of propagating it
///
/// Returns `Some` with the closure's value, or `None` after a panic was
/// logged.
///
/// # Example
///
/// ```
/// use rust_tee_logger::{panic_capture, Logger};
///
/// let logger = Logger::discard();
/// let value = panic_capture::catch_panic(&logger, || 6 * 7);
/// assert_eq!(value, Some(42));
///
/// let nothing: Option<i32> = panic_capture::catch_panic(&logger, || panic!("boom"));
/// assert_eq!(nothing, None);
/// ```
pub fn catch_panic<F, R>(logger: &Logger, f: F) -> Option<R>
where
    F: FnOnce() -> R + UnwindSafe,
{
    ensure_hook();

    // A report left by a panic that was caught further in is stale
    CAPTURED.with(|slot| slot.borrow_mut().take());
    CAPTURE_DEPTH.with(|depth| depth.set(depth.get() + 1));
    let result = panic::catch_unwind(f);
    CAPTURE_DEPTH.with(|depth| depth.set(depth.get() - 1));
    let captured = CAPTURED.with(|slot| slot.borrow_mut().take());

    match result {
        Ok(value) => Some(value),
        Err(payload) => {
            // `resume_unwind` skips the hook, so the captured report may
            // belong to an earlier panic
            let message = panic_message(payload.as_ref());
            let report = captured
                .filter(|report| report.message == message)
                .unwrap_or_else(|| PanicReport::new(message, None, None));
            report.log(logger);
            None
        }
    }
}

/// Report every panic outside [`catch_panic`] through `logger`
///
/// The previously installed hook still runs afterwards. Calling this again
/// replaces the logger.
pub fn install_panic_hook(logger: Logger) {
    ensure_hook();
    *HOOK_LOGGER.write() = Some(logger);
}

/// Stop reporting panics through the hook logger
pub fn remove_panic_hook_logger() {
    *HOOK_LOGGER.write() = None;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Encoder, Result, Router, Sink};
    use parking_lot::Mutex;
    use std::panic::AssertUnwindSafe;
    use std::sync::Arc;

    #[derive(Default)]
    struct MemorySink {
        lines: Mutex<Vec<String>>,
    }

    impl Sink for MemorySink {
        fn write(&self, _level: Level, bytes: &[u8]) -> Result<()> {
            self.lines
                .lock()
                .push(String::from_utf8_lossy(bytes).into_owned());
            Ok(())
        }

        fn flush(&self) -> Result<()> {
            Ok(())
        }

        fn name(&self) -> &str {
            "memory"
        }
    }

    fn json_logger() -> (Logger, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::default());
        let router = Router::builder()
            .dynamic_route(Arc::new(Encoder::json()), sink.clone())
            .build();
        (Logger::new(Arc::new(router)), sink)
    }

    const SAMPLE_BACKTRACE: &str = "\
   0: std::backtrace_rs::backtrace::libunwind::trace
             at /rustc/abc/library/std/src/../../backtrace/src/backtrace/libunwind.rs:116:5
   1: std::backtrace::Backtrace::force_capture
             at /rustc/abc/library/std/src/backtrace.rs:312:9
   2: rust_tee_logger::panic_capture::ensure_hook::{{closure}}
             at ./src/panic_capture.rs:170:17
   3: demo::divide
             at ./src/main.rs:12:5
   4: demo::main
             at ./src/main.rs:20:13
   5: core::ops::function::FnOnce::call_once
             at /rustc/abc/library/core/src/ops/function.rs:250:5
   6: main
";

    #[test]
    fn test_parse_frames_skips_runtime_frames() {
        let frames = parse_frames(SAMPLE_BACKTRACE);
        assert_eq!(
            frames,
            vec![
                Frame {
                    function: "demo::divide".to_string(),
                    location: Some("./src/main.rs:12".to_string()),
                },
                Frame {
                    function: "demo::main".to_string(),
                    location: Some("./src/main.rs:20".to_string()),
                },
                Frame {
                    function: "main".to_string(),
                    location: None,
                },
            ]
        );
    }

    #[test]
    fn test_parse_frames_is_bounded() {
        let mut text = String::new();
        for i in 0..50 {
            text.push_str(&format!("  {}: app::frame_{}\n      at src/lib.rs:{}:1\n", i, i, i));
        }
        assert_eq!(parse_frames(&text).len(), MAX_STACK_FRAMES);
    }

    #[test]
    fn test_render_layout() {
        let report = PanicReport {
            message: "attempt to divide by zero".to_string(),
            location: None,
            frames: vec![Frame {
                function: "demo::divide".to_string(),
                location: Some("src/main.rs:12".to_string()),
            }],
        };
        let text = report.render();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 5);
        assert!(lines[0].ends_with(&format!("{} start", SEPARATOR)));
        assert_eq!(lines[1], "runtime error: attempt to divide by zero");
        assert_eq!(lines[2], "traceback:");
        assert_eq!(lines[3], "\tstack: 1 [ file: src/main.rs:12 ] func: demo::divide");
        assert!(lines[4].ends_with(&format!("{} end", SEPARATOR)));
    }

    #[test]
    fn test_catch_panic_returns_value() {
        let (logger, sink) = json_logger();
        assert_eq!(catch_panic(&logger, || "fine"), Some("fine"));
        assert!(sink.lines.lock().is_empty());
    }

    #[test]
    fn test_catch_panic_logs_report_and_continues() {
        let (logger, sink) = json_logger();

        let result: Option<()> = catch_panic(&logger, || {
            let divisor = std::hint::black_box(0);
            let _ = 10 / divisor;
        });
        assert!(result.is_none());

        let lines = sink.lines.lock();
        assert_eq!(lines.len(), 1);
        let record: serde_json::Value = serde_json::from_str(&lines[0]).unwrap();
        assert_eq!(record["level"], "error");
        assert!(record["msg"].as_str().unwrap().contains("divide by zero"));
        assert!(record["caller"].as_str().unwrap().starts_with("panic_capture.rs:"));

        let stack = record["stack"].as_str().unwrap();
        assert!(stack.contains(&format!("{} start", SEPARATOR)));
        assert!(stack.contains(&format!("{} end", SEPARATOR)));
        assert!(stack.contains("traceback:"));
        let frame_lines = stack.lines().filter(|l| l.starts_with("\tstack: ")).count();
        assert!(frame_lines <= MAX_STACK_FRAMES);
    }

    fn swallow_inner_panic() {
        let inner = panic::catch_unwind(|| panic!("swallowed inside"));
        assert!(inner.is_err());
    }

    fn logged_messages(sink: &MemorySink) -> Vec<String> {
        sink.lines
            .lock()
            .iter()
            .map(|line| {
                let record: serde_json::Value = serde_json::from_str(line).unwrap();
                record["msg"].as_str().unwrap().to_string()
            })
            .collect()
    }

    #[test]
    fn test_resumed_unwind_after_earlier_capture_is_reported_as_itself() {
        let (logger, sink) = json_logger();

        assert_eq!(catch_panic(&logger, swallow_inner_panic), Some(()));
        let result: Option<()> =
            catch_panic(&logger, || panic::resume_unwind(Box::new("resumed payload")));
        assert!(result.is_none());

        assert_eq!(logged_messages(&sink), vec!["capture panic: resumed payload"]);
    }

    #[test]
    fn test_resumed_unwind_after_inner_catch_is_reported_as_itself() {
        let (logger, sink) = json_logger();

        let result: Option<()> = catch_panic(&logger, || {
            swallow_inner_panic();
            panic::resume_unwind(Box::new("resumed payload"))
        });
        assert!(result.is_none());

        assert_eq!(logged_messages(&sink), vec!["capture panic: resumed payload"]);
    }

    #[test]
    fn test_catch_panic_with_logger_panic() {
        let (logger, sink) = json_logger();
        let result: Option<()> =
            catch_panic(&logger, AssertUnwindSafe(|| logger.panic("explicit")));
        assert!(result.is_none());

        // The panic record itself, then the capture report
        let lines = sink.lines.lock();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("\"level\":\"panic\""));
        assert!(lines[1].contains("capture panic: explicit"));
    }
}
