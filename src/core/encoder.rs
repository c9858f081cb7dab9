//! Record encoders
//!
//! Provides the two wire formats a route can use:
//! - Text: human-readable, tab separated, optionally colored
//! - Json: one machine-readable object per line

use super::record::Record;
use super::timestamp::TimeFormat;
use colored::Colorize;
use serde::{Deserialize, Serialize};

pub const TIME_KEY: &str = "time";
pub const LEVEL_KEY: &str = "level";
pub const CALLER_KEY: &str = "caller";
pub const FUNCTION_KEY: &str = "func";
pub const MESSAGE_KEY: &str = "msg";
pub const STACK_KEY: &str = "stack";

/// Output format for encoded records
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    /// Human-readable text format (default)
    ///
    /// Example: `2025-01-08 10:30:45.123	[INFO]	main.rs:12	Request processed	{"user":7}`
    #[default]
    Text,

    /// JSON format for machine processing
    ///
    /// Example: `{"time":"2025-01-08 10:30:45.123","level":"info","caller":"main.rs:12","msg":"Request processed","user":7}`
    Json,
}

/// How the caller location is rendered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallerStyle {
    /// Full source path and line
    Full,
    /// File name and line only
    #[default]
    Short,
}

/// Configuration for one encoder
///
/// # Examples
///
/// ```
/// use rust_tee_logger::{CallerStyle, EncoderConfig, OutputFormat, TimeFormat};
///
/// let config = EncoderConfig::new(OutputFormat::Json)
///     .with_time_format(TimeFormat::Iso8601Utc)
///     .with_caller_style(CallerStyle::Full)
///     .with_function(true);
/// assert_eq!(config.format, OutputFormat::Json);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderConfig {
    pub format: OutputFormat,
    pub time_format: TimeFormat,
    pub caller_style: CallerStyle,
    /// Whether to include the calling function, when known
    pub include_function: bool,
    /// Whether to color the level text (text format only)
    pub color_level: bool,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Text,
            time_format: TimeFormat::default(),
            caller_style: CallerStyle::default(),
            include_function: false,
            color_level: false,
        }
    }
}

impl EncoderConfig {
    #[must_use]
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_time_format(mut self, format: TimeFormat) -> Self {
        self.time_format = format;
        self
    }

    #[must_use]
    pub fn with_caller_style(mut self, style: CallerStyle) -> Self {
        self.caller_style = style;
        self
    }

    #[must_use]
    pub fn with_function(mut self, include: bool) -> Self {
        self.include_function = include;
        self
    }

    #[must_use]
    pub fn with_color_level(mut self, color: bool) -> Self {
        self.color_level = color;
        self
    }
}

/// Escape newlines, carriage returns and tabs so a message can never
/// forge an extra text line or column
fn sanitize_message(message: &str) -> String {
    message
        .replace('\n', "\\n")
        .replace('\r', "\\r")
        .replace('\t', "\\t")
}

/// Turns records into bytes. Encoding never fails.
#[derive(Debug, Clone, Default)]
pub struct Encoder {
    config: EncoderConfig,
}

impl Encoder {
    pub fn new(config: EncoderConfig) -> Self {
        Self { config }
    }

    pub fn text() -> Self {
        Self::new(EncoderConfig::new(OutputFormat::Text))
    }

    pub fn json() -> Self {
        Self::new(EncoderConfig::new(OutputFormat::Json))
    }

    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    pub fn encode(&self, record: &Record) -> Vec<u8> {
        match self.config.format {
            OutputFormat::Text => self.encode_text(record).into_bytes(),
            OutputFormat::Json => self.encode_json(record).into_bytes(),
        }
    }

    fn caller_text(&self, record: &Record) -> Option<String> {
        record.caller.as_ref().map(|caller| match self.config.caller_style {
            CallerStyle::Full => caller.full(),
            CallerStyle::Short => caller.short(),
        })
    }

    fn function_text<'a>(&self, record: &'a Record) -> Option<&'a str> {
        if !self.config.include_function {
            return None;
        }
        record.caller.as_ref().and_then(|c| c.function.as_deref())
    }

    fn encode_text(&self, record: &Record) -> String {
        let level = format!("[{}]", record.level.as_upper_str());
        let level = if self.config.color_level {
            level.color(record.level.color_code()).to_string()
        } else {
            level
        };

        let mut columns = vec![self.config.time_format.render(&record.timestamp), level];
        if let Some(caller) = self.caller_text(record) {
            columns.push(caller);
        }
        if let Some(function) = self.function_text(record) {
            columns.push(function.to_string());
        }
        columns.push(sanitize_message(&record.message));
        if !record.fields.is_empty() {
            let object = serde_json::Value::Object(record.fields.to_json_object());
            columns.push(object.to_string());
        }

        let mut line = columns.join("\t");
        line.push('\n');
        if let Some(ref stack) = record.stack {
            line.push_str(stack.trim_end());
            line.push('\n');
        }
        line
    }

    fn encode_json(&self, record: &Record) -> String {
        let mut json_obj = serde_json::Map::new();

        json_obj.insert(
            TIME_KEY.to_string(),
            self.config.time_format.to_json(&record.timestamp),
        );
        json_obj.insert(
            LEVEL_KEY.to_string(),
            serde_json::Value::String(record.level.as_str().to_string()),
        );
        if let Some(caller) = self.caller_text(record) {
            json_obj.insert(CALLER_KEY.to_string(), serde_json::Value::String(caller));
        }
        if let Some(function) = self.function_text(record) {
            json_obj.insert(
                FUNCTION_KEY.to_string(),
                serde_json::Value::String(function.to_string()),
            );
        }
        json_obj.insert(
            MESSAGE_KEY.to_string(),
            serde_json::Value::String(record.message.clone()),
        );

        // Fixed keys are never overwritten by ambient fields
        let has_stack = record.stack.is_some();
        for field in record.fields.iter() {
            if json_obj.contains_key(&field.key) || (has_stack && field.key == STACK_KEY) {
                continue;
            }
            json_obj.insert(field.key.clone(), field.value.to_json_value());
        }

        if let Some(ref stack) = record.stack {
            json_obj.insert(
                STACK_KEY.to_string(),
                serde_json::Value::String(stack.clone()),
            );
        }

        let mut line = serde_json::Value::Object(json_obj).to_string();
        line.push('\n');
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Caller, Fields, Level};
    use chrono::TimeZone;
    use std::sync::Arc;

    fn sample_record() -> Record {
        let fields = Fields::new()
            .with_field("request_id", "abc-123")
            .with_field("latency_ms", 42);
        Record::new(Level::Info, "Request completed")
            .with_timestamp(chrono::Utc.with_ymd_and_hms(2025, 1, 8, 10, 30, 45).unwrap())
            .with_caller(Caller::new("/srv/app/src/handler.rs", 17).with_function("app::handler"))
            .with_fields(Arc::new(fields))
    }

    fn as_string(bytes: Vec<u8>) -> String {
        String::from_utf8(bytes).expect("utf-8 output")
    }

    #[test]
    fn test_text_format() {
        let encoder = Encoder::new(
            EncoderConfig::new(OutputFormat::Text).with_time_format(TimeFormat::Iso8601Utc),
        );
        let line = as_string(encoder.encode(&sample_record()));

        assert_eq!(
            line,
            "2025-01-08T10:30:45.000Z\t[INFO]\thandler.rs:17\tRequest completed\t{\"request_id\":\"abc-123\",\"latency_ms\":42}\n"
        );
    }

    #[test]
    fn test_text_format_full_caller_and_function() {
        let encoder = Encoder::new(
            EncoderConfig::new(OutputFormat::Text)
                .with_caller_style(CallerStyle::Full)
                .with_function(true),
        );
        let line = as_string(encoder.encode(&sample_record()));
        assert!(line.contains("\t/srv/app/src/handler.rs:17\tapp::handler\t"));
    }

    #[test]
    fn test_text_format_without_fields_or_caller() {
        let record = Record::new(Level::Warn, "plain");
        let line = as_string(Encoder::text().encode(&record));
        let columns: Vec<&str> = line.trim_end().split('\t').collect();
        assert_eq!(columns.len(), 3);
        assert_eq!(columns[1], "[WARN]");
        assert_eq!(columns[2], "plain");
    }

    #[test]
    fn test_text_format_appends_stack() {
        let record = Record::new(Level::Panic, "bad").with_stack("frame 0\nframe 1\n");
        let text = as_string(Encoder::text().encode(&record));
        assert!(text.ends_with("bad\nframe 0\nframe 1\n"));
    }

    #[test]
    fn test_text_format_escapes_control_characters() {
        let record = Record::new(Level::Info, "line one\nERROR forged\r\tend");
        let line = as_string(Encoder::text().encode(&record));
        assert_eq!(line.matches('\n').count(), 1);
        assert!(line.ends_with("\tline one\\nERROR forged\\r\\tend\n"));
    }

    #[test]
    fn test_json_keeps_message_verbatim() {
        let message = "line one\nline two\twith tab\r";
        let bytes = Encoder::json().encode(&Record::new(Level::Info, message));
        assert_eq!(bytes.iter().filter(|&&b| b == b'\n').count(), 1);

        let parsed: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(parsed[MESSAGE_KEY], message);
    }

    #[test]
    fn test_json_format() {
        let encoder = Encoder::new(EncoderConfig::new(OutputFormat::Json).with_function(true));
        let line = as_string(encoder.encode(&sample_record()));
        assert!(line.ends_with('\n'));

        let parsed: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(parsed[LEVEL_KEY], "info");
        assert_eq!(parsed[MESSAGE_KEY], "Request completed");
        assert_eq!(parsed[CALLER_KEY], "handler.rs:17");
        assert_eq!(parsed[FUNCTION_KEY], "app::handler");
        assert_eq!(parsed["request_id"], "abc-123");
        assert_eq!(parsed["latency_ms"], 42);
        assert!(parsed[TIME_KEY].is_string());
    }

    #[test]
    fn test_json_key_order() {
        let line = as_string(Encoder::json().encode(&sample_record()));
        let time = line.find("\"time\"").unwrap();
        let level = line.find("\"level\"").unwrap();
        let msg = line.find("\"msg\"").unwrap();
        let field = line.find("\"request_id\"").unwrap();
        assert!(time < level && level < msg && msg < field);
    }

    #[test]
    fn test_json_numeric_time() {
        let encoder = Encoder::new(
            EncoderConfig::new(OutputFormat::Json).with_time_format(TimeFormat::EpochNanos),
        );
        let parsed: serde_json::Value =
            serde_json::from_slice(&encoder.encode(&sample_record())).unwrap();
        assert_eq!(parsed[TIME_KEY].as_i64(), Some(1_736_332_245_000_000_000));
    }

    #[test]
    fn test_json_fields_cannot_shadow_fixed_keys() {
        let fields = Fields::new()
            .with_field("msg", "forged")
            .with_field("stack", "forged");
        let record = Record::new(Level::Error, "real")
            .with_fields(Arc::new(fields))
            .with_stack("trace");
        let parsed: serde_json::Value =
            serde_json::from_slice(&Encoder::json().encode(&record)).unwrap();
        assert_eq!(parsed[MESSAGE_KEY], "real");
        assert_eq!(parsed[STACK_KEY], "trace");
    }

    #[test]
    fn test_json_omits_function_when_disabled() {
        let parsed: serde_json::Value =
            serde_json::from_slice(&Encoder::json().encode(&sample_record())).unwrap();
        assert!(parsed.get(FUNCTION_KEY).is_none());
    }
}
