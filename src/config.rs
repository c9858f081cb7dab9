//! Logger configuration
//!
//! A flat option set, loadable from an INI-style file:
//!
//! ```text
//! ; comments start with '#' or ';'
//! [log]
//! level = info
//! fileLogger = true
//! logFileName = ./logs/app.log
//! errorFileEnable = true
//! ```
//!
//! Comment markers after whitespace end an unquoted value, as in
//! `maxSize = 50 ; megabytes`. Section headers are accepted and ignored. Keys are matched
//! case-insensitively; unknown keys are ignored. Keys that are absent keep
//! their [`Config::default`] value. A value that cannot be parsed as the
//! option's type is an error carrying the line number.

use crate::core::{
    CallerStyle, EncoderConfig, Field, Level, LoggerError, OutputFormat, Result, TimeFormat,
};
use crate::sinks::{RotationPolicy, SocketKind};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Option set used to build the standard sink topology
///
/// # Examples
///
/// ```
/// use rust_tee_logger::{Config, Level};
///
/// let config = Config::from_ini_str("level = warn\nconsoleLoggerJSON = true\n", "inline").unwrap();
/// assert_eq!(config.level, Level::Warn);
/// assert!(config.console_logger_json);
/// // Untouched options keep their defaults
/// assert_eq!(config.max_backups, 15);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Field name used for `service_name`
    pub service_key: String,
    /// Added to every record as `service_key = service_name` when non-empty
    pub service_name: String,
    /// Accepted for compatibility; has no effect
    pub custom_time_enable: bool,
    /// `seconds`, `milliseconds`, `nanoseconds`, `utc`, or empty for local time
    pub time_format: String,

    pub log_file_name: PathBuf,
    pub error_file_name: PathBuf,
    /// Megabytes before the active file is rotated
    pub max_size: u64,
    pub max_backups: usize,
    pub max_days: u32,
    pub compress: bool,

    /// Initial threshold of the dynamic gate
    pub level: Level,
    /// Records at or above this level carry a stack trace
    pub stacktrace_level: Level,
    /// Fixed threshold of the error-only file
    pub error_file_level: Level,

    pub short_caller: bool,
    pub function_enable: bool,

    pub socket_type: SocketKind,
    #[serde(rename = "socketIP")]
    pub socket_ip: String,
    pub socket_port: u16,
    pub socket_logger_enable: bool,
    #[serde(rename = "socketLoggerJSON")]
    pub socket_logger_json: bool,

    pub error_file_enable: bool,
    pub file_logger: bool,
    #[serde(rename = "fileLoggerJSON")]
    pub file_logger_json: bool,
    pub console_logger: bool,
    #[serde(rename = "consoleLoggerJSON")]
    pub console_logger_json: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_key: "service".to_string(),
            service_name: String::new(),
            custom_time_enable: false,
            time_format: String::new(),
            log_file_name: PathBuf::from("./logs/log.log"),
            error_file_name: PathBuf::from("./logs/error.log"),
            max_size: 20,
            max_backups: 15,
            max_days: 15,
            compress: true,
            level: Level::Debug,
            stacktrace_level: Level::Panic,
            error_file_level: Level::Error,
            short_caller: true,
            function_enable: false,
            socket_type: SocketKind::Udp,
            socket_ip: "127.0.0.1".to_string(),
            socket_port: 9990,
            socket_logger_enable: false,
            socket_logger_json: false,
            error_file_enable: false,
            file_logger: true,
            file_logger_json: false,
            console_logger: true,
            console_logger_json: false,
        }
    }
}

impl Config {
    /// Console-only configuration, nothing written to disk
    pub fn console_only() -> Self {
        Self {
            file_logger: false,
            ..Self::default()
        }
    }

    /// Parse INI-style text; `origin` names the source in error messages
    ///
    /// # Errors
    ///
    /// Returns [`LoggerError::ConfigParse`] for malformed lines and values
    pub fn from_ini_str(input: &str, origin: &str) -> Result<Self> {
        IniParser::new(input, origin).parse()
    }

    /// Read and parse an INI-style stream
    ///
    /// # Errors
    ///
    /// Returns [`LoggerError::ConfigRead`] if the stream fails or is not
    /// UTF-8, like [`Config::from_file`]
    pub fn from_reader<R: Read>(mut reader: R) -> Result<Self> {
        let mut input = String::new();
        reader
            .read_to_string(&mut input)
            .map_err(|e| LoggerError::config_read("<reader>", e))?;
        Self::from_ini_str(&input, "<reader>")
    }

    /// Read and parse an INI-style file
    ///
    /// # Errors
    ///
    /// Returns [`LoggerError::ConfigRead`] if the file cannot be read, or a
    /// parse error naming the file and line
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let input = fs::read_to_string(path).map_err(|e| LoggerError::config_read(path, e))?;
        Self::from_ini_str(&input, &path.display().to_string())
    }

    pub fn rotation_policy(&self) -> RotationPolicy {
        RotationPolicy::new()
            .with_max_size_mb(self.max_size)
            .with_max_backups(self.max_backups)
            .with_max_age_days(self.max_days)
            .with_compression(self.compress)
    }

    pub fn caller_style(&self) -> CallerStyle {
        if self.short_caller {
            CallerStyle::Short
        } else {
            CallerStyle::Full
        }
    }

    pub fn encoder_time_format(&self) -> TimeFormat {
        TimeFormat::from_name(&self.time_format)
    }

    /// Encoder settings shared by every route built from this config
    pub fn encoder_config(&self, format: OutputFormat) -> EncoderConfig {
        EncoderConfig::new(format)
            .with_time_format(self.encoder_time_format())
            .with_caller_style(self.caller_style())
            .with_function(self.function_enable)
    }

    /// `ip:port` of the socket collector
    pub fn socket_address(&self) -> String {
        if self.socket_ip.contains(':') && !self.socket_ip.starts_with('[') {
            format!("[{}]:{}", self.socket_ip, self.socket_port)
        } else {
            format!("{}:{}", self.socket_ip, self.socket_port)
        }
    }

    /// The service identification field, if a service name is set
    pub fn service_field(&self) -> Option<Field> {
        if self.service_name.is_empty() {
            return None;
        }
        let key = if self.service_key.is_empty() {
            "service"
        } else {
            self.service_key.as_str()
        };
        Some(Field::new(key, self.service_name.clone()))
    }
}

struct IniParser<'a> {
    input: &'a str,
    origin: &'a str,
    line_number: usize,
}

impl<'a> IniParser<'a> {
    fn new(input: &'a str, origin: &'a str) -> Self {
        Self {
            input,
            origin,
            line_number: 0,
        }
    }

    fn error(&self, message: impl Into<String>) -> LoggerError {
        LoggerError::config_parse(self.origin, self.line_number, message)
    }

    fn parse(&mut self) -> Result<Config> {
        let mut config = Config::default();
        let input = self.input;

        for line in input.lines() {
            self.line_number += 1;
            let trimmed = line.trim();

            if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with(';') {
                continue;
            }

            if trimmed.starts_with('[') {
                if !trimmed.ends_with(']') {
                    return Err(self.error("unterminated section header"));
                }
                continue;
            }

            let (key, value) = trimmed
                .split_once('=')
                .ok_or_else(|| self.error("expected 'key = value' format"))?;
            let key = key.trim();
            if key.is_empty() {
                return Err(self.error("missing key before '='"));
            }
            self.apply(&mut config, &key.to_ascii_lowercase(), clean_value(value))?;
        }

        Ok(config)
    }

    fn apply(&self, config: &mut Config, key: &str, value: &str) -> Result<()> {
        match key {
            "servicekey" => config.service_key = value.to_string(),
            "servicename" => config.service_name = value.to_string(),
            "customtimeenable" => config.custom_time_enable = self.parse_bool(value)?,
            "timeformat" => config.time_format = value.to_string(),
            "logfilename" => config.log_file_name = PathBuf::from(value),
            "errorfilename" => config.error_file_name = PathBuf::from(value),
            "maxsize" => config.max_size = self.parse_number(value, "maxSize")?,
            "maxbackups" => config.max_backups = self.parse_number(value, "maxBackups")?,
            "maxdays" => config.max_days = self.parse_number(value, "maxDays")?,
            "compress" => config.compress = self.parse_bool(value)?,
            "level" => config.level = self.parse_level(value)?,
            "stacktracelevel" => config.stacktrace_level = self.parse_level(value)?,
            "errorfilelevel" => config.error_file_level = self.parse_level(value)?,
            "shortcaller" => config.short_caller = self.parse_bool(value)?,
            "functionenable" => config.function_enable = self.parse_bool(value)?,
            "sockettype" => {
                config.socket_type = value
                    .parse::<SocketKind>()
                    .map_err(|e| self.error(e))?;
            }
            "socketip" => config.socket_ip = value.to_string(),
            "socketport" => config.socket_port = self.parse_number(value, "socketPort")?,
            "socketloggerenable" => config.socket_logger_enable = self.parse_bool(value)?,
            "socketloggerjson" => config.socket_logger_json = self.parse_bool(value)?,
            "errorfileenable" => config.error_file_enable = self.parse_bool(value)?,
            "filelogger" => config.file_logger = self.parse_bool(value)?,
            "fileloggerjson" => config.file_logger_json = self.parse_bool(value)?,
            "consolelogger" => config.console_logger = self.parse_bool(value)?,
            "consoleloggerjson" => config.console_logger_json = self.parse_bool(value)?,
            _ => {}
        }
        Ok(())
    }

    fn parse_bool(&self, value: &str) -> Result<bool> {
        match value.to_ascii_lowercase().as_str() {
            "yes" | "true" | "on" | "1" => Ok(true),
            "no" | "false" | "off" | "0" => Ok(false),
            _ => Err(self.error(format!("invalid boolean value '{}'", value))),
        }
    }

    fn parse_number<T: std::str::FromStr>(&self, value: &str, option: &str) -> Result<T> {
        value
            .parse()
            .map_err(|_| self.error(format!("invalid {} value '{}'", option, value)))
    }

    fn parse_level(&self, value: &str) -> Result<Level> {
        value.parse::<Level>().map_err(|e| self.error(e))
    }
}

/// Quoted values are taken as written between the quotes. Otherwise a
/// comment marker at the start, or one preceded by whitespace, ends the value.
fn clean_value(value: &str) -> &str {
    let value = value.trim();
    if let Some(rest) = value.strip_prefix('"') {
        if let Some(end) = rest.find('"') {
            return &rest[..end];
        }
    }
    if value.starts_with('#') || value.starts_with(';') {
        return "";
    }
    let comment = value
        .as_bytes()
        .windows(2)
        .position(|pair| pair[0].is_ascii_whitespace() && matches!(pair[1], b'#' | b';'));
    match comment {
        Some(at) => value[..at].trim_end(),
        None => value,
    }
}
