//! Rotating file sink
//!
//! Appends records to a file and archives it once it reaches a size limit.
//! Archives are numbered `name.1` (newest) through `name.N`, gzip-compressed
//! to `name.N.gz` when compression is enabled, and pruned by count and age.

use crate::core::{Level, LoggerError, Result, Sink};
use parking_lot::Mutex;
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

const BYTES_PER_MB: u64 = 1024 * 1024;
const SECONDS_PER_DAY: u64 = 24 * 60 * 60;
const GZ_SUFFIX: &str = ".gz";

/// When to rotate and what to keep
///
/// # Examples
///
/// ```
/// use rust_tee_logger::sinks::RotationPolicy;
///
/// let policy = RotationPolicy::new()
///     .with_max_size_mb(20)
///     .with_max_backups(15)
///     .with_max_age_days(15)
///     .with_compression(true);
///
/// assert_eq!(policy.max_bytes, 20 * 1024 * 1024);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotationPolicy {
    /// Size at which the active file is archived; 0 disables rotation
    pub max_bytes: u64,
    /// Archives to keep; 0 keeps all
    pub max_backups: usize,
    /// Maximum archive age in days; 0 disables age pruning
    pub max_age_days: u32,
    /// Whether to gzip archives
    pub compress: bool,
}

impl Default for RotationPolicy {
    fn default() -> Self {
        Self {
            max_bytes: 100 * BYTES_PER_MB,
            max_backups: 0,
            max_age_days: 0,
            compress: false,
        }
    }
}

impl RotationPolicy {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_max_size(mut self, bytes: u64) -> Self {
        self.max_bytes = bytes;
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_max_size_mb(mut self, megabytes: u64) -> Self {
        self.max_bytes = megabytes.saturating_mul(BYTES_PER_MB);
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_max_backups(mut self, count: usize) -> Self {
        self.max_backups = count;
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_max_age_days(mut self, days: u32) -> Self {
        self.max_age_days = days;
        self
    }

    #[must_use = "builder methods return a new value and do not modify the original"]
    pub fn with_compression(mut self, enabled: bool) -> Self {
        self.compress = enabled;
        self
    }

    fn max_age(&self) -> Option<Duration> {
        (self.max_age_days > 0)
            .then(|| Duration::from_secs(u64::from(self.max_age_days) * SECONDS_PER_DAY))
    }
}

struct FileState {
    file: Option<File>,
    current_size: u64,
    bytes_written: u64,
}

/// File sink with size-based rotation
///
/// Writes go straight to the file (no user-space buffer), one `write_all`
/// per record, under the sink's own lock. Rotation happens under the same
/// lock, so a record never straddles two files.
///
/// # Examples
///
/// ```no_run
/// use rust_tee_logger::sinks::{RotatingFileSink, RotationPolicy};
///
/// let policy = RotationPolicy::new().with_max_size_mb(20).with_compression(true);
/// let sink = RotatingFileSink::with_policy("./logs/log.log", policy).unwrap();
/// ```
pub struct RotatingFileSink {
    base_path: PathBuf,
    policy: RotationPolicy,
    state: Mutex<FileState>,
}

impl RotatingFileSink {
    /// Open (or create) `path` with the default policy
    ///
    /// # Errors
    ///
    /// Returns error if the directory or file cannot be created
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::with_policy(path, RotationPolicy::default())
    }

    /// Open (or create) `path` with a custom policy
    ///
    /// # Errors
    ///
    /// Returns error if the directory or file cannot be created
    pub fn with_policy<P: AsRef<Path>>(path: P, policy: RotationPolicy) -> Result<Self> {
        let base_path = path.as_ref().to_path_buf();

        if let Some(parent) = base_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                LoggerError::io_operation(
                    "create log directory",
                    format!("Failed to create directory '{}'", parent.display()),
                    e,
                )
            })?;
        }

        let (file, current_size) = open_append(&base_path)?;

        Ok(Self {
            base_path,
            policy,
            state: Mutex::new(FileState {
                file: Some(file),
                current_size,
                bytes_written: 0,
            }),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.base_path
    }

    #[must_use]
    pub fn policy(&self) -> &RotationPolicy {
        &self.policy
    }

    /// Size of the active file as tracked by the sink
    #[must_use]
    pub fn current_size(&self) -> u64 {
        self.state.lock().current_size
    }

    /// Total bytes written through this sink since it was opened
    #[must_use]
    pub fn bytes_written(&self) -> u64 {
        self.state.lock().bytes_written
    }

    /// Existing archives, newest first
    pub fn backups(&self) -> Vec<PathBuf> {
        self.list_backups().into_iter().map(|(_, path)| path).collect()
    }

    fn file_name(&self) -> String {
        self.base_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "log".to_string())
    }

    fn backup_path(&self, index: usize, compressed: bool) -> PathBuf {
        let suffix = if compressed { GZ_SUFFIX } else { "" };
        self.base_path
            .with_file_name(format!("{}.{}{}", self.file_name(), index, suffix))
    }

    /// Archives on disk as `(index, path)`, sorted by index
    fn list_backups(&self) -> Vec<(usize, PathBuf)> {
        let dir = match self.base_path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let prefix = format!("{}.", self.file_name());

        let mut backups: Vec<(usize, PathBuf)> = match fs::read_dir(&dir) {
            Ok(entries) => entries
                .filter_map(|entry| entry.ok())
                .filter_map(|entry| {
                    let name = entry.file_name().to_string_lossy().into_owned();
                    let rest = name.strip_prefix(&prefix)?;
                    let digits = rest.strip_suffix(GZ_SUFFIX).unwrap_or(rest);
                    let index = digits.parse::<usize>().ok()?;
                    Some((index, entry.path()))
                })
                .collect(),
            Err(_) => Vec::new(),
        };
        backups.sort_by_key(|(index, _)| *index);
        backups
    }

    fn should_rotate(&self, state: &FileState, incoming: u64) -> bool {
        self.policy.max_bytes > 0
            && state.current_size > 0
            && state.current_size.saturating_add(incoming) > self.policy.max_bytes
    }

    fn rotate(&self, state: &mut FileState) -> Result<()> {
        if let Some(file) = state.file.take() {
            file.sync_data().map_err(|e| {
                LoggerError::file_rotation(
                    self.base_path.display().to_string(),
                    format!("Failed to sync before rotation: {}", e),
                )
            })?;
        }

        // Shift from the highest index down so nothing is overwritten
        for (index, path) in self.list_backups().into_iter().rev() {
            let compressed = path.to_string_lossy().ends_with(GZ_SUFFIX);
            let target = self.backup_path(index + 1, compressed);
            fs::rename(&path, &target).map_err(|e| {
                LoggerError::file_rotation(
                    path.display().to_string(),
                    format!("Failed to shift backup file: {}", e),
                )
            })?;
        }

        let first_backup = self.backup_path(1, false);
        if self.base_path.exists() {
            fs::rename(&self.base_path, &first_backup).map_err(|e| {
                LoggerError::file_rotation(
                    self.base_path.display().to_string(),
                    format!("Failed to rotate current log file: {}", e),
                )
            })?;

            if self.policy.compress {
                if let Err(e) = compress_file(&first_backup, &self.backup_path(1, true)) {
                    eprintln!(
                        "[WARN] Failed to compress {}: {}. Keeping it uncompressed.",
                        first_backup.display(),
                        e
                    );
                }
            }
        }

        let (file, _) = open_append(&self.base_path).map_err(|e| {
            LoggerError::file_rotation(
                self.base_path.display().to_string(),
                format!("Failed to create new log file: {}", e),
            )
        })?;
        state.file = Some(file);
        state.current_size = 0;

        self.prune();
        Ok(())
    }

    /// Delete archives beyond the count limit or older than the age limit
    fn prune(&self) {
        let max_age = self.policy.max_age();
        let now = SystemTime::now();

        for (index, path) in self.list_backups() {
            let over_count = self.policy.max_backups > 0 && index > self.policy.max_backups;
            let too_old = max_age.is_some_and(|limit| {
                fs::metadata(&path)
                    .and_then(|m| m.modified())
                    .ok()
                    .and_then(|modified| now.duration_since(modified).ok())
                    .is_some_and(|age| age > limit)
            });

            if over_count || too_old {
                if let Err(e) = fs::remove_file(&path) {
                    eprintln!("[WARN] Failed to remove old backup {}: {}", path.display(), e);
                }
            }
        }
    }
}

impl Sink for RotatingFileSink {
    fn write(&self, _level: Level, bytes: &[u8]) -> Result<()> {
        let mut state = self.state.lock();
        let incoming = bytes.len() as u64;

        if self.should_rotate(&state, incoming) {
            if let Err(e) = self.rotate(&mut state) {
                eprintln!(
                    "[WARN] Log rotation failed: {}. Continuing with current file.",
                    e
                );

                if state.file.is_none() {
                    match open_append(&self.base_path) {
                        Ok((file, _)) => state.file = Some(file),
                        Err(reopen_err) => {
                            eprintln!(
                                "[ERROR] Failed to reopen log file after rotation failure: {}",
                                reopen_err
                            );
                            return Err(e);
                        }
                    }
                }

                // Let the file grow past the limit rather than retry every write
                state.current_size = 0;
            }
        }

        let file = state
            .file
            .as_mut()
            .ok_or_else(|| LoggerError::writer("File sink has no open file"))?;
        file.write_all(bytes).map_err(|e| {
            LoggerError::file_sink(
                self.base_path.display().to_string(),
                format!("Failed to write log record: {}", e),
            )
        })?;

        state.current_size += incoming;
        state.bytes_written += incoming;
        Ok(())
    }

    fn flush(&self) -> Result<()> {
        let mut state = self.state.lock();
        if let Some(file) = state.file.as_mut() {
            file.flush()
                .and_then(|()| file.sync_data())
                .map_err(|e| {
                    LoggerError::file_sink(
                        self.base_path.display().to_string(),
                        format!("Failed to sync: {}", e),
                    )
                })?;
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "rotating_file"
    }
}

fn open_append(path: &Path) -> Result<(File, u64)> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| {
            LoggerError::file_sink(path.display().to_string(), format!("Failed to open: {}", e))
        })?;
    let size = file
        .metadata()
        .map_err(|e| {
            LoggerError::file_sink(
                path.display().to_string(),
                format!("Cannot access file metadata: {}", e),
            )
        })?
        .len();
    Ok((file, size))
}

/// Gzip `source` into `target`, removing `source` only once `target` is
/// complete
fn compress_file(source: &Path, target: &Path) -> Result<()> {
    let mut temp_name = target.as_os_str().to_owned();
    temp_name.push(".tmp");
    let temp_path = PathBuf::from(temp_name);

    let result = (|| -> std::io::Result<()> {
        let mut reader = BufReader::with_capacity(64 * 1024, File::open(source)?);
        let output = BufWriter::with_capacity(64 * 1024, File::create(&temp_path)?);
        let mut encoder = flate2::write::GzEncoder::new(output, flate2::Compression::default());
        std::io::copy(&mut reader, &mut encoder)?;
        encoder.finish()?.flush()?;
        fs::rename(&temp_path, target)
    })();

    if let Err(e) = result {
        let _ = fs::remove_file(&temp_path);
        return Err(LoggerError::io_operation(
            "compress log file",
            format!("Failed to compress '{}'", source.display()),
            e,
        ));
    }

    if let Err(e) = fs::remove_file(source) {
        eprintln!(
            "[WARN] Compression succeeded but failed to remove original file {}: {}",
            source.display(),
            e
        );
    }
    Ok(())
}
