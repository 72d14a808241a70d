//! The sink contract: dispositions, buffering, configuration, transports.
//!
//! Handlers are the pipeline's output sinks. Each one admits every fault
//! the orchestrator dispatches, buffers it, and renders the buffer when
//! flushed. What a handler tells the orchestrator about control flow is a
//! [`Disposition`]; how a handler behaves is fixed by a [`HandlerConfig`]
//! validated once at construction.
//!
//! The bundled sinks are [`PlainTextHandler`] and [`JsonHandler`]. Custom
//! sinks implement [`Handler`], which provides the whole buffering and
//! flushing protocol; only rendering is mandatory.

mod json;
mod plain;

pub use json::JsonHandler;
pub use plain::PlainTextHandler;

use std::{
    fmt,
    io::{self, Write},
    panic::{AssertUnwindSafe, catch_unwind},
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
};

use time::{
    OffsetDateTime,
    format_description::{self, BorrowedFormatItem, OwnedFormatItem, well_known::Rfc3339},
    macros::format_description,
};

use crate::{fault::Fault, frames::FrameEntry, report::FaultReport, severity::Severity, util::lock};

/// What one handler tells the orchestrator after admitting a fault.
///
/// Dispositions replace an older bit-flag control code with a closed set
/// of orthogonal booleans. The orchestrator folds the chain's verdicts
/// together with [`merge`](Disposition::merge).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Disposition {
    /// Keep walking the chain. `false` stops the walk after this handler.
    pub bubbles: bool,
    /// Terminate the process once the dispatch finishes, fatal or not.
    pub force_exit: bool,
    /// The entry should go to the handler's log sink on flush.
    pub wants_log: bool,
    /// The entry should go to the handler's transport on flush.
    pub output: bool,
    /// The handler wants to be flushed as soon as the walk leaves it.
    pub output_now: bool,
}

impl Disposition {
    /// The identity for [`merge`](Disposition::merge): bubbling on,
    /// nothing requested. Also what the orchestrator substitutes for a
    /// handler that panicked while admitting.
    pub const fn new() -> Self {
        Self {
            bubbles: true,
            force_exit: false,
            wants_log: false,
            output: false,
            output_now: false,
        }
    }

    /// Folds another handler's verdict into this one: bubbling must be
    /// unanimous, every other request is any-wins.
    pub const fn merge(self, other: Self) -> Self {
        Self {
            bubbles: self.bubbles && other.bubbles,
            force_exit: self.force_exit || other.force_exit,
            wants_log: self.wants_log || other.wants_log,
            output: self.output || other.output,
            output_now: self.output_now || other.output_now,
        }
    }
}

impl Default for Disposition {
    fn default() -> Self {
        Self::new()
    }
}

/// Where a handler writes rendered output.
#[derive(Clone, Default)]
pub enum Transport {
    /// The process's standard error stream. The default.
    #[default]
    Stderr,
    /// The process's standard output stream.
    Stdout,
    /// An injected writer, e.g. an HTTP response body or a capture buffer
    /// in tests. Write and flush errors are ignored; a failing transport
    /// must never raise inside the reporting pipeline.
    Writer(Arc<Mutex<dyn Write + Send>>),
}

impl Transport {
    /// Wraps an arbitrary writer.
    pub fn writer(writer: impl Write + Send + 'static) -> Self {
        Transport::Writer(Arc::new(Mutex::new(writer)))
    }

    /// Whether this transport is one of the process's standard streams.
    pub fn is_standard_stream(&self) -> bool {
        matches!(self, Transport::Stderr | Transport::Stdout)
    }

    fn write(&self, text: &str) {
        match self {
            Transport::Stderr => {
                let mut stream = io::stderr().lock();
                let _ = stream.write_all(text.as_bytes());
                let _ = stream.flush();
            }
            Transport::Stdout => {
                let mut stream = io::stdout().lock();
                let _ = stream.write_all(text.as_bytes());
                let _ = stream.flush();
            }
            Transport::Writer(writer) => {
                let mut writer = lock(writer);
                let _ = writer.write_all(text.as_bytes());
                let _ = writer.flush();
            }
        }
    }
}

impl fmt::Debug for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transport::Stderr => f.write_str("Stderr"),
            Transport::Stdout => f.write_str("Stdout"),
            Transport::Writer(_) => f.write_str("Writer(..)"),
        }
    }
}

/// How a handler renders timestamps.
#[derive(Clone, Debug)]
pub enum TimeStyle {
    /// RFC 3339, e.g. `2026-03-14T09:26:53.1Z`.
    Rfc3339,
    /// Bracketed wall-clock time, e.g. `[09:26:53]`.
    Clock,
    /// A custom format description, validated when built.
    Custom(OwnedFormatItem),
}

const CLOCK_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[[[hour]:[minute]:[second]]");

impl TimeStyle {
    /// Parses a custom [format description]. Fails with
    /// [`ConfigError::TimeFormat`] when the description is malformed.
    ///
    /// [format description]: https://time-rs.github.io/book/api/format-description.html
    pub fn custom(description: &str) -> Result<Self, ConfigError> {
        format_description::parse_owned::<2>(description)
            .map(TimeStyle::Custom)
            .map_err(|error| ConfigError::TimeFormat(error.to_string()))
    }

    fn format(&self, at: OffsetDateTime) -> Option<String> {
        match self {
            TimeStyle::Rfc3339 => at.format(&Rfc3339).ok(),
            TimeStyle::Clock => at.format(&CLOCK_FORMAT).ok(),
            TimeStyle::Custom(items) => at.format(items).ok(),
        }
    }
}

/// Error raised when a [`HandlerConfig`] fails validation.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// `httpStatus` outside 200 and the registered 4xx/5xx ranges.
    /// Clamping silently would hide a caller bug, so this is fatal at
    /// construction.
    #[error("handler option \"httpStatus\" can only be an HTTP 200, 4XX, or 5XX code, got {0}")]
    HttpStatus(i64),
    /// A negative `backtraceArgFrameLimit`.
    #[error("handler option \"backtraceArgFrameLimit\" cannot be less than 0, got {0}")]
    ArgFrameLimit(i64),
    /// An unparseable `timeFormat` description.
    #[error("unparseable time format: {0}")]
    TimeFormat(String),
}

/// The legal `httpStatus` values: 200 plus the registered 4xx and 5xx
/// codes, including the common CDN extensions.
fn http_status_valid(status: u16) -> bool {
    matches!(
        status,
        200 | 400..=418 | 421..=429 | 431 | 451 | 500..=511 | 520..=527 | 530
    )
}

/// Construction-time configuration shared by every handler.
///
/// Plain data: build one, adjust fields, hand it to a handler
/// constructor, which validates it once. After construction, behavior
/// changes go through [`Handler::set_option`] or
/// [`Handler::set_logger`], which re-apply the same validation.
pub struct HandlerConfig {
    /// Suppress transport output entirely.
    pub silent: bool,
    /// Flush this handler as soon as each dispatch leaves it.
    pub force_output_now: bool,
    /// Stop the chain walk after this handler.
    pub force_break: bool,
    /// Terminate the process after every dispatch, fatal or not.
    pub force_exit: bool,
    /// Resolve and attach stack frames to each admitted entry.
    pub output_backtrace: bool,
    /// Render the whole cause chain, not only the newest fault.
    pub output_previous: bool,
    /// Index of the first resolved frame whose captured arguments are
    /// dropped. Must not be negative.
    pub backtrace_arg_frame_limit: i64,
    /// Status for HTTP-context embedders; constrained to 200 and the
    /// registered 4xx/5xx codes.
    pub http_status: u16,
    /// Keep logging even when `silent` suppresses transport output.
    pub log_when_silent: bool,
    /// Prefix rendered output with the entry's timestamp.
    pub output_time: bool,
    /// How timestamps are rendered; `None` disables them entirely.
    pub time_format: Option<TimeStyle>,
    /// Where rendered output goes.
    pub transport: Transport,
    /// Log sink for entries whose disposition wants logging.
    pub logger: Option<Box<dyn log::Log>>,
}

impl HandlerConfig {
    /// Checks the constraints a handler enforces at construction.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !http_status_valid(self.http_status) {
            return Err(ConfigError::HttpStatus(i64::from(self.http_status)));
        }
        if self.backtrace_arg_frame_limit < 0 {
            return Err(ConfigError::ArgFrameLimit(self.backtrace_arg_frame_limit));
        }
        Ok(())
    }
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            silent: false,
            force_output_now: false,
            force_break: false,
            force_exit: false,
            output_backtrace: false,
            output_previous: true,
            backtrace_arg_frame_limit: 5,
            http_status: 500,
            log_when_silent: true,
            output_time: true,
            time_format: Some(TimeStyle::Rfc3339),
            transport: Transport::Stderr,
            logger: None,
        }
    }
}

impl fmt::Debug for HandlerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerConfig")
            .field("silent", &self.silent)
            .field("force_output_now", &self.force_output_now)
            .field("force_break", &self.force_break)
            .field("force_exit", &self.force_exit)
            .field("output_backtrace", &self.output_backtrace)
            .field("output_previous", &self.output_previous)
            .field("backtrace_arg_frame_limit", &self.backtrace_arg_frame_limit)
            .field("http_status", &self.http_status)
            .field("log_when_silent", &self.log_when_silent)
            .field("output_time", &self.output_time)
            .field("time_format", &self.time_format)
            .field("transport", &self.transport)
            .field("logger", &self.logger.is_some())
            .finish()
    }
}

/// A dynamically typed option value for [`Handler::set_option`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OptionValue {
    /// A boolean option.
    Bool(bool),
    /// An integer option.
    Int(i64),
    /// A string option.
    Str(String),
}

impl From<bool> for OptionValue {
    fn from(value: bool) -> Self {
        OptionValue::Bool(value)
    }
}

impl From<i64> for OptionValue {
    fn from(value: i64) -> Self {
        OptionValue::Int(value)
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        OptionValue::Str(value.to_owned())
    }
}

impl From<String> for OptionValue {
    fn from(value: String) -> Self {
        OptionValue::Str(value)
    }
}

/// Error raised by [`Handler::set_option`].
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum OptionError {
    /// The option name is not recognized by this handler. Recoverable;
    /// the orchestrator surfaces it as a usage warning when applying
    /// option bags.
    #[error("unknown handler option {name:?}")]
    Unknown {
        /// The rejected name.
        name: String,
    },
    /// The value's type does not fit the option.
    #[error("handler option {name:?} expects {expected}")]
    WrongType {
        /// The option name.
        name: String,
        /// What the option accepts.
        expected: &'static str,
    },
    /// The value failed the validation construction applies.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// One admitted fault waiting in a handler's buffer.
#[derive(Clone, Debug)]
pub struct BufferedEntry {
    /// The admitted fault.
    pub fault: Fault,
    /// When the pipeline received it.
    pub captured_at: OffsetDateTime,
    /// The verdict derived for it, possibly amended by
    /// [`Handler::adjust`].
    pub disposition: Disposition,
    /// Resolved frames, present when the handler outputs backtraces.
    pub frames: Option<Arc<[FrameEntry]>>,
}

/// The plumbing every handler embeds: validated configuration, the log
/// sink, and the output buffer.
pub struct HandlerCore {
    config: Mutex<HandlerConfig>,
    // The logger lives outside the config lock so it can be called, and
    // disabled re-entrantly, without holding any lock.
    logger: Mutex<Option<Box<dyn log::Log>>>,
    logging_disabled: AtomicBool,
    buffer: Mutex<Vec<BufferedEntry>>,
}

impl HandlerCore {
    /// Wraps an already validated configuration.
    pub fn new(mut config: HandlerConfig) -> Self {
        let logger = config.logger.take();
        Self {
            config: Mutex::new(config),
            logger: Mutex::new(logger),
            logging_disabled: AtomicBool::new(false),
            buffer: Mutex::new(Vec::new()),
        }
    }

    /// Reads the configuration under its lock.
    pub fn with_config<R>(&self, read: impl FnOnce(&HandlerConfig) -> R) -> R {
        read(&lock(&self.config))
    }

    /// Admits a report: derives the disposition from the configuration
    /// and resolves frames when backtrace output is enabled.
    pub fn admit(&self, report: &FaultReport) -> BufferedEntry {
        let (disposition, want_frames, limit) = {
            let config = lock(&self.config);
            let disposition = Disposition {
                bubbles: !config.force_break,
                force_exit: config.force_exit,
                wants_log: self.logging_active() && (!config.silent || config.log_when_silent),
                output: !config.silent,
                output_now: config.force_output_now,
            };
            (
                disposition,
                config.output_backtrace,
                config.backtrace_arg_frame_limit,
            )
        };

        // The limit was validated non-negative, so resolution cannot fail.
        let frames = want_frames
            .then(|| report.fault().frames(limit).ok())
            .flatten();

        BufferedEntry {
            fault: report.fault().clone(),
            captured_at: report.captured_at(),
            disposition,
            frames,
        }
    }

    /// Queues an admitted entry.
    pub fn push_entry(&self, entry: BufferedEntry) {
        lock(&self.buffer).push(entry);
    }

    /// Takes every buffered entry, leaving the buffer empty.
    pub fn drain(&self) -> Vec<BufferedEntry> {
        std::mem::take(&mut *lock(&self.buffer))
    }

    /// Number of entries currently buffered.
    pub fn buffered(&self) -> usize {
        lock(&self.buffer).len()
    }

    /// Whether the transport is one of the process's standard streams.
    pub fn uses_standard_stream(&self) -> bool {
        self.with_config(|config| config.transport.is_standard_stream())
    }

    /// Writes rendered text to the transport.
    pub fn print(&self, text: &str) {
        let transport = self.with_config(|config| config.transport.clone());
        transport.write(text);
    }

    /// Formats an entry timestamp per the configuration. `None` when
    /// timestamps are disabled or the moment cannot be formatted.
    pub fn format_timestamp(&self, at: OffsetDateTime) -> Option<String> {
        self.with_config(|config| {
            if !config.output_time {
                return None;
            }
            config.time_format.as_ref()?.format(at)
        })
    }

    /// Whether a log sink is installed and has not been disabled.
    pub fn logging_active(&self) -> bool {
        !self.logging_disabled.load(Ordering::Acquire) && lock(&self.logger).is_some()
    }

    /// Installs or removes the log sink, re-arming logging if it had
    /// been disabled.
    pub fn set_logger(&self, logger: Option<Box<dyn log::Log>>) {
        self.logging_disabled.store(false, Ordering::Release);
        *lock(&self.logger) = logger;
    }

    /// Permanently removes the log sink. The orchestrator calls this on
    /// every handler when logging machinery itself faults, which breaks
    /// the feedback loop a faulting logger would otherwise cause.
    pub fn disable_logging(&self) {
        self.logging_disabled.store(true, Ordering::Release);
        *lock(&self.logger) = None;
    }

    /// Sends one rendered entry to the log sink, if one is installed.
    ///
    /// The sink runs with no lock held and with panics contained: a
    /// panicking logger is dropped and logging stays disabled from then
    /// on.
    pub fn emit_log(&self, entry: &BufferedEntry, text: &str) {
        if self.logging_disabled.load(Ordering::Acquire) {
            return;
        }
        let Some(logger) = lock(&self.logger).take() else {
            return;
        };

        let level = entry
            .fault
            .severity()
            .map_or(log::Level::Error, Severity::log_level);
        let location = entry.fault.location();
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            logger.log(
                &log::Record::builder()
                    .args(format_args!("{text}"))
                    .level(level)
                    .target("faultline")
                    .file(Some(location.file()))
                    .line(Some(location.line()))
                    .build(),
            );
        }));

        if outcome.is_err() {
            self.logging_disabled.store(true, Ordering::Release);
            return;
        }
        if !self.logging_disabled.load(Ordering::Acquire) {
            *lock(&self.logger) = Some(logger);
        }
    }
}

impl fmt::Debug for HandlerCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerCore")
            .field("config", &*lock(&self.config))
            .field("buffered", &self.buffered())
            .finish_non_exhaustive()
    }
}

/// The sink contract.
///
/// A handler never writes during the chain walk: [`handle`](Handler::handle)
/// only admits the fault into the buffer and returns its
/// [`Disposition`]; rendering and writing happen in
/// [`flush`](Handler::flush), either immediately afterwards (when the
/// disposition says so) or at end of dispatch. Implementations provide
/// rendering; buffering, logging, and transport plumbing are provided.
pub trait Handler: Send + Sync {
    /// The embedded plumbing.
    fn core(&self) -> &HandlerCore;

    /// MIME content type of rendered output, for HTTP-context embedders.
    fn content_type(&self) -> Option<&'static str> {
        None
    }

    /// Hook invoked for each entry after admission, before buffering.
    /// The default leaves the entry untouched.
    fn adjust(&self, entry: &mut BufferedEntry) {
        let _ = entry;
    }

    /// Renders one entry for the transport.
    fn render(&self, entry: &BufferedEntry) -> String;

    /// Renders one entry for the log sink. Defaults to
    /// [`render`](Handler::render).
    fn render_for_log(&self, entry: &BufferedEntry) -> String {
        self.render(entry)
    }

    /// Admits a fault: derives the disposition from the configuration,
    /// lets [`adjust`](Handler::adjust) amend it, and buffers the entry.
    fn handle(&self, report: &FaultReport) -> Disposition {
        let mut entry = self.core().admit(report);
        self.adjust(&mut entry);
        let disposition = entry.disposition;
        self.core().push_entry(entry);
        disposition
    }

    /// Renders and releases every buffered entry: to the log sink if its
    /// disposition wants logging, to the transport if it wants output.
    /// Flushing an empty buffer is a no-op, so repeated flushes are safe.
    fn flush(&self) {
        for entry in self.core().drain() {
            if entry.disposition.wants_log {
                let text = self.render_for_log(&entry);
                self.core().emit_log(&entry, &text);
            }
            if entry.disposition.output {
                let text = self.render(&entry);
                self.core().print(&text);
            }
        }
    }

    /// Applies one legacy-style `{name: value}` option.
    ///
    /// This is the bridge for call sites still driven by dynamic option
    /// bags; typed construction through [`HandlerConfig`] is the primary
    /// API. Unknown names fail with [`OptionError::Unknown`] and leave
    /// state untouched.
    fn set_option(&self, name: &str, value: OptionValue) -> Result<(), OptionError> {
        if self.core().apply_common_option(name, &value)? {
            Ok(())
        } else {
            self.set_extra_option(name, value)
        }
    }

    /// Hook for options beyond the common set. The default recognizes
    /// nothing.
    fn set_extra_option(&self, name: &str, value: OptionValue) -> Result<(), OptionError> {
        let _ = value;
        Err(OptionError::Unknown {
            name: name.to_owned(),
        })
    }

    /// Installs or removes the log sink. Capability values cannot travel
    /// through [`OptionValue`], so this is the typed counterpart of the
    /// legacy `logger` option.
    fn set_logger(&self, logger: Option<Box<dyn log::Log>>) {
        self.core().set_logger(logger);
    }
}

/// A handler as the chain holds it. Chain identity is pointer identity
/// of this allocation.
pub type SharedHandler = Arc<dyn Handler>;

impl HandlerCore {
    /// Applies one option from the common set, validating exactly like
    /// construction does.
    ///
    /// Returns `Ok(false)` when the name is not in the common set, so
    /// callers can try handler-specific options next. The `logger`
    /// capability is deliberately absent: see [`Handler::set_logger`].
    pub fn apply_common_option(
        &self,
        name: &str,
        value: &OptionValue,
    ) -> Result<bool, OptionError> {
        fn as_bool(name: &str, value: &OptionValue) -> Result<bool, OptionError> {
            match value {
                OptionValue::Bool(value) => Ok(*value),
                _ => Err(OptionError::WrongType {
                    name: name.to_owned(),
                    expected: "a boolean",
                }),
            }
        }
        fn as_int(name: &str, value: &OptionValue) -> Result<i64, OptionError> {
            match value {
                OptionValue::Int(value) => Ok(*value),
                _ => Err(OptionError::WrongType {
                    name: name.to_owned(),
                    expected: "an integer",
                }),
            }
        }
        fn as_str<'v>(name: &str, value: &'v OptionValue) -> Result<&'v str, OptionError> {
            match value {
                OptionValue::Str(value) => Ok(value),
                _ => Err(OptionError::WrongType {
                    name: name.to_owned(),
                    expected: "a string",
                }),
            }
        }

        let mut config = lock(&self.config);
        match name {
            "silent" => config.silent = as_bool(name, value)?,
            "forceOutputNow" => config.force_output_now = as_bool(name, value)?,
            "forceBreak" => config.force_break = as_bool(name, value)?,
            "forceExit" => config.force_exit = as_bool(name, value)?,
            "outputBacktrace" => config.output_backtrace = as_bool(name, value)?,
            "outputPrevious" => config.output_previous = as_bool(name, value)?,
            "logWhenSilent" => config.log_when_silent = as_bool(name, value)?,
            "outputTime" => config.output_time = as_bool(name, value)?,
            "backtraceArgFrameLimit" => {
                let limit = as_int(name, value)?;
                if limit < 0 {
                    return Err(ConfigError::ArgFrameLimit(limit).into());
                }
                config.backtrace_arg_frame_limit = limit;
            }
            "httpStatus" => {
                let status = as_int(name, value)?;
                let valid = u16::try_from(status)
                    .ok()
                    .filter(|status| http_status_valid(*status));
                match valid {
                    Some(status) => config.http_status = status,
                    None => return Err(ConfigError::HttpStatus(status).into()),
                }
            }
            "timeFormat" => {
                let format = as_str(name, value)?;
                config.time_format = if format.is_empty() {
                    None
                } else {
                    Some(TimeStyle::custom(format)?)
                };
            }
            _ => return Ok(false),
        }
        Ok(true)
    }
}
