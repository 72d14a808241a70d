//! The bundled plain text sink.

use std::fmt::Write as _;

use crate::{
    fault::Fault,
    frames::FrameEntry,
    handler::{BufferedEntry, ConfigError, Handler, HandlerConfig, HandlerCore, TimeStyle},
};

/// Renders faults as plain text: one line per fault in the cause chain,
/// optionally followed by the numbered stack trace and prefixed with a
/// bracketed wall-clock timestamp.
///
/// ```text
/// [09:26:53]  Warning (user): retry budget exhausted in file src/job.rs on line 81
///             ↳ db::ConnectError: connection refused in file src/db.rs on line 44
/// ```
///
/// This is the sink every orchestrator starts with.
#[derive(Debug)]
pub struct PlainTextHandler {
    core: HandlerCore,
}

impl PlainTextHandler {
    /// Builds the sink from a validated configuration.
    pub fn new(config: HandlerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            core: HandlerCore::new(config),
        })
    }

    /// Builds the sink with [`default_config`](Self::default_config).
    pub fn with_defaults() -> Self {
        Self {
            core: HandlerCore::new(Self::default_config()),
        }
    }

    /// The default plain text configuration: the common defaults with
    /// bracketed wall-clock timestamps.
    pub fn default_config() -> HandlerConfig {
        HandlerConfig {
            time_format: Some(TimeStyle::Clock),
            ..HandlerConfig::default()
        }
    }

    fn body(&self, entry: &BufferedEntry) -> String {
        let mut output = fault_line(&entry.fault);

        if self.core.with_config(|config| config.output_previous) {
            for (depth, cause) in entry.fault.chain().skip(1).enumerate() {
                if depth > 0 {
                    output.push_str("  ");
                }
                output.push_str("↳ ");
                output.push_str(&fault_line(cause));
            }
        }

        if let Some(frames) = &entry.frames
            && !frames.is_empty()
        {
            output.push('\n');
            output.push_str("Stack trace:\n");
            let max_digits = frames.len().to_string().len();
            let indent = " ".repeat(max_digits);
            for (index, frame) in frames.iter().enumerate() {
                let _ = writeln!(
                    output,
                    "{:>max_digits$}. {}  {}:{}",
                    index + 1,
                    frame_method(frame),
                    frame.file,
                    frame.line,
                );
                if let Some(arguments) = &frame.arguments
                    && !arguments.is_empty()
                {
                    output.push_str(&argument_block(arguments, &indent));
                }
            }
            output.truncate(output.trim_end().len());
            output.push('\n');
        }

        output
    }
}

impl Default for PlainTextHandler {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl Handler for PlainTextHandler {
    fn core(&self) -> &HandlerCore {
        &self.core
    }

    fn content_type(&self) -> Option<&'static str> {
        Some("text/plain; charset=UTF-8")
    }

    /// Standard streams are read as they happen, so entries bound for
    /// them are flushed as soon as the dispatch leaves this handler.
    fn adjust(&self, entry: &mut BufferedEntry) {
        if self.core.uses_standard_stream() {
            entry.disposition.output_now = true;
        }
    }

    fn render(&self, entry: &BufferedEntry) -> String {
        let body = self.body(entry);
        match self.core.format_timestamp(entry.captured_at) {
            Some(stamp) => prefix_with_timestamp(&stamp, &body),
            None => body,
        }
    }

    /// The log line is the body without the timestamp prefix; log sinks
    /// stamp records themselves.
    fn render_for_log(&self, entry: &BufferedEntry) -> String {
        self.body(entry)
    }
}

fn fault_line(fault: &Fault) -> String {
    let name = match fault.error_type() {
        Some(label) => label,
        None => fault.type_name(),
    };
    format!(
        "{name}: {} in file {} on line {}\n",
        fault.message(),
        fault.location().file(),
        fault.location().line(),
    )
}

/// The method column of one stack trace line. Synthetic throw-site
/// frames of runtime faults show the severity label with the type name
/// in parentheses.
fn frame_method(frame: &FrameEntry) -> String {
    if let Some(qualifier) = &frame.qualifier {
        if let Some(severity) = frame.severity {
            return format!("{} ({qualifier})", severity.label());
        }
        return match &frame.callable {
            Some(callable) => format!("{qualifier}::{callable}"),
            None => qualifier.clone(),
        };
    }
    frame.callable.clone().unwrap_or_default()
}

/// Renders one frame's arguments as a parenthesized listing, each line
/// gutter-aligned under the frame numbers.
fn argument_block(arguments: &[String], indent: &str) -> String {
    let mut listing = String::from("(\n");
    for (index, argument) in arguments.iter().enumerate() {
        listing.push_str("    ");
        listing.push_str(argument);
        if index + 1 < arguments.len() {
            listing.push(',');
        }
        listing.push('\n');
    }
    listing.push(')');

    let mut block = String::new();
    for line in listing.lines() {
        block.push_str(indent);
        block.push_str("| ");
        block.push_str(line);
        block.push('\n');
    }
    block
}

/// Prefixes the first line of `body` with the timestamp and indents the
/// remaining lines to keep the text aligned under it.
fn prefix_with_timestamp(stamp: &str, body: &str) -> String {
    let prefix = format!("{stamp}  ");
    let pad = " ".repeat(prefix.len());
    let mut output = String::new();
    for (index, line) in body.lines().enumerate() {
        output.push_str(if index == 0 { &prefix } else { &pad });
        output.push_str(line);
        output.push('\n');
    }
    output
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use time::macros::datetime;

    use super::*;
    use crate::{fault::SourceLocation, handler::Disposition, severity::Severity};

    fn entry_for(fault: Fault) -> BufferedEntry {
        BufferedEntry {
            fault,
            captured_at: datetime!(2026-03-14 09:26:53 UTC),
            disposition: Disposition::new(),
            frames: None,
        }
    }

    fn handler_without_timestamps() -> PlainTextHandler {
        PlainTextHandler::new(HandlerConfig {
            output_time: false,
            ..HandlerConfig::default()
        })
        .expect("config is valid")
    }

    fn located(file: &'static str, line: u32) -> SourceLocation {
        SourceLocation::new(file, line)
    }

    #[test]
    fn runtime_faults_render_their_label() {
        let fault = Fault::runtime(Severity::UserWarning, "retry budget exhausted")
            .location(located("src/job.rs", 81))
            .raw_frames(Vec::new())
            .build();

        let text = handler_without_timestamps().render(&entry_for(fault));
        assert_eq!(
            text,
            "Warning (user): retry budget exhausted in file src/job.rs on line 81\n"
        );
    }

    #[test]
    fn thrown_faults_render_their_type_name() {
        let fault = Fault::thrown("db::ConnectError", "connection refused")
            .location(located("src/db.rs", 44))
            .raw_frames(Vec::new())
            .build();

        let text = handler_without_timestamps().render(&entry_for(fault));
        assert_eq!(
            text,
            "db::ConnectError: connection refused in file src/db.rs on line 44\n"
        );
    }

    #[test]
    fn cause_chain_renders_with_arrows() {
        let root = Fault::thrown("db::ConnectError", "connection refused")
            .location(located("src/db.rs", 44))
            .raw_frames(Vec::new())
            .build();
        let middle = Fault::thrown("db::PoolError", "pool exhausted")
            .location(located("src/pool.rs", 120))
            .raw_frames(Vec::new())
            .cause(root)
            .build();
        let fault = Fault::runtime(Severity::UserWarning, "retry budget exhausted")
            .location(located("src/job.rs", 81))
            .raw_frames(Vec::new())
            .cause(middle)
            .build();

        let text = handler_without_timestamps().render(&entry_for(fault));
        assert_eq!(
            text,
            "Warning (user): retry budget exhausted in file src/job.rs on line 81\n\
             ↳ db::PoolError: pool exhausted in file src/pool.rs on line 120\n\
             \x20 ↳ db::ConnectError: connection refused in file src/db.rs on line 44\n"
        );
    }

    #[test]
    fn cause_chain_can_be_suppressed() {
        let root = Fault::thrown("E", "inner").raw_frames(Vec::new()).build();
        let fault = Fault::thrown("F", "outer")
            .location(located("src/f.rs", 1))
            .raw_frames(Vec::new())
            .cause(root)
            .build();

        let handler = PlainTextHandler::new(HandlerConfig {
            output_time: false,
            output_previous: false,
            ..HandlerConfig::default()
        })
        .expect("config is valid");
        let text = handler.render(&entry_for(fault));
        assert_eq!(text, "F: outer in file src/f.rs on line 1\n");
    }

    #[test]
    fn stack_trace_lines_are_aligned_and_numbered() {
        let fault = Fault::thrown("app::Error", "boom")
            .location(located("src/app.rs", 7))
            .raw_frames(Vec::new())
            .build();

        let mut entry = entry_for(fault);
        let frames: Vec<FrameEntry> = (0..10)
            .map(|index| FrameEntry {
                file: "src/lib.rs".to_owned(),
                line: index + 1,
                qualifier: Some("app".to_owned()),
                callable: Some("step".to_owned()),
                arguments: None,
                severity: None,
            })
            .collect();
        entry.frames = Some(Arc::from(frames));

        let text = handler_without_timestamps().render(&entry);
        assert!(text.contains("\nStack trace:\n"), "{text}");
        assert!(text.contains(" 1. app::step  src/lib.rs:1\n"), "{text}");
        assert!(text.contains("10. app::step  src/lib.rs:10\n"), "{text}");
        assert!(text.ends_with("src/lib.rs:10\n"), "{text}");
    }

    #[test]
    fn synthetic_frames_show_severity_and_arguments() {
        let fault = Fault::runtime(Severity::Fatal, "boom")
            .location(located("src/app.rs", 7))
            .raw_frames(Vec::new())
            .build();

        let mut entry = entry_for(fault.clone());
        entry.frames = Some(fault.frames(i64::MAX).expect("limit is valid"));

        let text = handler_without_timestamps().render(&entry);
        assert!(
            text.contains("1. Fatal error (faultline::Fault)  src/app.rs:7\n"),
            "{text}"
        );
        assert!(text.contains("| (\n"), "{text}");
        assert!(text.contains("|     boom\n"), "{text}");
        assert!(text.contains("| )\n"), "{text}");
    }

    #[test]
    fn timestamp_prefixes_and_aligns_every_line() {
        let root = Fault::thrown("E", "inner")
            .location(located("src/e.rs", 2))
            .raw_frames(Vec::new())
            .build();
        let fault = Fault::thrown("F", "outer")
            .location(located("src/f.rs", 1))
            .raw_frames(Vec::new())
            .cause(root)
            .build();

        let handler = PlainTextHandler::with_defaults();
        let text = handler.render(&entry_for(fault));
        assert_eq!(
            text,
            "[09:26:53]  F: outer in file src/f.rs on line 1\n\
             \x20           ↳ E: inner in file src/e.rs on line 2\n"
        );
    }

    #[test]
    fn log_rendering_has_no_timestamp() {
        let fault = Fault::thrown("F", "outer")
            .location(located("src/f.rs", 1))
            .raw_frames(Vec::new())
            .build();

        let handler = PlainTextHandler::with_defaults();
        let text = handler.render_for_log(&entry_for(fault));
        assert_eq!(text, "F: outer in file src/f.rs on line 1\n");
    }

    #[test]
    fn frame_method_variants() {
        let mut frame = FrameEntry {
            file: "src/a.rs".to_owned(),
            line: 1,
            qualifier: Some("app::Worker".to_owned()),
            callable: Some("run".to_owned()),
            arguments: None,
            severity: None,
        };
        assert_eq!(frame_method(&frame), "app::Worker::run");

        frame.callable = None;
        assert_eq!(frame_method(&frame), "app::Worker");

        frame.severity = Some(Severity::UserNotice);
        assert_eq!(frame_method(&frame), "Notice (user) (app::Worker)");

        frame.qualifier = None;
        frame.severity = None;
        frame.callable = Some("main".to_owned());
        assert_eq!(frame_method(&frame), "main");

        frame.callable = None;
        assert_eq!(frame_method(&frame), "");
    }
}
