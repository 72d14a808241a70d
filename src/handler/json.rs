//! The bundled JSON sink.

use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;

use crate::{
    fault::Fault,
    frames::FrameEntry,
    handler::{
        BufferedEntry, ConfigError, Handler, HandlerConfig, HandlerCore, OptionError, OptionValue,
    },
};

/// Renders faults as one JSON object per report: the fault's identity
/// and location, the nested cause chain under `previous`, and optionally
/// the resolved frames and an RFC 3339 `time` stamp.
///
/// Output is pretty-printed by default; machine consumers can switch to
/// compact encoding with [`set_pretty_print`](JsonHandler::set_pretty_print)
/// or the `prettyPrint` option.
#[derive(Debug)]
pub struct JsonHandler {
    core: HandlerCore,
    pretty: AtomicBool,
}

/// The serialized shape of one fault. Only the newest fault carries
/// `frames` and `time`; nested causes are reduced to their identity.
#[derive(Serialize)]
struct Payload<'a> {
    class: &'a str,
    file: &'a str,
    line: u32,
    message: &'a str,
    #[serde(rename = "errorType", skip_serializing_if = "Option::is_none")]
    error_type: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    previous: Option<Box<Payload<'a>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    frames: Option<&'a [FrameEntry]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    time: Option<String>,
}

impl JsonHandler {
    /// Builds the sink from a validated configuration.
    pub fn new(config: HandlerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            core: HandlerCore::new(config),
            pretty: AtomicBool::new(true),
        })
    }

    /// Builds the sink with the common configuration defaults.
    pub fn with_defaults() -> Self {
        Self {
            core: HandlerCore::new(HandlerConfig::default()),
            pretty: AtomicBool::new(true),
        }
    }

    /// Whether output is pretty-printed.
    pub fn pretty_print(&self) -> bool {
        self.pretty.load(Ordering::Relaxed)
    }

    /// Switches between pretty-printed and compact encoding.
    pub fn set_pretty_print(&self, pretty: bool) {
        self.pretty.store(pretty, Ordering::Relaxed);
    }

    fn payload<'a>(&self, entry: &'a BufferedEntry, include_time: bool) -> Payload<'a> {
        fn base<'a>(fault: &'a Fault, previous: Option<Box<Payload<'a>>>) -> Payload<'a> {
            Payload {
                class: fault.type_name(),
                file: fault.location().file(),
                line: fault.location().line(),
                message: fault.message(),
                error_type: fault.error_type(),
                previous,
                frames: None,
                time: None,
            }
        }

        let mut chain: Vec<&Fault> = if self.core.with_config(|config| config.output_previous) {
            entry.fault.chain().collect()
        } else {
            vec![&entry.fault]
        };

        let newest = chain.remove(0);
        let mut previous = None;
        for fault in chain.into_iter().rev() {
            previous = Some(Box::new(base(fault, previous)));
        }

        let mut payload = base(newest, previous);
        payload.frames = entry.frames.as_deref();
        if include_time {
            payload.time = self.core.format_timestamp(entry.captured_at);
        }
        payload
    }

    fn encode(&self, payload: &Payload<'_>) -> String {
        let encoded = if self.pretty_print() {
            serde_json::to_string_pretty(payload)
        } else {
            serde_json::to_string(payload)
        };
        let mut text = encoded.unwrap_or_else(|error| {
            serde_json::json!({
                "class": "faultline::JsonHandler",
                "message": format!("report serialization failed: {error}"),
            })
            .to_string()
        });
        text.push('\n');
        text
    }
}

impl Default for JsonHandler {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl Handler for JsonHandler {
    fn core(&self) -> &HandlerCore {
        &self.core
    }

    fn content_type(&self) -> Option<&'static str> {
        Some("application/json")
    }

    /// Standard streams are read as they happen, so entries bound for
    /// them are flushed as soon as the dispatch leaves this handler.
    fn adjust(&self, entry: &mut BufferedEntry) {
        if self.core.uses_standard_stream() {
            entry.disposition.output_now = true;
        }
    }

    fn render(&self, entry: &BufferedEntry) -> String {
        self.encode(&self.payload(entry, true))
    }

    /// The logged object is the rendered one without `time`; log sinks
    /// stamp records themselves.
    fn render_for_log(&self, entry: &BufferedEntry) -> String {
        self.encode(&self.payload(entry, false))
    }

    fn set_extra_option(&self, name: &str, value: OptionValue) -> Result<(), OptionError> {
        match name {
            "prettyPrint" => match value {
                OptionValue::Bool(pretty) => {
                    self.set_pretty_print(pretty);
                    Ok(())
                }
                _ => Err(OptionError::WrongType {
                    name: name.to_owned(),
                    expected: "a boolean",
                }),
            },
            _ => Err(OptionError::Unknown {
                name: name.to_owned(),
            }),
        }
    }
}
