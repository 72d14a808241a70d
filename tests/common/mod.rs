//! Test doubles shared by the integration suites.

// Each test binary compiles this module separately and uses a different
// subset of it.
#![allow(dead_code)]

use std::{
    io::Write,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use faultline::{
    BufferedEntry, Disposition, FaultReport, Handler, HandlerConfig, HandlerCore, Transport,
};

/// A byte buffer handlers write into, readable from the test afterwards.
pub type Sink = Arc<Mutex<Vec<u8>>>;

/// A configuration whose transport writes into the returned sink, with
/// timestamps disabled so assertions can match exact text.
pub fn sink_config() -> (HandlerConfig, Sink) {
    let sink: Sink = Arc::new(Mutex::new(Vec::new()));
    let writer: Arc<Mutex<dyn Write + Send>> = sink.clone();
    let config = HandlerConfig {
        output_time: false,
        transport: Transport::Writer(writer),
        ..HandlerConfig::default()
    };
    (config, sink)
}

/// Everything written to the sink so far, as text.
pub fn sink_text(sink: &Sink) -> String {
    String::from_utf8(sink.lock().unwrap().clone()).expect("handlers write UTF-8")
}

/// A chain probe: renders one line per fault and counts how often it is
/// asked to handle and to flush.
pub struct TestingHandler {
    core: HandlerCore,
    handled: AtomicUsize,
    flushed: AtomicUsize,
}

impl TestingHandler {
    pub fn new(config: HandlerConfig) -> Arc<Self> {
        Arc::new(Self {
            core: HandlerCore::new(config),
            handled: AtomicUsize::new(0),
            flushed: AtomicUsize::new(0),
        })
    }

    pub fn with_defaults() -> Arc<Self> {
        Self::new(HandlerConfig::default())
    }

    pub fn handled(&self) -> usize {
        self.handled.load(Ordering::SeqCst)
    }

    pub fn flushed(&self) -> usize {
        self.flushed.load(Ordering::SeqCst)
    }
}

impl Handler for TestingHandler {
    fn core(&self) -> &HandlerCore {
        &self.core
    }

    fn render(&self, entry: &BufferedEntry) -> String {
        let fault = &entry.fault;
        let name = match fault.error_type() {
            Some(label) => label,
            None => fault.type_name(),
        };
        format!("{name}: {}\n", fault.message())
    }

    fn handle(&self, report: &FaultReport) -> Disposition {
        self.handled.fetch_add(1, Ordering::SeqCst);
        let mut entry = self.core.admit(report);
        self.adjust(&mut entry);
        let disposition = entry.disposition;
        self.core.push_entry(entry);
        disposition
    }

    fn flush(&self) {
        self.flushed.fetch_add(1, Ordering::SeqCst);
        for entry in self.core.drain() {
            if entry.disposition.wants_log {
                let text = self.render_for_log(&entry);
                self.core.emit_log(&entry, &text);
            }
            if entry.disposition.output {
                let text = self.render(&entry);
                self.core.print(&text);
            }
        }
    }
}

/// Records captured by a [`CapturingLogger`], level and rendered text.
pub type LogRecords = Arc<Mutex<Vec<(log::Level, String)>>>;

/// A log sink that stores every record it receives.
pub struct CapturingLogger {
    records: LogRecords,
}

impl CapturingLogger {
    /// Returns the logger and a handle to the records it will capture.
    pub fn new() -> (Box<Self>, LogRecords) {
        let records: LogRecords = Arc::new(Mutex::new(Vec::new()));
        let logger = Box::new(Self {
            records: Arc::clone(&records),
        });
        (logger, records)
    }
}

impl log::Log for CapturingLogger {
    fn enabled(&self, _metadata: &log::Metadata<'_>) -> bool {
        true
    }

    fn log(&self, record: &log::Record<'_>) {
        self.records
            .lock()
            .unwrap()
            .push((record.level(), record.args().to_string()));
    }

    fn flush(&self) {}
}
