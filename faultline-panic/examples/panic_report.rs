//! Routes a warning and then a fatal fault through a panic-hook catcher.
//!
//! The warning is buffered; the fatal fault is promoted into a panic,
//! dispatched by the hook, and flushes both reports before the process
//! exits with the fault's severity code.

use faultline::prelude::*;
use faultline_panic::{PanicHost, ShutdownGuard};

fn main() {
    let catcher = Catcher::new(PanicHost::default());
    catcher.register();
    let _shutdown = ShutdownGuard::new(catcher.clone());

    faultline_panic::trigger(
        &catcher,
        Severity::UserWarning,
        "settings file missing, falling back to defaults",
    );

    faultline_panic::trigger(&catcher, Severity::UserFatal, "configuration is unreadable");
}
