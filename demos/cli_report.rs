//! Plain text fault reporting, driven explicitly.
//!
//! This example demonstrates:
//! 1. Building a catcher over [`InertHost`] and feeding it faults by hand
//! 2. Runtime faults with severities and thrown faults with cause chains
//! 3. Stack traces in the rendered report
//!
//! # Running this Example
//!
//! ```bash
//! cargo run --example cli-report
//! ```

use std::sync::Arc;

use faultline::{
    Catcher, Fault, HandlerConfig, PlainTextHandler, PromotionPolicy, Severity, SourceLocation,
    host::InertHost,
};

fn main() {
    // A plain text sink on standard error, with stack traces enabled.
    let handler = PlainTextHandler::new(HandlerConfig {
        output_backtrace: true,
        ..PlainTextHandler::default_config()
    })
    .expect("configuration is valid");

    let catcher = Catcher::with_handlers(InertHost::default(), [Arc::new(handler) as _])
        .expect("chain is not empty");
    // Report everything through the chain; this process manages its own
    // lifetime.
    catcher.set_promotion_policy(PromotionPolicy::Never);
    catcher.set_prevent_exit(true);
    catcher.register();

    // Non-fatal runtime faults are admitted and, because standard error is
    // read as it happens, flushed as soon as the dispatch finishes.
    let _ = catcher.notify_runtime_fault(
        Severity::UserWarning,
        "retry budget exhausted",
        SourceLocation::caller(),
    );

    // Thrown faults carry their own type name and an optional cause chain.
    let root = Fault::thrown("db::ConnectError", "connection refused")
        .location(SourceLocation::new("src/db.rs", 44))
        .build();
    let fault = Fault::thrown("db::PoolError", "no connection available")
        .cause(root)
        .build();
    catcher.notify_thrown_fault(fault);

    // End of process: anything still buffered is flushed now.
    catcher.notify_shutdown();
}
