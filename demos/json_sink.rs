//! Machine-readable fault reports on standard output.
//!
//! This example demonstrates:
//! 1. Swapping the default chain for a [`JsonHandler`]
//! 2. Reconfiguring a live handler through an option bag
//! 3. Cause chains under the `previous` key
//!
//! # Running this Example
//!
//! ```bash
//! cargo run --example json-sink
//! ```

use std::sync::Arc;

use faultline::{
    Catcher, Fault, HandlerConfig, JsonHandler, OptionValue, PromotionPolicy, Severity,
    SourceLocation, Transport, host::InertHost,
};

fn main() {
    let handler = JsonHandler::new(HandlerConfig {
        transport: Transport::Stdout,
        output_backtrace: true,
        ..HandlerConfig::default()
    })
    .expect("configuration is valid");

    let catcher = Catcher::with_handlers(InertHost::default(), [Arc::new(handler) as _])
        .expect("chain is not empty");
    catcher.set_promotion_policy(PromotionPolicy::Never);
    catcher.set_prevent_exit(true);
    catcher.register();

    // Option bags address a handler that is already in the chain, the way a
    // configuration file would.
    let chain = catcher.handlers();
    catcher
        .apply_handler_options(&chain[0], [("prettyPrint", OptionValue::Bool(true))])
        .expect("prettyPrint is a JSON handler option");

    let _ = catcher.notify_runtime_fault(
        Severity::UserNotice,
        "cache rebuilt from scratch",
        SourceLocation::caller(),
    );

    let root = Fault::thrown("io::ReadError", "short read at offset 4096")
        .location(SourceLocation::new("src/blob.rs", 17))
        .build();
    catcher.notify_thrown_fault(
        Fault::thrown("store::BlobError", "blob index unreadable")
            .cause(root)
            .build(),
    );

    catcher.notify_shutdown();
}
