#![deny(
    missing_docs,
    unsafe_code,
    rustdoc::invalid_rust_codeblocks,
    rustdoc::broken_intra_doc_links,
    missing_copy_implementations,
    unused_doc_comments
)]

//! Standard panic-machinery host for the [`faultline`] pipeline.
//!
//! [`PanicHost`] implements [`HostRuntime`] over the process-wide panic
//! hook: registering a [`Catcher`] built on it routes every panic through
//! the handler chain as a thrown fault, and [`trigger`] raises promoted
//! runtime faults as panics so `catch_unwind`-style control flow still
//! observes them. A [`ShutdownGuard`] delivers the end-of-process
//! notification so buffered handler output is flushed on the way out.
//!
//! # Quick Example
//!
//! ```
//! use faultline::prelude::*;
//! use faultline_panic::PanicHost;
//!
//! let catcher = Catcher::new(PanicHost::default());
//! catcher.register();
//!
//! // Non-fatal severities dispatch straight through the chain.
//! faultline_panic::trigger(&catcher, Severity::UserNotice, "retrying transfer");
//! assert!(catcher.last_fault().is_some());
//!
//! catcher.unregister();
//! ```
//!
//! # Hook semantics
//!
//! The standard library runs the panic hook for every panic, including
//! ones later caught by [`std::panic::catch_unwind`]; Rust has no
//! uncaught-only channel. A catcher registered on this host therefore
//! reports caught panics too, the same trade-off every hook-based crash
//! reporter makes. Unregister the catcher around code that catches panics
//! as part of its normal operation if those reports are unwanted.
//!
//! Because exit arbitration happens inside the hook, a fatal dispatch
//! terminates the process before unwinding begins.

use std::{
    panic::{self, PanicHookInfo},
    process,
    sync::{
        Arc,
        atomic::{AtomicU16, Ordering},
    },
};

use faultline::{
    Catcher, Fault, RuntimeOutcome, Severity, SeverityFilter, SourceLocation,
    host::{FaultTarget, HostRuntime, UnhandledFatal},
};

/// Host runtime backed by the process-wide panic hook.
///
/// The reporting filter starts wide open;
/// [`set_filter`](PanicHost::set_filter) narrows it at runtime.
#[derive(Debug)]
pub struct PanicHost {
    filter: AtomicU16,
}

impl PanicHost {
    /// Builds a host whose reporting filter starts at `filter`.
    pub fn new(filter: SeverityFilter) -> Self {
        Self {
            filter: AtomicU16::new(filter.bits()),
        }
    }

    /// Replaces the reporting filter. Takes effect on the next
    /// notification.
    pub fn set_filter(&self, filter: SeverityFilter) {
        self.filter.store(filter.bits(), Ordering::Relaxed);
    }
}

impl Default for PanicHost {
    fn default() -> Self {
        Self::new(SeverityFilter::ALL)
    }
}

/// Opaque token for the panic hook that was installed before a catcher
/// registered. Handed back to the standard library on unregistration.
pub struct PreviousPanicHook {
    hook: Box<dyn Fn(&PanicHookInfo<'_>) + Sync + Send + 'static>,
}

impl HostRuntime for PanicHost {
    type Hooks = PreviousPanicHook;

    fn install_fault_hooks(&self, target: Arc<dyn FaultTarget>) -> Self::Hooks {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            target.thrown_fault(fault_from_panic(info));
        }));
        PreviousPanicHook { hook: previous }
    }

    fn restore_fault_hooks(&self, hooks: Self::Hooks) {
        panic::set_hook(hooks.hook);
    }

    fn severity_filter(&self) -> SeverityFilter {
        SeverityFilter::from_bits(self.filter.load(Ordering::Relaxed))
    }

    fn last_unhandled_fatal(&self) -> Option<UnhandledFatal> {
        None
    }

    fn exit(&self, status: i32) {
        process::exit(status);
    }
}

/// Normalizes a panic payload into a fault record.
///
/// A payload that already is a [`Fault`], as raised by a promotion in
/// [`trigger`], passes through unchanged, keeping its severity, origin,
/// and cause chain. String payloads become thrown faults typed `panic`.
fn fault_from_panic(info: &PanicHookInfo<'_>) -> Fault {
    let payload = info.payload();
    if let Some(fault) = payload.downcast_ref::<Fault>() {
        return fault.clone();
    }

    let message = if let Some(text) = payload.downcast_ref::<&'static str>() {
        (*text).to_owned()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "unprintable panic payload".to_owned()
    };

    let location = info
        .location()
        .map_or(SourceLocation::UNKNOWN, |location| {
            SourceLocation::new(location.file().to_owned(), location.line())
        });

    Fault::thrown("panic", message).location(location).build()
}

/// Reports a runtime fault through `catcher`, raising the promoted fault
/// as a panic when the active policy asks for one.
///
/// The panic payload is the [`Fault`] itself, so a registered hook
/// dispatches it with its severity and location intact, and `catch`-style
/// callers can downcast it.
///
/// # Examples
///
/// ```
/// use faultline::prelude::*;
/// use faultline_panic::PanicHost;
///
/// let catcher = Catcher::new(PanicHost::default());
/// catcher.set_promotion_policy(PromotionPolicy::Never);
/// faultline_panic::trigger(&catcher, Severity::Deprecation, "v1 endpoints go away soon");
/// ```
#[track_caller]
pub fn trigger<H: HostRuntime>(catcher: &Catcher<H>, severity: Severity, message: &str) {
    let location = SourceLocation::caller();
    match catcher.notify_runtime_fault(severity, message, location) {
        RuntimeOutcome::Promoted(fault) => panic::panic_any(fault),
        RuntimeOutcome::Ignored | RuntimeOutcome::Dispatched => {}
    }
}

/// Delivers the end-of-process notification when dropped.
///
/// Hold one for the lifetime of `main` so buffered handler output is
/// flushed on the way out and a host-recorded fatal, if any, is reported.
///
/// # Examples
///
/// ```
/// use faultline::prelude::*;
/// use faultline_panic::{PanicHost, ShutdownGuard};
///
/// let catcher = Catcher::new(PanicHost::default());
/// catcher.register();
/// let _shutdown = ShutdownGuard::new(catcher.clone());
/// ```
pub struct ShutdownGuard {
    target: Arc<dyn FaultTarget>,
}

impl ShutdownGuard {
    /// Wraps any fault target, typically a registered [`Catcher`].
    pub fn new(target: Arc<dyn FaultTarget>) -> Self {
        Self { target }
    }
}

impl Drop for ShutdownGuard {
    fn drop(&mut self) {
        self.target.shutdown();
    }
}
