//! The host-runtime contract: how faults enter and leave the pipeline.
//!
//! A *host runtime* is whatever surrounds the process and observes
//! faults first: the standard panic machinery, an embedded interpreter,
//! a foreign runtime bridged over FFI. The pipeline never talks to any
//! of those directly; it sees a [`HostRuntime`] implementation, and the
//! host sees the orchestrator only as a [`FaultTarget`].

use std::sync::Arc;

use crate::{
    catcher::RuntimeOutcome,
    fault::{Fault, SourceLocation},
    severity::{Severity, SeverityFilter},
};

/// Receiver of fault notifications: the face the orchestrator shows to
/// host hooks.
pub trait FaultTarget: Send + Sync {
    /// Reports a runtime fault the host observed.
    ///
    /// The returned [`RuntimeOutcome`] tells the hook what to do next;
    /// in particular a promoted fault must be raised through the host's
    /// throw channel by the hook itself.
    fn runtime_fault(
        &self,
        severity: Severity,
        message: &str,
        location: SourceLocation,
    ) -> RuntimeOutcome;

    /// Reports a thrown fault nothing in the host caught.
    fn thrown_fault(&self, fault: Fault);

    /// Reports that the process has begun shutting down.
    fn shutdown(&self);
}

/// A fatal fault the host recorded outside the hook channels.
///
/// Some hosts observe their most severe faults in places hooks cannot
/// reach and only expose them as a "last error" record. The orchestrator
/// asks for it once, at shutdown.
#[derive(Clone, Debug)]
pub struct UnhandledFatal {
    /// The reported severity.
    pub severity: Severity,
    /// The fault message.
    pub message: String,
    /// Where it was raised.
    pub location: SourceLocation,
}

/// The contract a host runtime implements so an orchestrator can
/// register with it.
pub trait HostRuntime {
    /// Opaque token for the hooks that were installed before ours.
    type Hooks: Send;

    /// Routes the host's fault channels to `target`, returning whatever
    /// was installed before so it can be restored later.
    fn install_fault_hooks(&self, target: Arc<dyn FaultTarget>) -> Self::Hooks;

    /// Puts previously installed hooks back.
    fn restore_fault_hooks(&self, hooks: Self::Hooks);

    /// The severity codes the host currently wants reported. Consulted
    /// on every runtime-fault notification, so hosts can change it at
    /// any time.
    fn severity_filter(&self) -> SeverityFilter;

    /// The fatal fault the host recorded outside the hook channels, if
    /// any. Consulted once per shutdown.
    fn last_unhandled_fatal(&self) -> Option<UnhandledFatal>;

    /// Terminates the process with the given status.
    fn exit(&self, status: i32);
}

/// The null host: no hook channels, everything reportable, real process
/// exit.
///
/// For embedders that drive the orchestrator directly, feeding it
/// faults through explicit notify calls instead of host hooks.
///
/// # Examples
///
/// ```
/// use faultline::{Catcher, RuntimeOutcome, Severity, SourceLocation, host::InertHost};
///
/// let catcher = Catcher::new(InertHost::default());
/// let outcome = catcher.notify_runtime_fault(
///     Severity::UserNotice,
///     "cache rebuilt from scratch",
///     SourceLocation::caller(),
/// );
/// assert!(matches!(outcome, RuntimeOutcome::Dispatched));
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct InertHost {
    /// The reporting filter returned by
    /// [`severity_filter`](HostRuntime::severity_filter).
    pub filter: SeverityFilter,
}

impl HostRuntime for InertHost {
    type Hooks = ();

    fn install_fault_hooks(&self, _target: Arc<dyn FaultTarget>) -> Self::Hooks {}

    fn restore_fault_hooks(&self, _hooks: Self::Hooks) {}

    fn severity_filter(&self) -> SeverityFilter {
        self.filter
    }

    fn last_unhandled_fatal(&self) -> Option<UnhandledFatal> {
        None
    }

    fn exit(&self, status: i32) {
        std::process::exit(status);
    }
}
