//! The orchestrator: handler-chain ownership, dispatch, and exit
//! arbitration.

use std::{
    cell::Cell,
    collections::VecDeque,
    panic::{AssertUnwindSafe, catch_unwind},
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
};

use crate::{
    fault::{Fault, SourceLocation},
    handler::{Disposition, OptionError, OptionValue, PlainTextHandler, SharedHandler},
    host::{FaultTarget, HostRuntime},
    report::FaultReport,
    severity::Severity,
    util::lock,
};

thread_local! {
    // Set while a dispatch runs on this thread. A fault raised by the
    // dispatch machinery itself must be deferred, never walked inline.
    static DISPATCHING: Cell<bool> = const { Cell::new(false) };
}

// Upper bound on faults the deferred queue will replay in one dispatch.
// A sink that faults every time it renders would otherwise feed the
// queue forever.
const MAX_DEFERRED_PASSES: usize = 8;

struct DispatchGuard;

impl DispatchGuard {
    fn enter() -> Option<Self> {
        DISPATCHING.with(|flag| {
            if flag.get() {
                None
            } else {
                flag.set(true);
                Some(DispatchGuard)
            }
        })
    }
}

impl Drop for DispatchGuard {
    fn drop(&mut self) {
        DISPATCHING.with(|flag| flag.set(false));
    }
}

/// When runtime faults are promoted into thrown faults instead of being
/// dispatched directly.
///
/// Promotion hands the fault back to the notifying hook as
/// [`RuntimeOutcome::Promoted`] so the host can raise it through its
/// ordinary throw channel, where `catch`-style control flow still sees
/// it. Masking always wins: a severity excluded by the host's reporting
/// filter is dropped before the policy is consulted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PromotionPolicy {
    /// Never promote; every reportable runtime fault is dispatched
    /// through the chain directly.
    Never,
    /// Promote only severities whose class is fatal.
    #[default]
    FatalOnly,
    /// Promote every reportable runtime fault.
    Always,
}

/// What [`Catcher::notify_runtime_fault`] did with the fault.
#[must_use = "a promoted fault must be raised through the host's throw channel"]
#[derive(Clone, Debug)]
pub enum RuntimeOutcome {
    /// The severity is masked by the host's reporting filter; the fault
    /// was dropped without constructing a record.
    Ignored,
    /// The fault was dispatched through the handler chain.
    Dispatched,
    /// The active [`PromotionPolicy`] turned the fault into a thrown
    /// fault, which the caller must now raise.
    Promoted(Fault),
}

/// Error raised by handler-chain mutations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ChainError {
    /// The mutation would have removed the last handler. The chain is
    /// never allowed to become empty.
    #[error("removing the last handler would leave the chain empty; at least one must remain")]
    Underflow,
    /// The mutation supplied no handlers.
    #[error("at least one handler must be supplied")]
    NoHandlers,
}

struct CatcherState<H: HostRuntime> {
    handlers: Vec<SharedHandler>,
    previous_hooks: Option<H::Hooks>,
    registered: bool,
    shutting_down: bool,
    last_fault: Option<Fault>,
}

/// The orchestrator: owns the handler chain and the last-fault slot,
/// receives fault notifications from the host runtime, walks the chain
/// under the [`Disposition`] protocol, and arbitrates process exit.
///
/// One fault is fully dispatched (all handlers invoked, all flushes
/// performed, termination decided) before the next is accepted; an
/// internal mutex serializes dispatches across threads. The one
/// tolerated re-entrancy is a fault raised by the dispatch machinery
/// itself on the dispatching thread: it disables handler logging for
/// the rest of the process and is replayed through the chain after the
/// current walk, never nested inside it.
///
/// Exit never uses status 0: a fault-triggered exit reports
/// `max(code, 1)` so a clean exit stays unambiguous.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use faultline::{Catcher, JsonHandler, RuntimeOutcome, Severity, SourceLocation};
/// use faultline::host::InertHost;
///
/// let catcher = Catcher::new(InertHost::default());
/// catcher.push_handlers([Arc::new(JsonHandler::with_defaults()) as _])?;
///
/// let outcome = catcher.notify_runtime_fault(
///     Severity::UserNotice,
///     "template cache is stale",
///     SourceLocation::caller(),
/// );
/// assert!(matches!(outcome, RuntimeOutcome::Dispatched));
/// assert_eq!(catcher.handlers().len(), 2);
/// # Ok::<(), faultline::ChainError>(())
/// ```
pub struct Catcher<H: HostRuntime> {
    host: H,
    prevent_exit: AtomicBool,
    policy: Mutex<PromotionPolicy>,
    state: Mutex<CatcherState<H>>,
    dispatch_gate: Mutex<()>,
    deferred: Mutex<VecDeque<Fault>>,
}

impl<H: HostRuntime> Catcher<H> {
    /// Builds an orchestrator over `host` with a single
    /// [`PlainTextHandler`] writing to standard error.
    ///
    /// The catcher does not install itself anywhere; call
    /// [`register`](Catcher::register) to take over the host's fault
    /// hooks.
    pub fn new(host: H) -> Arc<Self> {
        Self::build(host, vec![Arc::new(PlainTextHandler::with_defaults())])
    }

    /// Builds an orchestrator with an explicit starting chain.
    ///
    /// Fails with [`ChainError::NoHandlers`] when `handlers` is empty.
    /// Duplicate instances within the batch are collapsed, each with a
    /// reported usage warning.
    #[track_caller]
    pub fn with_handlers(
        host: H,
        handlers: impl IntoIterator<Item = SharedHandler>,
    ) -> Result<Arc<Self>, ChainError> {
        let location = SourceLocation::caller();
        let (unique, duplicates) = dedup_batch(handlers);
        if unique.is_empty() {
            return Err(ChainError::NoHandlers);
        }
        let catcher = Self::build(host, unique);
        catcher.report_duplicates(duplicates, location);
        Ok(catcher)
    }

    fn build(host: H, handlers: Vec<SharedHandler>) -> Arc<Self> {
        Arc::new(Self {
            host,
            prevent_exit: AtomicBool::new(false),
            policy: Mutex::new(PromotionPolicy::default()),
            state: Mutex::new(CatcherState {
                handlers,
                previous_hooks: None,
                registered: false,
                shutting_down: false,
                last_fault: None,
            }),
            dispatch_gate: Mutex::new(()),
            deferred: Mutex::new(VecDeque::new()),
        })
    }

    /// The host runtime this orchestrator is bound to.
    pub fn host(&self) -> &H {
        &self.host
    }

    /// Snapshot of the handler chain, in walk order.
    pub fn handlers(&self) -> Vec<SharedHandler> {
        lock(&self.state).handlers.clone()
    }

    /// The most recent fault to pass through this orchestrator, whether
    /// promoted or dispatched.
    pub fn last_fault(&self) -> Option<Fault> {
        lock(&self.state).last_fault.clone()
    }

    /// Whether this orchestrator currently owns the host's fault hooks.
    pub fn is_registered(&self) -> bool {
        lock(&self.state).registered
    }

    /// Whether shutdown has begun.
    pub fn is_shutting_down(&self) -> bool {
        lock(&self.state).shutting_down
    }

    /// The active promotion policy.
    pub fn promotion_policy(&self) -> PromotionPolicy {
        *lock(&self.policy)
    }

    /// Replaces the promotion policy.
    pub fn set_promotion_policy(&self, policy: PromotionPolicy) {
        *lock(&self.policy) = policy;
    }

    /// Whether exit arbitration is suppressed.
    pub fn prevents_exit(&self) -> bool {
        self.prevent_exit.load(Ordering::Relaxed)
    }

    /// Suppresses or restores process exit after fatal dispatches.
    /// Meant for tests and for embedders that manage process lifetime
    /// themselves.
    pub fn set_prevent_exit(&self, prevent: bool) {
        self.prevent_exit.store(prevent, Ordering::Relaxed);
    }

    /// Installs this orchestrator as the host's fault-notification
    /// target.
    ///
    /// Idempotent: returns `true` on a genuine transition and `false`
    /// when already registered. A fresh registration clears any
    /// shutdown state left by a previous cycle.
    pub fn register(self: &Arc<Self>) -> bool
    where
        H: Send + Sync + 'static,
    {
        let mut state = lock(&self.state);
        if state.registered {
            return false;
        }
        let target = Arc::clone(self) as Arc<dyn FaultTarget>;
        state.previous_hooks = Some(self.host.install_fault_hooks(target));
        state.registered = true;
        state.shutting_down = false;
        true
    }

    /// Restores whatever notification target preceded this
    /// orchestrator.
    ///
    /// Idempotent: returns `true` on a genuine transition and `false`
    /// when not registered.
    pub fn unregister(&self) -> bool {
        let mut state = lock(&self.state);
        if !state.registered {
            return false;
        }
        if let Some(hooks) = state.previous_hooks.take() {
            self.host.restore_fault_hooks(hooks);
        }
        state.registered = false;
        true
    }

    /// Appends handlers to the end of the chain.
    ///
    /// Fails with [`ChainError::NoHandlers`] when the batch is empty.
    /// A handler already present anywhere in the chain is skipped with
    /// a reported usage warning, not an error.
    #[track_caller]
    pub fn push_handlers(
        &self,
        handlers: impl IntoIterator<Item = SharedHandler>,
    ) -> Result<(), ChainError> {
        let location = SourceLocation::caller();
        let incoming: Vec<_> = handlers.into_iter().collect();
        if incoming.is_empty() {
            return Err(ChainError::NoHandlers);
        }
        let duplicates = {
            let mut state = lock(&self.state);
            let mut duplicates = 0;
            for handler in incoming {
                if contains_instance(&state.handlers, &handler) {
                    duplicates += 1;
                } else {
                    state.handlers.push(handler);
                }
            }
            duplicates
        };
        self.report_duplicates(duplicates, location);
        Ok(())
    }

    /// Inserts handlers at the front of the chain, preserving the
    /// batch's order.
    ///
    /// Same batch and duplicate rules as
    /// [`push_handlers`](Catcher::push_handlers).
    #[track_caller]
    pub fn unshift_handlers(
        &self,
        handlers: impl IntoIterator<Item = SharedHandler>,
    ) -> Result<(), ChainError> {
        let location = SourceLocation::caller();
        let incoming: Vec<_> = handlers.into_iter().collect();
        if incoming.is_empty() {
            return Err(ChainError::NoHandlers);
        }
        let duplicates = {
            let mut state = lock(&self.state);
            let mut duplicates = 0;
            let mut insert_at = 0;
            for handler in incoming {
                if contains_instance(&state.handlers, &handler) {
                    duplicates += 1;
                } else {
                    state.handlers.insert(insert_at, handler);
                    insert_at += 1;
                }
            }
            duplicates
        };
        self.report_duplicates(duplicates, location);
        Ok(())
    }

    /// Removes and returns the handler at the end of the chain.
    ///
    /// Fails with [`ChainError::Underflow`] when only one handler
    /// remains; the chain is left unchanged.
    pub fn pop_handler(&self) -> Result<SharedHandler, ChainError> {
        let mut state = lock(&self.state);
        if state.handlers.len() <= 1 {
            return Err(ChainError::Underflow);
        }
        state.handlers.pop().ok_or(ChainError::Underflow)
    }

    /// Removes and returns the handler at the front of the chain.
    ///
    /// Fails with [`ChainError::Underflow`] when only one handler
    /// remains; the chain is left unchanged.
    pub fn shift_handler(&self) -> Result<SharedHandler, ChainError> {
        let mut state = lock(&self.state);
        if state.handlers.len() <= 1 {
            return Err(ChainError::Underflow);
        }
        Ok(state.handlers.remove(0))
    }

    /// Replaces the whole chain.
    ///
    /// Fails with [`ChainError::NoHandlers`] when the replacement is
    /// empty. Duplicate instances within the replacement are collapsed,
    /// each with a reported usage warning.
    #[track_caller]
    pub fn set_handlers(
        &self,
        handlers: impl IntoIterator<Item = SharedHandler>,
    ) -> Result<(), ChainError> {
        let location = SourceLocation::caller();
        let (unique, duplicates) = dedup_batch(handlers);
        if unique.is_empty() {
            return Err(ChainError::NoHandlers);
        }
        lock(&self.state).handlers = unique;
        self.report_duplicates(duplicates, location);
        Ok(())
    }

    /// Applies a legacy `{name: value}` option bag to one handler.
    ///
    /// Unknown option names are skipped with a reported usage warning
    /// and mutate nothing; type and validation errors abort the
    /// remainder of the bag and are returned. New call sites should
    /// configure handlers through [`HandlerConfig`] instead.
    ///
    /// [`HandlerConfig`]: crate::handler::HandlerConfig
    #[track_caller]
    pub fn apply_handler_options<'a>(
        &self,
        handler: &SharedHandler,
        options: impl IntoIterator<Item = (&'a str, OptionValue)>,
    ) -> Result<(), OptionError> {
        let location = SourceLocation::caller();
        for (name, value) in options {
            match handler.set_option(name, value) {
                Ok(()) => {}
                Err(OptionError::Unknown { name }) => {
                    self.report_usage_warning(
                        &format!("unknown handler option {name:?}"),
                        location.clone(),
                    );
                }
                Err(error) => return Err(error),
            }
        }
        Ok(())
    }

    /// Host entry point for non-thrown runtime faults.
    ///
    /// A severity masked by the host's reporting filter is dropped
    /// before anything else, promotion included. Otherwise the fault is
    /// either promoted per the active [`PromotionPolicy`] and returned
    /// for the caller to raise, or dispatched through the chain.
    /// Promotion never applies while shutting down: there is no
    /// control flow left to observe a throw.
    pub fn notify_runtime_fault(
        &self,
        severity: Severity,
        message: &str,
        location: SourceLocation,
    ) -> RuntimeOutcome {
        if !self.host.severity_filter().contains(severity) {
            return RuntimeOutcome::Ignored;
        }

        let fault = Fault::runtime(severity, message).location(location).build();

        let promote = !lock(&self.state).shutting_down
            && match *lock(&self.policy) {
                PromotionPolicy::Never => false,
                PromotionPolicy::FatalOnly => severity.is_fatal(),
                PromotionPolicy::Always => true,
            };
        if promote {
            lock(&self.state).last_fault = Some(fault.clone());
            return RuntimeOutcome::Promoted(fault);
        }

        self.dispatch(FaultReport::new(fault));
        RuntimeOutcome::Dispatched
    }

    /// Host entry point for thrown faults nothing else caught. Always
    /// dispatches.
    pub fn notify_thrown_fault(&self, fault: Fault) {
        self.dispatch(FaultReport::new(fault));
    }

    /// Host entry point for end-of-process notification.
    ///
    /// No-op unless registered. Marks the orchestrator as shutting
    /// down, then asks the host for a fatal fault recorded outside the
    /// hook channels: if one exists and is reportable, it is dispatched
    /// now, frame capture elided; otherwise every handler is flushed so
    /// buffered output is not lost. Dispatches that happen while
    /// shutting down flush every handler but never terminate the
    /// process, so the host's own shutdown sequence runs to completion.
    pub fn notify_shutdown(&self) {
        {
            let mut state = lock(&self.state);
            if !state.registered {
                return;
            }
            state.shutting_down = true;
        }

        let pending = self.host.last_unhandled_fatal().filter(|fatal| {
            fatal.severity.is_fatal() && self.host.severity_filter().contains(fatal.severity)
        });

        match pending {
            Some(fatal) => {
                let fault = Fault::runtime(fatal.severity, fatal.message)
                    .location(fatal.location)
                    .raw_frames(Vec::new())
                    .build();
                self.dispatch(FaultReport::new(fault));
            }
            None => self.flush_all(),
        }
    }

    /// Flushes every handler's buffered output, containing any sink
    /// panic.
    pub fn flush_all(&self) {
        for handler in self.handlers() {
            let _ = catch_unwind(AssertUnwindSafe(|| handler.flush()));
        }
    }

    /// Routes one report through the chain, replays anything the walk
    /// deferred, then arbitrates exit.
    fn dispatch(&self, report: FaultReport) {
        let Some(_guard) = DispatchGuard::enter() else {
            // Raised by the dispatch machinery itself. Logging is the
            // recursive capability: shut it off for the rest of the
            // process and let the outer dispatch replay this fault.
            for handler in self.handlers() {
                handler.core().disable_logging();
            }
            lock(&self.deferred).push_back(report.into_fault());
            return;
        };

        let _serialized = lock(&self.dispatch_gate);

        let mut exit_status = self.dispatch_walk(&report);

        let mut replayed = 0;
        loop {
            let Some(fault) = lock(&self.deferred).pop_front() else {
                break;
            };
            replayed += 1;
            if replayed > MAX_DEFERRED_PASSES {
                lock(&self.deferred).clear();
                break;
            }
            let status = self.dispatch_walk(&FaultReport::new(fault));
            exit_status = exit_status.or(status);
        }

        if let Some(status) = exit_status
            && !self.prevent_exit.load(Ordering::Relaxed)
        {
            self.host.exit(status);
        }
    }

    /// One pass over the chain. Returns the exit status the pass
    /// requested, if any.
    fn dispatch_walk(&self, report: &FaultReport) -> Option<i32> {
        let (handlers, shutting_down) = {
            let state = lock(&self.state);
            (state.handlers.clone(), state.shutting_down)
        };

        let mut aggregate = Disposition::new();
        for handler in &handlers {
            let disposition = catch_unwind(AssertUnwindSafe(|| handler.handle(report)))
                .unwrap_or_else(|_| Disposition::new());

            if disposition.output_now && !shutting_down {
                let _ = catch_unwind(AssertUnwindSafe(|| handler.flush()));
            }

            aggregate = aggregate.merge(disposition);
            if !aggregate.bubbles || aggregate.force_exit {
                break;
            }
        }

        let terminal = aggregate.force_exit || report.fault().is_fatal() || shutting_down;
        let mut requested_exit = None;
        if terminal {
            for handler in &handlers {
                let _ = catch_unwind(AssertUnwindSafe(|| handler.flush()));
            }
            if !shutting_down {
                requested_exit = Some(report.fault().exit_status());
            }
        }

        lock(&self.state).last_fault = Some(report.fault().clone());
        requested_exit
    }

    fn report_duplicates(&self, count: usize, location: SourceLocation) {
        for _ in 0..count {
            self.report_usage_warning(
                "handler is already in the chain and was not added again",
                location.clone(),
            );
        }
    }

    /// Routes an API-misuse diagnostic through the pipeline itself.
    /// Dispatches directly: promoting a usage warning would turn a
    /// recoverable condition into control flow.
    fn report_usage_warning(&self, message: &str, location: SourceLocation) {
        if !self.host.severity_filter().contains(Severity::UserWarning) {
            return;
        }
        let fault = Fault::runtime(Severity::UserWarning, message)
            .location(location)
            .build();
        self.dispatch(FaultReport::new(fault));
    }
}

impl<H> FaultTarget for Catcher<H>
where
    H: HostRuntime + Send + Sync + 'static,
{
    fn runtime_fault(
        &self,
        severity: Severity,
        message: &str,
        location: SourceLocation,
    ) -> RuntimeOutcome {
        self.notify_runtime_fault(severity, message, location)
    }

    fn thrown_fault(&self, fault: Fault) {
        self.notify_thrown_fault(fault);
    }

    fn shutdown(&self) {
        self.notify_shutdown();
    }
}

fn dedup_batch(
    handlers: impl IntoIterator<Item = SharedHandler>,
) -> (Vec<SharedHandler>, usize) {
    let mut unique: Vec<SharedHandler> = Vec::new();
    let mut duplicates = 0;
    for handler in handlers {
        if contains_instance(&unique, &handler) {
            duplicates += 1;
        } else {
            unique.push(handler);
        }
    }
    (unique, duplicates)
}

fn contains_instance(chain: &[SharedHandler], handler: &SharedHandler) -> bool {
    chain.iter().any(|present| Arc::ptr_eq(present, handler))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{handler::JsonHandler, host::InertHost, severity::SeverityFilter};

    fn quiet_host() -> InertHost {
        InertHost {
            filter: SeverityFilter::NONE,
        }
    }

    #[test]
    fn default_policy_promotes_only_fatal() {
        assert_eq!(PromotionPolicy::default(), PromotionPolicy::FatalOnly);
    }

    #[test]
    fn new_catcher_has_one_plain_text_handler() {
        let catcher = Catcher::new(quiet_host());
        assert_eq!(catcher.handlers().len(), 1);
        assert!(!catcher.is_registered());
        assert!(catcher.last_fault().is_none());
    }

    #[test]
    fn with_handlers_rejects_empty_batch() {
        let result = Catcher::with_handlers(quiet_host(), []);
        assert_eq!(result.err(), Some(ChainError::NoHandlers));
    }

    #[test]
    fn pop_and_shift_refuse_to_empty_the_chain() {
        let catcher = Catcher::new(quiet_host());
        assert_eq!(catcher.pop_handler().err(), Some(ChainError::Underflow));
        assert_eq!(catcher.shift_handler().err(), Some(ChainError::Underflow));
        assert_eq!(catcher.handlers().len(), 1);
    }

    #[test]
    fn pop_returns_the_newest_handler() {
        let catcher = Catcher::new(quiet_host());
        let json: SharedHandler = Arc::new(JsonHandler::with_defaults());
        catcher.push_handlers([Arc::clone(&json)]).unwrap();

        let popped = catcher.pop_handler().unwrap();
        assert!(Arc::ptr_eq(&popped, &json));
        assert_eq!(catcher.handlers().len(), 1);
    }

    #[test]
    fn push_skips_handlers_already_in_the_chain() {
        let catcher = Catcher::new(quiet_host());
        let json: SharedHandler = Arc::new(JsonHandler::with_defaults());
        catcher.push_handlers([Arc::clone(&json)]).unwrap();
        catcher.push_handlers([Arc::clone(&json)]).unwrap();
        assert_eq!(catcher.handlers().len(), 2);
    }

    #[test]
    fn unshift_preserves_batch_order() {
        let catcher = Catcher::new(quiet_host());
        let first: SharedHandler = Arc::new(JsonHandler::with_defaults());
        let second: SharedHandler = Arc::new(JsonHandler::with_defaults());
        catcher
            .unshift_handlers([Arc::clone(&first), Arc::clone(&second)])
            .unwrap();

        let chain = catcher.handlers();
        assert_eq!(chain.len(), 3);
        assert!(Arc::ptr_eq(&chain[0], &first));
        assert!(Arc::ptr_eq(&chain[1], &second));
    }

    #[test]
    fn registration_is_idempotent() {
        let catcher = Catcher::new(quiet_host());
        assert!(catcher.register());
        assert!(!catcher.register());
        assert!(catcher.unregister());
        assert!(!catcher.unregister());
    }

    #[test]
    fn masked_severity_is_ignored() {
        let host = InertHost {
            filter: SeverityFilter::NONE.with(Severity::Warning),
        };
        let catcher = Catcher::new(host);
        let outcome = catcher.notify_runtime_fault(
            Severity::UserNotice,
            "nobody is listening",
            SourceLocation::caller(),
        );
        assert!(matches!(outcome, RuntimeOutcome::Ignored));
        assert!(catcher.last_fault().is_none());
    }

    #[test]
    fn fatal_runtime_fault_is_promoted_by_default() {
        let catcher = Catcher::new(InertHost::default());
        let outcome = catcher.notify_runtime_fault(
            Severity::Fatal,
            "allocator returned null",
            SourceLocation::caller(),
        );
        let RuntimeOutcome::Promoted(fault) = outcome else {
            panic!("fatal severity should promote under the default policy");
        };
        assert_eq!(fault.severity(), Some(Severity::Fatal));
        assert!(catcher.last_fault().is_some_and(|last| last.ptr_eq(&fault)));
    }

    #[test]
    fn always_policy_promotes_non_fatal_severities() {
        let catcher = Catcher::new(InertHost::default());
        catcher.set_promotion_policy(PromotionPolicy::Always);
        let outcome = catcher.notify_runtime_fault(
            Severity::UserNotice,
            "cache rebuilt",
            SourceLocation::caller(),
        );
        assert!(matches!(outcome, RuntimeOutcome::Promoted(_)));
    }

    #[test]
    fn never_policy_dispatches_everything() {
        let catcher = Catcher::new(InertHost::default());
        catcher.set_promotion_policy(PromotionPolicy::Never);
        catcher.set_prevent_exit(true);
        let outcome = catcher.notify_runtime_fault(
            Severity::UserWarning,
            "disk nearly full",
            SourceLocation::caller(),
        );
        assert!(matches!(outcome, RuntimeOutcome::Dispatched));
        assert!(
            catcher
                .last_fault()
                .is_some_and(|last| last.severity() == Some(Severity::UserWarning))
        );
    }

    #[test]
    fn chain_errors_render_for_humans() {
        assert_eq!(
            ChainError::Underflow.to_string(),
            "removing the last handler would leave the chain empty; at least one must remain"
        );
        assert_eq!(
            ChainError::NoHandlers.to_string(),
            "at least one handler must be supplied"
        );
    }

    #[test]
    fn catchers_cross_threads() {
        static_assertions::assert_impl_all!(Catcher<InertHost>: Send, Sync);
    }
}
