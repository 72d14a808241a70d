#![deny(
    missing_docs,
    unsafe_code,
    rustdoc::invalid_rust_codeblocks,
    rustdoc::broken_intra_doc_links,
    missing_copy_implementations,
    unused_doc_comments
)]

//! A fault-capture and multi-sink reporting pipeline.
//!
//! ## Overview
//!
//! faultline intercepts the faults a host runtime observes — severity-
//! classified runtime errors and uncaught thrown faults — normalizes each
//! into an immutable [`Fault`] record carrying its causal chain, and routes
//! the resulting [`FaultReport`] through an ordered chain of output sinks.
//! Sinks implement the [`Handler`] trait and cooperate without knowing
//! about each other through a small control protocol, the [`Disposition`]:
//! any sink can stop the chain walk, demand that its output be emitted
//! before the next sink runs, ask for a log record, or force the process to
//! exit.
//!
//! The pipeline converts one fault into one or more rendered reports within
//! the lifetime of a single process. It is not a distributed tracing system
//! and persists nothing.
//!
//! ## Quick Example
//!
//! ```
//! use faultline::SourceLocation;
//! use faultline::prelude::*;
//!
//! let catcher = Catcher::new(InertHost::default());
//! catcher.set_promotion_policy(PromotionPolicy::Never);
//!
//! let outcome = catcher.notify_runtime_fault(
//!     Severity::UserWarning,
//!     "queue depth is above the high-water mark",
//!     SourceLocation::caller(),
//! );
//! assert!(matches!(outcome, RuntimeOutcome::Dispatched));
//! assert!(catcher.last_fault().is_some());
//! ```
//!
//! ## Core Concepts
//!
//! **Faults.** A [`Fault`] is either *runtime-reported* — carrying one of
//! the nine [`Severity`] codes, each mapping to a [`SeverityClass`] — or
//! *thrown*, with no severity code at all. Every fault records a message, a
//! [`SourceLocation`], a type name for display, and optionally the fault
//! that caused it; cause links form an acyclic chain from newest to oldest,
//! walkable via [`Fault::chain`]. Records are immutable once built and
//! cheap to clone.
//!
//! **The catcher.** The [`Catcher`] owns the handler chain and the
//! last-fault slot. It receives notifications through three entry points:
//! [`notify_runtime_fault`](Catcher::notify_runtime_fault) for non-thrown
//! runtime faults — subject to the host's [`SeverityFilter`] and to the
//! [`PromotionPolicy`], which can convert a runtime fault into a thrown one
//! so `catch`-style control flow still observes it —
//! [`notify_thrown_fault`](Catcher::notify_thrown_fault) for faults nothing
//! else caught, and [`notify_shutdown`](Catcher::notify_shutdown) at
//! end-of-process. Dispatch walks the chain in order, merges each returned
//! [`Disposition`] into a running aggregate, and afterwards arbitrates
//! process exit: a fault-triggered exit always reports `max(code, 1)`, so
//! status 0 keeps meaning a clean exit.
//!
//! **Frames.** Handlers that output backtraces see a merged view of the
//! whole causal chain: each fault's raw frames are repaired, stripped of
//! capture machinery, prefixed with a synthetic throw-site frame, and
//! concatenated with its cause's frames with the shared stack tail
//! deduplicated. Resolution happens once per fault and is cached; see the
//! [`frames`] module.
//!
//! **Hosts.** How faults are originally intercepted is host business. A
//! host implements [`HostRuntime`](host::HostRuntime), and the catcher
//! installs itself through it with [`register`](Catcher::register) and
//! takes itself back out with [`unregister`](Catcher::unregister). The
//! bundled [`InertHost`](host::InertHost) has no hook channels and suits
//! embedders that drive the catcher directly; the companion
//! `faultline-panic` crate adapts the standard panic machinery.
//!
//! ## Built-in handlers
//!
//! - [`PlainTextHandler`] — human-readable text with aligned stack traces,
//!   written to standard error by default.
//! - [`JsonHandler`] — a structured payload with nested `previous` records,
//!   suitable for machine ingestion.
//!
//! Both buffer their output: every handler in the chain observes a fault
//! before any one of them produces externally visible output, unless a
//! handler is configured to flush immediately. Custom sinks implement
//! [`Handler`] around a [`HandlerCore`], which supplies buffering,
//! configuration, and contained log emission.

mod catcher;
mod fault;
mod report;
mod severity;
mod util;

pub mod frames;
pub mod handler;
pub mod host;
pub mod prelude;

pub use self::{
    catcher::{Catcher, ChainError, PromotionPolicy, RuntimeOutcome},
    fault::{CauseChain, Fault, FaultBuilder, FaultKind, SourceLocation},
    handler::{
        BufferedEntry, ConfigError, Disposition, Handler, HandlerConfig, HandlerCore,
        JsonHandler, OptionError, OptionValue, PlainTextHandler, SharedHandler, TimeStyle,
        Transport,
    },
    report::FaultReport,
    severity::{Severity, SeverityClass, SeverityFilter},
};
