//! Commonly used items for convenient importing.
//!
//! The prelude re-exports the types and traits most call sites need, so a
//! single use statement covers building a catcher, shaping its handler
//! chain, and feeding it faults.
//!
//! # Usage
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use faultline::prelude::*;
//!
//! let handlers: Vec<SharedHandler> = vec![
//!     Arc::new(PlainTextHandler::with_defaults()),
//!     Arc::new(JsonHandler::with_defaults()),
//! ];
//! let catcher = Catcher::with_handlers(InertHost::default(), handlers)?;
//! assert_eq!(catcher.handlers().len(), 2);
//! # Ok::<(), ChainError>(())
//! ```
//!
//! # What's Included
//!
//! - **[`Catcher`]** with its [`PromotionPolicy`], [`RuntimeOutcome`], and
//!   [`ChainError`]
//! - **[`Fault`]** and the resolved [`FaultReport`] handed to sinks
//! - **[`Severity`]**, [`SeverityClass`], and [`SeverityFilter`]
//! - **[`Handler`]**, [`SharedHandler`], [`Disposition`], and
//!   [`HandlerConfig`], plus the built-in [`PlainTextHandler`] and
//!   [`JsonHandler`]
//! - **host plumbing**: [`HostRuntime`], [`FaultTarget`], and [`InertHost`]
//!
//! Less common items such as frame types and transports stay in their
//! modules and are imported directly when needed.

pub use crate::{
    Catcher, ChainError, Disposition, Fault, FaultReport, Handler, HandlerConfig, JsonHandler,
    PlainTextHandler, PromotionPolicy, RuntimeOutcome, Severity, SeverityClass, SeverityFilter,
    SharedHandler,
    host::{FaultTarget, HostRuntime, InertHost},
};
