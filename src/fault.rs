//! The immutable fault record and its causal chain.

use std::{
    borrow::Cow,
    fmt,
    panic::Location,
    sync::{Arc, OnceLock},
};

use crate::{
    frames::{self, CapturedStack, FrameEntry, RangeError, RawFrame, StackSource},
    severity::{Severity, SeverityClass},
};

/// Type name given to runtime faults, which have no throwing type of
/// their own.
const RUNTIME_TYPE_NAME: &str = "faultline::Fault";

/// A source position a fault was raised at.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SourceLocation {
    file: Cow<'static, str>,
    line: u32,
}

impl SourceLocation {
    /// The sentinel location of faults whose origin the host could not
    /// determine.
    pub const UNKNOWN: Self = Self {
        file: Cow::Borrowed("[UNKNOWN]"),
        line: 0,
    };

    /// Builds a location from explicit coordinates.
    pub fn new(file: impl Into<Cow<'static, str>>, line: u32) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }

    /// The location of the caller of the surrounding function.
    #[track_caller]
    pub fn caller() -> Self {
        let location = Location::caller();
        Self {
            file: Cow::Borrowed(location.file()),
            line: location.line(),
        }
    }

    /// The source file.
    pub fn file(&self) -> &str {
        &self.file
    }

    /// The line number, `0` when unknown.
    pub fn line(&self) -> u32 {
        self.line
    }
}

/// What kind of fault a record describes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FaultKind {
    /// A runtime fault reported by the host with a severity code.
    Runtime(Severity),
    /// A thrown error that nothing caught. Always process-fatal.
    Thrown,
}

enum Stack {
    Supplied(Vec<RawFrame>),
    Source(Box<dyn StackSource>),
}

struct FaultInner {
    kind: FaultKind,
    type_name: Cow<'static, str>,
    message: String,
    location: SourceLocation,
    cause: Option<Fault>,
    stack: Stack,
    frames: OnceLock<Arc<[FrameEntry]>>,
}

/// One captured fault: a runtime diagnostic or an uncaught thrown error.
///
/// A `Fault` is an immutable record behind a cheap reference-counted
/// handle; cloning shares the record, including its resolved-frame cache.
/// Records form a causal chain through [`cause`](Fault::cause), built
/// oldest first: a cause is attached before the fault wrapping it exists,
/// so chains are always acyclic.
///
/// # Examples
///
/// ```
/// use faultline::{Fault, Severity};
///
/// let root = Fault::thrown("db::ConnectError", "connection refused").build();
/// let fault = Fault::runtime(Severity::UserWarning, "retry budget exhausted")
///     .cause(root)
///     .build();
///
/// assert_eq!(fault.severity(), Some(Severity::UserWarning));
/// assert_eq!(fault.chain().count(), 2);
/// ```
#[derive(Clone)]
pub struct Fault {
    inner: triomphe::Arc<FaultInner>,
}

impl Fault {
    /// Starts building a runtime fault with the given severity.
    ///
    /// The location defaults to the caller of this function.
    #[track_caller]
    pub fn runtime(severity: Severity, message: impl Into<String>) -> FaultBuilder {
        FaultBuilder {
            kind: FaultKind::Runtime(severity),
            type_name: Cow::Borrowed(RUNTIME_TYPE_NAME),
            message: message.into(),
            location: SourceLocation::caller(),
            cause: None,
            stack: None,
        }
    }

    /// Starts building a thrown fault carrying the throwing type's name.
    ///
    /// The location defaults to the caller of this function.
    #[track_caller]
    pub fn thrown(
        type_name: impl Into<Cow<'static, str>>,
        message: impl Into<String>,
    ) -> FaultBuilder {
        FaultBuilder {
            kind: FaultKind::Thrown,
            type_name: type_name.into(),
            message: message.into(),
            location: SourceLocation::caller(),
            cause: None,
            stack: None,
        }
    }

    /// The kind of this fault.
    pub fn kind(&self) -> FaultKind {
        self.inner.kind
    }

    /// The severity code, `None` for thrown faults.
    pub fn severity(&self) -> Option<Severity> {
        match self.inner.kind {
            FaultKind::Runtime(severity) => Some(severity),
            FaultKind::Thrown => None,
        }
    }

    /// The severity classification, `None` for thrown faults.
    pub fn severity_class(&self) -> Option<SeverityClass> {
        self.severity().map(Severity::class)
    }

    /// The human-readable severity label, `None` for thrown faults.
    pub fn error_type(&self) -> Option<&'static str> {
        self.severity().map(Severity::label)
    }

    /// The name of the type behind this fault.
    pub fn type_name(&self) -> &str {
        &self.inner.type_name
    }

    /// The fault message.
    pub fn message(&self) -> &str {
        &self.inner.message
    }

    /// Where the fault was raised.
    pub fn location(&self) -> &SourceLocation {
        &self.inner.location
    }

    /// The fault that triggered this one, if any.
    pub fn cause(&self) -> Option<&Fault> {
        self.inner.cause.as_ref()
    }

    /// Iterates over this fault and its causes, newest first.
    pub fn chain(&self) -> CauseChain<'_> {
        CauseChain { next: Some(self) }
    }

    /// Whether this fault terminates the process once dispatched.
    ///
    /// Thrown faults always do; runtime faults do when their severity
    /// class is fatal.
    pub fn is_fatal(&self) -> bool {
        match self.inner.kind {
            FaultKind::Runtime(severity) => severity.is_fatal(),
            FaultKind::Thrown => true,
        }
    }

    /// The exit status the process terminates with for this fault: the
    /// severity code, floored at `1`.
    pub fn exit_status(&self) -> i32 {
        match self.inner.kind {
            FaultKind::Runtime(severity) => i32::from(severity.code()).max(1),
            FaultKind::Thrown => 1,
        }
    }

    /// Resolves the merged, deduplicated frame sequence spanning this
    /// fault and its causes.
    ///
    /// Arguments are retained only for frames below `arg_frame_limit`;
    /// pass [`i64::MAX`] to keep everything. The first resolution is
    /// cached on the record, so the first caller's limit decides what
    /// later callers see. A negative limit fails without touching the
    /// cache.
    pub fn frames(&self, arg_frame_limit: i64) -> Result<Arc<[FrameEntry]>, RangeError> {
        frames::resolve(self, arg_frame_limit)
    }

    /// Whether two handles refer to the same record.
    pub fn ptr_eq(&self, other: &Fault) -> bool {
        triomphe::Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn frame_cache(&self) -> &OnceLock<Arc<[FrameEntry]>> {
        &self.inner.frames
    }

    pub(crate) fn raw_frames(&self) -> Vec<RawFrame> {
        match &self.inner.stack {
            Stack::Supplied(frames) => frames.clone(),
            Stack::Source(source) => source.raw_frames(),
        }
    }
}

impl fmt::Debug for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fault")
            .field("kind", &self.inner.kind)
            .field("type_name", &self.inner.type_name)
            .field("message", &self.inner.message)
            .field("location", &self.inner.location)
            .field("cause", &self.inner.cause)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self.error_type() {
            Some(label) => label,
            None => self.type_name(),
        };
        write!(f, "{name}: {}", self.message())
    }
}

/// Iterator over a fault and its causes, newest first.
#[allow(missing_copy_implementations)]
#[derive(Clone, Debug)]
pub struct CauseChain<'a> {
    next: Option<&'a Fault>,
}

impl<'a> Iterator for CauseChain<'a> {
    type Item = &'a Fault;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.cause();
        Some(current)
    }
}

/// Builder for a [`Fault`].
#[must_use = "a fault builder does nothing until `build` is called"]
pub struct FaultBuilder {
    kind: FaultKind,
    type_name: Cow<'static, str>,
    message: String,
    location: SourceLocation,
    cause: Option<Fault>,
    stack: Option<Stack>,
}

impl FaultBuilder {
    /// Overrides the location the fault reports.
    pub fn location(mut self, location: SourceLocation) -> Self {
        self.location = location;
        self
    }

    /// Attaches the fault that triggered this one.
    pub fn cause(mut self, cause: Fault) -> Self {
        self.cause = Some(cause);
        self
    }

    /// Supplies the raw stack frames directly, newest call first.
    ///
    /// An empty vector is valid: the resolved sequence then consists of
    /// the synthetic throw-site frame alone.
    pub fn raw_frames(mut self, frames: Vec<RawFrame>) -> Self {
        self.stack = Some(Stack::Supplied(frames));
        self
    }

    /// Supplies a deferred source of raw stack frames.
    pub fn stack_source(mut self, source: impl StackSource + 'static) -> Self {
        self.stack = Some(Stack::Source(Box::new(source)));
        self
    }

    /// Builds the record.
    ///
    /// When no frames were supplied, the live call stack is captured here.
    pub fn build(self) -> Fault {
        let stack = self
            .stack
            .unwrap_or_else(|| Stack::Source(Box::new(CapturedStack::capture())));
        Fault {
            inner: triomphe::Arc::new(FaultInner {
                kind: self.kind,
                type_name: self.type_name,
                message: self.message,
                location: self.location,
                cause: self.cause,
                stack,
                frames: OnceLock::new(),
            }),
        }
    }
}
