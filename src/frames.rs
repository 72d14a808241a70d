//! Raw stack frames and the causal-chain frame resolver.
//!
//! Hosts hand the pipeline whatever call-stack information they have as a
//! sequence of [`RawFrame`]s, newest call first. The resolver turns that raw
//! material into the display-ready [`FrameEntry`] sequence reports carry:
//! it repairs frames that arrived without coordinates, trims the frames
//! contributed by the capture machinery itself, prepends a synthetic frame
//! for the throw site, and merges in the frames of every cause while
//! removing the stack tail a fault shares with the fault that triggered it.
//!
//! Resolution runs at most once per fault. The first caller's argument
//! retention limit decides what the cached sequence keeps.

use std::sync::{Arc, Mutex, OnceLock};

use regex::Regex;
use serde::Serialize;

use crate::{
    fault::{Fault, SourceLocation},
    severity::Severity,
    util::lock,
};

/// File name given to frames whose origin could not be repaired.
pub const INTERNAL_FILE: &str = "[INTERNAL]";

/// Cause chains longer than this are truncated during frame merging.
const MAX_CAUSE_DEPTH: usize = 64;

/// One raw stack frame as reported by a host runtime.
///
/// Every field is optional: hosts report what they know and the resolver
/// fills the gaps. Frames are ordered newest call first.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawFrame {
    /// Source file of the call, if known.
    pub file: Option<String>,
    /// Line number of the call, if known.
    pub line: Option<u32>,
    /// Namespace-like qualifier of the callable, e.g. a module path or type.
    pub qualifier: Option<String>,
    /// Name of the called function or method.
    pub callable: Option<String>,
    /// Pre-rendered call arguments, if the host captured any.
    pub arguments: Option<Vec<String>>,
}

/// A resolved, display-ready stack frame.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FrameEntry {
    /// Source file of the call. Never empty; unknown origins are marked
    /// [`INTERNAL_FILE`].
    pub file: String,
    /// Line number of the call, `0` when unknown.
    pub line: u32,
    /// Namespace-like qualifier of the callable.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qualifier: Option<String>,
    /// Name of the called function or method.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callable: Option<String>,
    /// Pre-rendered call arguments, present only within the configured
    /// argument retention limit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Vec<String>>,
    /// Severity of the fault this frame was synthesized for. Only ever set
    /// on the synthetic throw-site frame of a runtime fault.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
}

/// Provider of a fault's raw call-stack frames.
///
/// The resolver calls [`raw_frames`](Self::raw_frames) at most once per
/// fault; the resolved sequence is cached afterwards.
pub trait StackSource: Send + Sync {
    /// Returns the raw frames, newest call first.
    fn raw_frames(&self) -> Vec<RawFrame>;
}

/// A [`StackSource`] backed by the live call stack at capture time.
///
/// Capture itself is cheap: symbol resolution is deferred until the frames
/// are first requested.
#[derive(Debug)]
pub struct CapturedStack {
    inner: Mutex<backtrace::Backtrace>,
}

impl CapturedStack {
    /// Captures the current call stack without resolving symbols.
    pub fn capture() -> Self {
        Self {
            inner: Mutex::new(backtrace::Backtrace::new_unresolved()),
        }
    }
}

impl StackSource for CapturedStack {
    fn raw_frames(&self) -> Vec<RawFrame> {
        let mut backtrace = lock(&self.inner);
        backtrace.resolve();

        let mut frames = Vec::new();
        for frame in backtrace.frames() {
            for symbol in frame.symbols() {
                // Frames without a symbol name carry nothing a report
                // could show.
                let Some(name) = symbol.name() else { continue };
                let demangled = format!("{name:#}");
                let (qualifier, callable) = split_symbol(&demangled);
                frames.push(RawFrame {
                    file: symbol.filename().map(|path| path.display().to_string()),
                    line: symbol.lineno(),
                    qualifier: qualifier.map(str::to_owned),
                    callable: Some(callable.to_owned()),
                    arguments: None,
                });
            }
        }
        frames
    }
}

/// Error returned when frame resolution is requested with a negative
/// argument retention limit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[error("argument retention limit cannot be less than 0, got {given}")]
pub struct RangeError {
    /// The rejected limit.
    pub given: i64,
}

/// Resolves the merged frame sequence for `fault`, caching the result.
///
/// The limit is validated before the cache is consulted, so a negative
/// limit fails even for faults that were already resolved.
pub(crate) fn resolve(
    fault: &Fault,
    arg_frame_limit: i64,
) -> Result<Arc<[FrameEntry]>, RangeError> {
    if arg_frame_limit < 0 {
        return Err(RangeError {
            given: arg_frame_limit,
        });
    }
    Ok(fault
        .frame_cache()
        .get_or_init(|| {
            let mut frames = resolve_fault(fault, 0);
            strip_arguments(&mut frames, arg_frame_limit);
            Arc::from(frames)
        })
        .clone())
}

/// Builds the full frame sequence for one fault: its own repaired and
/// trimmed frames behind the synthetic throw-site frame, followed by the
/// frames of its cause chain.
fn resolve_fault(fault: &Fault, depth: usize) -> Vec<FrameEntry> {
    let mut frames = repair(&fault.raw_frames());
    trim_capture_machinery(&mut frames, fault.location());
    frames.insert(0, synthetic_frame(fault));

    if depth < MAX_CAUSE_DEPTH
        && let Some(cause) = fault.cause()
    {
        let older = cause_frames(cause, depth + 1);
        remove_shared_tail(&mut frames, &older);
        frames.extend(older.iter().cloned());
    }
    frames
}

/// Resolves a cause's frames through its own cache, so a cause shared by
/// several faults is only resolved once. Arguments are kept in full here;
/// the outer fault strips its merged copy against its caller's limit.
fn cause_frames(cause: &Fault, depth: usize) -> Arc<[FrameEntry]> {
    cause
        .frame_cache()
        .get_or_init(|| Arc::from(resolve_fault(cause, depth)))
        .clone()
}

/// Converts raw frames into entries, adopting coordinates from the next
/// older frame when a frame arrived without usable file and line. That
/// happens when the entry originates from a reflective-invocation
/// trampoline; anything else unlocatable is marked [`INTERNAL_FILE`].
fn repair(raw: &[RawFrame]) -> Vec<FrameEntry> {
    fn coordinates(frame: &RawFrame) -> Option<(String, u32)> {
        let file = frame.file.as_deref().filter(|file| !file.is_empty())?;
        Some((file.to_owned(), frame.line?))
    }

    let mut repaired = Vec::with_capacity(raw.len());
    for (index, frame) in raw.iter().enumerate() {
        let (file, line) = if let Some(own) = coordinates(frame) {
            own
        } else if let Some(next) = raw.get(index + 1)
            && is_invoke_trampoline(next)
            && let Some(adopted) = coordinates(next)
        {
            adopted
        } else {
            (INTERNAL_FILE.to_owned(), 0)
        };

        repaired.push(FrameEntry {
            file,
            line,
            qualifier: frame.qualifier.clone(),
            callable: frame.callable.clone(),
            arguments: frame.arguments.clone(),
            severity: None,
        });
    }
    repaired
}

/// Whether a frame is an invocation shim of the `Fn` traits.
fn is_invoke_trampoline(frame: &RawFrame) -> bool {
    let Some(callable) = frame.callable.as_deref() else {
        return false;
    };
    if !matches!(callable, "call" | "call_once" | "call_mut") {
        return false;
    }
    frame
        .qualifier
        .as_deref()
        .is_some_and(|qualifier| trampoline_pattern().is_match(qualifier))
}

fn trampoline_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\bops::function::Fn(?:Mut|Once)?\b")
            .expect("built-in trampoline pattern should be valid")
    })
}

/// Drops every frame at or newer than the oldest frame matching the
/// fault's own reported location. Those frames belong to the capture
/// machinery, not the user's call stack.
fn trim_capture_machinery(frames: &mut Vec<FrameEntry>, location: &SourceLocation) {
    for index in (0..frames.len()).rev() {
        if frames[index].file == location.file() && frames[index].line == location.line() {
            frames.drain(..=index);
            break;
        }
    }
}

/// The synthetic frame representing the fault's own throw site. Runtime
/// faults carry their severity and their message as the frame's argument.
fn synthetic_frame(fault: &Fault) -> FrameEntry {
    FrameEntry {
        file: fault.location().file().to_owned(),
        line: fault.location().line(),
        qualifier: Some(fault.type_name().to_owned()),
        callable: None,
        arguments: fault
            .severity()
            .is_some()
            .then(|| vec![fault.message().to_owned()]),
        severity: fault.severity(),
    }
}

/// Removes the trailing run of frames the newer half shares with the older
/// half. Both lists are walked from their ends inward in lock-step while
/// the `(file, line)` pairs match; matched frames are deleted from the
/// newer half only.
fn remove_shared_tail(newer: &mut Vec<FrameEntry>, older: &[FrameEntry]) {
    let mut shared = 0;
    while shared < newer.len() && shared < older.len() {
        let own = &newer[newer.len() - 1 - shared];
        let cause = &older[older.len() - 1 - shared];
        if own.file == cause.file && own.line == cause.line {
            shared += 1;
        } else {
            break;
        }
    }
    let keep = newer.len() - shared;
    newer.truncate(keep);
}

/// Strips captured arguments from every frame at or beyond the limit
/// index. A limit of `0` therefore strips arguments everywhere.
fn strip_arguments(frames: &mut [FrameEntry], limit: i64) {
    let keep = usize::try_from(limit).unwrap_or(usize::MAX);
    for frame in frames.iter_mut().skip(keep) {
        frame.arguments = None;
    }
}

/// Splits a demangled symbol into its qualifier and trailing callable
/// name, ignoring `::` separators nested inside generic brackets.
fn split_symbol(name: &str) -> (Option<&str>, &str) {
    let mut depth = 0usize;
    let mut split = None;
    let mut previous = '\0';
    for (index, ch) in name.char_indices() {
        match ch {
            '<' => depth += 1,
            '>' if previous != '-' => depth = depth.saturating_sub(1),
            ':' if previous == ':' && depth == 0 => split = Some(index - 1),
            _ => {}
        }
        previous = ch;
    }
    match split {
        Some(index) => (Some(&name[..index]), &name[index + 2..]),
        None => (None, name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(file: &str, line: u32) -> FrameEntry {
        FrameEntry {
            file: file.to_owned(),
            line,
            qualifier: None,
            callable: None,
            arguments: None,
            severity: None,
        }
    }

    fn raw(file: Option<&str>, line: Option<u32>, callable: Option<&str>) -> RawFrame {
        RawFrame {
            file: file.map(str::to_owned),
            line,
            qualifier: None,
            callable: callable.map(str::to_owned),
            arguments: None,
        }
    }

    #[test]
    fn repair_adopts_trampoline_coordinates() {
        let mut trampoline = raw(Some("src/dispatch.rs"), Some(40), Some("call_once"));
        trampoline.qualifier = Some("core::ops::function::FnOnce".to_owned());
        let frames = [raw(None, None, Some("apply")), trampoline];

        let repaired = repair(&frames);
        assert_eq!(repaired[0].file, "src/dispatch.rs");
        assert_eq!(repaired[0].line, 40);
        assert_eq!(repaired[1].file, "src/dispatch.rs");
    }

    #[test]
    fn repair_marks_unlocatable_frames_internal() {
        let frames = [
            raw(None, None, Some("apply")),
            raw(Some("src/main.rs"), Some(3), Some("main")),
        ];

        let repaired = repair(&frames);
        assert_eq!(repaired[0].file, INTERNAL_FILE);
        assert_eq!(repaired[0].line, 0);
        assert_eq!(repaired[1].file, "src/main.rs");
    }

    #[test]
    fn repair_treats_empty_file_as_missing() {
        let frames = [raw(Some(""), Some(17), Some("apply"))];
        let repaired = repair(&frames);
        assert_eq!(repaired[0].file, INTERNAL_FILE);
        assert_eq!(repaired[0].line, 0);
    }

    #[test]
    fn trim_drops_machinery_through_oldest_match() {
        let location = SourceLocation::new("src/app.rs", 9);
        let mut frames = vec![
            entry("src/hook.rs", 100),
            entry("src/app.rs", 9),
            entry("src/api.rs", 55),
            entry("src/app.rs", 9),
            entry("src/main.rs", 3),
        ];

        trim_capture_machinery(&mut frames, &location);
        assert_eq!(frames, vec![entry("src/main.rs", 3)]);
    }

    #[test]
    fn trim_without_match_keeps_everything() {
        let location = SourceLocation::new("src/app.rs", 9);
        let mut frames = vec![entry("src/api.rs", 55), entry("src/main.rs", 3)];

        trim_capture_machinery(&mut frames, &location);
        assert_eq!(frames.len(), 2);
    }

    #[test]
    fn shared_tail_is_removed_from_newer_half_only() {
        let mut newer = vec![
            entry("src/inner.rs", 5),
            entry("src/shared.rs", 20),
            entry("src/shared.rs", 21),
            entry("src/main.rs", 3),
        ];
        let older = vec![
            entry("src/outer.rs", 7),
            entry("src/shared.rs", 20),
            entry("src/shared.rs", 21),
            entry("src/main.rs", 3),
        ];

        remove_shared_tail(&mut newer, &older);
        assert_eq!(newer, vec![entry("src/inner.rs", 5)]);
        assert_eq!(older.len(), 4);
    }

    #[test]
    fn disjoint_stacks_are_concatenated_untouched() {
        let mut newer = vec![entry("src/a.rs", 1), entry("src/b.rs", 2)];
        let older = [entry("src/c.rs", 3)];

        remove_shared_tail(&mut newer, &older);
        assert_eq!(newer.len(), 2);
    }

    #[test]
    fn strip_limit_zero_drops_all_arguments() {
        let mut frames = vec![entry("src/a.rs", 1); 5];
        for frame in &mut frames {
            frame.arguments = Some(vec!["value".to_owned()]);
        }

        strip_arguments(&mut frames, 0);
        assert!(frames.iter().all(|frame| frame.arguments.is_none()));
    }

    #[test]
    fn strip_keeps_arguments_below_limit() {
        let mut frames = vec![entry("src/a.rs", 1); 4];
        for frame in &mut frames {
            frame.arguments = Some(vec!["value".to_owned()]);
        }

        strip_arguments(&mut frames, 2);
        assert!(frames[0].arguments.is_some());
        assert!(frames[1].arguments.is_some());
        assert!(frames[2].arguments.is_none());
        assert!(frames[3].arguments.is_none());
    }

    #[test]
    fn split_symbol_handles_plain_paths() {
        assert_eq!(
            split_symbol("faultline::frames::resolve"),
            (Some("faultline::frames"), "resolve")
        );
        assert_eq!(split_symbol("main"), (None, "main"));
    }

    #[test]
    fn split_symbol_ignores_separators_inside_generics() {
        assert_eq!(
            split_symbol("<faultline::Fault as core::fmt::Debug>::fmt"),
            (Some("<faultline::Fault as core::fmt::Debug>"), "fmt")
        );
        assert_eq!(
            split_symbol("alloc::vec::Vec<alloc::string::String>::push"),
            (Some("alloc::vec::Vec<alloc::string::String>"), "push")
        );
    }

    #[test]
    fn trampoline_detection_requires_fn_trait_qualifier() {
        let mut frame = raw(Some("src/a.rs"), Some(1), Some("call_once"));
        frame.qualifier = Some("core::ops::function::FnOnce".to_owned());
        assert!(is_invoke_trampoline(&frame));

        frame.qualifier = Some("faultline::catcher::Catcher".to_owned());
        assert!(!is_invoke_trampoline(&frame));

        let named_call = raw(Some("src/a.rs"), Some(1), Some("recall"));
        assert!(!is_invoke_trampoline(&named_call));
    }

    #[test]
    fn captured_stacks_cross_threads() {
        static_assertions::assert_impl_all!(CapturedStack: Send, Sync);
    }
}
