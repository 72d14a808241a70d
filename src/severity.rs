//! Severity codes for runtime faults and the host reporting filter.
//!
//! Severities form a closed set: host integrations map whatever native
//! diagnostics they observe onto one of the nine [`Severity`] codes. Each
//! code carries a distinct bit value so that a set of codes can be packed
//! into a [`SeverityFilter`] bitmask, which is how hosts describe the codes
//! they currently want reported.

use std::fmt;

/// Severity code of a runtime fault.
///
/// The first five codes describe faults raised by the host runtime itself,
/// the `User*` codes describe faults raised deliberately by application code.
/// Discriminants are single bits so codes compose into a [`SeverityFilter`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Severity {
    /// An unrecoverable error reported by the host runtime.
    Fatal = 1 << 0,
    /// An error the host considers catchable but that is fatal once it
    /// reaches the reporting pipeline uncaught.
    Recoverable = 1 << 1,
    /// A non-fatal runtime warning.
    Warning = 1 << 2,
    /// An informational notice.
    Notice = 1 << 3,
    /// Use of a deprecated construct.
    Deprecation = 1 << 4,
    /// An unrecoverable error raised by application code.
    UserFatal = 1 << 5,
    /// A warning raised by application code.
    UserWarning = 1 << 6,
    /// A notice raised by application code.
    UserNotice = 1 << 7,
    /// A deprecation raised by application code.
    UserDeprecation = 1 << 8,
}

impl Severity {
    /// Every severity code, ordered by bit value.
    pub const ALL: [Severity; 9] = [
        Severity::Fatal,
        Severity::Recoverable,
        Severity::Warning,
        Severity::Notice,
        Severity::Deprecation,
        Severity::UserFatal,
        Severity::UserWarning,
        Severity::UserNotice,
        Severity::UserDeprecation,
    ];

    /// Returns the numeric bit value of this code.
    ///
    /// The value doubles as the fault's exit status, floored at `1` by
    /// [`Fault::exit_status`](crate::Fault::exit_status).
    pub const fn code(self) -> u16 {
        self as u16
    }

    /// Maps a numeric bit value back to its severity code.
    ///
    /// Returns `None` for anything that is not exactly one of the nine
    /// defined bit values.
    pub const fn from_code(code: u16) -> Option<Self> {
        match code {
            c if c == Severity::Fatal as u16 => Some(Severity::Fatal),
            c if c == Severity::Recoverable as u16 => Some(Severity::Recoverable),
            c if c == Severity::Warning as u16 => Some(Severity::Warning),
            c if c == Severity::Notice as u16 => Some(Severity::Notice),
            c if c == Severity::Deprecation as u16 => Some(Severity::Deprecation),
            c if c == Severity::UserFatal as u16 => Some(Severity::UserFatal),
            c if c == Severity::UserWarning as u16 => Some(Severity::UserWarning),
            c if c == Severity::UserNotice as u16 => Some(Severity::UserNotice),
            c if c == Severity::UserDeprecation as u16 => Some(Severity::UserDeprecation),
            _ => None,
        }
    }

    /// Returns the broad classification of this code.
    pub const fn class(self) -> SeverityClass {
        match self {
            Severity::Fatal | Severity::UserFatal => SeverityClass::Fatal,
            Severity::Recoverable => SeverityClass::RecoverableError,
            Severity::Warning | Severity::UserWarning => SeverityClass::Warning,
            Severity::Notice | Severity::UserNotice => SeverityClass::Notice,
            Severity::Deprecation | Severity::UserDeprecation => SeverityClass::Deprecation,
        }
    }

    /// Whether a fault with this code terminates the process once it reaches
    /// the pipeline.
    pub const fn is_fatal(self) -> bool {
        self.class().is_fatal()
    }

    /// Human-readable label used by the bundled handlers, e.g. `Warning (user)`.
    pub const fn label(self) -> &'static str {
        match self {
            Severity::Fatal => "Fatal error",
            Severity::Recoverable => "Recoverable error",
            Severity::Warning => "Warning",
            Severity::Notice => "Notice",
            Severity::Deprecation => "Deprecated",
            Severity::UserFatal => "Fatal error (user)",
            Severity::UserWarning => "Warning (user)",
            Severity::UserNotice => "Notice (user)",
            Severity::UserDeprecation => "Deprecated (user)",
        }
    }

    /// The [`log`] level at which faults of this code are logged.
    ///
    /// Notices log at [`log::Level::Info`], warnings and deprecations at
    /// [`log::Level::Warn`], everything fatal at [`log::Level::Error`].
    pub const fn log_level(self) -> log::Level {
        match self.class() {
            SeverityClass::Notice => log::Level::Info,
            SeverityClass::Deprecation | SeverityClass::Warning => log::Level::Warn,
            SeverityClass::RecoverableError | SeverityClass::Fatal => log::Level::Error,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// Serialized reports carry the label, not the bit value.
impl serde::Serialize for Severity {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

/// Broad classification of a [`Severity`] code.
///
/// The classification folds the host/user distinction away: policy decisions
/// such as "is this fatal?" never depend on who raised the fault.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SeverityClass {
    /// Informational notices.
    Notice,
    /// Deprecations.
    Deprecation,
    /// Non-fatal warnings.
    Warning,
    /// Errors that were catchable in the host but are fatal once uncaught.
    RecoverableError,
    /// Unconditionally fatal errors.
    Fatal,
}

impl SeverityClass {
    /// Whether faults of this class terminate the process.
    ///
    /// Recoverable errors count as fatal here: a recoverable error that
    /// reached the pipeline is by definition one nothing caught.
    pub const fn is_fatal(self) -> bool {
        matches!(self, SeverityClass::RecoverableError | SeverityClass::Fatal)
    }
}

/// Bitmask of the [`Severity`] codes a host currently reports.
///
/// Faults whose code is absent from the host's filter are masked: the
/// orchestrator drops them before promotion or dispatch. The default filter
/// reports everything.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SeverityFilter(u16);

impl SeverityFilter {
    /// Every severity code enabled.
    pub const ALL: Self = Self(0b1_1111_1111);

    /// No severity codes enabled.
    pub const NONE: Self = Self(0);

    /// Builds a filter from a raw bitmask.
    ///
    /// Bits that do not correspond to a defined severity code are discarded.
    pub const fn from_bits(bits: u16) -> Self {
        Self(bits & Self::ALL.0)
    }

    /// Returns the raw bitmask.
    pub const fn bits(self) -> u16 {
        self.0
    }

    /// Whether this filter reports the given code.
    pub const fn contains(self, severity: Severity) -> bool {
        self.0 & severity.code() != 0
    }

    /// Returns this filter with the given code enabled.
    pub const fn with(self, severity: Severity) -> Self {
        Self(self.0 | severity.code())
    }

    /// Returns this filter with the given code disabled.
    pub const fn without(self, severity: Severity) -> Self {
        Self(self.0 & !severity.code())
    }
}

impl Default for SeverityFilter {
    fn default() -> Self {
        Self::ALL
    }
}

impl FromIterator<Severity> for SeverityFilter {
    fn from_iter<I: IntoIterator<Item = Severity>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Self::NONE, |filter, severity| filter.with(severity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_distinct_bits() {
        let mut seen = 0u16;
        for severity in Severity::ALL {
            let code = severity.code();
            assert_eq!(code.count_ones(), 1, "{severity:?}");
            assert_eq!(seen & code, 0, "{severity:?} overlaps another code");
            seen |= code;
        }
        assert_eq!(seen, SeverityFilter::ALL.bits());
    }

    #[test]
    fn code_round_trips() {
        for severity in Severity::ALL {
            assert_eq!(Severity::from_code(severity.code()), Some(severity));
        }
        assert_eq!(Severity::from_code(0), None);
        assert_eq!(Severity::from_code(1 << 9), None);
        assert_eq!(Severity::from_code(3), None);
    }

    #[test]
    fn fatal_classes() {
        assert!(Severity::Fatal.is_fatal());
        assert!(Severity::UserFatal.is_fatal());
        assert!(Severity::Recoverable.is_fatal());
        assert!(!Severity::Warning.is_fatal());
        assert!(!Severity::UserNotice.is_fatal());
        assert!(!Severity::Deprecation.is_fatal());
    }

    #[test]
    fn labels_mark_user_codes() {
        assert_eq!(Severity::Fatal.label(), "Fatal error");
        assert_eq!(Severity::UserFatal.label(), "Fatal error (user)");
        assert_eq!(Severity::Warning.label(), "Warning");
        assert_eq!(Severity::UserDeprecation.label(), "Deprecated (user)");
        assert_eq!(Severity::Recoverable.label(), "Recoverable error");
    }

    #[test]
    fn log_levels_follow_class() {
        assert_eq!(Severity::Notice.log_level(), log::Level::Info);
        assert_eq!(Severity::UserNotice.log_level(), log::Level::Info);
        assert_eq!(Severity::Warning.log_level(), log::Level::Warn);
        assert_eq!(Severity::UserDeprecation.log_level(), log::Level::Warn);
        assert_eq!(Severity::Recoverable.log_level(), log::Level::Error);
        assert_eq!(Severity::UserFatal.log_level(), log::Level::Error);
    }

    #[test]
    fn filter_masks_codes() {
        let filter = SeverityFilter::ALL.without(Severity::Deprecation);
        assert!(filter.contains(Severity::Fatal));
        assert!(!filter.contains(Severity::Deprecation));
        assert!(filter.with(Severity::Deprecation).contains(Severity::Deprecation));

        let none = SeverityFilter::NONE;
        assert!(Severity::ALL.iter().all(|s| !none.contains(*s)));
    }

    #[test]
    fn filter_discards_undefined_bits() {
        let filter = SeverityFilter::from_bits(0xFFFF);
        assert_eq!(filter, SeverityFilter::ALL);
        assert_eq!(SeverityFilter::from_bits(1 << 12), SeverityFilter::NONE);
    }

    #[test]
    fn filter_collects_from_codes() {
        let filter: SeverityFilter = [Severity::Warning, Severity::UserWarning]
            .into_iter()
            .collect();
        assert!(filter.contains(Severity::Warning));
        assert!(filter.contains(Severity::UserWarning));
        assert!(!filter.contains(Severity::Fatal));
    }
}
