//! The timestamped dispatch view of a fault.

use time::OffsetDateTime;

use crate::fault::Fault;

/// A [`Fault`] paired with the moment the pipeline received it.
///
/// One report is built per dispatch and every handler in the chain sees
/// the same one, so all sinks agree on the timestamp they render.
#[derive(Clone, Debug)]
pub struct FaultReport {
    fault: Fault,
    captured_at: OffsetDateTime,
}

impl FaultReport {
    /// Wraps a fault, stamping it with the current time.
    pub fn new(fault: Fault) -> Self {
        Self {
            fault,
            captured_at: OffsetDateTime::now_utc(),
        }
    }

    /// Wraps a fault with an explicit timestamp.
    pub fn with_timestamp(fault: Fault, captured_at: OffsetDateTime) -> Self {
        Self { fault, captured_at }
    }

    /// The reported fault.
    pub fn fault(&self) -> &Fault {
        &self.fault
    }

    /// When the pipeline received the fault.
    pub fn captured_at(&self) -> OffsetDateTime {
        self.captured_at
    }

    /// Unwraps the report back into its fault.
    pub fn into_fault(self) -> Fault {
        self.fault
    }
}

#[cfg(test)]
mod tests {
    use time::macros::datetime;

    use super::*;
    use crate::severity::Severity;

    #[test]
    fn reports_carry_an_explicit_timestamp() {
        let fault = Fault::runtime(Severity::Notice, "n").build();
        let at = datetime!(2026-03-14 09:26:53 UTC);

        let report = FaultReport::with_timestamp(fault.clone(), at);
        assert_eq!(report.captured_at(), at);
        assert!(report.fault().ptr_eq(&fault));
        assert!(report.into_fault().ptr_eq(&fault));
    }
}
