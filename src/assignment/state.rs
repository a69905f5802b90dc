//! Enumeration for the assignment state of one row or column while a
//! solver is running.

#[derive(Debug, Clone, Copy, PartialEq)]
/// The assignment state of one side of a row/column pairing.
pub(crate) enum AssignmentState {
    /// No partner has been chosen yet.
    Unassigned,
    /// The partner index on the other side.
    Assigned(usize),
    /// A partner chosen during column reduction that later lost a
    /// conflict; resolved during reduction transfer.
    Conflict(usize),
}

impl AssignmentState {
    /// Returns true if no partner has been chosen.
    #[inline]
    pub(crate) fn is_unassigned(self) -> bool {
        matches!(self, AssignmentState::Unassigned)
    }

    /// Returns true if a partner has been chosen.
    #[inline]
    pub(crate) fn is_assigned(self) -> bool {
        matches!(self, AssignmentState::Assigned(_))
    }
}
