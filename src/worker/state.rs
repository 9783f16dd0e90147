/// Worker status definitions
///
/// A worker is in exactly one of these states at any time. The pool is the
/// only writer of a worker's status.
use std::fmt;

/// Represents the current state of a worker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkerStatus {
    /// Idle and eligible for reservation
    Listening,

    /// Assigned to exactly one in-flight task
    Reserved,

    /// Stopped; execution context released. Terminal.
    Dead,
}

impl WorkerStatus {
    /// Returns true if no further transition is possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Dead)
    }

    /// Returns true if a caller may reserve a worker in this state
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Listening)
    }

    /// Checks whether moving to `next` is a legal transition
    ///
    /// - `Listening -> Reserved` (reservation)
    /// - `Reserved -> Listening` (task finished)
    /// - `* -> Dead` (stop), except out of `Dead`
    pub fn can_transition_to(&self, next: WorkerStatus) -> bool {
        match (self, next) {
            (Self::Dead, _) => false,
            (_, Self::Dead) => true,
            (Self::Listening, Self::Reserved) => true,
            (Self::Reserved, Self::Listening) => true,
            _ => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Listening => "listening",
            Self::Reserved => "reserved",
            Self::Dead => "dead",
        }
    }
}

impl fmt::Display for WorkerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legal_transitions() {
        assert!(WorkerStatus::Listening.can_transition_to(WorkerStatus::Reserved));
        assert!(WorkerStatus::Reserved.can_transition_to(WorkerStatus::Listening));
        assert!(WorkerStatus::Listening.can_transition_to(WorkerStatus::Dead));
        assert!(WorkerStatus::Reserved.can_transition_to(WorkerStatus::Dead));
    }

    #[test]
    fn test_illegal_transitions() {
        assert!(!WorkerStatus::Listening.can_transition_to(WorkerStatus::Listening));
        assert!(!WorkerStatus::Reserved.can_transition_to(WorkerStatus::Reserved));
        assert!(!WorkerStatus::Dead.can_transition_to(WorkerStatus::Listening));
        assert!(!WorkerStatus::Dead.can_transition_to(WorkerStatus::Reserved));
        assert!(!WorkerStatus::Dead.can_transition_to(WorkerStatus::Dead));
    }

    #[test]
    fn test_predicates() {
        assert!(WorkerStatus::Listening.is_available());
        assert!(!WorkerStatus::Reserved.is_available());
        assert!(WorkerStatus::Dead.is_terminal());
        assert!(!WorkerStatus::Listening.is_terminal());
    }

    #[test]
    fn test_display() {
        assert_eq!(WorkerStatus::Reserved.to_string(), "reserved");
    }
}
