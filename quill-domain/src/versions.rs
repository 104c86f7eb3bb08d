//! Versions and sequence numbers
//!
//! Both are non-negative counters. They enforce that invariant at
//! construction time when built from signed or floating point input.

use crate::error::EventsError;
use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// AggregateRootVersion
// =============================================================================

/// Number of events an aggregate root has applied to one event source
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct AggregateRootVersion(u64);

impl AggregateRootVersion {
    /// Version of an aggregate root that has applied no events
    pub const INITIAL: AggregateRootVersion = AggregateRootVersion(0);

    /// Create a version
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// Get the raw value
    pub fn value(&self) -> u64 {
        self.0
    }

    /// The version after this one, or `None` at `u64::MAX`
    pub fn next(&self) -> Option<Self> {
        self.0.checked_add(1).map(Self)
    }
}

impl From<u64> for AggregateRootVersion {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl TryFrom<i64> for AggregateRootVersion {
    type Error = EventsError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u64::try_from(value)
            .map(Self)
            .map_err(|_| EventsError::InvalidAggregateRootVersion(value.to_string()))
    }
}

impl TryFrom<f64> for AggregateRootVersion {
    type Error = EventsError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        whole_non_negative(value)
            .map(Self)
            .ok_or_else(|| EventsError::InvalidAggregateRootVersion(value.to_string()))
    }
}

impl fmt::Display for AggregateRootVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// EventLogSequenceNumber
// =============================================================================

/// Position of an event in the global event log
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct EventLogSequenceNumber(u64);

impl EventLogSequenceNumber {
    /// Sequence number of the first event in any event log
    pub const FIRST: EventLogSequenceNumber = EventLogSequenceNumber(0);

    /// Create a sequence number
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// Get the raw value
    pub fn value(&self) -> u64 {
        self.0
    }

    /// The sequence number after this one, or `None` at `u64::MAX`
    pub fn next(&self) -> Option<Self> {
        self.0.checked_add(1).map(Self)
    }
}

impl From<u64> for EventLogSequenceNumber {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl TryFrom<i64> for EventLogSequenceNumber {
    type Error = EventsError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u64::try_from(value)
            .map(Self)
            .map_err(|_| EventsError::InvalidSequenceNumber(value.to_string()))
    }
}

impl TryFrom<f64> for EventLogSequenceNumber {
    type Error = EventsError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        whole_non_negative(value)
            .map(Self)
            .ok_or_else(|| EventsError::InvalidSequenceNumber(value.to_string()))
    }
}

impl fmt::Display for EventLogSequenceNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Accepts finite, whole, non-negative floats that fit in a `u64`.
fn whole_non_negative(value: f64) -> Option<u64> {
    if !value.is_finite() || value < 0.0 || value.fract() != 0.0 || value > u64::MAX as f64 {
        return None;
    }
    Some(value as u64)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_version_and_next() {
        assert_eq!(AggregateRootVersion::INITIAL.value(), 0);
        assert_eq!(AggregateRootVersion::INITIAL.next(), Some(AggregateRootVersion::new(1)));
        assert_eq!(AggregateRootVersion::new(u64::MAX).next(), None);
        assert_eq!(AggregateRootVersion::default(), AggregateRootVersion::INITIAL);
    }

    #[test]
    fn test_first_sequence_number() {
        assert_eq!(EventLogSequenceNumber::FIRST.value(), 0);
        assert_eq!(EventLogSequenceNumber::FIRST.next().map(|n| n.value()), Some(1));
        assert_eq!(EventLogSequenceNumber::new(u64::MAX).next(), None);
    }

    #[test]
    fn test_sequence_number_rejects_negative() {
        let result = EventLogSequenceNumber::try_from(-1_i64);
        assert!(matches!(result, Err(EventsError::InvalidSequenceNumber(_))));
    }

    #[test]
    fn test_sequence_number_rejects_fractional() {
        let result = EventLogSequenceNumber::try_from(2.5_f64);
        assert!(matches!(result, Err(EventsError::InvalidSequenceNumber(_))));

        let result = EventLogSequenceNumber::try_from(f64::NAN);
        assert!(matches!(result, Err(EventsError::InvalidSequenceNumber(_))));
    }

    #[test]
    fn test_sequence_number_accepts_whole_float() {
        let number = EventLogSequenceNumber::try_from(42.0_f64).unwrap();
        assert_eq!(number.value(), 42);
    }

    #[test]
    fn test_version_rejects_negative() {
        let result = AggregateRootVersion::try_from(-3_i64);
        assert!(matches!(result, Err(EventsError::InvalidAggregateRootVersion(_))));
    }

    #[test]
    fn test_ordering() {
        assert!(EventLogSequenceNumber::new(1) < EventLogSequenceNumber::new(2));
        assert!(AggregateRootVersion::new(5) > AggregateRootVersion::INITIAL);
    }
}
