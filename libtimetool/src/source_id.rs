use std::fmt;

use time::OffsetDateTime;

use super::constants::*;

/// Source of a fragment. `phy` is the physical detector address the module
/// filters on; `log` is the logical (process) address and is carried along
/// for bookkeeping only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Src {
    pub log: u32,
    pub phy: u32,
}

impl Src {
    pub fn new(log: u32, phy: u32) -> Self {
        Self { log, phy }
    }
}

/// The kinds of payload a fragment can carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeId {
    Frame,
    Epics,
    EvrData,
    Opal1kConfig,
    Other(u16),
}

impl From<u16> for TypeId {
    fn from(value: u16) -> Self {
        match value {
            TYPE_ID_FRAME => Self::Frame,
            TYPE_ID_EPICS => Self::Epics,
            TYPE_ID_EVR_DATA => Self::EvrData,
            TYPE_ID_OPAL1K_CONFIG => Self::Opal1kConfig,
            other => Self::Other(other),
        }
    }
}

impl From<TypeId> for u16 {
    fn from(value: TypeId) -> Self {
        match value {
            TypeId::Frame => TYPE_ID_FRAME,
            TypeId::Epics => TYPE_ID_EPICS,
            TypeId::EvrData => TYPE_ID_EVR_DATA,
            TypeId::Opal1kConfig => TYPE_ID_OPAL1K_CONFIG,
            TypeId::Other(id) => id,
        }
    }
}

/// Event clock supplied by the host once per event
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct ClockTime {
    pub seconds: u32,
    pub nanoseconds: u32,
}

impl ClockTime {
    pub fn new(seconds: u32, nanoseconds: u32) -> Self {
        Self {
            seconds,
            nanoseconds,
        }
    }

    /// Convert to a calendar time (UTC), if representable
    pub fn as_datetime(&self) -> Option<OffsetDateTime> {
        let nanos = self.seconds as i128 * 1_000_000_000 + self.nanoseconds as i128;
        OffsetDateTime::from_unix_timestamp_nanos(nanos).ok()
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_datetime() {
            Some(dt) => write!(f, "{dt}"),
            None => write!(f, "{}.{:09}", self.seconds, self.nanoseconds),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_id_numbers() {
        assert_eq!(TypeId::from(TYPE_ID_EVR_DATA), TypeId::EvrData);
        assert_eq!(TypeId::from(999), TypeId::Other(999));
        assert_eq!(u16::from(TypeId::Other(999)), 999);
        assert_eq!(u16::from(TypeId::Frame), TYPE_ID_FRAME);
    }

    #[test]
    fn test_clock_ordering() {
        let early = ClockTime::new(10, 999_999_999);
        let late = ClockTime::new(11, 0);
        assert!(early < late);
        assert_eq!(late.as_datetime().unwrap().unix_timestamp(), 11);
    }
}
