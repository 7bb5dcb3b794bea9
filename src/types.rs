// 1.0: primitives shared by every model. instrument ids, trade direction, timestamps.
// each is a newtype so the compiler catches mixups between keywords and plain strings.

use serde::{Deserialize, Serialize};
use std::fmt;

// 1.1: a keyword instrument. the keyword itself is the identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstrumentId(String);

impl InstrumentId {
    pub fn new(keyword: impl Into<String>) -> Self {
        Self(keyword.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    // sum of the keyword's char codes. stable per keyword, used to seed simulators.
    pub fn seed(&self) -> u64 {
        self.0.chars().map(|c| c as u64).sum()
    }
}

impl fmt::Display for InstrumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for InstrumentId {
    fn from(keyword: &str) -> Self {
        Self::new(keyword)
    }
}

// Long = bet the keyword's interest rises. Short = bet it falls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Long,
    Short,
}

impl Side {
    pub fn from_is_long(is_long: bool) -> Self {
        if is_long {
            Side::Long
        } else {
            Side::Short
        }
    }

    pub fn is_long(&self) -> bool {
        matches!(self, Side::Long)
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Long => write!(f, "long"),
            Side::Short => write!(f, "short"),
        }
    }
}

// 1.2: millisecond timestamp. every timer deadline is expressed in these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub fn now() -> Self {
        Self(chrono::Utc::now().timestamp_millis())
    }

    pub fn from_millis(ms: i64) -> Self {
        Self(ms)
    }

    pub fn as_millis(&self) -> i64 {
        self.0
    }

    pub fn plus_millis(&self, ms: i64) -> Self {
        Self(self.0.saturating_add(ms))
    }

    pub fn minus_millis(&self, ms: i64) -> Self {
        Self(self.0.saturating_sub(ms))
    }

    // signed: negative when `earlier` is actually later.
    pub fn millis_since(&self, earlier: Timestamp) -> i64 {
        self.0.saturating_sub(earlier.0)
    }

    // negative epoch values collapse to 0 for the chart axis.
    pub fn as_unsigned_millis(&self) -> u64 {
        u64::try_from(self.0).unwrap_or(0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instrument_seed_is_char_sum() {
        let id = InstrumentId::new("ab");
        assert_eq!(id.seed(), 97 + 98);
        assert_eq!(InstrumentId::from("ab"), id);
    }

    #[test]
    fn side_helpers() {
        assert_eq!(Side::from_is_long(true), Side::Long);
        assert_eq!(Side::from_is_long(false), Side::Short);
        assert!(Side::Long.is_long());
    }

    #[test]
    fn timestamp_arithmetic() {
        let t0 = Timestamp::from_millis(1_000);
        let t1 = t0.plus_millis(500);
        assert_eq!(t1.millis_since(t0), 500);
        assert_eq!(t0.millis_since(t1), -500);
        assert_eq!(t0.minus_millis(2_000).as_unsigned_millis(), 0);
    }
}
