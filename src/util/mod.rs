//! Utilities. OBVIOUSLY.

use chrono::{DateTime, Utc};
use serde_derive::{Deserialize, Serialize};
use std::ops::Deref;
use std::str::FromStr;

#[macro_use]
pub(crate) mod ser;
#[cfg(test)]
pub(crate) mod test;

/// A library-local representation of a time, used where key state and
/// coordination records carry a datetime.
///
/// KERI writes these as RFC3339 strings (`2020-08-22T17:50:09.988921+00:00`)
/// which is exactly what chrono's serde support reads and writes.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Create a new Timestamp from the current date/time.
    pub fn now() -> Self {
        Self(Utc::now())
    }
}

impl Deref for Timestamp {
    type Target = DateTime<Utc>;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(date: DateTime<Utc>) -> Self {
        Self(date)
    }
}

impl FromStr for Timestamp {
    type Err = chrono::format::ParseError;
    fn from_str(s: &str) -> std::result::Result<Timestamp, Self::Err> {
        let datetime: DateTime<Utc> = s.parse()?;
        Ok(Timestamp(datetime))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamp_parse_serde() {
        let ts = Timestamp::from_str("2020-08-22T17:50:09.988921+00:00").unwrap();
        let json = serde_json::to_string(&ts).unwrap();
        let ts2: Timestamp = serde_json::from_str(&json).unwrap();
        assert_eq!(ts, ts2);
        assert!(Timestamp::now() > ts);
    }
}
