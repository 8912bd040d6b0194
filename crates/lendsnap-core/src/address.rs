//! Lowercase-normalized account and asset addresses.
//!
//! Address identity in the upstream event streams is case-insensitive: the
//! same account may appear checksummed in one event and lowercase in the
//! next. `Address` normalizes on every construction path — including
//! deserialization — so map keys and set members always compare equal.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// A lowercase-normalized address (`0x…`).
///
/// Ordering is byte order on the normalized form, which gives
/// `BTreeSet`/`BTreeMap` a stable iteration order for serialization.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    /// Normalize `raw` to its canonical lowercase form.
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(raw.as_ref().to_ascii_lowercase())
    }

    /// The normalized form.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` if the address is the empty string.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Address {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for Address {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

// Manual impl rather than derive: incoming data (event rows, prior
// artifacts) must be normalized too, not just values built in-process.
impl<'de> Deserialize<'de> for Address {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::new(raw))
    }
}
