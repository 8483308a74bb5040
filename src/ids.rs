use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Request identifier backed by a ULID, carried through every log event of a request.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug)]
pub struct RequestId(pub ulid::Ulid);

impl RequestId {
    #[must_use]
    pub fn new() -> Self {
        Self(ulid::Ulid::new())
    }

    /// Reuse a valid incoming `x-request-id`, otherwise mint a new one.
    #[must_use]
    pub fn from_header_or_new(header_value: Option<&str>) -> Self {
        header_value
            .and_then(|s| s.trim().parse::<RequestId>().ok())
            .unwrap_or_default()
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for RequestId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RequestId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(RequestId(ulid::Ulid::from_string(s)?))
    }
}

impl Serialize for RequestId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for RequestId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse::<RequestId>()
            .map_err(|_| serde::de::Error::custom("invalid request id"))
    }
}
