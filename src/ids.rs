use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::time::SystemTime;
use ulid::Ulid;

/// Identifier attached to every [`HttpRequest`](crate::http::HttpRequest)
///
/// Logged as `request_id` on both lanes so a worker-side failure can be
/// matched with the callback that reported it. ULIDs sort by creation time,
/// so ordering ids orders requests.
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
pub struct RequestId(Ulid);

impl RequestId {
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }

    #[must_use]
    pub fn as_ulid(&self) -> Ulid {
        self.0
    }

    /// When the request was constructed, from the id's timestamp bits
    #[must_use]
    pub fn created_at(&self) -> SystemTime {
        self.0.datetime()
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Ulid> for RequestId {
    fn from(id: Ulid) -> Self {
        Self(id)
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for RequestId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ulid::from_string(s).map(Self)
    }
}

impl Serialize for RequestId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RequestId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse()
            .map_err(|e| de::Error::custom(format!("invalid request id '{}': {}", raw, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_ids_are_unique_and_ordered() {
        let first = RequestId::new();
        std::thread::sleep(Duration::from_millis(2));
        let second = RequestId::new();
        assert_ne!(first, second);
        assert!(first < second);
        assert!(first.created_at() <= second.created_at());
    }

    #[test]
    fn test_text_form() {
        let id = RequestId::new();
        let parsed: RequestId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
        assert_eq!(parsed.as_ulid(), id.as_ulid());
        assert!("not-a-ulid".parse::<RequestId>().is_err());
    }

    #[test]
    fn test_serde_uses_text_form() {
        let id = RequestId::from(Ulid::nil());
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"00000000000000000000000000\"");
        let back: RequestId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
        assert!(serde_json::from_str::<RequestId>("\"nope\"").is_err());
    }
}
