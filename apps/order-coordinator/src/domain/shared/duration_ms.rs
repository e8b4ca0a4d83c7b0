//! Serde helper encoding a [`Duration`] as whole milliseconds.

use std::time::Duration;

use serde::{Deserialize, Deserializer, Serializer};

/// Serialize a duration as milliseconds.
pub fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_u64(u64::try_from(value.as_millis()).unwrap_or(u64::MAX))
}

/// Deserialize a duration from milliseconds.
pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    u64::deserialize(deserializer).map(Duration::from_millis)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde::{Deserialize, Serialize};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Wrapper {
        #[serde(with = "super")]
        timeout: Duration,
    }

    #[test]
    fn encodes_milliseconds() {
        let json = serde_json::to_string(&Wrapper {
            timeout: Duration::from_millis(1500),
        })
        .unwrap();
        assert_eq!(json, r#"{"timeout":1500}"#);

        let parsed: Wrapper = serde_json::from_str(r#"{"timeout":250}"#).unwrap();
        assert_eq!(parsed.timeout, Duration::from_millis(250));
    }
}
