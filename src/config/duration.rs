//! Duration parsing utilities.
//!
//! This module provides parsing for human-readable duration strings
//! like "5s", "30s", "1m", "500ms", plus a serde adapter so the same
//! strings can be written in `devstack.yaml`.

use serde::{Deserialize, Deserializer};
use std::time::Duration;

/// Parse a duration string like "10s", "30s", "1m", "500ms".
///
/// Supported formats:
/// - `"Nms"` - N milliseconds (e.g., "500ms")
/// - `"Ns"` - N seconds (e.g., "30s")
/// - `"Nm"` - N minutes (e.g., "5m")
/// - `"N"` - N seconds (no suffix, assumes seconds)
///
/// Returns `None` if the string cannot be parsed.
///
/// # Examples
///
/// ```
/// use devstack::config::parse_duration_string;
/// use std::time::Duration;
///
/// assert_eq!(parse_duration_string("5s"), Some(Duration::from_secs(5)));
/// assert_eq!(parse_duration_string("500ms"), Some(Duration::from_millis(500)));
/// assert_eq!(parse_duration_string("1m"), Some(Duration::from_secs(60)));
/// ```
pub fn parse_duration_string(s: &str) -> Option<Duration> {
    let s = s.trim();

    if s.is_empty() {
        return None;
    }

    if let Some(ms) = s.strip_suffix("ms") {
        ms.parse::<u64>().ok().map(Duration::from_millis)
    } else if let Some(secs) = s.strip_suffix('s') {
        secs.parse::<u64>().ok().map(Duration::from_secs)
    } else if let Some(mins) = s.strip_suffix('m') {
        mins.parse::<u64>()
            .ok()
            .and_then(|m| m.checked_mul(60))
            .map(Duration::from_secs)
    } else {
        s.parse::<u64>().ok().map(Duration::from_secs)
    }
}

/// `#[serde(deserialize_with = "...")]` adapter accepting either a duration
/// string or a bare number of seconds.
pub fn deserialize_duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Secs(u64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Secs(secs) => Ok(Duration::from_secs(secs)),
        Raw::Text(text) => parse_duration_string(&text).ok_or_else(|| {
            serde::de::Error::custom(format!(
                "invalid duration '{}': expected e.g. \"500ms\", \"5s\" or \"1m\"",
                text
            ))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_duration_units() {
        assert_eq!(parse_duration_string("5s"), Some(Duration::from_secs(5)));
        assert_eq!(parse_duration_string("2m"), Some(Duration::from_secs(120)));
        assert_eq!(
            parse_duration_string("250ms"),
            Some(Duration::from_millis(250))
        );
        assert_eq!(parse_duration_string("10"), Some(Duration::from_secs(10)));
        assert_eq!(parse_duration_string(" 3s "), Some(Duration::from_secs(3)));
    }

    #[test]
    fn test_parse_duration_invalid() {
        assert_eq!(parse_duration_string(""), None);
        assert_eq!(parse_duration_string("soon"), None);
        assert_eq!(parse_duration_string("5x"), None);
        assert_eq!(parse_duration_string("-5s"), None);
        // Minutes that do not fit in u64 seconds.
        assert_eq!(parse_duration_string("18446744073709551615m"), None);
        assert_eq!(parse_duration_string("307445734561825861m"), None);
        assert_eq!(
            parse_duration_string("307445734561825860m"),
            Some(Duration::from_secs(307445734561825860 * 60))
        );
    }

    #[test]
    fn test_deserialize_duration_forms() {
        #[derive(Deserialize)]
        struct Holder {
            #[serde(deserialize_with = "deserialize_duration")]
            wait: Duration,
        }

        let text: Holder = serde_yaml::from_str("wait: 1500ms").unwrap();
        assert_eq!(text.wait, Duration::from_millis(1500));

        let secs: Holder = serde_yaml::from_str("wait: 7").unwrap();
        assert_eq!(secs.wait, Duration::from_secs(7));

        assert!(serde_yaml::from_str::<Holder>("wait: later").is_err());
    }
}
