use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{Result, anyhow, bail};

/// The server stores "never expires" as this far-future timestamp.
pub const NEVER: &str = "2999-12-31T00:00:00Z";
pub const DEFAULT_LIFETIME: &str = "30d";

const MAX_RFC3339_SECS: u64 = 253_402_300_800;

/// Picks the expiration timestamp to send: an explicit timestamp wins, then
/// a lifetime, then the configured default, then [`DEFAULT_LIFETIME`].
pub fn resolve(
    expires_at: Option<&str>,
    expires_in: Option<&str>,
    default: Option<&str>,
) -> Result<String> {
    resolve_at(expires_at, expires_in, default, SystemTime::now())
}

fn resolve_at(
    expires_at: Option<&str>,
    expires_in: Option<&str>,
    default: Option<&str>,
    now: SystemTime,
) -> Result<String> {
    if let Some(timestamp) = expires_at {
        return parse_timestamp(timestamp);
    }
    if let Some(lifetime) = expires_in {
        return from_lifetime(lifetime, now);
    }
    match default {
        Some(default) => from_lifetime(default, now).or_else(|_| parse_timestamp(default)),
        None => from_lifetime(DEFAULT_LIFETIME, now),
    }
}

fn parse_timestamp(timestamp: &str) -> Result<String> {
    humantime::parse_rfc3339(timestamp)
        .map_err(|e| anyhow!("Invalid expiration time '{timestamp}': {e}"))?;
    Ok(timestamp.to_string())
}

fn from_lifetime(lifetime: &str, now: SystemTime) -> Result<String> {
    if lifetime.eq_ignore_ascii_case("never") {
        return Ok(NEVER.to_string());
    }
    let duration = humantime::parse_duration(lifetime)
        .map_err(|e| anyhow!("Invalid file lifetime '{lifetime}': {e}"))?;
    if duration.is_zero() {
        bail!("File lifetime must be longer than zero");
    }
    let expires = now
        .checked_add(duration)
        .filter(|expires| *expires < latest_timestamp())
        .ok_or_else(|| anyhow!("File lifetime is too long"))?;
    Ok(humantime::format_rfc3339_seconds(expires).to_string())
}

/// RFC 3339 has four year digits, so nothing from 10000-01-01 on.
fn latest_timestamp() -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(MAX_RFC3339_SECS)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> SystemTime {
        humantime::parse_rfc3339("2030-01-01T00:00:00Z").unwrap()
    }

    #[test]
    fn test_lifetime_is_added_to_now() {
        let expiration = resolve_at(None, Some("1day 3h"), None, now()).unwrap();
        assert_eq!(expiration, "2030-01-02T03:00:00Z");
    }

    #[test]
    fn test_explicit_timestamp_passes_through() {
        let expiration =
            resolve_at(Some("2030-01-02T03:04:25Z"), Some("5d"), None, now()).unwrap();
        assert_eq!(expiration, "2030-01-02T03:04:25Z");
    }

    #[test]
    fn test_never() {
        assert_eq!(resolve_at(None, Some("never"), None, now()).unwrap(), NEVER);
    }

    #[test]
    fn test_defaults() {
        assert_eq!(
            resolve_at(None, None, None, now()).unwrap(),
            "2030-01-31T00:00:00Z"
        );
        assert_eq!(
            resolve_at(None, None, Some("7d"), now()).unwrap(),
            "2030-01-08T00:00:00Z"
        );
        assert_eq!(
            resolve_at(None, None, Some("2031-06-01T00:00:00Z"), now()).unwrap(),
            "2031-06-01T00:00:00Z"
        );
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!(resolve_at(Some("tomorrow"), None, None, now()).is_err());
        assert!(resolve_at(None, Some("soon"), None, now()).is_err());
        assert!(resolve_at(None, Some("0s"), None, now()).is_err());
    }

    #[test]
    fn test_lifetime_past_year_9999_is_rejected() {
        for lifetime in ["10000y", "500000000000y"] {
            let err = resolve_at(None, Some(lifetime), None, now()).unwrap_err();
            assert_eq!(err.to_string(), "File lifetime is too long");
        }
        assert_eq!(
            resolve_at(None, Some("7000y"), None, now())
                .unwrap()
                .len(),
            "2030-01-01T00:00:00Z".len()
        );
    }
}
