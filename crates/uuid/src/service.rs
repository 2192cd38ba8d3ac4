//! Internal implementation of the identifier types.

use crate::{UuidError, UuidResult};
use chrono::{DateTime, Duration, Utc};
use std::path::{Path, PathBuf};
use std::{fmt, str::FromStr};

/// Re-exported for convenience.
pub use ::uuid::Uuid;

/// HealthBot's canonical record identifier (32 lowercase hex characters, no hyphens).
///
/// Once constructed, the contained UUID is guaranteed to be in canonical form, so it can be used
/// directly to derive storage paths.
///
/// # Construction
/// - [`RecordId::new`] generates a fresh identifier (new accounts, new chat sessions).
/// - [`RecordId::parse`] validates an externally supplied identifier.
///
/// # Display format
/// Always the canonical 32-character lowercase hex form.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId(Uuid);

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordId {
    /// Generates a new random (v4) identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Validates and parses an identifier that must already be in canonical form.
    ///
    /// Hyphenated or uppercase forms are **not** normalised; they are rejected so that one
    /// record can never be reachable under two spellings.
    ///
    /// # Errors
    ///
    /// Returns [`UuidError::InvalidInput`] if `input` is not canonical.
    pub fn parse(input: &str) -> UuidResult<Self> {
        if !Self::is_canonical(input) {
            return Err(UuidError::InvalidInput(format!(
                "UUID must be 32 lowercase hex characters without hyphens, got: '{}'",
                input
            )));
        }
        Uuid::parse_str(input)
            .map(Self)
            .map_err(|e| UuidError::InvalidInput(format!("invalid UUID '{}': {}", input, e)))
    }

    /// Returns the underlying `uuid::Uuid`.
    pub fn uuid(&self) -> Uuid {
        self.0
    }

    /// Returns true if `input` is exactly 32 lowercase hex characters.
    pub fn is_canonical(input: &str) -> bool {
        input.len() == 32
            && input
                .bytes()
                .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
    }

    /// Returns `parent_dir/<s1>/<s2>/<id>/` where `s1`/`s2` are the first two pairs of hex
    /// characters of this identifier.
    pub fn sharded_dir(&self, parent_dir: &Path) -> PathBuf {
        let canonical = self.0.simple().to_string();
        let s1 = &canonical[0..2];
        let s2 = &canonical[2..4];
        parent_dir.join(s1).join(s2).join(&canonical)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

impl FromStr for RecordId {
    type Err = UuidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RecordId::parse(s)
    }
}

/// A time-prefixed identifier.
///
/// Format: `YYYYMMDDTHHMMSS.mmmZ-<canonical_uuid>`
///
/// Ordering compares the timestamp first, then the UUID, which matches the lexicographic
/// ordering of the string form.
///
/// # Monotonicity
///
/// [`TimestampId::generate`] called with the previous identifier always yields a strictly later
/// timestamp (bumped by 1 ms if the clock has not advanced). Callers that need a strict order,
/// such as messages within a chat session, must generate under a lock.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimestampId {
    timestamp: DateTime<Utc>,
    uuid: RecordId,
}

impl TimestampId {
    const FORMAT: &'static str = "%Y%m%dT%H%M%S%.3f";

    /// Generates a new identifier, strictly later than `last` when one is given.
    pub fn generate(last: Option<&TimestampId>) -> Self {
        Self::generate_at(Utc::now(), last)
    }

    /// As [`TimestampId::generate`], with an explicit clock reading.
    pub fn generate_at(now: DateTime<Utc>, last: Option<&TimestampId>) -> Self {
        // Truncate to millisecond precision so the value survives a Display/parse round trip.
        let now = DateTime::<Utc>::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now);

        let timestamp = match last {
            Some(prev) if now <= prev.timestamp => prev.timestamp + Duration::milliseconds(1),
            _ => now,
        };

        Self {
            timestamp,
            uuid: RecordId::new(),
        }
    }

    /// Returns the timestamp component.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Returns the UUID component.
    pub fn uuid(&self) -> &RecordId {
        &self.uuid
    }
}

impl FromStr for TimestampId {
    type Err = UuidError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (ts_str, uuid_str) = s.split_once('-').ok_or_else(|| {
            UuidError::InvalidInput(format!("Invalid timestamp id format: '{}'", s))
        })?;

        let ts_no_z = ts_str.strip_suffix('Z').ok_or_else(|| {
            UuidError::InvalidInput(format!("Timestamp must end with 'Z': '{}'", ts_str))
        })?;

        let naive = chrono::NaiveDateTime::parse_from_str(ts_no_z, Self::FORMAT).map_err(|e| {
            UuidError::InvalidInput(format!("Invalid timestamp format '{}': {}", ts_str, e))
        })?;

        Ok(Self {
            timestamp: DateTime::<Utc>::from_naive_utc_and_offset(naive, Utc),
            uuid: RecordId::parse(uuid_str)?,
        })
    }
}

impl fmt::Display for TimestampId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}Z-{}",
            self.timestamp.format(Self::FORMAT),
            self.uuid
        )
    }
}

#[cfg(feature = "serde")]
mod serde_impls {
    use super::{RecordId, TimestampId};
    use std::str::FromStr;

    impl serde::Serialize for RecordId {
        fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            serializer.collect_str(self)
        }
    }

    impl<'de> serde::Deserialize<'de> for RecordId {
        fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            let s = String::deserialize(deserializer)?;
            RecordId::parse(&s).map_err(serde::de::Error::custom)
        }
    }

    impl serde::Serialize for TimestampId {
        fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            serializer.collect_str(self)
        }
    }

    impl<'de> serde::Deserialize<'de> for TimestampId {
        fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            let s = String::deserialize(deserializer)?;
            TimestampId::from_str(&s).map_err(serde::de::Error::custom)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const CANONICAL: &str = "550e8400e29b41d4a716446655440000";

    #[test]
    fn test_new_generates_canonical_id() {
        let id = RecordId::new();
        assert!(RecordId::is_canonical(&id.to_string()));
    }

    #[test]
    fn test_parse_valid_canonical_uuid() {
        let id = RecordId::parse(CANONICAL).unwrap();
        assert_eq!(id.to_string(), CANONICAL);
        assert_eq!(id.uuid().simple().to_string(), CANONICAL);
    }

    #[test]
    fn test_parse_rejects_non_canonical_forms() {
        for bad in [
            "550e8400-e29b-41d4-a716-446655440000",
            "550E8400E29B41D4A716446655440000",
            "550e8400e29b41d4a71644665544000",
            "550e8400e29b41d4a7164466554400000",
            "550e8400e29b41d4a716446655440zzz",
            "",
        ] {
            match RecordId::parse(bad) {
                Err(UuidError::InvalidInput(msg)) => {
                    assert!(msg.contains("32 lowercase hex characters"), "{bad}")
                }
                Ok(_) => panic!("{bad} should be rejected"),
            }
        }
    }

    #[test]
    fn test_sharded_dir_structure() {
        let id = RecordId::parse(CANONICAL).unwrap();
        let sharded = id.sharded_dir(Path::new("/healthbot_data/users"));

        assert_eq!(
            sharded,
            PathBuf::from("/healthbot_data/users/55/0e/550e8400e29b41d4a716446655440000")
        );
    }

    #[test]
    fn test_from_str_matches_parse() {
        let parsed: RecordId = CANONICAL.parse().unwrap();
        assert_eq!(parsed, RecordId::parse(CANONICAL).unwrap());
        assert!("not-an-id".parse::<RecordId>().is_err());
    }

    #[test]
    fn test_record_id_serde_uses_canonical_string() {
        let id = RecordId::parse(CANONICAL).unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{CANONICAL}\""));
        let back: RecordId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
        assert!(serde_json::from_str::<RecordId>("\"550E8400\"").is_err());
    }

    #[test]
    fn test_timestamp_id_generate_monotonic_same_instant() {
        let now = Utc.with_ymd_and_hms(2026, 1, 11, 14, 35, 22).unwrap();
        let first = TimestampId::generate_at(now, None);
        let second = TimestampId::generate_at(now, Some(&first));

        assert!(second.timestamp() > first.timestamp());
        assert!(second > first);
        assert!(second.to_string() > first.to_string());
    }

    #[test]
    fn test_timestamp_id_display_format() {
        let now = Utc.with_ymd_and_hms(2026, 1, 11, 14, 35, 22).unwrap();
        let id = TimestampId::generate_at(now, None);
        let displayed = id.to_string();

        let (ts, uuid) = displayed.split_once('-').unwrap();
        assert_eq!(ts, "20260111T143522.000Z");
        assert!(RecordId::is_canonical(uuid));
    }

    #[test]
    fn test_timestamp_id_round_trip() {
        let original = "20260111T143522.045Z-550e8400e29b41d4a716446655440000";
        let parsed = TimestampId::from_str(original).unwrap();

        assert_eq!(parsed.to_string(), original);
        assert_eq!(parsed.uuid().to_string(), CANONICAL);
    }

    #[test]
    fn test_timestamp_id_generated_value_round_trips() {
        let id = TimestampId::generate(None);
        let parsed = TimestampId::from_str(&id.to_string()).unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_timestamp_id_parse_errors() {
        let cases = [
            ("20260111T143522.045Z550e8400e29b41d4a716446655440000", "Invalid timestamp id format"),
            ("20260111T143522.045-550e8400e29b41d4a716446655440000", "must end with 'Z'"),
            ("20260199T143522.045Z-550e8400e29b41d4a716446655440000", "Invalid timestamp format"),
        ];
        for (input, expected) in cases {
            match TimestampId::from_str(input) {
                Err(UuidError::InvalidInput(msg)) => assert!(msg.contains(expected), "{msg}"),
                Ok(_) => panic!("{input} should be rejected"),
            }
        }
        assert!(TimestampId::from_str("20260111T143522.045Z-not-a-valid-uuid").is_err());
    }
}
