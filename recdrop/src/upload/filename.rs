//! Filename derivation for stored recordings.
//!
//! Every recording is stored as `recording_<room>_<timestamp>.webm`. The room is reduced to
//! `[A-Za-z0-9_.-]`, and colons in the timestamp become hyphens. There is no uniqueness suffix:
//! two uploads with the same room and timestamp map to the same file, and the last one to finish
//! wins.

use chrono::{DateTime, SecondsFormat, Utc};

pub const RECORDING_PREFIX: &str = "recording_";
pub const RECORDING_EXTENSION: &str = ".webm";

/// Room used when the request does not name one.
pub const DEFAULT_ROOM: &str = "call";

/// Replace every character that is not alphanumeric, `_`, `.` or `-` with `_`.
pub fn sanitize_room(room: &str) -> String {
    room.chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-') { c } else { '_' })
        .collect()
}

/// Replace every `:` with `-`. Nothing else is touched.
pub fn sanitize_timestamp(timestamp: &str) -> String {
    timestamp.replace(':', "-")
}

/// Build the on-disk filename for a recording. Never fails, even for empty inputs.
pub fn derive_filename(room: &str, timestamp: &str) -> String {
    format!(
        "{RECORDING_PREFIX}{}_{}{RECORDING_EXTENSION}",
        sanitize_room(room),
        sanitize_timestamp(timestamp)
    )
}

/// Format an instant the way browsers format `Date.toISOString()`, e.g. `2024-01-01T00:00:00.000Z`.
pub fn iso_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Room and timestamp of one upload after defaults have been applied.
///
/// These are the raw values echoed back to the client; sanitization only happens in
/// [`RecordingMetadata::filename`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordingMetadata {
    pub room: String,
    pub timestamp: String,
}

impl RecordingMetadata {
    /// Apply defaults: a missing or empty room becomes [`DEFAULT_ROOM`], a missing or empty
    /// timestamp becomes `now`.
    pub fn resolve(room: Option<String>, timestamp: Option<String>, now: DateTime<Utc>) -> Self {
        Self {
            room: room.filter(|r| !r.is_empty()).unwrap_or_else(|| DEFAULT_ROOM.to_string()),
            timestamp: timestamp.filter(|t| !t.is_empty()).unwrap_or_else(|| iso_timestamp(now)),
        }
    }

    pub fn filename(&self) -> String {
        derive_filename(&self.room, &self.timestamp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn is_safe_room_char(c: char) -> bool {
        c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-')
    }

    #[test]
    fn test_derive_filename() {
        assert_eq!(
            derive_filename("room 1", "2024-01-01T00:00:00.000Z"),
            "recording_room_1_2024-01-01T00-00-00.000Z.webm"
        );
        assert_eq!(derive_filename("team.a-1_b", "x"), "recording_team.a-1_b_x.webm");
    }

    #[test]
    fn test_empty_inputs() {
        assert_eq!(derive_filename("", ""), "recording__.webm");
        assert_eq!(derive_filename("", "2024"), "recording__2024.webm");
    }

    #[test]
    fn test_sanitize_room_replaces_unsafe_characters() {
        assert_eq!(sanitize_room("a/b\\c"), "a_b_c");
        assert_eq!(sanitize_room("../etc"), ".._etc");
        assert_eq!(sanitize_room("héllo wörld"), "h_llo_w_rld");
        assert_eq!(sanitize_room("日本"), "__");
    }

    #[test]
    fn test_sanitize_room_output_alphabet_and_idempotence() {
        let samples = [
            "",
            "call",
            "room 1",
            "   ",
            "<script>alert(1)</script>",
            "tab\there",
            "emoji 🎙️ room",
            "semi;colon:and,comma",
            "UPPER_lower.123-x",
        ];

        for sample in samples {
            let once = sanitize_room(sample);
            assert!(once.chars().all(is_safe_room_char), "unsafe output for {sample:?}: {once:?}");
            assert_eq!(sanitize_room(&once), once, "not idempotent for {sample:?}");
            assert_eq!(once.chars().count(), sample.chars().count());
        }
    }

    #[test]
    fn test_sanitize_timestamp_idempotent_and_length_preserving() {
        let samples = ["", "2024-01-01T00:00:00.000Z", ":::", "no colons", "12:30 pm"];

        for sample in samples {
            let once = sanitize_timestamp(sample);
            assert!(!once.contains(':'));
            assert_eq!(sanitize_timestamp(&once), once);
            assert_eq!(once.chars().count(), sample.chars().count());
        }
    }

    #[test]
    fn test_timestamp_only_colons_replaced() {
        assert_eq!(sanitize_timestamp("2024/01/01 12:00"), "2024/01/01 12-00");
    }

    #[test]
    fn test_resolve_defaults() {
        let now = Utc.with_ymd_and_hms(2024, 3, 5, 7, 8, 9).unwrap();

        let metadata = RecordingMetadata::resolve(None, None, now);
        assert_eq!(metadata.room, "call");
        assert_eq!(metadata.timestamp, "2024-03-05T07:08:09.000Z");
        assert_eq!(metadata.filename(), "recording_call_2024-03-05T07-08-09.000Z.webm");

        let metadata = RecordingMetadata::resolve(Some(String::new()), Some(String::new()), now);
        assert_eq!(metadata.room, "call");
        assert_eq!(metadata.timestamp, "2024-03-05T07:08:09.000Z");
    }

    #[test]
    fn test_resolve_keeps_raw_values() {
        let now = Utc::now();
        let metadata = RecordingMetadata::resolve(Some("room 1".to_string()), Some("t:1".to_string()), now);

        assert_eq!(metadata.room, "room 1");
        assert_eq!(metadata.timestamp, "t:1");
        assert_eq!(metadata.filename(), "recording_room_1_t-1.webm");
    }
}
