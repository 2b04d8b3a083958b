use serde::Deserialize;

/// Discord trims trailing whitespace from activity lines; the Hangul filler
/// run keeps short labels from collapsing in the profile card.
const ACTIVITY_PAD: &str = "\u{1160}\u{1160}\u{1160}";

const TITLE_PREFIX: &str = "Current track:";
const MAX_LABEL_CHARS: usize = 128;
const TRUNCATED_CHARS: usize = 125;

/// Playback fields read from the hosted page in one cycle. Absent elements
/// degrade to empty strings inside the query script, so every field is
/// always present.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackSnapshot {
    pub is_playing: bool,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub artwork_url: String,
    #[serde(default)]
    pub elapsed_label: String,
    #[serde(default)]
    pub total_label: String,
}

/// The derived "listening" activity submitted to Discord.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresenceRecord {
    pub details: String,
    pub state: String,
    pub large_image_key: String,
    pub start_ms: i64,
    pub end_ms: i64,
}

impl PresenceRecord {
    /// Compose the activity for a playing snapshot at wall-clock `now_ms`.
    ///
    /// `start = now - elapsed`, `end = now + (total - elapsed)`; a total
    /// shorter than the elapsed time saturates to an end of `now`.
    pub fn compose(snapshot: &TrackSnapshot, now_ms: i64) -> Self {
        let elapsed = parse_time_label(&snapshot.elapsed_label);
        let total = parse_time_label(&snapshot.total_label);
        let remaining = total.saturating_sub(elapsed);

        let title = normalize_title(&snapshot.title);

        Self {
            details: format!("{}{}", shorten(&title), ACTIVITY_PAD),
            state: format!("{}{}", shorten(&snapshot.author), ACTIVITY_PAD),
            large_image_key: artwork_image_key(&snapshot.artwork_url),
            start_ms: now_ms - elapsed as i64,
            end_ms: now_ms + remaining as i64,
        }
    }
}

/// Parse an `mm:ss` / `h:mm:ss` label into milliseconds.
///
/// Parts fold most-significant-first as `acc * 60 + part`; a part that fails
/// numeric conversion contributes 0, so the empty label parses to 0 ms.
pub fn parse_time_label(label: &str) -> u64 {
    label
        .split(':')
        .map(|part| part.trim().parse::<u64>().unwrap_or(0))
        .fold(0u64, |acc, part| acc.saturating_mul(60).saturating_add(part))
        .saturating_mul(1000)
}

/// Drop everything from the first line break onward, then strip the literal
/// `Current track:` prefix the badge sometimes carries.
pub fn normalize_title(raw: &str) -> String {
    let first_line = raw.split('\n').next().unwrap_or("");
    first_line
        .strip_prefix(TITLE_PREFIX)
        .unwrap_or(first_line)
        .trim()
        .to_string()
}

/// Keep the first 125 characters plus a `...` marker when a label exceeds
/// 128 characters; shorter labels pass through unchanged.
pub fn shorten(label: &str) -> String {
    if label.chars().count() > MAX_LABEL_CHARS {
        let head: String = label.chars().take(TRUNCATED_CHARS).collect();
        format!("{head}...")
    } else {
        label.to_string()
    }
}

/// Turn the badge's inline `background-image` value into a Discord image key:
/// shed any `url(...)` wrapper and swap the low-resolution size token for the
/// high-resolution one.
pub fn artwork_image_key(raw: &str) -> String {
    let inner = raw
        .trim()
        .strip_prefix("url(")
        .and_then(|rest| rest.strip_suffix(')'))
        .unwrap_or(raw.trim());
    let inner = inner.trim_matches(|c| c == '"' || c == '\'');
    inner.replacen("50x50.", "500x500.", 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minutes_and_seconds() {
        assert_eq!(parse_time_label("3:45"), 225_000);
    }

    #[test]
    fn parses_hours_minutes_seconds() {
        assert_eq!(parse_time_label("1:02:03"), 3_723_000);
    }

    #[test]
    fn empty_label_parses_to_zero() {
        assert_eq!(parse_time_label(""), 0);
    }

    #[test]
    fn malformed_parts_contribute_zero() {
        // "x" fails conversion, so only the seconds survive.
        assert_eq!(parse_time_label("x:30"), 30_000);
        assert_eq!(parse_time_label("--"), 0);
    }

    #[test]
    fn absurd_labels_saturate_instead_of_overflowing() {
        assert_eq!(
            parse_time_label("18446744073709551615:59"),
            u64::MAX
        );
    }

    #[test]
    fn shorten_truncates_long_labels() {
        let long: String = "a".repeat(200);
        let out = shorten(&long);
        assert_eq!(out.chars().count(), 128);
        assert!(out.ends_with("..."));
        assert_eq!(&out[..125], &long[..125]);
    }

    #[test]
    fn shorten_keeps_short_labels() {
        let short: String = "b".repeat(100);
        assert_eq!(shorten(&short), short);
    }

    #[test]
    fn title_cuts_at_newline_then_strips_prefix() {
        assert_eq!(
            normalize_title("Current track: Song Name\nby Someone"),
            "Song Name"
        );
    }

    #[test]
    fn title_without_prefix_passes_through() {
        assert_eq!(normalize_title("Plain Title"), "Plain Title");
    }

    #[test]
    fn artwork_key_strips_wrapper_and_upsizes() {
        assert_eq!(
            artwork_image_key("url(\"https://i1.sndcdn.com/artworks-abc-50x50.jpg\")"),
            "https://i1.sndcdn.com/artworks-abc-500x500.jpg"
        );
        assert_eq!(
            artwork_image_key("https://i1.sndcdn.com/artworks-abc-50x50.jpg"),
            "https://i1.sndcdn.com/artworks-abc-500x500.jpg"
        );
    }

    #[test]
    fn compose_honors_timestamp_invariant() {
        let snapshot = TrackSnapshot {
            is_playing: true,
            title: "Song".into(),
            author: "Artist".into(),
            artwork_url: String::new(),
            elapsed_label: "0:30".into(),
            total_label: "3:20".into(),
        };
        let now = 1_700_000_000_000;
        let record = PresenceRecord::compose(&snapshot, now);
        assert_eq!(record.start_ms, now - 30_000);
        assert_eq!(record.end_ms, now + 170_000);
    }

    #[test]
    fn compose_saturates_when_total_precedes_elapsed() {
        let snapshot = TrackSnapshot {
            is_playing: true,
            elapsed_label: "2:00".into(),
            total_label: "1:00".into(),
            ..Default::default()
        };
        let now = 1_700_000_000_000;
        let record = PresenceRecord::compose(&snapshot, now);
        assert_eq!(record.end_ms, now);
    }

    #[test]
    fn compose_appends_padding_to_both_lines() {
        let snapshot = TrackSnapshot {
            is_playing: true,
            title: "Song".into(),
            author: "Artist".into(),
            ..Default::default()
        };
        let record = PresenceRecord::compose(&snapshot, 0);
        assert!(record.details.starts_with("Song"));
        assert!(record.details.ends_with(ACTIVITY_PAD));
        assert!(record.state.ends_with(ACTIVITY_PAD));
    }
}
