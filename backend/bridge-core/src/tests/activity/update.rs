// Unit tests for lenient parsing of discord:update data

use crate::activity::ActivityUpdate;

use serde_json::json;

/// **VALUE**: Verifies the host's camelCase field names map onto the update.
#[test]
fn given_full_data_when_parsed_then_all_fields_present() {
    let data = json!({
        "details": "Song",
        "state": "Artist",
        "largeImageKey": "https://cdn/a.png",
        "largeImageText": "Album",
        "smallImageKey": "play",
        "smallImageText": "Playing",
        "startTimestamp": 1700000000,
        "endTimestamp": 1700000300
    });

    let update = ActivityUpdate::from_data(&data);

    assert_eq!(update.details.as_deref(), Some("Song"));
    assert_eq!(update.state.as_deref(), Some("Artist"));
    assert_eq!(update.image.as_deref(), Some("https://cdn/a.png"));
    assert_eq!(update.large_text.as_deref(), Some("Album"));
    assert_eq!(update.small_image.as_deref(), Some("play"));
    assert_eq!(update.small_text.as_deref(), Some("Playing"));
    assert_eq!(update.start, Some(1_700_000_000));
    assert_eq!(update.end, Some(1_700_000_300));
}

/// **VALUE**: Verifies timestamps are coerced to whole seconds from any numeric form.
///
/// **WHY THIS MATTERS**: JavaScript hosts commonly send `Date.now() / 1000` (a float)
/// or stringified numbers.
///
/// **BUG THIS CATCHES**: Would catch a strict `i64` field rejecting the whole update.
#[test]
fn given_float_and_string_timestamps_when_parsed_then_truncated_to_seconds() {
    let data = json!({"startTimestamp": 1700000000.9, "endTimestamp": " 1700000300 "});

    let update = ActivityUpdate::from_data(&data);

    assert_eq!(update.start, Some(1_700_000_000));
    assert_eq!(update.end, Some(1_700_000_300));
}

/// **VALUE**: Verifies uninterpretable values become absent instead of failing.
#[test]
fn given_junk_values_when_parsed_then_treated_as_absent_or_stringified() {
    let data = json!({
        "details": 42,
        "state": null,
        "startTimestamp": "soon",
        "endTimestamp": {"nested": true}
    });

    let update = ActivityUpdate::from_data(&data);

    assert_eq!(update.details.as_deref(), Some("42"));
    assert_eq!(update.state, None);
    assert_eq!(update.start, None);
    assert_eq!(update.end, None);
}

/// **VALUE**: Verifies a non-object `data` yields an empty update.
#[test]
fn given_non_object_data_when_parsed_then_empty_update() {
    assert_eq!(ActivityUpdate::from_data(&json!("text")), ActivityUpdate::default());
    assert_eq!(ActivityUpdate::from_data(&json!(null)), ActivityUpdate::default());
}
