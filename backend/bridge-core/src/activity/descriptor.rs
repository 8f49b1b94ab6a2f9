use crate::activity::update::ActivityUpdate;
use crate::config::PresenceDefaults;

use serde::{Serialize, Serializer};

const URL_SCHEMES: [&str; 2] = ["http://", "https://"];

/// A fully resolved presence, ready to send.
///
/// Serializes to the activity object Discord expects inside
/// `SET_ACTIVITY`: `{details, state, type, assets, timestamps?}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityDescriptor {
    pub details: String,
    pub state: String,
    /// Asset key registered with the Discord application, or an image URL.
    pub large_image: String,
    pub large_text: String,
    pub start: Option<i64>,
    pub end: Option<i64>,
    pub small_image: Option<String>,
    pub small_text: Option<String>,
    pub activity_type: u8,
}

impl ActivityDescriptor {
    /// The presence shown when nothing is playing.
    pub fn idle(defaults: &PresenceDefaults) -> Self {
        build_descriptor(&ActivityUpdate::default(), defaults)
    }
}

/// Apply defaults and the image policy to a raw update.
pub fn build_descriptor(update: &ActivityUpdate, defaults: &PresenceDefaults) -> ActivityDescriptor {
    let small_image = non_empty(update.small_image.as_deref()).map(str::to_string);
    let small_text = small_image
        .as_ref()
        .map(|_| update.small_text.clone().unwrap_or_default());

    ActivityDescriptor {
        details: non_empty(update.details.as_deref())
            .unwrap_or(&defaults.idle_details)
            .to_string(),
        state: non_empty(update.state.as_deref())
            .unwrap_or(&defaults.product_name)
            .to_string(),
        large_image: resolve_large_image(update.image.as_deref(), &defaults.fallback_image),
        large_text: non_empty(update.large_text.as_deref())
            .unwrap_or(&defaults.product_name)
            .to_string(),
        start: update.start.filter(|secs| *secs > 0),
        end: update.end.filter(|secs| *secs > 0),
        small_image,
        small_text,
        activity_type: defaults.activity_type,
    }
}

/// URLs and literal asset keys pass through; a missing image becomes `fallback`.
pub fn resolve_large_image(image: Option<&str>, fallback: &str) -> String {
    match non_empty(image) {
        Some(url) if is_url(url) => url.to_string(),
        Some(key) => key.to_string(),
        None => fallback.to_string(),
    }
}

fn is_url(value: &str) -> bool {
    URL_SCHEMES.iter().any(|scheme| {
        value
            .get(..scheme.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(scheme))
    })
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Content fingerprint of a descriptor.
///
/// Every field contributes, in declaration order, length-prefixed so that
/// field boundaries can never collide (`"a-b" + "c"` vs `"a" + "b-c"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupKey(String);

impl DedupKey {
    pub fn of(descriptor: &ActivityDescriptor) -> Self {
        let start = descriptor.start.map(|s| s.to_string());
        let end = descriptor.end.map(|s| s.to_string());
        let activity_type = descriptor.activity_type.to_string();

        let fields = [
            Some(descriptor.details.as_str()),
            Some(descriptor.state.as_str()),
            Some(descriptor.large_image.as_str()),
            Some(descriptor.large_text.as_str()),
            start.as_deref(),
            end.as_deref(),
            descriptor.small_image.as_deref(),
            descriptor.small_text.as_deref(),
            Some(activity_type.as_str()),
        ];

        let mut key = String::new();
        for field in fields {
            match field {
                Some(value) => {
                    key.push_str(&value.len().to_string());
                    key.push(':');
                    key.push_str(value);
                }
                None => key.push('~'),
            }
            key.push('|');
        }

        DedupKey(key)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Serialize)]
struct WireActivity<'a> {
    details: &'a str,
    state: &'a str,
    #[serde(rename = "type")]
    activity_type: u8,
    assets: WireAssets<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    timestamps: Option<WireTimestamps>,
}

#[derive(Serialize)]
struct WireAssets<'a> {
    large_image: &'a str,
    large_text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    small_image: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    small_text: Option<&'a str>,
}

#[derive(Serialize)]
struct WireTimestamps {
    #[serde(skip_serializing_if = "Option::is_none")]
    start: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    end: Option<i64>,
}

impl Serialize for ActivityDescriptor {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let timestamps = (self.start.is_some() || self.end.is_some()).then_some(WireTimestamps {
            start: self.start,
            end: self.end,
        });

        WireActivity {
            details: &self.details,
            state: &self.state,
            activity_type: self.activity_type,
            assets: WireAssets {
                large_image: &self.large_image,
                large_text: &self.large_text,
                small_image: self.small_image.as_deref(),
                small_text: self.small_text.as_deref(),
            },
            timestamps,
        }
        .serialize(serializer)
    }
}
