use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Fields of a `discord:update` event's `data` object, as the host sent them.
///
/// Hosts are loosely typed: strings may arrive as numbers and timestamps as
/// floats or numeric strings, so every field is parsed leniently. Values
/// that cannot be interpreted are treated as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ActivityUpdate {
    #[serde(deserialize_with = "lenient_string")]
    pub details: Option<String>,

    #[serde(deserialize_with = "lenient_string")]
    pub state: Option<String>,

    #[serde(rename = "largeImageKey", deserialize_with = "lenient_string")]
    pub image: Option<String>,

    #[serde(rename = "startTimestamp", deserialize_with = "lenient_seconds")]
    pub start: Option<i64>,

    #[serde(rename = "endTimestamp", deserialize_with = "lenient_seconds")]
    pub end: Option<i64>,

    #[serde(rename = "largeImageText", deserialize_with = "lenient_string")]
    pub large_text: Option<String>,

    #[serde(rename = "smallImageKey", deserialize_with = "lenient_string")]
    pub small_image: Option<String>,

    #[serde(rename = "smallImageText", deserialize_with = "lenient_string")]
    pub small_text: Option<String>,
}

impl ActivityUpdate {
    /// Parse an event's `data` value. A non-object `data` yields an empty update.
    pub fn from_data(data: &Value) -> Self {
        match data {
            Value::Object(_) => Self::deserialize(data).unwrap_or_default(),
            _ => Self::default(),
        }
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    })
}

fn lenient_seconds<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
        }
        _ => None,
    })
}
