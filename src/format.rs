//! Display helpers for durations and item properties.

use serde::Deserialize;
use serde_json::{Map, Value};

/// Time as reported by the backend for elapsed and total play time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GlobalTime {
    pub hours: u64,
    pub minutes: u64,
    pub seconds: u64,
    pub milliseconds: u64,
}
impl GlobalTime {
    #[must_use]
    pub const fn as_secs(&self) -> u64 {
        self.hours * 3600 + self.minutes * 60 + self.seconds
    }
}

/// Format seconds as `mm:ss`, or `hh:mm:ss` once there are hours
#[must_use]
pub fn duration_to_string(total_seconds: u64) -> String {
    let seconds = total_seconds % 60;
    let minutes = (total_seconds / 60) % 60;
    let hours = total_seconds / 3600;
    if hours > 0 {
        format!("{hours:02}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes:02}:{seconds:02}")
    }
}

/// Render one property of an item for display. Empty, zero and missing
/// values yield `None`.
#[must_use]
pub fn formatted_property(name: &str, data: &Map<String, Value>) -> Option<String> {
    let value = data.get(name)?;
    match name {
        "duration" => value.as_u64().map(duration_to_string),
        "time" | "totaltime" => GlobalTime::deserialize(value)
            .ok()
            .map(|t| duration_to_string(t.as_secs())),
        _ => plain_value(value),
    }
}

fn plain_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
        Value::Array(values) => {
            let values: Vec<_> = values.iter().filter_map(plain_value).collect();
            (!values.is_empty()).then(|| values.join(", "))
        }
        _ => None,
    }
}

/// Join every available property with `separator`, falling back to `default`
/// when none of them has a value.
#[must_use]
pub fn fill_placeholders(
    data: &Map<String, Value>,
    properties: &[String],
    separator: &str,
    default: &str,
) -> String {
    let values: Vec<_> = properties
        .iter()
        .filter_map(|p| formatted_property(p, data))
        .collect();
    if values.is_empty() {
        default.to_owned()
    } else {
        values.join(separator)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn object(v: Value) -> Map<String, Value> {
        match v {
            Value::Object(m) => m,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_duration_to_string() {
        assert_eq!(duration_to_string(0), "00:00");
        assert_eq!(duration_to_string(59), "00:59");
        assert_eq!(duration_to_string(245), "04:05");
        assert_eq!(duration_to_string(3600 + 61), "01:01:01");
        assert_eq!(duration_to_string(36000), "10:00:00");
    }

    #[test]
    fn test_global_time() {
        let t: GlobalTime =
            serde_json::from_value(json!({"hours": 1, "minutes": 2, "seconds": 3, "milliseconds": 400}))
                .unwrap();
        assert_eq!(t.as_secs(), 3723);
        assert_eq!(t.milliseconds, 400);
    }

    #[test]
    fn test_formatted_property() {
        let data = object(json!({
            "title": "Song",
            "artist": ["A", "B"],
            "duration": 185,
            "time": {"hours": 0, "minutes": 1, "seconds": 5, "milliseconds": 0},
            "year": 0,
            "album": "",
        }));
        assert_eq!(formatted_property("title", &data).as_deref(), Some("Song"));
        assert_eq!(formatted_property("artist", &data).as_deref(), Some("A, B"));
        assert_eq!(formatted_property("duration", &data).as_deref(), Some("03:05"));
        assert_eq!(formatted_property("time", &data).as_deref(), Some("01:05"));
        assert_eq!(formatted_property("year", &data), None);
        assert_eq!(formatted_property("album", &data), None);
        assert_eq!(formatted_property("genre", &data), None);
    }

    #[test]
    fn test_fill_placeholders() {
        let data = object(json!({"displayartist": "Artist", "title": "Title"}));
        let props = ["displayartist".to_owned(), "title".to_owned()];
        assert_eq!(fill_placeholders(&data, &props, " - ", "?"), "Artist - Title");
        assert_eq!(fill_placeholders(&Map::new(), &props, " - ", "?"), "?");
    }
}
