use serde::{Deserialize, Deserializer};

/// Clients post amounts either as JSON numbers or as the raw text of an
/// input field.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawAmount {
    Number(f64),
    Text(String),
}

/// Parses a user-entered amount. Blank, non-numeric and non-finite input
/// yields `None`.
pub fn parse(text: &str) -> Option<f64> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    text.parse::<f64>().ok().filter(|value| value.is_finite())
}

/// `deserialize_with` helper for optional amount fields.
pub fn optional<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<RawAmount>::deserialize(deserializer)?;

    Ok(raw.and_then(|raw| match raw {
        RawAmount::Number(value) => Some(value).filter(|value| value.is_finite()),
        RawAmount::Text(text) => parse(&text),
    }))
}
