use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Android location provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Gps,
    Network,
}

impl Provider {
    /// Name used by `LocationManager`
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::Gps => "gps",
            Provider::Network => "network",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "gps" => Some(Provider::Gps),
            "network" => Some(Provider::Network),
            _ => None,
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Position fix from Android LocationManager
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    pub provider: Option<Provider>,
}

impl Location {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            provider: None,
        }
    }

    pub fn with_provider(mut self, provider: Provider) -> Self {
        self.provider = Some(provider);
        self
    }
}

/// One line of the displayed location log. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    text: String,
    latitude: f64,
    longitude: f64,
    provider: Option<Provider>,
    received_at: DateTime<Utc>,
}

impl LogEntry {
    pub fn from_location(location: &Location, received_at: DateTime<Utc>) -> Self {
        Self {
            text: format_position(location.latitude, location.longitude),
            latitude: location.latitude,
            longitude: location.longitude,
            provider: location.provider,
            received_at,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    pub fn provider(&self) -> Option<Provider> {
        self.provider
    }

    pub fn received_at(&self) -> DateTime<Utc> {
        self.received_at
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Display text for a fix, e.g. `37.0°N:-122.0°E`
pub fn format_position(latitude: f64, longitude: f64) -> String {
    format!(
        "{}°N:{}°E",
        format_coordinate(latitude),
        format_coordinate(longitude)
    )
}

/// Prints a coordinate with at least one fractional digit, matching how the
/// Android list has always rendered whole degrees (`37.0`, not `37`).
pub fn format_coordinate(value: f64) -> String {
    let text = value.to_string();
    if value.is_finite() && !text.contains('.') {
        format!("{}.0", text)
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whole_degrees_keep_fraction() {
        assert_eq!(format_coordinate(37.0), "37.0");
        assert_eq!(format_coordinate(-122.0), "-122.0");
        assert_eq!(format_coordinate(0.0), "0.0");
    }

    #[test]
    fn test_fractional_degrees_unchanged() {
        assert_eq!(format_coordinate(37.4219983), "37.4219983");
        assert_eq!(format_coordinate(-122.084), "-122.084");
    }

    #[test]
    fn test_position_uses_longitude_for_east() {
        assert_eq!(format_position(37.0, -122.0), "37.0°N:-122.0°E");
        assert_eq!(format_position(48.8566, 2.3522), "48.8566°N:2.3522°E");
    }

    #[test]
    fn test_entry_keeps_raw_fix() {
        let location = Location::new(51.5, -0.12).with_provider(Provider::Network);
        let entry = LogEntry::from_location(&location, Utc::now());
        assert_eq!(entry.text(), "51.5°N:-0.12°E");
        assert_eq!(entry.latitude(), 51.5);
        assert_eq!(entry.longitude(), -0.12);
        assert_eq!(entry.provider(), Some(Provider::Network));
        assert_eq!(entry.to_string(), entry.text());
    }

    #[test]
    fn test_provider_names() {
        assert_eq!(Provider::Gps.as_str(), "gps");
        assert_eq!(Provider::from_name("network"), Some(Provider::Network));
        assert_eq!(Provider::from_name("fused"), None);
    }
}
