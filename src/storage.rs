use crate::controller::LoggingState;
use crate::history::LocationHistory;
use crate::location::LogEntry;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Complete log export (JSON-serializable)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryExport {
    pub exported_at: DateTime<Utc>,
    pub state: LoggingState,
    pub entries: Vec<LogEntry>,
}

impl HistoryExport {
    pub fn new(state: LoggingState, history: &LocationHistory) -> Self {
        Self {
            exported_at: Utc::now(),
            state,
            entries: history.entries().cloned().collect(),
        }
    }

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Serialize to JSON bytes
    pub fn to_json_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec_pretty(self)
    }
}

/// GPX track format for mapping applications
#[derive(Debug, Serialize)]
pub struct GpxTrack {
    pub name: String,
    pub description: String,
    pub track_points: Vec<GpxPoint>,
}

#[derive(Debug, Serialize)]
pub struct GpxPoint {
    pub lat: f64,
    pub lon: f64,
    pub time: String,
    pub src: Option<String>,
}

impl GpxTrack {
    /// Generate GPX document XML string
    pub fn to_gpx_xml(&self) -> String {
        let mut xml = String::new();
        xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        xml.push_str("<gpx version=\"1.1\" creator=\"LocationLogger\">\n");
        xml.push_str("  <metadata>\n");
        xml.push_str(&format!("    <name>{}</name>\n", escape_xml(&self.name)));
        xml.push_str(&format!("    <desc>{}</desc>\n", escape_xml(&self.description)));
        xml.push_str("  </metadata>\n");
        xml.push_str("  <trk>\n");
        xml.push_str(&format!("    <name>{}</name>\n", escape_xml(&self.name)));
        xml.push_str("    <trkseg>\n");

        for point in &self.track_points {
            xml.push_str(&format!("      <trkpt lat=\"{}\" lon=\"{}\">\n", point.lat, point.lon));
            xml.push_str(&format!("        <time>{}</time>\n", point.time));
            if let Some(src) = &point.src {
                xml.push_str(&format!("        <src>{}</src>\n", escape_xml(src)));
            }
            xml.push_str("      </trkpt>\n");
        }

        xml.push_str("    </trkseg>\n");
        xml.push_str("  </trk>\n");
        xml.push_str("</gpx>\n");

        xml
    }
}

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Create GPX track from the logged fixes
pub fn create_gpx_track(name: &str, entries: &[LogEntry]) -> GpxTrack {
    let track_points = entries
        .iter()
        .map(|entry| GpxPoint {
            lat: entry.latitude(),
            lon: entry.longitude(),
            time: entry
                .received_at()
                .to_rfc3339_opts(SecondsFormat::Millis, true),
            src: entry.provider().map(|p| p.to_string()),
        })
        .collect();

    let description = match entries.first() {
        Some(first) => format!("Logged from {}", first.received_at().to_rfc3339()),
        None => "Empty log".to_string(),
    };

    GpxTrack {
        name: name.to_string(),
        description,
        track_points,
    }
}
