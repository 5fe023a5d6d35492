use crate::error::{JResult, LocationLoggerError};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const ACCESS_FINE_LOCATION: &str = "android.permission.ACCESS_FINE_LOCATION";

/// Request code used to correlate the fine-location request with its result
pub const LOCATION_PERMISSION_REQUEST: i32 = 1;

/// Logger settings shared by the JNI bridge and the replay binary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    pub request_code: i32,
    pub permission: String,
    /// Minimum time between updates; 0 reports every update
    pub min_time_ms: i64,
    /// Minimum distance between updates; 0 reports every update
    pub min_distance_m: f32,
    /// Toast text shown when permission is denied
    pub denied_message: Option<String>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            request_code: LOCATION_PERMISSION_REQUEST,
            permission: ACCESS_FINE_LOCATION.to_string(),
            min_time_ms: 0,
            min_distance_m: 0.0,
            denied_message: None,
        }
    }
}

impl LoggerConfig {
    pub fn from_json_str(json: &str) -> JResult<Self> {
        let config: LoggerConfig = serde_json::from_str(json)
            .map_err(|e| LocationLoggerError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> JResult<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            LocationLoggerError::Config(format!("{}: {}", path.display(), e))
        })?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> JResult<()> {
        if self.permission.trim().is_empty() {
            return Err(LocationLoggerError::Config(
                "permission name must not be empty".to_string(),
            ));
        }
        if self.min_time_ms < 0 {
            return Err(LocationLoggerError::Config(format!(
                "min_time_ms must be >= 0, got {}",
                self.min_time_ms
            )));
        }
        if !self.min_distance_m.is_finite() || self.min_distance_m < 0.0 {
            return Err(LocationLoggerError::Config(format!(
                "min_distance_m must be a finite value >= 0, got {}",
                self.min_distance_m
            )));
        }
        Ok(())
    }

    /// Message for the one-shot denial notification
    pub fn denied_message(&self) -> String {
        self.denied_message
            .clone()
            .unwrap_or_else(|| LocationLoggerError::PermissionDenied.to_string())
    }
}
