use crate::config::LoggerConfig;
use crate::error::{JResult, LocationLoggerError};
use crate::history::{LocationHistory, LogChange};
use crate::location::{Location, LogEntry, Provider};
use crate::platform::{ButtonGlyph, Platform};
use crossbeam::channel::Receiver;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

/// Logger state machine states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoggingState {
    /// Not logging, no request outstanding
    Idle,
    /// Fine-location permission requested, waiting for the result
    AwaitingPermission,
    /// Subscribed to location updates
    Logging,
}

impl LoggingState {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoggingState::Idle => "IDLE",
            LoggingState::AwaitingPermission => "AWAITING_PERMISSION",
            LoggingState::Logging => "LOGGING",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PermissionDecision {
    Granted,
    Denied,
}

impl PermissionDecision {
    /// Granted only if `permission` appears with a granted result
    pub fn from_results(permission: &str, permissions: &[String], grants: &[bool]) -> Self {
        let granted = permissions
            .iter()
            .zip(grants)
            .any(|(name, granted)| name == permission && *granted);
        if granted {
            PermissionDecision::Granted
        } else {
            PermissionDecision::Denied
        }
    }
}

/// Drives Idle → AwaitingPermission → Logging → Idle and owns the log
pub struct LoggingController<P: Platform> {
    platform: P,
    config: LoggerConfig,
    state: LoggingState,
    outstanding_request: Option<i32>,
    active_providers: Vec<Provider>,
    history: LocationHistory,
}

impl<P: Platform> LoggingController<P> {
    /// Create new controller in Idle state
    pub fn new(platform: P, config: LoggerConfig) -> Self {
        Self {
            platform,
            config,
            state: LoggingState::Idle,
            outstanding_request: None,
            active_providers: Vec::new(),
            history: LocationHistory::new(),
        }
    }

    /// Resume/pause button handler
    pub fn toggle(&mut self) -> JResult<LoggingState> {
        match self.state {
            LoggingState::Logging => {
                self.platform.remove_updates()?;
                self.active_providers.clear();
                self.state = LoggingState::Idle;
                self.platform.set_button_glyph(ButtonGlyph::Play)?;
                info!("Logging stopped after {} entries", self.history.len());
            }
            LoggingState::Idle => {
                let permissions = [self.config.permission.clone()];
                self.platform
                    .request_permissions(&permissions, self.config.request_code)?;
                self.outstanding_request = Some(self.config.request_code);
                self.state = LoggingState::AwaitingPermission;
                info!(
                    "Requested {} (request code {})",
                    self.config.permission, self.config.request_code
                );
            }
            LoggingState::AwaitingPermission => {
                debug!("Toggle ignored while permission request is outstanding");
            }
        }
        Ok(self.state)
    }

    /// Permission dialog result
    pub fn on_permission_result(
        &mut self,
        request_code: i32,
        decision: PermissionDecision,
    ) -> JResult<LoggingState> {
        if self.state != LoggingState::AwaitingPermission
            || self.outstanding_request != Some(request_code)
        {
            debug!(
                "Ignoring permission result for request {} in state {:?}",
                request_code, self.state
            );
            return Ok(self.state);
        }
        self.outstanding_request = None;

        match decision {
            PermissionDecision::Granted => {
                if let Err(e) = self.subscribe() {
                    // Keep "subscribed iff Logging" when a later subscription fails
                    if let Err(rollback) = self.platform.remove_updates() {
                        warn!("Failed to remove partial subscriptions: {}", rollback);
                    }
                    self.active_providers.clear();
                    self.state = LoggingState::Idle;
                    return Err(e);
                }
                self.state = LoggingState::Logging;
                self.platform.set_button_glyph(ButtonGlyph::Stop)?;
                info!("Logging started on {:?}", self.active_providers);
            }
            PermissionDecision::Denied => {
                self.state = LoggingState::Idle;
                warn!("{}", LocationLoggerError::PermissionDenied);
                self.platform.show_toast(&self.config.denied_message())?;
            }
        }
        Ok(self.state)
    }

    fn subscribe(&mut self) -> JResult<()> {
        let mut providers = Vec::with_capacity(2);
        if self.platform.has_gps()? {
            providers.push(Provider::Gps);
        }
        providers.push(Provider::Network);

        for provider in providers {
            self.platform.request_location_updates(
                provider,
                self.config.min_time_ms,
                self.config.min_distance_m,
            )?;
            self.active_providers.push(provider);
        }
        Ok(())
    }

    /// Location listener callback. Dropped unless Logging.
    pub fn on_location_update(&mut self, location: Location) -> JResult<Option<LogEntry>> {
        if self.state != LoggingState::Logging {
            debug!("Dropping location update in state {:?}", self.state);
            return Ok(None);
        }

        let entry = self.history.push(&location);
        self.platform.notify_log_changed(self.history.len())?;
        Ok(Some(entry))
    }

    pub fn state(&self) -> LoggingState {
        self.state
    }

    pub fn is_logging(&self) -> bool {
        self.state == LoggingState::Logging
    }

    pub fn outstanding_request(&self) -> Option<i32> {
        self.outstanding_request
    }

    pub fn active_providers(&self) -> &[Provider] {
        &self.active_providers
    }

    pub fn history(&self) -> &LocationHistory {
        &self.history
    }

    /// Subscribe to log appends
    pub fn watch_history(&mut self) -> Receiver<LogChange> {
        self.history.watch()
    }

    pub fn config(&self) -> &LoggerConfig {
        &self.config
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ACCESS_FINE_LOCATION;
    use crate::platform::fake::{FakePlatform, PlatformCall};

    fn controller() -> (LoggingController<FakePlatform>, FakePlatform) {
        let platform = FakePlatform::new();
        (
            LoggingController::new(platform.clone(), LoggerConfig::default()),
            platform,
        )
    }

    #[test]
    fn test_grant_then_update_logs_position() {
        let (mut ctl, platform) = controller();

        assert_eq!(ctl.toggle().unwrap(), LoggingState::AwaitingPermission);
        assert_eq!(
            ctl.on_permission_result(1, PermissionDecision::Granted).unwrap(),
            LoggingState::Logging
        );
        ctl.on_location_update(Location::new(37.0, -122.0)).unwrap();

        assert_eq!(ctl.state(), LoggingState::Logging);
        let log: Vec<&str> = ctl.history().entries().map(|e| e.text()).collect();
        assert_eq!(log, vec!["37.0°N:-122.0°E"]);
        assert_eq!(platform.last_glyph(), Some(ButtonGlyph::Stop));
        assert_eq!(
            platform.active_subscriptions(),
            vec![Provider::Gps, Provider::Network]
        );
        assert!(platform.calls().contains(&PlatformCall::LogChanged(1)));
    }

    #[test]
    fn test_deny_returns_to_idle_with_one_toast() {
        let (mut ctl, platform) = controller();

        ctl.toggle().unwrap();
        ctl.on_permission_result(1, PermissionDecision::Denied).unwrap();

        assert_eq!(ctl.state(), LoggingState::Idle);
        assert_eq!(platform.toasts(), vec!["Location permission denied".to_string()]);
        assert!(platform.active_subscriptions().is_empty());
        assert!(ctl.active_providers().is_empty());
        assert_eq!(platform.last_glyph(), None);
    }

    #[test]
    fn test_double_toggle_keeps_single_request() {
        let (mut ctl, platform) = controller();

        ctl.toggle().unwrap();
        ctl.toggle().unwrap();

        assert_eq!(ctl.state(), LoggingState::AwaitingPermission);
        assert_eq!(platform.permission_requests(), 1);
        assert_eq!(ctl.outstanding_request(), Some(1));
    }

    #[test]
    fn test_toggle_off_removes_subscriptions() {
        let (mut ctl, platform) = controller();

        ctl.toggle().unwrap();
        ctl.on_permission_result(1, PermissionDecision::Granted).unwrap();
        assert_eq!(ctl.toggle().unwrap(), LoggingState::Idle);

        assert!(platform.active_subscriptions().is_empty());
        assert!(ctl.active_providers().is_empty());
        assert_eq!(platform.last_glyph(), Some(ButtonGlyph::Play));
    }

    #[test]
    fn test_request_uses_fine_location_and_zero_thresholds() {
        let (mut ctl, platform) = controller();
        ctl.toggle().unwrap();
        ctl.on_permission_result(1, PermissionDecision::Granted).unwrap();

        let calls = platform.calls();
        assert_eq!(
            calls[0],
            PlatformCall::RequestPermissions {
                permissions: vec![ACCESS_FINE_LOCATION.to_string()],
                request_code: 1,
            }
        );
        assert!(calls.contains(&PlatformCall::RequestUpdates {
            provider: Provider::Network,
            min_time_ms: 0,
            min_distance_m: 0.0,
        }));
    }

    #[test]
    fn test_no_gps_subscribes_network_only() {
        let platform = FakePlatform::without_gps();
        let mut ctl = LoggingController::new(platform.clone(), LoggerConfig::default());

        ctl.toggle().unwrap();
        ctl.on_permission_result(1, PermissionDecision::Granted).unwrap();

        assert_eq!(platform.active_subscriptions(), vec![Provider::Network]);
        assert_eq!(ctl.active_providers(), &[Provider::Network]);
    }

    #[test]
    fn test_mismatched_request_code_ignored() {
        let (mut ctl, platform) = controller();

        ctl.toggle().unwrap();
        ctl.on_permission_result(42, PermissionDecision::Granted).unwrap();
        assert_eq!(ctl.state(), LoggingState::AwaitingPermission);
        assert!(platform.active_subscriptions().is_empty());
        assert!(platform.toasts().is_empty());
    }

    #[test]
    fn test_result_without_outstanding_request_ignored() {
        let (mut idle, idle_platform) = controller();

        idle.on_permission_result(1, PermissionDecision::Denied).unwrap();
        idle.on_permission_result(1, PermissionDecision::Granted).unwrap();

        assert_eq!(idle.state(), LoggingState::Idle);
        assert!(idle_platform.toasts().is_empty());
        assert!(!idle_platform
            .calls()
            .iter()
            .any(|c| matches!(c, PlatformCall::RequestUpdates { .. })));
    }

    #[test]
    fn test_updates_outside_logging_are_dropped() {
        let (mut ctl, _platform) = controller();

        assert!(ctl.on_location_update(Location::new(1.0, 1.0)).unwrap().is_none());
        ctl.toggle().unwrap();
        assert!(ctl.on_location_update(Location::new(1.0, 1.0)).unwrap().is_none());
        ctl.on_permission_result(1, PermissionDecision::Granted).unwrap();
        ctl.on_location_update(Location::new(2.0, 2.0)).unwrap();
        ctl.toggle().unwrap();
        assert!(ctl.on_location_update(Location::new(3.0, 3.0)).unwrap().is_none());

        assert_eq!(ctl.history().len(), 1);
    }

    #[test]
    fn test_log_survives_restart_cycles() {
        let (mut ctl, _platform) = controller();

        for round in 0..3 {
            ctl.toggle().unwrap();
            ctl.on_permission_result(1, PermissionDecision::Granted).unwrap();
            ctl.on_location_update(Location::new(round as f64, 0.5)).unwrap();
            ctl.toggle().unwrap();
        }

        let log: Vec<&str> = ctl.history().entries().map(|e| e.text()).collect();
        assert_eq!(log, vec!["0.0°N:0.5°E", "1.0°N:0.5°E", "2.0°N:0.5°E"]);
    }

    #[test]
    fn test_failed_subscription_rolls_back() {
        let (mut ctl, platform) = controller();
        platform.fail_location_updates();

        ctl.toggle().unwrap();
        assert!(ctl.on_permission_result(1, PermissionDecision::Granted).is_err());

        assert_eq!(ctl.state(), LoggingState::Idle);
        assert!(ctl.active_providers().is_empty());
        assert_eq!(ctl.outstanding_request(), None);
    }

    #[test]
    fn test_network_failure_removes_gps_subscription() {
        let (mut ctl, platform) = controller();
        // GPS succeeds, network fails
        platform.fail_location_updates_from(2);

        ctl.toggle().unwrap();
        assert!(ctl.on_permission_result(1, PermissionDecision::Granted).is_err());

        let calls = platform.calls();
        let gps_at = calls
            .iter()
            .position(|c| matches!(c, PlatformCall::RequestUpdates { provider: Provider::Gps, .. }))
            .unwrap();
        let removed_at = calls
            .iter()
            .position(|c| *c == PlatformCall::RemoveUpdates)
            .unwrap();
        assert!(removed_at > gps_at);
        assert!(platform.active_subscriptions().is_empty());
        assert!(ctl.active_providers().is_empty());
        assert_eq!(ctl.state(), LoggingState::Idle);
        assert!(!ctl.is_logging());
    }

    #[test]
    fn test_custom_denied_message() {
        let platform = FakePlatform::new();
        let config = LoggerConfig {
            denied_message: Some("No location permission".to_string()),
            ..LoggerConfig::default()
        };
        let mut ctl = LoggingController::new(platform.clone(), config);

        ctl.toggle().unwrap();
        ctl.on_permission_result(1, PermissionDecision::Denied).unwrap();
        assert_eq!(platform.toasts(), vec!["No location permission".to_string()]);
    }

    #[test]
    fn test_decision_folding() {
        let perms = vec![
            "android.permission.CAMERA".to_string(),
            ACCESS_FINE_LOCATION.to_string(),
        ];
        assert_eq!(
            PermissionDecision::from_results(ACCESS_FINE_LOCATION, &perms, &[false, true]),
            PermissionDecision::Granted
        );
        assert_eq!(
            PermissionDecision::from_results(ACCESS_FINE_LOCATION, &perms, &[true, false]),
            PermissionDecision::Denied
        );
        assert_eq!(
            PermissionDecision::from_results(ACCESS_FINE_LOCATION, &[], &[]),
            PermissionDecision::Denied
        );
        // Short grant array: unmatched permissions count as denied
        assert_eq!(
            PermissionDecision::from_results(ACCESS_FINE_LOCATION, &perms, &[true]),
            PermissionDecision::Denied
        );
    }
}
