//! Outbound ports the controller calls into.
//!
//! On Android these are backed by the activity through JNI; the replay binary
//! and the tests provide their own implementations.

use crate::error::JResult;
use crate::location::Provider;
use serde::{Deserialize, Serialize};

/// Icon shown on the resume/pause button
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ButtonGlyph {
    Play,
    Stop,
}

/// Wraps `LocationManager`
pub trait LocationService {
    /// Whether the device advertises `FEATURE_LOCATION_GPS`
    fn has_gps(&self) -> JResult<bool>;

    fn request_location_updates(
        &self,
        provider: Provider,
        min_time_ms: i64,
        min_distance_m: f32,
    ) -> JResult<()>;

    /// Removes every subscription held by the logger's listener
    fn remove_updates(&self) -> JResult<()>;
}

pub trait PermissionService {
    /// Result arrives later as a permissions-result event
    fn request_permissions(&self, permissions: &[String], request_code: i32) -> JResult<()>;
}

pub trait UserInterface {
    fn set_button_glyph(&self, glyph: ButtonGlyph) -> JResult<()>;

    /// Transient notification (a toast on Android)
    fn show_toast(&self, message: &str) -> JResult<()>;

    fn notify_log_changed(&self, len: usize) -> JResult<()>;
}

/// Everything the controller needs from its host
pub trait Platform: LocationService + PermissionService + UserInterface {}

impl<T: LocationService + PermissionService + UserInterface> Platform for T {}

#[cfg(test)]
pub mod fake {
    use super::*;
    use crate::dispatcher::{EventSender, LoggerEvent};
    use crate::error::LocationLoggerError;
    use std::sync::{Arc, Mutex};

    /// Recorded outbound call
    #[derive(Debug, Clone, PartialEq)]
    pub enum PlatformCall {
        RequestPermissions {
            permissions: Vec<String>,
            request_code: i32,
        },
        RequestUpdates {
            provider: Provider,
            min_time_ms: i64,
            min_distance_m: f32,
        },
        RemoveUpdates,
        Glyph(ButtonGlyph),
        Toast(String),
        LogChanged(usize),
    }

    struct FakeState {
        calls: Vec<PlatformCall>,
        has_gps: bool,
        answer: Option<(EventSender, bool)>,
        fail_updates_from: Option<usize>,
        update_calls: usize,
    }

    /// Fake platform for testing
    #[derive(Clone)]
    pub struct FakePlatform {
        inner: Arc<Mutex<FakeState>>,
    }

    impl Default for FakePlatform {
        fn default() -> Self {
            Self {
                inner: Arc::new(Mutex::new(FakeState {
                    calls: Vec::new(),
                    has_gps: true,
                    answer: None,
                    fail_updates_from: None,
                    update_calls: 0,
                })),
            }
        }
    }

    impl FakePlatform {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn without_gps() -> Self {
            let platform = Self::default();
            platform.inner.lock().unwrap().has_gps = false;
            platform
        }

        /// Answer every permission request by posting a result back onto
        /// the dispatcher queue, like the system dialog would
        pub fn answer_permissions(&self, sender: EventSender, granted: bool) {
            self.inner.lock().unwrap().answer = Some((sender, granted));
        }

        pub fn fail_location_updates(&self) {
            self.fail_location_updates_from(1);
        }

        /// Fail the `n`th `request_location_updates` call (1-based) and
        /// every one after it
        pub fn fail_location_updates_from(&self, n: usize) {
            self.inner.lock().unwrap().fail_updates_from = Some(n);
        }

        pub fn calls(&self) -> Vec<PlatformCall> {
            self.inner.lock().unwrap().calls.clone()
        }

        pub fn permission_requests(&self) -> usize {
            self.count(|c| matches!(c, PlatformCall::RequestPermissions { .. }))
        }

        pub fn toasts(&self) -> Vec<String> {
            self.calls()
                .into_iter()
                .filter_map(|c| match c {
                    PlatformCall::Toast(msg) => Some(msg),
                    _ => None,
                })
                .collect()
        }

        pub fn last_glyph(&self) -> Option<ButtonGlyph> {
            self.calls().into_iter().rev().find_map(|c| match c {
                PlatformCall::Glyph(glyph) => Some(glyph),
                _ => None,
            })
        }

        /// Providers subscribed since the last `remove_updates`
        pub fn active_subscriptions(&self) -> Vec<Provider> {
            let mut active = Vec::new();
            for call in self.calls() {
                match call {
                    PlatformCall::RequestUpdates { provider, .. } => active.push(provider),
                    PlatformCall::RemoveUpdates => active.clear(),
                    _ => {}
                }
            }
            active
        }

        fn count(&self, pred: impl Fn(&PlatformCall) -> bool) -> usize {
            self.inner.lock().unwrap().calls.iter().filter(|c| pred(c)).count()
        }

        fn record(&self, call: PlatformCall) {
            self.inner.lock().unwrap().calls.push(call);
        }
    }

    impl LocationService for FakePlatform {
        fn has_gps(&self) -> JResult<bool> {
            Ok(self.inner.lock().unwrap().has_gps)
        }

        fn request_location_updates(
            &self,
            provider: Provider,
            min_time_ms: i64,
            min_distance_m: f32,
        ) -> JResult<()> {
            let failing = {
                let mut state = self.inner.lock().unwrap();
                state.update_calls += 1;
                state
                    .fail_updates_from
                    .map_or(false, |n| state.update_calls >= n)
            };
            if failing {
                return Err(LocationLoggerError::Platform(
                    "location service unavailable".to_string(),
                ));
            }
            self.record(PlatformCall::RequestUpdates {
                provider,
                min_time_ms,
                min_distance_m,
            });
            Ok(())
        }

        fn remove_updates(&self) -> JResult<()> {
            self.record(PlatformCall::RemoveUpdates);
            Ok(())
        }
    }

    impl PermissionService for FakePlatform {
        fn request_permissions(&self, permissions: &[String], request_code: i32) -> JResult<()> {
            self.record(PlatformCall::RequestPermissions {
                permissions: permissions.to_vec(),
                request_code,
            });

            let answer = self.inner.lock().unwrap().answer.clone();
            if let Some((sender, granted)) = answer {
                sender.post(LoggerEvent::PermissionsResult {
                    request_code,
                    permissions: permissions.to_vec(),
                    grants: vec![granted; permissions.len()],
                })?;
            }
            Ok(())
        }
    }

    impl UserInterface for FakePlatform {
        fn set_button_glyph(&self, glyph: ButtonGlyph) -> JResult<()> {
            self.record(PlatformCall::Glyph(glyph));
            Ok(())
        }

        fn show_toast(&self, message: &str) -> JResult<()> {
            self.record(PlatformCall::Toast(message.to_string()));
            Ok(())
        }

        fn notify_log_changed(&self, len: usize) -> JResult<()> {
            self.record(PlatformCall::LogChanged(len));
            Ok(())
        }
    }
}
