use crate::controller::{LoggingController, LoggingState, PermissionDecision};
use crate::error::{JResult, LocationLoggerError};
use crate::location::{Location, Provider};
use crate::platform::Platform;
use crossbeam::channel::{self, Receiver, Sender};
use log::{debug, info};
use serde::{Deserialize, Serialize};

/// Platform callback turned into a message for the controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LoggerEvent {
    ToggleClicked,
    PermissionsResult {
        request_code: i32,
        permissions: Vec<String>,
        grants: Vec<bool>,
    },
    LocationChanged {
        latitude: f64,
        longitude: f64,
        #[serde(default)]
        provider: Option<Provider>,
    },
    ProviderStatus {
        provider: String,
        enabled: bool,
    },
}

/// Cloneable handle for posting events onto the queue
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: Sender<LoggerEvent>,
}

impl EventSender {
    pub fn post(&self, event: LoggerEvent) -> JResult<()> {
        self.tx
            .send(event)
            .map_err(|_| LocationLoggerError::Internal("Event queue closed".to_string()))
    }
}

/// Serialized event queue feeding a single controller
pub struct Dispatcher<P: Platform> {
    controller: LoggingController<P>,
    tx: Sender<LoggerEvent>,
    rx: Receiver<LoggerEvent>,
}

impl<P: Platform> Dispatcher<P> {
    pub fn new(controller: LoggingController<P>) -> Self {
        let (tx, rx) = channel::unbounded();
        Self { controller, tx, rx }
    }

    pub fn handle(&self) -> EventSender {
        EventSender {
            tx: self.tx.clone(),
        }
    }

    pub fn post(&self, event: LoggerEvent) -> JResult<()> {
        self.handle().post(event)
    }

    /// Drain queued events in FIFO order, including ones posted while
    /// draining. Stops at the first error; later events stay queued.
    pub fn pump(&mut self) -> JResult<usize> {
        let mut handled = 0;
        while let Ok(event) = self.rx.try_recv() {
            self.dispatch(event)?;
            handled += 1;
        }
        Ok(handled)
    }

    pub fn pending(&self) -> usize {
        self.rx.len()
    }

    fn dispatch(&mut self, event: LoggerEvent) -> JResult<LoggingState> {
        debug!("Dispatching {:?}", event);
        match event {
            LoggerEvent::ToggleClicked => self.controller.toggle(),
            LoggerEvent::PermissionsResult {
                request_code,
                permissions,
                grants,
            } => {
                let decision = PermissionDecision::from_results(
                    &self.controller.config().permission,
                    &permissions,
                    &grants,
                );
                self.controller.on_permission_result(request_code, decision)
            }
            LoggerEvent::LocationChanged {
                latitude,
                longitude,
                provider,
            } => {
                let mut location = Location::new(latitude, longitude);
                location.provider = provider;
                self.controller.on_location_update(location)?;
                Ok(self.controller.state())
            }
            LoggerEvent::ProviderStatus { provider, enabled } => {
                info!(
                    "Provider {} {}",
                    provider,
                    if enabled { "enabled" } else { "disabled" }
                );
                Ok(self.controller.state())
            }
        }
    }

    pub fn controller(&self) -> &LoggingController<P> {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut LoggingController<P> {
        &mut self.controller
    }
}
