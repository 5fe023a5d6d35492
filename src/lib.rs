// Location Logger Android JNI Library
// Exposes the Rust logging state machine to the Android activity via JNI

pub mod android_jni;
pub mod config;
pub mod controller;
pub mod dispatcher;
pub mod error;
pub mod history;
pub mod location;
pub mod platform;
pub mod storage;

pub use config::LoggerConfig;
pub use controller::{LoggingController, LoggingState, PermissionDecision};
pub use dispatcher::{Dispatcher, EventSender, LoggerEvent};
pub use error::{JResult, LocationLoggerError};
pub use history::{LocationHistory, LogChange};
pub use location::{Location, LogEntry, Provider};
pub use platform::{ButtonGlyph, LocationService, PermissionService, Platform, UserInterface};
