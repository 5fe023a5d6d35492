use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use location_logger_jni::storage::{create_gpx_track, HistoryExport};
use location_logger_jni::{
    ButtonGlyph, Dispatcher, EventSender, JResult, LocationLoggerError, LocationService, LogChange,
    LoggerConfig, LoggerEvent, LoggingController, PermissionService, Provider, UserInterface,
};
use log::info;
use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum AutoPermission {
    /// Answer every request with PERMISSION_GRANTED
    Grant,
    /// Answer every request with PERMISSION_DENIED
    Deny,
    /// Only the results in the script are delivered
    #[value(name = "none")]
    Manual,
}

#[derive(Parser, Debug)]
#[command(name = "replay")]
#[command(about = "Replay a location logger event script without a device", long_about = None)]
struct Args {
    /// Path to the event script ({"events": [...]})
    #[arg(long)]
    script: PathBuf,

    /// Logger config JSON (defaults apply to missing fields)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Simulate a device without FEATURE_LOCATION_GPS
    #[arg(long, default_value_t = false)]
    no_gps: bool,

    /// How the simulated permission dialog answers
    #[arg(long, value_enum, default_value = "none")]
    auto_permission: AutoPermission,

    /// Write the log as JSON
    #[arg(long)]
    export_json: Option<PathBuf>,

    /// Write the log as a GPX track
    #[arg(long)]
    export_gpx: Option<PathBuf>,
}

#[derive(Deserialize)]
struct Script {
    events: Vec<LoggerEvent>,
}

fn load_script(path: &Path) -> anyhow::Result<Script> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let reader = BufReader::new(file);
    Ok(serde_json::from_reader(reader)?)
}

/// Prints outbound calls and plays the permission dialog
struct ConsolePlatform {
    has_gps: bool,
    auto_permission: AutoPermission,
    sender: Mutex<Option<EventSender>>,
}

impl ConsolePlatform {
    fn attach(&self, sender: EventSender) {
        if let Ok(mut slot) = self.sender.lock() {
            *slot = Some(sender);
        }
    }
}

impl LocationService for ConsolePlatform {
    fn has_gps(&self) -> JResult<bool> {
        Ok(self.has_gps)
    }

    fn request_location_updates(
        &self,
        provider: Provider,
        min_time_ms: i64,
        min_distance_m: f32,
    ) -> JResult<()> {
        println!(
            "  -> requestLocationUpdates({}, {}ms, {}m)",
            provider, min_time_ms, min_distance_m
        );
        Ok(())
    }

    fn remove_updates(&self) -> JResult<()> {
        println!("  -> removeUpdates()");
        Ok(())
    }
}

impl PermissionService for ConsolePlatform {
    fn request_permissions(&self, permissions: &[String], request_code: i32) -> JResult<()> {
        println!("  -> requestPermissions({:?}, {})", permissions, request_code);

        let granted = match self.auto_permission {
            AutoPermission::Grant => true,
            AutoPermission::Deny => false,
            AutoPermission::Manual => return Ok(()),
        };
        let sender = self
            .sender
            .lock()
            .map_err(|_| LocationLoggerError::Internal("sender lock poisoned".to_string()))?
            .clone()
            .ok_or(LocationLoggerError::NotInitialized)?;
        sender.post(LoggerEvent::PermissionsResult {
            request_code,
            permissions: permissions.to_vec(),
            grants: vec![granted; permissions.len()],
        })
    }
}

impl UserInterface for ConsolePlatform {
    fn set_button_glyph(&self, glyph: ButtonGlyph) -> JResult<()> {
        println!("  -> button: {:?}", glyph);
        Ok(())
    }

    fn show_toast(&self, message: &str) -> JResult<()> {
        println!("  -> toast: {}", message);
        Ok(())
    }

    fn notify_log_changed(&self, len: usize) -> JResult<()> {
        println!("  -> log changed ({} entries)", len);
        Ok(())
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => LoggerConfig::from_path(path)?,
        None => LoggerConfig::default(),
    };
    let script = load_script(&args.script)?;
    info!(
        "Replaying {} events from {}",
        script.events.len(),
        args.script.display()
    );

    let platform = ConsolePlatform {
        has_gps: !args.no_gps,
        auto_permission: args.auto_permission,
        sender: Mutex::new(None),
    };
    let mut dispatcher = Dispatcher::new(LoggingController::new(platform, config));
    dispatcher.controller().platform().attach(dispatcher.handle());
    let changes = dispatcher.controller_mut().watch_history();

    for event in script.events {
        println!("{:?}", event);
        dispatcher.post(event)?;
        dispatcher.pump()?;
        for LogChange::Appended { index, entry } in changes.try_iter() {
            println!("  + [{}] {}", index, entry);
        }
        println!("  state: {}", dispatcher.controller().state().as_str());
    }

    let controller = dispatcher.controller();
    println!();
    println!("Final state: {}", controller.state().as_str());
    if controller.is_logging() {
        println!("Still subscribed to {:?}", controller.active_providers());
    }
    println!("Log ({} entries):", controller.history().len());
    for entry in controller.history().entries() {
        println!("  {}", entry);
    }

    if let Some(path) = &args.export_json {
        let export = HistoryExport::new(controller.state(), controller.history());
        fs::write(path, export.to_json_bytes()?)
            .with_context(|| format!("writing {}", path.display()))?;
        println!("Wrote {}", path.display());
    }

    if let Some(path) = &args.export_gpx {
        let entries: Vec<_> = controller.history().entries().cloned().collect();
        let track = create_gpx_track("Location log", &entries);
        fs::write(path, track.to_gpx_xml())
            .with_context(|| format!("writing {}", path.display()))?;
        println!("Wrote {}", path.display());
    }

    Ok(())
}
