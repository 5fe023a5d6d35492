use crate::config::LoggerConfig;
use crate::controller::LoggingController;
use crate::dispatcher::{Dispatcher, EventSender, LoggerEvent};
use crate::error::{throw_java_exception, JResult, LocationLoggerError};
use crate::location::Provider;
use crate::platform::{ButtonGlyph, LocationService, PermissionService, UserInterface};
use crate::storage::HistoryExport;
use jni::objects::{GlobalRef, JClass, JIntArray, JObject, JObjectArray, JString, JValue};
use jni::sys::{jboolean, jdouble, jint, jstring, JNI_TRUE};
use jni::{JNIEnv, JavaVM};
use log::{error, info};
use std::sync::{Mutex, TryLockError};

/// `PackageManager.PERMISSION_GRANTED`
const PERMISSION_GRANTED: jint = 0;

/// Platform ports backed by the Java host object passed to `nativeInit`
pub struct JniPlatform {
    vm: JavaVM,
    host: GlobalRef,
}

impl JniPlatform {
    fn call<T>(
        &self,
        f: impl FnOnce(&mut JNIEnv, &GlobalRef) -> jni::errors::Result<T>,
    ) -> JResult<T> {
        let mut env = self.vm.get_env()?;
        f(&mut env, &self.host).map_err(|e| {
            // Leave no pending exception behind; the caller rethrows ours
            if env.exception_check().unwrap_or(false) {
                let _ = env.exception_describe();
                let _ = env.exception_clear();
            }
            LocationLoggerError::Platform(e.to_string())
        })
    }
}

impl LocationService for JniPlatform {
    fn has_gps(&self) -> JResult<bool> {
        self.call(|env, host| env.call_method(host, "hasGpsFeature", "()Z", &[])?.z())
    }

    fn request_location_updates(
        &self,
        provider: Provider,
        min_time_ms: i64,
        min_distance_m: f32,
    ) -> JResult<()> {
        self.call(|env, host| {
            let name = env.new_string(provider.as_str())?;
            env.call_method(
                host,
                "requestLocationUpdates",
                "(Ljava/lang/String;JF)V",
                &[
                    JValue::Object(&name),
                    JValue::Long(min_time_ms),
                    JValue::Float(min_distance_m),
                ],
            )?;
            Ok(())
        })
    }

    fn remove_updates(&self) -> JResult<()> {
        self.call(|env, host| {
            env.call_method(host, "removeUpdates", "()V", &[])?;
            Ok(())
        })
    }
}

impl PermissionService for JniPlatform {
    fn request_permissions(&self, permissions: &[String], request_code: i32) -> JResult<()> {
        self.call(|env, host| {
            let array =
                env.new_object_array(permissions.len() as jint, "java/lang/String", JObject::null())?;
            for (i, permission) in permissions.iter().enumerate() {
                let name = env.new_string(permission)?;
                env.set_object_array_element(&array, i as jint, name)?;
            }
            env.call_method(
                host,
                "requestPermissions",
                "([Ljava/lang/String;I)V",
                &[JValue::Object(&array), JValue::Int(request_code)],
            )?;
            Ok(())
        })
    }
}

impl UserInterface for JniPlatform {
    fn set_button_glyph(&self, glyph: ButtonGlyph) -> JResult<()> {
        let stop = glyph == ButtonGlyph::Stop;
        self.call(|env, host| {
            env.call_method(host, "setButtonGlyph", "(Z)V", &[JValue::Bool(stop as jboolean)])?;
            Ok(())
        })
    }

    fn show_toast(&self, message: &str) -> JResult<()> {
        self.call(|env, host| {
            let text = env.new_string(message)?;
            env.call_method(host, "showToast", "(Ljava/lang/String;)V", &[JValue::Object(&text)])?;
            Ok(())
        })
    }

    fn notify_log_changed(&self, len: usize) -> JResult<()> {
        self.call(|env, host| {
            env.call_method(host, "notifyLogChanged", "(I)V", &[JValue::Int(len as jint)])?;
            Ok(())
        })
    }
}

// Global logger state - stored as static to persist across JNI calls.
// The sender lives apart from the dispatcher so callbacks that arrive while
// a pump is running can still queue their event.
lazy_static::lazy_static! {
    static ref GLOBAL_DISPATCHER: Mutex<Option<Dispatcher<JniPlatform>>> = Mutex::new(None);
    static ref EVENT_SENDER: Mutex<Option<EventSender>> = Mutex::new(None);
}

fn lock_poisoned() -> LocationLoggerError {
    LocationLoggerError::Internal("Failed to acquire global logger lock".to_string())
}

fn init_logging() {
    #[cfg(target_os = "android")]
    {
        let _ = android_log::init("LocationLogger");
    }
    #[cfg(not(target_os = "android"))]
    {
        let _ = env_logger::try_init();
    }
}

/// Queue an event and drain the queue unless a pump is already running
/// further up this thread's stack.
fn post_and_pump(event: LoggerEvent) -> JResult<()> {
    let sender = EVENT_SENDER
        .lock()
        .map_err(|_| lock_poisoned())?
        .clone()
        .ok_or(LocationLoggerError::NotInitialized)?;
    sender.post(event)?;

    let mut guard = match GLOBAL_DISPATCHER.try_lock() {
        Ok(guard) => guard,
        Err(TryLockError::WouldBlock) => return Ok(()),
        Err(TryLockError::Poisoned(_)) => return Err(lock_poisoned()),
    };
    let dispatcher = guard.as_mut().ok_or(LocationLoggerError::NotInitialized)?;
    dispatcher.pump()?;
    Ok(())
}

/// Read access for the list adapter. Fails instead of blocking when called
/// from inside a host callback.
fn with_dispatcher<T>(f: impl FnOnce(&Dispatcher<JniPlatform>) -> JResult<T>) -> JResult<T> {
    let guard = match GLOBAL_DISPATCHER.try_lock() {
        Ok(guard) => guard,
        Err(TryLockError::WouldBlock) => {
            return Err(LocationLoggerError::Internal(
                "Logger is dispatching; read the size passed to notifyLogChanged".to_string(),
            ))
        }
        Err(TryLockError::Poisoned(_)) => return Err(lock_poisoned()),
    };
    let dispatcher = guard.as_ref().ok_or(LocationLoggerError::NotInitialized)?;
    f(dispatcher)
}

fn status(env: &mut JNIEnv, result: JResult<()>) -> jint {
    match result {
        Ok(_) => 0,
        Err(e) => {
            error!("{}", e);
            let _ = throw_java_exception(env, &e);
            -1
        }
    }
}

fn string_result(env: &mut JNIEnv, result: JResult<Option<String>>) -> jstring {
    match result {
        Ok(Some(text)) => match env.new_string(&text) {
            Ok(jstr) => jstr.into_raw(),
            Err(_) => {
                let _ = throw_java_exception(
                    env,
                    &LocationLoggerError::JniError("Failed to create Java string".to_string()),
                );
                std::ptr::null_mut()
            }
        },
        Ok(None) => std::ptr::null_mut(),
        Err(e) => {
            let _ = throw_java_exception(env, &e);
            std::ptr::null_mut()
        }
    }
}

fn optional_string(env: &mut JNIEnv, value: &JString) -> JResult<Option<String>> {
    if value.is_null() {
        return Ok(None);
    }
    Ok(Some(env.get_string(value)?.into()))
}

/// JNI: Bind the logger to its host activity
/// Parameters: host (callback object), configJson (nullable)
/// Returns: 0 on success, -1 on error (throws Java exception)
#[no_mangle]
pub extern "C" fn Java_priv_moltmann_locationlogger_NativeBridge_nativeInit(
    mut env: JNIEnv,
    _class: JClass,
    host: JObject,
    config_json: JString,
) -> jint {
    let result = init_impl(&mut env, &host, &config_json);
    status(&mut env, result)
}

fn init_impl(env: &mut JNIEnv, host: &JObject, config_json: &JString) -> JResult<()> {
    init_logging();

    let config = match optional_string(env, config_json)? {
        Some(json) => LoggerConfig::from_json_str(&json)?,
        None => LoggerConfig::default(),
    };
    if host.is_null() {
        return Err(LocationLoggerError::InvalidParameters(
            "host must not be null".to_string(),
        ));
    }

    let platform = JniPlatform {
        vm: env.get_java_vm()?,
        host: env.new_global_ref(host)?,
    };
    let dispatcher = Dispatcher::new(LoggingController::new(platform, config));

    *EVENT_SENDER.lock().map_err(|_| lock_poisoned())? = Some(dispatcher.handle());
    *GLOBAL_DISPATCHER.lock().map_err(|_| lock_poisoned())? = Some(dispatcher);

    info!("Location logger initialized");
    Ok(())
}

/// JNI: Drop the logger and its host reference
#[no_mangle]
pub extern "C" fn Java_priv_moltmann_locationlogger_NativeBridge_nativeRelease(
    mut env: JNIEnv,
    _class: JClass,
) -> jint {
    let result = release_impl();
    status(&mut env, result)
}

fn release_impl() -> JResult<()> {
    EVENT_SENDER.lock().map_err(|_| lock_poisoned())?.take();
    GLOBAL_DISPATCHER.lock().map_err(|_| lock_poisoned())?.take();
    info!("Location logger released");
    Ok(())
}

/// JNI: Resume/pause button clicked
/// Returns: 0 on success, -1 on error (throws Java exception)
#[no_mangle]
pub extern "C" fn Java_priv_moltmann_locationlogger_NativeBridge_nativeOnToggleClicked(
    mut env: JNIEnv,
    _class: JClass,
) -> jint {
    let result = post_and_pump(LoggerEvent::ToggleClicked);
    status(&mut env, result)
}

/// JNI: Forwarded `onRequestPermissionsResult`
/// Returns: 0 on success, -1 on error (throws Java exception)
#[no_mangle]
pub extern "C" fn Java_priv_moltmann_locationlogger_NativeBridge_nativeOnRequestPermissionsResult(
    mut env: JNIEnv,
    _class: JClass,
    request_code: jint,
    permissions: JObjectArray,
    grant_results: JIntArray,
) -> jint {
    let result = permissions_result_impl(&mut env, request_code, &permissions, &grant_results)
        .and_then(post_and_pump);
    status(&mut env, result)
}

fn permissions_result_impl(
    env: &mut JNIEnv,
    request_code: jint,
    permissions: &JObjectArray,
    grant_results: &JIntArray,
) -> JResult<LoggerEvent> {
    let mut names = Vec::new();
    if !permissions.is_null() {
        let len = env.get_array_length(permissions)?;
        for i in 0..len {
            let element = env.get_object_array_element(permissions, i)?;
            let name: String = env.get_string(&JString::from(element))?.into();
            names.push(name);
        }
    }

    let mut results = Vec::new();
    if !grant_results.is_null() {
        let len = env.get_array_length(grant_results)?;
        results = vec![0; len as usize];
        env.get_int_array_region(grant_results, 0, &mut results)?;
    }

    Ok(LoggerEvent::PermissionsResult {
        request_code,
        permissions: names,
        grants: results.iter().map(|r| *r == PERMISSION_GRANTED).collect(),
    })
}

/// JNI: `LocationListener.onLocationChanged`
/// Parameters: latitude, longitude (degrees), provider name (nullable)
/// Returns: 0 on success, -1 on error (throws Java exception)
#[no_mangle]
pub extern "C" fn Java_priv_moltmann_locationlogger_NativeBridge_nativeOnLocationChanged(
    mut env: JNIEnv,
    _class: JClass,
    latitude: jdouble,
    longitude: jdouble,
    provider: JString,
) -> jint {
    let result = optional_string(&mut env, &provider).and_then(|provider| {
        post_and_pump(LoggerEvent::LocationChanged {
            latitude,
            longitude,
            provider: provider.as_deref().and_then(Provider::from_name),
        })
    });
    status(&mut env, result)
}

/// JNI: `LocationListener.onProviderEnabled` / `onProviderDisabled`
#[no_mangle]
pub extern "C" fn Java_priv_moltmann_locationlogger_NativeBridge_nativeOnProviderStatus(
    mut env: JNIEnv,
    _class: JClass,
    provider: JString,
    enabled: jboolean,
) -> jint {
    let result = optional_string(&mut env, &provider).and_then(|provider| {
        post_and_pump(LoggerEvent::ProviderStatus {
            provider: provider.unwrap_or_default(),
            enabled: enabled == JNI_TRUE,
        })
    });
    status(&mut env, result)
}

/// JNI: Get current logger state as string
/// Returns: "IDLE", "AWAITING_PERMISSION" or "LOGGING"
#[no_mangle]
pub extern "C" fn Java_priv_moltmann_locationlogger_NativeBridge_nativeGetState(
    mut env: JNIEnv,
    _class: JClass,
) -> jstring {
    let result =
        with_dispatcher(|d| Ok(Some(d.controller().state().as_str().to_string())));
    string_result(&mut env, result)
}

/// JNI: Number of log entries (list adapter `getCount`)
/// Returns: count, or -1 on error (throws Java exception)
#[no_mangle]
pub extern "C" fn Java_priv_moltmann_locationlogger_NativeBridge_nativeGetLogSize(
    mut env: JNIEnv,
    _class: JClass,
) -> jint {
    match with_dispatcher(|d| Ok(d.controller().history().len() as jint)) {
        Ok(len) => len,
        Err(e) => {
            let _ = throw_java_exception(&mut env, &e);
            -1
        }
    }
}

/// JNI: Display text of one log entry (list adapter `getItem`)
/// Returns: entry text, or null when out of range
#[no_mangle]
pub extern "C" fn Java_priv_moltmann_locationlogger_NativeBridge_nativeGetLogEntry(
    mut env: JNIEnv,
    _class: JClass,
    index: jint,
) -> jstring {
    let result = with_dispatcher(|d| {
        if index < 0 {
            return Ok(None);
        }
        Ok(d.controller()
            .history()
            .get(index as usize)
            .map(|entry| entry.text().to_string()))
    });
    string_result(&mut env, result)
}

/// JNI: Export the log as JSON string
/// Returns: JSON string or null on error (throws Java exception)
#[no_mangle]
pub extern "C" fn Java_priv_moltmann_locationlogger_NativeBridge_nativeExportJson(
    mut env: JNIEnv,
    _class: JClass,
) -> jstring {
    let result = with_dispatcher(|d| {
        let controller = d.controller();
        let export = HistoryExport::new(controller.state(), controller.history());
        Ok(Some(export.to_json()?))
    });
    string_result(&mut env, result)
}
