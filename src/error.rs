use jni::JNIEnv;
use thiserror::Error;

/// Location logger error types
#[derive(Error, Debug, Clone)]
pub enum LocationLoggerError {
    #[error("Location permission denied")]
    PermissionDenied,

    #[error("Location logger not initialized")]
    NotInitialized,

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Platform call failed: {0}")]
    Platform(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Export failed: {0}")]
    Export(String),

    #[error("JNI error: {0}")]
    JniError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<jni::errors::Error> for LocationLoggerError {
    fn from(err: jni::errors::Error) -> Self {
        LocationLoggerError::JniError(err.to_string())
    }
}

impl From<serde_json::Error> for LocationLoggerError {
    fn from(err: serde_json::Error) -> Self {
        LocationLoggerError::Export(err.to_string())
    }
}

/// Result type for JNI operations
pub type JResult<T> = Result<T, LocationLoggerError>;

/// Throw Java exception from Rust error
pub fn throw_java_exception(env: &mut JNIEnv, error: &LocationLoggerError) -> JResult<()> {
    let message = error.to_string();
    env.throw_new(exception_class(error), message)
        .map_err(|_| LocationLoggerError::JniError("Failed to throw exception".to_string()))?;

    Ok(())
}

fn exception_class(error: &LocationLoggerError) -> &'static str {
    match error {
        LocationLoggerError::PermissionDenied => "java/lang/SecurityException",
        LocationLoggerError::NotInitialized => "java/lang/IllegalStateException",
        LocationLoggerError::InvalidParameters(_) | LocationLoggerError::Config(_) => {
            "java/lang/IllegalArgumentException"
        }
        LocationLoggerError::Export(_) => "java/io/IOException",
        LocationLoggerError::Platform(_)
        | LocationLoggerError::JniError(_)
        | LocationLoggerError::Internal(_) => "java/lang/RuntimeException",
    }
}
