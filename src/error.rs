//! Error types for zoltar
//!
//! Uses thiserror for ergonomic error definitions with clear messages
//! that guide the booth operator toward fixing common issues.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for the zoltar application
#[derive(Error, Debug)]
pub enum BoothError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Display error: {0}")]
    Display(#[from] DisplayError),

    #[error("Trigger error: {0}")]
    Trigger(#[from] TriggerError),

    #[error("Camera error: {0}")]
    Camera(#[from] CameraError),

    #[error("Image pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("Delivery error: {0}")]
    Delivery(#[from] DeliveryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from the terminal surface
#[derive(Error, Debug)]
pub enum DisplayError {
    #[error("Terminal error: {0}")]
    Terminal(String),

    #[error("zoltar needs an interactive terminal (TTY). Run it on the booth console, or over ssh -t.")]
    NotATerminal,

    #[error("Keyboard input closed")]
    InputClosed,

    #[error("Interrupted from the keyboard")]
    Interrupted,
}

impl From<std::io::Error> for DisplayError {
    fn from(e: std::io::Error) -> Self {
        DisplayError::Terminal(e.to_string())
    }
}

/// Errors related to the capture trigger
#[derive(Error, Debug)]
pub enum TriggerError {
    #[error("Cannot open input device '{0}'. Is the user in the 'input' group?\n  Run: sudo usermod -aG input $USER\n  Then log out and back in.")]
    DeviceAccess(String),

    #[error("Unknown key name: '{0}'. Use evtest to find valid key names.")]
    UnknownKey(String),

    #[error("No input device reports key {0}. Check the button wiring or the gpio-key overlay in /boot/config.txt.")]
    NoDevice(String),

    #[error("evdev error: {0}")]
    Evdev(String),

    #[error("Signal handler error: {0}")]
    Signal(String),

    #[error("Trigger source not supported on this platform: {0}")]
    NotSupported(String),
}

/// Errors from running an external command
#[derive(Error, Debug)]
pub enum CommandError {
    #[error("'{0}' not found in PATH. Install it via your package manager.")]
    NotFound(String),

    #[error("failed to spawn '{program}': {message}")]
    Spawn { program: String, message: String },

    #[error("failed to write to stdin: {0}")]
    Write(String),

    #[error("command timed out after {0}s")]
    Timeout(u64),

    #[error("failed to wait for command: {0}")]
    Wait(String),

    #[error("command exited with code {code:?}: {stderr}")]
    NonZeroExit { code: Option<i32>, stderr: String },
}

/// Errors related to taking a photo
#[derive(Error, Debug)]
pub enum CameraError {
    #[error("Capture command failed: {0}\n  Is rpicam-apps installed and the camera ribbon seated?")]
    Command(#[from] CommandError),

    #[error("Capture finished but no photo was written to {0}")]
    MissingOutput(PathBuf),

    #[error("Cannot create photo directory {path}: {message}")]
    Directory { path: PathBuf, message: String },
}

/// Errors from the image pipeline
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Cannot read photo {path}: {message}")]
    Decode { path: PathBuf, message: String },

    #[error("Cannot write processed photo {path}: {message}")]
    Encode { path: PathBuf, message: String },

    #[error("Photo {0} is empty")]
    EmptyImage(PathBuf),

    #[error("Invalid pipeline setting: {0}")]
    InvalidSetting(String),

    #[error("Pipeline worker failed: {0}")]
    Worker(String),
}

/// Errors related to emailing the processed photo
#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("Mail transport failed: {0}\n  Check the msmtp account in ~/.msmtprc.")]
    Transport(#[from] CommandError),

    #[error("Cannot read attachment {path}: {message}")]
    Attachment { path: PathBuf, message: String },
}

/// Result type alias using BoothError
pub type Result<T> = std::result::Result<T, BoothError>;

impl From<std::io::Error> for TriggerError {
    fn from(e: std::io::Error) -> Self {
        TriggerError::Evdev(e.to_string())
    }
}
