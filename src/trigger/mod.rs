//! Capture trigger sources
//!
//! A trigger is any external "take the photo" signal:
//! - an evdev key (USB arcade button, or a GPIO button exposed as a key by
//!   the Raspberry Pi `gpio-key` overlay)
//! - SIGUSR1, sent by `zoltar trigger` or any other process
//! - the space bar on the booth console (handled by the kiosk through the
//!   display surface, so there is no listener for it)
//!
//! Listeners are started once per process. Their channel stays open for the
//! whole kiosk lifetime; the kiosk decides which events count.

#[cfg(target_os = "linux")]
pub mod evdev_listener;
#[cfg(unix)]
pub mod signal;

use crate::config::{TriggerConfig, TriggerSource};
use crate::error::TriggerError;
use tokio::sync::mpsc;

/// Events emitted by a trigger listener
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerEvent {
    /// Hardware button (evdev key) pressed
    Button,
    /// SIGUSR1 received
    Signal,
}

/// Trait for capture trigger implementations
#[async_trait::async_trait]
pub trait TriggerListener: Send + Sync {
    /// Start listening for trigger events
    /// Returns a channel receiver for events
    async fn start(&mut self) -> Result<mpsc::Receiver<TriggerEvent>, TriggerError>;

    /// Stop listening and clean up
    async fn stop(&mut self) -> Result<(), TriggerError>;

    /// Short description for logs and `zoltar check`
    fn describe(&self) -> String;
}

/// Create the listener for the configured source.
///
/// Returns `None` for the keyboard source.
pub fn create_listener(
    config: &TriggerConfig,
) -> Result<Option<Box<dyn TriggerListener>>, TriggerError> {
    match config.source {
        TriggerSource::Keyboard => Ok(None),
        TriggerSource::Signal => signal_listener(),
        TriggerSource::Evdev => evdev_listener(config),
    }
}

#[cfg(unix)]
fn signal_listener() -> Result<Option<Box<dyn TriggerListener>>, TriggerError> {
    Ok(Some(Box::new(signal::SignalListener::new())))
}

#[cfg(not(unix))]
fn signal_listener() -> Result<Option<Box<dyn TriggerListener>>, TriggerError> {
    Err(TriggerError::NotSupported(
        "SIGUSR1 triggers need a Unix platform".to_string(),
    ))
}

#[cfg(target_os = "linux")]
fn evdev_listener(
    config: &TriggerConfig,
) -> Result<Option<Box<dyn TriggerListener>>, TriggerError> {
    Ok(Some(Box::new(evdev_listener::EvdevListener::new(config)?)))
}

#[cfg(not(target_os = "linux"))]
fn evdev_listener(
    _config: &TriggerConfig,
) -> Result<Option<Box<dyn TriggerListener>>, TriggerError> {
    Err(TriggerError::NotSupported(
        "evdev buttons are Linux only. Use source = \"signal\" or \"keyboard\".".to_string(),
    ))
}

/// Trigger fired from code, for rehearsals and tests
pub struct ManualTrigger {
    tx: mpsc::Sender<TriggerEvent>,
    rx: Option<mpsc::Receiver<TriggerEvent>>,
}

impl ManualTrigger {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel(8);
        Self { tx, rx: Some(rx) }
    }

    /// Sender that fires the trigger
    pub fn handle(&self) -> mpsc::Sender<TriggerEvent> {
        self.tx.clone()
    }
}

impl Default for ManualTrigger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl TriggerListener for ManualTrigger {
    async fn start(&mut self) -> Result<mpsc::Receiver<TriggerEvent>, TriggerError> {
        self.rx
            .take()
            .ok_or_else(|| TriggerError::Signal("manual trigger already started".to_string()))
    }

    async fn stop(&mut self) -> Result<(), TriggerError> {
        Ok(())
    }

    fn describe(&self) -> String {
        "manual".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyboard_source_has_no_listener() {
        let config = TriggerConfig {
            source: TriggerSource::Keyboard,
            key: "CAMERA".to_string(),
        };
        assert!(create_listener(&config).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_manual_trigger_starts_once() {
        let mut trigger = ManualTrigger::new();
        let handle = trigger.handle();
        let mut rx = trigger.start().await.unwrap();

        handle.send(TriggerEvent::Button).await.unwrap();
        assert_eq!(rx.recv().await, Some(TriggerEvent::Button));
        assert!(trigger.start().await.is_err());
    }
}
