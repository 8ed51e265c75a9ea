//! evdev-based trigger button
//!
//! Watches every input device that can report the configured key. On a
//! Raspberry Pi the shutter button is wired to a GPIO pin and exposed as a
//! key by the kernel:
//!
//! ```text
//! # /boot/firmware/config.txt
//! dtoverlay=gpio-key,gpio=23,active_low=1,gpio_pull=up,keycode=212
//! ```
//!
//! Keycode 212 is KEY_CAMERA, the default `trigger.key`. USB arcade buttons
//! that present as keyboards work the same way with any other key.
//!
//! The user must be in the 'input' group to access /dev/input/* devices.

use super::{TriggerEvent, TriggerListener};
use crate::config::TriggerConfig;
use crate::error::TriggerError;
use evdev::{Device, InputEventKind, Key};
use std::os::unix::io::AsRawFd;
use std::path::PathBuf;
use tokio::sync::{mpsc, oneshot};

/// evdev trigger listener
pub struct EvdevListener {
    /// The key that fires the trigger
    target_key: Key,
    /// Devices able to report `target_key`
    device_paths: Vec<PathBuf>,
    /// Signal to stop the listener task
    stop_signal: Option<oneshot::Sender<()>>,
}

impl EvdevListener {
    pub fn new(config: &TriggerConfig) -> Result<Self, TriggerError> {
        let target_key = parse_key_name(&config.key)?;
        let device_paths = find_devices_with_key(target_key)?;

        if device_paths.is_empty() {
            return Err(TriggerError::NoDevice(format!("{:?}", target_key)));
        }

        tracing::debug!(
            "Found {} device(s) reporting {:?}: {:?}",
            device_paths.len(),
            target_key,
            device_paths
        );

        Ok(Self {
            target_key,
            device_paths,
            stop_signal: None,
        })
    }
}

#[async_trait::async_trait]
impl TriggerListener for EvdevListener {
    async fn start(&mut self) -> Result<mpsc::Receiver<TriggerEvent>, TriggerError> {
        let (tx, rx) = mpsc::channel(8);
        let (stop_tx, stop_rx) = oneshot::channel();
        self.stop_signal = Some(stop_tx);

        let target_key = self.target_key;
        let device_paths = self.device_paths.clone();

        tokio::task::spawn_blocking(move || {
            button_loop(device_paths, target_key, tx, stop_rx);
        });

        Ok(rx)
    }

    async fn stop(&mut self) -> Result<(), TriggerError> {
        if let Some(stop) = self.stop_signal.take() {
            let _ = stop.send(());
        }
        Ok(())
    }

    fn describe(&self) -> String {
        format!("{:?} on {} device(s)", self.target_key, self.device_paths.len())
    }
}

/// Main listener loop running in a blocking task
fn button_loop(
    device_paths: Vec<PathBuf>,
    target_key: Key,
    tx: mpsc::Sender<TriggerEvent>,
    mut stop_rx: oneshot::Receiver<()>,
) {
    // Open in non-blocking mode so one quiet device does not starve the rest
    let mut devices: Vec<Device> = device_paths
        .iter()
        .filter_map(|path| match Device::open(path) {
            Ok(device) => {
                let fd = device.as_raw_fd();
                unsafe {
                    let flags = libc::fcntl(fd, libc::F_GETFL);
                    if flags != -1 {
                        libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK);
                    }
                }
                tracing::debug!("Opened trigger device (non-blocking): {:?}", path);
                Some(device)
            }
            Err(e) => {
                tracing::warn!("Failed to open {:?}: {}", path, e);
                None
            }
        })
        .collect();

    if devices.is_empty() {
        tracing::error!("No trigger devices could be opened");
        return;
    }

    // Held state, so auto-repeat and bounce while held fire only once
    let mut is_pressed = false;

    tracing::info!("Listening for {:?}", target_key);

    loop {
        match stop_rx.try_recv() {
            Ok(_) | Err(oneshot::error::TryRecvError::Closed) => {
                tracing::debug!("Trigger listener stopping");
                return;
            }
            Err(oneshot::error::TryRecvError::Empty) => {}
        }

        for device in &mut devices {
            let Ok(events) = device.fetch_events() else {
                continue;
            };
            for event in events {
                if event.kind() != InputEventKind::Key(target_key) {
                    continue;
                }
                match event.value() {
                    1 if !is_pressed => {
                        is_pressed = true;
                        tracing::debug!("Trigger button pressed");
                        if tx.blocking_send(TriggerEvent::Button).is_err() {
                            return; // Channel closed
                        }
                    }
                    0 => is_pressed = false,
                    _ => {}
                }
            }
        }

        std::thread::sleep(std::time::Duration::from_millis(5));
    }
}

/// Find every input device that can report `key`
fn find_devices_with_key(key: Key) -> Result<Vec<PathBuf>, TriggerError> {
    let mut found = Vec::new();

    let input_dir = std::fs::read_dir("/dev/input")
        .map_err(|e| TriggerError::DeviceAccess(format!("/dev/input: {}", e)))?;

    for entry in input_dir {
        let entry = entry.map_err(|e| TriggerError::DeviceAccess(e.to_string()))?;
        let path = entry.path();

        let is_event_device = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.starts_with("event"))
            .unwrap_or(false);

        if !is_event_device {
            continue;
        }

        match Device::open(&path) {
            Ok(device) => {
                let reports_key = device
                    .supported_keys()
                    .map(|keys| keys.contains(key))
                    .unwrap_or(false);

                if reports_key {
                    tracing::debug!(
                        "Trigger device: {:?} ({:?})",
                        path,
                        device.name().unwrap_or("unknown")
                    );
                    found.push(path);
                }
            }
            Err(e) => {
                if e.kind() == std::io::ErrorKind::PermissionDenied {
                    return Err(TriggerError::DeviceAccess(path.display().to_string()));
                }
                tracing::trace!("Skipping {:?}: {}", path, e);
            }
        }
    }

    Ok(found)
}

/// Parse a key name string to evdev Key
pub fn parse_key_name(name: &str) -> Result<Key, TriggerError> {
    // Normalize: uppercase and replace - or space with _
    let normalized: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '-' | ' ' => '_',
            c => c.to_ascii_uppercase(),
        })
        .collect();

    // BTN_* names are used as-is, everything else gets a KEY_ prefix
    let key_name = if normalized.starts_with("KEY_") || normalized.starts_with("BTN_") {
        normalized
    } else {
        format!("KEY_{}", normalized)
    };

    let key = match key_name.as_str() {
        // Camera and media buttons (gpio-key overlays usually pick these)
        "KEY_CAMERA" => Key::KEY_CAMERA,
        "KEY_CAMERA_FOCUS" => Key::KEY_CAMERA_FOCUS,
        "KEY_RECORD" => Key::KEY_RECORD,
        "KEY_PLAYPAUSE" => Key::KEY_PLAYPAUSE,
        "KEY_PLAY" => Key::KEY_PLAY,
        "KEY_OK" => Key::KEY_OK,
        "KEY_SELECT" => Key::KEY_SELECT,
        "KEY_PROG1" => Key::KEY_PROG1,

        // Generic buttons
        "BTN_0" => Key::BTN_0,
        "BTN_1" => Key::BTN_1,
        "BTN_TRIGGER" => Key::BTN_TRIGGER,
        "BTN_SOUTH" | "BTN_A" => Key::BTN_SOUTH,

        // Keys an arcade button encoder commonly sends
        "KEY_SPACE" => Key::KEY_SPACE,
        "KEY_ENTER" => Key::KEY_ENTER,
        "KEY_1" => Key::KEY_1,
        "KEY_SCROLLLOCK" => Key::KEY_SCROLLLOCK,
        "KEY_PAUSE" => Key::KEY_PAUSE,
        "KEY_F13" => Key::KEY_F13,
        "KEY_F14" => Key::KEY_F14,
        "KEY_F15" => Key::KEY_F15,
        "KEY_F16" => Key::KEY_F16,
        "KEY_F17" => Key::KEY_F17,
        "KEY_F18" => Key::KEY_F18,
        "KEY_F19" => Key::KEY_F19,
        "KEY_F20" => Key::KEY_F20,
        "KEY_F21" => Key::KEY_F21,
        "KEY_F22" => Key::KEY_F22,
        "KEY_F23" => Key::KEY_F23,
        "KEY_F24" => Key::KEY_F24,

        _ => {
            return Err(TriggerError::UnknownKey(format!(
                "{}. Try: CAMERA, BTN_0, SPACE, F13-F24, or run 'evtest' to find key names",
                name
            )));
        }
    };

    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_name() {
        assert_eq!(parse_key_name("CAMERA").unwrap(), Key::KEY_CAMERA);
        assert_eq!(parse_key_name("camera").unwrap(), Key::KEY_CAMERA);
        assert_eq!(parse_key_name("KEY_CAMERA").unwrap(), Key::KEY_CAMERA);
        assert_eq!(parse_key_name("camera-focus").unwrap(), Key::KEY_CAMERA_FOCUS);
        assert_eq!(parse_key_name("BTN_0").unwrap(), Key::BTN_0);
        assert_eq!(parse_key_name("F13").unwrap(), Key::KEY_F13);
    }

    #[test]
    fn test_parse_key_name_error() {
        assert!(matches!(
            parse_key_name("INVALID_KEY_NAME"),
            Err(TriggerError::UnknownKey(_))
        ));
    }
}
