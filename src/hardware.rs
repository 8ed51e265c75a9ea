//! Booth hardware context
//!
//! One camera and at most one trigger listener per process, owned by a
//! single value. `release` stops the listener and closes the camera; if the
//! context is dropped without it (panic, early return) the listener still
//! stops because its stop channel and event receiver are dropped with it.

use crate::camera::{Camera, CommandCamera};
use crate::config::Config;
use crate::error::BoothError;
use crate::trigger::{self, TriggerEvent, TriggerListener};
use tokio::sync::mpsc;

pub struct BoothHardware {
    camera: Box<dyn Camera>,
    trigger: Option<Box<dyn TriggerListener>>,
    events: Option<mpsc::Receiver<TriggerEvent>>,
    released: bool,
}

impl BoothHardware {
    /// Take ownership of the devices and start the trigger listener
    pub async fn acquire(
        camera: Box<dyn Camera>,
        mut trigger: Option<Box<dyn TriggerListener>>,
    ) -> Result<Self, BoothError> {
        let events = match trigger.as_mut() {
            Some(listener) => {
                tracing::info!("Trigger: {}", listener.describe());
                Some(listener.start().await?)
            }
            None => {
                tracing::info!("Trigger: space bar on the booth console");
                None
            }
        };

        Ok(Self {
            camera,
            trigger,
            events,
            released: false,
        })
    }

    /// Devices described by the configuration
    pub async fn from_config(config: &Config) -> Result<Self, BoothError> {
        let camera = Box::new(CommandCamera::new(&config.camera));
        let listener = trigger::create_listener(&config.trigger)?;
        Self::acquire(camera, listener).await
    }

    pub fn camera(&mut self) -> &mut dyn Camera {
        self.camera.as_mut()
    }

    /// Whether captures wait for a listener (false: space bar)
    pub fn has_trigger_listener(&self) -> bool {
        self.events.is_some()
    }

    /// Discard trigger events that arrived while nobody was waiting
    pub fn drain_triggers(&mut self) -> usize {
        let Some(events) = self.events.as_mut() else {
            return 0;
        };
        let mut drained = 0;
        while events.try_recv().is_ok() {
            drained += 1;
        }
        if drained > 0 {
            tracing::debug!("Ignored {} early trigger event(s)", drained);
        }
        drained
    }

    /// Next trigger event; `None` once the listener has stopped.
    /// Pends forever when there is no listener.
    pub async fn next_trigger(&mut self) -> Option<TriggerEvent> {
        match self.events.as_mut() {
            Some(events) => events.recv().await,
            None => std::future::pending().await,
        }
    }

    /// Forget a listener that stopped; captures fall back to the space bar
    pub fn drop_trigger_listener(&mut self) {
        self.events = None;
    }

    /// Stop the trigger listener and close the camera
    pub async fn release(mut self) {
        if let Some(mut listener) = self.trigger.take() {
            if let Err(e) = listener.stop().await {
                tracing::warn!("Failed to stop trigger listener: {}", e);
            }
        }
        self.events = None;

        if let Err(e) = self.camera.close().await {
            tracing::warn!("Failed to close camera: {}", e);
        }
        self.released = true;
        tracing::info!("Booth hardware released");
    }
}

impl Drop for BoothHardware {
    fn drop(&mut self) {
        if !self.released {
            tracing::warn!("Booth hardware dropped without release");
        }
    }
}
