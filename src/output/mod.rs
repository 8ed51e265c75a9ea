//! Post-capture actions
//!
//! What happens to a processed photo is a list of actions run in order:
//! - `show`: open the photo in the viewer
//! - `show_and_email`: open it, then mail it to the participant
//!
//! A failing action is logged and the next one still runs. Nothing here can
//! abort a session.

pub mod deliver;
pub mod viewer;

use crate::config::{BoothMode, Config};
use crate::delivery::Mailer;
use crate::error::CommandError;
use crate::session::Session;
use std::path::Path;
use std::sync::Arc;

/// Trait for post-capture actions
#[async_trait::async_trait]
pub trait PostCaptureAction: Send + Sync {
    /// Act on the processed photo
    async fn run(&self, photo: &Path, session: &Session) -> Result<(), CommandError>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}

/// Build the action list for the configured booth mode
pub fn create_actions(config: &Config, mailer: Arc<dyn Mailer>) -> Vec<Box<dyn PostCaptureAction>> {
    let mut actions: Vec<Box<dyn PostCaptureAction>> = Vec::new();

    if config.viewer.enabled {
        actions.push(Box::new(viewer::ViewerAction::new(
            &config.viewer,
            config.booth.result_hold_ms,
        )));
    }

    if config.booth.mode == BoothMode::ShowAndEmail {
        actions.push(Box::new(deliver::DeliverAction::new(
            mailer,
            config.delivery.clone(),
        )));
    }

    actions
}

/// Run every action in order; failures are logged
pub async fn run_actions(actions: &[Box<dyn PostCaptureAction>], photo: &Path, session: &Session) {
    for action in actions {
        match action.run(photo, session).await {
            Ok(()) => tracing::debug!("{} done", action.name()),
            Err(e) => tracing::warn!("{} failed: {}", action.name(), e),
        }
    }
}
