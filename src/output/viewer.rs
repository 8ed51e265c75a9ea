//! Show the processed photo in an external viewer (feh by default)

use super::PostCaptureAction;
use crate::config::ViewerConfig;
use crate::error::CommandError;
use crate::process::{expand_args, run_with_timeout};
use crate::session::Session;
use std::path::Path;
use std::time::Duration;

/// Opens the photo and closes the viewer after `hold`
pub struct ViewerAction {
    command: String,
    args: Vec<String>,
    hold: Duration,
}

impl ViewerAction {
    pub fn new(config: &ViewerConfig, hold_ms: u64) -> Self {
        Self {
            command: config.command.clone(),
            args: config.args.clone(),
            hold: Duration::from_millis(hold_ms),
        }
    }

    /// Viewer arguments; the photo is appended unless `{photo}` is used
    fn args_for(&self, photo: &Path) -> Vec<String> {
        let photo = photo.to_string_lossy();
        if self.args.iter().any(|a| a.contains("{photo}")) {
            expand_args(&self.args, &[("photo", &*photo)])
        } else {
            let mut args = self.args.clone();
            args.push(photo.into_owned());
            args
        }
    }
}

#[async_trait::async_trait]
impl PostCaptureAction for ViewerAction {
    async fn run(&self, photo: &Path, _session: &Session) -> Result<(), CommandError> {
        let args = self.args_for(photo);
        tracing::debug!("Showing {:?} with {}", photo, self.command);

        match run_with_timeout(&self.command, &args, None, self.hold).await {
            Ok(_) => Ok(()),
            // Still open after the hold time: the viewer is killed, which is the normal path
            Err(CommandError::Timeout(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    fn name(&self) -> &'static str {
        "viewer"
    }
}
