//! Kiosk module - main booth loop
//!
//! Serves one participant after another:
//! attract → interview → armed → countdown + capture → processing →
//! post-capture actions → back to the attract screen.
//!
//! A camera or pipeline failure abandons the current session only. The loop
//! ends on SIGTERM, SIGINT, Ctrl+C on the console, or when console input
//! closes; the hardware context is released on every one of those paths.

use crate::attract;
use crate::camera::capture_photo;
use crate::config::Config;
use crate::countdown::Countdown;
use crate::delivery::{CommandMailer, Mailer};
use crate::display::{DisplaySurface, Key, Style};
use crate::error::{BoothError, DisplayError, Result};
use crate::hardware::BoothHardware;
use crate::output::{self, PostCaptureAction};
use crate::pipeline::{render_theme, CartoonPipeline, Stylizer};
use crate::session::{processed_photo_path, Session};
use crate::state::KioskState;
use crate::trigger::TriggerEvent;
use crate::wizard::{spool_text, Interview, WizardSettings};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal::unix::{signal, SignalKind};

/// How often the armed wait checks the console for Ctrl+C
const KEY_POLL: Duration = Duration::from_millis(250);

/// Write state to file for external integrations (status bars, `zoltar status`)
fn write_state_file(path: &Path, state: KioskState) {
    if let Some(parent) = path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            tracing::warn!("Failed to create state file directory: {}", e);
            return;
        }
    }

    if let Err(e) = std::fs::write(path, state.as_str()) {
        tracing::warn!("Failed to write state file: {}", e);
    } else {
        tracing::trace!("State file updated: {}", state);
    }
}

/// Remove state file on shutdown
fn cleanup_state_file(path: &Path) {
    if path.exists() {
        if let Err(e) = std::fs::remove_file(path) {
            tracing::warn!("Failed to remove state file: {}", e);
        }
    }
}

/// Write PID file so `zoltar trigger` can find the kiosk
fn write_pid_file(pid_path: &Path) -> Option<PathBuf> {
    if let Some(parent) = pid_path.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            tracing::warn!("Failed to create PID file directory: {}", e);
            return None;
        }
    }

    let pid = std::process::id();
    if let Err(e) = std::fs::write(pid_path, pid.to_string()) {
        tracing::warn!("Failed to write PID file: {}", e);
        return None;
    }

    tracing::debug!("PID file written: {:?} (pid={})", pid_path, pid);
    Some(pid_path.to_path_buf())
}

/// Remove PID file on shutdown
fn cleanup_pid_file(path: &Path) {
    if path.exists() {
        if let Err(e) = std::fs::remove_file(path) {
            tracing::warn!("Failed to remove PID file: {}", e);
        }
    }
}

/// How one pass through the booth ended
#[derive(Debug)]
pub enum SessionOutcome {
    /// Photo captured, stylized and handed to the post-capture actions
    Completed {
        raw: PathBuf,
        processed: PathBuf,
        session: Session,
    },
    /// Capture or processing failed; the participant starts over
    Abandoned(String),
}

/// The booth: interview, capture and post-capture wiring
pub struct Kiosk {
    config: Config,
    settings: WizardSettings,
    countdown: Countdown,
    stylizer: Arc<dyn Stylizer>,
    actions: Vec<Box<dyn PostCaptureAction>>,
    state_file_path: Option<PathBuf>,
    pid_file_path: Option<PathBuf>,
    photos_dir: PathBuf,
    processed_dir: PathBuf,
}

impl Kiosk {
    pub fn new(
        config: Config,
        stylizer: Arc<dyn Stylizer>,
        actions: Vec<Box<dyn PostCaptureAction>>,
    ) -> Self {
        Self {
            settings: WizardSettings::from_config(&config),
            countdown: Countdown::new(&config.countdown),
            state_file_path: config.resolve_state_file(),
            pid_file_path: Some(Config::runtime_dir().join("pid")),
            photos_dir: config.photos_dir(),
            processed_dir: config.processed_dir(),
            stylizer,
            actions,
            config,
        }
    }

    /// Kiosk with the cartoon pipeline and the configured mail command
    pub fn from_config(config: Config) -> Result<Self> {
        let stylizer: Arc<dyn Stylizer> = Arc::new(CartoonPipeline::new(&config.pipeline)?);
        let mailer: Arc<dyn Mailer> = Arc::new(CommandMailer::new(&config.delivery));
        let actions = output::create_actions(&config, mailer);

        tracing::debug!(
            "Post-capture actions: {}",
            actions
                .iter()
                .map(|a| a.name())
                .collect::<Vec<_>>()
                .join(" -> ")
        );

        Ok(Self::new(config, stylizer, actions))
    }

    /// Replace the interview text and timing
    pub fn with_wizard_settings(mut self, settings: WizardSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Where to write the PID file, or `None` to skip it
    pub fn with_pid_file(mut self, path: Option<PathBuf>) -> Self {
        self.pid_file_path = path;
        self
    }

    /// Update the state file if configured
    fn update_state(&self, state: KioskState) {
        tracing::debug!("Kiosk state: {}", state);
        if let Some(ref path) = self.state_file_path {
            write_state_file(path, state);
        }
    }

    /// Serve one participant, from the attract screen to the post-capture
    /// actions.
    ///
    /// Display errors end the kiosk and are returned; every other failure is
    /// reported as `SessionOutcome::Abandoned`.
    pub async fn serve_session(
        &self,
        surface: &mut dyn DisplaySurface,
        hardware: &mut BoothHardware,
    ) -> std::result::Result<SessionOutcome, DisplayError> {
        self.update_state(KioskState::Idle);
        if self.config.booth.attract {
            attract::run(&mut *surface).await?;
        }

        self.update_state(KioskState::Interview);
        let session = Interview::new(&mut *surface, &self.settings).run().await?;
        tracing::info!(
            "Interview complete: {} ({}), theme {}",
            session.name,
            session.identifier,
            session.theme
        );

        self.update_state(KioskState::Armed);
        hardware.drain_triggers();
        let source = self.wait_for_trigger(&mut *surface, hardware).await?;
        tracing::info!("Capture triggered by {}", source);

        self.update_state(KioskState::Capturing);
        self.countdown.run(&mut *surface).await?;
        let raw = match capture_photo(hardware.camera(), &session, &self.photos_dir).await {
            Ok(path) => path,
            Err(e) => {
                tracing::error!("Capture failed: {}", e);
                self.show_notice(surface, "The camera blinked. Please start over.")
                    .await?;
                self.update_state(KioskState::Idle);
                return Ok(SessionOutcome::Abandoned(e.to_string()));
            }
        };

        self.update_state(KioskState::Processing);
        self.show_message(surface, "Processing your photo...").await?;
        let output = processed_photo_path(&raw, &self.processed_dir);
        let processed =
            match render_theme(self.stylizer.clone(), &raw, session.theme, &output).await {
                Ok(path) => path,
                Err(e) => {
                    tracing::error!("Processing {:?} failed: {}", raw, e);
                    self.show_notice(surface, "Something went wrong. Please start over.")
                        .await?;
                    self.update_state(KioskState::Idle);
                    return Ok(SessionOutcome::Abandoned(e.to_string()));
                }
            };

        self.update_state(KioskState::Delivering);
        output::run_actions(&self.actions, &processed, &session).await;

        self.update_state(KioskState::Idle);
        Ok(SessionOutcome::Completed {
            raw,
            processed,
            session,
        })
    }

    /// Block until the capture trigger fires. Returns what fired it.
    ///
    /// Without a listener the space bar is the trigger. With one, the console
    /// is still polled so Ctrl+C is noticed while waiting.
    async fn wait_for_trigger(
        &self,
        surface: &mut dyn DisplaySurface,
        hardware: &mut BoothHardware,
    ) -> std::result::Result<&'static str, DisplayError> {
        let mut console_open = true;
        loop {
            if !hardware.has_trigger_listener() {
                if surface.read_key().await? == Key::Char(' ') {
                    return Ok("space bar");
                }
                continue;
            }

            if !console_open {
                return Ok(match hardware.next_trigger().await {
                    Some(TriggerEvent::Button) => "button",
                    Some(TriggerEvent::Signal) => "signal",
                    None => return Err(DisplayError::InputClosed),
                });
            }

            let fired = tokio::select! {
                event = hardware.next_trigger() => Some(event),
                key = surface.poll_key(KEY_POLL) => {
                    match key {
                        Ok(_) => {}
                        // The button still works without a console
                        Err(DisplayError::InputClosed) => {
                            tracing::debug!("Console input closed while armed");
                            console_open = false;
                        }
                        Err(e) => return Err(e),
                    }
                    None
                }
            };

            match fired {
                Some(Some(TriggerEvent::Button)) => return Ok("button"),
                Some(Some(TriggerEvent::Signal)) => return Ok("signal"),
                Some(None) => {
                    tracing::warn!("Trigger listener stopped, falling back to the space bar");
                    hardware.drop_trigger_listener();
                }
                None => {}
            }
        }
    }

    /// One centred line on a fresh window
    async fn show_message(
        &self,
        surface: &mut dyn DisplaySurface,
        text: &str,
    ) -> std::result::Result<(), DisplayError> {
        let (rows, _) = surface.size();
        surface.clear()?;
        surface.draw_border(Style::Frame)?;
        spool_text(
            surface,
            rows / 2,
            text,
            Style::Title,
            self.settings.spool_delay,
        )
        .await
    }

    /// Like `show_message`, held on screen long enough to read
    async fn show_notice(
        &self,
        surface: &mut dyn DisplaySurface,
        text: &str,
    ) -> std::result::Result<(), DisplayError> {
        self.show_message(surface, text).await?;
        tokio::time::sleep(self.settings.retry_pause).await;
        Ok(())
    }

    /// Run the kiosk until shutdown, then release the hardware
    pub async fn run(
        &self,
        surface: &mut dyn DisplaySurface,
        mut hardware: BoothHardware,
    ) -> Result<()> {
        tracing::info!("Starting zoltar kiosk ({:?} mode)", self.config.booth.mode);

        let pid_file = self.pid_file_path.as_deref().and_then(write_pid_file);
        if let Some(ref path) = self.state_file_path {
            tracing::info!("State file: {:?}", path);
        }

        let result = self.serve_until_shutdown(surface, &mut hardware).await;

        // Cleanup
        hardware.release().await;

        if let Some(ref path) = self.state_file_path {
            cleanup_state_file(path);
        }
        if let Some(ref path) = pid_file {
            cleanup_pid_file(path);
        }

        tracing::info!("Kiosk stopped");
        result
    }

    async fn serve_until_shutdown(
        &self,
        surface: &mut dyn DisplaySurface,
        hardware: &mut BoothHardware,
    ) -> Result<()> {
        let mut sigterm = signal(SignalKind::terminate())
            .map_err(|e| BoothError::Config(format!("Failed to set up SIGTERM handler: {}", e)))?;

        self.config.ensure_directories()?;
        tracing::info!(
            "Photos: {:?}, processed: {:?}",
            self.photos_dir,
            self.processed_dir
        );

        let sessions = async {
            let mut served = 0u64;
            loop {
                match self.serve_session(&mut *surface, &mut *hardware).await {
                    Ok(SessionOutcome::Completed { processed, .. }) => {
                        served += 1;
                        tracing::info!("Session {} complete: {:?}", served, processed);
                    }
                    Ok(SessionOutcome::Abandoned(reason)) => {
                        tracing::warn!("Session abandoned: {}", reason);
                    }
                    Err(e) => return e,
                }
            }
        };

        tokio::select! {
            e = sessions => match e {
                DisplayError::Interrupted => {
                    tracing::info!("Interrupted from the console, shutting down...");
                    Ok(())
                }
                DisplayError::InputClosed => {
                    tracing::info!("Console input closed, shutting down...");
                    Ok(())
                }
                e => Err(e.into()),
            },

            // Handle graceful shutdown (SIGINT from Ctrl+C)
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received SIGINT, shutting down...");
                Ok(())
            }

            // Handle graceful shutdown (SIGTERM from systemctl stop)
            _ = sigterm.recv() => {
                tracing::info!("Received SIGTERM, shutting down...");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::Camera;
    use crate::display::ScriptedSurface;
    use crate::error::{CameraError, CommandError, PipelineError};
    use crate::session::Theme;
    use crate::trigger::ManualTrigger;

    struct FailingCamera;

    #[async_trait::async_trait]
    impl Camera for FailingCamera {
        async fn capture(&mut self, _output: &Path) -> std::result::Result<(), CameraError> {
            Err(CameraError::Command(CommandError::NotFound(
                "rpicam-still".to_string(),
            )))
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    struct CopyStylizer;

    impl Stylizer for CopyStylizer {
        fn stylize(
            &self,
            raw: &Path,
            _theme: Theme,
            output: &Path,
        ) -> std::result::Result<(), PipelineError> {
            std::fs::copy(raw, output)
                .map(|_| ())
                .map_err(|e| PipelineError::Encode {
                    path: output.to_path_buf(),
                    message: e.to_string(),
                })
        }
    }

    fn test_config(dir: &Path) -> Config {
        let mut config = Config::default();
        config.booth.attract = false;
        config.countdown.step_ms = 0;
        config.countdown.settle_ms = 0;
        config.camera.photos_dir = Some(dir.join("photos"));
        config.viewer.enabled = false;
        config.state_file = Some(dir.join("state").display().to_string());
        config
    }

    fn interview_keys() -> Vec<Key> {
        let mut keys = vec![Key::Enter];
        keys.extend(Key::typed("alice"));
        keys.push(Key::Enter);
        keys.push(Key::Enter);
        keys.extend(Key::swipe(";1234jdoe?"));
        keys.push(Key::Other);
        keys.push(Key::Enter);
        keys.push(Key::Enter);
        keys
    }

    #[test]
    fn test_state_and_pid_files() {
        let dir = tempfile::tempdir().unwrap();
        let state = dir.path().join("run").join("state");

        write_state_file(&state, KioskState::Armed);
        assert_eq!(std::fs::read_to_string(&state).unwrap(), "armed");
        cleanup_state_file(&state);
        assert!(!state.exists());

        let pid = dir.path().join("pid");
        let written = write_pid_file(&pid).unwrap();
        assert_eq!(
            std::fs::read_to_string(&written).unwrap(),
            std::process::id().to_string()
        );
        cleanup_pid_file(&written);
        assert!(!pid.exists());
    }

    #[tokio::test]
    async fn test_camera_failure_abandons_session() {
        let dir = tempfile::tempdir().unwrap();
        let kiosk = Kiosk::new(test_config(dir.path()), Arc::new(CopyStylizer), Vec::new())
            .with_wizard_settings(WizardSettings::default().instant())
            .with_pid_file(None);

        let mut keys = interview_keys();
        keys.push(Key::Char(' '));
        let mut surface = ScriptedSurface::new(keys);
        let mut hardware = BoothHardware::acquire(Box::new(FailingCamera), None)
            .await
            .unwrap();

        let outcome = kiosk.serve_session(&mut surface, &mut hardware).await.unwrap();
        assert!(matches!(outcome, SessionOutcome::Abandoned(_)));
        assert!(surface.shows("Please start over"));
        assert_eq!(
            std::fs::read_to_string(dir.path().join("state")).unwrap(),
            "idle"
        );
        hardware.release().await;
    }

    #[tokio::test]
    async fn test_trigger_before_arming_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let kiosk = Kiosk::new(test_config(dir.path()), Arc::new(CopyStylizer), Vec::new())
            .with_wizard_settings(WizardSettings::default().instant())
            .with_pid_file(None);

        let trigger = ManualTrigger::new();
        let handle = trigger.handle();
        let mut hardware = BoothHardware::acquire(Box::new(FailingCamera), Some(Box::new(trigger)))
            .await
            .unwrap();

        // Pressed during the interview, drained when the kiosk arms
        handle.send(TriggerEvent::Button).await.unwrap();

        let mut surface = ScriptedSurface::new(interview_keys());
        let state_file = dir.path().join("state");
        let fire = tokio::spawn(async move {
            loop {
                if std::fs::read_to_string(&state_file).ok().as_deref() == Some("armed") {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            // Still armed after the early press was drained
            tokio::time::sleep(Duration::from_millis(50)).await;
            let still_armed =
                std::fs::read_to_string(&state_file).ok().as_deref() == Some("armed");
            handle.send(TriggerEvent::Signal).await.unwrap();
            still_armed
        });

        let outcome = kiosk.serve_session(&mut surface, &mut hardware).await.unwrap();
        assert!(fire.await.unwrap());
        assert!(matches!(outcome, SessionOutcome::Abandoned(_)));
        hardware.release().await;
    }

    #[tokio::test]
    async fn test_run_stops_when_input_closes() {
        let dir = tempfile::tempdir().unwrap();
        let pid = dir.path().join("pid");
        let kiosk = Kiosk::new(test_config(dir.path()), Arc::new(CopyStylizer), Vec::new())
            .with_wizard_settings(WizardSettings::default().instant())
            .with_pid_file(Some(pid.clone()));

        let mut surface = ScriptedSurface::new(Vec::new());
        let hardware = BoothHardware::acquire(Box::new(FailingCamera), None)
            .await
            .unwrap();

        kiosk.run(&mut surface, hardware).await.unwrap();
        assert!(!pid.exists());
        assert!(!dir.path().join("state").exists());
        assert!(dir.path().join("photos").is_dir());
    }
}
