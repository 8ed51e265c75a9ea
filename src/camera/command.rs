//! Camera backed by an external still-capture command

use super::Camera;
use crate::config::CameraConfig;
use crate::error::CameraError;
use crate::process::{expand_args, run_with_timeout};
use std::path::Path;
use std::time::Duration;

/// Runs e.g. `rpicam-still --nopreview --immediate -o {output}` per photo
pub struct CommandCamera {
    command: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandCamera {
    pub fn new(config: &CameraConfig) -> Self {
        Self {
            command: config.command.clone(),
            args: config.args.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    /// Arguments for one capture
    fn args_for(&self, output: &Path) -> Vec<String> {
        let output = output.to_string_lossy();
        expand_args(&self.args, &[("output", &*output)])
    }
}

#[async_trait::async_trait]
impl Camera for CommandCamera {
    async fn capture(&mut self, output: &Path) -> Result<(), CameraError> {
        let args = self.args_for(output);
        tracing::debug!("Running {} {:?}", self.command, args);

        let result = run_with_timeout(&self.command, &args, None, self.timeout).await?;
        if !result.stderr.is_empty() {
            tracing::trace!("{}: {}", self.command, result.stderr);
        }
        Ok(())
    }

    fn name(&self) -> &str {
        &self.command
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CommandError;

    fn config(command: &str, args: &[&str]) -> CameraConfig {
        CameraConfig {
            command: command.to_string(),
            args: args.iter().map(|s| s.to_string()).collect(),
            timeout_secs: 5,
            photos_dir: None,
        }
    }

    #[test]
    fn test_output_placeholder() {
        let camera = CommandCamera::new(&CameraConfig::default());
        let args = camera.args_for(Path::new("/home/pi/photos/jdoe_alice_Y_N.jpg"));
        assert_eq!(
            args,
            vec![
                "--nopreview",
                "--immediate",
                "-o",
                "/home/pi/photos/jdoe_alice_Y_N.jpg"
            ]
        );
    }

    #[tokio::test]
    async fn test_command_writes_photo() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("shot.jpg");
        let mut camera = CommandCamera::new(&config("sh", &["-c", "echo jpeg > \"$0\"", "{output}"]));

        camera.capture(&output).await.unwrap();
        assert!(output.exists());
    }

    #[tokio::test]
    async fn test_command_failure() {
        let dir = tempfile::tempdir().unwrap();
        let mut camera = CommandCamera::new(&config("false", &[]));

        let result = camera.capture(&dir.path().join("shot.jpg")).await;
        assert!(matches!(
            result,
            Err(CameraError::Command(CommandError::NonZeroExit { .. }))
        ));
    }
}
