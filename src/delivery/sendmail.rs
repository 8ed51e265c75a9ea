//! Mail transport through a sendmail-compatible command
//!
//! The rendered message is written to the command's stdin. With the default
//! `msmtp -t`, recipients come from the headers and the SMTP account
//! (server, TLS, credentials) lives in ~/.msmtprc, outside zoltar's config.

use super::{mime, Mailer, OutgoingMail};
use crate::config::DeliveryConfig;
use crate::error::DeliveryError;
use crate::process::{expand_args, run_with_timeout};
use std::time::Duration;

pub struct CommandMailer {
    command: String,
    args: Vec<String>,
    timeout: Duration,
}

impl CommandMailer {
    pub fn new(config: &DeliveryConfig) -> Self {
        Self {
            command: config.command.clone(),
            args: config.args.clone(),
            timeout: Duration::from_millis(config.timeout_ms),
        }
    }
}

#[async_trait::async_trait]
impl Mailer for CommandMailer {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), DeliveryError> {
        let message = mime::render(mail, &mime::boundary(), chrono::Local::now());
        let args = expand_args(&self.args, &[("recipient", mail.to.as_str())]);
        tracing::debug!(
            "Piping {} byte message to {} {:?}",
            message.len(),
            self.command,
            args
        );

        run_with_timeout(&self.command, &args, Some(message.as_bytes()), self.timeout).await?;
        Ok(())
    }

    fn name(&self) -> &str {
        &self.command
    }
}
