//! Emailing the processed photo
//!
//! The recipient is `<identifier>@<domain>`, built from the session. The
//! identifier is used as-is; whether it names a real account is up to the
//! mail server.
//!
//! `deliver` never fails: a missing attachment is logged and the message is
//! sent without it, and a transport failure is logged and dropped.

pub mod mime;
pub mod sendmail;

pub use sendmail::CommandMailer;

use crate::config::DeliveryConfig;
use crate::error::DeliveryError;
use crate::session::Session;
use std::path::Path;

/// File attached to a message
#[derive(Debug, Clone)]
pub struct Attachment {
    pub filename: String,
    pub data: Vec<u8>,
}

/// A message ready for the transport
#[derive(Debug, Clone)]
pub struct OutgoingMail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
    pub attachment: Option<Attachment>,
}

/// Trait for mail transports
#[async_trait::async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), DeliveryError>;

    /// Transport name for logs
    fn name(&self) -> &str;
}

/// What happened to one delivery
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReport {
    pub recipient: String,
    pub attached: bool,
    pub sent: bool,
}

/// Recipient address for a session
pub fn recipient(session: &Session, domain: &str) -> String {
    session.identifier.email(domain)
}

async fn read_attachment(photo: &Path) -> Result<Attachment, DeliveryError> {
    let data = tokio::fs::read(photo)
        .await
        .map_err(|e| DeliveryError::Attachment {
            path: photo.to_path_buf(),
            message: e.to_string(),
        })?;
    let filename = photo
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "photo.jpg".to_string());
    Ok(Attachment { filename, data })
}

/// Mail `photo` to the session's participant
pub async fn deliver(
    mailer: &dyn Mailer,
    config: &DeliveryConfig,
    photo: &Path,
    session: &Session,
) -> DeliveryReport {
    let to = recipient(session, &config.domain);

    let attachment = match read_attachment(photo).await {
        Ok(attachment) => Some(attachment),
        Err(e) => {
            tracing::error!("Failed to attach file: {}", e);
            None
        }
    };
    let attached = attachment.is_some();

    let mail = OutgoingMail {
        from: config.from.clone(),
        to: to.clone(),
        subject: config.subject.clone(),
        body: config.body.clone(),
        attachment,
    };

    let sent = match mailer.send(&mail).await {
        Ok(()) => {
            tracing::info!("Mailed {:?} to {} via {}", photo, to, mailer.name());
            true
        }
        Err(e) => {
            tracing::error!("Failed to send email to {}: {}", to, e);
            false
        }
    };

    DeliveryReport {
        recipient: to,
        attached,
        sent,
    }
}
