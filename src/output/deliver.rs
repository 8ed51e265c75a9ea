//! Mail the processed photo to the participant

use super::PostCaptureAction;
use crate::config::DeliveryConfig;
use crate::delivery::{deliver, Mailer};
use crate::error::CommandError;
use crate::session::Session;
use std::path::Path;
use std::sync::Arc;

pub struct DeliverAction {
    mailer: Arc<dyn Mailer>,
    config: DeliveryConfig,
}

impl DeliverAction {
    pub fn new(mailer: Arc<dyn Mailer>, config: DeliveryConfig) -> Self {
        Self { mailer, config }
    }
}

#[async_trait::async_trait]
impl PostCaptureAction for DeliverAction {
    /// Never fails; `deliver` logs its own problems
    async fn run(&self, photo: &Path, session: &Session) -> Result<(), CommandError> {
        let report = deliver(self.mailer.as_ref(), &self.config, photo, session).await;
        tracing::debug!("Delivery report: {:?}", report);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "email"
    }
}
