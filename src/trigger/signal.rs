//! SIGUSR1 trigger source
//!
//! `zoltar trigger` looks up the kiosk's pid file and sends SIGUSR1, which
//! makes any shell script, cron job or remote button a capture trigger.

use super::{TriggerEvent, TriggerListener};
use crate::error::TriggerError;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::{mpsc, oneshot};

pub struct SignalListener {
    stop_signal: Option<oneshot::Sender<()>>,
}

impl SignalListener {
    pub fn new() -> Self {
        Self { stop_signal: None }
    }
}

impl Default for SignalListener {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl TriggerListener for SignalListener {
    async fn start(&mut self) -> Result<mpsc::Receiver<TriggerEvent>, TriggerError> {
        let mut sigusr1 = signal(SignalKind::user_defined1())
            .map_err(|e| TriggerError::Signal(format!("SIGUSR1 handler: {}", e)))?;

        let (tx, rx) = mpsc::channel(8);
        let (stop_tx, mut stop_rx) = oneshot::channel();
        self.stop_signal = Some(stop_tx);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    received = sigusr1.recv() => {
                        if received.is_none() {
                            break;
                        }
                        tracing::debug!("Received SIGUSR1");
                        if tx.send(TriggerEvent::Signal).await.is_err() {
                            break;
                        }
                    }
                }
            }
            tracing::debug!("Signal trigger stopped");
        });

        tracing::info!("Listening for SIGUSR1 (pid {})", std::process::id());
        Ok(rx)
    }

    async fn stop(&mut self) -> Result<(), TriggerError> {
        if let Some(stop) = self.stop_signal.take() {
            let _ = stop.send(());
        }
        Ok(())
    }

    fn describe(&self) -> String {
        format!("SIGUSR1 to pid {}", std::process::id())
    }
}
