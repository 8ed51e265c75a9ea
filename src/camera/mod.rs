//! Still-photo capture
//!
//! The booth owns exactly one camera. `Camera` is the seam: the kiosk only
//! asks for a photo at a path, and the implementation decides how.
//! `CommandCamera` shells out to a still-capture program (rpicam-still on
//! Raspberry Pi OS).

pub mod command;

pub use command::CommandCamera;

use crate::error::CameraError;
use crate::session::Session;
use std::path::{Path, PathBuf};

/// Trait for still cameras
#[async_trait::async_trait]
pub trait Camera: Send + Sync {
    /// Take one photo and write it to `output`
    async fn capture(&mut self, output: &Path) -> Result<(), CameraError>;

    /// Release the device
    async fn close(&mut self) -> Result<(), CameraError> {
        Ok(())
    }

    /// Camera name for logs
    fn name(&self) -> &str;
}

/// Capture the session's raw photo into `photos_dir`.
///
/// Returns the path written, `<photos_dir>/<identifier>_<name>_<Y|N>_<Y|N>.jpg`.
pub async fn capture_photo(
    camera: &mut dyn Camera,
    session: &Session,
    photos_dir: &Path,
) -> Result<PathBuf, CameraError> {
    tokio::fs::create_dir_all(photos_dir)
        .await
        .map_err(|e| CameraError::Directory {
            path: photos_dir.to_path_buf(),
            message: e.to_string(),
        })?;

    let path = session.raw_photo_path(photos_dir);
    tracing::info!("Capturing with {} to {:?}", camera.name(), path);
    camera.capture(&path).await?;

    match tokio::fs::metadata(&path).await {
        Ok(meta) if meta.len() > 0 => Ok(path),
        _ => Err(CameraError::MissingOutput(path)),
    }
}
