//! Image pipeline: raw photo + theme → framed cartoon
//!
//! `Stylizer` is the seam between the kiosk and the pixel work. Stylizing is
//! CPU-bound and synchronous, so the kiosk calls `render_theme`, which runs
//! the stylizer on tokio's blocking pool.

pub mod cartoon;
pub mod filters;

pub use cartoon::CartoonPipeline;

use crate::error::PipelineError;
use crate::session::Theme;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Trait for photo stylizers
pub trait Stylizer: Send + Sync {
    /// Read `raw`, stylize it for `theme`, and write the result to `output`
    fn stylize(&self, raw: &Path, theme: Theme, output: &Path) -> Result<(), PipelineError>;
}

/// Run `stylizer` on the blocking pool and return the written path
pub async fn render_theme(
    stylizer: Arc<dyn Stylizer>,
    raw: &Path,
    theme: Theme,
    output: &Path,
) -> Result<PathBuf, PipelineError> {
    let raw = raw.to_path_buf();
    let output = output.to_path_buf();

    let start = std::time::Instant::now();
    let written = tokio::task::spawn_blocking(move || {
        stylizer.stylize(&raw, theme, &output).map(|_| output)
    })
    .await
    .map_err(|e| PipelineError::Worker(e.to_string()))??;

    tracing::info!(
        "Rendered {} theme in {:.1}s: {:?}",
        theme,
        start.elapsed().as_secs_f32(),
        written
    );
    Ok(written)
}
