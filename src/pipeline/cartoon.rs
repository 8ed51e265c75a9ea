//! Cartoon stylizer
//!
//! Stages:
//! 1. grayscale, median blur, adaptive mean threshold → edge mask
//! 2. k-means colour quantisation (fitted on a pixel sample)
//! 3. mask the quantised image so edges become black lines
//! 4. contrast/brightness
//! 5. white padding above and below, room for the frame artwork
//! 6. alpha-composite the theme's overlay frame
//!
//! A missing or unreadable overlay is logged and the photo is written
//! without a frame.

use super::filters::{self, KMeansCriteria};
use super::Stylizer;
use crate::config::{OverlayConfig, PipelineConfig};
use crate::error::PipelineError;
use crate::session::Theme;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, RgbaImage};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Pixels fed to k-means; quantisation is applied to every pixel
const KMEANS_SAMPLE: usize = 10_000;

const JPEG_QUALITY: u8 = 92;

/// Cartoon stylizer with per-theme overlay frames.
///
/// There is no face-region pass (a smoothed face crop blended back in at
/// weight 0.2) since that needs a face detector. Faces get the same
/// quantisation and edge lines as the rest of the photo.
pub struct CartoonPipeline {
    clusters: usize,
    median_kernel: u32,
    threshold_block: u32,
    threshold_offset: i32,
    contrast: f32,
    brightness: f32,
    pad_top: u32,
    pad_bottom: u32,
    overlays: OverlayConfig,
    /// Fixed seed for reproducible output
    seed: Option<u64>,
}

impl CartoonPipeline {
    pub fn new(config: &PipelineConfig) -> Result<Self, PipelineError> {
        if config.clusters == 0 {
            return Err(PipelineError::InvalidSetting(
                "pipeline.clusters must be at least 1".to_string(),
            ));
        }
        if config.median_kernel % 2 == 0 {
            return Err(PipelineError::InvalidSetting(format!(
                "pipeline.median_kernel must be odd, got {}",
                config.median_kernel
            )));
        }
        if config.threshold_block < 3 || config.threshold_block % 2 == 0 {
            return Err(PipelineError::InvalidSetting(format!(
                "pipeline.threshold_block must be odd and at least 3, got {}",
                config.threshold_block
            )));
        }

        Ok(Self {
            clusters: config.clusters,
            median_kernel: config.median_kernel,
            threshold_block: config.threshold_block,
            threshold_offset: config.threshold_offset,
            contrast: config.contrast,
            brightness: config.brightness,
            pad_top: config.pad_top,
            pad_bottom: config.pad_bottom,
            overlays: config.overlays.clone(),
            seed: None,
        })
    }

    /// Seed k-means initialisation (tests, repeatable renders)
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Load the overlay for `theme`, if configured and readable
    fn overlay(&self, theme: Theme) -> Option<RgbaImage> {
        let path = self.overlays.for_theme(theme)?;
        match image::open(path) {
            Ok(img) => Some(img.to_rgba8()),
            Err(e) => {
                tracing::warn!("Overlay {:?} for {} unusable, skipping frame: {}", path, theme, e);
                None
            }
        }
    }

    /// Stylize a decoded photo
    pub fn render(&self, photo: &DynamicImage, theme: Theme) -> RgbaImage {
        let rgb = photo.to_rgb8();
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let gray = image::imageops::grayscale(&rgb);
        let blurred = filters::median_blur(&gray, self.median_kernel);
        let edges =
            filters::adaptive_threshold_mean(&blurred, self.threshold_block, self.threshold_offset);

        let sample = filters::sample_pixels(&rgb, KMEANS_SAMPLE, &mut rng);
        let centers = filters::kmeans(&sample, self.clusters, KMeansCriteria::default(), &mut rng);
        let mut cartoon = filters::quantize(&rgb, &centers);

        filters::apply_mask(&mut cartoon, &edges);
        filters::convert_scale_abs(&mut cartoon, self.contrast, self.brightness);

        let padded = filters::pad_white(&cartoon, self.pad_top, self.pad_bottom);
        let mut framed = DynamicImage::ImageRgb8(padded).to_rgba8();

        if let Some(overlay) = self.overlay(theme) {
            let (width, height) = framed.dimensions();
            let overlay = if overlay.dimensions() == (width, height) {
                overlay
            } else {
                tracing::debug!(
                    "Resizing overlay {:?} to {}x{}",
                    overlay.dimensions(),
                    width,
                    height
                );
                image::imageops::resize(&overlay, width, height, FilterType::Triangle)
            };
            filters::composite_over(&mut framed, &overlay);
        }

        framed
    }
}

impl Stylizer for CartoonPipeline {
    fn stylize(&self, raw: &Path, theme: Theme, output: &Path) -> Result<(), PipelineError> {
        let photo = image::open(raw).map_err(|e| PipelineError::Decode {
            path: raw.to_path_buf(),
            message: e.to_string(),
        })?;
        if photo.width() == 0 || photo.height() == 0 {
            return Err(PipelineError::EmptyImage(raw.to_path_buf()));
        }
        tracing::debug!("Stylizing {:?} ({}x{})", raw, photo.width(), photo.height());

        let framed = self.render(&photo, theme);
        // JPEG has no alpha channel
        let flattened = DynamicImage::ImageRgba8(framed).to_rgb8();

        let encode_err = |message: String| PipelineError::Encode {
            path: output.to_path_buf(),
            message,
        };
        if let Some(parent) = output.parent() {
            std::fs::create_dir_all(parent).map_err(|e| encode_err(e.to_string()))?;
        }
        let file = File::create(output).map_err(|e| encode_err(e.to_string()))?;
        let encoder = JpegEncoder::new_with_quality(BufWriter::new(file), JPEG_QUALITY);
        flattened
            .write_with_encoder(encoder)
            .map_err(|e| encode_err(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage, Rgba};

    fn config(dir: &Path) -> PipelineConfig {
        PipelineConfig {
            output_dir: Some(dir.join("photos_cartoon")),
            clusters: 4,
            pad_top: 6,
            pad_bottom: 4,
            ..PipelineConfig::default()
        }
    }

    fn write_photo(path: &Path) {
        let img = RgbImage::from_fn(32, 24, |x, y| {
            Rgb([(x * 8) as u8, (y * 10) as u8, if x > 16 { 200 } else { 40 }])
        });
        img.save(path).unwrap();
    }

    #[test]
    fn test_rejects_even_kernel() {
        let mut config = PipelineConfig::default();
        config.median_kernel = 6;
        assert!(matches!(
            CartoonPipeline::new(&config),
            Err(PipelineError::InvalidSetting(_))
        ));
    }

    #[test]
    fn test_render_pads_photo() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = CartoonPipeline::new(&config(dir.path())).unwrap().with_seed(1);
        let photo = DynamicImage::ImageRgb8(RgbImage::from_pixel(10, 8, Rgb([90, 90, 90])));

        let out = pipeline.render(&photo, Theme::Expression);
        assert_eq!(out.dimensions(), (10, 18));
        assert_eq!(out.get_pixel(0, 0), &Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn test_stylize_without_overlay() {
        let dir = tempfile::tempdir().unwrap();
        let raw = dir.path().join("jdoe_alice_Y_N.jpg");
        write_photo(&raw);
        let output = dir.path().join("photos_cartoon/jdoe_alice_Y_N_cart.jpg");

        let pipeline = CartoonPipeline::new(&config(dir.path())).unwrap();
        pipeline.stylize(&raw, Theme::Justice, &output).unwrap();

        let written = image::open(&output).unwrap();
        assert_eq!((written.width(), written.height()), (32, 34));
    }

    #[test]
    fn test_missing_overlay_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let raw = dir.path().join("raw.png");
        write_photo(&raw);

        let mut config = config(dir.path());
        config.overlays.justice = Some(dir.path().join("no-such-frame.png"));
        let pipeline = CartoonPipeline::new(&config).unwrap();

        let output = dir.path().join("out.jpg");
        pipeline.stylize(&raw, Theme::Justice, &output).unwrap();
        assert!(output.exists());
    }

    #[test]
    fn test_overlay_is_resized_and_composited() {
        let dir = tempfile::tempdir().unwrap();
        let frame = dir.path().join("frame.png");
        RgbaImage::from_pixel(4, 4, Rgba([255, 0, 0, 255]))
            .save(&frame)
            .unwrap();

        let mut config = config(dir.path());
        config.overlays.expression = Some(frame);
        let pipeline = CartoonPipeline::new(&config).unwrap().with_seed(2);
        let photo = DynamicImage::ImageRgb8(RgbImage::from_pixel(10, 8, Rgb([0, 0, 255])));

        let out = pipeline.render(&photo, Theme::Expression);
        assert_eq!(out.dimensions(), (10, 18));
        assert!(out.pixels().all(|p| p == &Rgba([255, 0, 0, 255])));
    }

    #[test]
    fn test_unreadable_photo() {
        let dir = tempfile::tempdir().unwrap();
        let raw = dir.path().join("broken.jpg");
        std::fs::write(&raw, b"not a jpeg").unwrap();

        let pipeline = CartoonPipeline::new(&config(dir.path())).unwrap();
        let result = pipeline.stylize(&raw, Theme::Expression, &dir.path().join("out.jpg"));
        assert!(matches!(result, Err(PipelineError::Decode { .. })));
    }
}
