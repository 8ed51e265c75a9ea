//! Configuration loading and types for zoltar
//!
//! Configuration is loaded in layers:
//! 1. Built-in defaults
//! 2. Config file (~/.config/zoltar/config.toml)
//! 3. Environment variables (ZOLTAR_*)
//! 4. CLI arguments (highest priority)

use crate::error::BoothError;
use crate::session::Theme;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file content
pub const DEFAULT_CONFIG: &str = r#"# Zoltar Configuration
#
# Location: ~/.config/zoltar/config.toml
# All settings can be overridden via CLI flags

# State file for external integrations (status panels, `zoltar status`)
# Use "auto" for $XDG_RUNTIME_DIR/zoltar/state, a custom path, or "disabled"
state_file = "auto"

# Log file used while the kiosk owns the terminal
# "auto" = <data dir>/zoltar.log, or a path, or "disabled"
log_file = "auto"

[booth]
# Event name shown on the welcome screen
title = "PCAS SuperHero PiBooth"

# What the participant swipes
card_name = "M-Card"

# After the photo is processed:
# - show: open the result in the viewer
# - show_and_email: open the result and mail it to <identifier>@<delivery.domain>
mode = "show"

# Typewriter delay per character in milliseconds (0 = draw instantly)
spool_delay_ms = 10

# Show the falling-character attract screen between participants
attract = true

# Milliseconds the "all done" screen stays up before the next participant
result_hold_ms = 5000

[countdown]
# "digits" (3, 2, 1) or "big_digits" (large 5..1 glyphs)
style = "big_digits"
step_ms = 1000
settle_ms = 1000

[trigger]
# Source of the "take the photo" signal:
# - evdev: a key on an input device (USB arcade button, or a GPIO button
#          mapped with `dtoverlay=gpio-key,gpio=23,keycode=212`)
# - signal: SIGUSR1, e.g. from `zoltar trigger`
# - keyboard: the space bar on the booth console
source = "evdev"
key = "CAMERA"

[camera]
command = "rpicam-still"
args = ["--nopreview", "--immediate", "-o", "{output}"]
timeout_secs = 30
# photos_dir = "/home/pi/photos"

[pipeline]
# output_dir defaults to a "photos_cartoon" directory next to photos_dir
clusters = 8
median_kernel = 7
threshold_block = 9
threshold_offset = 5
contrast = 1.3
brightness = 30
pad_top = 280
pad_bottom = 200

# [pipeline.overlays]
# expression = "/home/pi/Pink_NewFrame.png"
# scientific_discovery = "/home/pi/Green_NewFrame.png"
# justice = "/home/pi/Blue_NewFrame.png"

[viewer]
enabled = true
command = "feh"
args = ["--fullscreen", "--auto-zoom"]

[delivery]
domain = "umich.edu"
from = "photobooth@umich.edu"
subject = "Hello from PCAS!"
body = "Thanks for trying the PCAS SuperHero Booth!"
# Message is piped to this command; msmtp reads recipients from the headers
command = "msmtp"
args = ["-t"]
timeout_ms = 30000
"#;

/// Post-capture behaviour
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum BoothMode {
    /// Show the processed photo
    #[default]
    Show,
    /// Show the processed photo and mail it to the participant
    ShowAndEmail,
}

/// Countdown rendering variant
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum CountdownStyle {
    /// Single digits 3, 2, 1
    Digits,
    /// Seven-row glyphs 5..1
    #[default]
    BigDigits,
}

/// Where the capture trigger comes from
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TriggerSource {
    /// Key press on an evdev input device
    #[default]
    Evdev,
    /// SIGUSR1 sent to the kiosk process
    Signal,
    /// Space bar on the booth console
    Keyboard,
}

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub booth: BoothConfig,

    #[serde(default)]
    pub countdown: CountdownConfig,

    #[serde(default)]
    pub trigger: TriggerConfig,

    #[serde(default)]
    pub camera: CameraConfig,

    #[serde(default)]
    pub pipeline: PipelineConfig,

    #[serde(default)]
    pub viewer: ViewerConfig,

    #[serde(default)]
    pub delivery: DeliveryConfig,

    /// Optional path to state file for external integrations.
    /// "auto" resolves to $XDG_RUNTIME_DIR/zoltar/state.
    #[serde(default = "default_auto")]
    pub state_file: Option<String>,

    /// Log file used by `zoltar run` ("auto", a path, or "disabled")
    #[serde(default = "default_auto")]
    pub log_file: Option<String>,
}

/// Interview presentation
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BoothConfig {
    #[serde(default = "default_title")]
    pub title: String,

    #[serde(default = "default_card_name")]
    pub card_name: String,

    #[serde(default)]
    pub mode: BoothMode,

    /// Delay between characters when spooling prompts
    #[serde(default = "default_spool_delay")]
    pub spool_delay_ms: u64,

    #[serde(default = "default_true")]
    pub attract: bool,

    /// How long the result screen stays up before the next participant
    #[serde(default = "default_result_hold")]
    pub result_hold_ms: u64,
}

/// Countdown before the shot
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CountdownConfig {
    #[serde(default)]
    pub style: CountdownStyle,

    /// Time each number stays on screen
    #[serde(default = "default_step_ms")]
    pub step_ms: u64,

    /// Pause after the last number before the shutter fires
    #[serde(default = "default_step_ms")]
    pub settle_ms: u64,
}

/// Capture trigger configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TriggerConfig {
    #[serde(default)]
    pub source: TriggerSource,

    /// evdev key name, without the KEY_ prefix
    #[serde(default = "default_trigger_key")]
    pub key: String,
}

/// Still-capture command configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CameraConfig {
    #[serde(default = "default_camera_command")]
    pub command: String,

    /// Arguments; `{output}` is replaced with the photo path
    #[serde(default = "default_camera_args")]
    pub args: Vec<String>,

    #[serde(default = "default_camera_timeout")]
    pub timeout_secs: u64,

    /// Raw photos directory (None = <data dir>/photos)
    #[serde(default)]
    pub photos_dir: Option<PathBuf>,
}

/// Cartoon pipeline tuning
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineConfig {
    /// Processed photos directory (None = sibling "photos_cartoon")
    #[serde(default)]
    pub output_dir: Option<PathBuf>,

    /// Colours kept by k-means quantisation
    #[serde(default = "default_clusters")]
    pub clusters: usize,

    /// Median blur window (odd)
    #[serde(default = "default_median_kernel")]
    pub median_kernel: u32,

    /// Adaptive threshold neighbourhood (odd)
    #[serde(default = "default_threshold_block")]
    pub threshold_block: u32,

    /// Subtracted from the neighbourhood mean
    #[serde(default = "default_threshold_offset")]
    pub threshold_offset: i32,

    #[serde(default = "default_contrast")]
    pub contrast: f32,

    #[serde(default = "default_brightness")]
    pub brightness: f32,

    #[serde(default = "default_pad_top")]
    pub pad_top: u32,

    #[serde(default = "default_pad_bottom")]
    pub pad_bottom: u32,

    #[serde(default)]
    pub overlays: OverlayConfig,
}

/// Overlay frame per theme (PNG with alpha)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct OverlayConfig {
    pub expression: Option<PathBuf>,
    pub scientific_discovery: Option<PathBuf>,
    pub justice: Option<PathBuf>,
}

impl OverlayConfig {
    pub fn for_theme(&self, theme: Theme) -> Option<&Path> {
        match theme {
            Theme::Expression => self.expression.as_deref(),
            Theme::ScientificDiscovery => self.scientific_discovery.as_deref(),
            Theme::Justice => self.justice.as_deref(),
        }
    }
}

/// Result viewer
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ViewerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_viewer_command")]
    pub command: String,

    #[serde(default = "default_viewer_args")]
    pub args: Vec<String>,
}

/// Mail delivery
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeliveryConfig {
    /// Appended to the identifier to form the recipient
    #[serde(default = "default_domain")]
    pub domain: String,

    #[serde(default = "default_from")]
    pub from: String,

    #[serde(default = "default_subject")]
    pub subject: String,

    #[serde(default = "default_body")]
    pub body: String,

    /// sendmail-compatible command reading the message on stdin
    #[serde(default = "default_mail_command")]
    pub command: String,

    /// Arguments; `{recipient}` is replaced with the address
    #[serde(default = "default_mail_args")]
    pub args: Vec<String>,

    #[serde(default = "default_mail_timeout")]
    pub timeout_ms: u64,
}

fn default_true() -> bool {
    true
}

fn default_auto() -> Option<String> {
    Some("auto".to_string())
}

fn default_title() -> String {
    "PCAS SuperHero PiBooth".to_string()
}

fn default_card_name() -> String {
    "M-Card".to_string()
}

fn default_spool_delay() -> u64 {
    10
}

fn default_result_hold() -> u64 {
    5000
}

fn default_step_ms() -> u64 {
    1000
}

fn default_trigger_key() -> String {
    "CAMERA".to_string()
}

fn default_camera_command() -> String {
    "rpicam-still".to_string()
}

fn default_camera_args() -> Vec<String> {
    ["--nopreview", "--immediate", "-o", "{output}"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_camera_timeout() -> u64 {
    30
}

fn default_clusters() -> usize {
    8
}

fn default_median_kernel() -> u32 {
    7
}

fn default_threshold_block() -> u32 {
    9
}

fn default_threshold_offset() -> i32 {
    5
}

fn default_contrast() -> f32 {
    1.3
}

fn default_brightness() -> f32 {
    30.0
}

fn default_pad_top() -> u32 {
    280
}

fn default_pad_bottom() -> u32 {
    200
}

fn default_viewer_command() -> String {
    "feh".to_string()
}

fn default_viewer_args() -> Vec<String> {
    vec!["--fullscreen".to_string(), "--auto-zoom".to_string()]
}

fn default_domain() -> String {
    "umich.edu".to_string()
}

fn default_from() -> String {
    "photobooth@umich.edu".to_string()
}

fn default_subject() -> String {
    "Hello from PCAS!".to_string()
}

fn default_body() -> String {
    "Thanks for trying the PCAS SuperHero Booth!".to_string()
}

fn default_mail_command() -> String {
    "msmtp".to_string()
}

fn default_mail_args() -> Vec<String> {
    vec!["-t".to_string()]
}

fn default_mail_timeout() -> u64 {
    30000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            booth: BoothConfig::default(),
            countdown: CountdownConfig::default(),
            trigger: TriggerConfig::default(),
            camera: CameraConfig::default(),
            pipeline: PipelineConfig::default(),
            viewer: ViewerConfig::default(),
            delivery: DeliveryConfig::default(),
            state_file: default_auto(),
            log_file: default_auto(),
        }
    }
}

impl Default for BoothConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            card_name: default_card_name(),
            mode: BoothMode::default(),
            spool_delay_ms: default_spool_delay(),
            attract: true,
            result_hold_ms: default_result_hold(),
        }
    }
}

impl Default for CountdownConfig {
    fn default() -> Self {
        Self {
            style: CountdownStyle::default(),
            step_ms: default_step_ms(),
            settle_ms: default_step_ms(),
        }
    }
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            source: TriggerSource::default(),
            key: default_trigger_key(),
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            command: default_camera_command(),
            args: default_camera_args(),
            timeout_secs: default_camera_timeout(),
            photos_dir: None,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            output_dir: None,
            clusters: default_clusters(),
            median_kernel: default_median_kernel(),
            threshold_block: default_threshold_block(),
            threshold_offset: default_threshold_offset(),
            contrast: default_contrast(),
            brightness: default_brightness(),
            pad_top: default_pad_top(),
            pad_bottom: default_pad_bottom(),
            overlays: OverlayConfig::default(),
        }
    }
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            command: default_viewer_command(),
            args: default_viewer_args(),
        }
    }
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            domain: default_domain(),
            from: default_from(),
            subject: default_subject(),
            body: default_body(),
            command: default_mail_command(),
            args: default_mail_args(),
            timeout_ms: default_mail_timeout(),
        }
    }
}

impl Config {
    /// Get the default config file path
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("", "", "zoltar")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Get the runtime directory for ephemeral files (state, pid)
    pub fn runtime_dir() -> PathBuf {
        std::env::var("XDG_RUNTIME_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
            .join("zoltar")
    }

    /// Get the data directory path (photos, log)
    pub fn data_dir() -> PathBuf {
        directories::ProjectDirs::from("", "", "zoltar")
            .map(|dirs| dirs.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Resolve the state file path from config.
    /// Returns None if disabled, the runtime default for "auto",
    /// or the configured path.
    pub fn resolve_state_file(&self) -> Option<PathBuf> {
        resolve_auto_path(self.state_file.as_deref(), || {
            Self::runtime_dir().join("state")
        })
    }

    /// Resolve the log file path the same way as the state file
    pub fn resolve_log_file(&self) -> Option<PathBuf> {
        resolve_auto_path(self.log_file.as_deref(), || {
            Self::data_dir().join("zoltar.log")
        })
    }

    /// Directory the camera writes raw photos to
    pub fn photos_dir(&self) -> PathBuf {
        self.camera
            .photos_dir
            .clone()
            .unwrap_or_else(|| Self::data_dir().join("photos"))
    }

    /// Directory processed photos are written to
    pub fn processed_dir(&self) -> PathBuf {
        if let Some(ref dir) = self.pipeline.output_dir {
            return dir.clone();
        }
        let photos = self.photos_dir();
        match photos.parent() {
            Some(parent) => parent.join("photos_cartoon"),
            None => PathBuf::from("photos_cartoon"),
        }
    }

    /// Ensure the photo directories exist
    pub fn ensure_directories(&self) -> std::io::Result<()> {
        for dir in [self.photos_dir(), self.processed_dir()] {
            std::fs::create_dir_all(&dir)?;
            tracing::debug!("Ensured directory exists: {:?}", dir);
        }
        Ok(())
    }
}

fn resolve_auto_path(value: Option<&str>, auto: impl FnOnce() -> PathBuf) -> Option<PathBuf> {
    value.and_then(|path| match path.to_lowercase().as_str() {
        "disabled" | "none" | "off" | "false" => None,
        "auto" => Some(auto()),
        _ => Some(PathBuf::from(path)),
    })
}

/// Load configuration from file, with defaults for missing values
pub fn load_config(path: Option<&Path>) -> Result<Config, BoothError> {
    let mut config = Config::default();

    let config_path = path.map(PathBuf::from).or_else(Config::default_path);

    if let Some(ref path) = config_path {
        if path.exists() {
            tracing::debug!("Loading config from {:?}", path);
            let contents = std::fs::read_to_string(path)
                .map_err(|e| BoothError::Config(format!("Failed to read config: {}", e)))?;

            config = toml::from_str(&contents)
                .map_err(|e| BoothError::Config(format!("Invalid config: {}", e)))?;
        } else {
            tracing::debug!("Config file not found at {:?}, using defaults", path);
        }
    }

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());

    Ok(config)
}

/// Override config values from ZOLTAR_* variables
fn apply_env_overrides(config: &mut Config, var: impl Fn(&str) -> Option<String>) {
    if let Some(mode) = var("ZOLTAR_MODE") {
        config.booth.mode = match mode.to_lowercase().as_str() {
            "show_and_email" | "email" => BoothMode::ShowAndEmail,
            _ => BoothMode::Show,
        };
    }
    if let Some(key) = var("ZOLTAR_TRIGGER_KEY") {
        config.trigger.key = key;
    }
    if let Some(dir) = var("ZOLTAR_PHOTOS_DIR") {
        config.camera.photos_dir = Some(PathBuf::from(dir));
    }
    if let Some(domain) = var("ZOLTAR_MAIL_DOMAIN") {
        config.delivery.domain = domain;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.booth.mode, BoothMode::Show);
        assert_eq!(config.countdown.style, CountdownStyle::BigDigits);
        assert_eq!(config.trigger.source, TriggerSource::Evdev);
        assert_eq!(config.trigger.key, "CAMERA");
        assert_eq!(config.pipeline.clusters, 8);
        assert_eq!(config.delivery.domain, "umich.edu");
        assert_eq!(config.state_file.as_deref(), Some("auto"));
        assert_eq!(config.log_file.as_deref(), Some("auto"));
    }

    #[test]
    fn test_missing_config_file_keeps_auto_paths() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.toml");
        let config = load_config(Some(missing.as_path())).unwrap();

        assert_eq!(config.resolve_state_file(), Some(Config::runtime_dir().join("state")));
        assert_eq!(config.resolve_log_file(), Some(Config::data_dir().join("zoltar.log")));
    }

    #[test]
    fn test_default_config_text_parses() {
        let config: Config = toml::from_str(DEFAULT_CONFIG).unwrap();
        assert_eq!(config.booth.title, "PCAS SuperHero PiBooth");
        assert_eq!(config.camera.command, "rpicam-still");
        assert_eq!(config.pipeline.pad_top, 280);
        assert_eq!(config.viewer.command, "feh");
        assert_eq!(config.delivery.args, vec!["-t"]);
    }

    #[test]
    fn test_parse_partial_config() {
        let toml_str = r#"
            [booth]
            mode = "show_and_email"
            spool_delay_ms = 0

            [countdown]
            style = "digits"

            [trigger]
            source = "signal"

            [camera]
            photos_dir = "/home/pi/photos"

            [pipeline.overlays]
            justice = "/home/pi/Blue_NewFrame.png"
        "#;

        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.booth.mode, BoothMode::ShowAndEmail);
        assert_eq!(config.booth.spool_delay_ms, 0);
        assert_eq!(config.booth.title, "PCAS SuperHero PiBooth");
        assert_eq!(config.countdown.style, CountdownStyle::Digits);
        assert_eq!(config.countdown.step_ms, 1000);
        assert_eq!(config.trigger.source, TriggerSource::Signal);
        assert_eq!(config.trigger.key, "CAMERA");
        assert_eq!(
            config.pipeline.overlays.for_theme(Theme::Justice),
            Some(Path::new("/home/pi/Blue_NewFrame.png"))
        );
        assert!(config.pipeline.overlays.for_theme(Theme::Expression).is_none());
    }

    #[test]
    fn test_processed_dir_is_sibling_of_photos() {
        let mut config = Config::default();
        config.camera.photos_dir = Some(PathBuf::from("/home/pi/photos"));
        assert_eq!(config.processed_dir(), PathBuf::from("/home/pi/photos_cartoon"));

        config.pipeline.output_dir = Some(PathBuf::from("/srv/out"));
        assert_eq!(config.processed_dir(), PathBuf::from("/srv/out"));
    }

    #[test]
    fn test_resolve_state_file() {
        let mut config = Config::default();
        config.state_file = Some("disabled".to_string());
        assert!(config.resolve_state_file().is_none());

        config.state_file = Some("/tmp/booth-state".to_string());
        assert_eq!(
            config.resolve_state_file(),
            Some(PathBuf::from("/tmp/booth-state"))
        );

        config.state_file = Some("auto".to_string());
        assert!(config.resolve_state_file().unwrap().ends_with("zoltar/state"));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("ZOLTAR_MODE", "show_and_email"),
            ("ZOLTAR_TRIGGER_KEY", "F13"),
            ("ZOLTAR_PHOTOS_DIR", "/data/photos"),
            ("ZOLTAR_MAIL_DOMAIN", "example.edu"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        apply_env_overrides(&mut config, |k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(config.booth.mode, BoothMode::ShowAndEmail);
        assert_eq!(config.trigger.key, "F13");
        assert_eq!(config.photos_dir(), PathBuf::from("/data/photos"));
        assert_eq!(config.delivery.domain, "example.edu");
    }
}
