// Command-line interface definitions for zoltar
//
// This module is separate so it can be used by both the binary (main.rs)
// and build.rs for generating man pages.

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "zoltar")]
#[command(author, version, about = "Themed photo-booth kiosk for Raspberry Pi terminals")]
#[command(long_about = "
Zoltar is a photo-booth kiosk that runs on a text console.
Participants answer a short interview, swipe their card, pick a theme and
press the button. The photo is turned into a cartoon, framed with the theme
overlay, shown on screen and (optionally) mailed to them.

SETUP:
  1. Add yourself to the input group: sudo usermod -aG input $USER
  2. Wire the shutter button (gpio-key overlay, keycode 212 = CAMERA)
  3. Install rpicam-apps, feh and msmtp
  4. Run: zoltar check (to verify tools, overlays and devices)
  5. Run: zoltar (to start the kiosk on the console)

USAGE:
  The booth loops forever. Ctrl+C on the console, SIGINT or SIGTERM stops it.
  'zoltar trigger' fires the shutter from another shell.
")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<std::path::PathBuf>,

    /// Increase verbosity (-v = debug, -vv = trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (errors only)
    #[arg(short, long)]
    pub quiet: bool,

    /// What happens after the photo is processed
    #[arg(long, value_enum, value_name = "MODE")]
    pub mode: Option<ModeArg>,

    /// Capture trigger source
    #[arg(long, value_enum, value_name = "SOURCE")]
    pub trigger: Option<TriggerArg>,

    /// Override trigger key for evdev (e.g., CAMERA, BTN_0, F13)
    #[arg(long, value_name = "KEY")]
    pub trigger_key: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the kiosk (default if no command specified)
    Run,

    /// Stylize an existing photo with a theme overlay
    Process {
        /// Raw photo (JPEG or PNG)
        photo: std::path::PathBuf,

        /// Overlay theme
        #[arg(long, value_enum)]
        theme: ThemeArg,

        /// Output path (default: processed photo directory, `_cart.jpg` suffix)
        #[arg(short, long, value_name = "FILE")]
        output: Option<std::path::PathBuf>,
    },

    /// Extract the identifier from card swipe text (argument or stdin lines)
    Identify {
        /// Raw swipe text; reads stdin when omitted
        raw: Option<String>,
    },

    /// Fire the capture trigger of the running kiosk (sends SIGUSR1)
    Trigger,

    /// Show kiosk status (for status bars and monitoring)
    Status {
        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: StatusFormat,
    },

    /// Check external tools, overlay assets, directories and input devices
    Check,

    /// Show current configuration
    Config,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    /// Show the result on screen
    Show,
    /// Show the result and mail it to the participant
    ShowAndEmail,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum TriggerArg {
    /// evdev key (USB button, gpio-key overlay)
    Evdev,
    /// SIGUSR1 (`zoltar trigger`)
    Signal,
    /// Space bar on the booth console
    Keyboard,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ThemeArg {
    Expression,
    ScientificDiscovery,
    Justice,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum StatusFormat {
    Text,
    Json,
}
