//! Zoltar: themed photo-booth kiosk for Raspberry Pi terminals
//!
//! This library provides the core functionality for:
//! - Running a guided interview on a text console (crossterm)
//! - Extracting the participant's identifier from a magnetic card swipe
//! - Waiting for a capture trigger (evdev button, SIGUSR1, or space bar)
//! - Taking a still photo with an external capture command (rpicam-still)
//! - Turning the photo into a framed cartoon (image)
//! - Showing it and optionally mailing it to the participant (msmtp)
//!
//! # Architecture
//!
//! ```text
//!                            ┌─────────────────────────────────────┐
//!                            │               Kiosk                 │
//!                            └─────────────────────────────────────┘
//!                                            │
//!                   ┌────────────────────────┼────────────────────────┐
//!                   │                        │                        │
//!                   ▼                        ▼                        ▼
//!          ┌──────────────┐         ┌──────────────┐         ┌──────────────┐
//!          │   Display    │         │   Hardware   │         │    State     │
//!          │ (crossterm)  │         │camera+trigger│         │     file     │
//!          └──────────────┘         └──────────────┘         └──────────────┘
//!                   │                        │
//!                   │ keys                   │ trigger events
//!                   ▼                        ▼
//!          ┌─────────────────────────────────────────────────────────────────┐
//!          │                         Session Flow                            │
//!          │ [Attract] ─▶ Interview ─▶ [Armed] ─▶ Countdown ─▶ Capture       │
//!          └─────────────────────────────────────────────────────────────────┘
//!                                            │
//!                                            ▼ raw photo
//!                                   ┌──────────────┐
//!                                   │   Pipeline   │
//!                                   │  (cartoon)   │
//!                                   └──────────────┘
//!                                            │
//!                                            ▼ processed photo
//!                                   ┌──────────────┐
//!                                   │ Post-capture │
//!                                   │   actions    │
//!                                   │ viewer/email │
//!                                   └──────────────┘
//! ```

pub mod attract;
pub mod camera;
pub mod cli;
pub mod config;
pub mod countdown;
pub mod delivery;
pub mod display;
pub mod error;
pub mod hardware;
pub mod identity;
pub mod kiosk;
pub mod output;
pub mod pipeline;
pub mod process;
pub mod session;
pub mod state;
pub mod trigger;
pub mod wizard;

pub use cli::{Cli, Commands};
pub use config::Config;
pub use error::{BoothError, Result};
pub use kiosk::Kiosk;
