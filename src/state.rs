//! State machines for the booth
//!
//! Two levels:
//! - `KioskState`: Idle → Interview → Armed → Capturing → Processing → Delivering → Idle
//! - `WizardState`: the interview itself, Welcome → … → ArmCapture
//!
//! Each `WizardState` variant carries exactly the answers collected so far,
//! so a later state cannot be constructed without the earlier answers.

use crate::identity::Identifier;
use crate::session::{Session, Theme};
use std::fmt;

/// Booth-level state, mirrored to the state file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KioskState {
    /// Attract screen, waiting for a participant
    #[default]
    Idle,
    /// Participant is answering prompts
    Interview,
    /// Interview complete, waiting for the capture trigger
    Armed,
    /// Countdown and camera capture
    Capturing,
    /// Stylizing the photo
    Processing,
    /// Showing and mailing the result
    Delivering,
}

impl KioskState {
    /// Name written to the state file
    pub fn as_str(self) -> &'static str {
        match self {
            KioskState::Idle => "idle",
            KioskState::Interview => "interview",
            KioskState::Armed => "armed",
            KioskState::Capturing => "capturing",
            KioskState::Processing => "processing",
            KioskState::Delivering => "delivering",
        }
    }

    /// Whether a trigger event should start a capture
    pub fn accepts_trigger(self) -> bool {
        matches!(self, KioskState::Armed)
    }
}

impl fmt::Display for KioskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Interview progress
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WizardState {
    /// Welcome banner, waiting for Enter
    Welcome,

    /// Collecting the participant's first name
    NameEntry,

    /// Asking whether the photo may be used for promotion
    ConsentPhoto { name: String },

    /// Waiting for a card swipe that yields an identifier
    CardSwipe {
        name: String,
        consent_photo_use: bool,
        /// Failed attempts so far (for logging only, there is no limit)
        attempts: u32,
    },

    /// Asking whether to join the mailing list
    ConsentEmailList {
        name: String,
        consent_photo_use: bool,
        identifier: Identifier,
    },

    /// Theme menu
    ThemeMenu {
        name: String,
        consent_photo_use: bool,
        consent_email_list: bool,
        identifier: Identifier,
    },

    /// Interview done, waiting for the capture trigger
    ArmCapture { session: Session },
}

impl WizardState {
    /// Start of every interview
    pub fn new() -> Self {
        WizardState::Welcome
    }

    /// Check if the interview has finished
    pub fn is_complete(&self) -> bool {
        matches!(self, WizardState::ArmCapture { .. })
    }

    /// Completed session, if the interview has finished
    pub fn session(&self) -> Option<&Session> {
        match self {
            WizardState::ArmCapture { session } => Some(session),
            _ => None,
        }
    }

    /// Identifier, once the swipe step has succeeded
    pub fn identifier(&self) -> Option<&Identifier> {
        match self {
            WizardState::ConsentEmailList { identifier, .. }
            | WizardState::ThemeMenu { identifier, .. } => Some(identifier),
            WizardState::ArmCapture { session } => Some(&session.identifier),
            _ => None,
        }
    }
}

impl Default for WizardState {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for WizardState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WizardState::Welcome => write!(f, "Welcome"),
            WizardState::NameEntry => write!(f, "NameEntry"),
            WizardState::ConsentPhoto { .. } => write!(f, "ConsentPhoto"),
            WizardState::CardSwipe { attempts, .. } => {
                write!(f, "CardSwipe ({} failed)", attempts)
            }
            WizardState::ConsentEmailList { .. } => write!(f, "ConsentEmailList"),
            WizardState::ThemeMenu { .. } => write!(f, "ThemeMenu"),
            WizardState::ArmCapture { session } => {
                write!(f, "ArmCapture ({}, {})", session.identifier, session.theme)
            }
        }
    }
}

/// Highlight position in a vertical menu; wraps in both directions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MenuCursor {
    index: usize,
    len: usize,
}

impl MenuCursor {
    pub fn new(len: usize) -> Self {
        Self {
            index: 0,
            len: len.max(1),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    /// `(index - 1) mod len`
    pub fn up(&mut self) {
        self.index = (self.index + self.len - 1) % self.len;
    }

    /// `(index + 1) mod len`
    pub fn down(&mut self) {
        self.index = (self.index + 1) % self.len;
    }

    /// Theme under the cursor when the menu lists `Theme::ALL`
    pub fn theme(&self) -> Theme {
        Theme::from_index(self.index).unwrap_or(Theme::Expression)
    }
}

/// Highlighted option in a two-choice prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum YesNo {
    #[default]
    Yes,
    No,
}

impl YesNo {
    pub fn label(self) -> &'static str {
        match self {
            YesNo::Yes => "Yes(Y)",
            YesNo::No => "No(N)",
        }
    }

    pub fn as_bool(self) -> bool {
        matches!(self, YesNo::Yes)
    }

    /// Move highlight left; does not wrap
    pub fn left(self) -> Self {
        YesNo::Yes
    }

    /// Move highlight right; does not wrap
    pub fn right(self) -> Self {
        YesNo::No
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_wizard_is_welcome() {
        let state = WizardState::new();
        assert_eq!(state, WizardState::Welcome);
        assert!(!state.is_complete());
        assert!(state.identifier().is_none());
    }

    #[test]
    fn test_menu_down_three_times_wraps_to_start() {
        let mut cursor = MenuCursor::new(3);
        cursor.down();
        cursor.down();
        cursor.down();
        assert_eq!(cursor.index(), 0);
    }

    #[test]
    fn test_menu_up_from_start_wraps_to_end() {
        let mut cursor = MenuCursor::new(3);
        cursor.up();
        assert_eq!(cursor.index(), 2);
        assert_eq!(cursor.theme(), Theme::Justice);
    }

    #[test]
    fn test_menu_down_from_end_wraps_to_start() {
        let mut cursor = MenuCursor::new(3);
        cursor.down();
        cursor.down();
        assert_eq!(cursor.theme(), Theme::Justice);
        cursor.down();
        assert_eq!(cursor.theme(), Theme::Expression);
    }

    #[test]
    fn test_yes_no_does_not_wrap() {
        assert_eq!(YesNo::Yes.left(), YesNo::Yes);
        assert_eq!(YesNo::No.right(), YesNo::No);
        assert_eq!(YesNo::Yes.right(), YesNo::No);
        assert!(YesNo::default().as_bool());
    }

    #[test]
    fn test_kiosk_state_names() {
        assert_eq!(KioskState::default().as_str(), "idle");
        assert_eq!(format!("{}", KioskState::Armed), "armed");
        assert!(KioskState::Armed.accepts_trigger());
        assert!(!KioskState::Interview.accepts_trigger());
    }

    #[test]
    fn test_identifier_available_after_swipe() {
        let state = WizardState::ThemeMenu {
            name: "alice".to_string(),
            consent_photo_use: true,
            consent_email_list: false,
            identifier: Identifier::parse("jdoe").unwrap(),
        };
        assert_eq!(state.identifier().map(|i| i.as_str()), Some("jdoe"));
        assert_eq!(format!("{}", state), "ThemeMenu");
    }
}
