//! Participant session record and photo file naming

use crate::identity::Identifier;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Overlay frame themes offered in the menu, in menu order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    Expression,
    ScientificDiscovery,
    Justice,
}

impl Theme {
    /// All themes in the order they appear in the menu
    pub const ALL: [Theme; 3] = [Theme::Expression, Theme::ScientificDiscovery, Theme::Justice];

    /// Menu label shown to the participant
    pub fn label(self) -> &'static str {
        match self {
            Theme::Expression => "Computing for Expression",
            Theme::ScientificDiscovery => "Computing for Scientific Discovery",
            Theme::Justice => "Computing for Justice",
        }
    }

    /// Theme at a menu index
    pub fn from_index(index: usize) -> Option<Theme> {
        Self::ALL.get(index).copied()
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Theme::Expression => write!(f, "Expression"),
            Theme::ScientificDiscovery => write!(f, "ScientificDiscovery"),
            Theme::Justice => write!(f, "Justice"),
        }
    }
}

/// One participant's answers, complete once the interview finishes.
///
/// Only the wizard builds a `Session`, so every field is populated by the
/// time the capture trigger is armed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub name: String,
    pub consent_photo_use: bool,
    pub consent_email_list: bool,
    pub identifier: Identifier,
    pub theme: Theme,
}

impl Session {
    /// Base file name: `{identifier}_{name}_{Y|N}_{Y|N}`
    pub fn file_stem(&self) -> String {
        format!(
            "{}_{}_{}_{}",
            self.identifier,
            sanitize_name(&self.name),
            yes_no_flag(self.consent_photo_use),
            yes_no_flag(self.consent_email_list)
        )
    }

    /// Path the camera writes the raw photo to
    pub fn raw_photo_path(&self, photos_dir: &Path) -> PathBuf {
        photos_dir.join(format!("{}.jpg", self.file_stem()))
    }
}

/// Path of the stylized derivative of a raw photo
///
/// `photos/jdoe_alice_Y_N.jpg` → `photos_cartoon/jdoe_alice_Y_N_cart.jpg`
pub fn processed_photo_path(raw: &Path, output_dir: &Path) -> PathBuf {
    let stem = raw
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "photo".to_string());
    output_dir.join(format!("{}_cart.jpg", stem))
}

fn yes_no_flag(value: bool) -> char {
    if value {
        'Y'
    } else {
        'N'
    }
}

/// Keep names usable as a path component
fn sanitize_name(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | '\0' => '-',
            c if c.is_whitespace() => '-',
            c => c,
        })
        .collect();

    if cleaned.is_empty() {
        "guest".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session {
            name: "alice".to_string(),
            consent_photo_use: true,
            consent_email_list: false,
            identifier: Identifier::parse("jdoe").unwrap(),
            theme: Theme::Justice,
        }
    }

    #[test]
    fn test_file_stem() {
        assert_eq!(session().file_stem(), "jdoe_alice_Y_N");
    }

    #[test]
    fn test_raw_and_processed_paths() {
        let raw = session().raw_photo_path(Path::new("/home/pi/photos"));
        assert_eq!(raw, PathBuf::from("/home/pi/photos/jdoe_alice_Y_N.jpg"));

        let processed = processed_photo_path(&raw, Path::new("/home/pi/photos_cartoon"));
        assert_eq!(
            processed,
            PathBuf::from("/home/pi/photos_cartoon/jdoe_alice_Y_N_cart.jpg")
        );
    }

    #[test]
    fn test_name_sanitized() {
        let mut s = session();
        s.name = " Mary Jo/../x ".to_string();
        assert_eq!(s.file_stem(), "jdoe_Mary-Jo-..-x_Y_N");

        s.name = String::new();
        assert_eq!(s.file_stem(), "jdoe_guest_Y_N");
    }

    #[test]
    fn test_theme_menu_order() {
        assert_eq!(Theme::from_index(0), Some(Theme::Expression));
        assert_eq!(Theme::from_index(2), Some(Theme::Justice));
        assert_eq!(Theme::from_index(3), None);
        assert_eq!(Theme::Justice.label(), "Computing for Justice");
    }
}
