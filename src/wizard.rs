//! Prompt sequencer: the guided interview
//!
//! Drives `WizardState` from Welcome to ArmCapture on a `DisplaySurface`.
//! Every step blocks on the keys that step recognises and ignores the rest,
//! so there is no input that ends the interview early. The only way out is
//! a display error (input closed, Ctrl+C on the console).

use crate::config::Config;
use crate::display::{centered_col, DisplaySurface, Key, Style};
use crate::error::DisplayError;
use crate::identity::{extract_identifier, Identifier};
use crate::session::{Session, Theme};
use crate::state::{MenuCursor, WizardState, YesNo};
use std::time::Duration;

const CHOICE_HINT: &str = "use \u{2190} and \u{2192} or Y and N";
const ACCEPT_HINT: &str = "press ENTER to accept the highlighted option";
const BAD_SWIPE: &str = "Badswipe. Try Again.";
const VERIFIED: &str = "***** MUTANT VERIFIED *****";
const NAME_MAX_LEN: usize = 20;

/// Text and timing used by the interview
#[derive(Debug, Clone)]
pub struct WizardSettings {
    /// Event name on the welcome screen
    pub title: String,
    /// What the participant swipes
    pub card_name: String,
    /// Shown after the identifier in the swipe confirmation
    pub mail_domain: String,
    /// Delay per character when spooling text
    pub spool_delay: Duration,
    /// Short hold after greetings and answer echoes
    pub hold: Duration,
    /// How long "Badswipe" stays up before the prompt is redrawn
    pub retry_pause: Duration,
}

impl WizardSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            title: config.booth.title.clone(),
            card_name: config.booth.card_name.clone(),
            mail_domain: config.delivery.domain.clone(),
            spool_delay: Duration::from_millis(config.booth.spool_delay_ms),
            hold: Duration::from_millis(750),
            retry_pause: Duration::from_secs(2),
        }
    }

    /// Same text, no delays (rehearsals and tests)
    pub fn instant(mut self) -> Self {
        self.spool_delay = Duration::ZERO;
        self.hold = Duration::ZERO;
        self.retry_pause = Duration::ZERO;
        self
    }
}

impl Default for WizardSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// One participant's interview
pub struct Interview<'a> {
    surface: &'a mut dyn DisplaySurface,
    settings: &'a WizardSettings,
    state: WizardState,
}

impl<'a> Interview<'a> {
    pub fn new(surface: &'a mut dyn DisplaySurface, settings: &'a WizardSettings) -> Self {
        Self {
            surface,
            settings,
            state: WizardState::new(),
        }
    }

    pub fn state(&self) -> &WizardState {
        &self.state
    }

    /// Run every step until the interview is complete
    pub async fn run(mut self) -> Result<Session, DisplayError> {
        loop {
            if let WizardState::ArmCapture { session } = &self.state {
                return Ok(session.clone());
            }
            self.step().await?;
        }
    }

    /// Render the current state and block until its advance condition.
    ///
    /// On error the state is left unchanged.
    pub async fn step(&mut self) -> Result<(), DisplayError> {
        let next = match self.state.clone() {
            WizardState::Welcome => {
                self.welcome().await?;
                WizardState::NameEntry
            }
            WizardState::NameEntry => {
                let name = self.name_entry().await?;
                tracing::info!("Participant: {}", name);
                WizardState::ConsentPhoto { name }
            }
            WizardState::ConsentPhoto { name } => {
                let consent_photo_use = self.consent_photo().await?;
                tracing::debug!("Photo use consent: {}", consent_photo_use);
                WizardState::CardSwipe {
                    name,
                    consent_photo_use,
                    attempts: 0,
                }
            }
            WizardState::CardSwipe {
                name,
                consent_photo_use,
                attempts,
            } => match self.card_swipe().await? {
                Some(identifier) => {
                    tracing::info!("Identifier verified: {}", identifier);
                    WizardState::ConsentEmailList {
                        name,
                        consent_photo_use,
                        identifier,
                    }
                }
                None => {
                    let attempts = attempts.saturating_add(1);
                    tracing::info!("Bad swipe (attempt {})", attempts);
                    WizardState::CardSwipe {
                        name,
                        consent_photo_use,
                        attempts,
                    }
                }
            },
            WizardState::ConsentEmailList {
                name,
                consent_photo_use,
                identifier,
            } => {
                let consent_email_list = self.consent_email_list().await?;
                tracing::debug!("Mailing list consent: {}", consent_email_list);
                WizardState::ThemeMenu {
                    name,
                    consent_photo_use,
                    consent_email_list,
                    identifier,
                }
            }
            WizardState::ThemeMenu {
                name,
                consent_photo_use,
                consent_email_list,
                identifier,
            } => {
                let theme = self.theme_menu(&name).await?;
                tracing::info!("Theme selected: {}", theme);
                WizardState::ArmCapture {
                    session: Session {
                        name,
                        consent_photo_use,
                        consent_email_list,
                        identifier,
                        theme,
                    },
                }
            }
            // Waiting for the trigger belongs to the kiosk
            WizardState::ArmCapture { session } => WizardState::ArmCapture { session },
        };

        self.state = next;
        Ok(())
    }

    async fn welcome(&mut self) -> Result<(), DisplayError> {
        self.fresh_window()?;
        let title = format!("Welcome to the {}!", self.settings.title);
        self.spool(3, &title, Style::Prompt).await?;
        self.centered(8, "Press Enter to Start", Style::Notice)?;
        self.surface.flush()?;

        while self.surface.read_key().await? != Key::Enter {}
        Ok(())
    }

    async fn name_entry(&mut self) -> Result<String, DisplayError> {
        self.fresh_window()?;
        self.spool(3, "Please type your first name and press ENTER", Style::Prompt)
            .await?;
        self.surface.flush()?;

        let (_, cols) = self.surface.size();
        let raw = self
            .surface
            .read_line(5, (cols / 2).saturating_sub(4), NAME_MAX_LEN)
            .await?;
        let name = raw.trim().to_string();

        self.fresh_window()?;
        self.spool(2, &format!("Hello {}", name), Style::Prompt)
            .await?;
        self.hold().await;
        Ok(name)
    }

    async fn consent_photo(&mut self) -> Result<bool, DisplayError> {
        self.spool(4, "May we use your photograph for", Style::Prompt)
            .await?;
        self.spool(5, "PCAS web and promotions?", Style::Prompt)
            .await?;
        self.ask_yes_no().await
    }

    /// One swipe attempt: accumulate until Enter, then parse
    async fn card_swipe(&mut self) -> Result<Option<Identifier>, DisplayError> {
        self.fresh_window()?;
        let prompt = format!("Swipe your {}, please...", self.settings.card_name);
        self.centered(1, &prompt, Style::Notice)?;
        self.surface.flush()?;

        let (_, cols) = self.surface.size();
        let mut raw = String::new();
        loop {
            match self.surface.read_key().await? {
                Key::Enter => break,
                Key::Char(c) if !c.is_control() => {
                    let col = 2 + (raw.chars().count() as u16 % cols.saturating_sub(4).max(1));
                    raw.push(c);
                    self.surface.put_text(3, col, "*", Style::Prompt)?;
                    self.surface.flush()?;
                }
                _ => {}
            }
        }
        tracing::debug!("Swipe read {} characters", raw.chars().count());

        match extract_identifier(&raw) {
            Some(identifier) => {
                let extracted = format!(
                    "Extracted String: {}",
                    identifier.email(&self.settings.mail_domain)
                );
                self.centered(7, &extracted, Style::Highlight)?;
                self.surface.flush()?;
                self.hold().await;

                self.spool(9, VERIFIED, Style::Highlight).await?;
                self.surface.clear_row(1)?;
                self.centered(1, "Press Any Key", Style::Notice)?;
                self.surface.flush()?;
                self.surface.read_key().await?;
                Ok(Some(identifier))
            }
            None => {
                self.centered(8, BAD_SWIPE, Style::Notice)?;
                self.surface.flush()?;
                tokio::time::sleep(self.settings.retry_pause).await;
                Ok(None)
            }
        }
    }

    async fn consent_email_list(&mut self) -> Result<bool, DisplayError> {
        self.fresh_window()?;
        self.spool(2, "Lastly, may we add you to our email lists", Style::Prompt)
            .await?;
        self.spool(4, "For information about courses and events", Style::Prompt)
            .await?;
        self.spool(5, "regarding computing in LSA?", Style::Prompt)
            .await?;
        self.ask_yes_no().await
    }

    async fn theme_menu(&mut self, name: &str) -> Result<Theme, DisplayError> {
        let mut cursor = MenuCursor::new(Theme::ALL.len());
        self.draw_menu(&cursor)?;

        loop {
            match self.surface.read_key().await? {
                Key::Up | Key::Left => cursor.up(),
                Key::Down | Key::Right => cursor.down(),
                Key::Enter => break,
                _ => continue,
            }
            tracing::debug!("Menu highlight: {}", cursor.index());
            self.draw_menu(&cursor)?;
        }

        let theme = cursor.theme();
        self.centered(9, &format!("'{}'", theme.label()), Style::Title)?;
        self.surface.flush()?;
        self.hold().await;

        let ready = format!("Alright, {}, press the button when ready", name);
        self.surface.clear_row(11)?;
        self.centered(11, &ready, Style::Prompt)?;
        self.surface.flush()?;
        Ok(theme)
    }

    fn draw_menu(&mut self, cursor: &MenuCursor) -> Result<(), DisplayError> {
        self.fresh_window()?;
        self.surface.put_text(
            2,
            1,
            "How will you use your superpower? (\u{2191}\u{2193})",
            Style::Prompt,
        )?;

        let (rows, _) = self.surface.size();
        let top = (rows / 2).saturating_sub(Theme::ALL.len() as u16 / 2 + 1);
        for (idx, theme) in Theme::ALL.iter().enumerate() {
            let style = if idx == cursor.index() {
                Style::Highlight
            } else {
                Style::Prompt
            };
            self.centered(top + idx as u16, theme.label(), style)?;
        }
        self.surface.flush()
    }

    /// Two-option prompt near the bottom of the window
    async fn ask_yes_no(&mut self) -> Result<bool, DisplayError> {
        let (rows, _) = self.surface.size();
        self.spool(rows.saturating_sub(3), CHOICE_HINT, Style::Prompt)
            .await?;
        self.spool(rows.saturating_sub(2), ACCEPT_HINT, Style::Prompt)
            .await?;

        let mut choice = YesNo::default();
        self.draw_yes_no(choice)?;

        loop {
            choice = match self.surface.read_key().await? {
                Key::Char('y' | 'Y') => YesNo::Yes,
                Key::Char('n' | 'N') => YesNo::No,
                Key::Left => choice.left(),
                Key::Right => choice.right(),
                Key::Enter => break,
                _ => continue,
            };
            self.draw_yes_no(choice)?;
        }

        for row in rows.saturating_sub(4)..rows.saturating_sub(1) {
            self.surface.clear_row(row)?;
        }
        let echo = if choice.as_bool() {
            "You chose YES"
        } else {
            "You chose NO"
        };
        self.centered(rows.saturating_sub(3), echo, Style::Prompt)?;
        self.surface.flush()?;
        self.hold().await;
        Ok(choice.as_bool())
    }

    fn draw_yes_no(&mut self, choice: YesNo) -> Result<(), DisplayError> {
        let (rows, cols) = self.surface.size();
        let row = rows.saturating_sub(5);
        let yes = YesNo::Yes.label();
        let no = YesNo::No.label();
        let start = centered_col(cols, &format!("{} {}", yes, no));

        for (option, col) in [
            (YesNo::Yes, start),
            (YesNo::No, start + yes.len() as u16 + 4),
        ] {
            let style = if option == choice {
                Style::Highlight
            } else {
                Style::Prompt
            };
            self.surface.put_text(row, col, option.label(), style)?;
        }
        self.surface.flush()
    }

    fn fresh_window(&mut self) -> Result<(), DisplayError> {
        self.surface.clear()?;
        self.surface.draw_border(Style::Frame)
    }

    fn centered(&mut self, row: u16, text: &str, style: Style) -> Result<(), DisplayError> {
        let (_, cols) = self.surface.size();
        self.surface
            .put_text(row, centered_col(cols, text), text, style)
    }

    async fn spool(&mut self, row: u16, text: &str, style: Style) -> Result<(), DisplayError> {
        spool_text(&mut *self.surface, row, text, style, self.settings.spool_delay).await
    }

    async fn hold(&mut self) {
        if !self.settings.hold.is_zero() {
            tokio::time::sleep(self.settings.hold).await;
        }
    }
}

/// Typewriter effect: draw `text` centred on `row` one character at a time.
///
/// Each step redraws the growing prefix. With a zero delay the text is drawn
/// once.
pub async fn spool_text(
    surface: &mut dyn DisplaySurface,
    row: u16,
    text: &str,
    style: Style,
    delay: Duration,
) -> Result<(), DisplayError> {
    let (_, cols) = surface.size();
    let col = centered_col(cols, text);

    if delay.is_zero() {
        surface.put_text(row, col, text, style)?;
        return surface.flush();
    }

    for (end, _) in text.char_indices().skip(1).chain(Some((text.len(), ' '))) {
        surface.put_text(row, col, &text[..end], style)?;
        surface.flush()?;
        tokio::time::sleep(delay).await;
    }
    Ok(())
}
