//! Kiosk integration tests: interview → trigger → capture → pipeline → actions
//!
//! The camera and the mail transport are fakes; the cartoon pipeline is the
//! real one, run on a small generated photo.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use zoltar::camera::Camera;
use zoltar::config::{BoothMode, Config};
use zoltar::delivery::{Mailer, OutgoingMail};
use zoltar::display::{Key, ScriptedSurface};
use zoltar::error::{CameraError, CommandError, DeliveryError};
use zoltar::hardware::BoothHardware;
use zoltar::kiosk::{Kiosk, SessionOutcome};
use zoltar::output;
use zoltar::pipeline::CartoonPipeline;
use zoltar::session::Theme;
use zoltar::trigger::{ManualTrigger, TriggerEvent};
use zoltar::wizard::WizardSettings;

/// Writes a small gradient JPEG and counts captures
struct FakeCamera {
    captures: Arc<AtomicUsize>,
}

#[async_trait::async_trait]
impl Camera for FakeCamera {
    async fn capture(&mut self, output: &Path) -> Result<(), CameraError> {
        let photo = image::RgbImage::from_fn(64, 48, |x, y| {
            image::Rgb([(x * 4) as u8, (y * 5) as u8, 128])
        });
        photo
            .save(output)
            .map_err(|_| CameraError::MissingOutput(output.to_path_buf()))?;
        self.captures.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn name(&self) -> &str {
        "fake"
    }
}

/// Transport that always fails, remembering who it was asked to mail
#[derive(Default)]
struct BrokenMailer {
    recipients: Mutex<Vec<String>>,
    attached: AtomicUsize,
}

#[async_trait::async_trait]
impl Mailer for BrokenMailer {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), DeliveryError> {
        self.recipients.lock().unwrap().push(mail.to.clone());
        if mail.attachment.is_some() {
            self.attached.fetch_add(1, Ordering::SeqCst);
        }
        Err(DeliveryError::Transport(CommandError::NonZeroExit {
            code: Some(75),
            stderr: "msmtp: cannot connect to smtp.example.org".to_string(),
        }))
    }

    fn name(&self) -> &str {
        "broken"
    }
}

fn booth_config(dir: &Path) -> Config {
    let mut config = Config::default();
    config.booth.attract = false;
    config.booth.mode = BoothMode::ShowAndEmail;
    config.countdown.step_ms = 0;
    config.countdown.settle_ms = 0;
    config.camera.photos_dir = Some(dir.join("photos"));
    config.viewer.enabled = false;
    config.state_file = Some(dir.join("state").display().to_string());
    config
}

fn booth(config: &Config, mailer: Arc<BrokenMailer>) -> Kiosk {
    let pipeline = CartoonPipeline::new(&config.pipeline).unwrap().with_seed(7);
    let actions = output::create_actions(config, mailer);
    Kiosk::new(config.clone(), Arc::new(pipeline), actions)
        .with_wizard_settings(WizardSettings::default().instant())
        .with_pid_file(None)
}

/// alice, photo consent yes, swipe jdoe, mailing list no, Justice
fn interview_keys() -> Vec<Key> {
    let mut keys = vec![Key::Enter];
    keys.extend(Key::typed("alice"));
    keys.push(Key::Enter);
    keys.extend([Key::Char('Y'), Key::Enter]);
    keys.extend(Key::swipe("9999jdoe?"));
    keys.push(Key::Enter);
    keys.extend([Key::Char('N'), Key::Enter]);
    keys.extend([Key::Down, Key::Down, Key::Enter]);
    keys
}

#[tokio::test]
async fn session_survives_delivery_failure() {
    let dir = tempfile::tempdir().unwrap();
    let config = booth_config(dir.path());
    let mailer = Arc::new(BrokenMailer::default());
    let kiosk = booth(&config, mailer.clone());

    let captures = Arc::new(AtomicUsize::new(0));
    let mut hardware = BoothHardware::acquire(
        Box::new(FakeCamera {
            captures: captures.clone(),
        }),
        None,
    )
    .await
    .unwrap();

    // Keyboard trigger: space bar once armed
    let mut keys = interview_keys();
    keys.push(Key::Char(' '));
    let mut surface = ScriptedSurface::new(keys);

    let outcome = kiosk.serve_session(&mut surface, &mut hardware).await.unwrap();
    hardware.release().await;

    let (raw, processed, session) = match outcome {
        SessionOutcome::Completed {
            raw,
            processed,
            session,
        } => (raw, processed, session),
        SessionOutcome::Abandoned(reason) => panic!("session abandoned: {}", reason),
    };

    assert_eq!(session.name, "alice");
    assert!(session.consent_photo_use);
    assert!(!session.consent_email_list);
    assert_eq!(session.identifier.as_str(), "jdoe");
    assert_eq!(session.theme, Theme::Justice);

    assert_eq!(captures.load(Ordering::SeqCst), 1);
    assert_eq!(raw, dir.path().join("photos").join("jdoe_alice_Y_N.jpg"));
    assert_eq!(
        processed,
        dir.path().join("photos_cartoon").join("jdoe_alice_Y_N_cart.jpg")
    );
    assert!(raw.is_file());
    assert!(processed.is_file());

    // Processed photo carries the white padding
    let (width, height) = image::image_dimensions(&processed).unwrap();
    assert_eq!(width, 64);
    assert_eq!(height, 48 + config.pipeline.pad_top + config.pipeline.pad_bottom);

    // Transport failed, but it was asked once, with the photo attached
    assert_eq!(
        *mailer.recipients.lock().unwrap(),
        vec!["jdoe@umich.edu".to_string()]
    );
    assert_eq!(mailer.attached.load(Ordering::SeqCst), 1);

    assert!(surface.shows("Processing your photo..."));
    assert_eq!(
        std::fs::read_to_string(dir.path().join("state")).unwrap(),
        "idle"
    );
}

#[tokio::test]
async fn trigger_rearms_for_each_participant() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = booth_config(dir.path());
    config.booth.mode = BoothMode::Show;
    let kiosk = booth(&config, Arc::new(BrokenMailer::default()));

    let captures = Arc::new(AtomicUsize::new(0));
    let trigger = ManualTrigger::new();
    let handle = trigger.handle();
    let mut hardware = BoothHardware::acquire(
        Box::new(FakeCamera {
            captures: captures.clone(),
        }),
        Some(Box::new(trigger)),
    )
    .await
    .unwrap();

    // One press per armed booth
    let state_file: PathBuf = dir.path().join("state");
    let watched = captures.clone();
    let presser = tokio::spawn(async move {
        for taken in 0..2 {
            loop {
                let armed =
                    std::fs::read_to_string(&state_file).ok().as_deref() == Some("armed");
                if armed && watched.load(Ordering::SeqCst) == taken {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            handle.send(TriggerEvent::Button).await.unwrap();
        }
    });

    let mut surface = ScriptedSurface::new(interview_keys());
    let first = kiosk.serve_session(&mut surface, &mut hardware).await.unwrap();
    assert!(matches!(first, SessionOutcome::Completed { .. }));
    assert_eq!(captures.load(Ordering::SeqCst), 1);

    // Next participant starts from Welcome
    surface.push_keys(interview_keys());
    let second = kiosk.serve_session(&mut surface, &mut hardware).await.unwrap();
    assert!(matches!(second, SessionOutcome::Completed { .. }));
    assert_eq!(captures.load(Ordering::SeqCst), 2);

    presser.await.unwrap();
    hardware.release().await;
    assert_eq!(surface.count("Welcome to the"), 2);
}
