//! Zoltar - photo-booth kiosk for Raspberry Pi terminals
//!
//! Run with `zoltar` or `zoltar run` to start the kiosk on the console.
//! Use `zoltar check` to verify tools, overlays and devices.
//! Use `zoltar process <photo> --theme <theme>` to stylize a photo offline.

use clap::Parser;
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use zoltar::cli::{Cli, Commands, ModeArg, StatusFormat, ThemeArg, TriggerArg};
use zoltar::config::{self, BoothMode, Config, TriggerSource};
use zoltar::display::{TerminalSurface, WINDOW_COLS, WINDOW_ROWS};
use zoltar::hardware::BoothHardware;
use zoltar::identity::extract_identifier;
use zoltar::kiosk::Kiosk;
use zoltar::pipeline::{render_theme, CartoonPipeline};
use zoltar::session::{processed_photo_path, Theme};
use zoltar::trigger;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = config::load_config(cli.config.as_deref())?;

    // Apply CLI overrides
    if let Some(mode) = cli.mode {
        config.booth.mode = match mode {
            ModeArg::Show => BoothMode::Show,
            ModeArg::ShowAndEmail => BoothMode::ShowAndEmail,
        };
    }
    if let Some(source) = cli.trigger {
        config.trigger.source = match source {
            TriggerArg::Evdev => TriggerSource::Evdev,
            TriggerArg::Signal => TriggerSource::Signal,
            TriggerArg::Keyboard => TriggerSource::Keyboard,
        };
    }
    if let Some(key) = cli.trigger_key {
        config.trigger.key = key;
    }

    let command = cli.command.unwrap_or(Commands::Run);

    // The kiosk owns the terminal, so it logs to a file
    let log_file = match command {
        Commands::Run => config.resolve_log_file(),
        _ => None,
    };
    init_logging(cli.verbose, cli.quiet, log_file.as_deref())?;

    // Run the appropriate command
    match command {
        Commands::Run => run_kiosk(config).await?,

        Commands::Process {
            photo,
            theme,
            output,
        } => {
            process_photo(&config, &photo, theme_from_arg(theme), output).await?;
        }

        Commands::Identify { raw } => identify(&config, raw)?,

        Commands::Trigger => send_trigger(&config)?,

        Commands::Status { format } => show_status(&config, format),

        Commands::Check => run_check(&config),

        Commands::Config => show_config(&config, cli.config.as_deref())?,
    }

    Ok(())
}

fn init_logging(verbose: u8, quiet: bool, log_file: Option<&Path>) -> anyhow::Result<()> {
    let log_level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("zoltar={},warn", log_level)));

    match log_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::sync::Mutex::new(file))
                .with_ansi(false)
                .with_target(false)
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .init();
        }
    }

    Ok(())
}

fn theme_from_arg(theme: ThemeArg) -> Theme {
    match theme {
        ThemeArg::Expression => Theme::Expression,
        ThemeArg::ScientificDiscovery => Theme::ScientificDiscovery,
        ThemeArg::Justice => Theme::Justice,
    }
}

/// Start the kiosk on the console
async fn run_kiosk(config: Config) -> anyhow::Result<()> {
    let kiosk = Kiosk::from_config(config.clone())?;

    // Devices first, so wiring problems are reported before the terminal
    // switches to the alternate screen
    let hardware = BoothHardware::from_config(&config).await?;

    let mut surface = match TerminalSurface::open(WINDOW_ROWS, WINDOW_COLS) {
        Ok(surface) => surface,
        Err(e) => {
            hardware.release().await;
            return Err(e.into());
        }
    };

    kiosk.run(&mut surface, hardware).await?;
    Ok(())
}

/// Stylize one photo outside the kiosk
async fn process_photo(
    config: &Config,
    photo: &Path,
    theme: Theme,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    let pipeline = CartoonPipeline::new(&config.pipeline)?;
    let output = output.unwrap_or_else(|| processed_photo_path(photo, &config.processed_dir()));

    let written = render_theme(Arc::new(pipeline), photo, theme, &output).await?;
    println!("{}", written.display());
    Ok(())
}

/// Print the identifier for each swipe (argument, or one per stdin line)
fn identify(config: &Config, raw: Option<String>) -> anyhow::Result<()> {
    let lines: Vec<String> = match raw {
        Some(raw) => vec![raw],
        None => std::io::stdin().lock().lines().collect::<Result<_, _>>()?,
    };

    let mut misses = 0;
    for line in &lines {
        match extract_identifier(line) {
            Some(identifier) => {
                println!("{}\t{}", identifier, identifier.email(&config.delivery.domain))
            }
            None => {
                println!("-");
                misses += 1;
            }
        }
    }

    if misses > 0 {
        anyhow::bail!("{} of {} swipe(s) had no identifier", misses, lines.len());
    }
    Ok(())
}

/// Send SIGUSR1 to the running kiosk
fn send_trigger(config: &Config) -> anyhow::Result<()> {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    // SIGUSR1 terminates a process that has no handler for it
    if config.trigger.source != TriggerSource::Signal {
        anyhow::bail!(
            "trigger.source is {:?}, not \"signal\". Set it in config.toml (or run the kiosk with --trigger signal) first.",
            config.trigger.source
        );
    }

    let pid_path = Config::runtime_dir().join("pid");
    let pid = std::fs::read_to_string(&pid_path)
        .map_err(|e| anyhow::anyhow!("Cannot read {:?}: {}. Is the kiosk running?", pid_path, e))?;
    let pid: i32 = pid
        .trim()
        .parse()
        .map_err(|e| anyhow::anyhow!("Invalid PID in {:?}: {}", pid_path, e))?;

    kill(Pid::from_raw(pid), Signal::SIGUSR1)
        .map_err(|e| anyhow::anyhow!("Failed to signal kiosk (pid {}): {}", pid, e))?;
    tracing::debug!("Sent SIGUSR1 to {}", pid);
    Ok(())
}

/// Print the kiosk state from the state file
fn show_status(config: &Config, format: StatusFormat) {
    let state = match config.resolve_state_file() {
        Some(path) => std::fs::read_to_string(path)
            .map(|s| s.trim().to_string())
            .unwrap_or_else(|_| "stopped".to_string()),
        None => {
            eprintln!("state_file is disabled; add state_file = \"auto\" to config.toml");
            "unknown".to_string()
        }
    };

    match format {
        StatusFormat::Text => println!("{}", state),
        StatusFormat::Json => println!("{}", format_state_json(&state)),
    }
}

/// Format state as JSON for status bars
fn format_state_json(state: &str) -> String {
    let (class, tooltip) = match state {
        "idle" => ("idle", "Zoltar ready for the next participant"),
        "interview" => ("busy", "Participant answering questions"),
        "armed" => ("armed", "Waiting for the shutter button"),
        "capturing" => ("busy", "Taking the photo"),
        "processing" => ("busy", "Stylizing the photo"),
        "delivering" => ("busy", "Showing and sending the photo"),
        "stopped" => ("stopped", "Zoltar not running"),
        _ => ("unknown", "Unknown state"),
    };

    serde_json::json!({
        "text": state,
        "class": class,
        "tooltip": tooltip,
    })
    .to_string()
}

/// Verify the booth's external tools, assets and devices
fn run_check(config: &Config) {
    println!("Zoltar Check\n");
    println!("============\n");

    let mut all_ok = true;

    println!("Checking external tools...");
    let mut tools = vec![("camera", config.camera.command.as_str())];
    if config.viewer.enabled {
        tools.push(("viewer", config.viewer.command.as_str()));
    }
    if config.booth.mode == BoothMode::ShowAndEmail {
        tools.push(("mail", config.delivery.command.as_str()));
    }
    for (role, tool) in tools {
        match which::which(tool) {
            Ok(path) => println!("  ✓ {} ({}): {:?}", role, tool, path),
            Err(_) => {
                println!("  ✗ {} ({}) not found in PATH", role, tool);
                all_ok = false;
            }
        }
    }

    println!("\nChecking overlay frames...");
    for theme in Theme::ALL {
        match config.pipeline.overlays.for_theme(theme) {
            Some(path) if path.is_file() => println!("  ✓ {}: {:?}", theme, path),
            Some(path) => {
                println!("  ✗ {}: {:?} missing (photo will have no frame)", theme, path);
                all_ok = false;
            }
            None => println!("  - {}: no overlay configured", theme),
        }
    }

    println!("\nChecking photo directories...");
    match config.ensure_directories() {
        Ok(()) => {
            println!("  ✓ Raw photos: {:?}", config.photos_dir());
            println!("  ✓ Processed photos: {:?}", config.processed_dir());
        }
        Err(e) => {
            println!("  ✗ Cannot create photo directories: {}", e);
            all_ok = false;
        }
    }

    println!("\nChecking capture trigger...");
    match trigger::create_listener(&config.trigger) {
        Ok(Some(listener)) => println!("  ✓ {}", listener.describe()),
        Ok(None) => println!("  ✓ space bar on the booth console"),
        Err(e) => {
            println!("  ✗ {}", e);
            all_ok = false;
        }
    }

    println!("\n---");
    if all_ok {
        println!("✓ All checks passed! Run 'zoltar' to start.");
    } else {
        println!("✗ Some checks failed. Please fix the issues above.");
    }
}

/// Show current configuration
fn show_config(config: &Config, path: Option<&Path>) -> anyhow::Result<()> {
    match path.map(Path::to_path_buf).or_else(Config::default_path) {
        Some(path) if path.exists() => println!("# Loaded from {:?}\n", path),
        _ => println!("# Built-in defaults (no config file)\n"),
    }
    println!("{}", toml::to_string_pretty(config)?);

    println!("# Effective paths");
    println!("#   photos:    {:?}", config.photos_dir());
    println!("#   processed: {:?}", config.processed_dir());
    if let Some(path) = config.resolve_state_file() {
        println!("#   state:     {:?}", path);
    }
    if let Some(path) = config.resolve_log_file() {
        println!("#   log:       {:?}", path);
    }
    Ok(())
}
