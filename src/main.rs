//! Holdtype - push-to-talk dictation for the desktop
//!
//! Hold a trigger key (right ctrl or right shift by default), speak, and
//! release: the recognized text is typed into the window that was focused
//! when you started, even if you clicked elsewhere while speaking.

use clap::{Parser, Subcommand, ValueEnum};
use holdtype::config;
use holdtype::daemon::Daemon;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "holdtype")]
#[command(author, version, about = "Push-to-talk dictation for the desktop")]
#[command(long_about = "
Holdtype is a push-to-talk dictation daemon.
Hold a trigger key to record, release to transcribe, and the text is typed
into the window that was focused when recording began.

SETUP:
  1. Add yourself to the input group: sudo usermod -aG input $USER
  2. Log out and back in
  3. Install a recognition engine (whisper-cli) and xdotool or wtype
  4. Run: holdtype

USAGE:
  Hold right ctrl or right shift (default) while speaking, release to
  transcribe. Release Esc to quit. Press space between recordings to skip
  the next auto-confirm keystroke.
")]
struct Cli {
    /// Path to config file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Increase verbosity (-v = debug, -vv = trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Quiet mode (errors only)
    #[arg(short, long)]
    quiet: bool,

    /// Engine model size
    #[arg(long, value_enum, value_name = "MODEL")]
    model: Option<ModelArg>,

    /// Language hint for the engine, or "auto"
    #[arg(long, value_name = "LANG")]
    language: Option<String>,

    /// Compute device for the engine
    #[arg(long, value_enum, value_name = "DEVICE")]
    device: Option<DeviceArg>,

    /// Numeric precision for the engine
    #[arg(long, value_enum, value_name = "TYPE")]
    compute_type: Option<ComputeTypeArg>,

    /// Trigger key selection ("both" = right ctrl OR right shift)
    #[arg(long, value_enum, value_name = "KEY")]
    key: Option<KeyArg>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run as daemon (default if no command specified)
    Daemon,

    /// Show the default configuration template
    Config,
}

#[derive(Clone, Copy, ValueEnum)]
enum ModelArg {
    Tiny,
    Base,
    Small,
    Medium,
    Large,
}

impl ModelArg {
    fn as_str(self) -> &'static str {
        match self {
            ModelArg::Tiny => "tiny",
            ModelArg::Base => "base",
            ModelArg::Small => "small",
            ModelArg::Medium => "medium",
            ModelArg::Large => "large",
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum DeviceArg {
    Cpu,
    Cuda,
}

impl DeviceArg {
    fn as_str(self) -> &'static str {
        match self {
            DeviceArg::Cpu => "cpu",
            DeviceArg::Cuda => "cuda",
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ComputeTypeArg {
    Int8,
    Float16,
    Float32,
}

impl ComputeTypeArg {
    fn as_str(self) -> &'static str {
        match self {
            ComputeTypeArg::Int8 => "int8",
            ComputeTypeArg::Float16 => "float16",
            ComputeTypeArg::Float32 => "float32",
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
#[value(rename_all = "snake_case")]
enum KeyArg {
    Alt,
    AltL,
    AltR,
    AltGr,
    Ctrl,
    CtrlR,
    ShiftL,
    ShiftR,
    F12,
    /// Right ctrl OR right shift (default)
    Both,
}

impl KeyArg {
    fn key_names(self) -> Vec<String> {
        let names: &[&str] = match self {
            KeyArg::Alt => &["alt"],
            KeyArg::AltL => &["alt_l"],
            KeyArg::AltR => &["alt_r"],
            KeyArg::AltGr => &["alt_gr"],
            KeyArg::Ctrl => &["ctrl"],
            KeyArg::CtrlR => &["ctrl_r"],
            KeyArg::ShiftL => &["shift_l"],
            KeyArg::ShiftR => &["shift_r"],
            KeyArg::F12 => &["f12"],
            KeyArg::Both => &["ctrl_r", "shift_r"],
        };
        names.iter().map(|n| n.to_string()).collect()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(format!("holdtype={},warn", log_level))),
        )
        .with_target(false)
        .init();

    // Load configuration
    let mut config = config::load_config(cli.config.as_deref())?;

    // Apply CLI overrides
    if let Some(model) = cli.model {
        config.engine.model = model.as_str().to_string();
    }
    if let Some(language) = cli.language {
        config.engine.language = language;
    }
    if let Some(device) = cli.device {
        config.engine.device = device.as_str().to_string();
    }
    if let Some(compute_type) = cli.compute_type {
        config.engine.compute_type = compute_type.as_str().to_string();
    }
    if let Some(key) = cli.key {
        config.control.keys = key.key_names();
    }

    match cli.command.unwrap_or(Commands::Daemon) {
        Commands::Daemon => {
            let mut daemon = Daemon::new(config);
            daemon.run().await?;
        }
        Commands::Config => {
            print!("{}", config::DEFAULT_CONFIG);
        }
    }

    Ok(())
}
