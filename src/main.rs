//! FiboFlow: merge tiles whose sum is a Fibonacci number, in the terminal.

mod app;
mod clock;
mod error;
mod fib;
mod grid;
mod input;
mod mode;
mod session;
mod theme;
mod timer;
mod ui;

use anyhow::{Context, Result};
use app::App;
use clap::{Parser, ValueEnum};
use mode::Mode;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Options derived from CLI that affect game behaviour.
#[derive(Debug, Clone)]
pub struct GameConfig {
    pub mode: Mode,
    pub no_animation: bool,
    pub mouse: bool,
    pub frame_rate: f64,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_file.as_deref(), &args.log_level)?;
    let theme = theme::Theme::load(args.theme.as_deref(), args.palette).unwrap_or_else(|e| {
        warn!(error = %e, "theme not loaded, using defaults");
        theme::Theme::default()
    });
    let config = GameConfig {
        mode: args.mode,
        no_animation: args.no_animation,
        mouse: !args.no_mouse,
        frame_rate: args.frame_rate.max(1.0),
    };
    info!(?config, "starting");
    let mut app = App::new(config, theme);
    app.run()?;
    info!("bye");
    Ok(())
}

/// The terminal belongs to the game, so logs only go to a file when asked for.
fn init_logging(path: Option<&Path>, level: &str) -> Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening log file {}", path.display()))?;
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("installing log subscriber: {e}"))?;
    Ok(())
}

/// Fibonacci tile-merging puzzle in the terminal.
#[derive(Debug, Parser)]
#[command(
    name = "fiboflow",
    version,
    about = "Fibonacci merging puzzle in the terminal. Drag a tile onto another; the merge only works if their sum is a Fibonacci number.",
    long_about = "FiboFlow is a terminal puzzle game.\n\n\
        Every tile starts at 1. Drag a tile onto another: if the two values add up to a \
        Fibonacci number (1, 1, 2, 3, 5, 8, 13, ...) the target takes the sum, the dragged \
        tile goes back to 1 and you score sum x multiplier. Each merge resets the countdown; \
        when it runs out the game is over.\n\n\
        CONTROLS:\n  Mouse        Drag and drop tiles\n  Arrows/hjkl  Move cursor   Space/Enter  Pick up / drop\n  \
        Esc          Cancel drag   1 2 3        Easy / Hard / Extreme   m  Cycle mode\n  \
        R            Restart       P            Pause                  Q  Quit\n\n\
        A run started in extreme mode stays in extreme until restart; a run started in \
        another mode can't switch into extreme."
)]
pub struct Args {
    /// Difficulty: easy (x1, 60 s, hints), hard (x2, 30 s), extreme (x3, 15 s, 3x3 grid).
    #[arg(short, long, default_value = "hard")]
    pub mode: Mode,

    /// Path to theme file (btop-style theme[key]=\"value\"). Uses One Dark if not set.
    #[arg(short, long, value_name = "FILE")]
    pub theme: Option<PathBuf>,

    /// Colour palette: normal (theme), high-contrast, or colorblind.
    #[arg(long, default_value = "normal")]
    pub palette: Palette,

    /// Disable the merge flash effect.
    #[arg(long)]
    pub no_animation: bool,

    /// Keyboard only: don't capture the mouse.
    #[arg(long)]
    pub no_mouse: bool,

    /// Target render frames per second.
    #[arg(long, default_value = "30.0", value_name = "RATE")]
    pub frame_rate: f64,

    /// Write logs to this file (the terminal is used by the game).
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Log filter when --log-file is set; RUST_LOG takes precedence.
    #[arg(long, default_value = "info", value_name = "FILTER")]
    pub log_level: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Palette {
    #[default]
    Normal,

    #[value(alias = "highcontrast", alias = "contrast")]
    HighContrast,

    #[value(alias = "colourblind")]
    Colorblind,
}
