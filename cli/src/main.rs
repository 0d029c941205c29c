#[cfg(test)]
#[path = "main_test.rs"]
mod tests;

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use otef_sync::{
    Change, Coordinator, Gesture, Outcome, RemoteBackend, RestClient, RestError, SessionBuilder, SyncConfig, SyncError,
    Topic,
};
use serde_json::Value;
use tracing_subscriber::EnvFilter;
use viewport::{BoundsPolygon, Direction, Rejection, Viewport};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Sync(#[from] SyncError),
    #[error(transparent)]
    Rest(#[from] RestError),
    #[error("rejected locally: {0}")]
    Rejected(Rejection),
    #[error("could not read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("invalid bounds file: {0}")]
    InvalidBounds(#[from] wire::CodecError),
    #[error("no viewport loaded from server")]
    NoViewport,
}

#[derive(Parser, Debug)]
#[command(name = "otef", about = "Remote controller for the shared projection table")]
struct Cli {
    #[arg(long, env = "OTEF_BASE_URL", default_value = otef_sync::config::DEFAULT_BASE_URL)]
    base_url: String,

    #[arg(long, env = "OTEF_TABLE", default_value = otef_sync::config::DEFAULT_TABLE)]
    table: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the full state snapshot.
    State,
    /// Pan one step (e.g. `north`, `southwest`).
    Pan {
        direction: Direction,
        /// Fraction of the viewport extent to move.
        #[arg(long)]
        delta: Option<f64>,
    },
    /// Zoom to an absolute level (clamped to 10..=19).
    Zoom { level: u8 },
    /// Save a bounds polygon from a JSON file (vertex array or `{"bounds_polygon": [...]}`).
    SaveBounds { file: PathBuf },
    /// Print every broadcast frame until Ctrl-C.
    Watch,
    /// Drive with a constant velocity, then stop.
    Drive {
        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        vx: f64,
        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        vy: f64,
        #[arg(long, default_value_t = 2.0)]
        seconds: f64,
    },
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = SyncConfig { base_url: cli.base_url, table: cli.table, ..SyncConfig::from_env() };

    match cli.command {
        Command::State => run_state(&config).await,
        Command::Pan { direction, delta } => {
            let config = SyncConfig { pan_delta: delta.unwrap_or(config.pan_delta), ..config };
            run_viewport_command(&config, ViewAction::Pan(direction)).await
        }
        Command::Zoom { level } => run_viewport_command(&config, ViewAction::Zoom(level)).await,
        Command::SaveBounds { file } => run_save_bounds(&config, &file).await,
        Command::Watch => run_watch(config).await,
        Command::Drive { vx, vy, seconds } => run_drive(config, vx, vy, seconds).await,
    }
}

async fn run_state(config: &SyncConfig) -> Result<(), CliError> {
    let snapshot = RestClient::new(config)?.fetch_state().await?;
    print_json(&serde_json::to_value(&snapshot)?)
}

enum ViewAction {
    Pan(Direction),
    Zoom(u8),
}

/// Load state, apply one command through the coordinator, print the result.
async fn run_viewport_command(config: &SyncConfig, action: ViewAction) -> Result<(), CliError> {
    let mut coordinator = Coordinator::new(RemoteBackend::rest_only(config)?, config);
    coordinator.resync().await?;
    let outcome = match action {
        ViewAction::Pan(direction) => coordinator.pan(direction).await?,
        ViewAction::Zoom(level) => coordinator.zoom(level).await?,
    };
    match outcome {
        Outcome::Accepted => {}
        Outcome::Rejected(reason) => return Err(CliError::Rejected(reason)),
    }
    let viewport = coordinator.viewport().ok_or(CliError::NoViewport)?;
    print_viewport(viewport)
}

async fn run_save_bounds(config: &SyncConfig, file: &Path) -> Result<(), CliError> {
    let polygon = read_bounds(file)?;
    let mut coordinator = Coordinator::new(RemoteBackend::rest_only(config)?, config);
    let saved = coordinator.save_bounds(polygon).await?;
    print_json(&serde_json::to_value(&saved)?)
}

async fn run_watch(config: SyncConfig) -> Result<(), CliError> {
    let handle = SessionBuilder::new(config)
        .on_any_message(|msg| match wire::encode_message(msg) {
            Ok(text) => println!("{text}"),
            Err(e) => tracing::warn!(error = %e, "could not re-encode frame"),
        })
        .subscribe(Topic::Connection, |change| {
            if let Change::Connection(up) = change {
                tracing::info!(connected = *up, "connection changed");
            }
        })
        .start()
        .await?;

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "ctrl-c handler failed");
    }
    handle.shutdown().await;
    Ok(())
}

async fn run_drive(config: SyncConfig, vx: f64, vy: f64, seconds: f64) -> Result<(), CliError> {
    let (x, y) = joystick_deflection(vx, vy, config.joystick_max_speed);
    let handle = SessionBuilder::new(config)
        .subscribe(Topic::Viewport, |change| {
            if let Change::Viewport(vp) = change {
                tracing::debug!(bbox = ?vp.bbox().to_array(), "viewport");
            }
        })
        .start()
        .await?;

    handle.send(Gesture::Joystick { x, y });
    tokio::time::sleep(Duration::from_secs_f64(seconds.max(0.0))).await;
    handle.send(Gesture::JoystickRelease);
    // Let the stop frame go out before the socket closes.
    tokio::time::sleep(Duration::from_millis(200)).await;
    handle.shutdown().await;
    Ok(())
}

/// Planar velocity back to stick deflection (screen y is down).
fn joystick_deflection(vx: f64, vy: f64, max_speed: f64) -> (f64, f64) {
    if max_speed <= 0.0 || !max_speed.is_finite() {
        return (0.0, 0.0);
    }
    ((vx / max_speed).clamp(-1.0, 1.0), (-vy / max_speed).clamp(-1.0, 1.0))
}

fn read_bounds(path: &Path) -> Result<BoundsPolygon, CliError> {
    let text = std::fs::read_to_string(path).map_err(|source| CliError::Read { path: path.to_owned(), source })?;
    let value: Value = serde_json::from_str(&text)?;
    Ok(wire::decode_bounds_response(&value)?)
}

fn print_viewport(viewport: &Viewport) -> Result<(), CliError> {
    print_json(&serde_json::to_value(viewport)?)
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
