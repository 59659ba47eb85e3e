mod logging;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use sysoverlay_core::{
    BoundedSampler, ConfigError, OverlaySettingsExt, SettingsWatcher, SystemMetrics,
};
use sysoverlay_overlay::frame::config_from_settings;
use sysoverlay_overlay::platform::headless::HeadlessOverlay;
use sysoverlay_overlay::{OverlayApp, OverlayFrame, OverlayPlatform, OverlayWindow};
use sysoverlay_types::{OverlaySettings, TransparencyMode};
use tokio::sync::{mpsc, watch};

#[derive(Parser, Clone)]
#[command(version, about = "Always-on-top system metrics overlay")]
struct Cli {
    /// Settings file (defaults to the platform config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(long, allow_negative_numbers = true)]
    x: Option<i32>,
    #[arg(long, allow_negative_numbers = true)]
    y: Option<i32>,
    #[arg(long)]
    width: Option<u32>,
    #[arg(long)]
    height: Option<u32>,

    /// Metrics refresh period in milliseconds
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Skip the accelerator probe; accelerator rows stay hidden
    #[arg(long)]
    no_accelerator: bool,

    #[arg(long, value_enum)]
    transparency: Option<TransparencyArg>,

    /// Do not write the final window geometry back on exit
    #[arg(long)]
    no_save: bool,

    /// Print the effective settings as TOML and exit
    #[arg(long)]
    print_config: bool,

    /// Render offscreen instead of opening a window
    #[arg(long)]
    headless: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum TransparencyArg {
    Auto,
    NativeAlpha,
    ChromaKey,
}

impl From<TransparencyArg> for TransparencyMode {
    fn from(arg: TransparencyArg) -> Self {
        match arg {
            TransparencyArg::Auto => TransparencyMode::Auto,
            TransparencyArg::NativeAlpha => TransparencyMode::NativeAlpha,
            TransparencyArg::ChromaKey => TransparencyMode::ChromaKey,
        }
    }
}

impl Cli {
    /// Command-line values win over the settings file for this session
    fn apply_overrides(&self, settings: &mut OverlaySettings) {
        if let Some(x) = self.x {
            settings.window.x = x;
        }
        if let Some(y) = self.y {
            settings.window.y = y;
        }
        if let Some(width) = self.width {
            settings.window.width = width;
        }
        if let Some(height) = self.height {
            settings.window.height = height;
        }
        if let Some(interval_ms) = self.interval_ms {
            settings.update_interval_ms = interval_ms;
        }
        if let Some(transparency) = self.transparency {
            settings.transparency = transparency.into();
        }
    }
}

fn load_settings(path: Option<&Path>) -> Result<OverlaySettings, ConfigError> {
    match path {
        Some(path) => OverlaySettings::load_from(path),
        None => Ok(OverlaySettings::load()),
    }
}

fn save_settings(path: Option<&Path>, settings: &OverlaySettings) {
    let result = match path {
        Some(path) => settings.save_to(path),
        None => settings.save(),
    };
    match result {
        Ok(()) => tracing::info!("Window geometry saved"),
        Err(e) => tracing::error!(error = %e, "Failed to save settings"),
    }
}

/// Forward validated settings file changes to the app, with command-line
/// overrides re-applied. The raw file contents are published on `file_tx`.
fn spawn_settings_forwarder(
    path: PathBuf,
    cli_overrides: Cli,
    app_tx: mpsc::Sender<OverlaySettings>,
    file_tx: watch::Sender<OverlaySettings>,
) {
    let mut watcher = match SettingsWatcher::new(&path) {
        Ok(watcher) => watcher,
        Err(e) => {
            tracing::warn!(error = %e, path = %path.display(), "Settings hot reload disabled");
            return;
        }
    };

    tokio::spawn(async move {
        while let Some(reloaded) = watcher.next_settings().await {
            let file_settings = match reloaded {
                Ok(settings) => settings,
                Err(e) => {
                    tracing::warn!(error = %e, "Ignoring invalid settings file");
                    continue;
                }
            };
            let mut effective = file_settings.clone();
            cli_overrides.apply_overrides(&mut effective);
            file_tx.send_replace(file_settings);
            if app_tx.send(effective).await.is_err() {
                break;
            }
        }
    });
}

async fn run_app<P: OverlayPlatform>(
    frame: OverlayFrame<P>,
    settings: OverlaySettings,
    sampler: BoundedSampler,
    settings_rx: mpsc::Receiver<OverlaySettings>,
) -> OverlaySettings {
    let mut app = OverlayApp::new(frame, settings, sampler);
    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };
    app.run_until(Some(settings_rx), shutdown).await;
    app.current_settings()
}

async fn run(cli: Cli) -> ExitCode {
    let settings_path = cli
        .config
        .clone()
        .or_else(OverlaySettings::default_path);

    let file_settings = match load_settings(cli.config.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load settings");
            return ExitCode::FAILURE;
        }
    };

    let mut settings = file_settings.clone();
    cli.apply_overrides(&mut settings);
    if let Err(e) = settings.validate() {
        tracing::error!(error = %e, "Invalid settings");
        return ExitCode::FAILURE;
    }

    let sampler = BoundedSampler::new(Box::new(SystemMetrics::new(!cli.no_accelerator)));

    let (app_tx, app_rx) = mpsc::channel(8);
    let (file_tx, file_rx) = watch::channel(file_settings);
    if let Some(path) = settings_path.clone() {
        spawn_settings_forwarder(path, cli.clone(), app_tx, file_tx);
    }

    let final_settings = if cli.headless {
        let platform = match HeadlessOverlay::new(config_from_settings(&settings.window)) {
            Ok(platform) => platform,
            Err(e) => {
                tracing::error!(error = %e, "Failed to create headless overlay");
                return ExitCode::FAILURE;
            }
        };
        let frame = OverlayFrame::from_window(OverlayWindow::from_platform(platform), &settings);
        run_app(frame, settings, sampler, app_rx).await
    } else {
        let frame = match OverlayFrame::new(&settings) {
            Ok(frame) => frame,
            Err(e) => {
                tracing::error!(error = %e, "Failed to create overlay window");
                return ExitCode::FAILURE;
            }
        };
        run_app(frame, settings, sampler, app_rx).await
    };

    if !cli.no_save {
        let mut to_save = file_rx.borrow().clone();
        to_save.window.x = final_settings.window.x;
        to_save.window.y = final_settings.window.y;
        to_save.window.width = final_settings.window.width;
        to_save.window.height = final_settings.window.height;
        save_settings(cli.config.as_deref(), &to_save);
    }

    ExitCode::SUCCESS
}

/// Runs before logging is set up so stdout holds only the TOML
fn print_config(cli: &Cli) -> ExitCode {
    let rendered = load_settings(cli.config.as_deref()).and_then(|mut settings| {
        cli.apply_overrides(&mut settings);
        settings.validate()?;
        settings.to_toml()
    });
    match rendered {
        Ok(text) => {
            print!("{text}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if cli.print_config {
        return print_config(&cli);
    }
    let _log_guard = logging::init();

    // The window belongs to the thread that created it, so everything runs
    // on one thread
    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!(error = %e, "Failed to start async runtime");
            return ExitCode::FAILURE;
        }
    };

    runtime.block_on(run(cli))
}
