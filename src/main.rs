//! gaze-recorder - Main CLI Entry Point

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use gaze_recorder::{
    app::GazeApp,
    cli::{Args, Commands, Verbosity},
    config::Config,
    repl::{spawn_input_thread, ConsoleInput, DisplayManager},
};

/// Route tracing to stderr; `RUST_LOG` overrides the verbosity flags
fn init_tracing(verbosity: Verbosity) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("gaze_recorder={}", verbosity.log_filter())));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .init();
}

/// Run the interactive recording session
async fn run_session(args: &Args, config: Config) -> Result<()> {
    let mode = config.transport.mode.to_string();
    let mut app = GazeApp::new(config, DisplayManager::new())
        .await
        .context("Failed to start gaze recorder")?;

    if args.verbosity().show_banner() {
        let listen = app.local_addr()?.to_string();
        app.recorder()
            .presenter()
            .show_banner(env!("CARGO_PKG_VERSION"), &listen, &mode);
    }

    let input = match Config::state_dir() {
        Some(dir) => ConsoleInput::with_history(dir.join("history"))?,
        None => ConsoleInput::new()?,
    };
    spawn_input_thread(input, app.bus());

    app.run().await?;
    println!("{}", "Goodbye!".green());

    Ok(())
}

fn show_config(config: &Config) -> Result<()> {
    let path = Config::default_path()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "(no home directory)".to_string());

    println!("{}", "gaze-recorder configuration".bold().cyan());
    println!("{}", format!("# default location: {}", path).dimmed());
    println!(
        "{}",
        format!("# export directory: {}", config.export.resolve_dir().display()).dimmed()
    );
    println!();
    print!("{}", config.to_toml()?);

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbosity());

    let mut config = Config::load(args.config.clone())?;
    args.apply_overrides(&mut config);
    config.validate()?;

    match args.command() {
        Commands::Start => run_session(&args, config).await?,
        Commands::Config => show_config(&config)?,
    }

    Ok(())
}
