use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use dirview::{
    cli::{Cli, OutputFormat},
    config::ViewerConfig,
    core::Session,
    ui::{restore_terminal, run_stream, setup_terminal, StreamFormat, TuiApp},
    view::PreviewCache,
};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match cli.resolve_config() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            std::process::exit(1);
        }
    };

    cli.setup_logging(&config.logging.file)?;
    tracing::info!("Starting dirview");

    let mut session = Session::from_config(&config).context("Invalid ignore pattern")?;
    // An invalid starting folder is reported through the session message.
    let _ = session.set_folder(&config.ui.starting_directory);

    match cli.output {
        OutputFormat::Tui => run_tui_mode(session, &config)?,
        OutputFormat::Json => run_headless_mode(session, StreamFormat::Json)?,
        OutputFormat::Text => run_headless_mode(session, StreamFormat::Text)?,
    }

    tracing::info!("dirview exited");
    Ok(())
}

fn run_tui_mode(session: Session, config: &ViewerConfig) -> Result<()> {
    let previews = PreviewCache::new(config.ui.preview_cache_size, config.ui.preview_lines);

    // Setup terminal
    let mut terminal = setup_terminal()?;

    // Run the application
    let app = TuiApp::new(session, previews);
    let res = app.run(&mut terminal);

    // Restore terminal
    if let Err(err) = restore_terminal(&mut terminal) {
        eprintln!("Failed to restore terminal: {}", err);
    }

    if let Err(err) = res {
        tracing::error!("Application error: {}", err);
        eprintln!("Application error: {}", err);
        std::process::exit(1);
    }

    Ok(())
}

fn run_headless_mode(mut session: Session, format: StreamFormat) -> Result<()> {
    if session.folder().is_none() {
        let message = session
            .message()
            .map(|m| m.text.clone())
            .unwrap_or_else(|| "Please enter a valid folder path.".to_string());
        eprintln!("Error: {}", message);
        std::process::exit(1);
    }

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        r.store(false, Ordering::SeqCst);
    })?;

    let stdout = io::stdout();
    let mut out = stdout.lock();
    run_stream(&mut session, format, &running, &mut out)
}
