#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(
    clippy::cast_precision_loss,
    clippy::doc_markdown,
    clippy::multiple_crate_versions
)]

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use anyhow::Context;
use clap::Parser;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use worldspace_ui::{
    backend::{headless::HeadlessHost, selector::InputModality},
    config::PanelConfig,
    config_io,
};

/// Drive a world-space UI panel with scripted mouse or controller input
#[derive(Default, Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Use mouse input projected through the camera
    #[arg(long, conflicts_with = "controller")]
    mouse: bool,

    /// Use the controller ray
    #[arg(long)]
    controller: bool,

    /// Number of frames to simulate
    #[arg(long, default_value_t = 600)]
    frames: u64,

    /// Path to write logs to
    #[arg(short, long, value_name = "FILE_PATH")]
    log_to: Option<String>,
}

impl Args {
    const fn modality(&self, config: &PanelConfig) -> InputModality {
        if self.mouse {
            InputModality::Mouse
        } else if self.controller {
            InputModality::Controller
        } else {
            InputModality::from_use_mouse(config.use_mouse)
        }
    }
}

fn main() -> anyhow::Result<()> {
    let mut args = Args::parse();

    logging_init(&mut args)?;

    log::info!(
        "Welcome to {} version {}!",
        env!("CARGO_PKG_NAME"),
        env!("WSUI_BUILD"),
    );

    let running = Arc::new(AtomicBool::new(true));
    let _ = ctrlc::set_handler({
        let running = running.clone();
        move || {
            running.store(false, Ordering::Relaxed);
        }
    });

    let root = config_io::ensure_config_root();
    log::debug!("Config root: {}", root.to_string_lossy());

    let config = PanelConfig::load_from_disk().context("Could not load config")?;
    let modality = args.modality(&config);

    let mut host = HeadlessHost::new(&config, modality)?;
    let stats = host.run(args.frames, &running);

    log::info!(
        "{}: {} moves ({} on the panel), {} clicks, {} scrolls, {} other events",
        config.name,
        stats.moves,
        stats.inside,
        stats.clicks,
        stats.scrolls,
        stats.other,
    );
    if let Some(pos) = stats.last_panel_pos {
        log::info!("Last pointer position on the panel: {:.1}, {:.1}", pos.x, pos.y);
    }

    Ok(())
}

fn logging_init(args: &mut Args) -> anyhow::Result<()> {
    let log_file_path = args
        .log_to
        .take()
        .or_else(|| std::env::var("WSUI_LOGFILE").ok())
        .unwrap_or_else(|| String::from("/tmp/worldspace-ui.log"));

    let file_writer = match std::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&log_file_path)
    {
        Ok(file) => {
            println!("Logging to {}", &log_file_path);
            Some(file)
        }
        Err(e) => {
            println!("Failed to open log file (path: {e:?}): {log_file_path}");
            None
        }
    };

    let registry = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .pretty()
                .with_writer(std::io::stderr),
        )
        .with(
            /* read RUST_LOG env var */
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env_lossy()
                .add_directive("config=warn".parse()?),
        );

    if let Some(writer) = file_writer {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_file(true)
                    .with_line_number(true)
                    .with_writer(writer)
                    .with_ansi(false),
            )
            .init();
    } else {
        registry.init();
    }

    log_panics::init();
    Ok(())
}
