// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/nightwatch

//! NightWatch - Personal Night-Safety Monitor
//!
//! Headless runner: wires the safety engine to the configured services,
//! optionally feeds it simulated sensors, and prints every engine event
//! as one JSON line on stdout.

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast;

use nightwatch::{Config, Engine, EngineHandle, SensorManager, Services, SettingsUpdate, VERSION};

/// NightWatch - Personal Night-Safety Monitor
#[derive(Parser, Debug)]
#[command(name = "nightwatch")]
#[command(author = "NightWatch Project")]
#[command(version = VERSION)]
#[command(about = "Night-time sound and motion monitor with SOS countdown")]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Enable trace-level logging
    #[arg(long)]
    trace: bool,

    /// Demo mode with simulated sensors
    #[arg(long)]
    demo: bool,

    /// Emergency contact as NAME=PHONE (repeatable)
    #[arg(long = "contact", value_name = "NAME=PHONE")]
    contacts: Vec<String>,

    /// Turn monitoring on at startup
    #[arg(long)]
    monitor: bool,

    /// Monitoring schedule as HH:MM-HH:MM
    #[arg(long, value_name = "START-END")]
    schedule: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Load or create configuration before logging so its level can apply
    let config_path = args.config.clone().unwrap_or_else(Config::default_path);
    let mut config = Config::load_or_create(&config_path)?;

    // Initialize logging
    let log_level = if args.trace {
        Level::TRACE
    } else if args.debug {
        Level::DEBUG
    } else {
        config.tracing_level()?
    };

    // stdout carries the event stream, logs go to stderr
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_file(args.debug)
        .with_line_number(args.debug)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("🌙 NightWatch v{} - Personal Night-Safety Monitor", VERSION);

    if args.demo {
        config.demo_mode = true;
    }

    info!("Configuration loaded from {:?}", config_path);
    info!("Log level: {}", log_level);
    info!("Demo mode: {}", config.demo_mode);

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run_headless(config, args))
}

/// Run the engine until Ctrl+C
async fn run_headless(config: Config, args: Args) -> Result<()> {
    let services = Services::headless(&config);
    let demo_mode = config.demo_mode;
    let sensor_config = Arc::new(config.clone());

    let engine = Engine::new(config, services)?;
    let handle = engine.handle();
    info!("Safety engine initialized");

    apply_startup_options(&handle, &args)?;

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    let mut events = handle.subscribe();
    let engine_task = tokio::spawn(engine.run(shutdown_rx));

    let printer = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => match serde_json::to_string(&event) {
                    Ok(line) => println!("{}", line),
                    Err(e) => warn!("Could not encode event {}: {}", event.id, e),
                },
                Err(broadcast::error::RecvError::Lagged(n)) => warn!("Event printer lagged by {} events", n),
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let sensors = if demo_mode {
        SensorManager::with_demo_sensors(sensor_config)
    } else {
        SensorManager::new(sensor_config)
    };
    if sensors.is_empty() {
        info!("No built-in sensors; waiting for samples from integrations");
    } else {
        info!("Starting {} sensor pump(s)", sensors.len());
    }
    let pumps = sensors.start(handle.clone(), &shutdown_tx);

    info!("🚀 NightWatch running in headless mode");
    info!("   Press Ctrl+C to shutdown");

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received, cleaning up...");
    let _ = shutdown_tx.send(());

    for pump in pumps {
        match pump.await {
            Ok(Err(e)) => warn!("Sensor pump failed: {}", e),
            Err(e) => warn!("Sensor pump panicked: {}", e),
            Ok(Ok(())) => {}
        }
    }
    engine_task.await??;
    drop(handle);
    printer.abort();

    info!("NightWatch shutdown complete");
    Ok(())
}

fn apply_startup_options(handle: &EngineHandle, args: &Args) -> Result<()> {
    for entry in &args.contacts {
        let (name, phone) = parse_contact(entry)?;
        let contact = handle.add_contact(name, phone, "");
        info!("Registered contact {} ({})", contact.name, contact.phone);
    }
    if handle.contacts().iter().all(|c| !c.is_usable()) {
        warn!("No usable SOS contacts; an SOS would reach nobody");
    }

    let mut update = SettingsUpdate::default();
    if args.monitor {
        update = update.monitoring(true).vibration(true);
    }
    if let Some(window) = &args.schedule {
        let (start, end) = window
            .split_once('-')
            .with_context(|| format!("schedule must look like HH:MM-HH:MM, got {:?}", window))?;
        update = update.schedule(true, start.trim(), end.trim());
    }
    handle.update_settings(update)?;
    Ok(())
}

fn parse_contact(entry: &str) -> Result<(&str, &str)> {
    match entry.split_once('=') {
        Some((name, phone)) if !name.trim().is_empty() && !phone.trim().is_empty() => {
            Ok((name.trim(), phone.trim()))
        }
        _ => bail!("contact must look like NAME=PHONE, got {:?}", entry),
    }
}
