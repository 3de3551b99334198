//! `trailrec` - CLI for the dashcam recorder and GPS logger
//!
//! This binary runs either daemon in the foreground and offers a few
//! inspection commands for stored data and configuration.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::path::Path;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};

use trailrec::cli::{
    Cli, Command, ConfigCommand, DumpCommand, GpsCommand, OutputFormat, RecordCommand,
};
use trailrec::gps::{run_logger, DebugPrinter, GpsdConnection, RecordWriter};
use trailrec::shutdown::install_signal_handlers;
use trailrec::storage::{open_store_for, store_path, today};
use trailrec::{
    init_logging, Config, FilenameSequencer, GpsStore, NamingScheme, ProcessCamera, Recorder,
    ShutdownToken,
};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    // Load configuration
    let config = Config::load_from(cli.config.clone())?;

    // Execute the command
    match cli.command {
        Command::Record(cmd) => runtime()?.block_on(handle_record(config, cmd)),
        Command::Gps(cmd) => runtime()?.block_on(handle_gps(config, cmd)),
        Command::Dump(cmd) => handle_dump(&config, &cmd),
        Command::Config(cmd) => handle_config(&config, cmd),
    }
}

fn runtime() -> anyhow::Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")
}

async fn handle_record(mut config: Config, cmd: RecordCommand) -> anyhow::Result<()> {
    if let Some(dir) = cmd.output_dir {
        config.recorder.output_dir = Some(dir);
    }
    if let Some(max) = cmd.max_segments {
        config.recorder.max_segments = max;
    }
    config.recorder.timestamped_names |= cmd.timestamped;
    config.validate()?;

    let token = ShutdownToken::new();
    install_signal_handlers(&token).context("failed to install signal handlers")?;

    let output_dir = config.output_dir();
    let max = config.recorder.max_segments;
    let naming = if config.recorder.timestamped_names {
        NamingScheme::Timestamped
    } else {
        NamingScheme::Plain
    };

    let sequencer = FilenameSequencer::resume(&output_dir, max, naming, token)?;
    info!(
        dir = %output_dir.display(),
        start = sequencer.peek_number(),
        max,
        "Starting recorder"
    );

    let camera = ProcessCamera::new(
        config.recorder.camera_command.clone(),
        config.resolution()?,
        config.recorder.framerate,
    );
    let mut recorder = Recorder::new(camera, config.segment_length());
    recorder.run(sequencer).await?;
    Ok(())
}

async fn handle_gps(mut config: Config, cmd: GpsCommand) -> anyhow::Result<()> {
    if let Some(dir) = cmd.data_dir {
        config.gps.data_dir = Some(dir);
    }
    config.gps.debug_mode |= cmd.debug_mode;

    let token = ShutdownToken::new();
    install_signal_handlers(&token).context("failed to install signal handlers")?;

    let mut writer: Box<dyn RecordWriter> = if config.gps.debug_mode {
        info!("GPS debug mode: printing records instead of storing them");
        Box::new(DebugPrinter::stdout())
    } else {
        let store = open_store_for(&config.gps_data_dir(), config.gps.store_mode, today())?;
        info!(path = %store.path().display(), "Logging GPS records");
        Box::new(store)
    };

    let mut source = match open_source(&config, &token).await {
        Ok(Some(source)) => source,
        Ok(None) => {
            writer.close()?;
            return Ok(());
        }
        Err(e) => {
            if let Err(close_err) = writer.close() {
                warn!(error = %close_err, "Failed to close GPS writer");
            }
            return Err(e);
        }
    };

    run_logger(&mut source, writer.as_mut(), &token).await?;
    Ok(())
}

/// Wait for the receiver and connect to gpsd.
///
/// Returns `None` if shutdown was requested before the receiver appeared.
async fn open_source(
    config: &Config,
    token: &ShutdownToken,
) -> anyhow::Result<Option<GpsdConnection>> {
    if !wait_for_receiver(config, token).await? {
        return Ok(None);
    }
    Ok(Some(GpsdConnection::connect(&config.gpsd_addr()).await?))
}

/// Returns `false` if shutdown was requested before the receiver appeared.
#[cfg(target_os = "linux")]
async fn wait_for_receiver(config: &Config, token: &ShutdownToken) -> anyhow::Result<bool> {
    use trailrec::gps::{wait_for_device, DeviceWait};
    use trailrec_linux::UsbDeviceProbe;

    let probe = UsbDeviceProbe::new(
        &config.gps.usb_vendor_id,
        config.gps.usb_product_id.as_deref(),
    );
    match wait_for_device(
        &probe,
        config.device_poll_interval(),
        config.device_max_attempts(),
        token,
    )
    .await
    {
        DeviceWait::Present => Ok(true),
        DeviceWait::Cancelled => Ok(false),
        DeviceWait::GaveUp { attempts } => {
            anyhow::bail!("GPS receiver {probe} not found after {attempts} attempts")
        }
    }
}

#[cfg(not(target_os = "linux"))]
#[allow(clippy::unused_async)]
async fn wait_for_receiver(_config: &Config, token: &ShutdownToken) -> anyhow::Result<bool> {
    warn!("USB device detection is only available on Linux; connecting directly");
    Ok(!token.is_cancelled())
}

fn handle_dump(config: &Config, cmd: &DumpCommand) -> anyhow::Result<()> {
    let dir = cmd.data_dir.clone().unwrap_or_else(|| config.gps_data_dir());
    let date = cmd.date.unwrap_or_else(today);
    let path = store_path(&dir, config.gps.store_mode, date);

    if !path.exists() {
        warn!(path = %path.display(), "No GPS store found");
        println!("No GPS records for {date}.");
        return Ok(());
    }

    let store = GpsStore::open(&path)?;
    let records = store.recent(cmd.limit)?;

    match cmd.format {
        OutputFormat::Json => {
            for record in &records {
                println!("{}", serde_json::to_string(record)?);
            }
        }
        OutputFormat::Table => {
            print_store_summary(&store, &path)?;
            println!(
                "{:>6}  {:<25} {:>11} {:>12} {:>8} {:>7} {:>7}",
                "ID", "TIMESTAMP", "LATITUDE", "LONGITUDE", "ALT", "CLIMB", "SPEED"
            );
            for record in &records {
                println!(
                    "{:>6}  {:<25} {:>11.6} {:>12.6} {:>8.1} {:>7.2} {:>7.2}",
                    record.id.unwrap_or_default(),
                    record.timestamp.to_rfc3339(),
                    record.latitude,
                    record.longitude,
                    record.altitude,
                    record.climb_speed,
                    record.speed
                );
            }
        }
    }
    Ok(())
}

fn print_store_summary(store: &GpsStore, path: &Path) -> anyhow::Result<()> {
    let stats = store.stats()?;
    println!("Store:      {}", path.display());
    println!("Records:    {}", stats.total_records);
    if let (Some(first), Some(last)) = (stats.first_fix, stats.last_fix) {
        println!("First fix:  {}", first.to_rfc3339());
        println!("Last fix:   {}", last.to_rfc3339());
    }
    println!("Size:       {} bytes", stats.db_size_bytes);
    println!();
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Recorder]");
                println!("  Output dir:         {}", config.output_dir().display());
                println!("  Max segments:       {}", config.recorder.max_segments);
                println!("  Segment seconds:    {}", config.recorder.segment_seconds);
                println!("  Resolution:         {}", config.recorder.resolution);
                println!("  Framerate:          {}", config.recorder.framerate);
                println!("  Timestamped names:  {}", config.recorder.timestamped_names);
                println!("  Camera command:     {}", config.recorder.camera_command);
                println!();
                println!("[GPS]");
                println!("  Data dir:           {}", config.gps_data_dir().display());
                println!("  Store mode:         {:?}", config.gps.store_mode);
                println!("  Debug mode:         {}", config.gps.debug_mode);
                println!("  gpsd:               {}", config.gpsd_addr());
                println!("  Device poll (s):    {}", config.gps.device_poll_seconds);
                println!("  Device attempts:    {}", config.gps.device_max_attempts);
                println!(
                    "  USB device:         {}:{}",
                    config.gps.usb_vendor_id,
                    config.gps.usb_product_id.as_deref().unwrap_or("*")
                );
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}
