// src/main.rs - Telemetry host: config, worker, periodic poll loop
use clap::Parser;
use haas_telemetry::config::TelemetryConfig;
use haas_telemetry::{MachineDataCollector, SerialDispatcher, worker};

#[derive(Debug, Parser)]
#[command(
    name = "haas-host",
    about = "Polls a Haas CNC controller over serial and logs telemetry snapshots"
)]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "machine.toml")]
    config: String,

    /// Override the serial port from the configuration file.
    #[arg(short, long)]
    port: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args = Args::parse();

    tracing::info!("Starting Haas telemetry host");
    tracing::info!("Loading configuration from: {}", args.config);

    let mut config = TelemetryConfig::load(&args.config)?;
    if let Some(port) = args.port {
        config.serial.port = port;
    }
    config.validate()?;

    tracing::info!(
        "Controller: {} @ {} baud, {} data bits",
        config.serial.port,
        config.serial.baud,
        config.serial.data_bits
    );
    tracing::info!("Poll interval: {} ms", config.poll_interval_ms);

    let dispatcher = SerialDispatcher::new(config.serial.clone());
    let collector = MachineDataCollector::new(dispatcher);
    let handle = worker::spawn(collector);

    let mut interval =
        tokio::time::interval(std::time::Duration::from_millis(config.poll_interval_ms));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        interval.tick().await;

        let snapshot = match handle.snapshot().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::error!("Telemetry worker unavailable: {}", e);
                break;
            }
        };

        match serde_json::to_string(&snapshot) {
            Ok(document) => tracing::info!("snapshot: {}", document),
            Err(e) => tracing::error!("Failed to serialize snapshot: {}", e),
        }
    }

    Ok(())
}
