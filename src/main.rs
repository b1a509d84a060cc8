use ams2tibber::{config::DEFAULT_CONFIG_PATH, mqtt::MqttBridge, Bridge, Config};
use clap::Parser;
use log::{error, info};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "ams2tibber")]
#[command(about = "AMS reader MQTT monitor to Kamstrup + Tibber Pulse HDLC bridge")]
struct Cli {
    /// Config file
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: String,
    /// Debug output
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let default_filter = match cli.debug {
        true => "debug".to_string(),
        false => std::env::var("AMS2TIBBER_LOG_LEVEL").unwrap_or("info".to_string()),
    };
    env_logger::init_from_env(env_logger::Env::new().default_filter_or(default_filter));

    info!("Starting");
    let config = match Config::load(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let bridge = Bridge::new(&config);
    let mut mqtt = MqttBridge::new(&config.mqtt, bridge);

    tokio::select! {
        _ = mqtt.start_thread() => {
            error!("Bridge stopped");
            return ExitCode::FAILURE;
        },
        sig = shutdown_signal() => {
            info!("Caught signal {sig}, exiting");
        }
    }

    let stats = mqtt.stats();
    info!("Received {} messages, published {}, {} duplicates, {} failed",
          stats.received, stats.published, stats.duplicates, stats.failed);
    ExitCode::SUCCESS
}

#[cfg(unix)]
async fn shutdown_signal() -> &'static str {
    use tokio::signal::unix::{signal, SignalKind};

    let mut term = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            error!("Unable to install SIGTERM handler: {e}");
            let _ = tokio::signal::ctrl_c().await;
            return "SIGINT";
        }
    };

    tokio::select! {
        _ = term.recv() => "SIGTERM",
        _ = tokio::signal::ctrl_c() => "SIGINT",
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() -> &'static str {
    let _ = tokio::signal::ctrl_c().await;
    "ctrl-c"
}
