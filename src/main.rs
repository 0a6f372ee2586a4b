use anyhow::Result;
use clap::{Parser, Subcommand};
use kef_probe::app::{App, Probe};
use kef_probe::models::Config;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "kef-probe")]
#[command(about = "Probe a KEF speaker's HTTP API for album art and power control")]
struct CliArgs {
    /// Speaker IP or host name; overrides KEF_SPEAKER_IP.
    #[arg(long, value_name = "HOST")]
    speaker: Option<String>,

    #[command(subcommand)]
    command: ProbeCommand,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
enum ProbeCommand {
    /// Check album art format, headers, dimensions and resize support
    AlbumArt,
    /// Send standby over HTTP and verify the speaker parks
    Sleep,
    /// Send power-on over HTTP and verify the speaker wakes (start in standby)
    Wake,
}

impl From<ProbeCommand> for Probe {
    fn from(command: ProbeCommand) -> Self {
        match command {
            ProbeCommand::AlbumArt => Probe::AlbumArt,
            ProbeCommand::Sleep => Probe::Sleep,
            ProbeCommand::Wake => Probe::Wake,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "kef_probe=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = CliArgs::parse();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };
    let config = match args.speaker {
        Some(speaker) => config.with_speaker_ip(speaker),
        None => config,
    };

    let app = App::new(&config);
    let mut stdout = std::io::stdout();

    tokio::select! {
        result = app.run(args.command.into(), &mut stdout) => match result {
            Ok(_) => {
                info!("Probe completed");
                Ok(())
            }
            Err(e) => {
                error!("Probe failed: {}", e);
                std::process::exit(1);
            }
        },
        _ = tokio::signal::ctrl_c() => {
            println!("\n\nCancelled.");
            Ok(())
        }
    }
}
