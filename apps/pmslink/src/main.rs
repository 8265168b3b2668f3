//! pmslink - headless command-line client.
//!
//! Finds media servers on the LAN, reports how each one is reached, keeps
//! this client registered, and resolves library items into player-ready
//! locations printed as JSON.

mod config;

use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use pmslink_core::{
    bootstrap_services, BootstrappedServices, Chooser, DiscoveryOrigin, LocalFileSystem,
    PlaybackRequest, PmsError, ServerRecord,
};
use serde::Serialize;
use tokio::signal;

use crate::config::ClientConfig;

/// pmslink - media server discovery and playback resolution client.
#[derive(Parser, Debug)]
#[command(name = "pmslink")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file (YAML).
    #[arg(short, long, value_name = "FILE", env = "PMSLINK_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(short, long, default_value = "info", env = "PMSLINK_LOG_LEVEL")]
    log_level: log::LevelFilter,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one discovery round and list the servers that answered.
    Discover {
        /// Also probe every server and pick its best address.
        #[arg(long)]
        probe: bool,
    },

    /// Probe a server by address and report the selected connection.
    Probe {
        /// `host` or `host:port`.
        address: String,
    },

    /// Advertise this client until interrupted.
    Register,

    /// Resolve a library item into a playable location.
    Play {
        /// Library item id (rating key).
        media_id: String,

        /// Server id or `host[:port]`. Defaults to the first discovered server.
        #[arg(short, long)]
        server: Option<String>,

        /// Request transcoding.
        #[arg(long)]
        transcode: bool,

        /// Transcode profile index.
        #[arg(long, default_value_t = 0)]
        profile: usize,

        /// Resume position in milliseconds, replacing the stored one.
        #[arg(long)]
        resume_ms: Option<i64>,

        /// Include presentation metadata in the output.
        #[arg(long)]
        metadata: bool,
    },
}

/// Prompts on stderr and reads the answer from stdin.
struct StdinChooser;

impl Chooser for StdinChooser {
    fn select_one(&self, prompt: &str, options: &[String]) -> Option<usize> {
        let mut stderr = std::io::stderr();
        let _ = writeln!(stderr, "{}:", prompt);
        for (idx, option) in options.iter().enumerate() {
            let _ = writeln!(stderr, "  [{}] {}", idx + 1, option);
        }
        let _ = write!(stderr, "> ");
        let _ = stderr.flush();

        let mut line = String::new();
        std::io::stdin().lock().read_line(&mut line).ok()?;
        let choice: usize = line.trim().parse().ok()?;
        choice.checked_sub(1).filter(|idx| *idx < options.len())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    env_logger::Builder::new()
        .filter_level(args.log_level)
        .format_timestamp_millis()
        .init();

    log::info!("pmslink v{}", env!("CARGO_PKG_VERSION"));

    let config =
        ClientConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    let services = bootstrap_services(config.to_bootstrap_config())
        .context("Failed to bootstrap services")?;

    log::debug!(
        "Configuration: client_id={}, stream_policy={:?}",
        services.arbiter.identity().client_id,
        services.arbiter.settings().stream_policy
    );

    let outcome = match args.command {
        Command::Discover { probe } => discover(&services, &config, probe).await,
        Command::Probe { address } => probe(&services, &config, &address).await,
        Command::Register => register(&services).await,
        Command::Play {
            media_id,
            server,
            transcode,
            profile,
            resume_ms,
            metadata,
        } => {
            let request = PlaybackRequest {
                transcode,
                transcode_profile: profile,
                force_resume_ms: resume_ms,
                include_full_metadata: metadata,
            };
            play(&services, &config, server.as_deref(), &media_id, &request).await
        }
    };

    services.shutdown().await;
    outcome
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}

fn looks_like_address(value: &str) -> bool {
    value.contains(':') || value.contains('.')
}

/// Applies the configured token to a record before it is used.
fn with_token(mut record: ServerRecord, config: &ClientConfig) -> ServerRecord {
    if record.token.is_none() {
        record.token = config.token.clone();
    }
    record
}

async fn discover(services: &BootstrappedServices, config: &ClientConfig, probe: bool) -> Result<()> {
    let found = services.gdm_service.refresh().await;
    log::info!("Discovery found {} server(s)", found);

    if probe {
        for record in services.registry.list() {
            let mut record = with_token(record, config);
            services.arbiter.resolve_best_address(&mut record, None).await;
            services.registry.store(record);
        }
    }

    print_json(&services.registry.summaries())
}

async fn probe(services: &BootstrappedServices, config: &ClientConfig, address: &str) -> Result<()> {
    let record = ServerRecord::new("", "", DiscoveryOrigin::UserEntered, address);
    let mut record = with_token(record, config);

    let outcome = services
        .arbiter
        .resolve_best_address(&mut record, Some(address))
        .await;
    if outcome.is_online() && !services.arbiter.refresh(&mut record).await {
        log::warn!("Server at {} did not return its root document", address);
    }

    #[derive(Serialize)]
    struct ProbeReport<'a> {
        server: pmslink_core::ServerSummary,
        probes: &'a pmslink_core::ArbitrationOutcome,
    }
    print_json(&ProbeReport {
        server: record.summary(),
        probes: &outcome,
    })
}

async fn register(services: &BootstrappedServices) -> Result<()> {
    services.gdm_service.start();
    log::info!("Registration running, press Ctrl+C to stop");

    shutdown_signal().await;

    if services.beacon.is_registration_disabled() {
        bail!("Registration socket could not be bound");
    }
    log::info!(
        "Listed by first server: {}",
        services.beacon.check_registration().await
    );
    Ok(())
}

/// Finds the record for `server`, arbitrating its address.
async fn locate_server(
    services: &BootstrappedServices,
    config: &ClientConfig,
    server: Option<&str>,
) -> Result<ServerRecord> {
    if let Some(address) = server.filter(|s| looks_like_address(s)) {
        let record = ServerRecord::new("", "", DiscoveryOrigin::UserEntered, address);
        let mut record = with_token(record, config);
        let outcome = services
            .arbiter
            .resolve_best_address(&mut record, Some(address))
            .await;
        if !outcome.is_online() {
            return Err(PmsError::ServerOffline(address.to_string()).into());
        }
        services.arbiter.refresh(&mut record).await;
        return Ok(record);
    }

    services.gdm_service.refresh().await;
    let record = match server {
        Some(uuid) => services.registry.get(uuid),
        None => services.registry.first(),
    }
    .ok_or_else(|| PmsError::ServerNotFound(server.unwrap_or("<any>").to_string()))?;

    let mut record = with_token(record, config);
    let outcome = services.arbiter.resolve_best_address(&mut record, None).await;
    services.registry.store(record.clone());
    if !outcome.is_online() {
        return Err(PmsError::ServerOffline(record.name).into());
    }
    Ok(record)
}

async fn play(
    services: &BootstrappedServices,
    config: &ClientConfig,
    server: Option<&str>,
    media_id: &str,
    request: &PlaybackRequest,
) -> Result<()> {
    let mut record = locate_server(services, config, server).await?;
    let resolver =
        services.playback_resolver(Arc::new(StdinChooser), Arc::new(LocalFileSystem));

    match resolver
        .play_library_media(&mut record, media_id, request)
        .await
    {
        Ok(descriptor) => print_json(&descriptor),
        Err(e) if e.is_silent() => {
            log::info!("Nothing to play: {}", e);
            Ok(())
        }
        Err(e) => Err(PmsError::from(e)).context(format!("Failed to resolve {}", media_id)),
    }
}

/// Waits for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            log::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                log::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
