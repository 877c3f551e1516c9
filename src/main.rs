// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Dynamic DNS update server
//!
//! A small HTTP server that lets one client (typically a home router) report
//! its current addresses:
//! - Authenticates the client with a username and an Argon2id-hashed password
//! - Validates the reported IPv4/IPv6 addresses
//! - Rewrites a zone file fragment for inclusion by the DNS server
//!
//! Subcommands also validate the configuration file and generate new
//! credentials.

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::fmt::writer::BoxMakeWriter;

use dynzone::{
    auth::{generate_credential, GenerateOptions},
    config::{Config, LogConfig, DEFAULT_CONFIG_PATH},
    metrics, server,
    types::AppState,
};

#[derive(Parser)]
#[command(
    name = "dynzone",
    version,
    about = "Dynamic DNS update endpoint writing a zone file fragment"
)]
struct Cli {
    /// Configuration file
    #[arg(
        long,
        short = 'c',
        env = "DYNZONE_CONFIG",
        default_value = DEFAULT_CONFIG_PATH,
        global = true
    )]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the update server (default)
    Serve,

    /// Validate the configuration file
    #[command(alias = "validateConfig")]
    ValidateConfig,

    /// Generate a random password and print the matching configuration
    #[command(visible_aliases = ["genpasswd", "gen"], alias = "generatePassword")]
    GeneratePassword(GenerateArgs),
}

#[derive(Args)]
struct GenerateArgs {
    /// Byte size of the generated salt
    #[arg(long, short = 's', default_value_t = 16)]
    salt: u16,

    /// Byte size of the generated password
    #[arg(long, short = 'p', default_value_t = 32)]
    password: u16,

    /// Argon2id time parameter
    #[arg(long, default_value_t = 1)]
    time: u32,

    /// Argon2id memory parameter in KiB
    #[arg(long, short = 'm', default_value_t = 64 * 1024)]
    memory: u32,

    /// Argon2id threads parameter
    #[arg(long, default_value_t = 4)]
    threads: u8,

    /// Argon2id key length parameter
    #[arg(long = "key-length", default_value_t = 32)]
    key_length: u32,
}

impl From<&GenerateArgs> for GenerateOptions {
    fn from(args: &GenerateArgs) -> Self {
        Self {
            salt_len: usize::from(args.salt),
            password_len: usize::from(args.password),
            time: args.time,
            memory: args.memory,
            threads: args.threads,
            key_len: args.key_length,
        }
    }
}

/// Install the tracing subscriber described by the `log` config section
///
/// `RUST_LOG` overrides the configured level.
fn init_tracing(log: &LogConfig) -> anyhow::Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(&log.level))
        .with_context(|| format!("invalid log level: {}", log.level))?;

    let writer = match &log.file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("cannot open log file {}", path.display()))?;
            BoxMakeWriter::new(std::sync::Mutex::new(file))
        }
        None => BoxMakeWriter::new(std::io::stdout),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(writer)
        .with_ansi(log.file.is_none());

    if log.json {
        builder.json().init();
    } else {
        builder.compact().init();
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("cannot listen for ctrl-c: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("cannot listen for SIGTERM: {}", e);
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

    info!("shutdown signal received");
}

async fn serve(config_path: &Path) -> anyhow::Result<()> {
    let config = Config::load(config_path)?;

    init_tracing(&config.log)?;

    info!("starting dynzone v{}", env!("CARGO_PKG_VERSION"));

    metrics::init_metrics();

    info!("config file: {}", config_path.display());
    info!("zone file: {}", config.updater.filename.display());
    info!(
        "managed record: {}.{}. ttl {}",
        config.updater.domain_subpart, config.updater.hostname_placeholder, config.updater.ttl
    );

    let state =
        AppState::from_config(&config.updater).context("invalid password configuration")?;

    let app = server::router(state, config.log.access_log);

    let addr = config.listen_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("cannot listen on {}", addr))?;

    info!("dynzone listening on {}", addr);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    Ok(())
}

fn validate_config(config_path: &Path) -> anyhow::Result<()> {
    let config = Config::load(config_path)?;
    println!("{}", config);
    println!("configuration is valid");
    Ok(())
}

fn generate_password(args: &GenerateArgs) -> anyhow::Result<()> {
    let generated = generate_credential(&GenerateOptions::from(args))
        .context("cannot generate credential")?;

    println!("{}", generated.to_config_yaml()?);
    println!("{}", generated.encoded_password());
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(&cli.config).await,
        Command::ValidateConfig => validate_config(&cli.config),
        Command::GeneratePassword(args) => generate_password(&args),
    }
}
