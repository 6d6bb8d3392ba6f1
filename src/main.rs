// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::{debug, info};
use zonekeeper::{
    config::SshConfig,
    constants::{DEFAULT_CONFIG_FILE, DEFAULT_RECORD_TTL_SECS, SSH_PORT, TOKIO_WORKER_THREADS},
    manager::ZoneManager,
    metrics,
    records::{Record, RecordType, TypeFilter},
};

/// Discover BIND9 zones and edit their records over SSH.
#[derive(Debug, Parser)]
#[command(name = "zonekeeper", version, about)]
struct Cli {
    /// Path of the discovery configuration document
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Print the Prometheus metrics of this run to stderr when it finishes
    #[arg(long, global = true)]
    print_metrics: bool,

    #[command(flatten)]
    ssh: SshArgs,

    #[command(subcommand)]
    command: Command,
}

/// Credentials of the remote nameserver.
#[derive(Debug, Args)]
struct SshArgs {
    /// Remote host name or address
    #[arg(long, global = true, env = "ZONEKEEPER_SSH_HOST")]
    host: Option<String>,

    /// Login user
    #[arg(long, global = true, env = "ZONEKEEPER_SSH_USER")]
    user: Option<String>,

    /// Login password
    #[arg(
        long,
        global = true,
        env = "ZONEKEEPER_SSH_PASSWORD",
        hide_env_values = true
    )]
    password: Option<String>,

    /// SSH port
    #[arg(long, global = true, env = "ZONEKEEPER_SSH_PORT", default_value_t = SSH_PORT)]
    port: u16,

    /// Directory holding zone files on the remote host
    #[arg(long, global = true, env = "ZONEKEEPER_ZONE_PATH")]
    zone_path: Option<String>,
}

impl SshArgs {
    /// Credentials when both a host and a user were given.
    fn to_ssh_config(&self) -> Option<SshConfig> {
        let (Some(host), Some(user)) = (&self.host, &self.user) else {
            return None;
        };
        let mut ssh = SshConfig::new(host, user, self.password.as_deref().unwrap_or_default());
        ssh.port = self.port;
        if let Some(path) = &self.zone_path {
            ssh.zone_files_path.clone_from(path);
        }
        Some(ssh)
    }
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List the zones hosted by the nameserver
    Zones,
    /// Rediscover zones and report which method found them
    Refresh,
    /// List the records of a zone
    Records {
        zone: String,
        /// all, direct, inverse, special or a single type mnemonic
        #[arg(long = "type", default_value = "all")]
        filter: TypeFilter,
    },
    /// Check whether a zone answers SOA queries
    Validate { zone: String },
    /// Summarize a zone: SOA, nameservers and record count
    ZoneInfo { zone: String },
    /// Add a record
    Add(RecordArgs),
    /// Replace the first record matching the original triple
    Update(UpdateArgs),
    /// Delete the first record matching the triple
    Delete(DeleteArgs),
    /// Log in and check access to the zone directory
    TestConnection,
    /// List the record types that can be written
    Types,
}

#[derive(Debug, Args)]
struct RecordArgs {
    zone: String,
    name: String,
    #[arg(value_name = "TYPE")]
    record_type: String,
    value: String,
    #[arg(long, default_value_t = DEFAULT_RECORD_TTL_SECS)]
    ttl: u32,
}

#[derive(Debug, Args)]
struct DeleteArgs {
    zone: String,
    name: String,
    #[arg(value_name = "TYPE")]
    record_type: RecordType,
    value: String,
}

#[derive(Debug, Args)]
struct UpdateArgs {
    zone: String,
    name: String,
    #[arg(value_name = "TYPE")]
    record_type: RecordType,
    /// Value of the record being replaced
    old_value: String,
    /// Value of the replacement record
    new_value: String,
    /// Owner name of the replacement, defaults to NAME
    #[arg(long)]
    new_name: Option<String>,
    /// Type of the replacement, defaults to TYPE
    #[arg(long)]
    new_type: Option<RecordType>,
    /// TTL of the replacement
    #[arg(long)]
    ttl: Option<u32>,
}

impl UpdateArgs {
    fn records(&self) -> (Record, Record) {
        let original = Record {
            name: self.name.clone(),
            record_type: self.record_type,
            value: self.old_value.clone(),
            ttl: None,
        };
        let updated = Record {
            name: self.new_name.clone().unwrap_or_else(|| self.name.clone()),
            record_type: self.new_type.unwrap_or(self.record_type),
            value: self.new_value.clone(),
            ttl: self.ttl,
        };
        (original, updated)
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(TOKIO_WORKER_THREADS)
        .thread_name("zonekeeper")
        .enable_all()
        .build()
        .context("Failed to build the tokio runtime")?;

    runtime.block_on(async_main(cli))
}

/// Logs go to stderr so stdout carries only the JSON result.
///
/// Respects `RUST_LOG` (default `info`) and `RUST_LOG_FORMAT` (`text` or `json`).
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let log_format = std::env::var("RUST_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    match log_format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .json()
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .with_ansi(true)
                .compact()
                .init();
        }
    }
}

async fn async_main(cli: Cli) -> Result<ExitCode> {
    init_tracing();
    debug!("Using configuration file {}", cli.config.display());

    let manager = ZoneManager::system(&cli.config);
    let ssh = cli.ssh.to_ssh_config();
    if let Some(ssh) = &ssh {
        manager.update_ssh_config(ssh.clone()).await;
    }

    let success = match &cli.command {
        Command::Zones => print_json(&manager.list_zones().await)?,
        Command::Refresh => print_json(&manager.refresh_zones().await)?,
        Command::Records { zone, filter } => {
            print_json(&manager.get_records(zone, *filter).await)?
        }
        Command::Validate { zone } => {
            let valid = manager.validate_zone(zone).await;
            print_json(&serde_json::json!({ "zone": zone, "valid": valid }))?;
            valid
        }
        Command::ZoneInfo { zone } => print_json(&manager.zone_info(zone).await)?,
        Command::Add(args) => {
            let result = manager
                .add_record(
                    &args.zone,
                    &args.name,
                    &args.record_type,
                    &args.value,
                    args.ttl,
                )
                .await;
            print_json(&result)?;
            result.success
        }
        Command::Update(args) => {
            let (original, updated) = args.records();
            let result = manager
                .update_record(&args.zone, &original, &updated)
                .await;
            print_json(&result)?;
            result.success
        }
        Command::Delete(args) => {
            let result = manager
                .delete_record(
                    &args.zone,
                    &args.name,
                    args.record_type.as_str(),
                    &args.value,
                )
                .await;
            print_json(&result)?;
            result.success
        }
        Command::TestConnection => {
            let ssh = ssh.context("test-connection needs --host and --user")?;
            let result = manager.test_connection(&ssh).await;
            print_json(&result)?;
            result.success
        }
        Command::Types => print_json(&manager.supported_record_types())?,
    };

    info!("Command finished (success: {success})");
    if cli.print_metrics {
        eprint!("{}", metrics::gather_metrics().context("Failed to gather metrics")?);
    }
    Ok(if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Print `value` as pretty JSON on stdout.
fn print_json<T: Serialize>(value: &T) -> Result<bool> {
    let text = serde_json::to_string_pretty(value).context("Failed to serialize the result")?;
    println!("{text}");
    Ok(true)
}
