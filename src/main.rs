//! CLI entry point for the SSM lookuper.
//!
//! Resolves single keys from AWS SSM Parameter Store, with decryption, and
//! reports whether each key exists.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ssm_lookuper::output::{LookupRecord, render_json, render_plain};
use ssm_lookuper::{CallContext, Lookuper, SsmLookuper, StoreConfig};
use std::ffi::OsStr;
use std::path::Path;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{debug, info};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

#[derive(Parser)]
#[command(name = "ssm_lookuper")]
#[command(about = "Look up single values in AWS SSM Parameter Store", long_about = None)]
struct Cli {
    /// JSON file with store overrides (region, profile, endpoint_url, timeout_secs)
    #[arg(long, env = "SSM_LOOKUPER_CONFIG", global = true)]
    config: Option<String>,

    /// AWS region to query
    #[arg(long, global = true)]
    region: Option<String>,

    /// Named AWS profile to load credentials from
    #[arg(long, global = true)]
    profile: Option<String>,

    /// Custom endpoint, e.g. a local SSM emulator
    #[arg(long, global = true)]
    endpoint_url: Option<String>,

    /// Deadline for each lookup, in seconds
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the value of a parameter; exits 1 when it does not exist
    Get {
        /// Parameter name, e.g. /app/prod/db/password
        #[arg(value_name = "KEY")]
        key: String,

        /// Print a JSON record instead of the bare value
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Print whether a parameter has a value; exits 1 when it does not
    Exists {
        #[arg(value_name = "KEY")]
        key: String,
    },
}

impl Cli {
    fn store_config(&self) -> Result<StoreConfig> {
        let flags = StoreConfig {
            region: self.region.clone(),
            profile: self.profile.clone(),
            endpoint_url: self.endpoint_url.clone(),
            timeout_secs: self.timeout_secs,
        };
        StoreConfig::layered(self.config.as_deref(), StoreConfig::from_env()?, flags)
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/ssm_lookuper.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("ssm_lookuper.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    let config = cli.store_config()?;
    let mut ctx = CallContext::background();
    if let Some(secs) = config.timeout_secs {
        ctx = ctx.with_timeout(Duration::from_secs(secs));
    }
    debug!(?config, "Store configuration");

    let lookuper = SsmLookuper::from_config(ctx, &config)
        .await
        .context("failed to start lookuper")?;

    match cli.command {
        Commands::Get { key, json } => {
            let record = LookupRecord::new(&key, lookuper.lookup(&key).await);
            info!(key = %record.key, found = record.found, "Lookup finished");

            if json {
                println!("{}", render_json(&record)?);
            } else if record.found {
                println!("{}", render_plain(&record));
            }
            Ok(exit_code(record.found))
        }
        Commands::Exists { key } => {
            let (_, found) = lookuper.lookup(&key).await;
            info!(key = %key, found, "Lookup finished");

            println!("{found}");
            Ok(exit_code(found))
        }
    }
}

fn exit_code(found: bool) -> ExitCode {
    if found {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
