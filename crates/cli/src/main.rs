use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::{fmt, EnvFilter};
use xbridge_gateway::{Gateway, GatewayConfig, Handle};

#[derive(Parser)]
#[command(name = "xbridge")]
#[command(about = "Query exchange market data through the xbridge gateway")]
#[command(version)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "warn")]
    log_level: String,

    /// Gateway config file (TOML)
    #[arg(long, env = "XBRIDGE_CONFIG")]
    config: Option<PathBuf>,

    /// Pretty-print JSON output
    #[arg(long)]
    pretty: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List supported exchanges
    Exchanges,

    /// Fetch all markets of an exchange
    Markets {
        /// Exchange id (e.g. "kraken", "binance")
        exchange: String,

        /// Exchange config as a JSON object, merged over the defaults
        #[arg(short, long, default_value = "{}")]
        params: String,
    },

    /// Fetch the currencies of an exchange
    Currencies {
        /// Exchange id
        exchange: String,

        /// Exchange config as a JSON object, merged over the defaults
        #[arg(short, long, default_value = "{}")]
        params: String,
    },

    /// Fetch a ticker
    Ticker {
        /// Exchange id
        exchange: String,

        /// Unified symbol (e.g. "BTC/USD")
        symbol: String,

        /// Exchange config as a JSON object, merged over the defaults
        #[arg(short, long, default_value = "{}")]
        params: String,
    },
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(cli.config.as_deref())?;
    let gateway = Gateway::new(config)?;

    let body = match cli.command {
        Commands::Exchanges => gateway.list_exchanges(),
        Commands::Markets { exchange, params } => {
            let handle = open(&gateway, &exchange, &params)?;
            gateway.fetch_markets(handle)
        }
        Commands::Currencies { exchange, params } => {
            let handle = open(&gateway, &exchange, &params)?;
            gateway.fetch_currencies(handle)
        }
        Commands::Ticker {
            exchange,
            symbol,
            params,
        } => {
            let handle = open(&gateway, &exchange, &params)?;
            gateway.fetch_ticker(handle, &symbol)
        }
    };

    let value: Value = serde_json::from_str(&body).context("Gateway returned invalid JSON")?;
    let text = if cli.pretty {
        serde_json::to_string_pretty(&value)?
    } else {
        body
    };

    if value.get("error").is_some() {
        eprintln!("{}", text);
        return Ok(ExitCode::FAILURE);
    }
    println!("{}", text);
    Ok(ExitCode::SUCCESS)
}

fn load_config(path: Option<&Path>) -> Result<GatewayConfig> {
    let Some(path) = path else {
        return Ok(GatewayConfig::default());
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let config = GatewayConfig::from_toml_str(&raw)?;
    tracing::debug!(path = %path.display(), ?config, "Loaded gateway config");
    Ok(config)
}

fn open(gateway: &Gateway, exchange: &str, params: &str) -> Result<Handle> {
    let handle = gateway
        .try_init_exchange(exchange, params)
        .with_context(|| format!("Cannot open {}", exchange))?;
    tracing::info!(exchange = %exchange, handle, "Session opened");
    Ok(handle)
}
