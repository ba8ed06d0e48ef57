//! ChainMonitor CLI: inspect bytecode offline and read a monitor store.
//!
//! # Commands
//! ```text
//! chainmonitor selector      <signature>
//! chainmonitor slots
//! chainmonitor classify      --code <hex> | --file <path>
//! chainmonitor classify-dir  <dir>
//! chainmonitor detect-proxy  --caller <addr> --caller-code <hex> --target <addr>
//!                            [--target-code <hex>] [--slot-value <hex>]
//! chainmonitor query         --tx <hash> --kind created|suicided|proxy|transfers [--db <path>]
//! chainmonitor info
//! ```

use anyhow::{Context, Result};
use chainmonitor_core::MonitorConfig;
use chainmonitor_evm::{selector, selector_hex, trimmed_selector_hex, ProxyConvention};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

mod cmd_classify;
mod cmd_query;

#[derive(Parser)]
#[command(
    name = "chainmonitor",
    about = "Contract classification and proxy detection — ChainMonitor CLI",
    long_about = "
ChainMonitor CLI: fingerprint selectors, classify contract bytecode, detect
EIP-1967 / zeppelinos proxies and read the per-transaction monitor store.

ENVIRONMENT VARIABLES:
  CHAINMONITOR_DB_PATH   Monitor store path (overrides the config file)
  CHAINMONITOR_LOG       Log level / filter directives
",
    version
)]
struct Cli {
    /// YAML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the 4-byte selector of a function signature
    Selector {
        /// Canonical signature, e.g. "transfer(address,uint256)"
        signature: String,
    },

    /// Print the proxy storage slot constants
    Slots,

    /// Classify one contract's bytecode
    Classify {
        /// Bytecode as hex (0x optional)
        #[arg(long, conflicts_with = "file", required_unless_present = "file")]
        code: Option<String>,
        /// File holding bytecode (hex text or raw bytes)
        #[arg(long)]
        file: Option<PathBuf>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Classify every .bin / .hex file in a directory in parallel
    #[command(name = "classify-dir")]
    ClassifyDir {
        dir: PathBuf,
        /// Number of parallel Rayon threads (0 = use default)
        #[arg(long, default_value_t = 0)]
        threads: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check a delegate call for a proxy relationship
    #[command(name = "detect-proxy")]
    DetectProxy {
        #[arg(long)]
        caller: String,
        /// Caller (proxy) bytecode hex
        #[arg(long)]
        caller_code: String,
        #[arg(long)]
        target: String,
        /// Target (implementation) bytecode hex; empty if omitted
        #[arg(long, default_value = "")]
        target_code: String,
        /// Value stored at the caller's implementation slot
        #[arg(long)]
        slot_value: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Read records of one transaction from the monitor store
    Query {
        /// Store path (overrides config and CHAINMONITOR_DB_PATH)
        #[arg(long)]
        db: Option<PathBuf>,
        /// Transaction hash
        #[arg(long)]
        tx: String,
        #[arg(long, value_enum)]
        kind: RecordKind,
    },

    /// Show ChainMonitor build and capability info
    Info,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum RecordKind {
    Created,
    Suicided,
    Proxy,
    Transfers,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_ref(), cli.verbose)?;
    // a host may already have installed a subscriber
    let _ = chainmonitor_observability::init_tracing(&config.log);

    match cli.command {
        Commands::Selector { signature } => cmd_selector(&signature),
        Commands::Slots => cmd_slots(),
        Commands::Classify { code, file, json } => {
            cmd_classify::classify(code.as_deref(), file.as_deref(), json)
        }
        Commands::ClassifyDir { dir, threads, json } => {
            cmd_classify::classify_dir(&dir, threads, json)
        }
        Commands::DetectProxy {
            caller,
            caller_code,
            target,
            target_code,
            slot_value,
            json,
        } => cmd_classify::detect_proxy(
            &caller,
            &caller_code,
            &target,
            &target_code,
            slot_value.as_deref(),
            json,
        ),
        Commands::Query { db, tx, kind } => {
            let path = db.unwrap_or_else(|| config.db_path.clone());
            cmd_query::run(&path, &config, &tx, kind)
        }
        Commands::Info => cmd_info(&config),
    }
}

fn load_config(path: Option<&PathBuf>, verbose: bool) -> Result<MonitorConfig> {
    let config = match path {
        Some(p) => MonitorConfig::from_file(p)
            .with_context(|| format!("loading config {}", p.display()))?,
        None => MonitorConfig::default(),
    };
    let mut config = config.apply_env();
    if verbose {
        config.log.level = "debug".into();
    }
    Ok(config)
}

fn cmd_selector(signature: &str) -> Result<()> {
    println!("signature: {signature}");
    println!("raw:       {:?}", selector(signature));
    println!("hex:       0x{}", selector_hex(signature));
    println!("trimmed:   {}", trimmed_selector_hex(signature));
    Ok(())
}

fn cmd_slots() -> Result<()> {
    for convention in ProxyConvention::ALL {
        let slots = convention.slots();
        println!("{convention}");
        println!("  implementation: 0x{}", slots.implementation_hex());
        println!("  admin:          0x{}", slots.admin_hex());
    }
    Ok(())
}

fn cmd_info(config: &MonitorConfig) -> Result<()> {
    println!("ChainMonitor v{}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("Capabilities:");
    println!("  ✓ Token classification     (ERC-20, ERC-721, ERC-1155, WASM)");
    println!("  ✓ Capability flags         (ERC-721 metadata/enumerable, ERC-1155 metadata)");
    println!("  ✓ Proxy detection          (EIP-1967, zeppelinos)");
    println!("  ✓ Token metadata decode    (name, symbol, decimals, totalSupply)");
    println!("  ✓ Parallel classification  (Rayon)");
    println!("  ✓ Monitor store            (SQLite, WAL, repair on open)");
    println!();
    println!("Store:           {}", config.db_path.display());
    println!("Append strategy: {:?}", config.append_strategy);
    println!("Log level:       {}", config.log.level);
    Ok(())
}
