//! awusb client CLI
//!
//! Lists, attaches, and detaches USB devices that live on remote USB/IP
//! servers. Device selection across multiple servers (scan, merge, filter,
//! disambiguate) is the library's job; this binary only parses arguments,
//! wires the pipeline together, and maps failures to distinct exit codes.

use awusb::{
    Action, DeviceFilter, Inventory, ResolveError, ScanReport, ServerPool, coordinator, resolve,
};
use awusb_common::{Config, Error, ServerSpec, setup_logging};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "awusb")]
#[command(author, version, about = "Attach USB devices from remote USB/IP servers")]
#[command(long_about = "
Enumerate and claim USB devices that physically live on one or more remote
servers, exposing them locally through the kernel usbip facility.

EXAMPLES:
    # List devices across all configured servers
    awusb list

    # Attach a device by serial number, wherever it is
    awusb attach --serial ABC123

    # Attach the first matching webcam when several servers have one
    awusb attach --desc webcam --first

    # Detach a device on a specific server
    awusb detach --bus 1-2.1 --host pi-lab

CONFIGURATION:
    The client looks for configuration files in the following order:
    1. Path specified with --config
    2. ~/.config/awusb/config.toml
    3. /etc/awusb/config.toml
    4. Built-in defaults
")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'L', long, value_name = "LEVEL", global = true)]
    log_level: Option<String>,

    /// Save default configuration to the default location and exit
    #[arg(long)]
    save_config: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List available devices, grouped by server
    List {
        /// Query a single server instead of the configured list
        #[arg(short = 'H', long, value_name = "HOST[:PORT]")]
        host: Option<String>,
    },
    /// Attach a device matching the given filter
    Attach(TargetArgs),
    /// Detach a device matching the given filter
    Detach(TargetArgs),
}

/// Device filter and targeting flags shared by attach and detach
#[derive(Args, Debug)]
struct TargetArgs {
    /// Device id, hex vid:pid (e.g. 0bda:5400)
    #[arg(short = 'd', long, value_name = "VID:PID")]
    id: Option<String>,

    /// Device serial number (exact, case-sensitive)
    #[arg(short = 's', long)]
    serial: Option<String>,

    /// Device bus id on the server (e.g. 1-2.3)
    #[arg(short = 'b', long, value_name = "BUS_ID")]
    bus: Option<String>,

    /// Device description substring (case-insensitive)
    #[arg(long, value_name = "SUBSTRING")]
    desc: Option<String>,

    /// Restrict to a single server instead of the configured list
    #[arg(short = 'H', long, value_name = "HOST[:PORT]")]
    host: Option<String>,

    /// Pick the first match when multiple devices qualify
    #[arg(short = 'f', long)]
    first: bool,
}

/// Exit codes, one per failure kind so scripts can tell them apart
mod exit {
    pub const INTERNAL: u8 = 1;
    pub const CONFIG: u8 = 2;
    pub const NO_MATCH: u8 = 3;
    pub const AMBIGUOUS: u8 = 4;
    pub const ALL_UNREACHABLE: u8 = 5;
}

enum CliError {
    Common(Error),
    Resolve(ResolveError),
    AllServersFailed { warnings: Vec<String> },
}

impl CliError {
    fn exit_code(&self) -> u8 {
        match self {
            CliError::Common(Error::Config(_)) => exit::CONFIG,
            CliError::Common(_) => exit::INTERNAL,
            CliError::Resolve(ResolveError::NoMatch { .. }) => exit::NO_MATCH,
            CliError::Resolve(_) => exit::AMBIGUOUS,
            CliError::AllServersFailed { .. } => exit::ALL_UNREACHABLE,
        }
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Common(e) => write!(f, "{}", e),
            CliError::Resolve(e) => write!(f, "{}", e),
            CliError::AllServersFailed { warnings } => {
                writeln!(f, "No configured server responded:")?;
                for warning in warnings {
                    writeln!(f, "  {}", warning)?;
                }
                Ok(())
            }
        }
    }
}

impl From<Error> for CliError {
    fn from(e: Error) -> Self {
        CliError::Common(e)
    }
}

impl From<ResolveError> for CliError {
    fn from(e: ResolveError) -> Self {
        CliError::Resolve(e)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    if cli.save_config {
        let config = Config::default();
        let path = Config::default_path();
        config.save(&path)?;
        println!("Configuration saved to: {}", path.display());
        return Ok(());
    }

    let config = match cli.config {
        Some(ref path) => Config::load(Some(path.clone()))?,
        None => Config::load_or_default(),
    };

    let log_level = cli.log_level.as_deref().unwrap_or(&config.log_level);
    setup_logging(log_level)?;

    let Some(command) = cli.command else {
        return Err(Error::Config(
            "no command given; try `awusb list`, `awusb attach`, or `awusb detach`".to_string(),
        )
        .into());
    };

    match command {
        Commands::List { host } => {
            let pool = build_pool(&config, host.as_deref())?;
            let report = pool.scan().await;
            print_report(&report);

            if report.all_failed() {
                return Err(CliError::AllServersFailed {
                    warnings: report.warnings(),
                });
            }
            Ok(())
        }
        Commands::Attach(target) => act(Action::Attach, &config, target).await,
        Commands::Detach(target) => act(Action::Detach, &config, target).await,
    }
}

/// Shared attach/detach path: scan, filter, resolve, execute
async fn act(action: Action, config: &Config, target: TargetArgs) -> Result<(), CliError> {
    let filter = DeviceFilter::from_args(
        target.id.as_deref(),
        target.serial.as_deref(),
        target.bus.as_deref(),
        target.desc.as_deref(),
    )?;
    if filter.is_empty() {
        return Err(Error::Config(
            "no filter given; specify at least one of --id, --serial, --bus, --desc".to_string(),
        )
        .into());
    }

    let pool = build_pool(config, target.host.as_deref())?;
    let report = pool.scan().await;

    let inventory = Inventory::aggregate(&report);
    let matches = inventory.matching(&filter);
    info!(
        "Filter [{}] matched {} of {} devices across {} reachable servers",
        filter,
        matches.len(),
        inventory.len(),
        report.reachable_servers().len()
    );

    let reachable: Vec<String> = report
        .reachable_servers()
        .iter()
        .map(|s| s.to_string())
        .collect();
    let entry = resolve(&matches, &filter.to_string(), &reachable, target.first)?;

    let outcome = coordinator::execute(action, entry, pool.timeout()).await?;
    match action {
        Action::Attach => {
            println!("Attached device on {}:", outcome.entry.server);
            println!("  {}", outcome.device);
            if !outcome.local_devices.is_empty() {
                println!("  local devices: {}", outcome.local_devices.join(", "));
            }
        }
        Action::Detach => {
            println!("Detached device on {}:", outcome.entry.server);
            println!("  {}", outcome.device);
        }
    }
    Ok(())
}

/// Build the scan pool from `--host` or the configured server list
fn build_pool(config: &Config, host: Option<&str>) -> Result<ServerPool, Error> {
    let servers = match host {
        Some(host) => vec![ServerSpec::parse(host)?],
        None => config.servers.clone(),
    };
    ServerPool::new(servers, config.timeout)
}

/// Print the scan report grouped by server, the way the config orders them
fn print_report(report: &ScanReport) {
    for (server, result) in report.results() {
        println!("=== {} ===", server);
        match result {
            Ok(devices) if devices.is_empty() => println!("No devices"),
            Ok(devices) => {
                for device in devices {
                    println!("{}", device);
                }
            }
            Err(e) => println!("Unavailable: {}", e),
        }
        println!();
    }
}
