//! Egress Proxy command line tool
//!
//! Usage: `egress-proxy [OPTIONS] <INTERFACE>`

use clap::Parser;
use log::{debug, error, info, warn};
use std::path::PathBuf;
use std::process::ExitCode;

use egress_proxy::common::{init_logger, ProxyError, Result};
use egress_proxy::config::{load_config, validate_config, CliOverrides, ProxyConfig};
use egress_proxy::interface::{routing_hints, AddressSelector, InterfaceSource, SystemInterfaces};
use egress_proxy::proxy::TunnelContext;
use egress_proxy::{Proxy, APP_NAME, VERSION};

/// Local HTTP CONNECT tunnel that dials out from a chosen interface's address
#[derive(Parser, Debug)]
#[clap(author, version = VERSION, about, long_about = None)]
struct Args {
    /// Network interface whose address outbound connections use
    interface: Option<String>,

    /// Listen address
    #[clap(short, long)]
    listen: Option<String>,

    /// Load configuration from a JSON file
    #[clap(long)]
    config_file: Option<PathBuf>,

    /// Log level
    #[clap(long)]
    log_level: Option<String>,

    /// Relay read chunk size in bytes
    #[clap(long)]
    buffer_size: Option<usize>,

    /// Chunks queued per tunnel before readers block
    #[clap(long)]
    queue_depth: Option<usize>,

    /// Outbound connect timeout in seconds
    #[clap(long)]
    connect_timeout: Option<u64>,

    /// Routing table name used in the printed routing commands
    #[clap(long)]
    route_table: Option<String>,

    /// Do not print routing commands at startup
    #[clap(long)]
    no_routes: bool,
}

impl Args {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            listen: self.listen.clone(),
            interface: self.interface.clone(),
            buffer_size: self.buffer_size,
            queue_depth: self.queue_depth,
            connect_timeout: self.connect_timeout,
            log_level: self.log_level.clone(),
            route_table: self.route_table.clone(),
            no_routes: self.no_routes,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // No-op when the configured logger is already installed
            init_logger("info");
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let config = load_config(args.config_file.as_deref())?
        .with_overrides(args.overrides())?;

    init_logger(&config.log_level);
    info!("Starting {} v{}", APP_NAME, VERSION);

    validate_config(&config)?;

    if let Some(file) = &config.config_file {
        info!("Configuration loaded from {}", file.display());
    }
    if let Ok(json) = serde_json::to_string(&config) {
        debug!("Effective configuration: {}", json);
    }

    let interface = config
        .interface
        .clone()
        .ok_or_else(|| ProxyError::Config("A network interface name is required".to_string()))?;

    let bind_address = AddressSelector::system().select(&interface)?;
    info!("Using source address {} from interface {}", bind_address, interface);

    if config.print_routes {
        print_routing_hints(&interface, &config);
    }

    let context = TunnelContext::new(bind_address, &config);
    let proxy = Proxy::new(config.listen, context);

    info!("Proxy service ready, press Ctrl+C to stop");

    tokio::select! {
        result = proxy.run() => result,
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
            Ok(())
        }
    }
}

fn print_routing_hints(interface: &str, config: &ProxyConfig) {
    match SystemInterfaces.addresses(interface) {
        Ok(Some(addrs)) => {
            for hint in routing_hints(interface, &config.route_table, &addrs) {
                println!("{}", hint);
            }
        }
        Ok(None) => warn!("Interface {} disappeared before routing hints could be printed", interface),
        Err(e) => warn!("Unable to list addresses for routing hints: {}", e),
    }
}
