use anyhow::{anyhow, Result};
use clap::{Arg, ArgMatches, Command};
use registry_bindings::bind::{CallOpts, TransactOpts};
use registry_bindings::commands::{CommandContext, EVENTS};
use registry_bindings::config::Config;
use registry_bindings::ethereum::provider::{signer_from_env, ProviderManager};
use registry_bindings::ethereum::utils::{validate_address, validate_network};
use registry_bindings::registry::Registry;
use serde_json::{json, Value};
use tracing::{error, info};

fn cli() -> Command {
    Command::new("registry-cli")
        .version("0.1.0")
        .about("Read, write and watch a deployed Registry contract")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .global(true)
                .help("Path to configuration file"),
        )
        .arg(
            Arg::new("network")
                .short('n')
                .long("network")
                .value_name("NETWORK")
                .global(true)
                .help("Network to use (ethereum, sepolia, local)"),
        )
        .arg(
            Arg::new("rpc-url")
                .short('r')
                .long("rpc-url")
                .value_name("URL")
                .global(true)
                .help("RPC endpoint URL"),
        )
        .arg(
            Arg::new("address")
                .short('a')
                .long("address")
                .value_name("ADDRESS")
                .global(true)
                .help("Registry contract address, overriding the network's registry_address"),
        )
        .arg(
            Arg::new("allow-writes")
                .long("allow-writes")
                .global(true)
                .help("Allow write operations (transactions)")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("generate-config")
                .long("generate-config")
                .help("Generate a sample configuration file and exit")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("config-path")
                .long("config-path")
                .help("Print the default configuration file path and exit")
                .action(clap::ArgAction::SetTrue),
        )
        .subcommand(Command::new("status").about("Show network and contract state"))
        .subcommand(
            Command::new("entry")
                .about("Read the entry stored under a key")
                .arg(Arg::new("key").required(true).help("0x-prefixed bytes32 or short label")),
        )
        .subcommand(
            Command::new("call")
                .about("Call a view method by name")
                .arg(Arg::new("method").required(true))
                .arg(Arg::new("params").help("JSON array or object of parameters")),
        )
        .subcommand(
            Command::new("events")
                .about("List historical events")
                .arg(
                    Arg::new("from")
                        .long("from")
                        .value_name("BLOCK")
                        .default_value("0")
                        .value_parser(clap::value_parser!(u64)),
                )
                .arg(
                    Arg::new("to")
                        .long("to")
                        .value_name("BLOCK")
                        .value_parser(clap::value_parser!(u64)),
                )
                .arg(
                    Arg::new("event")
                        .long("event")
                        .value_name("NAME")
                        .value_parser(EVENTS),
                ),
        )
        .subcommand(
            Command::new("watch")
                .about("Stream new events until interrupted")
                .arg(
                    Arg::new("event")
                        .long("event")
                        .value_name("NAME")
                        .value_parser(EVENTS),
                ),
        )
        .subcommand(
            Command::new("initialize")
                .about("Initialize the registry with its first owner")
                .arg(Arg::new("owner").required(true)),
        )
        .subcommand(
            Command::new("set-entry")
                .about("Point a key at a target address")
                .arg(Arg::new("key").required(true))
                .arg(Arg::new("target").required(true)),
        )
        .subcommand(
            Command::new("remove-entry")
                .about("Remove the entry under a key")
                .arg(Arg::new("key").required(true)),
        )
        .subcommand(
            Command::new("transfer-ownership")
                .about("Hand the registry to a new owner")
                .arg(Arg::new("new-owner").required(true)),
        )
}

fn arg<'a>(matches: &'a ArgMatches, name: &str) -> Result<&'a str> {
    matches
        .get_one::<String>(name)
        .map(|s| s.as_str())
        .ok_or_else(|| anyhow!("Missing argument '{}'", name))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout stays machine-readable JSON
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let matches = cli().get_matches();

    // Handle special commands first
    if matches.get_flag("generate-config") {
        println!("{}", Config::generate_sample());
        return Ok(());
    }

    if matches.get_flag("config-path") {
        match Config::default_config_path() {
            Ok(path) => {
                println!("{}", path.display());
                return Ok(());
            }
            Err(e) => {
                error!("Could not determine default config path: {}", e);
                return Err(e);
            }
        }
    }

    let Some((command, sub_matches)) = matches.subcommand() else {
        cli().print_help()?;
        return Ok(());
    };

    // Load configuration
    let config_path = match matches.get_one::<String>("config") {
        Some(path) => Some(std::path::PathBuf::from(path)),
        None => Config::default_config_path().ok().filter(|path| path.exists()),
    };
    let mut config = Config::load_or_default(config_path).await;

    // Override with command line arguments
    if let Some(network) = matches.get_one::<String>("network") {
        config.default_network = network.clone();
    }

    if let Some(rpc_url) = matches.get_one::<String>("rpc-url") {
        if let Some(network_config) = config.networks.get_mut(&config.default_network) {
            network_config.rpc_url = rpc_url.clone();
        }
    }

    if matches.get_flag("allow-writes") {
        config.security.allow_write_operations = true;
    }

    let manager = ProviderManager::new(config.clone(), signer_from_env()?)?;
    validate_network(&config.default_network, &manager.get_available_networks())?;

    info!("Network: {}", config.default_network);
    info!(
        "Write operations allowed: {}",
        config.security.allow_write_operations
    );

    let address = match matches.get_one::<String>("address") {
        Some(address) => validate_address(address)?,
        None => config.network(None)?.registry_address.ok_or_else(|| {
            anyhow!(
                "No registry address for network '{}'. Pass --address or set registry_address in the config",
                config.default_network
            )
        })?,
    };

    let backend = manager.get_backend(None)?;
    let registry = Registry::new(address, backend.clone())?;
    let session = registry.session(
        CallOpts::default(),
        TransactOpts {
            from: backend.signer_address(),
            ..Default::default()
        },
    );
    let ctx = CommandContext::new(
        session,
        config.security.allow_write_operations,
        config.watch.channel_capacity,
    );

    let output: Value = match command {
        "status" => {
            let block_number = manager.validate_network_connection(None).await?;
            let chain_id = backend.chain_id().await?;
            let network_config = manager.get_network_config(None)?;
            json!({
                "network": config.default_network,
                "chain_id": chain_id,
                "block_number": block_number,
                "explorer_url": network_config.explorer_url,
                "registry": ctx.status().await?,
            })
        }
        "entry" => ctx.entry(arg(sub_matches, "key")?).await?,
        "call" => {
            let params = sub_matches.get_one::<String>("params").map(|s| s.as_str());
            ctx.call(arg(sub_matches, "method")?, params).await?
        }
        "events" => {
            let from = sub_matches.get_one::<u64>("from").copied().unwrap_or_default();
            let to = sub_matches.get_one::<u64>("to").copied();
            let event = sub_matches.get_one::<String>("event").map(|s| s.as_str());
            ctx.events(from, to, event).await?
        }
        "watch" => {
            let event = sub_matches.get_one::<String>("event").map(|s| s.as_str());
            ctx.watch(
                event,
                |record| match serde_json::to_string(&record) {
                    Ok(line) => println!("{}", line),
                    Err(e) => error!("Failed to render event: {}", e),
                },
                async {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        error!("Failed to listen for Ctrl-C: {}", e);
                    }
                },
            )
            .await?;
            return Ok(());
        }
        "initialize" => ctx.initialize(arg(sub_matches, "owner")?).await?,
        "set-entry" => {
            ctx.set_entry(arg(sub_matches, "key")?, arg(sub_matches, "target")?)
                .await?
        }
        "remove-entry" => ctx.remove_entry(arg(sub_matches, "key")?).await?,
        "transfer-ownership" => {
            ctx.transfer_ownership(arg(sub_matches, "new-owner")?)
                .await?
        }
        other => return Err(anyhow!("Unknown command '{}'", other)),
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
