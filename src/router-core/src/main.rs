mod commands;
mod config;
mod executor;
mod firewall;
mod interface_ops;
mod multiwan;
mod policy_routing;
mod qos_apply;
mod stores;
mod web;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use log::LevelFilter;
use simple_logger::SimpleLogger;

#[derive(Parser, Debug)]
#[command(name = "softrouter-agent", version = softrouter_lib::full_version!())]
struct Cli {
    /// Raise logging to debug.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Directory holding config.yaml and the on-disk stores.
    #[arg(long, global = true, default_value = "/etc/softrouter")]
    config_dir: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Agent lifecycle commands.
    #[command(subcommand)]
    Agent(AgentCommands),
}

#[derive(Subcommand, Debug)]
enum AgentCommands {
    /// First-boot bootstrap of the on-disk store layout.
    Init,
    /// Run the long-lived control-plane daemon.
    Run,
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    SimpleLogger::new()
        .with_level(if cli.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        })
        .with_module_level("actix_server", LevelFilter::Warn)
        .init()
        .expect("failed to initialize logger");

    let dir = expand_tilde(&cli.config_dir);
    config::CONFIG_DIR
        .set(dir)
        .expect("config dir set more than once");

    let result = match cli.command {
        Commands::Agent(AgentCommands::Init) => {
            commands::agent::init::run().map_err(|e| e.to_string())
        }
        Commands::Agent(AgentCommands::Run) => {
            commands::agent::run::run().await.map_err(|e| e.to_string())
        }
    };

    if let Err(e) = result {
        log::error!("{e}");
        std::process::exit(1);
    }
}
