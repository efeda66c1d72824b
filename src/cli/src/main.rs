//! ZIGMA CLI - command-line access to a running ZIGMA dashboard server.
//!
//! Provides sign-in, session, navigation, access-check, user management,
//! health, and configuration commands.

mod client;
mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{access, auth, config, health, nav, users};
use output::OutputFormat;

const DEFAULT_API_URL: &str = "http://127.0.0.1:5173";

/// ZIGMA - investor dashboard CLI
#[derive(Parser)]
#[command(
    name = "zigma",
    version,
    about = "ZIGMA - investor dashboard CLI",
    long_about = "CLI for signing in to a ZIGMA dashboard server, inspecting role permissions and managing users.",
    propagate_version = true
)]
pub struct Cli {
    /// Output format
    #[arg(short, long, global = true, default_value = "table")]
    output: OutputFormat,

    /// Dashboard server URL
    #[arg(long, global = true, env = "ZIGMA_API_URL")]
    api_url: Option<String>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in, sign out, and inspect the session
    #[command(subcommand)]
    Auth(auth::AuthCommands),

    /// Show the sidebar menu for the current session
    Nav,

    /// Check what navigating to paths would do
    Access(access::AccessArgs),

    /// Manage user roles (admin only)
    #[command(subcommand)]
    Users(users::UserCommands),

    /// Check server health
    Health,

    /// Configuration management
    #[command(subcommand)]
    Config(config::ConfigCommands),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    let api_url = cli
        .api_url
        .clone()
        .or_else(|| config::load_value("api-url"))
        .unwrap_or_else(|| DEFAULT_API_URL.to_string());

    let client = client::ApiClient::new(&api_url)?;
    let format = cli.output;

    let result = match cli.command {
        Commands::Auth(cmd) => auth::execute(cmd, &client, format).await,
        Commands::Nav => nav::execute(&client, format).await,
        Commands::Access(args) => access::execute(args, &client, format).await,
        Commands::Users(cmd) => users::execute(cmd, &client, format).await,
        Commands::Health => health::execute(&client, format).await,
        Commands::Config(cmd) => config::execute(cmd, format).await,
    };

    if let Err(e) = result {
        output::print_error(&format!("{:#}", e));
        std::process::exit(1);
    }

    Ok(())
}
