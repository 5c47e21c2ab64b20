//! Minh Phat CLI - Database and session tools.
//!
//! # Usage
//!
//! ```bash
//! # Apply SQLite migrations
//! mp-cli migrate
//!
//! # Seed an empty SQLite store with the starter catalog and admin
//! mp-cli seed
//!
//! # Create an admin user (password from MINHPHAT_NEW_ADMIN_PASSWORD)
//! mp-cli admin create --username lan --full-name "Nguyễn Lan" --email lan@minhphat.com
//!
//! # List admin users
//! mp-cli admin list
//!
//! # Log in and watch the idle timeout in the terminal
//! mp-cli session watch --url http://localhost:3000 --username admin
//! ```
//!
//! Database commands read `MINHPHAT_DATABASE_URL` (or `DATABASE_URL`).

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use url::Url;

mod commands;

#[derive(Parser)]
#[command(name = "mp-cli")]
#[command(author, version, about = "Minh Phat CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply SQLite migrations
    Migrate,
    /// Seed an empty SQLite store
    Seed,
    /// Manage admin users
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Admin session tools
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Create a new admin user
    Create {
        /// Login name
        #[arg(short, long)]
        username: String,

        /// Display name
        #[arg(short = 'n', long)]
        full_name: Option<String>,

        /// Contact email
        #[arg(short, long)]
        email: Option<String>,
    },
    /// List admin users
    List,
}

#[derive(Subcommand)]
enum SessionAction {
    /// Log in and run the idle-timeout controller in the terminal
    Watch {
        /// Server base URL
        #[arg(long, env = "MINHPHAT_BASE_URL", default_value = "http://localhost:3000")]
        url: Url,

        /// Admin username
        #[arg(short, long, default_value = "admin")]
        username: String,

        /// Admin password
        #[arg(long, env = "MINHPHAT_ADMIN_PASSWORD", hide_env_values = true)]
        password: String,
    },
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "minh_phat_cli=info,minh_phat_server=info".into()),
        )
        .init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed => commands::seed::run().await?,
        Commands::Admin { action } => match action {
            AdminAction::Create {
                username,
                full_name,
                email,
            } => {
                commands::admin::create_user(&username, full_name, email.as_deref()).await?;
            }
            AdminAction::List => commands::admin::list_users().await?,
        },
        Commands::Session { action } => match action {
            SessionAction::Watch {
                url,
                username,
                password,
            } => commands::session::watch(url, &username, &password).await?,
        },
    }
    Ok(())
}
