pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod entities;

use anyhow::Context;
pub use config::Config;
use db::{NewAccount, Store};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

pub async fn run() -> anyhow::Result<()> {
    let config = Config::load()?;
    config.validate()?;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level));

    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_help();
        return Ok(());
    }

    match args[1].as_str() {
        "serve" | "daemon" | "-d" | "--daemon" => run_server(config).await,

        "account" => {
            if args.len() < 3 {
                println!("Usage: liftlog account <subcommand>");
                println!("Subcommands: add, list");
                return Ok(());
            }
            match args[2].as_str() {
                "add" => {
                    if args.len() < 4 {
                        println!("Usage: liftlog account add <username> [--superuser]");
                        return Ok(());
                    }
                    let username = &args[3];
                    let superuser = args.iter().any(|a| a == "--superuser");
                    cmd_account_add(&config, username, superuser).await
                }
                "list" | "ls" => cmd_account_list(&config).await,
                _ => {
                    println!("Unknown account subcommand: {}", args[2]);
                    println!("Use: add, list");
                    Ok(())
                }
            }
        }

        "init" | "--init" => {
            Config::create_default_if_missing()?;
            println!("Config file created. Edit config.toml and run again.");
            Ok(())
        }

        "help" | "-h" | "--help" => {
            print_help();
            Ok(())
        }

        _ => {
            println!("Unknown command: {}", args[1]);
            println!();
            print_help();
            Ok(())
        }
    }
}

fn print_help() {
    println!("Liftlog - Personal Fitness Tracker");
    println!();
    println!("USAGE:");
    println!("  liftlog <COMMAND> [OPTIONS]");
    println!();
    println!("COMMANDS:");
    println!("  serve                   Run the REST API server");
    println!("  account add <username>  Create an account (add --superuser for admin rights)");
    println!("  account list            List registered accounts");
    println!("  init                    Create default config file");
    println!("  help                    Show this help message");
    println!();
    println!("EXAMPLES:");
    println!("  liftlog init                        # Write config.toml");
    println!("  liftlog account add admin --superuser");
    println!("  liftlog serve                       # Serve on the configured port");
    println!();
    println!("CONFIG:");
    println!("  Edit config.toml to configure the database path, port, and hashing cost.");
}

async fn run_server(config: Config) -> anyhow::Result<()> {
    info!(
        "Liftlog v{} starting in server mode...",
        env!("CARGO_PKG_VERSION")
    );

    let state = api::create_app_state_from_config(config.clone()).await?;

    if !config.server.enabled {
        anyhow::bail!("Server is disabled in config.toml");
    }

    let port = config.server.port;
    let app = api::router(state);
    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    let server_handle = tokio::spawn(async move {
        info!("REST API listening at http://0.0.0.0:{}", port);
        if let Err(e) = axum::serve(listener, app).await {
            error!("Server error: {}", e);
        }
    });

    info!("Server running. Press Ctrl+C to stop.");

    match signal::ctrl_c().await {
        Ok(()) => {
            info!("Shutdown signal received");
        }
        Err(e) => {
            error!("Error listening for shutdown: {}", e);
        }
    }

    server_handle.abort();
    info!("Server stopped");

    Ok(())
}

/// Bootstrap flow: create an account from the terminal. This is how the
/// first superuser comes to exist; from then on accounts can also be
/// created over the API by a superuser.
async fn cmd_account_add(config: &Config, username: &str, superuser: bool) -> anyhow::Result<()> {
    let username = username.trim().to_string();
    if username.is_empty() {
        println!("Username must not be empty.");
        return Ok(());
    }

    let store = Store::with_pool_options(
        &config.general.database_path,
        config.general.max_db_connections,
        config.general.min_db_connections,
    )
    .await?;

    if store.get_account_by_username(&username).await?.is_some() {
        println!("Account '{username}' already exists.");
        return Ok(());
    }

    println!("Password for {username}:");
    let mut password = String::new();
    std::io::stdin().read_line(&mut password)?;
    let password = password.trim_end_matches(['\r', '\n']).to_string();

    if password.is_empty() {
        println!("Password must not be empty.");
        return Ok(());
    }

    let security = config.security.clone();
    let record = tokio::task::spawn_blocking(move || auth::hash_password(&password, &security))
        .await
        .context("Password hashing task panicked")??;

    let account = store
        .create_account(NewAccount {
            username,
            password: record,
            enabled: true,
            superuser,
        })
        .await?;

    println!(
        "Created account '{}' (id {}){}",
        account.username,
        account.id,
        if account.superuser { " [superuser]" } else { "" }
    );

    Ok(())
}

async fn cmd_account_list(config: &Config) -> anyhow::Result<()> {
    let store = Store::with_pool_options(
        &config.general.database_path,
        config.general.max_db_connections,
        config.general.min_db_connections,
    )
    .await?;

    let accounts = store.list_accounts().await?;

    if accounts.is_empty() {
        println!("No accounts registered.");
        println!();
        println!("Create one with: liftlog account add <username>");
        return Ok(());
    }

    println!("Accounts ({} total)", accounts.len());
    println!("{:-<70}", "");

    for account in accounts {
        let flags = match (account.enabled, account.superuser) {
            (false, _) => " [disabled]",
            (true, true) => " [superuser]",
            (true, false) => "",
        };
        let last_seen = account.token_last_used.as_deref().unwrap_or("never");

        println!("{:>4}  {}{}", account.id, account.username, flags);
        println!(
            "      created: {} | last session use: {}",
            account.account_created, last_seen
        );
    }

    Ok(())
}
