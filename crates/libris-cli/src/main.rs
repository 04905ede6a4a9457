mod cli;
mod commands;
mod config;
mod output;

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use libris_client::{ApiError, BackendClient, CatalogClient, FileCredentialStore};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use cli::{Cli, Commands};
use output::{print_error, print_hint};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(if cli.verbose { "debug" } else { "warn" });

    let uses_session = cli.command.uses_session();
    if let Err(e) = run(cli).await {
        print_error(&format!("{e:#}"));
        if uses_session && needs_login(&e) {
            print_hint("Your session has ended. Run `libris login` to sign in again");
        }
        std::process::exit(1);
    }
}

/// `RUST_LOG` wins over the level chosen on the command line.
fn init_tracing(level: &str) {
    let filter = std::env::var("RUST_LOG")
        .ok()
        .and_then(|_| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new(level));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

fn needs_login(err: &anyhow::Error) -> bool {
    err.downcast_ref::<ApiError>()
        .is_some_and(ApiError::requires_login)
}

async fn run(cli: Cli) -> Result<()> {
    let profile = cli.profile.as_str();
    let cfg = config::load_profile(profile)?;
    let format = match cli.format {
        Some(format) => format,
        None => cfg.output_format()?.unwrap_or_default(),
    };

    let store = Arc::new(FileCredentialStore::for_profile(profile)?);
    output::apply_theme(commands::profile::stored_theme(store.as_ref()));
    let client_config = config::client_config(cli.server.as_deref(), &cfg)?;
    tracing::debug!(%profile, server = %client_config.base_url, "resolved configuration");

    let backend = || BackendClient::connect(&client_config, store.clone());

    match &cli.command {
        Commands::Login(args) => commands::auth::login(&backend()?, args).await?,
        Commands::SendOtp(args) => commands::auth::send_otp(&backend()?, &args.phone).await?,
        Commands::Register(args) => commands::auth::register(&backend()?, args).await?,
        Commands::Logout => commands::auth::logout(&backend()?, profile)?,
        Commands::Whoami => {
            commands::auth::whoami(store.as_ref(), profile, client_config.base_url.as_str())?
        }
        Commands::Me => commands::profile::me(&backend()?, format).await?,
        Commands::Home(args) => commands::books::home(&backend()?, args.section, format).await?,
        Commands::Today => commands::books::today(&backend()?, format).await?,
        Commands::Book(args) => commands::books::book(&backend()?, &args.id, format).await?,
        Commands::Summary(args) => commands::books::summary(&backend()?, &args.id, format).await?,
        Commands::Library => commands::books::library(&backend()?, format).await?,
        Commands::Search(args) => {
            let catalog = CatalogClient::new(&client_config)?;
            commands::search::search(&catalog, args, format).await?;
        }
        Commands::Theme(args) => commands::profile::theme(store.as_ref(), args.command.as_ref())?,
        Commands::Config(args) => match &args.command {
            cli::ConfigCommands::Show => {
                println!("{}: {}", "Profile".cyan(), profile);
                println!(
                    "{}: {}",
                    "Server".cyan(),
                    cfg.server.as_deref().unwrap_or("(default)")
                );
                println!(
                    "{}: {}",
                    "Format".cyan(),
                    cfg.format.as_deref().unwrap_or("json")
                );
                println!(
                    "{}: {}s",
                    "Timeout".cyan(),
                    client_config.timeout.as_secs()
                );
                println!("{}: {}", "State file".cyan(), store.path().display());
            }
            cli::ConfigCommands::Set(set_args) => {
                let mut cfg = cfg.clone();
                cfg.set(&set_args.key, &set_args.value)?;
                config::save_profile(profile, &cfg)?;
                output::print_success(&format!("Set {} = {}", set_args.key, set_args.value));
            }
        },
    }

    Ok(())
}
