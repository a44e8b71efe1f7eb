//! Lightsock - SSRA credential-handoff client and lightsocket event watcher

use std::process::ExitCode;

use clap::Parser;
use tracing::error;

use lightsock::{
    cli::{Cli, Command},
    config::Config,
    session::{Outcome, Session},
    setup_tracing,
    ssra::SsraClient,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup tracing
    if let Err(e) = setup_tracing(&cli.log_level, cli.log_format.as_deref()) {
        eprintln!("Failed to setup tracing: {e}");
        return ExitCode::FAILURE;
    }

    // Load configuration
    let config = match Config::load(cli.config.as_deref()) {
        Ok(mut config) => {
            // Apply CLI overrides
            if let Some(ref gateway) = cli.gateway {
                config.gateway.name = gateway.clone();
            }
            if let Some(watch) = cli.watch {
                config.stream.watch = watch;
            }
            config
        }
        Err(e) => {
            error!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    match cli.command {
        Some(Command::Gateways { format }) => run_gateways(config, &format).await,
        Some(Command::Connect) | None => run_connect(config).await,
    }
}

/// Run the connect-and-watch flow
async fn run_connect(config: Config) -> ExitCode {
    let session = match Session::new(config) {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to create session: {e}");
            return ExitCode::FAILURE;
        }
    };

    match session.run().await {
        // "No such gateway" is a terminal condition, not a failure
        Ok(Outcome::GatewayNotFound | Outcome::Watched) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Session error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// List the authenticated user's gateways
async fn run_gateways(config: Config, format: &str) -> ExitCode {
    // Listing needs credentials but no gateway name
    if let Err(e) = config.validate_ssra() {
        error!("{e}");
        return ExitCode::FAILURE;
    }

    let base_url = match lightsock::session::ssra_base_url(&config.ssra.host) {
        Ok((base, _tls)) => base,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let ssra = match SsraClient::new(base_url) {
        Ok(c) => c,
        Err(e) => {
            error!("Failed to create SSRA client: {e}");
            return ExitCode::FAILURE;
        }
    };

    let login = match ssra
        .login(&config.ssra.resolve_email(), &config.ssra.resolve_password())
        .await
    {
        Ok(l) => l,
        Err(e) => {
            error!("Login failed: {e}");
            return ExitCode::FAILURE;
        }
    };

    match ssra.gateways(&login.token).await {
        Ok(gateways) => {
            if format == "json" {
                match serde_json::to_string_pretty(&gateways) {
                    Ok(json) => println!("{json}"),
                    Err(e) => {
                        error!("Failed to serialize gateways: {e}");
                        return ExitCode::FAILURE;
                    }
                }
            } else if gateways.is_empty() {
                println!("No gateways visible to this account.");
            } else {
                println!("Found {} gateway(s):\n", gateways.len());
                for gateway in &gateways {
                    println!("  {} (id {}) - {}", gateway.name, gateway.id, gateway.hostname);
                }
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Failed to list gateways: {e}");
            ExitCode::FAILURE
        }
    }
}
