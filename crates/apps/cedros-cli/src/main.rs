//! Cedros CLI binary entry point.

use clap::Parser;
use colored::Colorize;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cedros_cli::{
    cli::{Cli, Commands},
    commands::{self, CheckoutArgs},
    config::{default_config_path, CliConfig},
    context::CliContext,
    error::{CliError, CliResult},
    output::OutputFormat,
};

fn main() {
    let cli = Cli::parse();

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            let e = CliError::from(e);
            print_error(&e);
            std::process::exit(e.exit_code());
        }
    };
    rt.block_on(async_main(cli));
}

async fn async_main(cli: Cli) {
    // Initialize logging based on --verbose flag or RUST_LOG env var
    let has_rust_log = std::env::var("RUST_LOG").is_ok();
    if cli.verbose || has_rust_log {
        let mut filter = EnvFilter::from_default_env();
        if cli.verbose {
            if let Ok(directive) = "cedros=debug".parse() {
                filter = filter.add_directive(directive);
            }
        }
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr))
            .with(filter)
            .init();
    }

    // Run the command
    if let Err(e) = run(cli).await {
        print_error(&e);
        std::process::exit(e.exit_code());
    }
}

/// Print a user-friendly error message with error code and recovery hint.
fn print_error(e: &CliError) {
    eprintln!(
        "{} [{}]: {}",
        "Error".red().bold(),
        e.error_code().yellow(),
        e
    );

    if let Some(suggestion) = e.suggestion() {
        eprintln!("{}: {}", "Hint".cyan(), suggestion);
    }
}

async fn run(cli: Cli) -> CliResult<()> {
    // Load configuration
    let config_path = cli.config.unwrap_or_else(default_config_path);
    let mut config = CliConfig::load(&config_path)?;

    // Command-line overrides
    if let Some(server) = cli.server {
        config.cedros.server_url = server;
    }
    if let Some(network) = cli.network {
        config.cedros.network = network.into();
    }

    let format: OutputFormat = cli.format.into();

    let output = match cli.command {
        Commands::Init { force, keypair } => {
            commands::init(config, format, &config_path, force, keypair)?
        }
        Commands::Completions { shell } => commands::completions(shell)?,
        Commands::Route => {
            let ctx = CliContext::new(config)?;
            commands::route(&ctx, format).await?
        }
        Commands::Quote {
            resources,
            cart,
            coupon,
        } => {
            let ctx = CliContext::new(config)?;
            commands::quote(&ctx, format, &resources, cart, coupon.as_deref()).await?
        }
        Commands::Pay {
            resource,
            keypair,
            coupon,
            no_gasless,
            allow_unknown_mint,
        } => {
            if no_gasless {
                config.cedros.enable_gasless = false;
            }
            if allow_unknown_mint {
                config.cedros.allow_unknown_mints = true;
            }
            let keypair = keypair
                .or_else(|| config.wallet.keypair.clone())
                .ok_or(CliError::KeypairNotConfigured)?;
            let ctx = CliContext::new(config)?;
            commands::pay(&ctx, format, &resource, &keypair, coupon.as_deref()).await?
        }
        Commands::Status { signature } => {
            let ctx = CliContext::new(config)?;
            commands::status(&ctx, format, &signature).await?
        }
        Commands::Checkout {
            resource,
            email,
            success_url,
            cancel_url,
            coupon,
        } => {
            let ctx = CliContext::new(config)?;
            let args = CheckoutArgs {
                email,
                success_url,
                cancel_url,
                coupon,
            };
            commands::checkout(&ctx, format, &resource, args).await?
        }
        Commands::Credits {
            resource,
            token,
            coupon,
        } => {
            let ctx = CliContext::new(config)?;
            commands::credits(&ctx, format, &resource, &token, coupon.as_deref()).await?
        }
    };

    if !output.is_empty() {
        println!("{}", output);
    }

    Ok(())
}
