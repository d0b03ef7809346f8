//! EV Market CLI - session store migrations and operator tools.
//!
//! # Usage
//!
//! ```bash
//! # Create the session table
//! evmarket-cli migrate
//!
//! # Quote GHN shipping to an address
//! evmarket-cli shipping quote --province "Hà Nội" --district "Quận Ba Đình" --ward "Phường Kim Mã"
//! ```
//!
//! # Commands
//!
//! - `migrate` - Create or update the session store schema
//! - `shipping quote` - Resolve an address and print the shipping fee

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "evmarket-cli")]
#[command(author, version, about = "EV Market CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or update the session store schema
    Migrate,
    /// Shipping carrier tools
    Shipping {
        #[command(subcommand)]
        action: ShippingAction,
    },
}

#[derive(Subcommand)]
enum ShippingAction {
    /// Quote the fee and delivery date for an address
    Quote {
        /// Province or city name
        #[arg(short, long)]
        province: String,

        /// District name
        #[arg(short, long)]
        district: String,

        /// Ward name
        #[arg(short, long)]
        ward: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::sessions().await?,
        Commands::Shipping { action } => match action {
            ShippingAction::Quote {
                province,
                district,
                ward,
            } => commands::shipping::quote(province, district, ward).await?,
        },
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_shipping_quote() {
        let cli = Cli::try_parse_from([
            "evmarket-cli",
            "shipping",
            "quote",
            "--province",
            "Hà Nội",
            "-d",
            "Quận Ba Đình",
            "-w",
            "Phường Kim Mã",
        ]);
        assert!(matches!(
            cli.map(|c| c.command),
            Ok(Commands::Shipping {
                action: ShippingAction::Quote { .. }
            })
        ));
    }
}
