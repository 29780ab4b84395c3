pub mod commands;
pub mod logging;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use priceflow_core::config::LoadOptions;

#[derive(Debug, Parser)]
#[command(
    name = "priceflow",
    about = "Priceflow pricing engine CLI",
    long_about = "Price orders, recommend bundles, and optimize bundle offers from JSON files.",
    after_help = "Examples:\n  priceflow calculate --input order.json\n  priceflow recommend --input cart.json\n  priceflow config"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Path to a priceflow.toml config file")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Price the items of an order against the supplied catalogs")]
    Calculate {
        #[arg(long, help = "JSON file with catalogs and the pricing input")]
        input: PathBuf,
    },
    #[command(about = "Recommend bundles for a cart")]
    Recommend {
        #[arg(long, help = "JSON file with bundles, cart and customer")]
        input: PathBuf,
    },
    #[command(about = "Analyze a bundle's performance and propose an optimized revision")]
    Optimize {
        #[arg(long, help = "JSON file with a bundle and its analytics")]
        input: PathBuf,
    },
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
}

impl Command {
    fn name(&self) -> &'static str {
        match self {
            Self::Calculate { .. } => commands::calculate::COMMAND,
            Self::Recommend { .. } => commands::recommend::COMMAND,
            Self::Optimize { .. } => commands::optimize::COMMAND,
            Self::Config => commands::config::COMMAND,
        }
    }
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let options = LoadOptions {
        require_file: cli.config.is_some(),
        config_path: cli.config,
        ..LoadOptions::default()
    };

    let result = match commands::load_config(cli.command.name(), options.clone()) {
        Err(failure) => failure,
        Ok(config) => {
            logging::init_logging(&config.logging);
            match cli.command {
                Command::Calculate { input } => commands::calculate::run(&config, &input),
                Command::Recommend { input } => commands::recommend::run(&config, &input),
                Command::Optimize { input } => commands::optimize::run(&config, &input),
                Command::Config => commands::config::run(&config, options.config_path.as_deref()),
            }
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
