use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use platver_core::emit::{render, Format};
use platver_core::{evaluate, identify, FeatureName, FeatureSet, OracleConfig, SymbolTable};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "platver")]
#[command(about = "Derive platform feature flags from predefined platform symbols")]
#[command(version)]
struct Cli {
    /// Define a symbol: NAME, NAME=VALUE, or !NAME to remove it
    #[arg(short = 'D', long = "define", value_name = "NAME[=VALUE]", global = true)]
    defines: Vec<String>,

    /// Ignore the process environment and use only -D symbols
    #[arg(long, global = true)]
    no_env: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print every feature flag
    Flags {
        /// Output format: cargo, header, env or json
        #[arg(short, long, default_value_t = Format::Env)]
        format: Format,
    },

    /// Print the identified platform family and version
    Identify,

    /// Exit with status 0 if FEATURE is available, 1 otherwise
    Check {
        /// Feature name, e.g. HAVE_FUTIMES or have_futimes
        feature: FeatureName,
    },
}

fn main() -> Result<ExitCode> {
    // stdout carries the flags, so logs go to stderr
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "platver=warn,platver_core=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let base = if cli.no_env {
        OracleConfig::default()
    } else {
        OracleConfig::from_env()
    };
    let config = merge_defines(base, cli.defines);
    debug!(?config, "loaded configuration");

    let symbols: SymbolTable = config.symbols().context("failed to build platform symbols")?;
    let identity = identify(&symbols).context("failed to identify platform")?;
    info!("Identified platform: {}", identity);

    match cli.command.unwrap_or(Commands::Flags {
        format: Format::default(),
    }) {
        Commands::Flags { format } => {
            let rendered = render(&evaluate(&identity), format)
                .with_context(|| format!("failed to render flags as {}", format))?;
            print!("{}", rendered);
        }
        Commands::Identify => {
            println!("{}", identity);
        }
        Commands::Check { feature } => {
            let set = evaluate(&identity);
            info!("{} = {}", feature, set.get(feature));
            return Ok(ExitCode::from(check_status(&set, feature)));
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Command-line defines go after the environment's, so they win.
fn merge_defines(mut config: OracleConfig, defines: Vec<String>) -> OracleConfig {
    config.defines.extend(defines);
    config
}

/// Exit status for `check`: 0 when the feature is available, 1 otherwise.
fn check_status(set: &FeatureSet, feature: FeatureName) -> u8 {
    if set.get(feature) {
        0
    } else {
        1
    }
}
