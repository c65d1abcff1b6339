//! # filmswap
//!
//! Entry point: parse arguments, load settings, initialise tracing, run the
//! command.

use clap::Parser;
use filmswap::cli;
use filmswap::config::{LogFormat, Settings};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    let cli = cli::Cli::parse();
    let settings = Settings::load(cli.config.as_deref());

    // FILMSWAP_LOG_FORMAT is already folded into the settings; a broken config
    // still gets text logs so the error below is visible.
    let log_format = settings
        .as_ref()
        .map(|s| s.log_format)
        .unwrap_or_default();
    init_tracing(log_format);

    let settings = match settings {
        Ok(settings) => settings,
        Err(e) => {
            tracing::error!("Error: {}", e);
            std::process::exit(1);
        }
    };

    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    if let Err(e) = cli::execute(cli, settings).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "filmswap=info,filmswap_core=info,tower_http=debug".into());
    let registry = tracing_subscriber::registry().with(filter);

    // stdout carries command output, including --json-mode documents.
    match format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init(),
        LogFormat::Text => registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init(),
    }
}

fn print_banner() {
    println!(
        r#"
  __ _ _
 / _(_) |_ __ ___  _____      ____ _ _ __
| |_| | | '_ ` _ \/ __\ \ /\ / / _` | '_ \
|  _| | | | | | | \__ \\ V  V / (_| | |_) |
|_| |_|_|_| |_| |_|___/ \_/\_/ \__,_| .__/
                                    |_|
  v{}
"#,
        env!("CARGO_PKG_VERSION")
    );
}
