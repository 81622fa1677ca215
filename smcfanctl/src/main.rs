//! smcfanctl
//!
//! Command-line interface for reading SMC sensors and controlling fans.

use anyhow::Result;
use clap::Parser;
use smcfan_core::default_config_path;
use smcfanctl::backend::connect;
use smcfanctl::cli::{
    generate_completion, handle_fan, handle_info, handle_key, handle_restore, handle_sensors,
    handle_status, Cli, Commands, OutputFormat,
};
use smcfanctl::config::CliConfig;
use std::path::PathBuf;
use tracing::debug;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Completion scripts never touch the hardware or the config
    if let Commands::Completion { shell } = cli.command {
        generate_completion(shell);
        return Ok(());
    }

    // Priority chain: CLI args → env → file → defaults. Each layer only fills
    // values the layers above left unset.
    let mut builder = CliConfig::builder();

    if let Some(ref format) = cli.format {
        builder = builder.with_output_format(format.as_str())?;
    }
    if let Some(backend) = cli.backend {
        builder = builder.with_backend(backend.as_str())?;
    }
    if cli.verbose {
        builder = builder.with_verbose(true);
    }

    builder = builder.with_env_overrides();

    if !cli.no_config {
        let (path, required) = match &cli.config {
            Some(path) => (PathBuf::from(path), true),
            None => (default_config_path(), false),
        };
        builder = builder.with_config_file(&path, required)?;
    }

    let config = match builder.build() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            std::process::exit(1);
        }
    };

    init_tracing(config.verbose);

    let output_format = match config.output_format.as_str() {
        "json" => OutputFormat::Json,
        _ => OutputFormat::Table,
    };
    let backend = config.backend()?;
    debug!("Backend: {}, output: {:?}", backend, output_format);

    let handle = match connect(backend, &config.smc) {
        Ok(handle) => handle,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Info => handle_info(&handle, backend, &output_format),
        Commands::Status => handle_status(&handle, &config.smc, &output_format),
        Commands::Sensors => handle_sensors(&handle, &config.smc, &output_format),
        Commands::Key { command } => handle_key(&handle, command, &output_format),
        Commands::Fan { command } => {
            handle_fan(&handle, &config.smc, command, &output_format).await
        }
        Commands::Restore => handle_restore(&handle),
        Commands::Completion { .. } => Ok(()),
    };

    if let Err(e) = result {
        eprintln!("Error: {:#}", e);
        if config.verbose {
            eprintln!("Error details: {:?}", e);
        }
        std::process::exit(1);
    }

    Ok(())
}

/// Initialize tracing subscriber for logging
fn init_tracing(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
