//! `run` command implementation.

use anyhow::{Context, Result};
use tracing::{info, warn};

use contracts::CollectorConfig;

use crate::cli::RunArgs;
use crate::error::{ensure_config_exists, CliError};
use crate::pipeline::Pipeline;

/// Execute the `run` command
pub async fn run_pipeline(args: &RunArgs) -> Result<()> {
    let config = load_config(args)?;

    // Dry run - just validate and exit
    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        print_config_summary(&config);
        return Ok(());
    }

    let pipeline = Pipeline::new(config);

    info!("Starting collector...");
    let stats = pipeline
        .run(shutdown_signal())
        .await
        .context("Collector failed")?;

    info!(
        datagrams = stats.ingestion.datagrams_received,
        flows = stats.ingestion.flows_decoded,
        batches = stats.accumulator.batches_emitted,
        duration_secs = stats.duration.as_secs_f64(),
        "Collector stopped"
    );
    stats.print_summary();

    Ok(())
}

/// Load the configuration file, apply CLI overrides and re-validate
fn load_config(args: &RunArgs) -> Result<CollectorConfig> {
    info!(config = %args.config.display(), "Loading configuration");
    ensure_config_exists(&args.config)?;

    let mut config = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    if let Some(ref listen) = args.listen {
        info!(listen = %listen, "Overriding listen address from CLI");
        config.listen_address = listen.clone();
        config_loader::ConfigLoader::validate(&config)
            .map_err(|e| CliError::config_validation(e.to_string()))?;
    }

    info!(
        listen = %config.listen_address,
        chunk_size = config.output.chunk_size,
        local_fs = config.output.local_fs.enabled,
        hdfs = config.output.dfs.enabled,
        kafka = config.output.kafka.enabled,
        "Configuration loaded"
    );

    Ok(config)
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received SIGTERM"),
    }
}

/// Print configuration summary for dry-run mode
fn print_config_summary(config: &CollectorConfig) {
    println!("\n=== Configuration Summary ===\n");
    println!("Listen: {}", config.bind_address());
    println!("Chunk size: {}", config.output.chunk_size);

    println!("\nOutputs:");
    if config.output.local_fs.enabled {
        println!("  - local_fs -> {}", config.output.local_fs.path);
    }
    if config.output.dfs.enabled {
        println!("  - hdfs -> {}", config.output.dfs.path);
    }
    if config.output.kafka.enabled {
        println!(
            "  - kafka -> {} @ {} (tls: {})",
            config.output.kafka.topic,
            config.output.kafka.broker_list.join(","),
            config.output.kafka.tls.enabled
        );
    }
    if !config.batch_sinks_enabled() && !config.bus_enabled() {
        println!("  (none)");
    }

    println!();
}
