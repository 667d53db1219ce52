//! `validate` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use contracts::CollectorConfig;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    listen_address: String,
    chunk_size: usize,
    local_fs: bool,
    hdfs: bool,
    kafka: bool,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
        };
    }

    match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(config) => {
            let warnings = collect_warnings(&config);
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: if warnings.is_empty() {
                    None
                } else {
                    Some(warnings)
                },
                summary: Some(ConfigSummary {
                    listen_address: config.listen_address.clone(),
                    chunk_size: config.output.chunk_size,
                    local_fs: config.output.local_fs.enabled,
                    hdfs: config.output.dfs.enabled,
                    kafka: config.output.kafka.enabled,
                }),
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
        },
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(config: &CollectorConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    if !config.batch_sinks_enabled() && !config.bus_enabled() {
        warnings.push("No output enabled - decoded flows will be discarded".to_string());
    } else if !config.batch_sinks_enabled() {
        warnings.push("No batch output enabled - batches will be discarded".to_string());
    }

    if config.bus_enabled() && !config.output.kafka.tls.enabled {
        warnings.push("Kafka TLS is disabled - flows are sent in plaintext".to_string());
    }

    if config.bus_enabled() && !cfg!(feature = "kafka") {
        warnings.push("Kafka is enabled but this build lacks the 'kafka' feature".to_string());
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Listen: {}", summary.listen_address);
            println!("  Chunk size: {}", summary.chunk_size);
            println!("  LocalFS: {}", summary.local_fs);
            println!("  HDFS: {}", summary.hdfs);
            println!("  Kafka: {}", summary.kafka);
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
