//! `info` command implementation.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::info;

use contracts::CollectorConfig;

use crate::cli::InfoArgs;
use crate::error::ensure_config_exists;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    listen_address: String,
    chunk_size: usize,
    flow_queue_capacity: usize,
    sink_queue_capacity: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_in_flight_decodes: Option<usize>,
    outputs: Vec<OutputInfo>,
    disabled_header_fields: Vec<&'static str>,
    disabled_record_fields: Vec<&'static str>,
}

#[derive(Serialize)]
struct OutputInfo {
    name: &'static str,
    destination: String,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");
    ensure_config_exists(&args.config)?;

    let config = config_loader::ConfigLoader::load_from_path(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    let info = build_config_info(&config);
    if args.json {
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&info);
    }

    Ok(())
}

fn build_config_info(config: &CollectorConfig) -> ConfigInfo {
    let output = &config.output;
    let mut outputs = Vec::new();
    if output.local_fs.enabled {
        outputs.push(OutputInfo {
            name: "local_fs",
            destination: output.local_fs.path.clone(),
        });
    }
    if output.dfs.enabled {
        outputs.push(OutputInfo {
            name: "hdfs",
            destination: output.dfs.path.clone(),
        });
    }
    if output.kafka.enabled {
        let scheme = if output.kafka.tls.enabled { "ssl" } else { "plaintext" };
        outputs.push(OutputInfo {
            name: "kafka",
            destination: format!(
                "{scheme}://{}/{}",
                output.kafka.broker_list.join(","),
                output.kafka.topic
            ),
        });
    }

    ConfigInfo {
        listen_address: config.bind_address(),
        chunk_size: output.chunk_size,
        flow_queue_capacity: config.flow_queue_capacity,
        sink_queue_capacity: output.sink_queue_capacity,
        max_in_flight_decodes: config.max_in_flight_decodes,
        outputs,
        disabled_header_fields: config.header_fields.disabled(),
        disabled_record_fields: config.record_fields.disabled(),
    }
}

fn print_config_info(info: &ConfigInfo) {
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║               NetFlow Collector Configuration                ║");
    println!("╚══════════════════════════════════════════════════════════════╝\n");

    println!("📡 Listener");
    println!("   ├─ Address: {}", info.listen_address);
    match info.max_in_flight_decodes {
        Some(limit) => println!("   └─ Max in-flight decodes: {}", limit),
        None => println!("   └─ Max in-flight decodes: unlimited"),
    }

    println!("\n📦 Batching");
    println!("   ├─ Chunk size: {}", info.chunk_size);
    println!("   ├─ Flow queue capacity: {}", info.flow_queue_capacity);
    println!("   └─ Sink queue capacity: {}", info.sink_queue_capacity);

    println!("\n📤 Outputs ({})", info.outputs.len());
    for (i, output) in info.outputs.iter().enumerate() {
        let prefix = if i == info.outputs.len() - 1 { "└─" } else { "├─" };
        println!("   {} {} -> {}", prefix, output.name, output.destination);
    }

    println!("\n🔧 Disabled fields");
    println!("   ├─ Header: {}", field_list(&info.disabled_header_fields));
    println!("   └─ Record: {}", field_list(&info.disabled_record_fields));

    println!();
}

fn field_list(fields: &[&str]) -> String {
    if fields.is_empty() {
        "(none)".to_string()
    } else {
        fields.join(", ")
    }
}
