//! Kafka publisher (rdkafka)
//!
//! One message per flow, no key, `acks=all`. Transport encryption material is
//! read from disk when the publisher is built; failing to read it is fatal.

use std::path::Path;
use std::time::Duration;

use contracts::{ContractError, Delivery, EncodedFlow, FlowPublisher, KafkaConfig, KafkaTlsConfig};
use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::util::Timeout;
use tracing::{debug, info, warn};

/// Internal librdkafka retries per message before a publish is reported failed
pub const MAX_SEND_RETRIES: u32 = 5;

const CLOSE_FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

/// PEM material for mutual TLS
#[derive(Clone)]
pub struct TlsMaterial {
    pub certificate: String,
    pub private_key: String,
    pub ca_bundle: String,
}

impl std::fmt::Debug for TlsMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsMaterial")
            .field("certificate", &format_args!("{} bytes", self.certificate.len()))
            .field("private_key", &"<redacted>")
            .field("ca_bundle", &format_args!("{} bytes", self.ca_bundle.len()))
            .finish()
    }
}

impl TlsMaterial {
    /// 读取证书、私钥、CA，任何一项失败都返回 `TlsCredentials`
    pub fn load(config: &KafkaTlsConfig) -> Result<Self, ContractError> {
        Ok(Self {
            certificate: read_pem(&config.cert_file_path)?,
            private_key: read_pem(&config.key_file_path)?,
            ca_bundle: read_pem(&config.ca_file_path)?,
        })
    }
}

fn read_pem(path: &str) -> Result<String, ContractError> {
    let content = std::fs::read_to_string(Path::new(path))
        .map_err(|e| ContractError::tls_credentials(path, e.to_string()))?;
    if !content.contains("-----BEGIN") {
        return Err(ContractError::tls_credentials(path, "no PEM block found"));
    }
    Ok(content)
}

/// Build the librdkafka client configuration
pub fn client_config(
    config: &KafkaConfig,
    tls: Option<&TlsMaterial>,
) -> ClientConfig {
    let mut client_config = ClientConfig::new();
    client_config
        .set("bootstrap.servers", config.broker_list.join(","))
        .set("acks", "all")
        .set("message.send.max.retries", MAX_SEND_RETRIES.to_string())
        .set("message.timeout.ms", config.message_timeout_ms.to_string());

    match tls {
        Some(tls) => {
            client_config
                .set("security.protocol", "ssl")
                .set("ssl.certificate.pem", &tls.certificate)
                .set("ssl.key.pem", &tls.private_key)
                .set("ssl.ca.pem", &tls.ca_bundle);
        }
        None => {
            client_config.set("security.protocol", "plaintext");
        }
    }
    client_config
}

/// Kafka-backed `FlowPublisher`
pub struct KafkaPublisher {
    name: String,
    topic: String,
    producer: FutureProducer,
    timeout: Duration,
}

impl KafkaPublisher {
    /// Create the producer
    ///
    /// # Errors
    /// - `TlsCredentials` when TLS is enabled and any PEM file cannot be read
    /// - `SinkConnection` when librdkafka rejects the configuration
    pub fn new(name: impl Into<String>, config: &KafkaConfig) -> Result<Self, ContractError> {
        let name = name.into();

        let tls = if config.tls.enabled {
            Some(TlsMaterial::load(&config.tls)?)
        } else {
            warn!(sink = %name, "Kafka transport encryption disabled");
            None
        };

        let producer: FutureProducer = client_config(config, tls.as_ref())
            .create()
            .map_err(|e| ContractError::sink_connection(&name, e.to_string()))?;

        info!(
            sink = %name,
            brokers = %config.broker_list.join(","),
            topic = %config.topic,
            tls = config.tls.enabled,
            "Kafka producer created"
        );

        Ok(Self {
            name,
            topic: config.topic.clone(),
            producer,
            timeout: Duration::from_millis(config.message_timeout_ms),
        })
    }
}

impl FlowPublisher for KafkaPublisher {
    fn name(&self) -> &str {
        &self.name
    }

    async fn publish(&mut self, flow: &EncodedFlow) -> Result<Delivery, ContractError> {
        let record: FutureRecord<'_, (), str> = FutureRecord::to(&self.topic).payload(flow.as_str());

        match self.producer.send(record, Timeout::After(self.timeout)).await {
            Ok((partition, offset)) => Ok(Delivery { partition, offset }),
            Err((e, _message)) => Err(ContractError::sink_write(&self.name, e.to_string())),
        }
    }

    async fn close(&mut self) -> Result<(), ContractError> {
        let producer = self.producer.clone();
        let result = tokio::task::spawn_blocking(move || {
            producer.flush(Timeout::After(CLOSE_FLUSH_TIMEOUT))
        })
        .await
        .map_err(|e| ContractError::sink_write(&self.name, e.to_string()))?;

        result.map_err(|e| ContractError::sink_write(&self.name, e.to_string()))?;
        debug!(sink = %self.name, "Kafka producer flushed");
        Ok(())
    }
}
