//! 配置校验模块
//!
//! 校验规则：
//! - 字段级约束 (`validator` derive)：1 <= chunk_size <= MAX_CHUNK_SIZE，队列容量 >= 1
//! - 监听地址可解析为 `host:port`
//! - 已启用的 sink 必填字段齐全
//! - 启用 TLS 时证书、私钥、CA 路径均非空

use std::net::ToSocketAddrs;

use contracts::{CollectorConfig, ContractError};
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

/// 校验 CollectorConfig 配置
///
/// 返回第一个遇到的错误，或 Ok(())。
pub fn validate(config: &CollectorConfig) -> Result<(), ContractError> {
    validate_constraints(config)?;
    validate_listen_address(config)?;
    validate_local_fs(config)?;
    validate_dfs(config)?;
    validate_kafka(config)?;
    Ok(())
}

/// 字段级约束
fn validate_constraints(config: &CollectorConfig) -> Result<(), ContractError> {
    config
        .validate()
        .map_err(|errors| first_violation(&errors, ""))
}

/// 将 ValidationErrors 展平为第一个违规字段
fn first_violation(errors: &ValidationErrors, prefix: &str) -> ContractError {
    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        };
        match kind {
            ValidationErrorsKind::Field(list) => {
                let message = list
                    .first()
                    .map(|e| {
                        e.message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| format!("constraint '{}' violated", e.code))
                    })
                    .unwrap_or_else(|| "invalid value".to_string());
                return ContractError::config_validation(path, message);
            }
            ValidationErrorsKind::Struct(nested) => return first_violation(nested, &path),
            ValidationErrorsKind::List(items) => {
                if let Some((idx, nested)) = items.iter().next() {
                    return first_violation(nested, &format!("{path}[{idx}]"));
                }
            }
        }
    }
    ContractError::config_validation(prefix, "invalid configuration")
}

/// 校验监听地址
fn validate_listen_address(config: &CollectorConfig) -> Result<(), ContractError> {
    let address = config.bind_address();
    let resolves = address
        .to_socket_addrs()
        .map(|mut addrs| addrs.next().is_some())
        .unwrap_or(false);

    if !resolves {
        return Err(ContractError::config_validation(
            "ListenParams",
            format!("'{}' is not a valid [address]:port", config.listen_address),
        ));
    }
    Ok(())
}

/// 校验本地文件 sink
fn validate_local_fs(config: &CollectorConfig) -> Result<(), ContractError> {
    let local_fs = &config.output.local_fs;
    if local_fs.enabled && local_fs.path.trim().is_empty() {
        return Err(ContractError::config_validation(
            "Output.LocalFS.Path",
            "path is required when LocalFS is enabled",
        ));
    }
    Ok(())
}

/// 校验分布式文件系统 sink
fn validate_dfs(config: &CollectorConfig) -> Result<(), ContractError> {
    let dfs = &config.output.dfs;
    if !dfs.enabled {
        return Ok(());
    }
    if dfs.path.trim().is_empty() {
        return Err(ContractError::config_validation(
            "Output.HDFS.Path",
            "destination url is required when HDFS is enabled",
        ));
    }
    if !dfs.path.contains("://") {
        return Err(ContractError::config_validation(
            "Output.HDFS.Path",
            format!("'{}' is not a url (expected scheme://...)", dfs.path),
        ));
    }
    Ok(())
}

/// 校验消息总线 sink
fn validate_kafka(config: &CollectorConfig) -> Result<(), ContractError> {
    let kafka = &config.output.kafka;
    if !kafka.enabled {
        return Ok(());
    }

    if kafka.broker_list.is_empty() {
        return Err(ContractError::config_validation(
            "Output.Kafka.BrokerList",
            "at least one broker is required when Kafka is enabled",
        ));
    }
    if let Some((idx, _)) = kafka
        .broker_list
        .iter()
        .enumerate()
        .find(|(_, broker)| broker.trim().is_empty())
    {
        return Err(ContractError::config_validation(
            format!("Output.Kafka.BrokerList[{idx}]"),
            "broker address cannot be empty",
        ));
    }
    if kafka.topic.trim().is_empty() {
        return Err(ContractError::config_validation(
            "Output.Kafka.Topic",
            "topic is required when Kafka is enabled",
        ));
    }
    if kafka.message_timeout_ms == 0 {
        return Err(ContractError::config_validation(
            "Output.Kafka.MessageTimeoutMs",
            "message timeout must be > 0",
        ));
    }

    let tls = &kafka.tls;
    if tls.enabled {
        for (field, value) in [
            ("CertFilePath", &tls.cert_file_path),
            ("KeyFilePath", &tls.key_file_path),
            ("CAFilePath", &tls.ca_file_path),
        ] {
            if value.trim().is_empty() {
                return Err(ContractError::config_validation(
                    format!("Output.Kafka.TLS.{field}"),
                    "path is required when TLS is enabled",
                ));
            }
        }
    }
    Ok(())
}
