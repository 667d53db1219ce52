//! Ingestion 错误类型

use thiserror::Error;

/// 单个报文的解码失败原因
///
/// 这些错误只在解码任务内部处理（计数 + 日志），不会跨任务传播。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// 报文长度不足 24 字节，无法解析头部
    #[error("datagram too short for a header: {len} bytes")]
    HeaderTooShort {
        /// 实际收到的字节数
        len: usize,
    },

    /// Version 字段不是 5
    #[error("unsupported export version {version}")]
    UnsupportedVersion {
        /// 报文中的版本号
        version: u16,
    },
}

impl DecodeError {
    /// 用于 metrics 标签的简短原因
    pub fn reason(&self) -> &'static str {
        match self {
            Self::HeaderTooShort { .. } => "header_too_short",
            Self::UnsupportedVersion { .. } => "unsupported_version",
        }
    }
}

/// Ingestion 错误
#[derive(Debug, Error)]
pub enum IngestionError {
    /// 绑定监听地址失败
    #[error("failed to bind {address}: {source}")]
    Bind {
        /// 监听地址
        address: String,
        /// 底层 IO 错误
        #[source]
        source: std::io::Error,
    },

    /// 所有下游队列均已关闭
    #[error("flow fan-out has no open subscribers")]
    ChannelClosed,
}

/// Ingestion Result 类型别名
pub type Result<T> = std::result::Result<T, IngestionError>;
