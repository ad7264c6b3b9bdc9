//! 翻译模块统一错误处理
//!
//! 扫描本身从不失败：这里的错误只在翻译后端、配置加载和CLI中传播，
//! 到达扫描编排器之前就会被翻译服务降级为"保留原文"。

use std::fmt;

use thiserror::Error;

use crate::env::EnvError;

/// 翻译错误类型
#[derive(Error, Debug, Clone)]
pub enum TranslationError {
    /// 配置错误
    #[error("配置错误: {0}")]
    ConfigError(String),

    /// 连接失败、请求未送达
    #[error("网络错误: {0}")]
    NetworkError(String),

    /// 请求超时
    #[error("操作超时: {0}")]
    TimeoutError(String),

    /// 后端返回非成功状态码，`message` 取自 `{error, message}` 响应体
    #[error("翻译后端返回 {status}: {message}")]
    HttpStatus { status: u16, message: String },

    /// 后端对非空文本返回了空译文
    #[error("后端返回空译文: {text:?}")]
    EmptyTranslation { text: String },

    #[error("输入无效: {0}")]
    InvalidInput(String),

    /// 响应或配置文件格式不符
    #[error("解析错误: {0}")]
    ParseError(String),

    #[error("序列化错误: {0}")]
    SerializationError(String),
}

impl TranslationError {
    /// 暂时性错误（连接、超时、限流、5xx、空译文）值得重试
    pub fn is_retryable(&self) -> bool {
        match self {
            TranslationError::NetworkError(_)
            | TranslationError::TimeoutError(_)
            | TranslationError::EmptyTranslation { .. } => true,
            TranslationError::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// 严重程度，决定 [`helpers::log_error`] 使用的日志级别
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            TranslationError::ConfigError(_) => ErrorSeverity::Critical,
            TranslationError::HttpStatus { status, .. } if *status < 500 && *status != 429 => {
                ErrorSeverity::Error
            }
            TranslationError::ParseError(_) | TranslationError::SerializationError(_) => {
                ErrorSeverity::Error
            }
            TranslationError::InvalidInput(_) => ErrorSeverity::Info,
            _ => ErrorSeverity::Warning,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            TranslationError::ConfigError(_) => ErrorCategory::Configuration,
            TranslationError::NetworkError(_) | TranslationError::TimeoutError(_) => {
                ErrorCategory::Transport
            }
            TranslationError::HttpStatus { status: 429, .. } => ErrorCategory::RateLimit,
            TranslationError::HttpStatus { .. } | TranslationError::EmptyTranslation { .. } => {
                ErrorCategory::Backend
            }
            TranslationError::InvalidInput(_) => ErrorCategory::Input,
            TranslationError::ParseError(_) | TranslationError::SerializationError(_) => {
                ErrorCategory::Format
            }
        }
    }

    /// 在错误信息后附加上下文（例如请求地址），保持原有变体
    pub fn with_context<T: fmt::Display>(self, context: T) -> Self {
        let annotate = |message: String| format!("{} (上下文: {})", message, context);

        match self {
            TranslationError::ConfigError(msg) => TranslationError::ConfigError(annotate(msg)),
            TranslationError::NetworkError(msg) => TranslationError::NetworkError(annotate(msg)),
            TranslationError::TimeoutError(msg) => TranslationError::TimeoutError(annotate(msg)),
            TranslationError::HttpStatus { status, message } => TranslationError::HttpStatus {
                status,
                message: annotate(message),
            },
            TranslationError::InvalidInput(msg) => TranslationError::InvalidInput(annotate(msg)),
            TranslationError::ParseError(msg) => TranslationError::ParseError(annotate(msg)),
            TranslationError::SerializationError(msg) => {
                TranslationError::SerializationError(annotate(msg))
            }
            empty @ TranslationError::EmptyTranslation { .. } => empty,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Configuration,
    Transport,
    RateLimit,
    Backend,
    Input,
    Format,
}

impl From<reqwest::Error> for TranslationError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            TranslationError::TimeoutError(error.to_string())
        } else if error.is_decode() {
            TranslationError::SerializationError(error.to_string())
        } else if let Some(status) = error.status() {
            TranslationError::HttpStatus {
                status: status.as_u16(),
                message: error.to_string(),
            }
        } else {
            TranslationError::NetworkError(error.to_string())
        }
    }
}

/// 只出现在读写配置文件时
impl From<std::io::Error> for TranslationError {
    fn from(error: std::io::Error) -> Self {
        TranslationError::ConfigError(format!("IO错误: {}", error))
    }
}

impl From<serde_json::Error> for TranslationError {
    fn from(error: serde_json::Error) -> Self {
        TranslationError::SerializationError(format!("JSON序列化错误: {}", error))
    }
}

impl From<toml::de::Error> for TranslationError {
    fn from(error: toml::de::Error) -> Self {
        TranslationError::ParseError(format!("TOML解析错误: {}", error))
    }
}

impl From<config::ConfigError> for TranslationError {
    fn from(error: config::ConfigError) -> Self {
        TranslationError::ConfigError(error.to_string())
    }
}

impl From<EnvError> for TranslationError {
    fn from(error: EnvError) -> Self {
        TranslationError::ConfigError(error.to_string())
    }
}

/// 错误结果类型别名
pub type TranslationResult<T> = Result<T, TranslationError>;

/// 错误处理助手函数
pub mod helpers {
    use super::*;

    /// 按严重程度记录错误
    pub fn log_error(error: &TranslationError) {
        match error.severity() {
            ErrorSeverity::Info => tracing::info!(category = ?error.category(), "{}", error),
            ErrorSeverity::Warning => tracing::warn!(category = ?error.category(), "{}", error),
            ErrorSeverity::Error | ErrorSeverity::Critical => {
                tracing::error!(category = ?error.category(), "{}", error)
            }
        }
    }

    /// 创建配置错误
    pub fn config_error<T: fmt::Display>(msg: T) -> TranslationError {
        TranslationError::ConfigError(msg.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status_classification() {
        let throttled = TranslationError::HttpStatus {
            status: 429,
            message: "slow down".to_string(),
        };
        assert!(throttled.is_retryable());
        assert_eq!(throttled.category(), ErrorCategory::RateLimit);

        let bad_request = TranslationError::HttpStatus {
            status: 400,
            message: "text is required".to_string(),
        };
        assert!(!bad_request.is_retryable());
        assert_eq!(bad_request.severity(), ErrorSeverity::Error);
        assert_eq!(bad_request.category(), ErrorCategory::Backend);

        let unavailable = TranslationError::HttpStatus {
            status: 503,
            message: "down".to_string(),
        };
        assert!(unavailable.is_retryable());
        assert_eq!(unavailable.severity(), ErrorSeverity::Warning);
    }

    #[test]
    fn test_with_context_keeps_variant() {
        let error = TranslationError::NetworkError("connection refused".to_string())
            .with_context("POST /api/translate");

        assert!(matches!(error, TranslationError::NetworkError(_)));
        assert!(error.to_string().contains("POST /api/translate"));
        assert_eq!(error.category(), ErrorCategory::Transport);
    }

    #[test]
    fn test_io_error_is_configuration_problem() {
        let error: TranslationError =
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only").into();

        assert_eq!(error.category(), ErrorCategory::Configuration);
        assert_eq!(error.severity(), ErrorSeverity::Critical);
        assert!(!error.is_retryable());
    }

    #[test]
    fn test_empty_translation_is_retryable_warning() {
        let error = TranslationError::EmptyTranslation {
            text: "Hello".to_string(),
        };
        assert!(error.is_retryable());
        assert_eq!(error.severity(), ErrorSeverity::Warning);
        assert!(error.to_string().contains("\"Hello\""));
    }
}
