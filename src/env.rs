//! 统一的环境变量管理系统
//!
//! 类型安全、可验证的环境变量；所有变量以 `AUTOTRANSLATE_` 为前缀。

use std::env;
use std::fmt;
use std::time::Duration;

/// 环境变量解析错误
#[derive(Debug, Clone)]
pub struct EnvError {
    pub variable: String,
    pub message: String,
}

impl fmt::Display for EnvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Environment variable '{}': {}", self.variable, self.message)
    }
}

impl std::error::Error for EnvError {}

pub type EnvResult<T> = Result<T, EnvError>;

/// 环境变量访问器特性
pub trait EnvVar<T> {
    const NAME: &'static str;
    const DEFAULT: Option<T>;
    const DESCRIPTION: &'static str;

    fn parse(value: &str) -> EnvResult<T>;

    fn get() -> EnvResult<T> {
        match env::var(Self::NAME) {
            Ok(value) => Self::parse(&value),
            Err(_) => {
                if let Some(default) = Self::DEFAULT {
                    Ok(default)
                } else {
                    Err(EnvError {
                        variable: Self::NAME.to_string(),
                        message: "Required environment variable not set".to_string(),
                    })
                }
            }
        }
    }

    /// 仅在变量被显式设置时返回结果，用于覆盖文件配置
    fn get_if_set() -> Option<EnvResult<T>> {
        env::var(Self::NAME).ok().map(|value| Self::parse(&value))
    }

    fn get_or_default(default: T) -> T {
        Self::get().unwrap_or(default)
    }
}

/// 核心环境变量定义
pub mod core {
    use super::*;

    /// 日志级别
    pub struct LogLevel;
    impl EnvVar<String> for LogLevel {
        const NAME: &'static str = "AUTOTRANSLATE_LOG_LEVEL";
        const DEFAULT: Option<String> = None;

        fn get() -> EnvResult<String> {
            match env::var(Self::NAME) {
                Ok(value) => Self::parse(&value),
                Err(_) => Ok("info".to_string()),
            }
        }
        const DESCRIPTION: &'static str = "Log level: trace, debug, info, warn, error";

        fn parse(value: &str) -> EnvResult<String> {
            match value.to_lowercase().as_str() {
                "trace" | "debug" | "info" | "warn" | "error" => Ok(value.to_lowercase()),
                _ => Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: format!(
                        "Invalid log level '{}'. Use: trace, debug, info, warn, error",
                        value
                    ),
                }),
            }
        }
    }
}

/// 翻译相关环境变量
pub mod translation {
    use super::*;

    /// 基础（源）语言
    pub struct BaseLang;
    impl EnvVar<String> for BaseLang {
        const NAME: &'static str = "AUTOTRANSLATE_BASE_LANG";
        const DEFAULT: Option<String> = None;

        fn get() -> EnvResult<String> {
            match env::var(Self::NAME) {
                Ok(value) => Self::parse(&value),
                Err(_) => Ok("en".to_string()),
            }
        }
        const DESCRIPTION: &'static str = "Base language of the page content (BCP 47 code)";

        fn parse(value: &str) -> EnvResult<String> {
            parse_language(value, Self::NAME)
        }
    }

    /// 单条翻译 API URL
    pub struct ApiUrl;
    impl EnvVar<String> for ApiUrl {
        const NAME: &'static str = "AUTOTRANSLATE_API_URL";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Translation API endpoint URL";

        fn parse(value: &str) -> EnvResult<String> {
            parse_http_url(value, Self::NAME)
        }
    }

    /// 批量翻译 API URL
    pub struct BatchApiUrl;
    impl EnvVar<String> for BatchApiUrl {
        const NAME: &'static str = "AUTOTRANSLATE_BATCH_API_URL";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Batch translation API endpoint URL";

        fn parse(value: &str) -> EnvResult<String> {
            parse_http_url(value, Self::NAME)
        }
    }

    /// 语言切换防抖
    pub struct Debounce;
    impl EnvVar<Duration> for Debounce {
        const NAME: &'static str = "AUTOTRANSLATE_DEBOUNCE_MS";
        const DEFAULT: Option<Duration> = Some(Duration::from_millis(300));
        const DESCRIPTION: &'static str = "Settle delay after a language change, in milliseconds";

        fn parse(value: &str) -> EnvResult<Duration> {
            parse_millis(value, Self::NAME, 0, 10_000)
        }
    }

    /// 新内容防抖
    pub struct WatchDebounce;
    impl EnvVar<Duration> for WatchDebounce {
        const NAME: &'static str = "AUTOTRANSLATE_WATCH_DEBOUNCE_MS";
        const DEFAULT: Option<Duration> = Some(Duration::from_millis(1500));
        const DESCRIPTION: &'static str =
            "Settle delay before sweeping newly inserted content, in milliseconds";

        fn parse(value: &str) -> EnvResult<Duration> {
            parse_millis(value, Self::NAME, 0, 60_000)
        }
    }

    /// 请求超时
    pub struct RequestTimeout;
    impl EnvVar<Duration> for RequestTimeout {
        const NAME: &'static str = "AUTOTRANSLATE_REQUEST_TIMEOUT";
        const DEFAULT: Option<Duration> = Some(Duration::from_secs(10));
        const DESCRIPTION: &'static str = "Translation request timeout in seconds";

        fn parse(value: &str) -> EnvResult<Duration> {
            let seconds: u64 = value.parse().map_err(|_| EnvError {
                variable: Self::NAME.to_string(),
                message: "Must be a valid number of seconds".to_string(),
            })?;

            if seconds == 0 {
                return Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: "Timeout must be greater than 0".to_string(),
                });
            }

            if seconds > 300 {
                return Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: "Timeout too long (max 300 seconds)".to_string(),
                });
            }

            Ok(Duration::from_secs(seconds))
        }
    }

    /// 最大重试次数
    pub struct MaxRetryAttempts;
    impl EnvVar<usize> for MaxRetryAttempts {
        const NAME: &'static str = "AUTOTRANSLATE_MAX_RETRY_ATTEMPTS";
        const DEFAULT: Option<usize> = Some(2);
        const DESCRIPTION: &'static str = "Retries per translation request on retryable errors";

        fn parse(value: &str) -> EnvResult<usize> {
            parse_usize_in_range(value, Self::NAME, 0, 10)
        }
    }

    /// 批量预取
    pub struct BatchPrefetch;
    impl EnvVar<bool> for BatchPrefetch {
        const NAME: &'static str = "AUTOTRANSLATE_BATCH_PREFETCH";
        const DEFAULT: Option<bool> = Some(true);
        const DESCRIPTION: &'static str = "Warm the cache with one batch request per sweep";

        fn parse(value: &str) -> EnvResult<bool> {
            parse_bool(value, Self::NAME)
        }
    }

    /// 禁止翻译标记属性
    pub struct NoTranslateAttr;
    impl EnvVar<String> for NoTranslateAttr {
        const NAME: &'static str = "AUTOTRANSLATE_NO_TRANSLATE_ATTR";
        const DEFAULT: Option<String> = None;
        const DESCRIPTION: &'static str = "Attribute that excludes an element subtree";

        fn parse(value: &str) -> EnvResult<String> {
            let attr = value.trim().to_lowercase();
            if attr.is_empty() || attr.contains(char::is_whitespace) {
                return Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: "Attribute name must be a single non-empty token".to_string(),
                });
            }
            Ok(attr)
        }
    }
}

/// 缓存相关环境变量
pub mod cache {
    use super::*;

    /// 缓存启用状态
    pub struct Enabled;
    impl EnvVar<bool> for Enabled {
        const NAME: &'static str = "AUTOTRANSLATE_CACHE_ENABLED";
        const DEFAULT: Option<bool> = Some(true);
        const DESCRIPTION: &'static str = "Enable the translation cache";

        fn parse(value: &str) -> EnvResult<bool> {
            parse_bool(value, Self::NAME)
        }
    }

    /// 缓存容量
    pub struct Size;
    impl EnvVar<usize> for Size {
        const NAME: &'static str = "AUTOTRANSLATE_CACHE_SIZE";
        const DEFAULT: Option<usize> = Some(5000);
        const DESCRIPTION: &'static str = "Translation cache size (number of entries)";

        fn parse(value: &str) -> EnvResult<usize> {
            parse_usize_in_range(value, Self::NAME, 10, 1_000_000)
        }
    }

    /// 缓存TTL
    pub struct Ttl;
    impl EnvVar<Duration> for Ttl {
        const NAME: &'static str = "AUTOTRANSLATE_CACHE_TTL";
        const DEFAULT: Option<Duration> = Some(Duration::from_secs(86400));
        const DESCRIPTION: &'static str = "Cache TTL in seconds";

        fn parse(value: &str) -> EnvResult<Duration> {
            let seconds: u64 = value.parse().map_err(|_| EnvError {
                variable: Self::NAME.to_string(),
                message: "Must be a valid number of seconds".to_string(),
            })?;

            if seconds < 60 {
                return Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: "TTL too short (minimum 60 seconds)".to_string(),
                });
            }

            if seconds > 86400 * 7 {
                return Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: "TTL too long (maximum 7 days)".to_string(),
                });
            }

            Ok(Duration::from_secs(seconds))
        }
    }
}

fn parse_bool(value: &str, var_name: &str) -> EnvResult<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(EnvError {
            variable: var_name.to_string(),
            message: format!("Invalid boolean '{}'. Use: true/false, 1/0, yes/no, on/off", value),
        }),
    }
}

fn parse_usize_in_range(value: &str, var_name: &str, min: usize, max: usize) -> EnvResult<usize> {
    let num: usize = value.parse().map_err(|_| EnvError {
        variable: var_name.to_string(),
        message: "Must be a valid non-negative integer".to_string(),
    })?;

    if num < min || num > max {
        return Err(EnvError {
            variable: var_name.to_string(),
            message: format!("Value must be between {} and {}", min, max),
        });
    }

    Ok(num)
}

fn parse_millis(value: &str, var_name: &str, min: u64, max: u64) -> EnvResult<Duration> {
    let millis: u64 = value.parse().map_err(|_| EnvError {
        variable: var_name.to_string(),
        message: "Must be a valid number of milliseconds".to_string(),
    })?;

    if millis < min || millis > max {
        return Err(EnvError {
            variable: var_name.to_string(),
            message: format!("Value must be between {} and {} ms", min, max),
        });
    }

    Ok(Duration::from_millis(millis))
}

fn parse_language(value: &str, var_name: &str) -> EnvResult<String> {
    let lang = value.trim().to_lowercase();
    let primary = lang.split(['-', '_']).next().unwrap_or_default();

    if !(2..=3).contains(&primary.len()) || !primary.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(EnvError {
            variable: var_name.to_string(),
            message: "Language code must start with a 2-3 letter ISO 639 code".to_string(),
        });
    }

    Ok(lang)
}

fn parse_http_url(value: &str, var_name: &str) -> EnvResult<String> {
    let url = value.trim();
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(url.to_string())
    } else {
        Err(EnvError {
            variable: var_name.to_string(),
            message: "API URL must start with http:// or https://".to_string(),
        })
    }
}

/// 生成环境变量文档
pub fn generate_env_docs() -> String {
    let mut docs = String::from("Environment variables:\n");

    let mut push = |name: &str, description: &str| {
        docs.push_str(&format!("  {:<36} {}\n", name, description));
    };

    push(core::LogLevel::NAME, core::LogLevel::DESCRIPTION);
    push(translation::BaseLang::NAME, translation::BaseLang::DESCRIPTION);
    push(translation::ApiUrl::NAME, translation::ApiUrl::DESCRIPTION);
    push(translation::BatchApiUrl::NAME, translation::BatchApiUrl::DESCRIPTION);
    push(translation::Debounce::NAME, translation::Debounce::DESCRIPTION);
    push(translation::WatchDebounce::NAME, translation::WatchDebounce::DESCRIPTION);
    push(translation::RequestTimeout::NAME, translation::RequestTimeout::DESCRIPTION);
    push(translation::MaxRetryAttempts::NAME, translation::MaxRetryAttempts::DESCRIPTION);
    push(translation::BatchPrefetch::NAME, translation::BatchPrefetch::DESCRIPTION);
    push(translation::NoTranslateAttr::NAME, translation::NoTranslateAttr::DESCRIPTION);
    push(cache::Enabled::NAME, cache::Enabled::DESCRIPTION);
    push(cache::Size::NAME, cache::Size::DESCRIPTION);
    push(cache::Ttl::NAME, cache::Ttl::DESCRIPTION);

    docs
}
