//! 配置管理器
//!
//! 统一的配置接口：内置默认值、TOML 配置文件（经 `config` crate 合并）、
//! `AUTOTRANSLATE_*` 环境变量。

use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, File, FileFormat};
use serde::{Deserialize, Serialize};

use super::constants;
use crate::translation::error::{helpers::config_error, TranslationResult};

/// 自动翻译配置
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct AutoTranslateConfig {
    // 语言
    pub base_lang: String,
    /// 额外视为基础语言的标签（例如 `en-US`），切换到它们时还原原文
    pub base_lang_aliases: Vec<String>,

    // 后端
    pub api_url: String,
    pub batch_api_url: Option<String>,
    pub request_timeout_secs: u64,
    pub max_retry_attempts: usize,
    pub retry_base_delay_ms: u64,

    // 调度
    pub debounce_ms: u64,
    pub watch_debounce_ms: u64,

    // 缓存
    pub cache_enabled: bool,
    pub cache_size: usize,
    pub cache_ttl_secs: u64,
    pub batch_prefetch: bool,

    // 扫描策略
    pub no_translate_attr: String,
    pub min_substantial_chars: usize,
    pub require_child_elements: bool,
    pub skip_class_fragments: Vec<String>,
    pub skip_marker_attrs: Vec<String>,
}

impl Default for AutoTranslateConfig {
    fn default() -> Self {
        Self {
            base_lang: constants::DEFAULT_BASE_LANG.to_string(),
            base_lang_aliases: Vec::new(),

            api_url: constants::DEFAULT_API_URL.to_string(),
            batch_api_url: None,
            request_timeout_secs: constants::DEFAULT_REQUEST_TIMEOUT.as_secs(),
            max_retry_attempts: constants::DEFAULT_MAX_RETRY_ATTEMPTS,
            retry_base_delay_ms: constants::DEFAULT_RETRY_BASE_DELAY.as_millis() as u64,

            debounce_ms: constants::DEFAULT_DEBOUNCE.as_millis() as u64,
            watch_debounce_ms: constants::DEFAULT_WATCH_DEBOUNCE.as_millis() as u64,

            cache_enabled: true,
            cache_size: constants::DEFAULT_CACHE_SIZE,
            cache_ttl_secs: constants::DEFAULT_CACHE_TTL.as_secs(),
            batch_prefetch: true,

            no_translate_attr: constants::NO_TRANSLATE_ATTR.to_string(),
            min_substantial_chars: constants::MIN_SUBSTANTIAL_CHARS,
            require_child_elements: true,
            skip_class_fragments: to_strings(constants::SKIP_CLASS_FRAGMENTS),
            skip_marker_attrs: to_strings(constants::SKIP_MARKER_ATTRS),
        }
    }
}

impl AutoTranslateConfig {
    /// 验证配置
    pub fn validate(&self) -> TranslationResult<()> {
        if self.base_lang.trim().is_empty() {
            return Err(config_error("基础语言不能为空"));
        }

        for api_url in std::iter::once(&self.api_url).chain(self.batch_api_url.iter()) {
            let parsed = url::Url::parse(api_url)
                .map_err(|e| config_error(format!("无效的API URL '{}': {}", api_url, e)))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(config_error(format!("API URL 必须使用 http(s): {}", api_url)));
            }
        }

        if self.request_timeout_secs == 0 {
            return Err(config_error("请求超时必须大于0"));
        }

        if self.cache_enabled && self.cache_size == 0 {
            return Err(config_error("启用缓存时缓存大小不能为0"));
        }

        if self.watch_debounce_ms < self.debounce_ms {
            return Err(config_error(format!(
                "新内容防抖 ({}ms) 不能短于语言切换防抖 ({}ms)",
                self.watch_debounce_ms, self.debounce_ms
            )));
        }

        if self.no_translate_attr.trim().is_empty() {
            return Err(config_error("禁止翻译标记属性不能为空"));
        }

        Ok(())
    }

    /// 应用环境变量覆盖
    ///
    /// 只有显式设置的变量才会覆盖；无法解析的值记录警告后忽略。
    pub fn apply_env_overrides(&mut self) {
        use crate::env::{cache, translation, EnvVar};

        fn take<T>(value: Option<crate::env::EnvResult<T>>) -> Option<T> {
            match value? {
                Ok(value) => Some(value),
                Err(e) => {
                    tracing::warn!("忽略环境变量: {}", e);
                    None
                }
            }
        }

        if let Some(base_lang) = take(translation::BaseLang::get_if_set()) {
            self.base_lang = base_lang;
        }

        if let Some(api_url) = take(translation::ApiUrl::get_if_set()) {
            tracing::info!("环境变量覆盖 API URL: {}", api_url);
            self.api_url = api_url;
        }

        if let Some(batch_api_url) = take(translation::BatchApiUrl::get_if_set()) {
            self.batch_api_url = Some(batch_api_url);
        }

        if let Some(debounce) = take(translation::Debounce::get_if_set()) {
            self.debounce_ms = debounce.as_millis() as u64;
        }

        if let Some(watch_debounce) = take(translation::WatchDebounce::get_if_set()) {
            self.watch_debounce_ms = watch_debounce.as_millis() as u64;
        }

        if let Some(timeout) = take(translation::RequestTimeout::get_if_set()) {
            self.request_timeout_secs = timeout.as_secs();
        }

        if let Some(attempts) = take(translation::MaxRetryAttempts::get_if_set()) {
            self.max_retry_attempts = attempts;
        }

        if let Some(prefetch) = take(translation::BatchPrefetch::get_if_set()) {
            self.batch_prefetch = prefetch;
        }

        if let Some(attr) = take(translation::NoTranslateAttr::get_if_set()) {
            self.no_translate_attr = attr;
        }

        // 缓存相关环境变量
        if let Some(enabled) = take(cache::Enabled::get_if_set()) {
            self.cache_enabled = enabled;
        }

        if let Some(size) = take(cache::Size::get_if_set()) {
            self.cache_size = size;
        }

        if let Some(ttl) = take(cache::Ttl::get_if_set()) {
            self.cache_ttl_secs = ttl.as_secs();
        }
    }

    /// 批量接口地址，未配置时为 `<api_url>/batch`
    pub fn batch_url(&self) -> String {
        match &self.batch_api_url {
            Some(url) => url.clone(),
            None => format!(
                "{}{}",
                self.api_url.trim_end_matches('/'),
                constants::BATCH_PATH_SUFFIX
            ),
        }
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn watch_debounce(&self) -> Duration {
        Duration::from_millis(self.watch_debounce_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

/// 配置管理器
#[derive(Debug, Clone)]
pub struct ConfigManager {
    config: AutoTranslateConfig,
    source: Option<PathBuf>,
}

impl ConfigManager {
    /// 从搜索路径、`.env` 与环境变量加载
    pub fn load() -> TranslationResult<Self> {
        Self::load_dotenv();

        let source = constants::CONFIG_PATHS
            .iter()
            .map(PathBuf::from)
            .find(|path| path.exists());

        let mut config = match &source {
            Some(path) => {
                tracing::info!("加载配置文件: {}", path.display());
                Self::read_file(path)?
            }
            None => {
                tracing::info!("未找到配置文件，使用默认配置");
                AutoTranslateConfig::default()
            }
        };

        config.apply_env_overrides();
        config.validate()?;

        Ok(Self { config, source })
    }

    /// 从显式指定的文件加载（文件必须存在）
    pub fn load_from_path(path: impl AsRef<Path>) -> TranslationResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(config_error(format!("配置文件不存在: {}", path.display())));
        }

        Self::load_dotenv();
        tracing::info!("加载配置文件: {}", path.display());

        let mut config = Self::read_file(path)?;
        config.apply_env_overrides();
        config.validate()?;

        Ok(Self {
            config,
            source: Some(path.to_path_buf()),
        })
    }

    /// 从 TOML 字符串构建（不读取环境变量）
    pub fn from_toml_str(content: &str) -> TranslationResult<Self> {
        let config = Self::merge(File::from_str(content, FileFormat::Toml))?;
        config.validate()?;

        Ok(Self {
            config,
            source: None,
        })
    }

    /// 获取配置
    pub fn config(&self) -> &AutoTranslateConfig {
        &self.config
    }

    pub fn into_config(self) -> AutoTranslateConfig {
        self.config
    }

    /// 配置来源文件
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// 默认配置的 TOML 文本
    pub fn example_config() -> TranslationResult<String> {
        toml::to_string_pretty(&AutoTranslateConfig::default())
            .map_err(|e| config_error(format!("序列化配置失败: {}", e)))
    }

    /// 生成示例配置文件
    pub fn generate_example_config(path: impl AsRef<Path>) -> TranslationResult<()> {
        std::fs::write(path, Self::example_config()?)?;
        Ok(())
    }

    fn read_file(path: &Path) -> TranslationResult<AutoTranslateConfig> {
        Self::merge(File::from(path).format(FileFormat::Toml))
    }

    fn merge<S>(file: S) -> TranslationResult<AutoTranslateConfig>
    where
        S: config::Source + Send + Sync + 'static,
    {
        let settings = Config::builder()
            .add_source(Config::try_from(&AutoTranslateConfig::default())?)
            .add_source(file)
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// 加载 .env 文件
    fn load_dotenv() {
        for env_file in constants::DOTENV_FILES {
            if Path::new(env_file).exists() && dotenv::from_filename(env_file).is_ok() {
                tracing::info!("已加载环境变量文件: {}", env_file);
                break;
            }
        }
    }
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}
