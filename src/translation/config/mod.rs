//! 自动翻译配置管理模块
//!
//! 默认值 → 配置文件 → 环境变量，逐层覆盖

pub mod manager;

// 重新导出主要类型
pub use manager::{AutoTranslateConfig, ConfigManager};

/// 配置常量
pub mod constants {
    use std::time::Duration;

    // 语言
    pub const DEFAULT_BASE_LANG: &str = "en";

    // 默认API设置
    pub const DEFAULT_API_URL: &str = "http://localhost:3001/api/translate";
    pub const BATCH_PATH_SUFFIX: &str = "/batch";
    pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
    pub const DEFAULT_MAX_RETRY_ATTEMPTS: usize = 2;
    pub const DEFAULT_RETRY_BASE_DELAY: Duration = Duration::from_millis(200);

    // 防抖窗口
    pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);
    pub const DEFAULT_WATCH_DEBOUNCE: Duration = Duration::from_millis(1500);

    // 缓存设置
    pub const DEFAULT_CACHE_SIZE: usize = 5000;
    pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(86400); // 24小时

    // 文本过滤相关
    pub const MIN_TEXT_LENGTH: usize = 1;
    pub const MIN_SUBSTANTIAL_CHARS: usize = 20;

    // 标记属性
    pub const NO_TRANSLATE_ATTR: &str = "data-no-translate";
    pub const STANDARD_TRANSLATE_ATTR: &str = "translate";

    // 文本父元素不可为以下元素
    pub const SKIP_ELEMENTS: &[&str] = &["script", "style", "noscript", "input", "textarea", "select"];

    // 组件库内部结构标记（`属性` 或 `属性=值`）
    pub const SKIP_MARKER_ATTRS: &[&str] = &[
        "data-radix-select-viewport",
        "data-radix-select-content",
        "data-radix-popper-content-wrapper",
        "role=listbox",
        "cmdk-list",
    ];

    // 语言切换器等翻译控制界面的类名片段
    pub const SKIP_CLASS_FRAGMENTS: &[&str] = &[
        "language-switcher",
        "language-selector",
        "lang-switch",
        "translation-control",
        "translate-toggle",
    ];

    // 配置文件搜索路径
    pub const CONFIG_PATHS: &[&str] = &[
        "autotranslate.toml",
        ".autotranslate.toml",
        "config/autotranslate.toml",
        "/etc/autotranslate/autotranslate.toml",
    ];

    // 按顺序尝试，加载第一个存在的
    pub const DOTENV_FILES: &[&str] = &[".env.local", ".env"];
}
