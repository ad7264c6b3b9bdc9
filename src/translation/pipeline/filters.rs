//! 文本过滤器模块
//!
//! 启发式地识别技术性内容（URL、CSS长度、十六进制颜色），
//! 这类文本不送去翻译。只做整串匹配："Debug: 42px" 仍然是可翻译文本。

use std::sync::OnceLock;

use regex::Regex;

use crate::translation::config::constants;

/// 文本被过滤的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterReason {
    Empty,
    TooShort,
    Url,
    CssLength,
    HexColor,
}

/// 文本过滤器
pub struct TextFilter {
    min_text_length: usize,
    regex_cache: RegexCache,
}

/// 正则表达式缓存
#[derive(Default)]
struct RegexCache {
    url_regex: OnceLock<Option<Regex>>,
    css_length_regex: OnceLock<Option<Regex>>,
    hex_color_regex: OnceLock<Option<Regex>>,
}

fn compile<'a>(cell: &'a OnceLock<Option<Regex>>, pattern: &str) -> Option<&'a Regex> {
    cell.get_or_init(|| match Regex::new(pattern) {
        Ok(regex) => Some(regex),
        Err(e) => {
            tracing::error!("过滤规则编译失败 {}: {}", pattern, e);
            None
        }
    })
    .as_ref()
}

impl TextFilter {
    /// 创建新的文本过滤器
    pub fn new() -> Self {
        Self::with_min_length(constants::MIN_TEXT_LENGTH)
    }

    pub fn with_min_length(min_text_length: usize) -> Self {
        Self {
            min_text_length: min_text_length.max(1),
            regex_cache: RegexCache::default(),
        }
    }

    /// 判断文本是否需要翻译
    pub fn should_translate(&self, text: &str) -> bool {
        self.check(text).is_ok()
    }

    /// 检查文本，返回被过滤的原因
    pub fn check(&self, text: &str) -> Result<(), FilterReason> {
        let trimmed = text.trim();

        if trimmed.is_empty() {
            return Err(FilterReason::Empty);
        }

        if trimmed.chars().count() < self.min_text_length {
            return Err(FilterReason::TooShort);
        }

        match self.technical_kind(trimmed) {
            Some(reason) => Err(reason),
            None => Ok(()),
        }
    }

    /// 文本是否像技术性内容
    pub fn is_technical(&self, text: &str) -> bool {
        self.technical_kind(text.trim()).is_some()
    }

    fn technical_kind(&self, trimmed: &str) -> Option<FilterReason> {
        let lowered = trimmed.to_lowercase();

        if self.is_url(&lowered) {
            Some(FilterReason::Url)
        } else if self.is_css_length(&lowered) {
            Some(FilterReason::CssLength)
        } else if self.is_hex_color(&lowered) {
            Some(FilterReason::HexColor)
        } else {
            None
        }
    }

    /// 检查是否为URL
    fn is_url(&self, text: &str) -> bool {
        if text.contains(char::is_whitespace) {
            return false;
        }

        compile(&self.regex_cache.url_regex, r"^(https?://|ftp://|www\.)\S+$")
            .map_or(false, |regex| regex.is_match(text))
    }

    /// 检查是否为CSS长度字面量，如 `12px`、`1.5rem`、`-0.5em`、`100%`
    fn is_css_length(&self, text: &str) -> bool {
        compile(
            &self.regex_cache.css_length_regex,
            r"^-?([0-9]+(\.[0-9]+)?|\.[0-9]+)(px|rem|em|vh|vw|%)$",
        )
        .map_or(false, |regex| regex.is_match(text))
    }

    /// 检查是否为十六进制颜色
    fn is_hex_color(&self, text: &str) -> bool {
        compile(
            &self.regex_cache.hex_color_regex,
            r"^#([0-9a-f]{3}|[0-9a-f]{4}|[0-9a-f]{6}|[0-9a-f]{8})$",
        )
        .map_or(false, |regex| regex.is_match(text))
    }
}

impl Default for TextFilter {
    fn default() -> Self {
        Self::new()
    }
}
