//! 翻译后端
//!
//! [`Translator`] 是扫描依赖的外部翻译能力。[`HttpTranslator`] 通过 HTTP JSON
//! 接口实现它：
//!
//! ```text
//! POST <api_url>        {text, targetLanguage, sourceLanguage?}
//!                    -> {translatedText, sourceLanguage, targetLanguage, originalText?}
//! POST <batch_api_url>  {texts, targetLanguage, sourceLanguage?}
//!                    -> {translations: [{originalText, translatedText, sourceLanguage, targetLanguage}]}
//! 4xx/5xx            -> {error, message}
//! ```

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use futures::future::{join_all, LocalBoxFuture};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use super::scheduler::{Scheduler, TokioScheduler};
use crate::translation::config::AutoTranslateConfig;
use crate::translation::error::{TranslationError, TranslationResult};

/// 翻译能力
///
/// 所有方法返回本地（非 `Send`）future，调用方在单线程上并发等待它们。
pub trait Translator {
    /// 翻译单条文本
    fn translate<'a>(
        &'a self,
        text: &'a str,
        source_lang: &'a str,
        target_lang: &'a str,
    ) -> LocalBoxFuture<'a, TranslationResult<String>>;

    /// 批量翻译，结果与输入一一对应
    ///
    /// 后端没有给出译文的输入对应空字符串，调用方应跳过。默认实现并发调用 [`Translator::translate`]，任何一条失败则整体失败。
    fn translate_batch<'a>(
        &'a self,
        texts: &'a [String],
        source_lang: &'a str,
        target_lang: &'a str,
    ) -> LocalBoxFuture<'a, TranslationResult<Vec<String>>> {
        Box::pin(async move {
            join_all(
                texts
                    .iter()
                    .map(|text| self.translate(text, source_lang, target_lang)),
            )
            .await
            .into_iter()
            .collect()
        })
    }

    /// 是否有真正的批量接口（只有这种情况下才值得预取）
    fn supports_batch(&self) -> bool {
        false
    }
}

// ============================================================================
// 线上格式
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslateRequest {
    pub text: String,
    pub target_language: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_language: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslateResponse {
    pub translated_text: String,
    #[serde(default)]
    pub source_language: Option<String>,
    #[serde(default)]
    pub target_language: Option<String>,
    #[serde(default)]
    pub original_text: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchTranslateRequest {
    pub texts: Vec<String>,
    pub target_language: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_language: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchTranslation {
    #[serde(default)]
    pub original_text: Option<String>,
    pub translated_text: String,
    #[serde(default)]
    pub source_language: Option<String>,
    #[serde(default)]
    pub target_language: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchTranslateResponse {
    pub translations: Vec<BatchTranslation>,
}

/// 后端错误响应体
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ErrorBody {
    fn describe(&self) -> Option<String> {
        match (&self.error, &self.message) {
            (Some(error), Some(message)) => Some(format!("{}: {}", error, message)),
            (Some(text), None) | (None, Some(text)) => Some(text.clone()),
            (None, None) => None,
        }
    }
}

// ============================================================================
// HTTP 实现
// ============================================================================

/// 基于 reqwest 的 HTTP 翻译后端
///
/// 重试之间的退避经由 [`Scheduler`] 等待。
#[derive(Debug, Clone)]
pub struct HttpTranslator<S = TokioScheduler> {
    client: reqwest::Client,
    api_url: String,
    batch_url: String,
    max_retry_attempts: usize,
    retry_base_delay: Duration,
    scheduler: S,
}

impl HttpTranslator {
    pub fn new(config: &AutoTranslateConfig) -> TranslationResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| TranslationError::ConfigError(format!("创建HTTP客户端失败: {}", e)))?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            batch_url: config.batch_url(),
            max_retry_attempts: config.max_retry_attempts,
            retry_base_delay: config.retry_base_delay(),
            scheduler: TokioScheduler,
        })
    }
}

impl<S: Scheduler> HttpTranslator<S> {
    /// 换用另一个调度器等待重试退避
    pub fn with_scheduler<T: Scheduler>(self, scheduler: T) -> HttpTranslator<T> {
        HttpTranslator {
            client: self.client,
            api_url: self.api_url,
            batch_url: self.batch_url,
            max_retry_attempts: self.max_retry_attempts,
            retry_base_delay: self.retry_base_delay,
            scheduler,
        }
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    async fn translate_one(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> TranslationResult<String> {
        if text.trim().is_empty() {
            return Err(TranslationError::InvalidInput("待翻译文本为空".to_string()));
        }

        let request = TranslateRequest {
            text: text.to_string(),
            target_language: target_lang.to_string(),
            source_language: non_empty(source_lang),
        };

        let response: TranslateResponse = self.post_with_retry(&self.api_url, &request).await?;
        Ok(response.translated_text)
    }

    async fn translate_many(
        &self,
        texts: &[String],
        source_lang: &str,
        target_lang: &str,
    ) -> TranslationResult<Vec<String>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let request = BatchTranslateRequest {
            texts: texts.to_vec(),
            target_language: target_lang.to_string(),
            source_language: non_empty(source_lang),
        };

        let response: BatchTranslateResponse =
            self.post_with_retry(&self.batch_url, &request).await?;

        if response.translations.len() != texts.len() {
            tracing::debug!(
                "批量翻译结果数量不一致: 请求 {}, 返回 {}",
                texts.len(),
                response.translations.len()
            );
        }

        Ok(match_batch(texts, response.translations))
    }

    /// 发送请求，可重试错误按指数退避重试
    async fn post_with_retry<Req, Resp>(&self, url: &str, body: &Req) -> TranslationResult<Resp>
    where
        Req: Serialize,
        Resp: DeserializeOwned,
    {
        let mut attempt = 0usize;

        loop {
            match self.post_once(url, body).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_retryable() && attempt < self.max_retry_attempts => {
                    attempt += 1;
                    let delay = self
                        .retry_base_delay
                        .saturating_mul(1u32 << (attempt - 1).min(16));
                    tracing::warn!(
                        "翻译请求失败，{}ms后重试 (重试 {}/{}): {}",
                        delay.as_millis(),
                        attempt,
                        self.max_retry_attempts,
                        e
                    );
                    self.scheduler.delay(delay).await;
                }
                Err(e) => return Err(e.with_context(url)),
            }
        }
    }

    async fn post_once<Req, Resp>(&self, url: &str, body: &Req) -> TranslationResult<Resp>
    where
        Req: Serialize,
        Resp: DeserializeOwned,
    {
        let response = self.client.post(url).json(body).send().await?;
        let status = response.status();

        if !status.is_success() {
            let raw = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&raw)
                .ok()
                .and_then(|body| body.describe())
                .unwrap_or(raw);

            return Err(TranslationError::HttpStatus {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json::<Resp>().await?)
    }
}

impl<S: Scheduler> Translator for HttpTranslator<S> {
    fn translate<'a>(
        &'a self,
        text: &'a str,
        source_lang: &'a str,
        target_lang: &'a str,
    ) -> LocalBoxFuture<'a, TranslationResult<String>> {
        Box::pin(self.translate_one(text, source_lang, target_lang))
    }

    fn translate_batch<'a>(
        &'a self,
        texts: &'a [String],
        source_lang: &'a str,
        target_lang: &'a str,
    ) -> LocalBoxFuture<'a, TranslationResult<Vec<String>>> {
        Box::pin(self.translate_many(texts, source_lang, target_lang))
    }

    fn supports_batch(&self) -> bool {
        true
    }
}

/// 按 `originalText` 把批量结果对回输入
///
/// 缺少 `originalText` 的条目按位置对应；原文不在输入中的条目被丢弃。
fn match_batch(texts: &[String], translations: Vec<BatchTranslation>) -> Vec<String> {
    let inputs: HashSet<&str> = texts.iter().map(String::as_str).collect();
    let mut by_original: HashMap<String, String> = HashMap::new();
    let mut by_position: Vec<Option<String>> = vec![None; texts.len()];

    for (index, entry) in translations.into_iter().enumerate() {
        match entry.original_text {
            Some(original) if inputs.contains(original.as_str()) => {
                by_original.entry(original).or_insert(entry.translated_text);
            }
            Some(original) => {
                tracing::debug!("忽略不属于本次请求的批量结果: {:?}", original);
            }
            None => {
                if let Some(slot) = by_position.get_mut(index) {
                    *slot = Some(entry.translated_text);
                }
            }
        }
    }

    texts
        .iter()
        .zip(by_position)
        .map(|(text, positional)| {
            by_original
                .get(text)
                .cloned()
                .or(positional)
                .unwrap_or_default()
        })
        .collect()
}

fn non_empty(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}
