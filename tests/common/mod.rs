// 集成测试公共模块
//
// HTML样例、字典驱动的模拟翻译后端、计数文档适配器和组装好的测试环境

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;
use std::time::Duration;

use futures::future::LocalBoxFuture;
use markup5ever_rcdom::Handle;

use dom_autotranslate::parsers::html::{
    get_node_name, text_content, DocumentAdapter, InsertionCallback, LiveDocument, ObserverHandle,
};
use dom_autotranslate::translation::{
    AutoTranslateConfig, DomScanner, OriginalTextRegistry, SweepOrchestrator, TranslationCache,
    TranslationError, TranslationResult, TranslationService, Translator,
};

/// HTML 样例
pub struct Fixtures;

impl Fixtures {
    /// 一个可翻译段落，一个带禁止翻译标记的段落
    pub const SCENARIO: &'static str = "<html><head></head><body>\
        <p>Hello</p><p data-no-translate>Debug: 42px</p></body></html>";

    pub const ARTICLE: &'static str = "<html><head><title>News</title></head><body>\
        <nav class=\"language-switcher\"><a>English</a><a>Français</a></nav>\
        <main><h1>Welcome</h1><p>Hello</p><p>  Good morning  </p><p>Hello</p>\
        <pre data-no-translate><code>let x = 1;</code></pre><p>12px</p></main>\
        </body></html>";

    pub const FEED: &'static str = "<html><head></head><body>\
        <main id=\"feed\"><p>Hello</p></main></body></html>";

    /// 一段实质性的新内容
    pub const LATE_ARTICLE: &'static str =
        "<article><h2>Good morning</h2><p>Welcome to the evening edition</p></article>";
}

/// 字典驱动的模拟翻译后端
#[derive(Clone, Default)]
pub struct MockTranslator {
    dictionary: Rc<HashMap<(String, String), String>>,
    failing: Rc<HashSet<String>>,
    latency: Option<Duration>,
    batch: bool,
    calls: Rc<RefCell<Vec<String>>>,
    batch_calls: Rc<Cell<usize>>,
}

impl MockTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    /// 常用的 en → fr/de 字典
    pub fn french_and_german() -> Self {
        Self::new()
            .with("Hello", "fr", "Bonjour")
            .with("Good morning", "fr", "Bon matin")
            .with("Welcome", "fr", "Bienvenue")
            .with("Welcome to the evening edition", "fr", "Bienvenue dans l'édition du soir")
            .with("Hello", "de", "Hallo")
            .with("Welcome", "de", "Willkommen")
    }

    pub fn with(mut self, text: &str, lang: &str, translation: &str) -> Self {
        Rc::make_mut(&mut self.dictionary).insert(
            (text.to_string(), lang.to_string()),
            translation.to_string(),
        );
        self
    }

    /// 对该文本的请求返回错误
    pub fn failing_on(mut self, text: &str) -> Self {
        Rc::make_mut(&mut self.failing).insert(text.to_string());
        self
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn with_batch_support(mut self) -> Self {
        self.batch = true;
        self
    }

    /// 单条翻译调用记录
    pub fn calls(&self) -> Rc<RefCell<Vec<String>>> {
        self.calls.clone()
    }

    pub fn batch_calls(&self) -> Rc<Cell<usize>> {
        self.batch_calls.clone()
    }

    fn lookup(&self, text: &str, target_lang: &str) -> TranslationResult<String> {
        if self.failing.contains(text) {
            return Err(TranslationError::HttpStatus {
                status: 503,
                message: format!("backend unavailable for {:?}", text),
            });
        }

        Ok(self
            .dictionary
            .get(&(text.to_string(), target_lang.to_string()))
            .cloned()
            .unwrap_or_else(|| text.to_string()))
    }
}

impl Translator for MockTranslator {
    fn translate<'a>(
        &'a self,
        text: &'a str,
        _source_lang: &'a str,
        target_lang: &'a str,
    ) -> LocalBoxFuture<'a, TranslationResult<String>> {
        Box::pin(async move {
            self.calls.borrow_mut().push(text.to_string());
            if let Some(latency) = self.latency {
                tokio::time::sleep(latency).await;
            }
            self.lookup(text, target_lang)
        })
    }

    fn translate_batch<'a>(
        &'a self,
        texts: &'a [String],
        _source_lang: &'a str,
        target_lang: &'a str,
    ) -> LocalBoxFuture<'a, TranslationResult<Vec<String>>> {
        Box::pin(async move {
            self.batch_calls.set(self.batch_calls.get() + 1);
            texts
                .iter()
                .map(|text| self.lookup(text, target_lang))
                .collect()
        })
    }

    fn supports_batch(&self) -> bool {
        self.batch
    }
}

/// 统计文本写入次数的文档适配器
pub struct CountingDocument {
    inner: Rc<LiveDocument>,
    writes: Cell<usize>,
}

impl CountingDocument {
    pub fn new(inner: Rc<LiveDocument>) -> Self {
        Self {
            inner,
            writes: Cell::new(0),
        }
    }

    pub fn writes(&self) -> usize {
        self.writes.get()
    }
}

impl DocumentAdapter for CountingDocument {
    fn document(&self) -> Handle {
        self.inner.document()
    }

    fn set_text(&self, node: &Handle, text: &str) -> bool {
        self.writes.set(self.writes.get() + 1);
        self.inner.set_text(node, text)
    }

    fn observe_insertions(&self, root: &Handle, callback: InsertionCallback) -> ObserverHandle {
        self.inner.observe_insertions(root, callback)
    }
}

/// 组装好的测试环境
pub struct TestEnvironment {
    pub config: AutoTranslateConfig,
    pub document: Rc<LiveDocument>,
    pub counting: Rc<CountingDocument>,
    pub service: Rc<TranslationService>,
    pub registry: Rc<OriginalTextRegistry>,
    pub orchestrator: Rc<SweepOrchestrator>,
}

impl TestEnvironment {
    pub fn new(html: &str, translator: MockTranslator) -> Self {
        Self::with_service(html, |cache| {
            TranslationService::new(Box::new(translator), cache, "en")
        })
    }

    pub fn with_service(
        html: &str,
        build: impl FnOnce(Rc<TranslationCache>) -> TranslationService,
    ) -> Self {
        let config = AutoTranslateConfig::default();
        let document = Rc::new(LiveDocument::parse(html));
        let counting = Rc::new(CountingDocument::new(document.clone()));
        let cache = Rc::new(TranslationCache::from_config(&config));
        let service = Rc::new(build(cache));
        let registry = Rc::new(OriginalTextRegistry::new());
        let orchestrator = Rc::new(SweepOrchestrator::new(
            counting.clone(),
            DomScanner::from_config(&config),
            service.clone(),
            registry.clone(),
        ));

        Self {
            config,
            document,
            counting,
            service,
            registry,
            orchestrator,
        }
    }

    /// 文档中所有 `tag` 元素的文本内容（文档顺序）
    pub fn texts_of(&self, tag: &str) -> Vec<String> {
        elements_named(&self.document.document(), tag)
            .iter()
            .map(text_content)
            .collect()
    }

    pub fn first(&self, tag: &str) -> Handle {
        elements_named(&self.document.document(), tag).remove(0)
    }
}

/// 以文档顺序收集指定名称的元素
pub fn elements_named(root: &Handle, tag: &str) -> Vec<Handle> {
    let mut found = Vec::new();
    let mut stack = vec![root.clone()];

    while let Some(node) = stack.pop() {
        if get_node_name(&node) == Some(tag) {
            found.push(node.clone());
        }
        stack.extend(node.children.borrow().iter().rev().cloned());
    }

    found
}
