//! 扫描编排器
//!
//! 一次扫描的状态机：
//!
//! ```text
//! Idle → Scanning → Translating → Applying → Idle
//! ```
//!
//! 非 Idle 状态下收到的扫描请求直接丢弃（不排队）。切到基础语言时跳过扫描和翻译，
//! 直接把所有有原文记录的节点还原。所有翻译结束之后才开始写回，写回期间没有挂起点，
//! 用户看到的是一次性切换而不是逐个节点闪烁。

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use futures::future::join_all;
use markup5ever_rcdom::Handle;

use super::service::{TranslationOutcome, TranslationService};
use crate::parsers::html::{get_text, is_attached, DocumentAdapter};
use crate::translation::pipeline::{DomScanner, EligibleTextNode};
use crate::translation::storage::OriginalTextRegistry;

/// 扫描阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepPhase {
    Idle,
    Scanning,
    Translating,
    Applying,
}

/// 一次扫描的统计
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepReport {
    /// 扫描到的可翻译节点
    pub scanned: usize,
    /// 去重后的翻译请求数
    pub requested: usize,
    /// 写回的节点
    pub applied: usize,
    /// 译文与当前文本相同，无需写回
    pub unchanged: usize,
    /// 翻译失败，保留当前文本
    pub failed: usize,
    /// 扫描后被外部移除或改写的节点
    pub stale: usize,
}

/// 扫描结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SweepOutcome {
    /// 完成翻译并写回
    Applied(SweepReport),
    /// 切回基础语言，`restored` 个节点被还原
    Restored { restored: usize },
    /// 没有可翻译的节点
    NothingToTranslate,
    /// 已有扫描在进行，本次请求被丢弃
    Dropped,
}

/// 累计统计
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepStats {
    pub sweeps: u64,
    pub dropped: u64,
    pub restores: u64,
    pub nodes_applied: u64,
    pub nodes_restored: u64,
    pub nodes_failed: u64,
    pub nodes_stale: u64,
}

/// 扫描期间持有；无论正常结束还是 future 被中途丢弃都回到 Idle
struct PhaseGuard<'a> {
    phase: &'a Cell<SweepPhase>,
}

impl<'a> PhaseGuard<'a> {
    fn enter(phase: &'a Cell<SweepPhase>) -> Self {
        phase.set(SweepPhase::Scanning);
        Self { phase }
    }

    fn advance(&self, next: SweepPhase) {
        tracing::trace!("扫描阶段: {:?} → {:?}", self.phase.get(), next);
        self.phase.set(next);
    }
}

impl Drop for PhaseGuard<'_> {
    fn drop(&mut self) {
        self.phase.set(SweepPhase::Idle);
    }
}

struct PendingWrite {
    node: Handle,
    /// 扫描时节点的内容
    current: String,
    /// 记录中的原文（含首尾空白）
    original: String,
    /// 去重后的请求下标
    request: usize,
}

/// 扫描编排器
pub struct SweepOrchestrator {
    document: Rc<dyn DocumentAdapter>,
    scanner: DomScanner,
    service: Rc<TranslationService>,
    registry: Rc<OriginalTextRegistry>,
    base_lang: String,
    root: RefCell<Option<Handle>>,
    phase: Cell<SweepPhase>,
    stats: RefCell<SweepStats>,
}

impl SweepOrchestrator {
    pub fn new(
        document: Rc<dyn DocumentAdapter>,
        scanner: DomScanner,
        service: Rc<TranslationService>,
        registry: Rc<OriginalTextRegistry>,
    ) -> Self {
        let base_lang = service.source_lang().to_string();
        Self {
            document,
            scanner,
            service,
            registry,
            base_lang,
            root: RefCell::new(None),
            phase: Cell::new(SweepPhase::Idle),
            stats: RefCell::new(SweepStats::default()),
        }
    }

    /// 限定扫描根（默认 `<body>`）
    pub fn with_root(self, root: Handle) -> Self {
        *self.root.borrow_mut() = Some(root);
        self
    }

    pub fn root(&self) -> Handle {
        self.root
            .borrow()
            .clone()
            .unwrap_or_else(|| self.document.body())
    }

    pub fn document(&self) -> &Rc<dyn DocumentAdapter> {
        &self.document
    }

    pub fn scanner(&self) -> &DomScanner {
        &self.scanner
    }

    pub fn service(&self) -> &Rc<TranslationService> {
        &self.service
    }

    pub fn registry(&self) -> &Rc<OriginalTextRegistry> {
        &self.registry
    }

    pub fn base_lang(&self) -> &str {
        &self.base_lang
    }

    pub fn is_base_language(&self, lang: &str) -> bool {
        self.service.is_source_language(lang)
    }

    pub fn phase(&self) -> SweepPhase {
        self.phase.get()
    }

    pub fn is_idle(&self) -> bool {
        self.phase.get() == SweepPhase::Idle
    }

    pub fn stats(&self) -> SweepStats {
        self.stats.borrow().clone()
    }

    /// 对 `target_lang` 执行一次扫描
    pub async fn sweep(&self, target_lang: &str) -> SweepOutcome {
        if !self.is_idle() {
            tracing::debug!(
                "扫描进行中 ({:?})，丢弃 {} 的扫描请求",
                self.phase.get(),
                target_lang
            );
            self.stats.borrow_mut().dropped += 1;
            return SweepOutcome::Dropped;
        }

        let guard = PhaseGuard::enter(&self.phase);
        self.stats.borrow_mut().sweeps += 1;

        if self.is_base_language(target_lang) {
            guard.advance(SweepPhase::Applying);
            let restored = self.restore_originals();
            return SweepOutcome::Restored { restored };
        }

        // Scanning
        let root = self.root();
        let eligible: Vec<EligibleTextNode> = self.scanner.scan(&*self.document, &root).collect();
        if eligible.is_empty() {
            tracing::debug!("没有可翻译的文本节点");
            return SweepOutcome::NothingToTranslate;
        }

        let mut requests: Vec<String> = Vec::new();
        let mut request_index: HashMap<String, usize> = HashMap::new();
        let mut writes = Vec::with_capacity(eligible.len());

        for EligibleTextNode { node, raw, .. } in eligible {
            let original = self.registry.original_for_scan(&node, &raw);
            let source = original.trim().to_string();
            if source.is_empty() {
                continue;
            }

            let request = *request_index.entry(source.clone()).or_insert_with(|| {
                requests.push(source);
                requests.len() - 1
            });

            writes.push(PendingWrite {
                node,
                current: raw,
                original,
                request,
            });
        }

        let mut report = SweepReport {
            scanned: writes.len(),
            requested: requests.len(),
            ..SweepReport::default()
        };
        tracing::debug!(
            "扫描到 {} 个节点，{} 条不同文本 → {}",
            report.scanned,
            report.requested,
            target_lang
        );

        // Translating
        guard.advance(SweepPhase::Translating);
        self.service.prefetch(&requests, target_lang).await;
        let translations = join_all(
            requests
                .iter()
                .map(|text| self.service.translate(text, target_lang)),
        )
        .await;

        // Applying：从这里到结束没有 await
        guard.advance(SweepPhase::Applying);
        for write in writes {
            let translation = &translations[write.request];

            if translation.outcome == TranslationOutcome::Fallback {
                report.failed += 1;
                continue;
            }

            if !is_attached(&write.node)
                || get_text(&write.node).as_deref() != Some(write.current.as_str())
            {
                tracing::debug!("节点在扫描后被移除或改写，跳过");
                report.stale += 1;
                continue;
            }

            let desired = preserve_whitespace(&write.original, &translation.text);
            if desired == write.current {
                report.unchanged += 1;
                continue;
            }

            if self.document.set_text(&write.node, &desired) {
                if desired == write.original {
                    self.registry.mark_restored(&write.node);
                } else {
                    self.registry.mark_applied(&write.node, &desired);
                }
                report.applied += 1;
            }
        }

        {
            let mut stats = self.stats.borrow_mut();
            stats.nodes_applied += report.applied as u64;
            stats.nodes_failed += report.failed as u64;
            stats.nodes_stale += report.stale as u64;
        }

        tracing::info!(
            "扫描完成 → {}: 写回 {}, 未变 {}, 失败 {}, 失效 {}",
            target_lang,
            report.applied,
            report.unchanged,
            report.failed,
            report.stale
        );

        SweepOutcome::Applied(report)
    }

    /// 把所有记录过原文的节点还原
    fn restore_originals(&self) -> usize {
        let mut restored = 0;

        for (node, original) in self.registry.live_records() {
            if !is_attached(&node) {
                continue;
            }

            if get_text(&node).as_deref() != Some(original.as_str())
                && self.document.set_text(&node, &original)
            {
                restored += 1;
            }
            self.registry.mark_restored(&node);
        }

        {
            let mut stats = self.stats.borrow_mut();
            stats.restores += 1;
            stats.nodes_restored += restored as u64;
        }

        tracing::info!("已还原 {} 个节点为 {}", restored, self.base_lang);
        restored
    }
}

/// 把原文的首尾空白套到译文外面
fn preserve_whitespace(original: &str, translated: &str) -> String {
    let trimmed_start = original.trim_start();
    let leading = &original[..original.len() - trimmed_start.len()];
    let trailing = &trimmed_start[trimmed_start.trim_end().len()..];

    format!("{}{}{}", leading, translated.trim(), trailing)
}
