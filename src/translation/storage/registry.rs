//! 原文登记表
//!
//! 记录每个被翻译过的文本节点的原文，切回基础语言时据此还原。
//! 记录按节点身份（`Rc` 指针）索引，只持有弱引用，不会延长节点生命周期。
//! 记录不会被隐式删除；长期运行的页面可以调用 [`OriginalTextRegistry::prune_detached`]
//! 或 [`OriginalTextRegistry::clear`]。

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use markup5ever_rcdom::{Handle, Node};

use crate::parsers::html::{get_text, is_attached};

struct TextRecord {
    node: Weak<Node>,
    original: String,
    /// 最近一次写入的译文；`None` 表示节点当前显示原文
    applied: Option<String>,
}

impl TextRecord {
    fn new(node: &Handle, original: &str) -> Self {
        Self {
            node: Rc::downgrade(node),
            original: original.to_string(),
            applied: None,
        }
    }

    fn is_for(&self, node: &Handle) -> bool {
        self.node
            .upgrade()
            .map_or(false, |live| Rc::ptr_eq(&live, node))
    }
}

/// 原文登记表
#[derive(Default)]
pub struct OriginalTextRegistry {
    records: RefCell<HashMap<usize, TextRecord>>,
}

fn node_key(node: &Handle) -> usize {
    Rc::as_ptr(node) as usize
}

impl OriginalTextRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 扫描时登记原文，返回应当被翻译的原文
    ///
    /// 首次见到节点时把 `current` 记为原文。节点当前文本既不是原文也不是
    /// 最近写入的译文时，说明宿主应用重写了它，记录随之刷新。
    pub fn original_for_scan(&self, node: &Handle, current: &str) -> String {
        let mut records = self.records.borrow_mut();
        let key = node_key(node);

        match records.get_mut(&key) {
            Some(record) if record.is_for(node) => {
                if record.original == current || record.applied.as_deref() == Some(current) {
                    return record.original.clone();
                }

                tracing::debug!("节点文本被外部改写，刷新原文记录");
                record.original = current.to_string();
                record.applied = None;
                current.to_string()
            }
            _ => {
                // 指针可能被已释放节点的旧记录占用，直接覆盖
                records.insert(key, TextRecord::new(node, current));
                current.to_string()
            }
        }
    }

    /// 记录写入的译文
    pub fn mark_applied(&self, node: &Handle, text: &str) {
        if let Some(mut record) = self.record_for(node) {
            record.applied = Some(text.to_string());
        }
    }

    /// 节点已还原为原文
    pub fn mark_restored(&self, node: &Handle) {
        if let Some(mut record) = self.record_for(node) {
            record.applied = None;
        }
    }

    /// 节点的原文记录
    pub fn original(&self, node: &Handle) -> Option<String> {
        let records = self.records.borrow();
        records
            .get(&node_key(node))
            .filter(|record| record.is_for(node))
            .map(|record| record.original.clone())
    }

    /// 仍然存活的记录（节点, 原文）
    pub fn live_records(&self) -> Vec<(Handle, String)> {
        self.records
            .borrow()
            .values()
            .filter_map(|record| {
                record
                    .node
                    .upgrade()
                    .map(|node| (node, record.original.clone()))
            })
            .collect()
    }

    /// 移除节点已释放或已脱离文档的记录，返回移除数量
    pub fn prune_detached(&self) -> usize {
        let mut records = self.records.borrow_mut();
        let before = records.len();
        records.retain(|_, record| record.node.upgrade().map_or(false, |node| is_attached(&node)));
        let pruned = before - records.len();

        if pruned > 0 {
            tracing::debug!("移除了 {} 条失效的原文记录", pruned);
        }
        pruned
    }

    /// 清除全部记录
    pub fn clear(&self) {
        self.records.borrow_mut().clear();
    }

    pub fn len(&self) -> usize {
        self.records.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 节点当前显示的是否为原文
    pub fn shows_original(&self, node: &Handle) -> bool {
        match self.original(node) {
            Some(original) => get_text(node).as_deref() == Some(original.as_str()),
            None => true,
        }
    }

    fn record_for(&self, node: &Handle) -> Option<std::cell::RefMut<'_, TextRecord>> {
        let records = self.records.borrow_mut();
        std::cell::RefMut::filter_map(records, |records| {
            records
                .get_mut(&node_key(node))
                .filter(|record| record.is_for(node))
        })
        .ok()
    }
}
