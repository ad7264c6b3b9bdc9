//! 文档适配器
//!
//! 扫描编排器只通过这里的接口接触文档：按文档顺序列出文本节点、覆写文本、
//! 观察子树插入。任何能够把自身映射为 rcdom 节点的树（解析出来的页面、
//! 无头浏览器的镜像、虚拟DOM快照）都可以实现 [`DocumentAdapter`]。

use std::fmt;

use markup5ever_rcdom::{Handle, NodeData};

use super::dom::find_nodes;

/// 插入观察回调
pub type InsertionCallback = Box<dyn Fn(&MutationRecord)>;

/// 一次子树插入记录
#[derive(Debug, Clone)]
pub struct MutationRecord {
    /// 接收新节点的父节点
    pub target: Handle,
    /// 本批新增的节点（按插入顺序）
    pub added_nodes: Vec<Handle>,
}

/// 文档适配器
pub trait DocumentAdapter {
    /// 文档根节点
    fn document(&self) -> Handle;

    /// 默认扫描根：`<body>`，没有 body 时退回文档根
    fn body(&self) -> Handle {
        find_nodes(&self.document(), vec!["html", "body"])
            .into_iter()
            .next()
            .unwrap_or_else(|| self.document())
    }

    /// 以文档顺序惰性列出 `root` 下的文本节点
    ///
    /// `descend` 对每个元素调用，返回 `false` 时跳过整棵子树。
    fn text_nodes<'a>(
        &self,
        root: &Handle,
        descend: Box<dyn Fn(&Handle) -> bool + 'a>,
    ) -> TextNodes<'a> {
        TextNodes::new(root, descend)
    }

    /// 覆写文本节点内容
    fn set_text(&self, node: &Handle, text: &str) -> bool;

    /// 观察 `root` 子树中的节点插入；句柄被丢弃时自动断开
    ///
    /// 只报告节点新增，文本内容变化不会触发回调。
    fn observe_insertions(&self, root: &Handle, callback: InsertionCallback) -> ObserverHandle;
}

/// 文本节点遍历器（深度优先、文档顺序、不可重启）
pub struct TextNodes<'a> {
    stack: Vec<Handle>,
    descend: Box<dyn Fn(&Handle) -> bool + 'a>,
}

impl<'a> TextNodes<'a> {
    pub fn new(root: &Handle, descend: Box<dyn Fn(&Handle) -> bool + 'a>) -> Self {
        Self {
            stack: vec![root.clone()],
            descend,
        }
    }
}

impl Iterator for TextNodes<'_> {
    type Item = Handle;

    fn next(&mut self) -> Option<Handle> {
        while let Some(node) = self.stack.pop() {
            match node.data {
                NodeData::Text { .. } => return Some(node),
                NodeData::Element { .. } if !(self.descend)(&node) => continue,
                NodeData::Element { .. } | NodeData::Document => {
                    let children = node.children.borrow();
                    self.stack.extend(children.iter().rev().cloned());
                }
                _ => {}
            }
        }

        None
    }
}

/// 插入观察句柄
///
/// 丢弃或调用 [`ObserverHandle::disconnect`] 时注销观察者。
pub struct ObserverHandle {
    disconnect: Option<Box<dyn FnOnce()>>,
}

impl ObserverHandle {
    pub fn new(disconnect: impl FnOnce() + 'static) -> Self {
        Self {
            disconnect: Some(Box::new(disconnect)),
        }
    }

    /// 不关联任何观察者的句柄
    pub fn detached() -> Self {
        Self { disconnect: None }
    }

    /// 立即断开
    pub fn disconnect(mut self) {
        self.run_disconnect();
    }

    fn run_disconnect(&mut self) {
        if let Some(disconnect) = self.disconnect.take() {
            disconnect();
        }
    }
}

impl Drop for ObserverHandle {
    fn drop(&mut self) {
        self.run_disconnect();
    }
}

impl fmt::Debug for ObserverHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserverHandle")
            .field("connected", &self.disconnect.is_some())
            .finish()
    }
}
