//! 可观察的活文档
//!
//! 在 `RcDom` 外包一层观察者注册表。所有结构性修改（追加节点、插入HTML片段）
//! 都经由 [`LiveDocument`] 完成，完成后按子树向观察者派发 [`MutationRecord`]。
//! 文本覆写不派发记录，扫描写回文本不会触发自身的观察者。

use std::cell::RefCell;
use std::io;
use std::rc::{Rc, Weak};

use markup5ever_rcdom::{Handle, Node, RcDom};

use super::adapter::{DocumentAdapter, InsertionCallback, MutationRecord, ObserverHandle};
use super::dom::{
    append_child_node, detach_node, find_nodes, html_to_dom, is_inclusive_ancestor, set_text,
};
use super::serializer::{serialize_document, serialize_node};

type SharedCallback = Rc<dyn Fn(&MutationRecord)>;

struct ObserverEntry {
    id: u64,
    root: Weak<Node>,
    callback: SharedCallback,
}

#[derive(Default)]
struct ObserverRegistry {
    next_id: u64,
    entries: Vec<ObserverEntry>,
}

/// 基于 rcdom 的活文档
pub struct LiveDocument {
    dom: RcDom,
    observers: Rc<RefCell<ObserverRegistry>>,
}

impl LiveDocument {
    pub fn new(dom: RcDom) -> Self {
        Self {
            dom,
            observers: Rc::new(RefCell::new(ObserverRegistry::default())),
        }
    }

    /// 解析 UTF-8 HTML 文本
    pub fn parse(html: &str) -> Self {
        Self::new(html_to_dom(html.as_bytes(), "UTF-8".to_string()))
    }

    pub fn dom(&self) -> &RcDom {
        &self.dom
    }

    /// 当前注册的观察者数量
    pub fn observer_count(&self) -> usize {
        self.observers.borrow().entries.len()
    }

    /// 把已有节点追加到 `parent` 末尾并通知观察者
    pub fn append_child(&self, parent: &Handle, child: Handle) {
        append_child_node(parent, &child);
        self.notify(MutationRecord {
            target: parent.clone(),
            added_nodes: vec![child],
        });
    }

    /// 解析HTML片段并追加到 `parent` 末尾，返回新增的顶层节点
    pub fn append_html(&self, parent: &Handle, fragment: &str) -> Vec<Handle> {
        let scratch = html_to_dom(fragment.as_bytes(), "UTF-8".to_string());
        let Some(body) = find_nodes(&scratch.document, vec!["html", "body"])
            .into_iter()
            .next()
        else {
            return Vec::new();
        };

        let added: Vec<Handle> = body.children.borrow().clone();
        for node in &added {
            append_child_node(parent, node);
        }

        if !added.is_empty() {
            self.notify(MutationRecord {
                target: parent.clone(),
                added_nodes: added.clone(),
            });
        }

        added
    }

    /// 移除节点（不派发记录，只观察新增）
    pub fn remove(&self, node: &Handle) {
        detach_node(node);
    }

    /// 序列化整个文档
    pub fn to_html(&self) -> io::Result<String> {
        let bytes = serialize_document(&self.dom, "UTF-8")?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// 序列化单个节点
    pub fn outer_html(&self, node: &Handle) -> io::Result<String> {
        serialize_node(node)
    }

    fn notify(&self, record: MutationRecord) {
        // 先收集回调再调用，回调内部可以安全地注销观察者
        let callbacks: Vec<SharedCallback> = {
            let mut registry = self.observers.borrow_mut();
            registry.entries.retain(|entry| entry.root.strong_count() > 0);
            registry
                .entries
                .iter()
                .filter(|entry| {
                    entry
                        .root
                        .upgrade()
                        .map_or(false, |root| is_inclusive_ancestor(&root, &record.target))
                })
                .map(|entry| entry.callback.clone())
                .collect()
        };

        tracing::trace!(
            "子树插入: {} 个节点, {} 个观察者",
            record.added_nodes.len(),
            callbacks.len()
        );

        for callback in callbacks {
            callback(&record);
        }
    }
}

impl DocumentAdapter for LiveDocument {
    fn document(&self) -> Handle {
        self.dom.document.clone()
    }

    fn set_text(&self, node: &Handle, text: &str) -> bool {
        set_text(node, text)
    }

    fn observe_insertions(&self, root: &Handle, callback: InsertionCallback) -> ObserverHandle {
        let id = {
            let mut registry = self.observers.borrow_mut();
            let id = registry.next_id;
            registry.next_id += 1;
            registry.entries.push(ObserverEntry {
                id,
                root: Rc::downgrade(root),
                callback: Rc::from(callback),
            });
            id
        };

        let registry = Rc::downgrade(&self.observers);
        ObserverHandle::new(move || {
            if let Some(registry) = registry.upgrade() {
                registry.borrow_mut().entries.retain(|entry| entry.id != id);
            }
        })
    }
}
