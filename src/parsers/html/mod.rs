//! HTML解析和处理模块
//!
//! - `dom`: 基础DOM操作（查找、属性、父节点、文本内容）
//! - `serializer`: 序列化功能
//! - `adapter`: 文档适配器接口，将扫描算法与具体的DOM实现解耦
//! - `live`: 基于 rcdom 的活文档，支持子树插入观察

pub mod adapter;
pub mod dom;
pub mod live;
pub mod serializer;

pub use adapter::{DocumentAdapter, InsertionCallback, MutationRecord, ObserverHandle, TextNodes};
pub use dom::{
    append_child_node, class_list, detach_node, find_nodes, get_node_attr,
    get_node_name, get_parent_node, get_text, has_child_elements, html_to_dom, is_attached,
    is_inclusive_ancestor, set_text, text_content,
};
pub use live::LiveDocument;
pub use serializer::{serialize_document, serialize_node};
