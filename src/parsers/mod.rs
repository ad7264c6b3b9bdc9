//! # 解析器模块
//!
//! HTML文档解析、序列化，以及翻译扫描所依赖的文档适配层。
//!
//! # 模块组织
//!
//! - `html` - HTML文档解析、DOM操作、文档适配器与可观察的活文档

pub mod html;

// Re-export commonly used items for convenience
pub use html::{html_to_dom, serialize_document, serialize_node};
