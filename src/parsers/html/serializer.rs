use std::io;

use encoding_rs::Encoding;
use html5ever::serialize::{serialize, SerializeOpts, TraversalScope};
use markup5ever_rcdom::{Handle, RcDom, SerializableHandle};

/// 序列化文档
///
/// `document_encoding` 为空或无法识别时输出 UTF-8。
pub fn serialize_document(dom: &RcDom, document_encoding: &str) -> io::Result<Vec<u8>> {
    let mut buf = serialize_handle(&dom.document, TraversalScope::ChildrenOnly(None))?;

    if !document_encoding.is_empty() {
        if let Some(encoding) = Encoding::for_label(document_encoding.as_bytes()) {
            let s: &str = &String::from_utf8_lossy(&buf);
            let (data, _, _) = encoding.encode(s);
            buf = data.to_vec();
        }
    }

    Ok(buf)
}

/// 序列化单个节点（含节点本身）为 UTF-8 字符串
pub fn serialize_node(node: &Handle) -> io::Result<String> {
    let buf = serialize_handle(node, TraversalScope::IncludeNode)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

fn serialize_handle(node: &Handle, traversal_scope: TraversalScope) -> io::Result<Vec<u8>> {
    let mut buf: Vec<u8> = Vec::new();
    let serializable: SerializableHandle = node.clone().into();
    let opts = SerializeOpts {
        traversal_scope,
        ..Default::default()
    };
    serialize(&mut buf, &serializable, opts)?;
    Ok(buf)
}
