use std::rc::Rc;

use encoding_rs::Encoding;
use html5ever::parse_document;
use html5ever::tendril::{StrTendril, TendrilSink};
use markup5ever_rcdom::{Handle, NodeData, RcDom};

/// 将 HTML 字节转换为 DOM
pub fn html_to_dom(data: &[u8], document_encoding: String) -> RcDom {
    let s: String;

    if let Some(encoding) = Encoding::for_label(document_encoding.as_bytes()) {
        let (string, _, _) = encoding.decode(data);
        s = string.to_string();
    } else {
        s = String::from_utf8_lossy(data).to_string();
    }

    parse_document(RcDom::default(), Default::default()).one(s)
}

/// 查找指定路径的DOM节点
pub fn find_nodes(node: &Handle, node_names: Vec<&str>) -> Vec<Handle> {
    let mut found_nodes = Vec::new();

    let Some(&node_name) = node_names.first() else {
        return found_nodes;
    };

    if node_names.len() == 1 {
        if let NodeData::Element { ref name, .. } = node.data {
            if &*name.local == node_name {
                found_nodes.push(node.clone());
            }
        }

        for child_node in node.children.borrow().iter() {
            found_nodes.append(&mut find_nodes(child_node, node_names.clone()));
        }
    } else if let NodeData::Element { ref name, .. } = node.data {
        if &*name.local == node_name {
            let mut new_node_names = node_names;
            new_node_names.remove(0);
            found_nodes.append(&mut find_nodes(node, new_node_names));
        } else {
            for child_node in node.children.borrow().iter() {
                found_nodes.append(&mut find_nodes(child_node, node_names.clone()));
            }
        }
    } else {
        for child_node in node.children.borrow().iter() {
            found_nodes.append(&mut find_nodes(child_node, node_names.clone()));
        }
    }

    found_nodes
}

/// 获取节点属性值
pub fn get_node_attr(node: &Handle, attr_name: &str) -> Option<String> {
    match &node.data {
        NodeData::Element { attrs, .. } => {
            for attr in attrs.borrow().iter() {
                if &*attr.name.local == attr_name {
                    return Some(attr.value.to_string());
                }
            }
            None
        }
        _ => None,
    }
}

/// 获取节点名称
pub fn get_node_name(node: &Handle) -> Option<&'_ str> {
    match &node.data {
        NodeData::Element { name, .. } => Some(name.local.as_ref()),
        _ => None,
    }
}

/// 元素的 class 列表（按空白切分）
pub fn class_list(node: &Handle) -> Vec<String> {
    get_node_attr(node, "class")
        .map(|value| value.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default()
}

/// 获取父节点
///
/// rcdom 把父指针存放在 `Cell` 中，读取时必须放回去，否则节点会丢失父引用。
pub fn get_parent_node(child: &Handle) -> Option<Handle> {
    let weak = child.parent.take();
    let parent = weak.as_ref().and_then(|node| node.upgrade());
    child.parent.set(weak);
    parent
}

/// 判断 `ancestor` 是否为 `node` 自身或其祖先
pub fn is_inclusive_ancestor(ancestor: &Handle, node: &Handle) -> bool {
    let mut current = Some(node.clone());

    while let Some(candidate) = current {
        if Rc::ptr_eq(&candidate, ancestor) {
            return true;
        }
        current = get_parent_node(&candidate);
    }

    false
}

/// 节点是否仍挂在某个文档上
pub fn is_attached(node: &Handle) -> bool {
    let mut current = Some(node.clone());

    while let Some(candidate) = current {
        if let NodeData::Document = candidate.data {
            return true;
        }
        current = get_parent_node(&candidate);
    }

    false
}

/// 读取文本节点内容，非文本节点返回 `None`
pub fn get_text(node: &Handle) -> Option<String> {
    match &node.data {
        NodeData::Text { contents } => Some(contents.borrow().to_string()),
        _ => None,
    }
}

/// 覆写文本节点内容，非文本节点返回 `false`
pub fn set_text(node: &Handle, text: &str) -> bool {
    match &node.data {
        NodeData::Text { contents } => {
            *contents.borrow_mut() = StrTendril::from_slice(text);
            true
        }
        _ => false,
    }
}

/// 子树中所有文本节点内容的拼接（等价于 `textContent`）
pub fn text_content(node: &Handle) -> String {
    let mut out = String::new();
    collect_text(node, &mut out);
    out
}

fn collect_text(node: &Handle, out: &mut String) {
    match &node.data {
        NodeData::Text { contents } => out.push_str(&contents.borrow()),
        NodeData::Comment { .. } | NodeData::ProcessingInstruction { .. } => {}
        _ => {
            for child in node.children.borrow().iter() {
                collect_text(child, out);
            }
        }
    }
}

/// 是否至少含有一个元素子节点
pub fn has_child_elements(node: &Handle) -> bool {
    node.children
        .borrow()
        .iter()
        .any(|child| matches!(child.data, NodeData::Element { .. }))
}

/// 将节点从父节点中摘下
pub fn detach_node(node: &Handle) {
    if let Some(parent) = get_parent_node(node) {
        parent
            .children
            .borrow_mut()
            .retain(|child| !Rc::ptr_eq(child, node));
    }
    node.parent.set(None);
}

/// 把节点追加为 `parent` 的最后一个子节点（必要时先从旧父节点摘下）
pub fn append_child_node(parent: &Handle, child: &Handle) {
    detach_node(child);
    child.parent.set(Some(Rc::downgrade(parent)));
    parent.children.borrow_mut().push(child.clone());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dom(html: &str) -> RcDom {
        html_to_dom(html.as_bytes(), "UTF-8".to_string())
    }

    fn first(dom: &RcDom, path: Vec<&str>) -> Handle {
        find_nodes(&dom.document, path)
            .into_iter()
            .next()
            .expect("node should exist")
    }

    #[test]
    fn test_get_parent_node_keeps_parent_link() {
        let dom = dom("<html><body><p>Hello</p></body></html>");
        let p = first(&dom, vec!["html", "body", "p"]);

        let parent = get_parent_node(&p).expect("p has a parent");
        assert_eq!(get_node_name(&parent), Some("body"));

        // 第二次读取仍然可用
        assert!(get_parent_node(&p).is_some());
    }

    #[test]
    fn test_text_helpers() {
        let dom = dom("<html><body><p>Hello <b>big</b> world</p></body></html>");
        let p = first(&dom, vec!["html", "body", "p"]);

        assert_eq!(text_content(&p), "Hello big world");
        assert!(has_child_elements(&p));

        let text = p.children.borrow()[0].clone();
        assert_eq!(get_text(&text).as_deref(), Some("Hello "));
        assert!(set_text(&text, "Bonjour "));
        assert_eq!(text_content(&p), "Bonjour big world");
        assert!(!set_text(&p, "nope"));
    }

    #[test]
    fn test_detach_and_append() {
        let dom = dom("<html><body><div id=a><p>x</p></div><div id=b></div></body></html>");
        let divs = find_nodes(&dom.document, vec!["html", "body", "div"]);
        let p = first(&dom, vec!["html", "body", "div", "p"]);

        assert!(is_attached(&p));
        append_child_node(&divs[1], &p);
        assert!(divs[0].children.borrow().is_empty());
        assert!(is_inclusive_ancestor(&divs[1], &p));

        detach_node(&p);
        assert!(!is_attached(&p));
        assert!(get_parent_node(&p).is_none());
    }

    #[test]
    fn test_class_list() {
        let dom = dom(r#"<html><body><div class="  a  language-switcher b"></div></body></html>"#);
        let div = first(&dom, vec!["html", "body", "div"]);

        assert_eq!(class_list(&div), vec!["a", "language-switcher", "b"]);
        assert!(get_node_attr(&div, "id").is_none());
    }
}
