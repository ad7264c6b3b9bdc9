//! DOM 扫描器
//!
//! 以文档顺序惰性产出可翻译的文本节点。扫描是只读的；空结果不是错误。
//!
//! 排除规则分两层：
//! - 父元素规则：父元素不能是 script/style/noscript/input/textarea/select。
//! - 子树规则：从文本节点一直到文档根，任何祖先带有禁止翻译标记、
//!   `translate="no"`、`contenteditable`、组件库内部标记或翻译控制类名时排除。
//!   遍历时遇到这样的元素直接剪掉整棵子树。

use markup5ever_rcdom::{Handle, NodeData};

use super::filters::TextFilter;
use crate::parsers::html::{
    class_list, get_node_attr, get_node_name, get_parent_node, get_text, has_child_elements,
    DocumentAdapter, TextNodes,
};
use crate::translation::config::{constants, AutoTranslateConfig};

/// 扫描策略
#[derive(Debug, Clone)]
pub struct ScanPolicy {
    /// 文本父元素不可为这些元素
    pub skip_elements: Vec<String>,
    /// 禁止翻译标记属性
    pub no_translate_attr: String,
    /// 组件库内部标记，`属性` 或 `属性=值`
    pub skip_marker_attrs: Vec<String>,
    /// 翻译控制界面的类名片段（不区分大小写的子串匹配）
    pub skip_class_fragments: Vec<String>,
    pub min_text_length: usize,
    /// 新增内容被视为"实质内容"所需的最少可翻译字符数
    pub min_substantial_chars: usize,
    pub require_child_elements: bool,
}

impl Default for ScanPolicy {
    fn default() -> Self {
        Self::from_config(&AutoTranslateConfig::default())
    }
}

impl ScanPolicy {
    pub fn from_config(config: &AutoTranslateConfig) -> Self {
        Self {
            skip_elements: constants::SKIP_ELEMENTS
                .iter()
                .map(|name| name.to_string())
                .collect(),
            no_translate_attr: config.no_translate_attr.to_lowercase(),
            skip_marker_attrs: config.skip_marker_attrs.clone(),
            skip_class_fragments: config
                .skip_class_fragments
                .iter()
                .map(|fragment| fragment.to_lowercase())
                .collect(),
            min_text_length: constants::MIN_TEXT_LENGTH,
            min_substantial_chars: config.min_substantial_chars,
            require_child_elements: config.require_child_elements,
        }
    }
}

/// 可翻译的文本节点
#[derive(Debug, Clone)]
pub struct EligibleTextNode {
    pub node: Handle,
    /// 扫描时的原始内容（含首尾空白）
    pub raw: String,
    /// 去除首尾空白后的内容
    pub text: String,
}

/// DOM 扫描器
pub struct DomScanner {
    policy: ScanPolicy,
    filter: TextFilter,
}

impl DomScanner {
    pub fn new(policy: ScanPolicy) -> Self {
        let filter = TextFilter::with_min_length(policy.min_text_length);
        Self { policy, filter }
    }

    pub fn from_config(config: &AutoTranslateConfig) -> Self {
        Self::new(ScanPolicy::from_config(config))
    }

    pub fn policy(&self) -> &ScanPolicy {
        &self.policy
    }

    /// 扫描 `root` 子树
    ///
    /// 返回的迭代器惰性求值、有限、不可重启。
    pub fn scan<'a>(
        &'a self,
        document: &dyn DocumentAdapter,
        root: &Handle,
    ) -> impl Iterator<Item = EligibleTextNode> + 'a {
        document
            .text_nodes(root, Box::new(move |element: &Handle| !self.excludes_subtree(element)))
            .filter_map(move |node| self.accept(node))
    }

    /// 单个文本节点是否可翻译
    pub fn is_eligible(&self, node: &Handle) -> bool {
        self.accept(node.clone()).is_some()
    }

    /// 新插入的节点是否构成值得重新扫描的实质内容
    ///
    /// 只有元素可能是实质内容；单独插入的文本节点（比如替换掉的一个span文本）不算。
    pub fn is_substantial(&self, node: &Handle) -> bool {
        let Some(name) = get_node_name(node) else {
            return false;
        };

        if self.is_skip_element(name) || self.excludes_subtree(node) {
            return false;
        }

        if get_parent_node(node).map_or(false, |parent| self.has_excluded_ancestor(&parent)) {
            return false;
        }

        if self.policy.require_child_elements && !has_child_elements(node) {
            return false;
        }

        let mut chars = 0usize;
        let mut sample = String::new();
        let walker = TextNodes::new(
            node,
            Box::new(|element: &Handle| !self.excludes_subtree(element)),
        );
        for text_node in walker {
            if let Some(eligible) = self.accept(text_node) {
                chars += eligible.text.chars().count();
                if !sample.is_empty() {
                    sample.push(' ');
                }
                sample.push_str(&eligible.text);
            }
            if chars >= self.policy.min_substantial_chars {
                break;
            }
        }

        chars >= self.policy.min_substantial_chars && !self.filter.is_technical(&sample)
    }

    fn accept(&self, node: Handle) -> Option<EligibleTextNode> {
        let raw = get_text(&node)?;
        if let Err(reason) = self.filter.check(&raw) {
            tracing::trace!("跳过文本 {:?}: {:?}", raw, reason);
            return None;
        }

        let parent = get_parent_node(&node)?;
        let parent_name = get_node_name(&parent)?;
        if self.is_skip_element(parent_name) || self.has_excluded_ancestor(&parent) {
            return None;
        }

        let text = raw.trim().to_string();
        Some(EligibleTextNode { node, raw, text })
    }

    fn is_skip_element(&self, name: &str) -> bool {
        self.policy
            .skip_elements
            .iter()
            .any(|skip| skip.eq_ignore_ascii_case(name))
    }

    /// 从 `element` 向上直到文档根是否有排除整棵子树的元素
    fn has_excluded_ancestor(&self, element: &Handle) -> bool {
        let mut current = Some(element.clone());

        while let Some(node) = current {
            match node.data {
                NodeData::Document => return false,
                NodeData::Element { .. } if self.excludes_subtree(&node) => return true,
                _ => {}
            }
            current = get_parent_node(&node);
        }

        false
    }

    /// 元素本身是否排除其整棵子树
    fn excludes_subtree(&self, element: &Handle) -> bool {
        if get_node_attr(element, &self.policy.no_translate_attr).is_some() {
            return true;
        }

        if get_node_attr(element, constants::STANDARD_TRANSLATE_ATTR)
            .map_or(false, |value| value.trim().eq_ignore_ascii_case("no"))
        {
            return true;
        }

        if get_node_attr(element, "contenteditable")
            .map_or(false, |value| !value.trim().eq_ignore_ascii_case("false"))
        {
            return true;
        }

        if self
            .policy
            .skip_marker_attrs
            .iter()
            .any(|marker| matches_marker(element, marker))
        {
            return true;
        }

        if !self.policy.skip_class_fragments.is_empty() {
            let classes = class_list(element);
            return classes.iter().any(|class| {
                let class = class.to_lowercase();
                self.policy
                    .skip_class_fragments
                    .iter()
                    .any(|fragment| class.contains(fragment.as_str()))
            });
        }

        false
    }
}

impl Default for DomScanner {
    fn default() -> Self {
        Self::new(ScanPolicy::default())
    }
}

fn matches_marker(element: &Handle, marker: &str) -> bool {
    match marker.split_once('=') {
        Some((attr, expected)) => get_node_attr(element, attr.trim())
            .map_or(false, |value| value.eq_ignore_ascii_case(expected.trim())),
        None => get_node_attr(element, marker.trim()).is_some(),
    }
}
