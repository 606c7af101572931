//! 分段结果的数据结构
//!
//! 分段器从解析树中复制出需要的信息，结果不借用原始文档，可以跨 await 传递。

use serde::{Deserialize, Serialize};

/// 单个标记节点的快照
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkupNode {
    /// 标签名（小写）
    pub tag: String,
    /// id 属性
    pub id: Option<String>,
    /// class 列表
    pub classes: Vec<String>,
    /// 全部属性（文档顺序）
    pub attrs: Vec<(String, String)>,
    /// 序列化后的完整 HTML
    pub outer_html: String,
    /// 去除首尾空白后、以空格拼接的文本
    pub text: String,
}

impl MarkupNode {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }
}

/// 一个逻辑区域（题头或题干）包含的节点，保持文档顺序
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementGroup {
    pub nodes: Vec<MarkupNode>,
}

impl ElementGroup {
    pub fn new(nodes: Vec<MarkupNode>) -> Self {
        Self { nodes }
    }

    pub fn single(node: MarkupNode) -> Self {
        Self { nodes: vec![node] }
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// 拼接后的 HTML
    pub fn html(&self) -> String {
        self.nodes
            .iter()
            .map(|n| n.outer_html.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// 拼接后的文本
    pub fn text(&self) -> String {
        self.nodes
            .iter()
            .map(|n| n.text.as_str())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn first(&self) -> Option<&MarkupNode> {
        self.nodes.first()
    }
}

/// 一道题的 (题头, 题干) 对
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockPair {
    pub header: ElementGroup,
    pub body: ElementGroup,
}

impl BlockPair {
    pub fn new(header: ElementGroup, body: ElementGroup) -> Self {
        Self { header, body }
    }

    /// 题干中第一个 `q` 开头的 id（去掉前缀）
    pub fn block_id(&self) -> Option<&str> {
        self.body
            .nodes
            .iter()
            .filter_map(|n| n.id.as_deref())
            .find_map(|id| id.strip_prefix('q').filter(|rest| !rest.is_empty()))
    }
}
