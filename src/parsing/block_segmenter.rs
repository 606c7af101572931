//! 题块分段器 - 纯函数层
//!
//! ## 职责
//!
//! 把一页题库 HTML 切分成按文档顺序排列的 (题头, 题干) 对，不做任何 I/O。
//!
//! ## 策略
//!
//! 1. **标识分组**：收集带任务标识的元素（`form[name=qform<ID>]`、`id=q<ID>` / `id=i<ID>`），
//!    按标识分组，每组在组内确定题头和题干。
//! 2. **容器分组**：页面存在不带标识的 `qblock`（公共材料）时，或标识分组为空时使用。
//!    公共材料会并入其后所有带标识的题块，直到下一段公共材料或文档结束。
//!
//! 题头识别按固定优先级：`i` 前缀 id → 题头 class → 题头文本 → 第一个非题干元素 → 第一个元素。
//! 题干识别：`qblock` class，否则取文本最长且超过 [`MIN_BODY_TEXT_LEN`] 个字符的元素。

use std::collections::{HashMap, HashSet};
use std::ops::Deref;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html};
use tracing::debug;

use crate::models::{BlockPair, ElementGroup, MarkupNode};
use crate::parsing::dom::{descendant_elements, select_doc, snapshot};

/// 题干 class
pub const BODY_CLASS: &str = "qblock";

/// 按文本长度认定题干时的最小长度
pub const MIN_BODY_TEXT_LEN: usize = 50;

/// 题头 class 词表
pub const HEADER_CLASSES: [&str; 6] = [
    "header",
    "info",
    "task-header",
    "task-info",
    "task-header-panel",
    "task-info-panel",
];

/// 题头文本词表（小写匹配）
pub const HEADER_WORDS: [&str; 5] = ["задание", "task", "кэс", "кос", "кодификатор"];

static ROLE_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[qi]([0-9A-Fa-f]+)$").expect("valid regex"));

static FORM_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^qform([0-9A-Fa-f]+)$").expect("valid regex"));

/// 题头识别命中的层级
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderTier {
    RoleId,
    Class,
    Text,
    FirstNonBody,
    First,
}

/// 把页面 HTML 切分成题块对
///
/// # 参数
/// - `html`: 页面（或 iframe）HTML
///
/// # 返回
/// 文档顺序的题块对；没有可识别的题块时返回空列表
pub fn segment(html: &str) -> Vec<BlockPair> {
    if html.trim().is_empty() {
        return Vec::new();
    }
    let doc = Html::parse_document(html);

    let containers = top_level_containers(&doc);
    let has_shared_context = containers.iter().any(|c| container_id(*c).is_none());

    if !has_shared_context {
        let pairs = segment_by_identifier(&doc);
        if !pairs.is_empty() {
            debug!("标识分组得到 {} 个题块", pairs.len());
            return pairs;
        }
    }

    let pairs = segment_by_container(&doc, &containers);
    debug!("容器分组得到 {} 个题块", pairs.len());
    pairs
}

/// 在组内按优先级确定题头
///
/// # 参数
/// - `nodes`: 组内元素
/// - `body`: 已确定的题干下标（若有），前四层不会选中它
///
/// # 返回
/// 题头下标和命中的层级；组为空时返回 None
pub fn identify_header(nodes: &[MarkupNode], body: Option<usize>) -> Option<(usize, HeaderTier)> {
    let candidates = || {
        nodes
            .iter()
            .enumerate()
            .filter(move |(i, _)| Some(*i) != body)
    };

    if let Some((i, _)) = candidates().find(|(_, n)| is_role_header(n)) {
        return Some((i, HeaderTier::RoleId));
    }
    if let Some((i, _)) = candidates().find(|(_, n)| has_header_class(n)) {
        return Some((i, HeaderTier::Class));
    }
    if let Some((i, _)) = candidates().find(|(_, n)| has_header_text(n)) {
        return Some((i, HeaderTier::Text));
    }
    if let Some((i, _)) = candidates().next() {
        return Some((i, HeaderTier::FirstNonBody));
    }
    if nodes.is_empty() {
        None
    } else {
        Some((0, HeaderTier::First))
    }
}

/// 在组内确定题干
pub fn identify_body(nodes: &[MarkupNode]) -> Option<usize> {
    if let Some(i) = nodes.iter().position(|n| n.has_class(BODY_CLASS)) {
        return Some(i);
    }

    let mut best: Option<(usize, usize)> = None;
    for (i, node) in nodes.iter().enumerate() {
        let len = node.text.chars().count();
        if best.map_or(true, |(_, best_len)| len > best_len) {
            best = Some((i, len));
        }
    }
    best.filter(|(_, len)| *len > MIN_BODY_TEXT_LEN).map(|(i, _)| i)
}

fn is_role_header(node: &MarkupNode) -> bool {
    node.id.as_deref().is_some_and(|id| id.starts_with('i'))
}

fn has_header_class(node: &MarkupNode) -> bool {
    node.classes
        .iter()
        .any(|c| HEADER_CLASSES.contains(&c.as_str()))
}

fn has_header_text(node: &MarkupNode) -> bool {
    let text = node.text.to_lowercase();
    HEADER_WORDS.iter().any(|w| text.contains(w))
}

/// 元素上的任务标识
fn task_identifier(el: ElementRef<'_>) -> Option<String> {
    let value = el.value();
    if value.name().eq_ignore_ascii_case("form") {
        if let Some(caps) = value.attr("name").and_then(|n| FORM_NAME.captures(n)) {
            return Some(caps[1].to_uppercase());
        }
    }
    value
        .id()
        .and_then(|id| ROLE_ID.captures(id))
        .map(|caps| caps[1].to_uppercase())
}

fn segment_by_identifier(doc: &Html) -> Vec<BlockPair> {
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<ElementRef<'_>>> = HashMap::new();
    let mut claimed = HashSet::new();

    for el in descendant_elements(doc.root_element()) {
        let Some(identifier) = task_identifier(el) else {
            continue;
        };
        if el.ancestors().any(|a| claimed.contains(&a.id())) {
            continue;
        }
        claimed.insert(el.deref().id());
        groups
            .entry(identifier.clone())
            .or_insert_with(|| {
                order.push(identifier);
                Vec::new()
            })
            .push(el);
    }

    order
        .iter()
        .filter_map(|identifier| {
            let nodes: Vec<MarkupNode> = groups.get(identifier)?.iter().map(|el| snapshot(*el)).collect();
            pair_from_group(identifier, nodes)
        })
        .collect()
}

fn pair_from_group(identifier: &str, nodes: Vec<MarkupNode>) -> Option<BlockPair> {
    let Some(body) = identify_body(&nodes) else {
        debug!("标识 {} 的分组没有可识别的题干，跳过", identifier);
        return None;
    };
    let (header, _) = identify_header(&nodes, Some(body))?;
    Some(BlockPair::new(
        ElementGroup::single(nodes[header].clone()),
        ElementGroup::single(nodes[body].clone()),
    ))
}

/// 文档中不嵌套在其他 qblock 内的 qblock
fn top_level_containers(doc: &Html) -> Vec<ElementRef<'_>> {
    select_doc(doc, &format!(".{}", BODY_CLASS))
        .into_iter()
        .filter(|el| {
            !el.ancestors()
                .filter_map(ElementRef::wrap)
                .any(|a| a.value().classes().any(|c| c == BODY_CLASS))
        })
        .collect()
}

/// qblock 的题目 id（`q` 之后的十六进制部分），公共材料没有
fn container_id(el: ElementRef<'_>) -> Option<String> {
    let id = el.value().id()?;
    if !id.starts_with('q') {
        return None;
    }
    ROLE_ID.captures(id).map(|caps| caps[1].to_string())
}

#[derive(Default)]
struct ContainerGroup<'a> {
    context: Option<ElementRef<'a>>,
    blocks: Vec<(String, ElementRef<'a>)>,
}

fn segment_by_container(doc: &Html, containers: &[ElementRef<'_>]) -> Vec<BlockPair> {
    let mut groups: Vec<ContainerGroup<'_>> = Vec::new();
    let mut current = ContainerGroup::default();

    for container in containers {
        match container_id(*container) {
            Some(id) => current.blocks.push((id, *container)),
            None => {
                groups.push(std::mem::take(&mut current));
                current.context = Some(*container);
            }
        }
    }
    groups.push(current);

    let mut pairs = Vec::new();
    for group in groups {
        let Some((first_id, first_block)) = group.blocks.first() else {
            continue;
        };

        match group.context {
            Some(context) => {
                let mut body = vec![snapshot(context)];
                body.extend(group.blocks.iter().map(|(_, el)| snapshot(*el)));
                pairs.push(BlockPair::new(
                    ElementGroup::single(header_for_container(doc, first_id, *first_block)),
                    ElementGroup::new(body),
                ));
            }
            None => {
                for (id, block) in &group.blocks {
                    pairs.push(BlockPair::new(
                        ElementGroup::single(header_for_container(doc, id, *block)),
                        ElementGroup::single(snapshot(*block)),
                    ));
                }
            }
        }
    }
    pairs
}

/// 容器分组的题头：页面中的 `i<ID>` 元素 → 题块内部的题头面板 → 合成题头
fn header_for_container(doc: &Html, id: &str, block: ElementRef<'_>) -> MarkupNode {
    let role_id = format!("i{}", id);
    if let Some(el) = descendant_elements(doc.root_element())
        .into_iter()
        .find(|el| el.value().id() == Some(role_id.as_str()))
    {
        return snapshot(el);
    }

    let inner: Vec<MarkupNode> = descendant_elements(block).into_iter().map(snapshot).collect();
    if let Some((i, tier)) = identify_header(&inner, None) {
        if matches!(tier, HeaderTier::RoleId | HeaderTier::Class) {
            return inner[i].clone();
        }
    }

    synthetic_header(&role_id)
}

fn synthetic_header(role_id: &str) -> MarkupNode {
    MarkupNode {
        tag: "div".to_string(),
        id: Some(role_id.to_string()),
        classes: vec!["header-container".to_string()],
        attrs: vec![
            ("id".to_string(), role_id.to_string()),
            ("class".to_string(), "header-container".to_string()),
        ],
        outer_html: format!(r#"<div id="{}" class="header-container"></div>"#, role_id),
        text: String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: Option<&str>, classes: &[&str], text: &str) -> MarkupNode {
        MarkupNode {
            tag: "div".to_string(),
            id: id.map(str::to_string),
            classes: classes.iter().map(|c| c.to_string()).collect(),
            attrs: Vec::new(),
            outer_html: format!("<div>{}</div>", text),
            text: text.to_string(),
        }
    }

    const LONG: &str = "Прочитайте текст и определите, какое из утверждений соответствует содержанию текста.";

    #[test]
    fn test_header_tier_role_id() {
        let nodes = vec![
            node(None, &["header"], "Задание 1"),
            node(Some("i3A5F"), &[], "КЭС 1.1"),
            node(Some("q3A5F"), &["qblock"], LONG),
        ];
        assert_eq!(identify_header(&nodes, Some(2)), Some((1, HeaderTier::RoleId)));
    }

    #[test]
    fn test_header_tier_class() {
        let nodes = vec![
            node(None, &[], "Задание 1"),
            node(None, &["task-info"], "meta"),
            node(None, &["qblock"], LONG),
        ];
        assert_eq!(identify_header(&nodes, Some(2)), Some((1, HeaderTier::Class)));
    }

    #[test]
    fn test_header_tier_text_only() {
        let nodes = vec![
            node(None, &["decor"], "***"),
            node(None, &[], "Кодификатор: 2.3"),
            node(None, &["qblock"], LONG),
        ];
        assert_eq!(identify_header(&nodes, Some(2)), Some((1, HeaderTier::Text)));
    }

    #[test]
    fn test_header_tier_first_non_body() {
        let nodes = vec![node(None, &["qblock"], LONG), node(None, &[], "просто текст")];
        assert_eq!(identify_header(&nodes, Some(0)), Some((1, HeaderTier::FirstNonBody)));
    }

    #[test]
    fn test_header_tier_first() {
        let nodes = vec![node(None, &["qblock"], LONG)];
        assert_eq!(identify_header(&nodes, Some(0)), Some((0, HeaderTier::First)));
        assert_eq!(identify_header(&[], None), None);
    }

    #[test]
    fn test_body_by_class_then_length() {
        let nodes = vec![node(None, &[], LONG), node(None, &["qblock"], "short")];
        assert_eq!(identify_body(&nodes), Some(1));

        let nodes = vec![node(None, &[], "short"), node(None, &[], LONG)];
        assert_eq!(identify_body(&nodes), Some(1));

        let nodes = vec![node(None, &[], "short"), node(None, &[], "tiny")];
        assert_eq!(identify_body(&nodes), None);
    }

    #[test]
    fn test_identifier_grouping_pairs_header_and_body() {
        let html = format!(
            r#"<html><body>
            <div id="i1A2B" class="task-header">Задание 3 КЭС: 1.2</div>
            <div id="q1A2B" class="qblock"><form name="qform1A2B"><p>{LONG}</p></form></div>
            <div id="iFF00" class="task-header">Задание 4</div>
            <div id="qFF00" class="qblock"><p>Второй вопрос</p></div>
            </body></html>"#
        );
        let pairs = segment(&html);
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0].header.first().unwrap().id.as_deref(), Some("i1A2B"));
        assert_eq!(pairs[0].body.first().unwrap().id.as_deref(), Some("q1A2B"));
        assert_eq!(pairs[1].header.first().unwrap().id.as_deref(), Some("iFF00"));
        assert!(pairs[1].body.text().contains("Второй вопрос"));
    }

    #[test]
    fn test_shared_context_grouping() {
        let html = r#"<html><body>
            <div class="qblock"><p>Shared passage A</p></div>
            <div class="qblock" id="q0A1"><div class="task-header-panel">Задание 1</div><p>Q1 text</p></div>
            <div class="qblock" id="q0A2"><div class="task-header-panel">Задание 2</div><p>Q2 text</p></div>
            <div class="qblock"><p>Shared passage B</p></div>
            <div class="qblock" id="q0B1"><p>Q3 text</p></div>
            </body></html>"#;
        let pairs = segment(html);
        assert_eq!(pairs.len(), 2);

        let first = pairs[0].body.text();
        assert!(first.contains("Shared passage A"));
        assert!(first.contains("Q1 text"));
        assert!(first.contains("Q2 text"));
        assert!(!first.contains("Q3 text"));
        assert!(pairs[0].header.text().contains("Задание 1"));

        let second = pairs[1].body.text();
        assert!(second.contains("Shared passage B"));
        assert!(second.contains("Q3 text"));
        assert_eq!(pairs[1].header.first().unwrap().id.as_deref(), Some("i0B1"));
    }

    #[test]
    fn test_context_without_following_blocks_is_dropped() {
        let html = r#"<div class="qblock" id="q01"><p>Only</p></div><div class="qblock"><p>Trailing context</p></div>"#;
        let pairs = segment(html);
        assert_eq!(pairs.len(), 1);
        assert!(!pairs[0].body.text().contains("Trailing context"));
    }

    #[test]
    fn test_nested_form_not_collected_twice() {
        let html = format!(
            r#"<div id="qABC" class="qblock"><form name="qformABC"><p>{LONG}</p></form></div>"#
        );
        let pairs = segment(&html);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].body.nodes.len(), 1);
    }

    #[test]
    fn test_segment_is_total() {
        for input in ["", "   ", "<", "<<<>>>", "<div class='qblock'>", "plain text", "\u{0}\u{1}"] {
            let _ = segment(input);
        }
        assert!(segment("<div>Just some random content</div>").is_empty());
    }

    #[test]
    fn test_segment_is_deterministic() {
        let html = r#"<div class="qblock"><p>ctx</p></div><div class="qblock" id="q1" data-a="1" data-b="2" title="t"><p>a</p></div>"#;
        let first = segment(html);
        for _ in 0..32 {
            assert_eq!(segment(html), first);
        }

        let block = first[0]
            .body
            .nodes
            .iter()
            .find(|n| n.id.as_deref() == Some("q1"))
            .unwrap();
        assert!(block
            .outer_html
            .starts_with(r#"<div class="qblock" id="q1" data-a="1" data-b="2" title="t">"#));
        let names: Vec<&str> = block.attrs.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(names, ["class", "id", "data-a", "data-b", "title"]);
    }

    #[test]
    fn test_non_hex_container_id_is_shared_context() {
        let html = r#"<div class="qblock" id="qintro"><p>Вступление</p></div>
            <div class="qblock" id="task5"><p>Ещё материал</p></div>
            <div class="qblock" id="q1F"><p>Вопрос</p></div>"#;
        let pairs = segment(html);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].block_id(), Some("1F"));
        let body = pairs[0].body.text();
        assert!(body.contains("Ещё материал"));
        assert!(body.contains("Вопрос"));
    }
}
