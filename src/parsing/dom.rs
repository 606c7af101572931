//! scraper 的薄封装
//!
//! 选择器解析失败时返回空结果，上层的解析函数因此对任意输入都不会失败。

use std::ops::Deref;

use scraper::{ElementRef, Html, Selector};

use crate::models::{ElementGroup, MarkupNode};

/// 在元素内按 CSS 选择
pub fn select<'a>(root: ElementRef<'a>, css: &str) -> Vec<ElementRef<'a>> {
    match Selector::parse(css) {
        Ok(sel) => root.select(&sel).collect(),
        Err(_) => Vec::new(),
    }
}

/// 在整个文档内按 CSS 选择
pub fn select_doc<'a>(doc: &'a Html, css: &str) -> Vec<ElementRef<'a>> {
    match Selector::parse(css) {
        Ok(sel) => doc.select(&sel).collect(),
        Err(_) => Vec::new(),
    }
}

/// 元素的全部后代元素（不含自身），文档顺序
pub fn descendant_elements(root: ElementRef<'_>) -> Vec<ElementRef<'_>> {
    root.descendants()
        .skip(1)
        .filter_map(ElementRef::wrap)
        .collect()
}

/// 等价于 `get_text(" ", strip=True)`
pub fn element_text(el: ElementRef<'_>) -> String {
    el.text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// 复制节点信息
pub fn snapshot(el: ElementRef<'_>) -> MarkupNode {
    let value = el.value();
    MarkupNode {
        tag: value.name().to_lowercase(),
        id: value.id().map(str::to_string),
        classes: value.classes().map(str::to_string).collect(),
        attrs: value
            .attrs()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
        outer_html: el.html(),
        text: element_text(el),
    }
}

/// 把一段 HTML 片段的顶层元素转成元素组
pub fn fragment_group(html: &str) -> ElementGroup {
    let fragment = Html::parse_fragment(html);
    let nodes = fragment
        .root_element()
        .children()
        .filter_map(ElementRef::wrap)
        .map(snapshot)
        .collect();
    ElementGroup::new(nodes)
}

/// 删除片段中满足条件的元素，返回新的 HTML
pub fn remove_where<F>(html: &str, mut predicate: F) -> String
where
    F: FnMut(ElementRef<'_>) -> bool,
{
    let mut fragment = Html::parse_fragment(html);
    let doomed: Vec<_> = fragment
        .root_element()
        .descendants()
        .skip(1)
        .filter_map(ElementRef::wrap)
        .filter(|el| predicate(*el))
        .map(|el| el.deref().id())
        .collect();

    if doomed.is_empty() {
        return html.to_string();
    }

    for id in doomed {
        if let Some(mut node) = fragment.tree.get_mut(id) {
            node.detach();
        }
    }
    fragment.root_element().inner_html()
}

/// 还原序列化时转义的属性值
pub fn unescape_attr(value: &str) -> String {
    value
        .replace("&quot;", "\"")
        .replace("&nbsp;", "\u{a0}")
        .replace("&amp;", "&")
}

/// 按属性值的序列化形式转义
pub fn escape_attr(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('\u{a0}', "&nbsp;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_text_joins_stripped_fragments() {
        let doc = Html::parse_fragment("<div>  Задание <b> 5 </b>\n text </div>");
        let div = select_doc(&doc, "div")[0];
        assert_eq!(element_text(div), "Задание 5 text");
    }

    #[test]
    fn test_invalid_selector_yields_nothing() {
        let doc = Html::parse_document("<p>x</p>");
        assert!(select_doc(&doc, "p[[").is_empty());
    }

    #[test]
    fn test_remove_where_detaches_nested() {
        let html = r#"<div class="qblock"><p>keep</p><span class="hint">drop</span></div>"#;
        let cleaned = remove_where(html, |el| el.value().classes().any(|c| c == "hint"));
        assert!(cleaned.contains("keep"));
        assert!(!cleaned.contains("drop"));
    }

    #[test]
    fn test_fragment_group_top_level_only() {
        let group = fragment_group(r#"<div id="a"><div id="b"></div></div><p id="c">t</p>"#);
        let ids: Vec<_> = group.nodes.iter().filter_map(|n| n.id.clone()).collect();
        assert_eq!(ids, vec!["a".to_string(), "c".to_string()]);
    }

    #[test]
    fn test_attr_escape_roundtrip() {
        let raw = "a.php?x=1&y=\"2\"";
        assert_eq!(unescape_attr(&escape_attr(raw)), raw);
    }
}
