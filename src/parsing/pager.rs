//! 分页器读取 - 纯函数层
//!
//! 题库页面底部的 `div.pager` 列出各页链接，这里只读出总页数，供翻页循环提前停止。

use std::sync::LazyLock;

use regex::Regex;
use scraper::Html;

use crate::parsing::dom::select_doc;

static PAGE_PARAM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"page=(\d+)").expect("valid regex"));

/// 从分页器链接推算总页数
///
/// 链接里的 page 参数从 0 开始，返回最大值 + 1；没有分页器时返回 None。
pub fn detect_total_pages(html: &str) -> Option<u32> {
    let doc = Html::parse_document(html);
    select_doc(&doc, "div.pager a[href]")
        .into_iter()
        .filter_map(|a| a.value().attr("href"))
        .filter_map(|href| PAGE_PARAM.captures(href))
        .filter_map(|caps| caps[1].parse::<u32>().ok())
        .max()
        .map(|max| max.saturating_add(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_highest_page_link() {
        let html = r##"
            <div class="pager">
                <a href="?proj=X&page=0">1</a>
                <a href="?proj=X&page=1">2</a>
                <a href="?proj=X&page=41">42</a>
                <a href="#">»</a>
            </div>"##;
        assert_eq!(detect_total_pages(html), Some(42));
    }

    #[test]
    fn test_no_pager() {
        assert_eq!(detect_total_pages("<div>nothing</div>"), None);
        assert_eq!(detect_total_pages(""), None);
    }
}
