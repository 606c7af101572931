//! 抓取进度推算
//!
//! 只看已保存记录的来源地址，不维护额外的进度文件。地址里的 `page` 参数从 0 开始。

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::config::{ScrapeOptions, StartPage};
use crate::models::Problem;

static PAGE_PARAM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[?&]page=(\d+)").expect("valid regex"));

/// 从来源地址读出页码（从 1 开始）
///
/// 地址没有可解析的 `page` 参数时返回 None。
pub fn page_number_from_url(url: &str) -> Option<u32> {
    let raw = match Url::parse(url) {
        Ok(parsed) => parsed
            .query_pairs()
            .find(|(key, _)| key == "page")
            .map(|(_, value)| value.into_owned()),
        Err(_) => PAGE_PARAM.captures(url).map(|caps| caps[1].to_string()),
    }?;
    raw.trim().parse::<u32>().ok()?.checked_add(1)
}

/// 起始页推算
pub struct ProgressEngine;

impl ProgressEngine {
    /// 按已有记录的来源地址推算下一次运行的起始页
    ///
    /// 规则依次为：强制重来 → 显式起始页 → 没有记录 → 最大页码 + 1（不超过已知最后一页）→ 第 1 页。
    pub fn next_page<'a, I>(source_urls: I, options: &ScrapeOptions) -> u32
    where
        I: IntoIterator<Item = &'a str>,
    {
        if options.force_restart {
            return 1;
        }
        if let StartPage::Page(n) = options.start_page {
            return n;
        }

        let mut urls = source_urls.into_iter().peekable();
        if urls.peek().is_none() {
            return 1;
        }

        match urls.filter_map(page_number_from_url).max() {
            Some(max) => {
                let next = max.saturating_add(1);
                match options.last_known_page {
                    Some(last) if next > last => last,
                    _ => next,
                }
            }
            None => 1,
        }
    }

    /// 按已保存的题目推算起始页
    pub fn next_page_for(records: &[Problem], options: &ScrapeOptions) -> u32 {
        Self::next_page(records.iter().map(|p| p.source_url.as_str()), options)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://ege.fipi.ru/bank/questions.php?proj=AC437B34557F88EA4115D2F374B0A07B";

    fn url(page: u32) -> String {
        format!("{}&page={}", BASE, page)
    }

    #[test]
    fn test_page_number_from_url() {
        assert_eq!(page_number_from_url(&url(0)), Some(1));
        assert_eq!(page_number_from_url(&url(4)), Some(5));
        assert_eq!(page_number_from_url(BASE), None);
        assert_eq!(page_number_from_url("questions.php?proj=X&page=2"), Some(3));
        assert_eq!(page_number_from_url(&format!("{}&page=abc", BASE)), None);
    }

    #[test]
    fn test_next_page_rules() {
        let urls = [url(0), url(1), url(4)];
        let refs = || urls.iter().map(String::as_str);

        let options = ScrapeOptions::default();
        assert_eq!(ProgressEngine::next_page(refs(), &options), 6);

        let options = ScrapeOptions {
            force_restart: true,
            start_page: StartPage::Page(9),
            ..Default::default()
        };
        assert_eq!(ProgressEngine::next_page(refs(), &options), 1);

        let options = ScrapeOptions {
            start_page: StartPage::Page(9),
            ..Default::default()
        };
        assert_eq!(ProgressEngine::next_page(refs(), &options), 9);

        let options = ScrapeOptions {
            last_known_page: Some(5),
            ..Default::default()
        };
        assert_eq!(ProgressEngine::next_page(refs(), &options), 5);
    }

    #[test]
    fn test_next_page_without_usable_records() {
        let options = ScrapeOptions::default();
        assert_eq!(ProgressEngine::next_page(std::iter::empty(), &options), 1);
        assert_eq!(ProgressEngine::next_page([BASE], &options), 1);
    }
}
