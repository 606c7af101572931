//! 题块元数据抽取 - 纯函数层
//!
//! 从 (题头, 题干) 对中抽出题号、两套编码、答案、本地资源引用和稳定 ID。
//! 解析不到的字段保持为空，不视为错误；这里不做任何网络访问，资源引用必须已经被改写为本地路径。

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html};

use crate::models::{BlockPair, RawRecord, Subject};
use crate::parsing::dom::{element_text, select};

static TASK_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)(?:Задание|Task)\s+(\d+)").expect("valid regex"));

static TASK_CLASS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^task-(\d+)$").expect("valid regex"));

static KES_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)КЭС|кодификатор").expect("valid regex"));

static KOS_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)КОС|требование").expect("valid regex"));

static CODE_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+(?:\.\d+)*").expect("valid regex"));

/// 题号到 (难度, 考试部分) 的映射
///
/// 1–12 题属于第一部分（基础），13–19 题属于第二部分（提高）。
pub fn classify_task(task_number: u32) -> Option<(&'static str, &'static str)> {
    match task_number {
        1..=12 => Some(("basic", "Part 1")),
        13..=19 => Some(("advanced", "Part 2")),
        _ => None,
    }
}

/// 元数据抽取器
#[derive(Debug, Clone)]
pub struct MetadataExtractor {
    /// 本地资源引用前缀，例如 `assets/`
    assets_prefix: String,
}

impl Default for MetadataExtractor {
    fn default() -> Self {
        Self::new("")
    }
}

impl MetadataExtractor {
    /// # 参数
    /// - `files_location_prefix`: 写入记录的路径前缀，资源位于其下的 `assets/`
    pub fn new(files_location_prefix: &str) -> Self {
        Self {
            assets_prefix: format!("{}assets/", files_location_prefix),
        }
    }

    pub fn assets_prefix(&self) -> &str {
        &self.assets_prefix
    }

    /// 从题块对抽取原始记录
    ///
    /// # 参数
    /// - `pair`: 已完成资源改写的题块对
    /// - `subject`: 所属科目
    /// - `source_url`: 实际抓取的页面地址
    /// - `block_index`: 题块在页内的序号，用于内容哈希
    pub fn extract(
        &self,
        pair: &BlockPair,
        subject: Subject,
        source_url: &str,
        block_index: usize,
    ) -> RawRecord {
        let header_html = pair.header.html();
        let body_html = pair.body.html();
        let header = Html::parse_fragment(&header_html);
        let body = Html::parse_fragment(&body_html);
        let body_text = pair.body.text();

        let task_number = extract_task_number(&pair.header.text(), header.root_element());
        let (difficulty_level, exam_part) = match task_number.and_then(classify_task) {
            Some((level, part)) => (Some(level.to_string()), Some(part.to_string())),
            None => (None, None),
        };

        let stable_id = stable_id(pair, header.root_element(), body.root_element(), &body_text, block_index);

        RawRecord {
            problem_id: format!("{}_{}", subject.alias(), stable_id),
            stable_id,
            subject_name: subject.official_name().to_string(),
            text: body_text,
            source_url: source_url.to_string(),
            answer: extract_answer(body.root_element()),
            images: self.local_refs(body.root_element(), "img[src]", "src"),
            files: self.local_refs(body.root_element(), "a[href]", "href"),
            kes_codes: extract_codes(header.root_element(), &KES_LABEL),
            kos_codes: extract_codes(header.root_element(), &KOS_LABEL),
            task_number,
            difficulty_level,
            exam_part,
            fipi_proj_id: subject.proj_id().to_string(),
            body_html,
            header_html,
        }
    }

    fn local_refs(&self, root: ElementRef<'_>, css: &str, attr: &str) -> Vec<String> {
        let mut refs: Vec<String> = Vec::new();
        for el in select(root, css) {
            if let Some(value) = el.value().attr(attr) {
                if value.starts_with(&self.assets_prefix) && !refs.iter().any(|r| r == value) {
                    refs.push(value.to_string());
                }
            }
        }
        refs
    }
}

/// 题号：题头文本 → `data-task-number` → `task-N` class
fn extract_task_number(header_text: &str, header: ElementRef<'_>) -> Option<u32> {
    if let Some(n) = TASK_LABEL
        .captures(header_text)
        .and_then(|caps| caps[1].parse().ok())
    {
        return Some(n);
    }

    if let Some(n) = select(header, "[data-task-number]")
        .into_iter()
        .filter_map(|el| el.value().attr("data-task-number"))
        .find_map(|v| v.trim().parse().ok())
    {
        return Some(n);
    }

    select(header, "[class]")
        .into_iter()
        .flat_map(|el| el.value().classes().collect::<Vec<_>>())
        .find_map(|class| TASK_CLASS.captures(class).and_then(|caps| caps[1].parse().ok()))
}

/// 编码列表：找到匹配标签的文本节点，取其父元素全文中的点分数字
///
/// 父元素只含标签本身时（表格里标签和值分在两个单元格），改用上一级元素的文本。
fn extract_codes(header: ElementRef<'_>, label: &Regex) -> Vec<String> {
    let label_parent = header
        .descendants()
        .filter(|node| node.value().as_text().is_some_and(|t| label.is_match(t)))
        .find_map(|node| node.parent().and_then(ElementRef::wrap));

    let Some(parent) = label_parent else {
        return Vec::new();
    };

    let codes = code_tokens(&element_text(parent));
    if !codes.is_empty() {
        return codes;
    }
    parent
        .parent()
        .and_then(ElementRef::wrap)
        .map(|grandparent| code_tokens(&element_text(grandparent)))
        .unwrap_or_default()
}

fn code_tokens(text: &str) -> Vec<String> {
    let mut codes: Vec<String> = Vec::new();
    for m in CODE_TOKEN.find_iter(text) {
        if !codes.iter().any(|c| c == m.as_str()) {
            codes.push(m.as_str().to_string());
        }
    }
    codes
}

/// 答案：隐藏的 correct_answer → 隐藏的 answer → `.correct-answer` 的 value → 其文本 → `.answer-value`
fn extract_answer(body: ElementRef<'_>) -> Option<String> {
    let non_empty = |v: &str| {
        let v = v.trim();
        (!v.is_empty()).then(|| v.to_string())
    };

    let hidden = |name: &str| {
        select(body, &format!(r#"input[type="hidden"][name="{}"]"#, name))
            .into_iter()
            .find_map(|el| el.value().attr("value").and_then(non_empty))
    };

    if let Some(answer) = hidden("correct_answer") {
        return Some(answer);
    }
    if let Some(answer) = hidden("answer") {
        return Some(answer);
    }

    let marked = select(body, ".correct-answer");
    if let Some(answer) = marked
        .iter()
        .find_map(|el| el.value().attr("value").and_then(non_empty))
    {
        return Some(answer);
    }
    if let Some(answer) = marked.iter().find_map(|el| non_empty(&element_text(*el))) {
        return Some(answer);
    }

    select(body, ".answer-value").into_iter().find_map(|el| {
        el.value()
            .attr("value")
            .and_then(non_empty)
            .or_else(|| non_empty(&element_text(el)))
    })
}

/// 稳定 ID：题干 `q` id → `data-task-id` → `data-problem-id` → 内容哈希
fn stable_id(
    pair: &BlockPair,
    header: ElementRef<'_>,
    body: ElementRef<'_>,
    body_text: &str,
    block_index: usize,
) -> String {
    if let Some(id) = pair.block_id() {
        return id.to_string();
    }

    for attr in ["data-task-id", "data-problem-id"] {
        let found = [header, body]
            .into_iter()
            .flat_map(|root| select(root, &format!("[{}]", attr)))
            .filter_map(|el| el.value().attr(attr))
            .map(str::trim)
            .find(|v| !v.is_empty());
        if let Some(id) = found {
            return id.to_string();
        }
    }

    let digest = blake3::hash(format!("{}:{}", block_index, body_text).as_bytes());
    format!("block_{}", &digest.to_hex()[..16])
}
