//! 题块 HTML 的纯变换
//!
//! 删除类变换走解析树，改写类变换直接作用在序列化后的 HTML 上（html5ever 总是用双引号输出属性）。

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use scraper::Html;

use crate::parsing::dom::{escape_attr, remove_where, select, unescape_attr};

/// 附件链接的扩展名
pub const FILE_EXTENSIONS: [&str; 11] = [
    "pdf", "zip", "doc", "docx", "xls", "xlsx", "ppt", "pptx", "txt", "rtf", "csv",
];

static SHOW_PICTURE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"ShowPicture\('([^']*)'").expect("valid regex"));

static SHOW_PICTURE_SCRIPT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<script\b[^>]*>\s*ShowPicture\('([^']*)'.*?</script>").expect("valid regex")
});

static WINDOW_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"window\.open\('([^']*)'").expect("valid regex"));

static IMG_SRC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(<img\b[^>]*?\bsrc=")([^"]*)(")"#).expect("valid regex"));

static A_HREF: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(<a\b[^>]*?\bhref=")([^"]*)(")"#).expect("valid regex"));

static TASK_INFO: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"onclick=["']javascript:ShowTaskInfo\([^)]*\)["']"#).expect("valid regex")
});

/// 题块内的图片引用
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// `<script>ShowPicture('..')</script>`
    Script(String),
    /// `<img src="..">`
    Tag(String),
}

impl ImageSource {
    pub fn raw(&self) -> &str {
        match self {
            ImageSource::Script(s) | ImageSource::Tag(s) => s,
        }
    }
}

/// 题块内的附件链接
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileLink {
    /// 原始 href
    pub href: String,
    /// 去掉 `javascript:window.open` 包装和前导 `../` 后的目标
    pub target: String,
}

/// 删除 MathML
pub fn strip_mathml(html: &str) -> String {
    remove_where(html, |el| {
        let name = el.value().name();
        name.eq_ignore_ascii_case("math") || name.eq_ignore_ascii_case("mml:math")
    })
}

/// 删除提示框、状态标记和白底装饰行
pub fn strip_decorations(html: &str) -> String {
    remove_where(html, |el| {
        let value = el.value();
        match value.name() {
            "div" => value.id() == Some("hint") || value.classes().any(|c| c.contains("hint")),
            "span" => value
                .classes()
                .any(|c| c.contains("status-title-text") || c.contains("task-status")),
            "tr" => value
                .attr("bgcolor")
                .is_some_and(|c| c.eq_ignore_ascii_case("#FFFFFF")),
            _ => false,
        }
    })
}

/// 删除可见的答案输入框，隐藏的答案字段保留给元数据抽取
pub fn strip_answer_inputs(html: &str) -> String {
    remove_where(html, |el| {
        let value = el.value();
        value.name() == "input"
            && value.attr("name") == Some("answer")
            && !value
                .attr("type")
                .is_some_and(|t| t.eq_ignore_ascii_case("hidden"))
    })
}

/// 把 ShowTaskInfo 的参数改成页内题块序号
pub fn rewrite_task_info(html: &str, block_index: usize) -> String {
    TASK_INFO
        .replace_all(
            html,
            format!(r#"onclick="javascript:ShowTaskInfo('{}')""#, block_index).as_str(),
        )
        .into_owned()
}

/// 收集尚未本地化的图片引用（文档顺序，去重）
pub fn image_sources(html: &str, local_prefix: &str) -> Vec<ImageSource> {
    let fragment = Html::parse_fragment(html);
    let root = fragment.root_element();
    let mut sources: Vec<ImageSource> = Vec::new();

    for script in select(root, "script") {
        let code: String = script.text().collect();
        if let Some(caps) = SHOW_PICTURE.captures(&code) {
            let src = ImageSource::Script(caps[1].to_string());
            if !caps[1].is_empty() && !sources.contains(&src) {
                sources.push(src);
            }
        }
    }

    for img in select(root, "img[src]") {
        let Some(src) = img.value().attr("src") else {
            continue;
        };
        if src.is_empty() || src.starts_with(local_prefix) || src.starts_with("data:") {
            continue;
        }
        let src = ImageSource::Tag(src.to_string());
        if !sources.contains(&src) {
            sources.push(src);
        }
    }
    sources
}

/// 收集附件链接（`javascript:window.open(..)` 和直链）
pub fn file_links(html: &str, local_prefix: &str) -> Vec<FileLink> {
    let fragment = Html::parse_fragment(html);
    let mut links: Vec<FileLink> = Vec::new();

    for a in select(fragment.root_element(), "a[href]") {
        let Some(href) = a.value().attr("href") else {
            continue;
        };
        if href.starts_with(local_prefix) {
            continue;
        }

        let target = if href.starts_with("javascript:") {
            match WINDOW_OPEN.captures(href) {
                Some(caps) => strip_parent_segments(&caps[1]),
                None => continue,
            }
        } else if has_file_extension(href) {
            strip_parent_segments(href)
        } else {
            continue;
        };

        if !target.is_empty() && !links.iter().any(|l| l.href == href) {
            links.push(FileLink {
                href: href.to_string(),
                target,
            });
        }
    }
    links
}

fn has_file_extension(href: &str) -> bool {
    let path = href.split(|c: char| c == '?' || c == '#').next().unwrap_or(href).to_lowercase();
    FILE_EXTENSIONS
        .iter()
        .any(|ext| path.ends_with(&format!(".{}", ext)))
}

fn strip_parent_segments(path: &str) -> String {
    let mut rest = path.trim();
    while let Some(stripped) = rest.strip_prefix("../") {
        rest = stripped;
    }
    rest.to_string()
}

/// 按映射改写 `<img src>`，键为原始属性值
pub fn replace_image_sources(html: &str, replacements: &HashMap<String, String>) -> String {
    replace_attr(&IMG_SRC, html, replacements)
}

/// 按映射改写 `<a href>`，键为原始属性值
pub fn replace_link_targets(html: &str, replacements: &HashMap<String, String>) -> String {
    replace_attr(&A_HREF, html, replacements)
}

/// 把 ShowPicture 脚本替换成指向本地文件的 `<img>`
pub fn replace_show_picture(html: &str, replacements: &HashMap<String, String>) -> String {
    if replacements.is_empty() {
        return html.to_string();
    }
    SHOW_PICTURE_SCRIPT
        .replace_all(html, |caps: &Captures<'_>| match replacements.get(&caps[1]) {
            Some(local) => format!(r#"<img src="{}">"#, escape_attr(local)),
            None => caps[0].to_string(),
        })
        .into_owned()
}

fn replace_attr(pattern: &Regex, html: &str, replacements: &HashMap<String, String>) -> String {
    if replacements.is_empty() {
        return html.to_string();
    }
    pattern
        .replace_all(html, |caps: &Captures<'_>| {
            match replacements.get(&unescape_attr(&caps[2])) {
                Some(local) => format!("{}{}{}", &caps[1], escape_attr(local), &caps[3]),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_mathml() {
        let html = r#"<div class="qblock"><p>x = <math><mi>y</mi></math></p></div>"#;
        let cleaned = strip_mathml(html);
        assert!(!cleaned.contains("<math"));
        assert!(cleaned.contains("x ="));
    }

    #[test]
    fn test_strip_decorations() {
        let html = r##"<div class="qblock">
            <div id="hint">Подсказка</div>
            <span class="status-title-text">Статус</span>
            <span class="task-status task-status-3">Не решено</span>
            <table><tbody><tr bgcolor="#FFFFFF"><td>white</td></tr><tr><td>kept</td></tr></tbody></table>
            <p>Условие</p></div>"##;
        let cleaned = strip_decorations(html);
        for gone in ["Подсказка", "Статус", "Не решено", "white"] {
            assert!(!cleaned.contains(gone), "{} should be removed", gone);
        }
        assert!(cleaned.contains("kept"));
        assert!(cleaned.contains("Условие"));
    }

    #[test]
    fn test_strip_answer_inputs_keeps_hidden() {
        let html = r#"<div><input type="text" name="answer"><input type="hidden" name="answer" value="7"></div>"#;
        let cleaned = strip_answer_inputs(html);
        assert!(!cleaned.contains(r#"type="text""#));
        assert!(cleaned.contains(r#"value="7""#));
    }

    #[test]
    fn test_rewrite_task_info() {
        let html = r#"<span onclick="javascript:ShowTaskInfo('q1A', 3)">i</span>"#;
        assert_eq!(
            rewrite_task_info(html, 5),
            r#"<span onclick="javascript:ShowTaskInfo('5')">i</span>"#
        );
    }

    #[test]
    fn test_image_sources_skip_local() {
        let html = r#"<div>
            <script>ShowPicture('docs/E0/img1.png', 200, 100)</script>
            <img src="../../docs/E0/img2.gif"><img src="assets/done.png"><img src="../../docs/E0/img2.gif">
        </div>"#;
        let sources = image_sources(html, "assets/");
        assert_eq!(
            sources,
            vec![
                ImageSource::Script("docs/E0/img1.png".to_string()),
                ImageSource::Tag("../../docs/E0/img2.gif".to_string()),
            ]
        );
    }

    #[test]
    fn test_file_links() {
        let html = r#"<div>
            <a href="javascript:window.open('../../docs/task.zip')">zip</a>
            <a href="../docs/table.XLSX">xlsx</a>
            <a href="https://fipi.ru/about">site</a>
            <a href="assets/already.pdf">pdf</a>
        </div>"#;
        let links = file_links(html, "assets/");
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].target, "docs/task.zip");
        assert_eq!(links[1].target, "docs/table.XLSX");
    }

    #[test]
    fn test_replace_sources_and_scripts() {
        let html = r#"<div><script>ShowPicture('docs/a.png')</script><img src="b.png?x=1&amp;y=2"><img src="c.png"></div>"#;
        let mut map = HashMap::new();
        map.insert("docs/a.png".to_string(), "assets/a.png".to_string());
        map.insert("b.png?x=1&y=2".to_string(), "assets/b.png".to_string());

        let html = replace_show_picture(html, &map);
        let html = replace_image_sources(&html, &map);
        assert!(html.contains(r#"<img src="assets/a.png">"#));
        assert!(html.contains(r#"<img src="assets/b.png">"#));
        assert!(html.contains(r#"<img src="c.png">"#));
        assert!(!html.contains("ShowPicture"));
    }

    #[test]
    fn test_replace_link_targets() {
        let html = r#"<a href="javascript:window.open('../../docs/task.zip')">zip</a>"#;
        let mut map = HashMap::new();
        map.insert(
            "javascript:window.open('../../docs/task.zip')".to_string(),
            "assets/task.zip".to_string(),
        );
        assert_eq!(replace_link_targets(html, &map), r#"<a href="assets/task.zip">zip</a>"#);
    }
}
