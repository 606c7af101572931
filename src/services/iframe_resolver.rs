//! 题目 iframe 解析
//!
//! 题库页面把题目放在 `iframe#questions_container` 里。能定位并打开 iframe 时返回 iframe 的 HTML，
//! 否则退回主页面 HTML。

use std::time::Duration;

use async_trait::async_trait;
use scraper::Html;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::AppResult;
use crate::infrastructure::PageSession;
use crate::parsing::dom::select_doc;

/// 题目 iframe 的选择器
pub const CONTENT_FRAME_SELECTOR: &str = "iframe#questions_container";

/// 定位结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameLookup {
    /// 页面没有题目 iframe
    Absent,
    /// 有 iframe，但 src 为空或无法解析
    Unresolvable,
    /// 解析后的绝对地址
    Source(String),
}

/// 实际取到的页面
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    pub html: String,
    /// 内容的实际来源地址（iframe 地址或主页面地址）
    pub effective_url: String,
    pub from_frame: bool,
}

/// 能导航到 iframe 地址并读取 HTML 的对象
#[async_trait]
pub trait FrameNavigator: Send + Sync {
    async fn open_frame(&self, url: &str, limit: Duration) -> AppResult<String>;
}

#[async_trait]
impl FrameNavigator for PageSession {
    async fn open_frame(&self, url: &str, limit: Duration) -> AppResult<String> {
        self.navigate(url, limit).await?;
        self.content().await
    }
}

/// 在主页面 HTML 中定位题目 iframe
pub fn locate_content_frame(html: &str, page_url: &str) -> FrameLookup {
    let doc = Html::parse_document(html);
    let Some(frame) = select_doc(&doc, CONTENT_FRAME_SELECTOR).into_iter().next() else {
        return FrameLookup::Absent;
    };

    let src = frame.value().attr("src").map(str::trim).unwrap_or_default();
    if src.is_empty() || src.eq_ignore_ascii_case("about:blank") {
        return FrameLookup::Unresolvable;
    }

    match Url::parse(page_url).and_then(|base| base.join(src)) {
        Ok(url) => FrameLookup::Source(url.to_string()),
        Err(_) => match Url::parse(src) {
            Ok(url) => FrameLookup::Source(url.to_string()),
            Err(_) => FrameLookup::Unresolvable,
        },
    }
}

/// 用主页面 HTML 解析出实际的题目内容
///
/// 打开 iframe 失败时退回主页面，不返回错误。
pub async fn resolve<N: FrameNavigator + ?Sized>(
    navigator: &N,
    page_url: &str,
    main_html: String,
    limit: Duration,
) -> FetchedPage {
    let main_page = |html: String| FetchedPage {
        html,
        effective_url: page_url.to_string(),
        from_frame: false,
    };

    match locate_content_frame(&main_html, page_url) {
        FrameLookup::Absent => {
            debug!("页面没有题目 iframe，使用主页面内容");
            main_page(main_html)
        }
        FrameLookup::Unresolvable => {
            warn!("⚠️ 题目 iframe 地址无法解析，使用主页面内容");
            main_page(main_html)
        }
        FrameLookup::Source(frame_url) => match navigator.open_frame(&frame_url, limit).await {
            Ok(html) => {
                info!("✓ 已切换到题目 iframe: {}", frame_url);
                FetchedPage {
                    html,
                    effective_url: frame_url,
                    from_frame: true,
                }
            }
            Err(e) => {
                warn!("⚠️ 打开题目 iframe 失败 ({})，使用主页面内容: {}", frame_url, e);
                main_page(main_html)
            }
        },
    }
}
