//! 页面抓取 - 业务能力层
//!
//! 借一个浏览器 → 开临时页面 → 导航 → 取 HTML → 解析 iframe → 关页面 → 归还浏览器。
//! 不论成功失败，页面都会关闭，浏览器都会归还。

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::AppResult;
use crate::infrastructure::{BrowserPool, PageSession, Viewport};
use crate::services::iframe_resolver::{self, FetchedPage};

/// 能按 URL 取回题目 HTML 的对象
#[async_trait]
pub trait HtmlSource: Send + Sync {
    async fn fetch(&self, url: &str, limit: Duration) -> AppResult<FetchedPage>;
}

/// 基于浏览器池的页面抓取器
pub struct ContentFetcher {
    pool: Arc<BrowserPool>,
    viewport: Viewport,
    user_agent: String,
}

impl ContentFetcher {
    pub fn new(pool: Arc<BrowserPool>, config: &Config) -> Self {
        Self {
            pool,
            viewport: Viewport {
                width: config.viewport_width,
                height: config.viewport_height,
            },
            user_agent: config.user_agent.clone(),
        }
    }

    async fn fetch_with(&self, session: &PageSession, url: &str, limit: Duration) -> AppResult<FetchedPage> {
        session.navigate(url, limit).await?;
        let html = session.content().await?;
        let page_url = session.current_url().await.unwrap_or_else(|| url.to_string());
        debug!("主页面已加载: {} ({} 字节)", page_url, html.len());
        Ok(iframe_resolver::resolve(session, &page_url, html, limit).await)
    }
}

#[async_trait]
impl HtmlSource for ContentFetcher {
    async fn fetch(&self, url: &str, limit: Duration) -> AppResult<FetchedPage> {
        let lease = self.pool.acquire().await?;
        debug!("借出浏览器 #{} 抓取 {}", lease.index(), url);

        let session = PageSession::open(lease.browser(), self.viewport, &self.user_agent).await?;
        let result = self.fetch_with(&session, url, limit).await;

        if let Err(e) = session.close().await {
            warn!("⚠️ 关闭页面失败: {}", e);
        }
        self.pool.release(lease);
        result
    }
}
