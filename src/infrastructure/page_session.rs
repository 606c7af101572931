//! 页面会话 - 基础设施层
//!
//! 从借出的浏览器上开一个临时页面，只暴露"导航 / 取 HTML / 执行 JS"的能力

use std::future::Future;
use std::time::Duration;

use chromiumoxide::cdp::browser_protocol::emulation::{
    SetDeviceMetricsOverrideParams, SetUserAgentOverrideParams,
};
use chromiumoxide::{Browser, Page};
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, warn};

use crate::error::{AppError, AppResult, BrowserError};

/// 页面加载完成后额外等待的时间，让异步请求落地
const SETTLE_DELAY: Duration = Duration::from_millis(500);
const READY_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// 页面视口
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// 页面会话
///
/// 职责：
/// - 持有一个临时 Page，用完由调用方 `close()`
/// - 导航并等待页面稳定
/// - 不认识题目 / 科目
pub struct PageSession {
    page: Page,
}

impl PageSession {
    /// 在浏览器上打开空白页并设置视口和 UA
    pub async fn open(browser: &Browser, viewport: Viewport, user_agent: &str) -> AppResult<Self> {
        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| BrowserError::PageCreationFailed {
                source: Box::new(e),
            })?;

        let setup = Self::configure(&page, viewport, user_agent).await;
        let page = keep_or_close(page, setup, |page| async move {
            page.close().await.map_err(AppError::from)
        })
        .await?;

        Ok(Self { page })
    }

    async fn configure(page: &Page, viewport: Viewport, user_agent: &str) -> AppResult<()> {
        page.execute(SetDeviceMetricsOverrideParams::new(
            viewport.width,
            viewport.height,
            1.0,
            false,
        ))
        .await?;
        page.execute(SetUserAgentOverrideParams::new(user_agent))
            .await?;
        Ok(())
    }

    /// 导航到 URL 并等待页面稳定
    ///
    /// # 参数
    /// - `url`: 目标地址
    /// - `limit`: 导航和等待的总时限
    pub async fn navigate(&self, url: &str, limit: Duration) -> AppResult<()> {
        debug!("导航到: {}", url);
        let deadline = Instant::now() + limit;

        match timeout(limit, self.page.goto(url)).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => return Err(AppError::navigation_failed(url, e)),
            Err(_) => return Err(Self::timed_out(url, limit)),
        }

        let remaining = deadline.saturating_duration_since(Instant::now());
        match timeout(remaining, self.wait_until_ready()).await {
            Ok(result) => result,
            Err(_) => Err(Self::timed_out(url, limit)),
        }
    }

    async fn wait_until_ready(&self) -> AppResult<()> {
        loop {
            let state: String = self.eval_as("document.readyState").await?;
            if state == "complete" {
                break;
            }
            sleep(READY_POLL_INTERVAL).await;
        }
        sleep(SETTLE_DELAY).await;
        Ok(())
    }

    /// 当前页面的完整 HTML
    pub async fn content(&self) -> AppResult<String> {
        match self.page.content().await {
            Ok(html) => Ok(html),
            Err(e) => {
                let url = self.current_url().await.unwrap_or_default();
                Err(BrowserError::ContentFailed {
                    url,
                    source: Box::new(e),
                }
                .into())
            }
        }
    }

    /// 重定向之后的实际地址
    pub async fn current_url(&self) -> Option<String> {
        self.page.url().await.ok().flatten()
    }

    /// 执行 JS 代码并返回 JSON 结果
    pub async fn eval(&self, js_code: impl Into<String>) -> AppResult<JsonValue> {
        let result = self.page.evaluate(js_code.into()).await?;
        let json_value: JsonValue = result.into_value()?;
        Ok(json_value)
    }

    /// 执行 JS 代码并反序列化为指定类型
    pub async fn eval_as<T: DeserializeOwned>(&self, js_code: impl Into<String>) -> AppResult<T> {
        let json_value = self.eval(js_code).await?;
        let typed_value = serde_json::from_value(json_value)?;
        Ok(typed_value)
    }

    /// 关闭页面
    pub async fn close(self) -> AppResult<()> {
        self.page.close().await?;
        Ok(())
    }

    fn timed_out(url: &str, limit: Duration) -> AppError {
        BrowserError::NavigationTimeout {
            url: url.to_string(),
            secs: limit.as_secs(),
        }
        .into()
    }
}

/// 配置成功时交还资源，失败时先关闭资源再返回配置错误
///
/// 关闭失败只记日志，返回的仍是配置错误。
async fn keep_or_close<T, C, Fut>(resource: T, setup: AppResult<()>, close: C) -> AppResult<T>
where
    C: FnOnce(T) -> Fut,
    Fut: Future<Output = AppResult<()>>,
{
    match setup {
        Ok(()) => Ok(resource),
        Err(e) => {
            if let Err(close_err) = close(resource).await {
                warn!("⚠️ 关闭未配置完成的页面失败: {}", close_err);
            }
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_failed_setup_closes_resource() {
        let closes = AtomicUsize::new(0);

        let result = keep_or_close(
            "tab",
            Err(AppError::Other("视口设置失败".to_string())),
            |_| async {
                closes.fetch_add(1, Ordering::SeqCst);
                Ok(())
            },
        )
        .await;

        assert!(matches!(result, Err(AppError::Other(msg)) if msg == "视口设置失败"));
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_close_failure_keeps_setup_error() {
        let result = keep_or_close(
            "tab",
            Err(AppError::Other("UA 设置失败".to_string())),
            |_| async { Err(AppError::Other("页面已断开".to_string())) },
        )
        .await;

        assert!(matches!(result, Err(AppError::Other(msg)) if msg == "UA 设置失败"));
    }

    #[tokio::test]
    async fn test_successful_setup_keeps_resource() {
        let closes = AtomicUsize::new(0);

        let result = keep_or_close("tab", Ok(()), |_| async {
            closes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .await;

        assert_eq!(result.unwrap(), "tab");
        assert_eq!(closes.load(Ordering::SeqCst), 0);
    }
}
