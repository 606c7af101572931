//! 浏览器句柄 - 基础设施层
//!
//! 一个句柄对应一个浏览器进程，由 [`BrowserPool`] 统一创建和关闭。

use async_trait::async_trait;
use chromiumoxide::Browser;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::browser::launch_browser;
use crate::config::Config;
use crate::error::AppResult;
use crate::infrastructure::resource_pool::{PooledResource, ResourcePool};

/// 浏览器池
pub type BrowserPool = ResourcePool<BrowserHandle>;

/// 池内的一个浏览器实例
pub struct BrowserHandle {
    index: usize,
    browser: Browser,
    handler: JoinHandle<()>,
}

impl BrowserHandle {
    /// 启动浏览器并包装成句柄
    pub async fn launch(config: &Config, index: usize) -> AppResult<Self> {
        let (browser, handler) = launch_browser(config, index).await?;
        Ok(Self {
            index,
            browser,
            handler,
        })
    }

    pub fn browser(&self) -> &Browser {
        &self.browser
    }

    pub fn index(&self) -> usize {
        self.index
    }
}

/// 按配置创建浏览器池
pub async fn launch_pool(config: &Config) -> AppResult<BrowserPool> {
    BrowserPool::initialize(config.browser_pool_size, |index| {
        BrowserHandle::launch(config, index)
    })
    .await
}

#[async_trait]
impl PooledResource for BrowserHandle {
    fn label(&self) -> String {
        format!("browser#{}", self.index)
    }

    async fn is_healthy(&self) -> bool {
        self.browser.version().await.is_ok()
    }

    async fn close(&mut self) -> AppResult<()> {
        let result = self.browser.close().await;
        if let Err(e) = self.browser.wait().await {
            debug!("等待浏览器 #{} 退出失败: {}", self.index, e);
        }
        self.handler.abort();
        result?;
        Ok(())
    }
}
