use std::path::PathBuf;

use chromiumoxide::{Browser, BrowserConfig};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::error::{AppResult, BrowserError};

/// 启动一个浏览器实例
///
/// 每个实例使用独立的用户数据目录，池内多个浏览器互不干扰。
///
/// # 参数
/// - `config`: 程序配置（无头模式、可执行文件、窗口大小）
/// - `index`: 池内序号，用于区分用户数据目录
///
/// # 返回
/// 浏览器和后台事件循环的任务句柄
pub async fn launch_browser(config: &Config, index: usize) -> AppResult<(Browser, JoinHandle<()>)> {
    info!("🚀 启动浏览器 #{}...", index);

    let mut builder = BrowserConfig::builder()
        .user_data_dir(profile_dir(index))
        .window_size(config.viewport_width, config.viewport_height)
        .args(vec![
            "--disable-gpu",
            "--no-sandbox",
            "--disable-dev-shm-usage",
            "--remote-debugging-port=0",
        ]);
    builder = if config.browser_headless {
        builder.new_headless_mode()
    } else {
        builder.with_head()
    };
    if let Some(executable) = &config.chrome_executable {
        debug!("使用浏览器可执行文件: {}", executable.display());
        builder = builder.chrome_executable(executable);
    }

    let browser_config = builder.build().map_err(|e| {
        error!("配置浏览器 #{} 失败: {}", index, e);
        BrowserError::LaunchFailed {
            index,
            message: e,
        }
    })?;

    let (browser, mut handler) = Browser::launch(browser_config).await.map_err(|e| {
        error!("启动浏览器 #{} 失败: {}", index, e);
        BrowserError::LaunchFailed {
            index,
            message: e.to_string(),
        }
    })?;

    // 在后台处理浏览器事件
    let handler_task = tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    });

    // 等待浏览器状态同步
    sleep(tokio::time::Duration::from_millis(300)).await;

    info!("✅ 浏览器 #{} 已启动", index);
    Ok((browser, handler_task))
}

fn profile_dir(index: usize) -> PathBuf {
    std::env::temp_dir().join(format!("fipi-scraper-{}-{}", std::process::id(), index))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profile_dirs_are_distinct() {
        assert_ne!(profile_dir(0), profile_dir(1));
        assert!(profile_dir(3).to_string_lossy().ends_with("-3"));
    }
}
