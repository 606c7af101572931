//! 资源下载器 - 业务能力层
//!
//! ## 职责
//!
//! - 全局信号量限制同时进行的下载数
//! - 证书错误时用备用通道重试一次，其他错误不重试
//! - 同一次运行内按文件名去重，已写过的文件不再请求
//! - 失败只返回 `false` / `None`，不向上抛错

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, Semaphore};
use tracing::{debug, warn};
use url::Url;

use crate::config::Config;
use crate::error::{AppResult, DownloadError};
use crate::infrastructure::{AssetTransport, HttpTransport};
use crate::models::{AssetKind, AssetRef};

/// 同名文件的下载槽，值表示本次运行是否已写入
type WriteSlot = Arc<AsyncMutex<bool>>;

/// 资源下载器
pub struct AssetDownloader {
    primary: Arc<dyn AssetTransport>,
    fallback: Option<Arc<dyn AssetTransport>>,
    limiter: Arc<Semaphore>,
    slots: Mutex<HashMap<String, WriteSlot>>,
    downloaded: AtomicUsize,
}

impl AssetDownloader {
    pub fn new(
        primary: Arc<dyn AssetTransport>,
        fallback: Option<Arc<dyn AssetTransport>>,
        max_concurrent: usize,
    ) -> Self {
        Self {
            primary,
            fallback,
            limiter: Arc::new(Semaphore::new(max_concurrent.max(1))),
            slots: Mutex::new(HashMap::new()),
            downloaded: AtomicUsize::new(0),
        }
    }

    /// 按配置创建：校验证书的主通道 + 不校验证书的备用通道
    pub fn from_config(config: &Config) -> AppResult<Self> {
        let primary = HttpTransport::verified(config.asset_timeout(), &config.user_agent)?;
        let fallback = HttpTransport::unverified(config.asset_timeout(), &config.user_agent)?;
        Ok(Self::new(
            Arc::new(primary),
            Some(Arc::new(fallback)),
            config.max_concurrent_downloads,
        ))
    }

    /// 新一次运行：共用通道和信号量，去重集合和计数从零开始
    pub fn for_new_run(&self) -> Self {
        Self {
            primary: self.primary.clone(),
            fallback: self.fallback.clone(),
            limiter: self.limiter.clone(),
            slots: Mutex::new(HashMap::new()),
            downloaded: AtomicUsize::new(0),
        }
    }

    /// 本次运行实际写入的文件数
    pub fn downloaded_count(&self) -> usize {
        self.downloaded.load(Ordering::Relaxed)
    }

    /// 下载字节，失败返回 None
    pub async fn download_bytes(&self, url: &str) -> Option<Vec<u8>> {
        let _permit = self.limiter.acquire().await.ok()?;

        match self.primary.fetch(url).await {
            Ok(bytes) => Some(bytes),
            Err(e) => self.retry_on_certificate(url, e).await,
        }
    }

    async fn retry_on_certificate(&self, url: &str, err: DownloadError) -> Option<Vec<u8>> {
        let fallback = match (&self.fallback, err.is_certificate()) {
            (Some(fallback), true) => fallback,
            _ => {
                warn!("⚠️ 下载失败: {}", err);
                return None;
            }
        };

        warn!("⚠️ {}，改用 {} 通道重试", err, fallback.name());
        match fallback.fetch(url).await {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                warn!("⚠️ 备用通道下载失败: {}", e);
                None
            }
        }
    }

    /// 下载到指定路径
    ///
    /// 同名文件本次运行已写过时直接返回 `true`，不发请求。
    /// 同名的并发下载在同一个槽上排队，只有第一个会发请求；它失败时下一个再试。
    pub async fn download(&self, url: &str, destination: &Path) -> bool {
        let key = destination
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| destination.to_string_lossy().into_owned());

        let slot = self.slot(&key);
        let mut written = slot.lock().await;
        if *written {
            debug!("跳过已下载文件: {}", key);
            return true;
        }

        let Some(bytes) = self.download_bytes(url).await else {
            return false;
        };

        match write_file(destination, &bytes).await {
            Ok(()) => {
                *written = true;
                self.downloaded.fetch_add(1, Ordering::Relaxed);
                debug!("✓ 已保存 {} ({} 字节)", destination.display(), bytes.len());
                true
            }
            Err(e) => {
                warn!("⚠️ {}", e);
                false
            }
        }
    }

    /// 下载一个题块资源并返回本地引用
    ///
    /// # 参数
    /// - `url`: 绝对地址
    /// - `kind`: 资源类型，决定兜底文件名
    /// - `assets_dir`: 本地资源目录
    /// - `reference_prefix`: 写入 HTML 的引用前缀
    /// - `block_index`: 题块序号，用于修正以分隔符开头的文件名
    pub async fn download_asset(
        &self,
        url: &str,
        kind: AssetKind,
        assets_dir: &Path,
        reference_prefix: &str,
        block_index: usize,
    ) -> Option<AssetRef> {
        let filename = asset_filename(url, kind, block_index);
        let local_path = assets_dir.join(&filename);
        if !self.download(url, &local_path).await {
            return None;
        }
        Some(AssetRef {
            source_url: url.to_string(),
            local_path,
            reference: format!("{}{}", reference_prefix, filename),
            kind,
        })
    }

    fn slot(&self, key: &str) -> WriteSlot {
        let mut slots = match self.slots.lock() {
            Ok(slots) => slots,
            Err(poisoned) => poisoned.into_inner(),
        };
        slots.entry(key.to_string()).or_default().clone()
    }
}

async fn write_file(destination: &Path, bytes: &[u8]) -> Result<(), DownloadError> {
    let io_err = |source: std::io::Error| DownloadError::Io {
        path: destination.display().to_string(),
        source,
    };

    if let Some(parent) = destination.parent() {
        tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
    }
    if tokio::fs::metadata(destination)
        .await
        .is_ok_and(|m| m.is_dir())
    {
        tokio::fs::remove_dir_all(destination).await.map_err(io_err)?;
    }
    tokio::fs::write(destination, bytes).await.map_err(io_err)
}

/// 由 URL 推出本地文件名
///
/// 取路径最后一段；为空时用 `{类型}_{URL 哈希前 8 位}{默认扩展名}`。
pub fn asset_filename(url: &str, kind: AssetKind, block_index: usize) -> String {
    let basename = Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
        })
        .filter(|name| !name.is_empty());

    let name = basename.unwrap_or_else(|| {
        let hash = blake3::hash(url.as_bytes()).to_hex();
        format!("{}_{}{}", kind.label(), &hash[..8], kind.default_extension())
    });
    sanitize_filename(&name, block_index)
}

/// 清理文件名
///
/// 去掉非法字符，空白换成 `_`，连续分隔符合并；以分隔符开头时加题块序号前缀。
pub fn sanitize_filename(name: &str, block_index: usize) -> String {
    let mut cleaned = String::with_capacity(name.len());
    let mut last: Option<char> = None;
    for c in name.chars() {
        let c = match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => continue,
            c if c.is_control() => continue,
            c if c.is_whitespace() => '_',
            c => c,
        };
        if is_separator(c) && last == Some(c) {
            continue;
        }
        cleaned.push(c);
        last = Some(c);
    }

    if cleaned.is_empty() {
        return format!("asset_{}", block_index);
    }
    if cleaned.starts_with(is_separator) {
        return format!("{}{}", block_index, cleaned);
    }
    cleaned
}

fn is_separator(c: char) -> bool {
    matches!(c, '_' | '-' | '.')
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct FailingTransport {
        err: fn(&str) -> DownloadError,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl AssetTransport for FailingTransport {
        fn name(&self) -> &str {
            "failing"
        }

        async fn fetch(&self, url: &str) -> Result<Vec<u8>, DownloadError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err((self.err)(url))
        }
    }

    struct OkTransport {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl AssetTransport for OkTransport {
        fn name(&self) -> &str {
            "ok"
        }

        async fn fetch(&self, _url: &str) -> Result<Vec<u8>, DownloadError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(b"bytes".to_vec())
        }
    }

    struct SlowTransport {
        calls: AtomicUsize,
        fail_first: bool,
    }

    #[async_trait]
    impl AssetTransport for SlowTransport {
        fn name(&self) -> &str {
            "slow"
        }

        async fn fetch(&self, url: &str) -> Result<Vec<u8>, DownloadError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            if self.fail_first && call == 0 {
                return Err(not_found(url));
            }
            Ok(url.as_bytes().to_vec())
        }
    }

    fn certificate(url: &str) -> DownloadError {
        DownloadError::Certificate {
            url: url.to_string(),
            message: "invalid peer certificate".to_string(),
        }
    }

    fn not_found(url: &str) -> DownloadError {
        DownloadError::Status {
            url: url.to_string(),
            status: 404,
        }
    }

    #[test]
    fn test_asset_filename() {
        assert_eq!(
            asset_filename("https://ege.fipi.ru/docs/E0/img1.png", AssetKind::Image, 0),
            "img1.png"
        );

        let hashed = asset_filename("https://ege.fipi.ru/docs/", AssetKind::Image, 0);
        assert!(hashed.starts_with("image_"));
        assert!(hashed.ends_with(".jpg"));
        assert_eq!(hashed.len(), "image_".len() + 8 + ".jpg".len());
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("a b:c?.png", 0), "a_bc.png");
        assert_eq!(sanitize_filename("x__y--z.png", 0), "x_y-z.png");
        assert_eq!(sanitize_filename("_img.png", 4), "4_img.png");
        assert_eq!(sanitize_filename("???", 2), "asset_2");
    }

    #[tokio::test]
    async fn test_certificate_error_uses_fallback() {
        let primary = Arc::new(FailingTransport {
            err: certificate,
            calls: AtomicUsize::new(0),
        });
        let fallback = Arc::new(OkTransport {
            calls: AtomicUsize::new(0),
        });
        let downloader = AssetDownloader::new(primary.clone(), Some(fallback.clone()), 2);

        let bytes = downloader.download_bytes("https://ege.fipi.ru/a.png").await;
        assert_eq!(bytes.as_deref(), Some(&b"bytes"[..]));
        assert_eq!(primary.calls.load(Ordering::SeqCst), 1);
        assert_eq!(fallback.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_other_errors_do_not_fall_back() {
        let primary = Arc::new(FailingTransport {
            err: not_found,
            calls: AtomicUsize::new(0),
        });
        let fallback = Arc::new(OkTransport {
            calls: AtomicUsize::new(0),
        });
        let downloader = AssetDownloader::new(primary, Some(fallback.clone()), 2);

        assert!(downloader.download_bytes("https://ege.fipi.ru/a.png").await.is_none());
        assert_eq!(fallback.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_duplicate_filename_fetched_once() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(OkTransport {
            calls: AtomicUsize::new(0),
        });
        let downloader = AssetDownloader::new(transport.clone(), None, 2);

        let dest = dir.path().join("assets").join("img.png");
        assert!(downloader.download("https://ege.fipi.ru/a/img.png", &dest).await);
        assert!(downloader.download("https://ege.fipi.ru/b/img.png", &dest).await);
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
        assert_eq!(downloader.downloaded_count(), 1);

        let next_run = downloader.for_new_run();
        assert!(next_run.download("https://ege.fipi.ru/a/img.png", &dest).await);
        assert_eq!(transport.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_directory_at_destination_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("clash.png");
        std::fs::create_dir_all(dest.join("nested")).unwrap();

        let transport = Arc::new(OkTransport {
            calls: AtomicUsize::new(0),
        });
        let downloader = AssetDownloader::new(transport, None, 1);
        assert!(downloader.download("https://ege.fipi.ru/clash.png", &dest).await);
        assert!(dest.is_file());
        assert_eq!(std::fs::read(&dest).unwrap(), b"bytes");
    }

    #[tokio::test]
    async fn test_concurrent_same_filename_fetched_once() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(SlowTransport {
            calls: AtomicUsize::new(0),
            fail_first: false,
        });
        let downloader = AssetDownloader::new(transport.clone(), None, 4);
        let dest = dir.path().join("task.pdf");

        let (a, b) = tokio::join!(
            downloader.download("https://ege.fipi.ru/docs/a/task.pdf", &dest),
            downloader.download("https://ege.fipi.ru/docs/b/task.pdf", &dest),
        );

        assert!(a && b);
        assert_eq!(transport.calls.load(Ordering::SeqCst), 1);
        assert_eq!(downloader.downloaded_count(), 1);
    }

    #[tokio::test]
    async fn test_waiting_download_retries_after_failure() {
        let dir = tempfile::tempdir().unwrap();
        let transport = Arc::new(SlowTransport {
            calls: AtomicUsize::new(0),
            fail_first: true,
        });
        let downloader = AssetDownloader::new(transport.clone(), None, 4);
        let dest = dir.path().join("task.pdf");

        let (a, b) = tokio::join!(
            downloader.download("https://ege.fipi.ru/docs/a/task.pdf", &dest),
            downloader.download("https://ege.fipi.ru/docs/b/task.pdf", &dest),
        );

        assert!(!a);
        assert!(b);
        assert_eq!(transport.calls.load(Ordering::SeqCst), 2);
        assert_eq!(downloader.downloaded_count(), 1);
        assert_eq!(std::fs::read(&dest).unwrap(), b"https://ege.fipi.ru/docs/b/task.pdf");
    }
}
