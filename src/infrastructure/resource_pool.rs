//! 资源池 - 基础设施层
//!
//! ## 职责
//!
//! - 初始化时一次性创建固定数量的资源，运行期间不扩缩
//! - `acquire()` 借出一个资源，池空时挂起等待（本层不设超时）
//! - 借出凭证 [`Lease`] 被丢弃时资源自动归还，调用方无论成功失败都不会泄漏资源
//! - `shutdown()` 关闭全部资源，可重复调用；单个资源关闭失败只记日志
//!
//! 只保证"同一资源不会同时借给两个调用方"，不保证先来先得。
//! 借出时做健康检查，检查失败的资源仍然照常借出并计数，不做剔除。

use std::future::Future;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Semaphore, SemaphorePermit};
use tracing::{debug, error, info, warn};

use crate::error::{AppError, AppResult, BrowserError};

/// 等待借出资源归还的最长时间
const SHUTDOWN_DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

/// 可放入资源池的资源
#[async_trait]
pub trait PooledResource: Send + Sync + 'static {
    /// 用于日志的名称
    fn label(&self) -> String;

    /// 健康检查
    async fn is_healthy(&self) -> bool;

    /// 关闭资源
    async fn close(&mut self) -> AppResult<()>;
}

/// 固定大小的资源池
pub struct ResourcePool<T: PooledResource> {
    idle: Mutex<Vec<T>>,
    permits: Semaphore,
    size: usize,
    closed: AtomicBool,
    unhealthy_leases: AtomicUsize,
}

impl<T: PooledResource> ResourcePool<T> {
    /// 用已创建好的资源构造资源池
    pub fn new(resources: Vec<T>) -> Self {
        let size = resources.len();
        Self {
            idle: Mutex::new(resources),
            permits: Semaphore::new(size),
            size,
            closed: AtomicBool::new(false),
            unhealthy_leases: AtomicUsize::new(0),
        }
    }

    /// 依次创建 `size` 个资源
    ///
    /// 任意一个创建失败时，关闭已创建的资源并返回错误。
    pub async fn initialize<F, Fut>(size: usize, mut factory: F) -> AppResult<Self>
    where
        F: FnMut(usize) -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        if size == 0 {
            return Err(AppError::invalid_config("pool_size", size));
        }

        let mut resources = Vec::with_capacity(size);
        for index in 0..size {
            match factory(index).await {
                Ok(resource) => {
                    debug!("资源 {} 已创建", resource.label());
                    resources.push(resource);
                }
                Err(e) => {
                    error!("创建第 {} 个池资源失败: {}", index + 1, e);
                    for mut created in resources {
                        if let Err(close_err) = created.close().await {
                            warn!("关闭资源 {} 失败: {}", created.label(), close_err);
                        }
                    }
                    return Err(e);
                }
            }
        }

        info!("✓ 资源池已就绪，共 {} 个资源", size);
        Ok(Self::new(resources))
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// 当前空闲资源数
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// 借出时健康检查失败的次数
    pub fn unhealthy_leases(&self) -> usize {
        self.unhealthy_leases.load(Ordering::Relaxed)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// 借出一个资源，池空时等待
    pub async fn acquire(&self) -> AppResult<Lease<'_, T>> {
        if self.is_closed() {
            return Err(BrowserError::PoolClosed.into());
        }

        let permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| AppError::from(BrowserError::PoolClosed))?;

        let resource = self.idle().pop().ok_or_else(|| {
            AppError::Other("资源池计数与空闲资源不一致".to_string())
        })?;

        if !resource.is_healthy().await {
            self.unhealthy_leases.fetch_add(1, Ordering::Relaxed);
            warn!("⚠️ 资源 {} 健康检查失败，仍继续使用", resource.label());
        }

        Ok(Lease {
            pool: self,
            resource: Some(resource),
            _permit: permit,
        })
    }

    /// 显式归还（等价于丢弃凭证）
    pub fn release(&self, lease: Lease<'_, T>) {
        drop(lease);
    }

    /// 关闭全部资源，可重复调用
    pub async fn shutdown(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            debug!("资源池已关闭，忽略重复调用");
            return;
        }

        info!("正在关闭资源池...");
        let drained = tokio::time::timeout(
            SHUTDOWN_DRAIN_TIMEOUT,
            self.permits.acquire_many(self.size as u32),
        )
        .await;
        if drained.is_err() {
            warn!("⚠️ 等待借出资源归还超时，仅关闭空闲资源");
        }
        self.permits.close();

        let resources: Vec<T> = std::mem::take(&mut *self.idle());
        let mut closed = 0;
        for mut resource in resources {
            match resource.close().await {
                Ok(()) => closed += 1,
                Err(e) => error!("关闭资源 {} 失败: {}", resource.label(), e),
            }
        }
        info!("✓ 资源池已关闭 ({}/{})", closed, self.size);
    }

    fn idle(&self) -> MutexGuard<'_, Vec<T>> {
        match self.idle.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// 借出凭证，丢弃时归还资源
pub struct Lease<'a, T: PooledResource> {
    pool: &'a ResourcePool<T>,
    resource: Option<T>,
    _permit: SemaphorePermit<'a>,
}

impl<T: PooledResource> Deref for Lease<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // resource 只在 drop 中取走
        self.resource.as_ref().unwrap_or_else(|| unreachable!())
    }
}

impl<T: PooledResource> DerefMut for Lease<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        self.resource.as_mut().unwrap_or_else(|| unreachable!())
    }
}

impl<T: PooledResource> Drop for Lease<'_, T> {
    fn drop(&mut self) {
        if let Some(resource) = self.resource.take() {
            self.pool.idle().push(resource);
        }
    }
}
