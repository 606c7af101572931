//! 应用 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个应用的入口，负责多科目的调度和资源管理。
//!
//! ## 核心功能
//!
//! 1. **应用初始化**：启动浏览器池、创建下载通道、组装各层组件
//! 2. **并发控制**：使用 Semaphore 限制同时抓取的科目数
//! 3. **故障隔离**：单个科目的 panic 只会变成该科目的失败汇总
//! 4. **资源管理**：唯一持有浏览器池，结束时统一关闭
//! 5. **全局统计**：汇总所有科目的抓取结果

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Local;
use tokio::sync::Semaphore;
use tracing::{error, info};

use crate::config::{Config, ScrapeOptions};
use crate::infrastructure::{launch_pool, BrowserPool};
use crate::models::{ScrapingSummary, Subject};
use crate::orchestrator::subject_run::SubjectRunner;
use crate::services::{AssetDownloader, ContentFetcher};
use crate::storage::ProblemRepository;
use crate::utils::logging;
use crate::workflow::PageScrapeOrchestrator;

/// 应用主结构
pub struct App {
    config: Config,
    pool: Arc<BrowserPool>,
    runner: Arc<SubjectRunner>,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config, repository: Arc<dyn ProblemRepository>) -> Result<Self> {
        config.validate().context("配置无效")?;

        let pool = Arc::new(launch_pool(&config).await.context("启动浏览器池失败")?);
        let downloader = match AssetDownloader::from_config(&config) {
            Ok(downloader) => Arc::new(downloader),
            Err(e) => {
                pool.shutdown().await;
                return Err(e).context("创建下载器失败");
            }
        };

        let fetcher = Arc::new(ContentFetcher::new(pool.clone(), &config));
        let orchestrator = Arc::new(PageScrapeOrchestrator::new(
            fetcher,
            downloader,
            repository.clone(),
            &config,
        ));
        let runner = Arc::new(SubjectRunner::new(orchestrator, repository, &config));

        Ok(Self {
            config,
            pool,
            runner,
        })
    }

    /// 抓取全部科目并输出统计
    pub async fn run(&self, subjects: &[Subject], options: &ScrapeOptions) -> Vec<ScrapingSummary> {
        logging::log_startup(&self.config, subjects);
        let summaries = run_subjects(
            self.runner.clone(),
            subjects,
            options,
            self.config.max_concurrent_subjects,
        )
        .await;
        logging::print_final_stats(&summaries);
        if self.pool.unhealthy_leases() > 0 {
            info!("浏览器健康检查失败 {} 次", self.pool.unhealthy_leases());
        }
        summaries
    }

    /// 关闭浏览器池
    pub async fn shutdown(&self) {
        self.pool.shutdown().await;
    }
}

/// 并发抓取多个科目，结果顺序与 `subjects` 一致
pub async fn run_subjects(
    runner: Arc<SubjectRunner>,
    subjects: &[Subject],
    options: &ScrapeOptions,
    max_concurrent: usize,
) -> Vec<ScrapingSummary> {
    let semaphore = Arc::new(Semaphore::new(max_concurrent.max(1)));
    let mut handles = Vec::with_capacity(subjects.len());

    for &subject in subjects {
        let semaphore = semaphore.clone();
        let runner = runner.clone();
        let options = options.clone();
        let started_at = Local::now();

        let handle = tokio::spawn(async move {
            let _permit = semaphore.acquire_owned().await.ok();
            runner.run(subject, &options).await
        });
        handles.push((subject, started_at, handle));
    }

    let mut summaries = Vec::with_capacity(handles.len());
    for (subject, started_at, handle) in handles {
        match handle.await {
            Ok(summary) => summaries.push(summary),
            Err(e) => {
                error!("[{}] 任务执行失败: {}", subject.alias(), e);
                summaries.push(ScrapingSummary::critical(
                    subject.official_name(),
                    subject.alias(),
                    format!("任务执行失败: {}", e),
                    started_at,
                ));
            }
        }
    }
    summaries
}
