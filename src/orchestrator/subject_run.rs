//! 单科目运行 - 编排层
//!
//! ## 职责
//!
//! 1. **强制重来**：按需清空该科目已有记录
//! 2. **推算起始页**：交给 ProgressEngine
//! 3. **翻页**：交给 ScrapeLoopController
//! 4. **汇总**：组装 ScrapingSummary 并输出
//!
//! 运行中的任何错误都在这里转成失败的汇总，不影响并发运行的其他科目。

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Local;
use tracing::{error, info};

use crate::config::{Config, ScrapeOptions};
use crate::error::AppResult;
use crate::models::{PageResult, ScrapingSummary, Subject};
use crate::orchestrator::loop_controller::{PageSource, ScrapeLoopController};
use crate::services::ProgressEngine;
use crate::storage::ProblemRepository;
use crate::utils::logging;
use crate::workflow::{PageCtx, PageScrapeOrchestrator};

/// 某科目的页序列
struct SubjectPages<'a> {
    orchestrator: &'a PageScrapeOrchestrator,
    subject: Subject,
    data_dir: &'a Path,
    files_location_prefix: &'a str,
    options: &'a ScrapeOptions,
}

#[async_trait]
impl PageSource for SubjectPages<'_> {
    async fn scrape_page(&self, page_number: u32) -> PageResult {
        let ctx = PageCtx::new(
            self.subject,
            page_number,
            self.data_dir,
            self.files_location_prefix,
        )
        .with_options(self.options);

        let result = self.orchestrator.scrape(&ctx).await;
        if result.is_error() {
            logging::log_page_error(self.subject, &result);
        } else {
            logging::log_page_progress(self.subject, &result);
        }
        result
    }
}

/// 单科目运行器
pub struct SubjectRunner {
    orchestrator: Arc<PageScrapeOrchestrator>,
    repository: Arc<dyn ProblemRepository>,
    data_dir: PathBuf,
    files_location_prefix: String,
}

impl SubjectRunner {
    pub fn new(
        orchestrator: Arc<PageScrapeOrchestrator>,
        repository: Arc<dyn ProblemRepository>,
        config: &Config,
    ) -> Self {
        Self {
            orchestrator,
            repository,
            data_dir: config.data_dir.clone(),
            files_location_prefix: config.files_location_prefix.clone(),
        }
    }

    /// 抓取一个科目
    ///
    /// # 参数
    /// - `subject`: 科目
    /// - `options`: 本次运行参数
    ///
    /// # 返回
    /// 科目汇总；出错时 `success` 为 false，错误写在 `errors` 里
    pub async fn run(&self, subject: Subject, options: &ScrapeOptions) -> ScrapingSummary {
        let started_at = Local::now();
        let summary = match self.try_run(subject, options, started_at).await {
            Ok(summary) => summary,
            Err(e) => {
                error!("[{}] ❌ 严重错误: {}", subject.alias(), e);
                ScrapingSummary::critical(subject.official_name(), subject.alias(), e, started_at)
            }
        };
        logging::log_subject_summary(&summary);
        summary
    }

    async fn try_run(
        &self,
        subject: Subject,
        options: &ScrapeOptions,
        started_at: chrono::DateTime<Local>,
    ) -> AppResult<ScrapingSummary> {
        options.validate()?;
        let name = subject.official_name();

        if options.force_restart {
            let removed = self.repository.clear_subject(name).await?;
            info!("[{}] 🧹 已清除 {} 条旧记录", subject.alias(), removed);
        }

        let existing = self.repository.get_by_subject(name).await?;
        let start_page = ProgressEngine::next_page_for(&existing, options);
        logging::log_subject_start(subject, start_page, options);

        let pages = SubjectPages {
            orchestrator: &self.orchestrator,
            subject,
            data_dir: &self.data_dir,
            files_location_prefix: &self.files_location_prefix,
            options,
        };
        let outcome = ScrapeLoopController::new(options)
            .run(&pages, start_page)
            .await;

        Ok(ScrapingSummary::compose(
            name,
            subject.alias(),
            outcome,
            started_at,
        ))
    }
}
