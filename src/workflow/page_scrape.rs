//! 单页抓取流程 - 流程层
//!
//! 核心职责：定义"一页"的完整处理流程
//!
//! 流程顺序：
//! 1. 抓取 HTML（含 iframe 解析）
//! 2. 读分页器 → 切分题块
//! 3. 每个题块：管线处理 → 抽取元数据 → 校验 → 保存
//!
//! 任何错误都收进 [`PageResult::error`]，不向上抛。

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::AppResult;
use crate::models::{BlockPair, PageResult, ProblemFactory, RecordFactory};
use crate::parsing::dom::fragment_group;
use crate::parsing::{detect_total_pages, segment, MetadataExtractor};
use crate::services::progress::page_number_from_url;
use crate::services::{AssetDownloader, HtmlSource};
use crate::storage::ProblemRepository;
use crate::workflow::block_pipeline::{BlockDraft, BlockPipeline, StepCtx, StepOutcome};
use crate::workflow::page_ctx::PageCtx;

/// 单页抓取流程
///
/// - 编排 抓取 → 切分 → 处理 → 保存
/// - 不持有浏览器，只依赖能力（HtmlSource / AssetDownloader / ProblemRepository）
pub struct PageScrapeOrchestrator {
    source: Arc<dyn HtmlSource>,
    downloader: Arc<AssetDownloader>,
    repository: Arc<dyn ProblemRepository>,
    factory: Arc<dyn RecordFactory>,
    extractor: MetadataExtractor,
    pipeline: BlockPipeline,
}

#[derive(Debug, Default)]
struct BlockStats {
    saved: usize,
    skipped: usize,
}

impl PageScrapeOrchestrator {
    pub fn new(
        source: Arc<dyn HtmlSource>,
        downloader: Arc<AssetDownloader>,
        repository: Arc<dyn ProblemRepository>,
        config: &Config,
    ) -> Self {
        Self {
            source,
            downloader,
            repository,
            factory: Arc::new(ProblemFactory),
            extractor: MetadataExtractor::new(&config.files_location_prefix),
            pipeline: BlockPipeline::default(),
        }
    }

    /// 替换记录工厂
    pub fn with_factory(mut self, factory: Arc<dyn RecordFactory>) -> Self {
        self.factory = factory;
        self
    }

    /// 抓取一页，错误记录在结果里
    pub async fn scrape(&self, ctx: &PageCtx) -> PageResult {
        let started = Instant::now();
        match self.try_scrape(ctx, started).await {
            Ok(result) => result,
            Err(e) => {
                warn!("{} ❌ 抓取失败: {}", ctx, e);
                PageResult::failed(
                    ctx.page_number,
                    started.elapsed(),
                    format!("第 {} 页出错: {}", ctx.page_number, e),
                )
            }
        }
    }

    async fn try_scrape(&self, ctx: &PageCtx, started: Instant) -> AppResult<PageResult> {
        let page_url = ctx.page_url();
        info!("{} 🌐 抓取 {}", ctx, page_url);

        let fetched = self.source.fetch(&page_url, ctx.timeout).await?;
        let total_pages_hint = detect_total_pages(&fetched.html);
        let pairs = segment(&fetched.html);
        info!(
            "{} 找到 {} 个题块{}",
            ctx,
            pairs.len(),
            if fetched.from_frame { "（iframe）" } else { "" }
        );

        // 记录的来源地址必须能读出页码
        let record_url = if page_number_from_url(&fetched.effective_url) == Some(ctx.page_number) {
            fetched.effective_url.clone()
        } else {
            page_url.clone()
        };

        let downloader = self.downloader.for_new_run();
        let assets_dir = ctx.assets_dir();
        let step_ctx = StepCtx {
            base_url: &fetched.effective_url,
            downloader: &downloader,
            assets_dir: &assets_dir,
            reference_prefix: &ctx.reference_prefix,
        };

        let mut stats = BlockStats::default();
        for (index, pair) in pairs.iter().enumerate() {
            self.process_block(ctx, &step_ctx, &record_url, index, pair, &mut stats)
                .await?;
        }

        let result = PageResult {
            page_number: ctx.page_number,
            records_found: pairs.len(),
            records_saved: stats.saved,
            assets_downloaded: downloader.downloaded_count(),
            records_skipped: stats.skipped,
            duration: started.elapsed(),
            total_pages_hint,
            error: None,
        };
        Ok(result)
    }

    async fn process_block(
        &self,
        ctx: &PageCtx,
        step_ctx: &StepCtx<'_>,
        record_url: &str,
        index: usize,
        pair: &BlockPair,
        stats: &mut BlockStats,
    ) -> AppResult<()> {
        let draft = BlockDraft::new(index, pair.header.html(), pair.body.html());
        let draft = match self.pipeline.run(draft, step_ctx).await {
            StepOutcome::Continue(draft) => draft,
            StepOutcome::Skip(reason) => {
                debug!("{} 跳过: {}", ctx, reason);
                stats.skipped += 1;
                return Ok(());
            }
            StepOutcome::Fatal(e) => return Err(e),
        };

        let processed = BlockPair::new(
            fragment_group(&draft.header_html),
            fragment_group(&draft.body_html),
        );
        let raw = self
            .extractor
            .extract(&processed, ctx.subject, record_url, index);
        let problem_id = raw.problem_id.clone();

        let problem = match self.factory.create_from_raw(raw) {
            Ok(problem) => problem,
            Err(e) => {
                warn!("{} ⚠️ 题块 #{} 校验失败，已跳过: {}", ctx, index, e);
                stats.skipped += 1;
                return Ok(());
            }
        };

        match self.repository.save(&problem, ctx.force_update).await {
            Ok(outcome) if outcome.is_written() => {
                debug!("{} ✓ 已保存 {} ({:?})", ctx, problem_id, outcome);
                stats.saved += 1;
            }
            Ok(_) => debug!("{} {} 已存在，未更新", ctx, problem_id),
            Err(e) => {
                warn!("{} ⚠️ 保存 {} 失败: {}", ctx, problem_id, e);
                stats.skipped += 1;
            }
        }
        Ok(())
    }
}
