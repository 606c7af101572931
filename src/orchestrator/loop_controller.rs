//! 翻页循环 - 编排层
//!
//! 状态：Running → Stopped(Limit | EmptyStreak | Error)
//!
//! 每页开始前依次检查：页数上限 → 连续空页。某页出错时记录该页结果后立即停止，不跳过继续。

use async_trait::async_trait;
use tracing::debug;

use crate::config::ScrapeOptions;
use crate::models::{LoopOutcome, PageResult, StopReason};

/// 按页码产出结果的对象
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn scrape_page(&self, page_number: u32) -> PageResult;
}

/// 循环状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Stopped(StopReason),
}

/// 翻页循环控制器
#[derive(Debug, Clone)]
pub struct ScrapeLoopController {
    /// 本次运行最多抓取的页数
    max_pages: Option<u32>,
    max_empty_pages: u32,
}

impl ScrapeLoopController {
    pub fn new(options: &ScrapeOptions) -> Self {
        Self {
            max_pages: options.max_pages,
            max_empty_pages: options.max_empty_pages.max(1),
        }
    }

    /// 从 `start_page` 开始翻页直到停止
    pub async fn run<S: PageSource + ?Sized>(&self, source: &S, start_page: u32) -> LoopOutcome {
        let mut results: Vec<PageResult> = Vec::new();
        let mut empty_streak: u32 = 0;
        let mut total_pages_hint: Option<u32> = None;
        let mut page = start_page;
        let mut state = LoopState::Running;

        while state == LoopState::Running {
            if let Some(reason) = self.check_stop(results.len(), empty_streak, page, total_pages_hint) {
                state = LoopState::Stopped(reason);
                continue;
            }

            let result = source.scrape_page(page).await;
            if result.total_pages_hint.is_some() {
                total_pages_hint = result.total_pages_hint;
            }
            if result.is_empty() {
                empty_streak += 1;
            } else {
                empty_streak = 0;
            }

            let failed = result.is_error();
            results.push(result);
            if failed {
                state = LoopState::Stopped(StopReason::Error);
            } else {
                page = page.saturating_add(1);
            }
        }

        let reason = match state {
            LoopState::Stopped(reason) => reason,
            LoopState::Running => StopReason::Limit,
        };
        debug!("翻页结束: {}，共 {} 页", reason, results.len());
        LoopOutcome::from_results(reason, start_page, results)
    }

    fn check_stop(
        &self,
        pages_fetched: usize,
        empty_streak: u32,
        next_page: u32,
        total_pages_hint: Option<u32>,
    ) -> Option<StopReason> {
        let run_limit = self
            .max_pages
            .is_some_and(|max| pages_fetched >= max as usize);
        let past_last_page = total_pages_hint.is_some_and(|total| next_page > total);
        if run_limit || past_last_page {
            return Some(StopReason::Limit);
        }
        if empty_streak >= self.max_empty_pages {
            return Some(StopReason::EmptyStreak);
        }
        None
    }
}
