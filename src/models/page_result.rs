use std::time::Duration;

use chrono::{DateTime, Local};
use serde::Serialize;

/// 单页处理结果，创建后不再修改
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageResult {
    pub page_number: u32,
    pub records_found: usize,
    pub records_saved: usize,
    pub assets_downloaded: usize,
    /// 被跳过的题块数量（空题块、校验失败）
    pub records_skipped: usize,
    #[serde(with = "duration_secs")]
    pub duration: Duration,
    /// 从分页器读到的总页数
    pub total_pages_hint: Option<u32>,
    pub error: Option<String>,
}

impl PageResult {
    pub fn failed(page_number: u32, duration: Duration, error: impl Into<String>) -> Self {
        Self {
            page_number,
            records_found: 0,
            records_saved: 0,
            assets_downloaded: 0,
            records_skipped: 0,
            duration,
            total_pages_hint: None,
            error: Some(error.into()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.records_found == 0
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// 抓取循环的停止原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StopReason {
    /// 达到页数上限（本次运行上限或分页器给出的总页数）
    Limit,
    /// 连续空页
    EmptyStreak,
    /// 某页出错
    Error,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StopReason::Limit => write!(f, "达到页数上限"),
            StopReason::EmptyStreak => write!(f, "连续空页"),
            StopReason::Error => write!(f, "页面出错"),
        }
    }
}

/// 抓取循环的汇总
#[derive(Debug, Clone, Serialize)]
pub struct LoopOutcome {
    pub stop_reason: StopReason,
    pub start_page: u32,
    pub page_results: Vec<PageResult>,
    pub total_found: usize,
    pub total_saved: usize,
    pub assets_downloaded: usize,
    pub errors: Vec<String>,
    /// 最后一个结果的页码，没有任何结果时为 None
    pub last_processed_page: Option<u32>,
}

impl LoopOutcome {
    pub fn from_results(stop_reason: StopReason, start_page: u32, page_results: Vec<PageResult>) -> Self {
        Self {
            stop_reason,
            start_page,
            total_found: page_results.iter().map(|r| r.records_found).sum(),
            total_saved: page_results.iter().map(|r| r.records_saved).sum(),
            assets_downloaded: page_results.iter().map(|r| r.assets_downloaded).sum(),
            errors: page_results.iter().filter_map(|r| r.error.clone()).collect(),
            last_processed_page: page_results.last().map(|r| r.page_number),
            page_results,
        }
    }
}

/// 单个科目的最终结果
#[derive(Debug, Clone, Serialize)]
pub struct ScrapingSummary {
    pub subject_name: String,
    pub subject_alias: String,
    /// 没有任何错误时为 true
    pub success: bool,
    pub stop_reason: Option<StopReason>,
    pub start_page: Option<u32>,
    pub total_pages: usize,
    pub total_found: usize,
    pub total_saved: usize,
    pub assets_downloaded: usize,
    pub last_processed_page: Option<u32>,
    pub page_results: Vec<PageResult>,
    pub errors: Vec<String>,
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
}

impl ScrapingSummary {
    /// 由循环结果组装
    pub fn compose(
        subject_name: impl Into<String>,
        subject_alias: impl Into<String>,
        outcome: LoopOutcome,
        started_at: DateTime<Local>,
    ) -> Self {
        Self {
            subject_name: subject_name.into(),
            subject_alias: subject_alias.into(),
            success: outcome.errors.is_empty(),
            stop_reason: Some(outcome.stop_reason),
            start_page: Some(outcome.start_page),
            total_pages: outcome.page_results.len(),
            total_found: outcome.total_found,
            total_saved: outcome.total_saved,
            assets_downloaded: outcome.assets_downloaded,
            last_processed_page: outcome.last_processed_page,
            page_results: outcome.page_results,
            errors: outcome.errors,
            started_at,
            finished_at: Local::now(),
        }
    }

    /// 运行边界捕获的严重错误
    pub fn critical(
        subject_name: impl Into<String>,
        subject_alias: impl Into<String>,
        message: impl std::fmt::Display,
        started_at: DateTime<Local>,
    ) -> Self {
        Self {
            subject_name: subject_name.into(),
            subject_alias: subject_alias.into(),
            success: false,
            stop_reason: None,
            start_page: None,
            total_pages: 0,
            total_found: 0,
            total_saved: 0,
            assets_downloaded: 0,
            last_processed_page: None,
            page_results: Vec::new(),
            errors: vec![format!("严重错误: {}", message)],
            started_at,
            finished_at: Local::now(),
        }
    }

    pub fn duration(&self) -> Duration {
        (self.finished_at - self.started_at)
            .to_std()
            .unwrap_or_default()
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::Serializer;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(n: u32, found: usize, error: Option<&str>) -> PageResult {
        PageResult {
            page_number: n,
            records_found: found,
            records_saved: found,
            assets_downloaded: 1,
            records_skipped: 0,
            duration: Duration::from_millis(10),
            total_pages_hint: None,
            error: error.map(str::to_string),
        }
    }

    #[test]
    fn test_outcome_aggregates() {
        let outcome = LoopOutcome::from_results(
            StopReason::Error,
            4,
            vec![page(4, 2, None), page(5, 3, None), page(6, 0, Some("boom"))],
        );
        assert_eq!(outcome.total_found, 5);
        assert_eq!(outcome.total_saved, 5);
        assert_eq!(outcome.assets_downloaded, 3);
        assert_eq!(outcome.errors, vec!["boom".to_string()]);
        assert_eq!(outcome.last_processed_page, Some(6));
    }

    #[test]
    fn test_summary_success_flag() {
        let ok = LoopOutcome::from_results(StopReason::EmptyStreak, 1, vec![page(1, 1, None)]);
        let summary = ScrapingSummary::compose("Физика", "phis", ok, Local::now());
        assert!(summary.success);
        assert_eq!(summary.total_pages, 1);

        let failed = ScrapingSummary::critical("Физика", "phis", "pool closed", Local::now());
        assert!(!failed.success);
        assert_eq!(failed.errors, vec!["严重错误: pool closed".to_string()]);
    }
}
