//! 日志工具模块
//!
//! 订阅器初始化和进度报告的格式化输出

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::{Config, ScrapeOptions};
use crate::models::{PageResult, ScrapingSummary, Subject};

/// 汇总里最多展示的错误条数
const MAX_LISTED_ERRORS: usize = 3;

/// 初始化日志订阅器
///
/// 级别取自 `RUST_LOG`，未设置时为 `info`（`verbose` 时为 `debug`）。可重复调用。
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// 记录程序启动信息
///
/// # 参数
/// - `config`: 程序配置
/// - `subjects`: 本次要抓取的科目
pub fn log_startup(config: &Config, subjects: &[Subject]) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - FIPI 题库抓取");
    info!(
        "启动时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!(
        "📚 科目: {}",
        subjects.iter().map(|s| s.alias()).collect::<Vec<_>>().join(", ")
    );
    info!("🌐 浏览器池: {} 个", config.browser_pool_size);
    info!("📊 科目并发数: {}", config.max_concurrent_subjects);
    info!("📥 下载并发数: {}", config.max_concurrent_downloads);
    info!("📁 数据目录: {}", config.data_dir.display());
    info!("{}", "=".repeat(60));
}

/// 记录科目开始信息
pub fn log_subject_start(subject: Subject, start_page: u32, options: &ScrapeOptions) {
    info!("\n{}", "─".repeat(60));
    info!("📘 开始抓取 [{}] {}", subject.alias(), subject.official_name());
    info!("起始页: {} (设置: {})", start_page, options.start_page);
    match options.max_pages {
        Some(max) => info!("页数上限: {}", max),
        None => info!("页数上限: 无"),
    }
    info!("连续空页上限: {}", options.max_empty_pages);
    info!("超时: {}s", options.timeout_secs);
    if options.force_restart {
        info!("⚠️ 强制重新开始");
    }
    info!("{}", "─".repeat(60));
}

/// 记录单页进度
pub fn log_page_progress(subject: Subject, result: &PageResult) {
    info!(
        "[{} 第 {} 页] ✓ 题块 {} / 保存 {} / 跳过 {} / 资源 {} ({:.1}s)",
        subject.alias(),
        result.page_number,
        result.records_found,
        result.records_saved,
        result.records_skipped,
        result.assets_downloaded,
        result.duration.as_secs_f64()
    );
}

/// 记录单页错误
pub fn log_page_error(subject: Subject, result: &PageResult) {
    if let Some(e) = &result.error {
        error!("[{} 第 {} 页] ❌ {}", subject.alias(), result.page_number, e);
    }
}

/// 记录科目汇总
pub fn log_subject_summary(summary: &ScrapingSummary) {
    info!("\n{}", "─".repeat(60));
    let status = if summary.success { "✅" } else { "❌" };
    info!(
        "{} [{}] {} 抓取结束",
        status, summary.subject_alias, summary.subject_name
    );
    if let Some(reason) = summary.stop_reason {
        info!("停止原因: {}", reason);
    }
    if let Some(page) = summary.last_processed_page {
        info!("最后处理页: {}", page);
    }
    info!(
        "页数: {} / 题块: {} / 保存: {} / 资源: {}",
        summary.total_pages, summary.total_found, summary.total_saved, summary.assets_downloaded
    );
    info!("耗时: {:.1}s", summary.duration().as_secs_f64());

    if !summary.errors.is_empty() {
        warn!("错误 {} 条:", summary.errors.len());
        for e in summary.errors.iter().take(MAX_LISTED_ERRORS) {
            warn!("  - {}", truncate_text(e, 200));
        }
        if summary.errors.len() > MAX_LISTED_ERRORS {
            warn!("  ... 以及另外 {} 条", summary.errors.len() - MAX_LISTED_ERRORS);
        }
    }
    info!("{}", "─".repeat(60));
}

/// 打印最终统计信息
pub fn print_final_stats(summaries: &[ScrapingSummary]) {
    let succeeded = summaries.iter().filter(|s| s.success).count();
    let saved: usize = summaries.iter().map(|s| s.total_saved).sum();
    let assets: usize = summaries.iter().map(|s| s.assets_downloaded).sum();

    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 成功: {}/{}", succeeded, summaries.len());
    info!("❌ 失败: {}", summaries.len() - succeeded);
    info!("📝 保存题目: {}", saved);
    info!("🖼️ 下载资源: {}", assets);
    for summary in summaries.iter().filter(|s| !s.success) {
        warn!(
            "  [{}] {}",
            summary.subject_alias,
            summary.errors.first().map(String::as_str).unwrap_or("未知错误")
        );
    }
    info!("{}", "=".repeat(60));
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大长度
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
