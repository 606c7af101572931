//! # FIPI Scraper
//!
//! 一个用于抓取 FIPI 考试题库的 Rust 应用程序
//!
//! ## 架构设计
//!
//! 本系统采用分层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源（浏览器进程、HTTP 客户端），只暴露能力
//! - `BrowserPool` - 固定大小的浏览器池，借出凭证丢弃即归还
//! - `PageSession` - 临时页面，提供导航 / 取 HTML / eval 能力
//! - `HttpTransport` - 校验证书 / 不校验证书两条下载通道
//!
//! ### ② 解析层（Parsing）
//! - `parsing/` - 纯函数，输入 HTML，输出题块和元数据
//! - `segment` - 题块切分（标识分组 / 公共材料分组）
//! - `MetadataExtractor` - 题号、编码、答案、资源引用、稳定 ID
//!
//! ### ③ 业务能力层（Services）
//! - `services/` - 描述"我能做什么"
//! - `ContentFetcher` - 抓取页面并解析题目 iframe
//! - `AssetDownloader` - 限流下载、证书回退、按文件名去重
//! - `ProgressEngine` - 按已保存记录推算起始页
//!
//! ### ④ 流程层（Workflow）
//! - `workflow/` - 定义"一页"的完整处理流程
//! - `PageCtx` - 上下文封装（科目 + 页码 + 目录）
//! - `BlockPipeline` - 题块处理步骤（清理 → 资源本地化 → 改写）
//! - `PageScrapeOrchestrator` - 流程编排（fetch → segment → pipeline → extract → save）
//!
//! ### ⑤ 编排层（Orchestration）
//! - `orchestrator/loop_controller` - 翻页循环与停止条件
//! - `orchestrator/subject_run` - 单科目运行与汇总
//! - `orchestrator/app` - 多科目并发、资源生命周期
//!
//! ## 模块结构

pub mod browser;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod models;
pub mod orchestrator;
pub mod parsing;
pub mod services;
pub mod storage;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::{Config, ScrapeOptions, StartPage};
pub use error::{AppError, AppResult};
pub use infrastructure::{BrowserPool, PageSession};
pub use models::{PageResult, Problem, ScrapingSummary, Subject};
pub use orchestrator::{App, ScrapeLoopController, SubjectRunner};
pub use services::{AssetDownloader, ContentFetcher, ProgressEngine};
pub use storage::{MemoryRepository, ProblemRepository, TomlRepository};
pub use workflow::{PageCtx, PageScrapeOrchestrator};
