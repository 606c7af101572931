//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责翻页、科目调度和资源生命周期，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `app` - 应用
//! - 管理应用生命周期（初始化、运行、关闭）
//! - 控制科目并发数量（Semaphore）
//! - 唯一持有浏览器池
//! - 输出全局统计信息
//!
//! ### `subject_run` - 单科目运行
//! - 清空旧记录（强制重来时）、推算起始页
//! - 驱动翻页循环，组装科目汇总
//!
//! ### `loop_controller` - 翻页循环
//! - 页数上限、连续空页、出错即停
//!
//! ## 层次关系
//!
//! ```text
//! app (处理 Vec<Subject>)
//!     ↓
//! subject_run (处理一个科目)
//!     ↓
//! loop_controller (逐页)
//!     ↓
//! workflow::PageScrapeOrchestrator (处理一页)
//!     ↓
//! services (能力层：fetch / download / progress)
//!     ↓
//! infrastructure (基础设施：BrowserPool / PageSession / HttpTransport)
//! ```

pub mod app;
pub mod loop_controller;
pub mod subject_run;

// 重新导出主要类型
pub use app::{run_subjects, App};
pub use loop_controller::{LoopState, PageSource, ScrapeLoopController};
pub use subject_run::SubjectRunner;
