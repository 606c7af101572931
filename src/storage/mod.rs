//! 题目存储
//!
//! 核心流程只依赖 [`ProblemRepository`]：按 `problem_id` 做 upsert，按科目查询和清空。
//! 实现自己保证并发调用安全。

pub mod memory;
pub mod toml_store;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::AppResult;
use crate::models::Problem;

pub use memory::MemoryRepository;
pub use toml_store::TomlRepository;

/// 保存结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SaveOutcome {
    /// 新记录
    Inserted,
    /// 已存在，且要求强制更新
    Updated,
    /// 已存在，保持原样
    Unchanged,
}

impl SaveOutcome {
    /// 是否实际写入
    pub fn is_written(self) -> bool {
        !matches!(self, SaveOutcome::Unchanged)
    }
}

/// 题目仓库
#[async_trait]
pub trait ProblemRepository: Send + Sync {
    /// 按 `problem_id` 插入或更新
    async fn save(&self, problem: &Problem, force_update: bool) -> AppResult<SaveOutcome>;

    /// 某科目的全部记录
    async fn get_by_subject(&self, subject_name: &str) -> AppResult<Vec<Problem>>;

    async fn get_by_id(&self, problem_id: &str) -> AppResult<Option<Problem>>;

    /// 删除某科目的全部记录，返回删除数量
    async fn clear_subject(&self, subject_name: &str) -> AppResult<usize>;
}
