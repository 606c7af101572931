use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::AppResult;
use crate::models::Problem;
use crate::storage::{ProblemRepository, SaveOutcome};

/// 内存仓库，用于测试和 `--dry-run`
#[derive(Default)]
pub struct MemoryRepository {
    problems: RwLock<HashMap<String, Problem>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.problems.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.problems.read().await.is_empty()
    }
}

#[async_trait]
impl ProblemRepository for MemoryRepository {
    async fn save(&self, problem: &Problem, force_update: bool) -> AppResult<SaveOutcome> {
        let mut problems = self.problems.write().await;
        let outcome = match problems.get(&problem.problem_id) {
            None => SaveOutcome::Inserted,
            Some(_) if force_update => SaveOutcome::Updated,
            Some(_) => return Ok(SaveOutcome::Unchanged),
        };
        problems.insert(problem.problem_id.clone(), problem.clone());
        Ok(outcome)
    }

    async fn get_by_subject(&self, subject_name: &str) -> AppResult<Vec<Problem>> {
        let problems = self.problems.read().await;
        let mut found: Vec<Problem> = problems
            .values()
            .filter(|p| p.subject_name == subject_name)
            .cloned()
            .collect();
        found.sort_by(|a, b| a.problem_id.cmp(&b.problem_id));
        Ok(found)
    }

    async fn get_by_id(&self, problem_id: &str) -> AppResult<Option<Problem>> {
        Ok(self.problems.read().await.get(problem_id).cloned())
    }

    async fn clear_subject(&self, subject_name: &str) -> AppResult<usize> {
        let mut problems = self.problems.write().await;
        let before = problems.len();
        problems.retain(|_, p| p.subject_name != subject_name);
        Ok(before - problems.len())
    }
}
