//! 基于 TOML 文件的题目仓库
//!
//! 每个科目一个文件：`{data_dir}/{alias}/problems.toml`，内容为 `[[problems]]` 数组。
//! 所有读写经同一把锁串行化，写入先写临时文件再改名。

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{AppError, AppResult, StorageError};
use crate::models::{Problem, Subject};
use crate::storage::{ProblemRepository, SaveOutcome};

const PROBLEMS_FILE: &str = "problems.toml";

#[derive(Debug, Default, Serialize, Deserialize)]
struct ProblemFile {
    #[serde(default)]
    problems: Vec<Problem>,
}

/// TOML 文件仓库
pub struct TomlRepository {
    root: PathBuf,
    lock: Mutex<()>,
}

impl TomlRepository {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 科目对应的数据文件
    pub fn subject_file(&self, subject_name: &str) -> PathBuf {
        self.root.join(subject_folder(subject_name)).join(PROBLEMS_FILE)
    }

    /// 按 `problem_id` 的前缀（科目别名）定位文件
    fn file_for_id(&self, problem_id: &str) -> Option<PathBuf> {
        let (alias, _) = problem_id.split_once('_')?;
        Subject::from_alias(alias).map(|s| self.root.join(s.alias()).join(PROBLEMS_FILE))
    }

    async fn all_files(&self) -> AppResult<Vec<PathBuf>> {
        let mut files = Vec::new();
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(files),
            Err(e) => return Err(AppError::storage_io(self.root.display().to_string(), e)),
        };
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| AppError::storage_io(self.root.display().to_string(), e))?
        {
            let candidate = entry.path().join(PROBLEMS_FILE);
            if fs::metadata(&candidate).await.is_ok_and(|m| m.is_file()) {
                files.push(candidate);
            }
        }
        files.sort();
        Ok(files)
    }
}

/// 读取数据文件，不存在时返回空
async fn load(path: &Path) -> AppResult<ProblemFile> {
    let content = match fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(ProblemFile::default()),
        Err(e) => return Err(AppError::storage_io(path.display().to_string(), e)),
    };

    toml::from_str(&content).map_err(|e| {
        StorageError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        }
        .into()
    })
}

/// 写入数据文件（临时文件 + 改名）
async fn store(path: &Path, file: &ProblemFile) -> AppResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| AppError::storage_io(parent.display().to_string(), e))?;
    }

    let content = toml::to_string(file)?;
    let tmp = path.with_extension("toml.tmp");
    fs::write(&tmp, content)
        .await
        .map_err(|e| AppError::storage_io(tmp.display().to_string(), e))?;
    fs::rename(&tmp, path)
        .await
        .map_err(|e| AppError::storage_io(path.display().to_string(), e))?;
    debug!("已写入 {} ({} 条)", path.display(), file.problems.len());
    Ok(())
}

/// 科目名 → 目录名：已知科目用别名，其他名称去掉非法字符
fn subject_folder(subject_name: &str) -> String {
    if let Some(subject) = Subject::from_official_name(subject_name).or_else(|| Subject::find(subject_name)) {
        return subject.alias().to_string();
    }
    let folder: String = subject_name
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' { c } else { '_' })
        .collect();
    if folder.is_empty() {
        "unknown".to_string()
    } else {
        folder
    }
}

#[async_trait]
impl ProblemRepository for TomlRepository {
    async fn save(&self, problem: &Problem, force_update: bool) -> AppResult<SaveOutcome> {
        let _guard = self.lock.lock().await;
        let path = self.subject_file(&problem.subject_name);
        let mut file = load(&path).await?;

        let outcome = match file
            .problems
            .iter()
            .position(|p| p.problem_id == problem.problem_id)
        {
            None => {
                file.problems.push(problem.clone());
                SaveOutcome::Inserted
            }
            Some(index) if force_update => {
                file.problems[index] = problem.clone();
                SaveOutcome::Updated
            }
            Some(_) => return Ok(SaveOutcome::Unchanged),
        };

        store(&path, &file).await?;
        Ok(outcome)
    }

    async fn get_by_subject(&self, subject_name: &str) -> AppResult<Vec<Problem>> {
        let _guard = self.lock.lock().await;
        let file = load(&self.subject_file(subject_name)).await?;
        Ok(file
            .problems
            .into_iter()
            .filter(|p| p.subject_name == subject_name)
            .collect())
    }

    async fn get_by_id(&self, problem_id: &str) -> AppResult<Option<Problem>> {
        let _guard = self.lock.lock().await;
        let files = match self.file_for_id(problem_id) {
            Some(path) => vec![path],
            None => self.all_files().await?,
        };
        for path in files {
            let file = load(&path).await?;
            if let Some(found) = file.problems.into_iter().find(|p| p.problem_id == problem_id) {
                return Ok(Some(found));
            }
        }
        Ok(None)
    }

    async fn clear_subject(&self, subject_name: &str) -> AppResult<usize> {
        let _guard = self.lock.lock().await;
        let path = self.subject_file(subject_name);
        let mut file = load(&path).await?;
        let before = file.problems.len();
        file.problems.retain(|p| p.subject_name != subject_name);
        let removed = before - file.problems.len();
        if removed > 0 {
            store(&path, &file).await?;
            info!("已清除 {} 的 {} 条记录", subject_name, removed);
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::tests::problem;

    #[tokio::test]
    async fn test_roundtrip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let repo = TomlRepository::new(dir.path());
        let name = Subject::Math.official_name();

        let mut p = problem("math_abc", name, 2);
        p.answer = Some("42".to_string());
        p.kes_codes = vec!["1.2".to_string()];
        assert_eq!(repo.save(&p, false).await.unwrap(), SaveOutcome::Inserted);

        assert!(dir.path().join("math").join(PROBLEMS_FILE).is_file());

        let reopened = TomlRepository::new(dir.path());
        let loaded = reopened.get_by_subject(name).await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].answer.as_deref(), Some("42"));
        assert_eq!(loaded[0].kes_codes, vec!["1.2".to_string()]);

        let by_id = reopened.get_by_id("math_abc").await.unwrap();
        assert!(by_id.is_some());
    }

    #[tokio::test]
    async fn test_force_update_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let repo = TomlRepository::new(dir.path());
        let name = Subject::Rus.official_name();

        let mut p = problem("rus_1", name, 0);
        repo.save(&p, false).await.unwrap();
        p.text = "new text".to_string();
        assert_eq!(repo.save(&p, false).await.unwrap(), SaveOutcome::Unchanged);
        assert_eq!(repo.save(&p, true).await.unwrap(), SaveOutcome::Updated);
        assert_eq!(repo.get_by_subject(name).await.unwrap()[0].text, "new text");

        assert_eq!(repo.clear_subject(name).await.unwrap(), 1);
        assert!(repo.get_by_subject(name).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let repo = TomlRepository::new(dir.path().join("nowhere"));
        assert!(repo.get_by_subject("Физика").await.unwrap().is_empty());
        assert!(repo.get_by_id("unknown_id").await.unwrap().is_none());
    }
}
