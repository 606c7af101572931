//! 校验后的题目记录及其工厂

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::models::record::RawRecord;

/// 允许的考试部分
pub const EXAM_PARTS: [&str; 2] = ["Part 1", "Part 2"];

/// 允许的难度
pub const DIFFICULTY_LEVELS: [&str; 2] = ["basic", "advanced"];

/// 题号上限
pub const MAX_TASK_NUMBER: u32 = 19;

/// 已校验的题目记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Problem {
    pub problem_id: String,
    pub subject_name: String,
    pub text: String,
    pub source_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub files: Vec<String>,
    #[serde(default)]
    pub kes_codes: Vec<String>,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub kos_codes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub difficulty_level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_number: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exam_part: Option<String>,
    pub fipi_proj_id: String,
    #[serde(default)]
    pub body_html: String,
    #[serde(default)]
    pub header_html: String,
    pub created_at: DateTime<Utc>,
}

/// 原始记录 → 校验后记录
pub trait RecordFactory: Send + Sync {
    fn create_from_raw(&self, raw: RawRecord) -> Result<Problem, ValidationError>;
}

/// 默认工厂：做范围和枚举检查
#[derive(Debug, Clone, Copy, Default)]
pub struct ProblemFactory;

impl RecordFactory for ProblemFactory {
    fn create_from_raw(&self, raw: RawRecord) -> Result<Problem, ValidationError> {
        if raw.problem_id.trim().is_empty() {
            return Err(ValidationError::EmptyField { field: "problem_id" });
        }
        if raw.text.trim().is_empty() {
            return Err(ValidationError::EmptyField { field: "text" });
        }
        if let Some(n) = raw.task_number {
            if !(1..=MAX_TASK_NUMBER).contains(&n) {
                return Err(ValidationError::OutOfRange {
                    field: "task_number",
                    value: n.to_string(),
                });
            }
        }
        if let Some(part) = raw.exam_part.as_deref() {
            if !EXAM_PARTS.contains(&part) {
                return Err(ValidationError::NotAllowed {
                    field: "exam_part",
                    value: part.to_string(),
                });
            }
        }
        if let Some(level) = raw.difficulty_level.as_deref() {
            if !DIFFICULTY_LEVELS.contains(&level) {
                return Err(ValidationError::NotAllowed {
                    field: "difficulty_level",
                    value: level.to_string(),
                });
            }
        }

        Ok(Problem {
            topics: raw.kes_codes.clone(),
            problem_id: raw.problem_id,
            subject_name: raw.subject_name,
            text: raw.text,
            source_url: raw.source_url,
            answer: raw.answer,
            images: raw.images,
            files: raw.files,
            kes_codes: raw.kes_codes,
            kos_codes: raw.kos_codes,
            difficulty_level: raw.difficulty_level,
            task_number: raw.task_number,
            exam_part: raw.exam_part,
            fipi_proj_id: raw.fipi_proj_id,
            body_html: raw.body_html,
            header_html: raw.header_html,
            created_at: Utc::now(),
        })
    }
}
