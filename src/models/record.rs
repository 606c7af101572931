use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// 资源类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Image,
    File,
    Pdf,
    Zip,
}

impl AssetKind {
    /// 无法从 URL 推出文件名时使用的扩展名
    pub fn default_extension(self) -> &'static str {
        match self {
            AssetKind::Image => ".jpg",
            AssetKind::File => ".dat",
            AssetKind::Pdf => ".pdf",
            AssetKind::Zip => ".zip",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AssetKind::Image => "image",
            AssetKind::File => "file",
            AssetKind::Pdf => "pdf",
            AssetKind::Zip => "zip",
        }
    }

    /// 根据链接扩展名判断附件类型
    pub fn for_file_link(url: &str) -> Self {
        let lower = url.to_lowercase();
        if lower.ends_with(".pdf") {
            AssetKind::Pdf
        } else if lower.ends_with(".zip") {
            AssetKind::Zip
        } else {
            AssetKind::File
        }
    }
}

/// 已下载（或尝试下载）的资源
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRef {
    /// 解析后的绝对地址
    pub source_url: String,
    /// 本地文件路径
    pub local_path: PathBuf,
    /// 写入记录的相对引用（`{prefix}assets/{file}`）
    pub reference: String,
    pub kind: AssetKind,
}

/// 从题块中抽取的原始字段，交给 [`crate::models::RecordFactory`] 校验
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRecord {
    /// `{alias}_{stable_id}`
    pub problem_id: String,
    /// 页面内稳定 ID（来自标记或内容哈希）
    pub stable_id: String,
    pub subject_name: String,
    pub text: String,
    pub source_url: String,
    pub answer: Option<String>,
    pub images: Vec<String>,
    pub files: Vec<String>,
    pub kes_codes: Vec<String>,
    pub kos_codes: Vec<String>,
    pub task_number: Option<u32>,
    pub difficulty_level: Option<String>,
    pub exam_part: Option<String>,
    pub fipi_proj_id: String,
    pub body_html: String,
    pub header_html: String,
}
