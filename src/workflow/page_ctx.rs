//! 页面处理上下文
//!
//! 封装"我正在抓哪个科目的第几页"这一信息

use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::ScrapeOptions;
use crate::models::Subject;

/// 页面处理上下文
#[derive(Debug, Clone)]
pub struct PageCtx {
    pub subject: Subject,

    /// 页码（从 1 开始）
    pub page_number: u32,

    /// 本页目录 `{data_dir}/{alias}/page_{n}`
    pub run_folder: PathBuf,

    /// 写入 HTML 和记录的本地资源前缀，例如 `assets/`
    pub reference_prefix: String,

    /// 已存在的记录是否覆盖
    pub force_update: bool,

    /// 页面导航时限
    pub timeout: Duration,
}

impl PageCtx {
    /// 创建新的页面上下文
    pub fn new(
        subject: Subject,
        page_number: u32,
        data_dir: &Path,
        files_location_prefix: &str,
    ) -> Self {
        Self {
            subject,
            page_number,
            run_folder: data_dir
                .join(subject.alias())
                .join(format!("page_{}", page_number)),
            reference_prefix: format!("{}assets/", files_location_prefix),
            force_update: false,
            timeout: Duration::from_secs(30),
        }
    }

    /// 套用本次运行的参数
    pub fn with_options(mut self, options: &ScrapeOptions) -> Self {
        self.force_update = options.force_restart;
        self.timeout = options.timeout();
        self
    }

    /// 本页要抓取的地址
    pub fn page_url(&self) -> String {
        self.subject.page_url(self.page_number)
    }

    /// 本页资源目录
    pub fn assets_dir(&self) -> PathBuf {
        self.run_folder.join("assets")
    }
}

impl Display for PageCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{} 第 {} 页]", self.subject.alias(), self.page_number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_and_display() {
        let ctx = PageCtx::new(Subject::Math, 3, Path::new("data"), "");
        assert_eq!(ctx.to_string(), "[math 第 3 页]");
        assert_eq!(ctx.run_folder, Path::new("data/math/page_3"));
        assert_eq!(ctx.assets_dir(), Path::new("data/math/page_3/assets"));
        assert_eq!(ctx.reference_prefix, "assets/");
        assert!(ctx.page_url().ends_with("&page=2"));
    }

    #[test]
    fn test_with_options() {
        let options = ScrapeOptions {
            force_restart: true,
            timeout_secs: 12,
            ..Default::default()
        };
        let ctx = PageCtx::new(Subject::Rus, 1, Path::new("out"), "files/").with_options(&options);
        assert!(ctx.force_update);
        assert_eq!(ctx.timeout, Duration::from_secs(12));
        assert_eq!(ctx.reference_prefix, "files/assets/");
    }
}
