use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{AppError, AppResult};

/// 程序配置
///
/// 在进程启动时构造一次，以引用的方式传给各组件，组件本身不读取环境变量。
#[derive(Clone, Debug)]
pub struct Config {
    /// 抓取结果根目录
    pub data_dir: PathBuf,
    /// 浏览器池大小
    pub browser_pool_size: usize,
    /// 是否使用无头模式
    pub browser_headless: bool,
    /// 浏览器可执行文件路径（为空时由 chromiumoxide 自动查找）
    pub chrome_executable: Option<PathBuf>,
    /// 页面视口宽度
    pub viewport_width: u32,
    /// 页面视口高度
    pub viewport_height: u32,
    /// 页面 User-Agent
    pub user_agent: String,
    /// 页面导航超时（秒）
    pub page_timeout_secs: u64,
    /// 单个资源下载超时（秒）
    pub asset_timeout_secs: u64,
    /// 同时进行的下载数量
    pub max_concurrent_downloads: usize,
    /// 同时抓取的科目数量
    pub max_concurrent_subjects: usize,
    /// 写入记录的本地资源路径前缀
    pub files_location_prefix: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            browser_pool_size: 2,
            browser_headless: true,
            chrome_executable: None,
            viewport_width: 1920,
            viewport_height: 1080,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36"
                .to_string(),
            page_timeout_secs: 30,
            asset_timeout_secs: 30,
            max_concurrent_downloads: 6,
            max_concurrent_subjects: 2,
            files_location_prefix: String::new(),
            verbose_logging: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            data_dir: std::env::var("FIPI_DATA_DIR").map(PathBuf::from).unwrap_or(default.data_dir),
            browser_pool_size: std::env::var("FIPI_BROWSER_POOL_SIZE").ok().and_then(|v| v.parse().ok()).unwrap_or(default.browser_pool_size),
            browser_headless: std::env::var("FIPI_BROWSER_HEADLESS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.browser_headless),
            chrome_executable: std::env::var("FIPI_CHROME_EXECUTABLE").ok().map(PathBuf::from).or(default.chrome_executable),
            viewport_width: std::env::var("FIPI_VIEWPORT_WIDTH").ok().and_then(|v| v.parse().ok()).unwrap_or(default.viewport_width),
            viewport_height: std::env::var("FIPI_VIEWPORT_HEIGHT").ok().and_then(|v| v.parse().ok()).unwrap_or(default.viewport_height),
            user_agent: std::env::var("FIPI_USER_AGENT").unwrap_or(default.user_agent),
            page_timeout_secs: std::env::var("FIPI_PAGE_TIMEOUT").ok().and_then(|v| v.parse().ok()).unwrap_or(default.page_timeout_secs),
            asset_timeout_secs: std::env::var("FIPI_ASSET_TIMEOUT").ok().and_then(|v| v.parse().ok()).unwrap_or(default.asset_timeout_secs),
            max_concurrent_downloads: std::env::var("FIPI_MAX_CONCURRENT_DOWNLOADS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.max_concurrent_downloads),
            max_concurrent_subjects: std::env::var("FIPI_MAX_CONCURRENT_SUBJECTS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.max_concurrent_subjects),
            files_location_prefix: std::env::var("FIPI_FILES_PREFIX").unwrap_or(default.files_location_prefix),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(default.verbose_logging),
        }
    }

    /// 检查数值型配置
    pub fn validate(&self) -> AppResult<()> {
        if self.browser_pool_size == 0 {
            return Err(AppError::invalid_config("browser_pool_size", self.browser_pool_size));
        }
        if self.max_concurrent_downloads == 0 {
            return Err(AppError::invalid_config("max_concurrent_downloads", self.max_concurrent_downloads));
        }
        if self.max_concurrent_subjects == 0 {
            return Err(AppError::invalid_config("max_concurrent_subjects", self.max_concurrent_subjects));
        }
        if self.page_timeout_secs == 0 {
            return Err(AppError::invalid_config("page_timeout_secs", self.page_timeout_secs));
        }
        if self.asset_timeout_secs == 0 {
            return Err(AppError::invalid_config("asset_timeout_secs", self.asset_timeout_secs));
        }
        Ok(())
    }

    pub fn page_timeout(&self) -> Duration {
        Duration::from_secs(self.page_timeout_secs)
    }

    pub fn asset_timeout(&self) -> Duration {
        Duration::from_secs(self.asset_timeout_secs)
    }
}

/// 起始页设置
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StartPage {
    /// 根据已有记录自动推算
    #[default]
    Auto,
    /// 指定页码（从 1 开始）
    Page(u32),
}

impl FromStr for StartPage {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("auto") || s.eq_ignore_ascii_case("init") {
            return Ok(StartPage::Auto);
        }
        match s.parse::<u32>() {
            Ok(n) if n > 0 => Ok(StartPage::Page(n)),
            _ => Err(AppError::invalid_config("start_page", s)),
        }
    }
}

impl fmt::Display for StartPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartPage::Auto => write!(f, "auto"),
            StartPage::Page(n) => write!(f, "{}", n),
        }
    }
}

/// 单次抓取运行的参数
#[derive(Clone, Debug)]
pub struct ScrapeOptions {
    pub start_page: StartPage,
    /// 本次运行最多抓取的页数
    pub max_pages: Option<u32>,
    /// 连续空页达到该值时停止
    pub max_empty_pages: u32,
    /// 忽略已有进度，从第 1 页开始
    pub force_restart: bool,
    /// 已知的最后一页（用于限制推算出的起始页）
    pub last_known_page: Option<u32>,
    /// 页面导航超时（秒）
    pub timeout_secs: u64,
}

impl Default for ScrapeOptions {
    fn default() -> Self {
        Self {
            start_page: StartPage::Auto,
            max_pages: None,
            max_empty_pages: 2,
            force_restart: false,
            last_known_page: None,
            timeout_secs: 30,
        }
    }
}

impl ScrapeOptions {
    pub fn validate(&self) -> AppResult<()> {
        if self.max_empty_pages == 0 {
            return Err(AppError::invalid_config("max_empty_pages", self.max_empty_pages));
        }
        if self.timeout_secs == 0 {
            return Err(AppError::invalid_config("timeout_secs", self.timeout_secs));
        }
        if let Some(0) = self.max_pages {
            return Err(AppError::invalid_config("max_pages", 0));
        }
        if let Some(0) = self.last_known_page {
            return Err(AppError::invalid_config("last_known_page", 0));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_start_page_parsing() {
        assert_eq!("auto".parse::<StartPage>().unwrap(), StartPage::Auto);
        assert_eq!("init".parse::<StartPage>().unwrap(), StartPage::Auto);
        assert_eq!(" 7 ".parse::<StartPage>().unwrap(), StartPage::Page(7));
        assert!("0".parse::<StartPage>().is_err());
        assert!("first".parse::<StartPage>().is_err());
    }

    #[test]
    fn test_options_validation() {
        assert!(ScrapeOptions::default().validate().is_ok());

        let options = ScrapeOptions {
            max_empty_pages: 0,
            ..Default::default()
        };
        assert!(options.validate().is_err());

        let options = ScrapeOptions {
            max_pages: Some(0),
            ..Default::default()
        };
        assert!(options.validate().is_err());
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.page_timeout(), Duration::from_secs(30));
    }
}
