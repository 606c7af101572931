use thiserror::Error;

/// 装箱的底层错误
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// 浏览器相关错误
    #[error("浏览器错误: {0}")]
    Browser(#[from] BrowserError),
    /// 资源下载错误
    #[error("下载错误: {0}")]
    Download(#[from] DownloadError),
    /// 存储错误
    #[error("存储错误: {0}")]
    Storage(#[from] StorageError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 记录校验错误
    #[error("校验错误: {0}")]
    Validation(#[from] ValidationError),
    /// 其他错误
    #[error("错误: {0}")]
    Other(String),
}

/// 浏览器相关错误
#[derive(Debug, Error)]
pub enum BrowserError {
    /// 启动浏览器失败
    #[error("启动浏览器 #{index} 失败: {message}")]
    LaunchFailed { index: usize, message: String },
    /// 创建页面失败
    #[error("创建页面失败: {source}")]
    PageCreationFailed { source: BoxError },
    /// 导航失败
    #[error("导航到 {url} 失败: {source}")]
    NavigationFailed { url: String, source: BoxError },
    /// 导航超时
    #[error("导航到 {url} 超时 ({secs}s)")]
    NavigationTimeout { url: String, secs: u64 },
    /// 读取页面内容失败
    #[error("读取页面内容失败 ({url}): {source}")]
    ContentFailed { url: String, source: BoxError },
    /// CDP 协议错误
    #[error("CDP 协议错误: {source}")]
    Protocol { source: BoxError },
    /// 浏览器池已关闭
    #[error("浏览器池已关闭")]
    PoolClosed,
}

/// 资源下载错误
#[derive(Debug, Error)]
pub enum DownloadError {
    /// TLS / 证书错误（唯一允许回退到备用通道的错误）
    #[error("证书校验失败 ({url}): {message}")]
    Certificate { url: String, message: String },
    /// 非成功状态码
    #[error("下载 {url} 返回状态码 {status}")]
    Status { url: String, status: u16 },
    /// 请求超时
    #[error("下载 {url} 超时 ({secs}s)")]
    Timeout { url: String, secs: u64 },
    /// 其他网络错误
    #[error("下载 {url} 网络错误: {message}")]
    Network { url: String, message: String },
    /// 写入文件失败
    #[error("写入 {path} 失败: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
}

impl DownloadError {
    /// 是否为证书类错误
    pub fn is_certificate(&self) -> bool {
        matches!(self, DownloadError::Certificate { .. })
    }
}

/// 存储错误
#[derive(Debug, Error)]
pub enum StorageError {
    /// 文件读写失败
    #[error("文件操作失败 ({path}): {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    /// 文件解析失败
    #[error("解析 {path} 失败: {message}")]
    Parse { path: String, message: String },
    /// 序列化失败
    #[error("序列化失败: {message}")]
    Serialize { message: String },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 数值非法
    #[error("配置项 {field} 的值 '{value}' 非法")]
    InvalidValue { field: String, value: String },
    /// 未知科目
    #[error("未知科目: {input}")]
    UnknownSubject { input: String },
}

/// 记录校验错误
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// 必填字段为空
    #[error("字段 {field} 不能为空")]
    EmptyField { field: &'static str },
    /// 数值超出范围
    #[error("字段 {field} 的值 {value} 超出范围")]
    OutOfRange { field: &'static str, value: String },
    /// 取值不在允许集合内
    #[error("字段 {field} 的值 '{value}' 不在允许范围内")]
    NotAllowed { field: &'static str, value: String },
}

// ========== 从常见错误类型转换 ==========

impl From<chromiumoxide::error::CdpError> for AppError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        AppError::Browser(BrowserError::Protocol {
            source: Box::new(err),
        })
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Download(DownloadError::Network {
            url: err.url().map(|u| u.to_string()).unwrap_or_default(),
            message: err.to_string(),
        })
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Storage(StorageError::Io {
            path: String::new(),
            source: err,
        })
    }
}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        AppError::Storage(StorageError::Parse {
            path: String::new(),
            message: err.to_string(),
        })
    }
}

impl From<toml::ser::Error> for AppError {
    fn from(err: toml::ser::Error) -> Self {
        AppError::Storage(StorageError::Serialize {
            message: err.to_string(),
        })
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Storage(StorageError::Serialize {
            message: err.to_string(),
        })
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建导航失败错误
    pub fn navigation_failed(
        url: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Browser(BrowserError::NavigationFailed {
            url: url.into(),
            source: Box::new(source),
        })
    }

    /// 创建文件操作错误
    pub fn storage_io(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::Storage(StorageError::Io {
            path: path.into(),
            source,
        })
    }

    /// 创建配置值非法错误
    pub fn invalid_config(field: impl Into<String>, value: impl ToString) -> Self {
        AppError::Config(ConfigError::InvalidValue {
            field: field.into(),
            value: value.to_string(),
        })
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
