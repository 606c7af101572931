//! HTTP 下载通道 - 基础设施层
//!
//! 下载器只依赖 [`AssetTransport`]，测试时可以替换成假实现。

use std::error::Error as StdError;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::error::{AppError, AppResult, DownloadError};

/// 证书类错误在错误链中的特征词
const CERTIFICATE_MARKERS: [&str; 6] = [
    "certificate",
    "ssl",
    "self signed",
    "self-signed",
    "unknown issuer",
    "invalidcertificate",
];

/// 下载通道
#[async_trait]
pub trait AssetTransport: Send + Sync {
    /// 通道名称（日志用）
    fn name(&self) -> &str;

    /// 下载 URL 的全部字节
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, DownloadError>;
}

/// 基于 reqwest 的下载通道
pub struct HttpTransport {
    client: Client,
    timeout: Duration,
    name: &'static str,
}

impl HttpTransport {
    /// 校验证书的通道
    pub fn verified(timeout: Duration, user_agent: &str) -> AppResult<Self> {
        Self::build(timeout, user_agent, false, "verified")
    }

    /// 不校验证书的备用通道
    pub fn unverified(timeout: Duration, user_agent: &str) -> AppResult<Self> {
        Self::build(timeout, user_agent, true, "unverified")
    }

    fn build(
        timeout: Duration,
        user_agent: &str,
        accept_invalid_certs: bool,
        name: &'static str,
    ) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .danger_accept_invalid_certs(accept_invalid_certs)
            .build()
            .map_err(|e| AppError::Other(format!("创建 HTTP 客户端失败: {}", e)))?;
        Ok(Self {
            client,
            timeout,
            name,
        })
    }

    fn classify(&self, url: &str, err: reqwest::Error) -> DownloadError {
        if err.is_timeout() {
            return DownloadError::Timeout {
                url: url.to_string(),
                secs: self.timeout.as_secs(),
            };
        }
        let message = error_chain(&err);
        if is_certificate_error(&message) {
            DownloadError::Certificate {
                url: url.to_string(),
                message,
            }
        } else {
            DownloadError::Network {
                url: url.to_string(),
                message,
            }
        }
    }
}

#[async_trait]
impl AssetTransport for HttpTransport {
    fn name(&self) -> &str {
        self.name
    }

    async fn fetch(&self, url: &str) -> Result<Vec<u8>, DownloadError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.classify(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await.map_err(|e| self.classify(url, e))?;
        Ok(bytes.to_vec())
    }
}

/// 把错误及其全部 source 拼成一行
fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut parts = vec![err.to_string()];
    let mut source = err.source();
    while let Some(inner) = source {
        parts.push(inner.to_string());
        source = inner.source();
    }
    parts.join(": ")
}

fn is_certificate_error(message: &str) -> bool {
    let lower = message.to_lowercase();
    CERTIFICATE_MARKERS.iter().any(|m| lower.contains(m))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_certificate_detection() {
        assert!(is_certificate_error(
            "error sending request: invalid peer certificate: UnknownIssuer"
        ));
        assert!(is_certificate_error("SSL routines: certificate verify failed"));
        assert!(is_certificate_error("self-signed certificate in chain"));
        assert!(!is_certificate_error("connection refused"));
        assert!(!is_certificate_error("dns error: no such host"));
    }

    #[test]
    fn test_error_chain_includes_sources() {
        let inner = std::io::Error::new(std::io::ErrorKind::Other, "invalid peer certificate");
        let outer = std::io::Error::new(std::io::ErrorKind::Other, inner);
        let message = error_chain(&outer);
        assert!(message.contains("invalid peer certificate"));
    }
}
