//! # 外部 HTTP 数据获取
//!
//! 向外部接口发送 GET 请求并以文本形式返回响应体

use serde::Serialize;
use tracing::debug;

use crate::llm_api::utils::client::{BaseClient, ClientConfig, ClientError, RetryConfig};

/// 外部数据获取客户端
///
/// 每次调用只发送一次请求，不重试
#[derive(Debug, Clone)]
pub struct ArtFetcher {
    base_client: BaseClient,
}

impl ArtFetcher {
    /// 使用默认超时配置创建
    pub fn new() -> Result<Self, ClientError> {
        Self::new_with_config(ClientConfig::new())
    }

    /// 使用自定义配置创建，重试配置会被强制为单次请求
    pub fn new_with_config(config: ClientConfig) -> Result<Self, ClientError> {
        let base_client = BaseClient::new(config.with_retry(RetryConfig::no_retry()))?;
        Ok(Self { base_client })
    }

    /// 发送 GET 请求，返回原始响应文本
    ///
    /// `querystring` 可以是任何能序列化为查询参数的键值集合，
    /// 例如 `&[("theme", "sea")]` 或 `HashMap<String, String>`。
    /// 非 2xx 状态码返回 `ClientError::HttpStatus`。
    /// 响应体按 UTF-8 原样解码，不做 BOM 探测。
    pub async fn fetch_data<Q>(&self, url: &str, querystring: &Q) -> Result<String, ClientError>
    where
        Q: Serialize + Sync + ?Sized,
    {
        let response = self.base_client.get(url, querystring).await?;
        let bytes = response.bytes().await?;
        let body = String::from_utf8_lossy(&bytes).into_owned();

        debug!(url = %url, body_len = body.len(), "Fetched response body");

        Ok(body)
    }

    /// 获取基础 HTTP 客户端
    pub fn base_client(&self) -> &BaseClient {
        &self.base_client
    }
}
