//! # 运行配置
//!
//! 所有配置都从环境变量读取，API Key 必须提供

use anyhow::{anyhow, bail, Context, Result};
use std::str::FromStr;
use std::time::Duration;

use crate::art_api::ArtFetcher;
use crate::llm_api::openai::client::OpenAiClient;
use crate::llm_api::utils::client::{ClientConfig, ClientError, RetryConfig, TimeoutConfig};
use crate::logger::{LogConfig, LogLevel};
use crate::recommendation::invoker::DEFAULT_MODEL;

pub const ENV_API_KEY: &str = "OPENAI_API_KEY";
pub const ENV_BASE_URL: &str = "OPENAI_BASE_URL";
pub const ENV_MODEL: &str = "OPENAI_MODEL";
pub const ENV_ART_API_URL: &str = "ART_API_URL";
pub const ENV_ART_QUERY_PARAM: &str = "ART_API_QUERY_PARAM";
pub const ENV_REQUEST_TIMEOUT: &str = "LLM_REQUEST_TIMEOUT_SECS";
pub const ENV_MAX_ATTEMPTS: &str = "LLM_MAX_ATTEMPTS";
pub const ENV_LOG_LEVEL: &str = "LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "LOG_DIR";
pub const ENV_LOG_JSON: &str = "LOG_JSON";

/// 应用配置
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Chat Completion 接口的 API Key
    pub api_key: String,
    /// Chat Completion 接口基础 URL
    pub base_url: String,
    /// 模型名称
    pub model: String,
    /// 艺术品推荐接口地址，未设置时不执行工具调用往返
    pub art_api_url: Option<String>,
    /// 传给推荐接口的查询参数名
    pub art_query_param: String,
    /// 单次请求总超时
    pub request_timeout: Duration,
    /// Chat 请求最大尝试次数
    pub max_attempts: u32,
    /// 日志配置
    pub log: LogConfig,
}

impl AppConfig {
    /// 从进程环境变量读取配置
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 通过任意键值查询函数读取配置
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        // 空字符串视为未设置
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let api_key = get(ENV_API_KEY)
            .with_context(|| format!("{} is not set; export the chat completion API key", ENV_API_KEY))?;

        let request_timeout_secs: u64 = parse_or(get(ENV_REQUEST_TIMEOUT), ENV_REQUEST_TIMEOUT, 180)?;
        if request_timeout_secs == 0 {
            bail!("{} must be greater than 0", ENV_REQUEST_TIMEOUT);
        }

        let max_attempts: u32 = parse_or(get(ENV_MAX_ATTEMPTS), ENV_MAX_ATTEMPTS, 3)?;
        if max_attempts == 0 {
            bail!("{} must be at least 1", ENV_MAX_ATTEMPTS);
        }

        let level = match get(ENV_LOG_LEVEL) {
            Some(value) => LogLevel::from_str(&value).with_context(|| format!("Invalid {}", ENV_LOG_LEVEL))?,
            None => LogLevel::Info,
        };
        let json_format = parse_or(get(ENV_LOG_JSON), ENV_LOG_JSON, false)?;

        let mut log = LogConfig {
            level,
            json_format,
            ..LogConfig::default()
        };
        if let Some(dir) = get(ENV_LOG_DIR) {
            log.log_dir = dir;
        }

        Ok(Self {
            api_key,
            base_url: get(ENV_BASE_URL).unwrap_or_else(|| OpenAiClient::DEFAULT_BASE_URL.to_string()),
            model: get(ENV_MODEL).unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            art_api_url: get(ENV_ART_API_URL),
            art_query_param: get(ENV_ART_QUERY_PARAM).unwrap_or_else(|| "theme".to_string()),
            request_timeout: Duration::from_secs(request_timeout_secs),
            max_attempts,
            log,
        })
    }

    /// 生成 Chat 客户端使用的 HTTP 配置
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::new()
            .with_timeout(TimeoutConfig::new().with_request_timeout(self.request_timeout))
            .with_retry(RetryConfig::new().with_max_attempts(self.max_attempts))
    }

    /// 创建推荐接口的获取客户端，沿用配置的超时，不重试
    pub fn art_fetcher(&self) -> Result<ArtFetcher, ClientError> {
        ArtFetcher::new_with_config(self.client_config())
    }
}

fn parse_or<T>(value: Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        Some(raw) => raw
            .parse()
            .map_err(|e| anyhow!("Invalid value for {}: {:?} ({})", key, raw, e)),
        None => Ok(default),
    }
}
