//! # 通用 HTTP 客户端架构
//!
//! 提供统一的客户端基础设施，包括：
//! - 超时管理和配置
//! - 重试机制和错误处理
//! - 请求/响应监控
//! - 统一的错误类型

use async_trait::async_trait;
use reqwest::{Client as HttpClient, RequestBuilder, Response};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::time::{sleep, timeout};
use tracing::{info, warn, error};
use uuid::Uuid;

/// 超时配置
#[derive(Debug, Clone)]
pub struct TimeoutConfig {
    /// 总请求超时时间
    pub request_timeout: Duration,
    /// 连接超时时间
    pub connect_timeout: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(180), // 3分钟总超时
            connect_timeout: Duration::from_secs(30),  // 30秒连接超时
        }
    }
}

impl TimeoutConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

/// 重试配置
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// 最大尝试次数（包含第一次请求）
    pub max_attempts: u32,
    /// 基础延迟时间
    pub base_delay: Duration,
    /// 最大延迟时间
    pub max_delay: Duration,
    /// 是否启用指数退避
    pub exponential_backoff: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_secs(30),
            exponential_backoff: true,
        }
    }
}

impl RetryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// 只发送一次请求，不重试
    pub fn no_retry() -> Self {
        Self::default().with_max_attempts(1)
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

}

/// 完整的客户端配置
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// 超时配置
    pub timeout: TimeoutConfig,
    /// 重试配置
    pub retry: RetryConfig,
    /// 默认请求头
    pub default_headers: HashMap<String, String>,
    /// 用户代理
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: TimeoutConfig::default(),
            retry: RetryConfig::default(),
            default_headers: HashMap::new(),
            user_agent: "artwork-assistant/0.1".to_string(),
        }
    }
}

impl ClientConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: TimeoutConfig) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn add_header(mut self, key: String, value: String) -> Self {
        self.default_headers.insert(key, value);
        self
    }

    pub fn with_user_agent(mut self, user_agent: String) -> Self {
        self.user_agent = user_agent;
        self
    }
}

/// 客户端错误类型
#[derive(Debug)]
pub enum ClientError {
    /// 请求超时
    Timeout { duration: Duration },
    /// 网络错误
    Network { source: reqwest::Error },
    /// 重试次数耗尽
    RetryExhausted { attempts: u32, last_error: String },
    /// 配置错误
    Config { message: String },
    /// LLM API 返回非成功状态码（POST）
    LLMApi { message: String, status_code: Option<u16> },
    /// 普通 HTTP 请求返回非成功状态码（GET）
    HttpStatus { status_code: u16, body: String },
    /// 序列化错误
    Serialization { source: serde_json::Error },
    /// 内部错误
    Internal { message: String },
}

impl ClientError {
    fn llm_api(status_code: u16, message: String) -> Self {
        ClientError::LLMApi { message, status_code: Some(status_code) }
    }

    fn http_status(status_code: u16, body: String) -> Self {
        ClientError::HttpStatus { status_code, body }
    }

    /// 获取错误对应的 HTTP 状态码（如果有）
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ClientError::LLMApi { status_code, .. } => *status_code,
            ClientError::HttpStatus { status_code, .. } => Some(*status_code),
            ClientError::Network { source } => source.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

impl std::fmt::Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientError::Timeout { duration } => write!(f, "Request timeout after {:?}", duration),
            ClientError::Network { source } => write!(f, "Network error: {}", source),
            ClientError::RetryExhausted { attempts, last_error } => {
                write!(f, "Retry exhausted after {} attempts: {}", attempts, last_error)
            }
            ClientError::Config { message } => write!(f, "Configuration error: {}", message),
            ClientError::LLMApi { message, status_code } => {
                write!(f, "LLM API error: {} (status: {:?})", message, status_code)
            }
            ClientError::HttpStatus { status_code, body } => {
                write!(f, "HTTP error status {}: {}", status_code, body)
            }
            ClientError::Serialization { source } => write!(f, "Serialization error: {}", source),
            ClientError::Internal { message } => write!(f, "Internal error: {}", message),
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ClientError::Network { source } => Some(source),
            ClientError::Serialization { source } => Some(source),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(error: reqwest::Error) -> Self {
        ClientError::Network { source: error }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(error: serde_json::Error) -> Self {
        ClientError::Serialization { source: error }
    }
}

/// 请求上下文信息，用于日志记录和问题追踪
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// 请求唯一标识符
    pub request_id: String,
    /// HTTP 方法
    pub method: &'static str,
    /// 请求 URL
    pub url: String,
    /// 当前尝试次数
    pub attempt: u32,
    /// 最大尝试次数
    pub max_attempts: u32,
    /// 请求开始时间
    pub start_time: Instant,
    /// 当前尝试的开始时间
    pub attempt_start_time: Instant,
    /// 重试原因
    pub retry_reason: Option<String>,
}

impl RequestContext {
    /// 创建新的请求上下文
    pub fn new(method: &'static str, url: &str, max_attempts: u32) -> Self {
        let now = Instant::now();
        Self {
            request_id: Uuid::new_v4().to_string(),
            method,
            url: url.to_string(),
            attempt: 1,
            max_attempts,
            start_time: now,
            attempt_start_time: now,
            retry_reason: None,
        }
    }

    /// 开始新的重试尝试
    pub fn start_retry(&mut self, reason: String) {
        self.attempt += 1;
        self.attempt_start_time = Instant::now();
        self.retry_reason = Some(reason);
    }

    /// 获取总耗时
    pub fn total_elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// 获取当前尝试耗时
    pub fn attempt_elapsed(&self) -> Duration {
        self.attempt_start_time.elapsed()
    }

    /// 检查是否为最后一次尝试
    pub fn is_final_attempt(&self) -> bool {
        self.attempt >= self.max_attempts
    }
}

/// 客户端监控指标
#[derive(Debug, Clone, Default)]
pub struct ClientMetrics {
    /// 总请求数
    pub total_requests: u64,
    /// 成功请求数
    pub successful_requests: u64,
    /// 失败请求数
    pub failed_requests: u64,
    /// 重试次数
    pub retry_count: u64,
    /// 平均响应时间
    pub avg_response_time: Duration,
    /// 最长响应时间
    pub max_response_time: Duration,
    /// 最短响应时间
    pub min_response_time: Duration,
}

/// 通用 HTTP 客户端
///
/// 提供带有超时、重试和监控功能的 HTTP 客户端封装
#[derive(Debug, Clone)]
pub struct BaseClient {
    /// HTTP 客户端
    client: HttpClient,
    /// 客户端配置
    config: ClientConfig,
    /// 每个请求都会附带的请求头
    headers: HeaderMap,
    /// 监控指标
    metrics: Arc<Mutex<ClientMetrics>>,
}

impl BaseClient {
    /// 创建新的基础客户端
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        Self::new_with_client(config, None)
    }

    /// 创建新的基础客户端，可注入自定义 HTTP 客户端（用于测试）
    pub fn new_with_client(config: ClientConfig, custom_client: Option<HttpClient>) -> Result<Self, ClientError> {
        let client = match custom_client {
            Some(client) => client,
            None => HttpClient::builder()
                .no_proxy()
                .timeout(config.timeout.request_timeout)
                .connect_timeout(config.timeout.connect_timeout)
                .user_agent(&config.user_agent)
                .build()
                .map_err(|e| ClientError::Config {
                    message: format!("Failed to build HTTP client: {}", e),
                })?,
        };

        // 默认请求头按请求附加，注入的客户端同样生效
        let mut headers = HeaderMap::new();
        for (key, value) in &config.default_headers {
            let name = HeaderName::from_bytes(key.as_bytes()).map_err(|e| ClientError::Config {
                message: format!("Invalid header name {}: {}", key, e),
            })?;
            let value = HeaderValue::from_str(value).map_err(|e| ClientError::Config {
                message: format!("Invalid value for header {}: {}", key, e),
            })?;
            headers.insert(name, value);
        }

        Ok(Self {
            client,
            config,
            headers,
            metrics: Arc::new(Mutex::new(ClientMetrics::default())),
        })
    }

    /// 使用默认配置创建客户端
    pub fn new_default() -> Result<Self, ClientError> {
        Self::new(ClientConfig::default())
    }

    /// 获取配置
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// 获取监控指标
    pub fn metrics(&self) -> ClientMetrics {
        self.metrics
            .lock()
            .map(|metrics| metrics.clone())
            .unwrap_or_default()
    }

    /// 发送 POST JSON 请求，非成功状态码返回 `ClientError::LLMApi`
    pub async fn post<T>(&self, url: &str, body: &T) -> Result<Response, ClientError>
    where
        T: Serialize + Sync + ?Sized,
    {
        let ctx = RequestContext::new("POST", url, self.config.retry.max_attempts);
        self.execute(ctx, |client| client.post(url).json(body), ClientError::llm_api)
            .await
    }

    /// 发送 GET 请求并附加查询参数，非成功状态码返回 `ClientError::HttpStatus`
    pub async fn get<Q>(&self, url: &str, query: &Q) -> Result<Response, ClientError>
    where
        Q: Serialize + Sync + ?Sized,
    {
        let ctx = RequestContext::new("GET", url, self.config.retry.max_attempts);
        self.execute(ctx, |client| client.get(url).query(query), ClientError::http_status)
            .await
    }

    /// 带超时和重试的请求循环
    async fn execute<F>(
        &self,
        mut ctx: RequestContext,
        build: F,
        status_error: fn(u16, String) -> ClientError,
    ) -> Result<Response, ClientError>
    where
        F: Fn(&HttpClient) -> RequestBuilder + Send + Sync,
    {
        self.log_request_start(&ctx);

        loop {
            if ctx.attempt > 1 {
                let delay = self.calculate_backoff_delay(ctx.attempt - 1);
                self.log_retry_attempt(&ctx, delay);
                sleep(delay).await;
            }

            let request = build(&self.client).headers(self.headers.clone());

            let error = match timeout(self.config.timeout.request_timeout, request.send()).await {
                Ok(Ok(response)) if response.status().is_success() => {
                    self.log_request_success(&ctx, response.status().as_u16());
                    self.update_success_metrics(ctx.total_elapsed());
                    return Ok(response);
                }
                Ok(Ok(response)) => {
                    let status_code = response.status().as_u16();
                    let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
                    self.log_status_error(&ctx, &error_text, status_code);
                    status_error(status_code, error_text)
                }
                Ok(Err(error)) => {
                    self.log_network_error(&ctx, &error);
                    ClientError::Network { source: error }
                }
                Err(_) => {
                    self.log_timeout_error(&ctx, self.config.timeout.request_timeout);
                    ClientError::Timeout { duration: self.config.timeout.request_timeout }
                }
            };

            if !self.should_retry(&error) {
                self.log_request_failure(&ctx, &error);
                self.update_failure_metrics();
                return Err(error);
            }

            if ctx.is_final_attempt() {
                self.update_failure_metrics();
                // 只配置了一次尝试时直接返回原始错误
                if ctx.max_attempts <= 1 {
                    self.log_request_failure(&ctx, &error);
                    return Err(error);
                }
                self.log_retry_exhausted(&ctx, &error.to_string());
                return Err(ClientError::RetryExhausted {
                    attempts: ctx.attempt,
                    last_error: error.to_string(),
                });
            }

            ctx.start_retry(error.to_string());
            if let Ok(mut metrics) = self.metrics.lock() {
                metrics.retry_count += 1;
            }
        }
    }

    /// 计算回退延迟时间
    fn calculate_backoff_delay(&self, attempt: u32) -> Duration {
        let base_delay = self.config.retry.base_delay;
        let max_delay = self.config.retry.max_delay;

        let delay = if self.config.retry.exponential_backoff {
            base_delay.saturating_mul(2_u32.saturating_pow(attempt.saturating_sub(1)))
        } else {
            base_delay
        };

        std::cmp::min(delay, max_delay)
    }

    /// 判断错误类型是否可以重试（不考虑重试次数限制）
    fn should_retry(&self, error: &ClientError) -> bool {
        match error {
            ClientError::Timeout { .. } => true,
            ClientError::Network { source } => {
                source.is_timeout() || source.is_connect() || source.is_request()
            }
            // 5xx 服务器错误可以重试，4xx 客户端错误不重试
            ClientError::LLMApi { status_code, .. } => status_code.is_some_and(|code| code >= 500),
            ClientError::HttpStatus { status_code, .. } => *status_code >= 500,
            _ => false,
        }
    }

    /// 更新成功指标
    fn update_success_metrics(&self, response_time: Duration) {
        if let Ok(mut metrics) = self.metrics.lock() {
            metrics.total_requests += 1;
            metrics.successful_requests += 1;

            if metrics.successful_requests == 1 {
                metrics.min_response_time = response_time;
                metrics.max_response_time = response_time;
                metrics.avg_response_time = response_time;
            } else {
                if response_time < metrics.min_response_time {
                    metrics.min_response_time = response_time;
                }
                if response_time > metrics.max_response_time {
                    metrics.max_response_time = response_time;
                }

                let count = metrics.successful_requests as u32;
                let total_time = metrics.avg_response_time * (count - 1) + response_time;
                metrics.avg_response_time = total_time / count;
            }
        }
    }

    /// 更新失败指标
    fn update_failure_metrics(&self) {
        if let Ok(mut metrics) = self.metrics.lock() {
            metrics.total_requests += 1;
            metrics.failed_requests += 1;
        }
    }

    fn log_request_start(&self, ctx: &RequestContext) {
        info!(
            request_id = %ctx.request_id,
            method = ctx.method,
            url = %ctx.url,
            max_attempts = ctx.max_attempts,
            "Starting HTTP request"
        );
    }

    fn log_retry_attempt(&self, ctx: &RequestContext, delay: Duration) {
        warn!(
            request_id = %ctx.request_id,
            url = %ctx.url,
            attempt = ctx.attempt,
            max_attempts = ctx.max_attempts,
            delay_ms = delay.as_millis(),
            retry_reason = ctx.retry_reason.as_deref().unwrap_or("unknown"),
            total_elapsed_ms = ctx.total_elapsed().as_millis(),
            "Retrying request after error"
        );
    }

    fn log_request_success(&self, ctx: &RequestContext, status_code: u16) {
        info!(
            request_id = %ctx.request_id,
            method = ctx.method,
            url = %ctx.url,
            status_code = status_code,
            attempt = ctx.attempt,
            total_elapsed_ms = ctx.total_elapsed().as_millis(),
            attempt_elapsed_ms = ctx.attempt_elapsed().as_millis(),
            "Request completed successfully"
        );
    }

    fn log_request_failure(&self, ctx: &RequestContext, error: &ClientError) {
        error!(
            request_id = %ctx.request_id,
            method = ctx.method,
            url = %ctx.url,
            attempt = ctx.attempt,
            max_attempts = ctx.max_attempts,
            total_elapsed_ms = ctx.total_elapsed().as_millis(),
            error = %error,
            "Request failed"
        );
    }

    /// 记录网络错误详细信息
    fn log_network_error(&self, ctx: &RequestContext, error: &reqwest::Error) {
        let error_details = format!(
            "is_timeout: {}, is_connect: {}, is_request: {}, status: {:?}",
            error.is_timeout(),
            error.is_connect(),
            error.is_request(),
            error.status()
        );

        error!(
            request_id = %ctx.request_id,
            url = %ctx.url,
            attempt = ctx.attempt,
            error_type = "network_error",
            error_details = %error_details,
            error_message = %error,
            "Network error occurred"
        );
    }

    fn log_timeout_error(&self, ctx: &RequestContext, timeout_duration: Duration) {
        error!(
            request_id = %ctx.request_id,
            url = %ctx.url,
            attempt = ctx.attempt,
            timeout_duration_ms = timeout_duration.as_millis(),
            actual_elapsed_ms = ctx.attempt_elapsed().as_millis(),
            error_type = "timeout_error",
            "Request timeout occurred"
        );
    }

    fn log_status_error(&self, ctx: &RequestContext, message: &str, status_code: u16) {
        error!(
            request_id = %ctx.request_id,
            method = ctx.method,
            url = %ctx.url,
            attempt = ctx.attempt,
            status_code = status_code,
            error_type = "status_error",
            error_message = %message,
            "Server returned error status"
        );
    }

    fn log_retry_exhausted(&self, ctx: &RequestContext, final_error: &str) {
        error!(
            request_id = %ctx.request_id,
            url = %ctx.url,
            total_attempts = ctx.attempt,
            total_elapsed_ms = ctx.total_elapsed().as_millis(),
            final_error = %final_error,
            error_type = "retry_exhausted",
            "All retry attempts exhausted"
        );
    }
}

/// LLM 客户端特征 trait
///
/// 定义所有 LLM 客户端必须实现的核心接口
#[async_trait]
pub trait LLMClientTrait {
    type Request: Send + Sync;
    type Response: Send + Sync;
    type Error: Send + Sync + std::error::Error;

    /// 发送单次请求
    async fn send_request(&self, request: Self::Request) -> Result<Self::Response, Self::Error>;

    /// 验证请求
    fn validate_request(&self, request: &Self::Request) -> Result<(), Self::Error>;

    /// 获取客户端名称
    fn client_name(&self) -> &'static str;
}
