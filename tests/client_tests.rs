//! # BaseClient 测试集
//!
//! 测试 BaseClient 类的各项功能：
//! - 配置管理（超时、重试、默认头等）
//! - 错误处理和类型转换
//! - 重试机制
//! - 监控指标收集
//! - HTTP 请求发送（使用 mockito 模拟）

use artwork_assistant::llm_api::utils::client::{
    BaseClient, ClientConfig, ClientError, TimeoutConfig, RetryConfig,
    RequestContext, ClientMetrics
};
use mockito::{Matcher, Server};
use serde_json::json;
use std::time::Duration;

fn fast_config(max_attempts: u32) -> ClientConfig {
    ClientConfig::new()
        .with_timeout(TimeoutConfig::new().with_request_timeout(Duration::from_secs(5)))
        .with_retry(
            RetryConfig::new()
                .with_max_attempts(max_attempts)
                .with_base_delay(Duration::from_millis(50)),
        )
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========== 配置类测试 ==========

    #[test]
    fn test_timeout_config_default() {
        let config = TimeoutConfig::default();
        assert_eq!(config.request_timeout, Duration::from_secs(180));
        assert_eq!(config.connect_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_timeout_config_builder() {
        let config = TimeoutConfig::new()
            .with_request_timeout(Duration::from_secs(60))
            .with_connect_timeout(Duration::from_secs(10));

        assert_eq!(config.request_timeout, Duration::from_secs(60));
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_retry_config_default() {
        let config = RetryConfig::default();
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.base_delay, Duration::from_millis(1000));
        assert_eq!(config.max_delay, Duration::from_secs(30));
        assert!(config.exponential_backoff);
    }

    #[test]
    fn test_retry_config_builder() {
        let config = RetryConfig::new()
            .with_max_attempts(5)
            .with_base_delay(Duration::from_millis(500));

        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.base_delay, Duration::from_millis(500));
        assert_eq!(config.max_delay, Duration::from_secs(30)); // 默认值保持不变

        // 至少尝试一次
        assert_eq!(RetryConfig::new().with_max_attempts(0).max_attempts, 1);
        assert_eq!(RetryConfig::no_retry().max_attempts, 1);
    }

    #[test]
    fn test_client_config_builder() {
        let config = ClientConfig::new()
            .with_timeout(TimeoutConfig::new().with_request_timeout(Duration::from_secs(60)))
            .with_retry(RetryConfig::new().with_max_attempts(5))
            .add_header("Authorization".to_string(), "Bearer token".to_string())
            .with_user_agent("Test-Agent/1.0".to_string());

        assert_eq!(config.timeout.request_timeout, Duration::from_secs(60));
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.default_headers.get("Authorization"), Some(&"Bearer token".to_string()));
        assert_eq!(config.user_agent, "Test-Agent/1.0");
    }

    // ========== 错误类型测试 ==========

    #[test]
    fn test_client_error_display() {
        let timeout_error = ClientError::Timeout { duration: Duration::from_secs(30) };
        assert!(format!("{}", timeout_error).contains("Request timeout after 30s"));

        let api_error = ClientError::LLMApi {
            message: "Rate limit exceeded".to_string(),
            status_code: Some(429),
        };
        assert!(format!("{}", api_error).contains("LLM API error: Rate limit exceeded (status: Some(429))"));
        assert_eq!(api_error.status_code(), Some(429));

        let http_error = ClientError::HttpStatus { status_code: 404, body: "Not Found".to_string() };
        assert_eq!(format!("{}", http_error), "HTTP error status 404: Not Found");
        assert_eq!(http_error.status_code(), Some(404));

        let retry_error = ClientError::RetryExhausted {
            attempts: 3,
            last_error: "Network error".to_string(),
        };
        assert!(format!("{}", retry_error).contains("Retry exhausted after 3 attempts: Network error"));
    }

    #[tokio::test]
    async fn test_error_conversions() {
        let reqwest_error = reqwest::get("http://[::1]:invalid").await.unwrap_err();
        let client_error: ClientError = reqwest_error.into();
        assert!(matches!(client_error, ClientError::Network { .. }));

        let json_error = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let client_error: ClientError = json_error.into();
        assert!(matches!(client_error, ClientError::Serialization { .. }));
    }

    // ========== RequestContext 测试 ==========

    #[test]
    fn test_request_context_operations() {
        let mut ctx = RequestContext::new("POST", "https://api.example.com/chat", 3);

        assert!(!ctx.request_id.is_empty());
        assert_eq!(ctx.method, "POST");
        assert_eq!(ctx.attempt, 1);
        assert!(ctx.retry_reason.is_none());
        assert!(!ctx.is_final_attempt());

        ctx.start_retry("Network timeout".to_string());
        assert_eq!(ctx.attempt, 2);
        assert_eq!(ctx.retry_reason, Some("Network timeout".to_string()));

        ctx.start_retry("API error".to_string());
        assert_eq!(ctx.attempt, 3);
        assert!(ctx.is_final_attempt());
        assert!(ctx.attempt_elapsed() <= ctx.total_elapsed());
    }

    // ========== BaseClient 构造测试 ==========

    #[test]
    fn test_base_client_creation_default() {
        let client = BaseClient::new_default().unwrap();
        assert_eq!(client.config().user_agent, "artwork-assistant/0.1");
        assert_eq!(client.config().timeout.request_timeout, Duration::from_secs(180));
        assert_eq!(client.config().retry.max_attempts, 3);

        let metrics: ClientMetrics = client.metrics();
        assert_eq!(metrics.total_requests, 0);
        assert_eq!(metrics.retry_count, 0);
    }

    #[test]
    fn test_base_client_rejects_invalid_header() {
        let config = ClientConfig::new().add_header("X-Bad".to_string(), "line\nbreak".to_string());
        let result = BaseClient::new(config);
        assert!(matches!(result, Err(ClientError::Config { .. })));
    }

    // ========== HTTP 请求测试（使用 mockito） ==========

    const NO_QUERY: [(&str, &str); 0] = [];

    #[tokio::test]
    async fn test_successful_post_request_sends_default_headers() {
        let mut server = Server::new_async().await;

        let mock = server.mock("POST", "/v1/chat/completions")
            .match_header("x-custom", "custom-value")
            .match_body(Matcher::Json(json!({"model": "test-model"})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"message": "Hello, world!"}"#)
            .create_async().await;

        let config = fast_config(3).add_header("X-Custom".to_string(), "custom-value".to_string());
        let client = BaseClient::new(config).unwrap();

        let url = format!("{}/v1/chat/completions", server.url());
        let response = client.post(&url, &json!({"model": "test-model"})).await.unwrap();
        assert_eq!(response.status(), 200);
        assert!(response.text().await.unwrap().contains("Hello, world!"));

        mock.assert_async().await;

        let metrics = client.metrics();
        assert_eq!(metrics.total_requests, 1);
        assert_eq!(metrics.successful_requests, 1);
        assert_eq!(metrics.failed_requests, 0);
    }

    #[tokio::test]
    async fn test_headers_applied_with_injected_client() {
        let mut server = Server::new_async().await;

        let mock = server.mock("GET", "/ping")
            .match_header("x-custom", "injected")
            .with_status(200)
            .with_body("pong")
            .create_async().await;

        let http_client = reqwest::Client::builder().no_proxy().build().unwrap();
        let config = fast_config(1).add_header("X-Custom".to_string(), "injected".to_string());
        let client = BaseClient::new_with_client(config, Some(http_client)).unwrap();

        let response = client.get(&format!("{}/ping", server.url()), &NO_QUERY).await.unwrap();
        assert_eq!(response.text().await.unwrap(), "pong");

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_post_request_with_retry_on_server_error() {
        let mut server = Server::new_async().await;

        let mock_error = server.mock("POST", "/v1/chat/completions")
            .with_status(500)
            .with_body("Internal Server Error")
            .expect(1)
            .create_async().await;

        let mock_success = server.mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_body(r#"{"message": "Success after retry"}"#)
            .expect(1)
            .create_async().await;

        let client = BaseClient::new(fast_config(3)).unwrap();

        let url = format!("{}/v1/chat/completions", server.url());
        let response = client.post(&url, &json!({"model": "test-model"})).await.unwrap();
        assert!(response.text().await.unwrap().contains("Success after retry"));

        mock_error.assert_async().await;
        mock_success.assert_async().await;

        let metrics = client.metrics();
        assert_eq!(metrics.successful_requests, 1);
        assert_eq!(metrics.retry_count, 1);
    }

    #[tokio::test]
    async fn test_post_request_retry_exhausted() {
        let mut server = Server::new_async().await;

        let mock = server.mock("POST", "/v1/chat/completions")
            .with_status(503)
            .with_body("Persistent Server Error")
            .expect(3)
            .create_async().await;

        let client = BaseClient::new(fast_config(3)).unwrap();

        let url = format!("{}/v1/chat/completions", server.url());
        let error = client.post(&url, &json!({"model": "test-model"})).await.unwrap_err();
        assert!(matches!(error, ClientError::RetryExhausted { attempts: 3, .. }));

        mock.assert_async().await;

        let metrics = client.metrics();
        assert_eq!(metrics.total_requests, 1);
        assert_eq!(metrics.failed_requests, 1);
        assert_eq!(metrics.retry_count, 2);
    }

    #[tokio::test]
    async fn test_post_request_client_error_no_retry() {
        let mut server = Server::new_async().await;

        let mock = server.mock("POST", "/v1/chat/completions")
            .with_status(400)
            .with_body("Bad Request")
            .expect(1)
            .create_async().await;

        let client = BaseClient::new(fast_config(3)).unwrap();

        let url = format!("{}/v1/chat/completions", server.url());
        let error = client.post(&url, &json!({"model": "test-model"})).await.unwrap_err();
        assert!(matches!(error, ClientError::LLMApi { status_code: Some(400), .. }));

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_get_request_with_query() {
        let mut server = Server::new_async().await;

        let mock = server.mock("GET", "/art")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("theme".into(), "sea".into()),
                Matcher::UrlEncoded("limit".into(), "3".into()),
            ]))
            .with_status(200)
            .with_body("Starfish Dreams")
            .create_async().await;

        let client = BaseClient::new(fast_config(1)).unwrap();

        let query = [("theme", "sea"), ("limit", "3")];
        let response = client.get(&format!("{}/art", server.url()), &query).await.unwrap();
        assert_eq!(response.text().await.unwrap(), "Starfish Dreams");

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_get_request_error_status_single_attempt() {
        let mut server = Server::new_async().await;

        let mock = server.mock("GET", "/art")
            .with_status(502)
            .with_body("Bad Gateway")
            .expect(1)
            .create_async().await;

        let client = BaseClient::new(fast_config(1)).unwrap();

        let error = client.get(&format!("{}/art", server.url()), &NO_QUERY).await.unwrap_err();
        match error {
            ClientError::HttpStatus { status_code, body } => {
                assert_eq!(status_code, 502);
                assert_eq!(body, "Bad Gateway");
            }
            other => panic!("unexpected error: {}", other),
        }

        mock.assert_async().await;
    }
}
