//! # OpenAI Chat Completions 客户端
//!
//! 实现 `/v1/chat/completions` 接口的客户端，支持工具调用（function calling）

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use reqwest::Client;

use crate::llm_api::utils::{
    client::{BaseClient, ClientConfig, ClientError, LLMClientTrait},
    chat_traits::{ChatRequestTrait, ChatResponseTrait},
    msg_structure::Message,
    tool_structure::Tool,
};

/// OpenAI Chat 请求结构体
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct OpenAiChatRequest {
    /// 要使用的模型名称，如 "gpt-4o"
    pub model: String,
    /// 对话消息列表
    pub messages: Vec<Message>,
    /// 模型可以调用的工具列表
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<Tool>>,
    /// 温度参数，控制生成的随机性
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

impl OpenAiChatRequest {
    /// 创建新的聊天请求
    pub fn new(model: String, messages: Vec<Message>) -> Self {
        Self {
            model,
            messages,
            tools: None,
            temperature: None,
        }
    }

    /// 设置工具列表
    pub fn with_tools(mut self, tools: Vec<Tool>) -> Self {
        self.tools = Some(tools);
        self
    }

    /// 添加单个工具
    pub fn add_tool(mut self, tool: Tool) -> Self {
        self.tools.get_or_insert_with(Vec::new).push(tool);
        self
    }

    /// 设置温度参数
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

impl ChatRequestTrait for OpenAiChatRequest {
    fn get_model(&self) -> &str {
        &self.model
    }

    fn get_messages(&self) -> &[Message] {
        &self.messages
    }

    fn add_message(&mut self, message: Message) {
        self.messages.push(message);
    }

    fn validate(&self) -> Result<(), String> {
        if self.model.is_empty() {
            return Err("Model name cannot be empty".to_string());
        }
        if self.messages.is_empty() {
            return Err("Messages cannot be empty".to_string());
        }
        if let Some(temperature) = self.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err("Temperature must be between 0.0 and 2.0".to_string());
            }
        }
        Ok(())
    }
}

/// 使用统计信息
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct OpenAiUsage {
    /// 输入 token 数量
    pub prompt_tokens: u32,
    /// 输出 token 数量
    pub completion_tokens: u32,
    /// 总 token 数量
    pub total_tokens: u32,
}

/// Chat 选择项
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct OpenAiChoice {
    /// 选择项索引
    pub index: usize,
    /// 生成的消息
    pub message: Message,
    /// 完成原因：stop、length、tool_calls 等
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// OpenAI Chat 响应结构体
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct OpenAiChatResponse {
    /// 响应 ID
    pub id: String,
    /// 响应对象类型，通常为 "chat.completion"
    pub object: String,
    /// 响应创建时间戳
    pub created: u64,
    /// 使用的模型名称
    pub model: String,
    /// 响应中的选择项列表
    pub choices: Vec<OpenAiChoice>,
    /// 使用统计信息
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<OpenAiUsage>,
    /// 系统指纹
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_fingerprint: Option<String>,
}

impl ChatResponseTrait for OpenAiChatResponse {
    fn get_model(&self) -> &str {
        &self.model
    }

    fn get_message(&self) -> Option<&Message> {
        self.choices.first().map(|choice| &choice.message)
    }

    fn get_eval_count(&self) -> Option<u32> {
        self.usage.as_ref().map(|usage| usage.completion_tokens)
    }

    fn get_prompt_eval_count(&self) -> Option<u32> {
        self.usage.as_ref().map(|usage| usage.prompt_tokens)
    }
}

/// OpenAI 客户端错误类型
#[derive(Debug)]
pub enum OpenAiError {
    Client(ClientError),
    Json(serde_json::Error),
    InvalidRequest(String),
    Api(String),
    Auth(String),
}

impl fmt::Display for OpenAiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpenAiError::Client(e) => write!(f, "Client error: {}", e),
            OpenAiError::Json(e) => write!(f, "JSON serialization error: {}", e),
            OpenAiError::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
            OpenAiError::Api(msg) => write!(f, "API error: {}", msg),
            OpenAiError::Auth(msg) => write!(f, "Authentication error: {}", msg),
        }
    }
}

impl std::error::Error for OpenAiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            OpenAiError::Client(e) => Some(e),
            OpenAiError::Json(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ClientError> for OpenAiError {
    fn from(error: ClientError) -> Self {
        match error {
            ClientError::LLMApi { message, status_code: Some(401 | 403) } => {
                OpenAiError::Auth(extract_error_message(&message).unwrap_or(message))
            }
            other => OpenAiError::Client(other),
        }
    }
}

impl From<serde_json::Error> for OpenAiError {
    fn from(error: serde_json::Error) -> Self {
        OpenAiError::Json(error)
    }
}

/// 从 `{"error": {"message": ...}}` 格式的响应体中提取错误信息
fn extract_error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value
        .get("error")?
        .get("message")?
        .as_str()
        .map(|message| message.to_string())
}

/// OpenAI Chat Completions 客户端
pub struct OpenAiClient {
    /// 基础 HTTP 客户端
    base_client: BaseClient,
    /// API 基础 URL
    base_url: String,
}

impl OpenAiClient {
    /// OpenAI API 的默认基础 URL
    pub const DEFAULT_BASE_URL: &'static str = "https://api.openai.com";

    /// 创建新的 OpenAI 客户端
    pub fn new(api_key: String) -> Result<Self, OpenAiError> {
        Self::new_with_base_url(api_key, Self::DEFAULT_BASE_URL.to_string())
    }

    /// 使用自定义基础 URL 创建客户端
    pub fn new_with_base_url(api_key: String, base_url: String) -> Result<Self, OpenAiError> {
        Self::new_with_config(api_key, base_url, ClientConfig::new())
    }

    /// 使用自定义配置创建客户端
    pub fn new_with_config(api_key: String, base_url: String, config: ClientConfig) -> Result<Self, OpenAiError> {
        let base_client = BaseClient::new(Self::auth_config(&api_key, config)?)?;
        Ok(Self::from_parts(base_client, base_url))
    }

    /// 使用自定义配置和 HTTP 客户端创建客户端（用于测试）
    pub fn new_with_client(api_key: String, base_url: String, config: ClientConfig, client: Client) -> Result<Self, OpenAiError> {
        let base_client = BaseClient::new_with_client(Self::auth_config(&api_key, config)?, Some(client))?;
        Ok(Self::from_parts(base_client, base_url))
    }

    fn auth_config(api_key: &str, config: ClientConfig) -> Result<ClientConfig, OpenAiError> {
        if api_key.trim().is_empty() {
            return Err(OpenAiError::Auth("API key cannot be empty".to_string()));
        }
        // 确保设置了正确的认证头
        Ok(config
            .add_header("Authorization".to_string(), format!("Bearer {}", api_key))
            .add_header("Content-Type".to_string(), "application/json".to_string()))
    }

    fn from_parts(base_client: BaseClient, base_url: String) -> Self {
        Self {
            base_client,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// 发送聊天请求
    pub async fn chat(&self, request: OpenAiChatRequest) -> Result<OpenAiChatResponse, OpenAiError> {
        request.validate().map_err(OpenAiError::InvalidRequest)?;

        let url = format!("{}/v1/chat/completions", self.base_url);

        let response = self.base_client.post(&url, &request).await?;

        let response_text = response.text().await.map_err(|e| {
            OpenAiError::Api(format!("Failed to read response: {}", e))
        })?;

        // 部分兼容实现会以 200 状态码返回错误体
        if let Some(message) = extract_error_message(&response_text) {
            return Err(OpenAiError::Api(message));
        }

        let chat_response: OpenAiChatResponse = serde_json::from_str(&response_text)?;

        Ok(chat_response)
    }

    /// 获取基础 URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// 获取基础 HTTP 客户端
    pub fn base_client(&self) -> &BaseClient {
        &self.base_client
    }
}

#[async_trait]
impl LLMClientTrait for OpenAiClient {
    type Request = OpenAiChatRequest;
    type Response = OpenAiChatResponse;
    type Error = OpenAiError;

    async fn send_request(&self, request: Self::Request) -> Result<Self::Response, Self::Error> {
        self.chat(request).await
    }

    fn validate_request(&self, request: &Self::Request) -> Result<(), Self::Error> {
        request.validate().map_err(OpenAiError::InvalidRequest)
    }

    fn client_name(&self) -> &'static str {
        "OpenAI"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_chat_request_creation() {
        let messages = vec![
            Message::system("You are a helpful assistant.".to_string()),
            Message::user("Hello".to_string()),
        ];

        let request = OpenAiChatRequest::new("gpt-4o".to_string(), messages)
            .add_tool(Tool::function("noop", "Does nothing", json!({"type": "object"})));

        assert_eq!(request.model, "gpt-4o");
        assert_eq!(request.message_count(), 2);
        assert_eq!(request.tools.as_ref().map(Vec::len), Some(1));
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_chat_request_validation() {
        let request = OpenAiChatRequest::new("".to_string(), vec![Message::user("test".to_string())]);
        assert!(request.validate().is_err());

        let request = OpenAiChatRequest::new("gpt-4o".to_string(), vec![]);
        assert!(request.validate().is_err());

        let request = OpenAiChatRequest::new("gpt-4o".to_string(), vec![Message::user("test".to_string())])
            .with_temperature(3.0);
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_unset_options_are_not_serialized() {
        let request = OpenAiChatRequest::new("gpt-4o".to_string(), vec![Message::user("test".to_string())]);
        let value = serde_json::to_value(&request).unwrap();

        let keys: Vec<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();
        assert_eq!(keys.len(), 2);
        assert!(value.get("tools").is_none());
        assert!(value.get("temperature").is_none());
    }

    #[test]
    fn test_response_parsing_with_tool_call() {
        let response: OpenAiChatResponse = serde_json::from_value(json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "created": 1_700_000_000u64,
            "model": "gpt-4o",
            "choices": [{
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {"name": "artwork recommendation", "arguments": "{\"artwordkeyword\":\"sea\"}"}
                    }]
                },
                "finish_reason": "tool_calls"
            }],
            "usage": {"prompt_tokens": 80, "completion_tokens": 20, "total_tokens": 100}
        }))
        .unwrap();

        assert_eq!(response.get_content(), None);
        assert_eq!(response.get_tool_calls().len(), 1);
        assert_eq!(response.get_tool_calls()[0].function.name, "artwork recommendation");
        assert_eq!(response.get_eval_count(), Some(20));
        assert_eq!(response.get_prompt_eval_count(), Some(80));
    }

    #[test]
    fn test_auth_error_mapping() {
        let error: OpenAiError = ClientError::LLMApi {
            message: r#"{"error": {"message": "Incorrect API key provided"}}"#.to_string(),
            status_code: Some(401),
        }
        .into();
        assert!(matches!(error, OpenAiError::Auth(ref msg) if msg == "Incorrect API key provided"));

        let error: OpenAiError = ClientError::LLMApi {
            message: "Rate limit reached".to_string(),
            status_code: Some(429),
        }
        .into();
        assert!(matches!(error, OpenAiError::Client(ClientError::LLMApi { status_code: Some(429), .. })));
    }

    #[test]
    fn test_empty_api_key_rejected() {
        let result = OpenAiClient::new("  ".to_string());
        assert!(matches!(result, Err(OpenAiError::Auth(_))));
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = OpenAiClient::new_with_base_url("sk-test".to_string(), "http://localhost:8080/".to_string()).unwrap();
        assert_eq!(client.base_url(), "http://localhost:8080");
        assert_eq!(client.client_name(), "OpenAI");
    }
}
