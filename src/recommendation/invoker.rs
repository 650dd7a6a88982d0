//! # 艺术品推荐对话
//!
//! 构建固定的 system + user 对话，携带艺术品推荐工具发送给 Chat Completion 接口。
//! 可选地执行一次工具调用往返：调用外部接口获取推荐结果并回传给模型。

use std::fmt;
use tracing::{info, warn};

use crate::art_api::ArtFetcher;
use crate::llm_api::openai::client::{OpenAiChatRequest, OpenAiChatResponse, OpenAiError};
use crate::llm_api::utils::{
    chat_traits::{ChatRequestTrait, ChatResponseTrait},
    client::{ClientError, LLMClientTrait},
    msg_structure::{Message, ToolCall},
};
use crate::recommendation::tool::{artwork_recommendation_tool, ArtworkToolArgs, ARTWORK_TOOL_NAME};

/// 默认模型
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// 系统提示词
pub const SYSTEM_PROMPT: &str =
    "You are a helpful assistant that can fetch data from external APIs. specifically for art recommendations.";

/// 用户消息
pub const USER_PROMPT: &str = "Hello! Can you recommend me something related to sea?";

/// 推荐流程错误类型
#[derive(Debug)]
pub enum RecommendationError {
    /// Chat Completion 调用失败
    Chat(OpenAiError),
    /// 外部接口调用失败
    Fetch(ClientError),
    /// 模型给出的工具参数无法解析
    InvalidArguments(String),
    /// 缺少运行所需的配置
    NotConfigured(String),
}

impl fmt::Display for RecommendationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecommendationError::Chat(e) => write!(f, "Chat completion failed: {}", e),
            RecommendationError::Fetch(e) => write!(f, "Artwork fetch failed: {}", e),
            RecommendationError::InvalidArguments(msg) => write!(f, "Invalid tool arguments: {}", msg),
            RecommendationError::NotConfigured(msg) => write!(f, "Not configured: {}", msg),
        }
    }
}

impl std::error::Error for RecommendationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RecommendationError::Chat(e) => Some(e),
            RecommendationError::Fetch(e) => Some(e),
            _ => None,
        }
    }
}

impl From<OpenAiError> for RecommendationError {
    fn from(error: OpenAiError) -> Self {
        RecommendationError::Chat(error)
    }
}

impl From<ClientError> for RecommendationError {
    fn from(error: ClientError) -> Self {
        RecommendationError::Fetch(error)
    }
}

/// 构建艺术品推荐请求
pub fn build_recommendation_request(model: &str) -> OpenAiChatRequest {
    let messages = vec![
        Message::system(SYSTEM_PROMPT.to_string()),
        Message::user(USER_PROMPT.to_string()),
    ];

    OpenAiChatRequest::new(model.to_string(), messages).with_tools(vec![artwork_recommendation_tool()])
}

/// 艺术品推荐助手
pub struct ArtworkAssistant<C> {
    client: C,
    model: String,
}

impl<C> ArtworkAssistant<C>
where
    C: LLMClientTrait<Request = OpenAiChatRequest, Response = OpenAiChatResponse, Error = OpenAiError> + Sync,
{
    pub fn new(client: C, model: String) -> Self {
        Self { client, model }
    }

    /// 使用默认模型创建
    pub fn with_default_model(client: C) -> Self {
        Self::new(client, DEFAULT_MODEL.to_string())
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// 发送一次推荐请求，返回模型响应（文本回复或工具调用请求）
    pub async fn request_recommendation(&self) -> Result<OpenAiChatResponse, RecommendationError> {
        let request = build_recommendation_request(&self.model);
        self.client.validate_request(&request)?;

        info!(
            client = self.client.client_name(),
            model = %self.model,
            tools = ARTWORK_TOOL_NAME,
            "Requesting artwork recommendation"
        );

        let response = self.client.send_request(request).await?;
        log_response(&response);
        Ok(response)
    }

    /// 推荐请求加一次工具调用往返
    ///
    /// 模型请求调用艺术品推荐工具时，用 `{query_param: artwordkeyword}` 调用外部接口，
    /// 把结果作为 tool 消息回传，返回第二次请求的响应。模型没有请求工具时直接返回第一次响应。
    pub async fn recommend_with_tool(
        &self,
        fetcher: &ArtFetcher,
        art_api_url: &str,
        query_param: &str,
    ) -> Result<OpenAiChatResponse, RecommendationError> {
        if art_api_url.trim().is_empty() {
            return Err(RecommendationError::NotConfigured("artwork API URL is empty".to_string()));
        }

        let mut request = build_recommendation_request(&self.model);
        self.client.validate_request(&request)?;

        let first = self.client.send_request(request.clone()).await?;
        log_response(&first);

        let tool_calls: Vec<ToolCall> = first.get_tool_calls().to_vec();
        if tool_calls.is_empty() {
            info!("Model answered without requesting a tool");
            return Ok(first);
        }

        let assistant_message = first
            .get_message()
            .cloned()
            .unwrap_or_else(|| Message::assistant(String::new()).with_tool_calls(tool_calls.clone()));
        request.add_message(assistant_message);

        for call in &tool_calls {
            let content = self.run_tool_call(call, fetcher, art_api_url, query_param).await?;
            request.add_message(Message::tool(content, call.id.clone()));
        }

        info!(
            tool_results = tool_calls.len(),
            message_count = request.message_count(),
            "Sending tool results back to the model"
        );

        let second = self.client.send_request(request).await?;
        log_response(&second);
        Ok(second)
    }

    async fn run_tool_call(
        &self,
        call: &ToolCall,
        fetcher: &ArtFetcher,
        art_api_url: &str,
        query_param: &str,
    ) -> Result<String, RecommendationError> {
        if call.function.name != ARTWORK_TOOL_NAME {
            warn!(tool_call_id = %call.id, function = %call.function.name, "Model requested an unknown function");
            return Ok(format!("Unknown function: {}", call.function.name));
        }

        let args: ArtworkToolArgs = call
            .function
            .parse_arguments()
            .map_err(|e| RecommendationError::InvalidArguments(format!("{}: {}", e, call.function.arguments)))?;

        info!(tool_call_id = %call.id, keyword = %args.artwordkeyword, "Fetching artwork for tool call");

        let query = [(query_param, args.artwordkeyword.as_str())];
        Ok(fetcher.fetch_data(art_api_url, &query).await?)
    }
}

fn log_response(response: &OpenAiChatResponse) {
    let tool_calls = response.get_tool_calls();
    if tool_calls.is_empty() {
        info!(
            model = %response.model,
            completion_tokens = response.get_eval_count(),
            content = response.get_content().unwrap_or(""),
            "Received text reply"
        );
    } else {
        for call in tool_calls {
            info!(
                model = %response.model,
                tool_call_id = %call.id,
                function = %call.function.name,
                arguments = %call.function.arguments,
                "Model requested tool invocation"
            );
        }
    }
}
