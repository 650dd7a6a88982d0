//! # 通用 Chat API 抽象结构
//!
//! 定义 Chat 请求和响应的通用 trait

use crate::llm_api::utils::msg_structure::{Message, ToolCall};

/// 通用 ChatRequest Trait
///
/// 定义 Chat 请求必须实现的通用接口
pub trait ChatRequestTrait {
    /// 获取要使用的模型名称
    fn get_model(&self) -> &str;

    /// 获取对话消息列表
    fn get_messages(&self) -> &[Message];

    /// 添加一条消息到对话中
    fn add_message(&mut self, message: Message);

    /// 获取消息数量
    fn message_count(&self) -> usize {
        self.get_messages().len()
    }

    /// 验证请求参数是否有效
    fn validate(&self) -> Result<(), String> {
        if self.get_model().is_empty() {
            return Err("Model name cannot be empty".to_string());
        }
        if self.message_count() == 0 {
            return Err("Messages cannot be empty".to_string());
        }
        Ok(())
    }
}

/// 通用 ChatResponse Trait
///
/// 定义 Chat 响应必须实现的通用接口
pub trait ChatResponseTrait {
    /// 获取实际使用的模型名称
    fn get_model(&self) -> &str;

    /// 获取 AI 生成的消息
    fn get_message(&self) -> Option<&Message>;

    /// 获取生成的文本内容（便捷方法）
    fn get_content(&self) -> Option<&str> {
        self.get_message()
            .map(|msg| msg.content.as_str())
            .filter(|content| !content.is_empty())
    }

    /// 获取模型请求的工具调用
    fn get_tool_calls(&self) -> &[ToolCall] {
        self.get_message()
            .and_then(|msg| msg.tool_calls.as_deref())
            .unwrap_or(&[])
    }

    /// 获取生成的 token 数量
    fn get_eval_count(&self) -> Option<u32> {
        None
    }

    /// 获取提示词 token 数量
    fn get_prompt_eval_count(&self) -> Option<u32> {
        None
    }
}
