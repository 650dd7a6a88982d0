//! # 通用的 Chat Completion 消息结构体
//!
//! 定义客户端共用的消息结构体和工具调用类型（OpenAI 兼容格式）

use serde::{Deserialize, Deserializer, Serialize};
use serde::de::DeserializeOwned;

/// 工具调用结构体
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ToolCall {
    /// 工具调用 ID，回传工具结果时需要
    pub id: String,
    /// 工具类型，通常为 "function"
    #[serde(rename = "type", default = "default_tool_type")]
    pub tool_type: String,
    /// 要调用的函数信息
    pub function: Function,
}

fn default_tool_type() -> String {
    "function".to_string()
}

/// 函数调用信息
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Function {
    /// 函数名称
    pub name: String,
    /// 函数参数，模型给出的原始 JSON 文本
    pub arguments: String,
}

impl Function {
    /// 将参数解析为指定类型
    pub fn parse_arguments<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(&self.arguments)
    }
}

/// 通用聊天消息结构体
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Message {
    /// 消息角色：system、user、assistant、tool
    pub role: String,
    /// 消息内容文本，接口返回 null 时为空字符串
    #[serde(default, deserialize_with = "null_as_empty")]
    pub content: String,
    /// 可选的工具调用列表（assistant 消息）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    /// 对应的工具调用 ID（当角色为 tool 时使用）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl Message {
    fn with_role(role: &str, content: String) -> Self {
        Self {
            role: role.to_string(),
            content,
            tool_calls: None,
            tool_call_id: None,
        }
    }

    /// 创建系统消息
    pub fn system(content: String) -> Self {
        Self::with_role("system", content)
    }

    /// 创建用户消息
    pub fn user(content: String) -> Self {
        Self::with_role("user", content)
    }

    /// 创建助手消息
    pub fn assistant(content: String) -> Self {
        Self::with_role("assistant", content)
    }

    /// 创建工具结果消息
    pub fn tool(content: String, tool_call_id: String) -> Self {
        Self {
            tool_call_id: Some(tool_call_id),
            ..Self::with_role("tool", content)
        }
    }

    /// 为消息添加工具调用
    pub fn with_tool_calls(mut self, tool_calls: Vec<ToolCall>) -> Self {
        self.tool_calls = Some(tool_calls);
        self
    }

    /// 是否包含工具调用请求
    pub fn has_tool_calls(&self) -> bool {
        self.tool_calls.as_ref().is_some_and(|calls| !calls.is_empty())
    }
}
