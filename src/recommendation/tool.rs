use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::llm_api::utils::tool_structure::Tool;

/// 艺术品推荐工具名称
pub const ARTWORK_TOOL_NAME: &str = "artwork recommendation";

/// 关键字参数名
pub const KEYWORD_PARAM: &str = "artwordkeyword";

/// 艺术品推荐工具的参数
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ArtworkToolArgs {
    pub artwordkeyword: String,
}

/// 构建艺术品推荐工具定义
pub fn artwork_recommendation_tool() -> Tool {
    Tool::function(
        ARTWORK_TOOL_NAME,
        "Fetches artwork recommendations based on a theme",
        json!({
            "type": "object",
            "properties": {
                KEYWORD_PARAM: {
                    "type": "string",
                    "description": "The theme or keyword for the artwork recommendation"
                }
            }
        }),
    )
    .with_result(json!({
        "type": "string",
        "description": "The recommended artwork based on the provided keyword"
    }))
}
