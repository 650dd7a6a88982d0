pub mod msg_structure;
pub mod tool_structure;
pub mod chat_traits;
pub mod client;
