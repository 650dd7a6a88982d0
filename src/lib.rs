pub mod art_api;
pub mod config;
pub mod llm_api;
pub mod logger;
pub mod recommendation;
